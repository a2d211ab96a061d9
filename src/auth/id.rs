//! Strongly typed identifiers for the application and the registered device.
//!
//! Application ids are supplied by the caller and end up in storage keys and form bodies, so
//! they are checked for whitespace and length. Device ids are issued by the registration
//! endpoint and are kept as opaque, non-empty strings.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

/// Upper bound on an application id, in bytes.
pub const APPLICATION_ID_MAX_LEN: usize = 128;

macro_rules! def_id {
	($(#[$meta:meta])* $name:ident => $check:path) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates `value` and wraps it.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				$check(&value)?;

				Ok(Self(value))
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl From<$name> for String {
			fn from(id: $name) -> Self {
				id.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", stringify!($name), self.0)
			}
		}
	};
}

def_id! {
	/// OAuth client identifier of the session owner.
	ApplicationId => check_application_id
}
def_id! {
	/// Identifier the API assigns to an anonymously registered device.
	DeviceId => check_device_id
}

/// Why an identifier was refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Empty value.
	#[error("{kind} id cannot be empty.")]
	Empty {
		/// `application` or `device`.
		kind: &'static str,
	},
	/// Application id with whitespace in it.
	#[error("Application id `{value}` contains whitespace.")]
	Whitespace {
		/// Offending value.
		value: String,
	},
	/// Application id longer than [`APPLICATION_ID_MAX_LEN`].
	#[error("Application id is {len} bytes long; at most {APPLICATION_ID_MAX_LEN} are allowed.")]
	TooLong {
		/// Length of the refused value.
		len: usize,
	},
}

fn check_application_id(value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		Err(IdentifierError::Empty { kind: "application" })
	} else if value.chars().any(char::is_whitespace) {
		Err(IdentifierError::Whitespace { value: value.to_owned() })
	} else if value.len() > APPLICATION_ID_MAX_LEN {
		Err(IdentifierError::TooLong { len: value.len() })
	} else {
		Ok(())
	}
}

fn check_device_id(value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind: "device" });
	}

	Ok(())
}

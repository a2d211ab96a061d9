//! Bearer-token sessions for remote APIs: queue calls until the session is authenticated,
//! refresh transparently when the API rejects a token, and persist credentials between runs.
//!
//! A [`session::Session`] owns one credential set. It acquires tokens through client
//! credentials, a stored refresh token, or anonymous device registration, and hands every call
//! back as a [`deferred::Deferred`] that settles once the request (or its automatic retry)
//! completes.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod deferred;
pub mod error;
pub mod events;
pub mod http;
pub mod obs;
pub mod queue;
pub mod refresh;
pub mod request;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

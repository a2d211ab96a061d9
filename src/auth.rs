//! Auth-domain identifiers, token secrets, and the session's credential state.

pub mod id;
pub mod token;

pub use id::*;
pub use token::{credentials::*, secret::*};

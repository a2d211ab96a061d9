//! Token secrets and the mutable credential set they live in.

pub mod credentials;
pub mod secret;

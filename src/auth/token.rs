//! Access token records and their redacted secrets.

pub mod record;
pub mod secret;

//! Token models for the proxy's single client-credentials grant.

pub mod token;

pub use token::{record::*, secret::*};

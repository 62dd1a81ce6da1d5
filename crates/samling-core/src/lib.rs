#![forbid(unsafe_code)]

//! Shared error type, qualified names and namespace/algorithm constants.

pub mod algorithm;
pub mod error;
pub mod ns;
pub mod qname;

pub use error::{Error, Result};
pub use qname::QName;

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # precis-core
//!
//! Error type and result combinators shared across the precis workspace.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::{Result, ResultExt};

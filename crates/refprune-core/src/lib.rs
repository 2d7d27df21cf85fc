//! Core value types shared by every refprune crate.
//!
//! - [`VersionValue`]: a four-part package version with an optional
//!   pre-release label and a total order.
//! - [`TargetFramework`] / [`RuntimeTrain`]: the framework monikers a project
//!   declares and the platform-runtime release trains packages can be locked to.

#![warn(missing_docs)]

pub mod error;
pub mod framework;
pub mod version;

pub use error::{Error, Result};
pub use framework::{RuntimeTrain, TargetFramework, DEFAULT_RUNTIME_TRAINS};
pub use version::VersionValue;

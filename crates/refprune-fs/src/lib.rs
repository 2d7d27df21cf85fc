//! Root-scoped async filesystem abstraction for refprune.
//!
//! Manifest discovery, reads and replace-on-write all go through the
//! [`FileSystem`] trait so analysis code never touches paths outside the
//! directory it was pointed at.
//!
//! # Example
//!
//! ```no_run
//! use refprune_fs::{DiscoveryOptions, FileSystem, NativeFileSystem};
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> std::io::Result<()> {
//! let fs = NativeFileSystem::new(".")?;
//! let manifests = fs
//!     .discover_files(Path::new("."), &[".csproj"], &DiscoveryOptions::default())
//!     .await?;
//! println!("{} manifests", manifests.len());
//! # Ok(())
//! # }
//! ```

mod file_system;
pub use file_system::{DiscoveryOptions, FileSystem};

pub mod native;
pub use native::{normalize_lexically, NativeFileSystem};

//! Error types for the freshcell workspace.
//!
//! # Error Hierarchy
//!
//! Errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enums name specific conditions
//! - `*Error` structs wrap the kind with source location tracking
//! - constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use freshcell_error::{FreshcellResult, RefreshError};
//!
//! fn fetch_quota() -> FreshcellResult<u64> {
//!     Err(RefreshError::new("upstream unavailable"))?
//! }
//!
//! assert!(fetch_quota().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod refresh;

pub use cache::{CacheError, CacheErrorKind};
pub use config::ConfigError;
pub use error::{FreshcellError, FreshcellErrorKind, FreshcellResult};
pub use refresh::{BoxedCause, RefreshError};

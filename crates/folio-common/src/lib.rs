//! folio-common: types shared between the editor core and hosting binaries.
//!
//! - `post`: post and settings records plus the feed view over them
//! - `client`: HTTP client for uploads, posts and settings
//! - `error`: upload and client error types

pub mod client;
pub mod error;
pub mod post;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use client::{ApiClient, ApiConfig, BearerToken, UploadFile, join_url, parse_upload_response};
pub use error::{ClientError, UploadError};
pub use post::{DEFAULT_BANNER_URL, Post, PostCollection, PostId, PostKind, Settings};

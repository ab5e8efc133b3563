//! Error types for the folio API client.

use miette::Diagnostic;
use thiserror::Error;

/// Failure of a blob upload.
///
/// Every variant carries a message suitable for showing to the user.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum UploadError {
    /// The request never produced a response (DNS, connection, TLS, ...).
    #[error("{0}")]
    #[diagnostic(code(folio::upload::transport))]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("{message}")]
    #[diagnostic(code(folio::upload::rejected))]
    Rejected { status: u16, message: String },

    /// The endpoint answered 2xx but the body had no `url`.
    #[error("Upload failed")]
    #[diagnostic(
        code(folio::upload::missing_url),
        help("the upload endpoint must answer with {{\"url\": \"...\"}}")
    )]
    MissingUrl,

    /// No bearer credential was available for the request.
    #[error("Unauthorized")]
    #[diagnostic(code(folio::upload::unauthorized))]
    Unauthorized,

    /// The file to upload could not be read.
    #[error("could not read {path}: {source}")]
    #[diagnostic(code(folio::upload::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Transport(err.to_string())
    }
}

/// Failure talking to the posts/settings endpoints.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ClientError {
    #[error("request failed: {0}")]
    #[diagnostic(code(folio::client::transport))]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    #[diagnostic(code(folio::client::status))]
    Status { status: u16, message: String },

    #[error("not authenticated")]
    #[diagnostic(
        code(folio::client::unauthorized),
        help("pass --token or set FOLIO_TOKEN")
    )]
    Unauthorized,

    #[error(transparent)]
    #[diagnostic(code(folio::client::json))]
    Json(#[from] serde_json::Error),
}

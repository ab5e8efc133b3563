//! Error types for editor commands and media insertion.

use folio_common::UploadError;
use miette::Diagnostic;
use thiserror::Error;

use crate::media::UploadSlot;

#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum EditorError {
    #[error("unknown command `{0}`")]
    #[diagnostic(
        code(folio::editor::unknown_command),
        help("known commands: bold, italic, underline, foreColor, hiliteColor, fontName, fontSize, insertParagraph, createLink, insertHTML")
    )]
    UnknownCommand(String),

    #[error("command `{command}` needs a value")]
    #[diagnostic(code(folio::editor::missing_value))]
    MissingValue { command: &'static str },

    #[error("invalid value for `{command}`: {value}")]
    #[diagnostic(code(folio::editor::invalid_value))]
    InvalidValue {
        command: &'static str,
        value: String,
    },

    #[error("invalid YouTube link: {0}")]
    #[diagnostic(
        code(folio::editor::invalid_youtube_url),
        help("use a youtube.com/watch?v=... or youtu.be/... link")
    )]
    InvalidYouTubeUrl(String),

    #[error("refusing unsafe URL `{0}`")]
    #[diagnostic(code(folio::editor::unsafe_url))]
    UnsafeUrl(String),

    /// Upload failed; the message is what the user was shown.
    #[error("{} Upload Failed: {source}", .slot.label())]
    #[diagnostic(code(folio::editor::upload))]
    Upload {
        slot: UploadSlot,
        #[source]
        source: UploadError,
    },
}

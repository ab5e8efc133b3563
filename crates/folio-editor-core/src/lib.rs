//! folio-editor-core: the rich text editor without any UI toolkit.
//!
//! This crate provides:
//! - `Document` - arena-backed HTML-like tree with a sanitizing codec
//! - `SelectionTracker` - capture/restore of the selection across focus loss
//! - `execute_command` - formatting commands over a selection
//! - `RichTextEditor` - the facade hosts drive, including the two-phase
//!   media upload protocol
//! - `embed` - link classification and embed fragment builders

pub mod actions;
pub mod dom;
pub mod editor;
pub mod embed;
pub mod error;
pub mod execute;
pub mod html;
pub mod media;
pub mod notify;
pub mod platform;
mod range;
pub mod selection;
pub mod style;
pub mod toolbar;
pub mod types;

pub use actions::EditorCommand;
pub use dom::{Document, NodeId, NodeKind};
pub use editor::RichTextEditor;
pub use embed::{LinkKind, MediaKind, YouTubeVideo, classify_link, resolve_youtube};
pub use error::EditorError;
pub use execute::{Executed, execute_command};
pub use html::{Fragment, HtmlElement, HtmlNode};
pub use media::{
    MediaReference, PendingUpload, UploadSlot, Uploader, insert_image, insert_media,
};
pub use notify::{ChangeListener, ChangeNotifier};
pub use platform::EditorHost;
pub use selection::{Bookmark, RestoreOutcome, SelectionTracker};
pub use smol_str::SmolStr;
pub use style::Rgb;
pub use toolbar::{EditorSettings, FocusPolicy, ToolbarControl, ToolbarState};
pub use types::{Position, SelectionRange, SnapDirection};

//! Host abstraction for the few places the editor talks to the user directly.
//!
//! The hosting UI (browser shell, native window, CLI) implements
//! [`EditorHost`]. Commands stay platform-agnostic and only ask for a line of
//! input or show a message through it.

/// User-facing dialogs the editor needs.
pub trait EditorHost {
    /// Ask the user for a line of text, pre-filled with `default`.
    ///
    /// `None` means the user cancelled.
    fn prompt(&self, message: &str, default: &str) -> Option<String>;

    /// Show a blocking message, e.g. an upload failure.
    fn alert(&self, message: &str);
}

/// Headless host: every prompt is cancelled, alerts go to the log.
impl EditorHost for () {
    fn prompt(&self, message: &str, _default: &str) -> Option<String> {
        tracing::debug!(target: "folio::editor", prompt = message, "prompt cancelled by headless host");
        None
    }

    fn alert(&self, message: &str) {
        tracing::warn!(target: "folio::editor", alert = message, "alert shown");
    }
}

impl<H: EditorHost + ?Sized> EditorHost for &H {
    fn prompt(&self, message: &str, default: &str) -> Option<String> {
        (**self).prompt(message, default)
    }

    fn alert(&self, message: &str) {
        (**self).alert(message)
    }
}

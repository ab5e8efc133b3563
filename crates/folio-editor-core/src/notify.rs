//! Reporting document changes to the hosting application.

use crate::dom::Document;

/// Receives the serialized document after every mutation.
pub trait ChangeListener {
    fn document_changed(&mut self, html: &str);
}

/// Nobody is listening.
impl ChangeListener for () {
    fn document_changed(&mut self, _html: &str) {}
}

impl<F: FnMut(&str)> ChangeListener for F {
    fn document_changed(&mut self, html: &str) {
        self(html)
    }
}

/// Keeps every reported state, newest last.
impl ChangeListener for Vec<String> {
    fn document_changed(&mut self, html: &str) {
        self.push(html.to_owned());
    }
}

/// Serializes the document and hands it to the listener.
#[derive(Debug, Default)]
pub struct ChangeNotifier<L> {
    listener: L,
    revision: u64,
}

impl<L: ChangeListener> ChangeNotifier<L> {
    pub fn new(listener: L) -> Self {
        Self {
            listener,
            revision: 0,
        }
    }

    /// Number of notifications sent so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn notify(&mut self, doc: &Document) {
        let html = doc.to_html();
        self.revision += 1;
        tracing::trace!(
            target: "folio::editor",
            revision = self.revision,
            len = html.len(),
            "document changed"
        );
        self.listener.document_changed(&html);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_listener() {
        let mut seen = Vec::new();
        {
            let mut notifier = ChangeNotifier::new(|html: &str| seen.push(html.len()));
            notifier.notify(&Document::from_html("<p>abc</p>"));
            assert_eq!(notifier.revision(), 1);
        }
        assert_eq!(seen, vec![10]);
    }

    #[test]
    fn test_vec_listener() {
        let mut notifier = ChangeNotifier::new(Vec::<String>::new());
        notifier.notify(&Document::from_html("<b>x</b>"));
        notifier.notify(&Document::new());
        assert_eq!(notifier.listener().as_slice(), ["<b>x</b>", ""]);
        assert_eq!(notifier.revision(), 2);
    }
}

//! The editor facade tying document, selection, toolbar and notifications
//! together.

use crate::actions::EditorCommand;
use crate::dom::Document;
use crate::embed::{resolve_youtube, youtube_embed};
use crate::error::EditorError;
use crate::execute::{self, Executed, execute_command};
use crate::html;
use crate::notify::{ChangeListener, ChangeNotifier};
use crate::platform::EditorHost;
use crate::selection::{Bookmark, RestoreOutcome, SelectionTracker};
use crate::style::Rgb;
use crate::toolbar::{EditorSettings, FocusPolicy, ToolbarControl, ToolbarState};
use crate::types::SelectionRange;

pub const YOUTUBE_PROMPT: &str = "Enter YouTube URL:";
pub const INVALID_YOUTUBE_ALERT: &str = "Invalid YouTube link";

/// A rich text editor over an in-memory document.
///
/// `H` answers prompts and shows alerts, `L` receives the serialized
/// document after every mutation. Both default to `()`.
#[derive(Debug)]
pub struct RichTextEditor<H = (), L = ()> {
    pub(crate) doc: Document,
    /// The live selection, as the editing surface would report it. `None`
    /// while focus is outside the editor.
    pub(crate) selection: Option<SelectionRange>,
    pub(crate) tracker: SelectionTracker,
    toolbar: ToolbarState,
    notifier: ChangeNotifier<L>,
    pub(crate) host: H,
    pub(crate) settings: EditorSettings,
    seeded: bool,
    edited: bool,
}

impl Default for RichTextEditor<(), ()> {
    fn default() -> Self {
        Self::new((), ())
    }
}

impl<H: EditorHost, L: ChangeListener> RichTextEditor<H, L> {
    pub fn new(host: H, listener: L) -> Self {
        let settings = EditorSettings::default();
        Self {
            doc: Document::new(),
            selection: None,
            tracker: SelectionTracker::new(),
            toolbar: ToolbarState::from_settings(&settings),
            notifier: ChangeNotifier::new(listener),
            host,
            settings,
            seeded: false,
            edited: false,
        }
    }

    pub fn with_settings(mut self, settings: EditorSettings) -> Self {
        self.toolbar = ToolbarState::from_settings(&settings);
        self.settings = settings;
        self
    }

    // === Accessors ===

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn to_html(&self) -> String {
        self.doc.to_html()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn listener(&self) -> &L {
        self.notifier.listener()
    }

    /// Number of change notifications sent.
    pub fn revision(&self) -> u64 {
        self.notifier.revision()
    }

    pub fn toolbar(&self) -> &ToolbarState {
        &self.toolbar
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Load the initial content.
    ///
    /// Only the first non-empty seed into an empty, untouched editor takes
    /// effect; later calls (e.g. the host echoing our own notifications back)
    /// are ignored. Seeding does not notify.
    pub fn seed(&mut self, initial: &str) -> bool {
        if self.seeded || self.edited || !self.doc.is_empty() || initial.trim().is_empty() {
            return false;
        }
        self.doc.replace_contents(html::parse(initial));
        self.seeded = true;
        self.selection = None;
        tracing::debug!(target: "folio::editor", len = initial.len(), "document seeded");
        true
    }

    // === Selection ===

    pub fn selection(&self) -> Option<&SelectionRange> {
        self.selection.as_ref()
    }

    /// Set the active selection, as a user click or drag would.
    pub fn select(&mut self, range: SelectionRange) {
        self.selection = Some(range);
    }

    /// Select by linear text offsets.
    pub fn select_text(&mut self, start: usize, end: usize) {
        self.selection = Some(self.doc.range_at(start, end));
    }

    /// Focus left the editing surface.
    pub fn blur(&mut self) {
        self.selection = None;
    }

    pub fn capture_selection(&mut self) -> Option<SelectionRange> {
        self.tracker.capture(self.selection.as_ref())
    }

    /// Make a captured range the active selection again.
    ///
    /// A stale range degrades to a caret at the end of the document.
    pub fn restore_selection(&mut self, range: Option<&SelectionRange>) -> RestoreOutcome {
        let outcome = self.tracker.restore(&self.doc, range);
        self.apply_restore(outcome);
        outcome
    }

    pub fn restore_saved_selection(&mut self) -> RestoreOutcome {
        let outcome = self.tracker.restore_saved(&self.doc);
        self.apply_restore(outcome);
        outcome
    }

    pub(crate) fn restore_bookmark(&mut self, bookmark: Option<&Bookmark>) -> RestoreOutcome {
        let outcome = self.tracker.restore_bookmark(&self.doc, bookmark);
        self.apply_restore(outcome);
        outcome
    }

    fn apply_restore(&mut self, outcome: RestoreOutcome) {
        match outcome {
            RestoreOutcome::Restored(range) => self.selection = Some(range),
            RestoreOutcome::Stale => {
                self.selection = Some(SelectionRange::caret(self.doc.end_position()));
            }
            RestoreOutcome::NothingCaptured => {}
        }
    }

    /// The selection a command applies to.
    fn effective_selection(&self) -> SelectionRange {
        match self.selection {
            Some(range) if self.doc.is_valid_range(&range) => range,
            Some(range) => {
                tracing::debug!(target: "folio::editor", ?range, "active selection is stale");
                SelectionRange::caret(self.doc.end_position())
            }
            None => SelectionRange::caret(self.doc.end_position()),
        }
    }

    // === Commands ===

    /// Run a command on the active selection.
    ///
    /// Returns `Ok(false)` when the user backed out and nothing changed.
    pub fn execute(&mut self, command: EditorCommand) -> Result<bool, EditorError> {
        let selection = self.effective_selection();
        match execute_command(&mut self.doc, &selection, &command, &self.host) {
            Ok(Executed::Applied(selection)) => {
                self.selection = Some(selection);
                metrics::counter!("folio_editor_commands_total", "command" => command.name())
                    .increment(1);
                tracing::debug!(target: "folio::editor", command = command.name(), "command applied");
                self.mark_changed();
                Ok(true)
            }
            Ok(Executed::Aborted) => Ok(false),
            Err(err) => {
                tracing::warn!(target: "folio::editor", command = command.name(), error = %err, "command rejected");
                Err(err)
            }
        }
    }

    /// Run a command given by its `execCommand` name.
    pub fn execute_named(&mut self, name: &str, value: Option<&str>) -> Result<bool, EditorError> {
        let command = EditorCommand::parse(name, value)?;
        self.execute(command)
    }

    /// Typed input from the editing surface.
    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let selection = self.effective_selection();
        self.selection = Some(execute::insert_text(&mut self.doc, &selection, text));
        self.mark_changed();
    }

    fn mark_changed(&mut self) {
        self.edited = true;
        self.notifier.notify(&self.doc);
    }

    // === Toolbar ===

    /// Pointer-down on a toolbar control. Always captures the selection
    /// first; controls that take focus drop the live selection.
    pub fn toolbar_pointer_down(&mut self, control: ToolbarControl) -> FocusPolicy {
        self.capture_selection();
        let policy = control.focus_policy();
        if policy == FocusPolicy::AllowFocusChange {
            self.blur();
        }
        policy
    }

    pub fn bold(&mut self) -> Result<bool, EditorError> {
        self.execute(EditorCommand::Bold)
    }

    pub fn italic(&mut self) -> Result<bool, EditorError> {
        self.execute(EditorCommand::Italic)
    }

    pub fn underline(&mut self) -> Result<bool, EditorError> {
        self.execute(EditorCommand::Underline)
    }

    pub fn insert_paragraph(&mut self) -> Result<bool, EditorError> {
        self.execute(EditorCommand::InsertParagraph)
    }

    pub fn set_text_color(&mut self, color: Rgb) -> Result<bool, EditorError> {
        self.toolbar.text_color = color;
        self.restore_saved_selection();
        self.execute(EditorCommand::ForeColor(color))
    }

    pub fn set_background_color(&mut self, color: Rgb) -> Result<bool, EditorError> {
        self.toolbar.background_color = color;
        self.restore_saved_selection();
        self.execute(EditorCommand::HiliteColor(color))
    }

    pub fn set_font_family(&mut self, family: &str) -> Result<bool, EditorError> {
        let command = EditorCommand::parse("fontName", Some(family))?;
        self.toolbar.font_family = family.trim().into();
        self.restore_saved_selection();
        self.execute(command)
    }

    pub fn set_font_size(&mut self, px: u32) -> Result<bool, EditorError> {
        let command = EditorCommand::parse("fontSize", Some(&px.to_string()))?;
        self.toolbar.font_size = px;
        self.restore_saved_selection();
        self.execute(command)
    }

    /// Link the selection, detecting a URL in the selected text or asking
    /// for one.
    pub fn create_link(&mut self) -> Result<bool, EditorError> {
        self.execute(EditorCommand::CreateLink(None))
    }

    /// Ask for a YouTube link and embed the video.
    pub fn insert_youtube(&mut self) -> Result<bool, EditorError> {
        match self.host.prompt(YOUTUBE_PROMPT, "") {
            Some(url) if !url.trim().is_empty() => self.insert_youtube_url(url.trim()),
            _ => Ok(false),
        }
    }

    pub fn insert_youtube_url(&mut self, url: &str) -> Result<bool, EditorError> {
        match resolve_youtube(url) {
            Ok(video) => self.execute(EditorCommand::InsertHtml(youtube_embed(&video))),
            Err(err) => {
                tracing::debug!(target: "folio::editor", url, "not a YouTube link");
                self.host.alert(INVALID_YOUTUBE_ALERT);
                Err(err)
            }
        }
    }
}

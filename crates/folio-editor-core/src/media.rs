//! Media insertion: picked file → upload → embed at the captured selection.
//!
//! Uploads are split into two synchronous phases around the asynchronous
//! transfer so the editor is never borrowed across an `.await`:
//!
//! 1. [`RichTextEditor::begin_upload`] snapshots the selection into a
//!    [`PendingUpload`].
//! 2. The caller runs the upload through an [`Uploader`].
//! 3. [`RichTextEditor::finish_upload`] restores that upload's own snapshot
//!    and inserts the embed, or alerts the user on failure.
//!
//! Several uploads may be in flight at once; each lands at its own snapshot
//! whatever order they finish in.

use std::fmt;
use std::future::Future;

use folio_common::{ApiClient, UploadError, UploadFile, join_url};
use web_time::Instant;

use crate::actions::EditorCommand;
use crate::editor::RichTextEditor;
use crate::embed::{MediaKind, image_embed, media_embed};
use crate::error::EditorError;
use crate::notify::ChangeListener;
use crate::platform::EditorHost;
use crate::selection::Bookmark;
use crate::types::SelectionRange;

/// Which picker a file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSlot {
    Image,
    /// Audio or video.
    Media,
}

impl UploadSlot {
    /// Label used in user-facing failure messages.
    pub fn label(self) -> &'static str {
        match self {
            UploadSlot::Image => "Image",
            UploadSlot::Media => "Video",
        }
    }
}

impl fmt::Display for UploadSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A successfully uploaded and embedded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub url: String,
    pub kind: MediaKind,
}

/// An upload that has been started but not yet applied to the document.
///
/// Dropping it abandons the upload without touching the document.
#[derive(Debug)]
pub struct PendingUpload {
    slot: UploadSlot,
    file: UploadFile,
    bookmark: Option<Bookmark>,
    started_at: Instant,
}

impl PendingUpload {
    pub fn slot(&self) -> UploadSlot {
        self.slot
    }

    pub fn file(&self) -> &UploadFile {
        &self.file
    }

    /// The selection captured when the upload started. The embed goes
    /// wherever this range ends up once the upload finishes.
    pub fn snapshot(&self) -> Option<&SelectionRange> {
        self.bookmark.as_ref().map(Bookmark::range)
    }
}

/// Something that can store a file and answer with its URL.
pub trait Uploader {
    fn upload(&self, file: &UploadFile) -> impl Future<Output = Result<String, UploadError>>;
}

impl Uploader for ApiClient {
    async fn upload(&self, file: &UploadFile) -> Result<String, UploadError> {
        ApiClient::upload(self, file).await
    }
}

/// Absolute URL for an upload result. Absolute answers are kept as they are.
pub fn resolve_asset_url(asset_base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//") {
        url.to_owned()
    } else {
        join_url(asset_base_url, url)
    }
}

impl<H: EditorHost, L: ChangeListener> RichTextEditor<H, L> {
    /// Start inserting a picked file. No file means the picker was
    /// dismissed, which is a silent no-op.
    pub fn begin_upload(&mut self, slot: UploadSlot, file: Option<UploadFile>) -> Option<PendingUpload> {
        let Some(file) = file else {
            tracing::debug!(target: "folio::media", %slot, "no file picked");
            return None;
        };
        let bookmark = self
            .tracker
            .capture(self.selection.as_ref())
            .or_else(|| self.tracker.saved().copied())
            .and_then(|range| Bookmark::capture(&self.doc, &range));
        tracing::info!(
            target: "folio::media",
            %slot,
            name = %file.name,
            content_type = %file.content_type,
            size = file.bytes.len(),
            "upload started"
        );
        Some(PendingUpload {
            slot,
            file,
            bookmark,
            started_at: Instant::now(),
        })
    }

    /// Apply the outcome of an upload.
    ///
    /// On failure the host is alerted and the document is left alone.
    pub fn finish_upload(
        &mut self,
        pending: PendingUpload,
        result: Result<String, UploadError>,
    ) -> Result<MediaReference, EditorError> {
        let elapsed_ms = pending.started_at.elapsed().as_millis() as u64;
        let url = match result {
            Ok(url) => url,
            Err(source) => {
                let err = EditorError::Upload {
                    slot: pending.slot,
                    source,
                };
                metrics::counter!("folio_uploads_total", "outcome" => "failed").increment(1);
                tracing::warn!(target: "folio::media", elapsed_ms, error = %err, "upload failed");
                self.host.alert(&err.to_string());
                return Err(err);
            }
        };

        let url = resolve_asset_url(&self.settings.asset_base_url, &url);
        let (kind, fragment) = match pending.slot {
            UploadSlot::Image => (MediaKind::Image, image_embed(&url, &pending.file.name)),
            UploadSlot::Media => {
                let kind = MediaKind::for_media(&pending.file.content_type);
                (kind, media_embed(&url, kind, &pending.file.content_type))
            }
        };

        self.restore_bookmark(pending.bookmark.as_ref());
        self.execute(EditorCommand::InsertHtml(fragment))?;
        metrics::counter!("folio_uploads_total", "outcome" => "ok").increment(1);
        tracing::info!(target: "folio::media", elapsed_ms, %url, ?kind, "media inserted");
        Ok(MediaReference { url, kind })
    }
}

/// Upload an image and embed it at the current selection.
///
/// Holds the editor for the whole upload; use the two-phase API directly
/// when several uploads should run at once.
pub async fn insert_image<H, L, U>(
    editor: &mut RichTextEditor<H, L>,
    uploader: &U,
    file: Option<UploadFile>,
) -> Result<Option<MediaReference>, EditorError>
where
    H: EditorHost,
    L: ChangeListener,
    U: Uploader,
{
    upload_and_insert(editor, uploader, UploadSlot::Image, file).await
}

/// Upload an audio or video file and embed a player for it.
pub async fn insert_media<H, L, U>(
    editor: &mut RichTextEditor<H, L>,
    uploader: &U,
    file: Option<UploadFile>,
) -> Result<Option<MediaReference>, EditorError>
where
    H: EditorHost,
    L: ChangeListener,
    U: Uploader,
{
    upload_and_insert(editor, uploader, UploadSlot::Media, file).await
}

async fn upload_and_insert<H, L, U>(
    editor: &mut RichTextEditor<H, L>,
    uploader: &U,
    slot: UploadSlot,
    file: Option<UploadFile>,
) -> Result<Option<MediaReference>, EditorError>
where
    H: EditorHost,
    L: ChangeListener,
    U: Uploader,
{
    let Some(pending) = editor.begin_upload(slot, file) else {
        return Ok(None);
    };
    let result = uploader.upload(pending.file()).await;
    editor.finish_upload(pending, result).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::ScriptedHost;
    use crate::toolbar::{EditorSettings, ToolbarControl};
    use crate::types::Position;
    use folio_common::parse_upload_response;
    use insta::assert_snapshot;

    /// Answers like the real endpoint would, after yielding once.
    struct FakeUploader;

    impl Uploader for FakeUploader {
        async fn upload(&self, file: &UploadFile) -> Result<String, UploadError> {
            tokio::task::yield_now().await;
            if file.name.starts_with("fail") {
                parse_upload_response(500, br#"{"error":"disk full"}"#)
            } else {
                parse_upload_response(200, format!(r#"{{"url":"uploads/{}"}}"#, file.name).as_bytes())
            }
        }
    }

    fn editor(initial: &str) -> RichTextEditor<ScriptedHost, Vec<String>> {
        let mut editor = RichTextEditor::new(ScriptedHost::default(), Vec::<String>::new())
            .with_settings(EditorSettings {
                asset_base_url: "http://cdn.test/".into(),
                ..EditorSettings::default()
            });
        editor.seed(initial);
        editor
    }

    fn png(name: &str) -> UploadFile {
        UploadFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    #[test]
    fn test_resolve_asset_url() {
        assert_eq!(
            resolve_asset_url("http://localhost:3001/", "uploads/a.png"),
            "http://localhost:3001/uploads/a.png"
        );
        assert_eq!(
            resolve_asset_url("http://localhost:3001/", "https://cdn.io/a.png"),
            "https://cdn.io/a.png"
        );
        assert_eq!(resolve_asset_url("", "uploads/a.png"), "uploads/a.png");
    }

    #[test]
    fn test_no_file_is_silent_noop() {
        let mut ed = editor("<p>a</p>");
        assert!(ed.begin_upload(UploadSlot::Image, None).is_none());
        assert_eq!(ed.revision(), 0);
        assert!(ed.host().alerts.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_image_inserted_at_caret() {
        let mut ed = editor("<p>hello world</p>");
        ed.select_text(5, 5);
        let inserted = insert_image(&mut ed, &FakeUploader, Some(png("cat.png")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inserted.url, "http://cdn.test/uploads/cat.png");
        assert_eq!(inserted.kind, MediaKind::Image);
        assert_snapshot!(ed.to_html(), @r#"<p>hello<img src="http://cdn.test/uploads/cat.png" style="max-width: 100%; height: auto; display: block; margin: 10px 0;" alt="cat.png"> world</p>"#);
        assert_eq!(ed.revision(), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_leaves_document_unchanged() {
        let mut ed = editor("<p>hello</p>");
        ed.select_text(2, 2);
        let err = insert_image(&mut ed, &FakeUploader, Some(png("fail.png")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert!(matches!(err, EditorError::Upload { slot: UploadSlot::Image, .. }));
        assert_eq!(ed.to_html(), "<p>hello</p>");
        assert_eq!(ed.revision(), 0);
        assert_eq!(
            ed.host().alerts.borrow().as_slice(),
            ["Image Upload Failed: disk full"]
        );
    }

    #[tokio::test]
    async fn test_media_failure_uses_video_label() {
        let mut ed = editor("<p>hello</p>");
        let file = UploadFile::new("fail.mp3", "audio/mpeg", vec![1]);
        insert_media(&mut ed, &FakeUploader, Some(file))
            .await
            .unwrap_err();
        assert_eq!(
            ed.host().alerts.borrow().as_slice(),
            ["Video Upload Failed: disk full"]
        );
    }

    #[tokio::test]
    async fn test_audio_gets_audio_player() {
        let mut ed = editor("<p>song</p>");
        ed.select_text(4, 4);
        let file = UploadFile::new("a.mp3", "audio/mpeg", vec![1]);
        let inserted = insert_media(&mut ed, &FakeUploader, Some(file))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inserted.kind, MediaKind::Audio);
        assert_snapshot!(ed.to_html(), @r#"<p>song</p><audio controls="" style="width: 100%; margin: 10px 0;"><source src="http://cdn.test/uploads/a.mp3" type="audio/mpeg"></audio><p><br></p>"#);
    }

    #[tokio::test]
    async fn test_overlapping_uploads_land_at_their_own_snapshots() {
        let mut ed = editor("<p>first</p><p>second</p>");

        // The file picker label takes focus; the snapshot is taken on pointer-down.
        let first = ed.document().text_nodes()[0];
        ed.select(SelectionRange::caret(Position::new(first, 5)));
        ed.toolbar_pointer_down(ToolbarControl::Label);
        let image = ed.begin_upload(UploadSlot::Image, Some(png("a.png"))).unwrap();

        ed.select_text(11, 11);
        let video = ed
            .begin_upload(
                UploadSlot::Media,
                Some(UploadFile::new("clip.mp4", "video/mp4", vec![0])),
            )
            .unwrap();
        assert_ne!(image.snapshot(), video.snapshot());

        let (image_result, video_result) = tokio::join!(
            FakeUploader.upload(image.file()),
            FakeUploader.upload(video.file())
        );

        // Video completes first, image second.
        ed.finish_upload(video, video_result).unwrap();
        ed.finish_upload(image, image_result).unwrap();

        let html = ed.to_html();
        assert!(html.starts_with(r#"<p>first<img src="http://cdn.test/uploads/a.png""#), "{html}");
        assert!(html.contains(r#"<p>second</p><video controls="""#), "{html}");
        assert!(html.ends_with("</video><p><br></p>"), "{html}");
        assert_eq!(ed.revision(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_uploads_in_one_paragraph() {
        let mut ed = editor("<p>hello world</p>");
        ed.select_text(8, 8);
        let late = ed.begin_upload(UploadSlot::Image, Some(png("a.png"))).unwrap();
        ed.select_text(2, 2);
        let early = ed.begin_upload(UploadSlot::Image, Some(png("b.png"))).unwrap();

        let (late_result, early_result) = tokio::join!(
            FakeUploader.upload(late.file()),
            FakeUploader.upload(early.file())
        );

        // The earlier caret's insert splits the text node the later one points into.
        ed.finish_upload(early, early_result).unwrap();
        ed.finish_upload(late, late_result).unwrap();

        assert_snapshot!(ed.to_html(), @r#"<p>he<img src="http://cdn.test/uploads/b.png" style="max-width: 100%; height: auto; display: block; margin: 10px 0;" alt="b.png">llo wo<img src="http://cdn.test/uploads/a.png" style="max-width: 100%; height: auto; display: block; margin: 10px 0;" alt="a.png">rld</p>"#);
        assert!(ed.host().alerts.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_uploads_between_blocks() {
        let mut ed = editor("<p>one</p><p>two</p>");
        let root = ed.document().root();

        ed.select(SelectionRange::caret(Position::new(root, 2)));
        let image = ed.begin_upload(UploadSlot::Image, Some(png("a.png"))).unwrap();
        ed.select(SelectionRange::caret(Position::new(root, 0)));
        let video = ed
            .begin_upload(
                UploadSlot::Media,
                Some(UploadFile::new("clip.mp4", "video/mp4", vec![0])),
            )
            .unwrap();

        let (image_result, video_result) = tokio::join!(
            FakeUploader.upload(image.file()),
            FakeUploader.upload(video.file())
        );
        ed.finish_upload(video, video_result).unwrap();
        ed.finish_upload(image, image_result).unwrap();

        let html = ed.to_html();
        assert!(html.starts_with("<video"), "{html}");
        assert!(
            html.ends_with(r#"<p>two</p><img src="http://cdn.test/uploads/a.png" style="max-width: 100%; height: auto; display: block; margin: 10px 0;" alt="a.png">"#),
            "{html}"
        );
        assert_eq!(ed.revision(), 2);
    }

    #[tokio::test]
    async fn test_dropped_pending_upload_never_mutates() {
        let mut ed = editor("<p>a</p>");
        let pending = ed.begin_upload(UploadSlot::Image, Some(png("a.png")));
        drop(pending);
        assert_eq!(ed.to_html(), "<p>a</p>");
        assert_eq!(ed.revision(), 0);
    }
}

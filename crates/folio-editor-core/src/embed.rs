//! Link classification and embed fragment builders.
//!
//! Everything here is pure: it turns URLs and upload results into
//! [`Fragment`]s that the executor inserts with `insertHTML` semantics.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::EditorError;
use crate::html::{Fragment, HtmlElement, HtmlNode};

/// Selected text that can become a link target without asking the user.
static AUTO_LINK_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"^(http|https)://[^\s"]+$"#).ok());

const MEDIA_STYLE: &str = "max-width: 100%; height: auto; display: block; margin: 10px 0;";
const AUDIO_STYLE: &str = "width: 100%; margin: 10px 0;";
const YOUTUBE_CONTAINER_STYLE: &str =
    "position: relative; padding-bottom: 56.25%; height: 0; margin: 10px 0;";
const YOUTUBE_FRAME_STYLE: &str =
    "position: absolute; top: 0; left: 0; width: 100%; height: 100%;";

/// What a piece of user text points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    YouTube(YouTubeVideo),
    Web(String),
    NotALink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YouTubeVideo {
    pub id: String,
}

impl YouTubeVideo {
    pub fn embed_url(&self) -> String {
        format!("https://www.youtube.com/embed/{}", self.id)
    }
}

/// Kind of an uploaded asset, decided from its declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    /// Kind of a file picked in the audio/video slot.
    pub fn for_media(content_type: &str) -> Self {
        if content_type.starts_with("audio/") {
            MediaKind::Audio
        } else {
            MediaKind::Video
        }
    }
}

pub fn is_auto_link(text: &str) -> bool {
    AUTO_LINK_RE.as_ref().is_some_and(|re| re.is_match(text))
}

pub fn classify_link(text: &str) -> LinkKind {
    let text = text.trim();
    if let Ok(video) = resolve_youtube(text) {
        return LinkKind::YouTube(video);
    }
    if is_auto_link(text) {
        return LinkKind::Web(text.to_owned());
    }
    LinkKind::NotALink
}

/// Extract the video id from a YouTube watch or short link.
pub fn resolve_youtube(url: &str) -> Result<YouTubeVideo, EditorError> {
    fn id_part(rest: &str) -> &str {
        rest.split(['?', '&', '#']).next().unwrap_or_default()
    }
    let candidate = if url.contains("youtube.com/watch") {
        url.split_once("v=").map(|(_, rest)| id_part(rest))
    } else {
        url.split_once("youtu.be/").map(|(_, rest)| id_part(rest))
    };

    match candidate {
        Some(id)
            if !id.is_empty()
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            Ok(YouTubeVideo { id: id.to_owned() })
        }
        _ => Err(EditorError::InvalidYouTubeUrl(url.to_owned())),
    }
}

fn trailing_paragraph() -> HtmlNode {
    HtmlElement::new("p")
        .with_child(HtmlElement::new("br"))
        .into()
}

pub fn youtube_embed(video: &YouTubeVideo) -> Fragment {
    let frame = HtmlElement::new("iframe")
        .with_attr("src", video.embed_url())
        .with_attr("style", YOUTUBE_FRAME_STYLE)
        .with_attr("frameborder", "0")
        .with_attr("allowfullscreen", "");
    let container = HtmlElement::new("div")
        .with_attr("class", "youtube-container")
        .with_attr("style", YOUTUBE_CONTAINER_STYLE)
        .with_child(frame);
    Fragment::new(vec![container.into(), trailing_paragraph()])
}

pub fn image_embed(url: &str, alt: &str) -> Fragment {
    let img = HtmlElement::new("img")
        .with_attr("src", url)
        .with_attr("style", MEDIA_STYLE)
        .with_attr("alt", alt);
    Fragment::new(vec![img.into()])
}

/// `<audio>`/`<video>` player for an uploaded file, followed by an empty
/// paragraph so typing can continue below it.
pub fn media_embed(url: &str, kind: MediaKind, content_type: &str) -> Fragment {
    let (tag, style) = match kind {
        MediaKind::Audio => ("audio", AUDIO_STYLE),
        MediaKind::Video | MediaKind::Image => ("video", MEDIA_STYLE),
    };
    let player = HtmlElement::new(tag)
        .with_attr("controls", "")
        .with_attr("style", style)
        .with_child(
            HtmlElement::new("source")
                .with_attr("src", url)
                .with_attr("type", content_type),
        );
    Fragment::new(vec![player.into(), trailing_paragraph()])
}

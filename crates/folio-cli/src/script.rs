//! Line-based editor scripts.
//!
//! Each non-empty line not starting with `#` is one step:
//!
//! ```text
//! select 0 5
//! bold
//! color #ff0000
//! caret 11
//! image ./cat.png
//! ```
//!
//! Offsets are character offsets into the document's text content. Toolbar
//! steps go through the same pointer-down/restore sequence a user click would.

use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;

use folio_common::{UploadError, UploadFile};
use folio_editor_core::{
    ChangeListener, EditorCommand, EditorError, EditorHost, Fragment, RichTextEditor, Rgb,
    ToolbarControl, Uploader, media,
};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ScriptError {
    #[error("line {line}: {message}")]
    #[diagnostic(
        code(folio::script::parse),
        help("steps: select A B, caret N, bold, italic, underline, color #hex, background #hex, font NAME, size N, paragraph, link [URL], html MARKUP, youtube URL, image PATH, media PATH")
    )]
    Parse { line: usize, message: String },

    #[error("line {line}: `{step}` failed")]
    #[diagnostic(code(folio::script::step))]
    Step {
        line: usize,
        step: String,
        #[source]
        #[diagnostic_source]
        source: EditorError,
    },

    #[error("line {line}: could not read file")]
    #[diagnostic(code(folio::script::file))]
    File {
        line: usize,
        #[source]
        #[diagnostic_source]
        source: UploadError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Select(usize, usize),
    Caret(usize),
    Bold,
    Italic,
    Underline,
    TextColor(Rgb),
    Background(Rgb),
    Font(String),
    Size(u32),
    Paragraph,
    Link(Option<String>),
    Html(String),
    YouTube(String),
    Image(PathBuf),
    Media(PathBuf),
}

/// A parsed step with its 1-based source line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    pub line: usize,
    pub text: String,
    pub step: Step,
}

pub fn parse(script: &str) -> Result<Vec<ScriptLine>, ScriptError> {
    let mut steps = Vec::new();
    for (idx, raw) in script.lines().enumerate() {
        let line = idx + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let (word, rest) = match text.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (text, ""),
        };
        let err = |message: String| ScriptError::Parse { line, message };
        let number = |s: &str| {
            s.parse::<usize>()
                .map_err(|_| err(format!("expected a number, got `{s}`")))
        };
        let required = |what: &str| {
            if rest.is_empty() {
                Err(err(format!("`{word}` needs {what}")))
            } else {
                Ok(rest.to_owned())
            }
        };
        let color = || {
            required("a color")?
                .parse::<Rgb>()
                .map_err(|_| err(format!("invalid color `{rest}`")))
        };

        let step = match word.to_ascii_lowercase().as_str() {
            "select" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(a), Some(b), None) => Step::Select(number(a)?, number(b)?),
                    _ => return Err(err("`select` needs two offsets".into())),
                }
            }
            "caret" => Step::Caret(number(&required("an offset")?)?),
            "bold" => Step::Bold,
            "italic" => Step::Italic,
            "underline" => Step::Underline,
            "paragraph" => Step::Paragraph,
            "color" => Step::TextColor(color()?),
            "background" => Step::Background(color()?),
            "font" => Step::Font(required("a font family")?),
            "size" => {
                let value = required("a size")?;
                let px = value
                    .trim_end_matches("px")
                    .parse::<u32>()
                    .map_err(|_| err(format!("invalid size `{value}`")))?;
                Step::Size(px)
            }
            "link" => Step::Link((!rest.is_empty()).then(|| rest.to_owned())),
            "html" => Step::Html(required("markup")?),
            "youtube" => Step::YouTube(required("a URL")?),
            "image" => Step::Image(PathBuf::from(required("a path")?)),
            "media" => Step::Media(PathBuf::from(required("a path")?)),
            other => return Err(err(format!("unknown step `{other}`"))),
        };
        steps.push(ScriptLine {
            line,
            text: text.to_owned(),
            step,
        });
    }
    Ok(steps)
}

/// Run parsed steps against an editor, stopping at the first failure.
pub async fn run<H, L, U>(
    editor: &mut RichTextEditor<H, L>,
    uploader: &U,
    steps: &[ScriptLine],
) -> Result<(), ScriptError>
where
    H: EditorHost,
    L: ChangeListener,
    U: Uploader,
{
    for script_line in steps {
        let line = script_line.line;
        tracing::debug!(line, step = %script_line.text, "running step");
        let result = match &script_line.step {
            Step::Select(a, b) => {
                editor.select_text(*a, *b);
                Ok(())
            }
            Step::Caret(n) => {
                editor.select_text(*n, *n);
                Ok(())
            }
            Step::Bold => button(editor, |ed| ed.bold()),
            Step::Italic => button(editor, |ed| ed.italic()),
            Step::Underline => button(editor, |ed| ed.underline()),
            Step::Paragraph => button(editor, |ed| ed.insert_paragraph()),
            Step::TextColor(color) => {
                editor.toolbar_pointer_down(ToolbarControl::Input);
                editor.set_text_color(*color).map(drop)
            }
            Step::Background(color) => {
                editor.toolbar_pointer_down(ToolbarControl::Input);
                editor.set_background_color(*color).map(drop)
            }
            Step::Font(family) => {
                editor.toolbar_pointer_down(ToolbarControl::Select);
                editor.set_font_family(family).map(drop)
            }
            Step::Size(px) => {
                editor.toolbar_pointer_down(ToolbarControl::Select);
                editor.set_font_size(*px).map(drop)
            }
            Step::Link(url) => button(editor, |ed| ed.execute(EditorCommand::CreateLink(url.clone()))),
            Step::Html(markup) => editor
                .execute(EditorCommand::InsertHtml(Fragment::parse(markup)))
                .map(drop),
            Step::YouTube(url) => button(editor, |ed| ed.insert_youtube_url(url)),
            Step::Image(path) | Step::Media(path) => {
                let file = UploadFile::from_path(path)
                    .map_err(|source| ScriptError::File { line, source })?;
                editor.toolbar_pointer_down(ToolbarControl::Label);
                let inserted = if matches!(script_line.step, Step::Image(_)) {
                    media::insert_image(editor, uploader, Some(file)).await
                } else {
                    media::insert_media(editor, uploader, Some(file)).await
                };
                inserted.map(|reference| {
                    if let Some(reference) = reference {
                        tracing::info!(line, url = %reference.url, "embedded upload");
                    }
                })
            }
        };
        result.map_err(|source| ScriptError::Step {
            line,
            step: script_line.text.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Toolbar button: pointer-down keeps editor focus, then the command runs.
fn button<H, L>(
    editor: &mut RichTextEditor<H, L>,
    command: impl FnOnce(&mut RichTextEditor<H, L>) -> Result<bool, EditorError>,
) -> Result<(), EditorError>
where
    H: EditorHost,
    L: ChangeListener,
{
    editor.toolbar_pointer_down(ToolbarControl::Button);
    command(editor).map(drop)
}

/// Terminal host: prompts read a line from stdin when it is a terminal,
/// alerts go to stderr.
#[derive(Debug, Clone, Copy)]
pub struct TerminalHost {
    interactive: bool,
}

impl TerminalHost {
    pub fn new() -> Self {
        Self {
            interactive: std::io::stdin().is_terminal(),
        }
    }
}

impl Default for TerminalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorHost for TerminalHost {
    fn prompt(&self, message: &str, default: &str) -> Option<String> {
        if !self.interactive {
            tracing::debug!(prompt = message, "stdin is not a terminal, prompt cancelled");
            return None;
        }
        eprint!("{message} [{default}] ");
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => None,
            Ok(_) => match answer.trim() {
                "" => Some(default.to_owned()),
                answer => Some(answer.to_owned()),
            },
        }
    }

    fn alert(&self, message: &str) {
        eprintln!("⚠ {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedUploader;

    impl Uploader for FixedUploader {
        async fn upload(&self, file: &UploadFile) -> Result<String, UploadError> {
            Ok(format!("uploads/{}", file.name))
        }
    }

    fn editor(html: &str) -> RichTextEditor {
        let mut editor = RichTextEditor::default();
        editor.seed(html);
        editor
    }

    #[test]
    fn test_parse_steps() {
        let steps = parse(
            "# heading\nselect 0 5\n\nbold\ncolor #f00\nsize 24px\nlink\nlink http://x.com\nfont Times New Roman\n",
        )
        .unwrap();
        let steps: Vec<Step> = steps.into_iter().map(|s| s.step).collect();
        assert_eq!(
            steps,
            vec![
                Step::Select(0, 5),
                Step::Bold,
                Step::TextColor(Rgb(0xff, 0, 0)),
                Step::Size(24),
                Step::Link(None),
                Step::Link(Some("http://x.com".into())),
                Step::Font("Times New Roman".into()),
            ]
        );
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = parse("bold\nselect 1\n").unwrap_err();
        assert_eq!(err.to_string(), "line 2: `select` needs two offsets");
        let err = parse("strike").unwrap_err();
        assert_eq!(err.to_string(), "line 1: unknown step `strike`");
        let err = parse("color blue").unwrap_err();
        assert_eq!(err.to_string(), "line 1: invalid color `blue`");
    }

    #[tokio::test]
    async fn test_run_formatting_script() {
        let mut ed = editor("<p>hello world</p>");
        let steps = parse("select 0 5\nbold\nselect 6 11\ncolor #00ff00\ncaret 11\nlink http://x.com").unwrap();
        run(&mut ed, &FixedUploader, &steps).await.unwrap();
        assert_eq!(
            ed.to_html(),
            r##"<p><b>hello</b> <font color="#00ff00">world<a href="http://x.com">http://x.com</a></font></p>"##
        );
        assert_eq!(ed.revision(), 3);
    }

    #[tokio::test]
    async fn test_invalid_youtube_stops_script() {
        let mut ed = editor("<p>a</p>");
        let steps = parse("youtube not a url\nbold").unwrap();
        let err = run(&mut ed, &FixedUploader, &steps).await.unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Step {
                line: 1,
                source: EditorError::InvalidYouTubeUrl(_),
                ..
            }
        ));
        assert_eq!(ed.to_html(), "<p>a</p>");
    }

    #[tokio::test]
    async fn test_missing_image_file() {
        let mut ed = editor("<p>a</p>");
        let steps = parse("image /nonexistent/cat.png").unwrap();
        let err = run(&mut ed, &FixedUploader, &steps).await.unwrap_err();
        assert!(matches!(err, ScriptError::File { line: 1, .. }));
        assert_eq!(ed.revision(), 0);
    }
}

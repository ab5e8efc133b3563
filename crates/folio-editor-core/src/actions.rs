//! Editor commands.
//!
//! `EditorCommand` is the closed set of formatting and insertion operations
//! the toolbar can issue. Hosts that still speak in command names (the
//! `execCommand` vocabulary) go through [`EditorCommand::parse`].

use smol_str::SmolStr;

use crate::error::EditorError;
use crate::html::Fragment;
use crate::style::Rgb;

/// Font sizes accepted by `fontSize`, in CSS pixels.
pub const FONT_SIZE_RANGE: std::ops::RangeInclusive<u32> = 1..=400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    Bold,
    Italic,
    Underline,
    /// Text color.
    ForeColor(Rgb),
    /// Background (highlight) color.
    HiliteColor(Rgb),
    FontName(SmolStr),
    /// Font size in pixels.
    FontSize(u32),
    InsertParagraph,
    /// Link the selection. Without a URL the selected text is tried first,
    /// then the user is prompted.
    CreateLink(Option<String>),
    InsertHtml(Fragment),
}

impl EditorCommand {
    /// Parse a command name and its value.
    ///
    /// Names match the `execCommand` spelling case-insensitively.
    pub fn parse(name: &str, value: Option<&str>) -> Result<Self, EditorError> {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        let command = match name.to_ascii_lowercase().as_str() {
            "bold" => EditorCommand::Bold,
            "italic" => EditorCommand::Italic,
            "underline" => EditorCommand::Underline,
            "forecolor" => EditorCommand::ForeColor(parse_color("foreColor", value)?),
            "hilitecolor" | "backcolor" => {
                EditorCommand::HiliteColor(parse_color("hiliteColor", value)?)
            }
            "fontname" => {
                let value = value.ok_or(EditorError::MissingValue {
                    command: "fontName",
                })?;
                if value.contains(['<', '>', '"', ';']) {
                    return Err(EditorError::InvalidValue {
                        command: "fontName",
                        value: value.to_owned(),
                    });
                }
                EditorCommand::FontName(value.into())
            }
            "fontsize" => {
                let value = value.ok_or(EditorError::MissingValue {
                    command: "fontSize",
                })?;
                EditorCommand::FontSize(parse_font_size(value)?)
            }
            "insertparagraph" => EditorCommand::InsertParagraph,
            "createlink" => EditorCommand::CreateLink(value.map(str::to_owned)),
            "inserthtml" => EditorCommand::InsertHtml(Fragment::parse(value.unwrap_or_default())),
            _ => return Err(EditorError::UnknownCommand(name.to_owned())),
        };
        Ok(command)
    }

    /// The `execCommand` name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            EditorCommand::Bold => "bold",
            EditorCommand::Italic => "italic",
            EditorCommand::Underline => "underline",
            EditorCommand::ForeColor(_) => "foreColor",
            EditorCommand::HiliteColor(_) => "hiliteColor",
            EditorCommand::FontName(_) => "fontName",
            EditorCommand::FontSize(_) => "fontSize",
            EditorCommand::InsertParagraph => "insertParagraph",
            EditorCommand::CreateLink(_) => "createLink",
            EditorCommand::InsertHtml(_) => "insertHTML",
        }
    }
}

fn parse_color(command: &'static str, value: Option<&str>) -> Result<Rgb, EditorError> {
    let value = value.ok_or(EditorError::MissingValue { command })?;
    value.parse().map_err(|_| EditorError::InvalidValue {
        command,
        value: value.to_owned(),
    })
}

/// Accepts `18` or `18px`.
pub fn parse_font_size(value: &str) -> Result<u32, EditorError> {
    let digits = value.trim().trim_end_matches("px").trim();
    digits
        .parse::<u32>()
        .ok()
        .filter(|px| FONT_SIZE_RANGE.contains(px))
        .ok_or_else(|| EditorError::InvalidValue {
            command: "fontSize",
            value: value.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_case_insensitively() {
        assert_eq!(EditorCommand::parse("Bold", None).unwrap(), EditorCommand::Bold);
        assert_eq!(
            EditorCommand::parse("foreColor", Some("#FF0000")).unwrap(),
            EditorCommand::ForeColor(Rgb(255, 0, 0))
        );
        assert_eq!(
            EditorCommand::parse("fontSize", Some("18px")).unwrap(),
            EditorCommand::FontSize(18)
        );
        assert_eq!(
            EditorCommand::parse("createLink", Some(" ")).unwrap(),
            EditorCommand::CreateLink(None)
        );
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(matches!(
            EditorCommand::parse("strikeThrough", None),
            Err(EditorError::UnknownCommand(_))
        ));
        assert!(matches!(
            EditorCommand::parse("foreColor", None),
            Err(EditorError::MissingValue { command: "foreColor" })
        ));
        assert!(matches!(
            EditorCommand::parse("fontSize", Some("0")),
            Err(EditorError::InvalidValue { .. })
        ));
        assert!(matches!(
            EditorCommand::parse("fontName", Some("x\" onclick=\"y")),
            Err(EditorError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_names_roundtrip() {
        for command in [
            EditorCommand::Bold,
            EditorCommand::FontSize(12),
            EditorCommand::InsertHtml(Fragment::parse("<b>x</b>")),
        ] {
            let value = match &command {
                EditorCommand::FontSize(px) => Some(px.to_string()),
                EditorCommand::InsertHtml(f) => Some(f.to_html()),
                _ => None,
            };
            assert_eq!(
                EditorCommand::parse(command.name(), value.as_deref()).unwrap(),
                command
            );
        }
    }
}

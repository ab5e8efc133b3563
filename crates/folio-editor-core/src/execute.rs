//! Command execution on the document tree.
//!
//! This module provides `execute_command`, which applies an [`EditorCommand`]
//! to a [`Document`] at a given selection. Formatting commands work on the
//! text runs covered by the selection and re-resolve the selection onto the
//! same characters afterwards; insertion commands delete the selected content
//! first and leave a caret after what they inserted.

use crate::actions::EditorCommand;
use crate::dom::{Document, NodeId};
use crate::embed::{LinkKind, classify_link};
use crate::error::EditorError;
use crate::html::{self, Fragment, HtmlElement, HtmlNode};
use crate::platform::EditorHost;
use crate::style::Rgb;
use crate::types::{Position, SelectionRange};

/// Size used to mark runs during the font-size rewrite.
pub const FONT_SIZE_SENTINEL: &str = "7";

pub const LINK_PROMPT: &str = "Enter Link URL:";
pub const LINK_PROMPT_DEFAULT: &str = "http://";

/// Outcome of a command that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Executed {
    /// The document changed; this is the new active selection.
    Applied(SelectionRange),
    /// The user backed out (e.g. cancelled a prompt). Nothing changed.
    Aborted,
}

/// Execute a command on a document.
///
/// This is the central dispatch point for all editor commands. A selection
/// that no longer resolves is treated as a caret at the end of the document.
pub fn execute_command<H: EditorHost + ?Sized>(
    doc: &mut Document,
    selection: &SelectionRange,
    command: &EditorCommand,
    host: &H,
) -> Result<Executed, EditorError> {
    let selection = if doc.is_valid_range(selection) {
        *selection
    } else {
        SelectionRange::caret(doc.end_position())
    };

    let applied = match command {
        EditorCommand::Bold => toggle_inline(doc, &selection, InlineStyle::Bold),
        EditorCommand::Italic => toggle_inline(doc, &selection, InlineStyle::Italic),
        EditorCommand::Underline => toggle_inline(doc, &selection, InlineStyle::Underline),
        EditorCommand::ForeColor(color) => apply_fore_color(doc, &selection, *color),
        EditorCommand::HiliteColor(color) => apply_hilite_color(doc, &selection, *color),
        EditorCommand::FontName(family) => apply_font_name(doc, &selection, family),
        EditorCommand::FontSize(px) => apply_font_size(doc, &selection, *px),
        EditorCommand::InsertParagraph => insert_paragraph(doc, &selection),
        EditorCommand::InsertHtml(fragment) => insert_fragment(doc, &selection, fragment),
        EditorCommand::CreateLink(url) => {
            return create_link(doc, &selection, url.as_deref(), host);
        }
    };
    Ok(Executed::Applied(applied))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineStyle {
    Bold,
    Italic,
    Underline,
}

impl InlineStyle {
    fn tag(self) -> &'static str {
        match self {
            InlineStyle::Bold => "b",
            InlineStyle::Italic => "i",
            InlineStyle::Underline => "u",
        }
    }

    fn matches(self, tag: &str) -> bool {
        match self {
            InlineStyle::Bold => matches!(tag, "b" | "strong"),
            InlineStyle::Italic => matches!(tag, "i" | "em"),
            InlineStyle::Underline => tag == "u",
        }
    }
}

/// Start and end of the selection as linear text offsets.
fn text_span(doc: &Document, selection: &SelectionRange) -> (usize, usize) {
    let end_of_doc = doc.total_text_len();
    match doc.ordered(selection) {
        Some((start, end)) => (
            doc.text_offset(&start).unwrap_or(end_of_doc),
            doc.text_offset(&end).unwrap_or(end_of_doc),
        ),
        None => (end_of_doc, end_of_doc),
    }
}

/// Delete the selected content and return the caret boundary.
fn collapse(doc: &mut Document, selection: &SelectionRange) -> Position {
    doc.delete_selection(selection)
        .unwrap_or_else(|| doc.end_position())
}

/// Normalize the blocks containing `nodes`.
fn normalize_around(doc: &mut Document, nodes: &[NodeId]) {
    let mut scopes: Vec<NodeId> = Vec::new();
    for &node in nodes {
        if !doc.contains(node) {
            continue;
        }
        let scope = doc.nearest_block(node).unwrap_or_else(|| doc.root());
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }
    for scope in scopes {
        if doc.contains(scope) {
            doc.normalize(scope);
        }
    }
}

fn toggle_inline(doc: &mut Document, selection: &SelectionRange, style: InlineStyle) -> SelectionRange {
    let (start, end) = text_span(doc, selection);
    let runs = doc.isolate_text_range(start, end);
    if runs.is_empty() {
        return *selection;
    }

    let formatted = |doc: &Document, run: NodeId| {
        doc.inline_ancestor(run, |d, a| d.tag(a).is_some_and(|t| style.matches(t)))
    };

    if runs.iter().all(|&run| formatted(doc, run).is_some()) {
        for &run in &runs {
            while let Some(ancestor) = formatted(doc, run) {
                doc.isolate(run, ancestor);
                doc.unwrap(ancestor);
            }
        }
    } else {
        for &run in &runs {
            if formatted(doc, run).is_none() {
                let wrapper = doc.create_element(style.tag(), &[]);
                doc.wrap(run, wrapper);
            }
        }
    }

    normalize_around(doc, &runs);
    doc.range_at(start, end)
}

/// Give every run an enclosing `tag` element and let `set` style it.
///
/// An inline ancestor that already carries this kind of styling is split
/// off and reused, so repeated color or font changes do not nest. A parent
/// `tag` element whose only child is the run is reused as is.
fn style_runs(
    doc: &mut Document,
    runs: &[NodeId],
    tag: &str,
    styled: impl Fn(&Document, NodeId) -> bool,
    set: impl Fn(&mut Document, NodeId),
) {
    for &run in runs {
        let existing =
            doc.inline_ancestor(run, |d, a| d.tag(a) == Some(tag) && styled(d, a));
        let target = match existing {
            Some(ancestor) => {
                doc.isolate(run, ancestor);
                ancestor
            }
            None => {
                let sole_parent = doc.parent(run).filter(|&p| {
                    p != doc.root() && doc.tag(p) == Some(tag) && doc.children(p).len() == 1
                });
                match sole_parent {
                    Some(parent) => parent,
                    None => {
                        let wrapper = doc.create_element(tag, &[]);
                        doc.wrap(run, wrapper);
                        wrapper
                    }
                }
            }
        };
        set(doc, target);
    }
}

fn apply_fore_color(doc: &mut Document, selection: &SelectionRange, color: Rgb) -> SelectionRange {
    let (start, end) = text_span(doc, selection);
    let runs = doc.isolate_text_range(start, end);
    let value = color.to_string();
    style_runs(
        doc,
        &runs,
        "font",
        |d, n| d.attr(n, "color").is_some(),
        |d, n| d.set_attr(n, "color", value.as_str()),
    );
    normalize_around(doc, &runs);
    doc.range_at(start, end)
}

fn apply_hilite_color(doc: &mut Document, selection: &SelectionRange, color: Rgb) -> SelectionRange {
    let (start, end) = text_span(doc, selection);
    let runs = doc.isolate_text_range(start, end);
    let value = color.to_string();
    style_runs(
        doc,
        &runs,
        "span",
        |d, n| d.style_property(n, "background-color").is_some(),
        |d, n| d.set_style_property(n, "background-color", &value),
    );
    normalize_around(doc, &runs);
    doc.range_at(start, end)
}

fn apply_font_name(doc: &mut Document, selection: &SelectionRange, family: &str) -> SelectionRange {
    let (start, end) = text_span(doc, selection);
    let runs = doc.isolate_text_range(start, end);
    style_runs(
        doc,
        &runs,
        "font",
        |d, n| d.attr(n, "face").is_some(),
        |d, n| d.set_attr(n, "face", family),
    );
    normalize_around(doc, &runs);
    doc.range_at(start, end)
}

/// Two-phase font size: mark the runs with the sentinel size, then rewrite
/// every sentinel element in the document into a pixel `font-size`.
fn apply_font_size(doc: &mut Document, selection: &SelectionRange, px: u32) -> SelectionRange {
    let (start, end) = text_span(doc, selection);
    let runs = doc.isolate_text_range(start, end);
    style_runs(
        doc,
        &runs,
        "font",
        |d, n| d.attr(n, "size").is_some() || d.style_property(n, "font-size").is_some(),
        |d, n| d.set_attr(n, "size", FONT_SIZE_SENTINEL),
    );

    let size = format!("{px}px");
    let marked = doc.find_elements(|d, n| {
        d.tag(n) == Some("font") && d.attr(n, "size") == Some(FONT_SIZE_SENTINEL)
    });
    for element in &marked {
        doc.remove_attr(*element, "size");
        doc.set_style_property(*element, "font-size", &size);
        doc.set_style_property(*element, "line-height", "1.4");
    }
    tracing::trace!(target: "folio::editor", px, rewritten = marked.len(), "font size applied");

    normalize_around(doc, &runs);
    doc.range_at(start, end)
}

/// Caret at the first editable point inside `node`.
fn first_caret(doc: &Document, node: NodeId) -> Position {
    let mut cur = node;
    loop {
        match doc.children(cur).first() {
            Some(&child) if doc.is_text(child) => return Position::new(child, 0),
            Some(&child) if doc.tag(child).is_some_and(|t| !html::is_void(t)) => cur = child,
            _ => return Position::new(cur, 0),
        }
    }
}

fn insert_paragraph(doc: &mut Document, selection: &SelectionRange) -> SelectionRange {
    let caret = collapse(doc, selection);
    match doc.split_block(&caret) {
        Some(right) => SelectionRange::caret(first_caret(doc, right)),
        None => SelectionRange::caret(caret),
    }
}

fn insert_fragment(doc: &mut Document, selection: &SelectionRange, fragment: &Fragment) -> SelectionRange {
    let caret = collapse(doc, selection);
    let after = doc
        .insert_nodes(&caret, fragment.nodes())
        .unwrap_or(caret);
    SelectionRange::caret(after)
}

fn create_link<H: EditorHost + ?Sized>(
    doc: &mut Document,
    selection: &SelectionRange,
    explicit: Option<&str>,
    host: &H,
) -> Result<Executed, EditorError> {
    let (start, end) = text_span(doc, selection);
    let url = match explicit {
        Some(url) => url.trim().to_owned(),
        None => {
            let selected = doc.slice_text(start, end);
            match classify_link(&selected) {
                LinkKind::Web(url) => url,
                LinkKind::YouTube(_) => selected.trim().to_owned(),
                LinkKind::NotALink => match host.prompt(LINK_PROMPT, LINK_PROMPT_DEFAULT) {
                    Some(answer) if !answer.trim().is_empty() => answer.trim().to_owned(),
                    _ => {
                        tracing::debug!(target: "folio::editor", "link prompt cancelled");
                        return Ok(Executed::Aborted);
                    }
                },
            }
        }
    };
    if !html::is_safe_url(&url) {
        return Err(EditorError::UnsafeUrl(url));
    }

    if start == end {
        let caret = collapse(doc, selection);
        let link: HtmlNode = HtmlElement::new("a")
            .with_attr("href", url.as_str())
            .with_child(HtmlNode::text(url.as_str()))
            .into();
        let after = doc.insert_nodes(&caret, &[link]).unwrap_or(caret);
        return Ok(Executed::Applied(SelectionRange::caret(after)));
    }

    let runs = doc.isolate_text_range(start, end);
    style_runs(
        doc,
        &runs,
        "a",
        |d, n| d.attr(n, "href").is_some(),
        |d, n| d.set_attr(n, "href", url.as_str()),
    );
    normalize_around(doc, &runs);
    Ok(Executed::Applied(doc.range_at(start, end)))
}

/// Insert typed text at the selection, replacing selected content.
pub fn insert_text(doc: &mut Document, selection: &SelectionRange, text: &str) -> SelectionRange {
    let selection = if doc.is_valid_range(selection) {
        *selection
    } else {
        SelectionRange::caret(doc.end_position())
    };
    let caret = collapse(doc, &selection);
    let start = doc.text_offset(&caret).unwrap_or_else(|| doc.total_text_len());
    let node = doc.create_text(text);
    doc.insert_child(caret.node, caret.offset, node);
    normalize_around(doc, &[node]);
    let end = start + text.chars().count();
    doc.range_at(end, end)
}

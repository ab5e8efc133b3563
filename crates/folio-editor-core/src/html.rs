//! HTML-like markup codec for post bodies.
//!
//! The parser is deliberately lenient: it never fails, drops comments and
//! doctype-ish declarations, ignores stray end tags and closes whatever is
//! still open at end of input. Everything it returns has already been through
//! [`sanitize`], so markup supplied by the hosting application or pasted as a
//! raw fragment cannot smuggle scripts into a post.

use smol_str::SmolStr;

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track",
    "wbr",
];

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Raw text elements whose content still has character references decoded.
const RCDATA_ELEMENTS: &[&str] = &["textarea", "title"];

/// Elements dropped with their whole subtree by the sanitizer.
const DROPPED_ELEMENTS: &[&str] = &["script", "style", "object", "embed", "applet", "frameset"];

/// Attributes that carry a URL and are checked against [`is_safe_url`].
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "poster", "xlink:href"];

/// Block-level elements. Inserting one of these splits the enclosing block.
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "figure", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table", "ul",
];

/// Elements that count as content even though they hold no text.
pub const MEDIA_ELEMENTS: &[&str] = &["img", "video", "audio", "iframe", "hr", "embed", "source"];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn is_block(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag)
}

/// A detached markup tree, used for parsing and for building embeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Text(String),
    Element(HtmlElement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlElement {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
    pub children: Vec<HtmlNode>,
}

impl HtmlElement {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: impl Into<HtmlNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl From<HtmlElement> for HtmlNode {
    fn from(el: HtmlElement) -> Self {
        HtmlNode::Element(el)
    }
}

impl HtmlNode {
    pub fn text(text: impl Into<String>) -> Self {
        HtmlNode::Text(text.into())
    }

    /// Whether this node or any descendant is a block-level element.
    pub fn contains_block(&self) -> bool {
        match self {
            HtmlNode::Text(_) => false,
            HtmlNode::Element(el) => {
                is_block(&el.tag) || el.children.iter().any(HtmlNode::contains_block)
            }
        }
    }
}

/// A sanitized list of top-level nodes ready to be inserted into a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    nodes: Vec<HtmlNode>,
}

impl Fragment {
    pub fn new(nodes: Vec<HtmlNode>) -> Self {
        Self {
            nodes: sanitize(nodes),
        }
    }

    pub fn parse(markup: &str) -> Self {
        Self {
            nodes: parse(markup),
        }
    }

    pub fn nodes(&self) -> &[HtmlNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_block(&self) -> bool {
        self.nodes.iter().any(HtmlNode::contains_block)
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(&mut out, node);
        }
        out
    }
}

// === Serialization ===

pub fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

pub fn escape_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

pub fn write_open_tag<'a>(
    out: &mut String,
    tag: &str,
    attrs: impl IntoIterator<Item = (&'a str, &'a str)>,
) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(out, value);
        out.push('"');
    }
    out.push('>');
}

pub fn write_close_tag(out: &mut String, tag: &str) {
    if !is_void(tag) {
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

pub fn write_node(out: &mut String, node: &HtmlNode) {
    match node {
        HtmlNode::Text(text) => escape_text(out, text),
        HtmlNode::Element(el) => {
            write_open_tag(
                out,
                &el.tag,
                el.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            );
            if !is_void(&el.tag) {
                for child in &el.children {
                    write_node(out, child);
                }
            }
            write_close_tag(out, &el.tag);
        }
    }
}

// === Parsing ===

/// Parse and sanitize markup.
pub fn parse(markup: &str) -> Vec<HtmlNode> {
    sanitize(parse_unsanitized(markup))
}

fn parse_unsanitized(markup: &str) -> Vec<HtmlNode> {
    let mut stack: Vec<HtmlElement> = vec![HtmlElement::new("#root")];
    let bytes = markup.as_bytes();
    let mut pos = 0;

    while pos < markup.len() {
        let rest = &markup[pos..];
        if rest.starts_with("<!--") {
            pos += rest[4..].find("-->").map(|i| i + 7).unwrap_or(rest.len());
        } else if rest.starts_with("</") {
            let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            let name = rest[2..end]
                .trim_end_matches('>')
                .trim()
                .to_ascii_lowercase();
            close_element(&mut stack, &name);
            pos += end;
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            pos += rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
        } else if rest.starts_with('<') && bytes.get(pos + 1).is_some_and(u8::is_ascii_alphabetic) {
            let (element, self_closing, consumed) = parse_start_tag(rest);
            pos += consumed;
            let tag = element.tag.clone();
            if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) && !self_closing {
                let (raw, consumed) = raw_text(&markup[pos..], &tag);
                pos += consumed;
                let mut element = element;
                if !raw.is_empty() {
                    let text = if RCDATA_ELEMENTS.contains(&tag.as_str()) {
                        decode_entities(raw)
                    } else {
                        raw.to_owned()
                    };
                    element.children.push(HtmlNode::Text(text));
                }
                push_node(&mut stack, HtmlNode::Element(element));
            } else if is_void(&tag) || self_closing {
                push_node(&mut stack, HtmlNode::Element(element));
            } else {
                stack.push(element);
            }
        } else {
            // Text runs to the next '<'. A '<' that opened nothing is literal.
            let skip = usize::from(rest.starts_with('<'));
            let end = rest[skip..]
                .find('<')
                .map(|i| i + skip)
                .unwrap_or(rest.len());
            push_text(&mut stack, &decode_entities(&rest[..end]));
            pos += end;
        }
    }

    while stack.len() > 1 {
        pop_into_parent(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn push_node(stack: &mut [HtmlElement], node: HtmlNode) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

fn push_text(stack: &mut [HtmlElement], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        match top.children.last_mut() {
            Some(HtmlNode::Text(prev)) => prev.push_str(text),
            _ => top.children.push(HtmlNode::Text(text.to_owned())),
        }
    }
}

fn pop_into_parent(stack: &mut Vec<HtmlElement>) {
    if stack.len() > 1
        && let Some(el) = stack.pop()
    {
        push_node(stack, HtmlNode::Element(el));
    }
}

fn close_element(stack: &mut Vec<HtmlElement>, name: &str) {
    // Index 0 is the synthetic root and never matches.
    let Some(idx) = stack.iter().rposition(|el| el.tag == name) else {
        return;
    };
    if idx == 0 {
        return;
    }
    while stack.len() > idx {
        pop_into_parent(stack);
    }
}

fn raw_text<'a>(rest: &'a str, tag: &str) -> (&'a str, usize) {
    let lower = rest.to_ascii_lowercase();
    let needle = format!("</{tag}");
    match lower.find(&needle) {
        Some(start) => {
            let end = rest[start..]
                .find('>')
                .map(|i| start + i + 1)
                .unwrap_or(rest.len());
            (&rest[..start], end)
        }
        None => (rest, rest.len()),
    }
}

/// Parse `<tag attr=...>` at the start of `input`.
///
/// Returns the element, whether it was written self-closing, and how many
/// bytes were consumed.
fn parse_start_tag(input: &str) -> (HtmlElement, bool, usize) {
    let mut chars = input.char_indices().peekable();
    chars.next(); // '<'

    let mut name = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '-' || c == ':' {
            name.push(c.to_ascii_lowercase());
            chars.next();
        } else {
            break;
        }
    }
    let mut element = HtmlElement::new(name);
    let mut self_closing = false;

    loop {
        while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
            chars.next();
        }
        let Some(&(i, c)) = chars.peek() else {
            return (element, self_closing, input.len());
        };
        match c {
            '>' => return (element, self_closing, i + 1),
            '/' => {
                chars.next();
                self_closing = chars.peek().is_some_and(|&(_, c)| c == '>');
            }
            _ => {
                let mut attr_name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() || c == '=' || c == '>' || c == '/' {
                        break;
                    }
                    attr_name.push(c.to_ascii_lowercase());
                    chars.next();
                }
                while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
                    chars.next();
                }
                let mut value = String::new();
                if chars.peek().is_some_and(|&(_, c)| c == '=') {
                    chars.next();
                    while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
                        chars.next();
                    }
                    match chars.peek().map(|&(_, c)| c) {
                        Some(quote @ ('"' | '\'')) => {
                            chars.next();
                            for (_, c) in chars.by_ref() {
                                if c == quote {
                                    break;
                                }
                                value.push(c);
                            }
                        }
                        _ => {
                            while let Some(&(_, c)) = chars.peek() {
                                if c.is_whitespace() || c == '>' {
                                    break;
                                }
                                value.push(c);
                                chars.next();
                            }
                        }
                    }
                }
                if !attr_name.is_empty() && element.attr(&attr_name).is_none() {
                    element
                        .attrs
                        .push((attr_name.into(), decode_entities(&value)));
                }
            }
        }
    }
}

/// Decode the character references the serializer produces, plus numeric ones.
/// Unknown references are kept verbatim.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_owned();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..].find(';').filter(|&i| i <= 10).and_then(|semi| {
            let name = &rest[1..semi + 1];
            let c = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => name.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            c.map(|c| (c, semi + 2))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// === Sanitizing ===

/// Strip script-capable content from parsed markup.
pub fn sanitize(nodes: Vec<HtmlNode>) -> Vec<HtmlNode> {
    nodes.into_iter().filter_map(sanitize_node).collect()
}

fn sanitize_node(node: HtmlNode) -> Option<HtmlNode> {
    match node {
        HtmlNode::Text(_) => Some(node),
        HtmlNode::Element(mut el) => {
            if DROPPED_ELEMENTS.contains(&el.tag.as_str()) || el.tag.is_empty() {
                tracing::debug!(target: "folio::html", tag = %el.tag, "dropping element");
                return None;
            }
            el.attrs.retain(|(name, value)| {
                if name.starts_with("on") || name == "srcdoc" {
                    return false;
                }
                !URL_ATTRIBUTES.contains(&name.as_str()) || is_safe_url(value)
            });
            el.children = sanitize(el.children);
            Some(HtmlNode::Element(el))
        }
    }
}

/// Whether a URL may be placed in a link or media attribute.
pub fn is_safe_url(url: &str) -> bool {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    !(compact.starts_with("javascript:")
        || compact.starts_with("vbscript:")
        || compact.starts_with("data:text"))
}

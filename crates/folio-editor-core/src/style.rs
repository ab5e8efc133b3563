//! Colors and inline `style` attribute helpers.

use std::fmt;
use std::str::FromStr;

/// An opaque sRGB color as chosen in the toolbar color pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);
}

impl fmt::Display for Rgb {
    /// Lowercase `#rrggbb`, the form color inputs report.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Accepts `#rgb`, `#rrggbb` (hash optional) and `rgb(r, g, b)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<u8> = inner
                .split(',')
                .map(|p| p.trim().parse::<u8>())
                .collect::<Result<_, _>>()
                .map_err(|_| format!("invalid color `{s}`"))?;
            return match parts.as_slice() {
                [r, g, b] => Ok(Rgb(*r, *g, *b)),
                _ => Err(format!("invalid color `{s}`")),
            };
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid color `{s}`"));
        }
        let channel = |range: std::ops::Range<usize>, scale: u8| {
            u8::from_str_radix(&hex[range], 16).map(|v| v * scale)
        };
        let parsed = match hex.len() {
            3 => (channel(0..1, 17), channel(1..2, 17), channel(2..3, 17)),
            6 => (channel(0..2, 1), channel(2..4, 1), channel(4..6, 1)),
            _ => return Err(format!("invalid color `{s}`")),
        };
        match parsed {
            (Ok(r), Ok(g), Ok(b)) => Ok(Rgb(r, g, b)),
            _ => Err(format!("invalid color `{s}`")),
        }
    }
}

/// Split a `style` attribute into `(property, value)` pairs.
///
/// Property names are lowercased; empty declarations are skipped.
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            (!prop.is_empty() && !value.is_empty()).then(|| (prop, value.to_owned()))
        })
        .collect()
}

pub fn format_declarations(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(p, v)| format!("{p}: {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn get_property(style: &str, prop: &str) -> Option<String> {
    parse_declarations(style)
        .into_iter()
        .find(|(p, _)| p == prop)
        .map(|(_, v)| v)
}

/// Set one property, replacing an existing declaration in place.
pub fn set_property(style: &str, prop: &str, value: &str) -> String {
    let mut decls = parse_declarations(style);
    match decls.iter_mut().find(|(p, _)| p == prop) {
        Some((_, v)) => *v = value.to_owned(),
        None => decls.push((prop.to_owned(), value.to_owned())),
    }
    format_declarations(&decls)
}

pub fn remove_property(style: &str, prop: &str) -> String {
    let mut decls = parse_declarations(style);
    decls.retain(|(p, _)| p != prop);
    format_declarations(&decls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_parse_and_format() {
        assert_eq!("#FF8800".parse::<Rgb>().unwrap(), Rgb(255, 136, 0));
        assert_eq!("f80".parse::<Rgb>().unwrap(), Rgb(255, 136, 0));
        assert_eq!("rgb(1, 2, 3)".parse::<Rgb>().unwrap(), Rgb(1, 2, 3));
        assert_eq!(Rgb(255, 136, 0).to_string(), "#ff8800");
        assert_eq!(Rgb::WHITE.to_string(), "#ffffff");
    }

    #[test]
    fn test_rgb_rejects_garbage() {
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("red".parse::<Rgb>().is_err());
        assert!("rgb(1,2)".parse::<Rgb>().is_err());
        assert!("#ééé".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_style_properties() {
        let style = "color: red; FONT-SIZE:12px;";
        assert_eq!(get_property(style, "font-size").as_deref(), Some("12px"));
        assert_eq!(
            set_property(style, "font-size", "18px"),
            "color: red; font-size: 18px"
        );
        assert_eq!(
            set_property("", "line-height", "1.4"),
            "line-height: 1.4"
        );
        assert_eq!(remove_property(style, "color"), "font-size: 12px");
    }
}

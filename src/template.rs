use std::fmt::{self, Write};

use crate::event::{Properties, PropertyValue, Scalar};

/// Largest alignment or precision a hole may carry; `std::fmt` rejects
/// runtime widths beyond this.
const MAX_WIDTH: usize = u16::MAX as usize;

/// Hook for culture-specific formatting of scalar values while rendering a
/// message title.
pub trait FormatProvider: Send + Sync {
    /// Name reported when the sink registers its installation.
    fn name(&self) -> &str;

    /// Format `value` using the optional format string of the hole.
    /// Returning `None` falls back to the default rendering.
    fn format(&self, value: &Scalar, format: Option<&str>) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Hole {
        raw: String,
        name: String,
        alignment: Option<isize>,
        format: Option<String>,
    },
}

/// Parsed message template with `{Name}` style holes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    text: String,
    tokens: Vec<Token>,
}

impl MessageTemplate {
    /// Tokenize `text`. Malformed holes are kept as literal text.
    pub fn parse(text: &str) -> Self {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(c) = rest.chars().next() {
            if rest.starts_with("{{") || rest.starts_with("}}") {
                literal.push(c);
                rest = &rest[2..];
                continue;
            }
            if c == '{' {
                if let Some(end) = rest.find('}') {
                    let raw = &rest[..=end];
                    if let Some(hole) = parse_hole(raw) {
                        if !literal.is_empty() {
                            tokens.push(Token::Text(std::mem::take(&mut literal)));
                        }
                        tokens.push(hole);
                        rest = &rest[end + 1..];
                        continue;
                    }
                }
            }
            literal.push(c);
            rest = &rest[c.len_utf8()..];
        }

        if !literal.is_empty() {
            tokens.push(Token::Text(literal));
        }

        MessageTemplate { text: text.to_string(), tokens }
    }

    /// A template that renders `text` verbatim.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = if text.is_empty() {
            Vec::new()
        } else {
            vec![Token::Text(text.clone())]
        };
        MessageTemplate { text, tokens }
    }

    /// Raw template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Names of the holes in order of appearance.
    pub fn hole_names(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Hole { name, .. } => Some(name.as_str()),
            Token::Text(_) => None,
        })
    }

    /// Render the template against `properties`. Holes without a matching
    /// property render their original text.
    pub fn render(&self, properties: &Properties, provider: Option<&dyn FormatProvider>) -> String {
        let mut out = String::with_capacity(self.text.len());
        for token in &self.tokens {
            match token {
                Token::Text(t) => out.push_str(t),
                Token::Hole { raw, name, alignment, format } => match properties.get(name) {
                    Some(value) => {
                        let rendered = render_value(value, format.as_deref(), provider);
                        out.push_str(&align(rendered, *alignment));
                    }
                    None => out.push_str(raw),
                },
            }
        }
        out
    }
}

impl fmt::Display for MessageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn parse_hole(raw: &str) -> Option<Token> {
    let inner = &raw[1..raw.len() - 1];
    let inner = inner.strip_prefix(['@', '$']).unwrap_or(inner);

    let (head, format) = match inner.split_once(':') {
        Some((h, f)) => (h, Some(f.to_string())),
        None => (inner, None),
    };
    let (name, alignment) = match head.split_once(',') {
        Some((n, a)) => (n, Some(a.trim().parse::<isize>().ok()?)),
        None => (head, None),
    };
    if alignment.map_or(false, |a| a.unsigned_abs() > MAX_WIDTH) {
        return None;
    }
    if format.as_deref().and_then(fixed_precision).map_or(false, |p| p > MAX_WIDTH) {
        return None;
    }

    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if !valid {
        return None;
    }

    Some(Token::Hole {
        raw: raw.to_string(),
        name: name.to_string(),
        alignment,
        format,
    })
}

fn render_value(value: &PropertyValue, format: Option<&str>, provider: Option<&dyn FormatProvider>) -> String {
    match value {
        PropertyValue::Scalar(scalar) => {
            if let Some(formatted) = provider.and_then(|p| p.format(scalar, format)) {
                return formatted;
            }
            default_scalar(scalar, format)
        }
        other => other.to_string(),
    }
}

fn default_scalar(scalar: &Scalar, format: Option<&str>) -> String {
    match (scalar, format) {
        (Scalar::Str(s), Some("l")) => s.clone(),
        (Scalar::Float(v), Some(f)) => fixed(*v, f).unwrap_or_else(|| scalar.to_string()),
        (Scalar::Int(v), Some(f)) => fixed(*v as f64, f).unwrap_or_else(|| scalar.to_string()),
        (Scalar::UInt(v), Some(f)) => fixed(*v as f64, f).unwrap_or_else(|| scalar.to_string()),
        (Scalar::DateTime(dt), Some(f)) if f.contains('%') => {
            let mut out = String::new();
            match write!(out, "{}", dt.format(f)) {
                Ok(()) => out,
                Err(_) => scalar.to_string(),
            }
        }
        _ => scalar.to_string(),
    }
}

// `F2` / `N2` style fixed-point formats.
fn fixed_precision(format: &str) -> Option<usize> {
    let digits = format.strip_prefix(['F', 'f', 'N', 'n'])?;
    Some(digits.parse::<usize>().unwrap_or(2))
}

fn fixed(value: f64, format: &str) -> Option<String> {
    let digits = fixed_precision(format)?.min(MAX_WIDTH);
    Some(format!("{:.*}", digits, value))
}

fn align(value: String, alignment: Option<isize>) -> String {
    match alignment {
        Some(width) if width > 0 => format!("{:>1$}", value, (width as usize).min(MAX_WIDTH)),
        Some(width) if width < 0 => format!("{:<1$}", value, width.unsigned_abs().min(MAX_WIDTH)),
        _ => value,
    }
}

//! Typed template variables
//!
//! Templates declare variables inline as `${kind: 'name'; default: 'value'}`.
//! The rewriter surfaces each one as a Marketo `<meta>` tag and reduces the
//! placeholder to `${name}`.

use super::patterns::Pattern;
use itertools::Itertools;
use std::fmt;

/// The three variable kinds Marketo understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// Free text, `mktoString`
    Text,
    /// Integer, `mktoNumber`
    Number,
    /// Hex color, `mktoColor`
    Color,
}

impl VariableKind {
    /// All kinds, in metadata insertion order
    pub const ALL: [VariableKind; 3] = [VariableKind::Text, VariableKind::Number, VariableKind::Color];

    /// Keyword used inside placeholders
    pub fn keyword(self) -> &'static str {
        match self {
            VariableKind::Text => "text",
            VariableKind::Number => "number",
            VariableKind::Color => "color",
        }
    }

    /// Class of the Marketo meta tag
    pub fn meta_class(self) -> &'static str {
        match self {
            VariableKind::Text => "mktoString",
            VariableKind::Number => "mktoNumber",
            VariableKind::Color => "mktoColor",
        }
    }

    fn pattern(self) -> Pattern {
        match self {
            VariableKind::Text => Pattern::TextVariable,
            VariableKind::Number => Pattern::NumberVariable,
            VariableKind::Color => Pattern::ColorVariable,
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One declared variable with its default value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Declared kind
    pub kind: VariableKind,
    /// Variable name, also used as the meta `id`
    pub name: String,
    /// Default value as written in the placeholder
    pub default: String,
}

impl Variable {
    /// The `<meta>` tag declaring this variable
    pub fn meta_tag(&self) -> String {
        format!(
            r#"<meta class="{class}" id="{name}" mktomodulescope="true" mktoname="{name}" default="{default}">"#,
            class = self.kind.meta_class(),
            name = self.name,
            default = self.default.replace('"', "&quot;"),
        )
    }
}

/// Variables of one kind, first declaration of each name wins
pub fn extract(html: &str, kind: VariableKind) -> Vec<Variable> {
    kind.pattern()
        .regex()
        .captures_iter(html)
        .map(|caps| Variable {
            kind,
            name: caps[1].to_string(),
            // Text placeholders put an unquoted default in group 3
            default: caps
                .get(2)
                .or_else(|| caps.get(3))
                .map_or_else(String::new, |m| m.as_str().to_string()),
        })
        .unique_by(|variable| variable.name.clone())
        .collect()
}

/// Variables of every kind: text, then number, then color
pub fn extract_all(html: &str) -> Vec<Variable> {
    VariableKind::ALL
        .into_iter()
        .flat_map(|kind| extract(html, kind))
        .collect()
}

/// Insert a meta tag for each variable right after the viewport meta line
///
/// Each tag is inserted at the same anchor, one after the other, so the last
/// variable ends up directly below the viewport tag.
///
/// # Returns
/// * `Some(String)` - The document with the tags inserted
/// * `None` - The document has no viewport meta tag
pub fn inject_metadata(html: &str, variables: &[Variable]) -> Option<String> {
    let anchor = Pattern::Viewport.regex().find(html)?;

    let mut output = String::with_capacity(html.len() + variables.len() * 96);
    output.push_str(&html[..anchor.end()]);
    for variable in variables.iter().rev() {
        output.push('\n');
        output.push_str(&variable.meta_tag());
    }
    output.push_str(&html[anchor.end()..]);

    Some(output)
}

/// Rewrite every placeholder to `${name}`
pub fn normalize_placeholders(html: &str) -> String {
    VariableKind::ALL
        .into_iter()
        .fold(html.to_string(), |doc, kind| {
            kind.pattern()
                .regex()
                .replace_all(&doc, |caps: &regex::Captures<'_>| format!("${{{}}}", &caps[1]))
                .into_owned()
        })
}

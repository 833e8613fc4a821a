//! Compiled pattern table for the Marketo rewriter
//!
//! Every pattern is tied to the layout the MJML compiler emits after the
//! 2-space beautifier has run: `<body>` at 2 spaces, the outer wrapper `<div>`
//! at 4, section-level Outlook comments and section divs at 6. The `regex`
//! crate has no lookaround, so "followed by" conditions are written as part of
//! the match and the rewriter only replaces the relevant capture group.

use regex::Regex;
use std::sync::LazyLock;

/// Named patterns used by the rewriter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Section div opening tag; group 1 is the class attribute
    SectionClass,
    /// `<img>` tag; group 1 is the tag itself
    Image,
    /// Opening tag of an `mj-text` block
    TextBlock,
    /// Outer wrapper div followed by a section-level comment; group 1 is the div
    ContainerOpen,
    /// Outer wrapper close followed by `</body>`; group 1 is the `</div>`
    ContainerClose,
    /// Outlook table open plus the first section div; groups are class and style
    TopSection,
    /// Outlook close/open between sections plus the next section div
    MiddleSection,
    /// Last Outlook close, four lines before `</body>`; group 1 is the comment
    BottomSection,
    /// Section div without a class; group 1 is the Outlook comment line above it
    UnnamedSection,
    /// The viewport meta tag line
    Viewport,
    /// `${text: 'name'; default: 'value'}`
    TextVariable,
    /// `${number: 'name'; default: 123}`
    NumberVariable,
    /// `${color: 'name'; default: '#fff'}`
    ColorVariable,
    /// A typed placeholder left over after normalization
    UnparsedVariable,
}

const PATTERN_COUNT: usize = 14;

struct PatternTable {
    compiled: [Regex; PATTERN_COUNT],
}

static PATTERNS: LazyLock<PatternTable> = LazyLock::new(|| PatternTable {
    compiled: Pattern::ALL.map(|pattern| {
        Regex::new(pattern.source()).expect("built-in rewriter pattern must compile")
    }),
});

impl Pattern {
    /// All patterns, in table order
    pub const ALL: [Pattern; PATTERN_COUNT] = [
        Pattern::SectionClass,
        Pattern::Image,
        Pattern::TextBlock,
        Pattern::ContainerOpen,
        Pattern::ContainerClose,
        Pattern::TopSection,
        Pattern::MiddleSection,
        Pattern::BottomSection,
        Pattern::UnnamedSection,
        Pattern::Viewport,
        Pattern::TextVariable,
        Pattern::NumberVariable,
        Pattern::ColorVariable,
        Pattern::UnparsedVariable,
    ];

    /// The compiled expression for this pattern
    pub fn regex(self) -> &'static Regex {
        &PATTERNS.compiled[self as usize]
    }

    /// Short name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Pattern::SectionClass => "section class",
            Pattern::Image => "image",
            Pattern::TextBlock => "text block",
            Pattern::ContainerOpen => "container open",
            Pattern::ContainerClose => "container close",
            Pattern::TopSection => "top section",
            Pattern::MiddleSection => "middle section",
            Pattern::BottomSection => "bottom section",
            Pattern::UnnamedSection => "unnamed section",
            Pattern::Viewport => "viewport meta",
            Pattern::TextVariable => "text variable",
            Pattern::NumberVariable => "number variable",
            Pattern::ColorVariable => "color variable",
            Pattern::UnparsedVariable => "unparsed variable",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Pattern::SectionClass => r#"(?m)^ {6}<div class="([^"]*)" style="[^"]*max-width:[^"]*">"#,
            Pattern::Image => r"(?m)^[ \t]*(<img\b[^>]*>)",
            Pattern::TextBlock => r#"<div style="font-family[^>]*>"#,
            Pattern::ContainerOpen => r"(?m)^ {4}(<div[^>]*>)\n {6}<!--",
            Pattern::ContainerClose => r"(?m)^ {4}(</div>)\n {2}</body>",
            Pattern::TopSection => concat!(
                r"(?m)^ {6}<!--\[if mso \| IE\]><table[^\n]*?<!\[endif\]-->\n",
                r#" {6}<div class="([^"]*)" (style="[^"]*max-width:[^"]*")>"#,
            ),
            Pattern::MiddleSection => concat!(
                r"(?m)^ {6}<!--\[if mso \| IE\]></td></tr></table><table[^\n]*?<!\[endif\]-->\n",
                r#" {6}<div class="([^"]*)" (style="[^"]*max-width:[^"]*")>"#,
            ),
            Pattern::BottomSection => concat!(
                r"(?m)^[ \t]*(<!--\[if mso \| IE\]></td></tr></table><!\[endif\]-->)\n",
                r"(?:[^\n]*\n){4}[ \t]*</body>",
            ),
            Pattern::UnnamedSection => concat!(
                r"(?m)^( {6}<!--\[if mso \| IE\]>(?:</td></tr></table>)?<table[^\n]*?<!\[endif\]-->\n)",
                r#" {6}<div style="[^"]*max-width:[^"]*">"#,
            ),
            Pattern::Viewport => r#"(?m)^[^\n]*<meta name="viewport"[^>]*>[^\n]*$"#,
            // A quoted default runs to the quote before the closing brace and may
            // contain apostrophes; group 3 holds an unquoted default
            Pattern::TextVariable => concat!(
                r"\$\{\s*text\s*:\s*'?([\w ]+?)'?\s*;\s*default\s*:\s*",
                r"(?:'([^}]*?)'|([^'}]*?))\s*\}",
            ),
            Pattern::NumberVariable => {
                r"\$\{\s*number\s*:\s*'?([\w ]+?)'?\s*;\s*default\s*:\s*'?([0-9]+)'?\s*\}"
            }
            Pattern::ColorVariable => concat!(
                r"\$\{\s*color\s*:\s*'?([\w ]+?)'?\s*;\s*default\s*:\s*",
                r"'?(#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{3}))'?\s*\}",
            ),
            Pattern::UnparsedVariable => r"\$\{\s*(?:text|number|color)\s*:[^}]*\}",
        }
    }
}

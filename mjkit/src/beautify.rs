//! HTML re-indentation
//!
//! The beautifier keeps the line structure of its input and only rewrites
//! leading whitespace, so every tag stays on the line the compiler (or the
//! Marketo rewriter) put it on. Indentation is derived purely from the trimmed
//! line contents, which makes the transform idempotent.

/// Default number of spaces per nesting level
pub const DEFAULT_INDENT_SIZE: usize = 2;

/// Elements that never have a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Line-preserving HTML re-indenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beautifier {
    /// Spaces per nesting level
    pub indent_size: usize,
}

impl Default for Beautifier {
    fn default() -> Self {
        Self {
            indent_size: DEFAULT_INDENT_SIZE,
        }
    }
}

/// Scanner state carried from one line to the next
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScanState {
    Text,
    Comment,
    Tag {
        kind: TagKind,
        name: String,
        quote: Option<u8>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    Declaration,
}

/// Depth change produced by a single line
#[derive(Debug, Default)]
struct LineEffect {
    /// Closing tags that appear before any other content on the line
    leading_closes: usize,
    /// Net change in element depth after the line
    delta: isize,
}

impl Beautifier {
    /// Create a beautifier with the given indent width
    pub fn new(indent_size: usize) -> Self {
        Self { indent_size }
    }

    /// Re-indent an HTML document
    ///
    /// # Parameters
    /// * `html` - HTML text, any indentation
    ///
    /// # Returns
    /// * The same lines, trimmed and indented by element depth. Runs of blank
    ///   lines collapse to one, leading/trailing blank lines are dropped and the
    ///   result ends with a single newline.
    pub fn beautify(&self, html: &str) -> String {
        let mut output = String::with_capacity(html.len() + html.len() / 4);
        let mut state = ScanState::Text;
        let mut depth: usize = 0;
        let mut pending_blank = false;

        for raw_line in html.lines() {
            let line = raw_line.trim();

            if line.is_empty() {
                pending_blank = !output.is_empty();
                continue;
            }

            if pending_blank {
                output.push('\n');
                pending_blank = false;
            }

            let effect = scan_line(line, &mut state);
            let indent = depth.saturating_sub(effect.leading_closes) * self.indent_size;

            output.push_str(&" ".repeat(indent));
            output.push_str(line);
            output.push('\n');

            depth = depth.saturating_add_signed(effect.delta);
        }

        output
    }
}

/// Convenience wrapper using the default indent width
pub fn beautify_html(html: &str) -> String {
    Beautifier::default().beautify(html)
}

/// Scan one trimmed line, updating the cross-line scanner state
fn scan_line(line: &str, state: &mut ScanState) -> LineEffect {
    let bytes = line.as_bytes();
    let mut effect = LineEffect::default();
    let mut leading = matches!(state, ScanState::Text);
    let mut i = 0;

    while i < bytes.len() {
        match state {
            ScanState::Comment => match line[i..].find("-->") {
                Some(offset) => {
                    i += offset + 3;
                    *state = ScanState::Text;
                }
                None => i = bytes.len(),
            },

            ScanState::Tag { kind, name, quote } => {
                let byte = bytes[i];
                match *quote {
                    Some(q) if byte == q => *quote = None,
                    Some(_) => {}
                    None if byte == b'"' || byte == b'\'' => *quote = Some(byte),
                    None if byte == b'>' => {
                        let self_closing = i > 0 && bytes[i - 1] == b'/';
                        match kind {
                            TagKind::Close => {
                                effect.delta -= 1;
                                if leading {
                                    effect.leading_closes += 1;
                                }
                            }
                            TagKind::Open => {
                                leading = false;
                                if !self_closing && !is_void(name) {
                                    effect.delta += 1;
                                }
                            }
                            TagKind::Declaration => leading = false,
                        }
                        *state = ScanState::Text;
                    }
                    None => {}
                }
                i += 1;
            }

            ScanState::Text => {
                if bytes[i] != b'<' {
                    if !bytes[i].is_ascii_whitespace() {
                        leading = false;
                    }
                    i += 1;
                    continue;
                }

                let rest = &line[i..];
                if rest.starts_with("<!--") {
                    leading = false;
                    *state = ScanState::Comment;
                    i += 4;
                } else if rest.starts_with("<!") || rest.starts_with("<?") {
                    *state = ScanState::Tag {
                        kind: TagKind::Declaration,
                        name: String::new(),
                        quote: None,
                    };
                    i += 2;
                } else if let Some(name) = rest.strip_prefix("</").map(tag_name) {
                    i += 2 + name.len();
                    *state = ScanState::Tag {
                        kind: TagKind::Close,
                        name,
                        quote: None,
                    };
                } else {
                    let name = tag_name(&rest[1..]);
                    if name.is_empty() {
                        // A bare '<' in text
                        leading = false;
                        i += 1;
                    } else {
                        i += 1 + name.len();
                        *state = ScanState::Tag {
                            kind: TagKind::Open,
                            name,
                            quote: None,
                        };
                    }
                }
            }
        }
    }

    effect
}

/// Read the element name at the start of `s`, lowercased
fn tag_name(s: &str) -> String {
    s.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == ':')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_elements_are_indented() {
        let html = "<html>\n<body>\n<div>\n<p>Hi</p>\n</div>\n</body>\n</html>";
        let expected =
            "<html>\n  <body>\n    <div>\n      <p>Hi</p>\n    </div>\n  </body>\n</html>\n";
        assert_eq!(beautify_html(html), expected);
    }

    #[test]
    fn test_void_and_self_closing_tags_do_not_nest() {
        let html = "<head>\n<meta charset=\"utf-8\">\n<link rel=\"x\">\n<title></title>\n</head>\n<div>\n<img src=\"a.png\" />\n<br/>\n</div>";
        let out = beautify_html(html);
        assert!(out.contains("\n  <meta charset=\"utf-8\">\n  <link rel=\"x\">\n  <title></title>\n</head>\n"));
        assert!(out.contains("<div>\n  <img src=\"a.png\" />\n  <br/>\n</div>\n"));
    }

    #[test]
    fn test_comments_do_not_change_depth() {
        let html = "<div>\n<!--[if mso | IE]><table><tr><td><![endif]-->\n<span>x</span>\n</div>";
        let out = beautify_html(html);
        assert_eq!(
            out,
            "<div>\n  <!--[if mso | IE]><table><tr><td><![endif]-->\n  <span>x</span>\n</div>\n"
        );
    }

    #[test]
    fn test_multiline_comment_contents_are_ignored() {
        let html = "<head>\n<!--[if mso]>\n<noscript>\n<xml>\n<o:AllowPNG/>\n</xml>\n</noscript>\n<![endif]-->\n<title></title>\n</head>";
        let out = beautify_html(html);
        assert!(out.contains("\n  <title></title>\n</head>\n"));
        assert!(out.contains("\n  <noscript>\n  <xml>\n"));
    }

    #[test]
    fn test_leading_closing_tags_dedent_their_line() {
        let html = "<table>\n<tr>\n<td>\n</td></tr></table>\n<p>after</p>";
        let out = beautify_html(html);
        assert_eq!(
            out,
            "<table>\n  <tr>\n    <td>\n</td></tr></table>\n<p>after</p>\n"
        );
    }

    #[test]
    fn test_trailing_close_after_void_keeps_indent() {
        let html = "<td>\n<div class=\"mktoImg\">\n<img src=\"a.png\" /></div>\n</td>";
        let out = beautify_html(html);
        assert_eq!(
            out,
            "<td>\n  <div class=\"mktoImg\">\n    <img src=\"a.png\" /></div>\n</td>\n"
        );
    }

    #[test]
    fn test_quoted_angle_bracket_in_attribute() {
        let html = "<div title=\"a > b\">\n<span>x</span>\n</div>";
        assert_eq!(
            beautify_html(html),
            "<div title=\"a > b\">\n  <span>x</span>\n</div>\n"
        );
    }

    #[test]
    fn test_blank_lines_collapse() {
        let html = "\n\n<html>\n\n\n<head>\n</head>\n\n</html>\n\n";
        assert_eq!(beautify_html(html), "<html>\n\n  <head>\n  </head>\n\n</html>\n");
    }

    #[test]
    fn test_beautify_is_idempotent() {
        let html = "<!doctype html>\n<html>\n<head>\n<meta name=\"viewport\" content=\"width=device-width\">\n<style type=\"text/css\">\n#outlook a { padding:0; }\n</style>\n</head>\n<body>\n     <div>\n<!--[if mso | IE]><table><tr><td><![endif]-->\n  <div class=\"header\" style=\"max-width:600px;\">\n<img src=\"x\" />\n</div>\n</div>\n</body>\n</html>";
        let once = beautify_html(html);
        let twice = beautify_html(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_custom_indent_size() {
        let out = Beautifier::new(4).beautify("<div>\n<p>x</p>\n</div>");
        assert_eq!(out, "<div>\n    <p>x</p>\n</div>\n");
    }
}

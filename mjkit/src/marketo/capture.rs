//! Capture and replacement helpers
//!
//! Captures are taken from the original document; replacement sites are found
//! again in the document as it is being rewritten. The two lists are paired by
//! index and must have the same length.

use super::error::RewriteError;
use super::patterns::Pattern;
use std::ops::Range;

/// Opening of the wrapper the rewriter puts around images
const IMAGE_WRAPPER_OPEN: &str = r#"<div class="mktoImg""#;

/// One occurrence of a pattern in the current document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    /// Byte range that a replacement overwrites
    pub range: Range<usize>,
    /// Capture groups 1.. as owned strings (empty string for unmatched groups)
    pub groups: Vec<String>,
}

/// How the sites of a pattern are rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// Rewrite only the first site
    Once(String),
    /// Rewrite site `i` with value `i`
    Sequence(Vec<String>),
}

/// Class attributes of the top-level section divs, in document order
pub fn section_classes(html: &str) -> Vec<String> {
    Pattern::SectionClass
        .regex()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|class| class.as_str())
        .filter(|class| !class.starts_with("mj"))
        .map(str::to_string)
        .collect()
}

/// `<img>` tags that are not already wrapped in an image div
pub fn image_sites(html: &str) -> Vec<Site> {
    group_sites(html, Pattern::Image, 1)
        .into_iter()
        .filter(|site| !already_wrapped(html, site.range.start))
        .collect()
}

/// Opening tags of text blocks
pub fn text_block_sites(html: &str) -> Vec<Site> {
    group_sites(html, Pattern::TextBlock, 0)
}

/// Sites whose replaceable range is capture group `group` of `pattern`
///
/// Group 0 is the whole match.
pub fn group_sites(html: &str, pattern: Pattern, group: usize) -> Vec<Site> {
    pattern
        .regex()
        .captures_iter(html)
        .filter_map(|caps| {
            let target = caps.get(group)?;
            let groups = caps
                .iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect();
            Some(Site {
                range: target.range(),
                groups,
            })
        })
        .collect()
}

/// Check that each site holds exactly the literal captured for it
pub fn verify_literals(
    html: &str,
    pattern: Pattern,
    captured: &[String],
    sites: &[Site],
) -> Result<(), RewriteError> {
    if captured.len() != sites.len() {
        return Err(RewriteError::CaptureMismatch {
            pattern: pattern.name(),
            captured: captured.len(),
            found: sites.len(),
        });
    }

    match captured
        .iter()
        .zip(sites)
        .position(|(value, site)| html[site.range.clone()] != **value)
    {
        Some(index) => Err(RewriteError::CaptureOrder {
            pattern: pattern.name(),
            index,
        }),
        None => Ok(()),
    }
}

/// Rewrite the given sites of `pattern` in `html`
///
/// # Parameters
/// * `html` - Document the sites were located in
/// * `pattern` - Pattern the sites belong to (used for diagnostics)
/// * `sites` - Non-overlapping sites in document order
/// * `replacement` - Single literal for the first site, or one value per site
///
/// # Returns
/// * `Ok(String)` - The rewritten document; unchanged when there are no sites
/// * `Err(RewriteError::CaptureMismatch)` - A sequence whose length differs from the site count
pub fn replace_sites(
    html: &str,
    pattern: Pattern,
    sites: &[Site],
    replacement: Replacement,
) -> Result<String, RewriteError> {
    let values = match replacement {
        Replacement::Once(value) => match sites.first() {
            Some(_) => vec![value],
            None => return Ok(html.to_string()),
        },
        Replacement::Sequence(values) => {
            if values.len() != sites.len() {
                return Err(RewriteError::CaptureMismatch {
                    pattern: pattern.name(),
                    captured: values.len(),
                    found: sites.len(),
                });
            }
            values
        }
    };

    let mut output = String::with_capacity(html.len() + values.iter().map(String::len).sum::<usize>());
    let mut cursor = 0;
    for (site, value) in sites.iter().zip(&values) {
        output.push_str(&html[cursor..site.range.start]);
        output.push_str(value);
        cursor = site.range.end;
    }
    output.push_str(&html[cursor..]);

    Ok(output)
}

/// Whether the line above `tag_start` opens an image wrapper
fn already_wrapped(html: &str, tag_start: usize) -> bool {
    let before = &html[..tag_start];
    let line_start = match before.rfind('\n') {
        Some(newline) => newline,
        None => return false,
    };
    let previous = &before[..line_start];
    let previous_line = &previous[previous.rfind('\n').map_or(0, |i| i + 1)..];
    previous_line.trim_start().starts_with(IMAGE_WRAPPER_OPEN)
}

//! Marketo rewriter
//!
//! Turns beautified MJML compiler output into a Marketo email template:
//! sections become `mktoModule` tables inside an `mktoContainer`, images and
//! text blocks become editable elements, and typed `${kind: ...}` placeholders
//! are declared as `<meta>` variables.
//!
//! The rewrite runs in a fixed order:
//! 1. capture section classes, image tags and text-block openers from the input
//! 2. replace the outer wrapper and the section openings
//! 3. re-beautify
//! 4. close the last module, wrap images, tag text blocks
//! 5. extract variables, 6. inject their meta tags, 7. normalize placeholders
//!    and report any that could not be parsed
//! 8. re-beautify
//!
//! Sections without a class cannot name a module. Their Outlook comment is
//! dropped and they stay inside the module before them.

mod capture;
mod error;
mod ids;
mod patterns;
mod variables;

pub use error::RewriteError;
pub use ids::IdGenerator;
pub use patterns::Pattern;
pub use variables::{extract, extract_all, Variable, VariableKind};

use crate::beautify::Beautifier;
use capture::{Replacement, Site};
use serde::{Deserialize, Serialize};

/// Opening of the Marketo container that replaces the outer wrapper div
const CONTAINER_OPEN: &str = concat!(
    r#"<table class="mj-full-width-mobile" align="center" border="0" cellpadding="0" cellspacing="0" role="presentation" style="width:100%;">"#,
    "\n<tbody>\n<tr>\n",
    r#"<td class="mktoContainer" id="mktoContainer">"#,
);

/// Closes a container or a module table
const TABLE_CLOSE: &str = "</td>\n</tr>\n</tbody>\n</table>";

/// Name recorded in [`RewriteReport::empty_passes`] when no variables are declared
pub const VARIABLES_PASS: &str = "variables";

/// What to do when a structural pattern matches nothing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuralPolicy {
    /// Log a warning and leave the document as it is
    #[default]
    Lenient,
    /// Fail with [`RewriteError::MissingAnchor`]
    Strict,
}

/// Options for a [`Rewriter`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Handling of missing structural anchors
    pub policy: StructuralPolicy,
    /// Fixed two-letter prefix for section ids (random when `None`)
    pub section_prefix: Option<String>,
    /// Fixed two-letter prefix for image and text ids (random when `None`)
    pub tag_prefix: Option<String>,
}

/// Counts collected during one rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Sections turned into modules
    pub sections: usize,
    /// Images wrapped in `mktoImg` divs
    pub images: usize,
    /// Text blocks tagged `mktoText`
    pub text_blocks: usize,
    /// Variables declared as meta tags
    pub variables: usize,
    /// Sections without a class, left out of the module structure
    pub unnamed_sections: usize,
    /// Typed placeholders that could not be parsed, as written
    pub unparsed_variables: Vec<String>,
    /// Passes that matched nothing, in pipeline order: a [`Pattern::name`], or
    /// [`VARIABLES_PASS`] when the document declares no variables
    pub empty_passes: Vec<&'static str>,
}

/// Result of a rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    /// The Marketo HTML
    pub html: String,
    /// What the rewrite did
    pub report: RewriteReport,
}

/// Rewrites compiled HTML into the Marketo dialect
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    options: RewriteOptions,
    beautifier: Beautifier,
}

/// Rewrite with the default options
///
/// # Parameters
/// * `html` - Beautified MJML compiler output
///
/// # Returns
/// * `Ok(String)` - The Marketo HTML
/// * `Err(RewriteError)` - The captured structure could not be paired with the document
pub fn parse_for_marketo(html: &str) -> Result<String, RewriteError> {
    Rewriter::default().rewrite(html).map(|rewritten| rewritten.html)
}

impl Rewriter {
    /// Create a rewriter
    ///
    /// The rewriter always uses the default 2-space beautifier: its patterns
    /// depend on that indentation.
    pub fn new(options: RewriteOptions) -> Self {
        Self {
            options,
            beautifier: Beautifier::default(),
        }
    }

    /// Rewrite a document
    ///
    /// # Parameters
    /// * `html` - Beautified MJML compiler output
    ///
    /// # Returns
    /// * `Ok(Rewritten)` - Marketo HTML plus a report of what was rewritten
    /// * `Err(RewriteError)` - Invalid id prefixes, a capture/site mismatch, or a
    ///   missing anchor under [`StructuralPolicy::Strict`]
    pub fn rewrite(&self, html: &str) -> Result<Rewritten, RewriteError> {
        let (mut section_ids, mut tag_ids) = self.id_generators()?;
        let mut report = RewriteReport::default();

        let sections = capture::section_classes(html);
        let images = literals(html, &capture::image_sites(html));
        let text_blocks = literals(html, &capture::text_block_sites(html));
        log::debug!(
            "Captured {} sections, {} images, {} text blocks",
            sections.len(),
            images.len(),
            text_blocks.len()
        );

        let doc = self.replace_container(html, &mut report)?;
        let doc = self.open_modules(&doc, &sections, &mut section_ids, &mut report)?;

        let doc = self.beautifier.beautify(&doc);

        let doc = self.close_last_module(&doc, sections.len(), &mut report)?;
        let doc = wrap_images(&doc, &images, &mut tag_ids, &mut report)?;
        let doc = tag_text_blocks(&doc, &text_blocks, &mut tag_ids, &mut report)?;

        let declared = variables::extract_all(&doc);
        let doc = self.declare_variables(doc, &declared, &mut report)?;
        let doc = variables::normalize_placeholders(&doc);
        self.check_unparsed(&doc, &mut report)?;

        Ok(Rewritten {
            html: self.beautifier.beautify(&doc),
            report,
        })
    }

    fn id_generators(&self) -> Result<(IdGenerator, IdGenerator), RewriteError> {
        let sections = match &self.options.section_prefix {
            Some(prefix) => IdGenerator::new(prefix)?,
            None => IdGenerator::random(),
        };
        let tags = match &self.options.tag_prefix {
            Some(prefix) => IdGenerator::new(prefix)?,
            None => IdGenerator::random_excluding(sections.prefix()),
        };
        if sections.prefix() == tags.prefix() {
            return Err(RewriteError::DuplicatePrefix(tags.prefix().to_string()));
        }
        Ok((sections, tags))
    }

    /// Record a pattern that matched nothing and apply the policy to it
    fn missing_anchor(
        &self,
        pattern: Pattern,
        report: &mut RewriteReport,
    ) -> Result<(), RewriteError> {
        report.empty_passes.push(pattern.name());
        match self.options.policy {
            StructuralPolicy::Strict => Err(RewriteError::MissingAnchor {
                pattern: pattern.name(),
            }),
            StructuralPolicy::Lenient => {
                log::warn!(
                    "No match for the {} pattern, leaving that part of the document unchanged",
                    pattern.name()
                );
                Ok(())
            }
        }
    }

    /// Swap the outer wrapper div for the Marketo container table
    fn replace_container(
        &self,
        html: &str,
        report: &mut RewriteReport,
    ) -> Result<String, RewriteError> {
        let mut doc = html.to_string();
        for (pattern, value) in [
            (Pattern::ContainerOpen, CONTAINER_OPEN),
            (Pattern::ContainerClose, TABLE_CLOSE),
        ] {
            let sites = capture::group_sites(&doc, pattern, 1);
            if sites.is_empty() {
                self.missing_anchor(pattern, report)?;
                continue;
            }
            doc = capture::replace_sites(&doc, pattern, &sites, Replacement::Once(value.into()))?;
        }
        Ok(doc)
    }

    /// Turn every section div into an `mktoModule` table
    ///
    /// Middle sections are rewritten first, then the top section, so the top
    /// section draws the last section id.
    fn open_modules(
        &self,
        html: &str,
        sections: &[String],
        ids: &mut IdGenerator,
        report: &mut RewriteReport,
    ) -> Result<String, RewriteError> {
        let Some((first, rest)) = sections.split_first() else {
            let found = capture::group_sites(html, Pattern::MiddleSection, 0).len()
                + capture::group_sites(html, Pattern::TopSection, 0).len();
            if found > 0 {
                return Err(RewriteError::CaptureMismatch {
                    pattern: Pattern::SectionClass.name(),
                    captured: 0,
                    found,
                });
            }
            self.missing_anchor(Pattern::SectionClass, report)?;
            return Ok(html.to_string());
        };

        let doc = self.fold_unnamed_sections(html, report)?;

        // When unnamed sections came first, the first module opens at a middle-shaped site
        let all_middle = capture::group_sites(&doc, Pattern::MiddleSection, 0);
        let top_pattern = if capture::group_sites(&doc, Pattern::TopSection, 0).is_empty()
            && !all_middle.is_empty()
        {
            Pattern::MiddleSection
        } else {
            Pattern::TopSection
        };
        let middle_sites = match top_pattern {
            Pattern::MiddleSection => &all_middle[1..],
            _ => &all_middle[..],
        };

        check_classes(Pattern::MiddleSection, rest, middle_sites)?;
        let middle = rest
            .iter()
            .zip(middle_sites)
            .map(|(class, site)| {
                format!("{TABLE_CLOSE}\n{}", module_open(class, &site.groups[1], &ids.next_id()))
            })
            .collect();
        let doc = capture::replace_sites(
            &doc,
            Pattern::MiddleSection,
            middle_sites,
            Replacement::Sequence(middle),
        )?;

        // Only the first site of the top pattern is left unrewritten
        let top_sites = capture::group_sites(&doc, top_pattern, 0);
        let Some(top) = top_sites.first() else {
            return Err(RewriteError::CaptureMismatch {
                pattern: top_pattern.name(),
                captured: 1,
                found: 0,
            });
        };
        check_classes(top_pattern, std::slice::from_ref(first), std::slice::from_ref(top))?;
        let opening = module_open(first, &top.groups[1], &ids.next_id());
        let doc = capture::replace_sites(&doc, top_pattern, &top_sites, Replacement::Once(opening))?;

        report.sections = sections.len();
        Ok(doc)
    }

    /// Drop the Outlook comment above every section without a class
    ///
    /// The section then stays inside the module before it (or ahead of the
    /// first module), and its Outlook table no longer needs closing.
    fn fold_unnamed_sections(
        &self,
        html: &str,
        report: &mut RewriteReport,
    ) -> Result<String, RewriteError> {
        let sites = capture::group_sites(html, Pattern::UnnamedSection, 1);
        let Some(first) = sites.first() else {
            return Ok(html.to_string());
        };

        if self.options.policy == StructuralPolicy::Strict {
            return Err(RewriteError::UnnamedSection {
                line: html[..first.range.end].matches('\n').count() + 1,
            });
        }
        log::warn!(
            "{} sections have no class and are not turned into modules",
            sites.len()
        );
        report.unnamed_sections = sites.len();

        capture::replace_sites(
            html,
            Pattern::UnnamedSection,
            &sites,
            Replacement::Sequence(vec![String::new(); sites.len()]),
        )
    }

    /// Close the last module where the final Outlook table used to end
    fn close_last_module(
        &self,
        html: &str,
        section_count: usize,
        report: &mut RewriteReport,
    ) -> Result<String, RewriteError> {
        let sites = capture::group_sites(html, Pattern::BottomSection, 1);
        if section_count == 0 {
            if sites.is_empty() {
                report.empty_passes.push(Pattern::BottomSection.name());
            }
            return Ok(html.to_string());
        }
        if sites.is_empty() {
            return Err(RewriteError::CaptureMismatch {
                pattern: Pattern::BottomSection.name(),
                captured: 1,
                found: 0,
            });
        }
        capture::replace_sites(html, Pattern::BottomSection, &sites, Replacement::Once(TABLE_CLOSE.into()))
    }

    /// Insert the variable meta tags, honouring the policy when there is no viewport tag
    fn declare_variables(
        &self,
        html: String,
        declared: &[Variable],
        report: &mut RewriteReport,
    ) -> Result<String, RewriteError> {
        if declared.is_empty() {
            report.empty_passes.push(VARIABLES_PASS);
            return Ok(html);
        }
        match variables::inject_metadata(&html, declared) {
            Some(doc) => {
                report.variables = declared.len();
                Ok(doc)
            }
            None => {
                self.missing_anchor(Pattern::Viewport, report)?;
                Ok(html)
            }
        }
    }

    /// Report typed placeholders that survived normalization
    fn check_unparsed(&self, html: &str, report: &mut RewriteReport) -> Result<(), RewriteError> {
        let leftovers: Vec<String> = Pattern::UnparsedVariable
            .regex()
            .find_iter(html)
            .map(|m| m.as_str().to_string())
            .collect();
        let Some(first) = leftovers.first() else {
            return Ok(());
        };

        if self.options.policy == StructuralPolicy::Strict {
            return Err(RewriteError::UnparsedVariable {
                placeholder: first.clone(),
            });
        }
        for placeholder in &leftovers {
            log::warn!("Could not parse placeholder {}, leaving it as written", placeholder);
        }
        report.unparsed_variables = leftovers;
        Ok(())
    }
}

/// Wrap each captured image in an `mktoImg` div
fn wrap_images(
    html: &str,
    images: &[String],
    ids: &mut IdGenerator,
    report: &mut RewriteReport,
) -> Result<String, RewriteError> {
    let sites = capture::image_sites(html);
    capture::verify_literals(html, Pattern::Image, images, &sites)?;
    if images.is_empty() {
        report.empty_passes.push(Pattern::Image.name());
        return Ok(html.to_string());
    }

    let wrapped = images
        .iter()
        .map(|img| {
            let id = ids.next_id();
            format!("<div class=\"mktoImg\" mktoname=\"{id}\" id=\"{id}\">\n{img}</div>")
        })
        .collect();
    report.images = images.len();
    capture::replace_sites(html, Pattern::Image, &sites, Replacement::Sequence(wrapped))
}

/// Mark each captured text block opener as `mktoText`
fn tag_text_blocks(
    html: &str,
    openers: &[String],
    ids: &mut IdGenerator,
    report: &mut RewriteReport,
) -> Result<String, RewriteError> {
    let sites = capture::text_block_sites(html);
    capture::verify_literals(html, Pattern::TextBlock, openers, &sites)?;
    if openers.is_empty() {
        report.empty_passes.push(Pattern::TextBlock.name());
        return Ok(html.to_string());
    }

    let tagged = openers
        .iter()
        .map(|opener| {
            let id = ids.next_id();
            let attributes = opener.strip_prefix("<div ").unwrap_or(opener);
            format!("<div class=\"mktoText\" mktoname=\"{id}\" id=\"{id}\" {attributes}")
        })
        .collect();
    report.text_blocks = openers.len();
    capture::replace_sites(html, Pattern::TextBlock, &sites, Replacement::Sequence(tagged))
}

/// The module table opening for a section
///
/// # Parameters
/// * `class` - Full class attribute of the section div
/// * `style` - The section div's `style="..."` attribute, kept on the inner div
/// * `id` - Generated section id
fn module_open(class: &str, style: &str, id: &str) -> String {
    let name = class.split_whitespace().next().unwrap_or_default();
    let mut table = format!(r#"<table class="{name} mktoModule" mktoname="{name}""#);
    if class.contains("mktoInactive") || class.contains("mktoinactive") {
        table.push_str(r#" mktoactive="false""#);
    }
    if class.contains("mktoNoAdd") || class.contains("mktonoadd") {
        table.push_str(r#" mktoaddbydefault="false""#);
    }
    table.push_str(&format!(" id=\"{id}\">"));
    format!("{table}\n<tbody>\n<tr>\n<td>\n<div {style}>")
}

/// Each site's class group must equal the class captured for it
fn check_classes(pattern: Pattern, classes: &[String], sites: &[Site]) -> Result<(), RewriteError> {
    if classes.len() != sites.len() {
        return Err(RewriteError::CaptureMismatch {
            pattern: pattern.name(),
            captured: classes.len(),
            found: sites.len(),
        });
    }
    match classes
        .iter()
        .zip(sites)
        .position(|(class, site)| site.groups[0] != *class)
    {
        Some(index) => Err(RewriteError::CaptureOrder {
            pattern: pattern.name(),
            index,
        }),
        None => Ok(()),
    }
}

fn literals(html: &str, sites: &[Site]) -> Vec<String> {
    sites
        .iter()
        .map(|site| html[site.range.clone()].to_string())
        .collect()
}

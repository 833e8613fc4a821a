use mjkit::beautify::beautify_html;
use mjkit::marketo::{
    parse_for_marketo, RewriteError, RewriteOptions, Rewriter, Rewritten, StructuralPolicy,
};
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;

const VIEWPORT: &str = r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#;

/// Load a fixture and beautify it the way the build pipeline does
fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {:?}: {}", path, e));
    beautify_html(&raw)
}

fn fixed_prefixes() -> RewriteOptions {
    RewriteOptions {
        section_prefix: Some("SC".to_string()),
        tag_prefix: Some("TG".to_string()),
        ..RewriteOptions::default()
    }
}

fn rewrite_with(html: &str, options: RewriteOptions) -> Rewritten {
    Rewriter::new(options).rewrite(html).expect("rewrite should succeed")
}

/// The trimmed line following the first line that contains `needle`
fn line_after<'a>(html: &'a str, needle: &str) -> &'a str {
    let mut lines = html.lines();
    lines
        .by_ref()
        .find(|line| line.contains(needle))
        .unwrap_or_else(|| panic!("no line contains {}", needle));
    lines.next().map(str::trim).unwrap_or_default()
}

fn ids(html: &str) -> Vec<String> {
    let re = Regex::new(r#" id="([^"]+)""#).unwrap();
    re.captures_iter(html).map(|c| c[1].to_string()).collect()
}

#[test]
fn test_single_section_becomes_one_module() {
    let html = fixture("single_section.html");
    let rewritten = rewrite_with(&html, fixed_prefixes());
    let out = &rewritten.html;

    assert_eq!(out.matches("mktoModule").count(), 1);
    assert!(out.contains(r#"<table class="header mktoModule" mktoname="header" id="SC1">"#));
    assert!(out.contains(r#"<td class="mktoContainer" id="mktoContainer">"#));
    assert!(!out.contains(r#"<meta class="mkto"#));
    assert!(!out.contains(r#"<div class="header""#));
    assert!(!out.contains("header-outlook"));
    assert_eq!(beautify_html(out), *out);

    assert_eq!(rewritten.report.sections, 1);
    assert_eq!(rewritten.report.images, 0);
    assert_eq!(
        rewritten.report.empty_passes,
        vec!["image", "text block", "variables"]
    );
}

#[test]
fn test_single_section_passes_strict_policy() {
    let html = fixture("single_section.html");
    let rewritten = rewrite_with(
        &html,
        RewriteOptions {
            policy: StructuralPolicy::Strict,
            ..fixed_prefixes()
        },
    );
    assert_eq!(rewritten.report.sections, 1);
}

#[test]
fn test_text_variable_is_declared_below_viewport() {
    let html = fixture("single_section.html").replace(
        "<title></title>",
        "<title>${text: 'Headline'; default: 'Hello'}</title>",
    );
    let out = parse_for_marketo(&html).unwrap();

    assert_eq!(
        line_after(&out, VIEWPORT),
        r#"<meta class="mktoString" id="Headline" mktomodulescope="true" mktoname="Headline" default="Hello">"#
    );
    assert!(out.contains("<title>${Headline}</title>"));
    assert!(!out.contains("${text:"));
}

#[test]
fn test_section_flags() {
    let out = rewrite_with(&fixture("newsletter.html"), fixed_prefixes()).html;

    assert!(out.contains(
        r#"<table class="content mktoModule" mktoname="content" mktoactive="false" id="SC1">"#
    ));
    assert!(out.contains(
        r#"<table class="footer mktoModule" mktoname="footer" mktoaddbydefault="false" id="SC2">"#
    ));
    assert!(out.contains(r#"<table class="header mktoModule" mktoname="header" id="SC3">"#));
}

#[test]
fn test_images_are_wrapped_in_order() {
    let html = fixture("newsletter.html");
    let images: Vec<String> = html
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("<img"))
        .map(str::to_string)
        .collect();
    assert_eq!(images.len(), 2);

    let out = rewrite_with(&html, fixed_prefixes()).html;

    assert_eq!(
        line_after(&out, r#"<div class="mktoImg" mktoname="TG1" id="TG1">"#),
        format!("{}</div>", images[0])
    );
    assert_eq!(
        line_after(&out, r#"<div class="mktoImg" mktoname="TG2" id="TG2">"#),
        format!("{}</div>", images[1])
    );
    assert!(images[0].contains("a.png"));
    assert!(images[1].contains("b.png"));
}

#[test]
fn test_text_blocks_are_tagged() {
    let out = rewrite_with(&fixture("newsletter.html"), fixed_prefixes()).html;

    assert!(out.contains(
        r#"<div class="mktoText" mktoname="TG3" id="TG3" style="font-family:Arial, sans-serif;font-size:24px;line-height:1;text-align:left;color:#000000;">${Headline}</div>"#
    ));
    assert!(out.contains(r#"<div class="mktoText" mktoname="TG4" id="TG4""#));
    assert!(out.contains(r#"<div class="mktoText" mktoname="TG5" id="TG5""#));
    assert!(!out.contains(r#"<div style="font-family"#));
}

#[test]
fn test_module_count_matches_sections() {
    let rewritten = rewrite_with(&fixture("newsletter.html"), fixed_prefixes());

    assert_eq!(rewritten.report.sections, 3);
    assert_eq!(rewritten.html.matches("mktoModule").count(), 3);
    assert_eq!(rewritten.report.images, 2);
    assert_eq!(rewritten.report.text_blocks, 3);
    assert_eq!(rewritten.report.variables, 3);
    assert!(rewritten.report.empty_passes.is_empty());
}

#[test]
fn test_every_variable_is_declared_once() {
    let out = rewrite_with(&fixture("newsletter.html"), fixed_prefixes()).html;

    // Inserted in reverse order below the viewport tag
    let mut lines = out.lines().skip_while(|line| !line.contains(VIEWPORT)).skip(1);
    assert_eq!(
        lines.next().map(str::trim),
        Some(r##"<meta class="mktoColor" id="Footer color" mktomodulescope="true" mktoname="Footer color" default="#f4f4f4">"##)
    );
    assert_eq!(
        lines.next().map(str::trim),
        Some(r#"<meta class="mktoNumber" id="Item count" mktomodulescope="true" mktoname="Item count" default="3">"#)
    );
    assert_eq!(
        lines.next().map(str::trim),
        Some(r#"<meta class="mktoString" id="Headline" mktomodulescope="true" mktoname="Headline" default="Hello">"#)
    );

    assert_eq!(out.matches(r#"<meta class="mkto"#).count(), 3);
    assert_eq!(out.matches("${Headline}").count(), 1);
    assert_eq!(out.matches("${Item count}").count(), 1);
    assert_eq!(out.matches("${Footer color}").count(), 4);
    assert!(!out.contains("default: '"));
}

#[test]
fn test_duplicate_variable_keeps_first_default() {
    let html = fixture("newsletter.html").replace(
        "You are receiving",
        "${text: 'Headline'; default: 'Other'} You are receiving",
    );
    let out = rewrite_with(&html, fixed_prefixes()).html;

    assert_eq!(out.matches(r#"<meta class="mktoString""#).count(), 1);
    assert!(out.contains(r#"mktoname="Headline" default="Hello">"#));
    assert!(!out.contains(r#"default="Other""#));
    assert_eq!(out.matches("${Headline}").count(), 2);
}

#[test]
fn test_generated_ids_are_unique() {
    for _ in 0..20 {
        let out = rewrite_with(&fixture("newsletter.html"), RewriteOptions::default()).html;
        let ids = ids(&out);

        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len(), "duplicate id in {:?}", ids);

        let generated = Regex::new(r"^([A-Z]{2})\d+$").unwrap();
        let prefixes: HashSet<String> = ids
            .iter()
            .filter_map(|id| generated.captures(id).map(|c| c[1].to_string()))
            .collect();
        assert_eq!(prefixes.len(), 2, "expected one section and one tag prefix");
    }
}

#[test]
fn test_output_is_beautified() {
    let html = fixture("newsletter.html");
    assert_eq!(beautify_html(&html), html);

    let out = rewrite_with(&html, fixed_prefixes()).html;
    assert_eq!(beautify_html(&out), out);
}

#[test]
fn test_missing_viewport_lenient() {
    let html = fixture("newsletter.html").replace(VIEWPORT, "");
    let rewritten = rewrite_with(&html, fixed_prefixes());

    assert_eq!(rewritten.report.empty_passes, vec!["viewport meta"]);
    assert_eq!(rewritten.report.variables, 0);
    assert!(!rewritten.html.contains(r#"<meta class="mkto"#));
    assert!(rewritten.html.contains("${Headline}"));
}

#[test]
fn test_missing_viewport_strict() {
    let html = fixture("newsletter.html").replace(VIEWPORT, "");
    let err = Rewriter::new(RewriteOptions {
        policy: StructuralPolicy::Strict,
        ..fixed_prefixes()
    })
    .rewrite(&html)
    .unwrap_err();

    assert_eq!(
        err,
        RewriteError::MissingAnchor {
            pattern: "viewport meta"
        }
    );
}

#[test]
fn test_missing_section_comment_is_a_capture_mismatch() {
    let html: String = fixture("newsletter.html")
        .lines()
        .filter(|line| !line.contains("content-outlook"))
        .map(|line| format!("{}\n", line))
        .collect();

    let err = Rewriter::new(fixed_prefixes()).rewrite(&html).unwrap_err();
    assert_eq!(
        err,
        RewriteError::CaptureMismatch {
            pattern: "middle section",
            captured: 2,
            found: 1
        }
    );
}

#[test]
fn test_invalid_prefix_is_rejected() {
    let err = Rewriter::new(RewriteOptions {
        section_prefix: Some("sc".to_string()),
        ..RewriteOptions::default()
    })
    .rewrite(&fixture("single_section.html"))
    .unwrap_err();

    assert_eq!(err, RewriteError::InvalidPrefix("sc".to_string()));
}

#[test]
fn test_text_default_with_apostrophe() {
    let html = fixture("single_section.html").replace(
        "<title></title>",
        "<title>${text: 'Headline'; default: 'Don't miss out'}</title>",
    );
    let rewritten = rewrite_with(&html, fixed_prefixes());

    assert_eq!(
        line_after(&rewritten.html, VIEWPORT),
        r#"<meta class="mktoString" id="Headline" mktomodulescope="true" mktoname="Headline" default="Don't miss out">"#
    );
    assert!(rewritten.html.contains("<title>${Headline}</title>"));
    assert_eq!(rewritten.report.variables, 1);
    assert!(rewritten.report.unparsed_variables.is_empty());
}

#[test]
fn test_unparsed_placeholder_is_reported() {
    let html = fixture("single_section.html").replace(
        "<title></title>",
        "<title>${number: 'Width'; default: 'wide'}</title>",
    );

    let rewritten = rewrite_with(&html, fixed_prefixes());
    assert_eq!(
        rewritten.report.unparsed_variables,
        vec!["${number: 'Width'; default: 'wide'}"]
    );
    assert!(rewritten.html.contains("${number: 'Width'; default: 'wide'}"));

    let err = Rewriter::new(RewriteOptions {
        policy: StructuralPolicy::Strict,
        ..fixed_prefixes()
    })
    .rewrite(&html)
    .unwrap_err();
    assert_eq!(
        err,
        RewriteError::UnparsedVariable {
            placeholder: "${number: 'Width'; default: 'wide'}".to_string()
        }
    );
}

#[test]
fn test_unnamed_first_section_stays_ahead_of_the_modules() {
    let html = fixture("newsletter.html").replace(
        r#"<div class="header" style="#,
        r#"<div style="#,
    );
    let rewritten = rewrite_with(&html, fixed_prefixes());
    let out = &rewritten.html;

    assert_eq!(rewritten.report.sections, 2);
    assert_eq!(rewritten.report.unnamed_sections, 1);
    assert_eq!(out.matches("mktoModule").count(), 2);
    assert!(out.contains(
        r#"<table class="content mktoModule" mktoname="content" mktoactive="false" id="SC2">"#
    ));
    assert!(out.contains(
        r#"<table class="footer mktoModule" mktoname="footer" mktoaddbydefault="false" id="SC1">"#
    ));
    assert!(!out.contains("header-outlook"));
    assert!(!out.contains("content-outlook"));

    // The unnamed section sits between the container and the first module
    let container = out.find(r#"id="mktoContainer""#).unwrap();
    let headline = out.find("${Headline}").unwrap();
    let first_module = out.find("mktoModule").unwrap();
    assert!(container < headline && headline < first_module);
    assert_eq!(beautify_html(out), *out);
}

#[test]
fn test_unnamed_middle_section_joins_previous_module() {
    let html = fixture("newsletter.html").replace(
        r#"<div class="content mktoInactive" style="#,
        r#"<div style="#,
    );
    let rewritten = rewrite_with(&html, fixed_prefixes());
    let out = &rewritten.html;

    assert_eq!(rewritten.report.sections, 2);
    assert_eq!(rewritten.report.unnamed_sections, 1);
    assert!(out.contains(r#"<table class="header mktoModule" mktoname="header" id="SC2">"#));
    assert!(out.contains(r#"mktoname="footer" mktoaddbydefault="false" id="SC1">"#));
    assert!(!out.contains("content-outlook"));
    assert_eq!(rewritten.report.images, 2);
}

#[test]
fn test_unnamed_section_strict() {
    let html = fixture("newsletter.html").replace(
        r#"<div class="header" style="#,
        r#"<div style="#,
    );
    let line = html
        .lines()
        .position(|l| l.trim_start().starts_with(r#"<div style="margin:0px auto;max-width:600px;">"#))
        .unwrap()
        + 1;

    let err = Rewriter::new(RewriteOptions {
        policy: StructuralPolicy::Strict,
        ..fixed_prefixes()
    })
    .rewrite(&html)
    .unwrap_err();
    assert_eq!(err, RewriteError::UnnamedSection { line });
}

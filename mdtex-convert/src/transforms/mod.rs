//! The standard rewrite rules.
//!
//! Text segments run, in order: heading repair, headings, prose escaping, bold-italic, strong,
//! emphasis, inline code, file references, dash spacing, lists, images and section-brace
//! repair. Code segments run the listing renderer.

pub mod code;
pub mod headings;
pub mod images;
pub mod inline;
pub mod lists;
pub mod repair;

use crate::escape::escape_prose;
use crate::rules::{RuleContext, RuleTarget, TransformRule};

/// Rules registered by [`RuleTable::with_defaults`](crate::rules::RuleTable::with_defaults).
pub fn default_rules() -> Vec<TransformRule> {
    vec![
        TransformRule::pass(
            "heading-repair",
            10,
            RuleTarget::Text,
            headings::repair_heading_lines,
        ),
        TransformRule::pass("headings", 20, RuleTarget::Text, headings::convert_headings),
        TransformRule::pass("escape", 30, RuleTarget::Text, escape_rule),
        TransformRule::pattern("bold-italic", 40, &inline::BOLD_ITALIC, inline::bold_italic),
        TransformRule::pattern("strong", 50, &inline::STRONG, inline::strong),
        TransformRule::pattern("emphasis", 60, &inline::EMPHASIS, inline::emphasis),
        TransformRule::pattern("inline-code", 70, &inline::CODE_SPAN, inline::code_span)
            .unshielded(),
        TransformRule::pattern("file-reference", 80, &inline::FILE_REFERENCE, inline::file_reference),
        TransformRule::pattern("dash-spacing", 90, &inline::DASH, inline::dash_spacing),
        TransformRule::pass("lists", 100, RuleTarget::Text, lists::convert_lists),
        TransformRule::pass("images", 110, RuleTarget::Text, images::convert_images),
        TransformRule::pass(
            "section-braces",
            120,
            RuleTarget::Text,
            repair::repair_section_braces,
        ),
        TransformRule::pass("code-listing", 10, RuleTarget::Code, code::listing_rule),
    ]
}

fn escape_rule(text: &str, _: &mut RuleContext<'_>) -> String {
    escape_prose(text)
}

//! Section extraction and file-name derivation.

use crate::options::ConvertOptions;
use crate::segments::{FenceTracker, LineRole};
use crate::transforms::headings::{parse_heading, strip_section_numbering};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// A top-level heading-delimited span of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Heading text, numbering included
    pub title: String,
    /// The heading line itself; `None` for the synthetic whole-document section
    pub heading: Option<String>,
    pub body: String,
    /// Unique, file-system safe identifier
    pub derived_name: String,
}

/// Normalize a title into an identifier, falling back to `untitled`.
pub fn derive_name(title: &str) -> String {
    derive_name_or(title, "untitled")
}

/// Strip numbering, lowercase, join alphanumeric runs with `_`; `placeholder` when nothing is left.
pub fn derive_name_or(title: &str, placeholder: &str) -> String {
    let lowered = strip_section_numbering(title).to_lowercase();
    let name = NON_ALPHANUMERIC.replace_all(&lowered, "_");
    let name = name.trim_matches('_');
    if name.is_empty() {
        placeholder.to_string()
    } else {
        name.to_string()
    }
}

struct OpenSection {
    title: String,
    heading: String,
    body: String,
}

/// Sections of a document plus the count of non-blank lines that fell outside all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub sections: Vec<Section>,
    pub skipped_lines: usize,
}

/// Split `document` at headings with exactly `options.section_marker_depth` markers.
///
/// A heading with fewer markers closes the running section without opening one; text
/// outside any section is dropped. Headings inside fenced code are ignored. A non-blank
/// document without a single boundary becomes one section named after
/// `options.fallback_title`.
pub fn extract_sections(document: &str, options: &ConvertOptions) -> Vec<Section> {
    split_document(document, options).sections
}

/// [`extract_sections`], also reporting how many lines were dropped.
pub fn split_document(document: &str, options: &ConvertOptions) -> Extraction {
    let depth = options.section_marker_depth.max(1);
    let mut tracker = FenceTracker::default();
    let mut spans: Vec<(String, Option<String>, String)> = Vec::new();
    let mut current: Option<OpenSection> = None;
    let mut dropped = 0usize;

    for line in document.split_inclusive('\n') {
        let role = tracker.observe(line);
        let heading = match role {
            LineRole::Prose => parse_heading(line).filter(|heading| heading.markers <= depth),
            _ => None,
        };

        match heading {
            Some(heading) => {
                if let Some(open) = current.take() {
                    spans.push((open.title, Some(open.heading), open.body));
                }
                if heading.markers == depth {
                    current = Some(OpenSection {
                        title: heading.text.to_string(),
                        heading: line.trim_end().to_string(),
                        body: String::new(),
                    });
                }
            }
            None => match current.as_mut() {
                Some(open) => open.body.push_str(line),
                None if !line.trim().is_empty() => dropped += 1,
                None => {}
            },
        }
    }
    if let Some(open) = current.take() {
        spans.push((open.title, Some(open.heading), open.body));
    }

    if spans.is_empty() {
        if document.trim().is_empty() {
            return Extraction::default();
        }
        tracing::debug!(
            title = %options.fallback_title,
            "no section headings found; treating the whole document as one section"
        );
        spans.push((options.fallback_title.clone(), None, document.to_string()));
        dropped = 0;
    }

    let mut taken = HashSet::new();
    let sections = spans
        .into_iter()
        .map(|(title, heading, body)| {
            let derived_name = unique_name(
                derive_name_or(&title, &options.placeholder_name),
                &mut taken,
            );
            Section {
                title,
                heading,
                body: body.trim_start_matches(['\n', '\r']).trim_end().to_string(),
                derived_name,
            }
        })
        .collect();
    Extraction {
        sections,
        skipped_lines: dropped,
    }
}

fn unique_name(base: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.clone()) {
        return base;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{base}_{suffix}");
        if taken.insert(candidate.clone()) {
            tracing::warn!(name = %base, renamed = %candidate, "section name collision");
            return candidate;
        }
        suffix += 1;
    }
}

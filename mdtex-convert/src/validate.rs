//! Structure checks and cleanup run on the Markdown source before conversion.
//!
//!     Validation is about the document as a whole: heading hierarchy, duplicate titles and
//!     headings that would break LaTeX. The cleanup pass fixes the malformed patterns that
//!     exports from note-taking tools tend to produce (escaped heading markers, a missing
//!     space after the marker run, two-backtick fence openers). Lines inside fenced code are
//!     never inspected or rewritten.

use crate::error::ConvertError;
use crate::segments::{FenceTracker, LineRole};
use crate::transforms::headings::parse_heading;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

static ESCAPED_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\\+(#+)").unwrap());
static MISSING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#+)([^\s#])").unwrap());
static SHORT_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^``([A-Za-z][\w+\-]*)?[ \t]*$").unwrap());
static REPORTED_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\\+#+\s+\S").unwrap());
static SECTION_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\.?\s").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Error,
    Warning,
}

/// A structural problem found in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub level: IssueLevel,
    /// 1-based source line, when the issue belongs to one
    pub line: Option<usize>,
    pub message: String,
}

impl ValidationIssue {
    fn error(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            line,
            message: message.into(),
        }
    }

    fn warning(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            line,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == IssueLevel::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|issue| issue.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|issue| !issue.is_error())
    }

    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateOptions {
    /// When false only the cleanup pass runs
    pub enabled: bool,
    /// Reject heading level jumps not backed by section numbering
    pub check_hierarchy: bool,
    /// Continue with the cleaned source even when errors were found
    pub force: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            check_hierarchy: true,
            force: false,
        }
    }
}

impl ValidateOptions {
    pub fn skip_all() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

struct Heading {
    line: usize,
    level: usize,
    title: String,
}

/// Fix the malformed patterns that are safe to repair mechanically.
pub fn basic_cleanup(source: &str) -> String {
    let mut tracker = FenceTracker::default();
    let mut out = String::with_capacity(source.len());

    for line in source.split_inclusive('\n') {
        let (content, ending) = split_ending(line);
        let repaired = match SHORT_FENCE.captures(content) {
            Some(caps) if !tracker.is_open() || caps.get(1).is_none() => {
                format!("```{}", caps.get(1).map_or("", |m| m.as_str()))
            }
            _ => content.to_string(),
        };
        let repaired = match tracker.observe(&repaired) {
            LineRole::Prose => {
                let unescaped = ESCAPED_HEADING.replace(&repaired, "$1");
                MISSING_SPACE.replace(&unescaped, "$1 $2").into_owned()
            }
            _ => repaired,
        };
        out.push_str(&repaired);
        out.push_str(ending);
    }
    out
}

fn split_ending(line: &str) -> (&str, &str) {
    let content = line.trim_end_matches(['\n', '\r']);
    (content, &line[content.len()..])
}

fn collect_headings(source: &str) -> Vec<Heading> {
    let mut tracker = FenceTracker::default();
    let mut headings = Vec::new();
    for (index, line) in source.lines().enumerate() {
        if tracker.observe(line) != LineRole::Prose || !line.starts_with('#') {
            continue;
        }
        if let Some(heading) = parse_heading(line) {
            if !heading.text.is_empty() {
                headings.push(Heading {
                    line: index + 1,
                    level: heading.markers,
                    title: heading.text.to_string(),
                });
            }
        }
    }
    headings
}

fn section_number(title: &str) -> Option<&str> {
    SECTION_NUMBER
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A level jump is fine when the numbering says the heading is nested below the previous one.
fn numbered_child(previous: &str, current: &str) -> bool {
    match (section_number(previous), section_number(current)) {
        (Some(prev), Some(curr)) => curr == prev || curr.starts_with(&format!("{prev}.")),
        _ => false,
    }
}

/// Check heading structure. Runs on the cleaned text; escaped markers in `source` are warnings.
pub fn validate_structure(source: &str, options: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::default();
    if !options.enabled {
        return report;
    }

    let mut tracker = FenceTracker::default();
    for (index, line) in source.lines().enumerate() {
        if tracker.observe(line) == LineRole::Prose && REPORTED_ESCAPE.is_match(line) {
            report.issues.push(ValidationIssue::warning(
                Some(index + 1),
                format!("escaped heading marker `{}` will be unescaped", line.trim()),
            ));
        }
    }

    let cleaned = basic_cleanup(source);
    let headings = collect_headings(&cleaned);
    let Some(first) = headings.first() else {
        report
            .issues
            .push(ValidationIssue::error(None, "no headings found in the document"));
        return report;
    };

    if first.level > 2 {
        report.issues.push(ValidationIssue::error(
            Some(first.line),
            format!(
                "first heading should be # or ##, found {} {}",
                "#".repeat(first.level),
                first.title
            ),
        ));
    }

    if options.check_hierarchy {
        for pair in headings.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            if curr.level > prev.level + 1 && !numbered_child(&prev.title, &curr.title) {
                report.issues.push(ValidationIssue::error(
                    Some(curr.line),
                    format!(
                        "heading level jumps from {} to {} at: {} {}",
                        prev.level,
                        curr.level,
                        "#".repeat(curr.level),
                        curr.title
                    ),
                ));
            }
        }
    }

    let mut by_level: BTreeMap<(usize, &str), Vec<usize>> = BTreeMap::new();
    for heading in &headings {
        by_level
            .entry((heading.level, heading.title.as_str()))
            .or_default()
            .push(heading.line);
    }
    for ((level, title), lines) in by_level {
        if lines.len() > 1 {
            report.issues.push(ValidationIssue::error(
                lines.get(1).copied(),
                format!(
                    "duplicate title '{title}' at level {level} (lines {})",
                    lines
                        .iter()
                        .map(usize::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        }
    }

    for heading in &headings {
        if heading.title.matches('`').count() % 2 != 0 {
            report.issues.push(ValidationIssue::error(
                Some(heading.line),
                format!("unbalanced backticks in heading: {}", heading.title),
            ));
        }
        if heading.title.ends_with(':') {
            report.issues.push(ValidationIssue::warning(
                Some(heading.line),
                format!("heading ends with a colon: {}", heading.title),
            ));
        }
    }

    report.issues.sort_by_key(|issue| issue.line.unwrap_or(0));
    report
}

/// Clean `source` and validate it; returns the cleaned text.
///
/// Errors fail the call unless `options.force` is set, in which case they are logged and the
/// cleaned text is returned anyway.
pub fn prepare(source: &str, options: &ValidateOptions) -> Result<String, ConvertError> {
    let cleaned = basic_cleanup(source);
    let report = validate_structure(source, options);

    for issue in report.warnings() {
        tracing::warn!("{issue}");
    }
    if !report.is_valid() {
        if !options.force {
            return Err(ConvertError::Validation(report.issues));
        }
        for issue in report.errors() {
            tracing::warn!("continuing despite validation error: {issue}");
        }
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(source: &str, options: &ValidateOptions) -> Vec<String> {
        validate_structure(source, options)
            .errors()
            .map(|issue| issue.message.clone())
            .collect()
    }

    #[test]
    fn cleanup_repairs_known_patterns() {
        let source = "\\### Escaped\n##Tight\n``python\nx = 1\n``\n";
        assert_eq!(
            basic_cleanup(source),
            "### Escaped\n## Tight\n```python\nx = 1\n```\n"
        );
    }

    #[test]
    fn cleanup_leaves_code_alone() {
        let source = "# Title\n```bash\n#!/bin/sh\n\\# keep\n```\n";
        assert_eq!(basic_cleanup(source), source);
    }

    #[test]
    fn cleanup_keeps_inline_double_backticks() {
        let source = "``code`` in prose\n";
        assert_eq!(basic_cleanup(source), source);
    }

    #[test]
    fn well_formed_document_passes() {
        let source = "# Guide\n## 1. Setup\n### 1.1 Install\n## 2. Use\n";
        assert!(validate_structure(source, &ValidateOptions::default()).is_valid());
    }

    #[test]
    fn reports_missing_headings() {
        assert_eq!(
            errors("just text\n", &ValidateOptions::default()),
            vec!["no headings found in the document".to_string()]
        );
    }

    #[test]
    fn level_jump_needs_numbering() {
        let jump = "# Top\n### Deep\n";
        assert_eq!(errors(jump, &ValidateOptions::default()).len(), 1);

        let numbered = "## 3 Methods\n#### 3.1.2 Detail\n";
        assert!(errors(numbered, &ValidateOptions::default()).is_empty());

        let relaxed = ValidateOptions {
            check_hierarchy: false,
            ..ValidateOptions::default()
        };
        assert!(errors(jump, &relaxed).is_empty());
    }

    #[test]
    fn first_heading_too_deep() {
        let found = errors("### Deep start\n", &ValidateOptions::default());
        assert_eq!(found.len(), 1);
        assert!(found[0].starts_with("first heading should be"));
    }

    #[test]
    fn duplicate_titles_at_same_level() {
        let source = "# A\n## Notes\n# B\n## Notes\n";
        let found = errors(source, &ValidateOptions::default());
        assert_eq!(found, vec!["duplicate title 'Notes' at level 2 (lines 2, 4)".to_string()]);
    }

    #[test]
    fn heading_backticks_and_colons() {
        let report = validate_structure("# Use `cargo\n## Steps:\n", &ValidateOptions::default());
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn headings_in_fences_are_ignored() {
        let source = "# Top\n```python\n### comment\n```\n";
        assert!(validate_structure(source, &ValidateOptions::default()).is_valid());
    }

    #[test]
    fn escaped_markers_are_warnings() {
        let report = validate_structure("\\# Title\n", &ValidateOptions::default());
        assert!(report.is_valid());
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn prepare_respects_force() {
        let source = "no headings\n";
        assert!(matches!(
            prepare(source, &ValidateOptions::default()),
            Err(ConvertError::Validation(_))
        ));
        let forced = ValidateOptions {
            force: true,
            ..ValidateOptions::default()
        };
        assert_eq!(prepare(source, &forced).unwrap(), source);
        assert_eq!(prepare(source, &ValidateOptions::skip_all()).unwrap(), source);
    }
}

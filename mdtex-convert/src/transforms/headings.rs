//! Heading lines to section commands.

use crate::options::HeadingCommands;
use crate::rules::RuleContext;
use once_cell::sync::Lazy;
use regex::Regex;

/// `\## ## Title`: a marker run repeated after a space, optionally escaped.
static DOUBLED_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ \t]*)\\*(#+)[ \t]+(#+)[ \t]+(\S.*)$").unwrap());
/// `\# Title`: stray escapes in front of the marker run.
static ESCAPED_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([ \t]*)\\+(#)").unwrap());
static NUMERIC_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)*\.?(?:[ \t]+|$)").unwrap());

/// Output tier of a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeadingDepth {
    Top,
    Sub,
    Deepest,
}

impl HeadingDepth {
    /// Map a marker count onto the three tiers; four or more markers saturate at `Deepest`.
    pub fn from_markers(count: usize) -> Self {
        match count {
            0 | 1 => HeadingDepth::Top,
            2 => HeadingDepth::Sub,
            _ => HeadingDepth::Deepest,
        }
    }

    pub fn command<'a>(&self, commands: &'a HeadingCommands) -> &'a str {
        match self {
            HeadingDepth::Top => &commands.top,
            HeadingDepth::Sub => &commands.sub,
            HeadingDepth::Deepest => &commands.deepest,
        }
    }
}

/// A parsed ATX heading line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingLine<'a> {
    pub markers: usize,
    pub text: &'a str,
}

/// Parse `line` as a heading: a marker run followed by whitespace or the end of the line.
pub fn parse_heading(line: &str) -> Option<HeadingLine<'_>> {
    let line = line.trim_end_matches(['\n', '\r']);
    let trimmed = line.trim_start_matches([' ', '\t']);
    let rest = trimmed.trim_start_matches('#');
    let markers = trimmed.len() - rest.len();
    if markers == 0 || !(rest.is_empty() || rest.starts_with([' ', '\t'])) {
        return None;
    }
    Some(HeadingLine {
        markers,
        text: strip_closing_sequence(rest.trim()),
    })
}

/// Drop an optional closing `#` run; it must be separated from the title by whitespace.
fn strip_closing_sequence(title: &str) -> &str {
    let without = title.trim_end_matches('#');
    if without.len() == title.len() {
        title
    } else if without.is_empty() {
        ""
    } else if without.ends_with([' ', '\t']) {
        without.trim_end()
    } else {
        title
    }
}

/// Remove a leading `N`, `N.M` or `N.M.K` numbering (with optional trailing dot).
pub fn strip_section_numbering(title: &str) -> &str {
    let trimmed = title.trim();
    match NUMERIC_PREFIX.find(trimmed) {
        Some(prefix) => trimmed[prefix.end()..].trim_start(),
        None => trimmed,
    }
}

/// Normalize malformed heading lines to a canonical marker run.
pub fn repair_heading_lines(text: &str, _: &mut RuleContext<'_>) -> String {
    map_lines(text, |line| {
        if let Some(caps) = DOUBLED_MARKERS.captures(line) {
            let markers = caps[2].len() + caps[3].len();
            return format!("{}{} {}", &caps[1], "#".repeat(markers), &caps[4]);
        }
        ESCAPED_MARKERS.replace(line, "$1$2").into_owned()
    })
}

/// Turn every heading line into the section command for its depth.
pub fn convert_headings(text: &str, ctx: &mut RuleContext<'_>) -> String {
    let options = ctx.options;
    let commands = &options.headings;
    let mut empty = Vec::new();
    let converted = map_lines(text, |line| match parse_heading(line) {
        Some(heading) => {
            let title = strip_section_numbering(heading.text);
            if title.is_empty() {
                empty.push(line.trim().to_string());
            }
            let command = HeadingDepth::from_markers(heading.markers).command(commands);
            format!("\\{command}{{{title}}}")
        }
        None => line.to_string(),
    });
    for line in empty {
        ctx.warn("headings", format!("heading '{line}' has no title text"));
    }
    converted
}

pub(crate) fn map_lines(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    text.split('\n').map(|line| f(line)).collect::<Vec<_>>().join("\n")
}

//! Splitting a section body into prose and fenced code.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]{0,3}(`{3,}|~{3,})(.*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Text,
    Code,
}

/// A contiguous run of prose or of fenced code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Prose keeps its line terminators; code holds the lines between the fences.
    pub content: String,
    /// Language tag declared on the opening fence
    pub language: Option<String>,
    /// False for a code fence that runs to the end of the body without closing
    pub terminated: bool,
}

impl Segment {
    fn text(content: String) -> Self {
        Self {
            kind: SegmentKind::Text,
            content,
            language: None,
            terminated: true,
        }
    }
}

/// What a line means relative to fenced code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineRole {
    Prose,
    Open { language: Option<String> },
    Inside,
    Close,
}

/// Tracks fence state across consecutive lines.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    pub(crate) fn observe(&mut self, line: &str) -> LineRole {
        let fence = parse_fence(line);
        match (self.open, fence) {
            (Some((ch, len)), Some((found, found_len, info)))
                if found == ch && found_len >= len && info.is_empty() =>
            {
                self.open = None;
                LineRole::Close
            }
            (Some(_), _) => LineRole::Inside,
            (None, Some((ch, len, info))) => {
                self.open = Some((ch, len));
                let language = info.split_whitespace().next().map(str::to_string);
                LineRole::Open { language }
            }
            (None, None) => LineRole::Prose,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

fn parse_fence(line: &str) -> Option<(char, usize, &str)> {
    let caps = FENCE.captures(line.trim_end_matches(['\n', '\r']))?;
    let marker = caps.get(1)?.as_str();
    let info = caps.get(2).map_or("", |m| m.as_str()).trim();
    let ch = marker.chars().next()?;
    if ch == '`' && info.contains('`') {
        return None;
    }
    Some((ch, marker.len(), info))
}

/// Split `body` at fenced code regions, preserving order.
///
/// Text segments never contain a fence line. An unclosed fence swallows the rest of the body
/// and is reported through [`Segment::terminated`].
pub fn split_segments(body: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut tracker = FenceTracker::default();
    let mut prose = String::new();
    let mut code: Vec<&str> = Vec::new();
    let mut language = None;

    for line in body.split_inclusive('\n') {
        match tracker.observe(line) {
            LineRole::Prose => prose.push_str(line),
            LineRole::Open { language: tag } => {
                if !prose.is_empty() {
                    segments.push(Segment::text(std::mem::take(&mut prose)));
                }
                language = tag;
                code.clear();
            }
            LineRole::Inside => code.push(line.trim_end_matches(['\n', '\r'])),
            LineRole::Close => segments.push(Segment {
                kind: SegmentKind::Code,
                content: code.join("\n"),
                language: language.take(),
                terminated: true,
            }),
        }
    }

    if tracker.is_open() {
        segments.push(Segment {
            kind: SegmentKind::Code,
            content: code.join("\n"),
            language: language.take(),
            terminated: false,
        });
    } else if !prose.is_empty() {
        segments.push(Segment::text(prose));
    }
    segments
}

//! Inline markup: emphasis, strong, code spans, file references and dashes.
//!
//! Code spans get the most care. Their content is escaped in three phases so that
//! math-looking fragments survive and earlier escapes are not doubled:
//!
//! 1. already-escaped sequences (`\_`, `\%`, ...) are stashed behind placeholders,
//! 2. exponent/subscript shapes are promoted to math pieces, in a fixed order,
//! 3. the remaining plain pieces are escaped, then the stashed sequences come back.

use crate::escape::escape_latex;
use crate::stash::Stash;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub static BOLD_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\[\]\n]+)\]\]").unwrap());
pub static STRONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^\s*](?:[^\n]*?[^\s*])??)\*\*").unwrap());
pub static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^\s*](?:[^*\n]*[^\s*])?)\*").unwrap());
pub static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());
pub static FILE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<mcfile\s+name="([^"]*)"\s+path="([^"]*)"\s*/?>(?:</mcfile>)?"#).unwrap()
});
pub static DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"---([^\s-])").unwrap());

static ESCAPED_SEQUENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[\\%&$#_{}^~]").unwrap());
static POWER_DIFFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+?)\^([^)]+?)\s*-\s*([^)]+?)\)").unwrap());
static POWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)\^(\w+)").unwrap());
static SUBSCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)_(\w+)").unwrap());

const PLACEHOLDER_OPEN: char = '\u{E002}';
const PLACEHOLDER_CLOSE: char = '\u{E003}';

pub fn bold_italic(caps: &Captures<'_>) -> String {
    format!("\\textbf{{\\textit{{{}}}}}", &caps[1])
}

pub fn strong(caps: &Captures<'_>) -> String {
    format!("\\textbf{{{}}}", &caps[1])
}

pub fn emphasis(caps: &Captures<'_>) -> String {
    format!("\\emph{{{}}}", &caps[1])
}

pub fn code_span(caps: &Captures<'_>) -> String {
    render_code_span(&caps[1])
}

pub fn file_reference(caps: &Captures<'_>) -> String {
    let path = caps[2]
        .replace('\\', "/")
        .replace('%', "\\%")
        .replace('#', "\\#");
    format!(
        "\\textit{{\\href{{file://{path}}}{{{}}}}}",
        escape_latex(&caps[1])
    )
}

pub fn dash_spacing(caps: &Captures<'_>) -> String {
    format!("--- {}", &caps[1])
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Plain(String),
    Math(String),
}

/// Render the content of a backtick code span as a `\texttt` span.
///
/// Characters inside a promoted math region are never escaped; every reserved character
/// outside one is, unless it was already escaped in the source.
pub fn render_code_span(content: &str) -> String {
    let mut protected = Stash::new(PLACEHOLDER_OPEN, PLACEHOLDER_CLOSE);
    let shielded = protected.protect(&ESCAPED_SEQUENCE, content);

    let mut pieces = vec![Piece::Plain(shielded)];
    pieces = promote_math(pieces, &POWER_DIFFERENCE, "(${1}^{${2}} - ${3})");
    pieces = promote_math(pieces, &POWER, "${1}^{${2}}");
    pieces = promote_math(pieces, &SUBSCRIPT, "${1}_{${2}}");

    let mut rendered = String::with_capacity(content.len() + 16);
    for piece in &pieces {
        match piece {
            Piece::Plain(text) => rendered.push_str(&escape_latex(text)),
            Piece::Math(math) => {
                rendered.push('$');
                rendered.push_str(math);
                rendered.push('$');
            }
        }
    }
    format!("\\texttt{{{}}}", protected.restore(&rendered))
}

/// Split every plain piece at the matches of `pattern`, turning each match into math.
fn promote_math(pieces: Vec<Piece>, pattern: &Regex, template: &str) -> Vec<Piece> {
    let mut promoted = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let text = match piece {
            Piece::Plain(text) => text,
            math => {
                promoted.push(math);
                continue;
            }
        };
        let mut last = 0;
        for caps in pattern.captures_iter(&text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > last {
                promoted.push(Piece::Plain(text[last..whole.start()].to_string()));
            }
            let mut math = String::new();
            caps.expand(template, &mut math);
            promoted.push(Piece::Math(math));
            last = whole.end();
        }
        if last < text.len() {
            promoted.push(Piece::Plain(text[last..].to_string()));
        }
    }
    promoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace(pattern: &Regex, handler: fn(&Captures<'_>) -> String, text: &str) -> String {
        pattern.replace_all(text, |caps: &Captures<'_>| handler(caps)).into_owned()
    }

    #[test]
    fn bold_italic_nests_strong_and_emphasis() {
        assert_eq!(
            replace(&BOLD_ITALIC, bold_italic, "see [[key idea]] now"),
            "see \\textbf{\\textit{key idea}} now"
        );
    }

    #[test]
    fn strong_matches_shortest_pair() {
        assert_eq!(
            replace(&STRONG, strong, "**a** and **b c**"),
            "\\textbf{a} and \\textbf{b c}"
        );
    }

    #[test]
    fn strong_may_contain_single_stars() {
        let once = replace(&STRONG, strong, "**a *b* c**");
        assert_eq!(once, "\\textbf{a *b* c}");
        assert_eq!(
            replace(&EMPHASIS, emphasis, &once),
            "\\textbf{a \\emph{b} c}"
        );
    }

    #[test]
    fn emphasis_ignores_bullet_stars() {
        assert_eq!(
            replace(&EMPHASIS, emphasis, "* item with *stress* inside"),
            "* item with \\emph{stress} inside"
        );
        assert_eq!(replace(&EMPHASIS, emphasis, "2 * 3 * 4"), "2 * 3 * 4");
    }

    #[test]
    fn code_span_promotes_math_before_escaping() {
        assert_eq!(render_code_span("a_b"), "\\texttt{$a_{b}$}");
        assert_eq!(
            render_code_span("x^2 + n_i%"),
            "\\texttt{$x^{2}$ + $n_{i}$\\%}"
        );
        assert_eq!(render_code_span("(n^k - 1)"), "\\texttt{$(n^{k} - 1)$}");
    }

    #[test]
    fn code_span_keeps_prior_escapes() {
        assert_eq!(
            render_code_span("already\\_escaped & raw"),
            "\\texttt{already\\_escaped \\& raw}"
        );
    }

    #[test]
    fn code_span_escapes_stray_caret_and_braces() {
        assert_eq!(render_code_span("a ^ {b}"), "\\texttt{a \\^{} \\{b\\}}");
    }

    #[test]
    fn mixed_sub_and_superscript_stays_one_region() {
        assert_eq!(render_code_span("x_i^2"), "\\texttt{$x_i^{2}$}");
    }

    #[test]
    fn file_reference_links_to_path() {
        assert_eq!(
            replace(
                &FILE_REFERENCE,
                file_reference,
                r#"<mcfile name="my_notes.md" path="C:\docs\my_notes.md"></mcfile>"#
            ),
            "\\textit{\\href{file://C:/docs/my_notes.md}{my\\_notes.md}}"
        );
    }

    #[test]
    fn dash_gets_trailing_space() {
        assert_eq!(replace(&DASH, dash_spacing, "a---b --- c"), "a--- b --- c");
        assert_eq!(replace(&DASH, dash_spacing, "----"), "----");
    }
}

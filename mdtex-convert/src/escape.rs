//! Reserved-character escaping.
//!
//!     Two flavours exist. [`escape_prose`] runs over Markdown prose that may already contain
//!     hand-written LaTeX: it only touches the characters that commonly appear literally in
//!     prose (`# % & _`), leaves anything already escaped alone and never looks inside regions
//!     that other rules own (inline code spans, math, image references, link targets).
//!     [`escape_latex`] is the blunt character-for-character variant used for captions and code
//!     bodies, where every reserved character is literal text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters escaped in running prose.
pub const PROSE_RESERVED: &[char] = &['#', '%', '&', '_'];

/// Regions copied through [`escape_prose`] untouched. The first alternative consumes an
/// escaped dollar so it can never open a math region.
static PROTECTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\\\$",
        r"|`[^`\n]+`",
        r"|\$\$[\s\S]+?\$\$",
        r"|\$[^$\n]+\$",
        r"|\\\([\s\S]+?\\\)",
        r"|\\\[[\s\S]+?\\\]",
        r"|\\begin\{(?:equation|align|gather|multline|math|displaymath)\*?\}[\s\S]*?\\end\{(?:equation|align|gather|multline|math|displaymath)\*?\}",
        r"|!\s*\[[^\]\n]*\]\s*\([^)\n]*\)",
        r"|<mcfile\b[^>]*>(?:</mcfile>)?",
        r"|\\(?:href|url|includegraphics|label|ref|input|include|cite)(?:\[[^\]]*\])?\{[^}]*\}",
    ))
    .unwrap()
});

/// Escape reserved prose characters that are not already escaped.
///
/// A character counts as escaped when it follows an odd run of backslashes, so applying
/// the function twice gives the same result as applying it once.
pub fn escape_prose(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut backslashes = 0usize;
    let mut last = 0;

    for region in PROTECTED.find_iter(text) {
        escape_gap(&text[last..region.start()], &mut backslashes, &mut out);
        out.push_str(region.as_str());
        backslashes = trailing_backslashes(region.as_str());
        last = region.end();
    }
    escape_gap(&text[last..], &mut backslashes, &mut out);
    out
}

fn escape_gap(gap: &str, backslashes: &mut usize, out: &mut String) {
    for ch in gap.chars() {
        if PROSE_RESERVED.contains(&ch) && *backslashes % 2 == 0 {
            out.push('\\');
        }
        out.push(ch);
        if ch == '\\' {
            *backslashes += 1;
        } else {
            *backslashes = 0;
        }
    }
}

fn trailing_backslashes(text: &str) -> usize {
    text.chars().rev().take_while(|ch| *ch == '\\').count()
}

/// Escape every LaTeX-reserved character, one character at a time.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str(r"\textbackslash{}"),
            '{' | '}' | '$' | '&' | '#' | '%' | '_' => {
                out.push('\\');
                out.push(ch);
            }
            '^' => out.push_str(r"\^{}"),
            '~' => out.push_str(r"\~{}"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_prose_characters() {
        assert_eq!(
            escape_prose("50% of R&D uses file_name #1"),
            r"50\% of R\&D uses file\_name \#1"
        );
    }

    #[test]
    fn keeps_existing_escapes() {
        assert_eq!(escape_prose(r"already\_done and \%"), r"already\_done and \%");
    }

    #[test]
    fn escapes_after_escaped_backslash() {
        assert_eq!(escape_prose(r"a\\_b"), r"a\\\_b");
    }

    #[test]
    fn leaves_code_spans_and_math_alone() {
        assert_eq!(
            escape_prose("use `snake_case` and $x_i$ here_"),
            r"use `snake_case` and $x_i$ here\_"
        );
    }

    #[test]
    fn escaped_dollar_does_not_open_math() {
        assert_eq!(escape_prose(r"costs \$5 a_b $c_d$"), r"costs \$5 a\_b $c_d$");
    }

    #[test]
    fn leaves_image_references_and_link_targets_alone() {
        let text = r"![my_fig](img/my_fig.png) see \href{http://x.org/a_b}{a_b}";
        assert_eq!(
            escape_prose(text),
            r"![my_fig](img/my_fig.png) see \href{http://x.org/a_b}{a\_b}"
        );
    }

    #[test]
    fn leaves_math_environments_alone() {
        let text = "\\begin{equation}\nx_1 = 2\n\\end{equation}\nand y_1";
        assert_eq!(
            escape_prose(text),
            "\\begin{equation}\nx_1 = 2\n\\end{equation}\nand y\\_1"
        );
    }

    #[test]
    fn full_escape_is_single_pass() {
        assert_eq!(
            escape_latex(r"\{x}_^~"),
            r"\textbackslash{}\{x\}\_\^{}\~{}"
        );
    }
}

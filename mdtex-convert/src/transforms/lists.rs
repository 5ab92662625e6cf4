//! Bullet and numbered lists.
//!
//! Works line by line with lookahead. A bullet line is tried against three shapes, first
//! match wins:
//!
//! - `- label: description` (dash or star): item with the label in bold,
//! - a star bullet followed by continuation lines: the continuation is folded into one
//!   paragraph and set as indented text after the item,
//! - anything else: a plain item.
//!
//! Consecutive items with the same marker share one container; blank lines between them do
//! not end the list, any other line does and is passed through untouched.

use crate::options::HeadingCommands;
use crate::rules::RuleContext;
use once_cell::sync::Lazy;
use regex::Regex;

static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([ \t]*)([-*])[ \t]+(\S.*)$").unwrap());
static ORDERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ \t]*)\d{1,9}[.)][ \t]+(\S.*)$").unwrap());
static LABELED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^:\n]*[^:\s]):[ \t]+(\S.*)$").unwrap());
/// A label that is already set in bold as a whole.
static BOLD_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\\textbf\{([^{}]*)\}$").unwrap());
/// Commands that start block-level markup rather than running text.
static BLOCK_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\\(?:begin|end|item|chapter|section|subsection|subsubsection|paragraph|subparagraph",
        r"|vspace|noindent|hspace|centering|caption|label|includegraphics|newpage|clearpage)\b",
    ))
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Dash,
    Star,
    Ordered,
}

impl Marker {
    fn environment(self) -> &'static str {
        match self {
            Marker::Dash | Marker::Star => "itemize",
            Marker::Ordered => "enumerate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bullet<'a> {
    marker: Marker,
    content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Item {
    text: String,
    continuation: Option<String>,
}

fn parse_bullet(line: &str) -> Option<Bullet<'_>> {
    if is_thematic_break(line) {
        return None;
    }
    if let Some(caps) = BULLET.captures(line) {
        let marker = if &caps[2] == "-" {
            Marker::Dash
        } else {
            Marker::Star
        };
        return Some(Bullet {
            marker,
            content: caps.get(3)?.as_str().trim_end(),
        });
    }
    let caps = ORDERED.captures(line)?;
    Some(Bullet {
        marker: Marker::Ordered,
        content: caps.get(2)?.as_str().trim_end(),
    })
}

/// `- - -` and `* * *` are rules, not bullets.
fn is_thematic_break(line: &str) -> bool {
    let marks: Vec<char> = line.chars().filter(|ch| !ch.is_whitespace()).collect();
    marks.len() >= 3 && marks.iter().all(|ch| *ch == marks[0] && matches!(ch, '-' | '*' | '_'))
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// A line that may continue a star item: prose that is not a bullet and does not open
/// block-level markup. Inline commands and escapes are running text.
fn continues_item(line: &str, commands: &HeadingCommands) -> bool {
    !is_blank(line) && parse_bullet(line).is_none() && !is_block_markup(line.trim_start(), commands)
}

fn is_block_markup(line: &str, commands: &HeadingCommands) -> bool {
    if BLOCK_COMMAND.is_match(line) {
        return true;
    }
    let Some(rest) = line.strip_prefix('\\') else {
        return false;
    };
    [&commands.top, &commands.sub, &commands.deepest]
        .into_iter()
        .any(|command| {
            rest.strip_prefix(command.as_str())
                .is_some_and(|after| after.starts_with(['{', '*', '[']))
        })
}

/// `label: description` where the label may carry escapes or inline commands, as long as
/// its braces and math delimiters are balanced.
fn labeled_parts(content: &str) -> Option<(&str, &str)> {
    let caps = LABELED.captures(content)?;
    let label = caps.get(1)?.as_str().trim();
    let description = caps.get(2)?.as_str();
    if !balanced(label) {
        return None;
    }
    let label = BOLD_LABEL
        .captures(label)
        .and_then(|inner| inner.get(1))
        .map_or(label, |inner| inner.as_str());
    Some((label, description))
}

fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    let mut dollars = 0usize;
    let mut escaped = false;
    for ch in text.chars() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            '$' => dollars += 1,
            _ => {}
        }
    }
    depth == 0 && dollars % 2 == 0
}

fn is_indented(line: &str) -> bool {
    line.starts_with("  ") || line.starts_with('\t')
}

/// Read the item starting at `lines[start]`; returns it and the index after its last line.
fn read_item(
    lines: &[&str],
    start: usize,
    bullet: &Bullet<'_>,
    commands: &HeadingCommands,
) -> (Item, usize) {
    if bullet.marker != Marker::Ordered {
        if let Some((label, description)) = labeled_parts(bullet.content) {
            let item = Item {
                text: format!("\\textbf{{{label}:}} {description}"),
                continuation: None,
            };
            return (item, start + 1);
        }
    }

    let mut next = start + 1;
    let mut folded: Vec<&str> = Vec::new();
    if bullet.marker == Marker::Star {
        loop {
            match lines.get(next) {
                Some(line) if continues_item(line, commands) => {
                    folded.push(line.trim());
                    next += 1;
                }
                Some(line) if is_blank(line) => {
                    let after_blanks = lines[next..]
                        .iter()
                        .position(|candidate| !is_blank(candidate))
                        .map(|offset| next + offset);
                    match after_blanks {
                        Some(index)
                            if is_indented(lines[index]) && continues_item(lines[index], commands) =>
                        {
                            next = index;
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
    }

    let continuation = if folded.is_empty() {
        None
    } else {
        Some(folded.join(" "))
    };
    let item = Item {
        text: bullet.content.to_string(),
        continuation,
    };
    (item, next)
}

fn render_list(marker: Marker, items: &[Item]) -> String {
    let environment = marker.environment();
    let mut out = format!("\\begin{{{environment}}}\n");
    for item in items {
        out.push_str("  \\item ");
        out.push_str(&item.text);
        out.push('\n');
        if let Some(text) = &item.continuation {
            out.push_str("\n    \\vspace{0.5em}\n    \\noindent\\hspace{2em}");
            out.push_str(text);
            out.push_str("\n    \\vspace{0.5em}\n");
        }
    }
    out.push_str(&format!("\\end{{{environment}}}"));
    out
}

/// Rewrite bullet runs in `text` into list environments.
pub fn convert_lists(text: &str, ctx: &mut RuleContext<'_>) -> String {
    let commands = &ctx.options.headings;
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut index = 0;

    while index < lines.len() {
        let Some(first) = parse_bullet(lines[index]) else {
            out.push(lines[index].to_string());
            index += 1;
            continue;
        };

        let marker = first.marker;
        let mut items = Vec::new();
        let mut bullet = first;
        loop {
            let (item, next) = read_item(&lines, index, &bullet, commands);
            items.push(item);
            index = next;

            let resume = lines[index..]
                .iter()
                .position(|line| !is_blank(line))
                .map(|offset| index + offset);
            match resume.and_then(|at| parse_bullet(lines[at]).map(|found| (at, found))) {
                Some((at, found)) if found.marker == marker => {
                    index = at;
                    bullet = found;
                }
                _ => break,
            }
        }
        out.push(render_list(marker, &items));
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConvertOptions;
    use crate::transforms::images::DirectoryLocator;

    fn convert(text: &str) -> String {
        let options = ConvertOptions::default();
        let locator = DirectoryLocator::default();
        let mut ctx = RuleContext::new(&options, &locator);
        convert_lists(text, &mut ctx)
    }

    #[test]
    fn plain_bullets_share_one_container() {
        let out = convert("- one\n- two\n- three\nAfter the list.");
        assert_eq!(
            out,
            "\\begin{itemize}\n  \\item one\n  \\item two\n  \\item three\n\\end{itemize}\nAfter the list."
        );
        assert_eq!(out.matches("\\begin{itemize}").count(), 1);
        assert_eq!(out.matches("\\item").count(), 3);
    }

    #[test]
    fn labeled_bullets_bold_the_label() {
        let out = convert("- Speed: fast\n* Memory: small");
        assert!(out.contains("\\item \\textbf{Speed:} fast"));
        assert!(out.contains("\\item \\textbf{Memory:} small"));
        assert_eq!(out.matches("\\begin{itemize}").count(), 2);
    }

    #[test]
    fn escaped_and_formatted_labels_are_bolded() {
        let out = convert("- max\\_depth: maximum depth\n- R\\&D: research\n- \\texttt{cfg}: flags");
        assert!(out.contains("\\item \\textbf{max\\_depth:} maximum depth"));
        assert!(out.contains("\\item \\textbf{R\\&D:} research"));
        assert!(out.contains("\\item \\textbf{\\texttt{cfg}:} flags"));
    }

    #[test]
    fn bold_label_is_not_bolded_twice() {
        let out = convert("- \\textbf{Speed}: fast");
        assert!(out.contains("\\item \\textbf{Speed:} fast"));
    }

    #[test]
    fn unbalanced_math_is_not_a_label() {
        let out = convert("- see $f: X \\to Y$");
        assert!(out.contains("\\item see $f: X \\to Y$"));
    }

    #[test]
    fn continuation_may_start_with_inline_markup() {
        let out = convert("* Step one\n\\textbf{Note} read this\n* Step two");
        assert!(out.contains("\\noindent\\hspace{2em}\\textbf{Note} read this\n"));
        assert_eq!(out.matches("\\item").count(), 2);
    }

    #[test]
    fn section_command_ends_a_star_item() {
        let out = convert("* Step one\n\\subsection{Next}");
        assert!(out.ends_with("\\end{itemize}\n\\subsection{Next}"));
        assert!(!out.contains("hspace"));
    }

    #[test]
    fn url_is_not_a_label() {
        let out = convert("- visit http://example.org");
        assert!(out.contains("\\item visit http://example.org"));
    }

    #[test]
    fn star_bullet_folds_continuation_lines() {
        let out = convert("* Step one\nreads the input\nand checks it\n* Step two");
        assert!(out.contains("\\item Step one\n\n    \\vspace{0.5em}\n    \\noindent\\hspace{2em}reads the input and checks it\n"));
        assert!(out.contains("\\item Step two"));
        assert_eq!(out.matches("\\begin{itemize}").count(), 1);
    }

    #[test]
    fn continuation_never_swallows_a_following_list() {
        let out = convert("* First\n- Other list");
        assert_eq!(out.matches("\\begin{itemize}").count(), 2);
        assert!(!out.contains("hspace"));
    }

    #[test]
    fn blank_line_then_prose_ends_the_list() {
        let out = convert("* a\n* b\n\nParagraph");
        assert!(out.ends_with("\\end{itemize}\n\nParagraph"));
        assert!(!out.contains("hspace"));
    }

    #[test]
    fn indented_block_after_blank_line_continues_star_item() {
        let out = convert("* a\n\n  more about a\n* b");
        assert!(out.contains("\\noindent\\hspace{2em}more about a"));
        assert_eq!(out.matches("\\item").count(), 2);
    }

    #[test]
    fn blank_lines_between_items_keep_one_list() {
        let out = convert("- a\n\n- b");
        assert_eq!(out, "\\begin{itemize}\n  \\item a\n  \\item b\n\\end{itemize}");
    }

    #[test]
    fn numbered_items_use_enumerate() {
        let out = convert("1. first\n2) second");
        assert_eq!(
            out,
            "\\begin{enumerate}\n  \\item first\n  \\item second\n\\end{enumerate}"
        );
    }

    #[test]
    fn thematic_break_is_not_a_bullet() {
        assert_eq!(convert("* * *"), "* * *");
        assert_eq!(convert("- - -"), "- - -");
    }
}

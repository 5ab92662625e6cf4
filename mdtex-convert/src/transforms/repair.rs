//! Structural repairs on generated LaTeX.

use super::headings::map_lines;
use crate::rules::RuleContext;
use once_cell::sync::Lazy;
use regex::Regex;

static SECTIONING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*\\(?:chapter|section|subsection|subsubsection|paragraph|subparagraph)\*?\{")
        .unwrap()
});

static ENVIRONMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(begin|end)\{([A-Za-z*]+)\}").unwrap());

/// Environments whose bodies are not LaTeX.
const RAW_ENVIRONMENTS: &[&str] = &["lstlisting", "verbatim"];

/// Close the argument of sectioning commands that lost their closing brace.
pub fn repair_section_braces(text: &str, ctx: &mut RuleContext<'_>) -> String {
    let mut repaired = Vec::new();
    let out = map_lines(text, |line| {
        if !SECTIONING.is_match(line) {
            return line.to_string();
        }
        let missing = unbalanced_braces(line);
        if missing == 0 {
            return line.to_string();
        }
        repaired.push(line.trim().to_string());
        format!("{line}{}", "}".repeat(missing))
    });
    for line in repaired {
        ctx.warn("section-braces", format!("closed unbalanced braces in `{line}`"));
    }
    out
}

/// Number of `{` left open at the end of `line`, ignoring escaped braces.
fn unbalanced_braces(line: &str) -> usize {
    let mut depth = 0usize;
    let mut escaped = false;
    for ch in line.chars() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

/// Describe every `\begin`/`\end` mismatch in `latex`.
///
/// Bodies of listing and verbatim environments are skipped.
pub fn unclosed_environments(latex: &str) -> Vec<String> {
    let mut problems = Vec::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut raw: Option<&str> = None;

    for caps in ENVIRONMENT.captures_iter(latex) {
        let is_begin = &caps[1] == "begin";
        let name = caps.get(2).map_or("", |m| m.as_str());

        if let Some(open) = raw {
            if !is_begin && name == open {
                raw = None;
                stack.pop();
            }
            continue;
        }

        if is_begin {
            stack.push(name);
            if RAW_ENVIRONMENTS.contains(&name) {
                raw = Some(name);
            }
            continue;
        }

        match stack.last() {
            Some(open) if *open == name => {
                stack.pop();
            }
            Some(open) => problems.push(format!("\\end{{{name}}} closes \\begin{{{open}}}")),
            None => problems.push(format!("\\end{{{name}}} without matching \\begin")),
        }
    }

    problems.extend(
        stack
            .into_iter()
            .map(|name| format!("\\begin{{{name}}} is never closed")),
    );
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConvertOptions;
    use crate::transforms::images::DirectoryLocator;

    #[test]
    fn closes_section_argument() {
        let options = ConvertOptions::default();
        let locator = DirectoryLocator::default();
        let mut ctx = RuleContext::new(&options, &locator);
        let out = repair_section_braces("\\section{Intro\nbody {left} open", &mut ctx);
        assert_eq!(out, "\\section{Intro}\nbody {left} open");
        assert_eq!(ctx.diagnostics.len(), 1);
    }

    #[test]
    fn escaped_braces_do_not_count() {
        let options = ConvertOptions::default();
        let locator = DirectoryLocator::default();
        let mut ctx = RuleContext::new(&options, &locator);
        let line = "\\subsection{Sets \\{a\\}}";
        assert_eq!(repair_section_braces(line, &mut ctx), line);
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn balanced_environments_pass() {
        let latex = "\\begin{itemize}\n\\item a\n\\begin{enumerate}\n\\item b\n\\end{enumerate}\n\\end{itemize}";
        assert!(unclosed_environments(latex).is_empty());
    }

    #[test]
    fn reports_open_and_stray() {
        let problems = unclosed_environments("\\begin{itemize}\n\\end{figure}");
        assert_eq!(
            problems,
            vec![
                "\\end{figure} closes \\begin{itemize}".to_string(),
                "\\begin{itemize} is never closed".to_string(),
            ]
        );
    }

    #[test]
    fn listing_bodies_are_opaque() {
        let latex = "\\begin{lstlisting}\n\\begin{oops}\n\\end{lstlisting}";
        assert!(unclosed_environments(latex).is_empty());
    }
}

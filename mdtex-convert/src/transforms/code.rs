//! Fenced code blocks to `lstlisting` environments.

use crate::escape::escape_latex;
use crate::options::{CodeEscape, ConvertOptions};
use crate::rules::RuleContext;
use std::fmt;

/// Built-in `fence tag -> listings language` table, matched case-insensitively.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("python", "Python"),
    ("py", "Python"),
    ("java", "Java"),
    ("javascript", "JavaScript"),
    ("js", "JavaScript"),
    ("c", "C"),
    ("cpp", "C++"),
    ("c++", "C++"),
    ("bash", "bash"),
    ("sh", "bash"),
    ("shell", "bash"),
    ("pseudocode", "Pseudocode"),
    ("sql", "SQL"),
    ("ruby", "Ruby"),
    ("rb", "Ruby"),
    ("haskell", "Haskell"),
    ("hs", "Haskell"),
    ("html", "HTML"),
    ("xml", "XML"),
    ("tex", "TeX"),
    ("latex", "TeX"),
];

/// First-line prefixes that introduce a named definition.
const CAPTION_PREFIXES: &[&str] = &["def ", "function ", "class ", "# "];

/// Resolve a fence tag to a listings language, falling back to the configured default.
pub fn canonical_language(tag: Option<&str>, options: &ConvertOptions) -> String {
    let Some(tag) = tag.map(str::trim).filter(|tag| !tag.is_empty()) else {
        return options.default_language.clone();
    };
    let key = tag.to_lowercase();
    if let Some((_, language)) = options
        .language_aliases
        .iter()
        .find(|(alias, _)| alias.to_lowercase() == key)
    {
        return language.clone();
    }
    LANGUAGES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, language)| language.to_string())
        .unwrap_or_else(|| options.default_language.clone())
}

/// Caption for a block whose first non-blank line introduces a named definition.
pub fn derive_caption(code: &str) -> Option<String> {
    let first = code.lines().find(|line| !line.trim().is_empty())?.trim();
    let rest = CAPTION_PREFIXES
        .iter()
        .find_map(|prefix| first.strip_prefix(prefix))?;
    let name = rest.split('(').next().unwrap_or(rest);
    let name = name.trim().trim_end_matches(':').trim_end();
    if name.is_empty() {
        None
    } else {
        Some(format!("{name} Algorithm"))
    }
}

/// Why a block could not be rendered as a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingError {
    ControlCharacter(char),
    Terminator,
}

impl fmt::Display for ListingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingError::ControlCharacter(ch) => {
                write!(f, "code contains control character U+{:04X}", *ch as u32)
            }
            ListingError::Terminator => write!(f, "code contains the listing terminator"),
        }
    }
}

impl std::error::Error for ListingError {}

/// Render `code` as a listing block.
pub fn render_listing(
    code: &str,
    tag: Option<&str>,
    options: &ConvertOptions,
) -> Result<String, ListingError> {
    if let Some(ch) = code.chars().find(|ch| ch.is_control() && *ch != '\t' && *ch != '\n') {
        return Err(ListingError::ControlCharacter(ch));
    }
    let body = code.trim_end();
    let body = match options.code_escape {
        CodeEscape::Reserved => escape_latex(body),
        CodeEscape::Verbatim if body.contains("\\end{lstlisting}") => {
            return Err(ListingError::Terminator)
        }
        CodeEscape::Verbatim => body.to_string(),
    };

    let mut settings = format!("language={}", canonical_language(tag, options));
    if let Some(caption) = derive_caption(code) {
        settings.push_str(&format!(",caption={{{}}}", escape_latex(&caption)));
    }
    Ok(format!(
        "\\begin{{lstlisting}}[{settings}]\n{body}\n\\end{{lstlisting}}"
    ))
}

/// Plain verbatim block used when a listing cannot be produced.
pub fn render_verbatim(code: &str) -> String {
    let cleaned: String = code
        .chars()
        .filter(|ch| !ch.is_control() || *ch == '\t' || *ch == '\n')
        .collect();
    let cleaned = cleaned.trim_end().replace("\\end{verbatim}", "\\end {verbatim}");
    format!("\\begin{{verbatim}}\n{cleaned}\n\\end{{verbatim}}")
}

pub fn listing_rule(code: &str, ctx: &mut RuleContext<'_>) -> String {
    match render_listing(code, ctx.language.as_deref(), ctx.options) {
        Ok(listing) => listing,
        Err(err) => {
            ctx.warn("code-listing", format!("{err}; falling back to verbatim"));
            render_verbatim(code)
        }
    }
}

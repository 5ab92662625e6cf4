//! Image references to figure blocks.

use crate::escape::escape_prose;
use crate::rules::RuleContext;
use once_cell::sync::Lazy;
use pathdiff::diff_paths;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};

static IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\s*\[([^\]\n]*)\]\s*\(\s*([^)\s]+)(?:\s+"([^"]*)")?\s*\)"#).unwrap()
});

/// Finds the file an image reference points at.
pub trait ImageLocator {
    fn locate(&self, raw_path: &str) -> Option<PathBuf>;
}

/// Looks references up in a list of directories: exact name first, then a
/// case-insensitive match on the file name.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLocator {
    dirs: Vec<PathBuf>,
}

impl DirectoryLocator {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

impl ImageLocator for DirectoryLocator {
    fn locate(&self, raw_path: &str) -> Option<PathBuf> {
        let raw = Path::new(raw_path);
        let file_name = raw.file_name()?;

        for dir in &self.dirs {
            for candidate in [dir.join(raw), dir.join(file_name)] {
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        let wanted = file_name.to_string_lossy().to_lowercase();
        for dir in &self.dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            let mut matches: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| {
                    path.is_file()
                        && path
                            .file_name()
                            .is_some_and(|name| name.to_string_lossy().to_lowercase() == wanted)
                })
                .collect();
            matches.sort();
            if let Some(found) = matches.into_iter().next() {
                return Some(found);
            }
        }
        None
    }
}

/// A parsed `![alt](path "title")` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub alt_text: String,
    pub raw_path: String,
    pub title: Option<String>,
    pub resolved: Option<PathBuf>,
}

impl ImageReference {
    pub fn resolve(
        alt_text: &str,
        raw_path: &str,
        title: Option<&str>,
        locator: &dyn ImageLocator,
    ) -> Self {
        Self {
            alt_text: alt_text.trim().to_string(),
            raw_path: raw_path.to_string(),
            title: title.map(str::to_string),
            resolved: locator.locate(raw_path),
        }
    }

    fn stem(&self) -> String {
        Path::new(&self.raw_path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Explicit title, else alt text, else the title-cased file stem.
    pub fn caption(&self) -> String {
        let text = match (&self.title, self.alt_text.is_empty()) {
            (Some(title), _) if !title.trim().is_empty() => title.trim().to_string(),
            (_, false) => self.alt_text.clone(),
            _ => title_case(&self.stem().replace(['_', '-'], " ")),
        };
        escape_prose(&text)
    }

    /// Lowercased file stem with every non-alphanumeric character removed.
    pub fn label(&self) -> String {
        let label: String = self
            .stem()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        if label.is_empty() {
            "image".to_string()
        } else {
            label
        }
    }

    /// Figure block for a resolved reference.
    pub fn to_figure(&self, document_dir: Option<&Path>) -> Option<String> {
        let resolved = self.resolved.as_deref()?;
        Some(format!(
            "\\begin{{figure}}[H]\n  \\centering\n  \\includegraphics[width=\\linewidth]{{{}}}\n  \\caption{{{}}}\n  \\label{{fig:{}}}\n\\end{{figure}}",
            relative_path(resolved, document_dir),
            self.caption(),
            self.label()
        ))
    }
}

/// `path` relative to `base` when both are comparable, with `/` separators.
pub fn relative_path(path: &Path, base: Option<&Path>) -> String {
    let candidate = base
        .and_then(|base| diff_paths(path, base))
        .unwrap_or_else(|| path.to_path_buf());
    candidate.to_string_lossy().replace('\\', "/")
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Replace every resolvable image reference with a figure; unresolved ones stay as written.
pub fn convert_images(text: &str, ctx: &mut RuleContext<'_>) -> String {
    let locator = ctx.locator;
    let options = ctx.options;
    let document_dir = options.document_dir.as_deref();
    let mut missing = Vec::new();

    let converted = IMAGE.replace_all(text, |caps: &Captures<'_>| {
        let reference = ImageReference::resolve(
            &caps[1],
            &caps[2],
            caps.get(3).map(|title| title.as_str()),
            locator,
        );
        match reference.to_figure(document_dir) {
            Some(figure) => figure,
            None => {
                missing.push(reference.raw_path);
                caps[0].to_string()
            }
        }
    });
    let converted = converted.into_owned();

    for raw_path in missing {
        ctx.warn(
            "images",
            format!("image '{raw_path}' not found in the image search directories"),
        );
    }
    converted
}

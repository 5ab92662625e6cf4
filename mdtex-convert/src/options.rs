use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Knobs for a conversion run.
///
/// Everything the pipeline needs is passed in through this value; no
/// transform reads module-level defaults or the filesystem on its own
/// (image lookups go through an [`ImageLocator`](crate::transforms::images::ImageLocator)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Number of `#` markers that open a top-level section (1 or 2)
    pub section_marker_depth: usize,

    /// Whether every section file starts with its own heading command
    pub emit_section_heading: bool,

    /// Title of the synthetic section used when the document has no section headings
    pub fallback_title: String,

    /// Identifier used when a title normalizes to an empty name
    pub placeholder_name: String,

    /// Section commands for the three heading tiers
    pub headings: HeadingCommands,

    /// Listing language used for untagged or unknown fences
    pub default_language: String,

    /// Extra `tag -> listing language` aliases, consulted before the built-in table
    pub language_aliases: BTreeMap<String, String>,

    /// How code block bodies are escaped
    pub code_escape: CodeEscape,

    /// Directories searched for referenced images, in order
    pub image_dirs: Vec<PathBuf>,

    /// Directory of the assembled document; figure paths are made relative to it
    pub document_dir: Option<PathBuf>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            section_marker_depth: 1,
            emit_section_heading: true,
            fallback_title: "Document".to_string(),
            placeholder_name: "untitled".to_string(),
            headings: HeadingCommands::default(),
            default_language: "Python".to_string(),
            language_aliases: BTreeMap::new(),
            code_escape: CodeEscape::Reserved,
            image_dirs: Vec::new(),
            document_dir: None,
        }
    }
}

/// LaTeX commands emitted for top, sub and deepest headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingCommands {
    pub top: String,
    pub sub: String,
    pub deepest: String,
}

impl Default for HeadingCommands {
    fn default() -> Self {
        Self {
            top: "section".to_string(),
            sub: "subsection".to_string(),
            deepest: "paragraph".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeEscape {
    /// Escape every reserved character in the body
    Reserved,
    /// Copy the body as-is; the listing environment renders it literally
    Verbatim,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_single_marker_sections() {
        let options = ConvertOptions::default();
        assert_eq!(options.section_marker_depth, 1);
        assert!(options.emit_section_heading);
        assert_eq!(options.headings.deepest, "paragraph");
        assert_eq!(options.code_escape, CodeEscape::Reserved);
    }
}

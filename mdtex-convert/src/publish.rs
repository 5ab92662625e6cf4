//! Writing converted sections and the main document to disk.
//!
//! Nothing is written until the main document has been assembled, so a broken template
//! fails the run before any file changes. Every file is written to a temporary file in
//! its target directory and then renamed over the destination.

use crate::converter::{Conversion, SectionOutput};
use crate::error::ConvertError;
use crate::escape::escape_latex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The built-in main document. `@TITLE@` is replaced with the document title.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/main.tex");

const TITLE_PLACEHOLDER: &str = "@TITLE@";
const END_DOCUMENT: &str = "\\end{document}";

/// Where and how to write a conversion.
///
/// ```ignore
/// let spec = PublishSpec::new("build")
///     .with_backup(true)
///     .with_title("Arithmetic Notes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSpec {
    pub output_dir: PathBuf,
    /// Directory for section files, relative to `output_dir`
    pub sections_dir: String,
    /// Section file extension, without the dot
    pub extension: String,
    /// Copy files that are about to be replaced to `<file>.bak`
    pub backup: bool,
    /// File name of the main document; `None` writes sections only
    pub main_file: Option<String>,
    /// Main document template; the built-in one when `None`
    pub template: Option<String>,
    pub title: String,
}

impl PublishSpec {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            sections_dir: "sections".to_string(),
            extension: "tex".to_string(),
            backup: false,
            main_file: Some("main.tex".to_string()),
            template: None,
            title: "Document".to_string(),
        }
    }

    pub fn with_sections_dir(mut self, dir: impl Into<String>) -> Self {
        self.sections_dir = dir.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_main_file(mut self, name: impl Into<String>) -> Self {
        self.main_file = Some(name.into());
        self
    }

    pub fn without_main(mut self) -> Self {
        self.main_file = None;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Path a section with `name` is written to.
    pub fn section_path(&self, name: &str) -> PathBuf {
        self.output_dir
            .join(&self.sections_dir)
            .join(format!("{name}.{}", self.extension))
    }
}

/// Files written by [`publish`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishResult {
    pub section_files: Vec<PathBuf>,
    pub main_file: Option<PathBuf>,
    /// Backup copies made before overwriting
    pub backups: Vec<PathBuf>,
}

/// Insert one `\input` per section before `\end{document}` and fill in the title.
pub fn assemble_main(
    sections: &[SectionOutput],
    template: &str,
    title: &str,
    sections_dir: &str,
) -> Result<String, ConvertError> {
    let end = template.rfind(END_DOCUMENT).ok_or_else(|| {
        ConvertError::Template(format!("template has no {END_DOCUMENT}"))
    })?;

    let prefix = sections_dir.trim_end_matches('/');
    let mut inputs = String::new();
    for section in sections {
        if prefix.is_empty() {
            inputs.push_str(&format!("\\input{{{}}}\n", section.name));
        } else {
            inputs.push_str(&format!("\\input{{{prefix}/{}}}\n", section.name));
        }
    }
    if !inputs.is_empty() {
        inputs.push('\n');
    }

    let (head, tail) = template.split_at(end);
    Ok(format!("{head}{inputs}{tail}").replace(TITLE_PLACEHOLDER, &escape_latex(title)))
}

/// Write every section file, then the main document.
pub fn publish(conversion: &Conversion, spec: &PublishSpec) -> Result<PublishResult, ConvertError> {
    let main = match &spec.main_file {
        Some(name) => {
            let template = spec.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
            let content = assemble_main(&conversion.sections, template, &spec.title, &spec.sections_dir)?;
            Some((spec.output_dir.join(name), content))
        }
        None => None,
    };

    let sections_dir = spec.output_dir.join(&spec.sections_dir);
    fs::create_dir_all(&sections_dir).map_err(|err| ConvertError::io(&sections_dir, err))?;

    let mut result = PublishResult::default();
    for section in &conversion.sections {
        let path = spec.section_path(&section.name);
        write_file(&path, &section.latex, spec.backup, &mut result.backups)?;
        tracing::debug!(path = %path.display(), "wrote section");
        result.section_files.push(path);
    }

    if let Some((path, content)) = main {
        write_file(&path, &content, spec.backup, &mut result.backups)?;
        tracing::info!(path = %path.display(), sections = result.section_files.len(), "wrote main document");
        result.main_file = Some(path);
    }
    Ok(result)
}

fn write_file(
    path: &Path,
    content: &str,
    backup: bool,
    backups: &mut Vec<PathBuf>,
) -> Result<(), ConvertError> {
    if backup && path.is_file() {
        let mut name = path.as_os_str().to_owned();
        name.push(".bak");
        let backup_path = PathBuf::from(name);
        fs::copy(path, &backup_path).map_err(|err| ConvertError::io(&backup_path, err))?;
        backups.push(backup_path);
    }
    write_atomic(path, content)
}

fn write_atomic(path: &Path, content: &str) -> Result<(), ConvertError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|err| ConvertError::io(dir, err))?;
    file.write_all(content.as_bytes())
        .map_err(|err| ConvertError::io(path, err))?;
    file.persist(path)
        .map_err(|err| ConvertError::io(path, err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str) -> SectionOutput {
        SectionOutput {
            name: name.to_string(),
            title: name.to_string(),
            latex: format!("\\section{{{name}}}\n"),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn inputs_go_before_end_document() {
        let template = "\\title{@TITLE@}\n\\begin{document}\n\\end{document}\n";
        let main = assemble_main(&[section("intro"), section("usage")], template, "A & B", "sections")
            .unwrap();
        assert_eq!(
            main,
            "\\title{A \\& B}\n\\begin{document}\n\\input{sections/intro}\n\\input{sections/usage}\n\n\\end{document}\n"
        );
    }

    #[test]
    fn template_without_end_is_rejected() {
        let err = assemble_main(&[section("a")], "\\begin{document}", "T", "sections").unwrap_err();
        assert!(matches!(err, ConvertError::Template(_)));
    }

    #[test]
    fn default_template_is_usable() {
        let main = assemble_main(&[section("a")], DEFAULT_TEMPLATE, "Notes", "sections").unwrap();
        assert!(main.contains("\\title{Notes}"));
        assert!(main.contains("\\usepackage{listings}"));
        assert!(main.contains("\\lstdefinelanguage{Pseudocode}"));
        assert!(main.contains("\\input{sections/a}\n\n\\end{document}"));
    }

    #[test]
    fn default_template_prints_escaped_listing_characters() {
        assert!(DEFAULT_TEMPLATE.contains("literate="));
        for entry in [
            r"{\\\_}{{\_}}1",
            r"{\\\&}{{\&}}1",
            r"{\\\%}{{\%}}1",
            r"{\\\#}{{\#}}1",
            r"{\\textbackslash\{\}}{{\textbackslash}}1",
            r"{\\\~\{\}}{{\textasciitilde}}1",
        ] {
            assert!(DEFAULT_TEMPLATE.contains(entry), "missing literate entry {entry}");
        }
    }
}

//! Running a LaTeX engine over the assembled main document.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use which::which;

/// Environment variable that overrides engine detection.
pub const ENGINE_ENV: &str = "MDTEX_LATEX_BIN";

/// Written next to the main document when the engine fails.
pub const ERROR_LOG: &str = "latex_compile_error.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Engine looked up on `PATH` when `MDTEX_LATEX_BIN` is unset
    pub engine: String,
    /// Runs needed to settle references and the table of contents
    pub passes: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            engine: "pdflatex".to_string(),
            passes: 3,
        }
    }
}

/// Compile `main` and return the path of the produced PDF.
pub fn compile(main: &Path, options: &CompileOptions) -> Result<PathBuf, ConvertError> {
    if !main.is_file() {
        return Err(ConvertError::NotFound(format!(
            "main document {}",
            main.display()
        )));
    }
    let engine = resolve_engine(&options.engine)?;
    let dir = match main.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = main
        .file_name()
        .ok_or_else(|| ConvertError::NotFound(format!("file name of {}", main.display())))?;

    for pass in 1..=options.passes.max(1) {
        tracing::info!(engine = %engine.display(), pass, "running LaTeX");
        let output = Command::new(&engine)
            .arg("-interaction=nonstopmode")
            .arg(format!("-output-directory={}", dir.display()))
            .arg(file_name)
            .current_dir(&dir)
            .output()
            .map_err(|e| {
                ConvertError::Compile(format!(
                    "failed to launch {} ({e})",
                    engine.display()
                ))
            })?;

        if !output.status.success() {
            let log_path = dir.join(ERROR_LOG);
            let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
            log.push_str(&String::from_utf8_lossy(&output.stderr));
            fs::write(&log_path, log).map_err(|err| ConvertError::io(&log_path, err))?;
            return Err(ConvertError::Compile(format!(
                "{} exited with {} on pass {pass}; output saved to {}",
                engine.display(),
                output.status,
                log_path.display()
            )));
        }
    }

    let pdf = dir.join(Path::new(file_name).with_extension("pdf"));
    if pdf.is_file() {
        Ok(pdf)
    } else {
        Err(ConvertError::Compile(format!(
            "{} finished but {} was not produced",
            engine.display(),
            pdf.display()
        )))
    }
}

/// Find the engine binary: `MDTEX_LATEX_BIN`, then `engine`, then the common engines.
pub fn resolve_engine(engine: &str) -> Result<PathBuf, ConvertError> {
    if let Some(path) = env::var_os(ENGINE_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    for candidate in [engine, "pdflatex", "xelatex", "lualatex"] {
        if candidate.is_empty() {
            continue;
        }
        if let Ok(path) = which(candidate) {
            return Ok(path);
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidate = PathBuf::from("/Library/TeX/texbin/pdflatex");
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    #[cfg(target_os = "linux")]
    {
        for candidate in ["/usr/bin/pdflatex", "/usr/local/texlive/bin/pdflatex"] {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    Err(ConvertError::Compile(format!(
        "unable to locate a LaTeX engine; install {engine} or set {ENGINE_ENV}"
    )))
}

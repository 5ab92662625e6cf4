//! Shared helpers for the integration tests.

use mdtex_convert::{Conversion, ConvertOptions, Converter};
use std::fs;
use std::path::Path;

/// Convert `source` with default options.
pub fn convert(source: &str) -> Conversion {
    Converter::default().convert_document(source)
}

/// Convert `source` with images resolved from (and relative to) `dir`.
pub fn convert_with_images(source: &str, dir: &Path) -> Conversion {
    let options = ConvertOptions {
        image_dirs: vec![dir.to_path_buf()],
        document_dir: Some(dir.to_path_buf()),
        ..ConvertOptions::default()
    };
    Converter::new(options).convert_document(source)
}

/// LaTeX of the only section of `conversion`.
pub fn only_section(conversion: &Conversion) -> &str {
    assert_eq!(conversion.sections.len(), 1, "expected exactly one section");
    &conversion.sections[0].latex
}

pub fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"\x89PNG").unwrap();
}

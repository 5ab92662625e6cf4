//! The orchestrator: document to sections, sections to LaTeX.

use crate::diagnostics::{Diagnostic, Severity};
use crate::options::ConvertOptions;
use crate::rules::{RuleContext, RuleTable, RuleTarget};
use crate::sections::{self, Section};
use crate::segments::{split_segments, SegmentKind};
use crate::transforms::images::{DirectoryLocator, ImageLocator};
use crate::transforms::repair::unclosed_environments;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

static FIGURE_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\label\{(fig:[^}]*)\}").unwrap());

/// One converted section, ready to be written as `<name>.tex`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionOutput {
    pub name: String,
    pub title: String,
    pub latex: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// The result of converting a whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub sections: Vec<SectionOutput>,
    /// Findings that span sections
    pub diagnostics: Vec<Diagnostic>,
}

impl Conversion {
    /// Every diagnostic, document-level ones first.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .chain(self.sections.iter().flat_map(|section| &section.diagnostics))
    }
}

/// Runs the rule table over every section of a document.
pub struct Converter {
    options: ConvertOptions,
    rules: RuleTable,
    locator: Box<dyn ImageLocator + Send + Sync>,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("options", &self.options)
            .field("rules", &self.rules.names())
            .finish()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

impl Converter {
    /// Standard rules; images are looked up in `options.image_dirs`.
    pub fn new(options: ConvertOptions) -> Self {
        let locator = DirectoryLocator::new(options.image_dirs.clone());
        Self {
            options,
            rules: RuleTable::with_defaults(),
            locator: Box::new(locator),
        }
    }

    pub fn with_locator(mut self, locator: impl ImageLocator + Send + Sync + 'static) -> Self {
        self.locator = Box::new(locator);
        self
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleTable {
        &mut self.rules
    }

    pub fn extract_sections(&self, document: &str) -> Vec<Section> {
        sections::extract_sections(document, &self.options)
    }

    /// Convert a section body: prose through the text rules, fences through the code rules.
    pub fn convert_body(&self, body: &str) -> (String, Vec<Diagnostic>) {
        let mut ctx = RuleContext::new(&self.options, self.locator.as_ref());
        let mut out = String::with_capacity(body.len() * 2);

        for segment in split_segments(body) {
            match segment.kind {
                SegmentKind::Text => {
                    out.push_str(&self.rules.apply(RuleTarget::Text, &segment.content, &mut ctx));
                }
                SegmentKind::Code => {
                    if !segment.terminated {
                        ctx.warn(
                            "segments",
                            "code fence is never closed; it runs to the end of the section",
                        );
                    }
                    ctx.language = segment.language;
                    out.push_str(&self.rules.apply(RuleTarget::Code, &segment.content, &mut ctx));
                    out.push('\n');
                    ctx.language = None;
                }
            }
        }
        (out, ctx.diagnostics)
    }

    pub fn convert_section(&self, section: &Section) -> SectionOutput {
        let source = match &section.heading {
            Some(_) if self.options.emit_section_heading => {
                format!("# {}\n\n{}", section.title, section.body)
            }
            _ => section.body.clone(),
        };

        let (mut latex, mut diagnostics) = self.convert_body(&source);
        diagnostics.extend(
            unclosed_environments(&latex)
                .into_iter()
                .map(|problem| Diagnostic::warning("environments", problem)),
        );
        if !latex.ends_with('\n') {
            latex.push('\n');
        }

        for diagnostic in &diagnostics {
            match diagnostic.severity {
                Severity::Warning => tracing::warn!(
                    section = %section.derived_name,
                    rule = diagnostic.rule,
                    "{}",
                    diagnostic.message
                ),
                Severity::Info => tracing::debug!(
                    section = %section.derived_name,
                    rule = diagnostic.rule,
                    "{}",
                    diagnostic.message
                ),
            }
        }

        SectionOutput {
            name: section.derived_name.clone(),
            title: section.title.clone(),
            latex,
            diagnostics,
        }
    }

    pub fn convert_document(&self, document: &str) -> Conversion {
        let document = document.replace("\r\n", "\n");
        let extraction = sections::split_document(&document, &self.options);
        tracing::debug!(count = extraction.sections.len(), "extracted sections");

        let sections: Vec<SectionOutput> = extraction
            .sections
            .iter()
            .map(|section| self.convert_section(section))
            .collect();

        let mut diagnostics = Vec::new();
        if extraction.skipped_lines > 0 {
            diagnostics.push(Diagnostic::info(
                "sections",
                format!(
                    "skipped {} line(s) outside of any section",
                    extraction.skipped_lines
                ),
            ));
        }
        diagnostics.extend(duplicate_figure_labels(&sections));
        for diagnostic in &diagnostics {
            match diagnostic.severity {
                Severity::Warning => tracing::warn!(rule = diagnostic.rule, "{}", diagnostic.message),
                Severity::Info => tracing::info!(rule = diagnostic.rule, "{}", diagnostic.message),
            }
        }
        Conversion {
            sections,
            diagnostics,
        }
    }
}

fn duplicate_figure_labels(sections: &[SectionOutput]) -> Vec<Diagnostic> {
    let mut seen: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for section in sections {
        for caps in FIGURE_LABEL.captures_iter(&section.latex) {
            if let Some(label) = caps.get(1) {
                seen.entry(label.as_str()).or_default().push(&section.name);
            }
        }
    }
    seen.into_iter()
        .filter(|(_, owners)| owners.len() > 1)
        .map(|(label, owners)| {
            Diagnostic::warning(
                "images",
                format!("label '{label}' is used {} times ({})", owners.len(), owners.join(", ")),
            )
        })
        .collect()
}

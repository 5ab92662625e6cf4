//! Markdown to LaTeX section conversion
//!
//!     This crate turns one loosely structured Markdown document into a set of LaTeX section
//!     files plus a main document that `\input`s them. It is a pure lib: it powers mdtex-cli
//!     but reads no configuration files and prints nothing. Everything it needs comes in
//!     through [`ConvertOptions`].
//!
//! Architecture
//!
//!     The conversion is a single ordered rule table (./rules.rs). Each rule is data, a name
//!     plus an order plus the kind of segment it targets, and a pure handler function. The
//!     orchestrator (./converter.rs) splits the document into sections, each section body into
//!     prose and fenced code segments, and runs the matching rules over every segment.
//!
//!     The file structure :
//!     .
//!     ├── converter.rs            # Orchestrator: sections -> segments -> rules
//!     ├── sections.rs             # Heading-delimited sections and file names
//!     ├── segments.rs             # Prose / fenced code splitting
//!     ├── rules.rs                # TransformRule and RuleTable
//!     ├── escape.rs               # Reserved character escaping
//!     ├── transforms
//!     │   ├── headings.rs         # Heading lines to section commands
//!     │   ├── inline.rs           # Emphasis, strong, inline code and math
//!     │   ├── lists.rs            # Bullet, labeled and ordered lists
//!     │   ├── code.rs             # Fenced code to lstlisting
//!     │   ├── images.rs           # Image references to figures
//!     │   └── repair.rs           # Brace and environment balance
//!     ├── validate.rs             # Source structure validation and cleanup
//!     ├── publish.rs              # Section files and main document on disk
//!     └── compile.rs              # LaTeX engine driver (native-export)
//!
//! Ordering
//!
//!     Rules see the full output of every earlier rule, so order matters. Headings run before
//!     escaping so the marker run is gone when `#` gets escaped; escaping runs before the
//!     inline rules so generated commands are never escaped. Inline code spans and math are
//!     shielded from prose rules and rendered by their own three-phase algorithm
//!     (see ./transforms/inline.rs).
//!
//! Failure policy
//!
//!     A malformed construct never fails a section. It is rendered with a safe fallback and
//!     reported as a [`Diagnostic`]. Only I/O, template, validation and compile failures are
//!     [`ConvertError`]s.

pub mod converter;
pub mod diagnostics;
pub mod error;
pub mod escape;
pub mod options;
pub mod publish;
pub mod rules;
pub mod sections;
pub mod segments;
pub mod transforms;
pub mod validate;

#[cfg(feature = "native-export")]
pub mod compile;

mod stash;

pub use converter::{Conversion, Converter, SectionOutput};
pub use diagnostics::{Diagnostic, Severity};
pub use error::ConvertError;
pub use options::{CodeEscape, ConvertOptions, HeadingCommands};
pub use publish::{publish, PublishResult, PublishSpec};
pub use rules::{RuleContext, RuleTable, RuleTarget, TransformRule};
pub use sections::{derive_name, Section};
pub use transforms::images::{DirectoryLocator, ImageLocator};
pub use validate::{ValidateOptions, ValidationIssue, ValidationReport};

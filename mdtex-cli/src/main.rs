// Command-line interface for mdtex
//
// This binary turns a structured Markdown document into LaTeX section files plus a main
// document that inputs them, and optionally compiles the result.
//
// The conversion itself lives in the mdtex-convert crate; this binary only wires files,
// configuration and logging around it.
//
// Usage:
//  mdtex <input> [-o <dir>]                    - Convert (default command)
//  mdtex convert <input> [-o <dir>] [--images <dir>]... [--no-validate] [--force] [--backup]
//  mdtex validate <input> [--skip-hierarchy-check] [--skip-all-validation] [--force] [--write-cleaned] [--json]
//  mdtex build <input> [-o <dir>]              - Convert, then run the LaTeX engine
//  mdtex languages                             - List fence tag aliases
//
// Extra Parameters:
//
// Configuration keys can be overridden with --extra-<key> <value> (or --extra-<key> for
// booleans). Example:
//  mdtex notes.md --extra-marker-depth 2 --extra-alias-rs Rust

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use mdtex_config::{Loader, MdtexConfig};
use mdtex_convert::publish::{publish, PublishResult};
use mdtex_convert::transforms::code::LANGUAGES;
use mdtex_convert::validate::{basic_cleanup, prepare, validate_structure};
use mdtex_convert::{CodeEscape, ConvertOptions, Converter, Severity, ValidateOptions};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

const SUBCOMMANDS: &[&str] = &["convert", "validate", "build", "languages", "help"];
const CLEANED_SUFFIX: &str = ".cleaned.md";

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
/// - `--extras-<key>` (alias for `--extra-<key>`)
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        let key_opt = if let Some(key) = arg.strip_prefix("--extra-") {
            Some(key)
        } else {
            arg.strip_prefix("--extras-")
        };

        if let Some(key) = key_opt {
            let has_value = i + 1 < args.len() && !args[i + 1].starts_with('-');

            if has_value {
                extra_params.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                extra_params.insert(key.to_string(), "true".to_string());
                i += 1;
            }
            continue;
        }

        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn conversion_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("input")
            .help("Markdown file to convert")
            .required(true)
            .index(1)
            .value_hint(ValueHint::FilePath),
    )
    .arg(
        Arg::new("output")
            .long("output")
            .short('o')
            .value_name("DIR")
            .help("Output directory (defaults to the input file's directory)")
            .value_hint(ValueHint::DirPath),
    )
    .arg(
        Arg::new("images")
            .long("images")
            .value_name("DIR")
            .help("Directory searched for images; may be repeated")
            .action(ArgAction::Append)
            .value_hint(ValueHint::DirPath),
    )
    .arg(
        Arg::new("no-validate")
            .long("no-validate")
            .help("Skip structure validation (cleanup still runs)")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("force")
            .long("force")
            .help("Convert even when validation finds errors")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("backup")
            .long("backup")
            .help("Copy files that would be overwritten to <file>.bak")
            .action(ArgAction::SetTrue),
    )
}

fn build_cli() -> Command {
    Command::new("mdtex")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert structured Markdown into LaTeX section files")
        .long_about(
            "mdtex splits a Markdown document at its top-level headings and writes one LaTeX\n\
            file per section, plus a main document that \\input{}s them all.\n\n\
            Commands:\n  \
            - convert:   Validate, convert and write sections (default command)\n  \
            - validate:  Check heading structure without converting\n  \
            - build:     Convert, then compile the main document to PDF\n  \
            - languages: List the code fence languages mdtex knows\n\n\
            Extra Parameters:\n  \
            Use --extra-<key> [value] to override configuration values.\n  \
            Boolean flags can omit the value (defaults to 'true').\n\n\
            Examples:\n  \
            mdtex notes.md                          # Write sections next to notes.md\n  \
            mdtex notes.md -o build --backup        # Write into build/, keep backups\n  \
            mdtex validate notes.md --write-cleaned # Check and save a cleaned copy\n  \
            mdtex notes.md --extra-marker-depth 2   # Sections start at ## headings",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to an mdtex.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log progress and diagnostics at debug level")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(conversion_args(
            Command::new("convert")
                .about("Convert a Markdown file into LaTeX sections (default command)")
                .long_about(
                    "Validate the input, convert every top-level section and write\n\
                    <output>/sections/<name>.tex plus <output>/main.tex.\n\n\
                    Images are looked up in every --images directory, then the\n\
                    configured image_dirs, then the input file's directory.\n\n\
                    Examples:\n  \
                    mdtex convert notes.md -o build\n  \
                    mdtex notes.md --images assets --images figures",
                ),
        ))
        .subcommand(
            Command::new("validate")
                .about("Check the heading structure of a Markdown file")
                .arg(
                    Arg::new("input")
                        .help("Markdown file to check")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("skip-hierarchy-check")
                        .long("skip-hierarchy-check")
                        .help("Allow heading level jumps")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("skip-all-validation")
                        .long("skip-all-validation")
                        .help("Only run the cleanup pass")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help("Exit successfully even when errors are found")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("write-cleaned")
                        .long("write-cleaned")
                        .help("Write the cleaned source to <stem>.cleaned.md next to the input")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the report as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(conversion_args(
            Command::new("build")
                .about("Convert, then compile the main document with a LaTeX engine")
                .long_about(
                    "Runs convert, then the configured LaTeX engine over main.tex.\n\n\
                    The engine is taken from MDTEX_LATEX_BIN, then compile.engine,\n\
                    then the first of pdflatex, xelatex or lualatex on PATH. When the\n\
                    engine fails its output is saved to latex_compile_error.log.",
                ),
        ))
        .subcommand(Command::new("languages").about("List code fence tags and their listings languages"))
}

/// Options shared by `convert` and `build`.
struct ConvertArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    images: Vec<PathBuf>,
    validate: bool,
    force: bool,
    backup: bool,
}

impl ConvertArgs {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            input: PathBuf::from(
                matches
                    .get_one::<String>("input")
                    .expect("input is required"),
            ),
            output: matches.get_one::<String>("output").map(PathBuf::from),
            images: matches
                .get_many::<String>("images")
                .map(|dirs| dirs.map(PathBuf::from).collect())
                .unwrap_or_default(),
            validate: !matches.get_flag("no-validate"),
            force: matches.get_flag("force"),
            backup: matches.get_flag("backup"),
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Parse extra-* arguments before clap processing
    let (cleaned_args, mut extra_params) = parse_extra_args(&args);

    let cli = build_cli();
    let matches = match cli.clone().try_get_matches_from(&cleaned_args) {
        Ok(m) => m,
        Err(e) => {
            // A bare file argument means the default command
            if cleaned_args.len() > 1
                && !cleaned_args[1].starts_with('-')
                && !SUBCOMMANDS.contains(&cleaned_args[1].as_str())
            {
                let mut new_args = vec![cleaned_args[0].clone(), "convert".to_string()];
                new_args.extend_from_slice(&cleaned_args[1..]);

                match cli.try_get_matches_from(&new_args) {
                    Ok(m) => m,
                    Err(e2) => e2.exit(),
                }
            } else {
                e.exit();
            }
        }
    };

    init_logging(matches.get_flag("verbose"));

    let mut config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));
    apply_config_overrides(&mut config, &mut extra_params);
    for key in extra_params.keys() {
        tracing::warn!("ignoring unknown --extra-{key}");
    }

    match matches.subcommand() {
        Some(("convert", sub_matches)) => {
            handle_convert_command(&ConvertArgs::from_matches(sub_matches), &config);
        }
        Some(("validate", sub_matches)) => {
            let input = sub_matches
                .get_one::<String>("input")
                .expect("input is required");
            let mut options = ValidateOptions::from(&config.validate);
            if sub_matches.get_flag("skip-hierarchy-check") {
                options.check_hierarchy = false;
            }
            if sub_matches.get_flag("skip-all-validation") {
                options.enabled = false;
            }
            if sub_matches.get_flag("force") {
                options.force = true;
            }
            handle_validate_command(
                Path::new(input),
                &options,
                sub_matches.get_flag("write-cleaned"),
                sub_matches.get_flag("json"),
            );
        }
        Some(("build", sub_matches)) => {
            handle_build_command(&ConvertArgs::from_matches(sub_matches), &config);
        }
        Some(("languages", _)) => {
            handle_languages_command(&config);
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Validate, convert and publish; exits the process on any failure.
fn run_convert(args: &ConvertArgs, config: &MdtexConfig) -> PublishResult {
    let source = fs::read_to_string(&args.input).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {e}", args.input.display());
        std::process::exit(1);
    });

    let mut validate = if args.validate {
        ValidateOptions::from(&config.validate)
    } else {
        ValidateOptions::skip_all()
    };
    validate.force |= args.force;
    let cleaned = prepare(&source, &validate).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        if !args.force {
            eprintln!("Use --force to convert anyway or --no-validate to skip validation");
        }
        std::process::exit(1);
    });

    let output_dir = resolve_output_dir(&args.input, args.output.as_deref());
    let title = input_title(&args.input);

    let mut options = ConvertOptions::from(&config.convert);
    options.fallback_title = title.clone();
    options.image_dirs = image_search_dirs(&args.input, &args.images, &options.image_dirs);
    options.document_dir = Some(output_dir.clone());

    let conversion = Converter::new(options).convert_document(&cleaned);
    if conversion.sections.is_empty() {
        eprintln!("Error: '{}' has no content to convert", args.input.display());
        std::process::exit(1);
    }

    let mut spec = config
        .output
        .publish_spec(&output_dir)
        .with_backup(config.output.backup || args.backup);
    if config.output.title.is_none() {
        spec = spec.with_title(title);
    }
    if let Some(path) = &config.output.template {
        let template = fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading template '{}': {e}", path.display());
            std::process::exit(1);
        });
        spec = spec.with_template(template);
    }

    let result = publish(&conversion, &spec).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let warnings = conversion
        .all_diagnostics()
        .filter(|diagnostic| diagnostic.severity == Severity::Warning)
        .count();
    tracing::info!(
        sections = result.section_files.len(),
        warnings,
        backups = result.backups.len(),
        "conversion finished"
    );
    result
}

fn handle_convert_command(args: &ConvertArgs, config: &MdtexConfig) {
    let result = run_convert(args, config);
    for path in &result.section_files {
        println!("{}", path.display());
    }
    if let Some(main) = &result.main_file {
        println!("{}", main.display());
    }
}

fn handle_validate_command(input: &Path, options: &ValidateOptions, write_cleaned: bool, json: bool) {
    let source = fs::read_to_string(input).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {e}", input.display());
        std::process::exit(1);
    });

    let report = validate_structure(&source, options);

    if json {
        let rendered = serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
            eprintln!("Error serializing report: {e}");
            std::process::exit(1);
        });
        println!("{rendered}");
    } else {
        for issue in &report.issues {
            let level = if issue.is_error() { "error" } else { "warning" };
            println!("{level}: {issue}");
        }
        println!(
            "{}: {} error(s), {} warning(s)",
            input.display(),
            report.errors().count(),
            report.warnings().count()
        );
    }

    if write_cleaned {
        let path = cleaned_path(input);
        fs::write(&path, basic_cleanup(&source)).unwrap_or_else(|e| {
            eprintln!("Error writing file '{}': {e}", path.display());
            std::process::exit(1);
        });
        if !json {
            println!("Cleaned content written to {}", path.display());
        }
    }

    if !report.is_valid() && !options.force {
        std::process::exit(1);
    }
}

#[cfg(feature = "native-export")]
fn handle_build_command(args: &ConvertArgs, config: &MdtexConfig) {
    use mdtex_convert::compile::{compile, CompileOptions};

    let result = run_convert(args, config);
    let Some(main) = result.main_file else {
        eprintln!("Error: nothing to compile; output.main_file is empty");
        std::process::exit(1);
    };
    let options = CompileOptions::from(&config.compile);
    match compile(&main, &options) {
        Ok(pdf) => println!("{}", pdf.display()),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "native-export"))]
fn handle_build_command(_args: &ConvertArgs, _config: &MdtexConfig) {
    eprintln!("Error: this mdtex was built without the native-export feature");
    std::process::exit(1);
}

fn handle_languages_command(config: &MdtexConfig) {
    println!("Code fence tags:\n");
    for (tag, language) in LANGUAGES {
        println!("  {tag:<12} {language}");
    }
    if !config.convert.language_aliases.is_empty() {
        println!("\nConfigured aliases:\n");
        for (tag, language) in &config.convert.language_aliases {
            println!("  {tag:<12} {language}");
        }
    }
    println!(
        "\nUntagged and unknown fences use {}.",
        config.convert.default_language
    );
}

fn load_cli_config(explicit_path: Option<&str>) -> MdtexConfig {
    let loader = Loader::new().with_optional_file("mdtex.toml");
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

fn apply_config_overrides(config: &mut MdtexConfig, extra_params: &mut HashMap<String, String>) {
    if let Some(raw) = take_override(extra_params, &["marker-depth", "section-marker-depth"]) {
        let depth: usize = parse_number_arg("marker-depth", &raw);
        if !(1..=2).contains(&depth) {
            eprintln!("Invalid value '{raw}' for --extra-marker-depth (expected 1 or 2)");
            std::process::exit(1);
        }
        config.convert.section_marker_depth = depth;
    }
    if let Some(raw) = take_override(extra_params, &["emit-heading", "section-heading"]) {
        config.convert.emit_section_heading = parse_bool_arg("emit-heading", &raw);
    }
    if let Some(raw) = take_override(extra_params, &["default-language", "language"]) {
        config.convert.default_language = raw;
    }
    if let Some(raw) = take_override(extra_params, &["code-escape"]) {
        config.convert.code_escape = match raw.to_lowercase().as_str() {
            "reserved" => CodeEscape::Reserved,
            "verbatim" => CodeEscape::Verbatim,
            other => {
                eprintln!("Invalid value '{other}' for --extra-code-escape (expected reserved or verbatim)");
                std::process::exit(1);
            }
        };
    }
    if let Some(raw) = take_override(extra_params, &["placeholder", "placeholder-name"]) {
        config.convert.placeholder_name = raw;
    }

    let alias_keys: Vec<String> = extra_params
        .keys()
        .filter(|key| key.starts_with("alias-"))
        .cloned()
        .collect();
    for key in alias_keys {
        if let Some(language) = extra_params.remove(&key) {
            let tag = key.trim_start_matches("alias-").to_lowercase();
            config.convert.language_aliases.insert(tag, language);
        }
    }

    if let Some(raw) = take_override(extra_params, &["sections-dir"]) {
        config.output.sections_dir = raw;
    }
    if let Some(raw) = take_override(extra_params, &["extension"]) {
        config.output.extension = raw;
    }
    if let Some(raw) = take_override(extra_params, &["main-file"]) {
        config.output.main_file = raw;
    }
    if let Some(raw) = take_override(extra_params, &["backup"]) {
        config.output.backup = parse_bool_arg("backup", &raw);
    }
    if let Some(raw) = take_override(extra_params, &["title"]) {
        config.output.title = Some(raw);
    }
    if let Some(raw) = take_override(extra_params, &["template"]) {
        config.output.template = Some(PathBuf::from(raw));
    }

    if let Some(raw) = take_override(extra_params, &["engine"]) {
        config.compile.engine = raw;
    }
    if let Some(raw) = take_override(extra_params, &["passes"]) {
        config.compile.passes = parse_number_arg("passes", &raw);
    }
}

/// Output directory, created and made absolute so figure paths can be made relative to it.
fn resolve_output_dir(input: &Path, explicit: Option<&Path>) -> PathBuf {
    let dir = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => parent_dir(input),
    };
    fs::create_dir_all(&dir)
        .and_then(|_| fs::canonicalize(&dir))
        .unwrap_or_else(|e| {
            eprintln!("Error preparing output directory '{}': {e}", dir.display());
            std::process::exit(1);
        })
}

/// Command-line directories, then configured ones, then the input's own directory.
fn image_search_dirs(input: &Path, cli: &[PathBuf], configured: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    let input_dir = parent_dir(input);
    for dir in cli.iter().chain(configured).chain(std::iter::once(&input_dir)) {
        match fs::canonicalize(dir) {
            Ok(found) if found.is_dir() => {
                if !dirs.contains(&found) {
                    dirs.push(found);
                }
            }
            _ => tracing::warn!("image directory '{}' does not exist", dir.display()),
        }
    }
    dirs
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn input_title(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "Document".to_string())
}

fn cleaned_path(input: &Path) -> PathBuf {
    let stem = input_title(input);
    parent_dir(input).join(format!("{stem}{CLEANED_SUFFIX}"))
}

fn take_override(map: &mut HashMap<String, String>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = map.remove(*key) {
            return Some(value);
        }
    }
    None
}

fn parse_bool_arg(flag: &str, raw: &str) -> bool {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        other => {
            eprintln!("Invalid boolean value '{other}' for --extra-{flag}");
            std::process::exit(1);
        }
    }
}

fn parse_number_arg<T: FromStr>(flag: &str, raw: &str) -> T {
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Invalid number '{raw}' for --extra-{flag}");
        std::process::exit(1);
    })
}

use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of build_cli() from src/main.rs
// We need to duplicate this here since build scripts can't access src/ modules
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
            .help("Output directory")
            .value_hint(ValueHint::DirPath),
    )
    .arg(
        Arg::new("images")
            .long("images")
            .value_name("DIR")
            .help("Directory searched for images")
            .action(ArgAction::Append)
            .value_hint(ValueHint::DirPath),
    )
    .arg(
        Arg::new("no-validate")
            .long("no-validate")
            .help("Skip structure validation")
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
            .help("Back up files that would be overwritten")
            .action(ArgAction::SetTrue),
    )
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("mdtex")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert structured Markdown into LaTeX section files")
        .arg_required_else_help(true)
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
                .help("Log at debug level")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(conversion_args(
            Command::new("convert").about("Convert a Markdown file into LaTeX sections"),
        ))
        .subcommand(
            Command::new("validate")
                .about("Check the heading structure of a Markdown file")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("skip-hierarchy-check")
                        .long("skip-hierarchy-check")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("skip-all-validation")
                        .long("skip-all-validation")
                        .action(ArgAction::SetTrue),
                )
                .arg(Arg::new("force").long("force").action(ArgAction::SetTrue))
                .arg(
                    Arg::new("write-cleaned")
                        .long("write-cleaned")
                        .action(ArgAction::SetTrue),
                )
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        )
        .subcommand(conversion_args(
            Command::new("build").about("Convert, then compile with a LaTeX engine"),
        ))
        .subcommand(Command::new("languages").about("List code fence tags"));

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "mdtex", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "mdtex", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "mdtex", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}

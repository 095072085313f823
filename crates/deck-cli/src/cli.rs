//! Command-line surface of `deckctl`

use clap::{value_parser, Arg, ArgAction, Command};
use deck_artifact::{ArtifactKind, BackendId, Round};

fn kind_arg() -> Arg {
    Arg::new("kind")
        .required(true)
        .value_parser(value_parser!(ArtifactKind))
        .help("Artifact kind: upload, analysis, overview or response")
}

fn round_arg() -> Arg {
    Arg::new("round")
        .long("round")
        .short('r')
        .default_value("1")
        .value_parser(value_parser!(Round))
        .help("Evaluation round (1 or 2)")
}

fn backend_arg() -> Arg {
    Arg::new("backend")
        .long("backend")
        .short('b')
        .value_parser(|s: &str| Ok::<_, std::convert::Infallible>(BackendId::new(s)))
}

/// Build the full command tree
pub(crate) fn command() -> Command {
    Command::new("deckctl")
        .version(deck_core::VERSION)
        .about("Operator tool for the pitch-deck screening pipeline")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .env("DECK_CONFIG")
                .global(true)
                .help("TOML configuration file; DECK_* variables override it"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Log at debug level regardless of RUST_LOG"),
        )
        .subcommand(
            Command::new("list")
                .about("List artifacts of one kind on every backend")
                .arg(kind_arg())
                .arg(round_arg()),
        )
        .subcommand(
            Command::new("rank")
                .about("Score and order every analysis of a round")
                .arg(round_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("promote")
                .about("Copy passing round-1 uploads into the round-2 namespace")
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Resolve sources without writing"),
                )
                .arg(backend_arg().help("Backend receiving promoted uploads (defaults to the configured target)")),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete one artifact from one backend")
                .arg(kind_arg())
                .arg(Arg::new("name").required(true).help("Artifact name"))
                .arg(backend_arg().required(true).help("Backend holding the artifact"))
                .arg(round_arg()),
        )
        .subcommand(
            Command::new("delete-all")
                .about("Clear a namespace on every backend")
                .arg(kind_arg())
                .arg(round_arg()),
        )
        .subcommand(
            Command::new("sync-check")
                .about("Report names not held by every backend")
                .arg(kind_arg())
                .arg(round_arg()),
        )
        .subcommand(
            Command::new("analyze-all")
                .about("Trigger analysis for every upload of a round")
                .arg(round_arg())
                .arg(
                    Arg::new("timeout-secs")
                        .long("timeout-secs")
                        .default_value("600")
                        .value_parser(value_parser!(u64))
                        .help("Per-request timeout for the analysis server"),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Show the pipeline stage of one deck")
                .arg(Arg::new("upload").required(true).help("Upload name, e.g. Acme.pdf")),
        )
        .subcommand(
            Command::new("upload")
                .about("Upload a deck for round-1 screening")
                .arg(Arg::new("file").required(true).help("Path to the PDF"))
                .arg(
                    Arg::new("name")
                        .long("name")
                        .short('n')
                        .help("Display name; defaults to the file stem"),
                )
                .arg(backend_arg().help("Target backend (defaults to the first configured)")),
        )
}

//! deckctl - operator tool for the pitch-deck screening pipeline
//!
//! Reads a TOML config (`--config` or `DECK_CONFIG`), applies `DECK_*`
//! environment overrides, and runs one repository operation. Bulk commands
//! print their itemized report and exit with status 1 when any item failed.

mod cli;
mod report;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use deck_artifact::{ArtifactKind, BackendId, Namespace, Round};
use deck_core::{DeckConfig, DeckStage, PromotionWorkflow, RankingView, UploadState};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let matches = cli::command().get_matches();

    let filter = if matches.get_flag("verbose") {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(&matches).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            error!("{e:#}");
            2
        }
    };
    std::process::exit(code);
}

fn load_config(matches: &ArgMatches) -> Result<DeckConfig> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => DeckConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => DeckConfig::default(),
    };
    Ok(config.apply_env_overrides())
}

fn kind(args: &ArgMatches) -> ArtifactKind {
    args.get_one::<ArtifactKind>("kind").copied().unwrap_or(ArtifactKind::Upload)
}

fn round(args: &ArgMatches) -> Round {
    args.get_one::<Round>("round").copied().unwrap_or_default()
}

/// Run the selected subcommand; `Ok(false)` means a partial failure
async fn run(matches: &ArgMatches) -> Result<bool> {
    let config = load_config(matches)?;
    let repo = config.build_repository().context("building repository")?;
    info!(backends = ?repo.backend_ids(), version = deck_core::VERSION, "deckctl ready");

    match matches.subcommand() {
        Some(("list", args)) => {
            let listing = repo.list_all(kind(args), round(args)).await;
            print!("{}", report::listing(&listing));
            Ok(listing.is_complete())
        }
        Some(("rank", args)) => {
            let ranking = RankingView::new(&repo).rank(round(args)).await;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report::ranking_json(&ranking))?);
            } else {
                print!("{}", report::ranking(&ranking));
            }
            Ok(ranking.is_complete())
        }
        Some(("promote", args)) => {
            let dry_run = args.get_flag("dry-run");
            let target = args
                .get_one::<BackendId>("backend")
                .cloned()
                .unwrap_or_else(|| config.promotion_target.clone());
            let ranking = RankingView::new(&repo).rank(Round::One).await;
            let report = PromotionWorkflow::new(&repo, target)
                .with_dry_run(dry_run)
                .promote(&ranking.entries)
                .await;
            print!("{}", report::promotion(&report, dry_run));
            Ok(ranking.is_complete() && report.is_complete())
        }
        Some(("delete", args)) => {
            let (Some(name), Some(backend)) = (args.get_one::<String>("name"), args.get_one::<BackendId>("backend"))
            else {
                bail!("delete needs a name and a backend");
            };
            repo.delete(kind(args), round(args), name, backend).await?;
            println!("deleted {name} from {backend}");
            Ok(true)
        }
        Some(("delete-all", args)) => {
            let report = repo.delete_all(kind(args), round(args)).await;
            print!("{}", report::delete_all(&report));
            Ok(report.is_complete())
        }
        Some(("sync-check", args)) => {
            let report = repo.sync_report(kind(args), round(args)).await;
            print!("{}", report::sync(&report));
            Ok(report.failures.is_empty() && report.is_in_sync())
        }
        Some(("analyze-all", args)) => {
            let timeout = Duration::from_secs(args.get_one::<u64>("timeout-secs").copied().unwrap_or(600));
            let Some(client) = config.analysis_client(timeout)? else {
                bail!("analyze-all needs an artifact server");
            };
            let report = client.analyze_all(&repo, round(args)).await;
            print!("{}", report::analyze_all(&report));
            Ok(report.is_complete())
        }
        Some(("status", args)) => {
            let Some(upload) = args.get_one::<String>("upload") else {
                bail!("status needs an upload name");
            };
            let evidence = repo.deck_evidence(upload).await?;
            print!("{}", report::status(upload, DeckStage::observe(&evidence)));
            Ok(true)
        }
        Some(("upload", args)) => upload(&repo, args).await,
        _ => bail!("no subcommand given"),
    }
}

async fn upload(repo: &deck_core::ArtifactRepository, args: &ArgMatches) -> Result<bool> {
    let Some(file) = args.get_one::<String>("file") else {
        bail!("upload needs a file");
    };
    let backend = match args.get_one::<BackendId>("backend") {
        Some(backend) => backend.clone(),
        None => repo
            .backends_for(Namespace::round_one(ArtifactKind::Upload))
            .first()
            .map(|b| b.id())
            .context("no backend accepts uploads")?,
    };
    let path = Path::new(file);
    let original = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("file name is not valid UTF-8")?;
    let payload = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let handle = repo.upload(
        &backend,
        args.get_one::<String>("name").map(String::as_str),
        original,
        payload,
    )?;
    let mut states = handle.subscribe();
    let progress = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            if let UploadState::InProgress { sent, total } = state {
                debug!(sent, total, "uploading");
            }
            if state.is_terminal() {
                break;
            }
        }
    });

    let result = handle.wait().await;
    progress.abort();
    let reference = result?;
    println!("uploaded {reference}");
    Ok(true)
}

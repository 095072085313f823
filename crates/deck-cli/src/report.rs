//! Plain-text and JSON rendering of pipeline reports
//!
//! Each text report is a private [`fmt::Display`] wrapper; the public
//! functions render it to a `String`.

use deck_core::{
    AnalyzeAllReport, DeckStage, DeleteAllReport, Listing, PromotionReport, PromotionStatus, Ranking, SyncReport,
};
use serde_json::{json, Value};
use std::fmt;

struct ListingText<'a>(&'a Listing);

impl fmt::Display for ListingText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listing = self.0;
        for entry in &listing.entries {
            writeln!(f, "{}\t{}", entry.backend, entry.name)?;
        }
        for (backend, error) in &listing.failures {
            writeln!(f, "FAILED {backend}: {error}")?;
        }
        writeln!(f, "{} artifact(s) in {}", listing.len(), listing.namespace)
    }
}

/// One line per artifact, failures last
pub(crate) fn listing(listing: &Listing) -> String {
    ListingText(listing).to_string()
}

struct RankingText<'a>(&'a Ranking);

impl fmt::Display for RankingText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranking = self.0;
        writeln!(f, "Round {} ranking", ranking.round)?;
        writeln!(f, "{:>4}  {:>5}  {:<4}  {:<40}  {:<12}  {}", "#", "score", "", "analysis", "backend", "overview")?;
        for entry in &ranking.entries {
            let verdict = if entry.passes_threshold { "PASS" } else { "" };
            writeln!(
                f,
                "{:>4}  {:>5}  {:<4}  {:<40}  {:<12}  {} / {} / {}",
                entry.rank,
                entry.total_score,
                verdict,
                entry.name,
                entry.backend,
                entry.overview.geography,
                entry.overview.industry,
                entry.overview.stage,
            )?;
        }
        for failure in &ranking.failures {
            let name = failure.name.as_deref().unwrap_or("<listing>");
            writeln!(f, "FAILED {}:{name}: {}", failure.backend, failure.error)?;
        }
        Ok(())
    }
}

pub(crate) fn ranking(ranking: &Ranking) -> String {
    RankingText(ranking).to_string()
}

pub(crate) fn ranking_json(ranking: &Ranking) -> Value {
    let entries: Vec<Value> = ranking
        .entries
        .iter()
        .map(|e| {
            json!({
                "rank": e.rank,
                "name": e.name,
                "backend": e.backend.as_str(),
                "total_score": e.total_score,
                "passes_threshold": e.passes_threshold,
                "overview": e.overview,
            })
        })
        .collect();
    let failures: Vec<Value> = ranking
        .failures
        .iter()
        .map(|f| json!({"backend": f.backend.as_str(), "name": f.name, "error": f.error.to_string()}))
        .collect();
    json!({
        "round": ranking.round.number(),
        "entries": entries,
        "failures": failures,
    })
}

struct PromotionText<'a> {
    report: &'a PromotionReport,
    dry_run: bool,
}

impl fmt::Display for PromotionText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        for outcome in &report.outcomes {
            match &outcome.status {
                PromotionStatus::Promoted { source, bytes } => {
                    writeln!(f, "promoted  {} ({bytes} bytes from {source})", outcome.upload)?;
                }
                PromotionStatus::WouldPromote { source } => {
                    writeln!(f, "would promote  {} (from {source})", outcome.upload)?;
                }
                PromotionStatus::Failed(error) => writeln!(f, "FAILED  {}: {error}", outcome.upload)?,
            }
        }
        let verb = if self.dry_run { "would promote" } else { "promoted" };
        writeln!(
            f,
            "{verb} {} to {}, {} failed, {} skipped",
            report.promoted().count(),
            report.target,
            report.failures().count(),
            report.skipped
        )
    }
}

pub(crate) fn promotion(report: &PromotionReport, dry_run: bool) -> String {
    PromotionText { report, dry_run }.to_string()
}

struct DeleteAllText<'a>(&'a DeleteAllReport);

impl fmt::Display for DeleteAllText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        for (backend, outcome) in &report.outcomes {
            match outcome {
                Ok(count) => writeln!(f, "{backend}: deleted {count}")?,
                Err(error) => writeln!(f, "{backend}: FAILED {error}")?,
            }
        }
        writeln!(f, "{} deleted from {}", report.total_deleted(), report.namespace)
    }
}

pub(crate) fn delete_all(report: &DeleteAllReport) -> String {
    DeleteAllText(report).to_string()
}

struct SyncText<'a>(&'a SyncReport);

impl fmt::Display for SyncText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        for (name, holders) in report.out_of_sync() {
            let held: Vec<&str> = holders.iter().map(|b| b.as_str()).collect();
            writeln!(f, "{name}\tonly in {}", held.join(", "))?;
        }
        for (backend, error) in &report.failures {
            writeln!(f, "FAILED {backend}: {error}")?;
        }
        if report.is_in_sync() {
            writeln!(f, "{} in sync ({} name(s))", report.namespace, report.holders.len())?;
        }
        Ok(())
    }
}

pub(crate) fn sync(report: &SyncReport) -> String {
    SyncText(report).to_string()
}

struct AnalyzeAllText<'a>(&'a AnalyzeAllReport);

impl fmt::Display for AnalyzeAllText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        for (reference, outcome) in &report.outcomes {
            if let Err(error) = outcome {
                writeln!(f, "FAILED {reference}: {error}")?;
            }
        }
        for (backend, error) in &report.listing_failures {
            writeln!(f, "FAILED listing {backend}: {error}")?;
        }
        writeln!(
            f,
            "analyzed {}/{} round-{} upload(s)",
            report.succeeded(),
            report.outcomes.len(),
            report.round
        )
    }
}

pub(crate) fn analyze_all(report: &AnalyzeAllReport) -> String {
    AnalyzeAllText(report).to_string()
}

pub(crate) fn status(upload: &str, stage: Option<DeckStage>) -> String {
    match stage {
        Some(stage) => format!("{upload}: {stage}\n"),
        None => format!("{upload}: not found\n"),
    }
}

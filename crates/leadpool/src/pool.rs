// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact pool commands: `import`, `allocate`, `grant`, `stats`, `reset`.

use std::path::Path;

use leadpool_core::{AllocationOutcome, ImportReport, LeadpoolError, WorkerId};
use leadpool_engine::LeadEngine;
use serde::Serialize;

use crate::output::Output;

/// First column of every row. Plain text files read as one value per line.
pub fn read_first_column(path: &Path) -> Result<Vec<String>, LeadpoolError> {
    let unreadable = |e: csv::Error| {
        LeadpoolError::InvalidArgument(format!("cannot read {}: {e}", path.display()))
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(unreadable)?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(unreadable)?;
        if let Some(first) = record.get(0) {
            values.push(first.to_string());
        }
    }
    Ok(values)
}

#[derive(Debug, Serialize)]
struct ImportResponse<'a> {
    category: &'a str,
    #[serde(flatten)]
    report: ImportReport,
}

pub async fn run_import(
    engine: &LeadEngine,
    category: &str,
    file: &Path,
    out: &Output,
) -> Result<(), LeadpoolError> {
    let values = read_first_column(file)?;
    let report = engine.import_contacts(category, values).await?;
    out.emit(&ImportResponse { category, report }, |paint| {
        println!(
            "{category}: {} imported, {} already present ({} read)",
            paint.good(&report.inserted.to_string()),
            report.skipped,
            report.submitted
        );
    });
    Ok(())
}

pub async fn run_allocate(
    engine: &LeadEngine,
    category: &str,
    worker: &str,
    out: &Output,
) -> Result<(), LeadpoolError> {
    let allocation = engine
        .request_allocation(category, &WorkerId::from(worker))
        .await?;
    out.emit(&allocation, |paint| match allocation.outcome {
        AllocationOutcome::Ok => {
            println!(
                "{} {} contact(s) from {category}",
                paint.good("issued"),
                allocation.values.len()
            );
            for value in &allocation.values {
                println!("  {value}");
            }
        }
        AllocationOutcome::AlreadyAtLimit => println!(
            "{}: {worker} already holds {} of {} allowed in {category}; ask a manager for more",
            paint.warn("quota reached"),
            allocation.already_issued,
            allocation.total_allowed
        ),
        AllocationOutcome::InsufficientSupply => println!(
            "{}: {} free in {category}, {} needed",
            paint.bad("not enough contacts"),
            allocation.stats.free,
            allocation.total_allowed.saturating_sub(allocation.already_issued)
        ),
    });
    Ok(())
}

#[derive(Debug, Serialize)]
struct GrantResponse<'a> {
    worker: &'a str,
    category: &'a str,
    delta: i64,
    extra: u32,
}

pub async fn run_grant(
    engine: &LeadEngine,
    worker: &str,
    category: &str,
    delta: i64,
    out: &Output,
) -> Result<(), LeadpoolError> {
    let extra = engine
        .grant_extra_quota(&WorkerId::from(worker), category, delta)
        .await?;
    let response = GrantResponse {
        worker,
        category,
        delta,
        extra,
    };
    out.emit(&response, |_| {
        println!("{worker} now has +{extra} extra in {category}");
    });
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct StatsRow {
    pub category: String,
    pub free: u64,
    pub total: u64,
    pub free_percent: Option<f64>,
    pub low: bool,
}

pub async fn run_stats(
    engine: &LeadEngine,
    category: Option<&str>,
    low_water_percent: f64,
    out: &Output,
) -> Result<(), LeadpoolError> {
    let slugs: Vec<String> = match category {
        Some(slug) => vec![slug.to_string()],
        None => engine
            .list_categories()
            .await?
            .into_iter()
            .map(|c| c.slug)
            .collect(),
    };

    let mut rows = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let stats = engine.pool_stats(&slug).await?;
        rows.push(StatsRow {
            category: slug,
            free: stats.free,
            total: stats.total,
            free_percent: stats.free_percent(),
            low: stats.is_below_low_water(low_water_percent),
        });
    }

    out.emit(&rows, |paint| {
        for row in &rows {
            let percent = row
                .free_percent
                .map(|p| format!("{p:.1}%"))
                .unwrap_or_else(|| "-".to_string());
            let marker = if row.low { paint.bad(" low") } else { String::new() };
            println!(
                "{:<12} {:>7} / {:<7} {percent}{marker}",
                row.category, row.free, row.total
            );
        }
    });
    Ok(())
}

#[derive(Debug, Serialize)]
struct ResetResponse<'a> {
    category: &'a str,
    reset: u64,
}

pub async fn run_reset(engine: &LeadEngine, category: &str, out: &Output) -> Result<(), LeadpoolError> {
    let reset = engine.reset_category(category).await?;
    out.emit(&ResetResponse { category, reset }, |_| {
        println!("{category}: {reset} contact(s) returned to the pool");
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn first_column_of_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "value,note").unwrap();
        writeln!(file, "@anna_smile,from chat").unwrap();
        writeln!(file, "=+79123456789").unwrap();
        writeln!(file, "  vk.com/id1  ").unwrap();
        let values = read_first_column(file.path()).unwrap();
        assert_eq!(values, ["value", "@anna_smile", "=+79123456789", "vk.com/id1"]);
    }

    #[test]
    fn missing_file_is_an_argument_error() {
        let err = read_first_column(Path::new("/nonexistent/contacts.csv")).unwrap_err();
        assert!(matches!(err, LeadpoolError::InvalidArgument(_)));
    }
}

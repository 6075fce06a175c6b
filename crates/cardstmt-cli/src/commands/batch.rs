//! Batch processing command for multiple statement files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use cardstmt_core::{ParseOutcome, ParserService, StatementParser};

use super::process::{OutputFormat, configure, format_outcome};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching statement PDFs
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of documents parsed at once
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Skip the structured-text backends and go straight to OCR
    #[arg(long)]
    force_ocr: bool,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    outcome: Option<ParseOutcome>,
    error: Option<String>,
    processing_time_ms: u64,
}

/// One row of `summary.csv`.
#[derive(Serialize)]
struct SummaryRow<'a> {
    filename: &'a str,
    status: &'static str,
    issuer: &'a str,
    card_number: &'a str,
    due_date: String,
    total_amount: String,
    currency: &'a str,
    confidence: String,
    backend: &'a str,
    processing_time_ms: u64,
    error: &'a str,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = configure(config_path, args.model_dir.clone())?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!("{} Found {} files to process", style("ℹ").blue(), files.len());

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let multi_progress = MultiProgress::new();
    let overall_pb = multi_progress.add(ProgressBar::new(files.len() as u64));
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let service = ParserService::new(StatementParser::new(&config)?, args.jobs);
    let mut tasks = JoinSet::new();
    for (index, path) in files.into_iter().enumerate() {
        let service = service.clone();
        let force_ocr = args.force_ocr;
        tasks.spawn(async move {
            let file_start = Instant::now();
            let result = service.parse_file(&path, force_ocr).await;
            (index, path, result, file_start.elapsed().as_millis() as u64)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (index, path, result, processing_time_ms) = joined?;
        overall_pb.inc(1);

        match result {
            Ok(outcome) => {
                if let Some(output_dir) = &args.output_dir {
                    write_output(output_dir, &path, &outcome, args.format)?;
                }
                results.push((
                    index,
                    ProcessResult {
                        path,
                        outcome: Some(outcome),
                        error: None,
                        processing_time_ms,
                    },
                ));
            }
            Err(e) => {
                let error_msg = e.to_string();
                if !args.continue_on_error {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    tasks.abort_all();
                    overall_pb.abandon();
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
                warn!("Failed to process {}: {}", path.display(), error_msg);
                results.push((
                    index,
                    ProcessResult {
                        path,
                        outcome: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    },
                ));
            }
        }
    }

    overall_pb.finish_with_message("Complete");

    results.sort_by_key(|(index, _)| *index);
    let results: Vec<ProcessResult> = results.into_iter().map(|(_, r)| r).collect();

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!("{} Summary written to {}", style("✓").green(), summary_path.display());
    }

    let successful = results.iter().filter(|r| r.outcome.is_some()).count();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn write_output(output_dir: &Path, path: &Path, outcome: &ParseOutcome, format: OutputFormat) -> anyhow::Result<()> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let output_path = output_dir.join(format!("{}.{}", stem, format.extension()));

    fs::write(&output_path, format_outcome(outcome, format)?)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(())
}

fn summary_row(result: &ProcessResult) -> SummaryRow<'_> {
    let filename = result.path.file_name().and_then(|s| s.to_str()).unwrap_or("");

    match &result.outcome {
        Some(outcome) => {
            let total = outcome.fields.total_amount.value.as_ref();
            SummaryRow {
                filename,
                status: "success",
                issuer: outcome.issuer.tag(),
                card_number: outcome.fields.card_number.value.as_deref().unwrap_or(""),
                due_date: outcome.fields.due_date.value.map(|d| d.to_string()).unwrap_or_default(),
                total_amount: total.map(|a| a.value.to_string()).unwrap_or_default(),
                currency: total.map(|a| a.currency.code()).unwrap_or(""),
                confidence: format!("{:.2}", outcome.confidence),
                backend: outcome.metadata.backend.as_str(),
                processing_time_ms: result.processing_time_ms,
                error: "",
            }
        }
        None => SummaryRow {
            filename,
            status: "error",
            issuer: "",
            card_number: "",
            due_date: String::new(),
            total_amount: String::new(),
            currency: "",
            confidence: String::new(),
            backend: "",
            processing_time_ms: result.processing_time_ms,
            error: result.error.as_deref().unwrap_or(""),
        },
    }
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for result in results {
        wtr.serialize(summary_row(result))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_for_failed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let results = vec![ProcessResult {
            path: PathBuf::from("statements/broken.pdf"),
            outcome: None,
            error: Some("insufficient text".to_string()),
            processing_time_ms: 7,
        }];

        write_summary(&path, &results).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next().unwrap(),
            "filename,status,issuer,card_number,due_date,total_amount,currency,confidence,backend,processing_time_ms,error"
        );
        assert_eq!(lines.next().unwrap(), "broken.pdf,error,,,,,,,,7,insufficient text");
    }
}

//! Process command - extract data from a single statement file.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use cardstmt_core::statement::rules::{format_amount, is_future_date};
use cardstmt_core::{DateRange, FieldResult, ParseOutcome, ParserService, StatementConfig};

/// Days ahead of today a due date may reasonably fall.
const DUE_DATE_HORIZON_DAYS: i64 = 90;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input statement PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Skip the structured-text backends and go straight to OCR
    #[arg(long)]
    force_ocr: bool,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,

    /// Validate extracted data
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Apply command-line overrides to the loaded configuration.
pub fn configure(config_path: Option<&str>, model_dir: Option<PathBuf>) -> anyhow::Result<StatementConfig> {
    let mut config = super::config::load(config_path)?;
    if let Some(model_dir) = model_dir {
        config.ocr.model_dir = model_dir;
    }
    Ok(config)
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = configure(config_path, args.model_dir.clone())?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(if args.force_ocr { "Running OCR..." } else { "Extracting text..." });

    let service = ParserService::from_config(&config)?;
    let result = service.parse_file(&args.input, args.force_ocr).await;

    let outcome = match result {
        Ok(outcome) => {
            pb.finish_with_message("Done");
            outcome
        }
        Err(e) => {
            pb.finish_and_clear();
            anyhow::bail!("Failed to process {}: {}", args.input.display(), e);
        }
    };

    if args.validate {
        let issues = validate(&outcome, Local::now().date_naive());
        if !issues.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }

    let output = format_outcome(&outcome, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Extraction confidence: {:.1}%",
            style("ℹ").blue(),
            outcome.confidence * 100.0
        );
        let fields = &outcome.fields;
        for (name, confidence) in FIELD_NAMES.iter().zip(fields.confidences()) {
            println!("   {:<18} {:.2}", name, confidence);
        }
        println!(
            "{} Backend: {}{}",
            style("ℹ").blue(),
            outcome.metadata.backend,
            outcome
                .metadata
                .recovered_from
                .map(|primary| format!(" (recovered from {})", primary))
                .unwrap_or_default()
        );
        println!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            outcome.metadata.processing_time_ms
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

const FIELD_NAMES: [&str; 5] = ["issuer_name", "card_number", "statement_period", "due_date", "total_amount"];

/// Outcome checks plus date sanity against `today`.
pub fn validate(outcome: &ParseOutcome, today: NaiveDate) -> Vec<String> {
    let mut issues = outcome.validate();

    if let Some(end) = outcome.fields.statement_period.value.and_then(|p| p.end) {
        if end > today {
            issues.push(format!("Statement date {} is in the future", end));
        }
    }

    if let Some(due) = outcome.fields.due_date.value {
        if due > today && !is_future_date(due, today, DUE_DATE_HORIZON_DAYS) {
            issues.push(format!(
                "Due date {} is more than {} days ahead",
                due, DUE_DATE_HORIZON_DAYS
            ));
        }
    }

    issues
}

pub fn format_outcome(outcome: &ParseOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => format_csv(outcome),
        OutputFormat::Text => Ok(format_text(outcome)),
    }
}

fn format_csv(outcome: &ParseOutcome) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "filename",
        "issuer",
        "issuer_name",
        "card_number",
        "period_start",
        "period_end",
        "due_date",
        "total_amount",
        "currency",
        "minimum_amount_due",
        "confidence",
        "backend",
    ])?;

    let fields = &outcome.fields;
    let period = fields.statement_period.value.unwrap_or_default();
    let total = fields.total_amount.value;

    let minimum = outcome.optional.minimum_amount_due.as_ref().and_then(|f| f.value);

    wtr.write_record([
        outcome.metadata.filename.clone(),
        outcome.issuer.tag().to_string(),
        fields.issuer_name.value.clone().unwrap_or_default(),
        fields.card_number.value.clone().unwrap_or_default(),
        date_or_empty(period.start),
        date_or_empty(period.end),
        date_or_empty(fields.due_date.value),
        total.map(|a| a.value.to_string()).unwrap_or_default(),
        total.map(|a| a.currency.code().to_string()).unwrap_or_default(),
        minimum.map(|a| a.value.to_string()).unwrap_or_default(),
        format!("{:.2}", outcome.confidence),
        outcome.metadata.backend.to_string(),
    ])?;

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_text(outcome: &ParseOutcome) -> String {
    let fields = &outcome.fields;
    let mut output = String::new();

    output.push_str(&format!(
        "Issuer: {} ({})\n",
        fields.issuer_name.value.as_deref().unwrap_or(outcome.issuer.display_name()),
        outcome.issuer.tag()
    ));
    output.push_str(&format!("Card: {}\n", or_dash(&fields.card_number, |v| v.clone())));
    output.push_str(&format!("Period: {}\n", or_dash(&fields.statement_period, format_period)));
    output.push_str(&format!("Due date: {}\n", or_dash(&fields.due_date, |d| d.to_string())));
    output.push_str(&format!("Total due: {}\n", or_dash(&fields.total_amount, format_amount)));

    let optional = &outcome.optional;
    if !optional.is_empty() {
        output.push('\n');
    }
    if let Some(amount) = optional.minimum_amount_due.as_ref().and_then(|f| f.value.as_ref()) {
        output.push_str(&format!("Minimum due: {}\n", format_amount(amount)));
    }
    if let Some(amount) = optional.previous_balance.as_ref().and_then(|f| f.value.as_ref()) {
        output.push_str(&format!("Previous balance: {}\n", format_amount(amount)));
    }
    if let Some(amount) = optional.available_credit_limit.as_ref().and_then(|f| f.value.as_ref()) {
        output.push_str(&format!("Available credit: {}\n", format_amount(amount)));
    }
    if let Some(points) = optional.reward_points.as_ref().and_then(|f| f.value.as_ref()) {
        output.push_str(&format!("Reward points: {}\n", points));
    }

    if !optional.transactions.is_empty() {
        output.push_str("\nTransactions:\n");
        for tx in &optional.transactions {
            output.push_str(&format!(
                "  {}  {:<40} {}{}\n",
                tx.date,
                tx.description,
                format_amount(&tx.amount),
                if tx.credit { " Cr" } else { "" }
            ));
        }
    }

    output
}

fn or_dash<T>(field: &FieldResult<T>, render: impl Fn(&T) -> String) -> String {
    field.value.as_ref().map(render).unwrap_or_else(|| "-".to_string())
}

fn format_period(period: &DateRange) -> String {
    match (period.start, period.end) {
        (Some(start), Some(end)) => format!("{} to {}", start, end),
        (None, Some(end)) => format!("statement date {}", end),
        (Some(start), None) => format!("from {}", start),
        (None, None) => "-".to_string(),
    }
}

fn date_or_empty(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

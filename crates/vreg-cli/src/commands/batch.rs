//! Batch processing command for multiple documents.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, warn};

use vreg_core::export::CsvExporter;
use vreg_core::models::record::FieldRecord;
use vreg_core::VregError;

use super::{
    build_extractor, build_pipeline, load_config, load_document, CredentialArgs, InputKind,
    StrategyArg,
};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input files (images or .txt OCR text)
    #[arg(required = true)]
    input: String,

    /// Output CSV file
    #[arg(short, long, default_value = "vehicles.csv")]
    output: PathBuf,

    /// How values are located relative to their labels
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,

    #[command(flatten)]
    credentials: CredentialArgs,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome of processing a single file.
enum Status {
    Ok,
    Empty,
    Failed(String),
}

impl Status {
    fn label(&self) -> String {
        match self {
            Status::Ok => "ok".to_string(),
            Status::Empty => "empty".to_string(),
            Status::Failed(message) => format!("error: {}", message),
        }
    }
}

struct ProcessResult {
    path: PathBuf,
    record: FieldRecord,
    status: Status,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let mut files: Vec<(PathBuf, InputKind)> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter_map(|p| InputKind::of(&p).map(|kind| (p, kind)))
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let needs_ocr = files.iter().any(|(_, kind)| *kind == InputKind::Image);
    let extractor = build_extractor(&config, args.strategy)?;
    let pipeline = build_pipeline(&config, extractor, &args.credentials, needs_ocr)?;

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());

    for (path, kind) in files {
        match load_document(&pipeline, &path, kind).await {
            Ok(document) => {
                let record = document.extraction.record;
                let status = if record.is_empty() { Status::Empty } else { Status::Ok };
                results.push(ProcessResult { path, record, status });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        record: FieldRecord::default(),
                        status: Status::Failed(error_msg),
                    });
                } else {
                    overall_pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing {} failed: {}", path.display(), error_msg);
                }
            }
        }

        overall_pb.inc(1);
    }

    overall_pb.finish_and_clear();

    let exporter = CsvExporter::from_config(&config.export);
    let rows = results.iter().map(|r| {
        (
            vec![r.path.display().to_string(), r.status.label()],
            &r.record,
        )
    });
    let bytes = exporter
        .export_with_columns(&["source", "status"], rows)
        .map_err(VregError::from)?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, bytes)?;

    let failed: Vec<_> = results
        .iter()
        .filter(|r| matches!(r.status, Status::Failed(_)))
        .collect();
    let empty = results.iter().filter(|r| matches!(r.status, Status::Empty)).count();

    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} with fields, {} empty, {} failed",
        style(results.len() - failed.len() - empty).green(),
        style(empty).yellow(),
        style(failed.len()).red()
    );
    println!(
        "{} Results written to {}",
        style("✓").green(),
        args.output.display()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            if let Status::Failed(message) = &result.status {
                println!("  - {}: {}", result.path.display(), message);
            }
        }
    }

    Ok(())
}

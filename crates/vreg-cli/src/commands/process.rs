//! Process command - extract fields from a single document.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use vreg_core::export::{CsvExporter, JsonExporter, RecordExporter};
use vreg_core::models::config::VregConfig;
use vreg_core::models::record::FieldRecord;
use vreg_core::pipeline::Document;
use vreg_core::VregError;

use super::{
    build_extractor, build_pipeline, load_config, load_document, CredentialArgs, InputKind,
    StrategyArg,
};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (image, or .txt with OCR text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// How values are located relative to their labels
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,

    #[command(flatten)]
    credentials: CredentialArgs,

    /// Print the OCR text to stderr
    #[arg(long)]
    show_text: bool,

    /// Print which rule matched each field to stderr
    #[arg(long)]
    show_matches: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON object keyed by field label
    Json,
    /// CSV with a header row
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let Some(kind) = InputKind::of(&args.input) else {
        anyhow::bail!("Unsupported file format: {}", args.input.display());
    };

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    let extractor = build_extractor(&config, args.strategy)?;
    let pipeline = build_pipeline(&config, extractor, &args.credentials, kind == InputKind::Image)?;

    pb.set_message(match kind {
        InputKind::Image => "Running OCR...",
        InputKind::Text => "Extracting fields...",
    });

    let document = match load_document(&pipeline, &args.input, kind).await {
        Ok(document) => document,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.finish_and_clear();

    if args.show_text {
        eprintln!("{}", style("OCR text:").bold());
        eprintln!("{}", document.ocr_text);
        eprintln!();
    }

    if args.show_matches {
        print_matches(&document);
    }

    let record = &document.extraction.record;
    let output = format_record(record, args.format, &config)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&output)?;
        if !output.ends_with(b"\n") {
            stdout.write_all(b"\n")?;
        }
    }

    if record.is_empty() {
        eprintln!("{} No fields recognised", style("ℹ").blue());
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn print_matches(document: &Document) {
    eprintln!("{}", style("Matches:").bold());
    for m in &document.extraction.matches {
        match m.line {
            Some(line) => eprintln!("  {:<20} rule {} line {}: {}", m.field, m.rule, line + 1, m.value),
            None => eprintln!("  {:<20} rule {}: {}", m.field, m.rule, m.value),
        }
    }
    for adjustment in &document.extraction.adjustments {
        if let Ok(json) = serde_json::to_string(adjustment) {
            eprintln!("  {} {}", style("adjusted").yellow(), json);
        }
    }
    eprintln!();
}

fn format_record(record: &FieldRecord, format: OutputFormat, config: &VregConfig) -> anyhow::Result<Vec<u8>> {
    match format {
        OutputFormat::Json => {
            let exporter = JsonExporter::from_config(&config.export);
            Ok(exporter.export_record(record).map_err(VregError::from)?)
        }
        OutputFormat::Csv => {
            let exporter = CsvExporter::from_config(&config.export);
            Ok(exporter.export(std::slice::from_ref(record)).map_err(VregError::from)?)
        }
        OutputFormat::Text => Ok(format_text(record).into_bytes()),
    }
}

fn format_text(record: &FieldRecord) -> String {
    let mut output = String::new();

    for (field, value) in record.iter() {
        let value = if value.is_empty() { "-" } else { value };
        output.push_str(&format!("{:<20} {}\n", format!("{}:", field), value));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use vreg_core::registration::{RecordExtractor, VehicleExtractor};

    #[test]
    fn test_format_text_marks_missing_fields() {
        let record = VehicleExtractor::new().extract("Make\nTOYOTA\n");
        let text = format_text(&record);

        assert!(text.contains(&format!("{:<20} TOYOTA\n", "Make:")));
        assert!(text.contains(&format!("{:<20} -\n", "Owner:")));
        assert_eq!(text.lines().count(), 7);
    }
}

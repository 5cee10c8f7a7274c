pub mod aggregate;
pub mod clean;
pub mod cli;
pub mod data;
pub mod dates;
pub mod io_utils;
pub mod kpi;
pub mod mapper;
pub mod math;
pub mod schema;
pub mod table;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::{
    cli::{AnalyzeArgs, CleanArgs, Cli, Commands, MapArgs},
    data::Frame,
    mapper::MappingResult,
    schema::CanonicalSchema,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("revenue_lens", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Map(args) => handle_map(&args),
        Commands::Clean(args) => handle_clean(&args),
        Commands::Analyze(args) => handle_analyze(&args),
    }
}

fn load_schema(path: Option<&Path>) -> Result<CanonicalSchema> {
    match path {
        Some(path) => CanonicalSchema::load(path)
            .with_context(|| format!("Loading canonical schema from {path:?}")),
        None => Ok(CanonicalSchema::default()),
    }
}

fn read_mapped(
    input: &Path,
    delimiter: Option<u8>,
    encoding_label: Option<&str>,
    schema: &CanonicalSchema,
) -> Result<(Frame, MappingResult)> {
    let delimiter = io_utils::resolve_input_delimiter(input, delimiter);
    let encoding = io_utils::resolve_encoding(encoding_label)?;
    let raw = io_utils::read_raw_frame(input, delimiter, encoding)
        .with_context(|| format!("Reading raw table from {input:?}"))?;
    info!(
        "Read {} row(s) across {} column(s) from '{}'",
        raw.len(),
        raw.columns.len(),
        input.display()
    );
    Ok(mapper::apply(raw, schema))
}

fn require_complete(mapping: &MappingResult) -> Result<()> {
    if !mapping.is_complete() {
        bail!(
            "Input is missing required field(s): {}. Run the 'map' command to inspect the column mapping.",
            mapping.missing_required.join(", ")
        );
    }
    Ok(())
}

fn handle_map(args: &MapArgs) -> Result<()> {
    let schema = load_schema(args.schema.as_deref())?;
    let (_, mapping) = read_mapped(
        &args.input,
        args.delimiter,
        args.input_encoding.as_deref(),
        &schema,
    )?;
    let headers = vec![
        "field".to_string(),
        "source".to_string(),
        "status".to_string(),
    ];
    table::print_table(&headers, &mapping.table_rows());
    if mapping.is_complete() {
        info!("Resolved {} field(s); all required fields present", mapping.bindings.len());
    } else {
        warn!(
            "Missing required field(s): {}",
            mapping.missing_required.join(", ")
        );
    }
    Ok(())
}

fn handle_clean(args: &CleanArgs) -> Result<()> {
    let schema = load_schema(args.schema.as_deref())?;
    let (mapped, mapping) = read_mapped(
        &args.input,
        args.delimiter,
        args.input_encoding.as_deref(),
        &schema,
    )?;
    require_complete(&mapping)?;

    let (cleaned, report) = clean::clean(mapped, &schema);
    for line in report.summary_lines() {
        info!("{line}");
    }

    let input_delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let output_delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.output_delimiter,
        input_delimiter,
    );
    io_utils::write_frame(&cleaned, args.output.as_deref(), output_delimiter)
        .context("Writing cleaned table")?;
    info!(
        "Wrote {} cleaned row(s) to {}",
        cleaned.len(),
        args.output
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into())
    );
    Ok(())
}

fn handle_analyze(args: &AnalyzeArgs) -> Result<()> {
    let schema = load_schema(args.schema.as_deref())?;
    let (mapped, mapping) = read_mapped(
        &args.input,
        args.delimiter,
        args.input_encoding.as_deref(),
        &schema,
    )?;
    require_complete(&mapping)?;

    let (cleaned, report) = clean::clean(mapped, &schema);
    for line in report.summary_lines() {
        info!("{line}");
    }
    if cleaned.is_empty() {
        warn!("No usable rows after cleaning; reporting empty metrics");
    }

    let monthly = aggregate::monthly_summary(&cleaned);
    let kpis = kpi::compute(&cleaned, &monthly);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&kpis).context("Serializing KPI set")?
        );
        return Ok(());
    }

    println!("KPIs");
    table::print_table(
        &["metric".to_string(), "value".to_string()],
        &kpis.table_rows(),
    );

    println!();
    println!("Monthly summary");
    table::print_table(
        &aggregate::monthly_table_headers(&monthly),
        &aggregate::monthly_table_rows(&monthly),
    );

    if let Some(field) = &args.segment {
        let segments = aggregate::segment_summary(&cleaned, field);
        if segments.is_empty() {
            warn!("No '{field}' column in the cleaned table; segment summary skipped");
        } else {
            println!();
            println!("Summary by {field}");
            let headers = vec![
                "segment".to_string(),
                "total_revenue".to_string(),
                "total_orders".to_string(),
                "unique_customers".to_string(),
                "avg_order_value".to_string(),
            ];
            table::print_table(&headers, &aggregate::segment_table_rows(&segments));
        }
    }

    if args.daily {
        let daily = aggregate::daily_summary(&cleaned);
        println!();
        println!("Daily summary");
        let headers = vec![
            "date".to_string(),
            "daily_revenue".to_string(),
            "daily_orders".to_string(),
        ];
        table::print_table(&headers, &aggregate::daily_table_rows(&daily));
    }
    Ok(())
}

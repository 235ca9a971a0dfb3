use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use migration_dashboard::data::RecordSet;
use migration_dashboard::derive::derive;
use migration_dashboard::registry::{dashboard_registry, validate_registry};
use migration_dashboard::sink::{present, HtmlSink, PageHeader};
use migration_dashboard::{csv_reader, load_dataset, runtime, OutputFormat, RenderOptions};

#[derive(Parser, Debug)]
#[command(name = "migration-dashboard")]
#[command(about = "Render the bird migration dashboard from a CSV dataset", long_about = None)]
struct Args {
    /// Dataset path (CSV, or JSON array of objects); omit or '-' for CSV on stdin
    data: Option<PathBuf>,

    /// Output directory for index.html, images and manifest.json
    #[arg(short, long)]
    out: PathBuf,

    /// JSON file with render options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Image format (png or svg)
    #[arg(long)]
    format: Option<OutputFormat>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Rows shown in the dataset preview
    #[arg(long)]
    preview_rows: Option<usize>,

    /// Print the manifest to stdout
    #[arg(long)]
    json: bool,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let options = load_options(&args)?;

    let records = match args.data.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            load_dataset(path).context("Failed to load dataset")?
        }
        _ => RecordSet::from_csv(
            csv_reader::read_csv_from_stdin().context("Failed to read CSV from stdin")?,
        ),
    };
    info!(rows = records.len(), columns = records.headers.len(), "dataset loaded");

    let derived = derive(&records);

    let sections = dashboard_registry(&options.registry_options());
    validate_registry(&sections).context("Dashboard registry is malformed")?;

    let mut sink = HtmlSink::new(&args.out)
        .with_context(|| format!("Failed to create output directory '{}'", args.out.display()))?;
    let count = present(
        runtime::render(&derived, &sections, &options),
        &PageHeader::dashboard(),
        &mut sink,
    )
    .context("Failed to write dashboard")?;
    info!(sections = count, out = %sink.out_dir().display(), "dashboard written");

    if args.json {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        serde_json::to_writer_pretty(&mut handle, &sink.manifest())
            .context("Failed to write manifest to stdout")?;
        writeln!(handle).context("Failed to write manifest to stdout")?;
        handle.flush().context("Failed to flush stdout")?;
    }

    Ok(())
}

fn load_options(args: &Args) -> Result<RenderOptions> {
    let mut options = match &args.config {
        Some(path) => RenderOptions::from_json_file(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => RenderOptions::default(),
    };

    if let Some(format) = args.format {
        options.format = format;
    }
    if let Some(width) = args.width {
        options.width = width;
    }
    if let Some(height) = args.height {
        options.height = height;
    }
    if let Some(rows) = args.preview_rows {
        options.preview_rows = rows;
    }
    options.validate().context("Invalid render options")?;
    Ok(options)
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tagtable::render::grid::GridStyle;
use tagtable::render::json::JsonLayout;
use tagtable::{
    DEFAULT_CLASSIFICATION_KEY, DEFAULT_CONCAT_SEPARATOR, KeyStyle, ParseOptions, ParseReport,
    ValuePolicy, convert_to_grid, convert_to_json,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "tagtable",
    version,
    about = "Rebuild tag-annotated tables into JSON records or CSV grids"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write tables as JSON records.
    Json(JsonArgs),
    /// Write tables as CSV grid blocks, one per table.
    Grid(GridArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Input tag text (UTF-8, UTF-16 with BOM, or Shift_JIS).
    input: PathBuf,

    /// Output path.
    output: PathBuf,

    /// Number of header rows; inferred per table when omitted.
    #[arg(long)]
    header_depth: Option<usize>,

    /// How spanned data cells are read: first_nonempty, last_nonempty or concat.
    #[arg(long, default_value = "concat")]
    value_policy: String,

    /// Separator used by the concat policy.
    #[arg(long = "concat-sep", default_value = DEFAULT_CONCAT_SEPARATOR)]
    concat_separator: String,

    /// Add a column labelling rows by the vertical span that covers them.
    #[arg(long)]
    add_classification: bool,

    /// Name of the classification column.
    #[arg(long, default_value = DEFAULT_CLASSIFICATION_KEY)]
    group_key: String,

    /// Grid column the classification is read from.
    #[arg(long, default_value_t = 0)]
    classification_column: usize,

    /// Keep empty source rows as divider rows.
    #[arg(long)]
    keep_dividers: bool,

    /// Do not merge continuation tables or side-by-side fragments.
    #[arg(long)]
    no_merge: bool,

    /// Column key style: full-path or leaf.
    #[arg(long, default_value = "full-path")]
    key_style: String,

    /// Print every warning, not just the count.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct JsonArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Nest row values by header path and group rows by classification.
    #[arg(long)]
    nested: bool,
}

#[derive(Debug, Args)]
struct GridArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Leave values continued from a vertical span blank.
    #[arg(long)]
    restore_spans: bool,
}

fn parse_options(args: &CommonArgs) -> Result<ParseOptions> {
    let value_policy =
        ValuePolicy::from_str(&args.value_policy).context("failed to parse --value-policy")?;
    let key_style = KeyStyle::from_str(&args.key_style).context("failed to parse --key-style")?;

    let options = ParseOptions {
        header_depth: args.header_depth,
        value_policy,
        concat_separator: args.concat_separator.clone(),
        add_classification: args.add_classification,
        classification_key: args.group_key.clone(),
        classification_column: args.classification_column,
        keep_dividers: args.keep_dividers,
        merge_tables: !args.no_merge,
        key_style,
    };
    options.validate().context("invalid options")?;
    Ok(options)
}

fn log_report(report: &ParseReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} table={:?} line={:?} row={:?}: {}",
                warning.code, warning.table_id, warning.line, warning.row, warning.message
            );
        }
    }
}

fn run_json(args: &JsonArgs) -> Result<ParseReport> {
    let options = parse_options(&args.common)?;
    let layout = if args.nested {
        JsonLayout::Nested
    } else {
        JsonLayout::Flat
    };
    convert_to_json(&args.common.input, &args.common.output, &options, layout).with_context(
        || format!("failed to convert '{}'", args.common.input.display()),
    )
}

fn run_grid(args: &GridArgs) -> Result<ParseReport> {
    let options = parse_options(&args.common)?;
    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }
    let style = if args.restore_spans {
        GridStyle::Restored
    } else {
        GridStyle::Flattened
    };

    #[allow(clippy::cast_possible_truncation)]
    let delimiter = args.delimiter as u8;
    convert_to_grid(
        &args.common.input,
        &args.common.output,
        &options,
        style,
        delimiter,
    )
    .with_context(|| format!("failed to convert '{}'", args.common.input.display()))
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tagtable=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    let (result, verbose) = match &cli.command {
        Commands::Json(args) => (run_json(args), args.common.verbose),
        Commands::Grid(args) => (run_grid(args), args.common.verbose),
    };

    match result {
        Ok(report) => {
            log_report(&report, verbose);
            if report.table_count() > 0 {
                eprintln!(
                    "wrote {} table(s), {} row(s)",
                    report.table_count(),
                    report.row_count()
                );
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}

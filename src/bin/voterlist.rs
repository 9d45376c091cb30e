//! CLI binary for voterlist.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and writes the report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use voterlist::convert::report_title;
use voterlist::report::write_csv;
use voterlist::{
    convert, convert_to_file, preview, write_report, BatchReport, BatchStatus,
    DecodeProgressCallback, ExportRecord, HeaderPolicy, NewRecordPolicy, PageSelection,
    PipelineConfig, ProgressCallback, ReportFormat,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar over every batch of the run, one log line per
/// column and per failed batch.
struct CliProgressCallback {
    bar: ProgressBar,
    fallbacks: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` tells us how many batches there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading table…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            fallbacks: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} batches  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Decoding");
        self.bar.reset_eta();
    }
}

impl DecodeProgressCallback for CliProgressCallback {
    fn on_run_start(&self, records: usize, batches: usize) {
        self.activate_bar(batches);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Decoding {records} voters in {batches} batches…"))
        ));
    }

    fn on_field_start(&self, field: &str, selected: usize, batches: usize) {
        self.bar.set_message(field.to_string());
        self.bar.println(format!(
            "  {} {:<14} {}",
            cyan("›"),
            field,
            dim(&format!("{selected} values, {batches} batches")),
        ));
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        match &report.status {
            BatchStatus::Fallback { error } => {
                self.fallbacks.fetch_add(1, Ordering::SeqCst);
                let msg = error.to_string();
                let msg = if msg.chars().count() > 80 {
                    format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
                } else {
                    msg
                };
                self.bar.println(format!(
                    "    {} {} batch {}/{}  {}",
                    red("✗"),
                    report.field,
                    report.index + 1,
                    report.of,
                    red(&msg),
                ));
            }
            BatchStatus::Padded { missing } => self.bar.println(format!(
                "    {} {} batch {}/{}  {}",
                cyan("⚠"),
                report.field,
                report.index + 1,
                report.of,
                dim(&format!("{missing} lines missing, padded")),
            )),
            BatchStatus::Truncated { extra } => self.bar.println(format!(
                "    {} {} batch {}/{}  {}",
                cyan("⚠"),
                report.field,
                report.index + 1,
                report.of,
                dim(&format!("{extra} extra lines dropped")),
            )),
            BatchStatus::Decoded => {}
        }
        self.bar.inc(1);
    }

    fn on_run_complete(&self, records: usize, fallbacks: usize) {
        self.bar.finish_and_clear();
        if fallbacks == 0 {
            eprintln!(
                "{} {} voters decoded",
                green("✔"),
                bold(&records.to_string())
            );
        } else {
            eprintln!(
                "{} {} voters  ({} batches left undecoded)",
                cyan("⚠"),
                bold(&records.to_string()),
                red(&fallbacks.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Decode a roll into an HTML table
  voterlist S11A90P143.pdf -o part143.html

  # CSV instead, smaller batches, slower converter
  voterlist S11A90P143.pdf -o part143.csv --batch-size 100 --settle-delay 1500

  # A table already extracted by another tool
  voterlist part143_rows.csv -o part143.html

  # Check the extraction without contacting the converter
  voterlist --preview --pages 3-5 S11A90P143.pdf

  # Full run report (records, per-batch outcome, stats) as JSON
  voterlist --json S11A90P143.pdf > run.json

ROW HEURISTICS:
  --header-policy all-of   drop rows containing both RELATION and SEX (default)
  --header-policy any-of   drop rows containing RELATION, SEX or AGE
  --min-age 17             also start a new voter when AGE is a number above 17

ENVIRONMENT VARIABLES:
  VOTERLIST_CONVERTER_URL  Converter page (default: unirev web converter)
  PDFIUM_LIB_PATH          Path to an existing libpdfium
  RUST_LOG                 Override log filter (e.g. voterlist=debug)
"#;

/// Rebuild decoded voter lists from electoral-roll PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "voterlist",
    version,
    about = "Rebuild decoded voter lists from electoral-roll PDFs",
    long_about = "Extract the 15-column voter table from an electoral-roll PDF (or a CSV of \
already-extracted rows), merge wrapped rows back into one record per voter, and decode the \
text columns through an online transliteration converter.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF or CSV path, or HTTP/HTTPS URL.
    input: String,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "VOTERLIST_OUTPUT")]
    output: Option<PathBuf>,

    /// Report format; inferred from the output extension when omitted.
    #[arg(long, env = "VOTERLIST_FORMAT", value_enum)]
    format: Option<FormatArg>,

    /// Values per converter exchange.
    #[arg(long, env = "VOTERLIST_BATCH_SIZE", default_value_t = 150,
          value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: u64,

    /// Wait after triggering a conversion before reading it, in ms.
    #[arg(long, env = "VOTERLIST_SETTLE_DELAY", default_value_t = 800)]
    settle_delay: u64,

    /// Wait after loading the converter page, in ms.
    #[arg(long, env = "VOTERLIST_WARMUP_DELAY", default_value_t = 2000)]
    warmup_delay: u64,

    /// How repeated table headers are recognised.
    #[arg(long, env = "VOTERLIST_HEADER_POLICY", value_enum, default_value = "all-of")]
    header_policy: HeaderPolicyArg,

    /// Also treat a row as a new voter when AGE is a number above this.
    #[arg(long, env = "VOTERLIST_MIN_AGE")]
    min_age: Option<u32>,

    /// Do not use a numeric SL as a new-voter signal.
    #[arg(long)]
    no_sl_test: bool,

    /// Do not use the ID card as a new-voter signal.
    #[arg(long)]
    no_id_test: bool,

    /// ID-card value that marks a stray header row.
    #[arg(long, env = "VOTERLIST_ID_CARD_PLACEHOLDER", default_value = "ID_CARD_NO")]
    id_card_placeholder: String,

    /// Converter page URL.
    #[arg(long, env = "VOTERLIST_CONVERTER_URL",
          default_value = voterlist::config::DEFAULT_CONVERTER_URL)]
    converter_url: String,

    /// Form field the converter reads its input from.
    #[arg(long, env = "VOTERLIST_INPUT_FIELD", default_value = "input")]
    input_field: String,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "VOTERLIST_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "VOTERLIST_PASSWORD")]
    password: Option<String>,

    /// Extract and merge only; do not contact the converter.
    #[arg(long, alias = "dry-run")]
    preview: bool,

    /// Print the full run output (records, batches, stats) as JSON.
    #[arg(long, env = "VOTERLIST_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "VOTERLIST_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "VOTERLIST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "VOTERLIST_QUIET")]
    quiet: bool,

    /// HTTP download timeout for URL inputs, in seconds.
    #[arg(long, env = "VOTERLIST_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-request converter timeout, in seconds.
    #[arg(long, env = "VOTERLIST_REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Html,
    Csv,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Html => ReportFormat::Html,
            FormatArg::Csv => ReportFormat::Csv,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum HeaderPolicyArg {
    AllOf,
    AnyOf,
}

impl From<HeaderPolicyArg> for HeaderPolicy {
    fn from(v: HeaderPolicyArg) -> Self {
        match v {
            HeaderPolicyArg::AllOf => HeaderPolicy::AllOf,
            HeaderPolicyArg::AnyOf => HeaderPolicy::AnyOf,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.preview;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn DecodeProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let format = cli.format.map(ReportFormat::from);

    // ── Preview mode ─────────────────────────────────────────────────────
    if cli.preview {
        let records = preview(&cli.input, &config)
            .await
            .context("Preview failed")?;
        emit_records(&cli, &records, format).await?;
        if !cli.quiet {
            eprintln!(
                "{} {} voters extracted (not decoded)",
                green("✔"),
                bold(&records.len().to_string())
            );
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    if let (Some(output_path), false) = (&cli.output, cli.json) {
        let stats = convert_to_file(&cli.input, output_path, format, &config)
            .await
            .context("Conversion failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} voters  {} batches  {}ms  →  {}",
                if stats.fallback_batches == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                stats.exported_records,
                stats.batches,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
            eprintln!(
                "   {} rows read  /  {} headers dropped  /  {} wrapped rows merged",
                dim(&stats.raw_rows.to_string()),
                dim(&stats.header_rows.to_string()),
                dim(&stats.continuation_rows.to_string()),
            );
        }
        return Ok(());
    }

    let output = convert(&cli.input, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        match cli.output {
            Some(ref path) => tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => println!("{json}"),
        }
    } else {
        emit_records(&cli, &output.records, format).await?;
    }

    if !cli.quiet && !show_progress {
        eprintln!(
            "Decoded {} voters in {} batches ({} fell back) in {}ms",
            output.stats.exported_records,
            output.stats.batches,
            output.stats.fallback_batches,
            output.stats.total_duration_ms
        );
    }

    Ok(())
}

/// Write records to `--output`, or as CSV/JSON to stdout.
async fn emit_records(
    cli: &Cli,
    records: &[ExportRecord],
    format: Option<ReportFormat>,
) -> Result<()> {
    match cli.output {
        Some(ref path) => {
            let format = format
                .or_else(|| ReportFormat::from_path(path))
                .unwrap_or_default();
            write_report(records, path, format, &report_title(&cli.input))
                .await
                .context("Failed to write report")?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            match format.unwrap_or(ReportFormat::Csv) {
                ReportFormat::Csv => write_csv(records, &mut handle)?,
                ReportFormat::Json => {
                    serde_json::to_writer_pretty(&mut handle, records)?;
                    handle.write_all(b"\n")?;
                }
                ReportFormat::Html => {
                    voterlist::report::write_html(records, &report_title(&cli.input), &mut handle)?
                }
            }
        }
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = PipelineConfig::builder()
        .batch_size(cli.batch_size as usize)
        .settle_delay_ms(cli.settle_delay)
        .warmup_delay_ms(cli.warmup_delay)
        .header_policy(cli.header_policy.into())
        .new_record(NewRecordPolicy {
            sl_digits: !cli.no_sl_test,
            id_card: !cli.no_id_test,
            min_age: cli.min_age,
        })
        .id_card_placeholder(cli.id_card_placeholder.clone())
        .converter_url(cli.converter_url.clone())
        .input_field(cli.input_field.clone())
        .request_timeout_secs(cli.request_timeout)
        .download_timeout_secs(cli.download_timeout)
        .pages(pages);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!("Invalid page range '{}-{}': start must be <= end", start, end);
        }
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }
        return Ok(PageSelection::Set(pages));
    }

    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}

// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};

// Use library instead of local modules
use statement_insights::{
    analyze_text, render_text, validate_upload_name, write_csv, AggregateReport, Config, Heuristic,
    PdfTextExtractor, TextExtractor,
};

#[derive(Parser)]
#[command(name = "statement-insights", version, about = "Income/expense summary from a bank statement PDF")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a statement PDF and print the summary
    Analyze {
        /// Statement to read
        pdf: PathBuf,

        /// Parsing heuristic (defaults to the configured one)
        #[arg(long, value_enum)]
        heuristic: Option<Heuristic>,

        /// Large-expense threshold (defaults to the configured one)
        #[arg(long)]
        threshold: Option<f64>,

        /// Also write the Metric,Value table here
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Open the terminal dashboard after analyzing
        #[arg(long)]
        tui: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze { pdf, heuristic, threshold, csv, tui } => {
            let mut config = Config::load()?;
            if let Some(h) = heuristic {
                config.heuristic = h;
            }
            if let Some(t) = threshold {
                config.large_expense_threshold = t;
            }
            config.validate()?;

            let report = run_analyze(&config, &pdf)?;

            if let Some(out) = csv {
                let file = File::create(&out)
                    .with_context(|| format!("Failed to create CSV file: {}", out.display()))?;
                write_csv(&report, file)?;
                println!("✓ CSV written to {}", out.display());
            }

            if tui {
                run_ui_mode(report)?;
            }
        }
    }

    Ok(())
}

fn run_analyze(config: &Config, pdf: &Path) -> Result<AggregateReport> {
    println!("📂 Reading {}...", pdf.display());

    let name = pdf.file_name().and_then(|n| n.to_str());
    let report = validate_upload_name(name)
        .and_then(|_| PdfTextExtractor::new().extract_text(pdf))
        .and_then(|text| analyze_text(&text, config.heuristic, config.large_expense_threshold))
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    println!("{}", render_text(&report));
    Ok(report)
}

#[cfg(feature = "tui")]
fn run_ui_mode(report: AggregateReport) -> Result<()> {
    let mut app = ui::App::new(report);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_report: AggregateReport) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use web UI: cargo run --bin insights-server --features server");
    std::process::exit(1);
}

// 🧾 Report Emitter - display rows, CSV export, terminal summary

use crate::aggregator::AggregateReport;
use anyhow::{Context, Result};
use std::io::Write;

/// Header row of the export table
pub const CSV_HEADER: [&str; 2] = ["Metric", "Value"];

/// Fixed metric order for every rendering
pub const METRIC_LABELS: [&str; 7] = [
    "Total In",
    "Total Out",
    "Large Expenses count",
    "Large Expenses sum",
    "Small Spends count",
    "Small Spends sum",
    "Insight",
];

/// Metric/value pairs in the fixed export order
pub fn metric_rows(report: &AggregateReport) -> Vec<(&'static str, String)> {
    let values = [
        report.format(report.total_income),
        report.format(report.total_expense),
        report.large_expense_count.to_string(),
        report.format(report.large_expense_sum),
        report.small_expense_count.to_string(),
        report.format(report.small_expense_sum),
        report.insight.message().to_string(),
    ];

    METRIC_LABELS.into_iter().zip(values).collect()
}

/// Write the two-column export table
pub fn write_csv<W: Write>(report: &AggregateReport, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(CSV_HEADER).context("Failed to write CSV header")?;
    for (metric, value) in metric_rows(report) {
        csv_writer
            .write_record([metric, value.as_str()])
            .with_context(|| format!("Failed to write CSV row: {}", metric))?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn to_csv_bytes(report: &AggregateReport) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_csv(report, &mut buffer)?;
    Ok(buffer)
}

/// Download name for the export, stamped with the analysis time
pub fn csv_filename(report: &AggregateReport) -> String {
    format!("statement_insights_{}.csv", report.generated_at.format("%Y%m%d_%H%M%S"))
}

/// Plain-text summary for the terminal
pub fn render_text(report: &AggregateReport) -> String {
    let mut out = String::new();

    out.push_str("📊 Statement Summary\n");
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    for notice in &report.notices {
        out.push_str(&format!("ℹ️  {}\n", notice));
    }

    let currency = report
        .currency
        .map(|c| format!("{} ({})", c.symbol(), c.code()))
        .unwrap_or_else(|| "unknown".to_string());
    out.push_str(&format!("Heuristic:  {}\n", report.heuristic.name()));
    out.push_str(&format!("Currency:   {}\n", currency));
    out.push_str(&format!("Amounts:    {}\n", report.transaction_count));
    out.push_str(&format!("Threshold:  {}\n\n", report.format(report.threshold)));

    for (metric, value) in metric_rows(report) {
        out.push_str(&format!("{:<22} {}\n", metric, value));
    }

    out
}

//! Human readable report: one block per target, then summary counts and a
//! summary table.

use crate::evaluator::CertificateInfo;
use crate::outcome::{CertificateStatus, CheckOutcome, Summary};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use std::fmt::{self, Write};

const RULE_WIDTH: usize = 80;
const MAX_NAME_WIDTH: usize = 20;
const MAX_URL_WIDTH: usize = 40;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn render(outcomes: &[CheckOutcome]) -> String {
    let mut out = String::new();
    // fmt::Write for String is infallible
    let _ = write_report(&mut out, outcomes);
    out
}

fn write_report(out: &mut String, outcomes: &[CheckOutcome]) -> fmt::Result {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out)?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "TLS Certificate Check Results")?;
    writeln!(out, "{}", rule)?;

    for outcome in outcomes {
        writeln!(out)?;
        writeln!(out, "{} ({})", outcome.name, outcome.url)?;
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
        match (outcome.info(), outcome.error()) {
            (Some(info), _) => write_details(out, outcome.status(), info)?,
            (None, error) => {
                writeln!(out, "  Status: {}", CertificateStatus::Error)?;
                writeln!(out, "  Error:  {}", error.unwrap_or_default())?;
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", rule)?;
    write_summary(out, &Summary::from_outcomes(outcomes))?;
    writeln!(out)?;
    writeln!(out, "{}", summary_table(outcomes))?;
    writeln!(out, "{}", rule)
}

fn write_details(out: &mut String, status: CertificateStatus, info: &CertificateInfo) -> fmt::Result {
    writeln!(out, "  Status:     {}", status_text(status, info))?;
    writeln!(out, "  Subject:    {}", info.subject)?;
    writeln!(out, "  Issuer:     {}", info.issuer)?;
    writeln!(out, "  Valid From: {}", info.not_before.format(TIMESTAMP_FORMAT))?;
    writeln!(out, "  Valid To:   {}", info.not_after.format(TIMESTAMP_FORMAT))?;
    writeln!(
        out,
        "  Expires In: {} days",
        info.classification.days_until_expiration
    )?;
    writeln!(out, "  Serial:     {}", info.serial_number)?;
    writeln!(out, "  Version:    {}", info.version)?;
    writeln!(out, "  Algorithm:  {}", info.signature_algorithm)?;
    match info.key_size_bits {
        Some(bits) => writeln!(out, "  Key:        {} ({} bits)", info.public_key_algorithm, bits),
        None => writeln!(out, "  Key:        {}", info.public_key_algorithm),
    }
}

fn status_text(status: CertificateStatus, info: &CertificateInfo) -> String {
    match status {
        CertificateStatus::ExpiringSoon => format!(
            "{} (expires in {} days)",
            status, info.classification.days_until_expiration
        ),
        CertificateStatus::NotYetValid => format!(
            "{} (valid from {})",
            status,
            info.not_before.format(TIMESTAMP_FORMAT)
        ),
        _ => status.to_string(),
    }
}

fn write_summary(out: &mut String, summary: &Summary) -> fmt::Result {
    writeln!(out, "Summary:")?;
    writeln!(out, "  Total:         {}", summary.total)?;
    writeln!(out, "  OK:            {}", summary.ok)?;
    writeln!(out, "  Expiring Soon: {}", summary.expiring_soon)?;
    writeln!(out, "  Expired:       {}", summary.expired)?;
    if summary.not_yet_valid > 0 {
        writeln!(out, "  Not Yet Valid: {}", summary.not_yet_valid)?;
    }
    writeln!(out, "  Errors:        {}", summary.errors)
}

/// Name | URL | Status | Expiry Date, with long names and URLs truncated.
pub fn summary_table(outcomes: &[CheckOutcome]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Disabled);
    table.set_header(vec!["Name", "URL", "Status", "Expiry Date"]);

    for outcome in outcomes {
        let expiry = match outcome.info() {
            Some(info) => info.not_after.format(DATE_FORMAT).to_string(),
            None => "N/A".to_string(),
        };
        table.add_row(vec![
            Cell::new(truncate(&outcome.name, MAX_NAME_WIDTH)),
            Cell::new(truncate(&outcome.url, MAX_URL_WIDTH)),
            Cell::new(outcome.status()),
            Cell::new(expiry),
        ]);
    }
    table
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let kept: String = value.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

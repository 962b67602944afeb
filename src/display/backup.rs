//! Backup display formatting
//!
//! Formats backup records for terminal output in table and detail views.

use chrono::{DateTime, Utc};

use crate::backup::CleanupReport;
use crate::models::{BackupRecord, VerificationStatus};

/// Format a list of backups as a table, newest first as given
pub fn format_backup_list(records: &[BackupRecord]) -> String {
    if records.is_empty() {
        return "No backups found.".to_string();
    }

    let name_width = records
        .iter()
        .map(|r| r.file_name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    let id_width = records
        .iter()
        .map(|r| r.id.to_string().len())
        .max()
        .unwrap_or(2)
        .max(2);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<id_width$}  {:<name_width$}  {:<19}  {:<9}  {:>10}  {}\n",
        "ID",
        "File",
        "Date (UTC)",
        "Type",
        "Size",
        "Status",
        id_width = id_width,
        name_width = name_width,
    ));

    output.push_str(&format!(
        "{:-<id_width$}  {:-<name_width$}  {:-<19}  {:-<9}  {:->10}  {:-<10}\n",
        "",
        "",
        "",
        "",
        "",
        "",
        id_width = id_width,
        name_width = name_width,
    ));

    for record in records {
        output.push_str(&format!(
            "{:<id_width$}  {:<name_width$}  {:<19}  {:<9}  {:>10}  {}\n",
            record.id.to_string(),
            record.file_name,
            record.backup_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.backup_type.to_string(),
            format_size(record.file_size_bytes),
            record.status,
            id_width = id_width,
            name_width = name_width,
        ));
    }

    let total: u64 = records.iter().map(|r| r.file_size_bytes).sum();
    output.push_str(&format!(
        "\nTotal: {} backup(s), {}\n",
        records.len(),
        format_size(total)
    ));

    output
}

/// Format a single backup's details
pub fn format_backup_details(record: &BackupRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("Backup {}\n", record.id));
    output.push_str(&format!("  File:           {}\n", record.file_name));
    output.push_str(&format!("  Location:       {}\n", record.file_path.display()));
    output.push_str(&format!(
        "  Created:        {} ({} ago)\n",
        record.backup_date.format("%Y-%m-%d %H:%M:%S UTC"),
        format_age(record.backup_date, Utc::now())
    ));
    output.push_str(&format!("  Created by:     {}\n", record.created_by));
    output.push_str(&format!("  Type:           {}\n", record.backup_type));
    output.push_str(&format!(
        "  Size:           {} ({} bytes)\n",
        format_size(record.file_size_bytes),
        record.file_size_bytes
    ));
    output.push_str(&format!("  SHA-256:        {}\n", record.checksum));

    if !record.description.is_empty() {
        output.push_str(&format!("  Description:    {}\n", record.description));
    }

    if let Some(count) = record.record_count {
        output.push_str(&format!("  Records:        ~{}\n", count));
    }

    match &record.status {
        VerificationStatus::Unverified => {
            output.push_str("  Status:         Unverified\n");
        }
        VerificationStatus::Valid {
            verified_at,
            verified_by,
        } => {
            output.push_str(&format!(
                "  Status:         Verified {} by {}\n",
                verified_at.format("%Y-%m-%d %H:%M:%S UTC"),
                verified_by
            ));
        }
        VerificationStatus::Corrupted {
            reason,
            verified_at,
            verified_by,
        } => {
            output.push_str(&format!(
                "  Status:         CORRUPTED (found {} by {})\n",
                verified_at.format("%Y-%m-%d %H:%M:%S UTC"),
                verified_by
            ));
            output.push_str(&format!("  Reason:         {}\n", reason));
        }
    }

    if let Some(err) = &record.error_message {
        if record.corruption_reason() != Some(err.as_str()) {
            output.push_str(&format!("  Last error:     {}\n", err));
        }
    }

    output
}

/// Format the outcome of a cleanup run
pub fn format_cleanup_report(report: &CleanupReport) -> String {
    let mut output = format!("{}.\n", report.summary());
    for (id, reason) in &report.failures {
        output.push_str(&format!("  {}: {}\n", id, reason));
    }
    output
}

/// Format the age of a timestamp relative to `now`
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let total_seconds = now.signed_duration_since(then).num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

use chrono::Utc;
use stockpile_core::queue::{EditMethod, EditStatus, QueuedEdit};

use crate::commands::common::{format_relative_time, Context};
use crate::error::CliError;

pub fn run_queue_status(context: &Context, as_json: bool) -> Result<(), CliError> {
    let queue = context.open_queue()?;
    let entries = queue.entries()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    for line in format_queue_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_queue_sync(context: &Context) -> Result<(), CliError> {
    let queue = context.open_queue()?;
    let report = queue.process().await?;

    if report.busy {
        println!("Another sync pass is already running.");
        return Ok(());
    }
    println!(
        "Attempted {}, delivered {}, failed {}.",
        report.attempted, report.delivered, report.failed
    );
    if report.failed > 0 {
        println!("Failed entries stay queued; run `stockpile queue status` for details.");
    }
    Ok(())
}

pub fn run_queue_compact(context: &Context) -> Result<(), CliError> {
    let queue = context.open_queue()?;
    let removed = queue.compact()?;
    println!("Removed {removed} synced entries.");
    Ok(())
}

fn format_queue_lines(entries: &[QueuedEdit]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    entries
        .iter()
        .map(|edit| {
            let id = edit.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let method = match edit.method {
                EditMethod::Post => "POST",
                EditMethod::Put => "PUT",
                EditMethod::Delete => "DELETE",
            };
            let status = status_label(edit.status);
            let age = format_relative_time(edit.updated_at, now_ms);

            match edit.last_error.as_deref() {
                Some(error) if edit.status == EditStatus::Error => format!(
                    "{short_id:<13}  {method:<6}  {:<28}  {status:<7}  x{:<3}  {age:<10}  {error}",
                    edit.target, edit.attempts,
                ),
                _ => format!(
                    "{short_id:<13}  {method:<6}  {:<28}  {status:<7}  x{:<3}  {age}",
                    edit.target, edit.attempts,
                ),
            }
        })
        .collect()
}

const fn status_label(status: EditStatus) -> &'static str {
    match status {
        EditStatus::Queued => "queued",
        EditStatus::Syncing => "syncing",
        EditStatus::Synced => "synced",
        EditStatus::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn queue_lines_show_status_and_error() {
        let mut ok = QueuedEdit::new(EditMethod::Put, "/v1/products/1", json!({}));
        ok.status = EditStatus::Synced;

        let mut failed = QueuedEdit::new(EditMethod::Delete, "/v1/products/2", json!({}));
        failed.status = EditStatus::Error;
        failed.attempts = 3;
        failed.last_error = Some("CONFLICT: Record changed since version 1".to_string());

        let lines = format_queue_lines(&[ok, failed]);
        assert!(lines[0].contains("synced"));
        assert!(lines[1].contains("error"));
        assert!(lines[1].contains("x3"));
        assert!(lines[1].contains("CONFLICT"));
    }
}

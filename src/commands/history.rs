use crate::error::{DisaError, Result};
use crate::storage::{parse_timestamp, ConversationMetadata, ConversationUpdate, RecordStore};
use colored::Colorize;
use prettytable::{format, Table};

/// Print stored conversations as a table, optionally filtered
pub async fn list(store: &RecordStore, search: Option<&str>, limit: Option<usize>) -> Result<()> {
    let mut conversations = match search {
        Some(query) if !query.trim().is_empty() => store.search_conversations(query).await,
        _ => store.get_all_conversations().await,
    };
    if let Some(limit) = limit {
        conversations.truncate(limit);
    }

    if conversations.is_empty() {
        println!("{}", "No conversations found.".yellow());
        return Ok(());
    }

    println!("\nConversations:");
    conversation_table(&conversations).printstd();
    println!();
    println!(
        "Use {} to inspect a conversation.",
        "disa-store show <ID>".cyan()
    );
    println!();
    Ok(())
}

fn conversation_table(conversations: &[ConversationMetadata]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Model".bold(),
        "Messages".bold(),
        "Last Updated".bold()
    ]);

    for meta in conversations {
        let model = if meta.model.is_empty() {
            "-"
        } else {
            meta.model.as_str()
        };
        table.add_row(prettytable::row![
            meta.id.cyan(),
            truncate(&meta.title, 40),
            model,
            meta.message_count,
            display_timestamp(&meta.updated_at)
        ]);
    }
    table
}

/// Print one conversation, as a summary or as the full JSON record
pub async fn show(store: &RecordStore, id: &str, json: bool) -> Result<()> {
    let conversation = store
        .get_conversation(id)
        .await
        .ok_or_else(|| DisaError::NotFound(id.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.add_row(prettytable::row!["ID".bold(), conversation.id]);
    table.add_row(prettytable::row!["Title".bold(), conversation.title]);
    table.add_row(prettytable::row!["Model".bold(), conversation.model]);
    table.add_row(prettytable::row![
        "Messages".bold(),
        conversation.message_count
    ]);
    table.add_row(prettytable::row![
        "Created".bold(),
        display_timestamp(&conversation.created_at)
    ]);
    table.add_row(prettytable::row![
        "Updated".bold(),
        display_timestamp(&conversation.updated_at)
    ]);
    if let Some(last_activity) = &conversation.last_activity {
        table.add_row(prettytable::row![
            "Last Activity".bold(),
            display_timestamp(last_activity)
        ]);
    }
    let favorite = if conversation.is_favorite.unwrap_or(false) {
        "yes"
    } else {
        "no"
    };
    table.add_row(prettytable::row!["Favorite".bold(), favorite]);
    println!();
    table.printstd();
    println!();
    Ok(())
}

/// Delete conversations by id, reporting each failure
pub async fn delete(store: &RecordStore, ids: &[String]) -> Result<()> {
    let result = store.bulk_delete_conversations(ids).await;
    if result.deleted > 0 {
        println!(
            "{}",
            format!("Deleted {} conversation(s)", result.deleted).green()
        );
    }
    for error in &result.errors {
        eprintln!("{}", error.red());
    }
    if result.errors.is_empty() {
        Ok(())
    } else {
        Err(DisaError::Storage(format!(
            "{} deletion(s) failed",
            result.errors.len()
        ))
        .into())
    }
}

pub async fn favorite(store: &RecordStore, id: &str) -> Result<()> {
    store.toggle_favorite(id).await?;
    let now_favorite = store
        .get_conversation(id)
        .await
        .and_then(|c| c.is_favorite)
        .unwrap_or(false);
    if now_favorite {
        println!("{}", format!("Marked {} as favorite", id).green());
    } else {
        println!("{}", format!("Removed {} from favorites", id).green());
    }
    Ok(())
}

pub async fn rename(store: &RecordStore, id: &str, title: &str) -> Result<()> {
    let update = ConversationUpdate {
        title: Some(title.to_string()),
        ..Default::default()
    };
    store.update_conversation(id, &update).await?;
    println!("{}", format!("Renamed {} to \"{}\"", id, title).green());
    Ok(())
}

pub async fn stats(store: &RecordStore) -> Result<()> {
    let stats = store.get_conversation_stats().await;

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.add_row(prettytable::row![
        "Conversations".bold(),
        stats.total_conversations
    ]);
    table.add_row(prettytable::row!["Messages".bold(), stats.total_messages]);
    table.add_row(prettytable::row![
        "Avg messages".bold(),
        format!("{:.1}", stats.average_messages_per_conversation)
    ]);
    let models = if stats.models_used.is_empty() {
        "-".to_string()
    } else {
        stats.models_used.join(", ")
    };
    table.add_row(prettytable::row!["Models".bold(), models]);
    table.add_row(prettytable::row![
        "Data size".bold(),
        format_bytes(stats.storage_size)
    ]);

    println!("\nStorage statistics:");
    table.printstd();
    println!();
    Ok(())
}

pub async fn cleanup(store: &RecordStore, days: u32) -> Result<()> {
    let removed = store.cleanup_old_conversations(days).await;
    if removed == 0 {
        println!(
            "{}",
            format!("No conversations older than {} days.", days).yellow()
        );
    } else {
        println!(
            "{}",
            format!(
                "Removed {} conversation(s) older than {} days",
                removed, days
            )
            .green()
        );
    }
    Ok(())
}

pub async fn clear(store: &RecordStore, confirmed: bool) -> Result<()> {
    if !confirmed {
        return Err(DisaError::Config(
            "Refusing to delete all conversations without --yes".to_string(),
        )
        .into());
    }
    store.clear_all_data().await?;
    println!("{}", "All conversations deleted".green());
    Ok(())
}

pub async fn usage(store: &RecordStore) -> Result<()> {
    let usage = store.get_storage_usage().await;
    if usage.quota == 0 {
        println!("Used: {}", format_bytes(usage.used));
    } else {
        let percent = usage.used as f64 / usage.quota as f64 * 100.0;
        println!(
            "Used: {} of {} ({:.2}%)",
            format_bytes(usage.used),
            format_bytes(usage.quota),
            percent
        );
    }
    Ok(())
}

pub async fn sync_metadata(store: &RecordStore) -> Result<()> {
    let report = store.sync_metadata_from_conversations().await;
    println!(
        "Metadata synced: {}, already current: {}",
        report.synced.to_string().green(),
        report.already_synced
    );
    for error in &report.errors {
        eprintln!("{}", error.red());
    }
    if report.errors.is_empty() {
        Ok(())
    } else {
        Err(DisaError::Storage(format!(
            "{} metadata row(s) could not be synced",
            report.errors.len()
        ))
        .into())
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max - 3).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn display_timestamp(value: &str) -> String {
    parse_timestamp(value)
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| if value.is_empty() { "-" } else { value }.to_string())
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

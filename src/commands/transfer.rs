use crate::commands::{read_input, write_output};
use crate::error::{DisaError, Result};
use crate::storage::{ExportData, ImportOptions, RecordStore};
use colored::Colorize;
use std::path::Path;

/// Write every conversation into an export envelope
pub async fn export(store: &RecordStore, output: Option<&Path>) -> Result<()> {
    let data = store.export_conversations().await;
    let json = serde_json::to_string_pretty(&data)?;
    write_output(output, &json)?;
    if let Some(path) = output {
        println!(
            "Exported {} conversation(s) to {}",
            data.metadata.total_conversations,
            path.display().to_string().cyan()
        );
    }
    Ok(())
}

/// Load conversations from an export envelope
pub async fn import(store: &RecordStore, input: &Path, options: ImportOptions) -> Result<()> {
    let contents = read_input(input)?;
    let data: ExportData = serde_json::from_str(&contents)
        .map_err(|e| DisaError::Config(format!("Not an export file: {}", e)))?;

    let result = store.import_conversations(&data, options).await;
    for error in &result.errors {
        eprintln!("{} {}", "error:".red(), error);
    }

    let skipped = data
        .conversations
        .len()
        .saturating_sub(result.imported_count + result.errors.len());
    let summary = format!(
        "Imported {} conversation(s), skipped {} existing",
        result.imported_count, skipped
    );
    if result.success {
        println!("{}", summary.green());
        Ok(())
    } else {
        println!("{}", summary.red());
        Err(DisaError::Storage(format!("{} import error(s)", result.errors.len())).into())
    }
}

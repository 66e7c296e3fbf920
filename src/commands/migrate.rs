use crate::commands::history::format_bytes;
use crate::commands::{read_input, write_output};
use crate::error::{DisaError, Result};
use crate::migration::{MigrationOptions, MigrationResult, StorageMigration};
use colored::Colorize;
use std::path::Path;

/// Print where data lives and whether a migration is due
pub async fn status(engine: &StorageMigration) -> Result<()> {
    let status = engine.check_migration_status().await;

    println!("Legacy data:       {}", yes_no(status.has_legacy_data));
    println!("Record store data: {}", yes_no(status.has_store_data));
    if status.needs_migration {
        println!(
            "{} Run {} to move it.",
            "Migration needed.".yellow().bold(),
            "disa-store migrate".cyan()
        );
    } else {
        println!("{}", "No migration needed.".green());
    }
    Ok(())
}

/// Run a migration with progress output
///
/// When `backup` is given, a legacy backup is written there first; a
/// missing backup aborts the run.
pub async fn migrate(
    engine: &StorageMigration,
    options: MigrationOptions,
    backup: Option<&Path>,
) -> Result<()> {
    if let Some(path) = backup {
        let contents = engine.create_backup().ok_or_else(|| {
            DisaError::Migration("No legacy data available to back up".to_string())
        })?;
        write_output(Some(path), &contents)?;
        println!("Backup written to {}", path.display().to_string().cyan());
    }

    let estimate = engine.estimate_migration_time();
    if estimate.conversation_count > 0 {
        println!(
            "Migrating {} conversation(s) ({}, about {:.0} ms)...",
            estimate.conversation_count,
            format_bytes(estimate.estimated_size),
            estimate.estimated_duration
        );
    }

    let result = engine
        .migrate_from_legacy_with_progress(options, |progress| {
            println!(
                "  batch {}/{}: {}/{} ({}%)",
                progress.batch,
                progress.total_batches,
                progress.current,
                progress.total,
                progress.percentage
            );
        })
        .await?;

    report(&result, "Migrated");
    finish(&result)
}

pub fn estimate(engine: &StorageMigration) -> Result<()> {
    let estimate = engine.estimate_migration_time();
    if estimate.conversation_count == 0 {
        println!("{}", "No legacy conversations to migrate.".yellow());
        return Ok(());
    }
    println!("Conversations:      {}", estimate.conversation_count);
    println!("Legacy data size:   {}", format_bytes(estimate.estimated_size));
    println!("Estimated duration: {:.0} ms", estimate.estimated_duration);
    Ok(())
}

pub fn backup(engine: &StorageMigration, output: Option<&Path>) -> Result<()> {
    let contents = engine
        .create_backup()
        .ok_or_else(|| DisaError::Migration("No legacy data available to back up".to_string()))?;
    write_output(output, &contents)?;
    if let Some(path) = output {
        println!("Backup written to {}", path.display().to_string().cyan());
    }
    Ok(())
}

pub async fn restore(engine: &StorageMigration, input: &Path) -> Result<()> {
    let contents = read_input(input)?;
    let result = engine.restore_from_backup(&contents).await;
    report(&result, "Restored");
    finish(&result)
}

fn report(result: &MigrationResult, verb: &str) {
    for warning in &result.warnings {
        println!("{} {}", "warning:".yellow(), warning);
    }
    for error in &result.errors {
        eprintln!("{} {}", "error:".red(), error);
    }
    let summary = format!(
        "{} {} conversation(s) in {} ms",
        verb, result.migrated_count, result.duration
    );
    if result.success {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }
}

fn finish(result: &MigrationResult) -> Result<()> {
    if result.success {
        Ok(())
    } else {
        Err(DisaError::Migration(format!("{} error(s)", result.errors.len())).into())
    }
}

fn yes_no(value: bool) -> colored::ColoredString {
    if value {
        "yes".green()
    } else {
        "no".normal()
    }
}

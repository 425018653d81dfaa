//! Database snapshots for /backup and `shopdesk backup`

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshots kept in the backup directory; older ones are pruned
const MAX_BACKUPS: usize = 30;

/// Timestamp prefix of backup file names
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

fn backup_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let file_name = path.file_name()?.to_str()?;
    NaiveDateTime::parse_from_str(file_name.get(0..15)?, TIMESTAMP_FORMAT).ok()
}

/// Writes a consistent copy of the database to `backup_dir/<timestamp>_<db name>`.
///
/// Uses `VACUUM INTO`, so the bot can keep writing while the snapshot is taken.
/// The directory is created on demand and trimmed to the newest `MAX_BACKUPS` files.
pub fn create_backup(db_path: &str, backup_dir: &Path) -> Result<PathBuf> {
    if !backup_dir.exists() {
        fs::create_dir_all(backup_dir)
            .with_context(|| format!("create backup directory {}", backup_dir.display()))?;
        log::info!("Created backup directory: {}", backup_dir.display());
    }

    let db_name = Path::new(db_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("shop.sqlite");
    let backup_path = backup_dir.join(format!("{}_{}", Utc::now().format(TIMESTAMP_FORMAT), db_name));
    if backup_path.exists() {
        anyhow::bail!("backup {} already exists, try again in a second", backup_path.display());
    }

    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("open database {}", db_path))?;
    conn.execute("VACUUM INTO ?1", [backup_path.to_string_lossy().as_ref()])
        .context("write database snapshot")?;
    log::info!("💾 Created backup: {}", backup_path.display());

    prune_backups(backup_dir)?;
    Ok(backup_path)
}

fn prune_backups(backup_dir: &Path) -> Result<()> {
    for (path, _) in list_backups(backup_dir)?.iter().skip(MAX_BACKUPS) {
        match fs::remove_file(path) {
            Ok(()) => log::info!("Removed old backup: {}", path.display()),
            Err(e) => log::warn!("Failed to remove old backup {}: {}", path.display(), e),
        }
    }
    Ok(())
}

/// Backups found in `backup_dir`, newest first. Files without a timestamp prefix are ignored.
pub fn list_backups(backup_dir: &Path) -> Result<Vec<(PathBuf, NaiveDateTime)>> {
    if !backup_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in fs::read_dir(backup_dir)? {
        let path = entry?.path();
        if let Some(created) = path.is_file().then(|| backup_timestamp(&path)).flatten() {
            backups.push((path, created));
        }
    }
    backups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    Ok(backups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn backup_is_a_readable_database() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("shop.sqlite");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (42);")
                .unwrap();
        }
        let backup_dir = dir.path().join("backups");

        let backup = create_backup(db_path.to_str().unwrap(), &backup_dir).unwrap();

        assert!(backup.file_name().unwrap().to_str().unwrap().ends_with("_shop.sqlite"));
        let copy = Connection::open(&backup).unwrap();
        let x: i64 = copy.query_row("SELECT x FROM t", [], |row| row.get(0)).unwrap();
        assert_eq!(x, 42);
        assert_eq!(list_backups(&backup_dir).unwrap().len(), 1);
    }

    #[test]
    fn missing_database_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.sqlite");
        assert!(create_backup(missing.to_str().unwrap(), &dir.path().join("backups")).is_err());
    }

    #[test]
    fn old_backups_are_pruned() {
        let dir = TempDir::new().unwrap();
        let backup_dir = dir.path().join("backups");
        fs::create_dir_all(&backup_dir).unwrap();
        for minute in 0..(MAX_BACKUPS as u32 + 3) {
            fs::write(backup_dir.join(format!("20240101_12{:02}00_shop.sqlite", minute)), b"").unwrap();
        }
        fs::write(backup_dir.join("notes.txt"), b"not a backup").unwrap();

        prune_backups(&backup_dir).unwrap();

        let remaining = list_backups(&backup_dir).unwrap();
        assert_eq!(remaining.len(), MAX_BACKUPS);
        // the oldest ones went away
        assert!(!backup_dir.join("20240101_120000_shop.sqlite").exists());
        assert!(!backup_dir.join("20240101_120200_shop.sqlite").exists());
        assert!(backup_dir.join("20240101_120300_shop.sqlite").exists());
        assert!(backup_dir.join("notes.txt").exists());
    }

    #[test]
    fn missing_dir_lists_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(list_backups(&dir.path().join("nope")).unwrap().is_empty());
    }
}

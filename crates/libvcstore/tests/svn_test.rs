// Integration tests are compiled as a separate crate, so these lints don't apply
#![allow(clippy::tests_outside_test_module)]
#![allow(missing_docs)]

mod common;

use std::{fs, time::Duration};

use anyhow::Result;
use common::{create_working_copy, svn, svn_missing, wait_for_commits};
use libvcstore::{
    CommitMode, CommitSchedule, Credentials, HandlerOptions, SCRIPT_FILE_NAME, ScriptExport,
    VcStoreError, VersionedFileHandler,
};
use tempfile::TempDir;

fn fast_options() -> HandlerOptions {
    HandlerOptions {
        schedule: CommitSchedule {
            check_interval: Duration::from_millis(20),
            work_budget: Duration::from_secs(3),
        },
        ..HandlerOptions::default()
    }
}

fn credentials() -> Option<Credentials> {
    Some(Credentials::new("curator", ""))
}

#[test]
fn test_new_file_and_directory_are_committed_together() -> Result<()> {
    if svn_missing("test_new_file_and_directory_are_committed_together") {
        return Ok(());
    }
    let (_tmp, wc) = create_working_copy()?;
    let handler = VersionedFileHandler::new(&wc, credentials(), fast_options())?;

    handler.write_file("AB12/AB12.tsv", "expocode\tAB12\n", "update data")?;
    handler.shutdown();
    handler.join()?;

    assert_eq!(svn(&["status"], &wc)?.trim(), "");
    let log = svn(&["log", "--verbose"], &wc)?;
    assert!(log.contains("update data"));
    assert!(log.contains("A /AB12\n"));
    assert!(log.contains("A /AB12/AB12.tsv"));
    assert_eq!(handler.stats().map(|stats| stats.committed), Some(1));

    Ok(())
}

#[test]
fn test_recommitting_unchanged_file_succeeds() -> Result<()> {
    if svn_missing("test_recommitting_unchanged_file_succeeds") {
        return Ok(());
    }
    let (_tmp, wc) = create_working_copy()?;
    let handler = VersionedFileHandler::new(&wc, credentials(), fast_options())?;

    handler.write_file("AB12.tsv", "v1\n", "first")?;
    wait_for_commits(&handler, 1)?;
    handler.commit_version("AB12.tsv", "again")?;
    handler.write_file("AB12.tsv", "v2\n", "second")?;
    handler.shutdown();
    handler.join()?;

    let log = svn(&["log"], &wc)?;
    assert!(log.contains("first"));
    assert!(log.contains("second"));
    assert!(!log.contains("again"));

    Ok(())
}

#[test]
fn test_move_and_delete_are_committed() -> Result<()> {
    if svn_missing("test_move_and_delete_are_committed") {
        return Ok(());
    }
    let (_tmp, wc) = create_working_copy()?;
    let handler = VersionedFileHandler::new(&wc, credentials(), fast_options())?;

    handler.write_file("AB12.tsv", "data\n", "add")?;
    handler.write_file("old.tsv", "stale\n", "add stale")?;
    // Files scheduled for addition cannot be moved until they are committed.
    wait_for_commits(&handler, 2)?;
    handler.move_versioned_file("AB12.tsv", "renamed/CD34.tsv", "rename")?;
    handler.delete_versioned_file("old.tsv", "remove stale")?;
    handler.shutdown();
    handler.join()?;

    assert!(!wc.join("AB12.tsv").exists());
    assert!(wc.join("renamed/CD34.tsv").exists());
    assert!(!wc.join("old.tsv").exists());
    assert_eq!(svn(&["status"], &wc)?.trim(), "");

    let listing = svn(&["list", "--recursive", "-r", "HEAD"], &wc)?;
    assert!(listing.contains("renamed/CD34.tsv"));
    assert!(!listing.contains("AB12.tsv"));
    assert!(!listing.contains("old.tsv"));

    Ok(())
}

#[test]
fn test_populated_directories_are_moved_and_deleted() -> Result<()> {
    if svn_missing("test_populated_directories_are_moved_and_deleted") {
        return Ok(());
    }
    let (_tmp, wc) = create_working_copy()?;
    let handler = VersionedFileHandler::new(&wc, credentials(), fast_options())?;

    handler.write_file("AB12/AB12.tsv", "data\n", "add AB12")?;
    handler.write_file("AB12/AB12_hy1.csv", "bottle\n", "add AB12 bottle")?;
    handler.write_file("EF56/EF56.tsv", "data\n", "add EF56")?;
    wait_for_commits(&handler, 3)?;
    handler.move_versioned_file("AB12", "CD34", "rename dataset")?;
    handler.delete_versioned_file("EF56", "withdraw dataset")?;
    handler.shutdown();
    handler.join()?;

    assert_eq!(handler.stats().map(|stats| stats.dropped), Some(0));
    assert_eq!(svn(&["status"], &wc)?.trim(), "");

    let listing = svn(&["list", "--recursive", "-r", "HEAD"], &wc)?;
    assert!(listing.contains("CD34/AB12.tsv"));
    assert!(listing.contains("CD34/AB12_hy1.csv"));
    assert!(!listing.contains("AB12/"));
    assert!(!listing.contains("EF56"));

    Ok(())
}

#[test]
fn test_export_mode_writes_script_without_committing() -> Result<()> {
    if svn_missing("test_export_mode_writes_script_without_committing") {
        return Ok(());
    }
    let (_tmp, wc) = create_working_copy()?;
    let options = HandlerOptions {
        mode: CommitMode::ExportScript(ScriptExport::in_dir(&wc)),
        ..fast_options()
    };
    let handler = VersionedFileHandler::new(&wc, credentials(), options)?;

    handler.write_file("AB12.tsv", "data\n", "export me")?;
    handler.shutdown();
    handler.join()?;

    let script = fs::read_to_string(wc.join(SCRIPT_FILE_NAME))?;
    assert!(script.contains("svn commit --depth=empty -m 'export me'"));
    assert!(svn(&["status"], &wc)?.contains("AB12.tsv"));
    assert!(svn(&["log"], &wc)?.lines().all(|line| !line.contains("export me")));

    Ok(())
}

#[test]
fn test_plain_directory_is_not_a_working_copy() -> Result<()> {
    if svn_missing("test_plain_directory_is_not_a_working_copy") {
        return Ok(());
    }
    let dir = TempDir::new()?;
    let result = VersionedFileHandler::new(dir.path(), credentials(), fast_options());
    assert!(matches!(result, Err(VcStoreError::Construction { .. })));
    Ok(())
}

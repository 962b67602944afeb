use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn labkeep(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("labkeep").unwrap();
    cmd.env("LABKEEP_DATA_DIR", data_dir)
        .env("LABKEEP_LOG", "warn")
        .env_remove("LABKEEP_ACTOR");
    cmd
}

fn initialized() -> TempDir {
    let temp = TempDir::new().unwrap();
    labkeep(temp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete"));
    temp
}

fn backup_files(data_dir: &Path) -> usize {
    fs::read_dir(data_dir.join("Backups"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[test]
fn test_init_and_config() {
    let temp = initialized();
    assert!(temp.path().join("data").join("laboratory.db").exists());
    assert!(temp.path().join("config.json").exists());

    labkeep(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Max backup files:    10"))
        .stdout(predicate::str::contains("Backups"));
}

#[test]
fn test_backup_requires_init() {
    let temp = TempDir::new().unwrap();
    labkeep(temp.path())
        .args(["backup", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("labkeep init"));
}

#[test]
fn test_create_list_info_verify() {
    let temp = initialized();

    labkeep(temp.path())
        .args(["--actor", "tech01", "backup", "create", "-d", "Before analyzer upgrade"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created: Laboratory_Backup_"))
        .stdout(predicate::str::contains("Status: Verified"));

    labkeep(temp.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Laboratory_Backup_"))
        .stdout(predicate::str::contains("Total: 1 backup(s)"));

    labkeep(temp.path())
        .args(["backup", "info", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created by:     tech01"))
        .stdout(predicate::str::contains("Before analyzer upgrade"));

    labkeep(temp.path())
        .args(["backup", "verify", "all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1"))
        .stdout(predicate::str::contains("OK"));

    labkeep(temp.path())
        .args(["backup", "list", "--type", "scheduled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found"));
}

#[test]
fn test_restore_needs_force() {
    let temp = initialized();
    labkeep(temp.path()).args(["backup", "create"]).assert().success();

    labkeep(temp.path())
        .args(["backup", "restore", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));
    assert_eq!(backup_files(temp.path()), 1);

    labkeep(temp.path())
        .args(["backup", "restore", "1", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restore complete"))
        .stdout(predicate::str::contains("Pre-restore backup saved"));
    assert_eq!(backup_files(temp.path()), 2);
    assert!(!temp.path().join("data").join("laboratory.db.temp_backup").exists());
}

#[test]
fn test_corrupted_import_cannot_be_restored() {
    let temp = initialized();
    let junk = temp.path().join("notes.txt");
    fs::write(&junk, "definitely not a database").unwrap();

    labkeep(temp.path())
        .args(["backup", "import"])
        .arg(&junk)
        .assert()
        .success()
        .stdout(predicate::str::contains("corrupted"));

    labkeep(temp.path())
        .args(["backup", "restore", "1", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is corrupted"));

    labkeep(temp.path())
        .args(["backup", "cleanup", "--corrupted", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 backup(s)"));
    assert_eq!(backup_files(temp.path()), 0);
}

#[test]
fn test_cleanup_keeps_newest() {
    let temp = initialized();
    for _ in 0..3 {
        labkeep(temp.path()).args(["backup", "create"]).assert().success();
    }

    labkeep(temp.path())
        .args(["backup", "cleanup", "--keep", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 backup(s) exceed the limit"));
    assert_eq!(backup_files(temp.path()), 3);

    labkeep(temp.path())
        .args(["backup", "cleanup", "--keep", "1", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 2 backup(s)"));
    assert_eq!(backup_files(temp.path()), 1);

    labkeep(temp.path())
        .args(["backup", "info", "3"])
        .assert()
        .success();
}

#[test]
fn test_export_delete_and_size() {
    let temp = initialized();
    labkeep(temp.path()).args(["backup", "create"]).assert().success();

    let outbox = temp.path().join("outbox");
    fs::create_dir_all(&outbox).unwrap();
    labkeep(temp.path())
        .args(["backup", "export", "latest"])
        .arg(&outbox)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported backup #1"));
    assert_eq!(fs::read_dir(&outbox).unwrap().count(), 1);

    labkeep(temp.path())
        .args(["backup", "size"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 backup(s)"));

    labkeep(temp.path())
        .args(["backup", "delete", "1"])
        .assert()
        .success();
    labkeep(temp.path())
        .args(["backup", "delete", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_actor_from_environment_is_audited() {
    let temp = initialized();
    labkeep(temp.path())
        .env("LABKEEP_ACTOR", "night-shift")
        .args(["backup", "create"])
        .assert()
        .success();

    let log = fs::read_to_string(temp.path().join("audit.log")).unwrap();
    assert!(log.contains("\"operation\":\"create\""));
    assert!(log.contains("\"actor\":\"night-shift\""));
}

#[test]
fn test_create_rejects_imported_type() {
    let temp = initialized();
    labkeep(temp.path())
        .args(["backup", "create", "--type", "imported"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only be created by import"));
    assert_eq!(backup_files(temp.path()), 0);
}

#[test]
fn test_history_shows_recent_operations() {
    let temp = initialized();
    labkeep(temp.path())
        .args(["backup", "history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backup operations recorded"));

    labkeep(temp.path())
        .args(["--actor", "tech01", "backup", "create"])
        .assert()
        .success();
    labkeep(temp.path())
        .args(["--actor", "qa", "backup", "verify", "1"])
        .assert()
        .success();

    labkeep(temp.path())
        .args(["backup", "history", "-n", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VERIFY backup #1 by qa (ok)"))
        .stdout(predicate::str::contains("CREATE").not());
}

use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
    archive: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        let archive = base.join("chat.db");
        seed_archive(&archive);

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
            archive,
        }
    }

    fn write_vcard(&self, content: &str) -> PathBuf {
        let path = self.home.join("contacts.vcf");
        fs::write(&path, content).expect("failed to write vCard");
        path
    }
}

/// Two handles: one direct incoming thread and one outgoing group message.
fn seed_archive(path: &Path) {
    let conn = Connection::open(path).expect("failed to create archive");
    conn.execute_batch(
        r#"
        CREATE TABLE handle (ROWID INTEGER PRIMARY KEY, id TEXT NOT NULL);
        CREATE TABLE message (
            ROWID INTEGER PRIMARY KEY,
            date INTEGER NOT NULL,
            is_from_me INTEGER NOT NULL DEFAULT 0,
            handle_id INTEGER NOT NULL DEFAULT 0,
            text TEXT,
            attributedBody BLOB,
            cache_has_attachments INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);
        CREATE TABLE chat_handle_join (chat_id INTEGER, handle_id INTEGER);

        INSERT INTO handle (ROWID, id) VALUES (1, '+15551234567'), (2, 'bob@example.com');
        INSERT INTO chat_handle_join VALUES (1, 1), (2, 1), (2, 2);
        "#,
    )
    .expect("failed to create schema");

    // 2024-03-05 12:00:00 UTC, in nanoseconds since 2001-01-01
    let base: i64 = (1_709_640_000 - 978_307_200) * 1_000_000_000;
    let hour: i64 = 3_600 * 1_000_000_000;
    let rows: [(i64, i64, i64, &str, i64); 3] = [
        (1, 0, 1, "Lunch today? I found a new place.", 1),
        (2, 0, 1, "It has great noodles.", 1),
        (3, 1, 0, "Count me in.", 2),
    ];
    for (id, from_me, handle, text, chat) in rows {
        conn.execute(
            "INSERT INTO message (ROWID, date, is_from_me, handle_id, text) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, base + id * hour, from_me, handle, text],
        )
        .expect("failed to insert message");
        conn.execute(
            "INSERT INTO chat_message_join VALUES (?1, ?2)",
            params![chat, id],
        )
        .expect("failed to join message");
    }
}

/// One incoming message from `+15551234567` at `unix_secs`.
fn seed_single_message(path: &Path, unix_secs: i64) {
    let conn = Connection::open(path).expect("failed to create archive");
    conn.execute_batch(
        r#"
        CREATE TABLE handle (ROWID INTEGER PRIMARY KEY, id TEXT NOT NULL);
        CREATE TABLE message (
            ROWID INTEGER PRIMARY KEY,
            date INTEGER NOT NULL,
            is_from_me INTEGER NOT NULL DEFAULT 0,
            handle_id INTEGER NOT NULL DEFAULT 0,
            text TEXT,
            attributedBody BLOB,
            cache_has_attachments INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);
        CREATE TABLE chat_handle_join (chat_id INTEGER, handle_id INTEGER);

        INSERT INTO handle (ROWID, id) VALUES (1, '+15551234567');
        INSERT INTO chat_handle_join VALUES (1, 1);
        INSERT INTO chat_message_join VALUES (1, 1);
        "#,
    )
    .expect("failed to create schema");
    conn.execute(
        "INSERT INTO message (ROWID, date, is_from_me, handle_id, text) VALUES (1, ?1, 0, 1, 'Late one.')",
        params![(unix_secs - 978_307_200) * 1_000_000_000],
    )
    .expect("failed to insert message");
}

fn run_cli(env: &CliTestEnv, args: &[&str]) -> Output {
    run_cli_in_tz(env, args, "UTC")
}

fn run_cli_in_tz(env: &CliTestEnv, args: &[&str], tz: &str) -> Output {
    Command::new(assert_cmd::cargo::cargo_bin!("chatlens"))
        .args(args)
        .env("TZ", tz)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute chatlens: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    assert!(
        output.status.success(),
        "chatlens {:?} failed\nstdout:\n{}\nstderr:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn run_json(env: &CliTestEnv, args: &[&str]) -> serde_json::Value {
    let output = run_cli(env, args);
    assert_success(args, &output);
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn json_report_counts_messages() {
    let env = CliTestEnv::new();
    let archive = env.archive.to_string_lossy().to_string();
    let report = run_json(&env, &["--archive", &archive, "--export", "json"]);

    assert_eq!(report["summary"]["persons"], 2);
    let contacts = report["contacts"].as_array().unwrap();
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0]["handle"], "+15551234567");
    assert_eq!(contacts[0]["incoming"], 2);
    assert_eq!(contacts[0]["outgoing"], 1);
    assert_eq!(contacts[1]["handle"], "bob@example.com");
    assert_eq!(contacts[1]["outgoing"], 1);

    // Without contacts, names fall back to handles
    assert_eq!(contacts[0]["name"], "+15551234567");
}

#[test]
fn vcard_contacts_resolve_names() {
    let env = CliTestEnv::new();
    let vcard = env.write_vcard(
        "BEGIN:VCARD\nVERSION:3.0\nN:Liddell;Alice;;;\nTEL;TYPE=CELL:(555) 123-4567\nEND:VCARD\n",
    );
    let archive = env.archive.to_string_lossy().to_string();
    let vcard = vcard.to_string_lossy().to_string();
    let report = run_json(
        &env,
        &["--archive", &archive, "--contacts", &vcard, "--export", "json"],
    );

    assert_eq!(report["contacts"][0]["name"], "Alice Liddell");
    assert_eq!(report["contacts"][1]["name"], "bob@example.com");
}

#[test]
fn person_detail_has_dense_hours() {
    let env = CliTestEnv::new();
    let archive = env.archive.to_string_lossy().to_string();
    let detail = run_json(
        &env,
        &[
            "--archive",
            &archive,
            "--person",
            "+15551234567",
            "--metric",
            "incoming",
            "--export",
            "json",
        ],
    );

    assert_eq!(detail["incoming"], 2);
    assert_eq!(detail["hourly"].as_array().unwrap().len(), 24);
    assert!(detail["incoming_grade"].is_number());
}

#[test]
fn buckets_follow_local_time_zone() {
    let env = CliTestEnv::new();
    let archive = env.home.join("tz.db");
    // 2024-03-06T05:30:00Z is 2024-03-05 21:30 in Los Angeles (PST, UTC-8)
    seed_single_message(&archive, 1_709_703_000);
    let archive = archive.to_string_lossy().to_string();
    let args = [
        "--archive",
        archive.as_str(),
        "--person",
        "+15551234567",
        "--metric",
        "incoming",
        "--export",
        "json",
    ];

    let output = run_cli_in_tz(&env, &args, "America/Los_Angeles");
    assert_success(&args, &output);
    let detail: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(detail["daily"][0]["at"], "2024-03-05");
    assert_eq!(detail["daily"].as_array().unwrap().len(), 1);
    assert_eq!(detail["hourly"][21], 1.0);
    assert_eq!(detail["hourly"][5], 0.0);

    // The same instant in UTC lands on the next day at 05:00
    let output = run_cli_in_tz(&env, &args, "UTC");
    assert_success(&args, &output);
    let detail: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(detail["daily"][0]["at"], "2024-03-06");
    assert_eq!(detail["hourly"][5], 1.0);
}

#[test]
fn zero_limit_is_rejected() {
    let env = CliTestEnv::new();
    let archive = env.archive.to_string_lossy().to_string();
    let output = run_cli(&env, &["--archive", &archive, "--limit", "0"]);
    assert!(!output.status.success());
}

#[test]
fn terminal_report_renders() {
    let env = CliTestEnv::new();
    let archive = env.archive.to_string_lossy().to_string();
    let args = ["--archive", archive.as_str()];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("TOP CONTACTS"));
    assert!(stdout.contains("READABILITY: SENT"));
}

#[test]
fn missing_archive_fails() {
    let env = CliTestEnv::new();
    let missing = env.home.join("nope.db").to_string_lossy().to_string();
    let output = run_cli(&env, &["--archive", &missing]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr was: {stderr}");
}

#[test]
fn archive_bytes_unchanged_after_run() {
    let env = CliTestEnv::new();
    let before = fs::read(&env.archive).unwrap();
    let archive = env.archive.to_string_lossy().to_string();
    let output = run_cli(&env, &["--archive", &archive, "--export", "json"]);
    assert!(output.status.success());
    assert_eq!(fs::read(&env.archive).unwrap(), before);
}

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("duel-cli-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn scripted_config(name: &str) -> PathBuf {
    let path = scratch(name).join("engine.json");
    fs::write(&path, r#"{"dice": {"scripted": [1, 6, 6, 6, 6, 1, 1]}}"#).unwrap();
    path
}

#[test]
fn plays_a_round_and_force_ends() {
    let config = scripted_config("round");
    Command::cargo_bin("duel-cli")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .write_stdin("!start P1 P2\n!defend\n!attack\n!defend\n!status\n!end\n!start P3 P4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[INIT] P1 moves first"))
        .stdout(predicate::str::contains(
            "[REJECT] defend is not allowed during the attack phase",
        ))
        .stdout(predicate::str::contains("[DMG][P2] 24 - 2 = 22 (50 → 28)"))
        .stdout(predicate::str::contains("[STATUS] P1 vs P2, 1 rounds, attack phase"))
        .stdout(predicate::str::contains("[END] P1 wins after 1 rounds; channel is free"))
        .stdout(predicate::str::contains("[START] P3 vs P4"));
}

#[test]
fn channels_are_addressed_with_at_prefix() {
    Command::cargo_bin("duel-cli")
        .unwrap()
        .args(["--seed", "7"])
        .write_stdin("@one !start A B\n@two !start C D\n@one !start E F\n!attack\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[START] A vs B"))
        .stdout(predicate::str::contains("[START] C vs D"))
        .stdout(predicate::str::contains(
            "[REJECT] a battle is already running in this channel",
        ))
        .stdout(predicate::str::contains(
            "[REJECT] no battle is running in this channel",
        ));
}

#[test]
fn unknown_and_malformed_commands_are_rejected() {
    Command::cargo_bin("duel-cli")
        .unwrap()
        .write_stdin("hello there\n!dance\n!start OnlyOne\n!ping\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[REJECT] unknown command '!dance' (try !help)"))
        .stdout(predicate::str::contains("[REJECT] usage: !start A B"))
        .stdout(predicate::str::contains("[PONG] dispatcher is running"));
}

#[test]
fn help_lists_commands_in_fixed_order() {
    let output = Command::cargo_bin("duel-cli")
        .unwrap()
        .write_stdin("!help\n")
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let position = |usage: &str| stdout.find(usage).unwrap();
    assert!(position("!help") < position("!sheettest"));
    assert!(position("!sheettest") < position("!start A B"));
    assert!(position("!start A B") < position("!attack"));
    assert!(position("!buy NAME ITEM") < position("!add NAME N"));
    assert!(position("!sub NAME N") < position("!ping"));
}

#[test]
fn ledger_commands_update_the_file() {
    let ledger = scratch("ledger").join("ledger.json");
    fs::write(
        &ledger,
        r#"{"hp": {"B2": "Alice", "D2": "10", "G2": "10", "I2": "20"},
            "roster": {"B2": "Alice", "F2": "potion"}}"#,
    )
    .unwrap();

    Command::cargo_bin("duel-cli")
        .unwrap()
        .arg("--ledger")
        .arg(&ledger)
        .write_stdin("!add Alice 5\n!sub Alice x\n!buy Alice long rope\n!use Alice potion\n!total\n!add Bob 1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[HP] Alice 10 → +5 = 15 (row 2)"))
        .stdout(predicate::str::contains(
            "[REJECT] amount must be a positive integer, got 'x'",
        ))
        .stdout(predicate::str::contains("[ITEMS][Alice] potion,long rope"))
        .stdout(predicate::str::contains("[ITEMS][Alice] long rope"))
        .stdout(predicate::str::contains("[TOTAL] A: 10"))
        .stdout(predicate::str::contains("[REJECT] 'Bob' not found in sheet 'hp'"));

    let saved = fs::read_to_string(&ledger).unwrap();
    assert!(saved.contains(r#""D2": "15""#));
    assert!(saved.contains(r#""F2": "long rope""#));
}

#[test]
fn sheet_test_stamps_the_check_sheet() {
    let ledger = scratch("sheettest").join("ledger.json");
    fs::write(&ledger, "{}").unwrap();

    Command::cargo_bin("duel-cli")
        .unwrap()
        .arg("--ledger")
        .arg(&ledger)
        .write_stdin("!sheettest\n!sheettest now\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[SHEET] A1 = connection OK @ "))
        .stdout(predicate::str::contains("[REJECT] usage: !sheettest"));

    let saved = fs::read_to_string(&ledger).unwrap();
    assert!(saved.contains(r#""check""#));
    assert!(saved.contains("connection OK @ "));
}

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

const DESCRIPTOR: &str = r#"{
    "name": "study",
    "tables": [
        { "name": "visits", "entity_type": "Participant",
          "variables": [
              { "name": "Admin.Name", "value_type": "text" },
              { "name": "Admin.Site", "value_type": "text" },
              { "name": "age", "value_type": "integer" }
          ],
          "entities": [
              { "id": "1234", "values": { "Admin.Name": "Ann", "Admin.Site": "north", "age": 31 } },
              { "id": "5678", "values": { "Admin.Name": "Bob", "Admin.Site": "south", "age": 47 } }
          ] },
        { "name": "labs", "entity_type": "Participant",
          "variables": [{ "name": "glucose", "value_type": "decimal" }],
          "entities": [{ "id": "5678", "values": { "glucose": 5.5 } }] }
    ]
}"#;

fn descriptor_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(DESCRIPTOR.as_bytes()).unwrap();
    file
}

fn datavirt() -> Command {
    Command::cargo_bin("datavirt").unwrap()
}

#[test]
fn types_lists_every_type() {
    datavirt()
        .arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("integer"))
        .stdout(predicate::str::contains("datetime"))
        .stdout(predicate::str::contains("binary"));
}

#[test]
fn convert_truncates_decimals() {
    datavirt()
        .args(["convert", "0.9", "--from", "decimal", "--to", "integer"])
        .assert()
        .success()
        .stdout("0\n");

    datavirt()
        .args(["convert", "2019-07-14", "--from", "date", "--to", "datetime"])
        .assert()
        .success()
        .stdout("2019-07-14T00:00:00.000+0000\n");
}

#[test]
fn convert_rejects_bad_input() {
    datavirt()
        .args(["convert", "twelve", "--to", "integer"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));

    datavirt()
        .args(["convert", "1", "--to", "money"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("money"));
}

#[test]
fn show_applies_select_and_entity_filters() {
    let file = descriptor_file();
    datavirt()
        .arg("show")
        .arg(file.path())
        .args(["--table", "visits", "--select", "^Admin", "--exclude", "Site$"])
        .args(["--exclude-entity", "1234"])
        .assert()
        .success()
        .stdout(predicate::str::contains("view 'visits' (Participant): 1 entities, 1 variables"))
        .stdout(predicate::str::contains("Bob"))
        .stdout(predicate::str::contains("Ann").not())
        .stdout(predicate::str::contains("age").not());
}

#[test]
fn show_joins_tables_as_json() {
    let file = descriptor_file();
    let output = datavirt()
        .arg("show")
        .arg(file.path())
        .args(["-t", "visits", "-t", "labs", "--inner", "labs", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["table"], "visits+labs");
    assert_eq!(parsed["is_view"], true);
    let rows = parsed["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1, "only 5678 is in the inner member");
    assert_eq!(rows[0]["entity"], "5678");
    assert_eq!(rows[0]["values"]["glucose"], 5.5);
    assert_eq!(rows[0]["values"]["age"], 47);
}

#[test]
fn show_reports_missing_tables() {
    let file = descriptor_file();
    datavirt()
        .arg("show")
        .arg(file.path())
        .args(["--table", "nope"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope"));
}

mod common;

use assert_cmd::Command;
use common::TestWorkspace;
use predicates::str::contains;
use sobject_reconcile::catalog::SchemaSnapshot;

fn binary() -> Command {
    Command::cargo_bin("sobject-reconcile").expect("binary exists")
}

fn snapshot_args(workspace: &TestWorkspace) -> Vec<String> {
    let (source, target) = workspace.write_sample_snapshots();
    vec![
        "--source".to_string(),
        source.to_string_lossy().into_owned(),
        "--target".to_string(),
        target.to_string_lossy().into_owned(),
    ]
}

#[test]
fn catalog_lists_objects_with_provenance() {
    let workspace = TestWorkspace::new();
    binary()
        .arg("catalog")
        .args(snapshot_args(&workspace))
        .assert()
        .success()
        .stdout(contains("Invoice__c"))
        .stdout(contains("Legacy__c"))
        .stdout(contains("target"));
}

#[test]
fn catalog_lists_fields_of_one_object() {
    let workspace = TestWorkspace::new();
    binary()
        .arg("catalog")
        .args(snapshot_args(&workspace))
        .args(["--object", "Contact"])
        .assert()
        .success()
        .stdout(contains("Tier__c"))
        .stdout(contains("Rating__c"));
}

#[test]
fn catalog_rejects_unknown_object() {
    let workspace = TestWorkspace::new();
    binary()
        .arg("catalog")
        .args(snapshot_args(&workspace))
        .args(["--object", "Ghost__c"])
        .assert()
        .failure()
        .stderr(contains("error: Object Ghost__c is missing"));
}

#[test]
fn external_id_prints_canonical_form() {
    let workspace = TestWorkspace::new();
    binary()
        .arg("external-id")
        .args(snapshot_args(&workspace))
        .args(["--object", "Contact", "--expression", "Manager__r"])
        .assert()
        .success()
        .stdout(contains("Manager__r.Id"));
}

#[test]
fn external_id_fails_for_invalid_expression() {
    let workspace = TestWorkspace::new();
    binary()
        .arg("external-id")
        .args(snapshot_args(&workspace))
        .args(["--object", "Contact", "--expression", "Email.Name"])
        .assert()
        .failure()
        .stdout(contains("not a lookup"))
        .stderr(contains("is invalid"));
}

#[test]
fn external_id_repair_fixes_typos() {
    let workspace = TestWorkspace::new();
    binary()
        .arg("external-id")
        .args(snapshot_args(&workspace))
        .args([
            "--object",
            "Contact",
            "--expression",
            "Account__r.AcountNumber__c",
            "--repair",
        ])
        .assert()
        .success()
        .stdout(contains("Account__r.AccountNumber__c"));
}

#[test]
fn query_renders_spec_and_variants() {
    let workspace = TestWorkspace::new();
    let spec = workspace.write(
        "contact.yml",
        r#"
name: Contact
selectedFields: [LastName, Email, Rating__c]
externalId: Email
where: "Email != null"
fieldMapping:
  - sourceField: Email
    targetField: Email__c
"#,
    );
    let spec = spec.to_string_lossy().into_owned();

    binary()
        .arg("query")
        .args(snapshot_args(&workspace))
        .args(["--spec", &spec])
        .assert()
        .success()
        .stdout(contains(
            "SELECT LastName, Email, Rating__c FROM Contact WHERE Email != null",
        ))
        .stderr(contains("[missing-in-target] Contact.Rating__c"));

    binary()
        .arg("query")
        .args(snapshot_args(&workspace))
        .args(["--spec", &spec, "--target-connection"])
        .assert()
        .success()
        .stdout(contains(
            "SELECT LastName, Email__c, Rating__c FROM Contact WHERE Email__c != null",
        ));

    binary()
        .arg("query")
        .args(snapshot_args(&workspace))
        .args(["--spec", &spec, "--count"])
        .assert()
        .success()
        .stdout(contains("SELECT COUNT() FROM Contact WHERE Email != null"));
}

#[test]
fn describe_csv_writes_a_snapshot() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("leads.csv", "Id;LastName;Company;Owner.Name\n1;Doe;Acme;Jo\n");
    let output = workspace.path().join("leads.json");
    binary()
        .args(["describe-csv", "--object", "Lead", "--delimiter", ";", "-i"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let snapshot = SchemaSnapshot::load(&output).expect("load written snapshot");
    let lead = snapshot.object("Lead").expect("lead object");
    assert_eq!(lead.fields.len(), 4);
    assert_eq!(lead.field("Id").field_type, "id");
    assert!(lead.has_field("Owner.Name"));
}

#[test]
fn invalid_config_is_reported() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("engine.yml", "fuzzy_match_threshold: 1.5\n");
    binary()
        .arg("--config")
        .arg(&config)
        .arg("catalog")
        .args(snapshot_args(&workspace))
        .assert()
        .failure()
        .stderr(contains("fuzzy_match_threshold"));
}

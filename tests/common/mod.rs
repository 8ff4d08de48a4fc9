#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sobject_reconcile::{
    catalog::{SchemaCatalog, SchemaSnapshot},
    describe::{FieldDescriptor, ObjectDescriptor},
};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Saves both sample snapshots and returns `(source, target)` paths.
    pub fn write_sample_snapshots(&self) -> (PathBuf, PathBuf) {
        let source = self.path().join("source.yml");
        let target = self.path().join("target.json");
        source_snapshot().save(&source).expect("save source snapshot");
        target_snapshot().save(&target).expect("save target snapshot");
        (source, target)
    }
}

pub fn field(object: &str, name: &str, field_type: &str) -> FieldDescriptor {
    FieldDescriptor::new(object, name, field_type)
}

pub fn id_field(object: &str) -> FieldDescriptor {
    field(object, "Id", "id").read_only()
}

fn account() -> ObjectDescriptor {
    ObjectDescriptor::new("Account")
        .with_field(id_field("Account"))
        .with_field(field("Account", "Name", "string").name_field())
        .with_field(field("Account", "AccountNumber__c", "string").unique())
        .with_field(field("Account", "OwnerId", "reference").with_reference("User"))
        .with_field(field("Account", "BillingCity", "string"))
        .with_field(field("Account", "BillingAddress", "address").read_only())
}

fn contact() -> ObjectDescriptor {
    ObjectDescriptor::new("Contact")
        .with_field(id_field("Contact"))
        .with_field(field("Contact", "Name", "string").name_field().read_only())
        .with_field(field("Contact", "LastName", "string"))
        .with_field(field("Contact", "Email", "email"))
        .with_field(field("Contact", "AccountId", "reference").with_reference("Account"))
        .with_field(field("Contact", "Account__c", "reference").with_reference("Account"))
        .with_field(field("Contact", "Manager__c", "reference").with_reference("Contact"))
}

fn case() -> ObjectDescriptor {
    ObjectDescriptor::new("Case")
        .with_field(id_field("Case"))
        .with_field(field("Case", "Subject", "string"))
        .with_field(field("Case", "CaseNumber", "string").auto_number())
        .with_field(field("Case", "OwnerId", "reference").polymorphic(&["User", "Group"]))
}

fn user() -> ObjectDescriptor {
    ObjectDescriptor::new("User")
        .with_field(id_field("User"))
        .with_field(field("User", "Name", "string").name_field())
        .with_field(field("User", "Username", "string").unique())
}

fn group() -> ObjectDescriptor {
    ObjectDescriptor::new("Group")
        .with_field(id_field("Group"))
        .with_field(field("Group", "Name", "string").name_field())
}

/// Source side: `Contact.Rating__c` and `Legacy__c` exist only here.
pub fn source_snapshot() -> SchemaSnapshot {
    SchemaSnapshot::new(vec![
        account(),
        contact().with_field(field("Contact", "Rating__c", "picklist")),
        case(),
        user(),
        group(),
        ObjectDescriptor::new("Legacy__c")
            .with_field(id_field("Legacy__c"))
            .with_field(field("Legacy__c", "Name", "string").name_field()),
    ])
}

/// Target side: `Contact.Tier__c` and `Invoice__c` exist only here.
pub fn target_snapshot() -> SchemaSnapshot {
    SchemaSnapshot::new(vec![
        account(),
        contact().with_field(field("Contact", "Tier__c", "picklist")),
        case(),
        user(),
        group(),
        ObjectDescriptor::new("Invoice__c")
            .with_field(id_field("Invoice__c"))
            .with_field(field("Invoice__c", "Name", "string").name_field())
            .with_field(field("Invoice__c", "Amount__c", "currency")),
    ])
}

pub fn sample_catalog() -> SchemaCatalog {
    SchemaCatalog::merge(&source_snapshot(), &target_snapshot())
}

//! Provenance-tagged schema catalog built from two independent snapshots.
//! Lookups never fail; misses return an `Unknown` sentinel.

use std::{
    collections::{BTreeMap, btree_map::Entry},
    path::Path,
};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    describe::{FieldDescriptor, ObjectDescriptor, Provenance, Side, UNKNOWN_FIELD, UNKNOWN_OBJECT},
    io_utils,
};

/// One side's describe results as handed over by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    #[serde(default)]
    pub objects: Vec<ObjectDescriptor>,
}

impl SchemaSnapshot {
    pub fn new(objects: Vec<ObjectDescriptor>) -> Self {
        let mut snapshot = Self { objects };
        snapshot.normalize();
        snapshot
    }

    /// Loads a snapshot from YAML or JSON; `-` stands for an empty side.
    pub fn load(path: &Path) -> Result<Self> {
        if io_utils::is_dash(path) {
            return Ok(Self::default());
        }
        let mut snapshot: SchemaSnapshot = io_utils::read_structured(path)
            .with_context(|| format!("Loading schema snapshot from {path:?}"))?;
        snapshot.normalize();
        debug!(
            "Loaded {} object(s) from snapshot {:?}",
            snapshot.objects.len(),
            path
        );
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        io_utils::write_structured(path, self)
            .with_context(|| format!("Writing schema snapshot to {path:?}"))
    }

    pub fn object(&self, name: &str) -> Option<&ObjectDescriptor> {
        self.objects.iter().find(|object| object.name == name)
    }

    fn normalize(&mut self) {
        for object in &mut self.objects {
            object.normalize();
        }
    }

    /// Indexes objects by name; the first description of a name wins.
    fn index(&self, side: Side) -> BTreeMap<&str, &ObjectDescriptor> {
        let mut index = BTreeMap::new();
        for object in &self.objects {
            match index.entry(object.name.as_str()) {
                Entry::Vacant(slot) => {
                    slot.insert(object);
                }
                Entry::Occupied(_) => warn!(
                    "Duplicate {} description of {}; keeping the first",
                    side.label(),
                    object.name
                ),
            }
        }
        index
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub source_only: usize,
    pub target_only: usize,
    pub both: usize,
    pub undescribed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaCatalog {
    objects: BTreeMap<String, ObjectDescriptor>,
}

impl SchemaCatalog {
    pub fn merge(source: &SchemaSnapshot, target: &SchemaSnapshot) -> Self {
        let source_index = source.index(Side::Source);
        let target_index = target.index(Side::Target);

        let mut objects = BTreeMap::new();
        for (name, source_object) in &source_index {
            let merged = match target_index.get(name) {
                Some(target_object) => merge_fields(source_object, target_object),
                None => tag_object(source_object, Side::Source),
            };
            objects.insert(name.to_string(), merged);
        }
        for (name, target_object) in &target_index {
            if !source_index.contains_key(name) {
                objects.insert(name.to_string(), tag_object(target_object, Side::Target));
            }
        }

        let catalog = Self { objects };
        let summary = catalog.summary();
        debug!(
            "Merged catalog: {} in both, {} source-only, {} target-only, {} undescribed",
            summary.both, summary.source_only, summary.target_only, summary.undescribed
        );
        catalog
    }

    /// Returns the named object or the `unknown` sentinel.
    pub fn lookup(&self, name: &str) -> &ObjectDescriptor {
        self.objects.get(name).unwrap_or(&UNKNOWN_OBJECT)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectDescriptor> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn view(&self, side: Side) -> CatalogView<'_> {
        CatalogView {
            catalog: self,
            side,
        }
    }

    pub fn summary(&self) -> CatalogSummary {
        let mut summary = CatalogSummary::default();
        for object in self.objects.values() {
            match object.provenance {
                Provenance::Source => summary.source_only += 1,
                Provenance::Target => summary.target_only += 1,
                Provenance::Both => summary.both += 1,
                Provenance::Unknown | Provenance::Composite => {}
            }
            if !object.is_described() {
                summary.undescribed += 1;
            }
        }
        summary
    }

    /// Stable SHA-256 over the catalog contents, for callers that memoize
    /// derived results.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(&self.objects).context("Serializing catalog")?;
        Ok(format!("{:x}", Sha256::digest(&canonical)))
    }
}

/// Field-level outer join of one object described on both sides.
///
/// Object attributes and shared field descriptors come from the source side.
/// A side that returned no fields is recorded in `undescribed_on`.
pub fn merge_fields(source: &ObjectDescriptor, target: &ObjectDescriptor) -> ObjectDescriptor {
    let mut merged = source.clone();
    merged.provenance = Provenance::Both;
    merged.undescribed_on = [(Side::Source, source), (Side::Target, target)]
        .into_iter()
        .filter(|(_, object)| object.fields.is_empty())
        .map(|(side, _)| side)
        .collect();
    for field in merged.fields.values_mut() {
        field.provenance = if target.has_field(&field.name) {
            Provenance::Both
        } else {
            Provenance::Source
        };
    }
    for (name, field) in &target.fields {
        if !merged.fields.contains_key(name) {
            let mut field = field.clone();
            field.object_name = merged.name.clone();
            field.provenance = Provenance::Target;
            merged.fields.insert(name.clone(), field);
        }
    }
    tag_composites(&mut merged);
    merged
}

fn tag_object(object: &ObjectDescriptor, side: Side) -> ObjectDescriptor {
    let provenance = side.provenance();
    let mut tagged = object.clone();
    tagged.provenance = provenance;
    tagged.undescribed_on = if object.fields.is_empty() {
        vec![side]
    } else {
        Vec::new()
    };
    for field in tagged.fields.values_mut() {
        field.provenance = provenance;
    }
    tag_composites(&mut tagged);
    tagged
}

fn tag_composites(object: &mut ObjectDescriptor) {
    for field in object.fields.values_mut() {
        if field.name.contains('.') {
            field.provenance = Provenance::Composite;
        }
    }
}

/// Read-only projection of the catalog onto one side.
#[derive(Debug, Clone, Copy)]
pub struct CatalogView<'a> {
    catalog: &'a SchemaCatalog,
    side: Side,
}

impl<'a> CatalogView<'a> {
    pub fn lookup(&self, name: &str) -> &'a ObjectDescriptor {
        let object = self.catalog.lookup(name);
        if object.provenance.visible_on(self.side) {
            object
        } else {
            &UNKNOWN_OBJECT
        }
    }

    pub fn field(&self, object_name: &str, field_name: &str) -> &'a FieldDescriptor {
        let field = self.lookup(object_name).field(field_name);
        if field.provenance.visible_on(self.side) {
            field
        } else {
            &UNKNOWN_FIELD
        }
    }

    pub fn field_names(&self, object_name: &str) -> Vec<&'a str> {
        self.lookup(object_name)
            .fields
            .values()
            .filter(|field| field.provenance.visible_on(self.side))
            .map(|field| field.name.as_str())
            .collect()
    }
}

//! Describes a CSV file as an object; every header becomes a text field.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use encoding_rs::Encoding;
use log::{debug, warn};

use crate::{
    describe::{FieldDescriptor, ObjectDescriptor},
    external_id::ID_FIELD,
    io_utils,
    polymorphic::clean_name,
};

pub fn describe_csv_file(
    path: &Path,
    object_name: &str,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<ObjectDescriptor> {
    ensure!(!object_name.trim().is_empty(), "Object name must not be empty");
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;

    let mut object = ObjectDescriptor::new(object_name.trim());
    for header in &headers {
        let name = clean_name(header.trim_start_matches('\u{feff}'));
        if name.is_empty() {
            continue;
        }
        if object.has_field(name) {
            warn!("Duplicate column {name} in {path:?}; keeping the first");
            continue;
        }
        object = object.with_field(describe_column(object_name, name));
    }
    debug!(
        "Described {} column(s) of {path:?} as {} (delimiter '{}')",
        object.fields.len(),
        object.name,
        io_utils::printable_delimiter(delimiter)
    );
    Ok(object)
}

fn describe_column(object_name: &str, name: &str) -> FieldDescriptor {
    if name == ID_FIELD {
        FieldDescriptor::new(object_name, name, "id").read_only()
    } else {
        FieldDescriptor::new(object_name, name, "string")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn headers_become_writable_string_fields() {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("temp csv");
        writeln!(file, "Id,Name,Account.Name,,Name").expect("write header");
        writeln!(file, "001,Acme,Parent,,dup").expect("write row");

        let object = describe_csv_file(file.path(), "Account", b',', encoding_rs::UTF_8)
            .expect("describe csv");
        assert_eq!(
            object.field_names().collect::<Vec<_>>(),
            vec!["Account.Name", "Id", "Name"]
        );
        assert_eq!(object.field("Id").field_type, "id");
        assert!(object.field("Id").readonly());
        let name = object.field("Name");
        assert!(name.creatable && name.updateable);
        assert_eq!(name.field_type, "string");
    }
}

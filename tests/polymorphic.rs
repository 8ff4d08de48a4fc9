use proptest::prelude::*;
use sobject_reconcile::polymorphic::{PolymorphicAssignment, decode, encode, extract_all};

#[test]
fn extract_all_splits_plain_names_and_assignments() {
    let extracted = extract_all(&["OwnerId$User", "Name"]);
    assert_eq!(extracted.plain_fields, vec!["OwnerId", "Name"]);
    assert_eq!(
        extracted.polymorphic_assignments,
        vec![PolymorphicAssignment::new("OwnerId", "User")]
    );
    assert_eq!(extracted.polymorphic_assignments[0].token(), "OwnerId$User");
}

#[test]
fn assignments_serialize_with_camel_case_keys() {
    let json = serde_json::to_string(&PolymorphicAssignment::new("WhatId", "Account"))
        .expect("serialize assignment");
    assert_eq!(json, r#"{"name":"WhatId","objectName":"Account"}"#);
}

fn identifier() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,20}"
}

fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        identifier(),
        (identifier(), identifier()).prop_map(|(field, object)| encode(&field, &object)),
    ]
}

proptest! {
    #[test]
    fn encode_then_decode_returns_the_pair(field in identifier(), object in identifier()) {
        let encoded = encode(&field, &object);
        let decoded = decode(&encoded);
        prop_assert_eq!(decoded.field_name, field.as_str());
        prop_assert_eq!(decoded.object_name, Some(object.as_str()));
    }

    #[test]
    fn extract_all_is_idempotent(tokens in prop::collection::vec(token(), 0..12)) {
        let once = extract_all(&tokens);
        let twice = extract_all(&once.plain_fields);
        prop_assert_eq!(&twice.plain_fields, &once.plain_fields);
        prop_assert!(twice.polymorphic_assignments.is_empty());
        prop_assert_eq!(once.plain_fields.len(), tokens.len());
    }
}

use dbmerge_core::{DataMap, DbAttribute, DbEntity, SqlType};

#[test]
fn deserializes_minimal_snapshot_with_defaults() {
    let json = r#"{
  "name": "inventory",
  "db_entities": [
    {
      "name": "PERSON",
      "attributes": [
        { "name": "ID", "sql_type": "INTEGER", "mandatory": true, "primary_key": true },
        { "name": "NAME", "sql_type": "VARCHAR", "max_length": 100 }
      ]
    }
  ]
}"#;

    let map: DataMap = serde_json::from_str(json).expect("parse snapshot");
    let person = map.db_entity("PERSON").expect("person");
    assert!(!person.is_view());
    assert_eq!(person.primary_keys().len(), 1);
    assert_eq!(
        person.attribute("NAME").and_then(|a| a.max_length),
        Some(100)
    );
    assert!(map.obj_entities.is_empty());
    assert!(map.procedures.is_empty());
}

#[test]
fn serializes_snapshot_deterministically() {
    let mut map = DataMap::new("inventory");
    let mut person = DbEntity::new("PERSON");
    person.add_attribute(DbAttribute::new("ID", SqlType::BigInt));
    map.add_db_entity(person);

    let first = serde_json::to_string_pretty(&map).expect("serialize snapshot");
    let reparsed: DataMap = serde_json::from_str(&first).expect("parse snapshot");
    let second = serde_json::to_string_pretty(&reparsed).expect("serialize snapshot");
    assert_eq!(first, second);
    assert!(first.contains("\"sql_type\": \"BIGINT\""));
}

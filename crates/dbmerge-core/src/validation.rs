use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::schema::DataMap;

/// Validate internal consistency of a snapshot.
///
/// This checks:
/// - duplicate entities/columns/relationships (case-insensitive)
/// - join source columns exist on the owning entity
/// - join target columns exist when the target entity is part of the snapshot
/// - object entities point at known db entities and columns
pub fn validate_data_map(map: &DataMap) -> Result<()> {
    let mut catalog: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for entity in &map.db_entities {
        let key = entity.name.to_lowercase();
        if catalog.contains_key(&key) {
            return Err(Error::InvalidSchema(format!(
                "duplicate db entity name: {}",
                entity.name
            )));
        }

        let mut columns = BTreeSet::new();
        for attribute in &entity.attributes {
            if !columns.insert(attribute.name.to_lowercase()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {}.{}",
                    entity.name, attribute.name
                )));
            }
        }

        let mut relationships = BTreeSet::new();
        for relationship in &entity.relationships {
            if !relationships.insert(relationship.name.to_lowercase()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate relationship name: {}.{}",
                    entity.name, relationship.name
                )));
            }
        }

        catalog.insert(key, columns);
    }

    for entity in &map.db_entities {
        let columns = catalog.get(&entity.name.to_lowercase()).ok_or_else(|| {
            Error::InvalidSchema(format!("missing entity in catalog: {}", entity.name))
        })?;

        for relationship in &entity.relationships {
            for join in &relationship.joins {
                if !columns.contains(&join.source.to_lowercase()) {
                    return Err(Error::InvalidSchema(format!(
                        "join source column not found: {}.{} (relationship {})",
                        entity.name, join.source, relationship.name
                    )));
                }
            }

            // Targets outside the snapshot are allowed: filtered introspection
            // routinely cuts relationships at the filter boundary.
            if let Some(target_columns) = catalog.get(&relationship.target_entity.to_lowercase()) {
                for join in &relationship.joins {
                    if !target_columns.contains(&join.target.to_lowercase()) {
                        return Err(Error::InvalidSchema(format!(
                            "join target column not found: {}.{} (relationship {}.{})",
                            relationship.target_entity, join.target, entity.name, relationship.name
                        )));
                    }
                }
            }
        }
    }

    let mut obj_names = BTreeSet::new();
    for obj_entity in &map.obj_entities {
        if !obj_names.insert(obj_entity.name.clone()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate obj entity name: {}",
                obj_entity.name
            )));
        }

        let Some(db_name) = obj_entity.db_entity.as_deref() else {
            continue;
        };
        let columns = catalog.get(&db_name.to_lowercase()).ok_or_else(|| {
            Error::InvalidSchema(format!(
                "obj entity {} maps unknown db entity {}",
                obj_entity.name, db_name
            ))
        })?;

        for attribute in &obj_entity.attributes {
            if !columns.contains(&attribute.db_attribute.to_lowercase()) {
                return Err(Error::InvalidSchema(format!(
                    "obj attribute {}.{} maps unknown column {}.{}",
                    obj_entity.name, attribute.name, db_name, attribute.db_attribute
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{DbJoin, DbRelationship};
    use crate::mapping::{ObjAttribute, ObjEntity};
    use crate::schema::{DbAttribute, DbEntity};
    use crate::types::SqlType;

    fn entity(name: &str, columns: &[&str]) -> DbEntity {
        let mut entity = DbEntity::new(name);
        for column in columns {
            entity.add_attribute(DbAttribute::new(*column, SqlType::Integer));
        }
        entity
    }

    #[test]
    fn accepts_consistent_snapshot() {
        let mut map = DataMap::new("test");
        map.add_db_entity(entity("ARTIST", &["ID"]));
        let mut painting = entity("PAINTING", &["ID", "ARTIST_ID"]);
        painting.add_relationship(DbRelationship {
            name: "toArtist".to_string(),
            target_entity: "ARTIST".to_string(),
            to_many: false,
            to_dependent_pk: false,
            fk_name: None,
            joins: vec![DbJoin::new("ARTIST_ID", "ID")],
        });
        map.add_db_entity(painting);

        assert!(validate_data_map(&map).is_ok());
    }

    #[test]
    fn rejects_duplicate_columns_ignoring_case() {
        let mut map = DataMap::new("test");
        let mut artist = entity("ARTIST", &["ID"]);
        artist
            .attributes
            .push(DbAttribute::new("id", SqlType::Integer));
        map.db_entities.push(artist);

        let err = validate_data_map(&map).unwrap_err();
        assert!(err.to_string().contains("duplicate column name"));
    }

    #[test]
    fn rejects_obj_attribute_on_unknown_column() {
        let mut map = DataMap::new("test");
        map.add_db_entity(entity("ARTIST", &["ID"]));
        let mut obj = ObjEntity::new("Artist");
        obj.db_entity = Some("ARTIST".to_string());
        obj.attributes.push(ObjAttribute {
            name: "name".to_string(),
            value_type: "String".to_string(),
            db_attribute: "NAME".to_string(),
        });
        map.add_obj_entity(obj);

        let err = validate_data_map(&map).unwrap_err();
        assert!(err.to_string().contains("unknown column"));
    }
}

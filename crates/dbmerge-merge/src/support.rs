//! Keeps the mapped object layer in step with the table layer.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use dbmerge_core::{DataMap, DbAttribute, DbEntity, DbRelationship, ObjAttribute, ObjRelationship};
use tracing::{debug, warn};

use crate::context::lock_model;
use crate::error::{MergeError, Result};
use crate::naming::{ObjectNameGenerator, unique_name};

/// Observes mapped attributes and relationships added or removed by
/// [`EntityMergeSupport`].
#[allow(unused_variables)]
pub trait EntityMergeListener: Send {
    fn obj_attribute_added(&mut self, entity: &str, attribute: &ObjAttribute) {}
    fn obj_attribute_removed(&mut self, entity: &str, attribute: &ObjAttribute) {}
    fn obj_relationship_added(&mut self, entity: &str, relationship: &ObjRelationship) {}
    fn obj_relationship_removed(&mut self, entity: &str, relationship: &ObjRelationship) {}
}

/// Reconciliation pass between db entities and the obj entities mapped on
/// them.
///
/// Meaningful primary keys and foreign keys (columns the mapping layer
/// should not expose as plain attributes) are left unmapped by default.
pub struct EntityMergeSupport {
    name_generator: Arc<dyn ObjectNameGenerator>,
    remove_meaningful_pks: bool,
    remove_meaningful_fks: bool,
    listeners: Vec<Box<dyn EntityMergeListener>>,
}

impl EntityMergeSupport {
    pub fn new(name_generator: Arc<dyn ObjectNameGenerator>) -> Self {
        Self {
            name_generator,
            remove_meaningful_pks: true,
            remove_meaningful_fks: true,
            listeners: Vec::new(),
        }
    }

    pub fn name_generator(&self) -> &dyn ObjectNameGenerator {
        self.name_generator.as_ref()
    }

    pub fn remove_meaningful_pks(&self) -> bool {
        self.remove_meaningful_pks
    }

    pub fn set_remove_meaningful_pks(&mut self, remove: bool) {
        self.remove_meaningful_pks = remove;
    }

    pub fn remove_meaningful_fks(&self) -> bool {
        self.remove_meaningful_fks
    }

    pub fn set_remove_meaningful_fks(&mut self, remove: bool) {
        self.remove_meaningful_fks = remove;
    }

    pub fn add_listener(&mut self, listener: impl EntityMergeListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Bring one obj entity in line with its db entity while holding the
    /// model lock. Returns whether anything changed.
    pub fn synchronize_with_db_entity(&mut self, model: &Mutex<DataMap>, obj_entity: &str) -> Result<bool> {
        let mut map = lock_model(model)?;
        self.sync_obj_entity(&mut map, obj_entity)
    }

    /// Same as [`Self::synchronize_with_db_entity`] for several entities
    /// under a single lock.
    pub fn synchronize_with_db_entities(
        &mut self,
        model: &Mutex<DataMap>,
        obj_entities: &[String],
    ) -> Result<bool> {
        let mut map = lock_model(model)?;
        let mut changed = false;
        for name in obj_entities {
            changed |= self.sync_obj_entity(&mut map, name)?;
        }
        Ok(changed)
    }

    /// Strip foreign key attributes, then map missing columns and
    /// relationships.
    pub fn sync_obj_entity(&mut self, map: &mut DataMap, obj_entity: &str) -> Result<bool> {
        let Some(db_entity) = mapped_db_entity(map, obj_entity)? else {
            return Ok(false);
        };
        let mut changed = false;

        if self.remove_meaningful_fks {
            let fk_columns: Vec<String> = to_one_source_columns(&db_entity);
            for column in &fk_columns {
                changed |= self.remove_attributes_for_column(map, obj_entity, column)?;
            }
        }

        for column in self.attributes_to_add(map, obj_entity)? {
            self.add_obj_attribute(map, obj_entity, &column)?;
            changed = true;
        }

        for relationship in self.relationships_to_add(map, obj_entity)? {
            self.add_obj_relationship(map, obj_entity, &relationship)?;
            changed = true;
        }

        debug!(obj_entity, db_entity = %db_entity.name, changed, "obj entity synchronized");
        Ok(changed)
    }

    /// Map a freshly added column on every obj entity of its table, when the
    /// policies allow it.
    pub fn synchronize_on_db_attribute_added(
        &mut self,
        map: &mut DataMap,
        db_entity: &str,
        column: &str,
    ) -> Result<()> {
        for obj_entity in map.mapped_obj_entities(db_entity) {
            let to_add = self.attributes_to_add(map, &obj_entity)?;
            if let Some(attribute) = to_add.iter().find(|attribute| attribute.name == column) {
                self.add_obj_attribute(map, &obj_entity, attribute)?;
            }
        }
        Ok(())
    }

    /// Reflect a freshly added db relationship on every obj entity of its
    /// source table. A to-one relationship turns its source columns into
    /// foreign keys, so attributes mapped on them are removed.
    pub fn synchronize_on_db_relationship_added(
        &mut self,
        map: &mut DataMap,
        db_entity: &str,
        relationship: &str,
    ) -> Result<()> {
        let db_relationship = map
            .db_entity(db_entity)
            .and_then(|entity| entity.relationship(relationship))
            .cloned()
            .ok_or_else(|| MergeError::MissingEntity(format!("{db_entity}.{relationship}")))?;

        for obj_entity in map.mapped_obj_entities(db_entity) {
            if !db_relationship.to_many && self.remove_meaningful_fks {
                for column in db_relationship.source_columns() {
                    self.remove_attributes_for_column(map, &obj_entity, column)?;
                }
            }
            let mapped = map
                .obj_entity(&obj_entity)
                .and_then(|entity| entity.relationship_for_db_relationship(&db_relationship.name))
                .is_some();
            if !mapped {
                self.add_obj_relationship(map, &obj_entity, &db_relationship)?;
            }
        }
        Ok(())
    }

    /// Columns of the underlying table that should be mapped but are not.
    pub fn attributes_to_add(&self, map: &DataMap, obj_entity: &str) -> Result<Vec<DbAttribute>> {
        let entity = map
            .obj_entity(obj_entity)
            .ok_or_else(|| MergeError::MissingEntity(obj_entity.to_string()))?;
        let Some(db_entity) = mapped_db_entity(map, obj_entity)? else {
            return Ok(Vec::new());
        };

        let mut fk_columns: HashSet<String> = to_one_source_columns(&db_entity).into_iter().collect();
        for (_, incoming) in map.incoming_relationships(&db_entity.name) {
            if !incoming.to_many {
                fk_columns.extend(incoming.target_columns().into_iter().map(str::to_string));
            }
        }

        Ok(db_entity
            .attributes
            .iter()
            .filter(|column| entity.attribute_for_column(&column.name).is_none())
            .filter(|column| {
                if column.primary_key {
                    !self.remove_meaningful_pks
                } else {
                    !(self.remove_meaningful_fks && fk_columns.contains(&column.name))
                }
            })
            .cloned()
            .collect())
    }

    /// Db relationships of the underlying table with no mapped counterpart.
    pub fn relationships_to_add(&self, map: &DataMap, obj_entity: &str) -> Result<Vec<DbRelationship>> {
        let entity = map
            .obj_entity(obj_entity)
            .ok_or_else(|| MergeError::MissingEntity(obj_entity.to_string()))?;
        let Some(db_entity) = mapped_db_entity(map, obj_entity)? else {
            return Ok(Vec::new());
        };
        Ok(db_entity
            .relationships
            .iter()
            .filter(|relationship| {
                entity
                    .relationship_for_db_relationship(&relationship.name)
                    .is_none()
            })
            .cloned()
            .collect())
    }

    /// Remove every obj attribute mapped on `column`; name clashes can map a
    /// column more than once.
    pub fn remove_attributes_for_column(
        &mut self,
        map: &mut DataMap,
        obj_entity: &str,
        column: &str,
    ) -> Result<bool> {
        let entity = map
            .obj_entity_mut(obj_entity)
            .ok_or_else(|| MergeError::MissingEntity(obj_entity.to_string()))?;
        let mut removed = false;
        while let Some(name) = entity.attribute_for_column(column).map(|attribute| attribute.name.clone()) {
            if let Some(attribute) = entity.remove_attribute(&name) {
                for listener in &mut self.listeners {
                    listener.obj_attribute_removed(obj_entity, &attribute);
                }
                removed = true;
            }
        }
        Ok(removed)
    }

    fn add_obj_attribute(&mut self, map: &mut DataMap, obj_entity: &str, column: &DbAttribute) -> Result<()> {
        let base = self.name_generator.obj_attribute_name(&column.name);
        let entity = map
            .obj_entity_mut(obj_entity)
            .ok_or_else(|| MergeError::MissingEntity(obj_entity.to_string()))?;
        let attribute = ObjAttribute {
            name: unique_name(&base, |candidate| entity.has_property(candidate)),
            value_type: column.sql_type.value_type().to_string(),
            db_attribute: column.name.clone(),
        };
        entity.attributes.push(attribute.clone());
        for listener in &mut self.listeners {
            listener.obj_attribute_added(obj_entity, &attribute);
        }
        Ok(())
    }

    fn add_obj_relationship(
        &mut self,
        map: &mut DataMap,
        obj_entity: &str,
        relationship: &DbRelationship,
    ) -> Result<()> {
        let (target_entity, guessed) = match map
            .mapped_obj_entities(&relationship.target_entity)
            .into_iter()
            .next()
        {
            Some(target) => (target, false),
            None => {
                let generated = match map.find_db_entity(&relationship.target_entity) {
                    Some(target) => self.name_generator.obj_entity_name(target),
                    None => self
                        .name_generator
                        .obj_entity_name(&DbEntity::new(relationship.target_entity.clone())),
                };
                let guessed = map.obj_entity(&generated).is_none();
                if guessed {
                    warn!(
                        obj_entity,
                        db_relationship = %relationship.name,
                        target = %generated,
                        "no obj entity mapped on relationship target, guessing its name"
                    );
                }
                (generated, guessed)
            }
        };

        let base = self.name_generator.relationship_name(relationship);
        let entity = map
            .obj_entity_mut(obj_entity)
            .ok_or_else(|| MergeError::MissingEntity(obj_entity.to_string()))?;
        let obj_relationship = ObjRelationship {
            name: unique_name(&base, |candidate| entity.has_property(candidate)),
            target_entity,
            db_relationship: relationship.name.clone(),
            to_many: relationship.to_many,
            guessed,
        };
        entity.relationships.push(obj_relationship.clone());
        for listener in &mut self.listeners {
            listener.obj_relationship_added(obj_entity, &obj_relationship);
        }
        Ok(())
    }

    /// Remove obj relationships mapped on `db_relationship` from every obj
    /// entity of `db_entity`.
    pub fn remove_obj_relationships(
        &mut self,
        map: &mut DataMap,
        db_entity: &str,
        db_relationship: &str,
    ) -> Vec<(String, ObjRelationship)> {
        let mut removed = Vec::new();
        for obj_entity in map.mapped_obj_entities(db_entity) {
            let Some(entity) = map.obj_entity_mut(&obj_entity) else {
                continue;
            };
            while let Some(name) = entity
                .relationship_for_db_relationship(db_relationship)
                .map(|relationship| relationship.name.clone())
            {
                if let Some(relationship) = entity.remove_relationship(&name) {
                    for listener in &mut self.listeners {
                        listener.obj_relationship_removed(&obj_entity, &relationship);
                    }
                    removed.push((obj_entity.clone(), relationship));
                }
            }
        }
        removed
    }
}

/// The db entity an obj entity is mapped on, cloned so the map can be
/// mutated afterwards. `None` when the obj entity is unmapped.
fn mapped_db_entity(map: &DataMap, obj_entity: &str) -> Result<Option<DbEntity>> {
    let entity = map
        .obj_entity(obj_entity)
        .ok_or_else(|| MergeError::MissingEntity(obj_entity.to_string()))?;
    Ok(entity
        .db_entity
        .as_deref()
        .and_then(|name| map.db_entity(name))
        .cloned())
}

fn to_one_source_columns(entity: &DbEntity) -> Vec<String> {
    entity
        .relationships
        .iter()
        .filter(|relationship| !relationship.to_many)
        .flat_map(|relationship| relationship.source_columns())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use dbmerge_core::{DbJoin, ObjEntity, SqlType};

    use super::*;
    use crate::naming::DefaultNameGenerator;

    #[derive(Default)]
    struct Events(Arc<Mutex<Vec<String>>>);

    impl EntityMergeListener for Events {
        fn obj_attribute_added(&mut self, entity: &str, attribute: &ObjAttribute) {
            if let Ok(mut events) = self.0.lock() {
                events.push(format!("+{entity}.{}", attribute.name));
            }
        }

        fn obj_attribute_removed(&mut self, entity: &str, attribute: &ObjAttribute) {
            if let Ok(mut events) = self.0.lock() {
                events.push(format!("-{entity}.{}", attribute.name));
            }
        }

        fn obj_relationship_added(&mut self, entity: &str, relationship: &ObjRelationship) {
            if let Ok(mut events) = self.0.lock() {
                events.push(format!("+{entity}.{}", relationship.name));
            }
        }
    }

    fn gallery_map() -> DataMap {
        let mut artist = DbEntity::new("ARTIST");
        let mut id = DbAttribute::new("ID", SqlType::Integer);
        id.primary_key = true;
        artist.add_attribute(id.clone());
        artist.add_attribute(DbAttribute::new("FIRST_NAME", SqlType::Varchar));

        let mut painting = DbEntity::new("PAINTING");
        painting.add_attribute(id);
        painting.add_attribute(DbAttribute::new("TITLE", SqlType::Varchar));
        painting.add_attribute(DbAttribute::new("ARTIST_ID", SqlType::Integer));
        painting.add_relationship(DbRelationship {
            name: "toArtist".to_string(),
            target_entity: "ARTIST".to_string(),
            to_many: false,
            to_dependent_pk: false,
            fk_name: None,
            joins: vec![DbJoin::new("ARTIST_ID", "ID")],
        });

        let mut map = DataMap::new("gallery");
        map.add_db_entity(artist);
        map.add_db_entity(painting);
        let mut obj = ObjEntity::new("Artist");
        obj.db_entity = Some("ARTIST".to_string());
        map.add_obj_entity(obj);
        let mut obj = ObjEntity::new("Painting");
        obj.db_entity = Some("PAINTING".to_string());
        obj.attributes.push(ObjAttribute {
            name: "artistId".to_string(),
            value_type: "i32".to_string(),
            db_attribute: "ARTIST_ID".to_string(),
        });
        map.add_obj_entity(obj);
        map
    }

    #[test]
    fn skips_meaningful_keys() {
        let map = gallery_map();
        let support = EntityMergeSupport::new(Arc::new(DefaultNameGenerator));
        let names: Vec<_> = support
            .attributes_to_add(&map, "Painting")
            .expect("attributes")
            .into_iter()
            .map(|attribute| attribute.name)
            .collect();
        assert_eq!(names, ["TITLE"]);

        let mut support = support;
        support.set_remove_meaningful_pks(false);
        let names: Vec<_> = support
            .attributes_to_add(&map, "Artist")
            .expect("attributes")
            .into_iter()
            .map(|attribute| attribute.name)
            .collect();
        assert_eq!(names, ["ID", "FIRST_NAME"]);
    }

    #[test]
    fn synchronize_replaces_fk_attribute_with_relationship() {
        let model = Mutex::new(gallery_map());
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut support = EntityMergeSupport::new(Arc::new(DefaultNameGenerator));
        support.add_listener(Events(Arc::clone(&events)));

        let changed = support
            .synchronize_with_db_entity(&model, "Painting")
            .expect("sync");
        assert!(changed);

        let map = model.lock().expect("lock");
        let painting = map.obj_entity("Painting").expect("painting");
        assert!(painting.attribute("artistId").is_none());
        assert!(painting.attribute("title").is_some());
        let relationship = painting.relationship("artist").expect("relationship");
        assert_eq!(relationship.target_entity, "Artist");
        assert!(!relationship.guessed);
        assert_eq!(
            *events.lock().expect("events"),
            ["-Painting.artistId", "+Painting.title", "+Painting.artist"]
        );
    }

    #[test]
    fn unmapped_target_is_guessed() {
        let mut map = gallery_map();
        map.remove_obj_entity("Artist", true);
        let mut support = EntityMergeSupport::new(Arc::new(DefaultNameGenerator));
        support.sync_obj_entity(&mut map, "Painting").expect("sync");

        let relationship = map
            .obj_entity("Painting")
            .and_then(|entity| entity.relationship("artist"))
            .expect("relationship");
        assert_eq!(relationship.target_entity, "Artist");
        assert!(relationship.guessed);
    }

    #[test]
    fn attribute_names_are_made_unique() {
        let mut map = gallery_map();
        if let Some(entity) = map.obj_entity_mut("Painting") {
            entity.relationships.push(ObjRelationship {
                name: "title".to_string(),
                target_entity: "Artist".to_string(),
                db_relationship: "legacy".to_string(),
                to_many: false,
                guessed: false,
            });
        }
        let mut support = EntityMergeSupport::new(Arc::new(DefaultNameGenerator));
        support
            .synchronize_on_db_attribute_added(&mut map, "PAINTING", "TITLE")
            .expect("sync");
        let painting = map.obj_entity("Painting").expect("painting");
        assert_eq!(
            painting.attribute_for_column("TITLE").map(|a| a.name.as_str()),
            Some("title1")
        );
    }
}

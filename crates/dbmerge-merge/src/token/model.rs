use std::sync::Arc;

use dbmerge_core::{DataMap, DbAttribute, DbEntity, DbRelationship, ObjEntity};
use tracing::debug;

use super::Change;
use crate::context::{MergerContext, ModelMergeDelegate, lock_model};
use crate::error::{MergeError, Result};
use crate::naming::unique_name;
use crate::support::EntityMergeSupport;

/// Apply a `TO_MODEL` change to the shared model, holding its lock for the
/// whole change.
pub(super) fn apply(change: &Change, ctx: &mut MergerContext) -> Result<()> {
    let model = Arc::clone(&ctx.model);
    let mut map = lock_model(&model)?;
    let mut updater = ModelUpdater {
        map: &mut map,
        delegate: ctx.delegate.as_mut(),
        support: &mut ctx.entity_merge_support,
    };

    match change {
        Change::CreateTable { entity } => updater.create_table(entity),
        Change::DropTable { entity } => updater.drop_table(&entity.name),
        Change::AddColumn { table, column } => updater.add_column(&table.name, column),
        Change::DropColumn { table, column } => updater.drop_column(&table.name, &column.name),
        Change::SetNotNull { table, column } => {
            updater.modify_column(&table.name, &column.name, |attribute| attribute.mandatory = true)
        }
        Change::SetAllowNull { table, column } => {
            updater.modify_column(&table.name, &column.name, |attribute| attribute.mandatory = false)
        }
        Change::SetValueForNull { .. } => Ok(()),
        Change::SetColumnType { table, to, .. } => updater.set_column_type(&table.name, to),
        Change::SetGeneratedFlag {
            table,
            column,
            generated,
        } => updater.modify_column(&table.name, &column.name, |attribute| {
            attribute.generated = *generated
        }),
        Change::SetPrimaryKey {
            table, new_columns, ..
        } => updater.set_primary_key(&table.name, new_columns),
        Change::AddRelationship {
            source,
            relationship,
            ..
        } => updater.add_relationship(&source.name, relationship),
        Change::DropRelationship {
            source,
            relationship,
            ..
        } => updater.drop_relationship(&source.name, relationship),
        Change::AddProcedure { procedure } => {
            updater.map.add_procedure(procedure.clone());
            updater.delegate.procedure_added(procedure);
            Ok(())
        }
        Change::DropProcedure { procedure } => {
            let name = updater
                .map
                .procedures
                .iter()
                .find(|existing| existing.name.eq_ignore_ascii_case(&procedure.name))
                .map(|existing| existing.name.clone())
                .ok_or_else(|| MergeError::MissingEntity(procedure.name.clone()))?;
            if let Some(removed) = updater.map.remove_procedure(&name) {
                updater.delegate.procedure_removed(&removed);
            }
            Ok(())
        }
    }
}

struct ModelUpdater<'a> {
    map: &'a mut DataMap,
    delegate: &'a mut dyn ModelMergeDelegate,
    support: &'a mut EntityMergeSupport,
}

impl ModelUpdater<'_> {
    fn entity_name(&self, name: &str) -> Result<String> {
        self.map
            .find_db_entity(name)
            .map(|entity| entity.name.clone())
            .ok_or_else(|| MergeError::MissingEntity(name.to_string()))
    }

    fn column_name(&self, entity: &str, column: &str) -> Result<String> {
        self.map
            .db_entity(entity)
            .and_then(|entity| entity.find_attribute(column))
            .map(|attribute| attribute.name.clone())
            .ok_or_else(|| MergeError::MissingEntity(format!("{entity}.{column}")))
    }

    fn db_entity_mut(&mut self, name: &str) -> Result<&mut DbEntity> {
        self.map
            .db_entity_mut(name)
            .ok_or_else(|| MergeError::MissingEntity(name.to_string()))
    }

    /// Add the table and map it, reusing obj entities already pointing at it.
    fn create_table(&mut self, entity: &DbEntity) -> Result<()> {
        self.map.add_db_entity(entity.clone());
        self.delegate.db_entity_added(entity);

        let mut mapped = self.map.mapped_obj_entities(&entity.name);
        if mapped.is_empty() {
            let base = self.support.name_generator().obj_entity_name(entity);
            let name = unique_name(&base, |candidate| self.map.obj_entity(candidate).is_some());
            let mut obj_entity = ObjEntity::new(name.clone());
            obj_entity.db_entity = Some(entity.name.clone());
            obj_entity.class_name = Some(base);
            self.delegate.obj_entity_added(&obj_entity);
            self.map.add_obj_entity(obj_entity);
            mapped.push(name);
        }
        for obj_entity in &mapped {
            self.support.sync_obj_entity(self.map, obj_entity)?;
        }
        debug!(db_entity = %entity.name, obj_entities = mapped.len(), "table added to model");
        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> Result<()> {
        let name = self.entity_name(name)?;
        for obj_entity in self.map.mapped_obj_entities(&name) {
            if let Some(removed) = self.map.remove_obj_entity(&obj_entity, true) {
                self.delegate.obj_entity_removed(&removed);
            }
        }
        if let Some(removed) = self.map.remove_db_entity(&name, true) {
            self.delegate.db_entity_removed(&removed);
        }
        Ok(())
    }

    fn add_column(&mut self, table: &str, column: &DbAttribute) -> Result<()> {
        let table = self.entity_name(table)?;
        self.db_entity_mut(&table)?.add_attribute(column.clone());
        self.delegate.db_attribute_added(&table, column);
        self.support
            .synchronize_on_db_attribute_added(self.map, &table, &column.name)
    }

    /// Remove the column with every relationship joined on it and every
    /// attribute mapped on it.
    fn drop_column(&mut self, table: &str, column: &str) -> Result<()> {
        let table = self.entity_name(table)?;
        let column = self.column_name(&table, column)?;

        let outgoing: Vec<String> = self
            .map
            .db_entity(&table)
            .map(|entity| {
                entity
                    .relationships
                    .iter()
                    .filter(|relationship| relationship.has_source_column(&column))
                    .map(|relationship| relationship.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        for relationship in outgoing {
            self.remove_relationship(&table, &relationship)?;
        }

        let incoming: Vec<(String, String)> = self
            .map
            .incoming_relationships(&table)
            .into_iter()
            .filter(|(_, relationship)| relationship.has_target_column(&column))
            .map(|(source, relationship)| (source.to_string(), relationship.name.clone()))
            .collect();
        for (source, relationship) in incoming {
            self.remove_relationship(&source, &relationship)?;
        }

        for obj_entity in self.map.mapped_obj_entities(&table) {
            self.support
                .remove_attributes_for_column(self.map, &obj_entity, &column)?;
        }
        if let Some(removed) = self.db_entity_mut(&table)?.remove_attribute(&column) {
            self.delegate.db_attribute_removed(&table, &removed);
        }
        Ok(())
    }

    fn modify_column(
        &mut self,
        table: &str,
        column: &str,
        update: impl FnOnce(&mut DbAttribute),
    ) -> Result<()> {
        let table = self.entity_name(table)?;
        let column = self.column_name(&table, column)?;
        let attribute = self
            .db_entity_mut(&table)?
            .attribute_mut(&column)
            .ok_or_else(|| MergeError::MissingEntity(format!("{table}.{column}")))?;
        update(attribute);
        let attribute = attribute.clone();
        self.delegate.db_attribute_modified(&table, &attribute);
        Ok(())
    }

    fn set_column_type(&mut self, table: &str, to: &DbAttribute) -> Result<()> {
        self.modify_column(table, &to.name, |attribute| {
            attribute.sql_type = to.sql_type;
            attribute.max_length = to.max_length;
            attribute.precision = to.precision;
            attribute.scale = to.scale;
        })?;
        let table = self.entity_name(table)?;
        let column = self.column_name(&table, &to.name)?;
        for obj_entity in self.map.mapped_obj_entities(&table) {
            if let Some(entity) = self.map.obj_entity_mut(&obj_entity) {
                for attribute in entity
                    .attributes
                    .iter_mut()
                    .filter(|attribute| attribute.db_attribute == column)
                {
                    attribute.value_type = to.sql_type.value_type().to_string();
                }
            }
        }
        Ok(())
    }

    fn set_primary_key(&mut self, table: &str, new_columns: &[String]) -> Result<()> {
        let table = self.entity_name(table)?;
        let entity = self.db_entity_mut(&table)?;
        let mut modified = Vec::new();
        for attribute in &mut entity.attributes {
            let primary_key = new_columns
                .iter()
                .any(|column| column.eq_ignore_ascii_case(&attribute.name));
            if attribute.primary_key != primary_key {
                attribute.primary_key = primary_key;
                modified.push(attribute.clone());
            }
        }
        for attribute in &modified {
            self.delegate.db_attribute_modified(&table, attribute);
        }
        Ok(())
    }

    /// Add a db relationship unless one with the same joins exists, then
    /// reflect it on the mapped entities.
    fn add_relationship(&mut self, source: &str, relationship: &DbRelationship) -> Result<()> {
        let source = self.entity_name(source)?;
        if self.find_relationship(&source, relationship).is_some() {
            return Ok(());
        }
        let entity = self.db_entity_mut(&source)?;
        let mut relationship = relationship.clone();
        relationship.name = unique_name(&relationship.name, |candidate| {
            entity.relationship(candidate).is_some()
        });
        entity.add_relationship(relationship.clone());
        self.delegate.db_relationship_added(&source, &relationship);
        self.support
            .synchronize_on_db_relationship_added(self.map, &source, &relationship.name)
    }

    fn drop_relationship(&mut self, source: &str, relationship: &DbRelationship) -> Result<()> {
        let source = self.entity_name(source)?;
        let name = self.find_relationship(&source, relationship).ok_or_else(|| {
            MergeError::MissingEntity(format!("{source}.{}", relationship.name))
        })?;
        self.remove_relationship(&source, &name)
    }

    /// Name of the relationship matching by join signature, then by name.
    fn find_relationship(&self, source: &str, relationship: &DbRelationship) -> Option<String> {
        let entity = self.map.db_entity(source)?;
        let signature = relationship.signature(source).to_lowercase();
        entity
            .relationships
            .iter()
            .find(|existing| existing.signature(source).to_lowercase() == signature)
            .or_else(|| entity.relationship(&relationship.name))
            .map(|existing| existing.name.clone())
    }

    fn remove_relationship(&mut self, source: &str, name: &str) -> Result<()> {
        let removed = self
            .db_entity_mut(source)?
            .remove_relationship(name)
            .ok_or_else(|| MergeError::MissingEntity(format!("{source}.{name}")))?;
        self.delegate.db_relationship_removed(source, &removed);
        for (obj_entity, relationship) in self.support.remove_obj_relationships(self.map, source, name) {
            self.delegate.obj_relationship_removed(&obj_entity, &relationship);
        }
        Ok(())
    }
}

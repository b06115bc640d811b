use std::sync::{Arc, Mutex, MutexGuard};

use dbmerge_core::{
    DataMap, DbAttribute, DbEntity, DbRelationship, ObjEntity, ObjRelationship, Procedure,
};

use crate::adapter::{DbAdapter, GenericAdapter};
use crate::error::{MergeError, Result};
use crate::naming::DefaultNameGenerator;
use crate::report::ValidationReport;
use crate::support::EntityMergeSupport;

/// Reference model shared with other owners such as an editor.
pub type SharedDataMap = Arc<Mutex<DataMap>>;

/// Lock the shared model for the duration of one operation.
pub fn lock_model(model: &Mutex<DataMap>) -> Result<MutexGuard<'_, DataMap>> {
    model.lock().map_err(|_| MergeError::ModelLock)
}

/// Runs SQL against a live database. Connection handling stays with the
/// implementor.
pub trait SqlExecutor: Send {
    fn execute(&mut self, sql: &str) -> std::result::Result<(), String>;
}

/// Collects statements instead of running them. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    statements: Arc<Mutex<Vec<String>>>,
    fail_on: Option<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every statement containing `fragment`.
    pub fn failing_on(fragment: impl Into<String>) -> Self {
        Self {
            statements: Arc::default(),
            fail_on: Some(fragment.into()),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .map(|statements| statements.clone())
            .unwrap_or_default()
    }
}

impl SqlExecutor for RecordingExecutor {
    fn execute(&mut self, sql: &str) -> std::result::Result<(), String> {
        if let Some(fragment) = &self.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(format!("statement rejected: {sql}"));
            }
        }
        self.statements
            .lock()
            .map_err(|_| "statement log poisoned".to_string())?
            .push(sql.to_string());
        Ok(())
    }
}

/// Notified of every change a `TO_MODEL` token makes to the model.
#[allow(unused_variables)]
pub trait ModelMergeDelegate: Send {
    fn db_entity_added(&mut self, entity: &DbEntity) {}
    fn db_entity_removed(&mut self, entity: &DbEntity) {}
    fn obj_entity_added(&mut self, entity: &ObjEntity) {}
    fn obj_entity_removed(&mut self, entity: &ObjEntity) {}
    fn db_attribute_added(&mut self, entity: &str, attribute: &DbAttribute) {}
    fn db_attribute_removed(&mut self, entity: &str, attribute: &DbAttribute) {}
    fn db_attribute_modified(&mut self, entity: &str, attribute: &DbAttribute) {}
    fn db_relationship_added(&mut self, entity: &str, relationship: &DbRelationship) {}
    fn db_relationship_removed(&mut self, entity: &str, relationship: &DbRelationship) {}
    fn obj_relationship_removed(&mut self, entity: &str, relationship: &ObjRelationship) {}
    fn procedure_added(&mut self, procedure: &Procedure) {}
    fn procedure_removed(&mut self, procedure: &Procedure) {}
}

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModelMergeDelegate;

impl ModelMergeDelegate for DefaultModelMergeDelegate {}

/// Everything a token needs to execute.
pub struct MergerContext {
    pub(crate) model: SharedDataMap,
    pub(crate) adapter: Box<dyn DbAdapter>,
    pub(crate) executor: Option<Box<dyn SqlExecutor>>,
    pub(crate) delegate: Box<dyn ModelMergeDelegate>,
    pub(crate) entity_merge_support: EntityMergeSupport,
    pub(crate) validation: ValidationReport,
}

impl MergerContext {
    /// Context over `model` with the generic adapter, no executor and the
    /// default naming strategy.
    pub fn new(model: SharedDataMap) -> Self {
        Self {
            model,
            adapter: Box::new(GenericAdapter::default()),
            executor: None,
            delegate: Box::new(DefaultModelMergeDelegate),
            entity_merge_support: EntityMergeSupport::new(Arc::new(DefaultNameGenerator)),
            validation: ValidationReport::default(),
        }
    }

    pub fn with_adapter(mut self, adapter: impl DbAdapter + 'static) -> Self {
        self.adapter = Box::new(adapter);
        self
    }

    /// Same as [`MergerContext::with_adapter`] for an adapter picked at runtime.
    pub fn with_boxed_adapter(mut self, adapter: Box<dyn DbAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn with_executor(mut self, executor: impl SqlExecutor + 'static) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    pub fn with_delegate(mut self, delegate: impl ModelMergeDelegate + 'static) -> Self {
        self.delegate = Box::new(delegate);
        self
    }

    pub fn with_entity_merge_support(mut self, support: EntityMergeSupport) -> Self {
        self.entity_merge_support = support;
        self
    }

    pub fn model(&self) -> &SharedDataMap {
        &self.model
    }

    pub fn adapter(&self) -> &dyn DbAdapter {
        self.adapter.as_ref()
    }

    pub fn validation(&self) -> &ValidationReport {
        &self.validation
    }

    pub fn take_validation(&mut self) -> ValidationReport {
        std::mem::take(&mut self.validation)
    }

    pub fn entity_merge_support_mut(&mut self) -> &mut EntityMergeSupport {
        &mut self.entity_merge_support
    }
}

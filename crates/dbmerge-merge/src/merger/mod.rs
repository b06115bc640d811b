//! Diff-driven token generation.
//!
//! A [`Merger`] defines how one level of the schema (tables, columns,
//! relationships, procedures) is diffed and which tokens each diff pair
//! produces. [`merge_diff`] is the shared driver. [`ChainMerger`] scopes a
//! child level to the parent pairs that matched on both sides.

mod attribute;
mod entity;
mod procedure;
mod relationship;

use dbmerge_core::DbEntity;

use crate::diff::{DictionaryDiff, DiffPair};
use crate::error::Result;
use crate::token::MergerToken;

pub use attribute::DbAttributeMerger;
pub use entity::DbEntityMerger;
pub use procedure::ProcedureMerger;
pub use relationship::DbRelationshipMerger;

pub trait Merger<'a> {
    /// What a diff is computed from.
    type Parent: ?Sized + 'a;
    /// What the diff is made of.
    type Child: Copy;

    fn create_diff(
        &self,
        original: &'a Self::Parent,
        imported: &'a Self::Parent,
    ) -> Result<DictionaryDiff<Self::Child>>;

    /// Present only in the imported snapshot (the database).
    fn tokens_for_missing_original(&self, imported: Self::Child) -> Vec<MergerToken>;

    /// Present only in the original snapshot (the reference model).
    fn tokens_for_missing_imported(&self, original: Self::Child) -> Vec<MergerToken>;

    /// Present on both sides; report property drift.
    fn tokens_for_same(&self, pair: &DiffPair<Self::Child>) -> Vec<MergerToken>;
}

/// Diff `original` against `imported` and collect the tokens of every pair.
pub fn create_merge_tokens<'a, M: Merger<'a>>(
    merger: &M,
    original: &'a M::Parent,
    imported: &'a M::Parent,
) -> Result<Vec<MergerToken>> {
    let diff = merger.create_diff(original, imported)?;
    Ok(merge_diff(merger, &diff))
}

/// Run every pair of an already computed diff through the merger hooks.
pub fn merge_diff<'a, M: Merger<'a>>(merger: &M, diff: &DictionaryDiff<M::Child>) -> Vec<MergerToken> {
    let mut tokens = Vec::new();
    for pair in &diff.missing {
        match (pair.original, pair.imported) {
            (None, Some(imported)) => tokens.extend(merger.tokens_for_missing_original(imported)),
            (Some(original), None) => tokens.extend(merger.tokens_for_missing_imported(original)),
            _ => {}
        }
    }
    for pair in &diff.same {
        tokens.extend(merger.tokens_for_same(pair));
    }
    tokens
}

/// A child-level item together with both matched parent entities.
#[derive(Debug)]
pub struct EntityScoped<'a, T> {
    pub original: &'a DbEntity,
    pub imported: &'a DbEntity,
    pub item: &'a T,
}

impl<T> Clone for EntityScoped<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EntityScoped<'_, T> {}

/// Wrap both sides of a per-entity diff with their parent entities.
pub(crate) fn scope<'a, T>(
    diff: DictionaryDiff<&'a T>,
    original: &'a DbEntity,
    imported: &'a DbEntity,
) -> DictionaryDiff<EntityScoped<'a, T>> {
    let wrap = |pair: DiffPair<&'a T>| DiffPair {
        original: pair.original.map(|item| EntityScoped {
            original,
            imported,
            item,
        }),
        imported: pair.imported.map(|item| EntityScoped {
            original,
            imported,
            item,
        }),
    };
    DictionaryDiff {
        same: diff.same.into_iter().map(wrap).collect(),
        missing: diff.missing.into_iter().map(wrap).collect(),
    }
}

/// Runs a child merger once per parent pair matched by an earlier merger.
///
/// Parents that exist on one side only never reach the child merger; their
/// whole-entity tokens already cover them.
pub struct ChainMerger<'a, P: ?Sized, M> {
    merger: M,
    parent_same: Vec<DiffPair<&'a P>>,
}

impl<'a, P: ?Sized + 'a, M: Merger<'a, Parent = P>> ChainMerger<'a, P, M> {
    pub fn new(merger: M, parent_same: Vec<DiffPair<&'a P>>) -> Self {
        Self {
            merger,
            parent_same,
        }
    }

    /// Combined diff of every matched parent pair.
    pub fn create_diff(&self) -> Result<DictionaryDiff<M::Child>> {
        let mut diff = DictionaryDiff::default();
        for pair in &self.parent_same {
            if let (Some(original), Some(imported)) = (pair.original, pair.imported) {
                diff.extend(self.merger.create_diff(original, imported)?);
            }
        }
        Ok(diff)
    }

    pub fn create_merge_tokens(&self) -> Result<Vec<MergerToken>> {
        let diff = self.create_diff()?;
        Ok(merge_diff(&self.merger, &diff))
    }
}

use std::collections::HashSet;

use crate::dictionary::Dictionary;
use crate::error::{MergeError, Result};

/// Two matched or one-sided items from the compared snapshots.
///
/// At least one side is always present. Pairs in [`DictionaryDiff::same`]
/// have both sides, pairs in [`DictionaryDiff::missing`] exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffPair<T> {
    pub original: Option<T>,
    pub imported: Option<T>,
}

impl<T> DiffPair<T> {
    pub fn same(original: T, imported: T) -> Self {
        Self {
            original: Some(original),
            imported: Some(imported),
        }
    }

    pub fn original_only(original: T) -> Self {
        Self {
            original: Some(original),
            imported: None,
        }
    }

    pub fn imported_only(imported: T) -> Self {
        Self {
            original: None,
            imported: Some(imported),
        }
    }

    /// Both sides, when this is a matched pair.
    pub fn both(&self) -> Option<(&T, &T)> {
        match (&self.original, &self.imported) {
            (Some(original), Some(imported)) => Some((original, imported)),
            _ => None,
        }
    }
}

/// Names present on both sides (`same`) and on one side only (`missing`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryDiff<T> {
    pub same: Vec<DiffPair<T>>,
    pub missing: Vec<DiffPair<T>>,
}

impl<T> Default for DictionaryDiff<T> {
    fn default() -> Self {
        Self {
            same: Vec::new(),
            missing: Vec::new(),
        }
    }
}

impl<T> DictionaryDiff<T> {
    pub fn builder<'a>() -> DictionaryDiffBuilder<'a, T> {
        DictionaryDiffBuilder {
            original: None,
            imported: None,
        }
    }

    /// Append another diff, keeping the order of both.
    pub fn extend(&mut self, other: DictionaryDiff<T>) {
        self.same.extend(other.same);
        self.missing.extend(other.missing);
    }

    pub fn is_empty(&self) -> bool {
        self.same.is_empty() && self.missing.is_empty()
    }
}

pub struct DictionaryDiffBuilder<'a, T> {
    original: Option<Dictionary<'a, T>>,
    imported: Option<Dictionary<'a, T>>,
}

impl<'a, T: Copy> DictionaryDiffBuilder<'a, T> {
    pub fn original(mut self, dictionary: Dictionary<'a, T>) -> Self {
        self.original = Some(dictionary);
        self
    }

    pub fn imported(mut self, dictionary: Dictionary<'a, T>) -> Self {
        self.imported = Some(dictionary);
        self
    }

    /// Classify every name of both dictionaries.
    ///
    /// Matched pairs follow the original side's order; one-sided pairs list
    /// original-only names first, then imported-only names.
    pub fn build(self) -> Result<DictionaryDiff<T>> {
        let original = self.original.ok_or_else(|| {
            MergeError::InvalidConfiguration("original dictionary is required".to_string())
        })?;
        let imported = self.imported.ok_or_else(|| {
            MergeError::InvalidConfiguration("imported dictionary is required".to_string())
        })?;
        original.init();
        imported.init();

        let mut diff = DictionaryDiff::default();
        let mut seen = HashSet::with_capacity(original.len());

        for name in original.names() {
            let Some(original_item) = original.by_name(name) else {
                continue;
            };
            match imported.by_name(name) {
                Some(imported_item) => {
                    diff.same.push(DiffPair::same(original_item, imported_item));
                    seen.insert(name.as_str());
                }
                None => diff.missing.push(DiffPair::original_only(original_item)),
            }
        }

        for name in imported.names() {
            if seen.contains(name.as_str()) {
                continue;
            }
            if let Some(imported_item) = imported.by_name(name) {
                diff.missing.push(DiffPair::imported_only(imported_item));
            }
        }

        Ok(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictionarySource;

    struct Names(Vec<&'static str>);

    impl DictionarySource<&'static str> for Names {
        fn all(&self) -> Vec<&'static str> {
            self.0.clone()
        }

        fn name(&self, item: &&'static str) -> String {
            item.to_string()
        }
    }

    fn diff(original: Vec<&'static str>, imported: Vec<&'static str>) -> DictionaryDiff<&'static str> {
        DictionaryDiff::builder()
            .original(Dictionary::new(Names(original)))
            .imported(Dictionary::new(Names(imported)))
            .build()
            .expect("diff")
    }

    #[test]
    fn partitions_every_name_exactly_once() {
        let diff = diff(vec!["PERSON", "ARTIST", "GALLERY"], vec!["person", "painting"]);

        assert_eq!(diff.same, vec![DiffPair::same("PERSON", "person")]);
        assert_eq!(
            diff.missing,
            vec![
                DiffPair::original_only("ARTIST"),
                DiffPair::original_only("GALLERY"),
                DiffPair::imported_only("painting"),
            ]
        );
    }

    #[test]
    fn identical_sides_are_all_same() {
        let diff = diff(vec!["A", "B"], vec!["A", "B"]);
        assert!(diff.missing.is_empty());
        assert!(diff
            .same
            .iter()
            .all(|pair| pair.original == pair.imported));
        assert_eq!(diff.same.len(), 2);
    }

    #[test]
    fn builder_requires_both_dictionaries() {
        let result = DictionaryDiff::<&'static str>::builder()
            .original(Dictionary::new(Names(vec!["A"])))
            .build();
        assert!(matches!(result, Err(MergeError::InvalidConfiguration(_))));
    }
}

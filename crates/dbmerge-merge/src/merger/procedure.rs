use dbmerge_core::{DataMap, Procedure, ProcedureParameter};

use super::Merger;
use crate::diff::{DictionaryDiff, DiffPair};
use crate::dictionary::{Dictionary, ProcedureDictionary};
use crate::error::Result;
use crate::filters::Filters;
use crate::token::{MergerToken, MergerTokenFactory};

/// Stored procedure merger. Procedures cannot be altered in place, so a
/// signature change drops and re-adds them.
pub struct ProcedureMerger<'a> {
    factory: &'a dyn MergerTokenFactory,
    filters: &'a Filters,
}

impl<'a> ProcedureMerger<'a> {
    pub fn new(factory: &'a dyn MergerTokenFactory, filters: &'a Filters) -> Self {
        Self { factory, filters }
    }
}

impl<'a> Merger<'a> for ProcedureMerger<'a> {
    type Parent = DataMap;
    type Child = &'a Procedure;

    /// Both sides go through the procedure filters.
    fn create_diff(&self, original: &'a DataMap, imported: &'a DataMap) -> Result<DictionaryDiff<&'a Procedure>> {
        DictionaryDiff::builder()
            .original(Dictionary::new(ProcedureDictionary::new(original, Some(self.filters))))
            .imported(Dictionary::new(ProcedureDictionary::new(imported, Some(self.filters))))
            .build()
    }

    fn tokens_for_missing_original(&self, imported: &'a Procedure) -> Vec<MergerToken> {
        vec![self.factory.drop_procedure_to_db(imported)]
    }

    fn tokens_for_missing_imported(&self, original: &'a Procedure) -> Vec<MergerToken> {
        vec![self.factory.add_procedure_to_db(original)]
    }

    fn tokens_for_same(&self, pair: &DiffPair<&'a Procedure>) -> Vec<MergerToken> {
        let Some((&original, &imported)) = pair.both() else {
            return Vec::new();
        };
        if same_parameters(&original.parameters, &imported.parameters) {
            return Vec::new();
        }
        vec![
            self.factory.drop_procedure_to_db(imported),
            self.factory.add_procedure_to_db(original),
        ]
    }
}

fn same_parameters(original: &[ProcedureParameter], imported: &[ProcedureParameter]) -> bool {
    original.len() == imported.len()
        && original.iter().zip(imported).all(|(a, b)| {
            a.name.eq_ignore_ascii_case(&b.name)
                && a.sql_type == b.sql_type
                && a.precision == b.precision
                && a.max_length == b.max_length
                && a.direction == b.direction
        })
}

#[cfg(test)]
mod tests {
    use dbmerge_core::{ParameterDirection, SqlType};

    use super::*;
    use crate::filters::{FiltersConfig, PatternFilter, SchemaFilter};
    use crate::merger::create_merge_tokens;
    use crate::token::DefaultTokenFactory;

    fn procedure(name: &str, parameters: Vec<(&str, SqlType)>) -> Procedure {
        Procedure {
            name: name.to_string(),
            catalog: None,
            schema: None,
            returns_value: false,
            parameters: parameters
                .into_iter()
                .map(|(name, sql_type)| ProcedureParameter {
                    name: name.to_string(),
                    sql_type,
                    precision: None,
                    max_length: None,
                    direction: ParameterDirection::In,
                })
                .collect(),
        }
    }

    fn all_procedures() -> Filters {
        FiltersConfig {
            entries: vec![SchemaFilter {
                procedures: PatternFilter::include_all(),
                ..SchemaFilter::default()
            }],
        }
        .compile()
        .expect("compile")
    }

    #[test]
    fn changed_signature_is_replaced() {
        let mut model = DataMap::new("model");
        model.add_procedure(procedure("cleanup", vec![("days", SqlType::Integer)]));
        model.add_procedure(procedure("report", Vec::new()));
        let mut db = DataMap::new("db");
        db.add_procedure(procedure("CLEANUP", vec![("days", SqlType::BigInt)]));
        db.add_procedure(procedure("legacy", Vec::new()));

        let filters = all_procedures();
        let merger = ProcedureMerger::new(&DefaultTokenFactory, &filters);
        let labels: Vec<_> = create_merge_tokens(&merger, &model, &db)
            .expect("tokens")
            .iter()
            .map(MergerToken::label)
            .collect();
        assert_eq!(
            labels,
            [
                "Add Procedure report",
                "Drop Procedure legacy",
                "Drop Procedure CLEANUP",
                "Add Procedure cleanup",
            ]
        );
    }

    #[test]
    fn default_filters_ignore_procedures() {
        let mut model = DataMap::new("model");
        model.add_procedure(procedure("report", Vec::new()));
        let filters = FiltersConfig::default().compile().expect("compile");
        let merger = ProcedureMerger::new(&DefaultTokenFactory, &filters);
        let tokens = create_merge_tokens(&merger, &model, &DataMap::new("db")).expect("tokens");
        assert!(tokens.is_empty());
    }
}

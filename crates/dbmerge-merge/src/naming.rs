//! Names for mapped entities, attributes and relationships.

use dbmerge_core::{DbEntity, DbRelationship};

/// Naming strategy used when the reconciliation pass creates mapped objects.
pub trait ObjectNameGenerator: Send + Sync {
    fn obj_entity_name(&self, entity: &DbEntity) -> String;

    fn obj_attribute_name(&self, column: &str) -> String;

    fn relationship_name(&self, relationship: &DbRelationship) -> String;
}

/// Camel-cases underscore separated database names.
///
/// `ARTIST_INFO` becomes `ArtistInfo`, `FIRST_NAME` becomes `firstName`. A
/// to-one relationship over `ARTIST_ID` is named `artist`; to-many ones use
/// the pluralized target (`paintings`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNameGenerator;

impl ObjectNameGenerator for DefaultNameGenerator {
    fn obj_entity_name(&self, entity: &DbEntity) -> String {
        upper_camel(&entity.name)
    }

    fn obj_attribute_name(&self, column: &str) -> String {
        lower_camel(column)
    }

    fn relationship_name(&self, relationship: &DbRelationship) -> String {
        if relationship.to_many {
            return pluralize(&lower_camel(&relationship.target_entity));
        }
        if let [join] = relationship.joins.as_slice() {
            let lower = join.source.to_lowercase();
            if let Some(stem) = lower.strip_suffix("_id").filter(|stem| !stem.is_empty()) {
                return lower_camel(stem);
            }
        }
        lower_camel(&relationship.target_entity)
    }
}

fn words(name: &str) -> impl Iterator<Item = String> + '_ {
    name.split(|c: char| c == '_' || c == ' ' || c == '-')
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn upper_camel(name: &str) -> String {
    words(name).map(|word| capitalize(&word)).collect()
}

pub(crate) fn lower_camel(name: &str) -> String {
    let mut out = String::new();
    for (idx, word) in words(name).enumerate() {
        if idx == 0 {
            out.push_str(&word);
        } else {
            out.push_str(&capitalize(&word));
        }
    }
    out
}

fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{word}es");
    }
    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(before) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{word}s")
}

/// First of `base`, `base1`, `base2`, ... that `taken` rejects.
pub fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut suffix = 1usize;
    loop {
        let candidate = format!("{base}{suffix}");
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use dbmerge_core::DbJoin;

    use super::*;

    fn relationship(target: &str, source_column: &str, to_many: bool) -> DbRelationship {
        DbRelationship {
            name: "rel".to_string(),
            target_entity: target.to_string(),
            to_many,
            to_dependent_pk: false,
            fk_name: None,
            joins: vec![DbJoin::new(source_column, "ID")],
        }
    }

    #[test]
    fn camel_cases_names() {
        let naming = DefaultNameGenerator;
        assert_eq!(naming.obj_entity_name(&DbEntity::new("ARTIST_INFO")), "ArtistInfo");
        assert_eq!(naming.obj_attribute_name("FIRST_NAME"), "firstName");
        assert_eq!(naming.obj_attribute_name("id"), "id");
    }

    #[test]
    fn relationship_names() {
        let naming = DefaultNameGenerator;
        assert_eq!(
            naming.relationship_name(&relationship("ARTIST", "ARTIST_ID", false)),
            "artist"
        );
        assert_eq!(
            naming.relationship_name(&relationship("ARTIST", "OWNER", false)),
            "artist"
        );
        assert_eq!(
            naming.relationship_name(&relationship("PAINTING", "ID", true)),
            "paintings"
        );
        assert_eq!(
            naming.relationship_name(&relationship("GALLERY", "ID", true)),
            "galleries"
        );
        assert_eq!(naming.relationship_name(&relationship("BOX", "ID", true)), "boxes");
    }

    #[test]
    fn unique_name_appends_counter() {
        let taken = ["name", "name1"];
        assert_eq!(unique_name("name", |candidate| taken.contains(&candidate)), "name2");
        assert_eq!(unique_name("email", |candidate| taken.contains(&candidate)), "email");
    }
}

use std::fs;
use std::path::Path;

use dbmerge_core::{DataMap, DbAttribute, DbEntity, DbJoin, DbRelationship, SqlType};
use dbmerge_merge::{
    Change, DataMapMerger, DefaultTokenFactory, FiltersConfig, GenericAdapter, MergeDirection,
    MergerToken, PatternFilter, SchemaFilter, StaticValueForNullProvider,
};

fn load_snapshot(name: &str) -> DataMap {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures/snapshots")
        .join(name);
    let contents =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing json at {}", path.display()));
    serde_json::from_str(&contents).expect("parse snapshot")
}

fn merger() -> DataMapMerger {
    DataMapMerger::builder()
        .token_factory(DefaultTokenFactory)
        .build()
        .expect("build merger")
}

fn column(name: &str, sql_type: SqlType) -> DbAttribute {
    DbAttribute::new(name, sql_type)
}

fn pk(name: &str) -> DbAttribute {
    let mut column = column(name, SqlType::Integer);
    column.primary_key = true;
    column.mandatory = true;
    column
}

fn person(extra: &[DbAttribute]) -> DbEntity {
    let mut entity = DbEntity::new("PERSON");
    entity.add_attribute(pk("ID"));
    entity.add_attribute(column("NAME", SqlType::Varchar));
    for attribute in extra {
        entity.add_attribute(attribute.clone());
    }
    entity
}

fn map_with(name: &str, entities: Vec<DbEntity>) -> DataMap {
    let mut map = DataMap::new(name);
    for entity in entities {
        map.add_db_entity(entity);
    }
    map
}

fn labels(tokens: &[MergerToken]) -> Vec<String> {
    tokens.iter().map(MergerToken::label).collect()
}

fn to_db(tokens: &[MergerToken]) -> Vec<&MergerToken> {
    tokens
        .iter()
        .filter(|token| token.direction() == MergeDirection::ToDb)
        .collect()
}

#[test]
fn identical_snapshots_produce_no_db_tokens() {
    let model = load_snapshot("gallery.model.json");
    let tokens = merger()
        .create_merge_tokens(&model, &model.clone())
        .expect("merge");
    assert!(to_db(&tokens).is_empty(), "unexpected tokens: {:?}", labels(&tokens));
}

#[test]
fn missing_table_is_created_without_relationship_tokens() {
    let model = map_with("model", vec![person(&[])]);
    let db = DataMap::new("db");
    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");

    assert_eq!(labels(&tokens), ["Create Table PERSON"]);
    assert_eq!(tokens[0].direction(), MergeDirection::ToDb);
}

#[test]
fn database_only_column_is_dropped() {
    let model = map_with("model", vec![person(&[])]);
    let db = map_with(
        "db",
        vec![person(&[column("EMAIL", SqlType::Varchar)])],
    );
    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");

    assert_eq!(labels(&tokens), ["Drop Column PERSON.EMAIL"]);
    assert_eq!(
        tokens[0].create_sql(&GenericAdapter::default()),
        ["ALTER TABLE PERSON DROP COLUMN EMAIL"]
    );
}

#[test]
fn not_null_without_backfill_value() {
    let mut model_entity = person(&[]);
    if let Some(name) = model_entity.attribute_mut("NAME") {
        name.mandatory = true;
    }
    let model = map_with("model", vec![model_entity]);
    let db = map_with("db", vec![person(&[])]);
    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");

    assert_eq!(labels(&tokens), ["Set Not Null PERSON.NAME"]);
}

#[test]
fn not_null_is_preceded_by_backfill_when_configured() {
    let mut model_entity = person(&[]);
    if let Some(name) = model_entity.attribute_mut("NAME") {
        name.mandatory = true;
    }
    let model = map_with("model", vec![model_entity]);
    let db = map_with("db", vec![person(&[])]);
    let merger = DataMapMerger::builder()
        .token_factory(DefaultTokenFactory)
        .value_for_null(StaticValueForNullProvider::new().with_value("PERSON.NAME", "'n/a'"))
        .build()
        .expect("build merger");
    let tokens = merger.create_merge_tokens(&model, &db).expect("merge");

    assert_eq!(
        labels(&tokens),
        ["Set Value For Null PERSON.NAME", "Set Not Null PERSON.NAME"]
    );
    assert_eq!(
        tokens[0].create_sql(&GenericAdapter::default()),
        ["UPDATE PERSON SET NAME = 'n/a' WHERE NAME IS NULL"]
    );
}

#[test]
fn new_mandatory_column_is_added_backfilled_then_constrained() {
    let mut email = column("EMAIL", SqlType::Varchar);
    email.mandatory = true;
    let model = map_with("model", vec![person(&[email])]);
    let db = map_with("db", vec![person(&[])]);
    let merger = DataMapMerger::builder()
        .token_factory(DefaultTokenFactory)
        .value_for_null(StaticValueForNullProvider::new().with_value("PERSON.EMAIL", "''"))
        .build()
        .expect("build merger");
    let tokens = merger.create_merge_tokens(&model, &db).expect("merge");

    assert_eq!(
        labels(&tokens),
        [
            "Add Column PERSON.EMAIL",
            "Set Value For Null PERSON.EMAIL",
            "Set Not Null PERSON.EMAIL",
        ]
    );
}

#[test]
fn primary_key_column_on_view_is_ignored() {
    let model = map_with("model", vec![person(&[pk("CODE")])]);
    let mut view = person(&[]);
    view.kind = dbmerge_core::EntityKind::View;
    let db = map_with("db", vec![view]);

    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");
    assert!(tokens.is_empty(), "unexpected tokens: {:?}", labels(&tokens));
}

#[test]
fn generated_flag_drift_is_reported() {
    let mut seq = column("SEQ", SqlType::Integer);
    seq.generated = true;
    let model = map_with("model", vec![person(&[seq.clone()])]);
    seq.generated = false;
    let db = map_with("db", vec![person(&[seq])]);

    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");
    assert_eq!(labels(&tokens), ["Set Generated Flag PERSON.SEQ"]);
}

#[test]
fn decimal_and_numeric_columns_are_equal() {
    let mut price = column("PRICE", SqlType::Decimal);
    price.precision = Some(10);
    price.scale = Some(2);
    let model = map_with("model", vec![person(&[price.clone()])]);
    price.sql_type = SqlType::Numeric;
    let db = map_with("db", vec![person(&[price])]);

    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");
    assert!(tokens.is_empty(), "unexpected tokens: {:?}", labels(&tokens));
}

fn painting_with(relationship_name: &str) -> DbEntity {
    let mut painting = DbEntity::new("PAINTING");
    painting.add_attribute(pk("ID"));
    painting.add_attribute(column("ARTIST_ID", SqlType::Integer));
    painting.add_relationship(DbRelationship {
        name: relationship_name.to_string(),
        target_entity: "ARTIST".to_string(),
        to_many: false,
        to_dependent_pk: false,
        fk_name: Some("fk_painting_artist".to_string()),
        joins: vec![DbJoin::new("ARTIST_ID", "ID")],
    });
    painting
}

fn artist() -> DbEntity {
    let mut artist = DbEntity::new("ARTIST");
    artist.add_attribute(pk("ID"));
    artist
}

#[test]
fn relationships_match_on_joins_not_names() {
    let model = map_with("model", vec![artist(), painting_with("toArtist")]);
    let db = map_with("db", vec![artist(), painting_with("fk_painting_artist")]);
    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");
    assert!(tokens.is_empty(), "unexpected tokens: {:?}", labels(&tokens));
}

#[test]
fn relationship_tokens_run_last_and_can_be_skipped() {
    let mut painting = painting_with("toArtist");
    painting.add_attribute(column("TITLE", SqlType::Varchar));
    let model = map_with("model", vec![artist(), painting]);
    let mut db_painting = DbEntity::new("PAINTING");
    db_painting.add_attribute(pk("ID"));
    db_painting.add_attribute(column("ARTIST_ID", SqlType::Integer));
    let db = map_with("db", vec![artist(), db_painting]);

    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");
    assert_eq!(
        labels(&tokens),
        ["Add Column PAINTING.TITLE", "Add Relationship PAINTING->ARTIST"]
    );

    let skipping = DataMapMerger::builder()
        .token_factory(DefaultTokenFactory)
        .skip_relationships_tokens(true)
        .build()
        .expect("build merger");
    let tokens = skipping.create_merge_tokens(&model, &db).expect("merge");
    assert_eq!(labels(&tokens), ["Add Column PAINTING.TITLE"]);
}

#[test]
fn database_only_foreign_key_is_dropped_first() {
    let model = map_with("model", vec![artist(), {
        let mut painting = DbEntity::new("PAINTING");
        painting.add_attribute(pk("ID"));
        painting
    }]);
    let db = map_with("db", vec![artist(), painting_with("fk_painting_artist")]);

    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");
    assert_eq!(
        labels(&tokens),
        ["Drop Relationship PAINTING->ARTIST", "Drop Column PAINTING.ARTIST_ID"]
    );
    assert_eq!(
        tokens[0].create_sql(&GenericAdapter::default()),
        ["ALTER TABLE PAINTING DROP CONSTRAINT fk_painting_artist"]
    );
}

#[test]
fn skipped_relationships_still_drop_foreign_keys_before_columns() {
    let mut model_painting = DbEntity::new("PAINTING");
    model_painting.add_attribute(pk("ID"));
    let model = map_with("model", vec![artist(), model_painting]);
    let db = map_with("db", vec![artist(), painting_with("fk_p_a")]);

    let skipping = DataMapMerger::builder()
        .token_factory(DefaultTokenFactory)
        .skip_relationships_tokens(true)
        .build()
        .expect("build merger");
    let tokens = skipping.create_merge_tokens(&model, &db).expect("merge");
    assert_eq!(
        labels(&tokens),
        ["Drop Relationship PAINTING->ARTIST", "Drop Column PAINTING.ARTIST_ID"]
    );
}

#[test]
fn new_table_gets_its_foreign_keys_last() {
    let model = map_with("model", vec![artist(), painting_with("toArtist")]);
    let db = map_with("db", vec![artist()]);

    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");
    assert_eq!(
        labels(&tokens),
        ["Create Table PAINTING", "Add Relationship PAINTING->ARTIST"]
    );
    assert!(tokens
        .iter()
        .all(|token| token.direction() == MergeDirection::ToDb));
}

#[test]
fn dropped_relationship_uses_model_spelling() {
    let mut model_artist = DbEntity::new("Artist");
    model_artist.add_attribute(pk("id"));
    let mut model_painting = DbEntity::new("Painting");
    model_painting.add_attribute(pk("id"));
    model_painting.add_attribute(column("artist_id", SqlType::Integer));
    let model = map_with("model", vec![model_artist, model_painting]);
    let db = map_with("db", vec![artist(), painting_with("fk_painting_artist")]);

    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");
    assert_eq!(labels(&tokens), ["Drop Relationship Painting->Artist"]);
    let Change::DropRelationship { relationship, .. } = tokens[0].change() else {
        panic!("unexpected change: {:?}", tokens[0].change());
    };
    assert_eq!(relationship.target_entity, "Artist");
    assert_eq!(relationship.joins, [DbJoin::new("artist_id", "id")]);
    assert_eq!(relationship.fk_name.as_deref(), Some("fk_painting_artist"));
}

#[test]
fn database_only_to_many_relationship_is_added_to_model() {
    let model = map_with("model", vec![artist(), painting_with("toArtist")]);
    let mut db_artist = artist();
    db_artist.add_relationship(DbRelationship {
        name: "paintings".to_string(),
        target_entity: "PAINTING".to_string(),
        to_many: true,
        to_dependent_pk: false,
        fk_name: None,
        joins: vec![DbJoin::new("ID", "ARTIST_ID")],
    });
    let db = map_with("db", vec![db_artist, painting_with("toArtist")]);

    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");
    assert_eq!(labels(&tokens), ["Add Relationship ARTIST->PAINTING"]);
    assert_eq!(tokens[0].direction(), MergeDirection::ToModel);
}

#[test]
fn primary_key_drift_is_reported_except_for_views() {
    let mut model_entity = person(&[]);
    if let Some(name) = model_entity.attribute_mut("NAME") {
        name.primary_key = true;
    }
    let mut db_entity = person(&[]);
    db_entity.primary_key_name = Some("person_pk".to_string());
    let model = map_with("model", vec![model_entity.clone()]);
    let db = map_with("db", vec![db_entity.clone()]);

    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");
    assert_eq!(labels(&tokens), ["Set Primary Key PERSON"]);
    assert_eq!(
        tokens[0].create_sql(&GenericAdapter::default()),
        [
            "ALTER TABLE PERSON DROP CONSTRAINT person_pk",
            "ALTER TABLE PERSON ADD PRIMARY KEY (ID, NAME)",
        ]
    );

    let skipping = DataMapMerger::builder()
        .token_factory(DefaultTokenFactory)
        .skip_pk_tokens(true)
        .build()
        .expect("build merger");
    assert!(skipping.create_merge_tokens(&model, &db).expect("merge").is_empty());

    db_entity.kind = dbmerge_core::EntityKind::View;
    let db = map_with("db", vec![db_entity]);
    assert!(merger().create_merge_tokens(&model, &db).expect("merge").is_empty());
}

#[test]
fn filters_hide_database_tables() {
    let model = DataMap::new("model");
    let mut tmp = DbEntity::new("PERSON_TMP");
    tmp.add_attribute(pk("ID"));
    let db = map_with("db", vec![person(&[]), tmp]);

    let merger = DataMapMerger::builder()
        .token_factory(DefaultTokenFactory)
        .filters(FiltersConfig {
            entries: vec![SchemaFilter {
                tables: PatternFilter {
                    include: Vec::new(),
                    exclude: vec![".*_tmp".to_string()],
                },
                ..SchemaFilter::default()
            }],
        })
        .build()
        .expect("build merger");
    let tokens = merger.create_merge_tokens(&model, &db).expect("merge");
    assert_eq!(labels(&tokens), ["Drop Table PERSON"]);
}

#[test]
fn gallery_fixture_tokens_are_ordered() {
    let model = load_snapshot("gallery.model.json");
    let db = load_snapshot("gallery.db.json");
    let tokens = merger().create_merge_tokens(&model, &db).expect("merge");

    assert_eq!(
        labels(&tokens),
        [
            "Drop Column artist.email",
            "Drop Table legacy_log",
            "Create Table GALLERY",
            "Set Column Type painting.title",
            "Set Not Null artist.name",
        ]
    );
    assert!(tokens
        .iter()
        .all(|token| token.direction() == MergeDirection::ToDb));
}

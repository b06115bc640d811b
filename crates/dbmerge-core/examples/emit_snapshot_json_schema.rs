use dbmerge_core::DataMap;
use schemars::schema_for;

fn main() {
    let schema = schema_for!(DataMap);
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}

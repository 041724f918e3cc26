use clap::Parser;
use openapi_declare::cli::{run, CliArgs};
use openapi_declare::type_resolver::{ParsedFile, TypeResolver};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PET_MODELS: &str = include_str!("fixtures/pet_models.rs");

/// Helper function to create a temporary source tree
fn create_models_dir() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let models = temp_dir.path().join("src/models");
    fs::create_dir_all(&models).expect("Failed to create models directory");
    fs::write(models.join("pet.rs"), PET_MODELS).expect("Failed to write models");
    temp_dir
}

fn run_cli(root: &Path, extra: &[&str], output: &Path) {
    let mut argv = vec![
        "openapi-declare".to_string(),
        root.display().to_string(),
        "-o".to_string(),
        output.display().to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    run(CliArgs::parse_from(argv)).expect("Generation failed");
}

#[test]
fn test_yaml_document_from_sources() {
    let temp_dir = create_models_dir();
    let output = temp_dir.path().join("openapi.yaml");
    run_cli(temp_dir.path(), &["--title", "Pet Store", "--validate"], &output);

    let doc: Value = serde_yaml::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(doc["info"]["title"], "Pet Store");
    assert_eq!(doc["info"]["version"], "1.0.0");

    let schemas = doc["components"]["schemas"].as_object().unwrap();
    let names: Vec<&str> = schemas.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Category", "Pet"]);

    let pet = &schemas["Pet"];
    assert_eq!(
        pet["required"],
        json!(["id", "name", "photoUrls", "status", "createdAt", "labels"])
    );
    let properties = &pet["properties"];
    assert_eq!(properties["id"]["type"], "integer");
    assert_eq!(properties["id"]["format"], "int64");
    assert_eq!(properties["name"]["description"], "The pet's name");
    assert_eq!(properties["category"]["$ref"], "#/components/schemas/Category");
    assert_eq!(properties["photoUrls"]["items"]["type"], "string");
    assert_eq!(properties["status"]["type"], "string");
    assert_eq!(properties["status"]["enum"], json!(["available", "pending", "sold"]));
    assert_eq!(properties["createdAt"]["format"], "date-time");
    assert_eq!(properties["labels"]["x-internal"], true);
    assert!(properties.get("ownerToken").is_none());

    let category = &schemas["Category"];
    assert_eq!(category["properties"]["id"]["minimum"], json!(1));
    assert_eq!(category["properties"]["name"]["maxLength"], json!(64));
}

#[test]
fn test_json_document_for_selected_type() {
    let temp_dir = create_models_dir();
    let output = temp_dir.path().join("out/openapi.json");
    run_cli(temp_dir.path(), &["-t", "Category", "-f", "json"], &output);

    let doc: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(doc["openapi"], "3.0.3");
    let schemas = doc["components"]["schemas"].as_object().unwrap();
    assert_eq!(schemas.len(), 1);
    assert!(schemas.contains_key("Category"));
}

#[test]
fn test_selected_type_with_missing_reference_fails_validation() {
    let temp_dir = create_models_dir();
    let output = temp_dir.path().join("openapi.yaml");
    let argv = [
        "openapi-declare".to_string(),
        temp_dir.path().display().to_string(),
        "-t".to_string(),
        "Pet".to_string(),
        "--validate".to_string(),
        "-o".to_string(),
        output.display().to_string(),
    ];
    assert!(run(CliArgs::parse_from(argv)).is_err());
    assert!(!output.exists());
}

#[test]
fn test_recursive_type_requires_ref() {
    let parsed = ParsedFile::parse_source("pet.rs", PET_MODELS).unwrap();
    let mut resolver = TypeResolver::new(vec![parsed]);
    assert_eq!(resolver.struct_names(), vec!["Category", "Pet", "Node"]);

    let node = resolver.resolve_type("Node").unwrap();
    assert!(openapi_declare::schema_generator::synthesize_shape(&node, None).is_err());
}

//! Serialization of a [`Definition`] into an OpenAPI document.
//!
//! The YAML text is produced directly by [`YamlWriter`], walking every hash-map backed
//! collection in an explicit order so that the same definition always yields the same
//! bytes. JSON output is the YAML document re-read through `serde_yaml`.

use crate::error::{Error, Location, RefError, RefErrorKind, Result};
use crate::model::{
    Area, Components, DataType, Definition, FlatPath, Method, ParamLocation, Parameter,
    PathParam, Property, Request, Response, Schema, SchemaOrRef,
};
use crate::path_template;
use crate::resolver::{parse_reference, qualify, Resolver};
use crate::writer::{format_float, key, sorted_by_name, sorted_codes, sorted_verbs, YamlWriter};
use anyhow::Context;
use clap::ValueEnum;
use log::debug;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Version written to the `openapi` field.
pub const OPENAPI_VERSION: &str = "3.0.3";

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Content type a documentation viewer should serve the document with.
pub fn content_type(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Yaml => "application/yaml",
        OutputFormat::Json => "application/json",
    }
}

/// Emits the definition as YAML.
///
/// References are resolved while they are written; the first broken one (or the first
/// structural problem) is returned as the error even though the text stays well formed
/// up to that point.
pub fn emit(def: &Definition) -> Result<String> {
    debug!("Emitting document: {} {}", def.info.title, def.info.version);
    let mut emitter = Emitter {
        w: YamlWriter::new(),
        resolver: Resolver::new(def),
    };
    emitter.document(def);
    emitter.w.finish()
}

/// Serializes a definition to YAML format.
pub fn serialize_yaml(def: &Definition) -> Result<String> {
    emit(def)
}

/// Serializes a definition to JSON format with pretty printing.
pub fn serialize_json(def: &Definition) -> Result<String> {
    let yaml = emit(def)?;
    let value: Value = serde_yaml::from_str(&yaml)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn serialize(def: &Definition, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serialize_yaml(def),
        OutputFormat::Json => serialize_json(def),
    }
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does. Parent
/// directories are created as needed.
pub fn write_to_file(content: &str, path: &Path) -> anyhow::Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Checks that every component has a name and that names are unique per collection.
pub fn check_structure(components: &Components) -> Result<()> {
    for area in Area::ALL {
        let names = components.names(area);
        if names.iter().any(|n| n.is_empty()) {
            return Err(Error::MissingName {
                area,
                location: format!("components.{}", area),
            });
        }
        for (idx, name) in names.iter().enumerate() {
            if names[..idx].contains(name) {
                return Err(Error::DuplicateName {
                    area,
                    name: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Document key and parameter names of a template.
fn path_keys(template: &str) -> Result<(String, Vec<String>)> {
    Ok((
        path_template::document_path(template)?,
        path_template::extract(template)?,
    ))
}

struct Emitter<'a> {
    w: YamlWriter,
    resolver: Resolver<'a>,
}

impl<'a> Emitter<'a> {
    fn document(&mut self, def: &'a Definition) {
        self.w.keyword("openapi", OPENAPI_VERSION);
        self.w
            .block("info")
            .field("title", &def.info.title)
            .field("description", &def.info.description)
            .field("version", &def.info.version)
            .end();

        if !def.servers.is_empty() {
            self.w.block("servers");
            for server in &def.servers {
                self.w
                    .item_block("url", &server.url)
                    .field("description", &server.description)
                    .end();
            }
            self.w.end();
        }

        if !def.tags.is_empty() {
            self.w.block("tags");
            for tag in &def.tags {
                self.w
                    .item_block("name", &tag.name)
                    .field("description", &tag.description)
                    .end();
            }
            self.w.end();
        }

        self.paths(def);

        if let Some(components) = def.components.as_ref().filter(|c| !c.is_empty()) {
            self.components(components);
        }
    }

    /// Writes `reference` in its qualified form, latching any resolution error.
    fn reference(&mut self, area: Area, reference: &str, location: &Location) -> String {
        if let Err(error) = self.resolver.resolve(area, reference, location) {
            self.w.fail(error.into());
        }
        qualify(area, reference)
    }

    fn write_ref(&mut self, area: Area, reference: &str, location: &Location) {
        let text = self.reference(area, reference, location);
        self.w.field("$ref", &text);
    }

    fn ambiguous(&mut self, reference: &str, location: &Location) {
        self.w.fail(Error::Reference(RefError {
            reference: qualify(Area::Schemas, reference),
            location: location.clone(),
            kind: RefErrorKind::Ambiguous,
        }));
    }

    fn paths(&mut self, def: &'a Definition) {
        let flat = def.flatten();
        if flat.is_empty() {
            self.w.keyword("paths", "{}");
            return;
        }

        let mut keyed = Vec::with_capacity(flat.len());
        for path in &flat {
            match path_keys(&path.template) {
                Ok((doc_path, names)) => keyed.push((doc_path, names, path)),
                Err(error) => {
                    self.w.fail(error);
                    return;
                }
            }
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.2.template.cmp(&b.2.template)));
        if let Some(pair) = keyed.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            self.w.fail(Error::PathTemplate {
                template: pair[1].2.template.clone(),
                reason: format!("document path {} is declared twice", pair[1].0),
            });
            return;
        }

        self.w.block("paths");
        for (doc_path, names, path) in &keyed {
            self.w.block(doc_path);
            for (verb, method) in sorted_verbs(path.methods) {
                self.operation(doc_path, verb, method, path, names);
            }
            self.w.end();
        }
        self.w.end();
    }

    fn operation(
        &mut self,
        doc_path: &str,
        verb: &str,
        method: &'a Method,
        path: &FlatPath<'a>,
        names: &[String],
    ) {
        let at = |item: &str| Location::operation(doc_path, verb, item);
        let tags: Vec<&str> = if method.tags.is_empty() {
            path.tag.into_iter().collect()
        } else {
            method.tags.iter().map(String::as_str).collect()
        };

        self.w
            .block(&verb.to_ascii_lowercase())
            .list("tags", &tags)
            .field("summary", &method.summary)
            .field("description", &method.description)
            .field("operationId", &method.operation_id)
            .field("deprecated", &method.deprecated);

        self.parameters(method, path, names, &at);

        if let Some(request) = &method.request {
            self.w.block("requestBody");
            self.request(request, &at("requestBody"));
            self.w.end();
        }

        if method.responses.is_empty() {
            self.w.keyword("responses", "{}");
        } else {
            self.w.block("responses");
            for (code, response) in sorted_codes(&method.responses) {
                self.w.block(&code.to_string());
                self.response(response, &at(&format!("responses.{}", code)));
                self.w.end();
            }
            self.w.end();
        }

        if !method.security.is_empty() {
            self.w.block("security");
            for scheme in &method.security {
                self.w.raw(&[format!("- {}: []", key(scheme))]);
            }
            self.w.end();
        }
        self.w.end();
    }

    /// Template parameters in declaration order, then the operation's own parameters.
    fn parameters(
        &mut self,
        method: &'a Method,
        path: &FlatPath<'a>,
        names: &[String],
        at: &dyn Fn(&str) -> Location,
    ) {
        let is_template_param = |p: &Parameter| {
            p.reference.is_none() && p.location == ParamLocation::Path && names.contains(&p.name)
        };
        if names.is_empty() && method.parameters.is_empty() {
            return;
        }

        self.w.block("parameters");
        for name in names {
            let location = at(&format!("parameters.{}", name));
            let explicit = method
                .parameters
                .iter()
                .find(|p| is_template_param(*p) && p.name == *name);
            match explicit {
                Some(parameter) => self.parameter_item(parameter, &location),
                None => {
                    let detail = path.path_params.get(name.as_str()).copied();
                    self.path_param_item(name, detail, &location);
                }
            }
        }
        for (idx, parameter) in method.parameters.iter().enumerate() {
            if !is_template_param(parameter) {
                self.parameter_item(parameter, &at(&format!("parameters.{}", idx)));
            }
        }
        self.w.end();
    }

    fn path_param_item(&mut self, name: &str, detail: Option<&PathParam>, location: &Location) {
        self.w.item_block("name", name).keyword("in", "path");
        let detail = detail.cloned().unwrap_or_default();
        self.w
            .field("description", &detail.description)
            .keyword("required", "true")
            .block("schema");
        match &detail.schema_ref {
            Some(reference) => self.write_ref(Area::Schemas, reference, &location.child("schema")),
            None => {
                let data_type = detail.data_type.unwrap_or(DataType::String);
                self.w
                    .keyword("type", data_type.as_str())
                    .field("format", &detail.format);
            }
        }
        self.w.end();
        if let Some(example) = &detail.example {
            self.w.value("example", example);
        }
        self.w.end();
    }

    fn parameter_item(&mut self, parameter: &'a Parameter, location: &Location) {
        if let Some(reference) = &parameter.reference {
            let text = self.reference(Area::Parameters, reference, location);
            self.w.item_block("$ref", &text).end();
            return;
        }
        self.w.item_block("name", &parameter.name);
        self.parameter_body(parameter, location);
        self.w.end();
    }

    fn parameter_body(&mut self, parameter: &'a Parameter, location: &Location) {
        self.w
            .keyword("in", parameter.location.as_str())
            .field("description", &parameter.description)
            .field("required", &parameter.required)
            .field("deprecated", &parameter.deprecated)
            .block("schema");
        let at = location.child("schema");
        match (&parameter.schema_ref, parameter.data_type) {
            (Some(reference), data_type) => {
                if data_type.is_some() {
                    self.ambiguous(reference, &at);
                }
                self.write_ref(Area::Schemas, reference, &at);
            }
            (None, data_type) => {
                self.w
                    .keyword("type", data_type.unwrap_or(DataType::String).as_str())
                    .field("format", &parameter.format);
            }
        }
        self.w.end();
        if let Some(example) = &parameter.example {
            self.w.value("example", example);
        }
    }

    fn request(&mut self, request: &'a Request, location: &Location) {
        if let Some(reference) = &request.reference {
            self.write_ref(Area::RequestBodies, reference, location);
            return;
        }
        self.w
            .field("description", &request.description)
            .field("required", &request.required);
        self.content(
            &request.content_type,
            request.schema.as_ref(),
            request.schema_ref.as_deref(),
            request.example.as_ref(),
            None,
            location,
        );
    }

    fn response(&mut self, response: &'a Response, location: &Location) {
        if let Some(reference) = &response.reference {
            self.write_ref(Area::Responses, reference, location);
            return;
        }
        if response.description.is_empty() {
            self.w.keyword("description", "\"\"");
        } else {
            self.w.field("description", &response.description);
        }
        self.content(
            &response.content_type,
            response.schema.as_ref(),
            response.schema_ref.as_deref(),
            response.example.as_ref(),
            response.example_ref.as_deref(),
            location,
        );
    }

    fn content(
        &mut self,
        content_type: &str,
        schema: Option<&'a Schema>,
        schema_ref: Option<&str>,
        example: Option<&Value>,
        example_ref: Option<&str>,
        location: &Location,
    ) {
        if schema.is_none() && schema_ref.is_none() && example.is_none() && example_ref.is_none()
        {
            return;
        }

        self.w.block("content").block(content_type);
        let at = location.child("schema");
        match (schema, schema_ref) {
            (Some(_), Some(reference)) => {
                self.ambiguous(reference, &at);
                self.w.block("schema");
                self.write_ref(Area::Schemas, reference, &at);
                self.w.end();
            }
            (Some(schema), None) => {
                self.w.block("schema");
                self.schema_body(schema, &at);
                self.w.end();
            }
            (None, Some(reference)) => {
                self.w.block("schema");
                self.write_ref(Area::Schemas, reference, &at);
                self.w.end();
            }
            (None, None) => {}
        }
        if let Some(example) = example {
            self.w.value("example", example);
        }
        if let Some(reference) = example_ref {
            let text = self.reference(Area::Examples, reference, &location.child("example"));
            let name = parse_reference(reference)
                .map(|(_, name)| name)
                .unwrap_or(reference);
            self.w
                .block("examples")
                .block(name)
                .field("$ref", &text)
                .end()
                .end();
        }
        self.w.end().end();
    }

    fn schema_body(&mut self, schema: &'a Schema, location: &Location) {
        if let Some(data_type) = schema.data_type {
            self.w.keyword("type", data_type.as_str());
        }
        self.w
            .field("format", &schema.format)
            .field("description", &schema.description)
            .field("nullable", &schema.nullable)
            .field("deprecated", &schema.deprecated);
        if !schema.enum_values.is_empty() {
            self.w.value("enum", &Value::Array(schema.enum_values.clone()));
        }
        self.w.list("required", &schema.required_names());

        if let Some(items) = &schema.items {
            self.w.block("items");
            self.property_body(items, &location.child("items"));
            self.w.end();
        }
        self.properties(&schema.properties, location);

        if let Some(composition) = &schema.composition {
            let kind = composition.kind.as_str();
            self.w.block(kind);
            for (idx, member) in composition.members.iter().enumerate() {
                let at = location.child(&format!("{}.{}", kind, idx));
                match member {
                    SchemaOrRef::Ref(reference) => {
                        let text = self.reference(Area::Schemas, reference, &at);
                        self.w.item_block("$ref", &text).end();
                    }
                    SchemaOrRef::Inline(inline) => {
                        self.w.item_open();
                        self.schema_body(inline, &at);
                        self.w.end();
                    }
                }
            }
            self.w.end();
        }

        if let Some(discriminator) = &schema.discriminator {
            self.w
                .block("discriminator")
                .field("propertyName", &discriminator.property_name);
            if !discriminator.mapping.is_empty() {
                self.w.block("mapping");
                for (value, reference) in &discriminator.mapping {
                    let at = location.child(&format!("discriminator.mapping.{}", value));
                    let text = self.reference(Area::Schemas, reference, &at);
                    self.w.field(value, &text);
                }
                self.w.end();
            }
            self.w.end();
        }

        if let Some(example) = &schema.example {
            self.w.value("example", example);
        }
        for (name, value) in &schema.extensions {
            self.w.value(name, value);
        }
    }

    fn properties(&mut self, properties: &'a [Property], location: &Location) {
        if properties.is_empty() {
            return;
        }
        self.w.block("properties");
        for property in properties {
            let at = location.child(&format!("properties.{}", property.name));
            self.w.block(&property.name);
            self.property_body(property, &at);
            self.w.end();
        }
        self.w.end();
    }

    fn property_body(&mut self, property: &'a Property, location: &Location) {
        if let Some(reference) = &property.schema_ref {
            if !property.properties.is_empty() || property.items.is_some() {
                self.ambiguous(reference, location);
            }
            self.write_ref(Area::Schemas, reference, location);
            return;
        }

        if let Some(data_type) = property.data_type {
            self.w.keyword("type", data_type.as_str());
        }
        self.w
            .field("format", &property.format)
            .field("description", &property.description);
        if !property.enum_values.is_empty() {
            self.w
                .value("enum", &Value::Array(property.enum_values.clone()));
        }
        if let Some(default) = &property.default {
            self.w.value("default", default);
        }
        if let Some(example) = &property.example {
            self.w.value("example", example);
        }

        self.w.field("pattern", &property.pattern);
        let numbers = [
            ("minimum", property.minimum),
            ("maximum", property.maximum),
            ("multipleOf", property.multiple_of),
        ];
        for (name, value) in numbers {
            if let Some(value) = value {
                self.w.keyword(name, &format_float(value));
            }
        }
        self.w
            .field("exclusiveMinimum", &property.exclusive_minimum)
            .field("exclusiveMaximum", &property.exclusive_maximum);
        let counts = [
            ("minLength", property.min_length),
            ("maxLength", property.max_length),
            ("minItems", property.min_items),
            ("maxItems", property.max_items),
            ("minProperties", property.min_properties),
            ("maxProperties", property.max_properties),
        ];
        for (name, value) in counts {
            if let Some(value) = value {
                self.w.keyword(name, &value.to_string());
            }
        }
        self.w
            .field("uniqueItems", &property.unique_items)
            .field("nullable", &property.nullable)
            .field("deprecated", &property.deprecated)
            .field("readOnly", &property.read_only)
            .field("writeOnly", &property.write_only)
            .list("required", &property.required_names());

        if let Some(items) = &property.items {
            self.w.block("items");
            self.property_body(items, &location.child("items"));
            self.w.end();
        }
        self.properties(&property.properties, location);

        for (name, value) in &property.extensions {
            self.w.value(name, value);
        }
    }

    /// Latches the first cycle reachable from a component root.
    fn check_cycles(&mut self, area: Area, name: &str, location: &Location) {
        let cycles = self.resolver.check_cycles(area, name, location);
        if let Some(cycle) = cycles.into_iter().next() {
            self.w.fail(cycle.into());
        }
    }

    fn components(&mut self, components: &'a Components) {
        if let Err(error) = check_structure(components) {
            self.w.fail(error);
            return;
        }
        self.w.block("components");

        if !components.schemas.is_empty() {
            self.w.block("schemas");
            for schema in sorted_by_name(&components.schemas, |s| s.name.as_str()) {
                let location = Location::item(format!("components.schemas.{}", schema.name));
                self.check_cycles(Area::Schemas, &schema.name, &location);
                self.w.block(&schema.name);
                self.schema_body(schema, &location);
                self.w.end();
            }
            self.w.end();
        }

        if !components.requests.is_empty() {
            self.w.block("requestBodies");
            for request in sorted_by_name(&components.requests, |r| r.name.as_str()) {
                let location = Location::item(format!("components.requestBodies.{}", request.name));
                self.check_cycles(Area::RequestBodies, &request.name, &location);
                self.w.block(&request.name);
                self.request(request, &location);
                self.w.end();
            }
            self.w.end();
        }

        if !components.responses.is_empty() {
            self.w.block("responses");
            for response in sorted_by_name(&components.responses, |r| r.name.as_str()) {
                let location = Location::item(format!("components.responses.{}", response.name));
                self.check_cycles(Area::Responses, &response.name, &location);
                self.w.block(&response.name);
                self.response(response, &location);
                self.w.end();
            }
            self.w.end();
        }

        if !components.parameters.is_empty() {
            self.w.block("parameters");
            for parameter in sorted_by_name(&components.parameters, |p| p.name.as_str()) {
                let location = Location::item(format!("components.parameters.{}", parameter.name));
                self.check_cycles(Area::Parameters, &parameter.name, &location);
                self.w.block(&parameter.name).field("name", &parameter.name);
                self.parameter_body(parameter, &location);
                self.w.end();
            }
            self.w.end();
        }

        if !components.examples.is_empty() {
            self.w.block("examples");
            for example in sorted_by_name(&components.examples, |e| e.name.as_str()) {
                self.w
                    .block(&example.name)
                    .field("summary", &example.summary)
                    .field("description", &example.description);
                if let Some(value) = &example.value {
                    self.w.value("value", value);
                }
                self.w
                    .field("externalValue", &example.external_value)
                    .end();
            }
            self.w.end();
        }

        if !components.security_schemes.is_empty() {
            self.w.block("securitySchemes");
            for scheme in sorted_by_name(&components.security_schemes, |s| s.name.as_str()) {
                self.w
                    .block(&scheme.name)
                    .keyword("type", &scheme.scheme_type)
                    .field("description", &scheme.description)
                    .field("scheme", &scheme.scheme)
                    .field("bearerFormat", &scheme.bearer_format);
                if let Some(location) = scheme.location {
                    self.w.keyword("in", location.as_str());
                }
                self.w.field("name", &scheme.param_name).end();
            }
            self.w.end();
        }

        self.w.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Composition, CompositionKind, Example, Method, SecurityScheme, Server, TagInfo,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    /// Helper function to create a minimal definition for testing
    fn create_test_definition() -> Definition {
        let mut def = Definition::new("Test API", "1.0.0");
        def.info.description = Some("A test API".to_string());
        def
    }

    fn pet_store() -> Definition {
        let mut def = Definition::new("Pet Store", "1.0.0");
        def.servers.push(Server {
            url: "https://petstore.example.com/v1".to_string(),
            description: None,
        });
        def.tags.push(TagInfo {
            name: "pets".to_string(),
            description: Some("Everything about pets".to_string()),
        });

        let components = def.components_mut();
        components.schemas.push(
            Schema::object("Pet")
                .with_required(&["name", "photoUrls"])
                .with_property(Property::new("id", DataType::Integer).with_format("int64"))
                .with_property(Property::new("name", DataType::String).with_example(json!("Rex")))
                .with_property(Property::reference("category", "Category"))
                .with_property(Property::array_of("photoUrls", DataType::String)),
        );
        components.schemas.push(
            Schema::object("Category")
                .with_property(Property::new("id", DataType::Integer))
                .with_property(Property::new("name", DataType::String)),
        );

        def.add_method(
            "/pets/{petId: [0-9]+}",
            "get",
            Method::new()
                .summary("Find pet by ID")
                .operation_id("getPetById")
                .handler("get_pet")
                .response(200, Response::json("successful operation", "Pet"))
                .response(404, Response::new("Pet not found")),
        )
        .unwrap();
        def.add_method(
            "/pets",
            "post",
            Method::new()
                .summary("Add a new pet")
                .request(Request::json("Pet"))
                .response(201, Response::json("created", "#/components/schemas/Pet")),
        )
        .unwrap();
        def.add_method(
            "/pets",
            "get",
            Method::new()
                .param(Parameter::query("limit", DataType::Integer))
                .response(200, Response::new("ok")),
        )
        .unwrap();
        def.paths.get_mut("/pets").unwrap().tag = Some("pets".to_string());
        def
    }

    fn parse(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_emit_minimal_document() {
        let yaml = serialize_yaml(&create_test_definition()).unwrap();
        assert_eq!(
            yaml,
            "openapi: 3.0.3\ninfo:\n  title: \"Test API\"\n  description: \"A test API\"\n  version: \"1.0.0\"\npaths: {}\n"
        );
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&create_test_definition()).unwrap();
        assert!(json.contains('\n'));
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.0.3");
        assert_eq!(parsed["info"]["title"], "Test API");
        assert_eq!(parsed["paths"], json!({}));
    }

    #[test]
    fn test_pet_store_structure() {
        let doc = parse(&serialize_yaml(&pet_store()).unwrap());

        assert_eq!(doc["servers"][0]["url"], "https://petstore.example.com/v1");
        assert_eq!(doc["tags"][0]["name"], "pets");

        let get_pet = &doc["paths"]["/pets/{petId}"]["get"];
        assert_eq!(get_pet["operationId"], "getPetById");
        assert_eq!(get_pet["tags"], json!(["pets"]));
        assert_eq!(get_pet["parameters"][0]["name"], "petId");
        assert_eq!(get_pet["parameters"][0]["in"], "path");
        assert_eq!(get_pet["parameters"][0]["required"], true);
        assert_eq!(
            get_pet["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/Pet"
        );
        assert_eq!(get_pet["responses"]["404"]["description"], "Pet not found");

        let add_pet = &doc["paths"]["/pets"]["post"];
        assert_eq!(add_pet["requestBody"]["required"], true);
        assert_eq!(
            add_pet["requestBody"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/Pet"
        );

        let list = &doc["paths"]["/pets"]["get"];
        assert_eq!(list["parameters"][0]["in"], "query");
        assert_eq!(list["parameters"][0]["schema"]["type"], "integer");
        assert!(list["parameters"][0].get("required").is_none());

        let pet = &doc["components"]["schemas"]["Pet"];
        assert_eq!(pet["required"], json!(["name", "photoUrls"]));
        assert_eq!(pet["properties"]["category"]["$ref"], "#/components/schemas/Category");
        assert_eq!(pet["properties"]["photoUrls"]["items"]["type"], "string");
        assert_eq!(pet["properties"]["name"]["example"], "Rex");
    }

    #[test]
    fn test_ordering_of_paths_verbs_and_codes() {
        let yaml = serialize_yaml(&pet_store()).unwrap();
        let position = |needle: &str| yaml.find(needle).unwrap();
        assert!(position("\"/pets\":") < position("\"/pets/{petId}\":"));
        assert!(position("    get:") < position("    post:"));
        assert!(position("\"200\":") < position("\"404\":"));
        assert!(position("    Category:") < position("    Pet:"));
    }

    #[test]
    fn test_emission_is_deterministic() {
        let verbs = ["delete", "get", "put", "patch", "post", "head", "options"];
        let build = |order: &[&str]| {
            let mut def = Definition::new("Order", "1");
            for verb in order {
                for code in [500u16, 200, 404] {
                    let path = format!("/items/{}", verb);
                    let method = Method::new().response(code, Response::new("r"));
                    def.add_method(&path, verb, method.clone()).unwrap();
                    def.add_method("/items", verb, method).unwrap();
                }
            }
            def
        };
        let mut reversed = verbs.to_vec();
        reversed.reverse();

        let first = serialize_yaml(&build(&verbs)).unwrap();
        let second = serialize_yaml(&build(&reversed)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, serialize_yaml(&build(&verbs)).unwrap());
    }

    #[test]
    fn test_parameters_follow_template_order() {
        let mut def = Definition::new("Blog", "1");
        def.add_method(
            "/users/{userId}/posts/{postId}",
            "get",
            Method::new()
                .param(Parameter::header("X-Trace", DataType::String))
                .response(200, Response::new("ok")),
        )
        .unwrap();
        def.path_mut("/users/{userId}")
            .unwrap()
            .unwrap()
            .path_params
            .insert(
                "userId".to_string(),
                PathParam {
                    description: Some("Owner".to_string()),
                    data_type: Some(DataType::Integer),
                    format: Some("int64".to_string()),
                    ..Default::default()
                },
            );

        let doc = parse(&serialize_yaml(&def).unwrap());
        let params = &doc["paths"]["/users/{userId}/posts/{postId}"]["get"]["parameters"];
        let names: Vec<&str> = params
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["userId", "postId", "X-Trace"]);
        assert_eq!(params[0]["description"], "Owner");
        assert_eq!(params[0]["schema"]["format"], "int64");
        assert_eq!(params[1]["schema"]["type"], "string");
    }

    #[test]
    fn test_unresolved_reference_fails_emission() {
        let mut def = pet_store();
        def.components_mut().schemas.retain(|s| s.name != "Category");
        match serialize_yaml(&def) {
            Err(Error::Reference(err)) => {
                assert_eq!(err.kind, RefErrorKind::NotFound);
                assert_eq!(err.reference, "#/components/schemas/Category");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_cycle_fails_emission() {
        let mut def = Definition::new("x", "1");
        def.components_mut()
            .schemas
            .push(Schema::object("Node").with_property(Property::reference("next", "Node")));
        match serialize_yaml(&def) {
            Err(Error::Reference(err)) => assert_eq!(err.kind, RefErrorKind::Cyclic),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_structural_errors() {
        let mut def = Definition::new("x", "1");
        def.components_mut().schemas.push(Schema::object("Pet"));
        def.components_mut().schemas.push(Schema::object("Pet"));
        assert!(matches!(
            serialize_yaml(&def),
            Err(Error::DuplicateName { area: Area::Schemas, .. })
        ));

        let mut def = Definition::new("x", "1");
        def.components_mut().examples.push(Example::default());
        assert!(matches!(
            serialize_yaml(&def),
            Err(Error::MissingName { area: Area::Examples, .. })
        ));
    }

    #[test]
    fn test_duplicate_document_path() {
        let mut def = Definition::new("x", "1");
        def.add_method("/a/{id:[0-9]+}", "get", Method::new()).unwrap();
        def.add_method("/a/{id}", "get", Method::new()).unwrap();
        assert!(matches!(serialize_yaml(&def), Err(Error::PathTemplate { .. })));
    }

    #[test]
    fn test_paths_ordered_by_document_key() {
        let mut def = Definition::new("x", "1");
        def.add_method("/a/{id:x}z", "get", Method::new()).unwrap();
        def.add_method("/a/{id}/b", "get", Method::new()).unwrap();
        let yaml = serialize_yaml(&def).unwrap();
        let position = |needle: &str| yaml.find(needle).unwrap();
        assert!(position("\"/a/{id}/b\":") < position("\"/a/{id}z\":"));
    }

    #[test]
    fn test_cyclic_request_body_fails_emission() {
        let mut def = create_test_definition();
        def.components_mut().requests.push(Request {
            name: "A".to_string(),
            reference: Some("A".to_string()),
            ..Default::default()
        });
        assert_eq!(Resolver::new(&def).validate().len(), 1);
        match serialize_yaml(&def) {
            Err(Error::Reference(error)) => {
                assert_eq!(error.kind, RefErrorKind::Cyclic);
                assert_eq!(error.reference, "#/components/requestBodies/A");
            }
            other => panic!("Expected a cyclic reference, got {:?}", other),
        }
    }

    #[test]
    fn test_cyclic_response_fails_emission() {
        let mut def = create_test_definition();
        def.components_mut().responses.push(Response {
            name: "R".to_string(),
            reference: Some("#/components/responses/R".to_string()),
            ..Response::new("loop")
        });
        match serialize_json(&def) {
            Err(Error::Reference(error)) => {
                assert_eq!(error.kind, RefErrorKind::Cyclic);
                assert_eq!(error.reference, "#/components/responses/R");
            }
            other => panic!("Expected a cyclic reference, got {:?}", other),
        }
    }

    #[test]
    fn test_indented_description_stays_valid() {
        let mut def = create_test_definition();
        def.info.description = Some("  indented first line\nsecond".to_string());
        let json = serialize_json(&def).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["info"]["description"], "  indented first line\nsecond");
        assert_eq!(parsed["info"]["version"], "1.0.0");
    }

    #[test]
    fn test_root_methods() {
        let mut def = Definition::new("x", "1");
        def.add_method("/", "get", Method::new().response(200, Response::new("home")))
            .unwrap();
        let doc = parse(&serialize_yaml(&def).unwrap());
        assert_eq!(doc["paths"]["/"]["get"]["responses"]["200"]["description"], "home");
    }

    #[test]
    fn test_multiline_description_survives() {
        let mut def = create_test_definition();
        def.info.description = Some("First paragraph.\n\nSecond paragraph.".to_string());
        let doc = parse(&serialize_yaml(&def).unwrap());
        assert_eq!(doc["info"]["description"], "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn test_components_sections() {
        let mut def = pet_store();
        let components = def.components_mut();
        components.examples.push(Example {
            name: "Rex".to_string(),
            summary: Some("A dog".to_string()),
            value: Some(json!({"id": 1, "name": "Rex", "photoUrls": []})),
            ..Default::default()
        });
        components.responses.push(Response {
            name: "PetFound".to_string(),
            example_ref: Some("Rex".to_string()),
            ..Response::json("A pet", "Pet")
        });
        components
            .parameters
            .push(Parameter::query("limit", DataType::Integer));
        components.security_schemes.push(SecurityScheme {
            name: "bearer".to_string(),
            scheme_type: "http".to_string(),
            scheme: Some("bearer".to_string()),
            bearer_format: Some("JWT".to_string()),
            ..Default::default()
        });
        let mut shape = Schema::new("Animal");
        shape.composition = Some(Composition {
            kind: CompositionKind::OneOf,
            members: vec![
                SchemaOrRef::Ref("Pet".to_string()),
                SchemaOrRef::Inline(Box::new(
                    Schema::object("").with_property(Property::new("wild", DataType::Boolean)),
                )),
            ],
        });
        components.schemas.push(shape);
        def.add_method(
            "/secure",
            "get",
            Method::new()
                .param(Parameter::reference("limit"))
                .secured_by("bearer")
                .response(200, Response {
                    reference: Some("PetFound".to_string()),
                    ..Response::default()
                }),
        )
        .unwrap();

        let doc = parse(&serialize_yaml(&def).unwrap());
        let components = &doc["components"];
        assert_eq!(components["examples"]["Rex"]["value"]["name"], "Rex");
        assert_eq!(
            components["responses"]["PetFound"]["content"]["application/json"]["examples"]["Rex"]["$ref"],
            "#/components/examples/Rex"
        );
        assert_eq!(components["parameters"]["limit"]["in"], "query");
        assert_eq!(components["securitySchemes"]["bearer"]["bearerFormat"], "JWT");
        assert_eq!(
            components["schemas"]["Animal"]["oneOf"][0]["$ref"],
            "#/components/schemas/Pet"
        );
        assert_eq!(
            components["schemas"]["Animal"]["oneOf"][1]["properties"]["wild"]["type"],
            "boolean"
        );

        let secure = &doc["paths"]["/secure"]["get"];
        assert_eq!(secure["parameters"][0]["$ref"], "#/components/parameters/limit");
        assert_eq!(secure["security"], json!([{"bearer": []}]));
        assert_eq!(secure["responses"]["200"]["$ref"], "#/components/responses/PetFound");
    }

    #[test]
    fn test_property_constraints() {
        let mut def = Definition::new("x", "1");
        let mut age = Property::new("age", DataType::Integer);
        age.minimum = Some(0.0);
        age.maximum = Some(150.5);
        age.default = Some(json!(1));
        let mut code = Property::new("code", DataType::String);
        code.pattern = Some("^[A-Z]{3}$".to_string());
        code.min_length = Some(3);
        code.enum_values = vec![json!("ABC"), json!("DEF")];
        code.extensions.insert("x-internal".to_string(), json!(true));
        def.components_mut().schemas.push(
            Schema::object("Person")
                .with_property(age)
                .with_property(code.required()),
        );

        let doc = parse(&serialize_yaml(&def).unwrap());
        let person = &doc["components"]["schemas"]["Person"];
        assert_eq!(person["required"], json!(["code"]));
        assert_eq!(person["properties"]["age"]["minimum"], 0);
        assert_eq!(person["properties"]["age"]["maximum"], 150.5);
        assert_eq!(person["properties"]["age"]["default"], 1);
        assert_eq!(person["properties"]["code"]["pattern"], "^[A-Z]{3}$");
        assert_eq!(person["properties"]["code"]["minLength"], 3);
        assert_eq!(person["properties"]["code"]["enum"], json!(["ABC", "DEF"]));
        assert_eq!(person["properties"]["code"]["x-internal"], true);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(OutputFormat::Yaml), "application/yaml");
        assert_eq!(content_type(OutputFormat::Json), "application/json");
    }

    #[test]
    fn test_write_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");
        let content = "test content";

        let result = write_to_file(content, &file_path);

        assert!(result.is_ok());
        assert_eq!(fs::read_to_string(&file_path).unwrap(), content);
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("test.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert!(file_path.exists());
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[test]
    fn test_write_json_file_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("openapi.json");

        let json = serialize(&pet_store(), OutputFormat::Json).unwrap();
        write_to_file(&json, &file_path).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["info"]["title"], "Pet Store");
        assert!(parsed["paths"]["/pets/{petId}"]["get"].is_object());
    }
}

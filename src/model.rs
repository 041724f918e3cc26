//! In-memory document model.
//!
//! A [`Definition`] is assembled once per generation call, either by hand or with the
//! help of the schema generator, and then handed to the serializer. Collections that are
//! naturally keyed (paths, methods, responses) use hash maps; the serializer imposes an
//! explicit order on them before anything is written.

use crate::error::Result;
use crate::path_template;
use log::debug;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Components sub-collection a reference may point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Area {
    Schemas,
    RequestBodies,
    Responses,
    Parameters,
    Examples,
}

impl Area {
    pub const ALL: [Area; 5] = [
        Area::Schemas,
        Area::RequestBodies,
        Area::Responses,
        Area::Parameters,
        Area::Examples,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Schemas => "schemas",
            Area::RequestBodies => "requestBodies",
            Area::Responses => "responses",
            Area::Parameters => "parameters",
            Area::Examples => "examples",
        }
    }

    pub fn parse(s: &str) -> Option<Area> {
        Area::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OpenAPI type keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Integer => "integer",
            DataType::Boolean => "boolean",
            DataType::Object => "object",
            DataType::Array => "array",
            DataType::Null => "null",
        }
    }

    /// Parses the type names accepted in `type:` and `itemType:` directives.
    pub fn parse(s: &str) -> Option<DataType> {
        match s {
            "string" => Some(DataType::String),
            "number" => Some(DataType::Number),
            "integer" => Some(DataType::Integer),
            "boolean" => Some(DataType::Boolean),
            "object" => Some(DataType::Object),
            "array" => Some(DataType::Array),
            "null" => Some(DataType::Null),
            _ => None,
        }
    }
}

/// The location where a parameter value is carried in an HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Info {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
}

/// Documentation grouping declared at the top of the document.
#[derive(Debug, Clone, Default)]
pub struct TagInfo {
    pub name: String,
    pub description: Option<String>,
}

/// Root of the document model.
#[derive(Debug, Clone, Default)]
pub struct Definition {
    pub info: Info,
    pub servers: Vec<Server>,
    pub tags: Vec<TagInfo>,
    /// Operations on `/`, keyed by HTTP verb
    pub methods: HashMap<String, Method>,
    /// Path tree keyed by fragment; a full path is the concatenation of fragments
    pub paths: HashMap<String, Path>,
    pub components: Option<Components>,
}

/// A node of the path tree.
#[derive(Debug, Clone, Default)]
pub struct Path {
    pub paths: HashMap<String, Path>,
    pub methods: HashMap<String, Method>,
    /// Extra detail for parameters inferred from the template
    pub path_params: HashMap<String, PathParam>,
    /// Documentation tag, inherited by descendants that do not set their own
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PathParam {
    pub description: Option<String>,
    pub example: Option<Value>,
    pub data_type: Option<DataType>,
    pub format: Option<String>,
    pub schema_ref: Option<String>,
}

/// One operation, i.e. one (path, verb) pair.
#[derive(Debug, Clone, Default)]
pub struct Method {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub operation_id: Option<String>,
    /// Overrides the tag inherited from the path tree when non-empty
    pub tags: Vec<String>,
    pub deprecated: bool,
    pub request: Option<Request>,
    pub responses: HashMap<u16, Response>,
    /// Query, header and cookie parameters (path parameters come from the template)
    pub parameters: Vec<Parameter>,
    /// Names of security schemes required by this operation
    pub security: Vec<String>,
    /// Opaque handler reference for the router
    pub handler: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Request {
    /// Key under `components.requestBodies` when declared there
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
    pub content_type: String,
    pub schema: Option<Schema>,
    pub schema_ref: Option<String>,
    pub example: Option<Value>,
    /// Points at a reusable request body instead of describing one
    pub reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Response {
    /// Key under `components.responses` when declared there
    pub name: String,
    pub description: String,
    pub content_type: String,
    pub schema: Option<Schema>,
    pub schema_ref: Option<String>,
    pub example: Option<Value>,
    /// Named example from `components.examples`
    pub example_ref: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    pub description: Option<String>,
    pub required: bool,
    pub deprecated: bool,
    pub data_type: Option<DataType>,
    pub format: Option<String>,
    pub schema_ref: Option<String>,
    pub example: Option<Value>,
    /// Points at a reusable parameter instead of describing one
    pub reference: Option<String>,
}

/// Reusable example value.
#[derive(Debug, Clone, Default)]
pub struct Example {
    pub name: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub value: Option<Value>,
    pub external_value: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SecurityScheme {
    pub name: String,
    /// `http`, `apiKey`, `oauth2` or `openIdConnect`
    pub scheme_type: String,
    pub scheme: Option<String>,
    pub bearer_format: Option<String>,
    pub location: Option<ParamLocation>,
    pub param_name: Option<String>,
    pub description: Option<String>,
}

/// Named, reusable definitions. Names are unique within each collection.
#[derive(Debug, Clone, Default)]
pub struct Components {
    pub schemas: Vec<Schema>,
    pub requests: Vec<Request>,
    pub responses: Vec<Response>,
    pub parameters: Vec<Parameter>,
    pub examples: Vec<Example>,
    pub security_schemes: Vec<SecurityScheme>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionKind {
    OneOf,
    AnyOf,
    AllOf,
}

impl CompositionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositionKind::OneOf => "oneOf",
            CompositionKind::AnyOf => "anyOf",
            CompositionKind::AllOf => "allOf",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SchemaOrRef {
    Inline(Box<Schema>),
    Ref(String),
}

#[derive(Debug, Clone)]
pub struct Composition {
    pub kind: CompositionKind,
    pub members: Vec<SchemaOrRef>,
}

#[derive(Debug, Clone, Default)]
pub struct Discriminator {
    pub property_name: String,
    /// Discriminator value -> schema reference
    pub mapping: BTreeMap<String, String>,
}

/// A named, reusable type definition.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub name: String,
    pub description: Option<String>,
    pub data_type: Option<DataType>,
    pub format: Option<String>,
    /// Explicitly required property names; see [`Schema::required_names`]
    pub required: Vec<String>,
    pub properties: Vec<Property>,
    pub items: Option<Box<Property>>,
    pub enum_values: Vec<Value>,
    pub composition: Option<Composition>,
    pub discriminator: Option<Discriminator>,
    pub example: Option<Value>,
    pub nullable: bool,
    pub deprecated: bool,
    pub extensions: BTreeMap<String, Value>,
}

/// A named field of a schema or of a nested object property.
#[derive(Debug, Clone, Default)]
pub struct Property {
    pub name: String,
    pub description: Option<String>,
    pub data_type: Option<DataType>,
    pub format: Option<String>,
    pub example: Option<Value>,
    pub default: Option<Value>,
    pub enum_values: Vec<Value>,
    pub required: bool,
    pub deprecated: bool,
    pub nullable: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub multiple_of: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    /// Element description for arrays
    pub items: Option<Box<Property>>,
    /// Nested fields for objects
    pub properties: Vec<Property>,
    pub schema_ref: Option<String>,
    pub extensions: BTreeMap<String, Value>,
}

/// Appends `name` unless already present.
pub(crate) fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(DataType::Object),
            ..Default::default()
        }
    }

    /// Adds a required property name, keeping the list an insertion-ordered set.
    pub fn require(&mut self, name: &str) -> &mut Self {
        push_unique(&mut self.required, name);
        self
    }

    pub fn with_required(mut self, names: &[&str]) -> Self {
        for name in names {
            self.require(name);
        }
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Required names: the explicit list first, then properties flagged `required`,
    /// without duplicates.
    pub fn required_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.required.len() + self.properties.len());
        for name in &self.required {
            push_unique(&mut names, name);
        }
        for property in self.properties.iter().filter(|p| p.required) {
            push_unique(&mut names, &property.name);
        }
        names
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

impl Property {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
            ..Default::default()
        }
    }

    /// A property whose detail lives in another schema.
    pub fn reference(name: impl Into<String>, schema_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_ref: Some(schema_ref.into()),
            ..Default::default()
        }
    }

    /// An array property whose elements are described elsewhere.
    pub fn array_of_ref(name: impl Into<String>, schema_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(DataType::Array),
            items: Some(Box::new(Property {
                schema_ref: Some(schema_ref.into()),
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    pub fn array_of(name: impl Into<String>, item_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(DataType::Array),
            items: Some(Box::new(Property {
                data_type: Some(item_type),
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    /// Names of nested properties flagged `required`, in declaration order.
    pub fn required_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for property in self.properties.iter().filter(|p| p.required) {
            push_unique(&mut names, &property.name);
        }
        names
    }
}

impl Request {
    pub fn json(schema_ref: impl Into<String>) -> Self {
        Self {
            schema_ref: Some(schema_ref.into()),
            ..Default::default()
        }
    }
}

impl Default for Request {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            required: true,
            content_type: "application/json".to_string(),
            schema: None,
            schema_ref: None,
            example: None,
            reference: None,
        }
    }
}

impl Response {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn json(description: impl Into<String>, schema_ref: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            schema_ref: Some(schema_ref.into()),
            ..Default::default()
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            content_type: "application/json".to_string(),
            schema: None,
            schema_ref: None,
            example: None,
            example_ref: None,
            reference: None,
        }
    }
}

impl Parameter {
    pub fn new(name: impl Into<String>, location: ParamLocation, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            location,
            description: None,
            required: location == ParamLocation::Path,
            deprecated: false,
            data_type: Some(data_type),
            format: None,
            schema_ref: None,
            example: None,
            reference: None,
        }
    }

    pub fn query(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, ParamLocation::Query, data_type)
    }

    pub fn header(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, ParamLocation::Header, data_type)
    }

    /// A usage site pointing at `components.parameters`.
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            location: ParamLocation::Query,
            description: None,
            required: false,
            deprecated: false,
            data_type: None,
            format: None,
            schema_ref: None,
            example: None,
            reference: Some(reference.into()),
        }
    }
}

impl Method {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    pub fn handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    pub fn request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    pub fn response(mut self, status: u16, response: Response) -> Self {
        self.responses.insert(status, response);
        self
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn secured_by(mut self, scheme: impl Into<String>) -> Self {
        self.security.push(scheme.into());
        self
    }
}

impl Path {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

impl Components {
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    pub fn request(&self, name: &str) -> Option<&Request> {
        self.requests.iter().find(|r| r.name == name)
    }

    pub fn response(&self, name: &str) -> Option<&Response> {
        self.responses.iter().find(|r| r.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn example(&self, name: &str) -> Option<&Example> {
        self.examples.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, area: Area, name: &str) -> bool {
        match area {
            Area::Schemas => self.schema(name).is_some(),
            Area::RequestBodies => self.request(name).is_some(),
            Area::Responses => self.response(name).is_some(),
            Area::Parameters => self.parameter(name).is_some(),
            Area::Examples => self.example(name).is_some(),
        }
    }

    /// Entry names of one collection, in declaration order.
    pub fn names(&self, area: Area) -> Vec<&str> {
        match area {
            Area::Schemas => self.schemas.iter().map(|s| s.name.as_str()).collect(),
            Area::RequestBodies => self.requests.iter().map(|r| r.name.as_str()).collect(),
            Area::Responses => self.responses.iter().map(|r| r.name.as_str()).collect(),
            Area::Parameters => self.parameters.iter().map(|p| p.name.as_str()).collect(),
            Area::Examples => self.examples.iter().map(|e| e.name.as_str()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.requests.is_empty()
            && self.responses.is_empty()
            && self.parameters.is_empty()
            && self.examples.is_empty()
            && self.security_schemes.is_empty()
    }
}

/// A path of the tree with everything inherited from its ancestors resolved.
#[derive(Debug)]
pub struct FlatPath<'a> {
    /// Full template, fragments concatenated from the root
    pub template: String,
    pub tag: Option<&'a str>,
    /// Path parameter detail, nearer declarations overriding farther ones
    pub path_params: HashMap<&'a str, &'a PathParam>,
    pub methods: &'a HashMap<String, Method>,
}

impl Definition {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: Info {
                title: title.into(),
                version: version.into(),
                description: None,
            },
            ..Default::default()
        }
    }

    pub fn components_mut(&mut self) -> &mut Components {
        self.components.get_or_insert_with(Components::default)
    }

    /// Returns the node for a full template, creating intermediate nodes as needed.
    ///
    /// `/pets/{petId}` ends up as `paths["/pets"].paths["/{petId}"]`. The root template
    /// `/` has no node of its own; its operations live in [`Definition::methods`].
    pub fn path_mut(&mut self, template: &str) -> Result<Option<&mut Path>> {
        let segments = path_template::segments(template)?;
        let mut iter = segments.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let mut node = self.paths.entry(first).or_default();
        for segment in iter {
            node = node.paths.entry(segment).or_default();
        }
        Ok(Some(node))
    }

    /// Registers `method` under `verb` for the full `template`.
    pub fn add_method(&mut self, template: &str, verb: &str, method: Method) -> Result<()> {
        let verb = verb.to_ascii_uppercase();
        debug!("Adding method: {} {}", verb, template);
        match self.path_mut(template)? {
            Some(path) => path.methods.insert(verb, method),
            None => self.methods.insert(verb, method),
        };
        Ok(())
    }

    /// Flattens the path tree. The order is unspecified; callers sort.
    pub fn flatten(&self) -> Vec<FlatPath<'_>> {
        let mut out = Vec::new();
        if !self.methods.is_empty() {
            out.push(FlatPath {
                template: "/".to_string(),
                tag: None,
                path_params: HashMap::new(),
                methods: &self.methods,
            });
        }
        for (fragment, path) in &self.paths {
            flatten_into(fragment.clone(), path, None, &HashMap::new(), &mut out);
        }
        out
    }
}

fn flatten_into<'a>(
    template: String,
    path: &'a Path,
    inherited_tag: Option<&'a str>,
    inherited_params: &HashMap<&'a str, &'a PathParam>,
    out: &mut Vec<FlatPath<'a>>,
) {
    let tag = path.tag.as_deref().or(inherited_tag);
    let mut params = inherited_params.clone();
    for (name, param) in &path.path_params {
        params.insert(name.as_str(), param);
    }

    for (fragment, child) in &path.paths {
        flatten_into(format!("{}{}", template, fragment), child, tag, &params, out);
    }

    if !path.methods.is_empty() {
        out.push(FlatPath {
            template,
            tag,
            path_params: params,
            methods: &path.methods,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_require_is_an_ordered_set() {
        let mut schema = Schema::object("Pet");
        schema.require("name").require("photoUrls").require("name");
        assert_eq!(schema.required, vec!["name", "photoUrls"]);
    }

    #[test]
    fn test_required_names_merge_property_flags() {
        let schema = Schema::object("Pet")
            .with_required(&["name"])
            .with_property(Property::new("id", DataType::Integer).required())
            .with_property(Property::new("name", DataType::String).required())
            .with_property(Property::new("tag", DataType::String));
        assert_eq!(schema.required_names(), vec!["name", "id"]);
    }

    #[test]
    fn test_add_method_builds_tree() {
        let mut def = Definition::new("Pets", "1.0.0");
        def.add_method("/pets/{petId}", "get", Method::new().handler("get_pet"))
            .unwrap();
        def.add_method("/pets", "post", Method::new()).unwrap();

        let pets = &def.paths["/pets"];
        assert!(pets.methods.contains_key("POST"));
        assert!(pets.paths["/{petId}"].methods.contains_key("GET"));
    }

    #[test]
    fn test_add_method_on_root() {
        let mut def = Definition::new("Pets", "1.0.0");
        def.add_method("/", "get", Method::new()).unwrap();
        assert!(def.methods.contains_key("GET"));
        assert!(def.paths.is_empty());
    }

    #[test]
    fn test_add_method_rejects_bad_template() {
        let mut def = Definition::new("Pets", "1.0.0");
        assert!(def.add_method("/pets/{petId", "get", Method::new()).is_err());
    }

    #[test]
    fn test_flatten_inherits_tag_and_params() {
        let mut def = Definition::new("Pets", "1.0.0");
        def.add_method("/pets/{petId}/toys", "get", Method::new())
            .unwrap();
        {
            let pets = def.paths.get_mut("/pets").unwrap();
            pets.tag = Some("pets".to_string());
            let by_id = pets.paths.get_mut("/{petId}").unwrap();
            by_id.path_params.insert(
                "petId".to_string(),
                PathParam {
                    description: Some("Pet identifier".to_string()),
                    ..Default::default()
                },
            );
        }

        let flat = def.flatten();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].template, "/pets/{petId}/toys");
        assert_eq!(flat[0].tag, Some("pets"));
        assert!(flat[0].path_params.contains_key("petId"));
    }

    #[test]
    fn test_area_round_trip_names() {
        for area in Area::ALL {
            assert_eq!(Area::parse(area.as_str()), Some(area));
        }
        assert_eq!(Area::parse("headers"), None);
    }

    #[test]
    fn test_components_lookup() {
        let mut components = Components::default();
        components.schemas.push(Schema::object("Category"));
        assert!(components.contains(Area::Schemas, "Category"));
        assert!(!components.contains(Area::Parameters, "Category"));
        assert_eq!(components.names(Area::Schemas), vec!["Category"]);
    }
}

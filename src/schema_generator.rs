use crate::error::{Error, Result};
use crate::model::{Components, DataType, Property, Schema};
use crate::reflect::{wire_type, Describe, FieldShape, Kind, Record, Shape};
use crate::tag::{self, Directive, ParsedTag, TagError};
use log::debug;
use serde::Serialize;
use serde_json::Value;

/// Schema generator - turns described sample values into component schemas
pub struct SchemaGenerator {
    /// Generated schemas, first registration of a name wins
    schemas: Vec<Schema>,
}

/// Synthesizes a schema from a sample value.
///
/// The shape comes from [`Describe`]; the sample itself is serialized with `serde_json` so
/// that fields tagged `example` can carry real data. The serialized field names must match
/// the wire names of the description.
pub fn synthesize<T: Describe + Serialize>(sample: &T) -> Result<Schema> {
    let value = serde_json::to_value(sample)?;
    synthesize_shape(&T::describe(), Some(&value))
}

/// Synthesizes a schema from a shape, optionally pulling examples out of `sample`.
pub fn synthesize_shape(shape: &Shape, sample: Option<&Value>) -> Result<Schema> {
    let Kind::Struct(record) = &shape.deref().kind else {
        return Err(Error::NotAStruct(shape.type_name.clone()));
    };
    debug!("Synthesizing schema for record: {}", record.name);

    let mut synth = Synthesizer { open: Vec::new() };
    let properties = synth.record_properties(record, sample, None)?;

    Ok(Schema {
        name: record.name.clone(),
        data_type: Some(DataType::Object),
        properties,
        ..Default::default()
    })
}

/// Field currently being synthesized, for error reporting.
#[derive(Clone, Copy)]
struct FieldCtx<'a> {
    record: &'a str,
    field: &'a str,
}

impl FieldCtx<'_> {
    fn tag_error(&self, err: TagError) -> Error {
        Error::Tag {
            record: self.record.to_string(),
            field: self.field.to_string(),
            token: err.token,
            reason: err.reason,
        }
    }

    fn error(&self, directive: &Directive, reason: impl Into<String>) -> Error {
        Error::Tag {
            record: self.record.to_string(),
            field: self.field.to_string(),
            token: directive.token(),
            reason: reason.into(),
        }
    }

    fn nested_array(&self) -> Error {
        Error::Tag {
            record: self.record.to_string(),
            field: self.field.to_string(),
            token: "itemType".to_string(),
            reason: "arrays of arrays are not supported".to_string(),
        }
    }
}

/// Type-related directives, applied before everything else.
#[derive(Default)]
struct TypeDirectives {
    schema_ref: Option<String>,
    data_type: Option<DataType>,
    item_type: Option<DataType>,
    format: Option<String>,
    item_format: Option<String>,
}

struct Synthesizer {
    /// Records currently being expanded, innermost last
    open: Vec<String>,
}

impl Synthesizer {
    fn record_properties(
        &mut self,
        record: &Record,
        sample: Option<&Value>,
        parent: Option<FieldCtx<'_>>,
    ) -> Result<Vec<Property>> {
        let recursion = || match parent {
            Some(ctx) => Error::RecursiveType {
                record: ctx.record.to_string(),
                field: ctx.field.to_string(),
            },
            None => Error::RecursiveType {
                record: record.name.clone(),
                field: String::new(),
            },
        };

        if self.open.contains(&record.name) {
            return Err(recursion());
        }
        let fields = record.fields.resolve().ok_or_else(recursion)?;

        self.open.push(record.name.clone());
        let mut properties = Vec::with_capacity(fields.len());
        for field in &fields {
            if let Some(property) = self.field_property(&record.name, field, sample)? {
                properties.push(property);
            }
        }
        self.open.pop();

        debug!("Record {} has {} properties", record.name, properties.len());
        Ok(properties)
    }

    fn field_property(
        &mut self,
        record: &str,
        field: &FieldShape,
        parent_sample: Option<&Value>,
    ) -> Result<Option<Property>> {
        let Some(wire_name) = field.wire_name() else {
            debug!("Skipping suppressed field {}.{}", record, field.ident);
            return Ok(None);
        };
        let ctx = FieldCtx {
            record,
            field: &field.ident,
        };

        let parsed = match field.tag.as_deref() {
            Some(raw) => tag::parse(raw).map_err(|e| ctx.tag_error(e))?,
            None => ParsedTag::default(),
        };
        let sample = parent_sample
            .and_then(|v| v.get(&wire_name))
            .filter(|v| !v.is_null());

        let mut property = Property {
            name: wire_name,
            required: !field.shape.is_pointer(),
            ..Default::default()
        };

        let types = self.type_directives(&parsed, &mut property, ctx)?;
        self.apply_type(&mut property, &field.shape, types, sample, ctx)?;
        apply_constraints(&parsed, &mut property, sample, ctx)?;

        if let Some(comment) = parsed.comment() {
            property.description = Some(match property.description.take() {
                Some(description) => format!("{}\n{}", description, comment),
                None => comment,
            });
        }

        Ok(Some(property))
    }

    fn type_directives(
        &self,
        parsed: &ParsedTag,
        property: &mut Property,
        ctx: FieldCtx<'_>,
    ) -> Result<TypeDirectives> {
        let mut types = TypeDirectives::default();
        for directive in parsed.effective() {
            let value = directive.value();
            match (directive.name(), value) {
                ("$ref", Some(v)) => types.schema_ref = Some(v.to_string()),
                ("name", Some(v)) => property.name = v.to_string(),
                ("type", Some(v)) => {
                    types.data_type = Some(
                        DataType::parse(v)
                            .ok_or_else(|| ctx.error(directive, "unsupported type"))?,
                    )
                }
                ("itemType", Some(v)) => {
                    let item_type = DataType::parse(v)
                        .ok_or_else(|| ctx.error(directive, "unsupported item type"))?;
                    if item_type == DataType::Array {
                        return Err(ctx.nested_array());
                    }
                    types.item_type = Some(item_type);
                }
                ("format", Some(v)) => types.format = Some(v.to_string()),
                ("itemFormat", Some(v)) => types.item_format = Some(v.to_string()),
                ("$ref" | "name" | "type" | "itemType" | "format" | "itemFormat", None) => {
                    return Err(ctx.error(directive, "missing value"));
                }
                _ => {}
            }
        }
        Ok(types)
    }

    fn apply_type(
        &mut self,
        property: &mut Property,
        shape: &Shape,
        types: TypeDirectives,
        sample: Option<&Value>,
        ctx: FieldCtx<'_>,
    ) -> Result<()> {
        let native = shape.deref();
        property.format = types.format.clone();

        if let Some(schema_ref) = types.schema_ref {
            // The reference replaces inference; only an explicit array type moves it to items.
            if types.data_type == Some(DataType::Array) {
                property.data_type = Some(DataType::Array);
                property.items = Some(Box::new(Property {
                    schema_ref: Some(schema_ref),
                    ..Default::default()
                }));
            } else {
                property.data_type = types.data_type;
                property.schema_ref = Some(schema_ref);
            }
            return Ok(());
        }

        let (native_type, native_format, _) = wire_type(&native.kind);
        let data_type = types.data_type.unwrap_or(native_type);
        property.data_type = Some(data_type);
        if property.format.is_none() && data_type == native_type {
            property.format = native_format.map(str::to_string);
        }

        match (&native.kind, data_type) {
            (Kind::Struct(record), DataType::Object) => {
                property.properties = self.record_properties(record, sample, Some(ctx))?;
            }
            (Kind::Slice(elem), DataType::Array) => {
                let first = sample.and_then(|v| v.get(0));
                property.items = Some(Box::new(self.item_property(
                    elem,
                    types.item_type,
                    types.item_format,
                    first,
                    ctx,
                )?));
            }
            (_, DataType::Array) => {
                if let Some(item_type) = types.item_type {
                    property.items = Some(Box::new(Property {
                        data_type: Some(item_type),
                        format: types.item_format,
                        ..Default::default()
                    }));
                }
            }
            (Kind::Enumeration(variants), DataType::String) => {
                property.enum_values = variants.iter().cloned().map(Value::String).collect();
            }
            _ => {}
        }
        Ok(())
    }

    fn item_property(
        &mut self,
        elem: &Shape,
        item_type: Option<DataType>,
        item_format: Option<String>,
        sample: Option<&Value>,
        ctx: FieldCtx<'_>,
    ) -> Result<Property> {
        let native = elem.deref();
        if matches!(native.kind, Kind::Slice(_)) {
            return Err(ctx.nested_array());
        }

        let (native_type, native_format, _) = wire_type(&native.kind);
        let data_type = item_type.unwrap_or(native_type);
        let format = match item_format {
            Some(format) => Some(format),
            None if data_type == native_type => native_format.map(str::to_string),
            None => None,
        };
        let mut item = Property {
            data_type: Some(data_type),
            format,
            ..Default::default()
        };

        match (&native.kind, data_type) {
            (Kind::Struct(record), DataType::Object) => {
                item.properties = self.record_properties(record, sample, Some(ctx))?;
            }
            (Kind::Enumeration(variants), DataType::String) => {
                item.enum_values = variants.iter().cloned().map(Value::String).collect();
            }
            _ => {}
        }
        Ok(item)
    }
}

fn bool_value(directive: &Directive, ctx: FieldCtx<'_>) -> Result<bool> {
    match directive.value() {
        None => Ok(true),
        Some(v) => v
            .parse::<bool>()
            .map_err(|_| ctx.error(directive, "expected true or false")),
    }
}

fn number_value(directive: &Directive, ctx: FieldCtx<'_>) -> Result<f64> {
    let raw = directive
        .value()
        .ok_or_else(|| ctx.error(directive, "missing value"))?;
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ctx.error(directive, "expected a number"))
}

fn count_value(directive: &Directive, ctx: FieldCtx<'_>) -> Result<u64> {
    let raw = directive
        .value()
        .ok_or_else(|| ctx.error(directive, "missing value"))?;
    raw.parse::<u64>()
        .map_err(|_| ctx.error(directive, "expected a non-negative integer"))
}

/// Converts a tag value to a JSON value of the given type.
fn typed_value(raw: &str, data_type: Option<DataType>) -> std::result::Result<Value, String> {
    match data_type {
        Some(DataType::Integer) => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("'{}' is not an integer", raw)),
        Some(DataType::Number) => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("'{}' is not a number", raw)),
        Some(DataType::Boolean) => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| format!("'{}' is not a boolean", raw)),
        Some(DataType::Object) | Some(DataType::Array) => {
            serde_json::from_str(raw).map_err(|e| format!("'{}' is not valid JSON: {}", raw, e))
        }
        Some(DataType::String) | Some(DataType::Null) | None => Ok(Value::String(raw.to_string())),
    }
}

/// Applies every non-type directive once the property's type is settled.
fn apply_constraints(
    parsed: &ParsedTag,
    property: &mut Property,
    sample: Option<&Value>,
    ctx: FieldCtx<'_>,
) -> Result<()> {
    for directive in parsed.effective() {
        let name = directive.name();
        match name {
            "$ref" | "name" | "type" | "itemType" | "format" | "itemFormat" => {}
            "required" => property.required = bool_value(directive, ctx)?,
            "deprecated" => property.deprecated = bool_value(directive, ctx)?,
            "nullable" => property.nullable = bool_value(directive, ctx)?,
            "uniqueItems" => property.unique_items = bool_value(directive, ctx)?,
            "exclusiveMinimum" => property.exclusive_minimum = bool_value(directive, ctx)?,
            "exclusiveMaximum" => property.exclusive_maximum = bool_value(directive, ctx)?,
            "readOnly" => property.read_only = bool_value(directive, ctx)?,
            "writeOnly" => property.write_only = bool_value(directive, ctx)?,
            "minimum" => property.minimum = Some(number_value(directive, ctx)?),
            "maximum" => property.maximum = Some(number_value(directive, ctx)?),
            "multipleOf" => property.multiple_of = Some(number_value(directive, ctx)?),
            "minLength" => property.min_length = Some(count_value(directive, ctx)?),
            "maxLength" => property.max_length = Some(count_value(directive, ctx)?),
            "minItems" => property.min_items = Some(count_value(directive, ctx)?),
            "maxItems" => property.max_items = Some(count_value(directive, ctx)?),
            "minProperties" => property.min_properties = Some(count_value(directive, ctx)?),
            "maxProperties" => property.max_properties = Some(count_value(directive, ctx)?),
            "description" | "pattern" => {
                let value = directive
                    .value()
                    .ok_or_else(|| ctx.error(directive, "missing value"))?
                    .to_string();
                if name == "description" {
                    property.description = Some(value);
                } else {
                    property.pattern = Some(value);
                }
            }
            "example" => match directive.value() {
                None => property.example = sample.cloned(),
                Some(raw) => {
                    property.example = Some(
                        typed_value(raw, property.data_type)
                            .map_err(|reason| ctx.error(directive, reason))?,
                    )
                }
            },
            "default" => {
                let raw = directive
                    .value()
                    .ok_or_else(|| ctx.error(directive, "missing value"))?;
                property.default = Some(
                    typed_value(raw, property.data_type)
                        .map_err(|reason| ctx.error(directive, reason))?,
                );
            }
            "enum" => {
                let raw = directive
                    .value()
                    .ok_or_else(|| ctx.error(directive, "missing value"))?;
                let items = tag::split_list(raw).map_err(|e| ctx.tag_error(e))?;
                // On arrays the allowed values constrain the elements.
                let (target, data_type) = match property.items.as_deref_mut() {
                    Some(item) if property.data_type == Some(DataType::Array) => {
                        let data_type = item.data_type;
                        (&mut item.enum_values, data_type)
                    }
                    _ => (&mut property.enum_values, property.data_type),
                };
                target.clear();
                for item in items {
                    target.push(
                        typed_value(&item, data_type)
                            .map_err(|reason| ctx.error(directive, reason))?,
                    );
                }
            }
            extension if extension.starts_with("x-") => {
                let value = match directive.value() {
                    None => Value::Bool(true),
                    Some(raw) => {
                        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
                    }
                };
                property.extensions.insert(extension.to_string(), value);
            }
            _ => return Err(ctx.error(directive, "unknown token")),
        }
    }
    Ok(())
}

impl SchemaGenerator {
    /// Create an empty generator
    pub fn new() -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            schemas: Vec::new(),
        }
    }

    /// Synthesizes a schema for `sample` and registers it under its record name.
    pub fn add<T: Describe + Serialize>(&mut self, sample: &T) -> Result<&Schema> {
        let schema = synthesize(sample)?;
        Ok(self.register(schema))
    }

    /// Synthesizes and registers a schema for a shape without a sample.
    pub fn add_shape(&mut self, shape: &Shape) -> Result<&Schema> {
        let schema = synthesize_shape(shape, None)?;
        Ok(self.register(schema))
    }

    fn register(&mut self, schema: Schema) -> &Schema {
        let idx = match self.schemas.iter().position(|s| s.name == schema.name) {
            Some(idx) => {
                debug!("Schema for {} already exists", schema.name);
                idx
            }
            None => {
                self.schemas.push(schema);
                self.schemas.len() - 1
            }
        };
        &self.schemas[idx]
    }

    /// Get all generated schemas
    pub fn get_schemas(&self) -> &[Schema] {
        &self.schemas
    }

    /// Moves the generated schemas into `components`, skipping names already declared.
    pub fn merge_into(self, components: &mut Components) {
        for schema in self.schemas {
            if components.schema(&schema.name).is_none() {
                components.schemas.push(schema);
            }
        }
    }
}

impl Default for SchemaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

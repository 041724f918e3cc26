//! Cross-reference resolution and cycle detection.
//!
//! A reference is either a bare name, scoped to the area its usage site expects, or a
//! pointer of the form `#/components/<area>/<name>`. Cycle detection walks the reference
//! graph depth-first while keeping only the keys open on the current path, so a
//! component reused by sibling branches is fine while a component reachable from itself
//! is reported.

use crate::error::{Location, RefError, RefErrorKind};
use crate::model::{
    Area, Definition, Example, Parameter, Property, Request, Response, Schema, SchemaOrRef,
};
use crate::path_template;
use crate::writer::{sorted_codes, sorted_verbs};
use log::debug;

/// A resolved component.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Schema(&'a Schema),
    Request(&'a Request),
    Response(&'a Response),
    Parameter(&'a Parameter),
    Example(&'a Example),
}

/// `#/components/<area>/<name>`
pub fn qualified(area: Area, name: &str) -> String {
    format!("#/components/{}/{}", area, name)
}

/// Canonical `area/name` key used for cycle bookkeeping.
pub fn canonical_key(area: Area, name: &str) -> String {
    format!("{}/{}", area, name)
}

/// Splits a reference into its optional explicit area and its name.
///
/// Returns `None` for pointers that do not have the `#/components/<area>/<name>` form.
pub fn parse_reference(reference: &str) -> Option<(Option<Area>, &str)> {
    match reference.strip_prefix("#/") {
        Some(pointer) => {
            let mut parts = pointer.split('/');
            let (Some("components"), Some(area), Some(name), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return None;
            };
            let area = Area::parse(area)?;
            (!name.is_empty()).then_some((Some(area), name))
        }
        None => (!reference.is_empty() && !reference.contains('/')).then_some((None, reference)),
    }
}

/// The qualified form of `reference` for a usage site expecting `area`.
///
/// Unparsable references come back unchanged.
pub fn qualify(area: Area, reference: &str) -> String {
    match parse_reference(reference) {
        Some((explicit, name)) => qualified(explicit.unwrap_or(area), name),
        None => reference.to_string(),
    }
}

/// Resolves references against one definition.
pub struct Resolver<'a> {
    def: &'a Definition,
}

impl<'a> Resolver<'a> {
    pub fn new(def: &'a Definition) -> Self {
        Self { def }
    }

    /// Looks `reference` up in the collection for `expected`.
    pub fn resolve(
        &self,
        expected: Area,
        reference: &str,
        location: &Location,
    ) -> Result<Target<'a>, RefError> {
        let error = |reference: String, kind: RefErrorKind| RefError {
            reference,
            location: location.clone(),
            kind,
        };

        let Some((explicit, name)) = parse_reference(reference) else {
            return Err(error(reference.to_string(), RefErrorKind::InvalidPointer));
        };
        let full = qualified(explicit.unwrap_or(expected), name);
        if matches!(explicit, Some(area) if area != expected) {
            return Err(error(full, RefErrorKind::AreaMismatch { expected }));
        }

        let Some(components) = self.def.components.as_ref() else {
            return Err(error(full, RefErrorKind::NoComponents));
        };
        let target = match expected {
            Area::Schemas => components.schema(name).map(Target::Schema),
            Area::RequestBodies => components.request(name).map(Target::Request),
            Area::Responses => components.response(name).map(Target::Response),
            Area::Parameters => components.parameter(name).map(Target::Parameter),
            Area::Examples => components.example(name).map(Target::Example),
        };
        target.ok_or_else(|| error(full, RefErrorKind::NotFound))
    }

    /// Cycle check rooted at one component. Only cyclic errors are returned; references
    /// that do not resolve are left to [`Resolver::validate`].
    pub fn check_cycles(&self, area: Area, name: &str, location: &Location) -> Vec<RefError> {
        let mut walk = Walk::new(self, true);
        walk.root(area, name, location, false);
        walk.errors
    }

    /// Whole-document pass collecting every reference error.
    pub fn validate(&self) -> Vec<RefError> {
        let mut errors = Vec::new();

        if let Some(components) = &self.def.components {
            for area in Area::ALL {
                let mut names = components.names(area);
                names.sort_unstable();
                names.dedup();
                for name in names {
                    let location = Location::item(format!("components.{}.{}", area, name));
                    let mut walk = Walk::new(self, true);
                    walk.root(area, name, &location, true);
                    errors.append(&mut walk.errors);
                }
            }
        }

        // Usage sites only check their own references; components cover the graph.
        let mut walk = Walk::new(self, false);
        let mut paths: Vec<_> = self
            .def
            .flatten()
            .into_iter()
            .map(|flat| {
                let doc_path = path_template::document_path(&flat.template)
                    .unwrap_or_else(|_| flat.template.clone());
                (doc_path, flat)
            })
            .collect();
        paths.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.template.cmp(&b.1.template)));
        for (doc_path, flat) in &paths {
            let mut params: Vec<_> = flat.path_params.iter().collect();
            params.sort_by_key(|(name, _)| **name);
            for (name, param) in params {
                if let Some(schema_ref) = &param.schema_ref {
                    let location = Location::path(doc_path, format!("pathParams.{}", name));
                    walk.reference(Area::Schemas, schema_ref, &location, true);
                }
            }

            for (verb, method) in sorted_verbs(flat.methods) {
                let at = |item: &str| Location::operation(doc_path, verb, item);
                if let Some(request) = &method.request {
                    walk.request(request, &at("requestBody"), true);
                }
                for (code, response) in sorted_codes(&method.responses) {
                    walk.response(response, &at(&format!("responses.{}", code)), true);
                }
                for (idx, parameter) in method.parameters.iter().enumerate() {
                    walk.parameter(parameter, &at(&format!("parameters.{}", idx)), true);
                }
            }
        }
        errors.append(&mut walk.errors);

        debug!("Validation found {} reference errors", errors.len());
        errors
    }
}

/// One traversal; `follow` decides whether resolved references are descended into.
struct Walk<'r, 'a> {
    resolver: &'r Resolver<'a>,
    follow: bool,
    open: Vec<String>,
    errors: Vec<RefError>,
}

impl<'r, 'a> Walk<'r, 'a> {
    fn new(resolver: &'r Resolver<'a>, follow: bool) -> Self {
        Self {
            resolver,
            follow,
            open: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn root(&mut self, area: Area, name: &str, location: &Location, owned: bool) {
        let Ok(target) = self.resolver.resolve(area, name, location) else {
            return;
        };
        self.open.push(canonical_key(area, name));
        self.target(target, location, owned);
        self.open.pop();
    }

    /// `owned` marks content that belongs to the traversal root; only there are
    /// unresolved and ambiguous references reported.
    fn reference(&mut self, expected: Area, reference: &str, location: &Location, owned: bool) {
        let target = match self.resolver.resolve(expected, reference, location) {
            Ok(target) => target,
            Err(error) => {
                if owned {
                    self.errors.push(error);
                }
                return;
            }
        };

        let Some((_, name)) = parse_reference(reference) else {
            return;
        };
        let key = canonical_key(expected, name);
        if self.open.contains(&key) {
            debug!("Cycle through {} at {}", key, location);
            self.errors.push(RefError {
                reference: qualified(expected, name),
                location: location.clone(),
                kind: RefErrorKind::Cyclic,
            });
            return;
        }
        if !self.follow {
            return;
        }

        self.open.push(key);
        let inner = Location::item(format!("components.{}.{}", expected, name));
        self.target(target, &inner, false);
        self.open.pop();
    }

    fn ambiguous(&mut self, reference: &str, location: &Location, owned: bool) {
        if owned {
            self.errors.push(RefError {
                reference: qualify(Area::Schemas, reference),
                location: location.clone(),
                kind: RefErrorKind::Ambiguous,
            });
        }
    }

    fn target(&mut self, target: Target<'a>, location: &Location, owned: bool) {
        match target {
            Target::Schema(schema) => self.schema(schema, location, owned),
            Target::Request(request) => self.request(request, location, owned),
            Target::Response(response) => self.response(response, location, owned),
            Target::Parameter(parameter) => self.parameter(parameter, location, owned),
            Target::Example(_) => {}
        }
    }

    fn schema(&mut self, schema: &Schema, location: &Location, owned: bool) {
        for property in &schema.properties {
            let at = location.child(&format!("properties.{}", property.name));
            self.property(property, &at, owned);
        }
        if let Some(items) = &schema.items {
            self.property(items, &location.child("items"), owned);
        }
        if let Some(composition) = &schema.composition {
            for (idx, member) in composition.members.iter().enumerate() {
                let at = location.child(&format!("{}.{}", composition.kind.as_str(), idx));
                match member {
                    SchemaOrRef::Ref(reference) => {
                        self.reference(Area::Schemas, reference, &at, owned)
                    }
                    SchemaOrRef::Inline(inline) => self.schema(inline, &at, owned),
                }
            }
        }
        if let Some(discriminator) = &schema.discriminator {
            for (value, reference) in &discriminator.mapping {
                let at = location.child(&format!("discriminator.mapping.{}", value));
                self.reference(Area::Schemas, reference, &at, owned);
            }
        }
    }

    fn property(&mut self, property: &Property, location: &Location, owned: bool) {
        if let Some(reference) = &property.schema_ref {
            if !property.properties.is_empty() || property.items.is_some() {
                self.ambiguous(reference, location, owned);
            }
            self.reference(Area::Schemas, reference, location, owned);
            return;
        }
        for nested in &property.properties {
            let at = location.child(&format!("properties.{}", nested.name));
            self.property(nested, &at, owned);
        }
        if let Some(items) = &property.items {
            self.property(items, &location.child("items"), owned);
        }
    }

    fn request(&mut self, request: &Request, location: &Location, owned: bool) {
        if let Some(reference) = &request.reference {
            self.reference(Area::RequestBodies, reference, location, owned);
            return;
        }
        self.content(
            request.schema.as_ref(),
            request.schema_ref.as_deref(),
            location,
            owned,
        );
    }

    fn response(&mut self, response: &Response, location: &Location, owned: bool) {
        if let Some(reference) = &response.reference {
            self.reference(Area::Responses, reference, location, owned);
            return;
        }
        self.content(
            response.schema.as_ref(),
            response.schema_ref.as_deref(),
            location,
            owned,
        );
        if let Some(example) = &response.example_ref {
            self.reference(Area::Examples, example, &location.child("example"), owned);
        }
    }

    fn parameter(&mut self, parameter: &Parameter, location: &Location, owned: bool) {
        if let Some(reference) = &parameter.reference {
            self.reference(Area::Parameters, reference, location, owned);
            return;
        }
        if let Some(schema_ref) = &parameter.schema_ref {
            if parameter.data_type.is_some() {
                self.ambiguous(schema_ref, location, owned);
            }
            self.reference(Area::Schemas, schema_ref, &location.child("schema"), owned);
        }
    }

    fn content(
        &mut self,
        schema: Option<&Schema>,
        schema_ref: Option<&str>,
        location: &Location,
        owned: bool,
    ) {
        let at = location.child("schema");
        match (schema, schema_ref) {
            (Some(_), Some(reference)) => self.ambiguous(reference, &at, owned),
            (Some(schema), None) => self.schema(schema, &at, owned),
            (None, Some(reference)) => self.reference(Area::Schemas, reference, &at, owned),
            (None, None) => {}
        }
    }
}

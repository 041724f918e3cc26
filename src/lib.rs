//! openapi-declare - describe an HTTP API once, derive its route table and its OpenAPI
//! document.
//!
//! A [`model::Definition`] holds paths, methods and reusable components. From it the
//! crate derives a flattened route table for an external router ([`routes`]) and a
//! deterministic OpenAPI 3 document in YAML or JSON ([`serializer`]). Component schemas
//! can be written by hand or synthesized from Rust types whose fields carry a small tag
//! language ([`schema_generator`], [`tag`]).
//!
//! # Architecture
//!
//! 1. [`model`] - the in-memory document
//! 2. [`path_template`] - placeholder extraction from route templates
//! 3. [`tag`] - the per-field tag mini-language
//! 4. [`reflect`] - static type descriptions ([`reflect::Describe`])
//! 5. [`schema_generator`] - schema synthesis from descriptions and sample values
//! 6. [`resolver`] - reference resolution and cycle detection
//! 7. [`writer`] - the streaming YAML writer
//! 8. [`serializer`] - document emission to YAML or JSON
//! 9. [`routes`] - route table for the router
//! 10. [`scanner`] and [`type_resolver`] - descriptions read from Rust sources
//!
//! # Example Usage
//!
//! ```
//! use openapi_declare::model::{DataType, Definition, Method, Property, Response, Schema};
//! use openapi_declare::resolver::Resolver;
//! use openapi_declare::routes::routes;
//! use openapi_declare::serializer::serialize_yaml;
//!
//! let mut def = Definition::new("Pet Store", "1.0.0");
//! def.components_mut().schemas.push(
//!     Schema::object("Pet").with_property(Property::new("id", DataType::Integer).required()),
//! );
//! def.add_method(
//!     "/pets/{petId:[0-9]+}",
//!     "get",
//!     Method::new()
//!         .summary("Find pet by ID")
//!         .handler("get_pet")
//!         .response(200, Response::json("A pet", "Pet")),
//! )
//! .unwrap();
//!
//! assert!(Resolver::new(&def).validate().is_empty());
//!
//! let table = routes(&def).unwrap();
//! assert_eq!(table[0].params, vec!["petId"]);
//!
//! let yaml = serialize_yaml(&def).unwrap();
//! assert!(yaml.contains(r#""/pets/{petId}":"#));
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod error;
pub mod model;
pub mod path_template;
pub mod reflect;
pub mod resolver;
pub mod routes;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod tag;
pub mod type_resolver;
pub mod writer;

use crate::error::{Error, Result};
use crate::reflect::{FieldShape, Fields, Kind, Record, Shape};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl ParsedFile {
    /// Parses a single Rust source file.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse_source(path, &content)
    }

    /// Parses source text, attributing errors to `path`.
    pub fn parse_source(path: impl Into<PathBuf>, source: &str) -> Result<ParsedFile> {
        let path = path.into();
        let syntax_tree = syn::parse_file(source).map_err(|e| Error::Parse {
            file: path.clone(),
            message: e.to_string(),
        })?;
        Ok(ParsedFile { path, syntax_tree })
    }
}

/// Parses multiple Rust source files, continuing even if some fail.
pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
    debug!("Parsing {} files", paths.len());
    let results: Vec<Result<ParsedFile>> = paths
        .iter()
        .map(|path| {
            ParsedFile::parse_file(path).map_err(|e| {
                warn!("Failed to parse {}: {}", path.display(), e);
                e
            })
        })
        .collect();

    let success_count = results.iter().filter(|r| r.is_ok()).count();
    debug!(
        "Parsing complete: {} succeeded, {} failed",
        success_count,
        results.len() - success_count
    );
    results
}

/// Type resolver - derives type descriptions from struct and enum definitions in source
pub struct TypeResolver {
    parsed_files: Vec<ParsedFile>,
    /// Cache of resolved top-level types
    type_cache: HashMap<String, Shape>,
    /// Types currently being resolved, to detect recursion
    resolving_stack: Vec<String>,
}

/// Serde attributes that affect wire names
#[derive(Debug, Clone, Default)]
struct SerdeAttributes {
    rename: Option<String>,
    rename_all: Option<String>,
    skip: bool,
}

impl TypeResolver {
    /// Create a new TypeResolver with parsed files
    pub fn new(parsed_files: Vec<ParsedFile>) -> Self {
        debug!("Initializing TypeResolver with {} files", parsed_files.len());
        Self {
            parsed_files,
            type_cache: HashMap::new(),
            resolving_stack: Vec::new(),
        }
    }

    fn items(&self) -> impl Iterator<Item = (&Path, &syn::Item)> {
        self.parsed_files.iter().flat_map(|file| {
            file.syntax_tree
                .items
                .iter()
                .map(move |item| (file.path.as_path(), item))
        })
    }

    /// Find a struct definition by name across all parsed files
    pub fn find_struct_definition(&self, name: &str) -> Option<&syn::ItemStruct> {
        self.items().find_map(|(path, item)| match item {
            syn::Item::Struct(item_struct) if item_struct.ident == name => {
                debug!("Found struct {} in {}", name, path.display());
                Some(item_struct)
            }
            _ => None,
        })
    }

    /// Find an enum definition by name across all parsed files
    pub fn find_enum_definition(&self, name: &str) -> Option<&syn::ItemEnum> {
        self.items().find_map(|(path, item)| match item {
            syn::Item::Enum(item_enum) if item_enum.ident == name => {
                debug!("Found enum {} in {}", name, path.display());
                Some(item_enum)
            }
            _ => None,
        })
    }

    /// Names of all structs with named fields, in file order.
    pub fn struct_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (_, item) in self.items() {
            if let syn::Item::Struct(item_struct) = item {
                let name = item_struct.ident.to_string();
                if matches!(item_struct.fields, syn::Fields::Named(_)) && !names.contains(&name)
                {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Resolve a struct or enum by name
    pub fn resolve_type(&mut self, type_name: &str) -> Option<Shape> {
        if let Some(cached) = self.type_cache.get(type_name) {
            debug!("Type {} found in cache", type_name);
            return Some(cached.clone());
        }

        if self.resolving_stack.iter().any(|n| n == type_name) {
            debug!("Recursive reference to {}", type_name);
            return Some(Shape::new(
                type_name,
                Kind::Struct(Record {
                    name: type_name.to_string(),
                    fields: Fields::Opaque,
                }),
            ));
        }

        self.resolving_stack.push(type_name.to_string());
        let resolved = if let Some(item_struct) = self.find_struct_definition(type_name).cloned() {
            Some(self.struct_shape(&item_struct))
        } else if let Some(item_enum) = self.find_enum_definition(type_name).cloned() {
            Some(Self::enum_shape(&item_enum))
        } else {
            None
        };
        self.resolving_stack.pop();

        match &resolved {
            // Nested results may hold opaque stand-ins for an enclosing type.
            Some(shape) if self.resolving_stack.is_empty() => {
                self.type_cache.insert(type_name.to_string(), shape.clone());
            }
            Some(_) => {}
            None => debug!("Could not resolve type: {}", type_name),
        }
        resolved
    }

    fn struct_shape(&mut self, item_struct: &syn::ItemStruct) -> Shape {
        let name = item_struct.ident.to_string();
        debug!("Parsing struct definition: {}", name);
        let container = parse_serde_attributes(&item_struct.attrs);

        let mut fields = Vec::new();
        if let syn::Fields::Named(named) = &item_struct.fields {
            for field in &named.named {
                let Some(ident) = field.ident.as_ref() else {
                    continue;
                };
                let ident = ident.to_string();
                let attrs = parse_serde_attributes(&field.attrs);
                let rename = if attrs.skip {
                    Some("-".to_string())
                } else {
                    attrs.rename.or_else(|| {
                        container
                            .rename_all
                            .as_deref()
                            .map(|rule| apply_rename_rule(rule, &ident))
                    })
                };

                let shape = self.shape_of(&field.ty);
                fields.push(FieldShape {
                    ident,
                    rename,
                    tag: parse_oas_tag(&field.attrs),
                    shape,
                });
            }
        }

        debug!("Parsed {} fields", fields.len());
        Shape::new(
            name.clone(),
            Kind::Struct(Record {
                name,
                fields: Fields::Eager(fields),
            }),
        )
    }

    fn enum_shape(item_enum: &syn::ItemEnum) -> Shape {
        let name = item_enum.ident.to_string();
        debug!("Parsing enum definition: {}", name);

        if item_enum
            .variants
            .iter()
            .any(|v| !matches!(v.fields, syn::Fields::Unit))
        {
            debug!("Enum {} carries data; described as any value", name);
            return Shape::new(name, Kind::Any);
        }

        let container = parse_serde_attributes(&item_enum.attrs);
        let variants = item_enum
            .variants
            .iter()
            .filter_map(|variant| {
                let ident = variant.ident.to_string();
                let attrs = parse_serde_attributes(&variant.attrs);
                if attrs.skip {
                    return None;
                }
                Some(attrs.rename.unwrap_or_else(|| match container.rename_all.as_deref() {
                    Some(rule) => apply_rename_rule(rule, &ident),
                    None => ident,
                }))
            })
            .collect();
        Shape::new(name, Kind::Enumeration(variants))
    }

    /// Describes a field type.
    fn shape_of(&mut self, ty: &syn::Type) -> Shape {
        match ty {
            syn::Type::Path(type_path) => self.shape_of_path(&type_path.path),
            syn::Type::Reference(reference) => {
                let inner = self.shape_of(&reference.elem);
                Shape::new(format!("&{}", inner.type_name), Kind::Pointer(Box::new(inner)))
            }
            syn::Type::Slice(slice) => {
                let inner = self.shape_of(&slice.elem);
                Shape::new(format!("[{}]", inner.type_name), Kind::Slice(Box::new(inner)))
            }
            syn::Type::Array(array) => {
                let inner = self.shape_of(&array.elem);
                Shape::new(format!("[{}; _]", inner.type_name), Kind::Slice(Box::new(inner)))
            }
            syn::Type::Paren(paren) => self.shape_of(&paren.elem),
            syn::Type::Group(group) => self.shape_of(&group.elem),
            _ => Shape::new("Unknown", Kind::Any),
        }
    }

    fn shape_of_path(&mut self, path: &syn::Path) -> Shape {
        let Some(segment) = path.segments.last() else {
            return Shape::new("Unknown", Kind::Any);
        };
        let type_name = segment.ident.to_string();
        let type_args: Vec<&syn::Type> = match &segment.arguments {
            syn::PathArguments::AngleBracketed(args) => args
                .args
                .iter()
                .filter_map(|arg| match arg {
                    syn::GenericArgument::Type(ty) => Some(ty),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        if let Some(kind) = primitive_kind(&type_name) {
            return Shape::new(type_name, kind);
        }

        let wrap = |this: &mut Self, idx: usize, make: fn(Box<Shape>) -> Kind| {
            let inner = match type_args.get(idx) {
                Some(ty) => this.shape_of(ty),
                None => Shape::new("Unknown", Kind::Any),
            };
            Shape::new(format!("{}<{}>", type_name, inner.type_name), make(Box::new(inner)))
        };

        match type_name.as_str() {
            "Option" | "Box" | "Rc" | "Arc" | "Cow" => wrap(self, 0, Kind::Pointer),
            "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet" => {
                wrap(self, 0, Kind::Slice)
            }
            "HashMap" | "BTreeMap" | "IndexMap" => wrap(self, 1, Kind::Map),
            "Value" => Shape::new(type_name, Kind::Any),
            _ => match self.resolve_type(&type_name) {
                Some(shape) => shape,
                None => {
                    warn!("Could not resolve type: {}", type_name);
                    Shape::new(type_name, Kind::Any)
                }
            },
        }
    }
}

fn primitive_kind(type_name: &str) -> Option<Kind> {
    let kind = match type_name {
        "bool" => Kind::Bool,
        "i8" => Kind::Int(8),
        "i16" => Kind::Int(16),
        "i32" => Kind::Int(32),
        "i64" | "isize" => Kind::Int(64),
        "i128" => Kind::Int(128),
        "u8" => Kind::Uint(8),
        "u16" => Kind::Uint(16),
        "u32" => Kind::Uint(32),
        "u64" | "usize" => Kind::Uint(64),
        "u128" => Kind::Uint(128),
        "f32" => Kind::Float(32),
        "f64" => Kind::Float(64),
        "String" | "str" | "char" | "NaiveDate" | "NaiveTime" | "Uuid" => Kind::String,
        "DateTime" | "NaiveDateTime" | "SystemTime" | "OffsetDateTime" => Kind::DateTime,
        _ => return None,
    };
    Some(kind)
}

/// Skips the value of a meta item this crate does not interpret.
fn skip_meta_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta_value(&inner))?;
    }
    Ok(())
}

/// Parse Serde attributes from field, variant or container attributes
fn parse_serde_attributes(attrs: &[syn::Attribute]) -> SerdeAttributes {
    let mut serde_attrs = SerdeAttributes::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                let value: syn::LitStr = meta.value()?.parse()?;
                debug!("Found serde rename: {}", value.value());
                serde_attrs.rename = Some(value.value());
            } else if meta.path.is_ident("rename_all") && meta.input.peek(syn::Token![=]) {
                let value: syn::LitStr = meta.value()?.parse()?;
                serde_attrs.rename_all = Some(value.value());
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                debug!("Found serde skip");
                serde_attrs.skip = true;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            warn!("Ignoring malformed serde attribute: {}", e);
        }
    }

    serde_attrs
}

/// Reads the tag from `#[oas("...")]` or `#[oas = "..."]`.
fn parse_oas_tag(attrs: &[syn::Attribute]) -> Option<String> {
    for attr in attrs.iter().filter(|a| a.path().is_ident("oas")) {
        match &attr.meta {
            syn::Meta::List(_) => match attr.parse_args::<syn::LitStr>() {
                Ok(lit) => return Some(lit.value()),
                Err(e) => warn!("Ignoring malformed oas attribute: {}", e),
            },
            syn::Meta::NameValue(name_value) => {
                if let syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(lit),
                    ..
                }) = &name_value.value
                {
                    return Some(lit.value());
                }
            }
            syn::Meta::Path(_) => {}
        }
    }
    None
}

fn split_words(ident: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for ch in ident.chars() {
        if ch == '_' || ch == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.extend(ch.to_lowercase());
        } else {
            current.extend(ch.to_lowercase());
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Applies a serde `rename_all` rule to an identifier.
fn apply_rename_rule(rule: &str, ident: &str) -> String {
    let words = split_words(ident);
    match rule {
        "lowercase" => ident.to_lowercase(),
        "UPPERCASE" => ident.to_uppercase(),
        "snake_case" => words.join("_"),
        "SCREAMING_SNAKE_CASE" => words.join("_").to_uppercase(),
        "kebab-case" => words.join("-"),
        "SCREAMING-KEBAB-CASE" => words.join("-").to_uppercase(),
        "PascalCase" => words.iter().map(|w| capitalize(w)).collect(),
        "camelCase" => words
            .iter()
            .enumerate()
            .map(|(idx, w)| if idx == 0 { w.clone() } else { capitalize(w) })
            .collect(),
        _ => {
            warn!("Unknown rename_all rule: {}", rule);
            ident.to_string()
        }
    }
}

use crate::model::Definition;
use crate::resolver::Resolver;
use crate::scanner::FileScanner;
use crate::schema_generator::SchemaGenerator;
use crate::serializer::{serialize, write_to_file, OutputFormat};
use crate::type_resolver::{parse_files, ParsedFile, TypeResolver};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

/// Derive OpenAPI component schemas from annotated Rust structs
#[derive(Parser, Debug)]
#[command(name = "openapi-declare")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Rust source file or directory holding the model types
    #[arg(value_name = "PATH")]
    pub source_path: PathBuf,

    /// Struct to document; repeatable (default: every struct found)
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub types: Vec<String>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Document title
    #[arg(long = "title", default_value = "API")]
    pub title: String,

    /// Document version
    #[arg(long = "api-version", default_value = "1.0.0")]
    pub api_version: String,

    /// Report every unresolved or cyclic reference before emitting
    #[arg(long = "validate")]
    pub validate: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.source_path.exists() {
        anyhow::bail!(
            "Source path does not exist: {}",
            args.source_path.display()
        );
    }

    info!("Source path: {}", args.source_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }
    if args.types.is_empty() {
        info!("Types: all structs");
    } else {
        info!("Types: {}", args.types.join(", "));
    }

    Ok(args)
}

/// Builds the document for the selected types.
///
/// Explicitly requested types must synthesize; when documenting every struct, those that
/// cannot be described are skipped with a warning.
pub fn build_definition(args: &CliArgs, parsed_files: Vec<ParsedFile>) -> Result<Definition> {
    let mut resolver = TypeResolver::new(parsed_files);
    let explicit = !args.types.is_empty();
    let names = if explicit {
        args.types.clone()
    } else {
        resolver.struct_names()
    };

    let mut generator = SchemaGenerator::new();
    for name in &names {
        let shape = resolver
            .resolve_type(name)
            .with_context(|| format!("Type not found: {}", name))?;
        match generator.add_shape(&shape) {
            Ok(schema) => debug!(
                "Generated schema {} with {} properties",
                schema.name,
                schema.properties.len()
            ),
            Err(e) if !explicit => warn!("Skipping {}: {}", name, e),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to describe {}", name));
            }
        }
    }
    info!("Generated {} schemas", generator.get_schemas().len());

    let mut def = Definition::new(args.title.clone(), args.api_version.clone());
    generator.merge_into(def.components_mut());
    Ok(def)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Scanning sources...");
    let scan_result = FileScanner::new(args.source_path.clone())
        .scan()
        .with_context(|| format!("Failed to scan {}", args.source_path.display()))?;
    for warning in &scan_result.warnings {
        warn!("{}", warning);
    }
    if scan_result.rust_files.is_empty() {
        anyhow::bail!("No Rust files found in {}", args.source_path.display());
    }
    info!("Found {} Rust files", scan_result.rust_files.len());

    let parsed_files: Vec<ParsedFile> = parse_files(&scan_result.rust_files)
        .into_iter()
        .filter_map(|r| r.ok())
        .collect();
    if parsed_files.is_empty() {
        anyhow::bail!("Failed to parse any Rust files");
    }

    let def = build_definition(&args, parsed_files)?;

    if args.validate {
        let errors = Resolver::new(&def).validate();
        if !errors.is_empty() {
            for error in &errors {
                eprintln!("{}", error);
            }
            anyhow::bail!("Validation found {} reference errors", errors.len());
        }
        info!("Validation passed");
    }

    let content =
        serialize(&def, args.output_format).context("Failed to serialize OpenAPI document")?;

    match &args.output_path {
        Some(path) => {
            write_to_file(&content, path)?;
            info!("Wrote OpenAPI document to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

//! CLI command implementations
//!
//! Each command loads a fresh registry from the schema directory, so runs
//! never share state with the process-wide registry.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::observability::Logger;
use crate::registry::{SchemaRegistry, StructType};
use crate::schema::{FieldError, SchemaLoader};

use super::args::{Cli, Command};
use super::errors::{CliError, CliErrorCode, CliResult};
use super::io::{read_requests, write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.config.as_deref(), cli.command)
}

/// Run one parsed command, writing its output to stdout
pub fn run_command(config_path: Option<&Path>, cmd: Command) -> CliResult<()> {
    let config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    Logger::set_min_severity(config.severity()?);

    let stdout = io::stdout();
    match cmd {
        Command::Check { schemas } => {
            let summary = check(&schemas, &config)?;
            write_response(&mut stdout.lock(), summary)
        }
        Command::Explain {
            schemas,
            struct_name,
        } => {
            let plan = explain(&schemas, &struct_name, &config)?;
            write_response(&mut stdout.lock(), plan)
        }
        Command::Convert {
            schemas,
            struct_name,
            strict,
        } => {
            let strict = strict || config.strict_deserialize_default;
            convert(&schemas, &struct_name, strict, &config).map(|_| ())
        }
    }
}

/// Load, define and synthesize every schema in `schemas`.
///
/// Returns a summary of the defined types.
pub fn check(schemas: &Path, config: &EngineConfig) -> CliResult<Value> {
    let registry = load_registry(schemas, config)?;
    let names = registry.names();
    for name in &names {
        registry.resolve(name)?.bundle();
    }
    Ok(json!({
        "count": names.len(),
        "structs": names,
    }))
}

/// Per-field shapes and strategies of one struct type
pub fn explain(schemas: &Path, struct_name: &str, config: &EngineConfig) -> CliResult<Value> {
    let registry = load_registry(schemas, config)?;
    let ty = lookup(&registry, struct_name)?;
    let ancestors: Vec<&str> = ty.schema().ancestors().iter().map(|a| &**a).collect();
    Ok(json!({
        "struct": ty.name(),
        "ancestors": ancestors,
        "fields": serde_json::to_value(ty.explain())?,
    }))
}

/// Convert stdin to stdout, one document per line.
///
/// Returns the number of documents converted successfully.
pub fn convert(
    schemas: &Path,
    struct_name: &str,
    strict: bool,
    config: &EngineConfig,
) -> CliResult<usize> {
    let registry = load_registry(schemas, config)?;
    let ty = lookup(&registry, struct_name)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    convert_stream(
        &ty,
        strict,
        config.strict_serialize_default,
        stdin.lock(),
        &mut stdout.lock(),
    )
}

/// Deserialize each input document into `ty` and write its serialization.
///
/// A document that fails to parse or convert produces an error response;
/// the stream continues.
pub fn convert_stream<R: BufRead, W: Write>(
    ty: &Arc<StructType>,
    strict_deserialize: bool,
    strict_serialize: bool,
    input: R,
    out: &mut W,
) -> CliResult<usize> {
    let mut converted = 0;
    for request in read_requests(input) {
        let doc = match request {
            Ok(doc) => doc,
            Err(e) => {
                write_error(out, e.code_str(), e.message())?;
                continue;
            }
        };
        match convert_one(ty, &doc, strict_deserialize, strict_serialize) {
            Ok(data) => {
                write_response(out, data)?;
                converted += 1;
            }
            Err(e) => write_error(out, e.kind().code(), &e.to_string())?,
        }
    }
    Ok(converted)
}

fn convert_one(
    ty: &Arc<StructType>,
    doc: &Value,
    strict_deserialize: bool,
    strict_serialize: bool,
) -> Result<Value, FieldError> {
    let inst = ty.from_json(doc, strict_deserialize)?;
    let wire = inst.serialize(strict_serialize)?;
    wire.to_json().map(Value::Object).ok_or_else(|| {
        FieldError::argument(format!("{} serialized to a value JSON cannot hold", ty.name()))
    })
}

fn load_registry(schemas: &Path, config: &EngineConfig) -> CliResult<Arc<SchemaRegistry>> {
    let registry = SchemaRegistry::with_config(config.clone());
    let mut loader = SchemaLoader::new(schemas);
    loader.load_all()?;
    loader.register_into(&registry)?;
    registry.check_references()?;
    Ok(registry)
}

fn lookup(registry: &SchemaRegistry, name: &str) -> CliResult<Arc<StructType>> {
    registry
        .get(name)
        .ok_or_else(|| CliError::unknown_struct(name, &registry.names()))
}

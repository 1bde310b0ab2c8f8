#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]
//! Compile a search graph against an entity catalogue and print the result.
//!
//! # Examples
//! ```sh
//! cargo run --manifest-path backend/Cargo.toml --bin compile-search -- \
//!     --catalogue catalogue.json --entity contact \
//!     --graph '{"if": ["name", "startswith", "Ada"]}'
//! ```

use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use entity_backend::domain::ValidationErrors;
use entity_backend::domain::query::{SearchCompiler, SearchGraph};
use entity_backend::domain::schema::EntityRegistry;
use entity_backend::telemetry::init_tracing;
use serde::Serialize;
use tracing::info;

/// `compile-search` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "compile-search",
    about = "Compile a JSON search graph into a predicate for one catalogued entity",
    version
)]
struct CliArgs {
    /// Path to the JSON entity catalogue.
    #[arg(long, value_name = "path")]
    catalogue: PathBuf,
    /// Entity the graph is evaluated against.
    #[arg(long, value_name = "name")]
    entity: String,
    /// Search graph JSON. Read from stdin when omitted.
    #[arg(long, value_name = "json")]
    graph: Option<String>,
}

/// Printed outcome of one compilation.
#[derive(Debug, Serialize, PartialEq)]
struct Report {
    predicate: Option<String>,
    order: Vec<String>,
    errors: ValidationErrors,
}

fn compile(registry: EntityRegistry, entity: &str, raw_graph: &str) -> io::Result<Report> {
    let graph = SearchGraph::parse(raw_graph).map_err(|error| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("parse graph: {error}"))
    })?;
    let compiled = SearchCompiler::new(registry).compile(&graph, entity);
    Ok(Report {
        predicate: compiled.predicate.as_ref().map(ToString::to_string),
        order: compiled.order.iter().map(ToString::to_string).collect(),
        errors: compiled.errors,
    })
}

fn read_graph(arg: Option<String>) -> io::Result<String> {
    match arg {
        Some(graph) => Ok(graph),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn main() -> io::Result<()> {
    init_tracing();
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let registry = EntityRegistry::from_file(&args.catalogue).map_err(io::Error::other)?;
    info!(entities = registry.len(), catalogue = %args.catalogue.display(), "catalogue loaded");

    let raw_graph = read_graph(args.graph)?;
    let report = compile(registry, &args.entity, &raw_graph)?;
    let rendered = serde_json::to_string_pretty(&report).map_err(io::Error::other)?;
    println!("{rendered}");

    if report.errors.is_empty() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("search graph has {} invalid entries", report.errors.len()),
        ))
    }
}

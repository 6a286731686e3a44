use crate::cli::{Args, Command, ResourceArgs};
use anyhow::Context;
use clap::Parser;
use rdf_gateway_engine::services::{load_services, load_templates};
use rdf_gateway_engine::{EngineConfig, Endpoints, Engine, SchemaDefinition};
use rdf_gateway_web::ServerConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    init_tracing();

    let matches = Args::parse();
    match matches.command {
        Command::Serve {
            bind,
            port,
            cors,
            resources,
        } => {
            let engine = load_engine(&resources)?;
            rdf_gateway_web::serve(ServerConfig {
                engine: Arc::new(engine),
                bind: Command::bind_address(bind, port),
                cors,
            })
            .await
        }
        Command::Validate { resources } => {
            let engine = load_engine(&resources)?;
            tracing::info!(
                resources = engine.index().all().count(),
                "Schema and services are valid"
            );
            Ok(())
        }
    }
}

/// Installs a formatting subscriber filtered by `RUST_LOG`, then `LOG_LEVEL`, then `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_engine(args: &ResourceArgs) -> anyhow::Result<Engine> {
    let config = EngineConfig::from_env().context("Invalid engine configuration")?;
    let schema = SchemaDefinition::load(&args.resources_dir).with_context(|| {
        format!(
            "Failed to load the schema from {}",
            args.resources_dir.display()
        )
    })?;

    let client = reqwest::Client::new();
    let endpoints = match &args.services_file {
        Some(path) => {
            let services = load_services(path)
                .with_context(|| format!("Failed to load services from {}", path.display()))?;
            Endpoints::from_services(client, &services)?
        }
        None => Endpoints::new(client),
    };

    let templates_dir = args
        .templates_dir
        .clone()
        .or_else(|| {
            args.resources_dir
                .is_dir()
                .then(|| args.resources_dir.clone())
        });
    let templates = match templates_dir {
        Some(dir) => load_templates(&dir)
            .with_context(|| format!("Failed to load templates from {}", dir.display()))?,
        None => HashMap::new(),
    };

    Engine::new(schema, &endpoints, &templates, config).context("Invalid resource configuration")
}

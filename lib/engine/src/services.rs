//! Loads the SPARQL services and query templates that resource types refer to by name.

use crate::error::{ConfigError, SchemaConfigError};
use crate::source::{Credentials, HttpSparqlSource, SparqlSource};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use url::Url;

static TEMPLATE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z].*\.sparql$").expect("valid regex"));

/// A service as declared in the services file.
///
/// ```json
/// { "togogenome": { "url": "https://togogenome.org/sparql", "user": "admin", "password": "..." } }
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    pub url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl Debug for ServiceConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl ServiceConfig {
    /// A bearer token takes precedence over basic credentials.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.token, &self.user) {
            (Some(token), _) => Some(Credentials::Bearer(token.clone())),
            (None, Some(user)) => Some(Credentials::Basic {
                user: user.clone(),
                password: self.password.clone(),
            }),
            (None, None) => None,
        }
    }
}

/// Reads the services file, a JSON object mapping service names to [ServiceConfig]s.
pub fn load_services(path: impl AsRef<Path>) -> Result<BTreeMap<String, ServiceConfig>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Services {
        path: path.display().to_string(),
        source,
    })
}

/// Reads all query templates in `dir`, keyed by file name.
///
/// Only files whose name starts with a letter or a digit and ends with `.sparql` are read.
pub fn load_templates(dir: impl AsRef<Path>) -> Result<HashMap<String, String>, ConfigError> {
    let dir = dir.as_ref();
    let io_error = |path: &Path, source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut templates = HashMap::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !TEMPLATE_FILE.is_match(name) {
            continue;
        }
        let template = std::fs::read_to_string(&path).map_err(|e| io_error(path.as_path(), e))?;
        tracing::debug!(name, "Loaded query template");
        templates.insert(name.to_owned(), template);
    }
    Ok(templates)
}

/// Resolves the endpoint names used by resource types to [SparqlSource]s.
#[derive(Clone, Default)]
pub struct Endpoints {
    client: reqwest::Client,
    sources: HashMap<String, Arc<dyn SparqlSource>>,
}

impl Endpoints {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            sources: HashMap::new(),
        }
    }

    /// Creates one HTTP source per configured service.
    pub fn from_services(
        client: reqwest::Client,
        services: &BTreeMap<String, ServiceConfig>,
    ) -> Result<Self, ConfigError> {
        let mut endpoints = Self::new(client);
        for (name, service) in services {
            let url = Url::parse(&service.url).map_err(|source| ConfigError::InvalidServiceUrl {
                name: name.clone(),
                source,
            })?;
            let source = HttpSparqlSource::with_client(endpoints.client.clone(), url)
                .with_credentials(service.credentials());
            endpoints.insert(name.clone(), Arc::new(source));
        }
        Ok(endpoints)
    }

    /// Registers `source` under `name`, replacing any previous source with that name.
    pub fn insert(&mut self, name: impl Into<String>, source: Arc<dyn SparqlSource>) {
        self.sources.insert(name.into(), source);
    }

    /// Returns the source registered as `endpoint`.
    ///
    /// Unknown names are treated as literal endpoint URLs.
    pub fn resolve(
        &self,
        resource: &str,
        endpoint: &str,
    ) -> Result<Arc<dyn SparqlSource>, SchemaConfigError> {
        if let Some(source) = self.sources.get(endpoint) {
            return Ok(Arc::clone(source));
        }
        let url = Url::parse(endpoint).map_err(|_| SchemaConfigError::UnknownEndpoint {
            resource: resource.to_owned(),
            endpoint: endpoint.to_owned(),
        })?;
        Ok(Arc::new(HttpSparqlSource::with_client(self.client.clone(), url)))
    }
}

impl Debug for Endpoints {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoints")
            .field("services", &self.sources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

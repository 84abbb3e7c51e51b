use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};

use crate::cli::Cli;
use crate::types::StreamOptions;

pub const ENV_BACKEND_URL: &str = "KWIRTH_BACKEND_URL";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:7007/api/kwirthbackstage";

/// Which pods to stream, as asked for on the command line. Empty lists mean
/// "everything available".
#[derive(Debug, Clone, Default)]
pub struct SelectionRequest {
    pub cluster: Option<String>,
    pub namespaces: Vec<String>,
    pub pods: Vec<String>,
    pub containers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub entity: serde_json::Value,
    pub selection: SelectionRequest,
    pub options: StreamOptions,
    pub restart: bool,
    pub list: bool,
    pub download_dir: PathBuf,
    pub http_timeout: Duration,
}

impl Config {
    /// Entity name used in download file names.
    pub fn entity_name(&self) -> &str {
        self.entity
            .pointer("/metadata/name")
            .and_then(|v| v.as_str())
            .unwrap_or("entity")
    }
}

impl TryFrom<Cli> for Config {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> anyhow::Result<Self> {
        let env_url = std::env::var(ENV_BACKEND_URL)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let backend_url = resolve_backend_url(cli.backend_url, env_url);

        let entity = match (&cli.entity, &cli.entity_name) {
            (Some(path), _) => load_entity(path)?,
            (None, Some(reference)) => entity_from_ref(reference)?,
            (None, None) => bail!("Must specify an entity (--entity FILE or --entity-name KIND:NS/NAME)"),
        };

        if cli.max_messages == 0 {
            bail!("--max-messages must be greater than zero");
        }

        Ok(Self {
            backend_url,
            entity,
            selection: SelectionRequest {
                cluster: cli.cluster,
                namespaces: cli.namespace,
                pods: cli.pod,
                containers: cli.container,
            },
            options: StreamOptions {
                timestamp: cli.timestamps,
                follow: !cli.no_follow,
                from_start: cli.from_start,
                max_messages: cli.max_messages,
            },
            restart: cli.restart,
            list: cli.list,
            download_dir: cli.download_dir,
            http_timeout: Duration::from_secs(cli.http_timeout_secs.max(1)),
        })
    }
}

pub fn resolve_backend_url(flag: Option<String>, env: Option<String>) -> String {
    flag.or(env)
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

/// Read a Backstage entity descriptor. YAML is a superset of JSON so both
/// formats go through serde_yaml.
pub fn load_entity(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read entity file {}", path.display()))?;
    parse_entity(&raw).with_context(|| format!("Invalid entity file {}", path.display()))
}

pub fn parse_entity(raw: &str) -> anyhow::Result<serde_json::Value> {
    // catalog files may hold several documents; the first one is the entity
    let doc = serde_yaml::Deserializer::from_str(raw)
        .next()
        .context("entity file is empty")?;
    let value: serde_json::Value = serde::Deserialize::deserialize(doc)?;
    if value.pointer("/metadata/name").and_then(|v| v.as_str()).is_none() {
        bail!("entity has no metadata.name");
    }
    Ok(value)
}

/// Build a minimal entity from `kind:namespace/name` (kind and namespace are
/// optional, defaulting to `component` and `default`).
pub fn entity_from_ref(reference: &str) -> anyhow::Result<serde_json::Value> {
    let (kind, rest) = match reference.split_once(':') {
        Some((kind, rest)) => (kind, rest),
        None => ("component", reference),
    };
    let (namespace, name) = match rest.split_once('/') {
        Some((ns, name)) => (ns, name),
        None => ("default", rest),
    };
    if kind.is_empty() || namespace.is_empty() || name.is_empty() {
        bail!("Invalid entity reference '{}'", reference);
    }

    let mut chars = kind.chars();
    let kind = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    };

    Ok(serde_json::json!({
        "apiVersion": "backstage.io/v1alpha1",
        "kind": kind,
        "metadata": {
            "name": name,
            "namespace": namespace,
        },
    }))
}

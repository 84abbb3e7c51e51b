use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Maximum number of lines kept in the visible ring by default.
pub const LOG_MAX_MESSAGES: usize = 1000;

/// Logical partition of the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Log,
    Ops,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Data,
    Signal,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Request,
    Response,
    Immediate,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Start,
    Stop,
    Command,
    Route,
    #[serde(other)]
    Unknown,
}

/// Permission category attached to an access key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    View,
    Restart,
    #[serde(other)]
    Unknown,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::View => "view",
            Scope::Restart => "restart",
            Scope::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalLevel {
    Info,
    Warning,
    Error,
}

impl SignalLevel {
    pub fn from_wire(level: &str) -> Option<Self> {
        match level.to_ascii_lowercase().as_str() {
            "info" => Some(SignalLevel::Info),
            "warning" => Some(SignalLevel::Warning),
            "error" => Some(SignalLevel::Error),
            _ => None,
        }
    }
}

impl fmt::Display for SignalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalLevel::Info => "info",
            SignalLevel::Warning => "warning",
            SignalLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Opaque, scope-bound credential. Only ever held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKey(String);

impl AccessKey {
    /// Wire form sent in `accessKey` fields.
    pub fn serialize(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessKey(**redacted**)")
    }
}

impl<'de> Deserialize<'de> for AccessKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Serialized(String),
            Structured {
                id: String,
                #[serde(rename = "type")]
                kind: String,
                resources: String,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Serialized(s) => AccessKey(s),
            Raw::Structured {
                id,
                kind,
                resources,
            } => AccessKey(format!("{}|{}|{}", id, kind, resources)),
        })
    }
}

/// Scope to key mapping for one cluster.
///
/// The backend ships this as a JSON string holding an array of `[scope, key]`
/// pairs; a bare array is accepted as well.
#[derive(Debug, Clone, Default)]
pub struct AccessKeys(HashMap<Scope, AccessKey>);

impl AccessKeys {
    pub fn get(&self, scope: Scope) -> Option<&AccessKey> {
        self.0.get(&scope)
    }
}

impl FromIterator<(Scope, AccessKey)> for AccessKeys {
    fn from_iter<T: IntoIterator<Item = (Scope, AccessKey)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for AccessKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Encoded(String),
            Pairs(Vec<(Scope, AccessKey)>),
            // `/start` responses carry an empty object here
            Other(serde::de::IgnoredAny),
        }

        let pairs = match Raw::deserialize(deserializer)? {
            Raw::Encoded(s) => serde_json::from_str::<Vec<(Scope, AccessKey)>>(&s)
                .map_err(serde::de::Error::custom)?,
            Raw::Pairs(pairs) => pairs,
            Raw::Other(_) => Vec::new(),
        };
        Ok(pairs.into_iter().collect())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodData {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub containers: Vec<String>,
}

/// A cluster reachable at a socket endpoint, as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterTarget {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub data: Vec<PodData>,
    #[serde(default, rename = "accessKeys")]
    pub access_keys: AccessKeys,
}

impl ClusterTarget {
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = Vec::new();
        for pod in &self.data {
            if !namespaces.contains(&pod.namespace) {
                namespaces.push(pod.namespace.clone());
            }
        }
        namespaces
    }
}

/// Identity of one log source. Structured so that names containing the
/// separator can't collide.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SourceKey {
    pub namespace: String,
    pub pod: String,
    pub container: String,
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.pod, self.container)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub source: Option<SourceKey>,
    pub kind: MessageType,
    pub text: String,
}

impl LogLine {
    pub fn data(source: SourceKey, text: String) -> Self {
        Self {
            source: Some(source),
            kind: MessageType::Data,
            text,
        }
    }

    /// A line with no source, printed verbatim.
    pub fn notice(kind: MessageType, text: impl Into<String>) -> Self {
        Self {
            source: None,
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalEntry {
    pub level: SignalLevel,
    pub text: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Streaming options passed into `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    pub timestamp: bool,
    pub follow: bool,
    pub from_start: bool,
    pub max_messages: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            timestamp: false,
            follow: true,
            from_start: false,
            max_messages: LOG_MAX_MESSAGES,
        }
    }
}

//! Wire frames exchanged with a Kwirth cluster endpoint.

use serde::{Deserialize, Serialize};

use crate::types::{Action, Channel, Flow, MessageType, Scope};

pub const OBJECTS_PODS: &str = "pods";
pub const VIEW_POD: &str = "pod";
pub const VIEW_CONTAINER: &str = "container";
pub const MSGTYPE_ROUTE: &str = "routemessage";
pub const MSGTYPE_OPS: &str = "opsmessage";
pub const COMMAND_RESTART_POD: &str = "restartpod";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfigData {
    pub timestamp: bool,
    pub previous: bool,
    pub max_messages: usize,
    pub from_start: bool,
}

/// Start request, sent once right after the socket opens.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    pub channel: Channel,
    pub objects: String,
    pub action: Action,
    pub flow: Flow,
    pub instance: String,
    pub access_key: String,
    pub scope: Scope,
    pub view: String,
    pub namespace: String,
    pub group: String,
    pub pod: String,
    pub container: String,
    pub data: InstanceConfigData,
    #[serde(rename = "type")]
    pub kind: MessageType,
}

/// Operations command carried inside a [`RouteMessage`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpsMessage {
    pub msgtype: String,
    pub action: Action,
    pub flow: Flow,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub channel: Channel,
    pub instance: String,
    pub id: String,
    pub access_key: String,
    pub command: String,
    pub namespace: String,
    pub group: String,
    pub pod: String,
    pub container: String,
}

/// Envelope asking the log instance to forward `data` to another channel.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteMessage {
    pub msgtype: String,
    pub access_key: String,
    pub dest_channel: Channel,
    pub action: Action,
    pub flow: Flow,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub channel: Channel,
    pub instance: String,
    pub data: OpsMessage,
}

/// Inbound envelope. Only `type` and `channel` are required; everything else
/// depends on the combination of the two.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub channel: Channel,
    #[serde(default)]
    pub flow: Option<Flow>,
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub pod: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
}

impl InstanceMessage {
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

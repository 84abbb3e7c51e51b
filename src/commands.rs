//! Control-channel commands routed through an established log instance.

use crate::errors::{KwirthError, KwirthResult};
use crate::protocol::{COMMAND_RESTART_POD, MSGTYPE_OPS, MSGTYPE_ROUTE, OpsMessage, RouteMessage};
use crate::session::Selection;
use crate::types::{Action, Channel, ClusterTarget, Flow, MessageType, PodData, Scope};

/// Pods of `cluster` matching both the selected namespaces and pod names.
pub fn selected_pods<'a>(cluster: &'a ClusterTarget, selection: &Selection) -> Vec<&'a PodData> {
    cluster
        .data
        .iter()
        .filter(|p| selection.namespaces.contains(&p.namespace))
        .filter(|p| selection.pods.contains(&p.name))
        .collect()
}

/// One route envelope per selected pod, each wrapping a `restartpod` command.
/// Command ids count up from `first_id`.
pub fn restart_frames(
    cluster: Option<&ClusterTarget>,
    selection: &Selection,
    instance: Option<&str>,
    first_id: u64,
) -> KwirthResult<Vec<RouteMessage>> {
    let cluster = cluster.ok_or_else(|| KwirthError::State("No cluster selected".to_string()))?;
    let key = cluster.access_keys.get(Scope::Restart).ok_or_else(|| {
        KwirthError::State(format!("No restart access key for cluster {}", cluster.name))
    })?;
    let instance = instance.filter(|i| !i.is_empty()).ok_or_else(|| {
        KwirthError::State("No log instance established; start the stream first".to_string())
    })?;

    let access_key = key.serialize().to_string();
    let frames: Vec<RouteMessage> = selected_pods(cluster, selection)
        .into_iter()
        .enumerate()
        .map(|(i, pod)| RouteMessage {
            msgtype: MSGTYPE_ROUTE.to_string(),
            access_key: access_key.clone(),
            dest_channel: Channel::Ops,
            action: Action::Route,
            flow: Flow::Immediate,
            kind: MessageType::Data,
            channel: Channel::Log,
            instance: instance.to_string(),
            data: OpsMessage {
                msgtype: MSGTYPE_OPS.to_string(),
                action: Action::Command,
                flow: Flow::Immediate,
                kind: MessageType::Data,
                channel: Channel::Ops,
                instance: String::new(),
                id: (first_id + i as u64).to_string(),
                access_key: access_key.clone(),
                command: COMMAND_RESTART_POD.to_string(),
                namespace: pod.namespace.clone(),
                group: String::new(),
                pod: pod.name.clone(),
                container: String::new(),
            },
        })
        .collect();
    if frames.is_empty() {
        return Err(KwirthError::State(format!(
            "No pods selected that exist in cluster {}",
            cluster.name
        )));
    }
    Ok(frames)
}

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::commands;
use crate::errors::{KwirthError, KwirthResult};
use crate::protocol::{InstanceConfig, InstanceConfigData, OBJECTS_PODS, VIEW_CONTAINER, VIEW_POD};
use crate::router::{MessageRouter, Routed};
use crate::socket::{ConnectionEvent, Connector, Socket, SocketEvent};
use crate::types::{
    AccessKey, Action, Channel, ClusterTarget, Flow, LogLine, MessageType, Scope, SignalEntry,
    SignalLevel, StreamOptions,
};

pub const SELECT_NAMESPACE_HINT: &str = "Select namespace in order to decide which pod logs to view.";

/// Appended to the visible buffer when a stream is stopped.
pub fn separator() -> String {
    "=".repeat(124)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Paused,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Streaming => "streaming",
            SessionState::Paused => "paused",
            SessionState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Bounded FIFO of visible lines.
#[derive(Debug)]
pub struct MessageRing {
    entries: VecDeque<LogLine>,
    capacity: usize,
}

impl MessageRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: LogLine) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.entries.iter()
    }
}

/// What to stream, chosen from a cluster's pod inventory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub cluster: Option<String>,
    pub namespaces: Vec<String>,
    pub pods: Vec<String>,
    pub containers: Vec<String>,
}

impl Selection {
    /// Build a selection for `cluster`, defaulting empty namespace and pod
    /// lists to everything the cluster exposes. Containers stay as given:
    /// an empty list means whole-pod view.
    pub fn for_cluster(
        cluster: &ClusterTarget,
        namespaces: &[String],
        pods: &[String],
        containers: &[String],
    ) -> Self {
        let namespaces = if namespaces.is_empty() {
            cluster.namespaces()
        } else {
            namespaces.to_vec()
        };

        let pods = if pods.is_empty() {
            let mut names: Vec<String> = Vec::new();
            for pod in cluster.data.iter().filter(|p| namespaces.contains(&p.namespace)) {
                if !names.contains(&pod.name) {
                    names.push(pod.name.clone());
                }
            }
            names
        } else {
            pods.to_vec()
        };

        Self {
            cluster: Some(cluster.name.clone()),
            namespaces,
            pods,
            containers: containers.to_vec(),
        }
    }
}

/// Start request for the current selection.
pub fn instance_config(
    selection: &Selection,
    access_key: &AccessKey,
    options: &StreamOptions,
) -> InstanceConfig {
    let mut containers = Vec::new();
    if !selection.containers.is_empty() {
        for pod in &selection.pods {
            for container in &selection.containers {
                containers.push(format!("{}+{}", pod, container));
            }
        }
    }

    InstanceConfig {
        channel: Channel::Log,
        objects: OBJECTS_PODS.to_string(),
        action: Action::Start,
        flow: Flow::Request,
        instance: String::new(),
        access_key: access_key.serialize().to_string(),
        scope: Scope::View,
        view: if selection.containers.is_empty() {
            VIEW_POD.to_string()
        } else {
            VIEW_CONTAINER.to_string()
        },
        namespace: selection.namespaces.join(","),
        group: String::new(),
        pod: selection.pods.join(","),
        container: containers.join(","),
        data: InstanceConfigData {
            timestamp: options.timestamp,
            previous: false,
            max_messages: options.max_messages,
            from_start: options.from_start,
        },
        kind: MessageType::Signal,
    }
}

/// One log-streaming session against one cluster at a time.
///
/// All mutation happens through `&mut self`, driven by user operations and by
/// [`ConnectionEvent`]s fed in from the socket task.
pub struct StreamingSession<C: Connector> {
    connector: C,
    clusters: Arc<[ClusterTarget]>,
    selection: Selection,
    state: SessionState,
    options: StreamOptions,
    socket: Option<Box<dyn Socket>>,
    router: MessageRouter,
    visible: MessageRing,
    pending: VecDeque<LogLine>,
    signals: Vec<SignalEntry>,
    instance: Option<String>,
    next_command_id: u64,
    // copy of every line made visible, for consumers that print rather than view
    outbox: Option<Vec<LogLine>>,
}

impl<C: Connector> StreamingSession<C> {
    pub fn new(connector: C, clusters: Arc<[ClusterTarget]>) -> Self {
        let options = StreamOptions::default();
        Self {
            connector,
            clusters,
            selection: Selection::default(),
            state: SessionState::Idle,
            options,
            socket: None,
            router: MessageRouter::new(),
            visible: MessageRing::new(options.max_messages),
            pending: VecDeque::new(),
            signals: Vec::new(),
            instance: None,
            next_command_id: 1,
            outbox: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clusters(&self) -> &Arc<[ClusterTarget]> {
        &self.clusters
    }

    pub fn selected_cluster(&self) -> Option<&ClusterTarget> {
        let name = self.selection.cluster.as_deref()?;
        self.clusters.iter().find(|c| c.name == name)
    }

    pub fn visible(&self) -> &MessageRing {
        &self.visible
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn signals(&self) -> &[SignalEntry] {
        &self.signals
    }

    pub fn signals_at(&self, level: SignalLevel) -> impl Iterator<Item = &SignalEntry> {
        self.signals.iter().filter(move |s| s.level == level)
    }

    pub fn has_signals_at(&self, level: SignalLevel) -> bool {
        self.signals.iter().any(|s| s.level == level)
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Streaming | SessionState::Paused)
    }

    fn status(&mut self, level: SignalLevel, text: impl Into<String>) {
        self.signals.push(SignalEntry {
            level,
            text: text.into(),
            timestamp: chrono::Utc::now(),
        });
    }

    /// Surface `err` as an error status entry and hand it back.
    fn record(&mut self, err: KwirthError) -> KwirthError {
        warn!("{}", err);
        self.status(SignalLevel::Error, err.to_string());
        err
    }

    fn state_error(&mut self, msg: &str) -> KwirthError {
        self.record(KwirthError::State(msg.to_string()))
    }

    pub fn clear_status(&mut self, level: SignalLevel) {
        self.signals.retain(|s| s.level != level);
    }

    /// Switch to another cluster. Any running stream is dropped and the
    /// selection starts over.
    pub fn select_cluster(&mut self, name: &str) -> KwirthResult<()> {
        if !self.clusters.iter().any(|c| c.name == name) {
            return Err(self.state_error(&format!("Unknown cluster '{}'", name)));
        }

        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
        if self.state != SessionState::Idle {
            self.state = SessionState::Stopped;
        }
        self.instance = None;
        self.pending.clear();
        self.router.reset();

        self.selection = Selection {
            cluster: Some(name.to_string()),
            ..Default::default()
        };
        self.signals.clear();
        self.visible.clear();
        self.show(LogLine::notice(MessageType::Signal, SELECT_NAMESPACE_HINT));
        debug!("Selected cluster {}", name);
        Ok(())
    }

    /// Replace the namespace/pod/container selection. Not allowed while a
    /// stream is running or paused.
    pub fn select_objects(
        &mut self,
        namespaces: Vec<String>,
        pods: Vec<String>,
        containers: Vec<String>,
    ) -> KwirthResult<()> {
        if self.is_active() {
            return Err(KwirthError::InvalidTransition {
                op: "change selection",
                state: self.state,
            });
        }
        self.selection.namespaces = namespaces;
        self.selection.pods = pods;
        self.selection.containers = containers;
        Ok(())
    }

    /// Play. Opens a new stream from Idle/Stopped, resumes from Paused.
    pub fn start(&mut self, options: StreamOptions) -> KwirthResult<()> {
        match self.state {
            SessionState::Idle | SessionState::Stopped => self.open(options),
            SessionState::Paused => {
                self.resume();
                Ok(())
            }
            SessionState::Streaming => Err(KwirthError::InvalidTransition {
                op: "start",
                state: self.state,
            }),
        }
    }

    fn open(&mut self, options: StreamOptions) -> KwirthResult<()> {
        let clusters = Arc::clone(&self.clusters);
        let Some(cluster) = self
            .selection
            .cluster
            .as_deref()
            .and_then(|name| clusters.iter().find(|c| c.name == name))
        else {
            return Err(self.state_error("No cluster selected"));
        };
        if cluster.access_keys.get(Scope::View).is_none() {
            return Err(self.state_error("No view access key for cluster"));
        }
        if self.selection.pods.is_empty() {
            return Err(self.state_error("No pods selected"));
        }

        self.options = options;
        self.visible.clear();
        self.visible.set_capacity(options.max_messages);
        self.pending.clear();
        self.router.reset();
        self.instance = None;

        match self.connector.connect(&cluster.url) {
            Ok(socket) => {
                info!(
                    "[{}] Opening log stream (connection {})",
                    cluster.name,
                    socket.id()
                );
                self.socket = Some(socket);
                self.state = SessionState::Streaming;
                Ok(())
            }
            Err(e) => {
                self.show(LogLine::notice(
                    MessageType::Data,
                    format!("Error opening log stream: {}", e),
                ));
                Err(self.record(e))
            }
        }
    }

    fn resume(&mut self) {
        while let Some(line) = self.pending.pop_front() {
            self.show(line);
        }
        self.state = SessionState::Streaming;
    }

    pub fn pause(&mut self) -> KwirthResult<()> {
        if self.state != SessionState::Streaming {
            return Err(KwirthError::InvalidTransition {
                op: "pause",
                state: self.state,
            });
        }
        self.state = SessionState::Paused;
        Ok(())
    }

    pub fn stop(&mut self) -> KwirthResult<()> {
        if self.state == SessionState::Idle {
            return Err(KwirthError::InvalidTransition {
                op: "stop",
                state: self.state,
            });
        }
        self.show(LogLine::notice(MessageType::Data, separator()));
        self.pending.clear();
        self.router.reset();
        self.instance = None;
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
        self.state = SessionState::Stopped;
        Ok(())
    }

    /// Ask the backend to restart every selected pod.
    pub fn restart(&mut self) -> KwirthResult<()> {
        let clusters = Arc::clone(&self.clusters);
        let cluster = self
            .selection
            .cluster
            .as_deref()
            .and_then(|name| clusters.iter().find(|c| c.name == name));

        let frames = match commands::restart_frames(
            cluster,
            &self.selection,
            self.instance.as_deref(),
            self.next_command_id,
        ) {
            Ok(frames) => frames,
            Err(e) => return Err(self.record(e)),
        };
        if self.socket.is_none() {
            return Err(self.state_error("No open socket to send commands through"));
        }

        let mut result = Ok(());
        if let Some(socket) = self.socket.as_mut() {
            for frame in &frames {
                let payload = serde_json::to_string(frame)?;
                if let Err(e) = socket.send(payload) {
                    result = Err(e);
                    break;
                }
                info!("Sent restart for pod {}/{}", frame.data.namespace, frame.data.pod);
            }
        }
        self.next_command_id += frames.len() as u64;
        result.map_err(|e| self.record(e))
    }

    /// Apply one event from the socket task. Events from a connection other
    /// than the current one are ignored.
    pub fn on_connection_event(&mut self, ev: ConnectionEvent) {
        let current = self.socket.as_ref().map(|s| s.id());
        if current != Some(ev.connection) {
            debug!("Ignoring event from stale connection {}", ev.connection);
            return;
        }

        match ev.event {
            SocketEvent::Opened => self.on_open(),
            SocketEvent::Frame(raw) => self.on_frame(&raw),
            SocketEvent::Error(text) => {
                self.record(KwirthError::Network(text));
            }
            SocketEvent::Closed => self.on_close(),
        }
    }

    fn on_open(&mut self) {
        let Some(key) = self
            .selected_cluster()
            .and_then(|c| c.access_keys.get(Scope::View))
            .cloned()
        else {
            self.state_error("No view access key for cluster");
            return;
        };

        let config = instance_config(&self.selection, &key, &self.options);
        let result = serde_json::to_string(&config)
            .map_err(KwirthError::from)
            .and_then(|payload| match self.socket.as_mut() {
                Some(socket) => socket.send(payload),
                None => Err(KwirthError::State("socket is closed".to_string())),
            });
        match result {
            Ok(()) => debug!("Sent start request for pods {}", config.pod),
            Err(e) => {
                self.record(e);
            }
        }
    }

    fn on_frame(&mut self, raw: &str) {
        match self.router.route(raw) {
            Routed::Display(lines) => {
                for line in lines {
                    self.deliver(line);
                }
            }
            Routed::Status(entry) => self.signals.push(entry),
            Routed::Established { instance } => {
                info!("Log instance established: {}", instance);
                self.instance = Some(instance);
            }
        }
    }

    /// Append to the visible ring, keeping a copy when capturing output.
    fn show(&mut self, line: LogLine) {
        if let Some(outbox) = self.outbox.as_mut() {
            outbox.push(line.clone());
        }
        self.visible.push(line);
    }

    /// Keep every line that becomes visible until `take_output` drains it.
    /// Unlike the ring, nothing is evicted.
    pub fn capture_output(&mut self) {
        self.outbox.get_or_insert_with(Vec::new);
    }

    /// Lines made visible since the previous call, oldest first.
    pub fn take_output(&mut self) -> Vec<LogLine> {
        self.outbox.as_mut().map(std::mem::take).unwrap_or_default()
    }

    fn deliver(&mut self, line: LogLine) {
        if self.state == SessionState::Paused {
            self.pending.push_back(line);
        } else {
            self.show(line);
        }
    }

    fn on_close(&mut self) {
        info!("Log stream closed");
        self.socket = None;
        self.instance = None;
        self.router.reset();
        // nothing is lost: whatever arrived while paused becomes visible
        while let Some(line) = self.pending.pop_front() {
            self.show(line);
        }
        self.state = SessionState::Stopped;
    }

    /// Render one line the way the log view shows it.
    pub fn format_line(&self, line: &LogLine) -> String {
        let Some(source) = &line.source else {
            return line.text.clone();
        };
        let mut out = String::new();
        if self.selection.pods.len() != 1 {
            out.push_str(&source.pod);
            out.push(' ');
        }
        if self.selection.containers.len() != 1 {
            out.push_str(&source.container);
            out.push(' ');
        }
        out.push_str(&line.text);
        out
    }

    /// The visible buffer as plain text, one line per entry.
    pub fn export_text(&self) -> String {
        let mut out = String::new();
        for line in self.visible.iter() {
            out.push_str(&self.format_line(line));
            out.push('\n');
        }
        out
    }

    pub fn download_file_name(&self, entity_name: &str) -> String {
        format!(
            "{}-{}-{}.txt",
            self.selection.cluster.as_deref().unwrap_or(""),
            self.selection.namespaces.join(","),
            entity_name
        )
    }
}

impl<C: Connector> Drop for StreamingSession<C> {
    fn drop(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
    }
}

use tracing::{debug, warn};

use crate::protocol::InstanceMessage;
use crate::reassembly::LineReassembler;
use crate::types::{Action, Channel, Flow, LogLine, MessageType, SignalEntry, SignalLevel, SourceKey};

/// Where an inbound frame ended up.
#[derive(Debug, Clone)]
pub enum Routed {
    /// Complete lines for the display buffer (possibly none).
    Display(Vec<LogLine>),
    /// An entry for the status list.
    Status(SignalEntry),
    /// The backend acknowledged the start request.
    Established { instance: String },
}

fn entry(level: SignalLevel, text: impl Into<String>) -> SignalEntry {
    SignalEntry {
        level,
        text: text.into(),
        timestamp: chrono::Utc::now(),
    }
}

fn frame_timestamp(value: Option<&serde_json::Value>) -> chrono::DateTime<chrono::Utc> {
    value
        .and_then(|v| match v {
            serde_json::Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&chrono::Utc)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(chrono::DateTime::from_timestamp_millis),
            _ => None,
        })
        .unwrap_or_else(chrono::Utc::now)
}

/// Demultiplexes raw frames by channel and type.
#[derive(Debug)]
pub struct MessageRouter {
    reassembler: LineReassembler,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            reassembler: LineReassembler::new(),
        }
    }

    pub fn reset(&mut self) {
        self.reassembler.reset();
    }

    pub fn route(&mut self, raw: &str) -> Routed {
        let msg = match InstanceMessage::parse(raw) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Discarding malformed frame: {} ({})", e, raw);
                return Routed::Status(entry(
                    SignalLevel::Error,
                    format!("Malformed message received: {}", e),
                ));
            }
        };

        match msg.channel {
            Channel::Log => self.route_log(msg),
            Channel::Ops => {
                debug!("OPS frame: {}", raw);
                Routed::Status(SignalEntry {
                    level: SignalLevel::Warning,
                    text: msg.text.unwrap_or_else(|| raw.to_string()),
                    timestamp: frame_timestamp(msg.timestamp.as_ref()),
                })
            }
            Channel::Unknown => {
                warn!("Invalid channel in message: {}", raw);
                Routed::Status(entry(
                    SignalLevel::Error,
                    "Invalid channel received in message",
                ))
            }
        }
    }

    fn route_log(&mut self, msg: InstanceMessage) -> Routed {
        match msg.kind {
            MessageType::Data => {
                let text = msg.text.unwrap_or_default();
                match msg.pod {
                    Some(pod) if !pod.is_empty() => {
                        let source = SourceKey {
                            namespace: msg.namespace.unwrap_or_default(),
                            pod,
                            container: msg.container.unwrap_or_default(),
                        };
                        let lines = self
                            .reassembler
                            .push(&source, &text)
                            .into_iter()
                            .map(|line| LogLine::data(source.clone(), line))
                            .collect();
                        Routed::Display(lines)
                    }
                    _ => Routed::Display(vec![LogLine::notice(MessageType::Data, text)]),
                }
            }
            MessageType::Signal => {
                if msg.flow == Some(Flow::Response) && msg.action == Some(Action::Start) {
                    return match msg.instance {
                        Some(instance) if !instance.is_empty() => {
                            Routed::Established { instance }
                        }
                        _ => Routed::Status(entry(
                            SignalLevel::Error,
                            msg.text
                                .unwrap_or_else(|| "Start request was not accepted".to_string()),
                        )),
                    };
                }
                let level = msg
                    .level
                    .as_deref()
                    .and_then(SignalLevel::from_wire)
                    .unwrap_or(SignalLevel::Info);
                Routed::Status(SignalEntry {
                    level,
                    text: msg.text.unwrap_or_default(),
                    timestamp: frame_timestamp(msg.timestamp.as_ref()),
                })
            }
            MessageType::Unknown => Routed::Status(entry(
                SignalLevel::Error,
                "Invalid message type received",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(text: &str) -> String {
        serde_json::json!({
            "type": "data", "channel": "log", "instance": "i-1",
            "namespace": "ns1", "pod": "web-0", "container": "app", "text": text,
        })
        .to_string()
    }

    #[test]
    fn test_data_frames_are_reassembled() {
        let mut router = MessageRouter::new();
        assert!(matches!(router.route(&data("hel")), Routed::Display(l) if l.is_empty()));
        match router.route(&data("lo\n")) {
            Routed::Display(lines) => {
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0].text, "hello");
                assert_eq!(lines[0].source.as_ref().unwrap().pod, "web-0");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_start_response_establishes_instance() {
        let mut router = MessageRouter::new();
        let frame = r#"{"type":"signal","channel":"log","flow":"response","action":"start","instance":"abc"}"#;
        assert!(matches!(router.route(frame), Routed::Established { instance } if instance == "abc"));
    }

    #[test]
    fn test_start_response_without_instance_is_error() {
        let mut router = MessageRouter::new();
        let frame = r#"{"type":"signal","channel":"log","flow":"response","action":"start","instance":""}"#;
        match router.route(frame) {
            Routed::Status(e) => assert_eq!(e.level, SignalLevel::Error),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_signal_keeps_level() {
        let mut router = MessageRouter::new();
        let frame = r#"{"type":"signal","channel":"log","level":"warning","text":"pod gone"}"#;
        match router.route(frame) {
            Routed::Status(e) => {
                assert_eq!(e.level, SignalLevel::Warning);
                assert_eq!(e.text, "pod gone");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ops_is_warning_and_unknown_channel_is_error() {
        let mut router = MessageRouter::new();
        let ops = r#"{"type":"data","channel":"ops","text":"restarted"}"#;
        assert!(matches!(router.route(ops), Routed::Status(e) if e.level == SignalLevel::Warning));
        let alarm = r#"{"type":"data","channel":"alarm"}"#;
        assert!(matches!(router.route(alarm), Routed::Status(e) if e.level == SignalLevel::Error));
    }

    #[test]
    fn test_malformed_and_unknown_type() {
        let mut router = MessageRouter::new();
        assert!(matches!(router.route("{not json"), Routed::Status(e) if e.level == SignalLevel::Error));
        let odd = r#"{"type":"metrics","channel":"log"}"#;
        assert!(matches!(router.route(odd), Routed::Status(e) if e.level == SignalLevel::Error));
    }
}

#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use crate::config;
    use crate::errors::{KwirthError, KwirthResult};
    use crate::session::{
        MessageRing, Selection, SessionState, StreamingSession, instance_config, separator,
    };
    use crate::socket::{ConnectionEvent, ConnectionId, Connector, Socket, SocketEvent};
    use crate::types::{ClusterTarget, LogLine, MessageType, SignalLevel, StreamOptions};
    use crate::ui::app::{App, TreeNodeType};
    use crate::utils;
    use clap::Parser;
    use serde_json::{Value, json};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::Arc;

    struct FakeSocket {
        id: ConnectionId,
        sent: Rc<RefCell<Vec<String>>>,
        closed: Rc<Cell<bool>>,
    }

    impl Socket for FakeSocket {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn send(&mut self, frame: String) -> KwirthResult<()> {
            self.sent.borrow_mut().push(frame);
            Ok(())
        }

        fn close(&mut self) {
            self.closed.set(true);
        }
    }

    #[derive(Default)]
    struct FakeConnector {
        next_id: ConnectionId,
        sent: Rc<RefCell<Vec<String>>>,
        closed: Rc<Cell<bool>>,
        urls: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl Connector for FakeConnector {
        fn connect(&mut self, url: &str) -> KwirthResult<Box<dyn Socket>> {
            if self.fail {
                return Err(KwirthError::Network("connection refused".to_string()));
            }
            self.next_id += 1;
            self.urls.borrow_mut().push(url.to_string());
            self.closed.set(false);
            Ok(Box::new(FakeSocket {
                id: self.next_id,
                sent: Rc::clone(&self.sent),
                closed: Rc::clone(&self.closed),
            }))
        }
    }

    struct Harness {
        session: StreamingSession<FakeConnector>,
        sent: Rc<RefCell<Vec<String>>>,
        closed: Rc<Cell<bool>>,
        urls: Rc<RefCell<Vec<String>>>,
    }

    fn clusters() -> Arc<[ClusterTarget]> {
        let raw = json!([
            {
                "name": "prod",
                "url": "ws://kwirth.prod:3883",
                "data": [
                    {"namespace": "ns1", "name": "web-0", "containers": ["app", "sidecar"]},
                    {"namespace": "ns1", "name": "web-1", "containers": ["app"]},
                    {"namespace": "ns2", "name": "db-0", "containers": ["postgres"]}
                ],
                "accessKeys": "[[\"view\",\"vk\"],[\"restart\",\"rk\"]]"
            },
            {
                "name": "dev",
                "url": "ws://kwirth.dev:3883",
                "data": [{"namespace": "ns1", "name": "web-0", "containers": ["app"]}],
                "accessKeys": "[]"
            }
        ]);
        let clusters: Vec<ClusterTarget> = serde_json::from_value(raw).unwrap();
        clusters.into()
    }

    fn harness_with(connector: FakeConnector) -> Harness {
        let sent = Rc::clone(&connector.sent);
        let closed = Rc::clone(&connector.closed);
        let urls = Rc::clone(&connector.urls);
        Harness {
            session: StreamingSession::new(connector, clusters()),
            sent,
            closed,
            urls,
        }
    }

    /// Session on cluster "prod" with ns1/web-0/app selected.
    fn harness() -> Harness {
        let mut h = harness_with(FakeConnector::default());
        h.session.select_cluster("prod").unwrap();
        h.session
            .select_objects(
                vec!["ns1".to_string()],
                vec!["web-0".to_string()],
                vec!["app".to_string()],
            )
            .unwrap();
        h
    }

    fn event(connection: ConnectionId, event: SocketEvent) -> ConnectionEvent {
        ConnectionEvent { connection, event }
    }

    fn frame(connection: ConnectionId, value: Value) -> ConnectionEvent {
        event(connection, SocketEvent::Frame(value.to_string()))
    }

    fn log_data(pod: &str, container: &str, text: &str) -> Value {
        json!({
            "type": "data",
            "channel": "log",
            "namespace": "ns1",
            "pod": pod,
            "container": container,
            "text": text
        })
    }

    fn established(instance: &str) -> Value {
        json!({
            "type": "signal",
            "channel": "log",
            "flow": "response",
            "action": "start",
            "instance": instance,
            "text": "Instance started"
        })
    }

    fn texts(session: &StreamingSession<FakeConnector>) -> Vec<String> {
        session.visible().iter().map(|l| l.text.clone()).collect()
    }

    /// Start, open and establish an instance on connection 1.
    fn streaming() -> Harness {
        let mut h = harness();
        h.session.start(StreamOptions::default()).unwrap();
        h.session.on_connection_event(event(1, SocketEvent::Opened));
        h.session.on_connection_event(frame(1, established("inst-1")));
        h
    }

    #[test]
    fn test_cli_parsing_entity_name() {
        let args = vec!["kwirth-tail", "--entity-name", "component:default/shop"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.entity_name, Some("component:default/shop".to_string()));
        assert!(cli.entity.is_none());
        assert_eq!(cli.max_messages, 1000);
        assert!(!cli.restart);
    }

    #[test]
    fn test_cli_parsing_selection_lists() {
        let args = vec![
            "kwirth-tail",
            "-e",
            "catalog-info.yaml",
            "-n",
            "ns1,ns2",
            "-p",
            "web-0",
            "-c",
            "app,sidecar",
            "--cluster",
            "prod",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.namespace, vec!["ns1", "ns2"]);
        assert_eq!(cli.pod, vec!["web-0"]);
        assert_eq!(cli.container, vec!["app", "sidecar"]);
        assert_eq!(cli.cluster, Some("prod".to_string()));
    }

    #[test]
    fn test_cli_parsing_rejects_both_entity_forms() {
        let args = vec!["kwirth-tail", "-e", "a.yaml", "--entity-name", "shop"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_parsing_options() {
        let args = vec![
            "kwirth-tail",
            "--entity-name",
            "shop",
            "--timestamps",
            "--from-start",
            "--no-follow",
            "--max-messages",
            "50",
            "--restart",
            "-v",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let config = config::Config::try_from(cli).unwrap();
        assert!(config.options.timestamp);
        assert!(config.options.from_start);
        assert!(!config.options.follow);
        assert_eq!(config.options.max_messages, 50);
        assert!(config.restart);
        assert_eq!(config.entity_name(), "shop");
    }

    #[test]
    fn test_config_requires_entity() {
        let cli = Cli::try_parse_from(vec!["kwirth-tail"]).unwrap();
        assert!(config::Config::try_from(cli).is_err());
    }

    #[test]
    fn test_config_rejects_zero_max_messages() {
        let args = vec!["kwirth-tail", "--entity-name", "shop", "--max-messages", "0"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(config::Config::try_from(cli).is_err());
    }

    #[test]
    fn test_resolve_backend_url_precedence() {
        assert_eq!(
            config::resolve_backend_url(Some("http://flag".into()), Some("http://env".into())),
            "http://flag"
        );
        assert_eq!(
            config::resolve_backend_url(None, Some("http://env".into())),
            "http://env"
        );
        assert_eq!(
            config::resolve_backend_url(None, None),
            config::DEFAULT_BACKEND_URL
        );
    }

    #[test]
    fn test_parse_entity_yaml() {
        let raw = "apiVersion: backstage.io/v1alpha1\nkind: Component\nmetadata:\n  name: shop\n  namespace: default\n---\nkind: Other\nmetadata:\n  name: ignored\n";
        let entity = config::parse_entity(raw).unwrap();
        assert_eq!(entity["metadata"]["name"], "shop");
        assert_eq!(entity["kind"], "Component");
    }

    #[test]
    fn test_parse_entity_json_without_name() {
        assert!(config::parse_entity(r#"{"kind":"Component","metadata":{}}"#).is_err());
    }

    #[test]
    fn test_entity_from_ref() {
        let entity = config::entity_from_ref("component:team-a/shop").unwrap();
        assert_eq!(entity["kind"], "Component");
        assert_eq!(entity["metadata"]["namespace"], "team-a");
        assert_eq!(entity["metadata"]["name"], "shop");

        let entity = config::entity_from_ref("shop").unwrap();
        assert_eq!(entity["kind"], "Component");
        assert_eq!(entity["metadata"]["namespace"], "default");

        assert!(config::entity_from_ref("component:ns/").is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(utils::sanitize_file_name("prod-ns1/ns2-shop.txt"), "prod-ns1_ns2-shop.txt");
    }

    #[test]
    fn test_message_ring_evicts_oldest() {
        let mut ring = MessageRing::new(3);
        for i in 0..5 {
            ring.push(LogLine::notice(MessageType::Data, format!("l{}", i)));
        }
        let held: Vec<&str> = ring.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(held, vec!["l2", "l3", "l4"]);

        ring.set_capacity(2);
        let held: Vec<&str> = ring.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(held, vec!["l3", "l4"]);
    }

    #[test]
    fn test_selection_for_cluster_defaults_to_everything() {
        let clusters = clusters();
        let selection = Selection::for_cluster(&clusters[0], &[], &[], &[]);
        assert_eq!(selection.cluster.as_deref(), Some("prod"));
        assert_eq!(selection.namespaces, vec!["ns1", "ns2"]);
        assert_eq!(selection.pods, vec!["web-0", "web-1", "db-0"]);
        assert!(selection.containers.is_empty());

        let selection = Selection::for_cluster(&clusters[0], &["ns2".to_string()], &[], &[]);
        assert_eq!(selection.pods, vec!["db-0"]);
    }

    #[test]
    fn test_instance_config_pod_view() {
        let clusters = clusters();
        let selection = Selection::for_cluster(&clusters[0], &["ns1".to_string()], &[], &[]);
        let key = clusters[0].access_keys.get(crate::types::Scope::View).unwrap();
        let config = instance_config(&selection, key, &StreamOptions::default());
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["view"], "pod");
        assert_eq!(value["pod"], "web-0,web-1");
        assert_eq!(value["container"], "");
        assert_eq!(value["namespace"], "ns1");
        assert_eq!(value["objects"], "pods");
    }

    #[test]
    fn test_stream_end_to_end() {
        let mut h = harness();
        assert_eq!(texts(&h.session).len(), 1); // namespace hint

        h.session.start(StreamOptions::default()).unwrap();
        assert_eq!(h.session.state(), SessionState::Streaming);
        assert_eq!(h.session.visible().len(), 0);
        assert_eq!(h.urls.borrow().as_slice(), ["ws://kwirth.prod:3883"]);
        assert!(h.sent.borrow().is_empty());

        h.session.on_connection_event(event(1, SocketEvent::Opened));
        let start: Value = serde_json::from_str(&h.sent.borrow()[0]).unwrap();
        assert_eq!(start["channel"], "log");
        assert_eq!(start["action"], "start");
        assert_eq!(start["flow"], "request");
        assert_eq!(start["type"], "signal");
        assert_eq!(start["scope"], "view");
        assert_eq!(start["accessKey"], "vk");
        assert_eq!(start["view"], "container");
        assert_eq!(start["namespace"], "ns1");
        assert_eq!(start["pod"], "web-0");
        assert_eq!(start["container"], "web-0+app");
        assert_eq!(start["data"]["maxMessages"], 1000);
        assert_eq!(start["data"]["fromStart"], false);

        h.session.on_connection_event(frame(1, established("inst-1")));
        assert_eq!(h.session.instance(), Some("inst-1"));

        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", "hello\nwor")));
        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", "ld\n")));
        assert_eq!(texts(&h.session), vec!["hello", "world"]);

        let line = h.session.visible().iter().next().unwrap();
        assert_eq!(h.session.format_line(line), "hello");
        assert_eq!(h.session.export_text(), "hello\nworld\n");
    }

    #[test]
    fn test_visible_buffer_is_bounded() {
        let mut h = streaming();
        let text: String = (0..1005).map(|i| format!("line {}\n", i)).collect();
        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", &text)));
        assert_eq!(h.session.visible().len(), 1000);
        assert_eq!(h.session.visible().iter().next().unwrap().text, "line 5");
    }

    #[test]
    fn test_pause_buffers_and_resume_preserves_order() {
        let mut h = streaming();
        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", "a\n")));
        h.session.pause().unwrap();
        assert_eq!(h.session.state(), SessionState::Paused);

        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", "b\nc\n")));
        assert_eq!(texts(&h.session), vec!["a"]);
        assert_eq!(h.session.pending_len(), 2);

        h.session.start(StreamOptions::default()).unwrap();
        assert_eq!(h.session.state(), SessionState::Streaming);
        assert_eq!(texts(&h.session), vec!["a", "b", "c"]);
        assert_eq!(h.session.pending_len(), 0);
        // resuming reuses the open socket
        assert_eq!(h.urls.borrow().len(), 1);
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let mut h = harness();
        assert!(matches!(
            h.session.pause(),
            Err(KwirthError::InvalidTransition { op: "pause", .. })
        ));
        assert!(matches!(
            h.session.stop(),
            Err(KwirthError::InvalidTransition { op: "stop", .. })
        ));

        h.session.start(StreamOptions::default()).unwrap();
        assert!(matches!(
            h.session.start(StreamOptions::default()),
            Err(KwirthError::InvalidTransition { op: "start", .. })
        ));
        assert!(matches!(
            h.session.select_objects(vec![], vec![], vec![]),
            Err(KwirthError::InvalidTransition { .. })
        ));
        assert!(h.session.signals().is_empty());
        assert_eq!(h.session.state(), SessionState::Streaming);
    }

    #[test]
    fn test_start_requires_selection_and_view_key() {
        let mut h = harness_with(FakeConnector::default());
        assert!(matches!(
            h.session.start(StreamOptions::default()),
            Err(KwirthError::State(_))
        ));

        h.session.select_cluster("dev").unwrap();
        h.session
            .select_objects(vec!["ns1".into()], vec!["web-0".into()], vec![])
            .unwrap();
        assert!(matches!(
            h.session.start(StreamOptions::default()),
            Err(KwirthError::State(_))
        ));
        assert!(h.session.has_signals_at(SignalLevel::Error));
        assert!(h.urls.borrow().is_empty());
        assert_eq!(h.session.state(), SessionState::Idle);

        h.session.select_cluster("prod").unwrap();
        assert!(h.session.start(StreamOptions::default()).is_err());
        assert!(h.urls.borrow().is_empty());
    }

    #[test]
    fn test_connect_failure_is_shown() {
        let mut h = harness_with(FakeConnector {
            fail: true,
            ..Default::default()
        });
        h.session.select_cluster("prod").unwrap();
        h.session
            .select_objects(vec!["ns1".into()], vec!["web-0".into()], vec![])
            .unwrap();
        assert!(matches!(
            h.session.start(StreamOptions::default()),
            Err(KwirthError::Network(_))
        ));
        assert!(texts(&h.session)[0].starts_with("Error opening log stream"));
        assert!(h.session.has_signals_at(SignalLevel::Error));
        assert_eq!(h.session.state(), SessionState::Idle);
    }

    #[test]
    fn test_select_unknown_cluster() {
        let mut h = harness();
        assert!(matches!(
            h.session.select_cluster("nope"),
            Err(KwirthError::State(_))
        ));
        assert_eq!(h.session.selection().cluster.as_deref(), Some("prod"));
    }

    #[test]
    fn test_stop_appends_separator_and_closes() {
        let mut h = streaming();
        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", "x\npartial")));
        h.session.stop().unwrap();

        assert_eq!(h.session.state(), SessionState::Stopped);
        assert!(h.closed.get());
        assert_eq!(h.session.instance(), None);
        let last = h.session.visible().iter().last().unwrap();
        assert_eq!(last.text, separator());
        assert_eq!(last.text.len(), 124);
        assert!(last.text.chars().all(|c| c == '='));

        // a late frame from the closed connection is ignored
        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", "late\n")));
        assert_eq!(texts(&h.session), vec!["x".to_string(), separator()]);
    }

    #[test]
    fn test_restart_after_stop_uses_new_connection() {
        let mut h = streaming();
        h.session.stop().unwrap();
        h.session.start(StreamOptions::default()).unwrap();
        assert_eq!(h.urls.borrow().len(), 2);
        assert_eq!(h.session.visible().len(), 0);

        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", "stale\n")));
        assert_eq!(h.session.visible().len(), 0);

        h.session
            .on_connection_event(frame(2, log_data("web-0", "app", "fresh\n")));
        assert_eq!(texts(&h.session), vec!["fresh"]);
    }

    #[test]
    fn test_socket_close_flushes_pending_and_stops() {
        let mut h = streaming();
        h.session.pause().unwrap();
        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", "queued\n")));
        h.session.on_connection_event(event(1, SocketEvent::Closed));

        assert_eq!(h.session.state(), SessionState::Stopped);
        assert_eq!(h.session.instance(), None);
        assert_eq!(texts(&h.session), vec!["queued"]);
    }

    #[test]
    fn test_socket_error_is_recorded() {
        let mut h = streaming();
        h.session
            .on_connection_event(event(1, SocketEvent::Error("reset by peer".into())));
        let errors: Vec<_> = h.session.signals_at(SignalLevel::Error).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].text.contains("reset by peer"));
    }

    #[test]
    fn test_malformed_frame_becomes_error_status() {
        let mut h = streaming();
        h.session
            .on_connection_event(event(1, SocketEvent::Frame("{not json".into())));
        assert!(h.session.has_signals_at(SignalLevel::Error));
        assert_eq!(h.session.visible().len(), 0);
    }

    #[test]
    fn test_signal_frames_go_to_status() {
        let mut h = streaming();
        h.session.on_connection_event(frame(
            1,
            json!({"type": "signal", "channel": "log", "level": "warning", "text": "pod restarted"}),
        ));
        let warnings: Vec<_> = h.session.signals_at(SignalLevel::Warning).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].text, "pod restarted");

        h.session.clear_status(SignalLevel::Warning);
        assert!(!h.session.has_signals_at(SignalLevel::Warning));
    }

    #[test]
    fn test_restart_without_instance_fails() {
        let mut h = harness();
        h.session.start(StreamOptions::default()).unwrap();
        h.session.on_connection_event(event(1, SocketEvent::Opened));

        assert!(matches!(h.session.restart(), Err(KwirthError::State(_))));
        assert!(h.session.has_signals_at(SignalLevel::Error));
        assert_eq!(h.sent.borrow().len(), 1); // only the start request
    }

    #[test]
    fn test_restart_sends_routed_command() {
        let mut h = streaming();
        h.session.restart().unwrap();

        let sent = h.sent.borrow();
        assert_eq!(sent.len(), 2);
        let route: Value = serde_json::from_str(&sent[1]).unwrap();
        assert_eq!(route["msgtype"], "routemessage");
        assert_eq!(route["destChannel"], "ops");
        assert_eq!(route["action"], "route");
        assert_eq!(route["flow"], "immediate");
        assert_eq!(route["type"], "data");
        assert_eq!(route["channel"], "log");
        assert_eq!(route["instance"], "inst-1");
        assert_eq!(route["accessKey"], "rk");

        let ops = &route["data"];
        assert_eq!(ops["msgtype"], "opsmessage");
        assert_eq!(ops["command"], "restartpod");
        assert_eq!(ops["action"], "command");
        assert_eq!(ops["channel"], "ops");
        assert_eq!(ops["instance"], "");
        assert_eq!(ops["namespace"], "ns1");
        assert_eq!(ops["pod"], "web-0");
        assert_eq!(ops["id"], "1");
        drop(sent);

        h.session.restart().unwrap();
        let route: Value = serde_json::from_str(&h.sent.borrow()[2]).unwrap();
        assert_eq!(route["data"]["id"], "2");
    }

    #[test]
    fn test_ops_response_is_a_warning() {
        let mut h = streaming();
        h.session.on_connection_event(frame(
            1,
            json!({"type": "data", "channel": "ops", "text": "Pod web-0 restarted"}),
        ));
        let warnings: Vec<_> = h.session.signals_at(SignalLevel::Warning).collect();
        assert_eq!(warnings[0].text, "Pod web-0 restarted");
        assert_eq!(h.session.visible().len(), 0);
    }

    #[test]
    fn test_format_line_prefixes_with_several_pods() {
        let mut h = harness();
        h.session
            .select_objects(
                vec!["ns1".into()],
                vec!["web-0".into(), "web-1".into()],
                vec![],
            )
            .unwrap();
        h.session.start(StreamOptions::default()).unwrap();
        h.session.on_connection_event(event(1, SocketEvent::Opened));
        h.session
            .on_connection_event(frame(1, log_data("web-1", "app", "ready\n")));

        let line = h.session.visible().iter().next().unwrap();
        assert_eq!(h.session.format_line(line), "web-1 app ready");
    }

    #[test]
    fn test_stream_scenario_joins_chunks_across_frames() {
        let mut h = streaming();
        let start: Value = serde_json::from_str(&h.sent.borrow()[0]).unwrap();
        assert_eq!(start["container"], "web-0+app");

        for chunk in ["hello ", "world\n", "next\n"] {
            h.session
                .on_connection_event(frame(1, log_data("web-0", "app", chunk)));
        }
        assert_eq!(texts(&h.session), vec!["hello world", "next"]);
    }

    #[test]
    fn test_pause_rejected_unless_streaming() {
        let mut h = streaming();
        h.session.pause().unwrap();
        assert!(matches!(
            h.session.pause(),
            Err(KwirthError::InvalidTransition {
                op: "pause",
                state: SessionState::Paused
            })
        ));

        h.session.stop().unwrap();
        assert!(matches!(
            h.session.pause(),
            Err(KwirthError::InvalidTransition {
                op: "pause",
                state: SessionState::Stopped
            })
        ));
        assert_eq!(h.session.state(), SessionState::Stopped);
        assert!(h.session.signals().is_empty());
    }

    #[test]
    fn test_stop_from_paused_discards_pending() {
        let mut h = streaming();
        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", "a\n")));
        h.session.pause().unwrap();
        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", "b\n")));
        assert_eq!(h.session.pending_len(), 1);

        h.session.stop().unwrap();
        assert_eq!(h.session.state(), SessionState::Stopped);
        assert_eq!(h.session.pending_len(), 0);
        assert!(h.closed.get());
        assert_eq!(texts(&h.session), vec!["a".to_string(), separator()]);
    }

    #[test]
    fn test_restart_with_no_matching_pods_fails() {
        let mut h = harness();
        h.session
            .select_objects(vec!["ns1".into()], vec!["typo".into()], vec![])
            .unwrap();
        h.session.start(StreamOptions::default()).unwrap();
        h.session.on_connection_event(event(1, SocketEvent::Opened));
        h.session.on_connection_event(frame(1, established("inst-1")));

        assert!(matches!(h.session.restart(), Err(KwirthError::State(_))));
        assert!(h.session.has_signals_at(SignalLevel::Error));
        assert_eq!(h.sent.borrow().len(), 1); // only the start request
    }

    #[test]
    fn test_captured_output_survives_ring_eviction() {
        let mut h = harness();
        h.session.capture_output();
        h.session.start(StreamOptions::default()).unwrap();
        h.session.on_connection_event(event(1, SocketEvent::Opened));

        let text: String = (0..1005).map(|i| format!("line {}\n", i)).collect();
        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", &text)));
        assert_eq!(h.session.visible().len(), 1000);

        let output = h.session.take_output();
        assert_eq!(output.len(), 1005);
        assert_eq!(output[0].text, "line 0");
        assert_eq!(output[1004].text, "line 1004");
        assert!(h.session.take_output().is_empty());

        h.session.stop().unwrap();
        let output = h.session.take_output();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].text, separator());
    }

    #[test]
    fn test_output_not_kept_unless_captured() {
        let mut h = streaming();
        h.session
            .on_connection_event(frame(1, log_data("web-0", "app", "x\n")));
        assert!(h.session.take_output().is_empty());
    }

    #[test]
    fn test_download_file_name() {
        let mut h = harness();
        h.session
            .select_objects(vec!["ns1".into(), "ns2".into()], vec!["web-0".into()], vec![])
            .unwrap();
        assert_eq!(h.session.download_file_name("shop"), "prod-ns1,ns2-shop.txt");
    }

    fn app() -> App<FakeConnector> {
        let h = harness();
        App::new(
            h.session,
            StreamOptions::default(),
            "shop".to_string(),
            std::env::temp_dir(),
        )
    }

    #[test]
    fn test_app_sidebar_nodes() {
        let app = app();
        let nodes = app.sidebar_nodes();
        assert_eq!(nodes[0], TreeNodeType::Cluster("prod".into()));
        assert_eq!(nodes[1], TreeNodeType::Namespace("ns1".into()));
        assert!(nodes.contains(&TreeNodeType::Pod("ns1".into(), "web-1".into())));
        assert!(nodes.contains(&TreeNodeType::Container("sidecar".into())));
        // only the selected cluster is expanded
        assert_eq!(nodes.last(), Some(&TreeNodeType::Cluster("dev".into())));
    }

    #[test]
    fn test_app_toggle_pod_in_sidebar() {
        let mut app = app();
        app.sidebar_item_types = app.sidebar_nodes();
        let idx = app
            .sidebar_item_types
            .iter()
            .position(|n| *n == TreeNodeType::Pod("ns1".into(), "web-1".into()))
            .unwrap();
        app.sidebar_state.select(Some(idx));
        app.toggle_sidebar_item();
        assert_eq!(app.session.selection().pods, vec!["web-0", "web-1"]);

        app.toggle_sidebar_item();
        assert_eq!(app.session.selection().pods, vec!["web-0"]);
    }

    #[test]
    fn test_app_selection_locked_while_streaming() {
        let mut app = app();
        app.play();
        app.sidebar_item_types = app.sidebar_nodes();
        app.sidebar_state.select(Some(1)); // ns1
        app.toggle_sidebar_item();
        assert_eq!(app.session.selection().namespaces, vec!["ns1"]);
        assert!(app.current_notice().is_some());
    }

    #[test]
    fn test_app_filter_and_pause_toggle() {
        let mut app = app();
        app.play();
        app.on_connection_event(event(1, SocketEvent::Opened));
        app.on_connection_event(frame(1, log_data("web-0", "app", "GET /a\nPOST /b\nget /c\n")));

        app.filter_pattern = "get".to_string();
        let shown: Vec<&str> = app.filtered_logs().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(shown, vec!["GET /a", "get /c"]);

        app.toggle_pause();
        assert_eq!(app.session.state(), SessionState::Paused);
        app.toggle_pause();
        assert_eq!(app.session.state(), SessionState::Streaming);
    }

    #[test]
    fn test_app_download_needs_content() {
        let mut app = app();
        app.download();
        assert_eq!(app.current_notice(), Some("Nothing to download"));
    }

    #[test]
    fn test_app_view_offset_fills_last_page() {
        let mut app = app();
        app.play();
        app.on_connection_event(event(1, SocketEvent::Opened));
        let text: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        app.on_connection_event(frame(1, log_data("web-0", "app", &text)));

        // following: the pane ends at the newest line
        assert_eq!(app.view_offset(10), 20);
        assert_eq!(app.view_offset(50), 0);

        app.auto_scroll = false;
        app.scroll_offset = 29;
        assert_eq!(app.view_offset(10), 20);
        app.scroll_offset = 3;
        assert_eq!(app.view_offset(10), 3);
    }
}

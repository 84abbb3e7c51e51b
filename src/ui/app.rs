use crate::errors::KwirthError;
use crate::session::{SessionState, StreamingSession};
use crate::socket::{ConnectionEvent, Connector};
use crate::types::{LogLine, SignalLevel, StreamOptions};
use crate::utils::write_download;
use ratatui::widgets::ListState;
use regex::Regex;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

const NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    Normal,
    Search,
    Filter,
    Help,
    Status(SignalLevel),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNodeType {
    Cluster(String),
    Namespace(String),
    Pod(String, String), // namespace, pod
    Container(String),
}

pub struct App<C: Connector> {
    pub session: StreamingSession<C>,
    pub options: StreamOptions,
    pub entity_name: String,
    pub download_dir: PathBuf,

    // UI state
    pub sidebar_visible: bool,
    pub sidebar_state: ListState,
    pub sidebar_item_types: Vec<TreeNodeType>,
    pub scroll_offset: usize,
    pub auto_scroll: bool,

    // Search state (/ key - highlights and allows n/N navigation)
    pub search_pattern: String,
    pub search_matches: Vec<usize>,
    pub current_match_index: usize,

    // Filter state (f key - shows only matching lines)
    pub filter_pattern: String,

    pub mode: AppMode,
    pub notice: Option<(String, Instant)>,
    seen_signals: usize,
}

impl<C: Connector> App<C> {
    pub fn new(
        session: StreamingSession<C>,
        options: StreamOptions,
        entity_name: String,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            session,
            options,
            entity_name,
            download_dir,
            sidebar_visible: false,
            sidebar_state: ListState::default(),
            sidebar_item_types: Vec::new(),
            scroll_offset: 0,
            auto_scroll: options.follow,
            search_pattern: String::new(),
            search_matches: Vec::new(),
            current_match_index: 0,
            filter_pattern: String::new(),
            mode: AppMode::Normal,
            notice: None,
            seen_signals: 0,
        }
    }

    pub fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some((text.into(), Instant::now()));
    }

    pub fn current_notice(&self) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|(_, at)| at.elapsed() < NOTICE_TTL)
            .map(|(text, _)| text.as_str())
    }

    /// Operation errors are already on the status list; rejected transitions
    /// only deserve a notice.
    fn report(&mut self, result: Result<(), KwirthError>) {
        if let Err(e) = result {
            self.set_notice(e.to_string());
        }
    }

    pub fn on_connection_event(&mut self, ev: ConnectionEvent) {
        self.session.on_connection_event(ev);
        self.follow_tail();
    }

    /// Keep the newest line in view when following.
    pub fn follow_tail(&mut self) {
        let len = self.filtered_logs().len();
        if self.auto_scroll && self.options.follow {
            self.scroll_offset = len.saturating_sub(1);
        } else if self.scroll_offset >= len {
            self.scroll_offset = len.saturating_sub(1);
        }
    }

    /// Surface new warning/error status entries as a transient notice.
    pub fn update_notice(&mut self) {
        let signals = self.session.signals();
        if signals.len() < self.seen_signals {
            self.seen_signals = signals.len();
            return;
        }
        let latest = signals[self.seen_signals..]
            .iter()
            .rev()
            .find(|s| s.level >= SignalLevel::Warning)
            .map(|s| format!("{}: {}", s.level, s.text));
        self.seen_signals = signals.len();
        if let Some(text) = latest {
            self.set_notice(text);
        }
    }

    pub fn play(&mut self) {
        let result = self.session.start(self.options);
        self.report(result);
        self.follow_tail();
    }

    pub fn toggle_pause(&mut self) {
        let result = match self.session.state() {
            SessionState::Paused => self.session.start(self.options),
            _ => self.session.pause(),
        };
        self.report(result);
        self.follow_tail();
    }

    pub fn stop(&mut self) {
        let result = self.session.stop();
        self.report(result);
        self.follow_tail();
    }

    pub fn restart(&mut self) {
        let result = self.session.restart();
        if result.is_ok() {
            self.set_notice("Restart requested");
        }
        self.report(result);
    }

    pub fn download(&mut self) {
        if self.session.visible().len() <= 1 {
            self.set_notice("Nothing to download");
            return;
        }
        let file_name = self.session.download_file_name(&self.entity_name);
        let content = self.session.export_text();
        match write_download(&self.download_dir, &file_name, &content) {
            Ok(path) => {
                info!("Downloaded log to {}", path.display());
                self.set_notice(format!("Saved {}", path.display()));
            }
            Err(e) => self.set_notice(format!("Download failed: {}", e)),
        }
    }

    pub fn show_status(&mut self, level: SignalLevel) {
        if self.session.has_signals_at(level) {
            self.mode = AppMode::Status(level);
        }
    }

    pub fn clear_status(&mut self, level: SignalLevel) {
        self.session.clear_status(level);
        self.seen_signals = self.session.signals().len();
        self.mode = AppMode::Normal;
    }

    /// Options can only change while no stream is running.
    pub fn toggle_timestamp_option(&mut self) {
        if self.session.is_active() {
            self.set_notice("Stop the stream to change options");
            return;
        }
        self.options.timestamp = !self.options.timestamp;
    }

    pub fn toggle_from_start_option(&mut self) {
        if self.session.is_active() {
            self.set_notice("Stop the stream to change options");
            return;
        }
        self.options.from_start = !self.options.from_start;
    }

    pub fn toggle_follow(&mut self) {
        self.options.follow = !self.options.follow;
        self.auto_scroll = self.options.follow;
        self.follow_tail();
    }

    /// Sidebar tree: every cluster, and under the selected one its
    /// namespaces, pods and container names.
    pub fn sidebar_nodes(&self) -> Vec<TreeNodeType> {
        let mut nodes = Vec::new();
        let selected = self.session.selection().cluster.as_deref();
        for cluster in self.session.clusters().iter() {
            nodes.push(TreeNodeType::Cluster(cluster.name.clone()));
            if selected != Some(cluster.name.as_str()) {
                continue;
            }
            for namespace in cluster.namespaces() {
                nodes.push(TreeNodeType::Namespace(namespace.clone()));
                let mut seen = Vec::new();
                for pod in cluster.data.iter().filter(|p| p.namespace == namespace) {
                    if seen.contains(&pod.name) {
                        continue;
                    }
                    seen.push(pod.name.clone());
                    nodes.push(TreeNodeType::Pod(namespace.clone(), pod.name.clone()));
                }
            }
            let mut containers: Vec<String> = Vec::new();
            for pod in &cluster.data {
                for c in &pod.containers {
                    if !containers.contains(c) {
                        containers.push(c.clone());
                    }
                }
            }
            for c in containers {
                nodes.push(TreeNodeType::Container(c));
            }
        }
        nodes
    }

    pub fn toggle_sidebar_item(&mut self) {
        let Some(node) = self
            .sidebar_state
            .selected()
            .and_then(|idx| self.sidebar_item_types.get(idx))
            .cloned()
        else {
            return;
        };

        if let TreeNodeType::Cluster(name) = &node {
            if self.session.selection().cluster.as_deref() != Some(name.as_str()) {
                let result = self.session.select_cluster(name);
                self.report(result);
                self.scroll_offset = 0;
            }
            return;
        }

        let mut selection = self.session.selection().clone();
        match node {
            TreeNodeType::Namespace(ns) => {
                if let Some(pos) = selection.namespaces.iter().position(|n| *n == ns) {
                    selection.namespaces.remove(pos);
                    let dropped: Vec<String> = self
                        .session
                        .selected_cluster()
                        .map(|c| {
                            c.data
                                .iter()
                                .filter(|p| p.namespace == ns)
                                .map(|p| p.name.clone())
                                .collect()
                        })
                        .unwrap_or_default();
                    selection.pods.retain(|p| !dropped.contains(p));
                } else {
                    selection.namespaces.push(ns);
                }
            }
            TreeNodeType::Pod(ns, pod) => {
                if let Some(pos) = selection.pods.iter().position(|p| *p == pod) {
                    selection.pods.remove(pos);
                } else {
                    selection.pods.push(pod);
                    if !selection.namespaces.contains(&ns) {
                        selection.namespaces.push(ns);
                    }
                }
            }
            TreeNodeType::Container(name) => {
                if let Some(pos) = selection.containers.iter().position(|c| *c == name) {
                    selection.containers.remove(pos);
                } else {
                    selection.containers.push(name);
                }
            }
            TreeNodeType::Cluster(_) => {}
        }

        let result = self.session.select_objects(
            selection.namespaces,
            selection.pods,
            selection.containers,
        );
        self.report(result);
    }

    pub fn is_node_selected(&self, node: &TreeNodeType) -> bool {
        let selection = self.session.selection();
        match node {
            TreeNodeType::Cluster(name) => selection.cluster.as_deref() == Some(name.as_str()),
            TreeNodeType::Namespace(ns) => selection.namespaces.contains(ns),
            TreeNodeType::Pod(_, pod) => selection.pods.contains(pod),
            TreeNodeType::Container(c) => selection.containers.contains(c),
        }
    }

    pub fn filtered_logs(&self) -> Vec<&LogLine> {
        let filter_regex = if !self.filter_pattern.is_empty() {
            // Make filter case-insensitive by default (prepend (?i))
            let pattern = format!("(?i){}", self.filter_pattern);
            Regex::new(&pattern).ok()
        } else {
            None
        };

        self.session
            .visible()
            .iter()
            .filter(|line| match &filter_regex {
                Some(re) => re.is_match(&line.text),
                None => true,
            })
            .collect()
    }

    /// First line to draw in a pane `height` rows tall. The last page is
    /// always full, and while following it ends at the newest line.
    pub fn view_offset(&self, height: usize) -> usize {
        let last_page = self.filtered_logs().len().saturating_sub(height);
        if self.auto_scroll && self.options.follow {
            last_page
        } else {
            self.scroll_offset.min(last_page)
        }
    }

    pub fn update_search_matches(&mut self) {
        self.search_matches.clear();

        if self.search_pattern.is_empty() {
            return;
        }

        let pattern = format!("(?i){}", self.search_pattern);
        let Ok(regex) = Regex::new(&pattern) else {
            return;
        };

        // Search within filtered logs
        let filtered = self.filtered_logs();
        self.search_matches = filtered
            .iter()
            .enumerate()
            .filter(|(_, line)| regex.is_match(&line.text))
            .map(|(idx, _)| idx)
            .collect();

        self.current_match_index = 0;
    }

    pub fn jump_to_next_match(&mut self) {
        if self.search_matches.is_empty() {
            return;
        }
        self.current_match_index = (self.current_match_index + 1) % self.search_matches.len();
        self.scroll_offset = self.search_matches[self.current_match_index];
        self.auto_scroll = false;
    }

    pub fn jump_to_prev_match(&mut self) {
        if self.search_matches.is_empty() {
            return;
        }
        if self.current_match_index == 0 {
            self.current_match_index = self.search_matches.len() - 1;
        } else {
            self.current_match_index -= 1;
        }
        self.scroll_offset = self.search_matches[self.current_match_index];
        self.auto_scroll = false;
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
        self.auto_scroll = false;
    }

    pub fn scroll_down(&mut self) {
        let max_offset = self.filtered_logs().len().saturating_sub(1);
        if self.scroll_offset < max_offset {
            self.scroll_offset += 1;
        } else {
            self.auto_scroll = true;
        }
    }

    pub fn page_up(&mut self, page_size: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(page_size);
        self.auto_scroll = false;
    }

    pub fn page_down(&mut self, page_size: usize) {
        let max_offset = self.filtered_logs().len().saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + page_size).min(max_offset);
        if self.scroll_offset >= max_offset {
            self.auto_scroll = true;
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
        self.auto_scroll = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.filtered_logs().len().saturating_sub(1);
        self.auto_scroll = true;
    }

    pub fn sidebar_select_next(&mut self) {
        if self.sidebar_item_types.is_empty() {
            return;
        }
        let i = match self.sidebar_state.selected() {
            Some(i) if i + 1 < self.sidebar_item_types.len() => i + 1,
            _ => 0,
        };
        self.sidebar_state.select(Some(i));
    }

    pub fn sidebar_select_previous(&mut self) {
        if self.sidebar_item_types.is_empty() {
            return;
        }
        let i = match self.sidebar_state.selected() {
            Some(0) | None => self.sidebar_item_types.len() - 1,
            Some(i) => i - 1,
        };
        self.sidebar_state.select(Some(i));
    }

    pub fn active_filters(&self) -> Vec<String> {
        let mut filters = Vec::new();
        if !self.filter_pattern.is_empty() {
            filters.push(format!("filter: {}", self.filter_pattern));
        }
        if !self.search_pattern.is_empty() {
            filters.push(format!("search: {}", self.search_pattern));
        }
        filters
    }
}

use crate::session::SessionState;
use crate::types::{LogLine, MessageType, SignalEntry, SignalLevel};
use crate::ui::app::TreeNodeType;
use crate::utils::get_color;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, StatefulWidget, Widget, Wrap},
};
use regex::Regex;

/// Cluster / namespace / pod / container picker.
pub struct PodList<'a> {
    nodes: &'a [TreeNodeType],
    selected: Vec<bool>,
    locked: bool,
}

impl<'a> PodList<'a> {
    /// `selected[i]` tells whether `nodes[i]` is part of the current
    /// selection; `locked` greys the tree out while a stream is running.
    pub fn new(nodes: &'a [TreeNodeType], selected: Vec<bool>, locked: bool) -> Self {
        Self {
            nodes,
            selected,
            locked,
        }
    }
}

impl<'a> StatefulWidget for PodList<'a> {
    type State = ratatui::widgets::ListState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let items: Vec<ListItem> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| {
                let on = self.selected.get(idx).copied().unwrap_or(false);
                let checkbox = if on { "[x]" } else { "[ ]" };
                let (text, color, bold) = match node {
                    TreeNodeType::Cluster(name) => {
                        let icon = if on { "▼" } else { "▶" };
                        (format!("{} {}", icon, name), Color::Cyan, true)
                    }
                    TreeNodeType::Namespace(ns) => {
                        (format!("  {} {}", checkbox, ns), Color::Blue, true)
                    }
                    TreeNodeType::Pod(_, pod) => {
                        (format!("    {} {}", checkbox, pod), Color::Green, false)
                    }
                    TreeNodeType::Container(name) => {
                        (format!("  {} container {}", checkbox, name), Color::Magenta, false)
                    }
                };

                let mut style = if on || matches!(node, TreeNodeType::Cluster(_)) {
                    Style::default().fg(color)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                if bold {
                    style = style.add_modifier(Modifier::BOLD);
                }
                if self.locked && !matches!(node, TreeNodeType::Cluster(_)) {
                    style = style.add_modifier(Modifier::DIM);
                }
                ListItem::new(text).style(style)
            })
            .collect();

        let title = if self.locked { "Objects (locked)" } else { "Objects" };
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::RIGHT))
            .highlight_style(
                Style::default()
                    .add_modifier(Modifier::REVERSED)
                    .fg(Color::Yellow)
                    .bg(Color::DarkGray),
            )
            .highlight_symbol("→ ");

        StatefulWidget::render(list, area, buf, state);
    }
}

pub struct LogView<'a> {
    logs: Vec<&'a LogLine>,
    scroll_offset: usize,
    search_pattern: &'a str,
    show_pod: bool,
    show_container: bool,
}

impl<'a> LogView<'a> {
    pub fn new(
        logs: Vec<&'a LogLine>,
        scroll_offset: usize,
        search_pattern: &'a str,
        show_pod: bool,
        show_container: bool,
    ) -> Self {
        Self {
            logs,
            scroll_offset,
            search_pattern,
            show_pod,
            show_container,
        }
    }

    fn format_log_line<'b>(&self, msg: &'b LogLine) -> Line<'b> {
        let mut spans = Vec::new();

        if let Some(source) = &msg.source {
            if self.show_pod {
                spans.push(Span::styled(
                    source.pod.as_str(),
                    Style::default().fg(get_color(&source.pod)),
                ));
                spans.push(Span::raw(" "));
            }
            if self.show_container {
                spans.push(Span::styled(
                    source.container.as_str(),
                    Style::default().fg(Color::Blue),
                ));
                spans.push(Span::raw(" "));
            }
        } else if msg.kind != MessageType::Data {
            spans.push(Span::styled(
                msg.text.as_str(),
                Style::default().fg(Color::DarkGray),
            ));
            return Line::from(spans);
        }

        // Add log line with highlighting if search pattern is active
        if !self.search_pattern.is_empty() {
            // Make search case-insensitive by default (prepend (?i))
            let pattern = format!("(?i){}", self.search_pattern);
            if let Ok(regex) = Regex::new(&pattern) {
                let mut last_end = 0;
                for mat in regex.find_iter(&msg.text) {
                    if mat.start() > last_end {
                        spans.push(Span::raw(&msg.text[last_end..mat.start()]));
                    }
                    spans.push(Span::styled(
                        mat.as_str(),
                        Style::default()
                            .fg(Color::Black)
                            .bg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ));
                    last_end = mat.end();
                }
                if last_end < msg.text.len() {
                    spans.push(Span::raw(&msg.text[last_end..]));
                }
            } else {
                // Invalid regex, just show the line
                spans.push(Span::raw(msg.text.as_str()));
            }
        } else {
            spans.push(Span::raw(msg.text.as_str()));
        }

        Line::from(spans)
    }
}

impl<'a> Widget for LogView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines: Vec<Line> = self
            .logs
            .iter()
            .map(|msg| self.format_log_line(msg))
            .collect();

        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll_offset as u16, 0));

        paragraph.render(area, buf);
    }
}

pub struct StatusBar<'a> {
    pub cluster: Option<&'a str>,
    pub state: SessionState,
    pub buffer_lines: usize,
    pub pending_lines: usize,
    pub signal_counts: [usize; 3],
    pub active_filters: &'a [String],
    pub auto_scroll: bool,
    pub notice: Option<&'a str>,
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let filters_str = if self.active_filters.is_empty() {
            "none".to_string()
        } else {
            self.active_filters.join(", ")
        };

        let [info, warning, error] = self.signal_counts;
        let status_parts = [
            format!("Cluster: {}", self.cluster.unwrap_or("none")),
            format!("State: {}", self.state),
            format!("Buffer: {} lines", self.buffer_lines),
            format!("Status: {}i {}w {}e", info, warning, error),
            format!("Filters: {}", filters_str),
        ];

        let mut status_text = status_parts.join(" | ");

        if self.state == SessionState::Paused {
            status_text.push_str(&format!(" | [PAUSED +{}]", self.pending_lines));
        }
        if self.auto_scroll {
            status_text.push_str(" | [AUTO]");
        }
        if let Some(notice) = self.notice {
            status_text.push_str(" | ");
            status_text.push_str(notice);
        }

        status_text.push_str(" | ? for help");

        let bg = if error > 0 { Color::Red } else { Color::DarkGray };
        let paragraph = Paragraph::new(status_text).style(Style::default().bg(bg).fg(Color::White));

        paragraph.render(area, buf);
    }
}

/// Centered rectangle of at most `width` x `height` inside `area`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;
    Rect {
        x: area.x + x,
        y: area.y + y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Status entries of one level.
pub struct StatusDialog<'a> {
    level: SignalLevel,
    entries: Vec<&'a SignalEntry>,
}

impl<'a> StatusDialog<'a> {
    pub fn new(level: SignalLevel, entries: Vec<&'a SignalEntry>) -> Self {
        Self { level, entries }
    }
}

impl<'a> Widget for StatusDialog<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let color = match self.level {
            SignalLevel::Info => Color::Cyan,
            SignalLevel::Warning => Color::Yellow,
            SignalLevel::Error => Color::Red,
        };

        let mut lines: Vec<Line> = self
            .entries
            .iter()
            .map(|entry| {
                Line::from(vec![
                    Span::styled(
                        format!("{} ", entry.timestamp.format("%H:%M:%S")),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::raw(entry.text.as_str()),
                ])
            })
            .collect();
        lines.push(Line::from(""));
        lines.push(Line::from("x - clear these entries, any other key - close"));

        let dialog_area = centered(area, area.width.saturating_sub(10).max(40), lines.len() as u16 + 2);
        Clear.render(dialog_area, buf);

        let block = Block::default()
            .title(format!("Status: {}", self.level))
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Black).fg(color));

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .style(Style::default().bg(Color::Black).fg(Color::White));

        paragraph.render(dialog_area, buf);
    }
}

pub struct HelpOverlay;

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let help_lines = vec![
            "Keyboard Shortcuts",
            "",
            "  q/Q/Ctrl-C  - Quit",
            "  Enter       - Start streaming",
            "  p           - Pause/Resume",
            "  S           - Stop",
            "  R           - Restart selected pods",
            "  d           - Download visible log",
            "  i/w/e       - Show info/warning/error status",
            "",
            "Options (while stopped):",
            "  t           - Toggle backend timestamps",
            "  o           - Toggle from start",
            "  a           - Toggle follow",
            "",
            "Search & Filter:",
            "  /           - Search (highlights matches, use n/N to navigate)",
            "  n/N         - Jump to next/previous search match",
            "  f           - Filter (show only matching lines)",
            "",
            "Navigation:",
            "  s           - Toggle object sidebar",
            "  ↑/↓         - Navigate sidebar (when open) or scroll logs",
            "  Space       - Select cluster / toggle namespace, pod, container",
            "  PgUp/PgDn   - Page scroll (logs)",
            "  Home/End    - Jump to top/bottom (logs)",
            "  g/G         - Jump to top/bottom (logs, vim-style)",
            "",
            "Press any key to close",
        ];

        let lines: Vec<Line> = help_lines.iter().map(|s| Line::from(*s)).collect();

        let help_area = centered(area, 70, help_lines.len() as u16 + 2);

        // Clear the area to make it opaque
        Clear.render(help_area, buf);

        let block = Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Black).fg(Color::White));

        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left)
            .style(Style::default().bg(Color::Black).fg(Color::White));

        paragraph.render(help_area, buf);
    }
}

use crate::socket::Connector;
use crate::types::SignalLevel;
use crate::ui::app::{App, AppMode};
use crate::ui::layout::{create_layout, input_bar_area};
use crate::ui::widgets::{HelpOverlay, LogView, PodList, StatusBar, StatusDialog};
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::Alignment,
    style::{Color, Style},
    text::Span,
    widgets::{Block, Borders, Clear, Paragraph},
};

pub fn render<B: Backend, C: Connector>(
    terminal: &mut Terminal<B>,
    app: &mut App<C>,
) -> std::io::Result<()> {
    terminal.draw(|f| render_frame(f, app))?;
    Ok(())
}

fn render_frame<C: Connector>(f: &mut Frame, app: &mut App<C>) {
    let layout = create_layout(f.area(), app.sidebar_visible);
    f.render_widget(header(app), layout.header);

    if app.sidebar_visible {
        app.sidebar_item_types = app.sidebar_nodes();
        if let Some(idx) = app.sidebar_state.selected()
            && idx >= app.sidebar_item_types.len()
        {
            app.sidebar_state
                .select(app.sidebar_item_types.len().checked_sub(1));
        }
        let selected = app
            .sidebar_item_types
            .iter()
            .map(|node| app.is_node_selected(node))
            .collect();
        let pod_list = PodList::new(
            &app.sidebar_item_types,
            selected,
            app.session.is_active(),
        );
        f.render_stateful_widget(pod_list, layout.sidebar, &mut app.sidebar_state);
    }

    let selection = app.session.selection();
    let log_view = LogView::new(
        app.filtered_logs(),
        app.view_offset(layout.main.height as usize),
        &app.search_pattern,
        selection.pods.len() != 1,
        selection.containers.len() != 1,
    );
    f.render_widget(log_view, layout.main);

    let active_filters = app.active_filters();
    let signal_counts = [SignalLevel::Info, SignalLevel::Warning, SignalLevel::Error]
        .map(|level| app.session.signals_at(level).count());
    let status_bar = StatusBar {
        cluster: selection.cluster.as_deref(),
        state: app.session.state(),
        buffer_lines: app.session.visible().len(),
        pending_lines: app.session.pending_len(),
        signal_counts,
        active_filters: &active_filters,
        auto_scroll: app.auto_scroll,
        notice: app.current_notice(),
    };
    f.render_widget(status_bar, layout.status_bar);

    match &app.mode {
        AppMode::Help => f.render_widget(HelpOverlay, f.area()),
        AppMode::Status(level) => {
            let entries = app.session.signals_at(*level).collect();
            f.render_widget(StatusDialog::new(*level, entries), f.area());
        }
        AppMode::Search => render_input_bar(
            f,
            "Search (Enter to apply, Esc to cancel)",
            format!("Search: {}_", app.search_pattern),
            Color::Yellow,
        ),
        AppMode::Filter => render_input_bar(
            f,
            "Filter (Enter to apply, Esc to cancel)",
            format!("Filter: {}_", app.filter_pattern),
            Color::Cyan,
        ),
        AppMode::Normal => {}
    }
}

/// Entity, namespaces and the options the next start will use.
fn header<C: Connector>(app: &App<C>) -> Paragraph<'static> {
    let selection = app.session.selection();
    let mut flags = Vec::new();
    if app.options.timestamp {
        flags.push("timestamps");
    }
    if app.options.from_start {
        flags.push("from start");
    }
    if app.options.follow {
        flags.push("follow");
    }
    let text = format!(
        " {} | namespaces: {} | options: {}",
        app.entity_name,
        if selection.namespaces.is_empty() {
            "-".to_string()
        } else {
            selection.namespaces.join(",")
        },
        if flags.is_empty() {
            "-".to_string()
        } else {
            flags.join(", ")
        },
    );
    Paragraph::new(text).style(Style::default().fg(Color::Black).bg(Color::Cyan))
}

fn render_input_bar(f: &mut Frame, title: &str, text: String, color: Color) {
    let area = input_bar_area(f.area());

    // Clear the area to make it opaque
    f.render_widget(Clear, area);

    let widget = Paragraph::new(Span::styled(text, Style::default().fg(color)))
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().fg(color)),
        )
        .alignment(Alignment::Left);

    f.render_widget(widget, area);
}

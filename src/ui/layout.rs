use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub struct AppLayout {
    pub header: Rect,
    pub sidebar: Rect,
    pub main: Rect,
    pub status_bar: Rect,
}

/// Header row, optional sidebar next to the log view, status bar at the bottom.
pub fn create_layout(area: Rect, sidebar_visible: bool) -> AppLayout {
    let [header, body, status_bar] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(area);

    let (sidebar, main) = if sidebar_visible {
        let [sidebar, main] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(48), Constraint::Min(1)])
            .areas(body);
        (sidebar, main)
    } else {
        (Rect::default(), body)
    };

    AppLayout {
        header,
        sidebar,
        main,
        status_bar,
    }
}

/// Three-row bar at the bottom of the screen for search and filter input.
pub fn input_bar_area(area: Rect) -> Rect {
    let [_, bar] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .areas(area);
    bar
}

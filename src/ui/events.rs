use crate::socket::{ConnectionEvent, Connector};
use crate::types::SignalLevel;
use crate::ui::app::{App, AppMode};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Connection(ConnectionEvent),
    Tick,
}

pub async fn event_loop(tx: mpsc::Sender<AppEvent>) {
    use crossterm::event::EventStream;

    let mut event_stream = EventStream::new();
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(250));

    loop {
        tokio::select! {
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if tx.send(AppEvent::Key(key)).await.is_err() {
                            break;
                        }
                    }
                    Some(_) => {}
                    None => break,
                }
            }
            _ = tick_interval.tick() => {
                if tx.send(AppEvent::Tick).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Returns false when the app should quit.
pub fn handle_key_event<C: Connector>(app: &mut App<C>, key: KeyEvent) -> bool {
    match app.mode.clone() {
        AppMode::Normal => handle_normal_mode(app, key),
        AppMode::Search => handle_search_mode(app, key),
        AppMode::Filter => handle_filter_mode(app, key),
        AppMode::Help => handle_help_mode(app, key),
        AppMode::Status(level) => handle_status_mode(app, key, level),
    }
}

fn handle_normal_mode<C: Connector>(app: &mut App<C>, key: KeyEvent) -> bool {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _)
        | (KeyCode::Char('Q'), _)
        | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            return false;
        }
        (KeyCode::Enter, _) => app.play(),
        (KeyCode::Char('p'), _) => app.toggle_pause(),
        (KeyCode::Char('S'), _) => app.stop(),
        (KeyCode::Char('R'), _) => app.restart(),
        (KeyCode::Char('d'), _) => app.download(),
        (KeyCode::Char('i'), _) => app.show_status(SignalLevel::Info),
        (KeyCode::Char('w'), _) => app.show_status(SignalLevel::Warning),
        (KeyCode::Char('e'), _) => app.show_status(SignalLevel::Error),
        (KeyCode::Char('s'), _) => {
            app.sidebar_visible = !app.sidebar_visible;
            if app.sidebar_visible && app.sidebar_state.selected().is_none() {
                app.sidebar_state.select(Some(0));
            }
        }
        (KeyCode::Char('t'), _) => app.toggle_timestamp_option(),
        (KeyCode::Char('o'), _) => app.toggle_from_start_option(),
        (KeyCode::Char('a'), _) => app.toggle_follow(),
        (KeyCode::Char('/'), _) => {
            app.mode = AppMode::Search;
            app.search_pattern.clear();
        }
        (KeyCode::Char('f'), _) => {
            app.mode = AppMode::Filter;
            app.filter_pattern.clear();
        }
        (KeyCode::Char('?'), _) => {
            app.mode = AppMode::Help;
        }
        (KeyCode::Char('n'), _) => app.jump_to_next_match(),
        (KeyCode::Char('N'), _) => app.jump_to_prev_match(),
        (KeyCode::Up, _) => {
            if app.sidebar_visible {
                app.sidebar_select_previous();
            } else {
                app.scroll_up();
            }
        }
        (KeyCode::Down, _) => {
            if app.sidebar_visible {
                app.sidebar_select_next();
            } else {
                app.scroll_down();
            }
        }
        (KeyCode::PageUp, _) => app.page_up(20),
        (KeyCode::PageDown, _) => app.page_down(20),
        (KeyCode::Home, _) | (KeyCode::Char('g'), _) => app.scroll_to_top(),
        (KeyCode::End, _) | (KeyCode::Char('G'), _) => app.scroll_to_bottom(),
        (KeyCode::Char(' '), _) if app.sidebar_visible => app.toggle_sidebar_item(),
        _ => {}
    }
    true
}

fn handle_search_mode<C: Connector>(app: &mut App<C>, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.mode = AppMode::Normal;
            app.search_pattern.clear();
            app.search_matches.clear();
        }
        KeyCode::Enter => {
            app.mode = AppMode::Normal;
            app.update_search_matches();
        }
        KeyCode::Char(c) => {
            app.search_pattern.push(c);
        }
        KeyCode::Backspace => {
            app.search_pattern.pop();
        }
        _ => {}
    }
    true
}

fn handle_filter_mode<C: Connector>(app: &mut App<C>, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.mode = AppMode::Normal;
            app.filter_pattern.clear();
        }
        KeyCode::Enter => {
            app.mode = AppMode::Normal;
            // Filter is applied automatically in filtered_logs()
            app.follow_tail();
        }
        KeyCode::Char(c) => {
            app.filter_pattern.push(c);
        }
        KeyCode::Backspace => {
            app.filter_pattern.pop();
        }
        _ => {}
    }
    true
}

fn handle_help_mode<C: Connector>(app: &mut App<C>, _key: KeyEvent) -> bool {
    app.mode = AppMode::Normal;
    true
}

fn handle_status_mode<C: Connector>(app: &mut App<C>, key: KeyEvent, level: SignalLevel) -> bool {
    match key.code {
        KeyCode::Char('x') => app.clear_status(level),
        _ => app.mode = AppMode::Normal,
    }
    true
}

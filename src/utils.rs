use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

fn color_index(s: &str, len: usize) -> usize {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    let hash = hasher.finish() as u32;
    (hash % len as u32) as usize
}

/// Generate a TUI color for a string based on hash.
pub fn get_color(s: &str) -> ratatui::style::Color {
    use ratatui::style::Color;
    let colors = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::LightRed,
        Color::LightGreen,
        Color::LightBlue,
        Color::LightYellow,
        Color::LightMagenta,
        Color::LightCyan,
    ];
    colors[color_index(s, colors.len())]
}

/// Same palette for plain terminal output.
pub fn get_crossterm_color(s: &str) -> crossterm::style::Color {
    use crossterm::style::Color;
    let colors = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::AnsiValue(91), // Bright Red
        Color::AnsiValue(92), // Bright Green
        Color::AnsiValue(94), // Bright Blue
        Color::AnsiValue(93), // Bright Yellow
        Color::AnsiValue(95), // Bright Magenta
        Color::AnsiValue(96), // Bright Cyan
    ];
    colors[color_index(s, colors.len())]
}

/// Replace path separators so a generated name stays a single file name.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

/// Write exported log text into `dir`, returning the file written.
pub fn write_download(dir: &Path, file_name: &str, content: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(sanitize_file_name(file_name));
    std::fs::write(&path, content)?;
    Ok(path)
}

use ratatui::style::{Color, Modifier, Style};

use foodsave_core::NotificationLevel;

// Color palette
pub const PRIMARY: Color = Color::Rgb(46, 139, 87);
pub const SECONDARY: Color = Color::Rgb(96, 160, 96);
pub const ACCENT: Color = Color::Rgb(222, 150, 50);
pub const ERROR: Color = Color::Rgb(192, 64, 64);
pub const INFO: Color = Color::Rgb(64, 128, 192);
pub const MUTED: Color = Color::Rgb(128, 128, 128);
pub const HIGHLIGHT: Color = Color::Rgb(40, 56, 48);
pub const FAVORITE: Color = Color::Rgb(220, 53, 69);

// Styles
pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn highlight_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn price_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn favorite_style(active: bool) -> Style {
    if active {
        Style::default().fg(FAVORITE)
    } else {
        muted_style()
    }
}

pub fn badge_style() -> Style {
    Style::default()
        .bg(ERROR)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

pub fn chip_style(active: bool) -> Style {
    if active {
        Style::default()
            .fg(PRIMARY)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        muted_style()
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(PRIMARY)
    } else {
        Style::default().fg(MUTED)
    }
}

pub fn search_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(32, 36, 34)).fg(Color::White)
}

pub fn help_key_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    Style::default().fg(Color::White)
}

/// Border and text color for a toast.
pub fn notification_style(level: NotificationLevel) -> Style {
    let color = match level {
        NotificationLevel::Success => SECONDARY,
        NotificationLevel::Info => INFO,
        NotificationLevel::Warning => ACCENT,
        NotificationLevel::Error => ERROR,
    };
    Style::default().fg(color)
}

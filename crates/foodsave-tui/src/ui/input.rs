//! Keyboard input handling for the TUI.
//!
//! Each `AppState` gets its own handler; overlays swallow every key they do
//! not use.

use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use foodsave_core::catalog::QuickFilter;

use crate::app::{App, AppState, FilterRow, PriceField};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    let now = Instant::now();

    match app.state {
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            Ok(false)
        }
        AppState::ShowingCart => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('c') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            Ok(false)
        }
        AppState::Searching => {
            handle_search_input(app, key, now);
            Ok(false)
        }
        AppState::EditingPrice(field) => {
            handle_price_input(app, field, key, now);
            Ok(false)
        }
        AppState::Filters => {
            handle_filter_input(app, key, now);
            Ok(false)
        }
        AppState::Normal => handle_normal_input(app, key),
        AppState::Quitting => Ok(true),
    }
}

fn handle_normal_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,

        // Navigation
        KeyCode::Left => app.move_selection(-1),
        KeyCode::Right => app.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-app.row_step()),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(app.row_step()),
        KeyCode::Home => app.selection = 0,
        KeyCode::End => {
            app.selection = app.controller.items().len().saturating_sub(1);
        }

        // Item actions
        KeyCode::Char('a') | KeyCode::Enter => app.add_selected_to_cart(),
        KeyCode::Char('h') => app.toggle_selected_favorite(),
        KeyCode::Char('c') => app.open_cart(),
        KeyCode::Char('m') => app.load_more(),
        KeyCode::Char('v') => app.toggle_view_mode(),

        // Filtering
        KeyCode::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            app.set_quick_filter(QuickFilter::ALL[index]);
        }
        KeyCode::Char('s') => app.cycle_sort(),
        KeyCode::Char('/') => app.state = AppState::Searching,
        KeyCode::Char('f') | KeyCode::Tab => app.state = AppState::Filters,
        KeyCode::Char('x') => app.clear_filters(),
        KeyCode::Char('r') => app.reload(),
        _ => {}
    }
    Ok(false)
}

fn handle_filter_input(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab | KeyCode::Char('f') => app.state = AppState::Normal,
        KeyCode::Up | KeyCode::Char('k') => app.move_filter_cursor(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_filter_cursor(1),
        KeyCode::Char(' ') => app.activate_filter_row(now),
        KeyCode::Enter => match app.filter_rows().get(app.filter_cursor) {
            Some(FilterRow::MinPrice | FilterRow::MaxPrice) => app.activate_filter_row(now),
            _ => app.apply_filters_now(),
        },
        KeyCode::Char('x') => app.clear_filters(),
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        _ => {}
    }
}

fn handle_price_input(app: &mut App, field: PriceField, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Enter | KeyCode::Tab => app.finish_price_edit(),
        KeyCode::Esc => app.cancel_price_edit(),
        KeyCode::Backspace => app.pop_price_char(field, now),
        KeyCode::Char(c) => app.push_price_char(field, c, now),
        _ => {}
    }
}

fn handle_search_input(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Enter => app.finish_search(),
        KeyCode::Esc => app.cancel_search(),
        KeyCode::Backspace => app.pop_search_char(now),
        KeyCode::Char(c) => app.push_search_char(c, now),
        _ => {}
    }
}

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use foodsave_core::catalog::{LoadMoreState, QuickFilter, ViewMode};
use foodsave_core::{DistanceLabel, ItemCard};

use crate::app::{App, AppState, FilterRow, PriceField, GRID_COLUMNS};

use super::styles;

/// Height of one card in grid view, borders included.
const CARD_HEIGHT: u16 = 6;

/// Width of the filter panel.
const FILTER_PANEL_WIDTH: u16 = 30;

/// Most toasts shown at once.
const MAX_TOASTS: usize = 3;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Quick filters, sort, view
            Constraint::Min(10),   // Filters + items
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_chips(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::ShowingCart => render_cart_overlay(frame, app),
        _ => {}
    }

    render_notifications(frame, app);
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  FoodSave";

    let search = if matches!(app.state, AppState::Searching) {
        Span::styled(format!("  Search: {}_", app.search_input), styles::search_style())
    } else if app.search_input.is_empty() {
        Span::styled("  [/] Search", styles::muted_style())
    } else {
        Span::styled(format!("  Search: {}", app.search_input), styles::muted_style())
    };

    let mut right = vec![Span::styled("[c] Cart ", styles::muted_style())];
    if app.badge.is_visible() {
        right.push(Span::styled(format!(" {} ", app.badge.text()), styles::badge_style()));
    }
    right.push(Span::styled("  [?] Help", styles::muted_style()));

    let used: usize = title.len()
        + search.content.chars().count()
        + right.iter().map(|s| s.content.chars().count()).sum::<usize>();
    let padding = (area.width as usize).saturating_sub(used + 2);

    let mut spans = vec![Span::styled(title, styles::title_style()), search];
    spans.push(Span::raw(" ".repeat(padding)));
    spans.extend(right);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_chips(frame: &mut Frame, app: &App, area: Rect) {
    let filters = app.controller.filters();

    let mut spans = vec![Span::raw(" ")];
    for (i, quick) in QuickFilter::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, quick.label());
        spans.push(Span::styled(label, styles::chip_style(filters.quick == *quick)));
    }

    let sort = filters.sort.map(|s| s.label()).unwrap_or("Default");
    let view = match app.view_mode {
        ViewMode::Grid => "Grid",
        ViewMode::List => "List",
    };
    let right = vec![
        Span::styled("[s]ort: ", styles::muted_style()),
        Span::styled(sort, styles::highlight_style()),
        Span::styled(" | [v]iew: ", styles::muted_style()),
        Span::styled(view, styles::highlight_style()),
    ];

    let left_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let right_width: usize = right.iter().map(|s| s.content.chars().count()).sum();
    let padding = (area.width as usize).saturating_sub(left_width + right_width + 1);
    spans.push(Span::raw(" ".repeat(padding)));
    spans.extend(right);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(FILTER_PANEL_WIDTH), Constraint::Min(20)])
        .split(area);

    render_filter_panel(frame, app, chunks[0]);

    if let Some(message) = app.controller.loading_message() {
        render_loading(frame, message, chunks[1]);
        return;
    }
    if app.controller.items().is_empty() {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border_style(false));
        let paragraph = Paragraph::new(Line::from(Span::styled(
            " No items match these filters",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(paragraph, chunks[1]);
        return;
    }

    match app.view_mode {
        ViewMode::Grid => render_grid(frame, app, chunks[1]),
        ViewMode::List => render_list(frame, app, chunks[1]),
    }
}

fn render_loading(frame: &mut Frame, message: &str, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  ⟳ {}", message), styles::highlight_style())),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_filter_panel(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.state, AppState::Filters | AppState::EditingPrice(_));
    let rows = app.filter_rows();
    let categories = app.controller.categories();
    let vendors = app.controller.vendors();

    let mut lines = Vec::new();
    let mut cursor_line = 0;
    for (i, row) in rows.iter().enumerate() {
        // Section headers
        match row {
            FilterRow::Category(0) => {
                lines.push(Line::from(Span::styled(" Categories", styles::highlight_style())))
            }
            FilterRow::Vendor(0) => {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(" Vendors", styles::highlight_style())));
            }
            FilterRow::Distance => lines.push(Line::from("")),
            _ => {}
        }

        let text = match row {
            FilterRow::Category(idx) => {
                let option = &categories[*idx];
                checkbox(app.draft.categories.contains(&option.value), &option.label)
            }
            FilterRow::Vendor(idx) => {
                let option = &vendors[*idx];
                checkbox(app.draft.vendors.contains(&option.value), &option.label)
            }
            FilterRow::Distance => {
                let radius = app
                    .draft
                    .distance
                    .map(|r| format!("≤ {}", r))
                    .unwrap_or_else(|| "Any".to_string());
                format!(" Distance: {}", radius)
            }
            FilterRow::MinPrice => price_row(app, PriceField::Min),
            FilterRow::MaxPrice => price_row(app, PriceField::Max),
        };

        if i == app.filter_cursor {
            cursor_line = lines.len();
        }
        let style = if focused && i == app.filter_cursor {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        lines.push(Line::from(Span::styled(text, style)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" [x] Clear all", styles::muted_style())));

    let block = Block::default()
        .title(" Filters [f] ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    // Keep the cursor row on screen
    let inner_height = area.height.saturating_sub(2) as usize;
    let scroll = (cursor_line + 1).saturating_sub(inner_height) as u16;

    let paragraph = Paragraph::new(lines).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn checkbox(checked: bool, label: &str) -> String {
    format!(" [{}] {}", if checked { "x" } else { " " }, label)
}

fn price_row(app: &App, field: PriceField) -> String {
    let name = match field {
        PriceField::Min => "Min price",
        PriceField::Max => "Max price",
    };
    if app.state == AppState::EditingPrice(field) {
        return format!(" {}: {}_", name, app.price_input);
    }
    let value = match field {
        PriceField::Min => app.draft.min_price,
        PriceField::Max => app.draft.max_price,
    };
    match value {
        Some(price) => format!(" {}: {}", name, price),
        None => format!(" {}: -", name),
    }
}

fn distance_span(label: &DistanceLabel) -> Span<'static> {
    let style = if label.is_muted() {
        styles::muted_style()
    } else {
        styles::list_item_style()
    };
    Span::styled(format!("📍 {}", label), style)
}

fn heart_span(favorite: bool) -> Span<'static> {
    let icon = if favorite { "♥" } else { "♡" };
    Span::styled(icon, styles::favorite_style(favorite))
}

fn price_text(item: &ItemCard) -> String {
    format!("{} ₽", item.price.round_dp(2))
}

/// Card lines shared by grid and list rendering.
fn item_decorations(app: &App, index: usize) -> (DistanceLabel, bool) {
    let distance = app
        .distances
        .get(index)
        .cloned()
        .unwrap_or(DistanceLabel::Detecting);
    let favorite = app.favorites.get(index).copied().unwrap_or(false);
    (distance, favorite)
}

fn render_grid(frame: &mut Frame, app: &App, area: Rect) {
    let items = app.controller.items();
    let visible_rows = (area.height / CARD_HEIGHT).max(1) as usize;
    let selected_row = app.selection / GRID_COLUMNS;
    let first_row = selected_row.saturating_sub(visible_rows - 1);

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(CARD_HEIGHT); visible_rows])
        .split(area);

    for (offset, row_area) in row_areas.iter().enumerate() {
        let row = first_row + offset;
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, GRID_COLUMNS as u32); GRID_COLUMNS])
            .split(*row_area);

        for (col, cell) in cells.iter().enumerate() {
            let index = row * GRID_COLUMNS + col;
            let Some(item) = items.get(index) else {
                return;
            };
            render_card(frame, app, item, index, *cell);
        }
    }
}

fn render_card(frame: &mut Frame, app: &App, item: &ItemCard, index: usize, area: Rect) {
    let selected = index == app.selection && app.state == AppState::Normal;
    let (distance, favorite) = item_decorations(app, index);

    let mut title_line = vec![heart_span(favorite), Span::raw(" ")];
    title_line.push(Span::styled(
        item.name.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ));

    let lines = vec![
        Line::from(title_line),
        Line::from(Span::styled(price_text(item), styles::price_style())),
        Line::from(distance_span(&distance)),
        Line::from(if item.offer_id.is_some() {
            Span::styled("[a] Add to cart", styles::muted_style())
        } else {
            Span::styled("No active offer", styles::muted_style())
        }),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(selected));
    let block = if selected {
        block.style(styles::selected_style())
    } else {
        block
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.state == AppState::Normal;
    let items: Vec<ListItem> = app
        .controller
        .items()
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let (distance, favorite) = item_decorations(app, index);
            ListItem::new(Line::from(vec![
                Span::raw(" "),
                heart_span(favorite),
                Span::raw(" "),
                Span::styled(format!("{:<32}", item.name), styles::list_item_style()),
                Span::styled(format!("{:>12}", price_text(item)), styles::price_style()),
                Span::raw("   "),
                distance_span(&distance),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .highlight_style(styles::selected_style());

    let mut state = ListState::default();
    state.select(Some(app.selection));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shown = app.controller.items().len();
    let left_text = match app.controller.results_count() {
        Some(count) => format!(" {} items found ({} shown) ", count, shown),
        None => format!(" {} items ", shown),
    };

    let center_text = match app.controller.load_more_state() {
        LoadMoreState::Ready => "[m] Load more",
        LoadMoreState::Loading => "Loading...",
        LoadMoreState::Exhausted => "",
    };

    let right_text = if app.is_busy() {
        " ⟳ | [r]eload | [q]uit "
    } else {
        " [r]eload | [q]uit "
    };

    let width = area.width as usize;
    let center_start = (width.saturating_sub(center_text.len())) / 2;
    let left_pad = center_start.saturating_sub(left_text.chars().count());
    let right_start = center_start + center_text.len();
    let right_pad = width
        .saturating_sub(right_start)
        .saturating_sub(right_text.chars().count());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(left_pad)),
        Span::styled(center_text, styles::highlight_style()),
        Span::raw(" ".repeat(right_pad)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    // No inline images in a terminal; show where the picture lives instead
    let image_line = match app.selected_image_url() {
        Some(url) => Line::from(Span::styled(format!(" Image: {}", url), styles::muted_style())),
        None => Line::from(""),
    };
    let paragraph =
        Paragraph::new(vec![status_line, image_line]).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

/// Toasts stacked in the top-right corner, newest last.
fn render_notifications(frame: &mut Frame, app: &App) {
    let active = app.notifications.active(Utc::now());
    let screen = frame.area();
    let width = 40.min(screen.width);

    let start = active.len().saturating_sub(MAX_TOASTS);
    for (slot, notification) in active[start..].iter().enumerate() {
        let y = screen.y + 1 + slot as u16 * 3;
        if y + 3 > screen.height {
            break;
        }
        let area = Rect::new(screen.x + screen.width - width, y, width, 3);
        let style = styles::notification_style(notification.level);

        frame.render_widget(Clear, area);
        let block = Block::default()
            .title(format!(" {} ", notification.level.label()))
            .borders(Borders::ALL)
            .border_style(style);
        let paragraph = Paragraph::new(Line::from(Span::styled(
            format!(" {}", notification.message),
            style,
        )))
        .block(block);
        frame.render_widget(paragraph, area);
    }
}

fn render_cart_overlay(frame: &mut Frame, app: &App) {
    let height = (app.cart_view.len() as u16 + 6).clamp(8, 24);
    let area = centered_rect_fixed(56, height, frame.area());

    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from(Span::styled(" Cart", styles::highlight_style()))];
    if app.cart_view.is_empty() {
        lines.push(Line::from(Span::styled("  Your cart is empty", styles::muted_style())));
    }
    for item in &app.cart_view {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<30}", item.name), styles::list_item_style()),
            Span::styled(format!("x{:<4}", item.quantity), styles::muted_style()),
            Span::styled(format!("{:>12} ₽", item.price.round_dp(2)), styles::price_style()),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("  Total ", styles::highlight_style()),
        Span::styled(format!("{} ₽", app.cart_total().round_dp(2)), styles::price_style()),
    ]));
    lines.push(Line::from(vec![
        Span::styled("  Press ", styles::muted_style()),
        Span::styled("Esc", styles::help_key_style()),
        Span::styled(" to close", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(key, styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 26, frame.area());

    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  FoodSave catalog", styles::title_style())),
        Line::from(Span::styled(
            format!("  version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Browsing", styles::highlight_style())),
        help_line("  ←/→/↑/↓   ", "Move between items"),
        help_line("  a         ", "Add item to cart"),
        help_line("  h         ", "Toggle favorite"),
        help_line("  m         ", "Load more items"),
        help_line("  v         ", "Switch grid / list view"),
        help_line("  c         ", "Show cart"),
        Line::from(""),
        Line::from(Span::styled(" Filtering", styles::highlight_style())),
        help_line("  1-4       ", "All / dishes / products / discounts"),
        help_line("  s         ", "Cycle sort order"),
        help_line("  /         ", "Search"),
        help_line("  f / Tab   ", "Focus filter panel"),
        help_line("  Space     ", "Toggle filter (applies shortly)"),
        help_line("  Enter     ", "Apply filters now / edit price"),
        help_line("  x         ", "Clear all filters"),
        Line::from(""),
        help_line("  r         ", "Reload"),
        help_line("  q         ", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

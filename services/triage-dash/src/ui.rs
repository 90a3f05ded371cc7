// services/triage-dash/src/ui.rs
//
// Terminal rendering. Every frame is drawn from scratch out of the current
// DashboardView plus app chrome; nothing is carried between frames.

use std::time::Instant;

use ratatui::{prelude::*, widgets::*};

use crate::app::{App, Tab};
use crate::derive::{CategoryColor, PatientFilter};
use crate::form::Field;
use crate::notify::Level;
use crate::view::{DashboardView, PatientCard, ResourceCard, StatTile};

// Color palette: Red, White, Silver, Gold
mod colors {
    use ratatui::style::Color;

    pub const RED: Color = Color::Rgb(220, 50, 47);
    pub const DARK_RED: Color = Color::Rgb(139, 0, 0);
    pub const WHITE: Color = Color::Rgb(253, 246, 227);
    pub const SILVER: Color = Color::Rgb(147, 161, 161);
    pub const GRAY: Color = Color::Rgb(101, 123, 131);
    pub const GOLD: Color = Color::Rgb(255, 193, 37);
    pub const DARK_GOLD: Color = Color::Rgb(184, 134, 11);
    pub const BLUE: Color = Color::Rgb(38, 139, 210);
    pub const BG_DARK: Color = Color::Rgb(0, 20, 30);
    pub const BG_PANEL: Color = Color::Rgb(7, 30, 41);
    pub const SUCCESS: Color = Color::Rgb(133, 153, 0);
}

fn category(color: CategoryColor) -> Color {
    match color {
        CategoryColor::Red => colors::RED,
        CategoryColor::Yellow => colors::GOLD,
        CategoryColor::Green => colors::SUCCESS,
        CategoryColor::Gray => colors::GRAY,
        CategoryColor::Neutral => colors::WHITE,
    }
}

fn level(level: Level) -> Color {
    match level {
        Level::Info => colors::BLUE,
        Level::Success => colors::SUCCESS,
        Level::Warn => colors::GOLD,
        Level::Error => colors::RED,
    }
}

fn panel(title: &str, border: Color) -> Block<'_> {
    Block::default()
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(colors::WHITE).bold(),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(colors::BG_PANEL))
}

pub fn draw(frame: &mut Frame, app: &App, view: &DashboardView, now: Instant) {
    let area = frame.area();

    frame.render_widget(
        Block::default().style(Style::default().bg(colors::BG_DARK)),
        area,
    );

    let alert_height = if view.alert.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Header
            Constraint::Length(5),            // Stats bar
            Constraint::Length(alert_height), // Critical resources
            Constraint::Length(3),            // Tabs
            Constraint::Min(8),               // Body
            Constraint::Length(3),            // Footer
        ])
        .split(area);

    draw_header(frame, chunks[0], app);
    draw_stats_bar(frame, chunks[1], &view.stats_bar);
    if let Some(alert) = &view.alert {
        let banner = Paragraph::new(Line::from(Span::styled(
            format!("!! {}", alert.message()),
            Style::default().fg(colors::WHITE).bold(),
        )))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::RED))
                .style(Style::default().bg(colors::DARK_RED)),
        );
        frame.render_widget(banner, chunks[2]);
    }
    draw_tabs(frame, chunks[3], app.tab);

    match app.tab {
        Tab::Input => draw_form(frame, chunks[4], app),
        Tab::Queue => draw_queue(frame, chunks[4], app, view),
        Tab::Resources => draw_resources(frame, chunks[4], app, view),
        Tab::Stats => draw_stats(frame, chunks[4], app, view),
    }

    draw_footer(frame, chunks[5], app);
    draw_toasts(frame, chunks[4], app, now);
    draw_stock_editor(frame, area, app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let (mode_text, mode_color) = if app.demo {
        ("DEMO", colors::GOLD)
    } else {
        match app.connected {
            Some(true) => ("LIVE", colors::SUCCESS),
            Some(false) => ("DISCONNECTED", colors::RED),
            None => ("CONNECTING", colors::SILVER),
        }
    };

    let updated = app
        .last_refreshed
        .map(|t| format!("Updated {}", t.format("%H:%M:%S")))
        .unwrap_or_else(|| "Waiting for data".to_string());

    let mut spans = vec![
        Span::styled(
            " TRIAGE-DASH ",
            Style::default().fg(colors::WHITE).bg(colors::DARK_RED).bold(),
        ),
        Span::raw("  "),
        Span::styled(
            "MASS CASUALTY OPERATIONS",
            Style::default().fg(colors::GOLD).bold(),
        ),
        Span::raw("  "),
        Span::styled(format!("[{}]", mode_text), Style::default().fg(mode_color).bold()),
        Span::raw("  "),
        Span::styled(updated, Style::default().fg(colors::SILVER)),
        Span::raw("  "),
        Span::styled(
            app.backend.as_str(),
            Style::default().fg(colors::SILVER).add_modifier(Modifier::DIM),
        ),
    ];
    if app.pending_commands > 0 {
        spans.push(Span::raw("  "));
        spans.push(Span::styled("[WORKING]", Style::default().fg(colors::GOLD)));
    }

    let header = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(colors::DARK_RED))
                .style(Style::default().bg(colors::BG_DARK)),
        );

    frame.render_widget(header, area);
}

fn draw_stats_bar(frame: &mut Frame, area: Rect, tiles: &[StatTile]) {
    let constraints = vec![Constraint::Ratio(1, tiles.len().max(1) as u32); tiles.len()];
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (tile, chunk) in tiles.iter().zip(chunks.iter()) {
        draw_stat_box(frame, *chunk, tile);
    }
}

fn draw_stat_box(frame: &mut Frame, area: Rect, tile: &StatTile) {
    let accent = tile.color.map(category).unwrap_or(colors::WHITE);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(tile.color.map(category).unwrap_or(colors::SILVER)))
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(colors::BG_PANEL));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text = vec![
        Line::from(Span::styled(
            tile.label.to_uppercase(),
            Style::default().fg(colors::SILVER).add_modifier(Modifier::DIM),
        )),
        Line::from(Span::styled(
            tile.value.to_string(),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        )),
    ];

    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), inner);
}

fn draw_tabs(frame: &mut Frame, area: Rect, active: Tab) {
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| Line::from(format!(" {} {} ", i + 1, tab.title())))
        .collect();

    let tabs = Tabs::new(titles)
        .select(active.index())
        .style(Style::default().fg(colors::SILVER))
        .highlight_style(Style::default().fg(colors::BG_DARK).bg(colors::GOLD).bold())
        .divider(Span::styled("|", Style::default().fg(colors::DARK_GOLD)))
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(colors::DARK_GOLD))
                .style(Style::default().bg(colors::BG_DARK)),
        );

    frame.render_widget(tabs, area);
}

fn draw_form(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.form.focused();
    let lines: Vec<Line> = Field::ORDER
        .iter()
        .map(|field| {
            let value = app.form.value(*field);
            let is_focused = *field == focused;
            let marker = if is_focused { "> " } else { "  " };
            let label_style = if is_focused {
                Style::default().fg(colors::GOLD).bold()
            } else {
                Style::default().fg(colors::SILVER)
            };

            let value_span = if value.is_empty() {
                Span::styled(
                    field.hint(),
                    Style::default().fg(colors::GRAY).add_modifier(Modifier::DIM),
                )
            } else {
                Span::styled(value, Style::default().fg(colors::WHITE))
            };
            let mut spans = vec![
                Span::styled(marker, label_style),
                Span::styled(format!("{:<20}", field.label()), label_style),
                value_span,
            ];
            if is_focused {
                spans.push(Span::styled("_", Style::default().fg(colors::GOLD)));
            }
            Line::from(spans)
        })
        .collect();

    let form = Paragraph::new(lines).block(panel("NEW PATIENT (* required)", colors::DARK_GOLD));
    frame.render_widget(form, area);
}

fn draw_queue(frame: &mut Frame, area: Rect, app: &App, view: &DashboardView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let mut filters: Vec<Span> =
        vec![Span::styled(" Filter: ", Style::default().fg(colors::SILVER))];
    for (filter, key) in PatientFilter::ALL.iter().zip(['a', 'i', 'd', 'm', 'x']) {
        let style = if *filter == view.filter {
            Style::default().fg(colors::BG_DARK).bg(colors::GOLD).bold()
        } else {
            Style::default().fg(colors::SILVER)
        };
        filters.push(Span::styled(format!(" [{}] {} ", key, filter.label()), style));
    }
    if view.hidden > 0 {
        filters.push(Span::styled(
            format!("  ({} hidden)", view.hidden),
            Style::default().fg(colors::GRAY),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(filters)), chunks[0]);

    let title = format!("PATIENT QUEUE ({})", view.queue.len());
    if view.queue.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No patients in queue",
            Style::default().fg(colors::SILVER),
        )))
        .alignment(Alignment::Center)
        .block(panel(&title, colors::SILVER));
        frame.render_widget(empty, chunks[1]);
        return;
    }

    let items: Vec<ListItem> = view.queue.iter().map(patient_item).collect();
    let list = List::new(items)
        .block(panel(&title, colors::SILVER))
        .highlight_style(Style::default().bg(colors::BG_DARK))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(app.queue_selected));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

fn patient_item(card: &PatientCard) -> ListItem<'static> {
    let accent = category(card.color);
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!(" {} ", card.category),
            Style::default().fg(colors::BG_DARK).bg(accent).bold(),
        ),
        Span::raw(" "),
        Span::styled(card.patient_id.clone(), Style::default().fg(colors::WHITE).bold()),
        Span::styled(
            format!("  Priority: {} | Score: {}", card.priority, card.score),
            Style::default().fg(colors::SILVER),
        ),
        Span::styled(format!("  {}", card.time), Style::default().fg(colors::GRAY)),
    ])];

    let vitals: Vec<String> = card
        .vitals
        .iter()
        .map(|(label, value)| format!("{}: {}", label, value))
        .collect();
    lines.push(Line::from(Span::styled(
        format!("   {}", vitals.join("  ")),
        Style::default().fg(colors::WHITE),
    )));
    lines.push(Line::from(vec![
        Span::styled("   Injuries: ", Style::default().fg(colors::SILVER)),
        Span::styled(card.injuries.clone(), Style::default().fg(colors::WHITE)),
    ]));

    let mut regions = vec![
        Span::styled("   Regions: ", Style::default().fg(colors::SILVER)),
        Span::styled(card.regions.clone(), Style::default().fg(colors::WHITE)),
    ];
    if let Some(demographics) = &card.demographics {
        regions.push(Span::styled(
            format!("  {}", demographics),
            Style::default().fg(colors::SILVER),
        ));
    }
    lines.push(Line::from(regions));

    if let Some(notes) = &card.notes {
        lines.push(Line::from(vec![
            Span::styled("   Notes: ", Style::default().fg(colors::GOLD)),
            Span::styled(notes.clone(), Style::default().fg(colors::WHITE)),
        ]));
    }
    if let Some(status) = &card.status {
        lines.push(Line::from(Span::styled(
            format!("   {}", status),
            Style::default().fg(colors::SILVER),
        )));
    }

    let mut actions = vec![Span::raw("   ")];
    for affordance in &card.affordances {
        actions.push(Span::styled(
            format!("[{}]", affordance.key),
            Style::default().fg(colors::BG_DARK).bg(colors::SILVER),
        ));
        actions.push(Span::styled(
            format!(" {}  ", affordance.label),
            Style::default().fg(colors::SILVER),
        ));
    }
    lines.push(Line::from(actions));
    lines.push(Line::from(""));

    ListItem::new(lines).style(Style::default().fg(accent))
}

fn stock_bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn resource_row(card: &ResourceCard) -> Row<'static> {
    let (status, color) = if card.critical {
        ("CRITICAL", colors::RED)
    } else {
        ("OK", colors::SUCCESS)
    };
    Row::new(vec![
        Cell::from(Span::styled(status, Style::default().fg(color).bold())),
        Cell::from(Span::styled(card.label.clone(), Style::default().fg(colors::WHITE))),
        Cell::from(Span::styled(
            format!("{} / {}", card.current_stock, card.critical_level),
            Style::default().fg(if card.critical { colors::RED } else { colors::WHITE }),
        )),
        Cell::from(Span::styled(stock_bar(card.bar_percent, 20), Style::default().fg(color))),
    ])
}

fn draw_resources(frame: &mut Frame, area: Rect, app: &App, view: &DashboardView) {
    let rows: Vec<Row> = view.resources.iter().map(resource_row).collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Min(18),
            Constraint::Length(14),
            Constraint::Length(22),
        ],
    )
    .header(
        Row::new(vec![
            Cell::from(Span::styled("STATUS", Style::default().fg(colors::GOLD).bold())),
            Cell::from(Span::styled("RESOURCE", Style::default().fg(colors::GOLD).bold())),
            Cell::from(Span::styled("STOCK / CRIT", Style::default().fg(colors::GOLD).bold())),
            Cell::from(Span::styled("LEVEL", Style::default().fg(colors::GOLD).bold())),
        ])
        .bottom_margin(1),
    )
    .block(panel("RESOURCES", colors::SILVER))
    .row_highlight_style(Style::default().bg(colors::BG_DARK).add_modifier(Modifier::BOLD))
    .highlight_symbol("> ");

    let mut state = TableState::default().with_selected(
        (!view.resources.is_empty()).then_some(app.resource_selected),
    );
    frame.render_stateful_widget(table, area, &mut state);
}

fn stat_lines(tiles: &[StatTile]) -> Vec<Line<'static>> {
    tiles
        .iter()
        .map(|tile| {
            Line::from(vec![
                Span::styled(format!("{:<16}", tile.label), Style::default().fg(colors::SILVER)),
                Span::styled(
                    tile.value.to_string(),
                    Style::default()
                        .fg(tile.color.map(category).unwrap_or(colors::WHITE))
                        .bold(),
                ),
            ])
        })
        .collect()
}

fn draw_stats(frame: &mut Frame, area: Rect, app: &App, view: &DashboardView) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(50),
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(stat_lines(&view.stats_panel.patients))
            .block(panel("PATIENT STATS", colors::SILVER)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(stat_lines(&view.stats_panel.treatment))
            .block(panel("TREATMENT STATUS", colors::SILVER)),
        chunks[1],
    );

    let logs: Vec<Line> = app
        .notifier
        .log()
        .rev()
        .take(20)
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", entry.timestamp.format("%H:%M:%S")),
                    Style::default().fg(colors::SILVER).add_modifier(Modifier::DIM),
                ),
                Span::styled(
                    format!("{} ", entry.level.tag()),
                    Style::default().fg(level(entry.level)),
                ),
                Span::styled(entry.message.as_str(), Style::default().fg(colors::WHITE)),
            ])
        })
        .collect();

    let activity = Paragraph::new(logs)
        .block(panel("ACTIVITY LOG", colors::SILVER))
        .wrap(Wrap { trim: true });
    frame.render_widget(activity, chunks[2]);
}

fn draw_toasts(frame: &mut Frame, body: Rect, app: &App, now: Instant) {
    let lines: Vec<Line> = app
        .notifier
        .active(now)
        .map(|n| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", n.level.tag()),
                    Style::default().fg(level(n.level)).bold(),
                ),
                Span::styled(n.message.as_str(), Style::default().fg(colors::WHITE)),
            ])
        })
        .collect();
    if lines.is_empty() {
        return;
    }

    let width = body.width.min(60);
    let height = (lines.len() as u16 + 2).min(body.height);
    let area = Rect {
        x: body.x + body.width - width,
        y: body.y,
        width,
        height,
    };

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(panel("NOTIFICATIONS", colors::DARK_GOLD)),
        area,
    );
}

fn draw_stock_editor(frame: &mut Frame, area: Rect, app: &App) {
    let Some(editor) = &app.stock_editor else {
        return;
    };

    let width = area.width.min(44);
    let height = area.height.min(5);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let text = vec![
        Line::from(vec![
            Span::styled("New stock: ", Style::default().fg(colors::SILVER)),
            Span::styled(editor.buffer.as_str(), Style::default().fg(colors::WHITE).bold()),
            Span::styled("_", Style::default().fg(colors::GOLD)),
        ]),
        Line::from(Span::styled(
            "Enter to save, Esc to cancel",
            Style::default().fg(colors::GRAY),
        )),
    ];

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text).block(panel(
            &format!("UPDATE {}", editor.label.to_uppercase()),
            colors::GOLD,
        )),
        popup,
    );
}

fn key_hint(key: &'static str, label: &'static str, bg: Color) -> [Span<'static>; 3] {
    [
        Span::styled(key, Style::default().fg(colors::BG_DARK).bg(bg)),
        Span::styled(label, Style::default().fg(colors::SILVER)),
        Span::raw("  "),
    ]
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let hints: Vec<(&'static str, &'static str, Color)> = if app.stock_editor.is_some() {
        vec![
            (" [0-9] ", " Stock ", colors::WHITE),
            (" [ENTER] ", " Save ", colors::GOLD),
            (" [ESC] ", " Cancel ", colors::RED),
        ]
    } else {
        match app.tab {
            Tab::Input => vec![
                (" [TAB/UP/DOWN] ", " Field ", colors::SILVER),
                (" [ENTER] ", " Triage patient ", colors::GOLD),
                (" [ESC] ", " Back to queue ", colors::RED),
            ],
            Tab::Queue => vec![
                (" [Q] ", " Quit ", colors::RED),
                (" [1-4] ", " Tabs ", colors::SILVER),
                (" [UP/DOWN] ", " Select ", colors::SILVER),
                (" [T/S/V] ", " Treat/Stable/Evacuate ", colors::GOLD),
                (" [R] ", " Refresh ", colors::WHITE),
                (" [E] ", " Export ", colors::WHITE),
                (" [G] ", " Report ", colors::WHITE),
            ],
            Tab::Resources => vec![
                (" [Q] ", " Quit ", colors::RED),
                (" [1-4] ", " Tabs ", colors::SILVER),
                (" [UP/DOWN] ", " Select ", colors::SILVER),
                (" [e] ", " Update stock ", colors::GOLD),
                (" [R] ", " Refresh ", colors::WHITE),
            ],
            Tab::Stats => vec![
                (" [Q] ", " Quit ", colors::RED),
                (" [1-4] ", " Tabs ", colors::SILVER),
                (" [R] ", " Refresh ", colors::WHITE),
                (" [E] ", " Export ", colors::WHITE),
                (" [G] ", " Report ", colors::WHITE),
            ],
        }
    };

    let spans: Vec<Span> = hints
        .into_iter()
        .flat_map(|(key, label, bg)| key_hint(key, label, bg))
        .collect();

    let footer = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(colors::DARK_RED))
                .style(Style::default().bg(colors::BG_DARK)),
        );

    frame.render_widget(footer, area);
}

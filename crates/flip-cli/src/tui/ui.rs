//! UI rendering

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use flip_core::{NoticeLevel, ProviderStatus};

use super::app::{ActivePane, App, InputMode};
use crate::inventory::Lifecycle;
use crate::report;

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App) {
    // Create vertical layout for status bar at the bottom
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    // Split the main area into three panes
    let pane_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(outer_chunks[0]);

    // Render each pane
    draw_toggles_pane(frame, app, pane_chunks[0]);
    draw_inventory_pane(frame, app, pane_chunks[1]);
    draw_compliance_pane(frame, app, pane_chunks[2]);

    // Draw provider status indicator in top-right corner
    draw_status_indicator(frame, app);

    // Draw status bar or search input
    match app.input_mode {
        InputMode::Normal => draw_status_bar(frame, app, outer_chunks[1]),
        InputMode::Filter => draw_filter_input(frame, app, outer_chunks[1]),
    }

    // Draw help overlay if visible
    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Draw the flag toggles pane (left)
fn draw_toggles_pane(frame: &mut Frame, app: &App, area: Rect) {
    let is_active = app.active_pane == ActivePane::Toggles;

    let items: Vec<ListItem> = app
        .bindings
        .iter()
        .map(|snapshot| {
            let (marker, marker_style) = if snapshot.pending {
                ("… ", Style::default().fg(Color::Yellow))
            } else {
                ("✓ ", Style::default().fg(Color::Green))
            };

            let name_line = Line::from(vec![
                Span::styled(marker, marker_style),
                Span::raw(snapshot.flag.as_str()),
            ]);

            let value_style = match snapshot.value.as_bool() {
                Some(true) => Style::default().fg(Color::Green),
                Some(false) => Style::default().fg(Color::Red),
                None => Style::default().fg(Color::Cyan),
            };
            let value_line = Line::from(vec![
                Span::raw("  "),
                Span::styled(snapshot.value.to_string(), value_style),
            ]);

            ListItem::new(vec![name_line, value_line])
        })
        .collect();

    let border_style = if is_active {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let title = format!(" Flags ({}) ", app.bindings.len());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let highlight_style = if is_active {
        Style::default()
            .add_modifier(Modifier::BOLD)
            .add_modifier(Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::REVERSED)
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style);

    let mut state = ListState::default();
    if !app.bindings.is_empty() {
        state.select(Some(app.binding_index));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the laptop inventory pane (middle)
fn draw_inventory_pane(frame: &mut Frame, app: &App, area: Rect) {
    let is_active = app.active_pane == ActivePane::Inventory;
    let show_lifecycle = app.show_lifecycle();
    let today = Utc::now().date_naive();

    let items: Vec<ListItem> = app
        .visible_laptops
        .iter()
        .map(|laptop| {
            let mut name_spans = Vec::new();
            if show_lifecycle {
                let color = match Lifecycle::evaluate(laptop.purchased, today) {
                    Lifecycle::Green => Color::Green,
                    Lifecycle::Yellow => Color::Yellow,
                    Lifecycle::Red => Color::Red,
                };
                name_spans.push(Span::styled("● ", Style::default().fg(color)));
            }
            name_spans.push(Span::raw(laptop.name));

            let detail_line = Line::from(vec![Span::styled(
                format!(
                    "{} | {} | {}",
                    laptop.brand, laptop.assigned_to, laptop.purchased
                ),
                Style::default().add_modifier(Modifier::DIM),
            )]);

            ListItem::new(vec![Line::from(name_spans), detail_line])
        })
        .collect();

    let border_style = if is_active {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let title = if app.filter_text.is_empty() {
        format!(" Inventory ({}) ", app.visible_laptops.len())
    } else {
        format!(
            " Inventory ({}/{}) ",
            app.visible_laptops.len(),
            app.fleet.len()
        )
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let highlight_style = if is_active {
        Style::default()
            .add_modifier(Modifier::BOLD)
            .add_modifier(Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::REVERSED)
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style);

    let mut state = ListState::default();
    if !app.visible_laptops.is_empty() {
        state.select(Some(app.laptop_index));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the compliance report pane (right)
fn draw_compliance_pane(frame: &mut Frame, app: &App, area: Rect) {
    let is_active = app.active_pane == ActivePane::Compliance;

    let border_style = if is_active {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let block = Block::default()
        .title(" Compliance ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let content = if app.compliance_visible() {
        let report = report::for_variant(app.compliance_variant());

        let mut lines = vec![
            Line::from(vec![Span::styled(
                report.title,
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(report.description),
            Line::from(""),
        ];
        for feature in report.features {
            lines.push(Line::from(feature));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(vec![Span::styled(
            format!("Region: {}", app.current_region()),
            Style::default().add_modifier(Modifier::DIM),
        )]));

        lines
    } else {
        vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "Report disabled",
                Style::default().add_modifier(Modifier::DIM),
            )]),
            Line::from(vec![Span::styled(
                format!("Enable \"{}\" to show it", report::REPORT_FLAG),
                Style::default().add_modifier(Modifier::DIM),
            )]),
        ]
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.compliance_scroll, 0));

    frame.render_widget(paragraph, area);
}

/// Draw the status bar at the bottom
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(notice) = &app.notice {
        let style = match notice.level {
            NoticeLevel::Success => Style::default().fg(Color::Green),
            NoticeLevel::Error => Style::default().fg(Color::Red),
        };
        let paragraph = Paragraph::new(Span::styled(notice.text.as_str(), style));
        frame.render_widget(paragraph, area);
        return;
    }

    let content = if !app.ready && app.provider_status == ProviderStatus::Connecting {
        "Waiting for initial flag values...".to_string()
    } else {
        format!(
            "[{} | {}]  space:toggle  r:region  /:search  ?:help  q:quit",
            app.current_region(),
            status_label(app.provider_status)
        )
    };

    let paragraph = Paragraph::new(content).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Draw search input at the bottom
fn draw_filter_input(frame: &mut Frame, app: &App, area: Rect) {
    let prefix = "/";
    let input = &app.filter_text;

    let line = Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::Cyan)),
        Span::raw(input.as_str()),
        Span::styled(
            format!("  ({} matches)", app.visible_laptops.len()),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);

    let paragraph = Paragraph::new(line);
    frame.render_widget(paragraph, area);

    // Position cursor
    let cursor_x = area.x + prefix.len() as u16 + app.filter_text.len() as u16;
    frame.set_cursor_position((cursor_x, area.y));
}

/// Draw provider status indicator in top-right corner
fn draw_status_indicator(frame: &mut Frame, app: &App) {
    let area = frame.area();
    if area.width < 5 {
        return;
    }

    let (icon, style) = match app.provider_status {
        ProviderStatus::Ready => ("✓", Style::default().fg(Color::Green)),
        ProviderStatus::Connecting => ("↻", Style::default().fg(Color::Yellow)),
        ProviderStatus::Offline => ("⚡", Style::default().fg(Color::DarkGray)),
        ProviderStatus::Degraded => ("○", Style::default().add_modifier(Modifier::DIM)),
    };

    let indicator = Paragraph::new(Span::styled(icon, style));
    let indicator_area = Rect::new(area.width - 2, 0, 1, 1);
    frame.render_widget(indicator, indicator_area);
}

fn status_label(status: ProviderStatus) -> &'static str {
    match status {
        ProviderStatus::Connecting => "connecting",
        ProviderStatus::Ready => "live",
        ProviderStatus::Offline => "offline",
        ProviderStatus::Degraded => "degraded",
    }
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    // Calculate centered popup area
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 21.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the popup area
    frame.render_widget(ratatui::widgets::Clear, popup_area);

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  j/k, ↑/↓    Move up/down"),
        Line::from("  gg          Jump to first item"),
        Line::from("  G           Jump to last item"),
        Line::from("  h/l, ←/→    Switch panes"),
        Line::from("  Tab         Cycle panes"),
        Line::from(""),
        Line::from("Flags:"),
        Line::from("  space/Enter Toggle selected flag"),
        Line::from("  r           Cycle region"),
        Line::from(""),
        Line::from("Inventory:"),
        Line::from("  /           Search (Esc to close)"),
        Line::from(""),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, popup_area);
}

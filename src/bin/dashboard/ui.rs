// src/bin/dashboard/ui.rs - Rendering for the form, result and alert panels
use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use backtest_panel::controller::RunOutcome;
use backtest_panel::result_view::ResultView;

use crate::app::App;
use crate::types::{FormRow, InputMode};

pub fn ui(f: &mut Frame, app: &App) {
    let size = f.size();

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Form + results
            Constraint::Length(3), // Controls
        ])
        .split(size);

    // Wide terminals give the result links more room
    let (form_constraint, result_constraint) = if size.width > 150 {
        (Constraint::Length(60), Constraint::Min(80))
    } else {
        (Constraint::Percentage(45), Constraint::Percentage(55))
    };

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([form_constraint, result_constraint])
        .split(outer[1]);

    render_header(f, app, outer[0]);
    render_form(f, app, body[0]);
    render_results(f, app, body[1]);
    render_help(f, app, outer[2]);

    if let Some(alert) = &app.alert {
        render_alert_popup(f, alert, size);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let header_block = Block::default()
        .borders(Borders::ALL)
        .title("📈 PythonTrade 回测面板")
        .title_alignment(Alignment::Center)
        .border_style(Style::default().fg(Color::Cyan));

    let run_status = if app.is_loading() {
        Span::styled(
            "运行中…",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("就绪", Style::default().fg(Color::Green))
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("API: {} | ", app.api_base_url),
            Style::default().fg(Color::White),
        ),
        run_status,
        Span::styled(
            format!(
                " | Runs: {} | Last event: {}s ago | Time: {}",
                app.controller.runs_started(),
                app.last_update.elapsed().as_secs(),
                Local::now().format("%H:%M:%S")
            ),
            Style::default().fg(Color::White),
        ),
    ]))
    .block(header_block)
    .alignment(Alignment::Center);

    f.render_widget(header, area);
}

fn render_form(f: &mut Frame, app: &App, area: Rect) {
    let form_block = Block::default()
        .borders(Borders::ALL)
        .title("⚙️ 回测配置")
        .border_style(Style::default().fg(Color::Green));

    let header_cells = ["Parameter", "Value"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows: Vec<Row> = app.rows.iter().enumerate().map(|(idx, row)| {
        let is_selected = idx == app.selected_row;
        let editing = is_selected && app.input_mode == InputMode::Editing;

        let value = if editing {
            format!("{}▏", app.edit_buffer)
        } else if row.is_selector() {
            format!("◀ {} ▶", app.row_value(*row))
        } else {
            app.row_value(*row)
        };

        let value_style = match (editing, row) {
            (true, _) => Style::default().fg(Color::Black).bg(Color::Yellow),
            (false, FormRow::SymbolPicker) if app.symbols.is_loading() => {
                Style::default().fg(Color::DarkGray)
            }
            _ => Style::default().fg(Color::White),
        };

        let row_style = if is_selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };

        Row::new(vec![
            Cell::from(row.label()).style(Style::default().fg(Color::Cyan)),
            Cell::from(value).style(value_style),
        ])
        .style(row_style)
    }).collect();

    let widths = [Constraint::Length(14), Constraint::Min(20)];
    let table = Table::new(rows)
        .header(header)
        .block(form_block)
        .widths(&widths);

    f.render_widget(table, area);
}

fn render_results(f: &mut Frame, app: &App, area: Rect) {
    let result_block = Block::default()
        .borders(Borders::ALL)
        .title("📊 回测结果")
        .border_style(Style::default().fg(Color::Magenta));

    let lines = if app.is_loading() {
        vec![Line::from(Span::styled(
            "运行中…",
            Style::default().fg(Color::Yellow),
        ))]
    } else {
        match (app.result_view(), app.controller.outcome()) {
            (Some(view), _) => result_lines(&view),
            (None, Some(RunOutcome::Failure { kind, message })) => vec![Line::from(Span::styled(
                format!("Last run failed ({:?}): {}", kind, message),
                Style::default().fg(Color::Red),
            ))],
            _ => vec![Line::from(Span::styled(
                "No result yet. Press 'r' to 运行回测.",
                Style::default().fg(Color::Gray),
            ))],
        }
    };

    let paragraph = Paragraph::new(lines)
        .block(result_block)
        .wrap(Wrap { trim: false })
        .scroll((app.result_scroll, 0));

    f.render_widget(paragraph, area);
}

fn result_lines(view: &ResultView) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        view.title(),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    ))];

    for group in &view.groups {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            group.symbol.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )));

        for link in &group.links {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<13}", link.kind.label()),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    link.url.to_string(),
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                ),
            ]));
        }

        for metric in &group.metrics {
            let color = if metric.value.starts_with('-') {
                Color::Red
            } else {
                Color::Green
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<13}", metric.label),
                    Style::default().fg(Color::White),
                ),
                Span::styled(metric.value.clone(), Style::default().fg(color)),
            ]));
        }
    }

    lines
}

fn render_help(f: &mut Frame, app: &App, area: Rect) {
    let help_block = Block::default()
        .borders(Borders::ALL)
        .title("🔧 Controls")
        .border_style(Style::default().fg(Color::Gray));

    let help_text = match (app.input_mode, &app.status_message) {
        (InputMode::Editing, _) => "Enter save | Esc cancel | Backspace delete".to_string(),
        (InputMode::Normal, Some(status)) => format!(
            "{} | 'q' quit | 'r' run | ↑↓ select | ←→ change | Enter edit | PgUp/PgDn scroll",
            status
        ),
        (InputMode::Normal, None) => {
            "'q' quit | 'r' run | ↑↓ select | ←→ change | Enter edit | PgUp/PgDn scroll".to_string()
        }
    };

    let help = Paragraph::new(help_text)
        .block(help_block)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);

    f.render_widget(help, area);
}

fn render_alert_popup(f: &mut Frame, alert: &str, area: Rect) {
    let popup_width = area.width.saturating_sub(4).min(70);
    let popup_height = 7;
    let x = (area.width.saturating_sub(popup_width)) / 2;
    let y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect {
        x,
        y,
        width: popup_width,
        height: popup_height.min(area.height),
    };

    f.render_widget(Clear, popup_area);

    let popup_block = Block::default()
        .borders(Borders::ALL)
        .title("🚨 Alert")
        .title_alignment(Alignment::Center)
        .border_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD));

    let popup_content = vec![
        Line::from(Span::styled(
            alert.to_string(),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to dismiss",
            Style::default().fg(Color::Gray),
        )),
    ];

    let popup_paragraph = Paragraph::new(popup_content)
        .block(popup_block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(popup_paragraph, popup_area);
}

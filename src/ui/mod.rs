use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, ConfirmState, ListFocus, Overlay, TextInput};
use crate::notify::{Notification, NotificationLevel};

mod modals;
mod theme;
use theme::*;

const MIN_WIDTH: u16 = 80;
const MIN_HEIGHT: u16 = 24;

fn cell_width(text: &str) -> u16 {
    UnicodeWidthStr::width(text).min(u16::MAX as usize) as u16
}

pub fn render(f: &mut Frame<'_>, app: &App) {
    let size = f.size();
    if size.width < MIN_WIDTH || size.height < MIN_HEIGHT {
        let block = Paragraph::new(format!(
            "La ventana es demasiado pequeña. Amplíela al menos a {}x{}.",
            MIN_WIDTH, MIN_HEIGHT
        ))
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title("Acuerdos")
                .borders(Borders::ALL)
                .style(Style::default().fg(FG_PRIMARY).bg(MENU_BG)),
        )
        .style(Style::default().fg(FG_PRIMARY).bg(BG_PRIMARY));
        f.render_widget(block, size);
        return;
    }

    let base = Block::default().style(Style::default().bg(BG_PRIMARY));
    f.render_widget(base, size);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(size);

    render_header(f, vertical[0]);
    render_filters(f, app, vertical[1]);
    render_agreements(f, app, vertical[2]);
    render_status_bar(f, app, vertical[3]);

    match app.overlay.as_ref() {
        Some(Overlay::AgreementForm(form)) => modals::render_form(f, form),
        Some(Overlay::Rates(rates)) => modals::render_rates(f, rates),
        Some(Overlay::Confirm(state)) => render_confirm_overlay(f, state),
        None => {}
    }

    if let Some(notification) = app.notifier().current() {
        render_toast(f, notification);
    }
}

fn render_header(f: &mut Frame<'_>, area: Rect) {
    f.render_widget(Clear, area);
    let lines = vec![
        Line::from(Span::styled(
            " Gestión de Acuerdos Comerciales",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            " n Crear · e Editar · d Eliminar · t Tarifas · a Agente · / NIF · r Recargar · ←/→ Página · q Salir",
            Style::default().fg(BAR_TEXT),
        )),
    ];
    let header = Paragraph::new(lines).style(Style::default().bg(BAR_BG));
    f.render_widget(header, area);
}

fn render_filters(f: &mut Frame<'_>, app: &App, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let agent = Paragraph::new(app.list.agent_filter_label())
        .style(Style::default().fg(FG_PRIMARY))
        .block(
            Block::default()
                .title("Filtrar por Agente (a/A)")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(BORDER_IDLE)),
        );
    f.render_widget(agent, halves[0]);

    let focused = app.list.focus == ListFocus::NifFilter;
    render_text_input(
        f,
        halves[1],
        "Filtrar por NIF (/)",
        &app.list.nif_filter,
        "Filtrar...",
        focused,
    );
}

/// Bordered single-line input; places the caret when focused.
pub(crate) fn render_text_input(
    f: &mut Frame<'_>,
    area: Rect,
    title: &str,
    input: &TextInput,
    placeholder: &str,
    focused: bool,
) {
    let border = if focused { BORDER_FOCUS } else { BORDER_IDLE };
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    let text = if input.is_empty() && !focused {
        Span::styled(placeholder.to_string(), Style::default().fg(FG_DIM))
    } else {
        Span::styled(input.value().to_string(), Style::default().fg(Color::White))
    };
    f.render_widget(Paragraph::new(Line::from(text)).block(block), area);
    if focused && inner.width > 0 {
        let column = input.cursor_column().min(inner.width.saturating_sub(1));
        f.set_cursor(inner.x + column, inner.y);
    }
}

fn render_agreements(f: &mut Frame<'_>, app: &App, area: Rect) {
    let rows: Vec<Row> = app
        .list
        .rows()
        .into_iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.id.to_string()),
                Cell::from(row.agent),
                Cell::from(row.nif),
                Cell::from(row.start_date),
                Cell::from(row.scope),
                Cell::from(row.duration),
            ])
        })
        .collect();
    let empty = rows.is_empty();

    let header = Row::new(vec![
        "ID",
        "Agente Comercial",
        "NIF",
        "Fecha Alta",
        "Ámbito",
        "Duración",
    ])
    .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));

    let focused = app.overlay.is_none() && app.list.focus == ListFocus::Table;
    let block = Block::default()
        .title("Acuerdos")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { BORDER_FOCUS } else { BORDER_IDLE }));

    if empty {
        let message = Paragraph::new("No hay acuerdos que mostrar.")
            .style(Style::default().fg(FG_DIM))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(message, area);
        return;
    }

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Percentage(34),
            Constraint::Length(12),
            Constraint::Length(11),
            Constraint::Percentage(22),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(block)
    .style(Style::default().fg(FG_PRIMARY))
    .highlight_style(
        Style::default()
            .bg(ROW_HIGHLIGHT_BG)
            .fg(ROW_HIGHLIGHT_FG)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = TableState::default();
    state.select(Some(app.list.selected));
    f.render_stateful_widget(table, area, &mut state);
}

fn render_status_bar(f: &mut Frame<'_>, app: &App, area: Rect) {
    f.render_widget(Clear, area);
    let base = Block::default().style(Style::default().bg(BAR_BG));
    f.render_widget(base, area);

    let busy = if app.list.loading || app.is_busy() { "· Cargando... " } else { "" };
    let position = format!(
        " Página {} de {} · {} de {} acuerdos {}",
        app.list.page,
        app.list.total_pages,
        app.list.rows().len(),
        app.list.agreements.len(),
        busy
    );
    let mut spans = vec![Span::styled(
        position.clone(),
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    )];
    if let Some(notification) = app.notifier().current() {
        let remaining = area.width.saturating_sub(cell_width(&position)) as usize;
        let text: String = format!(" {} {}", notification.title, first_line(&notification.message))
            .chars()
            .take(remaining)
            .collect();
        spans.push(Span::styled(
            text,
            Style::default().fg(level_color(notification.level)),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BAR_BG)),
        area,
    );
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

fn level_color(level: NotificationLevel) -> Color {
    match level {
        NotificationLevel::Success => TOAST_SUCCESS,
        NotificationLevel::Info => TOAST_INFO,
        NotificationLevel::Warning => TOAST_WARNING,
        NotificationLevel::Error => TOAST_ERROR,
    }
}

fn render_toast(f: &mut Frame<'_>, notification: &Notification) {
    let screen = f.size();
    let lines: Vec<Line> = notification
        .message
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(Color::White))))
        .collect();
    let width = 44.min(screen.width);
    let height = (lines.len() as u16 + 2).clamp(3, screen.height / 2);
    let area = Rect {
        x: screen.x + screen.width.saturating_sub(width + 1),
        y: screen.y + 2,
        width,
        height,
    };
    f.render_widget(Clear, area);
    let color = level_color(notification.level);
    let toast = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(MENU_BG))
        .block(
            Block::default()
                .title(Span::styled(
                    notification.title.as_str(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
    f.render_widget(toast, area);
}

fn render_confirm_overlay(f: &mut Frame<'_>, state: &ConfirmState) {
    let area = centered_rect(50, 28, f.size());
    f.render_widget(Clear, area);
    let block = Block::default()
        .title(Span::styled(
            state.title.as_str(),
            Style::default().fg(BAR_TEXT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MENU_BORDER))
        .style(Style::default().bg(MENU_BG));
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let message = Paragraph::new(state.message.as_str())
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(FG_PRIMARY).bg(MENU_BG));
    f.render_widget(message, chunks[0]);

    let button = |label: &str, selected: bool| {
        let style = if selected {
            Style::default()
                .bg(ROW_HIGHLIGHT_BG)
                .fg(ROW_HIGHLIGHT_FG)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(BAR_TEXT)
        };
        Span::styled(format!(" [{}] ", label), style)
    };
    let buttons = Paragraph::new(Line::from(vec![
        button(&state.confirm_label, state.confirm_selected()),
        Span::styled("  ", Style::default().bg(MENU_BG)),
        button(&state.cancel_label, !state.confirm_selected()),
    ]))
    .style(Style::default().bg(MENU_BG))
    .alignment(Alignment::Center);
    f.render_widget(buttons, chunks[1]);

    let hint = Paragraph::new("Enter confirmar · ←/→ elegir · Esc cancelar")
        .style(Style::default().fg(FG_DIM).bg(MENU_BG));
    f.render_widget(hint, chunks[2]);
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1])[1]
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::screen_text;
    use crate::api::fake::{FakeApi, agent, agreement};
    use crate::app::testing::test_app;
    use crate::app::ConfirmAction;

    #[tokio::test]
    async fn draws_the_filtered_page() {
        let api = FakeApi::with_agreements(
            vec![
                agreement(41, Some(agent(1, "Energía Sur", "B100"))),
                agreement(42, None),
            ],
            3,
        );
        let (mut app, _) = test_app(Arc::new(api));
        app.load_page();
        assert!(screen_text(&app, 100, 30).contains("Cargando..."));
        app.settle().await;

        let text = screen_text(&app, 100, 30);
        assert!(!text.contains("Cargando..."));
        assert!(text.contains("Gestión de Acuerdos Comerciales"));
        assert!(text.contains("Energía Sur"));
        assert!(text.contains("Sin Agente"));
        assert!(text.contains("15/01/2024"));
        assert!(text.contains("Página 1 de 3"));
    }

    #[test]
    fn small_windows_get_a_notice() {
        let (app, _) = test_app(Arc::new(FakeApi::default()));
        let text = screen_text(&app, 60, 20);
        assert!(text.contains("demasiado"));
        assert!(!text.contains("Gestión de Acuerdos"));
    }

    #[test]
    fn confirmation_shows_its_question() {
        let (mut app, _) = test_app(Arc::new(FakeApi::default()));
        app.open_confirm(ConfirmAction::CloseApplication);
        let text = screen_text(&app, 100, 30);
        assert!(text.contains("¿Desea cerrar la pestaña?"));
        assert!(text.contains("[Cancelar]"));
    }
}

//! Drawing of the agreement form and the rate assignment dialog.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use super::theme::*;
use super::{cell_width, centered_rect, render_text_input};
use crate::api::display_date;
use crate::app::{AgreementFormState, FormField, MIN_ASSIGNED_RATES, RateAssignmentState, RatesPane};

fn modal_block(title: &str) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            title.to_string(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MENU_BORDER))
        .style(Style::default().bg(MENU_BG))
}

/// Rows a field takes in the boxed layout.
const BOXED_FIELD_HEIGHT: u16 = 3;
/// Width of the label column in the compact layout.
const COMPACT_LABEL_WIDTH: usize = 21;

const FORM_HINT: &str =
    "Tab/↑↓ campo · ←/→ agente · Espacio prórroga · Ctrl+S Guardar · Esc Cancelar";

pub(super) fn render_form(f: &mut Frame<'_>, form: &AgreementFormState) {
    let area = centered_rect(70, 90, f.size());
    f.render_widget(Clear, area);
    let block = modal_block(form.title());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let fields = FormField::ALL.len() as u16;
    if inner.height < fields * BOXED_FIELD_HEIGHT + 2 {
        render_compact_form(f, form, inner);
    } else {
        render_boxed_form(f, form, inner);
    }
}

fn field_placeholder(field: FormField) -> &'static str {
    match field {
        FormField::FechaAlta | FormField::FechaBaja => "AAAA-MM-DD",
        _ => "",
    }
}

fn choice_value(form: &AgreementFormState, field: FormField) -> String {
    match field {
        FormField::Agent => format!("◀ {} ▶", form.agent_label()),
        _ => format!("[{}]", if form.prorroga { "x" } else { " " }),
    }
}

fn hint_line(form: &AgreementFormState) -> Line<'static> {
    if form.saving {
        Line::from(Span::styled("Guardando...", Style::default().fg(ACCENT)))
    } else {
        Line::from(Span::styled(FORM_HINT, Style::default().fg(FG_DIM)))
    }
}

fn error_line(line: String) -> Line<'static> {
    Line::from(Span::styled(line, Style::default().fg(TOAST_ERROR)))
}

fn render_footer(f: &mut Frame<'_>, lines: Vec<Line<'static>>, area: Rect) {
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(MENU_BG)),
        area,
    );
}

fn render_boxed_form(f: &mut Frame<'_>, form: &AgreementFormState, inner: Rect) {
    let mut constraints: Vec<Constraint> = FormField::ALL
        .iter()
        .map(|_| Constraint::Length(BOXED_FIELD_HEIGHT))
        .collect();
    constraints.push(Constraint::Min(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (idx, field) in FormField::ALL.iter().copied().enumerate() {
        let focused = form.focus == field;
        let mut title = field.label().to_string();
        if let Some(messages) = form.field_errors(field) {
            title = format!("{} · {}", title, messages.join(", "));
        }
        match form.input(field) {
            Some(input) => {
                render_text_input(f, chunks[idx], &title, input, field_placeholder(field), focused)
            }
            None => render_choice(f, chunks[idx], &title, choice_value(form, field), focused),
        }
    }

    // Field messages already sit in the box titles.
    let mut lines: Vec<Line> = form
        .error_lines()
        .into_iter()
        .filter(|line| {
            !FormField::ALL
                .iter()
                .any(|field| line.to_lowercase().starts_with(&field.key().to_lowercase()))
        })
        .map(error_line)
        .collect();
    lines.push(hint_line(form));
    render_footer(f, lines, chunks[FormField::ALL.len()]);
}

/// One `label value` row per field, for terminals too short for the boxes.
fn render_compact_form(f: &mut Frame<'_>, form: &AgreementFormState, inner: Rect) {
    let mut constraints: Vec<Constraint> =
        FormField::ALL.iter().map(|_| Constraint::Length(1)).collect();
    constraints.push(Constraint::Length(1));
    constraints.push(Constraint::Min(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (idx, field) in FormField::ALL.iter().copied().enumerate() {
        let row = chunks[idx];
        let focused = form.focus == field;
        let label_style = if form.field_errors(field).is_some() {
            Style::default().fg(TOAST_ERROR)
        } else if focused {
            Style::default().fg(BORDER_FOCUS).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(FG_PRIMARY)
        };
        let marker = if focused { "▸ " } else { "  " };
        let label = format!("{}{:<width$} ", marker, field.label(), width = COMPACT_LABEL_WIDTH);
        let label_width = cell_width(&label);

        let value = match form.input(field) {
            Some(input) if input.is_empty() && !focused => Span::styled(
                field_placeholder(field).to_string(),
                Style::default().fg(FG_DIM),
            ),
            Some(input) => {
                Span::styled(input.value().to_string(), Style::default().fg(Color::White))
            }
            None => Span::styled(choice_value(form, field), Style::default().fg(Color::White)),
        };
        f.render_widget(
            Paragraph::new(Line::from(vec![Span::styled(label, label_style), value]))
                .style(Style::default().bg(MENU_BG)),
            row,
        );

        if focused && let Some(input) = form.input(field) {
            let room = row.width.saturating_sub(label_width + 1);
            let column = input.cursor_column().min(room);
            f.set_cursor(row.x + label_width + column, row.y);
        }
    }

    // No titles to carry field messages here, so every one goes below.
    let mut lines: Vec<Line> = form.error_lines().into_iter().map(error_line).collect();
    lines.push(hint_line(form));
    render_footer(f, lines, chunks[FormField::ALL.len() + 1]);
}

fn render_choice(f: &mut Frame<'_>, area: Rect, title: &str, value: String, focused: bool) {
    let border = if focused { BORDER_FOCUS } else { BORDER_IDLE };
    let widget = Paragraph::new(value)
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        );
    f.render_widget(widget, area);
}

pub(super) fn render_rates(f: &mut Frame<'_>, rates: &RateAssignmentState) {
    let area = centered_rect(90, 90, f.size());
    f.render_widget(Clear, area);
    let block = modal_block(&rates.title());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(inner);

    let intro = if rates.loading {
        String::from("Cargando tarifas...")
    } else {
        format!(
            "Selecciona las tarifas a asignar a este acuerdo (mínimo {}).",
            MIN_ASSIGNED_RATES
        )
    };
    let intro = Paragraph::new(intro)
    .style(Style::default().fg(FG_PRIMARY).bg(MENU_BG));
    f.render_widget(intro, vertical[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(vertical[1]);
    render_available(f, rates, columns[0]);
    render_assigned(f, rates, columns[1]);

    let hint = Paragraph::new(if rates.saving {
        "Guardando..."
    } else {
        "Tab panel · ↑↓ mover · Espacio marcar · x quitar · Ctrl+S Guardar Cambios · Esc Cerrar"
    })
    .style(Style::default().fg(FG_DIM).bg(MENU_BG));
    f.render_widget(hint, vertical[2]);
}

fn split_filter(area: Rect) -> (Rect, Rect) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);
    (parts[0], parts[1])
}

fn table_block(title: Span<'static>, focused: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { BORDER_FOCUS } else { BORDER_IDLE }))
}

fn highlight() -> Style {
    Style::default()
        .bg(ROW_HIGHLIGHT_BG)
        .fg(ROW_HIGHLIGHT_FG)
        .add_modifier(Modifier::BOLD)
}

fn render_available(f: &mut Frame<'_>, rates: &RateAssignmentState, area: Rect) {
    let (filter_area, table_area) = split_filter(area);
    render_text_input(
        f,
        filter_area,
        "Nombre",
        &rates.available_filter,
        "Filtrar por nombre...",
        rates.focus == RatesPane::AvailableFilter,
    );

    let rows: Vec<Row> = rates
        .visible_available()
        .into_iter()
        .map(|rate| {
            let mark = if rates.is_assigned(rate.id_tarifa) { "[x]" } else { "[ ]" };
            Row::new(vec![
                Cell::from(mark),
                Cell::from(rate.nombre.clone()),
                Cell::from(display_date(rate.inicio_vigencia.as_deref())),
                Cell::from(display_date(rate.fin_vigencia.as_deref())),
            ])
        })
        .collect();
    let focused = rates.focus == RatesPane::Available;
    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(11),
            Constraint::Length(11),
        ],
    )
    .header(
        Row::new(vec!["", "Nombre", "Inicio", "Fin"])
            .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
    )
    .block(table_block(Span::raw("Tarifas Disponibles"), focused))
    .style(Style::default().fg(FG_PRIMARY).bg(MENU_BG))
    .highlight_style(highlight());
    let mut state = TableState::default();
    if focused {
        state.select(Some(rates.available_selected));
    }
    f.render_stateful_widget(table, table_area, &mut state);
}

fn render_assigned(f: &mut Frame<'_>, rates: &RateAssignmentState, area: Rect) {
    let (filter_area, table_area) = split_filter(area);
    render_text_input(
        f,
        filter_area,
        "Nombre",
        &rates.assigned_filter,
        "Filtrar por nombre...",
        rates.focus == RatesPane::AssignedFilter,
    );

    let rows: Vec<Row> = rates
        .visible_assigned()
        .into_iter()
        .map(|rate| Row::new(vec![Cell::from(rate.nombre.clone()), Cell::from("x")]))
        .collect();
    let focused = rates.focus == RatesPane::Assigned;
    let count_style = if rates.assigned.len() < MIN_ASSIGNED_RATES {
        TOAST_WARNING
    } else {
        TOAST_SUCCESS
    };
    let table = Table::new(rows, [Constraint::Min(10), Constraint::Length(3)])
        .header(
            Row::new(vec!["Nombre", ""])
                .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        )
        .block(table_block(
            Span::styled(
                format!("Tarifas Asignadas: {}", rates.assigned.len()),
                Style::default().fg(count_style),
            ),
            focused,
        ))
        .style(Style::default().fg(FG_PRIMARY).bg(MENU_BG))
        .highlight_style(highlight());
    let mut state = TableState::default();
    if focused {
        state.select(Some(rates.assigned_selected));
    }
    f.render_stateful_widget(table, table_area, &mut state);
}

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use itertools::Itertools;
use mocktest::{model::QuestionStatus, session::Session};

const CELL_WIDTH: usize = 5;

/// Colour for a palette cell.
pub fn status_color(status: QuestionStatus) -> Color {
    match status {
        QuestionStatus::Answered => Color::Green,
        QuestionStatus::Unanswered => Color::Red,
        QuestionStatus::MarkedForReview => Color::Magenta,
        QuestionStatus::AnsweredAndMarked => Color::Yellow,
    }
}

pub fn status_style(status: QuestionStatus) -> Style {
    Style::default()
        .fg(status_color(status))
        .add_modifier(Modifier::BOLD)
}

/// How many cells fit on one row of a palette `width` columns wide.
pub fn cells_per_row(width: u16) -> usize {
    (width as usize / CELL_WIDTH).max(1)
}

fn palette_lines(statuses: &[QuestionStatus], current: usize, per_row: usize) -> Vec<Line<'static>> {
    statuses
        .iter()
        .enumerate()
        .chunks(per_row)
        .into_iter()
        .map(|row| {
            Line::from(
                row.map(|(idx, status)| {
                    let mut style = Style::default().fg(Color::Black).bg(status_color(*status));
                    if idx == current {
                        style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
                    }
                    vec![
                        Span::styled(format!("{:>3} ", idx + 1), style),
                        Span::raw(" "),
                    ]
                })
                .flatten()
                .collect::<Vec<_>>(),
            )
        })
        .collect()
}

pub fn render(session: &Session, area: Rect, buf: &mut Buffer) {
    let block = Block::default().borders(Borders::ALL).title(" Questions ");
    let inner = block.inner(area);
    block.render(area, buf);

    let statuses = session.palette();
    let per_row = cells_per_row(inner.width);
    let rows = statuses.len().div_ceil(per_row) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(rows + 1),
            Constraint::Length(QuestionStatus::ALL.len() as u16 + 1),
            Constraint::Min(0),
        ])
        .split(inner);

    Paragraph::new(palette_lines(&statuses, session.current_index(), per_row))
        .render(chunks[0], buf);

    let counts = statuses.iter().counts();
    let legend: Vec<Line> = QuestionStatus::ALL
        .iter()
        .map(|status| {
            Line::from(vec![
                Span::styled("  ", Style::default().bg(status_color(*status))),
                Span::raw(format!(
                    " {:<18}{:>3}",
                    status.to_string(),
                    counts.get(status).copied().unwrap_or(0)
                )),
            ])
        })
        .collect();
    Paragraph::new(legend).render(chunks[1], buf);
}

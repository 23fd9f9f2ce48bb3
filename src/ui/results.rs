use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Paragraph, Row, Table, Widget, Wrap},
};

use mocktest::{
    scoring::TestResult,
    session::Session,
    util::{format_marks, format_mm_ss},
};

use super::{
    charting::{bar_width, format_percent, section_bars},
    render_footer,
};
use crate::App;

/// Verdict of one reviewed question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Correct,
    Incorrect,
    Unattempted,
}

pub fn verdict(session: &Session, index: usize) -> Option<Verdict> {
    let question = session.question(index)?;
    let answer = session.answer(index)?;
    Some(match answer.selected_option {
        None => Verdict::Unattempted,
        Some(opt) if question.is_correct(opt) => Verdict::Correct,
        Some(_) => Verdict::Incorrect,
    })
}

pub fn render(app: &App, session: &Session, area: Rect, buf: &mut Buffer) {
    let Some(result) = session.result() else {
        return;
    };

    let section_rows = result.scorecard.sections.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(super::HORIZONTAL_MARGIN)
        .vertical_margin(super::VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(7),
            Constraint::Length((section_rows + 3).max(6)),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(area);

    render_summary(session, result, chunks[0], buf);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);
    render_section_table(result, middle[0], buf);
    render_section_chart(result, middle[1], buf);

    render_review(session, app.review_index, chunks[2], buf);

    render_footer(app, "(←/→) review / (l)ist / (q)uit", chunks[3], buf);
}

fn render_summary(session: &Session, result: &TestResult, area: Rect, buf: &mut Buffer) {
    let card = &result.scorecard;
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Score: ", bold),
            Span::styled(
                format!(
                    "{} / {}",
                    format_marks(card.score),
                    format_marks(card.max_score)
                ),
                bold.fg(Color::Cyan),
            ),
            Span::raw(format!("   ({})", format_percent(card.percentage()))),
        ]),
        Line::raw(format!(
            "Time taken: {}   Accuracy: {}",
            format_mm_ss(card.time_taken),
            format_percent(card.accuracy())
        )),
        Line::from(vec![
            Span::styled(format!("Correct: {}", card.correct), Style::default().fg(Color::Green)),
            Span::raw("   "),
            Span::styled(format!("Incorrect: {}", card.incorrect), Style::default().fg(Color::Red)),
            Span::raw("   "),
            Span::styled(
                format!("Unattempted: {}", card.unattempted),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]),
    ];

    let completed = result.completed_at.format("%Y-%m-%d %H:%M").to_string();
    lines.push(Line::from(Span::styled(
        if result.forced {
            format!("Submitted automatically when time ran out at {completed}")
        } else {
            format!("Submitted at {completed}")
        },
        Style::default().add_modifier(Modifier::ITALIC),
    )));

    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Test Results: {} ", session.exam().title)),
        )
        .render(area, buf);
}

fn render_section_table(result: &TestResult, area: Rect, buf: &mut Buffer) {
    let rows: Vec<Row> = result
        .scorecard
        .sections
        .iter()
        .map(|s| {
            Row::new(vec![
                s.name.clone(),
                format!("{} / {}", format_marks(s.score), format_marks(s.max_score)),
                s.correct.to_string(),
                s.incorrect.to_string(),
                s.unattempted.to_string(),
            ])
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(4),
        ],
    )
    .header(
        Row::new(vec!["Section", "Score", "✓", "✗", "–"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(" Sections "))
    .render(area, buf);
}

fn render_section_chart(result: &TestResult, area: Rect, buf: &mut Buffer) {
    let sections = &result.scorecard.sections;
    let inner_width = area.width.saturating_sub(2);
    let width = bar_width(inner_width, sections.len());
    let bars = section_bars(sections, width as usize);
    let data: Vec<(&str, u64)> = bars.iter().map(|(l, v)| (l.as_str(), *v)).collect();

    BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" % by section "))
        .bar_width(width)
        .bar_gap(1)
        .max(100)
        .bar_style(Style::default().fg(Color::Magenta))
        .value_style(Style::default().fg(Color::Black).bg(Color::Magenta))
        .data(data.as_slice())
        .render(area, buf);
}

fn render_review(session: &Session, index: usize, area: Rect, buf: &mut Buffer) {
    let (Some(question), Some(answer)) = (session.question(index), session.answer(index)) else {
        return;
    };

    let (label, color) = match verdict(session, index) {
        Some(Verdict::Correct) => ("Correct", Color::Green),
        Some(Verdict::Incorrect) => ("Incorrect", Color::Red),
        _ => ("Not attempted", Color::Gray),
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("Q{} of {}  ", index + 1, session.len()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ]),
        Line::raw(question.text.clone()),
    ];

    for (idx, option) in question.options.iter().enumerate() {
        let is_correct = question.is_correct(idx);
        let chosen = answer.selected_option == Some(idx);
        let style = match (is_correct, chosen) {
            (true, _) => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            (false, true) => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            (false, false) => Style::default(),
        };
        let marker = if chosen { "»" } else { " " };
        lines.push(Line::styled(format!("{marker} {}. {option}", idx + 1), style));
    }

    if !question.explanation.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Explanation: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                question.explanation.clone(),
                Style::default().add_modifier(Modifier::ITALIC),
            ),
        ]));
    }

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Review "))
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

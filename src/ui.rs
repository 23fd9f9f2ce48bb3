pub mod charting;
pub mod palette;
pub mod results;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Widget, Wrap},
};

use mocktest::{
    catalog::Catalog,
    session::Session,
    util::{format_hms, format_marks, truncate_to_width},
};

use crate::{App, AppState, Dialog};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;
const PALETTE_WIDTH: u16 = 34;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::ExamList => render_exam_list(self, area, buf),
            AppState::Instructions => render_instructions(self, area, buf),
            AppState::Testing => match self.attempt.as_ref() {
                Some(attempt) => render_test(self, attempt.session(), area, buf),
                None => render_exam_list(self, area, buf),
            },
            AppState::Results => match self.attempt.as_ref() {
                Some(attempt) => results::render(self, attempt.session(), area, buf),
                None => render_exam_list(self, area, buf),
            },
            AppState::Admin => render_admin(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

/// Split `area` into body and a one-line footer.
fn with_footer(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    (chunks[0], chunks[1])
}

fn render_footer(app: &App, help: &str, area: Rect, buf: &mut Buffer) {
    let line = match app.notice.borrow().as_deref() {
        Some(notice) => Line::from(vec![
            Span::styled(notice.to_string(), Style::default().fg(Color::Yellow).patch(bold())),
            Span::raw("   "),
            Span::styled(help.to_string(), italic()),
        ]),
        None => Line::from(Span::styled(help.to_string(), italic())),
    };
    Paragraph::new(line).render(area, buf);
}

/// Centered rectangle of at most `width` x `height` inside `area`.
pub(crate) fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_exam_list(app: &App, area: Rect, buf: &mut Buffer) {
    let (body, footer) = with_footer(area);
    let user = app.auth.user();

    let mut lines = vec![
        Line::from(Span::styled(
            format!("Welcome, {} ({})", user.name, user.role),
            bold(),
        )),
        search_line(app),
        Line::raw(""),
    ];

    let exams = app.visible_exams();
    if exams.is_empty() {
        lines.push(Line::from(Span::styled("No exams match", dim())));
    }

    let title_width = (body.width as usize).saturating_sub(40).max(10);
    for (idx, exam) in exams.iter().enumerate() {
        let selected = idx == app.exam_cursor;
        let marker = if selected { "> " } else { "  " };
        let style = if selected {
            Style::default().fg(Color::Cyan).patch(bold())
        } else {
            Style::default()
        };

        let mut spans = vec![
            Span::styled(marker, style),
            Span::styled(
                format!("{:<width$}", truncate_to_width(&exam.title, title_width), width = title_width),
                style,
            ),
            Span::styled(
                format!(
                    "  {:>3} Qs  {:>3} min  {:<6}",
                    exam.total_questions, exam.duration, exam.exam_type
                ),
                dim(),
            ),
        ];
        if exam.is_premium {
            spans.push(Span::styled(
                " premium: upgrade to access",
                Style::default().fg(Color::Yellow),
            ));
        }
        lines.push(Line::from(spans));
    }

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Mock Tests "))
        .render(body, buf);

    let help = if app.search_editing {
        "type to search / (enter) done / (esc) clear"
    } else if app.auth.is_admin() {
        "(↑/↓) select / (enter) open / (/) search / (t)ype / (A)dmin / (q) quit"
    } else {
        "(↑/↓) select / (enter) open / (/) search / (t)ype / (q) quit"
    };
    render_footer(app, help, footer, buf);
}

fn search_line(app: &App) -> Line<'static> {
    let mut spans = vec![
        Span::styled("Search: ", bold()),
        Span::raw(app.search.clone()),
    ];
    if app.search_editing {
        spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
    }
    spans.push(Span::styled(
        format!("   Type: {}", app.type_filter.as_deref().unwrap_or("all")),
        dim(),
    ));
    Line::from(spans)
}

fn render_admin(app: &App, area: Rect, buf: &mut Buffer) {
    let (body, footer) = with_footer(area);

    let rows: Vec<Row> = app
        .catalog
        .exams()
        .into_iter()
        .map(|exam| {
            let loaded = app.catalog.questions(&exam.id).map(|q| q.len()).unwrap_or(0);
            let style = if loaded == exam.total_questions {
                Style::default()
            } else {
                Style::default().fg(Color::Red)
            };
            Row::new(vec![
                exam.id.clone(),
                exam.title.clone(),
                exam.sections.len().to_string(),
                format!("{loaded} / {}", exam.total_questions),
                format_marks(exam.max_marks),
                if exam.is_premium { "yes" } else { "no" }.to_string(),
            ])
            .style(style)
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(16),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(8),
        ],
    )
    .header(Row::new(vec!["Id", "Title", "Sections", "Questions", "Marks", "Premium"]).style(bold()))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Catalog (signed in as {}) ", app.auth.user().email)),
    )
    .render(body, buf);

    render_footer(app, "(b)ack / (q)uit", footer, buf);
}

fn render_instructions(app: &App, area: Rect, buf: &mut Buffer) {
    let (body, footer) = with_footer(area);
    let Some(exam) = app.selected_exam() else {
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(exam.title.clone(), bold())),
        Line::from(Span::styled(exam.description.clone(), italic())),
        Line::raw(""),
        Line::raw(format!(
            "Duration: {} minutes    Questions: {}    Maximum marks: {}",
            exam.duration,
            exam.total_questions,
            format_marks(exam.max_marks)
        )),
        Line::raw(format!(
            "Each wrong answer deducts {} marks. Unattempted questions score nothing.",
            format_marks(exam.negative_marking)
        )),
        Line::raw(""),
        Line::from(Span::styled("Sections", bold())),
    ];
    for section in &exam.sections {
        lines.push(Line::raw(format!(
            "  {:<28} {} questions",
            section.name, section.question_count
        )));
    }

    lines.extend([
        Line::raw(""),
        Line::raw("The timer starts as soon as the test begins and can be paused."),
        Line::raw("When the time runs out, the test is submitted automatically."),
        Line::raw("Use the palette on the right to jump between questions."),
        Line::raw(""),
    ]);

    let (check, check_style) = if app.agreed_to_terms {
        ("[x]", Style::default().fg(Color::Green).patch(bold()))
    } else {
        ("[ ]", bold())
    };
    lines.push(Line::from(vec![
        Span::styled(check, check_style),
        Span::raw(" I have read and understood the instructions"),
    ]));

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Instructions "))
        .wrap(Wrap { trim: false })
        .render(body, buf);

    render_footer(
        app,
        "(space) agree / (enter) start test / (b)ack / (esc)ape",
        footer,
        buf,
    );
}

fn render_test(app: &App, session: &Session, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(session, chunks[0], buf);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(PALETTE_WIDTH)])
        .split(chunks[1]);

    render_question(session, body[0], buf);
    palette::render(session, body[1], buf);

    match app.goto_buffer.as_deref() {
        Some(digits) => Paragraph::new(Line::from(vec![
            Span::styled("Go to question: ", bold()),
            Span::raw(digits.to_string()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            Span::styled("   (enter) jump / (esc) cancel", italic()),
        ]))
        .render(chunks[2], buf),
        None => render_footer(
            app,
            "(1-9) answer / (x) clear / (m)ark / (M) mark & next / (n)ext / (p)rev / (g)oto / (space) pause / (s)ubmit",
            chunks[2],
            buf,
        ),
    }

    if session.is_paused() {
        render_paused(session, area, buf);
    } else if app.dialog == Some(Dialog::ConfirmSubmit) {
        render_confirm_submit(session, area, buf);
    }
}

fn render_header(session: &Session, area: Rect, buf: &mut Buffer) {
    let exam = session.exam();
    let remaining = session.remaining_secs();

    let timer_style = if remaining <= 60 {
        Style::default().fg(Color::Red).patch(bold())
    } else if remaining <= 300 {
        Style::default().fg(Color::Yellow).patch(bold())
    } else {
        bold()
    };

    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    block.render(area, buf);

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(28)])
        .split(inner);

    Paragraph::new(Span::styled(
        truncate_to_width(&exam.title, halves[0].width as usize),
        bold(),
    ))
    .render(halves[0], buf);

    Paragraph::new(Line::from(vec![
        Span::raw("Time Left: "),
        Span::styled(format_hms(remaining), timer_style),
    ]))
    .alignment(Alignment::Right)
    .render(halves[1], buf);
}

fn render_question(session: &Session, area: Rect, buf: &mut Buffer) {
    let index = session.current_index();
    let question = session.current_question();
    let answer = session.current_answer();
    let exam = session.exam();

    let section = exam
        .section(&question.section_id)
        .map(|s| s.name.as_str())
        .unwrap_or("");

    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("Question {} of {}", index + 1, session.len()), bold()),
            Span::styled(format!("   {section}"), dim()),
            Span::styled(
                format!(
                    "   +{} / -{}",
                    format_marks(question.marks),
                    format_marks(exam.negative_marking)
                ),
                dim(),
            ),
        ]),
        Line::raw(""),
        Line::raw(question.text.clone()),
        Line::raw(""),
    ];

    for (idx, option) in question.options.iter().enumerate() {
        let selected = answer.selected_option == Some(idx);
        let (radio, style) = if selected {
            ("(•)", Style::default().fg(Color::Green).patch(bold()))
        } else {
            ("( )", Style::default())
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} {} ", idx + 1, radio), style),
            Span::styled(option.clone(), style),
        ]));
    }

    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled(
        session.status_of(index).map(|s| s.to_string()).unwrap_or_default(),
        palette::status_style(answer.status()),
    )));

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

fn render_paused(session: &Session, area: Rect, buf: &mut Buffer) {
    let popup = popup_area(area, 44, 7);
    Clear.render(popup, buf);

    Paragraph::new(vec![
        Line::from(Span::styled(
            "PAUSED",
            Style::default().fg(Color::Yellow).patch(bold()),
        )),
        Line::raw(""),
        Line::raw(format!("Time left: {}", format_hms(session.remaining_secs()))),
        Line::from(Span::styled("(space) resume / (esc)ape", italic())),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL))
    .render(popup, buf);
}

fn render_confirm_submit(session: &Session, area: Rect, buf: &mut Buffer) {
    let summary = session.summary();
    let popup = popup_area(area, 48, 9);
    Clear.render(popup, buf);

    Paragraph::new(vec![
        Line::from(Span::styled("Submit the test?", bold())),
        Line::raw(""),
        Line::raw(format!("Answered: {} of {}", summary.answered, summary.total)),
        Line::raw(format!("Not answered: {}", summary.not_answered)),
        Line::raw(format!("Marked for review: {}", summary.marked_for_review)),
        Line::raw(""),
        Line::from(Span::styled("(y)es / (n)o", italic())),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL))
    .render(popup, buf);
}

pub mod ui;

use std::{
    cell::RefCell,
    error::Error,
    io::{self, stdin},
    rc::Rc,
    sync::mpsc::Sender,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use mocktest::{
    app_dirs::AppDirs,
    auth::{AuthContext, UserDirectory},
    catalog::{Catalog, InMemoryCatalog},
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    model::Exam,
    runtime::{CrosstermEventSource, ExamEvent, Runner},
    scheduler::IntervalTicker,
    util::{format_hms, format_marks},
    Attempt, TickOutcome,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};

const POLL_INTERVAL_MS: u64 = 250;
const PREMIUM_NOTICE: &str = "Upgrade to access this exam";

/// timed multiple-choice mock exams in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Browse mock exams, take timed multiple-choice tests with a question palette, pause and resume, and review a scored breakdown when time runs out or you submit."
)]
pub struct Cli {
    /// exam to open directly (skips the exam list)
    #[clap(short = 'e', long)]
    exam: Option<String>,

    /// print the available exams and exit
    #[clap(short = 'l', long)]
    list: bool,

    /// account email (defaults to the configured one)
    #[clap(long)]
    email: Option<String>,

    /// account password
    #[clap(long, default_value = "user123")]
    password: String,

    /// countdown period in milliseconds (1000 = real time)
    #[clap(long)]
    tick_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    ExamList,
    Instructions,
    Testing,
    Results,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dialog {
    ConfirmSubmit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub auth: AuthContext,
    pub catalog: InMemoryCatalog,
    pub config: Config,
    pub state: AppState,
    pub exam_cursor: usize,
    pub agreed_to_terms: bool,
    pub attempt: Option<Attempt<IntervalTicker>>,
    pub dialog: Option<Dialog>,
    pub goto_buffer: Option<String>,
    pub review_index: usize,
    pub notice: Rc<RefCell<Option<String>>>,
    /// exam list search over title and description
    pub search: String,
    pub search_editing: bool,
    pub type_filter: Option<String>,
    tick_tx: Sender<ExamEvent>,
}

impl App {
    pub fn new(
        auth: AuthContext,
        catalog: InMemoryCatalog,
        config: Config,
        tick_tx: Sender<ExamEvent>,
    ) -> Self {
        let exam_cursor = config
            .last_exam
            .as_deref()
            .and_then(|id| catalog.exams().iter().position(|e| e.id == id))
            .unwrap_or(0);

        Self {
            auth,
            catalog,
            config,
            state: AppState::ExamList,
            exam_cursor,
            agreed_to_terms: false,
            attempt: None,
            dialog: None,
            goto_buffer: None,
            review_index: 0,
            notice: Rc::new(RefCell::new(None)),
            search: String::new(),
            search_editing: false,
            type_filter: None,
            tick_tx,
        }
    }

    /// Exams shown in the list after search and type filter.
    pub fn visible_exams(&self) -> Vec<&Exam> {
        self.catalog.filter_exams(&self.search, self.type_filter.as_deref())
    }

    pub fn selected_exam(&self) -> Option<&Exam> {
        self.visible_exams().get(self.exam_cursor).copied()
    }

    fn set_notice(&self, msg: impl Into<String>) {
        *self.notice.borrow_mut() = Some(msg.into());
    }

    fn clear_notice(&self) {
        *self.notice.borrow_mut() = None;
    }

    fn clear_filters(&mut self) {
        self.search.clear();
        self.search_editing = false;
        self.type_filter = None;
    }

    /// Step the type filter through every exam type, then back to all.
    fn cycle_type_filter(&mut self) {
        let types = self.catalog.exam_types();
        let next = match self.type_filter.as_deref() {
            None => types.first().copied(),
            Some(current) => types
                .iter()
                .position(|t| *t == current)
                .and_then(|i| types.get(i + 1))
                .copied(),
        };
        self.type_filter = next.map(str::to_string);
        self.exam_cursor = 0;
    }

    /// Move to the instructions of the selected exam unless it is premium.
    fn enter_selected(&mut self) -> bool {
        match self.selected_exam().map(|e| e.is_premium) {
            Some(false) => {
                self.agreed_to_terms = false;
                self.state = AppState::Instructions;
                true
            }
            Some(true) => {
                self.set_notice(PREMIUM_NOTICE);
                self.state = AppState::ExamList;
                false
            }
            None => false,
        }
    }

    pub fn open_exam(&mut self, id: &str) -> bool {
        self.clear_filters();
        match self.catalog.exams().iter().position(|e| e.id == id) {
            Some(pos) => {
                self.exam_cursor = pos;
                self.enter_selected()
            }
            None => {
                self.set_notice(format!("Exam {id} not found"));
                self.state = AppState::ExamList;
                false
            }
        }
    }

    pub fn start_test(&mut self) {
        let Some(exam) = self.selected_exam().cloned() else {
            return;
        };
        if exam.is_premium {
            self.set_notice(PREMIUM_NOTICE);
            self.state = AppState::ExamList;
            return;
        }

        let questions = match self.catalog.questions(&exam.id) {
            Ok(qs) => qs,
            Err(e) => {
                tracing::warn!("cannot start {}: {}", exam.id, e);
                self.set_notice(e.to_string());
                self.state = AppState::ExamList;
                return;
            }
        };

        let ticker = IntervalTicker::new(self.tick_tx.clone());
        let period = Duration::from_millis(self.config.tick_millis.max(1));
        match Attempt::begin(exam.clone(), questions, ticker, period) {
            Ok(mut attempt) => {
                let notice = Rc::clone(&self.notice);
                attempt.on_forced_submit(move |result| {
                    *notice.borrow_mut() = Some(format!(
                        "Time's up! Your test was submitted: {} / {}",
                        format_marks(result.scorecard.score),
                        format_marks(result.scorecard.max_score)
                    ));
                });
                self.attempt = Some(attempt);
                self.dialog = None;
                self.goto_buffer = None;
                self.review_index = 0;
                self.state = AppState::Testing;
                self.clear_notice();
                self.config.last_exam = Some(exam.id);
            }
            Err(e) => {
                tracing::warn!("cannot start {}: {}", exam.id, e);
                self.set_notice(e.to_string());
                self.state = AppState::ExamList;
            }
        }
    }

    fn finish_test(&mut self) {
        if let Some(attempt) = self.attempt.as_mut() {
            if attempt.submit().is_applied() {
                self.set_notice("Test submitted");
            }
        }
        self.dialog = None;
        self.review_index = 0;
        self.state = AppState::Results;
    }

    pub fn on_tick(&mut self, epoch: u64) {
        if self.state != AppState::Testing {
            return;
        }
        if let Some(attempt) = self.attempt.as_mut() {
            if attempt.on_tick(epoch) == TickOutcome::ForcedSubmit {
                self.dialog = None;
                self.goto_buffer = None;
                self.review_index = 0;
                self.state = AppState::Results;
            }
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }

        // a notice lasts until the next key
        self.clear_notice();

        match self.state {
            AppState::ExamList => self.on_exam_list_key(key),
            AppState::Instructions => self.on_instructions_key(key),
            AppState::Testing => self.on_testing_key(key),
            AppState::Results => self.on_results_key(key),
            AppState::Admin => self.on_admin_key(key),
        }
    }

    fn on_exam_list_key(&mut self, key: KeyEvent) -> Flow {
        if self.search_editing {
            match key.code {
                KeyCode::Char(c) => self.search.push(c),
                KeyCode::Backspace => {
                    self.search.pop();
                }
                KeyCode::Enter => self.search_editing = false,
                KeyCode::Esc => {
                    self.search.clear();
                    self.search_editing = false;
                }
                _ => {}
            }
            self.exam_cursor = 0;
            return Flow::Continue;
        }

        let count = self.visible_exams().len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Up | KeyCode::Char('k') => {
                self.exam_cursor = self.exam_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.exam_cursor + 1 < count {
                    self.exam_cursor += 1;
                }
            }
            KeyCode::Enter => {
                self.enter_selected();
            }
            KeyCode::Char('/') => self.search_editing = true,
            KeyCode::Char('t') => self.cycle_type_filter(),
            KeyCode::Char('A') => match self.auth.require_admin() {
                Ok(_) => self.state = AppState::Admin,
                Err(e) => self.set_notice(e.to_string()),
            },
            _ => {}
        }
        Flow::Continue
    }

    fn on_admin_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => {
                self.state = AppState::ExamList;
            }
            _ => {}
        }
        Flow::Continue
    }

    fn on_instructions_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Esc => return Flow::Quit,
            KeyCode::Char(' ') | KeyCode::Char('a') => {
                self.agreed_to_terms = !self.agreed_to_terms;
            }
            KeyCode::Enter => {
                if self.agreed_to_terms {
                    self.start_test();
                } else {
                    self.set_notice("Accept the instructions before starting");
                }
            }
            KeyCode::Char('b') | KeyCode::Backspace => {
                self.state = AppState::ExamList;
            }
            _ => {}
        }
        Flow::Continue
    }

    fn on_testing_key(&mut self, key: KeyEvent) -> Flow {
        let confirm = self.config.confirm_submit;
        let Some(attempt) = self.attempt.as_mut() else {
            self.state = AppState::ExamList;
            return Flow::Continue;
        };

        if self.dialog == Some(Dialog::ConfirmSubmit) {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.finish_test(),
                KeyCode::Char('n') | KeyCode::Esc => self.dialog = None,
                _ => {}
            }
            return Flow::Continue;
        }

        if let Some(buffer) = self.goto_buffer.as_mut() {
            match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() => buffer.push(c),
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Enter => {
                    // palette numbers start at 1
                    if let Some(n) = buffer.parse::<usize>().ok().filter(|n| *n > 0) {
                        let _ = attempt.navigate_to(n - 1);
                    }
                    self.goto_buffer = None;
                }
                KeyCode::Esc => self.goto_buffer = None,
                _ => {}
            }
            return Flow::Continue;
        }

        if attempt.session().is_paused() {
            match key.code {
                KeyCode::Char(' ') | KeyCode::Char('r') | KeyCode::Enter => {
                    let _ = attempt.resume();
                }
                KeyCode::Esc => return Flow::Quit,
                _ => {}
            }
            return Flow::Continue;
        }

        match key.code {
            KeyCode::Esc => return Flow::Quit,
            KeyCode::Char(c @ '1'..='9') => {
                let option = c as usize - '1' as usize;
                let _ = attempt.select_option(option);
            }
            KeyCode::Char('x') => {
                let _ = attempt.clear_response();
            }
            KeyCode::Char('m') => {
                let _ = attempt.toggle_mark_for_review();
            }
            KeyCode::Char('M') => {
                let _ = attempt.mark_and_next();
            }
            KeyCode::Char('n') | KeyCode::Right | KeyCode::Enter => {
                let _ = attempt.save_and_next();
            }
            KeyCode::Char('p') | KeyCode::Left => {
                let _ = attempt.previous();
            }
            KeyCode::Char('g') => self.goto_buffer = Some(String::new()),
            KeyCode::Char(' ') => {
                let _ = attempt.pause();
            }
            KeyCode::Char('s') => {
                if confirm {
                    self.dialog = Some(Dialog::ConfirmSubmit);
                } else {
                    self.finish_test();
                }
            }
            _ => {}
        }
        Flow::Continue
    }

    fn on_results_key(&mut self, key: KeyEvent) -> Flow {
        let count = self
            .attempt
            .as_ref()
            .map(|a| a.session().len())
            .unwrap_or(0);

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Right | KeyCode::Down | KeyCode::Char('n') => {
                if self.review_index + 1 < count {
                    self.review_index += 1;
                }
            }
            KeyCode::Left | KeyCode::Up | KeyCode::Char('p') => {
                self.review_index = self.review_index.saturating_sub(1);
            }
            KeyCode::Char('l') | KeyCode::Backspace => {
                self.attempt = None;
                self.state = AppState::ExamList;
            }
            _ => {}
        }
        Flow::Continue
    }
}

fn print_exams(catalog: &InMemoryCatalog) {
    for exam in catalog.exams() {
        println!(
            "{:<12} {:<32} {:<8} {:>3} questions  {}  -{} per wrong answer{}",
            exam.id,
            exam.title,
            exam.exam_type,
            exam.total_questions,
            format_hms(exam.duration_secs()),
            format_marks(exam.negative_marking),
            if exam.is_premium { "  [premium]" } else { "" }
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let _log_guard = match AppDirs::state_dir() {
        Some(dir) => logging::init(&dir).ok(),
        None => None,
    };

    let catalog = InMemoryCatalog::sample()?;

    if cli.list {
        print_exams(&catalog);
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let mut config = store.load();
    if let Some(ms) = cli.tick_ms {
        config.tick_millis = ms;
    }
    let email = cli.email.clone().unwrap_or_else(|| config.email.clone());

    let users = UserDirectory::with_demo_accounts();
    let auth = match users.login(&email, &cli.password) {
        Ok(auth) => auth,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, e.to_string()).exit();
        }
    };

    let events = CrosstermEventSource::new();
    let runner = Runner::new(events, Duration::from_millis(POLL_INTERVAL_MS));

    let mut app = App::new(auth, catalog, config, runner.sender());
    if let Some(id) = cli.exam.as_deref() {
        app.open_exam(id);
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.config.email = app.auth.user().email.clone();
    if let Err(e) = store.save(&app.config) {
        tracing::warn!("could not save config to {}: {}", store.path().display(), e);
    }
    if let Some(attempt) = app.attempt.take() {
        if !attempt.session().is_ended() {
            attempt.abandon();
        }
    }
    app.auth.logout();

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<CrosstermEventSource>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            ExamEvent::Tick { epoch } => {
                app.on_tick(epoch);
                terminal.draw(|f| ui(app, f))?;
            }
            ExamEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            ExamEvent::Key(key) => {
                if app.on_key(key) == Flow::Quit {
                    break;
                }
                terminal.draw(|f| ui(app, f))?;
            }
            ExamEvent::Idle => {}
        }
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

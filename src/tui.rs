//! Full-screen terminal front end over a [`Session`].
use std::{
    env, fs,
    io::{self, Stdout, Write},
    process::Command,
    time::Instant,
};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{debug, warn};

use crate::{
    config::ProcessDefinition,
    constants::{DEFAULT_EDITOR, LOG_TAIL_LINES, POLL_INTERVAL, STATUS_MESSAGE_TTL},
    editor,
    gateway::CommandRunner,
    logs::{LogKind, process_log},
    session::{Action, Session},
    status::{ProcessStatus, format_uptime},
    transaction::Edit,
};

/// What the keyboard currently drives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    List,
    ConfirmDelete(String),
    /// A save failed; the buffer is kept so the operator can retry or cancel.
    EditFailed {
        buffer: String,
        original: Option<String>,
        error: String,
    },
}

enum Flow {
    Continue,
    Quit,
}

struct App<'a, R> {
    session: &'a mut Session<R>,
    mode: Mode,
    message_since: Option<Instant>,
}

/// Runs the wrapped cleanup when dropped, including during a panic unwind.
struct OnDrop<F: FnMut()>(F);

impl<F: FnMut()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        (self.0)();
    }
}

/// Takes over the terminal until the operator quits.
pub fn run<R: CommandRunner>(session: &mut Session<R>) -> io::Result<()> {
    let mut stdout = io::stdout();
    enter_screen(&mut stdout)?;
    let _restore = OnDrop(|| {
        if let Err(err) = leave_screen(&mut io::stdout()) {
            warn!("Failed to restore terminal: {err}");
        }
    });

    let mut app = App {
        session,
        mode: Mode::List,
        message_since: None,
    };
    app.event_loop(&mut stdout)
}

fn enter_screen(stdout: &mut Stdout) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, cursor::Hide)
}

fn leave_screen(stdout: &mut Stdout) -> io::Result<()> {
    execute!(stdout, LeaveAlternateScreen, cursor::Show)?;
    terminal::disable_raw_mode()
}

impl<R: CommandRunner> App<'_, R> {
    fn event_loop(&mut self, stdout: &mut Stdout) -> io::Result<()> {
        let mut last_poll = Instant::now();

        loop {
            self.expire_message();
            self.draw(stdout)?;

            let timeout = POLL_INTERVAL.saturating_sub(last_poll.elapsed());
            if event::poll(timeout)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
                && let Flow::Quit = self.handle_key(key, stdout)?
            {
                return Ok(());
            }

            if last_poll.elapsed() >= POLL_INTERVAL {
                self.session.poll();
                last_poll = Instant::now();
            }
        }
    }

    fn expire_message(&mut self) {
        let has_message = self.session.message().is_some();
        match (has_message, self.message_since) {
            (true, None) => self.message_since = Some(Instant::now()),
            (true, Some(since)) if since.elapsed() >= STATUS_MESSAGE_TTL => {
                self.session.clear_message();
                self.message_since = None;
            }
            (false, _) => self.message_since = None,
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent, stdout: &mut Stdout) -> io::Result<Flow> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(Flow::Quit);
        }

        match self.mode.clone() {
            Mode::List => return self.handle_list_key(key.code, stdout),
            Mode::ConfirmDelete(name) => {
                if let KeyCode::Char('y') | KeyCode::Char('Y') = key.code {
                    self.save(Edit::Delete(name), None, String::new());
                } else {
                    self.mode = Mode::List;
                }
            }
            Mode::EditFailed {
                buffer, original, ..
            } => match key.code {
                KeyCode::Char('e') | KeyCode::Enter => self.edit(buffer, original, stdout)?,
                KeyCode::Esc | KeyCode::Char('q') => self.mode = Mode::List,
                _ => {}
            },
        }
        Ok(Flow::Continue)
    }

    fn handle_list_key(&mut self, code: KeyCode, stdout: &mut Stdout) -> io::Result<Flow> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Flow::Quit),
            KeyCode::Down | KeyCode::Char('j') => self.session.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.session.select_previous(),
            KeyCode::Char('s') => self.control(Action::Start),
            KeyCode::Char('x') => self.control(Action::Stop),
            KeyCode::Char('r') => self.control(Action::Restart),
            KeyCode::Char('a') => {
                self.edit(editor::template_text().to_string(), None, stdout)?;
            }
            KeyCode::Char('e') => {
                if let Some(process) = self.session.selected() {
                    let original = process.name().to_string();
                    let text = match &process.definition {
                        Some(definition) => editor::definition_text(definition),
                        None => editor::definition_text(&editor::default_definition(&original)),
                    };
                    self.edit(text, Some(original), stdout)?;
                }
            }
            KeyCode::Char('d') => {
                if let Some(process) = self.session.selected() {
                    let name = process
                        .definition
                        .as_ref()
                        .map_or_else(|| process.name().to_string(), |d| d.name.clone());
                    self.mode = Mode::ConfirmDelete(name);
                }
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn control(&mut self, action: Action) {
        if let Err(err) = self.session.control_selected(action) {
            warn!("{action:?} failed: {err}");
        }
    }

    /// Opens `$EDITOR` on `text` and saves the result.
    fn edit(
        &mut self,
        text: String,
        original: Option<String>,
        stdout: &mut Stdout,
    ) -> io::Result<()> {
        leave_screen(stdout)?;
        let edited = run_editor(&text);
        enter_screen(stdout)?;

        let buffer = match edited {
            Ok(buffer) => buffer,
            Err(err) => {
                self.mode = Mode::EditFailed {
                    buffer: text,
                    original,
                    error: format!("failed to run editor: {err}"),
                };
                return Ok(());
            }
        };

        match editor::parse_definition_text(&buffer) {
            Ok(definition) => {
                let edit = match &original {
                    Some(name) => Edit::Update {
                        original: name.clone(),
                        definition,
                    },
                    None => Edit::Add(definition),
                };
                self.save(edit, original, buffer);
            }
            Err(err) => {
                self.mode = Mode::EditFailed {
                    buffer,
                    original,
                    error: err.to_string(),
                }
            }
        }
        Ok(())
    }

    fn save(&mut self, edit: Edit, original: Option<String>, buffer: String) {
        match self.session.apply(edit) {
            Ok(()) => self.mode = Mode::List,
            Err(err) => {
                self.mode = Mode::EditFailed {
                    buffer,
                    original,
                    error: format!("{} ({:?} step)", err, err.step),
                }
            }
        }
    }

    fn draw(&self, stdout: &mut Stdout) -> io::Result<()> {
        let (width, height) = terminal::size()?;
        let width = usize::from(width);
        let mut lines: Vec<(Option<Color>, String)> = Vec::new();

        lines.push((
            Some(Color::Cyan),
            format!("supervisord-tui  {}", self.session.config().path.display()),
        ));
        lines.push((None, String::new()));

        if self.session.processes().is_empty() {
            lines.push((Some(Color::DarkGrey), "No processes reported".to_string()));
        }
        for (index, process) in self.session.processes().iter().enumerate() {
            let marker = if index == self.session.selected_index() { '>' } else { ' ' };
            let record = &process.record;
            let pid = if record.pid > 0 { record.pid.to_string() } else { "-".into() };
            let uptime = if record.uptime.is_zero() {
                "-".to_string()
            } else {
                format_uptime(record.uptime)
            };
            lines.push((
                status_color(record.status),
                format!(
                    "{marker} {:<30} {:<9} {:>8}  {}",
                    record.name,
                    record.status.as_ref(),
                    pid,
                    uptime
                ),
            ));
        }

        if let Some(process) = self.session.selected() {
            lines.push((None, String::new()));
            match &process.definition {
                Some(definition) => {
                    for detail in definition_text_lines(definition) {
                        lines.push((None, detail));
                    }
                }
                None => lines.push((Some(Color::DarkGrey), "No config entry".to_string())),
            }
            for (kind, title) in [(LogKind::Stderr, "Error Log"), (LogKind::Stdout, "Stdout Log")]
            {
                lines.push((None, String::new()));
                lines.push((Some(Color::Cyan), title.to_string()));
                for line in process_log(process, kind, LOG_TAIL_LINES) {
                    let color = (kind == LogKind::Stderr).then_some(Color::Red);
                    lines.push((color, line));
                }
            }
        }

        let footer = self.footer();
        let body_rows = usize::from(height).saturating_sub(footer.len());
        lines.truncate(body_rows);

        queue!(stdout, terminal::Clear(ClearType::All))?;
        for (row, (color, text)) in lines.iter().chain(footer.iter()).enumerate() {
            let row = if row < lines.len() {
                row
            } else {
                body_rows + (row - lines.len())
            };
            queue!(stdout, cursor::MoveTo(0, row as u16))?;
            if let Some(color) = color {
                queue!(stdout, SetForegroundColor(*color))?;
            }
            queue!(stdout, Print(truncate(text, width)), ResetColor)?;
        }
        stdout.flush()
    }

    fn footer(&self) -> Vec<(Option<Color>, String)> {
        let mut footer = Vec::new();
        match &self.mode {
            Mode::List => {
                if let Some(error) = self.session.last_error() {
                    footer.push((Some(Color::Red), format!("Error: {error}")));
                } else if let Some(message) = self.session.message() {
                    footer.push((Some(Color::Green), message.to_string()));
                }
                footer.push((
                    Some(Color::DarkGrey),
                    "j/k: move | s: start | x: stop | r: restart | a: add | e: edit | d: delete | q: quit"
                        .to_string(),
                ));
            }
            Mode::ConfirmDelete(name) => footer.push((
                Some(Color::Yellow),
                format!("Delete '{name}' from the config? (y/N)"),
            )),
            Mode::EditFailed { error, .. } => {
                for line in error.lines() {
                    footer.push((Some(Color::Red), format!("Error: {line}")));
                }
                footer.push((
                    Some(Color::DarkGrey),
                    "e/Enter: edit again | Esc: cancel".to_string(),
                ));
            }
        }
        footer
    }
}

fn definition_text_lines(definition: &ProcessDefinition) -> Vec<String> {
    editor::definition_text(definition)
        .lines()
        .skip(1)
        .map(|line| format!("  {line}"))
        .collect()
}

fn status_color(status: ProcessStatus) -> Option<Color> {
    match status {
        ProcessStatus::Running => Some(Color::Green),
        ProcessStatus::Starting | ProcessStatus::Stopping => Some(Color::Yellow),
        ProcessStatus::Fatal | ProcessStatus::Exited => Some(Color::Red),
        ProcessStatus::Stopped | ProcessStatus::Unknown => None,
    }
}

fn truncate(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        return line.to_string();
    }
    if width <= 3 {
        return ".".repeat(width);
    }
    let mut cut: String = line.chars().take(width - 3).collect();
    cut.push_str("...");
    cut
}

/// Writes `text` to a temp file, opens `$EDITOR` on it and reads it back.
fn run_editor(text: &str) -> io::Result<String> {
    let editor = env::var("EDITOR")
        .ok()
        .filter(|editor| !editor.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
    edit_with(&editor, text)
}

/// Runs `editor` (program plus optional arguments) on a private temp copy of `text`.
fn edit_with(editor: &str, text: &str) -> io::Result<String> {
    let mut file = tempfile::Builder::new()
        .prefix("supervisord-tui-")
        .suffix(".conf")
        .tempfile()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    debug!("Opening {} with {editor}", file.path().display());

    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or(DEFAULT_EDITOR);
    let status = Command::new(program).args(parts).arg(file.path()).status()?;
    if !status.success() {
        return Err(io::Error::other(format!("editor exited with {status}")));
    }
    fs::read_to_string(file.path())
}

//! Terminal front end: one progress line on stderr and single-key dialogs.

use std::io::{self, Stderr, Write};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use cascade_ops::{
    Conflict, DialogAnswer, OperationError, OperationUi, OverwriteRule, ProgressSurface,
    UserSignal,
};
use chrono::{DateTime, Local};
use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::tty::IsTty;
use crossterm::queue;
use humansize::{BINARY, format_size};

/// Minimum time between two redraws of the progress line.
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Interactive console UI.
///
/// Raw mode is enabled only when stdin is a terminal; otherwise every
/// question gets the cautious answer and no key is ever polled.
pub struct ConsoleUi {
    out: Stderr,
    raw: bool,
    current: String,
    file_bytes: (u64, u64),
    total_bytes: (u64, u64),
    files: (u64, u64),
    speed: String,
    eta: String,
    last_draw: Option<Instant>,
}

impl ConsoleUi {
    pub fn new() -> io::Result<Self> {
        let raw = io::stdin().is_tty();
        if raw {
            terminal::enable_raw_mode()?;
        }
        Ok(Self {
            out: io::stderr(),
            raw,
            current: String::new(),
            file_bytes: (0, 0),
            total_bytes: (0, 0),
            files: (0, 0),
            speed: String::new(),
            eta: String::new(),
            last_draw: None,
        })
    }

    fn redraw(&mut self, force: bool) {
        if !force && self.last_draw.is_some_and(|at| at.elapsed() < REDRAW_INTERVAL) {
            return;
        }
        self.last_draw = Some(Instant::now());

        let files = if self.files.1 > 0 {
            format!("{}/{}", self.files.0, self.files.1)
        } else {
            self.files.0.to_string()
        };
        let bytes = if self.total_bytes.1 > 0 {
            format!(
                "{}/{}",
                format_size(self.total_bytes.0, BINARY),
                format_size(self.total_bytes.1, BINARY)
            )
        } else {
            format_size(self.total_bytes.0, BINARY)
        };
        let file_percent = if self.file_bytes.1 > 0 {
            self.file_bytes.0 * 100 / self.file_bytes.1
        } else {
            100
        };

        let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
        let mut line = format!(
            "[{files}] {bytes} {} {} {file_percent:>3}% {}",
            self.speed, self.eta, self.current
        );
        if line.chars().count() > width.saturating_sub(1) {
            line = line.chars().take(width.saturating_sub(2)).collect::<String>() + "…";
        }

        let _ = queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        );
        let _ = self.out.flush();
    }

    fn clear_line(&mut self) {
        let _ = queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine));
    }

    fn say(&mut self, text: &str) {
        self.clear_line();
        let _ = queue!(self.out, Print(text), Print("\r\n"));
        let _ = self.out.flush();
    }

    /// Block until one of `keys` (or Esc) is pressed.
    fn read_key(&mut self, keys: &[char]) -> Option<char> {
        if !self.raw {
            return None;
        }
        loop {
            match event::read() {
                Ok(Event::Key(KeyEvent {
                    code,
                    modifiers,
                    kind: KeyEventKind::Press,
                    ..
                })) => match code {
                    KeyCode::Esc => return None,
                    KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return None,
                    KeyCode::Char(c) if keys.contains(&c) => return Some(c),
                    _ => {}
                },
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(%err, "cannot read key");
                    return None;
                }
            }
        }
    }
}

impl Drop for ConsoleUi {
    fn drop(&mut self) {
        self.clear_line();
        let _ = self.out.flush();
        if self.raw {
            let _ = terminal::disable_raw_mode();
        }
    }
}

impl ProgressSurface for ConsoleUi {
    fn set_current_file(&mut self, source: &str, destination: Option<&str>) {
        self.current = match destination {
            Some(destination) => format!("{source} -> {destination}"),
            None => source.to_string(),
        };
        self.redraw(false);
    }

    fn set_file_bytes(&mut self, done: u64, total: u64) {
        self.file_bytes = (done, total);
        self.redraw(false);
    }

    fn set_total_bytes(&mut self, done: u64, total: u64) {
        self.total_bytes = (done, total);
    }

    fn set_files(&mut self, done: u64, total: u64) {
        self.files = (done, total);
        self.redraw(false);
    }

    fn set_speed(&mut self, speed: &str) {
        self.speed = speed.to_string();
    }

    fn set_eta(&mut self, eta: &str) {
        self.eta = eta.to_string();
    }

    fn poll_signal(&mut self) -> Option<UserSignal> {
        if !self.raw {
            return None;
        }
        while let Ok(true) = event::poll(Duration::ZERO) {
            if let Ok(Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            })) = event::read()
            {
                match code {
                    KeyCode::Esc | KeyCode::Char('q') => return Some(UserSignal::Abort),
                    KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                        return Some(UserSignal::Abort);
                    }
                    KeyCode::Char('s') => return Some(UserSignal::Skip),
                    _ => {}
                }
            }
        }
        None
    }
}

impl OperationUi for ConsoleUi {
    fn ask_retry(&mut self, error: &OperationError, allow_ignore: bool) -> DialogAnswer {
        self.say(&format!("Error: {error}"));
        let (prompt, keys): (&str, &[char]) = if allow_ignore {
            ("[r]etry  [s]kip  [i]gnore  [c]ancel", &['r', 's', 'i', 'c'])
        } else {
            ("[r]etry  [s]kip  [c]ancel", &['r', 's', 'c'])
        };
        self.say(prompt);

        let answer = match self.read_key(keys) {
            Some('r') => DialogAnswer::Retry,
            Some('s') => DialogAnswer::Skip,
            Some('i') => DialogAnswer::Ignore,
            Some(_) => DialogAnswer::Cancel,
            None if self.raw => DialogAnswer::Cancel,
            None => DialogAnswer::Skip,
        };
        self.redraw(true);
        answer
    }

    fn ask_overwrite(&mut self, conflict: &Conflict) -> OverwriteRule {
        self.say(&format!("File exists: {}", conflict.destination.display()));
        self.say(&format!(
            "  new:      {:>10}  {}",
            format_size(conflict.source_stat.size, BINARY),
            format_time(conflict.source_stat.modified)
        ));
        self.say(&format!(
            "  existing: {:>10}  {}",
            format_size(conflict.destination_stat.size, BINARY),
            format_time(conflict.destination_stat.modified)
        ));
        self.say(
            "[y]es  [n]o  a[p]pend  [a]ll  [u]pdate  [s]ize differs  n[o]ne  [Esc] abort",
        );

        let rule = match self.read_key(&['y', 'n', 'p', 'a', 'u', 's', 'o']) {
            Some('y') => OverwriteRule::Yes,
            Some('n') => OverwriteRule::No,
            Some('p') => OverwriteRule::Append,
            Some('a') => OverwriteRule::All,
            Some('u') => OverwriteRule::Update,
            Some('s') => OverwriteRule::SizeDiffers,
            Some(_) => OverwriteRule::None,
            None if self.raw => OverwriteRule::Abort,
            None => OverwriteRule::No,
        };
        self.redraw(true);
        rule
    }

    fn confirm_keep_incomplete(&mut self, destination: &Path) -> bool {
        self.say(&format!(
            "Incomplete file was retrieved: {}",
            destination.display()
        ));
        self.say("[k]eep  [d]elete");
        let keep = self.read_key(&['k', 'd']) == Some('k');
        self.redraw(true);
        keep
    }
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

//! Console rendering for report events
//!
//! TTY sessions get an animated indicatif bar per uploaded file; non-TTY
//! sessions get one line per file on stderr so piped output stays readable.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

use super::{ReportEvent, Reporter};

/// Output mode, detected from the terminal and user preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Animated progress bars
    Tty,
    /// Line-per-event output to stderr
    NonTty,
    /// Messages only, no progress output
    Quiet,
}

impl ProgressMode {
    pub fn detect(quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if std::io::stderr().is_terminal() {
            Self::Tty
        } else {
            Self::NonTty
        }
    }
}

/// Reporter rendering to the terminal
pub struct ConsoleReporter {
    mode: ProgressMode,
    // One upload at a time; holds the bar for the file in flight
    active: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new(mode: ProgressMode) -> Self {
        Self {
            mode,
            active: Mutex::new(None),
        }
    }

    fn start_bar(&self, path: &Path, total_bytes: Option<u64>) {
        if self.mode != ProgressMode::Tty {
            if self.mode == ProgressMode::NonTty {
                eprintln!("Uploading {}...", path.display());
            }
            return;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let bar = match total_bytes {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{msg} [{bar:30}] {bytes}/{total_bytes} ({eta})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{msg} {spinner} {bytes}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message(format!("Uploading {file_name}"));

        if let Ok(mut active) = self.active.lock() {
            *active = Some(bar);
        }
    }

    fn advance(&self, bytes: u64) {
        if let Ok(active) = self.active.lock() {
            if let Some(bar) = active.as_ref() {
                bar.set_position(bytes);
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(bar) = active.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: ReportEvent) {
        match event {
            ReportEvent::UploadStarted { path, total_bytes } => {
                self.start_bar(&path, total_bytes)
            }
            ReportEvent::UploadProgress { bytes } => self.advance(bytes),
            ReportEvent::UploadFinished { .. } => self.finish_bar(),
            ReportEvent::Message(text) => println!("{text}"),
        }
    }
}

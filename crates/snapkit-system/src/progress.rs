//! Terminal progress for downloads and transactions

use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use snapkit_core::ProgressSink;
use std::sync::Mutex;

/// Progress bar on stderr with interactive license prompts
pub struct ConsoleProgress {
    term: Term,
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            bar: Mutex::new(None),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn start(&self, label: &str, total: u64) {
        let bar = if total > 0 {
            ProgressBar::new(total).with_style(Self::bar_style())
        } else {
            ProgressBar::new_spinner()
        };
        bar.set_message(label.to_string());
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn set(&self, current: u64) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_position(current);
            }
        }
    }

    fn finished(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn notify(&self, message: &str) {
        let _ = self.term.write_line(message);
    }

    fn agreed(&self, intro: &str, license: &str) -> bool {
        if !self.term.is_term() {
            return false;
        }

        let _ = self.term.write_line(intro);
        let _ = self.term.write_line(license);
        let _ = self
            .term
            .write_str(&format!("{} ", style("Do you agree? [y/n]").bold()));

        match self.term.read_line() {
            Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                tracing::warn!("could not read license answer: {}", e);
                false
            }
        }
    }
}

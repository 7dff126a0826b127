use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

use quarry_core::{VersionCatalog, VersionEntry, VersionState, VersionType};
use quarry_deploy::OverwritePrompt;
use quarry_lifecycle::{EventSink, LifecycleError};

pub fn print_status(status: &str, message: &str) {
    let style = status_style(status);
    println!(
        "{}{:>5}{} {}",
        style.render(),
        status,
        style.render_reset(),
        message
    );
}

fn status_style(status: &str) -> Style {
    let color = match status {
        "ok" => AnsiColor::Green,
        "error" => AnsiColor::Red,
        "hint" => AnsiColor::Yellow,
        _ => AnsiColor::Cyan,
    };
    Style::new().fg_color(Some(color.into())).effects(Effects::BOLD)
}

pub fn print_version_list(catalog: &VersionCatalog) {
    let mut entries = catalog.entries();
    entries.sort_by(|a, b| {
        (a.version_type().as_str(), a.name().to_string())
            .cmp(&(b.version_type().as_str(), b.name().to_string()))
    });
    for entry in entries {
        let status = match entry.state_change() {
            Some(info) => info.display_status(),
            None if entry.is_installed() => "installed".to_string(),
            None => "not installed".to_string(),
        };
        println!(
            "{:<10} {:<28} {}",
            entry.version_type().as_str(),
            entry.display_name(),
            status
        );
    }
}

/// Renders lifecycle notifications on the terminal: one status line per
/// phase change, a live bar while downloading, one line per failure.
#[derive(Default)]
pub struct TerminalEvents {
    progress: Mutex<Option<ProgressBar>>,
    failed: AtomicBool,
}

impl TerminalEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any operation reported a failure since startup.
    pub fn any_failure(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }
}

impl EventSink for TerminalEvents {
    fn entry_updated(&self, entry: &VersionEntry) {
        let mut slot = self.progress.lock();
        match entry.state_change() {
            Some(info) if info.state() == VersionState::Downloading => {
                let bar = slot.get_or_insert_with(|| {
                    let bar = ProgressBar::new(info.total_size().max(1));
                    if let Ok(style) = ProgressStyle::with_template(
                        "{spinner:.cyan.bold} {msg:<12} [{bar:20.cyan/blue}] {bytes}/{total_bytes}",
                    ) {
                        bar.set_style(style.progress_chars("=>-"));
                    }
                    bar.set_message(entry.display_name());
                    bar
                });
                bar.set_length(info.total_size().max(1));
                bar.set_position(info.downloaded_bytes());
            }
            Some(info) => {
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
                print_status("step", &info.display_status());
            }
            None => {
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
            }
        }
    }

    fn operation_failed(&self, entry: &VersionEntry, error: &LifecycleError) {
        self.failed.store(true, Ordering::Relaxed);
        if let Some(bar) = self.progress.lock().take() {
            bar.finish_and_clear();
        }
        print_status("error", &format!("{}: {error}", entry.display_name()));
        if matches!(error, LifecycleError::NoDownloadLink)
            && entry.version_type() == VersionType::Beta
        {
            print_status(
                "hint",
                "beta downloads require an account enrolled in the beta program",
            );
        }
    }
}

/// Stdin-backed yes/no questions; `--yes` answers everything with yes.
pub struct StdinPrompt {
    assume_yes: bool,
}

impl StdinPrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    pub fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{question} [y/N] ");
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

impl OverwritePrompt for StdinPrompt {
    fn should_replace(&self, destination: &Path) -> bool {
        self.confirm(&format!(
            "{} already exists. Replace it with the backed-up copy? The backed-up copy is lost otherwise.",
            destination.display()
        ))
    }
}

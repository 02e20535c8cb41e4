//! Output formatting and the live run log.
//!
//! Listings render as a table, JSON or plain identifiers depending on
//! `--output`. Engine log lines stream to stderr as they happen, behind a
//! spinner when stderr is a terminal.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use meraport_core::{ChannelSink, LineKind, LogLine, RunLog};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};

// ── Color ────────────────────────────────────────────────────────────

pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Render a run log line with its marker, colored by outcome.
pub fn format_line(line: &LogLine, color: bool) -> String {
    let text = line.timestamped();
    if !color {
        return text;
    }
    match line.kind {
        LineKind::Info => text,
        LineKind::Success => text.green().to_string(),
        LineKind::Skip => text.dimmed().to_string(),
        LineKind::Warn => text.yellow().to_string(),
        LineKind::Fail => text.red().bold().to_string(),
    }
}

// ── Live log ─────────────────────────────────────────────────────────

/// Background printer fed by a [`ChannelSink`].
pub struct LiveLog {
    printer: JoinHandle<()>,
    spinner: ProgressBar,
}

impl LiveLog {
    /// Start printing; the returned [`RunLog`] feeds it. Printing stops once
    /// every clone of the log is dropped and [`LiveLog::finish`] is awaited.
    pub fn start(global: &GlobalOpts, title: &str) -> (RunLog, Self) {
        let (sink, rx) = ChannelSink::new();
        let spinner = if global.quiet || !io::stderr().is_terminal() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.set_message(title.to_owned());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        };
        let printer = tokio::spawn(print_lines(
            rx,
            spinner.clone(),
            should_color(global.color),
            global.quiet,
        ));
        (RunLog::new(Arc::new(sink)), Self { printer, spinner })
    }

    /// Hide the spinner while `f` talks to the terminal.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.spinner.suspend(f)
    }

    pub async fn finish(self) {
        let _ = self.printer.await;
    }
}

async fn print_lines(
    mut rx: mpsc::UnboundedReceiver<LogLine>,
    spinner: ProgressBar,
    color: bool,
    quiet: bool,
) {
    while let Some(line) = rx.recv().await {
        // Quiet mode still reports failures.
        if quiet && line.kind != LineKind::Fail {
            continue;
        }
        let text = format_line(&line, color);
        if spinner.is_hidden() {
            eprintln!("{text}");
        } else {
            spinner.println(text);
        }
    }
    spinner.finish_and_clear();
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single item; tables use the pre-formatted `detail_fn` view.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}

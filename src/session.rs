//! Template editing session
//!
//! One [`TemplateSession`] stands in for one editor window: it owns the
//! template text, the editable command line, the temporary template file
//! and the output pane, and runs at most one scan at a time.
//!
//! Output lines travel from the runner's reader tasks over a bounded channel
//! to a single consumer task, which is the only writer of the pane while a
//! scan runs.

use crate::ansi::StyledRun;
use crate::commands::{build_command_line, is_no_color};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::execution::{Canceller, CommandRunner, RunTask};
use crate::sinks::{ClipboardSink, ErrorSink, TracingErrorSink};
use crate::terminal::{DisplaySurface, OutputPane, RunBuffer};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Bookkeeping for the most recent scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub command_line: String,
    pub plain: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
}

/// Per-window controller for editing and running one scan template
pub struct TemplateSession<S: DisplaySurface + 'static = RunBuffer> {
    config: Config,
    template: String,
    command_line: String,
    template_path: PathBuf,
    pane: Arc<Mutex<OutputPane<S>>>,
    runner: CommandRunner,
    errors: Arc<dyn ErrorSink>,
    current: Option<RunTask>,
    last_run: Arc<Mutex<Option<RunRecord>>>,
    closed: bool,
}

impl TemplateSession<RunBuffer> {
    /// Session rendering into memory and logging errors through `tracing`
    pub fn new(
        tool_path: &Path,
        target_url: &str,
        template_yaml: impl Into<String>,
        config: Config,
    ) -> Result<Self> {
        Self::with_surface(
            tool_path,
            target_url,
            template_yaml,
            config,
            RunBuffer::new(),
            Arc::new(TracingErrorSink),
        )
    }

    /// Visible output text
    pub fn output_text(&self) -> String {
        lock(&self.pane).surface().text()
    }

    /// Output runs in display order
    pub fn output_runs(&self) -> Vec<StyledRun> {
        lock(&self.pane).surface().runs().to_vec()
    }
}

impl<S: DisplaySurface + 'static> TemplateSession<S> {
    /// Create a session rendering into `surface` and reporting to `errors`.
    ///
    /// Creates the temporary template file that every run of this session
    /// reuses, and the default command line pointing at it.
    pub fn with_surface(
        tool_path: &Path,
        target_url: &str,
        template_yaml: impl Into<String>,
        config: Config,
        surface: S,
        errors: Arc<dyn ErrorSink>,
    ) -> Result<Self> {
        let template_path = match create_temp_template(&config) {
            Ok(path) => path,
            Err(e) => {
                errors.report(&e.to_string());
                return Err(e);
            }
        };
        debug!("Temporary template file: {}", template_path.display());

        let command_line = build_command_line(tool_path, &template_path, target_url);
        let runner = CommandRunner::new(config.runner.clone());

        Ok(Self {
            config,
            template: template_yaml.into(),
            command_line,
            template_path,
            pane: Arc::new(Mutex::new(OutputPane::new(surface))),
            runner,
            errors,
            current: None,
            last_run: Arc::new(Mutex::new(None)),
            closed: false,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn set_template(&mut self, template_yaml: impl Into<String>) {
        self.template = template_yaml.into();
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn set_command_line(&mut self, command_line: impl Into<String>) {
        self.command_line = command_line.into();
    }

    /// Path of the temporary template file
    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the current command line asks for uncolored output
    pub fn is_plain(&self) -> bool {
        is_no_color(&self.command_line, self.config.output.no_color_match)
    }

    /// Whether a scan is still delivering output
    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// The most recent scan, if any
    pub fn last_run(&self) -> Option<RunRecord> {
        lock(&self.last_run).clone()
    }

    /// Inspect the display surface
    pub fn with_output<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(lock(&self.pane).surface())
    }

    /// Write the template and start a scan with the current command line.
    ///
    /// A scan that is still running is cancelled and drained first so its
    /// output cannot interleave with the new one. The pane is cleared, which
    /// also resets the renderer.
    pub async fn execute(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Other("session is closed".to_string()));
        }

        if let Some(previous) = self.current.take() {
            previous.cancel();
            previous.wait().await;
        }

        if let Err(e) = fs::write(&self.template_path, &self.template) {
            let err = Error::TemplateWriteFailed {
                path: self.template_path.clone(),
                reason: e.to_string(),
            };
            self.errors.report(&err.to_string());
            return Err(err);
        }

        lock(&self.pane).clear();

        let plain = self.is_plain();
        let handle = match self.runner.spawn(&self.command_line) {
            Ok(handle) => handle,
            Err(e) => {
                self.errors.report(&e.to_string());
                return Err(e);
            }
        };
        info!(
            "Running scan{}: {}",
            if plain { " (plain)" } else { "" },
            self.command_line
        );

        *lock(&self.last_run) = Some(RunRecord {
            command_line: self.command_line.clone(),
            plain,
            started_at: Utc::now(),
            finished_at: None,
            exit_code: None,
        });

        let line_pane = Arc::clone(&self.pane);
        let exit_pane = Arc::clone(&self.pane);
        let last_run = Arc::clone(&self.last_run);
        let errors = Arc::clone(&self.errors);
        let show_exit_status = self.config.output.show_exit_status;

        let task = handle.deliver(
            move |line| {
                lock(&line_pane).append_text(&line, plain);
            },
            move |code| {
                if show_exit_status {
                    let message = format!("\nThe process exited with code {}", code);
                    lock(&exit_pane).append_text(&message, plain);
                }
                if let Some(record) = lock(&last_run).as_mut() {
                    record.finished_at = Some(Utc::now());
                    record.exit_code = Some(code);
                }
            },
            move |message| errors.report(&message),
        );
        self.current = Some(task);
        Ok(())
    }

    /// Wait for the current scan to deliver all output; returns its exit code
    pub async fn wait(&mut self) -> Option<i32> {
        if let Some(task) = self.current.take() {
            task.wait().await;
        }
        self.last_run().and_then(|record| record.exit_code)
    }

    /// Terminate the current scan, if any, without waiting for it
    pub fn cancel(&self) {
        if let Some(task) = &self.current {
            task.cancel();
        }
    }

    /// Handle that cancels the current scan from elsewhere
    pub fn canceller(&self) -> Option<Canceller> {
        self.current.as_ref().map(RunTask::canceller)
    }

    /// Hand the template text verbatim to a clipboard
    pub fn copy_template_to_clipboard(&self, clipboard: &mut dyn ClipboardSink) -> Result<()> {
        clipboard.set_text(&self.template).map_err(|e| {
            self.errors.report(&e.to_string());
            e
        })
    }

    /// Cancel any running scan and delete the temporary template file.
    ///
    /// Safe to call repeatedly and after the file was removed externally.
    /// A failed deletion is reported and returned, but the session is
    /// closed regardless.
    pub fn close(&mut self) -> Result<()> {
        self.cancel();
        self.closed = true;

        match fs::remove_file(&self.template_path) {
            Ok(()) => {
                debug!("Deleted {}", self.template_path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                let err = Error::TempFileCleanupFailed {
                    path: self.template_path.clone(),
                    reason: e.to_string(),
                };
                self.errors.report(&err.to_string());
                Err(err)
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<S: DisplaySurface + 'static> Drop for TemplateSession<S> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

/// Create an empty `{prefix}{uuid}{suffix}` file in the system temp directory
fn create_temp_template(config: &Config) -> Result<PathBuf> {
    let name = format!(
        "{}{}{}",
        config.template.temp_prefix,
        Uuid::new_v4().simple(),
        config.template.temp_suffix
    );
    let path = std::env::temp_dir().join(name);

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| Error::TempFileCreateFailed {
            reason: e.to_string(),
        })?;
    Ok(path)
}

/// Lock, recovering the data if a callback panicked while holding it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

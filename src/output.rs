// ABOUTME: Output formatting for CLI results.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use crate::ssh::CommandOutput;
use serde::Serialize;
use std::io::Write;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Progress messages plus results
    #[default]
    Normal,
    /// Results only
    Quiet,
    /// One JSON object per result
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    started: Instant,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            started: Instant::now(),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            eprintln!("{message}");
        }
    }

    /// Print a one-line result.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.emit(&JsonEvent {
                event: "success",
                message: Some(message),
                duration_secs: self.elapsed_secs(),
                ..Default::default()
            }),
        }
    }

    /// Print the result of a remote command. Normal and quiet modes pass the
    /// remote streams through unchanged.
    pub fn command_output(&self, output: &CommandOutput) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                // Broken pipes on our own stdout are not worth failing over.
                let _ = std::io::stdout().write_all(&output.stdout);
                let _ = std::io::stderr().write_all(&output.stderr);
            }
            OutputMode::Json => {
                let stdout = output.stdout_lossy();
                let stderr = output.stderr_lossy();
                self.emit(&JsonEvent {
                    event: "command",
                    exit_code: Some(output.exit_code),
                    stdout: Some(&stdout),
                    stderr: Some(&stderr),
                    duration_secs: self.elapsed_secs(),
                    ..Default::default()
                });
            }
        }
    }

    /// Print raw bytes, e.g. a remote file's contents.
    pub fn bytes(&self, contents: &[u8]) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                let _ = std::io::stdout().write_all(contents);
            }
            OutputMode::Json => {
                let text = String::from_utf8_lossy(contents);
                self.emit(&JsonEvent {
                    event: "content",
                    stdout: Some(&text),
                    duration_secs: self.elapsed_secs(),
                    ..Default::default()
                });
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message: Some(message),
                    duration_secs: self.elapsed_secs(),
                    ..Default::default()
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    fn elapsed_secs(&self) -> Option<f64> {
        Some(self.started.elapsed().as_secs_f64())
    }

    fn emit(&self, event: &JsonEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            println!("{json}");
        }
    }
}

#[derive(Serialize, Default)]
struct JsonEvent<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdout: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stderr: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

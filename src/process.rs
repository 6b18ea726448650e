// External process execution
//
// Two ways to run a tool:
// - `execute`: wait for exit with output captured, fail on non-zero status
// - `run_with_progress`: treat every stderr line as a heartbeat and credit it
//   to a range of the pipeline's progress while the process runs

use std::collections::VecDeque;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{Result, KaraokeError};
use crate::progress::{ProgressRange, ProgressReporter};

/// Heartbeat lines buffered between the stderr reader and the consumer loop
const HEARTBEAT_CHANNEL_CAPACITY: usize = 256;

/// Diagnostic lines kept for error messages
const STDERR_TAIL_LINES: usize = 20;

/// External tool invocation
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

/// Result of a progress-reporting run; the exit status is not interpreted
#[derive(Debug)]
pub struct ProcessOutcome {
    pub status: ExitStatus,
    pub heartbeats: usize,
    pub stderr_tail: Vec<String>,
}

impl ProcessOutcome {
    /// Convert a non-zero exit into `ToolFailed`
    pub fn ensure_success(&self, description: &str) -> Result<()> {
        if self.status.success() {
            Ok(())
        } else {
            Err(KaraokeError::ToolFailed {
                tool: description.to_string(),
                code: self.status.code(),
                stderr: self.stderr_tail.join("\n"),
            })
        }
    }
}

impl ToolCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a path argument
    pub fn path_arg<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args).kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> KaraokeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            KaraokeError::ToolUnavailable(self.binary_path.clone())
        } else {
            KaraokeError::Io(e)
        }
    }

    /// Run to completion with stdout and stderr captured
    pub async fn execute(&self) -> Result<Output> {
        debug!("Executing {}: {} {:?}", self.description, self.binary_path, self.args);

        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KaraokeError::ToolFailed {
                tool: self.description.clone(),
                code: output.status.code(),
                stderr: tail_lines(&stderr, STDERR_TAIL_LINES),
            });
        }

        Ok(output)
    }

    /// Run while crediting each stderr line to `range` of `reporter`.
    ///
    /// Returns once the process exited and its stderr is drained, whatever the
    /// exit status. Only a failure to spawn is an error here.
    pub async fn run_with_progress(
        &self,
        reporter: &mut ProgressReporter,
        range: ProgressRange,
    ) -> Result<ProcessOutcome> {
        debug!("Running {}: {} {:?}", self.description, self.binary_path, self.args);

        let mut child = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| KaraokeError::Media(format!("{}: stderr not captured", self.description)))?;

        let (tx, mut rx) = mpsc::channel::<String>(HEARTBEAT_CHANNEL_CAPACITY);
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Stopped reading diagnostic stream: {}", e);
                        break;
                    }
                }
            }
        });

        let step = range.step();
        let mut heartbeats = 0usize;
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut status: Option<ExitStatus> = None;

        loop {
            tokio::select! {
                biased;
                line = rx.recv() => match line {
                    Some(line) => {
                        trace!("{}: {}", self.description, line);
                        heartbeats += 1;
                        reporter.advance(step, range.end);
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                    None => break,
                },
                exited = child.wait(), if status.is_none() => {
                    status = Some(exited?);
                }
            }
        }

        let status = match status {
            Some(status) => status,
            None => child.wait().await?,
        };

        if let Err(e) = reader.await {
            warn!("Diagnostic stream reader ended abnormally: {}", e);
        }

        debug!("{} exited with {} after {} heartbeats", self.description, status, heartbeats);

        Ok(ProcessOutcome {
            status,
            heartbeats,
            stderr_tail: tail.into_iter().collect(),
        })
    }
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}


#[cfg(test)]
mod tests {
    use super::*;

    fn silent_reporter() -> ProgressReporter {
        ProgressReporter::with_sink(Box::new(std::io::sink()))
    }

    fn shell(script: &str) -> ToolCommand {
        ToolCommand::new("sh", "test script").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_each_stderr_line_is_one_step() {
        let mut reporter = silent_reporter();
        let outcome = shell("for i in 1 2 3 4 5 6 7 8 9 10; do echo frame=$i >&2; done")
            .run_with_progress(&mut reporter, ProgressRange::new(0.0, 50.0))
            .await
            .unwrap();

        assert!(outcome.status.success());
        assert_eq!(outcome.heartbeats, 10);
        assert_eq!(reporter.current(), 5.0);
        assert_eq!(reporter.reported(), &[0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_progress_is_clamped_to_range_end() {
        let mut reporter = silent_reporter();
        reporter.set_absolute(75.0);
        let outcome = shell("i=0; while [ $i -lt 300 ]; do echo x >&2; i=$((i+1)); done")
            .run_with_progress(&mut reporter, ProgressRange::FINAL)
            .await
            .unwrap();

        assert_eq!(outcome.heartbeats, 300);
        assert_eq!(reporter.current(), 100.0);
        assert_eq!(reporter.reported().iter().filter(|&&p| p == 100).count(), 1);
    }

    #[tokio::test]
    async fn test_stdout_is_not_a_heartbeat() {
        let mut reporter = silent_reporter();
        let outcome = shell("echo one; echo two")
            .run_with_progress(&mut reporter, ProgressRange::BACKGROUND)
            .await
            .unwrap();

        assert_eq!(outcome.heartbeats, 0);
        assert!(reporter.reported().is_empty());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_returned_not_raised() {
        let mut reporter = silent_reporter();
        let outcome = shell("echo broken pipeline >&2; exit 3")
            .run_with_progress(&mut reporter, ProgressRange::BACKGROUND)
            .await
            .unwrap();

        assert_eq!(outcome.status.code(), Some(3));
        assert_eq!(outcome.stderr_tail, vec!["broken pipeline".to_string()]);
        match outcome.ensure_success("test script") {
            Err(KaraokeError::ToolFailed { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken pipeline");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_large_stderr_does_not_deadlock() {
        let mut reporter = silent_reporter();
        let outcome = shell("i=0; while [ $i -lt 5000 ]; do echo 'padding padding padding padding' >&2; i=$((i+1)); done")
            .run_with_progress(&mut reporter, ProgressRange::BACKGROUND)
            .await
            .unwrap();

        assert_eq!(outcome.heartbeats, 5000);
        assert_eq!(outcome.stderr_tail.len(), STDERR_TAIL_LINES);
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let result = ToolCommand::new("karaokify-no-such-tool", "missing tool")
            .execute()
            .await;
        assert!(matches!(result, Err(KaraokeError::ToolUnavailable(_))));
    }

    #[tokio::test]
    async fn test_execute_reports_failure_tail() {
        let result = shell("echo first >&2; echo last >&2; exit 1").execute().await;
        match result {
            Err(KaraokeError::ToolFailed { tool, stderr, .. }) => {
                assert_eq!(tool, "test script");
                assert_eq!(stderr, "first\nlast");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_tail_lines() {
        assert_eq!(tail_lines("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail_lines("", 5), "");
    }
}

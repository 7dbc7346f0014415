use crate::error::{PipelineError, Result};
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Run `command` to completion, handing each stdout line to `on_line` as it
/// arrives. Stderr is drained on a helper thread and returned verbatim in the
/// error when the process fails.
pub fn run_streaming(tool: &str, command: &mut Command, mut on_line: impl FnMut(&str)) -> Result<()> {
    debug!("Starting {}: {:?}", tool, command);

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| PipelineError::ToolNotStarted {
            tool: tool.to_string(),
            source,
        })?;

    let stderr_handle = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut captured = Vec::new();
            let _ = stderr.read_to_end(&mut captured);
            String::from_utf8_lossy(&captured).into_owned()
        })
    });

    let mut stream_error = None;
    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    on_line(line.trim_end_matches(['\n', '\r']));
                }
                Err(e) => {
                    stream_error = Some(e);
                    let _ = child.kill();
                    break;
                }
            }
        }
    }

    let status = child.wait()?;
    let stderr = stderr_handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if let Some(e) = stream_error {
        return Err(PipelineError::ExternalTool {
            tool: tool.to_string(),
            status: status.code(),
            stderr: format!("output stream failed: {}\n{}", e, stderr.trim_end()),
        });
    }

    if !status.success() {
        return Err(PipelineError::ExternalTool {
            tool: tool.to_string(),
            status: status.code(),
            stderr: stderr.trim_end().to_string(),
        });
    }

    if !stderr.trim().is_empty() {
        debug!("{} stderr: {}", tool, stderr.trim_end());
    }

    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_streams_lines_in_order() {
        let mut lines = Vec::new();
        run_streaming(
            "sh",
            Command::new("sh").args(["-c", "echo one; echo two; printf three"]),
            |line| lines.push(line.to_string()),
        )
        .unwrap();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_failure_keeps_exit_code_and_stderr() {
        let err = run_streaming(
            "sh",
            Command::new("sh").args(["-c", "echo progress; echo 'boom' >&2; exit 3"]),
            |_| {},
        )
        .unwrap_err();

        match err {
            PipelineError::ExternalTool { tool, status, stderr } => {
                assert_eq!(tool, "sh");
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_program() {
        let err = run_streaming(
            "missing",
            &mut Command::new("/nonexistent/definitely-not-a-program"),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::ToolNotStarted { .. }));
    }
}

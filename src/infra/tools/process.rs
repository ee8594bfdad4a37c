use std::{
    ffi::OsString,
    io::ErrorKind,
    path::Path,
    process::{Command, Stdio},
    time::Instant,
};

use tracing::{debug, warn};

use crate::application::ToolError;

/// Run `program` with an explicit argument list and return its stdout.
///
/// No shell is involved. A non-zero exit status is an error carrying the
/// exit code and captured stderr.
pub(crate) fn run_tool(
    tool: &'static str,
    program: &Path,
    args: &[OsString],
) -> Result<Vec<u8>, ToolError> {
    let started_at = Instant::now();
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|err| {
            warn!(
                target = "infra::tools",
                op = "tools::run",
                tool,
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error_code = "spawn",
                program = %program.display(),
                error = %err,
                "Failed to spawn external tool"
            );
            if err.kind() == ErrorKind::NotFound {
                ToolError::NotFound { tool, source: err }
            } else {
                ToolError::Spawn { tool, source: err }
            }
        })?;

    if !output.status.success() {
        let exit_code = output.status.code();
        let exit_code_value = exit_code.map(i64::from).unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(
            target = "infra::tools",
            op = "tools::run",
            tool,
            result = "error",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            exit_code = exit_code_value,
            error_code = "exit_status",
            program = %program.display(),
            stderr = %stderr,
            "External tool invocation failed"
        );
        return Err(ToolError::Failed {
            tool,
            exit_code,
            stderr,
        });
    }

    debug!(
        target = "infra::tools",
        op = "tools::run",
        tool,
        result = "ok",
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        program = %program.display(),
        args = ?args,
        stdout_bytes = output.stdout.len(),
        "External tool finished"
    );
    Ok(output.stdout)
}

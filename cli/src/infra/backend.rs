//! Helpers shared by the backend adapters for invoking their CLI.

use std::process::Output;

use crate::application::command::ensure_success;
use crate::application::ports::CommandRunner;
use crate::domain::CommandError;
use crate::domain::shell;

fn describe(binary: &str, args: &[&str]) -> String {
    shell::join(std::iter::once(binary).chain(args.iter().copied()))
}

/// Run `binary args...` and require a zero exit.
pub(crate) async fn invoke<R: CommandRunner>(
    runner: &R,
    binary: &str,
    args: &[&str],
) -> Result<Output, CommandError> {
    let command = describe(binary, args);
    match runner.run(binary, args).await {
        Ok(output) => ensure_success(command, output),
        Err(source) => Err(CommandError::Transport { command, source }),
    }
}

/// Like [`invoke`], with `input` piped to the process.
pub(crate) async fn invoke_with_stdin<R: CommandRunner>(
    runner: &R,
    binary: &str,
    args: &[&str],
    input: &[u8],
) -> Result<Output, CommandError> {
    let command = describe(binary, args);
    match runner.run_with_stdin(binary, args, input).await {
        Ok(output) => ensure_success(command, output),
        Err(source) => Err(CommandError::Transport { command, source }),
    }
}

/// Start `binary args...` in the background, feeding it `input` if given.
pub(crate) fn spawn<R: CommandRunner>(
    runner: &R,
    binary: &str,
    args: &[&str],
    input: Option<&[u8]>,
) -> Result<tokio::process::Child, CommandError> {
    runner
        .spawn(binary, args, input)
        .map_err(|source| CommandError::Transport {
            command: describe(binary, args),
            source,
        })
}

/// Borrow a list of owned arguments as `&str`.
pub(crate) fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

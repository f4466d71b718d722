//! Readiness predicates over status tokens reported by `kubectl` jsonpath
//! queries and by systemd inside container nodes.

/// Last pod condition status of a ready operator.
pub const CONDITION_READY: &str = "True";

/// Phase of a running workload pod.
pub const PHASE_RUNNING: &str = "Running";

/// Returns true when the report holds at least one token and every token
/// equals `marker`.
///
/// Tokens are whitespace-separated and may carry surrounding quotes. An empty
/// report means no pods exist yet, which is not ready.
#[must_use]
pub fn all_tokens_match(report: &str, marker: &str) -> bool {
    let mut tokens = report
        .split_whitespace()
        .map(|token| token.trim_matches(|c| c == '\'' || c == '"'))
        .filter(|token| !token.is_empty())
        .peekable();
    tokens.peek().is_some() && tokens.all(|token| token == marker)
}

/// Returns true once `systemctl is-system-running` reports that boot has
/// finished.
///
/// `degraded` counts as booted: some units always fail inside a container.
#[must_use]
pub fn system_booted(report: &str) -> bool {
    matches!(report.trim(), "running" | "degraded")
}

//! Fallback Executor (component_design §4.7, "C7"): ordered model-candidate attempts
//! with closed-sum-type error classification (design_notes: "Retry and fallback").

use std::future::Future;

use regex::RegexSet;

use crate::llm::LlmError;

/// Closed classification of a provider failure. `should_failover()` is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverReason {
    Auth,
    Billing,
    RateLimit,
    Timeout,
    Format,
    Unavailable,
    ServerError,
    Unknown,
}

impl FailoverReason {
    /// Format errors never failover (the request itself is malformed); everything
    /// else does.
    pub fn should_failover(self) -> bool {
        !matches!(self, FailoverReason::Format)
    }

    /// Rate-limit/timeout/unavailable/server-error may additionally be retried at a
    /// higher layer against the *same* candidate.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FailoverReason::RateLimit | FailoverReason::Timeout | FailoverReason::Unavailable | FailoverReason::ServerError
        )
    }

    fn from_status(status: u16) -> Option<Self> {
        match status {
            401 | 403 => Some(FailoverReason::Auth),
            402 => Some(FailoverReason::Billing),
            408 => Some(FailoverReason::Timeout),
            429 => Some(FailoverReason::RateLimit),
            400 => Some(FailoverReason::Format),
            500 | 502 | 504 => Some(FailoverReason::ServerError),
            503 => Some(FailoverReason::Unavailable),
            _ => None,
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "ETIMEDOUT" => Some(FailoverReason::Timeout),
            _ => None,
        }
    }

    /// Layered classification: HTTP status, then embedded code, then substring
    /// pattern-match against the message; `Unknown` otherwise (component_design §4.7).
    pub fn classify(error: &LlmError) -> Self {
        if let Some(status) = error.status {
            if let Some(r) = Self::from_status(status) {
                return r;
            }
        }
        if let Some(code) = &error.code {
            if let Some(r) = Self::from_code(code) {
                return r;
            }
        }
        classify_message(&error.message)
    }
}

fn classify_message(message: &str) -> FailoverReason {
    let lower = message.to_lowercase();
    let patterns: &[(&str, FailoverReason)] = &[
        (r"timed? ?out|timeout", FailoverReason::Timeout),
        (r"rate.?limit|too many requests", FailoverReason::RateLimit),
        (r"unauthoriz|forbidden|invalid api key|authentication", FailoverReason::Auth),
        (r"billing|insufficient.?funds|quota exceeded", FailoverReason::Billing),
        (r"unavailable|service down", FailoverReason::Unavailable),
        (r"internal server error|server error|bad gateway", FailoverReason::ServerError),
    ];
    let set = RegexSet::new(patterns.iter().map(|(p, _)| *p)).expect("static patterns compile");
    if let Some(idx) = set.matches(&lower).iter().next() {
        return patterns[idx].1;
    }
    FailoverReason::Unknown
}

#[derive(Debug, Clone)]
pub struct Attempt {
    pub candidate: String,
    pub reason: Option<FailoverReason>,
    pub error_message: Option<String>,
    pub skipped: bool,
}

pub struct FallbackOutcome<T> {
    pub ok: bool,
    pub candidate: Option<String>,
    pub value: Option<T>,
    pub attempts: Vec<Attempt>,
}

impl<T> FallbackOutcome<T> {
    /// Concatenates attempt diagnostics for an aggregate error message.
    pub fn all_failed_error(&self) -> String {
        self.attempts
            .iter()
            .enumerate()
            .map(|(i, a)| {
                if a.skipped {
                    format!("model {} (attempt {}/{}): skipped (cooldown)", a.candidate, i + 1, self.attempts.len())
                } else {
                    format!(
                        "model {} (attempt {}/{}): {}",
                        a.candidate,
                        i + 1,
                        self.attempts.len(),
                        a.error_message.as_deref().unwrap_or("unknown error")
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub struct FallbackConfig {
    pub candidates: Vec<String>,
    pub max_attempts: Option<usize>,
    pub skip_on_cooldown: bool,
}

/// Runs `attempt` against each candidate in order until one succeeds, a
/// non-failover error is hit, or candidates/max_attempts are exhausted.
pub async fn run_fallback<T, F, Fut>(
    config: &FallbackConfig,
    is_on_cooldown: impl Fn(&str) -> bool,
    mut attempt: F,
) -> FallbackOutcome<T>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempts = Vec::new();
    let limit = config.max_attempts.unwrap_or(config.candidates.len());

    for candidate in config.candidates.iter().take(limit) {
        if config.skip_on_cooldown && is_on_cooldown(candidate) {
            attempts.push(Attempt { candidate: candidate.clone(), reason: None, error_message: None, skipped: true });
            continue;
        }

        match attempt(candidate).await {
            Ok(value) => {
                attempts.push(Attempt { candidate: candidate.clone(), reason: None, error_message: None, skipped: false });
                return FallbackOutcome { ok: true, candidate: Some(candidate.clone()), value: Some(value), attempts };
            }
            Err(err) => {
                let reason = FailoverReason::classify(&err);
                attempts.push(Attempt {
                    candidate: candidate.clone(),
                    reason: Some(reason),
                    error_message: Some(err.message.clone()),
                    skipped: false,
                });
                if !reason.should_failover() {
                    break;
                }
            }
        }
    }

    FallbackOutcome { ok: false, candidate: None, value: None, attempts }
}

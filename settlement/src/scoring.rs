//! Reply quality scoring
//!
//! Sends the stripped reply text to an external scoring service and parses
//! the returned score. The service speaks JSON but real deployments have
//! returned fenced JSON and bare numbers, so parsing degrades gracefully
//! instead of failing the whole settlement.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decision::{decide, Verdict};

// ============================================================================
// Rubric
// ============================================================================

/// Criteria sent alongside the reply so the scorer grades consistently.
pub const RUBRIC: &str = "Score the reply from 0 to 100 against these criteria: \
clarity, completeness, professionalism, relevance to the original message, \
and helpfulness. Respond with JSON: {\"score\": <number>}";

// ============================================================================
// Markup stripping
// ============================================================================

/// Reduce an HTML-ish reply body to plain text.
///
/// Drops everything between `<` and `>`, decodes the handful of entities
/// that show up in mail bodies, and collapses whitespace runs. Not a real
/// HTML parser; it only needs to keep the scorer from grading markup.
pub fn strip_markup(body: &str) -> String {
    let mut text = String::with_capacity(body.len());
    let mut in_tag = false;
    for ch in body.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if in_tag => {}
            _ => text.push(ch),
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Scorer trait + HTTP implementation
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    /// The scoring service demanded payment (HTTP 402) and the fallback,
    /// if any, did too. This is an operator problem, not a reply problem,
    /// so it propagates instead of being folded into a zero score.
    #[error("scoring service requires payment")]
    PaymentFailed,

    /// Non-success status other than 402.
    #[error("scoring service unavailable (status {0})")]
    Unavailable(u16),

    #[error("scoring request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    rubric: &'a str,
    original: &'a str,
    reply: &'a str,
}

/// Anything that can grade a reply. The orchestrator is generic over this
/// so tests can plug in a canned scorer.
pub trait Scorer {
    /// Return the raw response body from the scoring service. Parsing is
    /// the caller's job because the formats vary per deployment.
    fn score(
        &self,
        original: &str,
        reply: &str,
    ) -> impl std::future::Future<Output = Result<String, ScoringError>> + Send;
}

/// Scorer backed by an HTTP endpoint, with an optional fallback endpoint
/// used only when the primary returns 402.
pub struct HttpScorer {
    http: reqwest::Client,
    url: String,
    fallback_url: Option<String>,
}

impl HttpScorer {
    pub fn new(http: reqwest::Client, url: String, fallback_url: Option<String>) -> Self {
        Self {
            http,
            url,
            fallback_url,
        }
    }

    async fn score_at(&self, url: &str, original: &str, reply: &str) -> Result<String, ScoringError> {
        let response = self
            .http
            .post(url)
            .json(&ScoreRequest {
                rubric: RUBRIC,
                original,
                reply,
            })
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 402 {
            return Err(ScoringError::PaymentFailed);
        }
        if !status.is_success() {
            return Err(ScoringError::Unavailable(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

impl Scorer for HttpScorer {
    async fn score(&self, original: &str, reply: &str) -> Result<String, ScoringError> {
        match self.score_at(&self.url, original, reply).await {
            Err(ScoringError::PaymentFailed) => {
                let Some(fallback) = &self.fallback_url else {
                    return Err(ScoringError::PaymentFailed);
                };
                warn!(url = %self.url, "primary scorer requires payment, trying fallback");
                self.score_at(fallback, original, reply).await
            }
            other => other,
        }
    }
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
}

/// Extract a score from whatever the scoring service returned.
///
/// Tries, in order: a `{"score": n}` JSON object, the same object inside a
/// markdown code fence, and finally the first number anywhere in the text.
/// Returns `None` when nothing numeric can be found.
pub fn parse_score(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();

    if let Ok(parsed) = serde_json::from_str::<ScoreResponse>(trimmed) {
        return Some(parsed.score);
    }

    if let Some(inner) = strip_code_fence(trimmed) {
        if let Ok(parsed) = serde_json::from_str::<ScoreResponse>(inner) {
            return Some(parsed.score);
        }
    }

    first_number(trimmed)
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    // Optional language tag on the fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    let end = rest.rfind("```")?;
    Some(rest[..end].trim())
}

fn first_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if let Ok(value) = text[start..i].parse::<f64>() {
                return Some(value);
            }
        } else {
            i += 1;
        }
    }
    None
}

// ============================================================================
// Combined score + decide
// ============================================================================

/// Score a reply and map it to a verdict.
///
/// Both bodies are stripped of markup before the scorer sees them. Empty
/// replies (after stripping) withhold without calling the scorer at all.
/// Scorer outages and unparseable responses fold into a zero score so a
/// flaky grader never releases funds; payment failures propagate because
/// retrying them cannot help.
pub async fn score_and_decide<S: Scorer>(
    scorer: &S,
    original: &str,
    reply: &str,
) -> Result<(f64, Verdict), ScoringError> {
    let stripped = strip_markup(reply);
    if stripped.is_empty() {
        debug!("reply empty after markup stripping, withholding");
        return Ok((0.0, Verdict::Withhold));
    }
    let original = strip_markup(original);

    let raw = match scorer.score(&original, &stripped).await {
        Ok(raw) => raw,
        Err(ScoringError::PaymentFailed) => return Err(ScoringError::PaymentFailed),
        Err(err) => {
            warn!(error = %err, "scorer unreachable, treating score as 0");
            return Ok((0.0, Verdict::Withhold));
        }
    };

    let score = match parse_score(&raw) {
        Some(score) => score,
        None => {
            warn!(raw = %raw, "unparseable scorer response, treating score as 0");
            0.0
        }
    };

    Ok((score, decide(score)))
}

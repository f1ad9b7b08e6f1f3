//! Reduction of question scores into domain and overall scores.
//!
//! Every function here is total: missing or out-of-range data degrades to 0
//! or is skipped, so partially-filled forms never fail.

use serde::{Deserialize, Serialize};

use crate::{
  assessment::{AssessmentResponses, DomainResponse},
  taxonomy::{ScoreBand, Taxonomy},
};

/// Domain scores below this are flagged for improvement.
pub const PRIORITY_THRESHOLD: f64 = 4.0;

/// Domain scores below this are critical for alerting.
pub const CRITICAL_THRESHOLD: f64 = 2.0;

/// How to treat a domain with no scored questions.
///
/// The overall score, templates and alerting exclude such domains; the
/// comparison table counts them as 0. Keep the choice explicit at every call
/// site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDomain {
  Exclude,
  Zero,
}

/// Arithmetic mean of the valid question scores in `response`, or 0 when no
/// question has been scored.
pub fn domain_score(response: &DomainResponse) -> f64 {
  let (sum, n) = response
    .questions
    .values()
    .filter(|q| q.is_valid())
    .map(|q| f64::from(q.score))
    .fold((0.0, 0u32), |(sum, n), s| (sum + s, n + 1));

  if n == 0 { 0.0 } else { sum / f64::from(n) }
}

/// Score of domain `code` under `policy`. `None` only for
/// [`MissingDomain::Exclude`] when the domain is absent or unscored.
pub fn score_for(
  responses: &AssessmentResponses,
  code: &str,
  policy: MissingDomain,
) -> Option<f64> {
  match (responses.get(code).filter(|r| r.is_scored()), policy) {
    (Some(r), _) => Some(domain_score(r)),
    (None, MissingDomain::Exclude) => None,
    (None, MissingDomain::Zero) => Some(0.0),
  }
}

/// Mean of every scored domain present in `responses`, rounded to 2 decimal
/// places. Absent domains are excluded, not counted as 0. Empty input is 0.
pub fn overall_score(responses: &AssessmentResponses) -> f64 {
  let scores: Vec<f64> = responses
    .codes()
    .filter_map(|code| score_for(responses, code, MissingDomain::Exclude))
    .collect();

  if scores.is_empty() {
    return 0.0;
  }
  round2(scores.iter().sum::<f64>() / scores.len() as f64)
}

pub fn is_priority(score: f64) -> bool { score < PRIORITY_THRESHOLD }

pub fn is_critical(score: f64) -> bool { score < CRITICAL_THRESHOLD }

pub fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

/// One-decimal rounding used for every displayed score.
pub fn round1(value: f64) -> f64 { (value * 10.0).round() / 10.0 }

// ─── Per-domain summary ──────────────────────────────────────────────────────

/// One domain of an assessment as shown beside its suggested actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSummary {
  pub code:       String,
  pub label:      String,
  /// Rounded to 1 dp; `None` when the domain has no scored question.
  pub score:      Option<f64>,
  pub band:       Option<ScoreBand>,
  pub band_label: Option<String>,
  /// Every question of the taxonomy's domain is scored. Always false for
  /// codes the taxonomy does not define.
  pub complete:   bool,
  pub priority:   bool,
  pub critical:   bool,
}

/// Summaries for every taxonomy domain, in taxonomy order, followed by any
/// scored response codes the taxonomy does not define.
pub fn summarize_domains(
  taxonomy: &Taxonomy,
  responses: &AssessmentResponses,
) -> Vec<DomainSummary> {
  let unknown = responses
    .iter()
    .filter(|(code, r)| r.is_scored() && taxonomy.domain(code).is_none())
    .map(|(code, _)| code);

  taxonomy
    .codes()
    .chain(unknown)
    .map(|code| {
      let score = score_for(responses, code, MissingDomain::Exclude);
      let band = score.and_then(ScoreBand::for_score);
      let complete = match (taxonomy.domain(code), responses.get(code)) {
        (Some(domain), Some(response)) => response.is_complete(domain),
        _ => false,
      };
      DomainSummary {
        code: code.to_owned(),
        label: taxonomy.label(code).to_owned(),
        score: score.map(round1),
        band,
        band_label: band.map(|b| b.label().to_owned()),
        complete,
        priority: score.is_some_and(is_priority),
        critical: score.is_some_and(is_critical),
      }
    })
    .collect()
}

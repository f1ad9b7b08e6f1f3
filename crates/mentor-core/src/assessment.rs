//! Health-check assessments and their question-level responses.
//!
//! Assessments are append-only: a new submission is a new row, which is what
//! makes trend analysis possible. The only mutation is deletion.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{scoring, taxonomy::Domain};

// ─── Responses ───────────────────────────────────────────────────────────────

/// A single question score on the 1–5 scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponse {
  pub score: u8,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl QuestionResponse {
  pub fn new(score: u8) -> Self { Self { score, notes: None } }

  /// Whether the score lies on the 1–5 scale. Anything else counts as
  /// unanswered.
  pub fn is_valid(&self) -> bool { (1..=5).contains(&self.score) }
}

/// All responses for one domain. `score` is derived from `questions` and is
/// never entered directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainResponse {
  #[serde(default)]
  pub score:     f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes:     Option<String>,
  #[serde(default)]
  pub questions: BTreeMap<String, QuestionResponse>,
}

impl DomainResponse {
  /// Set one question's score and recompute the domain score from every
  /// currently-scored question.
  pub fn set_question_score(&mut self, question_id: impl Into<String>, score: u8) {
    self
      .questions
      .insert(question_id.into(), QuestionResponse::new(score));
    self.score = scoring::domain_score(self);
  }

  /// At least one question carries a valid score.
  pub fn is_scored(&self) -> bool {
    self.questions.values().any(QuestionResponse::is_valid)
  }

  /// Every question of `domain` carries a valid score. The entry workflow
  /// only lets a mentor move past a domain once this holds.
  pub fn is_complete(&self, domain: &Domain) -> bool {
    domain.questions.iter().all(|q| {
      self
        .questions
        .get(&q.id)
        .is_some_and(QuestionResponse::is_valid)
    })
  }
}

/// Responses keyed by domain code. Keys need not cover every domain.
///
/// This is the persisted wire shape:
/// `{"<CODE>": {"score": f64, "notes": str?, "questions": {"<id>": {"score": u8}}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentResponses(BTreeMap<String, DomainResponse>);

impl AssessmentResponses {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, code: &str) -> Option<&DomainResponse> { self.0.get(code) }

  pub fn insert(&mut self, code: impl Into<String>, response: DomainResponse) {
    self.0.insert(code.into(), response);
  }

  /// Mutable access to a domain's entry, creating an empty one if absent.
  pub fn domain_mut(&mut self, code: &str) -> &mut DomainResponse {
    self.0.entry(code.to_owned()).or_default()
  }

  pub fn set_question_score(&mut self, code: &str, question_id: &str, score: u8) {
    self.domain_mut(code).set_question_score(question_id, score);
  }

  pub fn set_notes(&mut self, code: &str, notes: impl Into<String>) {
    self.domain_mut(code).notes = Some(notes.into());
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &DomainResponse)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn codes(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// Re-derive every domain score from its questions.
  pub fn recompute(&mut self) {
    for response in self.0.values_mut() {
      response.score = scoring::domain_score(response);
    }
  }
}

impl FromIterator<(String, DomainResponse)> for AssessmentResponses {
  fn from_iter<I: IntoIterator<Item = (String, DomainResponse)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

// ─── Assessment ──────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssessmentStatus {
  Draft,
  Completed,
}

/// Who filled in the assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Respondent {
  /// An authenticated mentor.
  Mentor { user_id: Uuid },
  /// An anonymous respondent who arrived through a share link.
  SelfAssessment {
    link_id: Uuid,
    name:    String,
    role:    String,
  },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
  pub assessment_id:   Uuid,
  pub school_id:       Uuid,
  pub respondent:      Respondent,
  pub assessment_date: NaiveDate,
  pub status:          AssessmentStatus,
  pub responses:       AssessmentResponses,
  pub overall_score:   Option<f64>,
  pub notes:           Option<String>,
  /// Server-assigned; breaks ties between assessments on the same date.
  pub created_at:      DateTime<Utc>,
}

impl Assessment {
  pub fn is_completed(&self) -> bool { self.status == AssessmentStatus::Completed }

  /// `overall_score`, treating a missing value as 0.
  pub fn overall_or_zero(&self) -> f64 { self.overall_score.unwrap_or(0.0) }
}

/// Input to [`crate::store::MentorStore::record_assessment`].
///
/// Built through [`NewAssessment::new`] so that domain scores and the overall
/// score are always derived from the responses.
#[derive(Debug, Clone)]
pub struct NewAssessment {
  pub school_id:       Uuid,
  pub respondent:      Respondent,
  pub assessment_date: NaiveDate,
  pub status:          AssessmentStatus,
  pub responses:       AssessmentResponses,
  pub overall_score:   f64,
  pub notes:           Option<String>,
}

impl NewAssessment {
  pub fn new(
    school_id: Uuid,
    respondent: Respondent,
    assessment_date: NaiveDate,
    status: AssessmentStatus,
    mut responses: AssessmentResponses,
    notes: Option<String>,
  ) -> Self {
    responses.recompute();
    let overall_score = scoring::overall_score(&responses);
    Self {
      school_id,
      respondent,
      assessment_date,
      status,
      responses,
      overall_score,
      notes,
    }
  }
}

// ─── Share links ─────────────────────────────────────────────────────────────

/// A token that lets an anonymous respondent submit a self-assessment for one
/// school until it expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentLink {
  pub link_id:    Uuid,
  pub school_id:  Uuid,
  pub created_by: Uuid,
  pub token:      String,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}

impl AssessmentLink {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at < now }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::taxonomy::Taxonomy;

  #[test]
  fn setting_a_question_recomputes_the_domain_from_all_questions() {
    let mut r = DomainResponse::default();
    r.set_question_score("q1", 4);
    assert_eq!(r.score, 4.0);
    r.set_question_score("q2", 1);
    assert_eq!(r.score, 2.5);
    r.set_question_score("q1", 2);
    assert_eq!(r.score, 1.5);
  }

  #[test]
  fn completeness_is_per_domain() {
    let taxonomy = Taxonomy::psi();
    let finance = taxonomy.domain("FINANCE").unwrap();
    let mut r = DomainResponse::default();
    for q in &finance.questions[..4] {
      r.set_question_score(q.id.clone(), 3);
    }
    assert!(!r.is_complete(finance));
    r.set_question_score(finance.questions[4].id.clone(), 0);
    assert!(!r.is_complete(finance));
    r.set_question_score(finance.questions[4].id.clone(), 5);
    assert!(r.is_complete(finance));
  }

  #[test]
  fn responses_round_trip_through_json() {
    let json = r#"{
      "FINANCE": {"score": 2.5, "notes": "cashbook missing",
                  "questions": {"fo_budget": {"score": 2}, "fo_records": {"score": 3}}},
      "LEADERSHIP": {"score": 4.0, "questions": {"ld_roles": {"score": 4, "notes": "clear"}}}
    }"#;
    let parsed: AssessmentResponses = serde_json::from_str(json).unwrap();
    let encoded = serde_json::to_value(&parsed).unwrap();
    let expected: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(encoded, expected);

    let reparsed: AssessmentResponses = serde_json::from_value(encoded).unwrap();
    assert_eq!(reparsed, parsed);
  }

  #[test]
  fn new_assessment_derives_scores() {
    let mut responses = AssessmentResponses::new();
    responses.insert("FINANCE", DomainResponse {
      score:     5.0,
      notes:     None,
      questions: [("fo_budget".to_owned(), QuestionResponse::new(2))].into(),
    });
    responses.set_question_score("TEACHING", "tl_planning", 3);

    let new = NewAssessment::new(
      Uuid::new_v4(),
      Respondent::Mentor { user_id: Uuid::new_v4() },
      NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
      AssessmentStatus::Completed,
      responses,
      None,
    );
    assert_eq!(new.responses.get("FINANCE").unwrap().score, 2.0);
    assert_eq!(new.overall_score, 2.5);
  }

  #[test]
  fn status_codes() {
    assert_eq!(AssessmentStatus::Completed.as_ref(), "completed");
    assert_eq!("draft".parse::<AssessmentStatus>().unwrap(), AssessmentStatus::Draft);
  }
}

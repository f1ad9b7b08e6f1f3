//! Rule-based risk alerts across the whole school population.
//!
//! Alerts are derived, never stored: every call to [`detect_risk_alerts`]
//! rescans every school. The four rules are pure functions over a
//! [`SchoolSnapshot`] so they can be tested without a store.

use std::fmt;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::{
  assessment::Assessment,
  scoring::{self, MissingDomain},
  school::School,
  store::AlertSource,
  taxonomy::Taxonomy,
};

// ─── Alert types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertKind {
  NoRecentAssessment,
  LowStandard,
  DecliningScore,
  NoActionPlan,
}

/// Ordered most severe first, so sorting by severity puts `High` on top.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
  High,
  Medium,
  Low,
}

/// A domain under the critical threshold, with its score rounded to one
/// decimal place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStandard {
  pub code:  String,
  pub label: String,
  pub score: f64,
}

impl fmt::Display for LowStandard {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({:.1})", self.label, self.score)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlertDetails {
  LastAssessment { last_assessment_date: NaiveDate },
  Standards { standards: Vec<LowStandard> },
  /// Both scores formatted to one decimal place.
  ScoreChange { previous: String, current: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
  /// Stable per school and rule, e.g. `<school_id>-declining`.
  pub id:          String,
  pub school_id:   Uuid,
  pub school_name: String,
  #[serde(rename = "type")]
  pub kind:        AlertKind,
  pub severity:    Severity,
  pub message:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub details:     Option<AlertDetails>,
}

/// Alert counts per severity for dashboard summary cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
  pub high:   usize,
  pub medium: usize,
  pub low:    usize,
}

impl AlertSummary {
  pub fn of(alerts: &[RiskAlert]) -> Self {
    alerts.iter().fold(Self::default(), |mut s, a| {
      match a.severity {
        Severity::High => s.high += 1,
        Severity::Medium => s.medium += 1,
        Severity::Low => s.low += 1,
      }
      s
    })
  }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Thresholds used by the rules. Defaults match the published alerting
/// policy; deployments may override them in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertPolicy {
  /// Latest assessment at least this many months old is stale (medium).
  pub stale_after_months:      u32,
  /// ... and at least this many months old is overdue (high).
  pub overdue_after_months:    u32,
  /// Domain scores below this are low standards.
  pub low_standard_below:      f64,
  /// This many low standards or more is high severity.
  pub low_standard_high_count: usize,
  /// Overall-score drop greater than this raises a declining alert.
  pub decline_above:           f64,
  /// ... and greater than this makes it high severity.
  pub steep_decline_above:     f64,
  /// An assessment newer than this many months expects an active plan.
  pub plan_grace_months:       u32,
}

impl Default for AlertPolicy {
  fn default() -> Self {
    Self {
      stale_after_months:      6,
      overdue_after_months:    12,
      low_standard_below:      scoring::CRITICAL_THRESHOLD,
      low_standard_high_count: 3,
      decline_above:           0.3,
      steep_decline_above:     0.5,
      plan_grace_months:       1,
    }
  }
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// Everything the rules need to know about one school.
#[derive(Debug, Clone)]
pub struct SchoolSnapshot {
  pub school:       School,
  pub latest:       Option<Assessment>,
  pub previous:     Option<Assessment>,
  pub active_plans: usize,
}

impl SchoolSnapshot {
  fn alert(
    &self,
    suffix: &str,
    kind: AlertKind,
    severity: Severity,
    message: String,
    details: Option<AlertDetails>,
  ) -> RiskAlert {
    RiskAlert {
      id: format!("{}-{suffix}", self.school.school_id),
      school_id: self.school.school_id,
      school_name: self.school.name.clone(),
      kind,
      severity,
      message,
      details,
    }
  }
}

fn months_before(today: NaiveDate, months: u32) -> NaiveDate {
  today
    .checked_sub_months(Months::new(months))
    .unwrap_or(NaiveDate::MIN)
}

/// Whole 30-day months between `date` and `today`.
pub fn months_elapsed(date: NaiveDate, today: NaiveDate) -> i64 {
  (today - date).num_days().max(0) / 30
}

/// No completed assessment at all, or the latest one is stale.
pub fn stale_assessment(
  snapshot: &SchoolSnapshot,
  policy: &AlertPolicy,
  today: NaiveDate,
) -> Option<RiskAlert> {
  let Some(latest) = &snapshot.latest else {
    return Some(snapshot.alert(
      "no-assessment",
      AlertKind::NoRecentAssessment,
      Severity::High,
      "No assessment on record".to_owned(),
      None,
    ));
  };

  let date = latest.assessment_date;
  if date > months_before(today, policy.stale_after_months) {
    return None;
  }

  let severity = if date <= months_before(today, policy.overdue_after_months) {
    Severity::High
  } else {
    Severity::Medium
  };
  Some(snapshot.alert(
    "no-recent",
    AlertKind::NoRecentAssessment,
    severity,
    format!("Last assessment {} months ago", months_elapsed(date, today)),
    Some(AlertDetails::LastAssessment { last_assessment_date: date }),
  ))
}

/// Scored domains of the latest assessment below the critical threshold,
/// bundled into one alert.
pub fn low_standards(
  taxonomy: &Taxonomy,
  snapshot: &SchoolSnapshot,
  policy: &AlertPolicy,
) -> Option<RiskAlert> {
  let latest = snapshot.latest.as_ref()?;

  let standards: Vec<LowStandard> = taxonomy
    .domains
    .iter()
    .filter_map(|d| {
      let score = scoring::score_for(&latest.responses, &d.code, MissingDomain::Exclude)?;
      (score < policy.low_standard_below).then(|| LowStandard {
        code:  d.code.clone(),
        label: d.label.clone(),
        score: scoring::round1(score),
      })
    })
    .collect();

  if standards.is_empty() {
    return None;
  }

  let n = standards.len();
  let severity = if n >= policy.low_standard_high_count {
    Severity::High
  } else {
    Severity::Medium
  };
  Some(snapshot.alert(
    "low-standards",
    AlertKind::LowStandard,
    severity,
    format!(
      "{n} standard{} below {:.1}",
      if n > 1 { "s" } else { "" },
      policy.low_standard_below
    ),
    Some(AlertDetails::Standards { standards }),
  ))
}

/// Overall score dropped between the previous and latest completed
/// assessments.
pub fn declining_score(snapshot: &SchoolSnapshot, policy: &AlertPolicy) -> Option<RiskAlert> {
  let (Some(latest), Some(previous)) = (&snapshot.latest, &snapshot.previous) else {
    return None;
  };

  let current = latest.overall_or_zero();
  let before = previous.overall_or_zero();
  let decline = before - current;
  if decline <= policy.decline_above {
    return None;
  }

  let severity = if decline > policy.steep_decline_above {
    Severity::High
  } else {
    Severity::Medium
  };
  Some(snapshot.alert(
    "declining",
    AlertKind::DecliningScore,
    severity,
    format!("Overall score declined by {decline:.1} points"),
    Some(AlertDetails::ScoreChange {
      previous: format!("{before:.1}"),
      current:  format!("{current:.1}"),
    }),
  ))
}

/// A recent assessment with no active plan to act on it. Schools without a
/// recent assessment are left to [`stale_assessment`].
pub fn missing_plan(
  snapshot: &SchoolSnapshot,
  policy: &AlertPolicy,
  today: NaiveDate,
) -> Option<RiskAlert> {
  let latest = snapshot.latest.as_ref()?;
  let recent = latest.assessment_date > months_before(today, policy.plan_grace_months);
  if snapshot.active_plans > 0 || !recent {
    return None;
  }

  Some(snapshot.alert(
    "no-plan",
    AlertKind::NoActionPlan,
    Severity::Low,
    "Recent assessment but no active action plan".to_owned(),
    None,
  ))
}

/// Run every rule against one school, in rule order.
pub fn evaluate_school(
  taxonomy: &Taxonomy,
  policy: &AlertPolicy,
  snapshot: &SchoolSnapshot,
  today: NaiveDate,
) -> Vec<RiskAlert> {
  [
    stale_assessment(snapshot, policy, today),
    low_standards(taxonomy, snapshot, policy),
    declining_score(snapshot, policy),
    missing_plan(snapshot, policy, today),
  ]
  .into_iter()
  .flatten()
  .collect()
}

// ─── Detector ────────────────────────────────────────────────────────────────

/// Scan every school and return its alerts, most severe first.
///
/// Schools are visited sequentially; within a severity, alerts keep school
/// then rule order. Any store error aborts the whole pass: an empty list must
/// only ever mean that no school is at risk.
pub async fn detect_risk_alerts<S: AlertSource>(
  source: &S,
  taxonomy: &Taxonomy,
  policy: &AlertPolicy,
  today: NaiveDate,
) -> Result<Vec<RiskAlert>, S::Error> {
  let schools = source.list_schools().await?;
  let school_count = schools.len();
  let mut alerts = Vec::new();

  for school in schools {
    let id = school.school_id;
    let latest = source.latest_completed(id).await?;
    let previous = match latest {
      Some(_) => source.previous_completed(id).await?,
      None => None,
    };
    let active_plans = source.active_plan_count(id).await?;

    let snapshot = SchoolSnapshot { school, latest, previous, active_plans };
    let found = evaluate_school(taxonomy, policy, &snapshot, today);
    tracing::debug!(school_id = %id, alerts = found.len(), "evaluated school");
    alerts.extend(found);
  }

  alerts.sort_by_key(|a| a.severity);

  let summary = AlertSummary::of(&alerts);
  tracing::info!(
    schools = school_count,
    high = summary.high,
    medium = summary.medium,
    low = summary.low,
    "risk detection complete"
  );
  Ok(alerts)
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::assessment::{AssessmentResponses, AssessmentStatus, Respondent};

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2026, 10, 16).unwrap() }

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  fn school(name: &str) -> School {
    School {
      school_id:     Uuid::new_v4(),
      name:          name.to_owned(),
      county:        None,
      town:          None,
      head_teacher:  None,
      student_count: None,
      staff_count:   None,
      created_at:    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
  }

  fn assessment(school: &School, on: NaiveDate, scores: &[(&str, &[u8])]) -> Assessment {
    let mut responses = AssessmentResponses::new();
    for (code, qs) in scores {
      for (i, s) in qs.iter().enumerate() {
        responses.set_question_score(code, &format!("q{i}"), *s);
      }
    }
    let overall = scoring::overall_score(&responses);
    Assessment {
      assessment_id:   Uuid::new_v4(),
      school_id:       school.school_id,
      respondent:      Respondent::Mentor { user_id: Uuid::nil() },
      assessment_date: on,
      status:          AssessmentStatus::Completed,
      responses,
      overall_score:   Some(overall),
      notes:           None,
      created_at:      Utc::now(),
    }
  }

  fn snapshot(
    school: School,
    latest: Option<Assessment>,
    previous: Option<Assessment>,
    active_plans: usize,
  ) -> SchoolSnapshot {
    SchoolSnapshot { school, latest, previous, active_plans }
  }

  fn evaluate(s: &SchoolSnapshot) -> Vec<RiskAlert> {
    evaluate_school(&Taxonomy::psi(), &AlertPolicy::default(), s, today())
  }

  const STEADY: &[(&str, &[u8])] = &[("LEADERSHIP", &[3, 3]), ("TEACHING", &[3])];

  // ── Rules ─────────────────────────────────────────────────────────────

  #[test]
  fn school_without_assessments_is_high() {
    let alerts = evaluate(&snapshot(school("Hillside"), None, None, 0));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::NoRecentAssessment);
    assert_eq!(alerts[0].severity, Severity::High);
    assert_eq!(alerts[0].message, "No assessment on record");
    assert!(alerts[0].details.is_none());
  }

  #[test]
  fn eight_month_old_assessment_only_raises_staleness() {
    let s = school("Riverside");
    let latest = assessment(&s, date(2026, 2, 16), STEADY);
    assert_eq!(latest.overall_score, Some(3.0));

    let alerts = evaluate(&snapshot(s, Some(latest), None, 0));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::NoRecentAssessment);
    assert_eq!(alerts[0].severity, Severity::Medium);
    assert_eq!(alerts[0].message, "Last assessment 8 months ago");
    assert_eq!(
      alerts[0].details,
      Some(AlertDetails::LastAssessment { last_assessment_date: date(2026, 2, 16) })
    );
  }

  #[test]
  fn year_old_assessment_is_high() {
    let s = school("Lakeview");
    let latest = assessment(&s, date(2025, 10, 1), STEADY);
    let alert = stale_assessment(
      &snapshot(s, Some(latest), None, 1),
      &AlertPolicy::default(),
      today(),
    )
    .unwrap();
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.message, "Last assessment 12 months ago");
  }

  #[test]
  fn staleness_starts_at_six_calendar_months() {
    let s = school("Edge");
    let policy = AlertPolicy::default();
    let at_boundary = assessment(&s, date(2026, 4, 16), STEADY);
    let just_inside = assessment(&s, date(2026, 4, 17), STEADY);
    assert!(
      stale_assessment(&snapshot(s.clone(), Some(at_boundary), None, 1), &policy, today())
        .is_some()
    );
    assert!(stale_assessment(&snapshot(s, Some(just_inside), None, 1), &policy, today()).is_none());
  }

  #[test]
  fn decline_over_half_a_point_is_high() {
    let s = school("Greenfield");
    let previous = assessment(&s, date(2026, 5, 1), &[("LEADERSHIP", &[4]), ("TEACHING", &[4])]);
    let latest = assessment(&s, date(2026, 9, 1), &[
      ("FOUNDATIONS", &[3]),
      ("LEADERSHIP", &[4]),
      ("TEACHING", &[3]),
      ("FINANCE", &[4]),
      ("SPIRITUAL", &[3]),
    ]);
    assert_eq!(previous.overall_score, Some(4.0));
    assert_eq!(latest.overall_score, Some(3.4));

    let alerts = evaluate(&snapshot(s, Some(latest), Some(previous), 0));
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.kind, AlertKind::DecliningScore);
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.message, "Overall score declined by 0.6 points");
    assert_eq!(
      alert.details,
      Some(AlertDetails::ScoreChange { previous: "4.0".into(), current: "3.4".into() })
    );
  }

  #[test]
  fn moderate_and_small_declines() {
    let s = school("Valley");
    let policy = AlertPolicy::default();
    let at = |scores: &[(&str, &[u8])], d| assessment(&s, d, scores);

    // 4.0 -> 3.5: decline 0.5, medium.
    let moderate = snapshot(
      s.clone(),
      Some(at(&[("LEADERSHIP", &[3, 4])], date(2026, 9, 1))),
      Some(at(&[("LEADERSHIP", &[4])], date(2026, 5, 1))),
      1,
    );
    assert_eq!(declining_score(&moderate, &policy).unwrap().severity, Severity::Medium);

    // 4.0 -> 3.75: decline 0.25, nothing.
    let small = snapshot(
      s.clone(),
      Some(at(&[("LEADERSHIP", &[4, 4, 4, 3])], date(2026, 9, 1))),
      Some(at(&[("LEADERSHIP", &[4])], date(2026, 5, 1))),
      1,
    );
    assert!(declining_score(&small, &policy).is_none());

    // Improvement, nothing.
    let up = snapshot(
      s.clone(),
      Some(at(&[("LEADERSHIP", &[5])], date(2026, 9, 1))),
      Some(at(&[("LEADERSHIP", &[2])], date(2026, 5, 1))),
      1,
    );
    assert!(declining_score(&up, &policy).is_none());
  }

  #[test]
  fn three_low_standards_are_bundled_as_high() {
    let s = school("Summit");
    let latest = assessment(&s, date(2026, 10, 1), &[
      ("FOUNDATIONS", &[1, 2]),
      ("LEADERSHIP", &[1]),
      ("TEACHING", &[1, 2, 2]),
      ("FINANCE", &[4]),
      ("SPIRITUAL", &[2]),
    ]);
    let alerts = evaluate(&snapshot(s, Some(latest), None, 1));
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.kind, AlertKind::LowStandard);
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.message, "3 standards below 2.0");

    let Some(AlertDetails::Standards { standards }) = &alert.details else {
      panic!("expected standards, got {:?}", alert.details);
    };
    let rendered: Vec<String> = standards.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec![
      "Philosophy & Foundations (1.5)",
      "Leadership & Personnel (1.0)",
      "Teaching & Learning (1.7)",
    ]);
  }

  #[test]
  fn single_low_standard_is_medium() {
    let s = school("Brook");
    let latest = assessment(&s, date(2026, 10, 1), &[("FINANCE", &[1]), ("TEACHING", &[4])]);
    let alert =
      low_standards(&Taxonomy::psi(), &snapshot(s, Some(latest), None, 1), &AlertPolicy::default())
        .unwrap();
    assert_eq!(alert.severity, Severity::Medium);
    assert_eq!(alert.message, "1 standard below 2.0");
  }

  #[test]
  fn recent_assessment_without_plan_is_low() {
    let s = school("Meadow");
    let latest = assessment(&s, date(2026, 10, 1), STEADY);
    let alerts = evaluate(&snapshot(s.clone(), Some(latest.clone()), None, 0));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::NoActionPlan);
    assert_eq!(alerts[0].severity, Severity::Low);

    assert!(evaluate(&snapshot(s, Some(latest), None, 2)).is_empty());
  }

  #[test]
  fn alert_serialises_with_type_field() {
    let alerts = evaluate(&snapshot(school("Hillside"), None, None, 0));
    let json = serde_json::to_value(&alerts[0]).unwrap();
    assert_eq!(json["type"], "no_recent_assessment");
    assert_eq!(json["severity"], "high");
    assert!(json.get("details").is_none());
  }

  #[test]
  fn policy_deserialises_partial_overrides() {
    let policy: AlertPolicy = serde_json::from_str(r#"{"stale_after_months": 3}"#).unwrap();
    assert_eq!(policy.stale_after_months, 3);
    assert_eq!(policy.overdue_after_months, 12);
  }

  // ── Detector ──────────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("store unreachable")]
  struct Unreachable;

  #[derive(Default)]
  struct FakeSource {
    schools:     Vec<School>,
    /// Completed assessments, newest first.
    history:     HashMap<Uuid, Vec<Assessment>>,
    plans:       HashMap<Uuid, usize>,
    unreachable: bool,
  }

  impl FakeSource {
    fn check(&self) -> Result<(), Unreachable> {
      if self.unreachable { Err(Unreachable) } else { Ok(()) }
    }
  }

  impl AlertSource for FakeSource {
    type Error = Unreachable;

    async fn list_schools(&self) -> Result<Vec<School>, Unreachable> {
      self.check()?;
      Ok(self.schools.clone())
    }

    async fn latest_completed(&self, school_id: Uuid) -> Result<Option<Assessment>, Unreachable> {
      self.check()?;
      Ok(self.history.get(&school_id).and_then(|h| h.first().cloned()))
    }

    async fn previous_completed(&self, school_id: Uuid) -> Result<Option<Assessment>, Unreachable> {
      self.check()?;
      Ok(self.history.get(&school_id).and_then(|h| h.get(1).cloned()))
    }

    async fn active_plan_count(&self, school_id: Uuid) -> Result<usize, Unreachable> {
      self.check()?;
      Ok(self.plans.get(&school_id).copied().unwrap_or(0))
    }
  }

  #[tokio::test]
  async fn detector_sorts_by_severity_keeping_school_order() {
    let mut source = FakeSource::default();

    let meadow = school("Meadow");
    let a = assessment(&meadow, date(2026, 10, 1), STEADY);
    source.history.insert(meadow.school_id, vec![a]);

    let hillside = school("Hillside");

    let riverside = school("Riverside");
    let r = assessment(&riverside, date(2026, 2, 16), &[("FINANCE", &[1])]);
    source.history.insert(riverside.school_id, vec![r]);
    source.plans.insert(riverside.school_id, 1);

    source.schools = vec![meadow.clone(), hillside.clone(), riverside.clone()];

    let alerts =
      detect_risk_alerts(&source, &Taxonomy::psi(), &AlertPolicy::default(), today())
        .await
        .unwrap();

    let summary: Vec<(&str, AlertKind, Severity)> = alerts
      .iter()
      .map(|a| (a.school_name.as_str(), a.kind, a.severity))
      .collect();
    assert_eq!(summary, vec![
      ("Hillside", AlertKind::NoRecentAssessment, Severity::High),
      ("Riverside", AlertKind::NoRecentAssessment, Severity::Medium),
      ("Riverside", AlertKind::LowStandard, Severity::Medium),
      ("Meadow", AlertKind::NoActionPlan, Severity::Low),
    ]);
    assert_eq!(AlertSummary::of(&alerts), AlertSummary { high: 1, medium: 2, low: 1 });
    assert_eq!(alerts[0].id, format!("{}-no-assessment", hillside.school_id));
  }

  #[tokio::test]
  async fn detector_uses_previous_assessment_for_decline() {
    let mut source = FakeSource::default();
    let s = school("Greenfield");
    let latest = assessment(&s, date(2026, 9, 20), &[("LEADERSHIP", &[2])]);
    let previous = assessment(&s, date(2026, 6, 1), &[("LEADERSHIP", &[3])]);
    source.history.insert(s.school_id, vec![latest, previous]);
    source.plans.insert(s.school_id, 1);
    source.schools = vec![s];

    let alerts =
      detect_risk_alerts(&source, &Taxonomy::psi(), &AlertPolicy::default(), today())
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::DecliningScore);
    assert_eq!(alerts[0].severity, Severity::High);
  }

  #[tokio::test]
  async fn detector_propagates_store_failure() {
    let source = FakeSource {
      schools: vec![school("Hillside")],
      unreachable: true,
      ..FakeSource::default()
    };
    let result =
      detect_risk_alerts(&source, &Taxonomy::psi(), &AlertPolicy::default(), today()).await;
    assert!(result.is_err());
  }
}

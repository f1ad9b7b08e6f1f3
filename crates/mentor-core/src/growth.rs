//! Growth and comparison analytics over one school's assessment history.
//!
//! Both views treat a domain missing from an assessment as 0. Assessments
//! recorded under a different taxonomy are reported in `mismatches` rather
//! than rejected.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  assessment::{Assessment, Respondent},
  scoring::{self, MissingDomain},
  taxonomy::{Taxonomy, TaxonomyMismatch},
};

/// Domain spread across compared assessments at or above which a gap is
/// flagged.
pub const GAP_THRESHOLD: f64 = 1.0;

pub const MIN_COMPARED: usize = 2;
pub const MAX_COMPARED: usize = 4;

// ─── Deltas ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDelta {
  pub previous:            f64,
  pub latest:              f64,
  pub improvement:         f64,
  /// `improvement / previous * 100`, or 0 when `previous` is 0.
  pub improvement_percent: f64,
}

impl ScoreDelta {
  pub fn between(previous: f64, latest: f64) -> Self {
    let improvement = latest - previous;
    let improvement_percent = if previous > 0.0 {
      improvement / previous * 100.0
    } else {
      0.0
    };
    Self { previous, latest, improvement, improvement_percent }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainGrowth {
  pub code:  String,
  pub label: String,
  #[serde(flatten)]
  pub delta: ScoreDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
  pub code:  String,
  pub score: f64,
}

/// One assessment's scores, for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
  pub assessment_id:   Uuid,
  pub assessment_date: NaiveDate,
  pub overall:         f64,
  pub domains:         Vec<DomainScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthReport {
  pub previous_id: Uuid,
  pub latest_id:   Uuid,
  pub overall:     ScoreDelta,
  /// Sorted by improvement, largest first.
  pub domains:     Vec<DomainGrowth>,
  /// Completed assessments, oldest first.
  pub timeline:    Vec<TimelinePoint>,
  pub mismatches:  Vec<TaxonomyMismatch>,
}

impl GrowthReport {
  pub fn best_improvement(&self) -> Option<&DomainGrowth> { self.domains.first() }

  pub fn needs_attention(&self) -> Option<&DomainGrowth> { self.domains.last() }
}

fn zeroed(assessment: &Assessment, code: &str) -> f64 {
  scoring::score_for(&assessment.responses, code, MissingDomain::Zero).unwrap_or(0.0)
}

fn mismatches<'a>(
  taxonomy: &Taxonomy,
  assessments: impl IntoIterator<Item = &'a Assessment>,
) -> Vec<TaxonomyMismatch> {
  assessments
    .into_iter()
    .filter_map(|a| taxonomy.mismatch(a))
    .collect()
}

/// Latest-versus-previous growth for one school.
///
/// Drafts are ignored. Fewer than two completed assessments is an error: the
/// growth view is disabled rather than drawn empty.
pub fn growth_report(taxonomy: &Taxonomy, assessments: &[Assessment]) -> Result<GrowthReport> {
  let mut completed: Vec<&Assessment> =
    assessments.iter().filter(|a| a.is_completed()).collect();
  completed.sort_by_key(|a| (a.assessment_date, a.created_at));

  let [.., previous, latest] = completed.as_slice() else {
    return Err(Error::InsufficientHistory { found: completed.len() });
  };

  let mut domains: Vec<DomainGrowth> = taxonomy
    .domains
    .iter()
    .map(|d| DomainGrowth {
      code:  d.code.clone(),
      label: d.label.clone(),
      delta: ScoreDelta::between(zeroed(previous, &d.code), zeroed(latest, &d.code)),
    })
    .collect();
  domains.sort_by(|a, b| b.delta.improvement.total_cmp(&a.delta.improvement));

  let timeline = completed
    .iter()
    .map(|a| TimelinePoint {
      assessment_id:   a.assessment_id,
      assessment_date: a.assessment_date,
      overall:         a.overall_or_zero(),
      domains:         taxonomy
        .codes()
        .map(|code| DomainScore { code: code.to_owned(), score: zeroed(a, code) })
        .collect(),
    })
    .collect();

  Ok(GrowthReport {
    previous_id: previous.assessment_id,
    latest_id: latest.assessment_id,
    overall: ScoreDelta::between(previous.overall_or_zero(), latest.overall_or_zero()),
    domains,
    timeline,
    mismatches: mismatches(taxonomy, completed.iter().copied()),
  })
}

// ─── Comparison ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellMarker {
  Highest,
  Lowest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonCell {
  pub assessment_id: Uuid,
  pub score:         f64,
  pub marker:        Option<CellMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
  pub code:  String,
  pub label: String,
  /// One cell per compared assessment, in column order.
  pub cells: Vec<ComparisonCell>,
  /// `max - min` when it reaches [`GAP_THRESHOLD`].
  pub gap:   Option<f64>,
}

impl ComparisonRow {
  /// Display flag, e.g. `⚠ Gap 1.5`.
  pub fn gap_label(&self) -> Option<String> {
    self.gap.map(|g| format!("⚠ Gap {g:.1}"))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonColumn {
  pub assessment_id:   Uuid,
  pub assessment_date: NaiveDate,
  pub respondent:      Respondent,
  pub overall_score:   Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
  pub columns:    Vec<ComparisonColumn>,
  pub rows:       Vec<ComparisonRow>,
  pub mismatches: Vec<TaxonomyMismatch>,
}

fn compare_domain(code: &str, label: &str, selected: &[Assessment]) -> ComparisonRow {
  let scores: Vec<f64> = selected.iter().map(|a| zeroed(a, code)).collect();
  let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
  let spread = max - min;

  let cells = selected
    .iter()
    .zip(&scores)
    .map(|(a, &score)| {
      let marker = if min == max || score <= 0.0 {
        None
      } else if score == max {
        Some(CellMarker::Highest)
      } else if score == min {
        Some(CellMarker::Lowest)
      } else {
        None
      };
      ComparisonCell { assessment_id: a.assessment_id, score, marker }
    })
    .collect();

  ComparisonRow {
    code: code.to_owned(),
    label: label.to_owned(),
    cells,
    gap: (spread >= GAP_THRESHOLD).then_some(spread),
  }
}

/// Side-by-side comparison of 2–4 assessments of one school, in the order
/// given. The assessments need not be adjacent in history.
pub fn compare(taxonomy: &Taxonomy, selected: &[Assessment]) -> Result<Comparison> {
  match selected.len() {
    n if n < MIN_COMPARED => return Err(Error::TooFewSelected { selected: n }),
    n if n > MAX_COMPARED => return Err(Error::TooManySelected { selected: n }),
    _ => {}
  }

  let columns = selected
    .iter()
    .map(|a| ComparisonColumn {
      assessment_id:   a.assessment_id,
      assessment_date: a.assessment_date,
      respondent:      a.respondent.clone(),
      overall_score:   a.overall_score,
    })
    .collect();

  let rows = taxonomy
    .domains
    .iter()
    .map(|d| compare_domain(&d.code, &d.label, selected))
    .collect();

  Ok(Comparison { columns, rows, mismatches: mismatches(taxonomy, selected) })
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::assessment::{AssessmentResponses, AssessmentStatus};

  fn assessment(date: (i32, u32, u32), scores: &[(&str, &[u8])]) -> Assessment {
    let mut responses = AssessmentResponses::new();
    for (code, qs) in scores {
      for (i, s) in qs.iter().enumerate() {
        responses.set_question_score(code, &format!("q{i}"), *s);
      }
    }
    let overall = scoring::overall_score(&responses);
    Assessment {
      assessment_id:   Uuid::new_v4(),
      school_id:       Uuid::nil(),
      respondent:      Respondent::Mentor { user_id: Uuid::nil() },
      assessment_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
      status:          AssessmentStatus::Completed,
      responses,
      overall_score:   Some(overall),
      notes:           None,
      created_at:      Utc.with_ymd_and_hms(date.0, date.1, date.2, 9, 0, 0).unwrap(),
    }
  }

  fn row<'a>(c: &'a Comparison, code: &str) -> &'a ComparisonRow {
    c.rows.iter().find(|r| r.code == code).unwrap()
  }

  #[test]
  fn score_delta_formula() {
    let d = ScoreDelta::between(2.0, 3.0);
    assert_eq!(d.improvement, 1.0);
    assert_eq!(d.improvement_percent, 50.0);

    let from_zero = ScoreDelta::between(0.0, 3.0);
    assert_eq!(from_zero.improvement, 3.0);
    assert_eq!(from_zero.improvement_percent, 0.0);
  }

  #[test]
  fn growth_compares_latest_with_previous_by_date() {
    let t = Taxonomy::psi();
    // Deliberately out of order.
    let history = vec![
      assessment((2026, 6, 1), &[("LEADERSHIP", &[4]), ("FINANCE", &[2])]),
      assessment((2025, 6, 1), &[("LEADERSHIP", &[1]), ("FINANCE", &[5])]),
      assessment((2026, 1, 1), &[("LEADERSHIP", &[2]), ("FINANCE", &[3])]),
    ];
    let report = growth_report(&t, &history).unwrap();

    assert_eq!(report.latest_id, history[0].assessment_id);
    assert_eq!(report.previous_id, history[2].assessment_id);
    assert_eq!(report.timeline.len(), 3);
    assert_eq!(report.timeline[0].assessment_id, history[1].assessment_id);

    let best = report.best_improvement().unwrap();
    assert_eq!(best.code, "LEADERSHIP");
    assert_eq!(best.delta.improvement, 2.0);
    assert_eq!(best.delta.improvement_percent, 100.0);

    let worst = report.needs_attention().unwrap();
    assert_eq!(worst.code, "FINANCE");
    assert_eq!(worst.delta.improvement, -1.0);

    assert_eq!(report.overall.previous, 2.5);
    assert_eq!(report.overall.latest, 3.0);
    assert_eq!(report.overall.improvement, 0.5);
    assert_eq!(report.overall.improvement_percent, 20.0);
    assert!(report.mismatches.is_empty());
  }

  #[test]
  fn growth_needs_two_completed_assessments() {
    let t = Taxonomy::psi();
    let mut draft = assessment((2026, 2, 1), &[("LEADERSHIP", &[3])]);
    draft.status = AssessmentStatus::Draft;
    let history = vec![assessment((2026, 1, 1), &[("LEADERSHIP", &[3])]), draft];

    let err = growth_report(&t, &history).unwrap_err();
    assert!(matches!(err, Error::InsufficientHistory { found: 1 }));
    assert!(matches!(
      growth_report(&t, &[]).unwrap_err(),
      Error::InsufficientHistory { found: 0 }
    ));
  }

  #[test]
  fn identical_assessments_show_no_change_and_no_markers() {
    let t = Taxonomy::psi();
    let scores: &[(&str, &[u8])] = &[("TEACHING", &[3, 4]), ("CULTURE", &[2])];
    let history = vec![assessment((2025, 1, 1), scores), assessment((2026, 1, 1), scores)];

    let report = growth_report(&t, &history).unwrap();
    assert!(report.domains.iter().all(|d| d.delta.improvement == 0.0));
    assert_eq!(report.overall.improvement, 0.0);

    let cmp = compare(&t, &history).unwrap();
    assert!(cmp.rows.iter().flat_map(|r| &r.cells).all(|c| c.marker.is_none()));
    assert!(cmp.rows.iter().all(|r| r.gap.is_none()));
  }

  #[test]
  fn comparison_flags_gaps_and_marks_extremes() {
    let t = Taxonomy::psi();
    let selected = vec![
      assessment((2025, 1, 1), &[("TEACHING", &[2])]),
      assessment((2025, 6, 1), &[("TEACHING", &[2])]),
      assessment((2026, 1, 1), &[("TEACHING", &[3, 4])]),
    ];
    let cmp = compare(&t, &selected).unwrap();
    let teaching = row(&cmp, "TEACHING");

    assert_eq!(teaching.gap, Some(1.5));
    assert_eq!(teaching.gap_label().as_deref(), Some("⚠ Gap 1.5"));
    let markers: Vec<_> = teaching.cells.iter().map(|c| c.marker).collect();
    assert_eq!(markers, vec![
      Some(CellMarker::Lowest),
      Some(CellMarker::Lowest),
      Some(CellMarker::Highest),
    ]);
    assert_eq!(cmp.columns.len(), 3);
  }

  #[test]
  fn small_spreads_are_not_gaps() {
    let t = Taxonomy::psi();
    let selected = vec![
      assessment((2025, 1, 1), &[("FINANCE", &[3])]),
      assessment((2026, 1, 1), &[("FINANCE", &[3, 4])]),
    ];
    let cmp = compare(&t, &selected).unwrap();
    let finance = row(&cmp, "FINANCE");
    assert_eq!(finance.gap, None);
    assert_eq!(finance.cells[1].marker, Some(CellMarker::Highest));
  }

  #[test]
  fn missing_domain_counts_as_zero_without_a_lowest_marker() {
    let t = Taxonomy::psi();
    let selected = vec![
      assessment((2025, 1, 1), &[("FINANCE", &[4])]),
      assessment((2026, 1, 1), &[("TEACHING", &[4])]),
    ];
    let cmp = compare(&t, &selected).unwrap();
    let finance = row(&cmp, "FINANCE");
    assert_eq!(finance.cells[1].score, 0.0);
    assert_eq!(finance.gap, Some(4.0));
    assert_eq!(finance.cells[0].marker, Some(CellMarker::Highest));
    assert_eq!(finance.cells[1].marker, None);
  }

  #[test]
  fn comparison_selection_bounds() {
    let t = Taxonomy::psi();
    let one = vec![assessment((2026, 1, 1), &[])];
    assert!(matches!(compare(&t, &one), Err(Error::TooFewSelected { selected: 1 })));

    let five: Vec<_> = (1..=5).map(|m| assessment((2026, m, 1), &[])).collect();
    assert!(matches!(compare(&t, &five), Err(Error::TooManySelected { selected: 5 })));
    assert!(compare(&t, &five[..4]).is_ok());
  }

  #[test]
  fn legacy_assessments_are_flagged_not_rejected() {
    let t = Taxonomy::psi();
    let history = vec![
      assessment((2024, 1, 1), &[("GOVERNANCE", &[2]), ("LEADERSHIP", &[3])]),
      assessment((2026, 1, 1), &[("LEADERSHIP", &[4])]),
    ];
    let report = growth_report(&t, &history).unwrap();
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].assessment_id, history[0].assessment_id);
    assert_eq!(report.mismatches[0].unknown_codes, vec!["GOVERNANCE"]);
  }

  #[test]
  fn notes_only_legacy_entries_are_not_mismatches() {
    let t = Taxonomy::psi();
    let mut a = assessment((2026, 1, 1), &[("LEADERSHIP", &[4])]);
    a.responses.set_notes("GOVERNANCE", "Board did not meet this term");
    assert_eq!(t.mismatch(&a), None);

    a.responses.set_question_score("GOVERNANCE", "q0", 2);
    let m = t.mismatch(&a).unwrap();
    assert_eq!(m.unknown_codes, vec!["GOVERNANCE"]);
  }
}

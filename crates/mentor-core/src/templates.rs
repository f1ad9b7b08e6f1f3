//! Action-plan templates and the suggestion engine.
//!
//! Each domain scoring below 4 pulls in every action of its template. Priority
//! is tiered by rank, not by score distance: the two worst domains get 1, the
//! next two get 2, the rest get 3.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  assessment::AssessmentResponses,
  scoring::{self, MissingDomain},
  taxonomy::Taxonomy,
};

// ─── Templates ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTemplate {
  pub title:   String,
  pub actions: Vec<String>,
  /// Paired with `actions` by index; may be shorter.
  pub kpis:    Vec<String>,
  /// Cycled over `actions` by index.
  pub owners:  Vec<String>,
}

/// Templates keyed by domain code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanTemplates(BTreeMap<String, PlanTemplate>);

impl PlanTemplates {
  pub fn get(&self, code: &str) -> Option<&PlanTemplate> { self.0.get(code) }

  pub fn insert(&mut self, code: impl Into<String>, template: PlanTemplate) {
    self.0.insert(code.into(), template);
  }
}

// ─── Suggestions ─────────────────────────────────────────────────────────────

/// One generated action, ready to become an
/// [`ActionItem`](crate::plan::ActionItem).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
  pub domain:      String,
  pub description: String,
  pub owner_name:  String,
  pub kpi:         String,
  /// 1 (most urgent) to 3.
  pub priority:    u8,
}

/// Priority for the domain at `rank` in the worst-first list.
pub fn priority_for_rank(rank: usize) -> u8 {
  match rank {
    0 | 1 => 1,
    2 | 3 => 2,
    _ => 3,
  }
}

/// Codes of scored domains below 4, worst first.
///
/// Every scored response key takes part, including codes the taxonomy does
/// not define. Equal scores keep taxonomy order, with unknown codes after
/// the known ones.
pub fn priority_domains(
  taxonomy: &Taxonomy,
  responses: &AssessmentResponses,
) -> Vec<String> {
  let position = |code: &str| taxonomy.codes().position(|c| c == code).unwrap_or(usize::MAX);

  let mut scored: Vec<(&str, f64, usize)> = responses
    .codes()
    .filter_map(|code| {
      scoring::score_for(responses, code, MissingDomain::Exclude)
        .map(|s| (code, s, position(code)))
    })
    .filter(|(_, s, _)| scoring::is_priority(*s))
    .collect();

  scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)));
  scored.into_iter().map(|(code, ..)| code.to_owned()).collect()
}

/// Expand the templates of every priority domain into suggested actions.
///
/// A priority domain without a template contributes nothing but still
/// occupies its rank.
pub fn suggested_actions(
  taxonomy: &Taxonomy,
  templates: &PlanTemplates,
  responses: &AssessmentResponses,
) -> Vec<SuggestedAction> {
  let mut actions = Vec::new();

  for (rank, code) in priority_domains(taxonomy, responses).into_iter().enumerate() {
    let Some(template) = templates.get(&code) else {
      continue;
    };
    let priority = priority_for_rank(rank);

    for (i, description) in template.actions.iter().enumerate() {
      let owner_name = match template.owners.len() {
        0 => String::new(),
        n => template.owners[i % n].clone(),
      };
      actions.push(SuggestedAction {
        domain: code.clone(),
        description: description.clone(),
        owner_name,
        kpi: template.kpis.get(i).cloned().unwrap_or_default(),
        priority,
      });
    }
  }

  actions
}

// ─── Built-in catalog ────────────────────────────────────────────────────────

fn template(title: &str, actions: &[&str], kpis: &[&str], owners: &[&str]) -> PlanTemplate {
  let own = |xs: &[&str]| -> Vec<String> { xs.iter().map(|s| (*s).to_owned()).collect() };
  PlanTemplate {
    title:   title.to_owned(),
    actions: own(actions),
    kpis:    own(kpis),
    owners:  own(owners),
  }
}

impl PlanTemplates {
  /// Templates for every domain of both the PSI and the legacy taxonomy.
  pub fn builtin() -> Self {
    let mut t = Self::default();

    t.insert("FOUNDATIONS", template(
      "Re-anchor the school in its mission and foundations",
      &[
        "Review mission, vision and philosophy statements with the Board",
        "Present the foundational documents to all staff and display them publicly",
        "Check one policy per month against the mission and record changes",
      ],
      &[
        "Board minutes record adoption of reviewed statements",
        "Mission displayed in every classroom and the office",
        "Policy review log shows 3 completed reviews",
      ],
      &["Board Chair", "Headteacher"],
    ));

    t.insert("LEADERSHIP", template(
      "Strengthen leadership routines and accountability",
      &[
        "Clarify 3 school priorities for the next 90 days and communicate to all staff",
        "Introduce weekly leadership check-ins with follow-up list (owners + deadlines)",
        "Start monthly classroom observation and feedback cycle",
      ],
      &[
        "Weekly leadership meeting minutes exist for 8/12 weeks",
        "At least 2 observations per teacher completed in 90 days",
        "Staff can state the 3 priorities (spot check)",
      ],
      &["Headteacher", "Deputy Headteacher"],
    ));

    t.insert("TEACHING", template(
      "Improve lesson preparation and classroom practice",
      &[
        "Introduce a simple lesson plan template and require weekly submission",
        "Run 2 peer-observation/coaching rounds using a short checklist",
        "Agree on minimum standards for assessment and feedback",
      ],
      &[
        "80% of lesson plans submitted weekly",
        "2 coaching rounds completed per teacher",
        "Learner exercise books show feedback in 3 subjects",
      ],
      &["Academic Dean", "Deputy Headteacher"],
    ));

    t.insert("FINANCE", template(
      "Improve budgeting and financial record-keeping",
      &[
        "Create a simple monthly budget tracker (planned vs. actual)",
        "Standardize receipt and cashbook process; weekly reconciliation",
        "Agree a fee arrears procedure and apply consistently",
      ],
      &[
        "Monthly reconciliation completed for 3 months",
        "Budget tracker updated monthly",
        "Arrears reduced by X% (baseline vs. end)",
      ],
      &["Bursar", "Headteacher"],
    ));

    t.insert("SPIRITUAL", template(
      "Strengthen spiritual formation routines",
      &[
        "Create a term plan for devotions/Bible teaching (themes, schedule)",
        "Agree on 3 culture practices (language, discipline, relationships) to reinforce",
        "Hold a monthly staff reflection/prayer meeting",
      ],
      &[
        "Devotion plan exists and is followed weekly",
        "Monthly staff reflection held 3 times",
        "Student behaviour incidents reduce in 90 days (baseline vs. end)",
      ],
      &["Chaplain", "Headteacher"],
    ));

    t.insert("CULTURE", template(
      "Build a safe and healthy school community",
      &[
        "Refresh safeguarding policy and reporting flow; display it visibly",
        "Introduce supervision routines for breaks and dismissal time",
        "Hold a termly parent meeting with a written summary sent home",
      ],
      &[
        "Reporting pathway posted in 3 visible locations",
        "Supervision rota used daily for 90 days",
      ],
      &["Headteacher", "Safeguarding Lead"],
    ));

    t.insert("IMPROVEMENT", template(
      "Establish a continuous improvement cycle",
      &[
        "Write a one-page improvement plan with owners and deadlines",
        "Collect enrolment, results and finance data into a termly dashboard",
        "Review plan progress with staff at the end of each term",
      ],
      &[
        "Improvement plan approved by the Board",
        "Termly dashboard produced for 2 terms",
        "Progress review minutes exist for each term",
      ],
      &["Headteacher", "Deputy Headteacher", "Board Chair"],
    ));

    t.insert("GOVERNANCE", template(
      "Clarify governance roles and implement key policies",
      &[
        "Agree Board vs. school leadership roles and document decisions",
        "Approve/update 3 key policies (finance, HR, safeguarding) and communicate",
        "Set a monthly governance review (actions + follow-up)",
      ],
      &[
        "Policies approved and signed",
        "Board minutes show follow-up actions monthly",
        "Staff sign they received key policies",
      ],
      &["Board Chair", "Headteacher"],
    ));

    t.insert("CHILD_PROTECTION", template(
      "Strengthen safeguarding and reporting practice",
      &[
        "Refresh safeguarding policy and reporting flow; display it visibly",
        "Run staff training session on reporting and boundaries",
        "Introduce supervision routines for breaks and dismissal time",
      ],
      &[
        "100% staff trained and signed attendance",
        "Reporting pathway posted in 3 visible locations",
        "Supervision rota used daily for 90 days",
      ],
      &["Safeguarding Lead", "Headteacher"],
    ));

    t
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn responses(scores: &[(&str, &[u8])]) -> AssessmentResponses {
    let mut r = AssessmentResponses::new();
    for (code, qs) in scores {
      for (i, s) in qs.iter().enumerate() {
        r.set_question_score(code, &format!("q{i}"), *s);
      }
    }
    r
  }

  #[test]
  fn priority_domains_are_worst_first_and_below_four() {
    let t = Taxonomy::psi();
    let r = responses(&[
      ("FOUNDATIONS", &[4, 4]),
      ("LEADERSHIP", &[3]),
      ("TEACHING", &[1, 2]),
      ("FINANCE", &[5]),
      ("SPIRITUAL", &[2, 3]),
    ]);
    assert_eq!(priority_domains(&t, &r), vec!["TEACHING", "SPIRITUAL", "LEADERSHIP"]);
  }

  #[test]
  fn ties_keep_taxonomy_order() {
    let t = Taxonomy::psi();
    let r = responses(&[("IMPROVEMENT", &[2]), ("LEADERSHIP", &[2]), ("CULTURE", &[2])]);
    assert_eq!(priority_domains(&t, &r), vec!["LEADERSHIP", "CULTURE", "IMPROVEMENT"]);
  }

  #[test]
  fn codes_outside_the_taxonomy_still_rank() {
    let t = Taxonomy::psi();
    let r = responses(&[("GOVERNANCE", &[1]), ("LEADERSHIP", &[3])]);
    assert_eq!(priority_domains(&t, &r), vec!["GOVERNANCE", "LEADERSHIP"]);

    let actions = suggested_actions(&t, &PlanTemplates::builtin(), &r);
    assert_eq!(actions.len(), 6);
    assert!(actions[..3].iter().all(|a| a.domain == "GOVERNANCE" && a.priority == 1));
    assert!(actions[3..].iter().all(|a| a.domain == "LEADERSHIP" && a.priority == 1));
  }

  #[test]
  fn unknown_codes_sort_after_known_ones_on_ties() {
    let t = Taxonomy::psi();
    let r = responses(&[
      ("CHILD_PROTECTION", &[2]),
      ("GOVERNANCE", &[2]),
      ("TEACHING", &[2]),
      ("FINANCE", &[2]),
    ]);
    assert_eq!(priority_domains(&t, &r), vec![
      "TEACHING",
      "FINANCE",
      "CHILD_PROTECTION",
      "GOVERNANCE"
    ]);
  }

  #[test]
  fn rank_tiers() {
    let tiers: Vec<u8> = (0..7).map(priority_for_rank).collect();
    assert_eq!(tiers, vec![1, 1, 2, 2, 3, 3, 3]);
  }

  #[test]
  fn suggested_actions_expand_templates_with_tiered_priority() {
    let t = Taxonomy::psi();
    let r = responses(&[
      ("FOUNDATIONS", &[1]),
      ("LEADERSHIP", &[2]),
      ("TEACHING", &[3]),
      ("FINANCE", &[3, 4]),
      ("SPIRITUAL", &[4, 3, 3]),
      ("CULTURE", &[5]),
      ("IMPROVEMENT", &[4]),
    ]);
    let actions = suggested_actions(&t, &PlanTemplates::builtin(), &r);

    // FOUNDATIONS, LEADERSHIP, TEACHING, SPIRITUAL, FINANCE × 3 actions each.
    assert_eq!(actions.len(), 15);
    assert!(actions.iter().all(|a| a.domain != "CULTURE" && a.domain != "IMPROVEMENT"));

    let order: Vec<&str> = actions.iter().step_by(3).map(|a| a.domain.as_str()).collect();
    assert_eq!(order, vec!["FOUNDATIONS", "LEADERSHIP", "TEACHING", "SPIRITUAL", "FINANCE"]);

    let priorities: Vec<u8> = actions.iter().step_by(3).map(|a| a.priority).collect();
    assert_eq!(priorities, vec![1, 1, 2, 2, 3]);
  }

  #[test]
  fn owners_cycle_and_missing_kpis_are_empty() {
    let t = Taxonomy::psi();
    let r = responses(&[("CULTURE", &[2])]);
    let actions = suggested_actions(&t, &PlanTemplates::builtin(), &r);

    assert_eq!(actions.len(), 3);
    let owners: Vec<&str> = actions.iter().map(|a| a.owner_name.as_str()).collect();
    assert_eq!(owners, vec!["Headteacher", "Safeguarding Lead", "Headteacher"]);
    assert!(!actions[1].kpi.is_empty());
    assert_eq!(actions[2].kpi, "");
  }

  #[test]
  fn domains_without_template_keep_their_rank() {
    let t = Taxonomy::psi();
    let mut templates = PlanTemplates::builtin();
    templates.0.remove("LEADERSHIP");
    let r = responses(&[("LEADERSHIP", &[1]), ("TEACHING", &[2]), ("FINANCE", &[3])]);
    let actions = suggested_actions(&t, &templates, &r);

    assert!(actions.iter().all(|a| a.domain != "LEADERSHIP"));
    assert!(actions.iter().filter(|a| a.domain == "TEACHING").all(|a| a.priority == 1));
    assert!(actions.iter().filter(|a| a.domain == "FINANCE").all(|a| a.priority == 2));
  }

  #[test]
  fn nothing_to_do_for_strong_schools() {
    let t = Taxonomy::psi();
    let r = responses(&[("LEADERSHIP", &[4, 5]), ("TEACHING", &[5])]);
    assert!(suggested_actions(&t, &PlanTemplates::builtin(), &r).is_empty());
  }

  #[test]
  fn builtin_covers_both_taxonomies() {
    let templates = PlanTemplates::builtin();
    for t in [Taxonomy::psi(), Taxonomy::legacy()] {
      assert!(t.codes().all(|c| templates.get(c).is_some()), "{}", t.version);
    }
  }
}

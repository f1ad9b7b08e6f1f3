//! The assessment taxonomy: domains (standards) and their questions.
//!
//! A taxonomy is an immutable value built once at startup and passed by
//! reference into scoring, templates, analytics and alerting. Responses are
//! keyed by domain code, so assessments recorded under one taxonomy are only
//! comparable with assessments that use the same code set.

use serde::{Deserialize, Serialize};

use crate::{assessment::Assessment, Error, Result};

// ─── Catalog types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  pub id:   String,
  pub text: String,
}

/// A named standard containing several questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
  /// Symbolic identifier; the key used in [`crate::assessment::AssessmentResponses`].
  pub code:      String,
  pub label:     String,
  pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
  pub version: String,
  pub domains: Vec<Domain>,
}

impl Taxonomy {
  /// Parse a taxonomy file. A taxonomy with no domains is rejected.
  pub fn from_json(json: &str) -> Result<Self> {
    let taxonomy: Self = serde_json::from_str(json)?;
    if taxonomy.domains.is_empty() {
      return Err(Error::EmptyTaxonomy { version: taxonomy.version });
    }
    Ok(taxonomy)
  }

  pub fn domain(&self, code: &str) -> Option<&Domain> {
    self.domains.iter().find(|d| d.code == code)
  }

  pub fn codes(&self) -> impl Iterator<Item = &str> {
    self.domains.iter().map(|d| d.code.as_str())
  }

  pub fn question_count(&self) -> usize {
    self.domains.iter().map(|d| d.questions.len()).sum()
  }

  /// Display label for `code`, falling back to the code itself.
  pub fn label<'a>(&'a self, code: &'a str) -> &'a str {
    self.domain(code).map_or(code, |d| d.label.as_str())
  }

  /// Report scored response keys that this taxonomy does not define.
  /// Notes-only entries carry no score and are not reported.
  ///
  /// Returns `None` when every scored domain of `assessment` is known.
  pub fn mismatch(&self, assessment: &Assessment) -> Option<TaxonomyMismatch> {
    let unknown_codes: Vec<String> = assessment
      .responses
      .iter()
      .filter(|(code, response)| response.is_scored() && self.domain(code).is_none())
      .map(|(code, _)| code.to_owned())
      .collect();

    if unknown_codes.is_empty() {
      None
    } else {
      Some(TaxonomyMismatch {
        assessment_id: assessment.assessment_id,
        taxonomy:      self.version.clone(),
        unknown_codes,
      })
    }
  }
}

/// An assessment whose responses use domain codes outside the live taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyMismatch {
  pub assessment_id: uuid::Uuid,
  pub taxonomy:      String,
  pub unknown_codes: Vec<String>,
}

// ─── Score scale ─────────────────────────────────────────────────────────────

/// The 1–5 evidence scale used for every question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
  NotEvident,
  PartiallyEvident,
  Evident,
  VeryEvident,
  Exemplary,
}

impl ScoreBand {
  /// Band for a (possibly fractional) score; `None` for 0 / unscored.
  pub fn for_score(score: f64) -> Option<Self> {
    match score.round() as i64 {
      1 => Some(Self::NotEvident),
      2 => Some(Self::PartiallyEvident),
      3 => Some(Self::Evident),
      4 => Some(Self::VeryEvident),
      5 => Some(Self::Exemplary),
      _ => None,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::NotEvident => "Not Evident",
      Self::PartiallyEvident => "Partially Evident",
      Self::Evident => "Evident",
      Self::VeryEvident => "Very Evident",
      Self::Exemplary => "Exemplary",
    }
  }
}

// ─── Built-in taxonomies ─────────────────────────────────────────────────────

fn domain(code: &str, label: &str, questions: &[(&str, &str)]) -> Domain {
  Domain {
    code:      code.to_owned(),
    label:     label.to_owned(),
    questions: questions
      .iter()
      .map(|(id, text)| Question { id: (*id).to_owned(), text: (*text).to_owned() })
      .collect(),
  }
}

impl Taxonomy {
  /// The live taxonomy: the seven PSI standards.
  pub fn psi() -> Self {
    Self {
      version: "psi-1".to_owned(),
      domains: vec![
        domain("FOUNDATIONS", "Philosophy & Foundations", &[
          ("fd_mission", "The mission and vision statements are written, adopted by the Board and widely known."),
          ("fd_philosophy", "A written philosophy of Christian education guides programmes and decisions."),
          ("fd_faith_statement", "Board and staff affirm the statement of faith."),
          ("fd_review", "Foundational documents are reviewed on a regular cycle."),
          ("fd_alignment", "School practices visibly reflect the stated mission."),
        ]),
        domain("LEADERSHIP", "Leadership & Personnel", &[
          ("ld_governance", "The Board governs through policy and does not manage daily operations."),
          ("ld_roles", "Board and head of school roles are written and understood."),
          ("ld_planning", "Leaders set clear priorities and follow through on commitments."),
          ("ld_hiring", "Hiring follows a written process that checks faith, qualifications and references."),
          ("ld_appraisal", "Staff are appraised annually against written job descriptions."),
          ("ld_development", "Staff receive coaching and professional development."),
          ("ld_succession", "Key leadership roles have a succession plan."),
        ]),
        domain("TEACHING", "Teaching & Learning", &[
          ("tl_curriculum", "A documented curriculum is taught across all grades."),
          ("tl_planning", "Teachers plan lessons and use curriculum materials effectively."),
          ("tl_biblical", "A biblical worldview is integrated into subject teaching."),
          ("tl_assessment", "Student work is assessed regularly and feedback is given."),
          ("tl_differentiation", "Teaching meets diverse learner needs (remedial, gifted, special needs)."),
          ("tl_observation", "Lessons are observed and teachers receive feedback."),
          ("tl_results", "Learning outcomes are tracked and used to adjust instruction."),
        ]),
        domain("FINANCE", "Finance & Operations", &[
          ("fo_budget", "An annual budget is approved and spending is tracked against it."),
          ("fo_records", "Financial records are accurate and reconciled monthly."),
          ("fo_fees", "Fee collection and arrears processes are consistent and fair."),
          ("fo_audit", "Accounts are reviewed or audited independently each year."),
          ("fo_facilities", "Facilities are safe, maintained and fit for purpose."),
        ]),
        domain("SPIRITUAL", "Spiritual Formation", &[
          ("sf_devotions", "Devotions and Bible teaching are planned and happen consistently."),
          ("sf_staff_modeling", "Staff model Christian character in their work."),
          ("sf_discipleship", "Students have intentional discipleship opportunities."),
          ("sf_service", "Students take part in service to the wider community."),
          ("sf_staff_growth", "Staff spiritual growth is supported through fellowship and prayer."),
          ("sf_parents", "Parents are partners in the spiritual formation of students."),
        ]),
        domain("CULTURE", "School Culture & Community", &[
          ("sc_safety", "The environment is physically and emotionally safe for students."),
          ("sc_safeguarding", "Safeguarding policy and reporting procedures are known and used."),
          ("sc_discipline", "Discipline is restorative, consistent and grace-filled."),
          ("sc_relationships", "Relationships between staff, students and families are healthy."),
          ("sc_communication", "The school communicates regularly with families."),
        ]),
        domain("IMPROVEMENT", "Continuous Improvement", &[
          ("ci_self_review", "The school reviews its own performance at least annually."),
          ("ci_data", "Decisions are informed by data (enrolment, results, finance)."),
          ("ci_plan", "A written improvement plan with owners and deadlines exists."),
          ("ci_follow_up", "Progress against the improvement plan is reviewed each term."),
          ("ci_stakeholders", "Staff, parents and students give feedback that shapes improvement."),
        ]),
      ],
    }
  }

  /// The six-domain taxonomy that preceded PSI alignment.
  pub fn legacy() -> Self {
    Self {
      version: "legacy-1".to_owned(),
      domains: vec![
        domain("LEADERSHIP", "Leadership & Management", &[
          ("ld_vision", "The school has a clear vision and priorities that guide decisions."),
          ("ld_accountability", "Leaders follow through on commitments and hold people accountable."),
          ("ld_development", "Staff receive coaching, feedback, and professional development opportunities."),
        ]),
        domain("TEACHING", "Teaching & Learning", &[
          ("tch_planning", "Teachers plan lessons and use curriculum materials effectively."),
          ("tch_assessment", "Student work is assessed regularly and feedback is given."),
          ("tch_differentiation", "Teaching meets diverse learner needs (remedial, gifted, special needs)."),
        ]),
        domain("GOVERNANCE", "Governance & Policies", &[
          ("gov_policies", "Key policies exist (HR, finance, safeguarding) and are followed."),
          ("gov_oversight", "The Board provides effective oversight and strategic direction."),
          ("gov_roles", "Decision-making roles are clear (Board vs. management)."),
        ]),
        domain("CHILD_PROTECTION", "Child Protection & Safeguarding", &[
          ("cp_policy", "Child protection policy exists and is known by staff."),
          ("cp_reporting", "Reporting procedures are clear and used when concerns arise."),
          ("cp_environment", "The environment is safe (supervision, boundaries, physical safety)."),
          ("cp_training", "Staff receive safeguarding training and understand their responsibilities."),
        ]),
        domain("FINANCE", "Financial Stewardship", &[
          ("fin_budget", "A budget exists and is followed; spending is tracked against it."),
          ("fin_records", "Records are accurate (fees, receipts, expenses) and reconciled regularly."),
          ("fin_fees", "Fee collection and arrears processes are consistent and fair."),
        ]),
        domain("SPIRITUAL", "Spiritual Formation", &[
          ("sp_culture", "Christian values are visible in the school culture and relationships."),
          ("sp_devotions", "Devotions/Bible teaching is planned and happens consistently."),
          ("sp_staff", "Staff model character and spiritual maturity in their work."),
        ]),
      ],
    }
  }
}

impl Default for Taxonomy {
  fn default() -> Self { Self::psi() }
}

//! [`SqliteStore`], the SQLite implementation of [`MentorStore`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rand_core::{OsRng, RngCore as _};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use mentor_core::{
  assessment::{
    Assessment, AssessmentLink, AssessmentStatus, NewAssessment, Respondent,
  },
  plan::{
    ActionItem, ActionItemStatus, ActionPlan, ActionPlanStatus, ActionPlanWithItems,
    NewActionItem, NewActionPlan,
  },
  school::{NewSchool, School},
  store::{AlertSource, MentorStore},
};

use crate::{
  encode::{
    encode_date, encode_dt, encode_uuid, RawAssessment, RawItem, RawLink, RawPlan,
    RawSchool,
  },
  schema::SCHEMA,
  Error, Result,
};

/// Random bytes behind each self-assessment link token.
const TOKEN_BYTES: usize = 32;

fn new_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A mentoring store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Completed assessment number `offset` of a school, newest first.
  async fn nth_completed(&self, school_id: Uuid, offset: i64) -> Result<Option<Assessment>> {
    let id_str = encode_uuid(school_id);
    let status = AssessmentStatus::Completed.as_ref().to_owned();

    let raw: Option<RawAssessment> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM assessments
           WHERE school_id = ?1 AND status = ?2
           ORDER BY assessment_date DESC, created_at DESC
           LIMIT 1 OFFSET ?3",
          RawAssessment::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str, status, offset], RawAssessment::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAssessment::into_assessment).transpose()
  }

  async fn plan_items(&self, plan_id: Uuid) -> Result<Vec<ActionItem>> {
    let id_str = encode_uuid(plan_id);

    let raws: Vec<RawItem> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM action_items WHERE plan_id = ?1 ORDER BY position",
          RawItem::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawItem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }
}

// ─── AlertSource impl ────────────────────────────────────────────────────────

impl AlertSource for SqliteStore {
  type Error = Error;

  async fn list_schools(&self) -> Result<Vec<School>> {
    let raws: Vec<RawSchool> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT {} FROM schools ORDER BY name COLLATE NOCASE, created_at",
          RawSchool::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawSchool::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSchool::into_school).collect()
  }

  async fn latest_completed(&self, school_id: Uuid) -> Result<Option<Assessment>> {
    self.nth_completed(school_id, 0).await
  }

  async fn previous_completed(&self, school_id: Uuid) -> Result<Option<Assessment>> {
    self.nth_completed(school_id, 1).await
  }

  async fn active_plan_count(&self, school_id: Uuid) -> Result<usize> {
    let id_str = encode_uuid(school_id);
    let status = ActionPlanStatus::Active.as_ref().to_owned();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM action_plans WHERE school_id = ?1 AND status = ?2",
          rusqlite::params![id_str, status],
          |r| r.get(0),
        )?)
      })
      .await?;

    usize::try_from(count).map_err(|_| Error::InvalidValue {
      column: "COUNT(action_plans)",
      value:  count.to_string(),
    })
  }
}

// ─── MentorStore impl ────────────────────────────────────────────────────────

impl MentorStore for SqliteStore {
  // ── Schools ───────────────────────────────────────────────────────────────

  async fn add_school(&self, input: NewSchool) -> Result<School> {
    let school = School {
      school_id:     Uuid::new_v4(),
      name:          input.name,
      county:        input.county,
      town:          input.town,
      head_teacher:  input.head_teacher,
      student_count: input.student_count,
      staff_count:   input.staff_count,
      created_at:    Utc::now(),
    };

    let id_str = encode_uuid(school.school_id);
    let at_str = encode_dt(school.created_at);
    let row = school.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO schools (
             school_id, name, county, town, head_teacher,
             student_count, staff_count, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            row.name,
            row.county,
            row.town,
            row.head_teacher,
            row.student_count,
            row.staff_count,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(school)
  }

  async fn get_school(&self, id: Uuid) -> Result<Option<School>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSchool> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM schools WHERE school_id = ?1", RawSchool::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawSchool::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSchool::into_school).transpose()
  }

  // ── Assessments ───────────────────────────────────────────────────────────

  async fn record_assessment(&self, input: NewAssessment) -> Result<Assessment> {
    let assessment = Assessment {
      assessment_id:   Uuid::new_v4(),
      school_id:       input.school_id,
      respondent:      input.respondent,
      assessment_date: input.assessment_date,
      status:          input.status,
      responses:       input.responses,
      overall_score:   Some(input.overall_score),
      notes:           input.notes,
      created_at:      Utc::now(),
    };

    let (conducted_by, link_id) = match &assessment.respondent {
      Respondent::Mentor { user_id } => (Some(encode_uuid(*user_id)), None),
      Respondent::SelfAssessment { link_id, .. } => (None, Some(encode_uuid(*link_id))),
    };
    let id_str         = encode_uuid(assessment.assessment_id);
    let school_id_str  = encode_uuid(assessment.school_id);
    let respondent_str = serde_json::to_string(&assessment.respondent)?;
    let date_str       = encode_date(assessment.assessment_date);
    let status_str     = assessment.status.as_ref().to_owned();
    let responses_str  = serde_json::to_string(&assessment.responses)?;
    let overall        = assessment.overall_score;
    let notes          = assessment.notes.clone();
    let at_str         = encode_dt(assessment.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO assessments (
             assessment_id, school_id, respondent, conducted_by, assessment_link_id,
             assessment_date, status, responses_json, overall_score, notes, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            school_id_str,
            respondent_str,
            conducted_by,
            link_id,
            date_str,
            status_str,
            responses_str,
            overall,
            notes,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(assessment)
  }

  async fn get_assessment(&self, id: Uuid) -> Result<Option<Assessment>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAssessment> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM assessments WHERE assessment_id = ?1",
          RawAssessment::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawAssessment::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAssessment::into_assessment).transpose()
  }

  async fn list_assessments(
    &self,
    school_id: Uuid,
    status: Option<AssessmentStatus>,
  ) -> Result<Vec<Assessment>> {
    let id_str     = encode_uuid(school_id);
    let status_str = status.map(|s| s.as_ref().to_owned());

    let raws: Vec<RawAssessment> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM assessments
           WHERE school_id = ?1 AND (?2 IS NULL OR status = ?2)
           ORDER BY assessment_date, created_at",
          RawAssessment::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str, status_str], RawAssessment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAssessment::into_assessment).collect()
  }

  async fn delete_assessment(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM assessments WHERE assessment_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Self-assessment links ─────────────────────────────────────────────────

  async fn create_assessment_link(
    &self,
    school_id: Uuid,
    created_by: Uuid,
    expires_at: DateTime<Utc>,
  ) -> Result<AssessmentLink> {
    let link = AssessmentLink {
      link_id: Uuid::new_v4(),
      school_id,
      created_by,
      token: new_token(),
      expires_at,
      created_at: Utc::now(),
    };

    let id_str     = encode_uuid(link.link_id);
    let school_str = encode_uuid(school_id);
    let by_str     = encode_uuid(created_by);
    let token      = link.token.clone();
    let exp_str    = encode_dt(expires_at);
    let at_str     = encode_dt(link.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO assessment_links (
             link_id, school_id, created_by, token, expires_at, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, school_str, by_str, token, exp_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(link)
  }

  async fn find_assessment_link<'a>(&'a self, token: &'a str) -> Result<Option<AssessmentLink>> {
    let token = token.to_owned();

    let raw: Option<RawLink> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM assessment_links WHERE token = ?1", RawLink::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![token], RawLink::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLink::into_link).transpose()
  }

  // ── Action plans ──────────────────────────────────────────────────────────

  async fn create_plan_with_items(
    &self,
    plan: NewActionPlan,
    items: Vec<NewActionItem>,
  ) -> Result<ActionPlanWithItems> {
    let now = Utc::now();
    let plan = ActionPlan {
      plan_id:       Uuid::new_v4(),
      school_id:     plan.school_id,
      assessment_id: plan.assessment_id,
      created_by:    plan.created_by,
      title:         plan.title,
      description:   plan.description,
      start_date:    plan.start_date,
      end_date:      plan.end_date,
      status:        plan.status,
      created_at:    now,
    };
    let items: Vec<ActionItem> = items
      .into_iter()
      .map(|item| ActionItem {
        item_id:        Uuid::new_v4(),
        plan_id:        plan.plan_id,
        domain:         item.domain,
        description:    item.description,
        owner_name:     item.owner_name,
        kpi:            item.kpi,
        priority:       item.priority,
        status:         ActionItemStatus::Pending,
        due_date:       item.due_date,
        completed_date: None,
        notes:          None,
        created_at:     now,
      })
      .collect();

    let plan_row = plan.clone();
    let item_rows = items.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO action_plans (
             plan_id, school_id, assessment_id, created_by, title, description,
             start_date, end_date, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            encode_uuid(plan_row.plan_id),
            encode_uuid(plan_row.school_id),
            plan_row.assessment_id.map(encode_uuid),
            plan_row.created_by.map(encode_uuid),
            plan_row.title,
            plan_row.description,
            plan_row.start_date.map(encode_date),
            plan_row.end_date.map(encode_date),
            plan_row.status.as_ref(),
            encode_dt(plan_row.created_at),
          ],
        )?;

        {
          let mut stmt = tx.prepare(
            "INSERT INTO action_items (
               item_id, plan_id, position, domain, description, owner_name, kpi,
               priority, status, due_date, completed_date, notes, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
          )?;
          for (position, item) in item_rows.iter().enumerate() {
            stmt.execute(rusqlite::params![
              encode_uuid(item.item_id),
              encode_uuid(item.plan_id),
              position as i64,
              item.domain,
              item.description,
              item.owner_name,
              item.kpi,
              item.priority,
              item.status.as_ref(),
              item.due_date.map(encode_date),
              item.completed_date.map(encode_date),
              item.notes,
              encode_dt(item.created_at),
            ])?;
          }
        }

        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(ActionPlanWithItems { plan, items })
  }

  async fn get_plan(&self, id: Uuid) -> Result<Option<ActionPlanWithItems>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPlan> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM action_plans WHERE plan_id = ?1", RawPlan::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawPlan::from_row)
            .optional()?,
        )
      })
      .await?;

    let Some(raw) = raw else {
      return Ok(None);
    };
    let plan = raw.into_plan()?;
    let items = self.plan_items(plan.plan_id).await?;

    Ok(Some(ActionPlanWithItems { plan, items }))
  }

  async fn list_plans(
    &self,
    school_id: Uuid,
    status: Option<ActionPlanStatus>,
  ) -> Result<Vec<ActionPlan>> {
    let id_str     = encode_uuid(school_id);
    let status_str = status.map(|s| s.as_ref().to_owned());

    let raws: Vec<RawPlan> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM action_plans
           WHERE school_id = ?1 AND (?2 IS NULL OR status = ?2)
           ORDER BY created_at DESC",
          RawPlan::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str, status_str], RawPlan::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPlan::into_plan).collect()
  }

  async fn update_item_status(
    &self,
    plan_id: Uuid,
    item_id: Uuid,
    status: ActionItemStatus,
    today: NaiveDate,
  ) -> Result<Option<ActionItem>> {
    let plan_str   = encode_uuid(plan_id);
    let item_str   = encode_uuid(item_id);
    let status_str = status.as_ref().to_owned();
    let completed  = (status == ActionItemStatus::Completed).then(|| encode_date(today));

    let raw: Option<RawItem> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE action_items SET status = ?1, completed_date = ?2
           WHERE item_id = ?3 AND plan_id = ?4",
          rusqlite::params![status_str, completed, item_str, plan_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }

        let sql = format!("SELECT {} FROM action_items WHERE item_id = ?1", RawItem::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![item_str], RawItem::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawItem::into_item).transpose()
  }
}

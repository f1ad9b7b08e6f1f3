//! SQL schema for the mentoring SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS schools (
    school_id     TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    county        TEXT,
    town          TEXT,
    head_teacher  TEXT,
    student_count INTEGER,
    staff_count   INTEGER,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assessment_links (
    link_id    TEXT PRIMARY KEY,
    school_id  TEXT NOT NULL REFERENCES schools(school_id) ON DELETE CASCADE,
    created_by TEXT NOT NULL,
    token      TEXT NOT NULL UNIQUE,
    expires_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- The respondent is stored whole as JSON; conducted_by and
-- assessment_link_id mirror it for lookups and referential integrity.
CREATE TABLE IF NOT EXISTS assessments (
    assessment_id      TEXT PRIMARY KEY,
    school_id          TEXT NOT NULL REFERENCES schools(school_id) ON DELETE CASCADE,
    respondent         TEXT NOT NULL,
    conducted_by       TEXT,
    assessment_link_id TEXT REFERENCES assessment_links(link_id),
    assessment_date    TEXT NOT NULL,   -- YYYY-MM-DD
    status             TEXT NOT NULL,   -- 'draft' | 'completed'
    responses_json     TEXT NOT NULL,
    overall_score      REAL,
    notes              TEXT,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS action_plans (
    plan_id       TEXT PRIMARY KEY,
    school_id     TEXT NOT NULL REFERENCES schools(school_id) ON DELETE CASCADE,
    assessment_id TEXT REFERENCES assessments(assessment_id) ON DELETE SET NULL,
    created_by    TEXT,
    title         TEXT NOT NULL,
    description   TEXT,
    start_date    TEXT,
    end_date      TEXT,
    status        TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS action_items (
    item_id        TEXT PRIMARY KEY,
    plan_id        TEXT NOT NULL REFERENCES action_plans(plan_id) ON DELETE CASCADE,
    position       INTEGER NOT NULL,
    domain         TEXT NOT NULL,
    description    TEXT NOT NULL,
    owner_name     TEXT,
    kpi            TEXT,
    priority       INTEGER,
    status         TEXT NOT NULL,
    due_date       TEXT,
    completed_date TEXT,
    notes          TEXT,
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS assessments_school_idx ON assessments(school_id, status, assessment_date);
CREATE INDEX IF NOT EXISTS plans_school_idx       ON action_plans(school_id, status);
CREATE INDEX IF NOT EXISTS items_plan_idx         ON action_items(plan_id, position);

PRAGMA user_version = 1;
";

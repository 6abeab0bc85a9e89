use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use libsql::{params, Builder, Connection};

use super::models::{Issue, IssueDraft, IssueStatus, IssueType, Priority};

/// Where the issues table lives: a local database file, or a hosted
/// database reached through the libsql remote protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Local(PathBuf),
    Remote { url: String, auth_token: String },
}

/// Column list shared by every issue SELECT, in `IssueRow` field order.
const ISSUE_COLUMNS: &str = "id, issue_key, summary, description, acceptance_criteria, \
     issue_type, priority, story_points, start_date, due_date, sprint, status, \
     created_at, updated_at";

/// Thin handle to the `issues` table.
///
/// All persistence is delegated to libsql: a local database file for
/// development and tests, or a remote hosted database via URL + auth token.
/// Every write re-reads the stored row so callers always reconcile against
/// what the server actually holds.
#[derive(Clone)]
pub struct BoardDb {
    conn: Connection,
}

impl BoardDb {
    /// Open (or create) a local database file and run migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .context("Failed to open local database")?;
        let conn = db.connect().context("Failed to connect to database")?;
        let db = Self { conn };
        db.init().await?;
        Ok(db)
    }

    /// Connect to a remote hosted database.
    pub async fn open_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .context("Failed to open remote database")?;
        let conn = db.connect().context("Failed to connect to database")?;
        let db = Self { conn };
        db.init().await?;
        Ok(db)
    }

    /// In-memory database (for testing).
    pub async fn open_in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:")).await
    }

    /// Open whichever backend the configuration points at.
    pub async fn connect(location: &DatabaseLocation) -> Result<Self> {
        match location {
            DatabaseLocation::Local(path) => Self::open(path).await,
            DatabaseLocation::Remote { url, auth_token } => {
                Self::open_remote(url.clone(), auth_token.clone()).await
            }
        }
    }

    async fn init(&self) -> Result<()> {
        self.run_migrations()
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    async fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS issues (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    issue_key TEXT NOT NULL,
                    summary TEXT NOT NULL,
                    description TEXT NOT NULL,
                    acceptance_criteria TEXT NOT NULL,
                    issue_type TEXT NOT NULL DEFAULT 'Story',
                    priority TEXT NOT NULL DEFAULT 'P2',
                    story_points REAL,
                    start_date TEXT,
                    due_date TEXT,
                    sprint TEXT,
                    status TEXT NOT NULL DEFAULT 'backlog',
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE UNIQUE INDEX IF NOT EXISTS idx_issues_key ON issues(issue_key);
                CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
                CREATE INDEX IF NOT EXISTS idx_issues_created ON issues(created_at DESC, id DESC);
                ",
            )
            .await
            .context("Failed to create issues table")?;
        Ok(())
    }

    // ── Issue CRUD ────────────────────────────────────────────────────

    /// All issues, newest first.
    pub async fn list_issues(&self) -> Result<Vec<Issue>> {
        let sql = format!(
            "SELECT {} FROM issues ORDER BY created_at DESC, id DESC",
            ISSUE_COLUMNS
        );
        let mut rows = self
            .conn
            .query(&sql, ())
            .await
            .context("Failed to query issues")?;
        let mut issues = Vec::new();
        while let Some(row) = rows.next().await.context("Failed to read issue row")? {
            issues.push(read_issue(&row)?);
        }
        Ok(issues)
    }

    pub async fn get_issue(&self, id: i64) -> Result<Option<Issue>> {
        let sql = format!("SELECT {} FROM issues WHERE id = ?1", ISSUE_COLUMNS);
        let mut rows = self
            .conn
            .query(&sql, params![id])
            .await
            .context("Failed to query issue")?;
        match rows.next().await.context("Failed to read issue row")? {
            Some(row) => Ok(Some(read_issue(&row)?)),
            None => Ok(None),
        }
    }

    /// The key of the most recently created issue, if any. Reads the single
    /// latest row by creation order (id breaks same-second ties), not a
    /// global maximum over all keys.
    pub async fn last_issue_key(&self) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT issue_key FROM issues ORDER BY created_at DESC, id DESC LIMIT 1",
                (),
            )
            .await
            .context("Failed to query last issue key")?;
        match rows.next().await.context("Failed to read issue key row")? {
            Some(row) => Ok(Some(row.get(0).context("Failed to read issue key")?)),
            None => Ok(None),
        }
    }

    /// Insert a new issue under the given key and status, returning the
    /// stored row. The caller derives the key; see `board::keys`.
    pub async fn insert_issue(
        &self,
        issue_key: &str,
        draft: &IssueDraft,
        status: IssueStatus,
    ) -> Result<Issue> {
        self.conn
            .execute(
                "INSERT INTO issues (issue_key, summary, description, acceptance_criteria, \
                 issue_type, priority, story_points, start_date, due_date, sprint, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    issue_key,
                    draft.summary.as_str(),
                    draft.description.as_str(),
                    draft.acceptance_criteria.as_str(),
                    draft.issue_type.as_str(),
                    draft.priority.as_str(),
                    opt_value(draft.story_points),
                    opt_value(draft.start_date.map(|d| d.to_string())),
                    opt_value(draft.due_date.map(|d| d.to_string())),
                    opt_value(draft.sprint.clone()),
                    status.as_str(),
                ],
            )
            .await
            .context("Failed to insert issue")?;
        let id = self.conn.last_insert_rowid();
        self.get_issue(id)
            .await?
            .context("Issue not found after insert")
    }

    /// Overwrite every editable field of an issue. `id`, `issue_key`, and
    /// `created_at` are untouched. Returns None when the issue is gone.
    pub async fn update_issue(&self, id: i64, draft: &IssueDraft) -> Result<Option<Issue>> {
        let affected = self
            .conn
            .execute(
                "UPDATE issues SET summary = ?1, description = ?2, acceptance_criteria = ?3, \
                 issue_type = ?4, priority = ?5, story_points = ?6, start_date = ?7, \
                 due_date = ?8, sprint = ?9, updated_at = datetime('now') WHERE id = ?10",
                params![
                    draft.summary.as_str(),
                    draft.description.as_str(),
                    draft.acceptance_criteria.as_str(),
                    draft.issue_type.as_str(),
                    draft.priority.as_str(),
                    opt_value(draft.story_points),
                    opt_value(draft.start_date.map(|d| d.to_string())),
                    opt_value(draft.due_date.map(|d| d.to_string())),
                    opt_value(draft.sprint.clone()),
                    id,
                ],
            )
            .await
            .context("Failed to update issue")?;
        if affected == 0 {
            return Ok(None);
        }
        self.get_issue(id).await
    }

    /// Set the status field directly. No transition validation; any status
    /// may be set from any other.
    pub async fn move_issue(&self, id: i64, status: IssueStatus) -> Result<Option<Issue>> {
        let affected = self
            .conn
            .execute(
                "UPDATE issues SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![status.as_str(), id],
            )
            .await
            .context("Failed to move issue")?;
        if affected == 0 {
            return Ok(None);
        }
        self.get_issue(id).await
    }

    pub async fn delete_issue(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM issues WHERE id = ?1", params![id])
            .await
            .context("Failed to delete issue")?;
        Ok(affected > 0)
    }
}

/// NULL for None; `row.get::<Option<T>>` on the way back out.
fn opt_value<T: Into<libsql::Value>>(value: Option<T>) -> libsql::Value {
    value.map_or(libsql::Value::Null, Into::into)
}

// ── Row mapping ───────────────────────────────────────────────────────

struct IssueRow {
    id: i64,
    issue_key: String,
    summary: String,
    description: String,
    acceptance_criteria: String,
    issue_type: String,
    priority: String,
    story_points: Option<f64>,
    start_date: Option<String>,
    due_date: Option<String>,
    sprint: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl IssueRow {
    fn into_issue(self) -> Result<Issue> {
        Ok(Issue {
            id: self.id,
            issue_key: self.issue_key,
            summary: self.summary,
            description: self.description,
            acceptance_criteria: self.acceptance_criteria,
            issue_type: self
                .issue_type
                .parse::<IssueType>()
                .map_err(|e| anyhow::anyhow!(e))
                .context("Invalid issue_type in database")?,
            priority: self
                .priority
                .parse::<Priority>()
                .map_err(|e| anyhow::anyhow!(e))
                .context("Invalid priority in database")?,
            story_points: self.story_points,
            start_date: parse_date(self.start_date.as_deref())?,
            due_date: parse_date(self.due_date.as_deref())?,
            sprint: self.sprint,
            status: self
                .status
                .parse::<IssueStatus>()
                .map_err(|e| anyhow::anyhow!(e))
                .context("Invalid status in database")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value {
        Some(s) => {
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Invalid date in database: {}", s))?;
            Ok(Some(date))
        }
        None => Ok(None),
    }
}

fn read_issue(row: &libsql::Row) -> Result<Issue> {
    let raw = IssueRow {
        id: row.get(0).context("Failed to read id")?,
        issue_key: row.get(1).context("Failed to read issue_key")?,
        summary: row.get(2).context("Failed to read summary")?,
        description: row.get(3).context("Failed to read description")?,
        acceptance_criteria: row.get(4).context("Failed to read acceptance_criteria")?,
        issue_type: row.get(5).context("Failed to read issue_type")?,
        priority: row.get(6).context("Failed to read priority")?,
        story_points: row.get(7).context("Failed to read story_points")?,
        start_date: row.get(8).context("Failed to read start_date")?,
        due_date: row.get(9).context("Failed to read due_date")?,
        sprint: row.get(10).context("Failed to read sprint")?,
        status: row.get(11).context("Failed to read status")?,
        created_at: row.get(12).context("Failed to read created_at")?,
        updated_at: row.get(13).context("Failed to read updated_at")?,
    };
    raw.into_issue()
}

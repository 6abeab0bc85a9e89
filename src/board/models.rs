use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::BoardError;

/// Workflow status of an issue. One board column per status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Backlog,
    Sprint,
    InProgress,
    Done,
    Released,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 5] = [
        Self::Backlog,
        Self::Sprint,
        Self::InProgress,
        Self::Done,
        Self::Released,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Sprint => "sprint",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Released => "released",
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlog" => Ok(Self::Backlog),
            "sprint" => Ok(Self::Sprint),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "released" => Ok(Self::Released),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// Issue classification. Stored and serialized with the same capitalized
/// spelling the UI displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    Story,
    Bug,
    Task,
    Spike,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Story => "Story",
            Self::Bug => "Bug",
            Self::Task => "Task",
            Self::Spike => "Spike",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Story" => Ok(Self::Story),
            "Bug" => Ok(Self::Bug),
            "Task" => Ok(Self::Task),
            "Spike" => Ok(Self::Spike),
            _ => Err(format!("Invalid issue type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "P0" => Ok(Self::P0),
            "P1" => Ok(Self::P1),
            "P2" => Ok(Self::P2),
            "P3" => Ok(Self::P3),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// A tracked work item. `id`, `issue_key`, and `created_at` are assigned by
/// the storage layer and never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub issue_key: String,
    pub summary: String,
    pub description: String,
    pub acceptance_criteria: String,
    pub issue_type: IssueType,
    pub priority: Priority,
    pub story_points: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub sprint: Option<String>,
    pub status: IssueStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Validated user-editable fields of an issue: everything a create or edit
/// may set. Status and key assignment stay outside; see the api module.
#[derive(Debug, Clone)]
pub struct IssueDraft {
    pub summary: String,
    pub description: String,
    pub acceptance_criteria: String,
    pub issue_type: IssueType,
    pub priority: Priority,
    pub story_points: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub sprint: Option<String>,
}

impl IssueDraft {
    /// Draft carrying every user field of an existing issue, used by
    /// duplication.
    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            summary: issue.summary.clone(),
            description: issue.description.clone(),
            acceptance_criteria: issue.acceptance_criteria.clone(),
            issue_type: issue.issue_type,
            priority: issue.priority,
            story_points: issue.story_points,
            start_date: issue.start_date,
            due_date: issue.due_date,
            sprint: issue.sprint.clone(),
        }
    }

    /// Trim text fields; an empty sprint label becomes None.
    pub fn normalize(mut self) -> Self {
        self.summary = self.summary.trim().to_string();
        self.description = self.description.trim().to_string();
        self.acceptance_criteria = self.acceptance_criteria.trim().to_string();
        self.sprint = self
            .sprint
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    /// Required-field and range validation. Runs before any remote write.
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.summary.trim().is_empty() {
            return Err(BoardError::MissingField { field: "summary" });
        }
        if self.description.trim().is_empty() {
            return Err(BoardError::MissingField { field: "description" });
        }
        if self.acceptance_criteria.trim().is_empty() {
            return Err(BoardError::MissingField {
                field: "acceptance_criteria",
            });
        }
        if let Some(points) = self.story_points {
            if !points.is_finite() || points < 0.0 {
                return Err(BoardError::InvalidValue {
                    field: "story_points",
                    message: "must be a non-negative number".to_string(),
                });
            }
        }
        Ok(())
    }
}

// ── Board views ───────────────────────────────────────────────────────

/// The two projections of the status enumeration onto columns. Both views
/// read the same issue list; they differ in which statuses are columns and
/// where the forward action leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardKind {
    Standard,
    Sprint,
}

impl BoardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Sprint => "sprint",
        }
    }

    /// Column order for this view.
    pub fn columns(&self) -> &'static [IssueStatus] {
        match self {
            Self::Standard => &[
                IssueStatus::Backlog,
                IssueStatus::Sprint,
                IssueStatus::InProgress,
                IssueStatus::Done,
            ],
            Self::Sprint => &[
                IssueStatus::Sprint,
                IssueStatus::InProgress,
                IssueStatus::Done,
                IssueStatus::Released,
            ],
        }
    }

    /// Target of the single forward action from a column of this view.
    /// The last column wraps ("recycle"). Returns None when the status is
    /// not a column of this view; the UI never offers that action.
    pub fn advance(&self, from: IssueStatus) -> Option<IssueStatus> {
        let columns = self.columns();
        let index = columns.iter().position(|s| *s == from)?;
        Some(columns[(index + 1) % columns.len()])
    }
}

impl std::fmt::Display for BoardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "sprint" => Ok(Self::Sprint),
            _ => Err(format!("Invalid board view: {}", s)),
        }
    }
}

/// One column of a rendered board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnView {
    pub status: IssueStatus,
    pub count: usize,
    pub issues: Vec<Issue>,
}

/// Per-status counts over the filtered issue set, plus the filtered total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardStats {
    pub total: usize,
    pub backlog: usize,
    pub sprint: usize,
    pub in_progress: usize,
    pub done: usize,
    pub released: usize,
}

/// A board view: the filtered issue list partitioned into this view's
/// columns, with counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    pub view: BoardKind,
    pub columns: Vec<ColumnView>,
    pub stats: BoardStats,
}

// ── Filtering and partitioning ────────────────────────────────────────

/// Case-insensitive substring filter on `summary`. An empty or
/// whitespace-only term returns the list unchanged.
pub fn filter_issues(issues: Vec<Issue>, term: &str) -> Vec<Issue> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return issues;
    }
    issues
        .into_iter()
        .filter(|issue| issue.summary.to_lowercase().contains(&term))
        .collect()
}

/// Filter, then partition into the view's columns. Each filtered issue
/// lands in exactly one column when its status is a column of the view;
/// issues in other statuses are counted in `stats` but not shown.
pub fn board_view(issues: Vec<Issue>, kind: BoardKind, search: &str) -> BoardView {
    let filtered = filter_issues(issues, search);

    let mut stats = BoardStats {
        total: filtered.len(),
        ..BoardStats::default()
    };
    for issue in &filtered {
        match issue.status {
            IssueStatus::Backlog => stats.backlog += 1,
            IssueStatus::Sprint => stats.sprint += 1,
            IssueStatus::InProgress => stats.in_progress += 1,
            IssueStatus::Done => stats.done += 1,
            IssueStatus::Released => stats.released += 1,
        }
    }

    let mut columns = Vec::new();
    for status in kind.columns() {
        let col_issues: Vec<Issue> = filtered
            .iter()
            .filter(|issue| issue.status == *status)
            .cloned()
            .collect();
        columns.push(ColumnView {
            status: *status,
            count: col_issues.len(),
            issues: col_issues,
        });
    }

    BoardView {
        view: kind,
        columns,
        stats,
    }
}

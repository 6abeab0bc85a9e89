//! Typed errors for the board subsystem.
//!
//! Every failure a handler can surface reduces to one of these variants;
//! the api module maps them onto HTTP statuses and a single-message JSON
//! envelope. Storage-level failures arrive wrapped in `Database`.

use thiserror::Error;

use crate::board::models::{BoardKind, IssueStatus};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Issue {id} not found")]
    IssueNotFound { id: i64 },

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error("Invalid status: {value}")]
    InvalidStatus { value: String },

    #[error("Invalid board view: {value}")]
    InvalidBoard { value: String },

    #[error("Status '{status}' is not a column on the '{board}' board")]
    NotOnBoard {
        status: IssueStatus,
        board: BoardKind,
    },

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_not_found_carries_id() {
        let err = BoardError::IssueNotFound { id: 42 };
        match &err {
            BoardError::IssueNotFound { id } => assert_eq!(*id, 42),
            _ => panic!("Expected IssueNotFound"),
        }
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn missing_field_names_the_field() {
        let err = BoardError::MissingField { field: "summary" };
        assert_eq!(err.to_string(), "Missing required field: summary");
    }

    #[test]
    fn not_on_board_names_status_and_view() {
        let err = BoardError::NotOnBoard {
            status: IssueStatus::Released,
            board: BoardKind::Standard,
        };
        let msg = err.to_string();
        assert!(msg.contains("released"));
        assert!(msg.contains("standard"));
    }

    #[test]
    fn database_preserves_source() {
        let err = BoardError::Database(anyhow::anyhow!("connection refused"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn variants_are_distinct() {
        let not_found = BoardError::IssueNotFound { id: 1 };
        let missing = BoardError::MissingField { field: "summary" };
        assert!(matches!(not_found, BoardError::IssueNotFound { .. }));
        assert!(!matches!(missing, BoardError::IssueNotFound { .. }));
    }

    #[test]
    fn implements_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&BoardError::IssueNotFound { id: 1 });
    }
}

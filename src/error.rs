use rusqlite::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

use crate::source::Store;

/// Errors that stop a run or a step.
///
/// Constraint violations and malformed identifiers never appear here: the
/// former are counted per row, the latter degrade to an opaque route id.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("cannot open {store} store at {path:?}")]
    Connectivity {
        store: Store,
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{store} store table `{table}` is missing columns: {}", missing.join(", "))]
    SourceSchema {
        store: Store,
        table: &'static str,
        missing: Vec<String>,
    },

    #[error("cannot prepare master schema table `{table}`")]
    TargetSchema {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("step `{step}` failed")]
    Step {
        step: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}

impl MigrateError {
    /// Connectivity-class errors abort the run before any step executes
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigrateError::Connectivity { .. }
                | MigrateError::SourceSchema { .. }
                | MigrateError::TargetSchema { .. }
        )
    }

    /// Attach the failing step's name to a bare SQLite error
    pub fn in_step(self, step: &'static str) -> Self {
        match self {
            MigrateError::Sql(source) => MigrateError::Step { step, source },
            other => other,
        }
    }
}

pub type Result<T, E = MigrateError> = std::result::Result<T, E>;

/// True for UNIQUE, NOT NULL, CHECK and FOREIGN KEY failures on a single statement
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_constraint_violation_detection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT UNIQUE NOT NULL)").unwrap();
        conn.execute("INSERT INTO t (k) VALUES ('a')", []).unwrap();

        let dup = conn.execute("INSERT INTO t (k) VALUES ('a')", []).unwrap_err();
        assert!(is_constraint_violation(&dup));

        let null = conn.execute("INSERT INTO t (k) VALUES (NULL)", []).unwrap_err();
        assert!(is_constraint_violation(&null));

        let missing = conn.execute("INSERT INTO nope (k) VALUES ('a')", []).unwrap_err();
        assert!(!is_constraint_violation(&missing));
    }
}

//! SQLite store for groups, sessions and committed transcript facts.
//!
//! The database lives at `~/.peerlog/peerlog.db` unless the config names
//! another file. Committed extraction rows are only ever written through
//! [`SessionDb::write_draft`](crate::persist::DraftWriter), in one transaction.

use std::path::PathBuf;

use rusqlite::{params, Connection, OptionalExtension};

use crate::types::Config;

pub mod extractions;
pub mod groups;
pub mod history;
pub mod sessions;
pub mod types;
pub use types::*;

pub struct SessionDb {
    conn: Connection,
}

impl SessionDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<DbError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(DbError::from)?;
        match f(self) {
            Ok(val) => {
                if let Err(e) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(DbError::from(e).into());
                }
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database the config points at and apply the schema.
    pub fn open(config: &Config) -> Result<Self, DbError> {
        let path = crate::state::database_path(config)
            .map_err(|_| DbError::HomeDirNotFound)?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        // Set after migrations so a future table rebuild can switch it off
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        log::debug!("Opened session database at {}", path.display());
        Ok(Self { conn })
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::draft::fixtures::sample_draft;
    use crate::draft::{Draft, Resolution, ResolutionSource};
    use crate::persist::{CommitPolicy, CommitReport, CommitScope, DraftWriter};

    /// Create a temporary database for testing.
    ///
    /// The `TempDir` is leaked so the directory outlives the handle. Foreign
    /// keys stay enforced.
    pub fn test_db() -> SessionDb {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        std::mem::forget(dir);
        SessionDb::open_at(path).expect("Failed to open test database")
    }

    pub struct Seeded {
        pub group_id: i64,
        pub session_id: i64,
        /// Member ids in roster order: Jamie Lin, Pat Osei, Sam Reyes.
        pub members: Vec<i64>,
    }

    /// One group with three active members and one empty session.
    pub fn seed_group(db: &SessionDb) -> Seeded {
        let program_id = db.create_program("Spring Cohort").unwrap();
        let group_id = db.create_group(Some(program_id), "Tuesday Circle").unwrap();
        let mut members = Vec::new();
        for (name, role) in [
            ("Jamie Lin", MemberRole::Facilitator),
            ("Pat Osei", MemberRole::Participant),
            ("Sam Reyes", MemberRole::Participant),
        ] {
            let id = db.create_member(name, None).unwrap();
            db.assign_member(group_id, id, role).unwrap();
            members.push(id);
        }
        let session_id = db.create_session(group_id, Some("2026-03-03")).unwrap();
        Seeded {
            group_id,
            session_id,
            members,
        }
    }

    /// The sample draft with every reference settled by hand: names starting
    /// with "Pat" are Pat Osei, everyone else Jamie Lin.
    pub fn settled_sample_draft(seeded: &Seeded) -> Draft {
        let mut draft = sample_draft();
        draft.for_each_ref_mut(|_, name_ref| {
            let member_id = if name_ref.raw_name.starts_with("Pat") {
                seeded.members[1]
            } else {
                seeded.members[0]
            };
            name_ref.resolution = Some(Resolution {
                member_id: Some(member_id),
                member_name: None,
                confidence_percent: 100,
                needs_review: false,
                source: ResolutionSource::Manual,
            });
        });
        draft
    }

    /// Commit the settled sample draft into the seeded session.
    pub fn commit_settled_sample(db: &SessionDb, seeded: &Seeded) -> CommitReport {
        db.write_draft(
            seeded.session_id,
            None,
            &settled_sample_draft(seeded),
            &CommitScope::all(CommitPolicy::Strict),
        )
        .expect("sample commit")
    }
}

use super::*;

impl SessionDb {
    // =========================================================================
    // Sessions and extraction runs
    // =========================================================================

    /// Create the next numbered session for a group.
    pub fn create_session(&self, group_id: i64, session_date: Option<&str>) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO sessions (group_id, session_number, session_date)
             SELECT ?1, COALESCE(MAX(session_number), 0) + 1, ?2
             FROM sessions WHERE group_id = ?1",
            params![group_id, session_date],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_session(&self, session_id: i64) -> Result<Option<DbSession>, DbError> {
        let session = self
            .conn
            .query_row(
                "SELECT id, group_id, session_number, session_date, transcript_sha256,
                        extractions_committed_at, created_at
                 FROM sessions WHERE id = ?1",
                params![session_id],
                |row| {
                    Ok(DbSession {
                        id: row.get(0)?,
                        group_id: row.get(1)?,
                        session_number: row.get(2)?,
                        session_date: row.get(3)?,
                        transcript_sha256: row.get(4)?,
                        extractions_committed_at: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    /// Store the raw transcript alongside its hash. Returns false for an unknown session.
    pub fn save_transcript(&self, session_id: i64, transcript: &str, sha256: &str) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE sessions SET transcript = ?2, transcript_sha256 = ?3 WHERE id = ?1",
            params![session_id, transcript, sha256],
        )?;
        Ok(changed > 0)
    }

    pub fn get_transcript(&self, session_id: i64) -> Result<Option<String>, DbError> {
        let transcript: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT transcript FROM sessions WHERE id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(transcript.flatten())
    }

    pub fn is_committed(&self, session_id: i64) -> Result<bool, DbError> {
        let committed: Option<bool> = self
            .conn
            .query_row(
                "SELECT extractions_committed_at IS NOT NULL FROM sessions WHERE id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(committed.unwrap_or(false))
    }

    pub fn insert_extraction_run(&self, run: &DbExtractionRun) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO extraction_runs (
                id, session_id, transcript_sha256, category_status,
                roster_size, unresolved_count, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.id,
                run.session_id,
                run.transcript_sha256,
                serde_json::to_string(&run.category_status)?,
                run.roster_size,
                run.unresolved_count,
                run.created_at,
            ],
        )?;
        Ok(())
    }

    /// Runs for a session, most recent first.
    pub fn get_extraction_runs(&self, session_id: i64) -> Result<Vec<DbExtractionRun>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, transcript_sha256, category_status,
                    roster_size, unresolved_count, created_at
             FROM extraction_runs
             WHERE session_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            Ok((
                DbExtractionRun {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    transcript_sha256: row.get(2)?,
                    category_status: serde_json::Value::Null,
                    roster_size: row.get(4)?,
                    unresolved_count: row.get(5)?,
                    created_at: row.get(6)?,
                },
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut runs = Vec::new();
        for row in rows {
            let (mut run, status_json) = row?;
            run.category_status = serde_json::from_str(&status_json)?;
            runs.push(run);
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{seed_group, test_db};
    use chrono::Utc;

    #[test]
    fn test_sessions_numbered_per_group() {
        let db = test_db();
        let seeded = seed_group(&db);
        let second = db.create_session(seeded.group_id, None).unwrap();
        let other_group = db.create_group(None, "Thursday Circle").unwrap();
        let first_elsewhere = db.create_session(other_group, None).unwrap();

        assert_eq!(db.get_session(seeded.session_id).unwrap().unwrap().session_number, 1);
        assert_eq!(db.get_session(second).unwrap().unwrap().session_number, 2);
        assert_eq!(db.get_session(first_elsewhere).unwrap().unwrap().session_number, 1);
    }

    #[test]
    fn test_session_for_unknown_group_rejected() {
        let db = test_db();
        assert!(db.create_session(999, None).is_err());
        assert!(db.get_session(999).unwrap().is_none());
    }

    #[test]
    fn test_save_transcript() {
        let db = test_db();
        let seeded = seed_group(&db);
        assert!(db
            .save_transcript(seeded.session_id, "Jamie: hello", "abc")
            .unwrap());
        assert!(!db.save_transcript(999, "x", "y").unwrap());

        let session = db.get_session(seeded.session_id).unwrap().unwrap();
        assert_eq!(session.transcript_sha256.as_deref(), Some("abc"));
        assert!(!session.is_committed());
        assert_eq!(
            db.get_transcript(seeded.session_id).unwrap().as_deref(),
            Some("Jamie: hello")
        );
    }

    #[test]
    fn test_extraction_runs_round_trip() {
        let db = test_db();
        let seeded = seed_group(&db);
        let run = DbExtractionRun {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: seeded.session_id,
            transcript_sha256: "abc".to_string(),
            category_status: serde_json::json!({"attendance": "ok", "sentiment": "timeout"}),
            roster_size: 3,
            unresolved_count: 2,
            created_at: Utc::now().to_rfc3339(),
        };
        db.insert_extraction_run(&run).unwrap();

        let runs = db.get_extraction_runs(seeded.session_id).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, run.id);
        assert_eq!(runs[0].category_status["sentiment"], "timeout");
        assert_eq!(runs[0].unresolved_count, 2);
    }
}

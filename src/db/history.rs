use super::*;

use rusqlite::Row;

/// Session columns selected as `s.id, s.session_number, s.session_date`
/// starting at `at`.
fn session_ref(row: &Row<'_>, at: usize) -> rusqlite::Result<DbSessionRef> {
    Ok(DbSessionRef {
        session_id: row.get(at)?,
        session_number: row.get(at + 1)?,
        session_date: row.get(at + 2)?,
    })
}

impl SessionDb {
    // =========================================================================
    // Member history and group read-side
    // =========================================================================

    /// Most recent committed goals of a member, across all groups.
    pub fn get_member_goals(&self, member_id: i64, limit: usize) -> Result<Vec<DbGoal>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT g.id, g.member_id, g.goal_text, g.is_vague, g.is_completed,
                    g.completed_at, g.extracted_name, g.created_at,
                    s.id, s.session_number, s.session_date
             FROM goals g
             INNER JOIN sessions s ON s.id = g.session_id
             WHERE g.member_id = ?1
             ORDER BY g.created_at DESC, g.id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![member_id, limit as i64], |row| {
            Ok(DbGoal {
                id: row.get(0)?,
                member_id: row.get(1)?,
                goal_text: row.get(2)?,
                is_vague: row.get::<_, i32>(3)? != 0,
                is_completed: row.get::<_, i32>(4)? != 0,
                completed_at: row.get(5)?,
                extracted_name: row.get(6)?,
                created_at: row.get(7)?,
                session: session_ref(row, 8)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Mark a goal done or not done. Returns false if there is no such goal.
    pub fn update_goal_completion(&self, goal_id: i64, is_completed: bool) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE goals
             SET is_completed = ?2,
                 completed_at = CASE WHEN ?2 = 1 THEN datetime('now') ELSE NULL END
             WHERE id = ?1",
            params![goal_id, is_completed as i32],
        )?;
        Ok(changed > 0)
    }

    fn strategies_for_challenge(&self, challenge_id: i64) -> Result<Vec<DbStrategy>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT challenge_id, summary, tag, suggested_by, suggested_by_name
             FROM challenge_strategies
             WHERE challenge_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![challenge_id], |row| {
            Ok(DbStrategy {
                challenge_id: row.get(0)?,
                summary: row.get(1)?,
                tag: row.get(2)?,
                suggested_by: row.get(3)?,
                suggested_by_name: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Most recent committed challenges of a member, each with its strategies.
    pub fn get_member_challenges(
        &self,
        member_id: i64,
        limit: usize,
    ) -> Result<Vec<DbChallenge>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.description, c.category, c.created_at,
                    s.id, s.session_number, s.session_date
             FROM challenges c
             INNER JOIN sessions s ON s.id = c.session_id
             WHERE c.member_id = ?1
             ORDER BY c.created_at DESC, c.id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![member_id, limit as i64], |row| {
            Ok(DbChallenge {
                id: row.get(0)?,
                description: row.get(1)?,
                category: row.get(2)?,
                created_at: row.get(3)?,
                session: session_ref(row, 4)?,
                strategies: Vec::new(),
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        for challenge in &mut out {
            challenge.strategies = self.strategies_for_challenge(challenge.id)?;
        }
        Ok(out)
    }

    pub fn get_member_stucks(&self, member_id: i64, limit: usize) -> Result<Vec<DbStuck>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.classification, m.summary, m.exact_quotes, m.next_step, m.created_at,
                    s.id, s.session_number, s.session_date
             FROM member_stucks m
             INNER JOIN sessions s ON s.id = m.session_id
             WHERE m.member_id = ?1
             ORDER BY m.created_at DESC, m.id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![member_id, limit as i64], |row| {
            Ok((
                row.get::<_, String>(3)?,
                DbStuck {
                    id: row.get(0)?,
                    classification: row.get(1)?,
                    summary: row.get(2)?,
                    exact_quotes: Vec::new(),
                    next_step: row.get(4)?,
                    created_at: row.get(5)?,
                    session: session_ref(row, 6)?,
                },
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (quotes, mut stuck) = row?;
            stuck.exact_quotes = serde_json::from_str(&quotes)?;
            out.push(stuck);
        }
        Ok(out)
    }

    /// Most recent committed marketing activities of a member with outcomes.
    pub fn get_member_marketing(
        &self,
        member_id: i64,
        limit: usize,
    ) -> Result<Vec<DbMarketingActivity>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.stage, a.activity_type, a.quantity, a.is_win,
                    a.contract_type, a.revenue, a.created_at,
                    s.id, s.session_number, s.session_date,
                    o.id, o.meetings, o.proposals, o.clients, o.notes
             FROM marketing_activities a
             INNER JOIN sessions s ON s.id = a.session_id
             LEFT JOIN marketing_outcomes o ON o.activity_id = a.id
             WHERE a.member_id = ?1
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![member_id, limit as i64], |row| {
            let outcome = match row.get::<_, Option<i64>>(11)? {
                Some(_) => Some(DbMarketingOutcome {
                    meetings: row.get(12)?,
                    proposals: row.get(13)?,
                    clients: row.get(14)?,
                    notes: row.get(15)?,
                }),
                None => None,
            };
            Ok(DbMarketingActivity {
                id: row.get(0)?,
                stage: row.get(1)?,
                activity_type: row.get(2)?,
                quantity: row.get(3)?,
                is_win: row.get::<_, i32>(4)? != 0,
                contract_type: row.get(5)?,
                revenue: row.get(6)?,
                created_at: row.get(7)?,
                session: session_ref(row, 8)?,
                outcome,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Latest sessions of a group, newest first, each with its committed
    /// sentiment when there is one.
    pub fn get_group_sentiments(
        &self,
        group_id: i64,
        limit: usize,
    ) -> Result<Vec<DbSessionSentiment>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.session_number, s.session_date,
                    ss.id, ss.score, ss.rationale, ss.dominant_emotion, ss.confidence,
                    (SELECT COUNT(*) FROM session_sentiment_statements st
                     WHERE st.sentiment_id = ss.id)
             FROM sessions s
             LEFT JOIN session_sentiment ss ON ss.session_id = s.id
             WHERE s.group_id = ?1
             ORDER BY s.session_date DESC, s.session_number DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![group_id, limit as i64], |row| {
            let sentiment = match row.get::<_, Option<i64>>(3)? {
                Some(_) => Some(DbSentiment {
                    score: row.get(4)?,
                    rationale: row.get(5)?,
                    dominant_emotion: row.get(6)?,
                    confidence: row.get(7)?,
                    statement_count: row.get(8)?,
                }),
                None => None,
            };
            Ok(DbSessionSentiment {
                session: session_ref(row, 0)?,
                sentiment,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Attendance statuses recorded for a member in one group's sessions.
    pub fn member_attendance_in_group(
        &self,
        member_id: i64,
        group_id: i64,
    ) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.status
             FROM session_attendance a
             INNER JOIN sessions s ON s.id = a.session_id
             WHERE a.member_id = ?1 AND s.group_id = ?2
             ORDER BY s.session_number",
        )?;
        let rows = stmt.query_map(params![member_id, group_id], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn count_group_sessions(&self, group_id: i64) -> Result<i64, DbError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE group_id = ?1",
            params![group_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

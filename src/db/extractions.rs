use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;

use super::*;

use crate::draft::{Category, Draft};
use crate::error::PipelineError;
use crate::persist::{CommitPlan, CommitReport, CommitScope, DraftWriter};

impl SessionDb {
    // =========================================================================
    // Committed extractions
    // =========================================================================

    /// Insert every planned row. Returns rows written per table.
    ///
    /// Must run inside a transaction; a failure part-way leaves rows behind
    /// until the caller rolls back.
    fn insert_plan(
        &self,
        session_id: i64,
        plan: &CommitPlan<'_>,
    ) -> Result<BTreeMap<String, usize>, DbError> {
        let mut rows: BTreeMap<String, usize> = BTreeMap::new();
        let mut bump = |table: &str| *rows.entry(table.to_string()).or_default() += 1;

        for row in &plan.attendance {
            let record = row.item;
            self.conn.execute(
                "INSERT INTO session_attendance (
                    session_id, member_id, status, notes, extracted_name, confidence
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(session_id, member_id) DO UPDATE SET
                    status = excluded.status,
                    notes = excluded.notes,
                    extracted_name = excluded.extracted_name,
                    confidence = excluded.confidence",
                params![
                    session_id,
                    row.member_id,
                    record.status.as_str(),
                    record.notes,
                    record.extracted_name.raw_name,
                    record.extracted_name.confidence_percent(),
                ],
            )?;
            bump("session_attendance");
        }

        for row in &plan.goals {
            let goal = row.item;
            self.conn.execute(
                "INSERT INTO goals (session_id, member_id, goal_text, is_vague, extracted_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    session_id,
                    row.member_id,
                    goal.goal_text,
                    goal.is_vague as i32,
                    goal.owner.raw_name,
                ],
            )?;
            bump("goals");
        }

        for row in &plan.challenges {
            let group = row.item;
            for challenge in &group.challenges {
                self.conn.execute(
                    "INSERT INTO challenges (
                        session_id, member_id, description, category, extracted_name
                     ) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        session_id,
                        row.member_id,
                        challenge.description,
                        challenge.category,
                        group.owner.raw_name,
                    ],
                )?;
                let challenge_id = self.conn.last_insert_rowid();
                bump("challenges");

                for strategy in &challenge.strategies {
                    let suggester = strategy.suggested_by.as_ref();
                    self.conn.execute(
                        "INSERT INTO challenge_strategies (
                            challenge_id, summary, tag, suggested_by, suggested_by_name
                         ) VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            challenge_id,
                            strategy.summary,
                            strategy.tag.map(|t| t.as_str()),
                            suggester.and_then(|s| s.resolved_member()),
                            suggester.map(|s| s.raw_name.as_str()),
                        ],
                    )?;
                    bump("challenge_strategies");
                }
            }
        }

        for row in &plan.marketing {
            let group = row.item;
            for activity in &group.activities {
                self.conn.execute(
                    "INSERT INTO marketing_activities (
                        session_id, member_id, stage, activity_type, quantity,
                        is_win, contract_type, revenue, extracted_name
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        session_id,
                        row.member_id,
                        activity.stage.as_str(),
                        activity.activity_type.as_str(),
                        activity.quantity,
                        activity.is_win as i32,
                        activity.contract_type.map(|c| c.as_str()),
                        activity.revenue,
                        group.owner.raw_name,
                    ],
                )?;
                let activity_id = self.conn.last_insert_rowid();
                bump("marketing_activities");

                if let Some(ref outcome) = activity.outcome {
                    self.conn.execute(
                        "INSERT INTO marketing_outcomes (activity_id, meetings, proposals, clients, notes)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            activity_id,
                            outcome.meetings,
                            outcome.proposals,
                            outcome.clients,
                            outcome.notes,
                        ],
                    )?;
                    bump("marketing_outcomes");
                }
            }
        }

        for row in &plan.stucks {
            let stuck = row.item;
            self.conn.execute(
                "INSERT INTO member_stucks (
                    session_id, member_id, classification, summary,
                    exact_quotes, next_step, extracted_name
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    session_id,
                    row.member_id,
                    stuck.classification,
                    stuck.summary,
                    serde_json::to_string(&stuck.exact_quotes)?,
                    stuck.next_step,
                    stuck.owner.raw_name,
                ],
            )?;
            bump("member_stucks");
        }

        let sentiment_id = match plan.sentiment {
            Some(sentiment) => {
                self.conn.execute(
                    "INSERT INTO session_sentiment (
                        session_id, score, rationale, dominant_emotion, confidence
                     ) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        session_id,
                        sentiment.score,
                        sentiment.rationale,
                        sentiment.dominant_emotion,
                        sentiment.confidence,
                    ],
                )?;
                bump("session_sentiment");
                Some(self.conn.last_insert_rowid())
            }
            // Statements settled after the session row went in an earlier commit
            None if !plan.statements.is_empty() => Some(self.conn.query_row(
                "SELECT id FROM session_sentiment WHERE session_id = ?1",
                params![session_id],
                |row| row.get::<_, i64>(0),
            )?),
            None => None,
        };

        if let Some(sentiment_id) = sentiment_id {
            for row in &plan.statements {
                let statement = row.item;
                self.conn.execute(
                    "INSERT INTO session_sentiment_statements (
                        sentiment_id, member_id, emotions, exact_quotes,
                        is_negative, extracted_name
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        sentiment_id,
                        row.member_id,
                        serde_json::to_string(&statement.emotions)?,
                        serde_json::to_string(&statement.exact_quotes)?,
                        statement.is_negative as i32,
                        statement.owner.raw_name,
                    ],
                )?;
                bump("session_sentiment_statements");
            }
        }

        Ok(rows)
    }

    /// Items already written for a session, from any extraction run.
    pub fn committed_items(&self, session_id: i64) -> Result<Vec<DbCommittedItem>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT item_path, category, run_id, committed_at
             FROM committed_items
             WHERE session_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok(DbCommittedItem {
                item_path: row.get(0)?,
                category: row.get(1)?,
                run_id: row.get(2)?,
                committed_at: row.get(3)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn record_committed_items(
        &self,
        session_id: i64,
        run_id: &str,
        keys: &[(String, Category)],
        committed_at: &str,
    ) -> Result<(), DbError> {
        for (item_path, category) in keys {
            self.conn.execute(
                "INSERT INTO committed_items (session_id, item_path, category, run_id, committed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![session_id, item_path, category.as_str(), run_id, committed_at],
            )?;
        }
        Ok(())
    }

    /// Split the ledger into keys written by `run_id` and categories that
    /// another run has written to.
    fn ledger_for_run(
        &self,
        session_id: i64,
        run_id: &str,
    ) -> Result<(BTreeSet<String>, BTreeSet<Category>), DbError> {
        let mut written = BTreeSet::new();
        let mut locked = BTreeSet::new();
        for item in self.committed_items(session_id)? {
            if item.run_id == run_id {
                written.insert(item.item_path);
                continue;
            }
            match item.category.parse::<Category>() {
                Ok(category) => {
                    locked.insert(category);
                }
                Err(e) => log::warn!("Ignoring ledger row for session {}: {}", session_id, e),
            }
        }
        Ok((written, locked))
    }

    pub fn committed_attendance(&self, session_id: i64) -> Result<Vec<DbAttendance>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT member_id, status, notes, extracted_name, confidence
             FROM session_attendance
             WHERE session_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok(DbAttendance {
                member_id: row.get(0)?,
                status: row.get(1)?,
                notes: row.get(2)?,
                extracted_name: row.get(3)?,
                confidence: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn committed_strategies(&self, session_id: i64) -> Result<Vec<DbStrategy>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT cs.challenge_id, cs.summary, cs.tag, cs.suggested_by, cs.suggested_by_name
             FROM challenge_strategies cs
             INNER JOIN challenges c ON c.id = cs.challenge_id
             WHERE c.session_id = ?1
             ORDER BY cs.id",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
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

    pub fn committed_sentiment(&self, session_id: i64) -> Result<Option<DbSentiment>, DbError> {
        let sentiment = self
            .conn
            .query_row(
                "SELECT s.score, s.rationale, s.dominant_emotion, s.confidence,
                        (SELECT COUNT(*) FROM session_sentiment_statements st
                         WHERE st.sentiment_id = s.id)
                 FROM session_sentiment s
                 WHERE s.session_id = ?1",
                params![session_id],
                |row| {
                    Ok(DbSentiment {
                        score: row.get(0)?,
                        rationale: row.get(1)?,
                        dominant_emotion: row.get(2)?,
                        confidence: row.get(3)?,
                        statement_count: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(sentiment)
    }

    /// Quotes stored for a member's stuck detections in a session.
    pub fn committed_stuck_quotes(
        &self,
        session_id: i64,
        member_id: i64,
    ) -> Result<Vec<Vec<String>>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT exact_quotes FROM member_stucks
             WHERE session_id = ?1 AND member_id = ?2
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session_id, member_id], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }
}

impl DraftWriter for SessionDb {
    fn write_draft(
        &self,
        session_id: i64,
        run_id: Option<&str>,
        draft: &Draft,
        scope: &CommitScope,
    ) -> Result<CommitReport, PipelineError> {
        let run_id = run_id.unwrap_or_default();
        let committed_at = Utc::now();

        let result = self.with_transaction(|db| -> Result<_, PipelineError> {
            if db.get_session(session_id)?.is_none() {
                return Err(PipelineError::FatalPrecondition(format!(
                    "Session {} not found",
                    session_id
                )));
            }

            let (written, locked) = db.ledger_for_run(session_id, run_id)?;
            let mut plan = CommitPlan::build(draft, scope);
            plan.exclude_committed(&written, &locked);
            if plan.is_empty() && plan.rejected.is_empty() && !plan.already_committed.is_empty() {
                return Err(PipelineError::AlreadyCommitted(session_id));
            }

            let rows = db.insert_plan(session_id, &plan)?;

            let keys = plan.item_keys();
            if !keys.is_empty() {
                let stamp = committed_at.to_rfc3339();
                db.record_committed_items(session_id, run_id, &keys, &stamp)?;
                db.conn
                    .execute(
                        "UPDATE sessions SET extractions_committed_at = ?2 WHERE id = ?1",
                        params![session_id, stamp],
                    )
                    .map_err(DbError::from)?;
            }
            Ok((plan, rows))
        });

        match result {
            Ok((plan, rows_by_table)) => {
                let report = CommitReport {
                    session_id,
                    committed_at,
                    written: plan.written_counts(scope),
                    rows_by_table,
                    rejected: plan.rejected,
                    skipped: plan.skipped,
                    already_committed: plan.already_committed,
                };
                log::info!(
                    "Committed session {}: {} item(s) written, {} rejected, {} already stored, {} category(ies) skipped",
                    session_id,
                    report.total_written(),
                    report.rejected.len(),
                    report.already_committed.len(),
                    report.skipped.len()
                );
                Ok(report)
            }
            Err(e) => {
                log::warn!("Commit of session {} rolled back: {}", session_id, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{
        commit_settled_sample, seed_group, settled_sample_draft, test_db, Seeded,
    };
    use crate::draft::fixtures::sample_draft;
    use crate::draft::RefPath;
    use crate::orchestrator::ExtractionPass;
    use crate::persist::CommitPolicy;
    use crate::reconcile::Reconciler;
    use crate::review::{ReviewSession, ReviewState};
    use crate::roster::RosterSource;

    fn table_count(db: &SessionDb, table: &str) -> i64 {
        db.conn_ref()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    /// A reconciled review over the sample draft with every reference settled.
    fn settled_review(db: &SessionDb, seeded: &Seeded) -> ReviewSession {
        let roster = db.build_roster(seeded.group_id).unwrap();
        let mut review = ReviewSession::new(
            seeded.session_id,
            ExtractionPass {
                roster,
                draft: sample_draft(),
            },
        );
        review.reconcile(&Reconciler::default()).unwrap();
        for path in review.draft.unresolved() {
            let raw = review.draft.get_ref(&path).unwrap().raw_name.clone();
            let member = if raw.starts_with("Pat") {
                seeded.members[1]
            } else {
                seeded.members[0]
            };
            review.apply_correction(&path, member).unwrap();
        }
        assert_eq!(review.state(), ReviewState::Ready);
        review
    }

    #[test]
    fn test_strict_commit_writes_every_category() {
        let db = test_db();
        let seeded = seed_group(&db);
        let mut review = settled_review(&db, &seeded);

        let report = review
            .commit(&db, &CommitScope::all(CommitPolicy::Strict))
            .unwrap()
            .clone();

        assert_eq!(report.written[&Category::Attendance], 2);
        assert_eq!(report.rows_by_table["challenge_strategies"], 2);
        assert_eq!(report.rows_by_table["marketing_outcomes"], 1);
        assert!(report.rejected.is_empty());

        let attendance = db.committed_attendance(seeded.session_id).unwrap();
        assert_eq!(attendance.len(), 2);
        assert_eq!(attendance[1].status, "travelling");
        assert_eq!(attendance[1].member_id, seeded.members[1]);

        let sentiment = db.committed_sentiment(seeded.session_id).unwrap().unwrap();
        assert_eq!(sentiment.score, 4);
        assert_eq!(sentiment.statement_count, 1);

        let quotes = db
            .committed_stuck_quotes(seeded.session_id, seeded.members[1])
            .unwrap();
        assert_eq!(quotes, vec![vec!["I haven't done anything for two weeks".to_string()]]);

        assert!(db.is_committed(seeded.session_id).unwrap());
    }

    #[test]
    fn test_failed_insert_rolls_back_everything() {
        let db = test_db();
        let seeded = seed_group(&db);
        let mut review = settled_review(&db, &seeded);

        // Marketing outcomes are written after attendance, goals and challenges
        db.conn_ref()
            .execute_batch("DROP TABLE marketing_outcomes;")
            .unwrap();

        let err = review
            .commit(&db, &CommitScope::all(CommitPolicy::Strict))
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(review.state(), ReviewState::Ready);

        assert_eq!(table_count(&db, "session_attendance"), 0);
        assert_eq!(table_count(&db, "goals"), 0);
        assert_eq!(table_count(&db, "challenges"), 0);
        assert_eq!(table_count(&db, "committed_items"), 0);
        assert!(!db.is_committed(seeded.session_id).unwrap());
    }

    #[test]
    fn test_second_commit_refused_by_store() {
        let db = test_db();
        let seeded = seed_group(&db);

        let mut first = settled_review(&db, &seeded);
        first
            .commit(&db, &CommitScope::all(CommitPolicy::Partial))
            .unwrap();
        let goals_after_first = table_count(&db, "goals");
        let ledger_after_first = table_count(&db, "committed_items");

        // A second, independent review of the same session
        let mut second = settled_review(&db, &seeded);
        let err = second
            .commit(&db, &CommitScope::all(CommitPolicy::Partial))
            .unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyCommitted(id) if id == seeded.session_id));
        assert_eq!(table_count(&db, "goals"), goals_after_first);
        assert_eq!(table_count(&db, "committed_items"), ledger_after_first);
        assert_eq!(second.state(), ReviewState::Ready);
    }

    #[test]
    fn test_follow_up_commit_writes_corrected_rows_only() {
        let db = test_db();
        let seeded = seed_group(&db);
        let roster = db.build_roster(seeded.group_id).unwrap();
        let mut review = ReviewSession::new(
            seeded.session_id,
            ExtractionPass {
                roster,
                draft: sample_draft(),
            },
        );
        review.reconcile(&Reconciler::default()).unwrap();

        let first = review
            .commit(&db, &CommitScope::all(CommitPolicy::Partial))
            .unwrap()
            .clone();
        let rejected: Vec<String> = first.rejected.iter().map(|r| r.item_path.to_string()).collect();
        assert_eq!(rejected, vec!["goals[0].owner", "stuck_detections[0].owner"]);
        assert_eq!(table_count(&db, "goals"), 0);
        assert_eq!(table_count(&db, "session_attendance"), 2);
        assert_eq!(table_count(&db, "challenges"), 1);
        assert!(db.is_committed(seeded.session_id).unwrap());
        assert_ne!(review.state(), ReviewState::Committed);

        // Follow-up pass: settle the goal owner and commit goals only
        review
            .apply_correction(&RefPath::GoalOwner { index: 0 }, seeded.members[0])
            .unwrap();
        let follow_up = review
            .commit(&db, &CommitScope::only([Category::Goals], CommitPolicy::Strict))
            .unwrap()
            .clone();
        assert_eq!(follow_up.written[&Category::Goals], 1);
        assert_eq!(table_count(&db, "goals"), 1);
        assert_eq!(table_count(&db, "session_attendance"), 2);
        assert_eq!(table_count(&db, "challenges"), 1);

        // A partial commit of everything now adds only the stuck detection
        review
            .apply_correction(&RefPath::StuckOwner { index: 0 }, seeded.members[1])
            .unwrap();
        let last = review
            .commit(&db, &CommitScope::all(CommitPolicy::Partial))
            .unwrap()
            .clone();
        assert_eq!(last.total_written(), 1);
        assert_eq!(last.written[&Category::Stucks], 1);
        assert!(last.already_committed.contains(&"goals[0].owner".to_string()));
        assert_eq!(table_count(&db, "goals"), 1);
        assert_eq!(table_count(&db, "member_stucks"), 1);
        assert_eq!(table_count(&db, "challenges"), 1);
        assert_eq!(table_count(&db, "session_sentiment"), 1);
        assert_eq!(review.state(), ReviewState::Committed);
    }

    #[test]
    fn test_statement_settled_later_joins_stored_sentiment() {
        let db = test_db();
        let seeded = seed_group(&db);
        let mut draft = settled_sample_draft(&seeded);
        let statement = RefPath::StatementOwner { index: 0 };
        let saved = draft.get_ref(&statement).unwrap().resolution.clone();
        draft.get_ref_mut(&statement).unwrap().resolution = None;

        let scope = CommitScope::only([Category::Sentiment], CommitPolicy::Partial);
        let first = db.write_draft(seeded.session_id, None, &draft, &scope).unwrap();
        assert_eq!(first.rejected.len(), 1);
        assert_eq!(
            db.committed_sentiment(seeded.session_id).unwrap().unwrap().statement_count,
            0
        );

        draft.get_ref_mut(&statement).unwrap().resolution = saved;
        let second = db.write_draft(seeded.session_id, None, &draft, &scope).unwrap();
        assert_eq!(second.rows_by_table["session_sentiment_statements"], 1);
        assert!(!second.rows_by_table.contains_key("session_sentiment"));
        assert_eq!(table_count(&db, "session_sentiment"), 1);
        assert_eq!(
            db.committed_sentiment(seeded.session_id).unwrap().unwrap().statement_count,
            1
        );
    }

    #[test]
    fn test_other_run_leaves_committed_categories_alone() {
        let db = test_db();
        let seeded = seed_group(&db);
        let draft = settled_sample_draft(&seeded);

        let attendance_only = CommitScope::only([Category::Attendance], CommitPolicy::Strict);
        db.write_draft(seeded.session_id, Some("run-a"), &draft, &attendance_only)
            .unwrap();

        // A re-extraction commits the rest; its attendance indices may not
        // line up with run-a, so attendance stays as stored
        let report = db
            .write_draft(
                seeded.session_id,
                Some("run-b"),
                &draft,
                &CommitScope::all(CommitPolicy::Strict),
            )
            .unwrap();
        assert_eq!(report.written[&Category::Attendance], 0);
        assert_eq!(report.written[&Category::Goals], 1);
        assert_eq!(report.already_committed.len(), 2);
        assert_eq!(table_count(&db, "session_attendance"), 2);

        let ledger = db.committed_items(seeded.session_id).unwrap();
        assert_eq!(ledger.len(), 8);
        assert_eq!(ledger[0].run_id, "run-a");
        assert_eq!(ledger[0].category, "attendance");
        assert!(ledger[2..].iter().all(|item| item.run_id == "run-b"));
    }

    #[test]
    fn test_challenge_and_marketing_keep_extracted_name() {
        let db = test_db();
        let seeded = seed_group(&db);
        commit_settled_sample(&db, &seeded);

        let (challenge_name, marketing_name): (Option<String>, Option<String>) = db
            .conn_ref()
            .query_row(
                "SELECT (SELECT extracted_name FROM challenges),
                        (SELECT extracted_name FROM marketing_activities)",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(challenge_name.as_deref(), Some("Pat Osei"));
        assert_eq!(marketing_name.as_deref(), Some("Jamie Lin"));
    }

    #[test]
    fn test_partial_commit_keeps_strategy_without_suggester() {
        let db = test_db();
        let seeded = seed_group(&db);
        let roster = db.build_roster(seeded.group_id).unwrap();
        let mut review = ReviewSession::new(
            seeded.session_id,
            ExtractionPass {
                roster,
                draft: sample_draft(),
            },
        );
        review.reconcile(&Reconciler::default()).unwrap();
        review
            .apply_correction(&RefPath::ChallengeOwner { group: 0 }, seeded.members[1])
            .unwrap();

        let suggester = RefPath::StrategySuggestedBy {
            group: 0,
            challenge: 0,
            strategy: 0,
        };
        // Leave the suggester flagged, whatever the reconciler decided
        if let Some(name_ref) = review.draft.get_ref_mut(&suggester) {
            if let Some(ref mut resolution) = name_ref.resolution {
                resolution.needs_review = true;
            }
        }

        let scope = CommitScope::only([Category::Challenges], CommitPolicy::Partial);
        let report = review.commit(&db, &scope).unwrap();
        assert!(report.rejected.is_empty());

        let strategies = db.committed_strategies(seeded.session_id).unwrap();
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].suggested_by, None);
        assert_eq!(strategies[0].suggested_by_name.as_deref(), Some("Jamie Lin"));
        assert_eq!(strategies[0].tag.as_deref(), Some("tactical_process"));
        assert_eq!(strategies[1].suggested_by_name, None);
    }

    #[test]
    fn test_unknown_session_is_fatal() {
        let db = test_db();
        let err = db
            .write_draft(4242, None, &sample_draft(), &CommitScope::all(CommitPolicy::Partial))
            .unwrap_err();
        assert!(matches!(err, PipelineError::FatalPrecondition(_)));
    }
}

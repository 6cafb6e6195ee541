use super::*;

use crate::error::PipelineError;
use crate::roster::{Member, RosterIndex, RosterSource};

impl SessionDb {
    // =========================================================================
    // Programs, groups and membership
    // =========================================================================

    pub fn create_program(&self, name: &str) -> Result<i64, DbError> {
        self.conn
            .execute("INSERT INTO programs (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn create_group(&self, program_id: Option<i64>, name: &str) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO peer_groups (program_id, name) VALUES (?1, ?2)",
            params![program_id, name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_group(&self, group_id: i64) -> Result<Option<DbGroup>, DbError> {
        let group = self
            .conn
            .query_row(
                "SELECT id, program_id, name, is_active, created_at
                 FROM peer_groups WHERE id = ?1",
                params![group_id],
                |row| {
                    Ok(DbGroup {
                        id: row.get(0)?,
                        program_id: row.get(1)?,
                        name: row.get(2)?,
                        is_active: row.get::<_, i32>(3)? != 0,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(group)
    }

    /// Insert a member. Email is stored lowercased.
    pub fn create_member(&self, name: &str, email: Option<&str>) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO members (name, email) VALUES (?1, LOWER(?2))",
            params![name, email],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_member(&self, member_id: i64) -> Result<Option<DbMember>, DbError> {
        let member = self
            .conn
            .query_row(
                "SELECT id, name, email, is_active FROM members WHERE id = ?1",
                params![member_id],
                |row| {
                    Ok(DbMember {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        is_active: row.get::<_, i32>(3)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(member)
    }

    /// Open a membership. Fails if the member already has an open one in this group.
    pub fn assign_member(
        &self,
        group_id: i64,
        member_id: i64,
        role: MemberRole,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO group_members (group_id, member_id, role) VALUES (?1, ?2, ?3)",
            params![group_id, member_id, role.as_str()],
        )?;
        Ok(())
    }

    /// Close the open membership. Returns false if there was none.
    pub fn remove_member(&self, group_id: i64, member_id: i64) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE group_members SET left_at = datetime('now'), is_active = 0
             WHERE group_id = ?1 AND member_id = ?2 AND left_at IS NULL",
            params![group_id, member_id],
        )?;
        Ok(changed > 0)
    }

    /// Active members of a group in the order they joined.
    pub fn active_members(&self, group_id: i64) -> Result<Vec<DbGroupMember>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.name, gm.role, gm.joined_at
             FROM group_members gm
             INNER JOIN members m ON m.id = gm.member_id
             WHERE gm.group_id = ?1
               AND gm.is_active = 1
               AND gm.left_at IS NULL
               AND m.is_active = 1
             ORDER BY gm.joined_at ASC, gm.id ASC",
        )?;

        let rows = stmt.query_map(params![group_id], |row| {
            Ok(DbGroupMember {
                member_id: row.get(0)?,
                name: row.get(1)?,
                role: MemberRole::from_str_lossy(&row.get::<_, String>(2)?),
                joined_at: row.get(3)?,
            })
        })?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }
}

impl RosterSource for SessionDb {
    fn build_roster(&self, group_id: i64) -> Result<RosterIndex, PipelineError> {
        let group = self.get_group(group_id).map_err(|e| {
            PipelineError::FatalPrecondition(format!("Failed to load group {}: {}", group_id, e))
        })?;
        if group.is_none() {
            return Err(PipelineError::FatalPrecondition(format!(
                "Group {} not found",
                group_id
            )));
        }

        let members = self.active_members(group_id).map_err(|e| {
            PipelineError::FatalPrecondition(format!(
                "Failed to load roster for group {}: {}",
                group_id, e
            ))
        })?;

        let roster = RosterIndex::new(
            group_id,
            members
                .into_iter()
                .map(|m| Member {
                    id: m.member_id,
                    name: m.name,
                })
                .collect(),
        );
        log::debug!("Built roster for group {}: {} members", group_id, roster.len());
        Ok(roster)
    }
}

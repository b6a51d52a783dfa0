use crate::errors::{AppError, AppResult};
use crate::models::{
    DailyTaskRecord, DailyTemplateRecord, ProjectRecord, SubtaskRecord, UpdateProjectPayload,
    UserRecord, WeeklyCompletionRecord, WeeklyTaskRecord,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Half-open UTC window covering one calendar day at the configured
/// reference offset: `[local midnight, local midnight + 24h)`.
pub fn day_window(offset: FixedOffset, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = date.and_time(NaiveTime::MIN);
    let start =
        Utc.from_utc_datetime(&(midnight - Duration::seconds(i64::from(offset.local_minus_utc()))));
    (start, start + Duration::days(1))
}

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ─── Users & sessions ───────────────────────────────────────────────────

    pub fn create_user(&self, email: &str, password_hash: &str) -> AppResult<UserRecord> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let inserted = conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, email, password_hash, now.to_rfc3339()],
        );
        match inserted {
            Ok(_) => Ok(UserRecord {
                id,
                email: email.to_string(),
                created_at: now,
            }),
            Err(rusqlite::Error::SqliteFailure(code, _))
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(AppError::Conflict("Email already exists.".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Looks up a user by email together with the stored password hash.
    pub fn user_credentials(&self, email: &str) -> AppResult<Option<(UserRecord, String)>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.query_row(
            "SELECT id, email, created_at, password_hash FROM users WHERE email = ?1",
            [email],
            |row| {
                Ok((
                    UserRecord {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        created_at: parse_time(&row.get::<_, String>(2)?)?,
                    },
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()
        .map_err(AppError::from)
    }

    pub fn create_session(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![token_hash, user_id, Utc::now().to_rfc3339(), expires_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Resolves a session token hash to its user id, ignoring expired rows.
    pub fn session_user(&self, token_hash: &str) -> AppResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.query_row(
            "SELECT user_id FROM sessions WHERE token_hash = ?1 AND expires_at > ?2",
            params![token_hash, Utc::now().to_rfc3339()],
            |row| row.get(0),
        )
        .optional()
        .map_err(AppError::from)
    }

    pub fn delete_session(&self, token_hash: &str) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
        Ok(())
    }

    pub fn delete_expired_sessions(&self) -> AppResult<usize> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let removed = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [Utc::now().to_rfc3339()],
        )?;
        Ok(removed)
    }

    // ─── Projects ───────────────────────────────────────────────────────────

    pub fn list_projects(
        &self,
        user_id: &str,
        done: Option<bool>,
    ) -> AppResult<Vec<ProjectRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let mut query = String::from(
            "SELECT id, title, description, is_archived, is_done, created_at, updated_at
             FROM projects WHERE user_id = ? AND is_archived = 0",
        );

        let done_flag = done.map(i64::from);
        if done_flag.is_some() {
            query.push_str(" AND is_done = ?");
        }
        query.push_str(" ORDER BY created_at DESC");

        let mut statement = conn.prepare(&query)?;
        let mut dyn_params: Vec<&dyn rusqlite::ToSql> = vec![&user_id];
        if let Some(flag) = done_flag.as_ref() {
            dyn_params.push(flag);
        }

        let mut projects = statement
            .query_map(rusqlite::params_from_iter(dyn_params), parse_project_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for project in &mut projects {
            project.subtasks = project_subtasks(&conn, &project.id)?;
        }
        Ok(projects)
    }

    pub fn list_archived_projects(&self, user_id: &str) -> AppResult<Vec<ProjectRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let mut statement = conn.prepare(
            "SELECT id, title, description, is_archived, is_done, created_at, updated_at
             FROM projects WHERE user_id = ?1 AND is_archived = 1
             ORDER BY updated_at DESC",
        )?;
        let mut projects = statement
            .query_map([user_id], parse_project_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for project in &mut projects {
            project.subtasks = project_subtasks(&conn, &project.id)?;
        }
        Ok(projects)
    }

    pub fn create_project(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> AppResult<ProjectRecord> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO projects (id, user_id, title, description, is_archived, is_done, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?5)",
            params![id, user_id, title, description, now.to_rfc3339()],
        )?;

        Ok(ProjectRecord {
            id,
            title: title.to_string(),
            description: description.map(ToString::to_string),
            is_archived: false,
            is_done: false,
            created_at: now,
            updated_at: now,
            subtasks: Vec::new(),
        })
    }

    pub fn get_project(&self, user_id: &str, project_id: &str) -> AppResult<Option<ProjectRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        project_row(&conn, user_id, project_id)
    }

    pub fn project_title(&self, user_id: &str, project_id: &str) -> AppResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.query_row(
            "SELECT title FROM projects WHERE id = ?1 AND user_id = ?2",
            params![project_id, user_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(AppError::from)
    }

    /// Applies only the supplied fields; `description` may be set to NULL
    /// explicitly. Returns the refreshed project, or None on an
    /// id/ownership miss.
    pub fn update_project(
        &self,
        user_id: &str,
        project_id: &str,
        patch: &UpdateProjectPayload,
    ) -> AppResult<Option<ProjectRecord>> {
        let now = Utc::now();
        let mut assignments: Vec<&str> = vec!["updated_at = ?"];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now.to_rfc3339())];

        if let Some(title) = &patch.title {
            assignments.push("title = ?");
            values.push(Box::new(title.clone()));
        }
        if let Some(description) = &patch.description {
            assignments.push("description = ?");
            values.push(Box::new(description.clone()));
        }
        if let Some(is_done) = patch.is_done {
            assignments.push("is_done = ?");
            values.push(Box::new(is_done));
        }
        if let Some(is_archived) = patch.is_archived {
            assignments.push("is_archived = ?");
            values.push(Box::new(is_archived));
        }

        let query = format!(
            "UPDATE projects SET {} WHERE id = ? AND user_id = ?",
            assignments.join(", ")
        );
        values.push(Box::new(project_id.to_string()));
        values.push(Box::new(user_id.to_string()));

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let affected = conn.execute(
            &query,
            rusqlite::params_from_iter(values.iter().map(|value| value.as_ref())),
        )?;
        if affected == 0 {
            return Ok(None);
        }
        project_row(&conn, user_id, project_id)
    }

    pub fn archive_project(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> AppResult<Option<ProjectRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let affected = conn.execute(
            "UPDATE projects SET is_archived = 1, updated_at = ?1 WHERE id = ?2 AND user_id = ?3",
            params![Utc::now().to_rfc3339(), project_id, user_id],
        )?;
        if affected == 0 {
            return Ok(None);
        }
        project_row(&conn, user_id, project_id)
    }

    /// Restore clears the done flag too, so restored projects reappear in
    /// the active list rather than the done view.
    pub fn restore_project(&self, user_id: &str, project_id: &str) -> AppResult<bool> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let affected = conn.execute(
            "UPDATE projects SET is_archived = 0, is_done = 0, updated_at = ?1
             WHERE id = ?2 AND user_id = ?3",
            params![Utc::now().to_rfc3339(), project_id, user_id],
        )?;
        Ok(affected > 0)
    }

    /// Hard delete; subtasks go with the project via cascade.
    pub fn delete_project_permanently(&self, user_id: &str, project_id: &str) -> AppResult<bool> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let affected = conn.execute(
            "DELETE FROM projects WHERE id = ?1 AND user_id = ?2",
            params![project_id, user_id],
        )?;
        Ok(affected > 0)
    }

    // ─── Subtasks ───────────────────────────────────────────────────────────

    pub fn add_subtask(
        &self,
        user_id: &str,
        project_id: &str,
        text: &str,
    ) -> AppResult<Option<SubtaskRecord>> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        if !project_is_owned(&conn, user_id, project_id)? {
            return Ok(None);
        }
        conn.execute(
            "INSERT INTO subtasks (id, project_id, text, is_completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?4)",
            params![id, project_id, text, now.to_rfc3339()],
        )?;

        Ok(Some(SubtaskRecord {
            id,
            project_id: project_id.to_string(),
            text: text.to_string(),
            is_completed: false,
            created_at: now,
            updated_at: now,
        }))
    }

    pub fn add_subtasks_bulk(
        &self,
        user_id: &str,
        project_id: &str,
        texts: &[String],
    ) -> AppResult<Option<usize>> {
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        if !project_is_owned(&conn, user_id, project_id)? {
            return Ok(None);
        }
        for text in texts {
            conn.execute(
                "INSERT INTO subtasks (id, project_id, text, is_completed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?4)",
                params![Uuid::new_v4().to_string(), project_id, text, now],
            )?;
        }
        Ok(Some(texts.len()))
    }

    /// Ownership rides inside the UPDATE predicate so a toggle on someone
    /// else's subtask matches zero rows.
    pub fn set_subtask_completed(
        &self,
        user_id: &str,
        subtask_id: &str,
        is_completed: bool,
    ) -> AppResult<Option<SubtaskRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let affected = conn.execute(
            "UPDATE subtasks SET is_completed = ?1, updated_at = ?2
             WHERE id = ?3 AND project_id IN (SELECT id FROM projects WHERE user_id = ?4)",
            params![is_completed, Utc::now().to_rfc3339(), subtask_id, user_id],
        )?;
        if affected == 0 {
            return Ok(None);
        }
        conn.query_row(
            "SELECT id, project_id, text, is_completed, created_at, updated_at
             FROM subtasks WHERE id = ?1",
            [subtask_id],
            parse_subtask_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    pub fn delete_subtask(&self, user_id: &str, subtask_id: &str) -> AppResult<bool> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let affected = conn.execute(
            "DELETE FROM subtasks
             WHERE id = ?1 AND project_id IN (SELECT id FROM projects WHERE user_id = ?2)",
            params![subtask_id, user_id],
        )?;
        Ok(affected > 0)
    }

    // ─── Daily tasks ────────────────────────────────────────────────────────

    pub fn list_daily(
        &self,
        user_id: &str,
        window: (DateTime<Utc>, DateTime<Utc>),
        archived: Option<bool>,
    ) -> AppResult<Vec<DailyTaskRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let mut query = String::from(
            "SELECT t.id, t.title, t.is_archived, t.created_at,
                    EXISTS(SELECT 1 FROM daily_task_completions c
                           WHERE c.template_id = t.id AND c.date >= ? AND c.date < ?) AS is_completed
             FROM daily_task_templates t WHERE t.user_id = ?",
        );

        let params_vec: Vec<String> = vec![
            window.0.to_rfc3339(),
            window.1.to_rfc3339(),
            user_id.to_string(),
        ];
        let archived_flag = archived.map(i64::from);
        if archived_flag.is_some() {
            query.push_str(" AND t.is_archived = ?");
        }
        query.push_str(" ORDER BY t.created_at ASC");

        let mut statement = conn.prepare(&query)?;
        let mut dyn_params: Vec<&dyn rusqlite::ToSql> = params_vec
            .iter()
            .map(|param| param as &dyn rusqlite::ToSql)
            .collect();
        if let Some(flag) = archived_flag.as_ref() {
            dyn_params.push(flag);
        }

        let rows = statement.query_map(rusqlite::params_from_iter(dyn_params), |row| {
            Ok(DailyTaskRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                is_archived: row.get(2)?,
                created_at: parse_time(&row.get::<_, String>(3)?)?,
                is_completed: row.get(4)?,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn create_daily_template(&self, user_id: &str, title: &str) -> AppResult<DailyTaskRecord> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO daily_task_templates (id, user_id, title, is_archived, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![id, user_id, title, now.to_rfc3339()],
        )?;

        Ok(DailyTaskRecord {
            id,
            title: title.to_string(),
            is_archived: false,
            created_at: now,
            is_completed: false,
        })
    }

    /// Records a completion for the day covered by `window`. Returns None on
    /// an ownership miss, Some(false) when the day was already completed
    /// (no duplicate row is written), Some(true) when a row was inserted.
    pub fn complete_daily(
        &self,
        user_id: &str,
        template_id: &str,
        window: (DateTime<Utc>, DateTime<Utc>),
    ) -> AppResult<Option<bool>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        if !template_is_owned(&conn, user_id, template_id)? {
            return Ok(None);
        }

        let existing: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM daily_task_completions
                 WHERE template_id = ?1 AND date >= ?2 AND date < ?3",
                params![template_id, window.0.to_rfc3339(), window.1.to_rfc3339()],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(Some(false));
        }

        conn.execute(
            "INSERT INTO daily_task_completions (id, template_id, date) VALUES (?1, ?2, ?3)",
            params![
                Uuid::new_v4().to_string(),
                template_id,
                window.0.to_rfc3339()
            ],
        )?;
        Ok(Some(true))
    }

    /// Removes the completion row for the window, if any. Returns the number
    /// of rows deleted; an unmatched call is a no-op, not an error.
    pub fn uncomplete_daily(
        &self,
        user_id: &str,
        template_id: &str,
        window: (DateTime<Utc>, DateTime<Utc>),
    ) -> AppResult<usize> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let affected = conn.execute(
            "DELETE FROM daily_task_completions
             WHERE template_id = ?1 AND date >= ?2 AND date < ?3
               AND template_id IN (SELECT id FROM daily_task_templates WHERE user_id = ?4)",
            params![
                template_id,
                window.0.to_rfc3339(),
                window.1.to_rfc3339(),
                user_id
            ],
        )?;
        Ok(affected)
    }

    pub fn set_daily_template_archived(
        &self,
        user_id: &str,
        template_id: &str,
        archived: bool,
    ) -> AppResult<Option<DailyTemplateRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let affected = conn.execute(
            "UPDATE daily_task_templates SET is_archived = ?1 WHERE id = ?2 AND user_id = ?3",
            params![archived, template_id, user_id],
        )?;
        if affected == 0 {
            return Ok(None);
        }
        conn.query_row(
            "SELECT id, title, is_archived, created_at FROM daily_task_templates WHERE id = ?1",
            [template_id],
            parse_template_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    /// Hard delete; completion rows go with the template via cascade.
    pub fn delete_daily_template(&self, user_id: &str, template_id: &str) -> AppResult<bool> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let affected = conn.execute(
            "DELETE FROM daily_task_templates WHERE id = ?1 AND user_id = ?2",
            params![template_id, user_id],
        )?;
        Ok(affected > 0)
    }

    // ─── Weekly tasks ───────────────────────────────────────────────────────

    pub fn list_weekly(
        &self,
        user_id: &str,
        archived: Option<bool>,
    ) -> AppResult<Vec<WeeklyTaskRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let mut query = String::from(
            "SELECT w.id, w.title, w.is_archived, w.created_at,
                    (SELECT MAX(completed_at) FROM weekly_task_completions c
                     WHERE c.weekly_task_id = w.id) AS last_completed_at
             FROM weekly_tasks w WHERE w.user_id = ?",
        );

        let archived_flag = archived.map(i64::from);
        if archived_flag.is_some() {
            query.push_str(" AND w.is_archived = ?");
        }
        query.push_str(" ORDER BY w.created_at ASC");

        let mut statement = conn.prepare(&query)?;
        let mut dyn_params: Vec<&dyn rusqlite::ToSql> = vec![&user_id];
        if let Some(flag) = archived_flag.as_ref() {
            dyn_params.push(flag);
        }

        let rows = statement.query_map(rusqlite::params_from_iter(dyn_params), parse_weekly_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn create_weekly_task(&self, user_id: &str, title: &str) -> AppResult<WeeklyTaskRecord> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO weekly_tasks (id, user_id, title, is_archived, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![id, user_id, title, now.to_rfc3339()],
        )?;

        Ok(WeeklyTaskRecord {
            id,
            title: title.to_string(),
            is_archived: false,
            created_at: now,
            last_completed_at: None,
        })
    }

    /// Appends a completion stamped now. Completions are append-only; the
    /// latest one drives `lastCompletedAt` in list responses.
    pub fn complete_weekly(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> AppResult<Option<WeeklyCompletionRecord>> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        if !weekly_task_is_owned(&conn, user_id, task_id)? {
            return Ok(None);
        }
        conn.execute(
            "INSERT INTO weekly_task_completions (id, weekly_task_id, completed_at)
             VALUES (?1, ?2, ?3)",
            params![id, task_id, now.to_rfc3339()],
        )?;

        Ok(Some(WeeklyCompletionRecord {
            id,
            weekly_task_id: task_id.to_string(),
            completed_at: now,
        }))
    }

    pub fn archive_weekly_task(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> AppResult<Option<WeeklyTaskRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let affected = conn.execute(
            "UPDATE weekly_tasks SET is_archived = 1 WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id],
        )?;
        if affected == 0 {
            return Ok(None);
        }
        conn.query_row(
            "SELECT w.id, w.title, w.is_archived, w.created_at,
                    (SELECT MAX(completed_at) FROM weekly_task_completions c
                     WHERE c.weekly_task_id = w.id) AS last_completed_at
             FROM weekly_tasks w WHERE w.id = ?1",
            [task_id],
            parse_weekly_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    /// Hard delete; completion history goes with the task via cascade.
    pub fn delete_weekly_task(&self, user_id: &str, task_id: &str) -> AppResult<bool> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let affected = conn.execute(
            "DELETE FROM weekly_tasks WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id],
        )?;
        Ok(affected > 0)
    }
}

fn project_is_owned(conn: &Connection, user_id: &str, project_id: &str) -> AppResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM projects WHERE id = ?1 AND user_id = ?2",
            params![project_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn template_is_owned(conn: &Connection, user_id: &str, template_id: &str) -> AppResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM daily_task_templates WHERE id = ?1 AND user_id = ?2",
            params![template_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn weekly_task_is_owned(conn: &Connection, user_id: &str, task_id: &str) -> AppResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM weekly_tasks WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn project_row(
    conn: &Connection,
    user_id: &str,
    project_id: &str,
) -> AppResult<Option<ProjectRecord>> {
    let project = conn
        .query_row(
            "SELECT id, title, description, is_archived, is_done, created_at, updated_at
             FROM projects WHERE id = ?1 AND user_id = ?2",
            params![project_id, user_id],
            parse_project_row,
        )
        .optional()?;
    match project {
        Some(mut project) => {
            project.subtasks = project_subtasks(conn, &project.id)?;
            Ok(Some(project))
        }
        None => Ok(None),
    }
}

fn project_subtasks(conn: &Connection, project_id: &str) -> AppResult<Vec<SubtaskRecord>> {
    let mut statement = conn.prepare(
        "SELECT id, project_id, text, is_completed, created_at, updated_at
         FROM subtasks WHERE project_id = ?1 ORDER BY created_at ASC",
    )?;
    let subtasks = statement
        .query_map([project_id], parse_subtask_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(subtasks)
}

fn parse_project_row(row: &rusqlite::Row) -> rusqlite::Result<ProjectRecord> {
    Ok(ProjectRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        is_archived: row.get(3)?,
        is_done: row.get(4)?,
        created_at: parse_time(&row.get::<_, String>(5)?)?,
        updated_at: parse_time(&row.get::<_, String>(6)?)?,
        subtasks: Vec::new(),
    })
}

fn parse_subtask_row(row: &rusqlite::Row) -> rusqlite::Result<SubtaskRecord> {
    Ok(SubtaskRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        text: row.get(2)?,
        is_completed: row.get(3)?,
        created_at: parse_time(&row.get::<_, String>(4)?)?,
        updated_at: parse_time(&row.get::<_, String>(5)?)?,
    })
}

fn parse_template_row(row: &rusqlite::Row) -> rusqlite::Result<DailyTemplateRecord> {
    Ok(DailyTemplateRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        is_archived: row.get(2)?,
        created_at: parse_time(&row.get::<_, String>(3)?)?,
    })
}

fn parse_weekly_row(row: &rusqlite::Row) -> rusqlite::Result<WeeklyTaskRecord> {
    let last: Option<String> = row.get(4)?;
    let last_completed_at = match last {
        Some(raw) => Some(parse_time(&raw)?),
        None => None,
    };
    Ok(WeeklyTaskRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        is_archived: row.get(2)?,
        created_at: parse_time(&row.get::<_, String>(3)?)?,
        last_completed_at,
    })
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string())),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::{day_window, Database};
    use crate::errors::AppError;
    use crate::models::UpdateProjectPayload;
    use chrono::{Duration, FixedOffset, NaiveDate, Utc};

    fn stockholm() -> FixedOffset {
        FixedOffset::east_opt(3600).expect("offset")
    }

    fn july_14() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 14).expect("date")
    }

    #[test]
    fn day_window_converts_local_midnight_to_utc() {
        let (start, end) = day_window(stockholm(), july_14());
        assert_eq!(start.to_rfc3339(), "2025-07-13T23:00:00+00:00");
        assert_eq!(end - start, Duration::days(1));

        let kolkata_ish = FixedOffset::east_opt(5 * 3600 + 1800).expect("offset");
        let (start, _) = day_window(kolkata_ish, july_14());
        assert_eq!(start.to_rfc3339(), "2025-07-13T18:30:00+00:00");
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");

        db.create_user("anna@example.com", "hash-a").expect("user");
        let err = db
            .create_user("anna@example.com", "hash-b")
            .expect_err("duplicate");
        assert!(matches!(err, AppError::Conflict(_)));

        let (user, hash) = db
            .user_credentials("anna@example.com")
            .expect("lookup")
            .expect("exists");
        assert_eq!(user.email, "anna@example.com");
        assert_eq!(hash, "hash-a");
        assert!(db
            .user_credentials("nobody@example.com")
            .expect("lookup")
            .is_none());
    }

    #[test]
    fn sessions_expire_and_get_swept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let user = db.create_user("anna@example.com", "hash").expect("user");

        db.create_session("live", &user.id, Utc::now() + Duration::days(1))
            .expect("session");
        db.create_session("stale", &user.id, Utc::now() - Duration::hours(1))
            .expect("session");

        assert_eq!(db.session_user("live").expect("lookup"), Some(user.id));
        assert_eq!(db.session_user("stale").expect("lookup"), None);

        assert_eq!(db.delete_expired_sessions().expect("sweep"), 1);
        db.delete_session("live").expect("delete");
        assert_eq!(db.session_user("live").expect("lookup"), None);
    }

    #[test]
    fn projects_are_invisible_across_users() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let anna = db.create_user("anna@example.com", "hash").expect("user");
        let erik = db.create_user("erik@example.com", "hash").expect("user");

        let project = db
            .create_project(&anna.id, "Write thesis", Some("due october"))
            .expect("project");

        assert!(db.get_project(&erik.id, &project.id).expect("get").is_none());
        assert!(db.list_projects(&erik.id, None).expect("list").is_empty());
        assert!(db
            .update_project(
                &erik.id,
                &project.id,
                &UpdateProjectPayload {
                    is_done: Some(true),
                    ..UpdateProjectPayload::default()
                },
            )
            .expect("update")
            .is_none());
        assert!(!db
            .delete_project_permanently(&erik.id, &project.id)
            .expect("delete"));

        let mine = db.list_projects(&anna.id, None).expect("list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].description.as_deref(), Some("due october"));
    }

    #[test]
    fn done_filter_and_newest_first_ordering() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let anna = db.create_user("anna@example.com", "hash").expect("user");

        let first = db.create_project(&anna.id, "First", None).expect("project");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = db.create_project(&anna.id, "Second", None).expect("project");
        db.update_project(
            &anna.id,
            &second.id,
            &UpdateProjectPayload {
                is_done: Some(true),
                ..UpdateProjectPayload::default()
            },
        )
        .expect("update")
        .expect("exists");

        let all = db.list_projects(&anna.id, None).expect("list");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);

        let done = db.list_projects(&anna.id, Some(true)).expect("list");
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, second.id);

        let open = db.list_projects(&anna.id, Some(false)).expect("list");
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, first.id);
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let anna = db.create_user("anna@example.com", "hash").expect("user");
        let project = db
            .create_project(&anna.id, "Write thesis", Some("due october"))
            .expect("project");

        let renamed = db
            .update_project(
                &anna.id,
                &project.id,
                &UpdateProjectPayload {
                    title: Some("Write dissertation".to_string()),
                    ..UpdateProjectPayload::default()
                },
            )
            .expect("update")
            .expect("exists");
        assert_eq!(renamed.title, "Write dissertation");
        assert_eq!(renamed.description.as_deref(), Some("due october"));
        assert!(renamed.updated_at >= renamed.created_at);

        let cleared = db
            .update_project(
                &anna.id,
                &project.id,
                &UpdateProjectPayload {
                    description: Some(None),
                    ..UpdateProjectPayload::default()
                },
            )
            .expect("update")
            .expect("exists");
        assert_eq!(cleared.title, "Write dissertation");
        assert!(cleared.description.is_none());
    }

    #[test]
    fn archive_restore_and_hard_delete_lifecycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let anna = db.create_user("anna@example.com", "hash").expect("user");
        let project = db.create_project(&anna.id, "Spring cleanup", None).expect("project");
        db.add_subtask(&anna.id, &project.id, "Garage").expect("subtask");
        db.update_project(
            &anna.id,
            &project.id,
            &UpdateProjectPayload {
                is_done: Some(true),
                ..UpdateProjectPayload::default()
            },
        )
        .expect("update");

        let archived = db
            .archive_project(&anna.id, &project.id)
            .expect("archive")
            .expect("exists");
        assert!(archived.is_archived);
        assert!(db.list_projects(&anna.id, None).expect("list").is_empty());

        let shelf = db.list_archived_projects(&anna.id).expect("archive list");
        assert_eq!(shelf.len(), 1);
        assert_eq!(shelf[0].subtasks.len(), 1);

        assert!(db.restore_project(&anna.id, &project.id).expect("restore"));
        let restored = db
            .get_project(&anna.id, &project.id)
            .expect("get")
            .expect("exists");
        assert!(!restored.is_archived);
        assert!(!restored.is_done);

        db.archive_project(&anna.id, &project.id).expect("archive");
        assert!(db
            .delete_project_permanently(&anna.id, &project.id)
            .expect("delete"));
        assert!(db.get_project(&anna.id, &project.id).expect("get").is_none());
        // cascade removed the subtask rows with the project
        assert!(!db.delete_subtask(&anna.id, &shelf[0].subtasks[0].id).expect("delete"));
    }

    #[test]
    fn subtask_writes_require_project_ownership() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let anna = db.create_user("anna@example.com", "hash").expect("user");
        let erik = db.create_user("erik@example.com", "hash").expect("user");
        let project = db.create_project(&anna.id, "Write thesis", None).expect("project");

        assert!(db
            .add_subtask(&erik.id, &project.id, "sneaky")
            .expect("add")
            .is_none());
        let subtask = db
            .add_subtask(&anna.id, &project.id, "Outline")
            .expect("add")
            .expect("owned");

        assert!(db
            .set_subtask_completed(&erik.id, &subtask.id, true)
            .expect("toggle")
            .is_none());
        assert!(!db.delete_subtask(&erik.id, &subtask.id).expect("delete"));

        let toggled = db
            .set_subtask_completed(&anna.id, &subtask.id, true)
            .expect("toggle")
            .expect("owned");
        assert!(toggled.is_completed);
        assert!(db.delete_subtask(&anna.id, &subtask.id).expect("delete"));
    }

    #[test]
    fn daily_completion_is_per_day_and_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let anna = db.create_user("anna@example.com", "hash").expect("user");
        let template = db
            .create_daily_template(&anna.id, "Stretch")
            .expect("template");

        let monday = day_window(stockholm(), july_14());
        let tuesday = day_window(
            stockholm(),
            NaiveDate::from_ymd_opt(2025, 7, 15).expect("date"),
        );

        assert_eq!(
            db.complete_daily(&anna.id, &template.id, monday).expect("complete"),
            Some(true)
        );
        assert_eq!(
            db.complete_daily(&anna.id, &template.id, monday).expect("complete"),
            Some(false)
        );

        let on_monday = db.list_daily(&anna.id, monday, None).expect("list");
        assert!(on_monday[0].is_completed);
        let on_tuesday = db.list_daily(&anna.id, tuesday, None).expect("list");
        assert!(!on_tuesday[0].is_completed);

        assert_eq!(
            db.uncomplete_daily(&anna.id, &template.id, monday).expect("uncomplete"),
            1
        );
        assert_eq!(
            db.uncomplete_daily(&anna.id, &template.id, monday).expect("uncomplete"),
            0
        );
        let after = db.list_daily(&anna.id, monday, None).expect("list");
        assert!(!after[0].is_completed);
    }

    #[test]
    fn daily_completion_checks_template_ownership() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let anna = db.create_user("anna@example.com", "hash").expect("user");
        let erik = db.create_user("erik@example.com", "hash").expect("user");
        let template = db
            .create_daily_template(&anna.id, "Stretch")
            .expect("template");
        let monday = day_window(stockholm(), july_14());

        assert!(db
            .complete_daily(&erik.id, &template.id, monday)
            .expect("complete")
            .is_none());

        db.complete_daily(&anna.id, &template.id, monday).expect("complete");
        assert_eq!(
            db.uncomplete_daily(&erik.id, &template.id, monday).expect("uncomplete"),
            0
        );
    }

    #[test]
    fn daily_archive_filter_and_cascade_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let anna = db.create_user("anna@example.com", "hash").expect("user");
        let keep = db.create_daily_template(&anna.id, "Stretch").expect("template");
        let shelve = db.create_daily_template(&anna.id, "Journal").expect("template");
        let monday = day_window(stockholm(), july_14());

        let archived = db
            .set_daily_template_archived(&anna.id, &shelve.id, true)
            .expect("archive")
            .expect("exists");
        assert!(archived.is_archived);

        let active = db.list_daily(&anna.id, monday, Some(false)).expect("list");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id);
        let shelved = db.list_daily(&anna.id, monday, Some(true)).expect("list");
        assert_eq!(shelved.len(), 1);
        let everything = db.list_daily(&anna.id, monday, None).expect("list");
        assert_eq!(everything.len(), 2);

        let restored = db
            .set_daily_template_archived(&anna.id, &shelve.id, false)
            .expect("restore")
            .expect("exists");
        assert!(!restored.is_archived);

        db.complete_daily(&anna.id, &shelve.id, monday).expect("complete");
        assert!(db.delete_daily_template(&anna.id, &shelve.id).expect("delete"));
        let remaining = db.list_daily(&anna.id, monday, None).expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
    }

    #[test]
    fn weekly_last_completion_is_the_latest_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let anna = db.create_user("anna@example.com", "hash").expect("user");
        let task = db.create_weekly_task(&anna.id, "Water plants").expect("task");

        let fresh = db.list_weekly(&anna.id, None).expect("list");
        assert!(fresh[0].last_completed_at.is_none());

        let first = db
            .complete_weekly(&anna.id, &task.id)
            .expect("complete")
            .expect("owned");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = db
            .complete_weekly(&anna.id, &task.id)
            .expect("complete")
            .expect("owned");
        assert!(second.completed_at >= first.completed_at);

        let listed = db.list_weekly(&anna.id, None).expect("list");
        assert_eq!(listed[0].last_completed_at, Some(second.completed_at));
    }

    #[test]
    fn weekly_lifecycle_is_owner_scoped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let anna = db.create_user("anna@example.com", "hash").expect("user");
        let erik = db.create_user("erik@example.com", "hash").expect("user");
        let task = db.create_weekly_task(&anna.id, "Water plants").expect("task");

        assert!(db
            .complete_weekly(&erik.id, &task.id)
            .expect("complete")
            .is_none());
        assert!(db
            .archive_weekly_task(&erik.id, &task.id)
            .expect("archive")
            .is_none());
        assert!(!db.delete_weekly_task(&erik.id, &task.id).expect("delete"));

        let archived = db
            .archive_weekly_task(&anna.id, &task.id)
            .expect("archive")
            .expect("owned");
        assert!(archived.is_archived);

        let active = db.list_weekly(&anna.id, Some(false)).expect("list");
        assert!(active.is_empty());

        assert!(db.delete_weekly_task(&anna.id, &task.id).expect("delete"));
        assert!(db
            .complete_weekly(&anna.id, &task.id)
            .expect("complete")
            .is_none());
    }
}

use crate::db::{DbParam, DbRow};
use crate::domain;
use crate::domain::task::{NewTask, Task, TaskUpdate};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};

const TASK_COLUMNS: &str =
    "id, user_id, title, description, status, priority, created_at, updated_at";

fn task_from_row(row: &DbRow) -> Result<Task, Error> {
    let id = row.i64("id")?;
    let status = row.str("status")?;
    let priority = row.str("priority")?;

    Ok(Task {
        id,
        owner_user_id: row.i64("user_id")?,
        title: row.str("title")?.to_owned(),
        description: row.opt_str("description")?.map(str::to_owned),
        status: status
            .parse()
            .with_context(|| format!("reading the status of task {id}"))?,
        priority: priority
            .parse()
            .with_context(|| format!("reading the priority of task {id}"))?,
        created_at: row.opt_str("created_at")?.map(str::to_owned),
        updated_at: row.opt_str("updated_at")?.map(str::to_owned),
    })
}

pub struct DbTaskReader;

impl domain::task::driven_ports::TaskReader for DbTaskReader {
    async fn tasks_for_user(
        &self,
        user_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Task>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let rows = cxn
            .borrow_connection()
            .query(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ? ORDER BY created_at DESC, id DESC"
                ),
                &[user_id.into()],
            )
            .await
            .context("trying to fetch tasks for a user")?;

        rows.iter().map(task_from_row).collect()
    }

    async fn user_task_by_id(
        &self,
        user_id: i64,
        task_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Task>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let row = cxn
            .borrow_connection()
            .get(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND user_id = ?"),
                &[task_id.into(), user_id.into()],
            )
            .await
            .context("trying to fetch a task by ID")?;

        row.as_ref().map(task_from_row).transpose()
    }
}

pub struct DbTaskWriter;

impl domain::task::driven_ports::TaskWriter for DbTaskWriter {
    async fn create_task_for_user(
        &self,
        user_id: i64,
        new_task: &NewTask,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i64, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let outcome = cxn
            .borrow_connection()
            .run(
                "INSERT INTO tasks (user_id, title, description, status, priority) VALUES (?, ?, ?, ?, ?)",
                &[
                    user_id.into(),
                    new_task.title.trim().into(),
                    new_task.description.as_deref().into(),
                    new_task.status.as_str().into(),
                    new_task.priority.as_str().into(),
                ],
            )
            .await
            .context("trying to insert a new task into the database")?;

        outcome
            .inserted_id
            .context("the database did not report the new task's ID")
    }

    async fn update_user_task(
        &self,
        user_id: i64,
        task_id: i64,
        update: &TaskUpdate,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<u64, Error> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut params: Vec<DbParam> = Vec::new();
        if let Some(ref title) = update.title {
            assignments.push("title = ?");
            params.push(title.trim().into());
        }
        if let Some(ref description) = update.description {
            assignments.push("description = ?");
            params.push(description.as_deref().into());
        }
        if let Some(status) = update.status {
            assignments.push("status = ?");
            params.push(status.as_str().into());
        }
        if let Some(priority) = update.priority {
            assignments.push("priority = ?");
            params.push(priority.as_str().into());
        }
        assignments.push("updated_at = CURRENT_TIMESTAMP");
        params.push(task_id.into());
        params.push(user_id.into());

        let mut cxn = ext_cxn.database_cxn().await?;
        let outcome = cxn
            .borrow_connection()
            .run(
                &format!(
                    "UPDATE tasks SET {} WHERE id = ? AND user_id = ?",
                    assignments.join(", ")
                ),
                &params,
            )
            .await
            .context("trying to update a task in the database")?;

        Ok(outcome.changes)
    }

    async fn delete_user_task(
        &self,
        user_id: i64,
        task_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<u64, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let outcome = cxn
            .borrow_connection()
            .run(
                "DELETE FROM tasks WHERE id = ? AND user_id = ?",
                &[task_id.into(), user_id.into()],
            )
            .await
            .context("trying to remove a task from the database")?;

        Ok(outcome.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
    use crate::domain::task::{TaskPriority, TaskStatus};
    use crate::persistence::{self, schema};
    use speculoos::prelude::*;

    async fn seeded_connectivity() -> persistence::ExternalConnectivity {
        let db = Database::sqlite_in_memory()
            .await
            .expect("in-memory sqlite should open");
        let mut ext_cxn = persistence::ExternalConnectivity::new(db);
        schema::initialize(&mut ext_cxn, &schema::SeedAccount::default())
            .await
            .expect("schema should initialize");

        let mut handle = ext_cxn.database_cxn().await.expect("connection available");
        handle
            .borrow_connection()
            .run(
                "INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)",
                &["second".into(), "second@nura.ia".into(), "not-a-real-hash".into()],
            )
            .await
            .expect("second user should insert");
        drop(handle);

        ext_cxn
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_owned(),
            description: Some("details".to_owned()),
            status: TaskStatus::Pending,
            priority: TaskPriority::High,
        }
    }

    #[tokio::test]
    async fn create_then_read_back() {
        let mut ext_cxn = seeded_connectivity().await;

        let task_id = DbTaskWriter
            .create_task_for_user(1, &new_task("  Buy milk "), &mut ext_cxn)
            .await
            .expect("create should succeed");

        let fetched = DbTaskReader
            .user_task_by_id(1, task_id, &mut ext_cxn)
            .await
            .expect("fetch should succeed");
        assert_that!(fetched).is_some().matches(|task| {
            task.title == "Buy milk"
                && task.description.as_deref() == Some("details")
                && task.priority == TaskPriority::High
                && task.created_at.is_some()
        });
    }

    #[tokio::test]
    async fn ownership_isolates_tasks() {
        let mut ext_cxn = seeded_connectivity().await;
        let task_id = DbTaskWriter
            .create_task_for_user(1, &new_task("Mine"), &mut ext_cxn)
            .await
            .expect("create should succeed");

        let foreign_read = DbTaskReader
            .user_task_by_id(2, task_id, &mut ext_cxn)
            .await
            .expect("fetch should succeed");
        assert_that!(foreign_read).is_none();

        let foreign_update = DbTaskWriter
            .update_user_task(
                2,
                task_id,
                &TaskUpdate {
                    title: Some("Stolen".to_owned()),
                    ..TaskUpdate::default()
                },
                &mut ext_cxn,
            )
            .await
            .expect("update should run");
        assert_eq!(0, foreign_update);

        let foreign_delete = DbTaskWriter
            .delete_user_task(2, task_id, &mut ext_cxn)
            .await
            .expect("delete should run");
        assert_eq!(0, foreign_delete);

        let listed = DbTaskReader
            .tasks_for_user(2, &mut ext_cxn)
            .await
            .expect("list should succeed");
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let mut ext_cxn = seeded_connectivity().await;
        let task_id = DbTaskWriter
            .create_task_for_user(1, &new_task("Write report"), &mut ext_cxn)
            .await
            .expect("create should succeed");

        let changes = DbTaskWriter
            .update_user_task(
                1,
                task_id,
                &TaskUpdate {
                    status: Some(TaskStatus::Completed),
                    ..TaskUpdate::default()
                },
                &mut ext_cxn,
            )
            .await
            .expect("update should succeed");
        assert_eq!(1, changes);

        let task = DbTaskReader
            .user_task_by_id(1, task_id, &mut ext_cxn)
            .await
            .expect("fetch should succeed")
            .expect("task should exist");
        assert_eq!(TaskStatus::Completed, task.status);
        assert_eq!("Write report", task.title);
        assert_eq!(Some("details"), task.description.as_deref());
        assert_eq!(TaskPriority::High, task.priority);
    }

    #[tokio::test]
    async fn description_can_be_cleared() {
        let mut ext_cxn = seeded_connectivity().await;
        let task_id = DbTaskWriter
            .create_task_for_user(1, &new_task("Tidy up"), &mut ext_cxn)
            .await
            .expect("create should succeed");

        DbTaskWriter
            .update_user_task(
                1,
                task_id,
                &TaskUpdate {
                    description: Some(None),
                    ..TaskUpdate::default()
                },
                &mut ext_cxn,
            )
            .await
            .expect("update should succeed");

        let task = DbTaskReader
            .user_task_by_id(1, task_id, &mut ext_cxn)
            .await
            .expect("fetch should succeed")
            .expect("task should exist");
        assert_that!(task.description).is_none();
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let mut ext_cxn = seeded_connectivity().await;
        for title in ["first", "second", "third"] {
            DbTaskWriter
                .create_task_for_user(1, &new_task(title), &mut ext_cxn)
                .await
                .expect("create should succeed");
        }

        let titles: Vec<String> = DbTaskReader
            .tasks_for_user(1, &mut ext_cxn)
            .await
            .expect("list should succeed")
            .into_iter()
            .map(|task| task.title)
            .collect();
        assert_eq!(vec!["third", "second", "first"], titles);
    }

    #[tokio::test]
    async fn legacy_status_spellings_are_read() {
        let mut ext_cxn = seeded_connectivity().await;
        let mut handle = ext_cxn.database_cxn().await.expect("connection available");
        handle
            .borrow_connection()
            .run(
                "INSERT INTO tasks (user_id, title, status, priority) VALUES (?, ?, ?, ?)",
                &[1_i64.into(), "Old task".into(), "concluída".into(), "alta".into()],
            )
            .await
            .expect("legacy row should insert");
        drop(handle);

        let listed = DbTaskReader
            .tasks_for_user(1, &mut ext_cxn)
            .await
            .expect("list should succeed");
        assert_eq!(1, listed.len());
        assert_eq!(TaskStatus::Completed, listed[0].status);
        assert_eq!(TaskPriority::High, listed[0].priority);
    }

    #[tokio::test]
    async fn delete_removes_owned_task() {
        let mut ext_cxn = seeded_connectivity().await;
        let task_id = DbTaskWriter
            .create_task_for_user(1, &new_task("Short lived"), &mut ext_cxn)
            .await
            .expect("create should succeed");

        let changes = DbTaskWriter
            .delete_user_task(1, task_id, &mut ext_cxn)
            .await
            .expect("delete should succeed");
        assert_eq!(1, changes);
        assert_that!(
            DbTaskReader
                .user_task_by_id(1, task_id, &mut ext_cxn)
                .await
                .expect("fetch should succeed")
        )
        .is_none();
    }
}

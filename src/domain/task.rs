use crate::domain;
use crate::domain::UnknownVariant;
use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::domain::task::driving_ports::TaskError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use std::str::FromStr;
use tracing::{error, info};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

const STATUS_SPELLINGS: &[(&str, TaskStatus)] = &[
    ("pending", TaskStatus::Pending),
    ("pendente", TaskStatus::Pending),
    ("in_progress", TaskStatus::InProgress),
    ("in-progress", TaskStatus::InProgress),
    ("progresso", TaskStatus::InProgress),
    ("em_andamento", TaskStatus::InProgress),
    ("completed", TaskStatus::Completed),
    ("done", TaskStatus::Completed),
    ("concluido", TaskStatus::Completed),
    ("concluído", TaskStatus::Completed),
    ("concluida", TaskStatus::Completed),
    ("concluída", TaskStatus::Completed),
];

impl TaskStatus {
    /// The canonical value written to storage and returned to clients
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        domain::parse_with_synonyms("task status", raw, STATUS_SPELLINGS)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

const PRIORITY_SPELLINGS: &[(&str, TaskPriority)] = &[
    ("low", TaskPriority::Low),
    ("baixa", TaskPriority::Low),
    ("medium", TaskPriority::Medium),
    ("media", TaskPriority::Medium),
    ("média", TaskPriority::Medium),
    ("high", TaskPriority::High),
    ("alta", TaskPriority::High),
];

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        domain::parse_with_synonyms("task priority", raw, PRIORITY_SPELLINGS)
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Task {
    pub id: i64,
    pub owner_user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[cfg_attr(test, derive(Clone, Debug))]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

/// A sparse set of changes to a task. `None` leaves the field alone; for `description`,
/// `Some(None)` clears it.
#[derive(Default)]
#[cfg_attr(test, derive(Clone, Debug))]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
    }
}

/// Counts of a user's tasks by status
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct TaskStats {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub completed: u64,
    /// Percentage of completed tasks, rounded to the nearest whole number
    pub completion_rate: u64,
}

impl TaskStats {
    fn from_tasks(tasks: &[Task]) -> TaskStats {
        let mut stats = TaskStats::default();
        for task in tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
        }

        if stats.total > 0 {
            stats.completion_rate = (stats.completed * 100 + stats.total / 2) / stats.total;
        }

        stats
    }
}

pub mod driven_ports {
    use super::*;
    use crate::external_connections::ExternalConnectivity;

    pub trait TaskReader: Sync {
        /// All of the user's tasks, newest first
        async fn tasks_for_user(
            &self,
            user_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Task>, anyhow::Error>;
        async fn user_task_by_id(
            &self,
            user_id: i64,
            task_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Task>, anyhow::Error>;
    }

    pub trait TaskWriter: Sync {
        async fn create_task_for_user(
            &self,
            user_id: i64,
            new_task: &NewTask,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i64, anyhow::Error>;

        /// Applies the update to the task only if the user owns it, returning the number of rows changed
        async fn update_user_task(
            &self,
            user_id: i64,
            task_id: i64,
            update: &TaskUpdate,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<u64, anyhow::Error>;

        /// Deletes the task only if the user owns it, returning the number of rows removed
        async fn delete_user_task(
            &self,
            user_id: i64,
            task_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<u64, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use crate::domain;
    use crate::external_connections::ExternalConnectivity;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TaskError {
        #[error("{0}")]
        Invalid(String),
        #[error("The specified user did not exist.")]
        UserDoesNotExist,
        #[error("The task does not exist or belongs to another user.")]
        TaskNotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<domain::user::UserExistsErr> for TaskError {
        fn from(value: domain::user::UserExistsErr) -> Self {
            match value {
                domain::user::UserExistsErr::UserDoesNotExist(user_id) => {
                    error!(user_id, "User didn't exist when creating a task.");
                    TaskError::UserDoesNotExist
                }
                domain::user::UserExistsErr::PortError(err) => {
                    TaskError::from(err.context("Verifying the task owner"))
                }
            }
        }
    }


    pub trait TaskPort {
        async fn tasks_for_user(
            &self,
            user_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<Vec<Task>, TaskError>;
        async fn user_task_by_id(
            &self,
            user_id: i64,
            task_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<Option<Task>, TaskError>;
        async fn create_task_for_user(
            &self,
            user_id: i64,
            task: &NewTask,
            ext_cxn: &mut impl ExternalConnectivity,
            u_detect: &impl domain::user::driven_ports::DetectUser,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<i64, TaskError>;
        async fn update_task(
            &self,
            user_id: i64,
            task_id: i64,
            update: &TaskUpdate,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<u64, TaskError>;
        async fn delete_task(
            &self,
            user_id: i64,
            task_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
            task_write: &impl driven_ports::TaskWriter,
        ) -> Result<u64, TaskError>;
        async fn task_stats(
            &self,
            user_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl driven_ports::TaskReader,
        ) -> Result<TaskStats, TaskError>;
    }
}

pub struct TaskService {}

fn require_title(title: &str) -> Result<(), TaskError> {
    if title.trim().is_empty() {
        return Err(TaskError::Invalid("a task title is required".to_owned()));
    }

    Ok(())
}

impl driving_ports::TaskPort for TaskService {
    async fn tasks_for_user(
        &self,
        user_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Vec<Task>, TaskError> {
        let tasks_result = task_read
            .tasks_for_user(user_id, &mut *ext_cxn)
            .await
            .context("listing user tasks")?;

        Ok(tasks_result)
    }

    async fn user_task_by_id(
        &self,
        user_id: i64,
        task_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Option<Task>, TaskError> {
        let task_result = task_read
            .user_task_by_id(user_id, task_id, &mut *ext_cxn)
            .await
            .context("fetching a single user task")?;

        Ok(task_result)
    }

    async fn create_task_for_user(
        &self,
        user_id: i64,
        task: &NewTask,
        ext_cxn: &mut impl ExternalConnectivity,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        task_write: &impl TaskWriter,
    ) -> Result<i64, TaskError> {
        require_title(&task.title)?;
        domain::user::verify_user_exists(user_id, &mut *ext_cxn, u_detect).await?;

        let created_task_id = task_write
            .create_task_for_user(user_id, task, &mut *ext_cxn)
            .await
            .context("creating a task")?;
        info!(user_id, task_id = created_task_id, "Created task");

        Ok(created_task_id)
    }

    async fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        update: &TaskUpdate,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<u64, TaskError> {
        if update.is_empty() {
            // A task the user can't see is reported missing even when there is nothing to change
            let existing = task_read
                .user_task_by_id(user_id, task_id, &mut *ext_cxn)
                .await
                .context("looking up a task before an empty update")?;
            if existing.is_none() {
                return Err(TaskError::TaskNotFound);
            }

            return Err(TaskError::Invalid(
                "at least one of title, description, status or priority must be provided".to_owned(),
            ));
        }
        if let Some(ref title) = update.title {
            require_title(title)?;
        }

        let changes = task_write
            .update_user_task(user_id, task_id, update, &mut *ext_cxn)
            .await
            .context("updating a task")?;
        if changes == 0 {
            return Err(TaskError::TaskNotFound);
        }

        Ok(changes)
    }

    async fn delete_task(
        &self,
        user_id: i64,
        task_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
        task_write: &impl TaskWriter,
    ) -> Result<u64, TaskError> {
        let changes = task_write
            .delete_user_task(user_id, task_id, &mut *ext_cxn)
            .await
            .context("deleting a task")?;
        if changes == 0 {
            return Err(TaskError::TaskNotFound);
        }

        Ok(changes)
    }

    async fn task_stats(
        &self,
        user_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<TaskStats, TaskError> {
        let tasks = task_read
            .tasks_for_user(user_id, &mut *ext_cxn)
            .await
            .context("collecting tasks for statistics")?;

        Ok(TaskStats::from_tasks(&tasks))
    }
}

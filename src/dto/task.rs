use crate::domain;
use crate::domain::UnknownVariant;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }

    Ok(())
}

fn parse_optional<T>(raw: Option<&str>) -> Result<Option<T>, UnknownVariant>
where
    T: std::str::FromStr<Err = UnknownVariant>,
{
    raw.map(str::parse).transpose()
}

/// Blank strings count as not sent
fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.filter(|value| !value.trim().is_empty())
}

/// DTO for creating a new task via the API
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct NewTask {
    /// Older clients send this as `name`
    #[serde(default, alias = "name")]
    #[validate(length(min = 1, max = 255), custom = "not_blank")]
    #[schema(example = "Buy groceries")]
    pub title: String,
    #[schema(example = "Milk, eggs and coffee")]
    pub description: Option<String>,
    #[schema(example = "pending")]
    pub status: Option<String>,
    #[schema(example = "medium")]
    pub priority: Option<String>,
    /// Used when neither the `user_id` query parameter nor the `x-user-id` header is sent
    #[serde(default, deserialize_with = "super::lenient_user_id")]
    #[schema(value_type = Option<i64>, example = 1)]
    pub user_id: Option<i64>,
}

impl TryFrom<NewTask> for domain::task::NewTask {
    type Error = UnknownVariant;

    fn try_from(value: NewTask) -> Result<Self, Self::Error> {
        Ok(domain::task::NewTask {
            title: value.title,
            description: value.description,
            status: parse_optional(non_blank(value.status.as_deref()))?.unwrap_or_default(),
            priority: parse_optional(non_blank(value.priority.as_deref()))?.unwrap_or_default(),
        })
    }
}

/// DTO for changing some of a task's fields via the API. Omitted fields are left untouched.
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct UpdateTask {
    #[serde(default, alias = "name")]
    #[validate(length(max = 255))]
    pub title: Option<String>,
    /// `null` clears the description
    #[serde(default, deserialize_with = "super::explicit_null")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "super::lenient_user_id")]
    #[schema(value_type = Option<i64>)]
    pub user_id: Option<i64>,
}

impl TryFrom<UpdateTask> for domain::task::TaskUpdate {
    type Error = UnknownVariant;

    fn try_from(value: UpdateTask) -> Result<Self, Self::Error> {
        Ok(domain::task::TaskUpdate {
            title: value.title,
            description: value.description,
            status: parse_optional(value.status.as_deref())?,
            priority: parse_optional(value.priority.as_deref())?,
        })
    }
}

/// DTO for a returned task on the API
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug, PartialEq, Eq))]
pub struct Task {
    #[schema(example = 10)]
    pub id: i64,
    #[schema(example = 1)]
    pub user_id: i64,
    #[schema(example = "Buy groceries")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "in_progress")]
    pub status: String,
    #[schema(example = "high")]
    pub priority: String,
    #[schema(example = "2025-03-14 09:26:53")]
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<domain::task::Task> for Task {
    fn from(value: domain::task::Task) -> Self {
        Task {
            id: value.id,
            user_id: value.owner_user_id,
            title: value.title,
            description: value.description,
            status: value.status.as_str().to_owned(),
            priority: value.priority.as_str().to_owned(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct TaskList {
    pub success: bool,
    pub tasks: Vec<Task>,
    #[schema(example = 1)]
    pub total: usize,
}

#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct TaskResponse {
    pub success: bool,
    pub task: Task,
}

/// DTO for a newly created task
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct InsertedTask {
    pub success: bool,
    #[serde(rename = "taskId")]
    #[schema(example = 5)]
    pub task_id: i64,
}

/// DTO reporting how many tasks an update or delete touched
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct ChangedTask {
    pub success: bool,
    #[schema(example = 1)]
    pub changes: u64,
}

#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug, PartialEq, Eq))]
pub struct TaskStats {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub completed: u64,
    /// Percentage of tasks completed, 0-100
    #[schema(example = 40)]
    pub completion_rate: u64,
}

impl From<domain::task::TaskStats> for TaskStats {
    fn from(value: domain::task::TaskStats) -> Self {
        TaskStats {
            total: value.total,
            pending: value.pending,
            in_progress: value.in_progress,
            completed: value.completed,
            completion_rate: value.completion_rate,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct TaskStatsResponse {
    pub success: bool,
    pub stats: TaskStats,
}

use crate::domain::task::driving_ports::{TaskError, TaskPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{ApiError, BasicErrorResponse, Json, RequestingUser, ValidationErrorResponse};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::response::ErrorResponse;
use axum::routing::get;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(get_tasks, get_task, create_task, update_task, delete_task, task_stats))]
/// Defines the OpenAPI documentation for the task API
pub struct TaskApi;
/// Constant used to group task endpoints in OpenAPI documentation
pub const TASK_API_GROUP: &str = "Tasks";

impl From<TaskError> for ApiError {
    fn from(value: TaskError) -> Self {
        match value {
            TaskError::Invalid(problem) => ApiError::InvalidInput(problem),
            TaskError::UserDoesNotExist => ApiError::Unauthorized,
            TaskError::TaskNotFound => ApiError::NotFound("Task not found.".to_owned()),
            TaskError::PortError(cause) => ApiError::Internal(cause),
        }
    }
}

/// Task IDs that aren't integers can't name any stored task
fn parse_task_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::NotFound("Task not found.".to_owned()))
}

/// Adds routes under "/tasks" plus the task statistics route to the application router
pub fn task_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/tasks",
            get(
                |State(app_state): AppState, requester: RequestingUser| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    get_tasks(requester, &mut ext_cxn, &task_service).await
                },
            )
            .post(
                |State(app_state): AppState,
                 requester: RequestingUser,
                 Json(new_task): Json<dto::task::NewTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    create_task(requester, new_task, &mut ext_cxn, &task_service).await
                },
            ),
        )
        .route(
            "/tasks/:task_id",
            get(
                |State(app_state): AppState,
                 requester: RequestingUser,
                 Path(task_id): Path<String>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    get_task(requester, &task_id, &mut ext_cxn, &task_service).await
                },
            )
            .put(
                |State(app_state): AppState,
                 requester: RequestingUser,
                 Path(task_id): Path<String>,
                 Json(update): Json<dto::task::UpdateTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    update_task(requester, &task_id, update, &mut ext_cxn, &task_service).await
                },
            )
            .delete(
                |State(app_state): AppState,
                 requester: RequestingUser,
                 Path(task_id): Path<String>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    delete_task(requester, &task_id, &mut ext_cxn, &task_service).await
                },
            ),
        )
        .route(
            "/stats",
            get(
                |State(app_state): AppState, requester: RequestingUser| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    task_stats(requester, &mut ext_cxn, &task_service).await
                },
            ),
        )
}

#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = TASK_API_GROUP,
    params(
        ("user_id" = Option<i64>, Query, description = "The acting user, if the x-user-id header isn't sent"),
        ("x-user-id" = Option<i64>, Header, description = "The acting user"),
    ),
    responses(
        (status = 200, description = "The user's tasks, newest first", body = dto::task::TaskList),
        (status = 401, description = "No user was identified", body = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Lists every task owned by the requesting user
async fn get_tasks(
    requester: RequestingUser,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::task::TaskList>, ErrorResponse> {
    let user_id = requester.require(None)?;
    info!(user_id, "Listing tasks");
    let task_reader = persistence::db_task_driven_ports::DbTaskReader;

    let tasks: Vec<dto::task::Task> = task_service
        .tasks_for_user(user_id, &mut *ext_cxn, &task_reader)
        .await
        .map_err(ApiError::from)?
        .into_iter()
        .map(dto::task::Task::from)
        .collect();

    Ok(Json(dto::task::TaskList {
        success: true,
        total: tasks.len(),
        tasks,
    }))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(
        ("task_id" = i64, Path, description = "The ID of the task"),
        ("x-user-id" = Option<i64>, Header, description = "The acting user"),
    ),
    responses(
        (status = 200, description = "The task", body = dto::task::TaskResponse),
        (status = 401, description = "No user was identified", body = BasicErrorResponse),
        (status = 404, description = "The task doesn't exist or belongs to someone else", body = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Retrieves one of the requesting user's tasks
async fn get_task(
    requester: RequestingUser,
    task_id: &str,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::task::TaskResponse>, ErrorResponse> {
    let user_id = requester.require(None)?;
    let task_id = parse_task_id(task_id)?;
    info!(user_id, task_id, "Fetching task");
    let task_reader = persistence::db_task_driven_ports::DbTaskReader;

    let task = task_service
        .user_task_by_id(user_id, task_id, &mut *ext_cxn, &task_reader)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound("Task not found.".to_owned()))?;

    Ok(Json(dto::task::TaskResponse {
        success: true,
        task: task.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = TASK_API_GROUP,
    request_body = dto::task::NewTask,
    responses(
        (status = 200, description = "Task created", body = dto::task::InsertedTask),
        (status = 400, response = BasicErrorResponse),
        (status = 401, description = "No user was identified or the user doesn't exist", body = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Creates a task for the requesting user
async fn create_task(
    requester: RequestingUser,
    new_task: dto::task::NewTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::task::InsertedTask>, ErrorResponse> {
    let user_id = requester.require(new_task.user_id)?;
    info!(user_id, "Creating task");
    new_task.validate().map_err(ValidationErrorResponse::from)?;

    let domain_task = domain::task::NewTask::try_from(new_task)
        .map_err(|err| ApiError::InvalidInput(err.to_string()))?;
    let user_detect = persistence::db_user_driven_ports::DbDetectUser;
    let task_writer = persistence::db_task_driven_ports::DbTaskWriter;

    let task_id = task_service
        .create_task_for_user(
            user_id,
            &domain_task,
            &mut *ext_cxn,
            &user_detect,
            &task_writer,
        )
        .await
        .map_err(ApiError::from)?;

    Ok(Json(dto::task::InsertedTask {
        success: true,
        task_id,
    }))
}

#[utoipa::path(
    put,
    path = "/api/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(("task_id" = i64, Path, description = "The ID of the task to change")),
    request_body = dto::task::UpdateTask,
    responses(
        (status = 200, description = "Task updated", body = dto::task::ChangedTask),
        (status = 400, response = BasicErrorResponse),
        (status = 401, description = "No user was identified", body = BasicErrorResponse),
        (status = 404, description = "The task doesn't exist or belongs to someone else", body = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Changes some of a task's fields
async fn update_task(
    requester: RequestingUser,
    task_id: &str,
    update: dto::task::UpdateTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::task::ChangedTask>, ErrorResponse> {
    let user_id = requester.require(update.user_id)?;
    let task_id = parse_task_id(task_id)?;
    info!(user_id, task_id, "Updating task");
    update.validate().map_err(ValidationErrorResponse::from)?;

    let domain_update = domain::task::TaskUpdate::try_from(update)
        .map_err(|err| ApiError::InvalidInput(err.to_string()))?;
    let task_reader = persistence::db_task_driven_ports::DbTaskReader;
    let task_writer = persistence::db_task_driven_ports::DbTaskWriter;

    let changes = task_service
        .update_task(
            user_id,
            task_id,
            &domain_update,
            &mut *ext_cxn,
            &task_reader,
            &task_writer,
        )
        .await
        .map_err(ApiError::from)?;

    Ok(Json(dto::task::ChangedTask {
        success: true,
        changes,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{task_id}",
    tag = TASK_API_GROUP,
    params(
        ("task_id" = i64, Path, description = "The ID of the task to delete"),
        ("x-user-id" = Option<i64>, Header, description = "The acting user"),
    ),
    responses(
        (status = 200, description = "Task deleted", body = dto::task::ChangedTask),
        (status = 401, description = "No user was identified", body = BasicErrorResponse),
        (status = 404, description = "The task doesn't exist or belongs to someone else", body = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Deletes one of the requesting user's tasks
async fn delete_task(
    requester: RequestingUser,
    task_id: &str,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::task::ChangedTask>, ErrorResponse> {
    let user_id = requester.require(None)?;
    let task_id = parse_task_id(task_id)?;
    info!(user_id, task_id, "Deleting task");
    let task_writer = persistence::db_task_driven_ports::DbTaskWriter;

    let changes = task_service
        .delete_task(user_id, task_id, &mut *ext_cxn, &task_writer)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(dto::task::ChangedTask {
        success: true,
        changes,
    }))
}

#[utoipa::path(
    get,
    path = "/api/stats",
    tag = TASK_API_GROUP,
    params(("x-user-id" = Option<i64>, Header, description = "The acting user")),
    responses(
        (status = 200, description = "Task counts by status", body = dto::task::TaskStatsResponse),
        (status = 401, description = "No user was identified", body = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Summarizes the requesting user's tasks by status
async fn task_stats(
    requester: RequestingUser,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::task::TaskStatsResponse>, ErrorResponse> {
    let user_id = requester.require(None)?;
    let task_reader = persistence::db_task_driven_ports::DbTaskReader;

    let stats = task_service
        .task_stats(user_id, &mut *ext_cxn, &task_reader)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(dto::task::TaskStatsResponse {
        success: true,
        stats: stats.into(),
    }))
}

/// Task CRUD and search
///
/// Writes stamp the acting user: `created_by`/`updated_by` on create,
/// `updated_by` on update. Reads return [`TaskDetails`] so callers see the
/// names of the creator and last updater without a second lookup.

use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::{ServiceError, ServiceResult};
use crate::{
    db::unit_of_work::UnitOfWork,
    models::{
        self,
        task::{Task, TaskDetails, TaskFilter, TaskInput},
    },
};

#[derive(Clone)]
pub struct TaskService {
    pool: PgPool,
}

impl TaskService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a task on behalf of `user_id`
    pub async fn create(&self, input: TaskInput, user_id: Uuid) -> ServiceResult<TaskDetails> {
        let input = input.normalized();
        input.validate()?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let task = uow.tasks().add(&Task::new(input, user_id, models::now())).await?;
        let details = uow.tasks().find_details(task.id).await?.ok_or_else(not_found)?;
        uow.commit().await?;

        info!(task_id = %task.id, user_id = %user_id, "Task created");
        Ok(details)
    }

    pub async fn get_by_id(&self, id: Uuid) -> ServiceResult<TaskDetails> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let details = uow.tasks().find_details(id).await?.ok_or_else(not_found)?;
        uow.commit().await?;
        Ok(details)
    }

    /// Replaces every mutable field of task `id`
    ///
    /// Concurrent updates are last-writer-wins.
    pub async fn update(
        &self,
        id: Uuid,
        input: TaskInput,
        user_id: Uuid,
    ) -> ServiceResult<TaskDetails> {
        let input = input.normalized();
        input.validate()?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let mut task = uow.tasks().get_by_id(id).await?.ok_or_else(not_found)?;
        task.apply(input, user_id, models::now());

        uow.tasks().update(&task).await?.ok_or_else(not_found)?;
        let details = uow.tasks().find_details(id).await?.ok_or_else(not_found)?;
        uow.commit().await?;

        info!(task_id = %id, user_id = %user_id, "Task updated");
        Ok(details)
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if !uow.tasks().remove(id).await? {
            return Err(not_found());
        }
        uow.commit().await?;

        info!(task_id = %id, user_id = %user_id, "Task deleted");
        Ok(())
    }

    /// Filtered, ordered page of tasks; an empty page is not an error
    pub async fn search(&self, filter: TaskFilter) -> ServiceResult<Vec<TaskDetails>> {
        filter.validate()?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let tasks = uow.tasks().search(&filter).await?;
        uow.commit().await?;

        debug!(
            query = ?filter.text(),
            page = filter.page(),
            results = tasks.len(),
            "Task search"
        );
        Ok(tasks)
    }
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Task not found".to_string())
}

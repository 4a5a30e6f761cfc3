//! Nominee repository.

use std::sync::Arc;

use crate::db_err;
use crate::entities::{Nominee, nominee};
use awards_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Nominee repository for database operations.
#[derive(Clone)]
pub struct NomineeRepository {
    db: Arc<DatabaseConnection>,
}

impl NomineeRepository {
    /// Create a new nominee repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a nominee by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<nominee::Model>> {
        Nominee::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Get a nominee by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<nominee::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Nominee: {id}")))
    }

    /// Find nominees by IDs, ordered by name.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<nominee::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Nominee::find()
            .filter(nominee::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(nominee::Column::Name)
            .order_by_asc(nominee::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// List nominees ordered by name.
    pub async fn list(&self, active_only: bool) -> AppResult<Vec<nominee::Model>> {
        let mut query = Nominee::find();
        if active_only {
            query = query.filter(nominee::Column::IsActive.eq(true));
        }

        query
            .order_by_asc(nominee::Column::Name)
            .order_by_asc(nominee::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Create a new nominee.
    pub async fn create(&self, model: nominee::ActiveModel) -> AppResult<nominee::Model> {
        model.insert(self.db.as_ref()).await.map_err(db_err)
    }

    /// Update a nominee.
    pub async fn update(&self, model: nominee::ActiveModel) -> AppResult<nominee::Model> {
        model.update(self.db.as_ref()).await.map_err(db_err)
    }

    /// Delete a nominee. Finalist links cascade; recorded votes block it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = Nominee::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| match db_err(e) {
                AppError::Conflict(_) => {
                    AppError::Conflict("Nominee has recorded votes".to_string())
                }
                other => other,
            })?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Nominee: {id}")));
        }
        Ok(())
    }

    /// Count all nominees.
    pub async fn count(&self) -> AppResult<u64> {
        Nominee::find()
            .count(self.db.as_ref())
            .await
            .map_err(db_err)
    }
}

//! Access code repository.

use std::sync::Arc;

use crate::db_err;
use crate::entities::{AccessCode, access_code, user};
use awards_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait, prelude::DateTimeWithTimeZone, sea_query::Expr,
};

/// Access code repository for database operations.
#[derive(Clone)]
pub struct AccessCodeRepository {
    db: Arc<DatabaseConnection>,
}

impl AccessCodeRepository {
    /// Create a new access code repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// List all codes, newest first.
    pub async fn list(&self) -> AppResult<Vec<access_code::Model>> {
        AccessCode::find()
            .order_by_desc(access_code::Column::CreatedAt)
            .order_by_desc(access_code::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Find an access code by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<access_code::Model>> {
        AccessCode::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Find an access code by its code string.
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<access_code::Model>> {
        AccessCode::find()
            .filter(access_code::Column::Code.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Create a new access code.
    pub async fn create(&self, model: access_code::ActiveModel) -> AppResult<access_code::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| match db_err(e) {
            AppError::Conflict(_) => AppError::Conflict("Access code already exists".to_string()),
            other => other,
        })
    }

    /// Delete an access code that has not been redeemed.
    pub async fn delete_unused(&self, id: &str) -> AppResult<()> {
        let code = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Access code: {id}")))?;

        if code.is_used {
            return Err(AppError::Conflict(
                "Access code has already been used".to_string(),
            ));
        }

        let result = AccessCode::delete_many()
            .filter(access_code::Column::Id.eq(id))
            .filter(access_code::Column::IsUsed.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Access code has already been used".to_string(),
            ));
        }

        Ok(())
    }

    /// Create a user and redeem `code` for it in one transaction.
    ///
    /// The code is claimed with a guarded update on `is_used = false`, so
    /// two registrations racing for the same code cannot both succeed.
    pub async fn register_user(
        &self,
        code: &str,
        new_user: user::ActiveModel,
    ) -> AppResult<user::Model> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let access = AccessCode::find()
            .filter(access_code::Column::Code.eq(code))
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::BadRequest("Invalid access code".to_string()))?;

        if access.is_used {
            return Err(AppError::Conflict(
                "Access code has already been used".to_string(),
            ));
        }

        let created = new_user.insert(&txn).await.map_err(|e| match db_err(e) {
            AppError::Conflict(_) => AppError::Conflict("Email is already registered".to_string()),
            other => other,
        })?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let claimed = AccessCode::update_many()
            .col_expr(access_code::Column::IsUsed, Expr::value(true))
            .col_expr(access_code::Column::UsedBy, Expr::value(created.id.clone()))
            .col_expr(access_code::Column::UsedAt, Expr::value(now))
            .filter(access_code::Column::Id.eq(access.id.as_str()))
            .filter(access_code::Column::IsUsed.eq(false))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if claimed.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Access code has already been used".to_string(),
            ));
        }

        txn.commit().await.map_err(db_err)?;
        Ok(created)
    }
}

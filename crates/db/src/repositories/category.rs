//! Category repository.
//!
//! Phase transitions are compare-and-swap updates guarded on the current
//! `phase_state`, so concurrent transitions of one category serialize in the
//! database and the loser observes [`AppError::InvalidState`].

use std::sync::Arc;

use crate::db_err;
use crate::entities::{
    Category, Nominee, NomineeCategory,
    category::{self, PhaseState},
    nominee, nominee_category,
};
use awards_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::DateTimeWithTimeZone,
    sea_query::Expr,
};

/// Category repository for database operations.
#[derive(Clone)]
pub struct CategoryRepository {
    db: Arc<DatabaseConnection>,
}

impl CategoryRepository {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a category by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<category::Model>> {
        Category::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Get a category by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<category::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category: {id}")))
    }

    /// List categories in creation order.
    pub async fn list(&self, active_only: bool) -> AppResult<Vec<category::Model>> {
        let mut query = Category::find();
        if active_only {
            query = query.filter(category::Column::IsActive.eq(true));
        }

        query
            .order_by_asc(category::Column::CreatedAt)
            .order_by_asc(category::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// List active categories in the given state.
    pub async fn find_active_in_state(&self, state: PhaseState) -> AppResult<Vec<category::Model>> {
        Category::find()
            .filter(category::Column::IsActive.eq(true))
            .filter(category::Column::PhaseState.eq(state.as_str()))
            .order_by_asc(category::Column::CreatedAt)
            .order_by_asc(category::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Create a new category.
    pub async fn create(&self, model: category::ActiveModel) -> AppResult<category::Model> {
        model.insert(self.db.as_ref()).await.map_err(db_err)
    }

    /// Update a category.
    pub async fn update(&self, model: category::ActiveModel) -> AppResult<category::Model> {
        model.update(self.db.as_ref()).await.map_err(db_err)
    }

    /// Delete a category. Finalist links cascade.
    ///
    /// Votes reference categories with `RESTRICT`, so a category that has
    /// received votes fails with [`AppError::Conflict`].
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = Category::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| match db_err(e) {
                AppError::Conflict(_) => {
                    AppError::Conflict("Category has recorded votes".to_string())
                }
                other => other,
            })?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Category: {id}")));
        }
        Ok(())
    }

    /// Count all categories.
    pub async fn count(&self) -> AppResult<u64> {
        Category::find()
            .count(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Count categories with a phase open for voting.
    pub async fn count_voting_open(&self) -> AppResult<u64> {
        Category::find()
            .filter(category::Column::VotingOpen.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Move a category from one of `from` to `to`.
    pub async fn transition(
        &self,
        id: &str,
        from: &[PhaseState],
        to: PhaseState,
    ) -> AppResult<category::Model> {
        compare_and_set(self.db.as_ref(), id, from, to).await?;
        self.get_by_id(id).await
    }

    /// Replace the finalist set of a `Phase1Closed` category.
    ///
    /// Runs in one transaction: the guarded no-op transition locks the row and
    /// checks the state, then every existing link is deleted before the new
    /// set is inserted. Unknown nominee IDs abort with [`AppError::NotFound`],
    /// inactive ones with [`AppError::BadRequest`].
    pub async fn replace_finalists(
        &self,
        id: &str,
        nominee_ids: &[String],
        links: Vec<nominee_category::ActiveModel>,
    ) -> AppResult<Vec<nominee_category::Model>> {
        let txn = self.db.begin().await.map_err(db_err)?;

        compare_and_set(
            &txn,
            id,
            &[PhaseState::Phase1Closed],
            PhaseState::Phase1Closed,
        )
        .await?;

        if !nominee_ids.is_empty() {
            let found = Nominee::find()
                .filter(nominee::Column::Id.is_in(nominee_ids.to_vec()))
                .all(&txn)
                .await
                .map_err(db_err)?;

            let missing: Vec<&str> = nominee_ids
                .iter()
                .filter(|id| !found.iter().any(|n| &n.id == *id))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(AppError::NotFound(format!(
                    "Nominee: {}",
                    missing.join(", ")
                )));
            }

            let inactive: Vec<&str> = found
                .iter()
                .filter(|n| !n.is_active)
                .map(|n| n.id.as_str())
                .collect();
            if !inactive.is_empty() {
                return Err(AppError::BadRequest(format!(
                    "Inactive nominees cannot be finalists: {}",
                    inactive.join(", ")
                )));
            }
        }

        NomineeCategory::delete_many()
            .filter(nominee_category::Column::CategoryId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if !links.is_empty() {
            NomineeCategory::insert_many(links)
                .exec_without_returning(&txn)
                .await
                .map_err(db_err)?;
        }

        let finalists = NomineeCategory::find()
            .filter(nominee_category::Column::CategoryId.eq(id))
            .all(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(finalists)
    }

    /// Open phase 2. Fails with [`AppError::InvalidState`] unless the
    /// category is `Phase1Closed` with at least one finalist.
    pub async fn start_phase_2(&self, id: &str) -> AppResult<category::Model> {
        let txn = self.db.begin().await.map_err(db_err)?;

        compare_and_set(
            &txn,
            id,
            &[PhaseState::Phase1Closed],
            PhaseState::Phase2Active,
        )
        .await?;

        let finalists = NomineeCategory::find()
            .filter(nominee_category::Column::CategoryId.eq(id))
            .count(&txn)
            .await
            .map_err(db_err)?;

        if finalists == 0 {
            return Err(AppError::InvalidState(format!(
                "Category {id} has no finalists"
            )));
        }

        let updated = Category::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("Category: {id}")))?;

        txn.commit().await.map_err(db_err)?;
        Ok(updated)
    }
}

/// Guarded state update. Writes the legacy flags from `to` in the same
/// statement; zero affected rows is reported as `NotFound` or `InvalidState`.
async fn compare_and_set<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    from: &[PhaseState],
    to: PhaseState,
) -> AppResult<()> {
    let flags = to.legacy_flags();
    let now: DateTimeWithTimeZone = Utc::now().into();

    let result = Category::update_many()
        .col_expr(category::Column::PhaseState, Expr::value(to.as_str()))
        .col_expr(category::Column::VotingPhase, Expr::value(flags.voting_phase))
        .col_expr(category::Column::Phase1Active, Expr::value(flags.phase_1_active))
        .col_expr(category::Column::Phase2Active, Expr::value(flags.phase_2_active))
        .col_expr(category::Column::IsFinalized, Expr::value(flags.is_finalized))
        .col_expr(category::Column::VotingOpen, Expr::value(flags.voting_open))
        .col_expr(category::Column::UpdatedAt, Expr::value(now))
        .filter(category::Column::Id.eq(id))
        .filter(category::Column::PhaseState.is_in(from.iter().map(|s| s.as_str())))
        .exec(conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected > 0 {
        return Ok(());
    }

    let current = current_state(conn, id).await?;
    Err(AppError::InvalidState(format!(
        "Category {id} is {current}, cannot move to {to}"
    )))
}

/// Lock the category row for the rest of the transaction, provided it is in
/// `state`. Writes nothing but the unchanged state.
pub(super) async fn lock_in_state<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    state: PhaseState,
) -> AppResult<()> {
    let result = Category::update_many()
        .col_expr(category::Column::PhaseState, Expr::value(state.as_str()))
        .filter(category::Column::Id.eq(id))
        .filter(category::Column::PhaseState.eq(state.as_str()))
        .exec(conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected > 0 {
        return Ok(());
    }

    let current = current_state(conn, id).await?;
    Err(AppError::InvalidState(format!(
        "Category {id} is {current}, expected {state}"
    )))
}

async fn current_state<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<PhaseState> {
    Category::find_by_id(id)
        .one(conn)
        .await
        .map_err(db_err)?
        .map(|c| c.phase_state)
        .ok_or_else(|| AppError::NotFound(format!("Category: {id}")))
}

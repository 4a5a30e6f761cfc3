//! Finalist (nominee-category link) repository.

use std::sync::Arc;

use crate::db_err;
use crate::entities::{NomineeCategory, nominee_category};
use awards_common::AppResult;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

/// Finalist repository for database operations.
#[derive(Clone)]
pub struct FinalistRepository {
    db: Arc<DatabaseConnection>,
}

impl FinalistRepository {
    /// Create a new finalist repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Nominee IDs linked to a category.
    pub async fn nominee_ids(&self, category_id: &str) -> AppResult<Vec<String>> {
        let links = NomineeCategory::find()
            .filter(nominee_category::Column::CategoryId.eq(category_id))
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(links.into_iter().map(|l| l.nominee_id).collect())
    }

    /// All links of the given categories.
    pub async fn find_by_categories(
        &self,
        category_ids: &[String],
    ) -> AppResult<Vec<nominee_category::Model>> {
        if category_ids.is_empty() {
            return Ok(vec![]);
        }

        NomineeCategory::find()
            .filter(nominee_category::Column::CategoryId.is_in(category_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Whether the nominee is a finalist of the category.
    pub async fn is_finalist(&self, category_id: &str, nominee_id: &str) -> AppResult<bool> {
        let count = NomineeCategory::find()
            .filter(nominee_category::Column::CategoryId.eq(category_id))
            .filter(nominee_category::Column::NomineeId.eq(nominee_id))
            .count(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn link(id: &str, nominee_id: &str, category_id: &str) -> nominee_category::Model {
        nominee_category::Model {
            id: id.to_string(),
            nominee_id: nominee_id.to_string(),
            category_id: category_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_nominee_ids() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[link("l1", "x", "cat1"), link("l2", "y", "cat1")]])
                .into_connection(),
        );

        let repo = FinalistRepository::new(db);
        let ids = repo.nominee_ids("cat1").await.unwrap();

        assert_eq!(ids, vec!["x".to_string(), "y".to_string()]);
    }
}

//! Catalog service: categories and nominees.

use awards_common::{AppError, AppResult, IdGenerator};
use awards_db::{
    entities::{
        category::{self, PhaseState},
        nominee,
    },
    repositories::{CategoryRepository, NomineeRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::storage::ImageService;

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 512))]
    pub banner_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Input for updating a category. An empty string clears an optional field.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    pub id: String,
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 512))]
    pub banner_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Input for creating a nominee.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateNomineeInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 512))]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Input for updating a nominee. An empty string clears an optional field.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateNomineeInput {
    pub id: String,
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 512))]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Catalog service for business logic.
#[derive(Clone)]
pub struct CatalogService {
    category_repo: CategoryRepository,
    nominee_repo: NomineeRepository,
    images: ImageService,
    id_gen: IdGenerator,
}

impl CatalogService {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(
        category_repo: CategoryRepository,
        nominee_repo: NomineeRepository,
        images: ImageService,
    ) -> Self {
        Self {
            category_repo,
            nominee_repo,
            images,
            id_gen: IdGenerator::new(),
        }
    }

    /// List all categories.
    pub async fn list_categories(&self) -> AppResult<Vec<category::Model>> {
        self.category_repo.list(false).await
    }

    /// Create a category. New categories start in `Pending`.
    pub async fn create_category(&self, input: CreateCategoryInput) -> AppResult<category::Model> {
        input.validate()?;

        let state = PhaseState::Pending;
        let flags = state.legacy_flags();
        let model = category::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(required_name(&input.name)?),
            description: Set(non_empty(input.description)),
            banner_url: Set(non_empty(input.banner_url)),
            is_active: Set(input.is_active.unwrap_or(true)),
            phase_state: Set(state),
            voting_phase: Set(flags.voting_phase),
            phase_1_active: Set(flags.phase_1_active),
            phase_2_active: Set(flags.phase_2_active),
            is_finalized: Set(flags.is_finalized),
            voting_open: Set(flags.voting_open),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.category_repo.create(model).await?;
        tracing::info!(category_id = %created.id, "Category created");
        Ok(created)
    }

    /// Update a category's details. Phase columns are never touched here.
    pub async fn update_category(&self, input: UpdateCategoryInput) -> AppResult<category::Model> {
        input.validate()?;

        let category = self.category_repo.get_by_id(&input.id).await?;
        let old_banner = category.banner_url.clone();
        let mut active: category::ActiveModel = category.into();

        if let Some(name) = input.name {
            active.name = Set(required_name(&name)?);
        }
        if let Some(description) = input.description {
            active.description = Set(non_empty(Some(description)));
        }
        let banner_changed = input.banner_url.is_some();
        if let Some(banner_url) = input.banner_url {
            active.banner_url = Set(non_empty(Some(banner_url)));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.category_repo.update(active).await?;

        if banner_changed && old_banner != updated.banner_url {
            self.images.remove_best_effort(old_banner.as_deref()).await;
        }

        Ok(updated)
    }

    /// Delete a category and, best-effort, its banner.
    pub async fn delete_category(&self, id: &str) -> AppResult<()> {
        let category = self.category_repo.get_by_id(id).await?;
        self.category_repo.delete(id).await?;
        self.images
            .remove_best_effort(category.banner_url.as_deref())
            .await;

        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// List all nominees.
    pub async fn list_nominees(&self) -> AppResult<Vec<nominee::Model>> {
        self.nominee_repo.list(false).await
    }

    /// Create a nominee.
    pub async fn create_nominee(&self, input: CreateNomineeInput) -> AppResult<nominee::Model> {
        input.validate()?;

        let model = nominee::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(required_name(&input.name)?),
            description: Set(non_empty(input.description)),
            image_url: Set(non_empty(input.image_url)),
            is_active: Set(input.is_active.unwrap_or(true)),
            vote_count: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.nominee_repo.create(model).await?;
        tracing::info!(nominee_id = %created.id, "Nominee created");
        Ok(created)
    }

    /// Update a nominee's details.
    pub async fn update_nominee(&self, input: UpdateNomineeInput) -> AppResult<nominee::Model> {
        input.validate()?;

        let nominee = self.nominee_repo.get_by_id(&input.id).await?;
        let old_image = nominee.image_url.clone();
        let mut active: nominee::ActiveModel = nominee.into();

        if let Some(name) = input.name {
            active.name = Set(required_name(&name)?);
        }
        if let Some(description) = input.description {
            active.description = Set(non_empty(Some(description)));
        }
        let image_changed = input.image_url.is_some();
        if let Some(image_url) = input.image_url {
            active.image_url = Set(non_empty(Some(image_url)));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.nominee_repo.update(active).await?;

        if image_changed && old_image != updated.image_url {
            self.images.remove_best_effort(old_image.as_deref()).await;
        }

        Ok(updated)
    }

    /// Delete a nominee and, best-effort, its image.
    pub async fn delete_nominee(&self, id: &str) -> AppResult<()> {
        let nominee = self.nominee_repo.get_by_id(id).await?;
        self.nominee_repo.delete(id).await?;
        self.images
            .remove_best_effort(nominee.image_url.as_deref())
            .await;

        tracing::info!(nominee_id = %id, "Nominee deleted");
        Ok(())
    }
}

fn required_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name: must not be blank".to_string()));
    }
    Ok(name.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" a ".to_string())), Some("a".to_string()));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_required_name() {
        assert_eq!(required_name("  Best Song ").unwrap(), "Best Song");
        assert!(matches!(required_name(" \t "), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_blank_names_are_rejected_before_writing() {
        use crate::services::storage::NoOpStorage;
        use awards_common::config::StorageConfig;
        use sea_orm::{DatabaseBackend, MockDatabase};
        use std::sync::Arc;

        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let images = ImageService::new(
            Arc::new(NoOpStorage::new("/files".to_string())),
            &StorageConfig::default(),
        );
        let service = CatalogService::new(
            CategoryRepository::new(Arc::clone(&db)),
            NomineeRepository::new(db),
            images,
        );

        let category = service
            .create_category(CreateCategoryInput {
                name: "   ".to_string(),
                description: None,
                banner_url: None,
                is_active: None,
            })
            .await;
        assert!(matches!(category, Err(AppError::Validation(_))));

        let nominee = service
            .create_nominee(CreateNomineeInput {
                name: "\n".to_string(),
                description: None,
                image_url: None,
                is_active: None,
            })
            .await;
        assert!(matches!(nominee, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_create_input_validation() {
        let input = CreateCategoryInput {
            name: String::new(),
            description: None,
            banner_url: None,
            is_active: None,
        };
        assert!(input.validate().is_err());
    }
}

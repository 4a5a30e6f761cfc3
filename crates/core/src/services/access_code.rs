//! Access code service.

use awards_common::{AppError, AppResult, IdGenerator};
use awards_db::{entities::access_code, repositories::AccessCodeRepository};
use chrono::Utc;
use sea_orm::Set;
use serde::Serialize;

/// Prefix of generated access codes.
pub const ACCESS_CODE_PREFIX: &str = "MONGA";

const MAX_CODE_LEN: usize = 64;

/// All codes with usage counts.
#[derive(Debug, Clone, Serialize)]
pub struct AccessCodeList {
    pub codes: Vec<access_code::Model>,
    pub total: usize,
    pub used: usize,
    pub available: usize,
}

/// Access code service for business logic.
#[derive(Clone)]
pub struct AccessCodeService {
    code_repo: AccessCodeRepository,
    id_gen: IdGenerator,
}

impl AccessCodeService {
    /// Create a new access code service.
    #[must_use]
    pub const fn new(code_repo: AccessCodeRepository) -> Self {
        Self {
            code_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// List all codes, newest first.
    pub async fn list(&self) -> AppResult<AccessCodeList> {
        let codes = self.code_repo.list().await?;
        let used = codes.iter().filter(|c| c.is_used).count();

        Ok(AccessCodeList {
            total: codes.len(),
            used,
            available: codes.len() - used,
            codes,
        })
    }

    /// Create a code, generating one when `code` is absent.
    pub async fn create(&self, code: Option<String>) -> AppResult<access_code::Model> {
        let code = match code {
            Some(code) => normalize(&code)?,
            None => self.id_gen.generate_access_code(ACCESS_CODE_PREFIX),
        };

        let model = access_code::ActiveModel {
            id: Set(self.id_gen.generate()),
            code: Set(code),
            is_used: Set(false),
            used_by: Set(None),
            created_at: Set(Utc::now().into()),
            used_at: Set(None),
        };

        let created = self.code_repo.create(model).await?;
        tracing::info!(code_id = %created.id, "Access code created");
        Ok(created)
    }

    /// Delete an unused code.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.code_repo.delete_unused(id).await?;
        tracing::info!(code_id = %id, "Access code deleted");
        Ok(())
    }
}

/// Trim and uppercase a code, allowing `A-Z`, `0-9`, `_` and `-`.
fn normalize(code: &str) -> AppResult<String> {
    let code = code.trim().to_uppercase();

    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return Err(AppError::Validation(format!(
            "Access code must be 1 to {MAX_CODE_LEN} characters"
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::Validation(
            "Access code may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }

    Ok(code)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn code(id: &str, is_used: bool) -> access_code::Model {
        access_code::Model {
            id: id.to_string(),
            code: format!("MONGA2026_{id}"),
            is_used,
            used_by: None,
            created_at: Utc::now().into(),
            used_at: None,
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" monga2026_ab12cd ").unwrap(), "MONGA2026_AB12CD");
        assert!(normalize("").is_err());
        assert!(normalize("bad code").is_err());
        assert!(normalize(&"A".repeat(65)).is_err());
    }

    #[tokio::test]
    async fn test_list_counts() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[code("A", true), code("B", false), code("C", false)]])
                .into_connection(),
        );

        let service = AccessCodeService::new(AccessCodeRepository::new(db));
        let list = service.list().await.unwrap();

        assert_eq!((list.total, list.used, list.available), (3, 1, 2));
    }
}

//! Vote recorder.
//!
//! Eligibility is checked against the vote rows before anything is written;
//! the unique indexes on the vote tables then decide any race between two
//! requests of the same voter.

use std::collections::HashMap;

use awards_common::{AppError, AppResult, IdGenerator};
use awards_db::{
    entities::{
        category::{self, Phase, PhaseState},
        nominee, phase_1_vote, phase_2_vote,
    },
    repositories::{CategoryRepository, FinalistRepository, NomineeRepository, VoteRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::auth::AuthContext;

/// A vote attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct CastVoteInput {
    pub category_id: String,
    pub nominee_id: String,
    pub phase: Phase,
}

/// Outcome of a recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteReceipt {
    pub category_id: String,
    pub nominee_id: String,
    pub phase: Phase,
    pub votes_cast: i32,
    pub max_votes: i32,
}

/// A voter's standing in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotingStatus {
    pub category_id: String,
    pub state: PhaseState,
    /// Phase currently accepting votes.
    pub open_phase: Option<Phase>,
    pub votes_cast: i32,
    pub max_votes: i32,
    pub remaining: i32,
    /// Nominees the voter chose in the open phase.
    pub nominee_ids: Vec<String>,
}

/// One category on the voter's ballot.
#[derive(Debug, Clone, Serialize)]
pub struct BallotEntry {
    pub category: category::Model,
    pub open_phase: Option<Phase>,
    /// Phase 1: every active nominee. Phase 2 and later: the finalists.
    pub nominees: Vec<nominee::Model>,
    pub votes_cast: i32,
    pub max_votes: i32,
    pub nominee_ids: Vec<String>,
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    category_repo: CategoryRepository,
    nominee_repo: NomineeRepository,
    finalist_repo: FinalistRepository,
    vote_repo: VoteRepository,
    nomination_cap: i32,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(
        category_repo: CategoryRepository,
        nominee_repo: NomineeRepository,
        finalist_repo: FinalistRepository,
        vote_repo: VoteRepository,
        nomination_cap: u32,
    ) -> Self {
        Self {
            category_repo,
            nominee_repo,
            finalist_repo,
            vote_repo,
            nomination_cap: nomination_cap as i32,
            id_gen: IdGenerator::new(),
        }
    }

    /// Votes allowed per voter and category in a phase.
    #[must_use]
    pub const fn max_votes(&self, phase: Phase) -> i32 {
        match phase {
            Phase::Nomination => self.nomination_cap,
            Phase::Final => 1,
        }
    }

    /// Validate and record one vote.
    pub async fn cast_vote(
        &self,
        auth: &AuthContext,
        input: CastVoteInput,
    ) -> AppResult<VoteReceipt> {
        if auth.is_reserved_admin {
            return Err(AppError::Forbidden(
                "The configured administrator cannot vote".to_string(),
            ));
        }

        let category = self.category_repo.get_by_id(&input.category_id).await?;
        if !category.is_active {
            return Err(AppError::NotEligible(format!(
                "Category {} is not open for voting",
                category.id
            )));
        }
        if category.phase_state.open_phase() != Some(input.phase) {
            return Err(phase_closed(&category, input.phase));
        }

        let nominee = self.nominee_repo.get_by_id(&input.nominee_id).await?;

        let receipt = match input.phase {
            Phase::Nomination => self.nominate(&auth.user_id, &category, &nominee).await?,
            Phase::Final => self.vote_final(&auth.user_id, &category, &nominee).await?,
        };

        tracing::info!(
            user_id = %auth.user_id,
            category_id = %receipt.category_id,
            nominee_id = %receipt.nominee_id,
            phase = %receipt.phase,
            votes_cast = receipt.votes_cast,
            "Vote recorded"
        );

        Ok(receipt)
    }

    async fn nominate(
        &self,
        user_id: &str,
        category: &category::Model,
        nominee: &nominee::Model,
    ) -> AppResult<VoteReceipt> {
        if !nominee.is_active {
            return Err(AppError::NotEligible(format!(
                "Nominee {} is not active",
                nominee.id
            )));
        }

        // Each lost race means another row now exists, so the checks
        // terminate within cap + 1 rounds.
        for _ in 0..=self.nomination_cap {
            let existing = self.vote_repo.phase_1_votes(user_id, &category.id).await?;

            if existing.iter().any(|v| v.nominee_id == nominee.id) {
                return Err(AppError::AlreadyVoted(format!(
                    "Nominee {} is already nominated in category {}",
                    nominee.id, category.id
                )));
            }

            let Some(slot) = (1..=self.nomination_cap).find(|s| existing.iter().all(|v| v.slot != *s))
            else {
                return Err(AppError::CapReached(format!(
                    "At most {} nominations per category",
                    self.nomination_cap
                )));
            };

            let vote = phase_1_vote::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user_id.to_string()),
                nominee_id: Set(nominee.id.clone()),
                category_id: Set(category.id.clone()),
                slot: Set(slot),
                created_at: Set(Utc::now().into()),
            };

            match self
                .vote_repo
                .record_phase_1(vote, self.id_gen.generate(), self.nomination_cap)
                .await
            {
                Ok(progress) => {
                    return Ok(VoteReceipt {
                        category_id: category.id.clone(),
                        nominee_id: nominee.id.clone(),
                        phase: Phase::Nomination,
                        votes_cast: progress.votes_cast,
                        max_votes: progress.max_votes,
                    });
                }
                Err(AppError::InvalidState(_)) => {
                    return Err(phase_closed(category, Phase::Nomination));
                }
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(
                        user_id = %user_id,
                        category_id = %category.id,
                        slot = slot,
                        "Concurrent nomination, re-checking"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict(
            "Nomination could not be recorded, please retry".to_string(),
        ))
    }

    async fn vote_final(
        &self,
        user_id: &str,
        category: &category::Model,
        nominee: &nominee::Model,
    ) -> AppResult<VoteReceipt> {
        if self
            .vote_repo
            .phase_2_vote(user_id, &category.id)
            .await?
            .is_some()
        {
            return Err(already_voted_final(&category.id));
        }

        if !self
            .finalist_repo
            .is_finalist(&category.id, &nominee.id)
            .await?
        {
            return Err(AppError::NotEligible(format!(
                "Nominee {} is not a finalist of category {}",
                nominee.id, category.id
            )));
        }

        let vote = phase_2_vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            nominee_id: Set(nominee.id.clone()),
            category_id: Set(category.id.clone()),
            created_at: Set(Utc::now().into()),
        };

        let progress = self
            .vote_repo
            .record_phase_2(vote, self.id_gen.generate())
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => already_voted_final(&category.id),
                AppError::InvalidState(_) => phase_closed(category, Phase::Final),
                other => other,
            })?;

        Ok(VoteReceipt {
            category_id: category.id.clone(),
            nominee_id: nominee.id.clone(),
            phase: Phase::Final,
            votes_cast: progress.votes_cast,
            max_votes: progress.max_votes,
        })
    }

    /// The voter's standing in a category, read from the vote rows.
    pub async fn voting_status(
        &self,
        auth: &AuthContext,
        category_id: &str,
    ) -> AppResult<VotingStatus> {
        let category = self.category_repo.get_by_id(category_id).await?;
        let open_phase = category.phase_state.open_phase();
        let phase = open_phase.unwrap_or_else(|| category.phase_state.results_phase());
        let max_votes = self.max_votes(phase);

        let nominee_ids: Vec<String> = if auth.is_reserved_admin {
            vec![]
        } else {
            match phase {
                Phase::Nomination => self
                    .vote_repo
                    .phase_1_votes(&auth.user_id, category_id)
                    .await?
                    .into_iter()
                    .map(|v| v.nominee_id)
                    .collect(),
                Phase::Final => self
                    .vote_repo
                    .phase_2_vote(&auth.user_id, category_id)
                    .await?
                    .into_iter()
                    .map(|v| v.nominee_id)
                    .collect(),
            }
        };

        let votes_cast = nominee_ids.len() as i32;
        Ok(VotingStatus {
            category_id: category.id,
            state: category.phase_state,
            open_phase,
            votes_cast,
            max_votes,
            remaining: if open_phase.is_some() {
                (max_votes - votes_cast).max(0)
            } else {
                0
            },
            nominee_ids,
        })
    }

    /// Every active category with its eligible nominees and the caller's
    /// choices.
    pub async fn ballot(&self, auth: &AuthContext) -> AppResult<Vec<BallotEntry>> {
        let categories = self.category_repo.list(true).await?;
        let nominees = self.nominee_repo.list(false).await?;
        let by_id: HashMap<&str, &nominee::Model> =
            nominees.iter().map(|n| (n.id.as_str(), n)).collect();

        let category_ids: Vec<String> = categories.iter().map(|c| c.id.clone()).collect();
        let mut finalists: HashMap<String, Vec<String>> = HashMap::new();
        for link in self.finalist_repo.find_by_categories(&category_ids).await? {
            finalists
                .entry(link.category_id)
                .or_default()
                .push(link.nominee_id);
        }

        // (category, phase) -> (votes_cast, max_votes)
        let mut progress: HashMap<(String, i32), (i32, i32)> = HashMap::new();
        let mut chosen: HashMap<(String, i32), Vec<String>> = HashMap::new();
        if !auth.is_reserved_admin {
            for row in self.vote_repo.progress_by_user(&auth.user_id).await? {
                progress.insert((row.category_id, row.phase), (row.votes_cast, row.max_votes));
            }
            for vote in self.vote_repo.phase_1_votes_by_user(&auth.user_id).await? {
                chosen
                    .entry((vote.category_id, Phase::Nomination.as_i32()))
                    .or_default()
                    .push(vote.nominee_id);
            }
            for vote in self.vote_repo.phase_2_votes_by_user(&auth.user_id).await? {
                chosen
                    .entry((vote.category_id, Phase::Final.as_i32()))
                    .or_default()
                    .push(vote.nominee_id);
            }
        }

        let entries = categories
            .into_iter()
            .map(|category| {
                let open_phase = category.phase_state.open_phase();
                let phase = open_phase.unwrap_or_else(|| category.phase_state.results_phase());

                let eligible: Vec<nominee::Model> = match phase {
                    Phase::Nomination => nominees.iter().filter(|n| n.is_active).cloned().collect(),
                    Phase::Final => {
                        let mut list: Vec<nominee::Model> = finalists
                            .get(&category.id)
                            .into_iter()
                            .flatten()
                            .filter_map(|id| by_id.get(id.as_str()).map(|n| (*n).clone()))
                            .collect();
                        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
                        list
                    }
                };

                let key = (category.id.clone(), phase.as_i32());
                let (votes_cast, max_votes) = progress
                    .get(&key)
                    .copied()
                    .unwrap_or((0, self.max_votes(phase)));

                BallotEntry {
                    open_phase,
                    nominees: eligible,
                    votes_cast,
                    max_votes,
                    nominee_ids: chosen.remove(&key).unwrap_or_default(),
                    category,
                }
            })
            .collect();

        Ok(entries)
    }
}

/// Also returned when a transition commits between the eligibility checks and
/// the insert.
fn phase_closed(category: &category::Model, phase: Phase) -> AppError {
    AppError::NotEligible(format!(
        "Category {} is not accepting phase {phase} votes",
        category.id
    ))
}

fn already_voted_final(category_id: &str) -> AppError {
    AppError::AlreadyVoted(format!(
        "A final vote was already cast in category {category_id}"
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_category(state: PhaseState, is_active: bool) -> category::Model {
        let flags = state.legacy_flags();
        category::Model {
            id: "cat1".to_string(),
            name: "Best Moment".to_string(),
            description: None,
            banner_url: None,
            is_active,
            phase_state: state,
            voting_phase: flags.voting_phase,
            phase_1_active: flags.phase_1_active,
            phase_2_active: flags.phase_2_active,
            is_finalized: flags.is_finalized,
            voting_open: flags.voting_open,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_service(db: MockDatabase) -> VoteService {
        let db = Arc::new(db.into_connection());
        VoteService::new(
            CategoryRepository::new(Arc::clone(&db)),
            NomineeRepository::new(Arc::clone(&db)),
            FinalistRepository::new(Arc::clone(&db)),
            VoteRepository::new(db),
            2,
        )
    }

    fn voter() -> AuthContext {
        AuthContext {
            user_id: "alice".to_string(),
            email: "alice@example.com".to_string(),
            is_admin: false,
            is_reserved_admin: false,
        }
    }

    fn input(phase: Phase) -> CastVoteInput {
        CastVoteInput {
            category_id: "cat1".to_string(),
            nominee_id: "x".to_string(),
            phase,
        }
    }

    #[tokio::test]
    async fn test_reserved_admin_cannot_vote() {
        let service = create_service(MockDatabase::new(DatabaseBackend::Postgres));
        let admin = AuthContext::reserved_admin("admin@example.com");

        let result = service.cast_vote(&admin, input(Phase::Nomination)).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_phase_mismatch_is_not_eligible() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_category(PhaseState::Phase1Active, true)]]);
        let service = create_service(db);

        let result = service.cast_vote(&voter(), input(Phase::Final)).await;
        assert!(matches!(result, Err(AppError::NotEligible(_))));
    }

    #[tokio::test]
    async fn test_inactive_category_is_not_eligible() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_category(PhaseState::Phase1Active, false)]]);
        let service = create_service(db);

        let result = service.cast_vote(&voter(), input(Phase::Nomination)).await;
        assert!(matches!(result, Err(AppError::NotEligible(_))));
    }

    #[tokio::test]
    async fn test_closed_category_is_not_eligible() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_category(PhaseState::Finalized, true)]]);
        let service = create_service(db);

        let result = service.cast_vote(&voter(), input(Phase::Final)).await;
        assert!(matches!(result, Err(AppError::NotEligible(_))));
    }

    #[tokio::test]
    async fn test_missing_category_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<category::Model>::new()]);
        let service = create_service(db);

        let result = service.cast_vote(&voter(), input(Phase::Nomination)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_max_votes() {
        let service = create_service(MockDatabase::new(DatabaseBackend::Postgres));
        assert_eq!(service.max_votes(Phase::Nomination), 2);
        assert_eq!(service.max_votes(Phase::Final), 1);
    }
}

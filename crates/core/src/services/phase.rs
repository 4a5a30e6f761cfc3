//! Phase state machine.
//!
//! ```text
//! Pending ──start_phase_1──▶ Phase1Active ──finish_phase_1──▶ Phase1Closed
//!                                 ▲                               │
//!                                 └────────start_phase_1──────────┤
//!                                                                 │ start_phase_2
//!                                                                 ▼ (≥ 1 finalist)
//!                    Finalized ◀──finish_phase_2── Phase2Active
//! ```
//!
//! Every transition is a guarded update on the predecessor state, so a
//! repeated or concurrent call fails with `InvalidState` and changes nothing.

use std::collections::HashSet;

use awards_common::{AppResult, IdGenerator};
use awards_db::{
    entities::{
        category::{self, Phase, PhaseState},
        nominee_category,
    },
    repositories::CategoryRepository,
};
use chrono::Utc;
use sea_orm::Set;
use serde::Serialize;

use super::results::{CategoryResults, ResultsService, ResultsView};

/// An admin-invoked state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    StartPhase1,
    FinishPhase1,
    StartPhase2,
    FinishPhase2,
}

impl Transition {
    /// States the transition may start from.
    #[must_use]
    pub const fn predecessors(self) -> &'static [PhaseState] {
        match self {
            Self::StartPhase1 => &[PhaseState::Pending, PhaseState::Phase1Closed],
            Self::FinishPhase1 => &[PhaseState::Phase1Active],
            Self::StartPhase2 => &[PhaseState::Phase1Closed],
            Self::FinishPhase2 => &[PhaseState::Phase2Active],
        }
    }

    /// State after the transition.
    #[must_use]
    pub const fn target(self) -> PhaseState {
        match self {
            Self::StartPhase1 => PhaseState::Phase1Active,
            Self::FinishPhase1 => PhaseState::Phase1Closed,
            Self::StartPhase2 => PhaseState::Phase2Active,
            Self::FinishPhase2 => PhaseState::Finalized,
        }
    }

    /// Whether the transition may start from `state`.
    #[must_use]
    pub fn allowed_from(self, state: PhaseState) -> bool {
        self.predecessors().contains(&state)
    }

    const fn name(self) -> &'static str {
        match self {
            Self::StartPhase1 => "start_phase_1",
            Self::FinishPhase1 => "finish_phase_1",
            Self::StartPhase2 => "start_phase_2",
            Self::FinishPhase2 => "finish_phase_2",
        }
    }
}

/// Phase-1 results with the suggested finalists pre-selected.
#[derive(Debug, Clone, Serialize)]
pub struct FinalistProposal {
    pub category: category::Model,
    pub results: CategoryResults,
    /// Top nominees by phase-1 votes. Nothing is committed until
    /// [`PhaseService::select_finalists`] is called.
    pub suggested_finalists: Vec<String>,
}

/// Phase service for business logic.
#[derive(Clone)]
pub struct PhaseService {
    category_repo: CategoryRepository,
    results: ResultsService,
    finalist_suggestions: usize,
    id_gen: IdGenerator,
}

impl PhaseService {
    /// Create a new phase service.
    #[must_use]
    pub const fn new(
        category_repo: CategoryRepository,
        results: ResultsService,
        finalist_suggestions: usize,
    ) -> Self {
        Self {
            category_repo,
            results,
            finalist_suggestions,
            id_gen: IdGenerator::new(),
        }
    }

    /// Open nominations. Also re-opens a closed phase 1 before phase 2 starts.
    pub async fn start_phase_1(&self, category_id: &str) -> AppResult<category::Model> {
        self.apply(category_id, Transition::StartPhase1).await
    }

    /// Close nominations and return the phase-1 ranking with suggestions.
    pub async fn finish_phase_1(&self, category_id: &str) -> AppResult<FinalistProposal> {
        let category = self.apply(category_id, Transition::FinishPhase1).await?;
        self.proposal(category).await
    }

    /// Phase-1 ranking with suggestions, without changing state.
    pub async fn phase_1_results(&self, category_id: &str) -> AppResult<FinalistProposal> {
        let category = self.category_repo.get_by_id(category_id).await?;
        self.proposal(category).await
    }

    /// Replace the finalist set of a category whose phase 1 is closed.
    ///
    /// Duplicate IDs are collapsed keeping the first occurrence. An empty
    /// list clears the set.
    pub async fn select_finalists(
        &self,
        category_id: &str,
        nominee_ids: Vec<String>,
    ) -> AppResult<Vec<String>> {
        let mut seen = HashSet::new();
        let nominee_ids: Vec<String> = nominee_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let now = Utc::now();
        let links = nominee_ids
            .iter()
            .map(|nominee_id| nominee_category::ActiveModel {
                id: Set(self.id_gen.generate()),
                nominee_id: Set(nominee_id.clone()),
                category_id: Set(category_id.to_string()),
                created_at: Set(now.into()),
            })
            .collect();

        self.category_repo
            .replace_finalists(category_id, &nominee_ids, links)
            .await?;

        tracing::info!(
            category_id = %category_id,
            finalists = nominee_ids.len(),
            "Finalists selected"
        );

        Ok(nominee_ids)
    }

    /// Open the final vote. Requires at least one finalist.
    pub async fn start_phase_2(&self, category_id: &str) -> AppResult<category::Model> {
        let category = self.category_repo.start_phase_2(category_id).await?;
        log_transition(category_id, Transition::StartPhase2);
        Ok(category)
    }

    /// Close the final vote. `Finalized` is terminal.
    pub async fn finish_phase_2(&self, category_id: &str) -> AppResult<category::Model> {
        self.apply(category_id, Transition::FinishPhase2).await
    }

    async fn apply(&self, category_id: &str, transition: Transition) -> AppResult<category::Model> {
        let category = self
            .category_repo
            .transition(category_id, transition.predecessors(), transition.target())
            .await?;
        log_transition(category_id, transition);
        Ok(category)
    }

    async fn proposal(&self, category: category::Model) -> AppResult<FinalistProposal> {
        let results = self
            .results
            .compute(&category, Phase::Nomination, ResultsView::Revealed)
            .await?;
        let suggested_finalists = results.top_n(self.finalist_suggestions);

        Ok(FinalistProposal {
            category,
            results,
            suggested_finalists,
        })
    }
}

fn log_transition(category_id: &str, transition: Transition) {
    tracing::info!(
        category_id = %category_id,
        transition = transition.name(),
        state = %transition.target(),
        "Category phase changed"
    );
}

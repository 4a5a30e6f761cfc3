//! Results aggregation.
//!
//! Counts are always taken from the vote table of exactly one phase. Equal
//! counts are ordered by nominee name, then nominee ID.

use std::collections::HashMap;

use awards_common::{AppError, AppResult};
use awards_db::{
    entities::{
        category::{self, Phase, PhaseState},
        nominee,
    },
    repositories::{
        CategoryRepository, FinalistRepository, NomineeRepository, NomineeTally, UserRepository,
        VoteRepository,
    },
};
use serde::{Deserialize, Serialize};

use super::auth::AuthContext;

/// How results are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultsView {
    /// Nominees in alphabetical order, counts withheld.
    Hidden,
    /// Full ranking.
    #[default]
    Revealed,
}

/// One nominee's line in a result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    pub nominee_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// 1-based
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
}

/// Results of one category in one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryResults {
    pub category_id: String,
    pub category_name: String,
    pub state: PhaseState,
    pub phase: Phase,
    pub view: ResultsView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_votes: Option<i64>,
    pub entries: Vec<ResultEntry>,
}

impl CategoryResults {
    /// Nominee IDs of the first `n` entries.
    #[must_use]
    pub fn top_n(&self, n: usize) -> Vec<String> {
        select_top_n(&self.entries, n)
    }
}

/// Admin dashboard statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub categories: u64,
    pub voting_open_categories: u64,
    pub nominees: u64,
    pub users: u64,
    pub phase_1_votes: u64,
    pub phase_2_votes: u64,
}

/// Rank the eligible nominees by their tallies.
///
/// Votes for nominees outside `eligible` are ignored, so the total only
/// covers the listed entries.
#[must_use]
pub fn rank(eligible: Vec<nominee::Model>, tallies: &[NomineeTally]) -> Vec<ResultEntry> {
    let counts: HashMap<&str, i64> = tallies
        .iter()
        .map(|t| (t.nominee_id.as_str(), t.votes))
        .collect();

    let mut scored: Vec<(nominee::Model, i64)> = eligible
        .into_iter()
        .map(|n| {
            let votes = counts.get(n.id.as_str()).copied().unwrap_or(0);
            (n, votes)
        })
        .collect();

    scored.sort_by(|(a, a_votes), (b, b_votes)| {
        b_votes
            .cmp(a_votes)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });

    let total: i64 = scored.iter().map(|(_, votes)| votes).sum();

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (n, votes))| ResultEntry {
            nominee_id: n.id,
            name: n.name,
            image_url: n.image_url,
            votes: Some(votes),
            percentage: Some(percentage(votes, total)),
            rank: Some(i + 1),
        })
        .collect()
}

/// `count / total * 100`, or 0 when nothing was cast.
#[must_use]
pub fn percentage(count: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Nominee IDs of the first `n` entries (fewer when the list is shorter).
///
/// This only suggests finalists; committing them is a separate call.
#[must_use]
pub fn select_top_n(entries: &[ResultEntry], n: usize) -> Vec<String> {
    entries
        .iter()
        .take(n)
        .map(|e| e.nominee_id.clone())
        .collect()
}

/// Alphabetical list with counts, percentages and ranks removed.
#[must_use]
pub fn hide(mut entries: Vec<ResultEntry>) -> Vec<ResultEntry> {
    entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.nominee_id.cmp(&b.nominee_id)));
    for entry in &mut entries {
        entry.votes = None;
        entry.percentage = None;
        entry.rank = None;
    }
    entries
}

/// Results service for business logic.
#[derive(Clone)]
pub struct ResultsService {
    category_repo: CategoryRepository,
    nominee_repo: NomineeRepository,
    finalist_repo: FinalistRepository,
    vote_repo: VoteRepository,
    user_repo: UserRepository,
}

impl ResultsService {
    /// Create a new results service.
    #[must_use]
    pub const fn new(
        category_repo: CategoryRepository,
        nominee_repo: NomineeRepository,
        finalist_repo: FinalistRepository,
        vote_repo: VoteRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            category_repo,
            nominee_repo,
            finalist_repo,
            vote_repo,
            user_repo,
        }
    }

    /// Results of a category.
    ///
    /// `phase` defaults to the phase shown for the category's state.
    /// Non-administrators may only read the final results of finalized
    /// categories.
    pub async fn get_results(
        &self,
        auth: &AuthContext,
        category_id: &str,
        phase: Option<Phase>,
        view: ResultsView,
    ) -> AppResult<CategoryResults> {
        let category = self.category_repo.get_by_id(category_id).await?;
        let phase = phase.unwrap_or_else(|| category.phase_state.results_phase());

        if !auth.is_admin && !(category.phase_state == PhaseState::Finalized && phase == Phase::Final)
        {
            return Err(AppError::Forbidden(
                "Results are not published for this category".to_string(),
            ));
        }

        self.compute(&category, phase, view).await
    }

    /// Final results of every active finalized category.
    pub async fn finalized_results(&self) -> AppResult<Vec<CategoryResults>> {
        let categories = self
            .category_repo
            .find_active_in_state(PhaseState::Finalized)
            .await?;

        let mut results = Vec::with_capacity(categories.len());
        for category in &categories {
            results.push(
                self.compute(category, Phase::Final, ResultsView::Revealed)
                    .await?,
            );
        }
        Ok(results)
    }

    /// Admin dashboard statistics.
    pub async fn overview(&self) -> AppResult<Overview> {
        Ok(Overview {
            categories: self.category_repo.count().await?,
            voting_open_categories: self.category_repo.count_voting_open().await?,
            nominees: self.nominee_repo.count().await?,
            users: self.user_repo.count().await?,
            phase_1_votes: self.vote_repo.count(Phase::Nomination).await?,
            phase_2_votes: self.vote_repo.count(Phase::Final).await?,
        })
    }

    pub(crate) async fn compute(
        &self,
        category: &category::Model,
        phase: Phase,
        view: ResultsView,
    ) -> AppResult<CategoryResults> {
        let eligible = self.eligible_nominees(&category.id, phase).await?;
        let tallies = self.vote_repo.tally(&category.id, phase).await?;
        let entries = rank(eligible, &tallies);

        let (entries, total_votes) = match view {
            ResultsView::Revealed => {
                let total = entries.iter().filter_map(|e| e.votes).sum();
                (entries, Some(total))
            }
            ResultsView::Hidden => (hide(entries), None),
        };

        Ok(CategoryResults {
            category_id: category.id.clone(),
            category_name: category.name.clone(),
            state: category.phase_state,
            phase,
            view,
            total_votes,
            entries,
        })
    }

    /// Phase 1: every active nominee. Phase 2: the category's finalists.
    async fn eligible_nominees(
        &self,
        category_id: &str,
        phase: Phase,
    ) -> AppResult<Vec<nominee::Model>> {
        match phase {
            Phase::Nomination => self.nominee_repo.list(true).await,
            Phase::Final => {
                let ids = self.finalist_repo.nominee_ids(category_id).await?;
                self.nominee_repo.find_by_ids(&ids).await
            }
        }
    }
}

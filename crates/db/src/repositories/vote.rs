//! Vote repository.
//!
//! Vote rows are the source of truth. Every insert recomputes the voter's
//! progress row from them inside the same transaction.
//!
//! Each insert first locks the category row in the phase being voted on, so a
//! vote and a phase transition of the same category never interleave.

use std::sync::Arc;

use super::category::lock_in_state;
use crate::db_err;
use crate::entities::{
    Phase1Vote, Phase2Vote, UserVotingProgress,
    category::{Phase, PhaseState},
    phase_1_vote, phase_2_vote, user_voting_progress,
};
use awards_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone, sea_query::OnConflict,
};

/// Vote count of one nominee in one category and phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NomineeTally {
    pub nominee_id: String,
    pub votes: i64,
}

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Nominations of a voter in a category, in slot order.
    pub async fn phase_1_votes(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> AppResult<Vec<phase_1_vote::Model>> {
        Phase1Vote::find()
            .filter(phase_1_vote::Column::UserId.eq(user_id))
            .filter(phase_1_vote::Column::CategoryId.eq(category_id))
            .order_by_asc(phase_1_vote::Column::Slot)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// The voter's final vote in a category, if cast.
    pub async fn phase_2_vote(
        &self,
        user_id: &str,
        category_id: &str,
    ) -> AppResult<Option<phase_2_vote::Model>> {
        Phase2Vote::find()
            .filter(phase_2_vote::Column::UserId.eq(user_id))
            .filter(phase_2_vote::Column::CategoryId.eq(category_id))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// All nominations of a voter.
    pub async fn phase_1_votes_by_user(&self, user_id: &str) -> AppResult<Vec<phase_1_vote::Model>> {
        Phase1Vote::find()
            .filter(phase_1_vote::Column::UserId.eq(user_id))
            .order_by_asc(phase_1_vote::Column::Slot)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// All final votes of a voter.
    pub async fn phase_2_votes_by_user(&self, user_id: &str) -> AppResult<Vec<phase_2_vote::Model>> {
        Phase2Vote::find()
            .filter(phase_2_vote::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Insert a nomination and refresh the voter's phase-1 progress.
    ///
    /// A unique violation (same nominee, or the slot was taken by a concurrent
    /// request) surfaces as [`AppError::Conflict`] and nothing is written.
    /// A category no longer in `Phase1Active` fails with
    /// [`AppError::InvalidState`].
    pub async fn record_phase_1(
        &self,
        vote: phase_1_vote::ActiveModel,
        progress_id: String,
        max_votes: i32,
    ) -> AppResult<user_voting_progress::Model> {
        let category_id = set_value(&vote.category_id)?;
        let txn = self.db.begin().await.map_err(db_err)?;

        lock_in_state(&txn, &category_id, PhaseState::Phase1Active).await?;

        let vote = vote.insert(&txn).await.map_err(db_err)?;

        let votes_cast = Phase1Vote::find()
            .filter(phase_1_vote::Column::UserId.eq(vote.user_id.as_str()))
            .filter(phase_1_vote::Column::CategoryId.eq(vote.category_id.as_str()))
            .count(&txn)
            .await
            .map_err(db_err)?;

        let progress = upsert_progress(
            &txn,
            progress_id,
            &vote.user_id,
            &vote.category_id,
            Phase::Nomination,
            votes_cast as i32,
            max_votes,
        )
        .await?;

        txn.commit().await.map_err(db_err)?;
        Ok(progress)
    }

    /// Insert a final vote and refresh the voter's phase-2 progress.
    ///
    /// Fails with [`AppError::InvalidState`] unless the category is
    /// `Phase2Active`.
    pub async fn record_phase_2(
        &self,
        vote: phase_2_vote::ActiveModel,
        progress_id: String,
    ) -> AppResult<user_voting_progress::Model> {
        let category_id = set_value(&vote.category_id)?;
        let txn = self.db.begin().await.map_err(db_err)?;

        lock_in_state(&txn, &category_id, PhaseState::Phase2Active).await?;

        let vote = vote.insert(&txn).await.map_err(db_err)?;

        let votes_cast = Phase2Vote::find()
            .filter(phase_2_vote::Column::UserId.eq(vote.user_id.as_str()))
            .filter(phase_2_vote::Column::CategoryId.eq(vote.category_id.as_str()))
            .count(&txn)
            .await
            .map_err(db_err)?;

        let progress = upsert_progress(
            &txn,
            progress_id,
            &vote.user_id,
            &vote.category_id,
            Phase::Final,
            votes_cast as i32,
            1,
        )
        .await?;

        txn.commit().await.map_err(db_err)?;
        Ok(progress)
    }

    /// Per-nominee vote counts of a category in one phase.
    ///
    /// Nominees without votes are absent.
    pub async fn tally(&self, category_id: &str, phase: Phase) -> AppResult<Vec<NomineeTally>> {
        let rows: Vec<(String, i64)> = match phase {
            Phase::Nomination => Phase1Vote::find()
                .select_only()
                .column(phase_1_vote::Column::NomineeId)
                .column_as(phase_1_vote::Column::Id.count(), "votes")
                .filter(phase_1_vote::Column::CategoryId.eq(category_id))
                .group_by(phase_1_vote::Column::NomineeId)
                .into_tuple()
                .all(self.db.as_ref())
                .await
                .map_err(db_err)?,
            Phase::Final => Phase2Vote::find()
                .select_only()
                .column(phase_2_vote::Column::NomineeId)
                .column_as(phase_2_vote::Column::Id.count(), "votes")
                .filter(phase_2_vote::Column::CategoryId.eq(category_id))
                .group_by(phase_2_vote::Column::NomineeId)
                .into_tuple()
                .all(self.db.as_ref())
                .await
                .map_err(db_err)?,
        };

        Ok(rows
            .into_iter()
            .map(|(nominee_id, votes)| NomineeTally { nominee_id, votes })
            .collect())
    }

    /// Total votes recorded in a phase across all categories.
    pub async fn count(&self, phase: Phase) -> AppResult<u64> {
        match phase {
            Phase::Nomination => Phase1Vote::find().count(self.db.as_ref()).await,
            Phase::Final => Phase2Vote::find().count(self.db.as_ref()).await,
        }
        .map_err(db_err)
    }

    /// Progress rows of a voter.
    pub async fn progress_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<user_voting_progress::Model>> {
        UserVotingProgress::find()
            .filter(user_voting_progress::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }
}

fn set_value(value: &ActiveValue<String>) -> AppResult<String> {
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Ok(v.clone()),
        ActiveValue::NotSet => Err(AppError::Internal("Vote without category".to_string())),
    }
}

/// Insert or refresh the progress row of (user, category, phase).
async fn upsert_progress<C: ConnectionTrait>(
    conn: &C,
    id: String,
    user_id: &str,
    category_id: &str,
    phase: Phase,
    votes_cast: i32,
    max_votes: i32,
) -> AppResult<user_voting_progress::Model> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = user_voting_progress::ActiveModel {
        id: Set(id),
        user_id: Set(user_id.to_string()),
        category_id: Set(category_id.to_string()),
        phase: Set(phase.as_i32()),
        votes_cast: Set(votes_cast),
        max_votes: Set(max_votes),
        updated_at: Set(now),
    };

    UserVotingProgress::insert(model)
        .on_conflict(
            OnConflict::columns([
                user_voting_progress::Column::UserId,
                user_voting_progress::Column::CategoryId,
                user_voting_progress::Column::Phase,
            ])
            .update_columns([
                user_voting_progress::Column::VotesCast,
                user_voting_progress::Column::MaxVotes,
                user_voting_progress::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await
        .map_err(db_err)?;

    UserVotingProgress::find()
        .filter(user_voting_progress::Column::UserId.eq(user_id))
        .filter(user_voting_progress::Column::CategoryId.eq(category_id))
        .filter(user_voting_progress::Column::Phase.eq(phase.as_i32()))
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::Internal("Progress row missing after upsert".to_string()))
}

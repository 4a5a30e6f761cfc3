//! Category entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a category.
///
/// This column is authoritative; the boolean phase columns on [`Model`] are
/// written from it on every transition and exist for older readers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    /// No phase has run yet.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Nominations are open.
    #[sea_orm(string_value = "phase1_active")]
    Phase1Active,
    /// Nominations are closed; finalists are being selected.
    #[sea_orm(string_value = "phase1_closed")]
    Phase1Closed,
    /// The final vote is open.
    #[sea_orm(string_value = "phase2_active")]
    Phase2Active,
    /// Voting is over and official results are visible.
    #[sea_orm(string_value = "finalized")]
    Finalized,
}

/// Legacy column values implied by a [`PhaseState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyFlags {
    pub voting_phase: i32,
    pub phase_1_active: bool,
    pub phase_2_active: bool,
    pub is_finalized: bool,
    pub voting_open: bool,
}

impl PhaseState {
    /// Column values written alongside this state.
    #[must_use]
    pub const fn legacy_flags(self) -> LegacyFlags {
        let voting_phase = match self {
            Self::Pending | Self::Phase1Active | Self::Phase1Closed => 1,
            Self::Phase2Active | Self::Finalized => 2,
        };
        LegacyFlags {
            voting_phase,
            phase_1_active: matches!(self, Self::Phase1Active),
            phase_2_active: matches!(self, Self::Phase2Active),
            is_finalized: matches!(self, Self::Finalized),
            voting_open: matches!(self, Self::Phase1Active | Self::Phase2Active),
        }
    }
}

/// A voting round. Serialized as its number (`1` or `2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Phase {
    /// Phase 1: any active nominee, up to the nomination cap.
    Nomination,
    /// Phase 2: finalists only, one vote.
    Final,
}

impl Phase {
    /// Numeric value stored in `voting_phase` and progress rows.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Nomination => 1,
            Self::Final => 2,
        }
    }
}

impl TryFrom<i32> for Phase {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Nomination),
            2 => Ok(Self::Final),
            other => Err(format!("invalid phase: {other}")),
        }
    }
}

impl From<Phase> for i32 {
    fn from(phase: Phase) -> Self {
        phase.as_i32()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

impl PhaseState {
    /// The phase currently accepting votes, if any.
    #[must_use]
    pub const fn open_phase(self) -> Option<Phase> {
        match self {
            Self::Phase1Active => Some(Phase::Nomination),
            Self::Phase2Active => Some(Phase::Final),
            Self::Pending | Self::Phase1Closed | Self::Finalized => None,
        }
    }

    /// The phase whose tallies are shown for this state.
    #[must_use]
    pub const fn results_phase(self) -> Phase {
        match self {
            Self::Phase2Active | Self::Finalized => Phase::Final,
            Self::Pending | Self::Phase1Active | Self::Phase1Closed => Phase::Nomination,
        }
    }

    /// Stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Phase1Active => "phase1_active",
            Self::Phase1Closed => "phase1_closed",
            Self::Phase2Active => "phase2_active",
            Self::Finalized => "finalized",
        }
    }
}

impl std::fmt::Display for PhaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Banner image URL
    #[sea_orm(nullable)]
    pub banner_url: Option<String>,

    /// Visible to voters
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub phase_state: PhaseState,

    /// 1 or 2
    pub voting_phase: i32,

    pub phase_1_active: bool,

    pub phase_2_active: bool,

    pub is_finalized: bool,

    /// Legacy "voting open" flag
    pub voting_open: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::nominee_category::Entity")]
    NomineeCategory,
}

impl Related<super::nominee_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NomineeCategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_current_state_flag() {
        for state in [
            PhaseState::Pending,
            PhaseState::Phase1Active,
            PhaseState::Phase1Closed,
            PhaseState::Phase2Active,
            PhaseState::Finalized,
        ] {
            let flags = state.legacy_flags();
            let set = [flags.phase_1_active, flags.phase_2_active, flags.is_finalized]
                .iter()
                .filter(|f| **f)
                .count();
            assert!(set <= 1, "{state:?} sets {set} flags");
        }
    }

    #[test]
    fn test_voting_open_tracks_active_phases() {
        assert!(PhaseState::Phase1Active.legacy_flags().voting_open);
        assert!(PhaseState::Phase2Active.legacy_flags().voting_open);
        assert!(!PhaseState::Phase1Closed.legacy_flags().voting_open);
        assert!(!PhaseState::Finalized.legacy_flags().voting_open);
        assert_eq!(PhaseState::Finalized.legacy_flags().voting_phase, 2);
        assert_eq!(PhaseState::Pending.legacy_flags().voting_phase, 1);
    }

    #[test]
    fn test_results_phase() {
        assert_eq!(PhaseState::Phase1Closed.results_phase(), Phase::Nomination);
        assert_eq!(PhaseState::Phase2Active.results_phase(), Phase::Final);
        assert_eq!(PhaseState::Finalized.results_phase(), Phase::Final);
        assert_eq!(PhaseState::Finalized.open_phase(), None);
    }

    #[test]
    fn test_phase_number_round_trip() {
        assert_eq!(Phase::try_from(2), Ok(Phase::Final));
        assert!(Phase::try_from(3).is_err());
        assert_eq!(i32::from(Phase::Nomination), 1);
    }

    #[test]
    fn test_state_string_matches_stored_value() {
        assert_eq!(PhaseState::Phase1Closed.as_str(), PhaseState::Phase1Closed.to_value());
    }
}

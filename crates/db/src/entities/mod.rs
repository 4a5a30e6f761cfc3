//! Database entities.

#![allow(missing_docs)]

pub mod access_code;
pub mod category;
pub mod nominee;
pub mod nominee_category;
pub mod phase_1_vote;
pub mod phase_2_vote;
pub mod user;
pub mod user_voting_progress;

pub use access_code::Entity as AccessCode;
pub use category::Entity as Category;
pub use nominee::Entity as Nominee;
pub use nominee_category::Entity as NomineeCategory;
pub use phase_1_vote::Entity as Phase1Vote;
pub use phase_2_vote::Entity as Phase2Vote;
pub use user::Entity as User;
pub use user_voting_progress::Entity as UserVotingProgress;

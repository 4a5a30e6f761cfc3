//! Business logic services.

#![allow(missing_docs)]

pub mod access_code;
pub mod auth;
pub mod catalog;
pub mod phase;
pub mod results;
pub mod storage;
pub mod voting;

pub use access_code::{ACCESS_CODE_PREFIX, AccessCodeList, AccessCodeService};
pub use auth::{AuthContext, AuthService, RESERVED_ADMIN_ID, Session, SigninInput, SignupInput};
pub use catalog::{
    CatalogService, CreateCategoryInput, CreateNomineeInput, UpdateCategoryInput,
    UpdateNomineeInput,
};
pub use phase::{FinalistProposal, PhaseService, Transition};
pub use results::{
    CategoryResults, Overview, ResultEntry, ResultsService, ResultsView, select_top_n,
};
pub use storage::{
    ImageFolder, ImageService, LocalStorage, NoOpStorage, StorageBackend, StorageService,
    StoredImage,
};
pub use voting::{BallotEntry, CastVoteInput, VoteReceipt, VoteService, VotingStatus};

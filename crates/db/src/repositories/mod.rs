//! Database repositories.

mod access_code;
mod category;
mod finalist;
mod nominee;
mod user;
mod vote;

pub use access_code::AccessCodeRepository;
pub use category::CategoryRepository;
pub use finalist::FinalistRepository;
pub use nominee::NomineeRepository;
pub use user::UserRepository;
pub use vote::{NomineeTally, VoteRepository};

//! Local version-control adapters.

mod cli;
mod review;
mod tooling;

pub use cli::GitCli;
pub use review::{GIT_REVIEW_FALLBACK, GitReview};
pub use tooling::ProcessTooling;

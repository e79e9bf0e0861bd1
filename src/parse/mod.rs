//! Output parsers
//!
//! Every parser is total: malformed or empty input yields an empty or default
//! result, never an error. Operations decide what an empty result means.

pub mod blame;
pub mod diffstat;
pub mod log;
pub mod messages;
pub mod records;
pub mod reflog;
pub mod refs;
pub mod remote;
pub mod stash;
pub mod status;
pub mod tag;
pub mod transfer;
pub mod worktree;

pub use blame::BlameLine;
pub use diffstat::{DiffStat, FileStat};
pub use log::CommitRecord;
pub use reflog::ReflogEntry;
pub use refs::BranchInfo;
pub use remote::RemoteInfo;
pub use stash::StashEntry;
pub use status::{ChangeSet, StatusResult};
pub use transfer::{RefUpdate, RefUpdateKind};
pub use worktree::WorktreeInfo;

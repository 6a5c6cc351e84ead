pub mod challenge;
pub mod course;
pub mod enrollment;
pub mod leaderboard;
pub mod lesson;
pub mod pagination;
pub mod payment;
pub mod project;
pub mod question;
pub mod topic;
pub mod user;

pub use challenge::*;
pub use course::*;
pub use enrollment::*;
pub use leaderboard::*;
pub use lesson::*;
pub use pagination::*;
pub use payment::*;
pub use project::*;
pub use question::*;
pub use topic::*;
pub use user::*;

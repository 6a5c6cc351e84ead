pub mod auth_service;
pub mod challenge_service;
pub mod code_runner;
pub mod course_service;
pub mod enrollment_service;
pub mod leaderboard_service;
pub mod lesson_service;
pub mod payment_service;
pub mod project_service;
pub mod question_service;
pub mod topic_service;
pub mod user_service;

pub use code_runner::{CodeRunner, PistonRunner};

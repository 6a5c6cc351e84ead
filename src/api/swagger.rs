use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kodr API",
        version = "1.0.0",
        description = "REST API of the Kodr learning platform.\n\n**Authentication:** write endpoints and learner data require a JWT Bearer access token. Catalog, leaderboard, forum and showcase reads are public.\n\n**Features:**\n- Courses organized in topics and lessons with quizzes\n- Enrollment progress and XP\n- Premium subscriptions\n- Daily coding challenges graded by a sandboxed runner\n- Leaderboard, Q&A forum and project showcase",
        contact(
            name = "Kodr Team",
            email = "dev@kodr.dev"
        )
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::refresh_token,
        crate::api::auth::get_me,
        crate::api::auth::delete_account,

        // Users
        crate::api::users::get_profile,
        crate::api::users::update_profile,
        crate::api::users::get_public_profile,

        // Health
        crate::api::health::health_check,

        // Catalog
        crate::api::courses::list_courses,
        crate::api::courses::get_course,
        crate::api::courses::create_course,
        crate::api::courses::update_course,
        crate::api::courses::delete_course,
        crate::api::topics::list_topics,
        crate::api::topics::create_topic,
        crate::api::lessons::list_lessons,
        crate::api::lessons::get_lesson,
        crate::api::lessons::create_lesson,

        // Learning
        crate::api::enrollments::enroll,
        crate::api::enrollments::list_enrollments,
        crate::api::enrollments::get_enrollment,
        crate::api::enrollments::complete_lesson,

        // Payments
        crate::api::payments::checkout,
        crate::api::payments::confirm,
        crate::api::payments::refund,
        crate::api::payments::history,

        // Gamification
        crate::api::leaderboard::get_leaderboard,
        crate::api::leaderboard::get_my_rank,
        crate::api::challenges::get_today,
        crate::api::challenges::list_challenges,
        crate::api::challenges::create_challenge,
        crate::api::challenges::submit_solution,

        // Community
        crate::api::questions::list_questions,
        crate::api::questions::get_question,
        crate::api::questions::ask_question,
        crate::api::questions::post_answer,
        crate::api::questions::upvote_question,
        crate::api::projects::list_showcase,
        crate::api::projects::list_mine,
        crate::api::projects::create_project,
    ),
    components(
        schemas(
            // Auth & users
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RefreshTokenRequest,
            crate::services::auth_service::AuthResponse,
            crate::models::Role,
            crate::models::Streak,
            crate::models::PremiumStatus,
            crate::models::UserProfile,
            crate::models::PublicProfile,
            crate::models::UpdateProfileRequest,
            crate::api::health::HealthResponse,

            // Catalog
            crate::models::Difficulty,
            crate::models::CreateCourseRequest,
            crate::models::UpdateCourseRequest,
            crate::models::CourseResponse,
            crate::models::CreateTopicRequest,
            crate::models::UpdateTopicRequest,
            crate::models::TopicResponse,
            crate::models::QuizQuestion,
            crate::models::PublicQuizQuestion,
            crate::models::QuizResult,
            crate::models::CreateLessonRequest,
            crate::models::UpdateLessonRequest,
            crate::models::LessonSummary,
            crate::models::LessonResponse,

            // Learning & payments
            crate::models::EnrollmentStatus,
            crate::models::EnrollRequest,
            crate::models::CompleteLessonRequest,
            crate::models::LessonProgressResponse,
            crate::models::TopicProgressResponse,
            crate::models::EnrollmentResponse,
            crate::models::LessonCompletionResponse,
            crate::models::Plan,
            crate::models::PaymentStatus,
            crate::models::CheckoutRequest,
            crate::models::ConfirmPaymentRequest,
            crate::models::PaymentResponse,

            // Gamification
            crate::models::Period,
            crate::models::LeaderboardRow,
            crate::models::MyRankResponse,
            crate::models::TestCase,
            crate::models::PublicTestCase,
            crate::models::TestResult,
            crate::models::CreateChallengeRequest,
            crate::models::UpdateChallengeRequest,
            crate::models::SubmitSolutionRequest,
            crate::models::ChallengeResponse,
            crate::models::SubmissionResponse,

            // Community
            crate::models::AskQuestionRequest,
            crate::models::AnswerRequest,
            crate::models::QuestionResponse,
            crate::models::AnswerResponse,
            crate::models::QuestionThreadResponse,
            crate::models::VoteResponse,
            crate::models::CreateProjectRequest,
            crate::models::UpdateProjectRequest,
            crate::models::ProjectResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login, token refresh and account removal."),
        (name = "Users", description = "Own profile and public learner profiles."),
        (name = "Health", description = "Liveness and database connectivity."),
        (name = "Courses", description = "Course catalog. Instructors manage their own courses."),
        (name = "Topics", description = "Ordered topics inside a course."),
        (name = "Lessons", description = "Lesson content and quizzes. Premium courses need an active subscription."),
        (name = "Enrollments", description = "Enrollment, lesson completion and progress."),
        (name = "Payments", description = "Premium checkout, confirmation, refunds and history."),
        (name = "Leaderboard", description = "All-time and weekly XP rankings."),
        (name = "Challenges", description = "Daily coding challenges scored against test cases."),
        (name = "Q&A", description = "Questions, answers, votes and accepted answers."),
        (name = "Projects", description = "Learner project showcase."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /api/v1/auth/login"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/api/v1/courses"));
        assert!(paths.contains_key("/api/v1/enrollments/{course_id}/lessons/{lesson_id}/complete"));
        assert!(paths.contains_key("/api/v1/challenges/{id}/submit"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}

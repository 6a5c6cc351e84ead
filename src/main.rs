mod api;
mod config;
mod database;
mod jobs;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::middleware::auth::AuthMiddleware;
use crate::services::{CodeRunner, PistonRunner};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            return Err(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    log::info!("🚀 Starting Kodr backend...");

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&config.database_url).await.map_err(|e| {
        log::error!("❌ Failed to connect to MongoDB: {}", e);
        io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string())
    })?;
    log::info!("✅ MongoDB connected successfully");

    let db_data = web::Data::new(db.clone());
    let jwt_data = web::Data::new(config.jwt.clone());
    let runner: Arc<dyn CodeRunner> = Arc::new(PistonRunner::new(
        config.code_runner_url.clone(),
        config.code_runner_timeout_secs,
    ));
    let runner_data: web::Data<dyn CodeRunner> = web::Data::from(runner);
    log::info!("🧪 Code runner: {}", config.code_runner_url);

    // 📅 Background jobs
    log::info!("📅 Starting background jobs...");
    jobs::premium_expiry::start_premium_expiry_job(db.clone()).await;
    log::info!("✅ Background jobs started");

    let host = config.host.clone();
    let port = config.port;
    let cors_origins = config.cors_origins.clone();

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI document at: http://{}:{}/api-docs/openapi.json", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(jwt_data.clone())
            .app_data(runner_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))

            // ==================== ACCOUNTS ====================

            .service(
                web::scope("/api/v1/auth")
                    .route("/register", web::post().to(api::auth::register))
                    .route("/login", web::post().to(api::auth::login))
                    .route("/refresh", web::post().to(api::auth::refresh_token))
                    // Protected endpoints requiring JWT authentication
                    .service(
                        web::resource("/me")
                            .wrap(AuthMiddleware::required())
                            .route(web::get().to(api::auth::get_me))
                    )
                    .service(
                        web::resource("/account")
                            .wrap(AuthMiddleware::required())
                            .route(web::delete().to(api::auth::delete_account))
                    )
            )
            .service(
                web::scope("/api/v1/users")
                    .wrap(AuthMiddleware::required())
                    .route("/me", web::get().to(api::users::get_profile))
                    .route("/me", web::put().to(api::users::update_profile))
                    .route("/{id}", web::get().to(api::users::get_public_profile))
            )

            // ==================== CATALOG ====================
            // Reads are public; writes check roles in the services

            .service(
                web::scope("/api/v1/courses")
                    .wrap(AuthMiddleware::public_reads())
                    .route("", web::get().to(api::courses::list_courses))
                    .route("", web::post().to(api::courses::create_course))
                    .route("/{course_id}/topics", web::get().to(api::topics::list_topics))
                    .route("/{course_id}/topics", web::post().to(api::topics::create_topic))
                    .route("/{id}", web::get().to(api::courses::get_course))
                    .route("/{id}", web::put().to(api::courses::update_course))
                    .route("/{id}", web::delete().to(api::courses::delete_course))
            )
            .service(
                web::scope("/api/v1/topics")
                    .wrap(AuthMiddleware::public_reads())
                    .route("/{topic_id}/lessons", web::get().to(api::lessons::list_lessons))
                    .route("/{topic_id}/lessons", web::post().to(api::lessons::create_lesson))
                    .route("/{id}", web::put().to(api::topics::update_topic))
                    .route("/{id}", web::delete().to(api::topics::delete_topic))
            )
            .service(
                web::scope("/api/v1/lessons")
                    .wrap(AuthMiddleware::required())
                    .route("/{id}", web::get().to(api::lessons::get_lesson))
                    .route("/{id}", web::put().to(api::lessons::update_lesson))
                    .route("/{id}", web::delete().to(api::lessons::delete_lesson))
            )

            // ==================== LEARNING ====================

            .service(
                web::scope("/api/v1/enrollments")
                    .wrap(AuthMiddleware::required())
                    .route("", web::post().to(api::enrollments::enroll))
                    .route("", web::get().to(api::enrollments::list_enrollments))
                    .route(
                        "/{course_id}/lessons/{lesson_id}/complete",
                        web::post().to(api::enrollments::complete_lesson),
                    )
                    .route("/{course_id}", web::get().to(api::enrollments::get_enrollment))
                    .route("/{course_id}", web::delete().to(api::enrollments::unenroll))
            )
            .service(
                web::scope("/api/v1/payments")
                    .wrap(AuthMiddleware::required())
                    .route("", web::get().to(api::payments::history))
                    .route("/checkout", web::post().to(api::payments::checkout))
                    .route("/{id}/confirm", web::post().to(api::payments::confirm))
                    .route("/{id}/refund", web::post().to(api::payments::refund))
            )

            // ==================== GAMIFICATION ====================

            .service(
                web::scope("/api/v1/leaderboard")
                    .wrap(AuthMiddleware::public_reads())
                    .route("", web::get().to(api::leaderboard::get_leaderboard))
                    .route("/me", web::get().to(api::leaderboard::get_my_rank))
            )
            .service(
                web::scope("/api/v1/challenges")
                    .wrap(AuthMiddleware::public_reads())
                    .route("", web::get().to(api::challenges::list_challenges))
                    .route("", web::post().to(api::challenges::create_challenge))
                    .route("/today", web::get().to(api::challenges::get_today))
                    .route("/{id}/submit", web::post().to(api::challenges::submit_solution))
                    .route("/{id}/submissions/me", web::get().to(api::challenges::get_my_submission))
                    .route("/{id}", web::get().to(api::challenges::get_challenge))
                    .route("/{id}", web::put().to(api::challenges::update_challenge))
                    .route("/{id}", web::delete().to(api::challenges::delete_challenge))
            )

            // ==================== COMMUNITY ====================

            .service(
                web::scope("/api/v1/questions")
                    .wrap(AuthMiddleware::public_reads())
                    .route("", web::get().to(api::questions::list_questions))
                    .route("", web::post().to(api::questions::ask_question))
                    .route("/{id}/answers", web::post().to(api::questions::post_answer))
                    .route("/{id}/upvote", web::post().to(api::questions::upvote_question))
                    .route(
                        "/{id}/answers/{answer_id}/accept",
                        web::post().to(api::questions::accept_answer),
                    )
                    .route("/{id}", web::get().to(api::questions::get_question))
                    .route("/{id}", web::delete().to(api::questions::delete_question))
            )
            .service(
                web::scope("/api/v1/answers")
                    .wrap(AuthMiddleware::required())
                    .route("/{id}/upvote", web::post().to(api::questions::upvote_answer))
                    .route("/{id}", web::delete().to(api::questions::delete_answer))
            )
            .service(
                web::scope("/api/v1/projects")
                    .wrap(AuthMiddleware::public_reads())
                    .route("", web::get().to(api::projects::list_showcase))
                    .route("", web::post().to(api::projects::create_project))
                    .route("/mine", web::get().to(api::projects::list_mine))
                    .route("/{id}", web::get().to(api::projects::get_project))
                    .route("/{id}", web::put().to(api::projects::update_project))
                    .route("/{id}", web::delete().to(api::projects::delete_project))
            )
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

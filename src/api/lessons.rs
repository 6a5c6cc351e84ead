use actix_web::{web, HttpResponse};
use crate::database::MongoDB;
use crate::middleware::auth::{require_user, Claims};
use crate::models::{CreateLessonRequest, LessonResponse, LessonSummary, UpdateLessonRequest};
use crate::services::lesson_service;
use crate::utils::validation::{parse_object_id, ValidatedJson};
use crate::utils::AppResult;

#[utoipa::path(
    get,
    path = "/api/v1/topics/{topic_id}/lessons",
    tag = "Lessons",
    params(("topic_id" = String, Path, description = "Topic ID")),
    responses(
        (status = 200, description = "Lesson summaries in order", body = [LessonSummary]),
        (status = 404, description = "Topic not found")
    )
)]
pub async fn list_lessons(path: web::Path<String>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let topic_id = parse_object_id(&path, "topic")?;
    let lessons = lesson_service::list_lessons(&db, &topic_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "lessons": lessons,
        "total": lessons.len()
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}",
    tag = "Lessons",
    params(("id" = String, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Lesson content, quiz without answers", body = LessonResponse),
        (status = 402, description = "Premium subscription required"),
        (status = 404, description = "Lesson not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_lesson(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let lesson_id = parse_object_id(&path, "lesson")?;
    let lesson = lesson_service::get_lesson(&db, &claims, &lesson_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "lesson": lesson
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{topic_id}/lessons",
    tag = "Lessons",
    params(("topic_id" = String, Path, description = "Topic ID")),
    request_body = CreateLessonRequest,
    responses(
        (status = 201, description = "Lesson created", body = LessonResponse),
        (status = 403, description = "Not the course author")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_lesson(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<CreateLessonRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let topic_id = parse_object_id(&path, "topic")?;

    let lesson = lesson_service::create_lesson(&db, &claims, &topic_id, &request).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "lesson": lesson
    })))
}

pub async fn update_lesson(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<UpdateLessonRequest>,
) -> AppResult<HttpResponse> {
    let lesson_id = parse_object_id(&path, "lesson")?;
    let lesson = lesson_service::update_lesson(&db, &claims, &lesson_id, &request).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "lesson": lesson
    })))
}

pub async fn delete_lesson(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let lesson_id = parse_object_id(&path, "lesson")?;
    lesson_service::delete_lesson(&db, &claims, &lesson_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Lesson deleted"
    })))
}

use actix_web::{web, HttpResponse};
use crate::database::MongoDB;
use crate::middleware::auth::{require_user, Claims};
use crate::models::{CreateTopicRequest, TopicResponse, UpdateTopicRequest};
use crate::services::topic_service;
use crate::utils::validation::{parse_object_id, ValidatedJson};
use crate::utils::AppResult;

#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/topics",
    tag = "Topics",
    params(("course_id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Topics in order", body = [TopicResponse]),
        (status = 404, description = "Course not found")
    )
)]
pub async fn list_topics(path: web::Path<String>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let course_id = parse_object_id(&path, "course")?;
    let topics = topic_service::list_topics(&db, &course_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "topics": topics,
        "total": topics.len()
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/topics",
    tag = "Topics",
    params(("course_id" = String, Path, description = "Course ID")),
    request_body = CreateTopicRequest,
    responses(
        (status = 201, description = "Topic created", body = TopicResponse),
        (status = 403, description = "Not the course author")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_topic(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<CreateTopicRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let course_id = parse_object_id(&path, "course")?;

    let topic = topic_service::create_topic(&db, &claims, &course_id, &request).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "topic": topic
    })))
}

pub async fn update_topic(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<UpdateTopicRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let topic_id = parse_object_id(&path, "topic")?;

    let topic = topic_service::update_topic(&db, &claims, &topic_id, &request).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "topic": topic
    })))
}

/// DELETE /api/v1/topics/{id} - Remove o tópico e suas lições
pub async fn delete_topic(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let topic_id = parse_object_id(&path, "topic")?;

    topic_service::delete_topic(&db, &claims, &topic_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Topic deleted"
    })))
}

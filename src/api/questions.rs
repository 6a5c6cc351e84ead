use actix_web::{web, HttpResponse};
use crate::api::ok_page;
use crate::database::MongoDB;
use crate::middleware::auth::{require_user, Claims};
use crate::models::{
    AnswerRequest, AnswerResponse, AskQuestionRequest, QuestionQuery, QuestionResponse, QuestionThreadResponse,
    VoteResponse,
};
use crate::services::question_service;
use crate::utils::validation::{parse_object_id, ValidatedJson};
use crate::utils::AppResult;

/// GET /api/v1/questions - Perguntas do fórum, mais recentes primeiro
#[utoipa::path(
    get,
    path = "/api/v1/questions",
    tag = "Q&A",
    params(
        ("course_id" = Option<String>, Query, description = "Only questions about this course"),
        ("lesson_id" = Option<String>, Query, description = "Only questions about this lesson"),
        ("tag" = Option<String>, Query, description = "Tag filter"),
        ("page" = Option<i64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<i64>, Query, description = "Page size, max 100")
    ),
    responses(
        (status = 200, description = "Paginated questions")
    )
)]
pub async fn list_questions(query: web::Query<QuestionQuery>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let page = question_service::list_questions(&db, &query).await?;
    ok_page(&page)
}

#[utoipa::path(
    get,
    path = "/api/v1/questions/{id}",
    tag = "Q&A",
    params(("id" = String, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Question with answers, accepted first", body = QuestionThreadResponse),
        (status = 404, description = "Question not found")
    )
)]
pub async fn get_question(path: web::Path<String>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let question_id = parse_object_id(&path, "question")?;
    let thread = question_service::get_thread(&db, &question_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "thread": thread
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/questions",
    tag = "Q&A",
    request_body = AskQuestionRequest,
    responses(
        (status = 201, description = "Question posted", body = QuestionResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn ask_question(
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<AskQuestionRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let question = question_service::ask(&db, &claims.user_id()?, &request).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "question": question
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/questions/{id}/answers",
    tag = "Q&A",
    params(("id" = String, Path, description = "Question ID")),
    request_body = AnswerRequest,
    responses(
        (status = 201, description = "Answer posted", body = AnswerResponse),
        (status = 404, description = "Question not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn post_answer(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<AnswerRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let question_id = parse_object_id(&path, "question")?;

    let answer = question_service::answer(&db, &claims.user_id()?, &question_id, &request).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "answer": answer
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/questions/{id}/upvote",
    tag = "Q&A",
    params(("id" = String, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Vote toggled", body = VoteResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upvote_question(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let question_id = parse_object_id(&path, "question")?;

    let vote = question_service::toggle_question_vote(&db, &claims.user_id()?, &question_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "vote": vote
    })))
}

pub async fn accept_answer(
    path: web::Path<(String, String)>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let (question_id, answer_id) = path.into_inner();
    let question_id = parse_object_id(&question_id, "question")?;
    let answer_id = parse_object_id(&answer_id, "answer")?;

    let thread = question_service::accept_answer(&db, &claims, &question_id, &answer_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "thread": thread
    })))
}

pub async fn delete_question(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let question_id = parse_object_id(&path, "question")?;

    question_service::delete_question(&db, &claims, &question_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Question deleted"
    })))
}

// Answers (escopo /api/v1/answers, sempre autenticado)

pub async fn upvote_answer(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let answer_id = parse_object_id(&path, "answer")?;
    let vote = question_service::toggle_answer_vote(&db, &claims.user_id()?, &answer_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "vote": vote
    })))
}

pub async fn delete_answer(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let answer_id = parse_object_id(&path, "answer")?;
    question_service::delete_answer(&db, &claims, &answer_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Answer deleted"
    })))
}

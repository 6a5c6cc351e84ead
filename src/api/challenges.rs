use actix_web::{web, HttpResponse};
use crate::api::ok_page;
use crate::database::MongoDB;
use crate::middleware::auth::{require_user, Claims};
use crate::models::{
    ChallengeResponse, CreateChallengeRequest, PageQuery, SubmissionResponse, SubmitSolutionRequest,
    UpdateChallengeRequest,
};
use crate::services::{challenge_service, CodeRunner};
use crate::utils::validation::{parse_object_id, ValidatedJson};
use crate::utils::AppResult;

#[utoipa::path(
    get,
    path = "/api/v1/challenges/today",
    tag = "Challenges",
    responses(
        (status = 200, description = "Today's challenge, hidden test cases omitted", body = ChallengeResponse),
        (status = 404, description = "Nothing scheduled today")
    )
)]
pub async fn get_today(db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let challenge = challenge_service::today(&db).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "challenge": challenge
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/challenges",
    tag = "Challenges",
    params(PageQuery),
    responses(
        (status = 200, description = "Released challenges, newest first")
    )
)]
pub async fn list_challenges(query: web::Query<PageQuery>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let page = challenge_service::list(&db, &query).await?;
    ok_page(&page)
}

pub async fn get_challenge(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let challenge_id = parse_object_id(&path, "challenge")?;
    let viewer = claims.map(|c| c.into_inner());

    let challenge = challenge_service::get(&db, &challenge_id, viewer.as_ref()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "challenge": challenge
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/challenges",
    tag = "Challenges",
    request_body = CreateChallengeRequest,
    responses(
        (status = 201, description = "Challenge scheduled", body = ChallengeResponse),
        (status = 409, description = "Day already has a challenge")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_challenge(
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<CreateChallengeRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let challenge = challenge_service::create(&db, &claims, &request).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "challenge": challenge
    })))
}

pub async fn update_challenge(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<UpdateChallengeRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let challenge_id = parse_object_id(&path, "challenge")?;

    let challenge = challenge_service::update(&db, &claims, &challenge_id, &request).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "challenge": challenge
    })))
}

pub async fn delete_challenge(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let challenge_id = parse_object_id(&path, "challenge")?;

    challenge_service::delete(&db, &claims, &challenge_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Challenge deleted"
    })))
}

/// POST /api/v1/challenges/{id}/submit - Executa a solução contra os casos de teste
#[utoipa::path(
    post,
    path = "/api/v1/challenges/{id}/submit",
    tag = "Challenges",
    params(("id" = String, Path, description = "Challenge ID")),
    request_body = SubmitSolutionRequest,
    responses(
        (status = 201, description = "Solution scored", body = SubmissionResponse),
        (status = 400, description = "Challenge is not open today"),
        (status = 409, description = "Already submitted"),
        (status = 502, description = "Code runner unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_solution(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    runner: web::Data<dyn CodeRunner>,
    request: ValidatedJson<SubmitSolutionRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let challenge_id = parse_object_id(&path, "challenge")?;
    let user_id = claims.user_id()?;
    log::info!("🧪 POST /challenges/{}/submit - user {} ({:?})", challenge_id, user_id, request.language);

    let submission = challenge_service::submit(&db, runner.get_ref(), &user_id, &challenge_id, &request).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "submission": submission
    })))
}

pub async fn get_my_submission(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let challenge_id = parse_object_id(&path, "challenge")?;

    let submission = challenge_service::my_submission(&db, &claims.user_id()?, &challenge_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "submission": submission
    })))
}

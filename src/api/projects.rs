use actix_web::{web, HttpResponse};
use crate::api::ok_page;
use crate::database::MongoDB;
use crate::middleware::auth::{require_user, Claims};
use crate::models::{CreateProjectRequest, PageQuery, ProjectResponse, UpdateProjectRequest};
use crate::services::project_service;
use crate::utils::validation::{parse_object_id, ValidatedJson};
use crate::utils::AppResult;

#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "Projects",
    params(PageQuery),
    responses(
        (status = 200, description = "Public showcase, newest first")
    )
)]
pub async fn list_showcase(query: web::Query<PageQuery>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let page = project_service::showcase(&db, &query).await?;
    ok_page(&page)
}

#[utoipa::path(
    get,
    path = "/api/v1/projects/mine",
    tag = "Projects",
    responses(
        (status = 200, description = "Caller's projects, public and private", body = [ProjectResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_mine(claims: Option<web::ReqData<Claims>>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let projects = project_service::mine(&db, &claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "projects": projects,
        "total": projects.len()
    })))
}

pub async fn get_project(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let project_id = parse_object_id(&path, "project")?;
    let viewer = match claims {
        Some(c) => Some(c.user_id()?),
        None => None,
    };

    let project = project_service::get(&db, &project_id, viewer.as_ref()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "project": project
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "Projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_project(
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<CreateProjectRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let project = project_service::create(&db, &claims.user_id()?, &request).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "project": project
    })))
}

pub async fn update_project(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<UpdateProjectRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let project_id = parse_object_id(&path, "project")?;

    let project = project_service::update(&db, &claims.user_id()?, &project_id, &request).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "project": project
    })))
}

pub async fn delete_project(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let project_id = parse_object_id(&path, "project")?;

    project_service::delete(&db, &claims.user_id()?, &project_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Project deleted"
    })))
}

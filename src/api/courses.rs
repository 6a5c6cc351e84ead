use actix_web::{web, HttpResponse};
use crate::api::ok_page;
use crate::database::MongoDB;
use crate::middleware::auth::{require_user, Claims};
use crate::models::{CourseQuery, CourseResponse, CreateCourseRequest, DeleteQuery, UpdateCourseRequest};
use crate::services::course_service;
use crate::utils::validation::{parse_object_id, ValidatedJson};
use crate::utils::AppResult;

/// GET /api/v1/courses - Cursos publicados com filtros e paginação
#[utoipa::path(
    get,
    path = "/api/v1/courses",
    tag = "Courses",
    params(
        ("difficulty" = Option<String>, Query, description = "beginner | intermediate | advanced"),
        ("tag" = Option<String>, Query, description = "Tag filter"),
        ("search" = Option<String>, Query, description = "Case-insensitive title search"),
        ("page" = Option<i64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<i64>, Query, description = "Page size, max 100")
    ),
    responses(
        (status = 200, description = "Paginated published courses")
    )
)]
pub async fn list_courses(query: web::Query<CourseQuery>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let page = course_service::list_courses(&db, &query).await?;
    ok_page(&page)
}

/// GET /api/v1/courses/{id} - Curso com outline (tópicos e lições)
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    tag = "Courses",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course with ordered outline"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let course_id = parse_object_id(&path, "course")?;
    let viewer = claims.map(|c| c.into_inner());

    let course = course_service::get_course_detail(&db, &course_id, viewer.as_ref()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "course": course
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses",
    tag = "Courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 403, description = "Instructor or admin role required"),
        (status = 409, description = "Slug already taken")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_course(
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<CreateCourseRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    log::info!("📚 POST /courses - by {}", claims.sub);

    let course = course_service::create_course(&db, &claims, &request).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "course": course
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    tag = "Courses",
    params(("id" = String, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = CourseResponse),
        (status = 403, description = "Not the course author")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_course(
    path: web::Path<String>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<UpdateCourseRequest>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let course_id = parse_object_id(&path, "course")?;

    let course = course_service::update_course(&db, &claims, &course_id, &request).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "course": course
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    tag = "Courses",
    params(
        ("id" = String, Path, description = "Course ID"),
        ("hard" = Option<bool>, Query, description = "Remove permanently with topics, lessons and enrollments (admin)")
    ),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_course(
    path: web::Path<String>,
    query: web::Query<DeleteQuery>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let course_id = parse_object_id(&path, "course")?;

    course_service::delete_course(&db, &claims, &course_id, query.hard).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": if query.hard { "Course permanently deleted" } else { "Course deleted" }
    })))
}

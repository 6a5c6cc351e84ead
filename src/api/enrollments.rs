use actix_web::{web, HttpResponse};
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{CompleteLessonRequest, EnrollRequest, EnrollmentResponse, LessonCompletionResponse};
use crate::services::enrollment_service;
use crate::utils::validation::{parse_object_id, ValidatedJson};
use crate::utils::AppResult;

#[utoipa::path(
    post,
    path = "/api/v1/enrollments",
    tag = "Enrollments",
    request_body = EnrollRequest,
    responses(
        (status = 201, description = "Enrolled", body = EnrollmentResponse),
        (status = 402, description = "Premium course"),
        (status = 409, description = "Already enrolled")
    ),
    security(("bearer_auth" = []))
)]
pub async fn enroll(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<EnrollRequest>,
) -> AppResult<HttpResponse> {
    let user_id = claims.user_id()?;
    let course_id = parse_object_id(&request.course_id, "course")?;
    log::info!("🎓 POST /enrollments - user {} course {}", user_id, course_id);

    let enrollment = enrollment_service::enroll(&db, &user_id, &course_id).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "enrollment": enrollment
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments",
    tag = "Enrollments",
    responses(
        (status = 200, description = "Caller's enrollments", body = [EnrollmentResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_enrollments(claims: web::ReqData<Claims>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let enrollments = enrollment_service::list_enrollments(&db, &claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "enrollments": enrollments,
        "total": enrollments.len()
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/enrollments/{course_id}",
    tag = "Enrollments",
    params(("course_id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Progress in the course", body = EnrollmentResponse),
        (status = 404, description = "Not enrolled")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_enrollment(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let course_id = parse_object_id(&path, "course")?;
    let enrollment = enrollment_service::get_enrollment(&db, &claims.user_id()?, &course_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "enrollment": enrollment
    })))
}

/// POST /api/v1/enrollments/{course_id}/lessons/{lesson_id}/complete
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/{course_id}/lessons/{lesson_id}/complete",
    tag = "Enrollments",
    params(
        ("course_id" = String, Path, description = "Course ID"),
        ("lesson_id" = String, Path, description = "Lesson ID")
    ),
    request_body = CompleteLessonRequest,
    responses(
        (status = 200, description = "Quiz graded, progress updated", body = LessonCompletionResponse),
        (status = 400, description = "Wrong number of quiz answers"),
        (status = 409, description = "Progress changed concurrently, retry")
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_lesson(
    path: web::Path<(String, String)>,
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: ValidatedJson<CompleteLessonRequest>,
) -> AppResult<HttpResponse> {
    let (course_id, lesson_id) = path.into_inner();
    let course_id = parse_object_id(&course_id, "course")?;
    let lesson_id = parse_object_id(&lesson_id, "lesson")?;
    let user_id = claims.user_id()?;

    let result = enrollment_service::complete_lesson(&db, &user_id, &course_id, &lesson_id, &request).await?;
    log::info!(
        "✅ Lesson {} by {} - passed: {}, xp: {}",
        lesson_id,
        user_id,
        result.quiz.passed,
        result.xp_awarded
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "result": result
    })))
}

pub async fn unenroll(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let course_id = parse_object_id(&path, "course")?;
    enrollment_service::unenroll(&db, &claims.user_id()?, &course_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Enrollment removed"
    })))
}

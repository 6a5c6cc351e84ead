use crate::{
    database::{MongoDB, COURSES, ENROLLMENTS},
    models::{
        grade_quiz, CompleteLessonRequest, Course, Enrollment, EnrollmentResponse, LessonCompletionResponse,
    },
    services::course_service::{ensure_access, find_course, load_content},
    services::{leaderboard_service, lesson_service, user_service},
    utils::time::now_ts,
    utils::{AppError, AppResult},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use std::collections::HashMap;

async fn find_enrollment(db: &MongoDB, user_id: &ObjectId, course_id: &ObjectId) -> AppResult<Enrollment> {
    db.collection::<Enrollment>(ENROLLMENTS)
        .find_one(doc! { "user_id": user_id, "course_id": course_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Not enrolled in this course".into()))
}

pub async fn enroll(db: &MongoDB, user_id: &ObjectId, course_id: &ObjectId) -> AppResult<EnrollmentResponse> {
    let course = find_course(db, course_id).await?;
    if !course.is_published {
        return Err(AppError::NotFound("Course not found".into()));
    }

    let now = now_ts();
    let user = user_service::find_user(db, user_id).await?;
    ensure_access(&course, &user, now)?;

    let outline = load_content(db, course_id).await?.outline();
    let mut enrollment = Enrollment::new(*user_id, *course_id, &outline, now);

    // The unique (user_id, course_id) index rejects a second enrollment
    let result = db
        .collection::<Enrollment>(ENROLLMENTS)
        .insert_one(&enrollment)
        .await
        .map_err(|e| AppError::on_duplicate(e, "Already enrolled in this course"))?;
    enrollment.id = result.inserted_id.as_object_id();

    log::info!("🎓 User {} enrolled in course {} ({} lessons)", user_id, course_id, outline.lesson_count());

    let mut response = EnrollmentResponse::from(enrollment);
    response.course_title = Some(course.title);
    Ok(response)
}

pub async fn list_enrollments(db: &MongoDB, user_id: &ObjectId) -> AppResult<Vec<EnrollmentResponse>> {
    let enrollments: Vec<Enrollment> = db
        .collection::<Enrollment>(ENROLLMENTS)
        .find(doc! { "user_id": user_id })
        .sort(doc! { "updated_at": -1 })
        .await?
        .try_collect()
        .await?;

    let course_ids: Vec<ObjectId> = enrollments.iter().map(|e| e.course_id).collect();
    let titles: HashMap<ObjectId, String> = db
        .collection::<Course>(COURSES)
        .find(doc! { "_id": { "$in": course_ids } })
        .await?
        .try_collect::<Vec<Course>>()
        .await?
        .into_iter()
        .filter_map(|c| c.id.map(|id| (id, c.title)))
        .collect();

    Ok(enrollments
        .into_iter()
        .map(|e| {
            let title = titles.get(&e.course_id).cloned();
            let mut response = EnrollmentResponse::from(e);
            response.course_title = title;
            response
        })
        .collect())
}

/// Enrollment reconciled against the course's current outline.
pub async fn get_enrollment(db: &MongoDB, user_id: &ObjectId, course_id: &ObjectId) -> AppResult<EnrollmentResponse> {
    let mut enrollment = find_enrollment(db, user_id, course_id).await?;
    let course = find_course(db, course_id).await?;

    let outline = load_content(db, course_id).await?.outline();
    let updated_at = enrollment.updated_at;
    enrollment.recompute(&outline, now_ts());
    // reading is not a change
    enrollment.updated_at = updated_at;

    let mut response = EnrollmentResponse::from(enrollment);
    response.course_title = Some(course.title);
    Ok(response)
}

/// Grades the quiz and, on pass, marks the lesson complete. XP is awarded
/// only the first time a lesson is completed.
pub async fn complete_lesson(
    db: &MongoDB,
    user_id: &ObjectId,
    course_id: &ObjectId,
    lesson_id: &ObjectId,
    request: &CompleteLessonRequest,
) -> AppResult<LessonCompletionResponse> {
    // 1. Matrícula, curso e acesso premium
    let mut enrollment = find_enrollment(db, user_id, course_id).await?;
    let course = find_course(db, course_id).await?;
    let now = now_ts();
    let user = user_service::find_user(db, user_id).await?;
    ensure_access(&course, &user, now)?;

    // 2. Lição precisa pertencer ao curso
    let lesson = lesson_service::find_lesson(db, lesson_id).await?;
    if lesson.course_id != *course_id {
        return Err(AppError::NotFound("Lesson is not part of this course".into()));
    }

    // 3. Correção do quiz
    let answers = request.quiz_answers.clone().unwrap_or_default();
    let quiz = grade_quiz(&lesson.quiz, &answers)?;

    // 4. Atualiza progresso com o outline atual
    let outline = load_content(db, course_id).await?.outline();
    let previous_version = enrollment.version;
    let outcome = enrollment.record_lesson(*lesson_id, &quiz, &outline, now)?;

    let enrollment_id = enrollment
        .id
        .ok_or_else(|| AppError::Internal("Stored enrollment has no id".into()))?;
    let result = db
        .collection::<Enrollment>(ENROLLMENTS)
        .replace_one(unchanged_since(enrollment_id, previous_version), &enrollment)
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::Conflict("Enrollment changed while saving, please retry".into()));
    }

    // 5. XP apenas na primeira conclusão
    let xp_awarded = if outcome.first_completion { lesson.xp_reward.max(0) } else { 0 };
    if xp_awarded > 0 {
        leaderboard_service::award_xp(db, user_id, xp_awarded).await?;
    }

    if outcome.first_completion {
        log::info!(
            "✅ User {} completed lesson {} ({}% of course {})",
            user_id,
            lesson_id,
            enrollment.progress_percent,
            course_id
        );
    } else if !quiz.passed {
        log::debug!("❌ User {} failed quiz of lesson {} ({}%)", user_id, lesson_id, quiz.score_percent);
    }

    let mut response = EnrollmentResponse::from(enrollment);
    response.course_title = Some(course.title);
    Ok(LessonCompletionResponse {
        quiz,
        lesson_completed: outcome.lesson_completed,
        xp_awarded,
        enrollment: response,
    })
}

/// Matches the enrollment only if nobody saved it since `version` was read.
/// Documents written before versioning have no field and count as version 0.
fn unchanged_since(enrollment_id: ObjectId, version: i64) -> Document {
    if version == 0 {
        doc! { "_id": enrollment_id, "version": { "$in": [0_i64, Bson::Null] } }
    } else {
        doc! { "_id": enrollment_id, "version": version }
    }
}

pub async fn unenroll(db: &MongoDB, user_id: &ObjectId, course_id: &ObjectId) -> AppResult<()> {
    let result = db
        .collection::<Enrollment>(ENROLLMENTS)
        .delete_one(doc! { "user_id": user_id, "course_id": course_id })
        .await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Not enrolled in this course".into()));
    }

    log::info!("👋 User {} left course {}", user_id, course_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_is_conditional_on_read_version() {
        let id = ObjectId::new();

        let filter = unchanged_since(id, 3);
        assert_eq!(filter.get_object_id("_id").unwrap(), id);
        assert_eq!(filter.get_i64("version").unwrap(), 3);

        let legacy = unchanged_since(id, 0);
        let accepted = legacy.get_document("version").unwrap().get_array("$in").unwrap();
        assert_eq!(accepted, &vec![Bson::Int64(0), Bson::Null]);
    }

    // Needs a local MongoDB (DATABASE_URL)
    #[tokio::test]
    #[ignore]
    async fn unenroll_without_enrollment_is_not_found() {
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/kodr_test".into());
        let db = MongoDB::new(&uri).await.expect("mongo");

        let result = unenroll(&db, &ObjectId::new(), &ObjectId::new()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}

use crate::{
    database::{MongoDB, LESSONS},
    middleware::auth::Claims,
    models::{CreateLessonRequest, Lesson, LessonResponse, LessonSummary, UpdateLessonRequest},
    services::course_service::{ensure_access, ensure_can_manage, find_course},
    services::topic_service::{find_topic, next_order},
    services::user_service,
    utils::time::now_ts,
    utils::{AppError, AppResult},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};

pub async fn find_lesson(db: &MongoDB, lesson_id: &ObjectId) -> AppResult<Lesson> {
    db.collection::<Lesson>(LESSONS)
        .find_one(doc! { "_id": lesson_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Lesson not found".into()))
}

pub async fn list_lessons(db: &MongoDB, topic_id: &ObjectId) -> AppResult<Vec<LessonSummary>> {
    let topic = find_topic(db, topic_id).await?;
    find_course(db, &topic.course_id).await?;

    let lessons: Vec<Lesson> = db
        .collection::<Lesson>(LESSONS)
        .find(doc! { "topic_id": topic_id })
        .sort(doc! { "order": 1, "created_at": 1 })
        .await?
        .try_collect()
        .await?;

    Ok(lessons.iter().map(LessonSummary::from).collect())
}

/// Full lesson for a signed-in learner. Premium courses need an active subscription.
pub async fn get_lesson(db: &MongoDB, claims: &Claims, lesson_id: &ObjectId) -> AppResult<LessonResponse> {
    let lesson = find_lesson(db, lesson_id).await?;
    let course = find_course(db, &lesson.course_id).await?;

    let user = user_service::find_user(db, &claims.user_id()?).await?;
    ensure_access(&course, &user, now_ts())?;

    Ok(LessonResponse::from(lesson))
}

pub async fn create_lesson(
    db: &MongoDB,
    claims: &Claims,
    topic_id: &ObjectId,
    request: &CreateLessonRequest,
) -> AppResult<LessonResponse> {
    let topic = find_topic(db, topic_id).await?;
    let course = find_course(db, &topic.course_id).await?;
    ensure_can_manage(claims, &course)?;

    let order = match request.order {
        Some(order) => order,
        None => next_order(db, LESSONS, doc! { "topic_id": topic_id }).await?,
    };

    let now = now_ts();
    let mut lesson = Lesson {
        id: None,
        topic_id: *topic_id,
        course_id: topic.course_id,
        title: request.title.trim().to_string(),
        content: request.content.clone(),
        order,
        xp_reward: request.xp_reward.unwrap_or(crate::models::DEFAULT_XP_REWARD),
        duration_minutes: request.duration_minutes,
        quiz: request.quiz.clone().unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    let result = db.collection::<Lesson>(LESSONS).insert_one(&lesson).await?;
    lesson.id = result.inserted_id.as_object_id();

    log::info!("📝 Lesson '{}' added to topic {} ({} quiz questions)", lesson.title, topic_id, lesson.quiz.len());
    Ok(LessonResponse::from(lesson))
}

fn lesson_changes(request: &UpdateLessonRequest) -> AppResult<Document> {
    let mut set = Document::new();
    if let Some(title) = &request.title {
        set.insert("title", title.trim());
    }
    if let Some(content) = &request.content {
        set.insert("content", content);
    }
    if let Some(order) = request.order {
        set.insert("order", order);
    }
    if let Some(xp) = request.xp_reward {
        set.insert("xp_reward", xp);
    }
    if let Some(minutes) = request.duration_minutes {
        set.insert("duration_minutes", minutes);
    }
    if let Some(quiz) = &request.quiz {
        set.insert("quiz", to_bson(quiz)?);
    }
    Ok(set)
}

pub async fn update_lesson(
    db: &MongoDB,
    claims: &Claims,
    lesson_id: &ObjectId,
    request: &UpdateLessonRequest,
) -> AppResult<LessonResponse> {
    let lesson = find_lesson(db, lesson_id).await?;
    let course = find_course(db, &lesson.course_id).await?;
    ensure_can_manage(claims, &course)?;

    let mut set = lesson_changes(request)?;
    if !set.is_empty() {
        set.insert("updated_at", now_ts());
        db.collection::<Lesson>(LESSONS)
            .update_one(doc! { "_id": lesson_id }, doc! { "$set": set })
            .await?;
    }

    find_lesson(db, lesson_id).await.map(LessonResponse::from)
}

pub async fn delete_lesson(db: &MongoDB, claims: &Claims, lesson_id: &ObjectId) -> AppResult<()> {
    let lesson = find_lesson(db, lesson_id).await?;
    let course = find_course(db, &lesson.course_id).await?;
    ensure_can_manage(claims, &course)?;

    db.collection::<Lesson>(LESSONS).delete_one(doc! { "_id": lesson_id }).await?;

    // Enrollment progress drops the lesson the next time it is reconciled
    log::info!("🗑️ Lesson {} deleted from course {}", lesson_id, lesson.course_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuizQuestion;

    #[test]
    fn quiz_replacement_is_serialized() {
        let req = UpdateLessonRequest {
            title: None,
            content: None,
            order: Some(2),
            xp_reward: None,
            duration_minutes: None,
            quiz: Some(vec![QuizQuestion {
                prompt: "2 + 2?".into(),
                options: vec!["3".into(), "4".into()],
                correct_option: 1,
                explanation: None,
            }]),
        };
        let set = lesson_changes(&req).unwrap();

        assert_eq!(set.get_i32("order").unwrap(), 2);
        let quiz = set.get_array("quiz").unwrap();
        assert_eq!(quiz.len(), 1);
        assert!(!set.contains_key("title"));
    }
}

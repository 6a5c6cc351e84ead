use crate::{
    database::{MongoDB, LESSONS, TOPICS},
    middleware::auth::Claims,
    models::{CreateTopicRequest, Lesson, Topic, TopicResponse, UpdateTopicRequest},
    services::course_service::{ensure_can_manage, find_course},
    utils::time::now_ts,
    utils::{AppError, AppResult},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

pub async fn find_topic(db: &MongoDB, topic_id: &ObjectId) -> AppResult<Topic> {
    db.collection::<Topic>(TOPICS)
        .find_one(doc! { "_id": topic_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Topic not found".into()))
}

/// Next free `order` for documents matching `filter` in `collection`.
pub(crate) async fn next_order(db: &MongoDB, collection: &str, filter: Document) -> AppResult<i32> {
    let last = db
        .collection::<Document>(collection)
        .find_one(filter)
        .sort(doc! { "order": -1 })
        .await?;

    Ok(last.and_then(|d| d.get_i32("order").ok()).map(|o| o + 1).unwrap_or(0))
}

pub async fn list_topics(db: &MongoDB, course_id: &ObjectId) -> AppResult<Vec<TopicResponse>> {
    find_course(db, course_id).await?;

    let topics: Vec<Topic> = db
        .collection::<Topic>(TOPICS)
        .find(doc! { "course_id": course_id })
        .sort(doc! { "order": 1, "created_at": 1 })
        .await?
        .try_collect()
        .await?;

    Ok(topics.into_iter().map(TopicResponse::from).collect())
}

pub async fn create_topic(
    db: &MongoDB,
    claims: &Claims,
    course_id: &ObjectId,
    request: &CreateTopicRequest,
) -> AppResult<TopicResponse> {
    let course = find_course(db, course_id).await?;
    ensure_can_manage(claims, &course)?;

    let order = match request.order {
        Some(order) => order,
        None => next_order(db, TOPICS, doc! { "course_id": course_id }).await?,
    };

    let now = now_ts();
    let mut topic = Topic {
        id: None,
        course_id: *course_id,
        title: request.title.trim().to_string(),
        description: request.description.clone(),
        order,
        created_at: now,
        updated_at: now,
    };

    let result = db.collection::<Topic>(TOPICS).insert_one(&topic).await?;
    topic.id = result.inserted_id.as_object_id();

    log::info!("📑 Topic '{}' added to course {} at position {}", topic.title, course_id, order);
    Ok(TopicResponse::from(topic))
}

pub async fn update_topic(
    db: &MongoDB,
    claims: &Claims,
    topic_id: &ObjectId,
    request: &UpdateTopicRequest,
) -> AppResult<TopicResponse> {
    let topic = find_topic(db, topic_id).await?;
    let course = find_course(db, &topic.course_id).await?;
    ensure_can_manage(claims, &course)?;

    let mut set = Document::new();
    if let Some(title) = &request.title {
        set.insert("title", title.trim());
    }
    if let Some(description) = &request.description {
        set.insert("description", description);
    }
    if let Some(order) = request.order {
        set.insert("order", order);
    }

    if !set.is_empty() {
        set.insert("updated_at", now_ts());
        db.collection::<Topic>(TOPICS)
            .update_one(doc! { "_id": topic_id }, doc! { "$set": set })
            .await?;
    }

    find_topic(db, topic_id).await.map(TopicResponse::from)
}

/// Removes the topic and every lesson in it.
pub async fn delete_topic(db: &MongoDB, claims: &Claims, topic_id: &ObjectId) -> AppResult<()> {
    let topic = find_topic(db, topic_id).await?;
    let course = find_course(db, &topic.course_id).await?;
    ensure_can_manage(claims, &course)?;

    let lessons = db
        .collection::<Lesson>(LESSONS)
        .delete_many(doc! { "topic_id": topic_id })
        .await?;
    db.collection::<Topic>(TOPICS).delete_one(doc! { "_id": topic_id }).await?;

    log::info!("🗑️ Topic {} deleted with {} lessons", topic_id, lessons.deleted_count);
    Ok(())
}

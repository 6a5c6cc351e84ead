use crate::{
    database::{MongoDB, COURSES, ENROLLMENTS, LESSONS, TOPICS},
    middleware::auth::Claims,
    models::{
        normalize_tags, slugify, Course, CourseDetailResponse, CourseQuery, CourseResponse,
        CreateCourseRequest, Enrollment, Lesson, LessonSummary, Outline, OutlineTopic,
        OutlineTopicResponse, Paginated, Role, Topic, TopicResponse, UpdateCourseRequest, User,
    },
    utils::time::now_ts,
    utils::{AppError, AppResult},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use std::collections::HashMap;

/// Topics and lessons of a course, both in display order
#[derive(Debug, Default)]
pub struct CourseContent {
    pub topics: Vec<Topic>,
    pub lessons: Vec<Lesson>,
}

impl CourseContent {
    pub fn outline(&self) -> Outline {
        build_outline(&self.topics, &self.lessons)
    }
}

/// Groups ordered lessons under their ordered topics. Lessons pointing at a
/// topic that no longer exists are left out.
pub fn build_outline(topics: &[Topic], lessons: &[Lesson]) -> Outline {
    let mut by_topic: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
    for lesson in lessons {
        if let Some(id) = lesson.id {
            by_topic.entry(lesson.topic_id).or_default().push(id);
        }
    }

    Outline {
        topics: topics
            .iter()
            .filter_map(|t| t.id)
            .map(|topic_id| OutlineTopic {
                topic_id,
                lesson_ids: by_topic.remove(&topic_id).unwrap_or_default(),
            })
            .collect(),
    }
}

fn escape_regex(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn list_filter(query: &CourseQuery) -> Document {
    let mut filter = doc! { "is_published": true, "is_deleted": false };
    if let Some(difficulty) = query.difficulty {
        filter.insert("difficulty", difficulty.as_str());
    }
    if let Some(tag) = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        filter.insert("tags", tag.to_lowercase());
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        filter.insert("title", doc! { "$regex": escape_regex(search), "$options": "i" });
    }
    filter
}

/// Instructors manage their own courses, admins manage all of them.
pub fn ensure_can_manage(claims: &Claims, course: &Course) -> AppResult<()> {
    claims.require_author()?;
    if claims.role == Role::Admin || claims.user_id()? == course.created_by {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the course author can change this course".into()))
    }
}

/// Premium courses need an active subscription; authors always get in.
pub fn ensure_access(course: &Course, user: &User, now: i64) -> AppResult<()> {
    if course.is_premium && !user.has_active_premium(now) && !user.role.can_author() {
        return Err(AppError::PaymentRequired("This course requires an active premium subscription".into()));
    }
    Ok(())
}

pub async fn find_course(db: &MongoDB, course_id: &ObjectId) -> AppResult<Course> {
    db.collection::<Course>(COURSES)
        .find_one(doc! { "_id": course_id, "is_deleted": false })
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".into()))
}

pub async fn load_content(db: &MongoDB, course_id: &ObjectId) -> AppResult<CourseContent> {
    let topics: Vec<Topic> = db
        .collection::<Topic>(TOPICS)
        .find(doc! { "course_id": course_id })
        .sort(doc! { "order": 1, "created_at": 1 })
        .await?
        .try_collect()
        .await?;

    let lessons: Vec<Lesson> = db
        .collection::<Lesson>(LESSONS)
        .find(doc! { "course_id": course_id })
        .sort(doc! { "order": 1, "created_at": 1 })
        .await?
        .try_collect()
        .await?;

    Ok(CourseContent { topics, lessons })
}

pub async fn list_courses(db: &MongoDB, query: &CourseQuery) -> AppResult<Paginated<CourseResponse>> {
    let paging = query.paging();
    let filter = list_filter(query);
    let collection = db.collection::<Course>(COURSES);

    let total = collection.count_documents(filter.clone()).await?;
    let courses: Vec<Course> = collection
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .skip(paging.skip())
        .limit(paging.limit())
        .await?
        .try_collect()
        .await?;

    let items = courses.into_iter().map(CourseResponse::from).collect();
    Ok(Paginated::new(items, &paging, total))
}

/// Course with its outline. Drafts are only visible to authors.
pub async fn get_course_detail(
    db: &MongoDB,
    course_id: &ObjectId,
    viewer: Option<&Claims>,
) -> AppResult<CourseDetailResponse> {
    let course = find_course(db, course_id).await?;
    if !course.is_published && !viewer.map(|c| c.role.can_author()).unwrap_or(false) {
        return Err(AppError::NotFound("Course not found".into()));
    }

    let content = load_content(db, course_id).await?;
    let lesson_count = content.lessons.len();
    let total_minutes = content
        .lessons
        .iter()
        .filter_map(|l| l.duration_minutes)
        .map(i64::from)
        .sum();

    let mut lessons_by_topic: HashMap<ObjectId, Vec<LessonSummary>> = HashMap::new();
    for lesson in &content.lessons {
        lessons_by_topic.entry(lesson.topic_id).or_default().push(LessonSummary::from(lesson));
    }

    let topics = content
        .topics
        .into_iter()
        .map(|topic| {
            let lessons = topic.id.and_then(|id| lessons_by_topic.remove(&id)).unwrap_or_default();
            OutlineTopicResponse { topic: TopicResponse::from(topic), lessons }
        })
        .collect();

    Ok(CourseDetailResponse {
        course: CourseResponse::from(course),
        topics,
        lesson_count,
        total_minutes,
    })
}

pub async fn create_course(db: &MongoDB, claims: &Claims, request: &CreateCourseRequest) -> AppResult<CourseResponse> {
    claims.require_author()?;

    let now = now_ts();
    let mut course = Course {
        id: None,
        title: request.title.trim().to_string(),
        slug: slugify(&request.title),
        description: request.description.trim().to_string(),
        difficulty: request.difficulty.unwrap_or_default(),
        tags: normalize_tags(request.tags.as_deref().unwrap_or_default()),
        thumbnail: request.thumbnail.clone(),
        is_premium: request.is_premium.unwrap_or(false),
        is_published: request.is_published.unwrap_or(false),
        created_by: claims.user_id()?,
        created_at: now,
        updated_at: now,
        is_deleted: false,
        deleted_at: None,
    };

    let result = db
        .collection::<Course>(COURSES)
        .insert_one(&course)
        .await
        .map_err(|e| AppError::on_duplicate(e, "A course with this title already exists"))?;
    course.id = result.inserted_id.as_object_id();

    log::info!("📚 Course created: {} ({})", course.title, course.slug);
    Ok(CourseResponse::from(course))
}

fn course_changes(request: &UpdateCourseRequest) -> AppResult<Document> {
    let mut set = Document::new();
    if let Some(title) = &request.title {
        set.insert("title", title.trim());
        set.insert("slug", slugify(title));
    }
    if let Some(description) = &request.description {
        set.insert("description", description.trim());
    }
    if let Some(difficulty) = request.difficulty {
        set.insert("difficulty", difficulty.as_str());
    }
    if let Some(tags) = &request.tags {
        set.insert("tags", to_bson(&normalize_tags(tags))?);
    }
    if let Some(thumbnail) = &request.thumbnail {
        set.insert("thumbnail", thumbnail);
    }
    if let Some(is_premium) = request.is_premium {
        set.insert("is_premium", is_premium);
    }
    if let Some(is_published) = request.is_published {
        set.insert("is_published", is_published);
    }
    Ok(set)
}

pub async fn update_course(
    db: &MongoDB,
    claims: &Claims,
    course_id: &ObjectId,
    request: &UpdateCourseRequest,
) -> AppResult<CourseResponse> {
    let course = find_course(db, course_id).await?;
    ensure_can_manage(claims, &course)?;

    let mut set = course_changes(request)?;
    if !set.is_empty() {
        set.insert("updated_at", now_ts());
        db.collection::<Course>(COURSES)
            .update_one(doc! { "_id": course_id }, doc! { "$set": set })
            .await
            .map_err(|e| AppError::on_duplicate(e, "A course with this title already exists"))?;
        log::info!("✏️ Course {} updated", course_id);
    }

    find_course(db, course_id).await.map(CourseResponse::from)
}

/// Soft delete hides the course; hard delete (admin) removes it together
/// with its topics, lessons and enrollments.
pub async fn delete_course(db: &MongoDB, claims: &Claims, course_id: &ObjectId, hard: bool) -> AppResult<()> {
    if hard {
        claims.require_admin()?;
        let exists = db
            .collection::<Course>(COURSES)
            .find_one(doc! { "_id": course_id })
            .await?
            .is_some();
        if !exists {
            return Err(AppError::NotFound("Course not found".into()));
        }

        let lessons = db.collection::<Lesson>(LESSONS).delete_many(doc! { "course_id": course_id }).await?;
        let topics = db.collection::<Topic>(TOPICS).delete_many(doc! { "course_id": course_id }).await?;
        let enrollments = db
            .collection::<Enrollment>(ENROLLMENTS)
            .delete_many(doc! { "course_id": course_id })
            .await?;
        db.collection::<Course>(COURSES).delete_one(doc! { "_id": course_id }).await?;

        log::warn!(
            "🗑️ Course {} hard deleted ({} topics, {} lessons, {} enrollments)",
            course_id,
            topics.deleted_count,
            lessons.deleted_count,
            enrollments.deleted_count
        );
        return Ok(());
    }

    let course = find_course(db, course_id).await?;
    ensure_can_manage(claims, &course)?;

    let now = now_ts();
    db.collection::<Course>(COURSES)
        .update_one(doc! { "_id": course_id }, doc! { "$set": soft_delete_changes(&course, course_id, now) })
        .await?;

    log::info!("🗑️ Course {} soft deleted", course_id);
    Ok(())
}

/// Soft-deleted courses give up their slug so a new course can take it.
fn retired_slug(slug: &str, course_id: &ObjectId) -> String {
    format!("{}--deleted-{}", slug, course_id.to_hex())
}

fn soft_delete_changes(course: &Course, course_id: &ObjectId, now: i64) -> Document {
    doc! {
        "is_deleted": true,
        "deleted_at": now,
        "updated_at": now,
        "slug": retired_slug(&course.slug, course_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, Premium, Streak};
    use crate::services::auth_service::TokenKind;

    fn topic(order: i32) -> Topic {
        Topic {
            id: Some(ObjectId::new()),
            course_id: ObjectId::new(),
            title: format!("Topic {}", order),
            description: None,
            order,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn lesson(topic_id: ObjectId) -> Lesson {
        Lesson {
            id: Some(ObjectId::new()),
            topic_id,
            course_id: ObjectId::new(),
            title: "Lesson".into(),
            content: String::new(),
            order: 0,
            xp_reward: 10,
            duration_minutes: Some(5),
            quiz: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }

    fn course(created_by: ObjectId, is_premium: bool) -> Course {
        Course {
            id: Some(ObjectId::new()),
            title: "Rust".into(),
            slug: "rust".into(),
            description: String::new(),
            difficulty: Difficulty::Beginner,
            tags: vec![],
            thumbnail: None,
            is_premium,
            is_published: true,
            created_by,
            created_at: 0,
            updated_at: 0,
            is_deleted: false,
            deleted_at: None,
        }
    }

    fn claims(user_id: ObjectId, role: Role) -> Claims {
        Claims {
            sub: user_id.to_hex(),
            email: "x@kodr.dev".into(),
            role,
            token_type: TokenKind::Access,
            iat: 0,
            exp: 0,
            jti: String::new(),
            aud: String::new(),
            iss: String::new(),
        }
    }

    fn learner(premium: Premium) -> User {
        User {
            id: Some(ObjectId::new()),
            name: "Ada".into(),
            email: "ada@kodr.dev".into(),
            password_hash: String::new(),
            role: Role::Student,
            avatar: None,
            bio: None,
            xp: 0,
            streak: Streak::default(),
            premium,
            is_active: true,
            is_deleted: false,
            deleted_at: None,
            created_at: 0,
            updated_at: 0,
            last_login: None,
        }
    }

    #[test]
    fn outline_follows_topic_order_and_drops_orphans() {
        let (t1, t2) = (topic(0), topic(1));
        let orphan = lesson(ObjectId::new());
        let lessons = vec![lesson(t2.id.unwrap()), lesson(t1.id.unwrap()), orphan, lesson(t1.id.unwrap())];

        let outline = build_outline(&[t1.clone(), t2.clone()], &lessons);
        assert_eq!(outline.topics.len(), 2);
        assert_eq!(outline.topics[0].topic_id, t1.id.unwrap());
        assert_eq!(outline.topics[0].lesson_ids, vec![lessons[1].id.unwrap(), lessons[3].id.unwrap()]);
        assert_eq!(outline.topics[1].lesson_ids.len(), 1);
        assert_eq!(outline.lesson_count(), 3);
    }

    #[test]
    fn search_is_escaped_and_tags_lowercased() {
        let query = CourseQuery {
            difficulty: Some(Difficulty::Advanced),
            tag: Some("Rust".into()),
            search: Some("c++".into()),
            ..Default::default()
        };
        let filter = list_filter(&query);

        assert_eq!(filter.get_str("difficulty").unwrap(), "advanced");
        assert_eq!(filter.get_str("tags").unwrap(), "rust");
        let title = filter.get_document("title").unwrap();
        assert_eq!(title.get_str("$regex").unwrap(), "c\\+\\+");
        assert!(filter.get_bool("is_published").unwrap());
    }

    #[test]
    fn only_author_or_admin_manage() {
        let author = ObjectId::new();
        let c = course(author, false);

        assert!(ensure_can_manage(&claims(author, Role::Instructor), &c).is_ok());
        assert!(ensure_can_manage(&claims(ObjectId::new(), Role::Admin), &c).is_ok());
        assert!(matches!(
            ensure_can_manage(&claims(ObjectId::new(), Role::Instructor), &c),
            Err(AppError::Forbidden(_))
        ));
        assert!(ensure_can_manage(&claims(author, Role::Student), &c).is_err());
    }

    #[test]
    fn premium_course_needs_active_subscription() {
        let now = 10_000;
        let c = course(ObjectId::new(), true);

        let free = learner(Premium::default());
        assert!(matches!(ensure_access(&c, &free, now), Err(AppError::PaymentRequired(_))));

        let paid = learner(Premium::until(Some(now + 60), now));
        assert!(ensure_access(&c, &paid, now).is_ok());

        let expired = learner(Premium { is_premium: true, expires_at: Some(now - 1) });
        assert!(ensure_access(&c, &expired, now).is_err());

        assert!(ensure_access(&course(ObjectId::new(), false), &free, now).is_ok());
    }

    #[test]
    fn title_change_recomputes_slug() {
        let req = UpdateCourseRequest {
            title: Some("Async Rust".into()),
            description: None,
            difficulty: None,
            tags: Some(vec!["Tokio".into()]),
            thumbnail: None,
            is_premium: None,
            is_published: Some(true),
        };
        let set = course_changes(&req).unwrap();
        assert_eq!(set.get_str("slug").unwrap(), "async-rust");
        assert!(set.get_bool("is_published").unwrap());
        assert!(!set.contains_key("description"));
    }

    #[test]
    fn soft_delete_frees_slug() {
        let c = course(ObjectId::new(), false);
        let id = c.id.unwrap();
        let set = soft_delete_changes(&c, &id, 50);

        let retired = set.get_str("slug").unwrap();
        assert_ne!(retired, "rust");
        assert_ne!(retired, slugify("Rust"));
        assert!(retired.ends_with(&id.to_hex()));
        assert!(set.get_bool("is_deleted").unwrap());
        assert_eq!(set.get_i64("deleted_at").unwrap(), 50);

        // two deleted courses with the same title never collide
        let other = ObjectId::new();
        assert_ne!(retired_slug("rust", &id), retired_slug("rust", &other));
    }
}

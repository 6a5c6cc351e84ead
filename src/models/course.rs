use crate::models::lesson::LessonSummary;
use crate::models::pagination::PageQuery;
use crate::models::topic::TopicResponse;
use crate::utils::validation::{optional_text, optional_url, require_text, Validate};
use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

/// Curso (armazenado no MongoDB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub slug: String,
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub is_published: bool,
    pub created_by: ObjectId,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
}

impl Course {
    /// Visible to learners and open for enrollment
    pub fn is_available(&self) -> bool {
        self.is_published && !self.is_deleted
    }
}

/// Turns a title into a URL slug: `"Intro to Rust!"` -> `"intro-to-rust"`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Ordered topics of a course with their ordered lesson ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    pub topics: Vec<OutlineTopic>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlineTopic {
    pub topic_id: ObjectId,
    pub lesson_ids: Vec<ObjectId>,
}

impl Outline {
    pub fn lesson_count(&self) -> usize {
        self.topics.iter().map(|t| t.lesson_ids.len()).sum()
    }

    pub fn contains_lesson(&self, lesson_id: &ObjectId) -> bool {
        self.topics.iter().any(|t| t.lesson_ids.contains(lesson_id))
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: String,
    pub difficulty: Option<Difficulty>,
    pub tags: Option<Vec<String>>,
    pub thumbnail: Option<String>,
    pub is_premium: Option<bool>,
    pub is_published: Option<bool>,
}

impl Validate for CreateCourseRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text(&self.title, "Title", 120)?;
        if slugify(&self.title).is_empty() {
            return Err(AppError::Validation("Title must contain letters or digits".into()));
        }
        require_text(&self.description, "Description", 5000)?;
        optional_url(self.thumbnail.as_deref(), "Thumbnail")?;
        validate_tags(self.tags.as_deref())
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub tags: Option<Vec<String>>,
    pub thumbnail: Option<String>,
    pub is_premium: Option<bool>,
    pub is_published: Option<bool>,
}

impl Validate for UpdateCourseRequest {
    fn validate(&self) -> Result<(), AppError> {
        optional_text(self.title.as_deref(), "Title", 120)?;
        if let Some(title) = &self.title {
            if slugify(title).is_empty() {
                return Err(AppError::Validation("Title must contain letters or digits".into()));
            }
        }
        optional_text(self.description.as_deref(), "Description", 5000)?;
        optional_url(self.thumbnail.as_deref(), "Thumbnail")?;
        validate_tags(self.tags.as_deref())
    }
}

fn validate_tags(tags: Option<&[String]>) -> Result<(), AppError> {
    if let Some(tags) = tags {
        if tags.len() > 10 {
            return Err(AppError::Validation("At most 10 tags are allowed".into()));
        }
        for tag in tags {
            require_text(tag, "Tag", 30)?;
        }
    }
    Ok(())
}

pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[derive(Debug, Default, Deserialize)]
pub struct CourseQuery {
    pub difficulty: Option<Difficulty>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl CourseQuery {
    pub fn paging(&self) -> PageQuery {
        PageQuery { page: self.page, limit: self.limit }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub hard: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub thumbnail: Option<String>,
    pub is_premium: bool,
    pub is_published: bool,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        CourseResponse {
            id: course.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: course.title,
            slug: course.slug,
            description: course.description,
            difficulty: course.difficulty,
            tags: course.tags,
            thumbnail: course.thumbnail,
            is_premium: course.is_premium,
            is_published: course.is_published,
            created_by: course.created_by.to_hex(),
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OutlineTopicResponse {
    #[serde(flatten)]
    pub topic: TopicResponse,
    pub lessons: Vec<LessonSummary>,
}

#[derive(Debug, Serialize)]
pub struct CourseDetailResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub topics: Vec<OutlineTopicResponse>,
    pub lesson_count: usize,
    pub total_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Intro to Rust!"), "intro-to-rust");
        assert_eq!(slugify("  C++ & Data   Structures "), "c-data-structures");
        assert_eq!(slugify("Python 3.12"), "python-3-12");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn tags_are_lowercased_and_deduplicated() {
        let tags = vec!["Rust".to_string(), " rust ".to_string(), "Web".to_string(), "".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["rust", "web"]);
    }

    #[test]
    fn create_request_requires_sluggable_title() {
        let req = CreateCourseRequest {
            title: "!!!".into(),
            description: "desc".into(),
            difficulty: None,
            tags: None,
            thumbnail: None,
            is_premium: None,
            is_published: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn outline_counts_lessons() {
        let outline = Outline {
            topics: vec![
                OutlineTopic { topic_id: ObjectId::new(), lesson_ids: vec![ObjectId::new(), ObjectId::new()] },
                OutlineTopic { topic_id: ObjectId::new(), lesson_ids: vec![] },
            ],
        };
        assert_eq!(outline.lesson_count(), 2);
        let first = outline.topics[0].lesson_ids[0];
        assert!(outline.contains_lesson(&first));
        assert!(!outline.contains_lesson(&ObjectId::new()));
    }
}

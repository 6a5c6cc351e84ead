use crate::utils::validation::{optional_text, require_text, Validate};
use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub course_id: ObjectId,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateTopicRequest {
    pub title: String,
    pub description: Option<String>,
    /// Position within the course; appended at the end when omitted
    pub order: Option<i32>,
}

impl Validate for CreateTopicRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text(&self.title, "Title", 120)?;
        optional_text(self.description.as_deref(), "Description", 2000)?;
        validate_order(self.order)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateTopicRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i32>,
}

impl Validate for UpdateTopicRequest {
    fn validate(&self) -> Result<(), AppError> {
        optional_text(self.title.as_deref(), "Title", 120)?;
        optional_text(self.description.as_deref(), "Description", 2000)?;
        validate_order(self.order)
    }
}

pub(crate) fn validate_order(order: Option<i32>) -> Result<(), AppError> {
    match order {
        Some(o) if o < 0 => Err(AppError::Validation("Order must not be negative".into())),
        _ => Ok(()),
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TopicResponse {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Topic> for TopicResponse {
    fn from(topic: Topic) -> Self {
        TopicResponse {
            id: topic.id.map(|id| id.to_hex()).unwrap_or_default(),
            course_id: topic.course_id.to_hex(),
            title: topic.title,
            description: topic.description,
            order: topic.order,
            created_at: topic.created_at,
            updated_at: topic.updated_at,
        }
    }
}

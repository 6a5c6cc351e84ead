use crate::utils::validation::{optional_text, optional_url, parse_object_id, require_text, Validate};
use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Learner project shown in the showcase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub course_id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

fn default_public() -> bool {
    true
}

impl Project {
    pub fn visible_to(&self, viewer: Option<&ObjectId>) -> bool {
        self.is_public || viewer == Some(&self.user_id)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: String,
    pub course_id: Option<String>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

impl Validate for CreateProjectRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text(&self.title, "Title", 120)?;
        require_text(&self.description, "Description", 5000)?;
        if let Some(id) = &self.course_id {
            parse_object_id(id, "course")?;
        }
        optional_url(self.repo_url.as_deref(), "repo_url")?;
        optional_url(self.live_url.as_deref(), "live_url")?;
        validate_stack(self.tech_stack.as_deref())
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

impl Validate for UpdateProjectRequest {
    fn validate(&self) -> Result<(), AppError> {
        optional_text(self.title.as_deref(), "Title", 120)?;
        optional_text(self.description.as_deref(), "Description", 5000)?;
        optional_url(self.repo_url.as_deref(), "repo_url")?;
        optional_url(self.live_url.as_deref(), "live_url")?;
        validate_stack(self.tech_stack.as_deref())
    }
}

fn validate_stack(stack: Option<&[String]>) -> Result<(), AppError> {
    if let Some(stack) = stack {
        if stack.len() > 15 {
            return Err(AppError::Validation("At most 15 technologies are allowed".into()));
        }
        for tech in stack {
            require_text(tech, "Technology", 40)?;
        }
    }
    Ok(())
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProjectResponse {
    pub id: String,
    pub user_id: String,
    pub course_id: Option<String>,
    pub title: String,
    pub description: String,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub tech_stack: Vec<String>,
    pub is_public: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        ProjectResponse {
            id: p.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: p.user_id.to_hex(),
            course_id: p.course_id.map(|id| id.to_hex()),
            title: p.title,
            description: p.description,
            repo_url: p.repo_url,
            live_url: p.live_url,
            tech_stack: p.tech_stack,
            is_public: p.is_public,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_projects_only_visible_to_owner() {
        let owner = ObjectId::new();
        let project = Project {
            id: None,
            user_id: owner,
            course_id: None,
            title: "Todo API".into(),
            description: "actix + mongo".into(),
            repo_url: None,
            live_url: None,
            tech_stack: vec![],
            is_public: false,
            created_at: 0,
            updated_at: 0,
        };
        assert!(project.visible_to(Some(&owner)));
        assert!(!project.visible_to(Some(&ObjectId::new())));
        assert!(!project.visible_to(None));
    }
}

use crate::utils::validation::{parse_object_id, require_text, Validate};
use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub author_name: String,
    pub course_id: Option<ObjectId>,
    pub lesson_id: Option<ObjectId>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub upvotes: Vec<ObjectId>,
    #[serde(default)]
    pub answer_count: i64,
    pub accepted_answer_id: Option<ObjectId>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub question_id: ObjectId,
    pub user_id: ObjectId,
    pub author_name: String,
    pub body: String,
    #[serde(default)]
    pub upvotes: Vec<ObjectId>,
    #[serde(default)]
    pub is_accepted: bool,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Accepted answer first, then most upvoted, then oldest.
pub fn sort_answers(answers: &mut [Answer]) {
    answers.sort_by(|a, b| {
        b.is_accepted
            .cmp(&a.is_accepted)
            .then(b.upvotes.len().cmp(&a.upvotes.len()))
            .then(a.created_at.cmp(&b.created_at))
    });
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AskQuestionRequest {
    pub title: String,
    pub body: String,
    pub course_id: Option<String>,
    pub lesson_id: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Validate for AskQuestionRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text(&self.title, "Title", 200)?;
        require_text(&self.body, "Body", 20_000)?;
        if let Some(id) = &self.course_id {
            parse_object_id(id, "course")?;
        }
        if let Some(id) = &self.lesson_id {
            parse_object_id(id, "lesson")?;
        }
        if let Some(tags) = &self.tags {
            if tags.len() > 5 {
                return Err(AppError::Validation("At most 5 tags are allowed".into()));
            }
            for tag in tags {
                require_text(tag, "Tag", 30)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AnswerRequest {
    pub body: String,
}

impl Validate for AnswerRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text(&self.body, "Body", 20_000)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct QuestionQuery {
    pub course_id: Option<String>,
    pub lesson_id: Option<String>,
    pub tag: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QuestionResponse {
    pub id: String,
    pub user_id: String,
    pub author_name: String,
    pub course_id: Option<String>,
    pub lesson_id: Option<String>,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub upvotes: usize,
    pub answer_count: i64,
    pub accepted_answer_id: Option<String>,
    pub is_resolved: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Question> for QuestionResponse {
    fn from(q: Question) -> Self {
        QuestionResponse {
            id: q.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: q.user_id.to_hex(),
            author_name: q.author_name,
            course_id: q.course_id.map(|id| id.to_hex()),
            lesson_id: q.lesson_id.map(|id| id.to_hex()),
            title: q.title,
            body: q.body,
            tags: q.tags,
            upvotes: q.upvotes.len(),
            answer_count: q.answer_count,
            is_resolved: q.accepted_answer_id.is_some(),
            accepted_answer_id: q.accepted_answer_id.map(|id| id.to_hex()),
            created_at: q.created_at,
            updated_at: q.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AnswerResponse {
    pub id: String,
    pub question_id: String,
    pub user_id: String,
    pub author_name: String,
    pub body: String,
    pub upvotes: usize,
    pub is_accepted: bool,
    pub created_at: i64,
}

impl From<Answer> for AnswerResponse {
    fn from(a: Answer) -> Self {
        AnswerResponse {
            id: a.id.map(|id| id.to_hex()).unwrap_or_default(),
            question_id: a.question_id.to_hex(),
            user_id: a.user_id.to_hex(),
            author_name: a.author_name,
            body: a.body,
            upvotes: a.upvotes.len(),
            is_accepted: a.is_accepted,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QuestionThreadResponse {
    pub question: QuestionResponse,
    pub answers: Vec<AnswerResponse>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VoteResponse {
    pub upvoted: bool,
    pub upvotes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(accepted: bool, votes: usize, created_at: i64) -> Answer {
        Answer {
            id: Some(ObjectId::new()),
            question_id: ObjectId::new(),
            user_id: ObjectId::new(),
            author_name: "grace".into(),
            body: "try `cargo clean`".into(),
            upvotes: (0..votes).map(|_| ObjectId::new()).collect(),
            is_accepted: accepted,
            created_at,
            updated_at: created_at,
            is_deleted: false,
        }
    }

    #[test]
    fn accepted_answer_comes_first() {
        let mut answers = vec![answer(false, 5, 1), answer(true, 0, 3), answer(false, 5, 0), answer(false, 1, 2)];
        sort_answers(&mut answers);

        assert!(answers[0].is_accepted);
        assert_eq!(answers[1].created_at, 0);
        assert_eq!(answers[2].created_at, 1);
        assert_eq!(answers[3].upvotes.len(), 1);
    }

    #[test]
    fn rejects_malformed_references() {
        let req = AskQuestionRequest {
            title: "Borrow checker error".into(),
            body: "E0502 when pushing inside a loop".into(),
            course_id: Some("xyz".into()),
            lesson_id: None,
            tags: None,
        };
        assert!(req.validate().is_err());
    }
}

use crate::models::topic::validate_order;
use crate::utils::validation::{optional_text, require_text, Validate};
use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_XP_REWARD: i64 = 10;
pub const QUIZ_PASS_PERCENT: u32 = 70;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_option: i32,
    pub explanation: Option<String>,
}

impl QuizQuestion {
    fn validate(&self, position: usize) -> Result<(), AppError> {
        require_text(&self.prompt, "Quiz prompt", 1000)?;
        if self.options.len() < 2 || self.options.len() > 6 {
            return Err(AppError::Validation(format!(
                "Quiz question {} must have between 2 and 6 options",
                position + 1
            )));
        }
        for option in &self.options {
            require_text(option, "Quiz option", 300)?;
        }
        if self.correct_option < 0 || self.correct_option as usize >= self.options.len() {
            return Err(AppError::Validation(format!(
                "Quiz question {} has an out of range correct_option",
                position + 1
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub topic_id: ObjectId,
    pub course_id: ObjectId,
    pub title: String,
    /// Markdown body
    pub content: String,
    pub order: i32,
    #[serde(default = "default_xp_reward")]
    pub xp_reward: i64,
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,
    pub created_at: i64,
    pub updated_at: i64,
}

fn default_xp_reward() -> i64 {
    DEFAULT_XP_REWARD
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct QuizResult {
    pub correct: usize,
    pub total: usize,
    pub score_percent: u32,
    pub passed: bool,
}

/// Grades `answers` (selected option index per question, in order).
/// A lesson without a quiz always passes.
pub fn grade_quiz(quiz: &[QuizQuestion], answers: &[i32]) -> Result<QuizResult, AppError> {
    if quiz.is_empty() {
        return Ok(QuizResult { correct: 0, total: 0, score_percent: 100, passed: true });
    }
    if answers.len() != quiz.len() {
        return Err(AppError::Validation(format!(
            "Expected {} quiz answers, got {}",
            quiz.len(),
            answers.len()
        )));
    }

    let correct = quiz
        .iter()
        .zip(answers)
        .filter(|(q, a)| q.correct_option == **a)
        .count();
    let score_percent = (correct * 100 / quiz.len()) as u32;

    Ok(QuizResult {
        correct,
        total: quiz.len(),
        score_percent,
        passed: score_percent >= QUIZ_PASS_PERCENT,
    })
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateLessonRequest {
    pub title: String,
    pub content: String,
    pub order: Option<i32>,
    pub xp_reward: Option<i64>,
    pub duration_minutes: Option<i32>,
    pub quiz: Option<Vec<QuizQuestion>>,
}

impl Validate for CreateLessonRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text(&self.title, "Title", 120)?;
        require_text(&self.content, "Content", 100_000)?;
        validate_order(self.order)?;
        validate_numbers(self.xp_reward, self.duration_minutes)?;
        validate_quiz(self.quiz.as_deref())
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub order: Option<i32>,
    pub xp_reward: Option<i64>,
    pub duration_minutes: Option<i32>,
    pub quiz: Option<Vec<QuizQuestion>>,
}

impl Validate for UpdateLessonRequest {
    fn validate(&self) -> Result<(), AppError> {
        optional_text(self.title.as_deref(), "Title", 120)?;
        optional_text(self.content.as_deref(), "Content", 100_000)?;
        validate_order(self.order)?;
        validate_numbers(self.xp_reward, self.duration_minutes)?;
        validate_quiz(self.quiz.as_deref())
    }
}

fn validate_numbers(xp_reward: Option<i64>, duration: Option<i32>) -> Result<(), AppError> {
    if matches!(xp_reward, Some(xp) if !(0..=1000).contains(&xp)) {
        return Err(AppError::Validation("xp_reward must be between 0 and 1000".into()));
    }
    if matches!(duration, Some(d) if d <= 0) {
        return Err(AppError::Validation("duration_minutes must be positive".into()));
    }
    Ok(())
}

fn validate_quiz(quiz: Option<&[QuizQuestion]>) -> Result<(), AppError> {
    if let Some(quiz) = quiz {
        if quiz.len() > 20 {
            return Err(AppError::Validation("A quiz can have at most 20 questions".into()));
        }
        for (i, question) in quiz.iter().enumerate() {
            question.validate(i)?;
        }
    }
    Ok(())
}

/// Lesson entry in outlines and listings (no content)
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LessonSummary {
    pub id: String,
    pub topic_id: String,
    pub title: String,
    pub order: i32,
    pub xp_reward: i64,
    pub duration_minutes: Option<i32>,
    pub has_quiz: bool,
}

impl From<&Lesson> for LessonSummary {
    fn from(lesson: &Lesson) -> Self {
        LessonSummary {
            id: lesson.id.map(|id| id.to_hex()).unwrap_or_default(),
            topic_id: lesson.topic_id.to_hex(),
            title: lesson.title.clone(),
            order: lesson.order,
            xp_reward: lesson.xp_reward,
            duration_minutes: lesson.duration_minutes,
            has_quiz: !lesson.quiz.is_empty(),
        }
    }
}

/// Quiz question without the answer key
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PublicQuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LessonResponse {
    pub id: String,
    pub topic_id: String,
    pub course_id: String,
    pub title: String,
    pub content: String,
    pub order: i32,
    pub xp_reward: i64,
    pub duration_minutes: Option<i32>,
    pub quiz: Vec<PublicQuizQuestion>,
    pub updated_at: i64,
}

impl From<Lesson> for LessonResponse {
    fn from(lesson: Lesson) -> Self {
        LessonResponse {
            id: lesson.id.map(|id| id.to_hex()).unwrap_or_default(),
            topic_id: lesson.topic_id.to_hex(),
            course_id: lesson.course_id.to_hex(),
            title: lesson.title,
            content: lesson.content,
            order: lesson.order,
            xp_reward: lesson.xp_reward,
            duration_minutes: lesson.duration_minutes,
            quiz: lesson
                .quiz
                .into_iter()
                .map(|q| PublicQuizQuestion { prompt: q.prompt, options: q.options })
                .collect(),
            updated_at: lesson.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: i32) -> QuizQuestion {
        QuizQuestion {
            prompt: "What does `let` do?".into(),
            options: vec!["binds".into(), "loops".into(), "panics".into()],
            correct_option: correct,
            explanation: None,
        }
    }

    #[test]
    fn empty_quiz_passes() {
        let result = grade_quiz(&[], &[]).unwrap();
        assert!(result.passed);
        assert_eq!(result.total, 0);
    }

    #[test]
    fn grades_against_pass_mark() {
        let quiz = vec![question(0), question(1), question(2)];

        let result = grade_quiz(&quiz, &[0, 1, 0]).unwrap();
        assert_eq!(result.correct, 2);
        assert_eq!(result.score_percent, 66);
        assert!(!result.passed);

        let result = grade_quiz(&quiz, &[0, 1, 2]).unwrap();
        assert_eq!(result.score_percent, 100);
        assert!(result.passed);
    }

    #[test]
    fn answer_count_must_match() {
        let quiz = vec![question(0), question(1)];
        assert!(matches!(grade_quiz(&quiz, &[0]), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_out_of_range_answer_key() {
        let req = CreateLessonRequest {
            title: "Ownership".into(),
            content: "# Ownership".into(),
            order: None,
            xp_reward: None,
            duration_minutes: Some(15),
            quiz: Some(vec![question(3)]),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn response_hides_answer_key() {
        let lesson = Lesson {
            id: Some(ObjectId::new()),
            topic_id: ObjectId::new(),
            course_id: ObjectId::new(),
            title: "Borrowing".into(),
            content: "...".into(),
            order: 0,
            xp_reward: 10,
            duration_minutes: None,
            quiz: vec![question(1)],
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_value(LessonResponse::from(lesson)).unwrap();
        assert!(json["quiz"][0].get("correct_option").is_none());
        assert_eq!(json["quiz"][0]["options"].as_array().unwrap().len(), 3);
    }
}

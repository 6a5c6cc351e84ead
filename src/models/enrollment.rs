use crate::models::course::Outline;
use crate::models::lesson::QuizResult;
use crate::utils::validation::{parse_object_id, Validate};
use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub lesson_id: ObjectId,
    pub completed: bool,
    pub completed_at: Option<i64>,
    /// Best quiz score seen so far (percent)
    pub quiz_score: Option<u32>,
}

impl LessonProgress {
    fn pending(lesson_id: ObjectId) -> Self {
        Self { lesson_id, completed: false, completed_at: None, quiz_score: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicProgress {
    pub topic_id: ObjectId,
    pub completed: bool,
    pub lessons: Vec<LessonProgress>,
}

/// Matrícula: liga um usuário a um curso e guarda o progresso aninhado
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub course_id: ObjectId,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub progress: Vec<TopicProgress>,
    #[serde(default)]
    pub progress_percent: u32,
    pub last_lesson_id: Option<ObjectId>,
    pub enrolled_at: i64,
    pub completed_at: Option<i64>,
    pub updated_at: i64,
    /// Bumped on every progress write; saves are conditional on it
    #[serde(default)]
    pub version: i64,
}

/// What happened when a learner finished a lesson attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonOutcome {
    pub lesson_completed: bool,
    /// True only the first time the lesson flips to completed
    pub first_completion: bool,
}

impl Enrollment {
    pub fn new(user_id: ObjectId, course_id: ObjectId, outline: &Outline, now: i64) -> Self {
        let mut enrollment = Enrollment {
            id: None,
            user_id,
            course_id,
            status: EnrollmentStatus::NotStarted,
            progress: Vec::new(),
            progress_percent: 0,
            last_lesson_id: None,
            enrolled_at: now,
            completed_at: None,
            updated_at: now,
            version: 0,
        };
        enrollment.recompute(outline, now);
        enrollment
    }

    /// Reshapes progress to match `outline` and derives topic completion,
    /// percentage and status. Progress of lessons that still exist is kept,
    /// even if they moved to another topic.
    pub fn recompute(&mut self, outline: &Outline, now: i64) {
        let mut known: HashMap<ObjectId, LessonProgress> = self
            .progress
            .drain(..)
            .flat_map(|topic| topic.lessons)
            .map(|lesson| (lesson.lesson_id, lesson))
            .collect();

        self.progress = outline
            .topics
            .iter()
            .map(|topic| {
                let lessons: Vec<LessonProgress> = topic
                    .lesson_ids
                    .iter()
                    .map(|id| known.remove(id).unwrap_or_else(|| LessonProgress::pending(*id)))
                    .collect();
                TopicProgress {
                    topic_id: topic.topic_id,
                    completed: !lessons.is_empty() && lessons.iter().all(|l| l.completed),
                    lessons,
                }
            })
            .collect();

        let total = self.total_lessons();
        let done = self.completed_lessons();

        self.progress_percent = if total == 0 { 0 } else { (done * 100 / total) as u32 };
        self.status = if total > 0 && done == total {
            EnrollmentStatus::Completed
        } else if done > 0 {
            EnrollmentStatus::InProgress
        } else {
            EnrollmentStatus::NotStarted
        };
        self.completed_at = match self.status {
            EnrollmentStatus::Completed => self.completed_at.or(Some(now)),
            _ => None,
        };
        self.updated_at = now;
    }

    /// Applies a graded attempt at `lesson_id`. Fails when the lesson is not
    /// part of the course outline.
    pub fn record_lesson(
        &mut self,
        lesson_id: ObjectId,
        quiz: &QuizResult,
        outline: &Outline,
        now: i64,
    ) -> Result<LessonOutcome, AppError> {
        self.recompute(outline, now);

        let lesson = self
            .progress
            .iter_mut()
            .flat_map(|t| t.lessons.iter_mut())
            .find(|l| l.lesson_id == lesson_id)
            .ok_or_else(|| AppError::NotFound("Lesson is not part of this course".into()))?;

        if quiz.total > 0 {
            lesson.quiz_score = Some(lesson.quiz_score.unwrap_or(0).max(quiz.score_percent));
        }

        let first_completion = quiz.passed && !lesson.completed;
        if first_completion {
            lesson.completed = true;
            lesson.completed_at = Some(now);
        }
        let lesson_completed = lesson.completed;

        if quiz.passed {
            self.last_lesson_id = Some(lesson_id);
        }
        self.recompute(outline, now);
        self.version += 1;

        Ok(LessonOutcome { lesson_completed, first_completion })
    }

    pub fn total_lessons(&self) -> usize {
        self.progress.iter().map(|t| t.lessons.len()).sum()
    }

    pub fn completed_lessons(&self) -> usize {
        self.progress
            .iter()
            .flat_map(|t| t.lessons.iter())
            .filter(|l| l.completed)
            .count()
    }

    pub fn lesson(&self, lesson_id: &ObjectId) -> Option<&LessonProgress> {
        self.progress
            .iter()
            .flat_map(|t| t.lessons.iter())
            .find(|l| &l.lesson_id == lesson_id)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct EnrollRequest {
    pub course_id: String,
}

impl Validate for EnrollRequest {
    fn validate(&self) -> Result<(), AppError> {
        parse_object_id(&self.course_id, "course").map(|_| ())
    }
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct CompleteLessonRequest {
    /// Selected option index for each quiz question, in order
    pub quiz_answers: Option<Vec<i32>>,
}

impl Validate for CompleteLessonRequest {
    fn validate(&self) -> Result<(), AppError> {
        match &self.quiz_answers {
            Some(answers) if answers.len() > 20 => {
                Err(AppError::Validation("Too many quiz answers".into()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LessonProgressResponse {
    pub lesson_id: String,
    pub completed: bool,
    pub completed_at: Option<i64>,
    pub quiz_score: Option<u32>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TopicProgressResponse {
    pub topic_id: String,
    pub completed: bool,
    pub lessons: Vec<LessonProgressResponse>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EnrollmentResponse {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,
    pub status: EnrollmentStatus,
    pub progress_percent: u32,
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub progress: Vec<TopicProgressResponse>,
    pub last_lesson_id: Option<String>,
    pub enrolled_at: i64,
    pub completed_at: Option<i64>,
    pub updated_at: i64,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(e: Enrollment) -> Self {
        let completed_lessons = e.completed_lessons();
        let total_lessons = e.total_lessons();
        EnrollmentResponse {
            id: e.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: e.user_id.to_hex(),
            course_id: e.course_id.to_hex(),
            course_title: None,
            status: e.status,
            progress_percent: e.progress_percent,
            completed_lessons,
            total_lessons,
            progress: e
                .progress
                .into_iter()
                .map(|t| TopicProgressResponse {
                    topic_id: t.topic_id.to_hex(),
                    completed: t.completed,
                    lessons: t
                        .lessons
                        .into_iter()
                        .map(|l| LessonProgressResponse {
                            lesson_id: l.lesson_id.to_hex(),
                            completed: l.completed,
                            completed_at: l.completed_at,
                            quiz_score: l.quiz_score,
                        })
                        .collect(),
                })
                .collect(),
            last_lesson_id: e.last_lesson_id.map(|id| id.to_hex()),
            enrolled_at: e.enrolled_at,
            completed_at: e.completed_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LessonCompletionResponse {
    pub quiz: QuizResult,
    pub lesson_completed: bool,
    pub xp_awarded: i64,
    pub enrollment: EnrollmentResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::OutlineTopic;

    fn outline(shape: &[usize]) -> Outline {
        Outline {
            topics: shape
                .iter()
                .map(|n| OutlineTopic {
                    topic_id: ObjectId::new(),
                    lesson_ids: (0..*n).map(|_| ObjectId::new()).collect(),
                })
                .collect(),
        }
    }

    fn pass() -> QuizResult {
        QuizResult { correct: 0, total: 0, score_percent: 100, passed: true }
    }

    fn fail(score: u32) -> QuizResult {
        QuizResult { correct: 1, total: 3, score_percent: score, passed: false }
    }

    #[test]
    fn new_enrollment_mirrors_outline() {
        let o = outline(&[2, 1]);
        let e = Enrollment::new(ObjectId::new(), ObjectId::new(), &o, 100);

        assert_eq!(e.status, EnrollmentStatus::NotStarted);
        assert_eq!(e.progress.len(), 2);
        assert_eq!(e.total_lessons(), 3);
        assert_eq!(e.progress_percent, 0);
        assert!(e.progress.iter().all(|t| !t.completed));
    }

    #[test]
    fn completing_lessons_derives_status() {
        let o = outline(&[2, 1]);
        let mut e = Enrollment::new(ObjectId::new(), ObjectId::new(), &o, 100);

        let first = o.topics[0].lesson_ids[0];
        let outcome = e.record_lesson(first, &pass(), &o, 200).unwrap();
        assert!(outcome.first_completion);
        assert_eq!(e.status, EnrollmentStatus::InProgress);
        assert_eq!(e.progress_percent, 33);
        assert_eq!(e.last_lesson_id, Some(first));

        e.record_lesson(o.topics[0].lesson_ids[1], &pass(), &o, 300).unwrap();
        assert!(e.progress[0].completed);
        assert!(!e.progress[1].completed);

        e.record_lesson(o.topics[1].lesson_ids[0], &pass(), &o, 400).unwrap();
        assert_eq!(e.status, EnrollmentStatus::Completed);
        assert_eq!(e.progress_percent, 100);
        assert_eq!(e.completed_at, Some(400));
    }

    #[test]
    fn repeat_completion_is_not_first() {
        let o = outline(&[1]);
        let mut e = Enrollment::new(ObjectId::new(), ObjectId::new(), &o, 0);
        let lesson = o.topics[0].lesson_ids[0];

        assert!(e.record_lesson(lesson, &pass(), &o, 1).unwrap().first_completion);
        let again = e.record_lesson(lesson, &pass(), &o, 2).unwrap();
        assert!(again.lesson_completed);
        assert!(!again.first_completion);
        assert_eq!(e.lesson(&lesson).unwrap().completed_at, Some(1));
        assert_eq!(e.completed_at, Some(1));
    }

    #[test]
    fn failed_quiz_keeps_best_score_only() {
        let o = outline(&[1]);
        let mut e = Enrollment::new(ObjectId::new(), ObjectId::new(), &o, 0);
        let lesson = o.topics[0].lesson_ids[0];

        let outcome = e.record_lesson(lesson, &fail(60), &o, 1).unwrap();
        assert!(!outcome.lesson_completed);
        e.record_lesson(lesson, &fail(33), &o, 2).unwrap();

        let progress = e.lesson(&lesson).unwrap();
        assert!(!progress.completed);
        assert_eq!(progress.quiz_score, Some(60));
        assert_eq!(e.status, EnrollmentStatus::NotStarted);
        assert_eq!(e.last_lesson_id, None);
    }

    #[test]
    fn writes_in_same_second_get_distinct_versions() {
        let o = outline(&[2]);
        let mut e = Enrollment::new(ObjectId::new(), ObjectId::new(), &o, 10);
        assert_eq!(e.version, 0);

        e.record_lesson(o.topics[0].lesson_ids[0], &pass(), &o, 10).unwrap();
        e.record_lesson(o.topics[0].lesson_ids[1], &fail(10), &o, 10).unwrap();
        assert_eq!(e.updated_at, 10);
        assert_eq!(e.version, 2);
    }

    #[test]
    fn unknown_lesson_is_rejected() {
        let o = outline(&[1]);
        let mut e = Enrollment::new(ObjectId::new(), ObjectId::new(), &o, 0);
        let err = e.record_lesson(ObjectId::new(), &pass(), &o, 1).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn outline_changes_reopen_completed_course() {
        let mut o = outline(&[1]);
        let mut e = Enrollment::new(ObjectId::new(), ObjectId::new(), &o, 0);
        e.record_lesson(o.topics[0].lesson_ids[0], &pass(), &o, 10).unwrap();
        assert_eq!(e.status, EnrollmentStatus::Completed);

        // a new lesson is published in the same topic
        o.topics[0].lesson_ids.push(ObjectId::new());
        e.recompute(&o, 20);
        assert_eq!(e.status, EnrollmentStatus::InProgress);
        assert_eq!(e.progress_percent, 50);
        assert_eq!(e.completed_at, None);
        assert!(!e.progress[0].completed);
    }

    #[test]
    fn progress_survives_lesson_moves_and_drops_removed_lessons() {
        let mut o = outline(&[2, 0]);
        let mut e = Enrollment::new(ObjectId::new(), ObjectId::new(), &o, 0);
        let moved = o.topics[0].lesson_ids[1];
        e.record_lesson(moved, &pass(), &o, 1).unwrap();

        // move the completed lesson to the second topic, delete the first lesson
        o.topics[0].lesson_ids.clear();
        o.topics[1].lesson_ids.push(moved);
        e.recompute(&o, 2);

        assert_eq!(e.total_lessons(), 1);
        assert!(!e.progress[0].completed, "empty topics are never complete");
        assert!(e.progress[1].completed);
        assert_eq!(e.status, EnrollmentStatus::Completed);
    }

    #[test]
    fn empty_course_never_completes() {
        let o = outline(&[]);
        let e = Enrollment::new(ObjectId::new(), ObjectId::new(), &o, 0);
        assert_eq!(e.status, EnrollmentStatus::NotStarted);
        assert_eq!(e.progress_percent, 0);
    }
}

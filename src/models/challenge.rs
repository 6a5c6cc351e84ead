use crate::models::course::Difficulty;
use crate::utils::time::{parse_day, DAY_FORMAT};
use crate::utils::validation::{optional_text, require_text, Validate};
use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const MAX_CODE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_hidden: bool,
}

/// Desafio diário (um por dia, agendado)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyChallenge {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Runner language, e.g. "python", "javascript"
    pub language: String,
    pub starter_code: Option<String>,
    pub test_cases: Vec<TestCase>,
    pub points: i64,
    /// `YYYY-MM-DD` (UTC) the challenge is live on
    pub scheduled_for: String,
    pub created_by: ObjectId,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TestResult {
    pub index: usize,
    pub passed: bool,
    pub is_hidden: bool,
    pub input: Option<String>,
    pub expected_output: Option<String>,
    pub actual_output: Option<String>,
    pub error: Option<String>,
}

impl TestResult {
    /// Strips everything a learner must not see for hidden cases.
    pub fn redacted(mut self) -> Self {
        if self.is_hidden {
            self.input = None;
            self.expected_output = None;
            self.actual_output = None;
            self.error = None;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSubmission {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub challenge_id: ObjectId,
    /// Calendar day of the submission; part of the unique key
    pub day: String,
    pub language: String,
    pub code: String,
    pub results: Vec<TestResult>,
    pub passed_count: usize,
    pub total: usize,
    pub score: i64,
    pub submitted_at: i64,
}

/// Compares program output with the expected one, ignoring trailing
/// whitespace on each line and trailing blank lines.
pub fn output_matches(expected: &str, actual: &str) -> bool {
    fn normalize(s: &str) -> Vec<&str> {
        let mut lines: Vec<&str> = s.lines().map(str::trim_end).collect();
        while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }
        lines
    }
    normalize(expected) == normalize(actual)
}

pub fn challenge_score(points: i64, passed: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    points * passed as i64 / total as i64
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateChallengeRequest {
    pub title: String,
    pub description: String,
    pub difficulty: Option<Difficulty>,
    pub language: String,
    pub starter_code: Option<String>,
    pub test_cases: Vec<TestCase>,
    pub points: Option<i64>,
    pub scheduled_for: String,
}

impl Validate for CreateChallengeRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_text(&self.title, "Title", 120)?;
        require_text(&self.description, "Description", 10_000)?;
        require_text(&self.language, "Language", 30)?;
        validate_day(&self.scheduled_for)?;
        validate_points(self.points)?;
        validate_test_cases(&self.test_cases)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateChallengeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub language: Option<String>,
    pub starter_code: Option<String>,
    pub test_cases: Option<Vec<TestCase>>,
    pub points: Option<i64>,
    pub scheduled_for: Option<String>,
}

impl Validate for UpdateChallengeRequest {
    fn validate(&self) -> Result<(), AppError> {
        optional_text(self.title.as_deref(), "Title", 120)?;
        optional_text(self.description.as_deref(), "Description", 10_000)?;
        optional_text(self.language.as_deref(), "Language", 30)?;
        if let Some(day) = &self.scheduled_for {
            validate_day(day)?;
        }
        validate_points(self.points)?;
        match &self.test_cases {
            Some(cases) => validate_test_cases(cases),
            None => Ok(()),
        }
    }
}

fn validate_day(day: &str) -> Result<(), AppError> {
    canonical_day(day).map(|_| ())
}

/// Zero-padded `YYYY-MM-DD` form of `raw`, the only form stored and
/// compared against `day_key`.
pub fn canonical_day(raw: &str) -> Result<String, AppError> {
    parse_day(raw)
        .map(|date| date.format(DAY_FORMAT).to_string())
        .ok_or_else(|| AppError::Validation("scheduled_for must be YYYY-MM-DD".into()))
}

fn validate_points(points: Option<i64>) -> Result<(), AppError> {
    match points {
        Some(p) if !(1..=1000).contains(&p) => {
            Err(AppError::Validation("points must be between 1 and 1000".into()))
        }
        _ => Ok(()),
    }
}

fn validate_test_cases(cases: &[TestCase]) -> Result<(), AppError> {
    if cases.is_empty() {
        return Err(AppError::Validation("At least one test case is required".into()));
    }
    if cases.len() > 30 {
        return Err(AppError::Validation("At most 30 test cases are allowed".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmitSolutionRequest {
    pub code: String,
    pub language: Option<String>,
}

impl Validate for SubmitSolutionRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.code.trim().is_empty() {
            return Err(AppError::Validation("Code is required".into()));
        }
        if self.code.len() > MAX_CODE_BYTES {
            return Err(AppError::Validation("Code is too large".into()));
        }
        optional_text(self.language.as_deref(), "Language", 30)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PublicTestCase {
    pub input: Option<String>,
    pub expected_output: Option<String>,
    pub is_hidden: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ChallengeResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub language: String,
    pub starter_code: Option<String>,
    pub test_cases: Vec<PublicTestCase>,
    pub points: i64,
    pub scheduled_for: String,
    pub created_at: i64,
}

impl From<DailyChallenge> for ChallengeResponse {
    fn from(c: DailyChallenge) -> Self {
        ChallengeResponse {
            id: c.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: c.title,
            description: c.description,
            difficulty: c.difficulty,
            language: c.language,
            starter_code: c.starter_code,
            test_cases: c
                .test_cases
                .into_iter()
                .map(|t| {
                    if t.is_hidden {
                        PublicTestCase { input: None, expected_output: None, is_hidden: true }
                    } else {
                        PublicTestCase {
                            input: Some(t.input),
                            expected_output: Some(t.expected_output),
                            is_hidden: false,
                        }
                    }
                })
                .collect(),
            points: c.points,
            scheduled_for: c.scheduled_for,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: String,
    pub challenge_id: String,
    pub day: String,
    pub language: String,
    pub results: Vec<TestResult>,
    pub passed_count: usize,
    pub total: usize,
    pub score: i64,
    pub submitted_at: i64,
}

impl From<ChallengeSubmission> for SubmissionResponse {
    fn from(s: ChallengeSubmission) -> Self {
        SubmissionResponse {
            id: s.id.map(|id| id.to_hex()).unwrap_or_default(),
            challenge_id: s.challenge_id.to_hex(),
            day: s.day,
            language: s.language,
            results: s.results.into_iter().map(TestResult::redacted).collect(),
            passed_count: s.passed_count,
            total: s.total,
            score: s.score,
            submitted_at: s.submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_comparison_ignores_trailing_whitespace() {
        assert!(output_matches("1\n2\n", "1  \n2"));
        assert!(output_matches("hello", "hello\n\n"));
        assert!(output_matches("a\r\nb", "a\nb"));
        assert!(!output_matches("1\n2", "1\n3"));
        assert!(!output_matches(" x", "x"), "leading whitespace is significant");
    }

    #[test]
    fn scheduled_day_is_stored_zero_padded() {
        assert_eq!(canonical_day("2026-1-5").unwrap(), "2026-01-05");
        assert_eq!(canonical_day(" 2026-01-05").unwrap(), "2026-01-05");
        assert_eq!(canonical_day("2026-01-05 ").unwrap(), "2026-01-05");
        assert_eq!(
            canonical_day("2026-1-5").unwrap(),
            crate::utils::time::day_key(1_767_571_200),
            "must equal the key used to look up today's challenge"
        );
        assert!(canonical_day("05/01/2026").is_err());
        assert!(canonical_day("2026-02-30").is_err());
    }

    #[test]
    fn score_is_proportional() {
        assert_eq!(challenge_score(100, 3, 4), 75);
        assert_eq!(challenge_score(10, 1, 3), 3);
        assert_eq!(challenge_score(50, 0, 0), 0);
    }

    #[test]
    fn hidden_cases_are_masked() {
        let challenge = DailyChallenge {
            id: Some(ObjectId::new()),
            title: "FizzBuzz".into(),
            description: "classic".into(),
            difficulty: Difficulty::Beginner,
            language: "python".into(),
            starter_code: None,
            test_cases: vec![
                TestCase { input: "3".into(), expected_output: "Fizz".into(), is_hidden: false },
                TestCase { input: "15".into(), expected_output: "FizzBuzz".into(), is_hidden: true },
            ],
            points: 100,
            scheduled_for: "2026-10-18".into(),
            created_by: ObjectId::new(),
            created_at: 0,
            updated_at: 0,
        };
        let resp = ChallengeResponse::from(challenge);
        assert_eq!(resp.test_cases[0].input.as_deref(), Some("3"));
        assert!(resp.test_cases[1].input.is_none());
        assert!(resp.test_cases[1].expected_output.is_none());
    }

    #[test]
    fn create_request_needs_test_cases_and_valid_day() {
        let mut req = CreateChallengeRequest {
            title: "Sum".into(),
            description: "Add two numbers".into(),
            difficulty: None,
            language: "python".into(),
            starter_code: None,
            test_cases: vec![],
            points: Some(50),
            scheduled_for: "2026-10-18".into(),
        };
        assert!(req.validate().is_err());

        req.test_cases.push(TestCase { input: "1 2".into(), expected_output: "3".into(), is_hidden: false });
        assert!(req.validate().is_ok());

        req.scheduled_for = "18/10/2026".into();
        assert!(req.validate().is_err());
    }
}

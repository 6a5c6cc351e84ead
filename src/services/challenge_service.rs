use crate::{
    database::{MongoDB, CHALLENGE_SUBMISSIONS, DAILY_CHALLENGES},
    middleware::auth::Claims,
    models::{
        canonical_day, challenge_score, output_matches, ChallengeResponse, ChallengeSubmission, CreateChallengeRequest,
        DailyChallenge, PageQuery, Paginated, Role, SubmissionResponse, SubmitSolutionRequest, TestCase,
        TestResult, UpdateChallengeRequest,
    },
    services::code_runner::CodeRunner,
    services::{leaderboard_service, user_service},
    utils::time::{day_key, now_ts},
    utils::{AppError, AppResult},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};

pub const DEFAULT_POINTS: i64 = 100;

fn ensure_can_manage(claims: &Claims, challenge: &DailyChallenge) -> AppResult<()> {
    claims.require_author()?;
    if claims.role == Role::Admin || claims.user_id()? == challenge.created_by {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the challenge author can change this challenge".into()))
    }
}

async fn find_challenge(db: &MongoDB, challenge_id: &ObjectId) -> AppResult<DailyChallenge> {
    db.collection::<DailyChallenge>(DAILY_CHALLENGES)
        .find_one(doc! { "_id": challenge_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))
}

pub async fn today(db: &MongoDB) -> AppResult<ChallengeResponse> {
    let day = day_key(now_ts());
    db.collection::<DailyChallenge>(DAILY_CHALLENGES)
        .find_one(doc! { "scheduled_for": &day })
        .await?
        .map(ChallengeResponse::from)
        .ok_or_else(|| AppError::NotFound(format!("No challenge scheduled for {}", day)))
}

/// Challenges already released, newest first.
pub async fn list(db: &MongoDB, paging: &PageQuery) -> AppResult<Paginated<ChallengeResponse>> {
    let filter = doc! { "scheduled_for": { "$lte": day_key(now_ts()) } };
    let collection = db.collection::<DailyChallenge>(DAILY_CHALLENGES);

    let total = collection.count_documents(filter.clone()).await?;
    let challenges: Vec<DailyChallenge> = collection
        .find(filter)
        .sort(doc! { "scheduled_for": -1 })
        .skip(paging.skip())
        .limit(paging.limit())
        .await?
        .try_collect()
        .await?;

    Ok(Paginated::new(
        challenges.into_iter().map(ChallengeResponse::from).collect(),
        paging,
        total,
    ))
}

/// Future challenges stay hidden from learners.
pub async fn get(db: &MongoDB, challenge_id: &ObjectId, viewer: Option<&Claims>) -> AppResult<ChallengeResponse> {
    let challenge = find_challenge(db, challenge_id).await?;
    let released = challenge.scheduled_for <= day_key(now_ts());
    if !released && !viewer.map(|c| c.role.can_author()).unwrap_or(false) {
        return Err(AppError::NotFound("Challenge not found".into()));
    }
    Ok(ChallengeResponse::from(challenge))
}

pub async fn create(db: &MongoDB, claims: &Claims, request: &CreateChallengeRequest) -> AppResult<ChallengeResponse> {
    claims.require_author()?;

    let now = now_ts();
    let mut challenge = DailyChallenge {
        id: None,
        title: request.title.trim().to_string(),
        description: request.description.clone(),
        difficulty: request.difficulty.unwrap_or_default(),
        language: request.language.trim().to_lowercase(),
        starter_code: request.starter_code.clone(),
        test_cases: request.test_cases.clone(),
        points: request.points.unwrap_or(DEFAULT_POINTS),
        scheduled_for: canonical_day(&request.scheduled_for)?,
        created_by: claims.user_id()?,
        created_at: now,
        updated_at: now,
    };

    let duplicate = format!("A challenge is already scheduled for {}", challenge.scheduled_for);
    let result = db
        .collection::<DailyChallenge>(DAILY_CHALLENGES)
        .insert_one(&challenge)
        .await
        .map_err(|e| AppError::on_duplicate(e, &duplicate))?;
    challenge.id = result.inserted_id.as_object_id();

    log::info!("🧩 Challenge '{}' scheduled for {}", challenge.title, challenge.scheduled_for);
    Ok(ChallengeResponse::from(challenge))
}

fn challenge_changes(request: &UpdateChallengeRequest) -> AppResult<Document> {
    let mut set = Document::new();
    if let Some(title) = &request.title {
        set.insert("title", title.trim());
    }
    if let Some(description) = &request.description {
        set.insert("description", description);
    }
    if let Some(difficulty) = request.difficulty {
        set.insert("difficulty", difficulty.as_str());
    }
    if let Some(language) = &request.language {
        set.insert("language", language.trim().to_lowercase());
    }
    if let Some(starter) = &request.starter_code {
        set.insert("starter_code", starter);
    }
    if let Some(cases) = &request.test_cases {
        set.insert("test_cases", to_bson(cases)?);
    }
    if let Some(points) = request.points {
        set.insert("points", points);
    }
    if let Some(day) = &request.scheduled_for {
        set.insert("scheduled_for", canonical_day(day)?);
    }
    Ok(set)
}

pub async fn update(
    db: &MongoDB,
    claims: &Claims,
    challenge_id: &ObjectId,
    request: &UpdateChallengeRequest,
) -> AppResult<ChallengeResponse> {
    let challenge = find_challenge(db, challenge_id).await?;
    ensure_can_manage(claims, &challenge)?;

    let mut set = challenge_changes(request)?;
    if !set.is_empty() {
        set.insert("updated_at", now_ts());
        db.collection::<DailyChallenge>(DAILY_CHALLENGES)
            .update_one(doc! { "_id": challenge_id }, doc! { "$set": set })
            .await
            .map_err(|e| AppError::on_duplicate(e, "Another challenge is already scheduled for that day"))?;
    }

    find_challenge(db, challenge_id).await.map(ChallengeResponse::from)
}

pub async fn delete(db: &MongoDB, claims: &Claims, challenge_id: &ObjectId) -> AppResult<()> {
    let challenge = find_challenge(db, challenge_id).await?;
    ensure_can_manage(claims, &challenge)?;

    db.collection::<DailyChallenge>(DAILY_CHALLENGES)
        .delete_one(doc! { "_id": challenge_id })
        .await?;

    log::info!("🗑️ Challenge {} ({}) deleted", challenge_id, challenge.scheduled_for);
    Ok(())
}

/// Runs `code` against every test case. Program failures count as failed
/// cases; an unreachable runner aborts the whole evaluation.
pub async fn evaluate(
    runner: &dyn CodeRunner,
    language: &str,
    code: &str,
    cases: &[TestCase],
) -> AppResult<Vec<TestResult>> {
    let mut results = Vec::with_capacity(cases.len());

    for (index, case) in cases.iter().enumerate() {
        let output = runner.run(language, code, &case.input).await?;
        let passed = output.succeeded() && output_matches(&case.expected_output, &output.stdout);
        let error = match (passed, output.stderr.trim().is_empty()) {
            (false, false) => Some(output.stderr.clone()),
            (false, true) if !output.succeeded() => Some(match output.exit_code {
                Some(code) => format!("Process exited with code {}", code),
                None => "Process was killed (time limit exceeded?)".to_string(),
            }),
            _ => None,
        };

        results.push(TestResult {
            index,
            passed,
            is_hidden: case.is_hidden,
            input: Some(case.input.clone()),
            expected_output: Some(case.expected_output.clone()),
            actual_output: Some(output.stdout),
            error,
        });
    }

    Ok(results)
}

/// Scores a solution to today's challenge. One submission per user and day.
pub async fn submit(
    db: &MongoDB,
    runner: &dyn CodeRunner,
    user_id: &ObjectId,
    challenge_id: &ObjectId,
    request: &SubmitSolutionRequest,
) -> AppResult<SubmissionResponse> {
    let challenge = find_challenge(db, challenge_id).await?;
    let now = now_ts();
    let day = day_key(now);

    if challenge.scheduled_for != day {
        return Err(AppError::Validation("Only today's challenge accepts submissions".into()));
    }

    let submissions = db.collection::<ChallengeSubmission>(CHALLENGE_SUBMISSIONS);
    let already = submissions
        .find_one(doc! { "user_id": user_id, "challenge_id": challenge_id, "day": &day })
        .await?;
    if already.is_some() {
        return Err(AppError::Conflict("You already submitted today's challenge".into()));
    }

    let language = request
        .language
        .as_deref()
        .map(|l| l.trim().to_lowercase())
        .unwrap_or_else(|| challenge.language.clone());

    let results = evaluate(runner, &language, &request.code, &challenge.test_cases).await?;
    let passed_count = results.iter().filter(|r| r.passed).count();
    let total = results.len();
    let score = challenge_score(challenge.points, passed_count, total);

    let mut submission = ChallengeSubmission {
        id: None,
        user_id: *user_id,
        challenge_id: *challenge_id,
        day: day.clone(),
        language,
        code: request.code.clone(),
        results,
        passed_count,
        total,
        score,
        submitted_at: now,
    };

    let result = submissions
        .insert_one(&submission)
        .await
        .map_err(|e| AppError::on_duplicate(e, "You already submitted today's challenge"))?;
    submission.id = result.inserted_id.as_object_id();

    leaderboard_service::award_xp(db, user_id, score).await?;
    let streak = user_service::record_streak(db, user_id, &day).await?;

    log::info!(
        "🧪 User {} scored {} on challenge {} ({}/{} passed, streak {})",
        user_id,
        score,
        challenge_id,
        passed_count,
        total,
        streak.current
    );

    Ok(SubmissionResponse::from(submission))
}

pub async fn my_submission(db: &MongoDB, user_id: &ObjectId, challenge_id: &ObjectId) -> AppResult<SubmissionResponse> {
    db.collection::<ChallengeSubmission>(CHALLENGE_SUBMISSIONS)
        .find_one(doc! { "user_id": user_id, "challenge_id": challenge_id })
        .sort(doc! { "submitted_at": -1 })
        .await?
        .map(SubmissionResponse::from)
        .ok_or_else(|| AppError::NotFound("No submission for this challenge".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::code_runner::RunOutput;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Echo runner: maps stdin to a canned output.
    struct FakeRunner {
        outputs: HashMap<String, RunOutput>,
    }

    #[async_trait]
    impl CodeRunner for FakeRunner {
        async fn run(&self, _language: &str, _code: &str, stdin: &str) -> AppResult<RunOutput> {
            self.outputs
                .get(stdin)
                .cloned()
                .ok_or_else(|| AppError::External("runner down".into()))
        }
    }

    fn ok(stdout: &str) -> RunOutput {
        RunOutput { stdout: stdout.into(), stderr: String::new(), exit_code: Some(0) }
    }

    fn case(input: &str, expected: &str, hidden: bool) -> TestCase {
        TestCase { input: input.into(), expected_output: expected.into(), is_hidden: hidden }
    }

    #[tokio::test]
    async fn evaluates_each_case() {
        let runner = FakeRunner {
            outputs: HashMap::from([
                ("1".to_string(), ok("2\n")),
                ("2".to_string(), ok("5")),
                (
                    "3".to_string(),
                    RunOutput { stdout: String::new(), stderr: "Traceback".into(), exit_code: Some(1) },
                ),
            ]),
        };
        let cases = vec![case("1", "2", false), case("2", "4", true), case("3", "6", false)];

        let results = evaluate(&runner, "python", "print(int(input())*2)", &cases).await.unwrap();
        assert_eq!(results.iter().filter(|r| r.passed).count(), 1);
        assert!(results[0].passed);
        assert!(!results[1].passed);
        assert_eq!(results[2].error.as_deref(), Some("Traceback"));

        let hidden = results[1].clone().redacted();
        assert!(hidden.input.is_none() && hidden.actual_output.is_none());
        assert_eq!(challenge_score(100, 1, 3), 33);
    }

    #[tokio::test]
    async fn runner_outage_aborts() {
        let runner = FakeRunner { outputs: HashMap::new() };
        let result = evaluate(&runner, "python", "pass", &[case("1", "1", false)]).await;
        assert!(matches!(result, Err(AppError::External(_))));
    }

    #[tokio::test]
    async fn killed_process_reports_time_limit() {
        let runner = FakeRunner {
            outputs: HashMap::from([(
                "x".to_string(),
                RunOutput { stdout: String::new(), stderr: String::new(), exit_code: None },
            )]),
        };
        let results = evaluate(&runner, "python", "while True: pass", &[case("x", "", false)]).await.unwrap();
        assert!(!results[0].passed);
        assert!(results[0].error.as_deref().unwrap().contains("killed"));
    }

    #[test]
    fn update_only_sets_given_fields() {
        let req = UpdateChallengeRequest {
            title: None,
            description: None,
            difficulty: None,
            language: Some(" Python ".into()),
            starter_code: None,
            test_cases: None,
            points: Some(50),
            scheduled_for: None,
        };
        let set = challenge_changes(&req).unwrap();
        assert_eq!(set.get_str("language").unwrap(), "python");
        assert_eq!(set.get_i64("points").unwrap(), 50);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn rescheduling_stores_padded_day() {
        let req = UpdateChallengeRequest {
            title: None,
            description: None,
            difficulty: None,
            language: None,
            starter_code: None,
            test_cases: None,
            points: None,
            scheduled_for: Some(" 2026-1-5 ".into()),
        };
        let set = challenge_changes(&req).unwrap();
        assert_eq!(set.get_str("scheduled_for").unwrap(), "2026-01-05");
    }
}

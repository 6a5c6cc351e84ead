use crate::{
    database::{MongoDB, ANSWERS, QUESTIONS},
    middleware::auth::Claims,
    models::{
        normalize_tags, sort_answers, Answer, AnswerRequest, AnswerResponse, AskQuestionRequest, PageQuery,
        Paginated, Question, QuestionQuery, QuestionResponse, QuestionThreadResponse, Role, VoteResponse,
    },
    services::user_service,
    utils::time::now_ts,
    utils::validation::parse_object_id,
    utils::{AppError, AppResult},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

fn list_filter(query: &QuestionQuery) -> AppResult<Document> {
    let mut filter = doc! { "is_deleted": false };
    if let Some(raw) = &query.course_id {
        filter.insert("course_id", parse_object_id(raw, "course")?);
    }
    if let Some(raw) = &query.lesson_id {
        filter.insert("lesson_id", parse_object_id(raw, "lesson")?);
    }
    if let Some(tag) = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        filter.insert("tags", tag.to_lowercase());
    }
    Ok(filter)
}

fn ensure_author_or_admin(claims: &Claims, author: &ObjectId) -> AppResult<()> {
    if claims.role == Role::Admin || claims.user_id()? == *author {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the author can do this".into()))
    }
}

async fn find_question(db: &MongoDB, question_id: &ObjectId) -> AppResult<Question> {
    db.collection::<Question>(QUESTIONS)
        .find_one(doc! { "_id": question_id, "is_deleted": false })
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".into()))
}

async fn find_answer(db: &MongoDB, answer_id: &ObjectId) -> AppResult<Answer> {
    db.collection::<Answer>(ANSWERS)
        .find_one(doc! { "_id": answer_id, "is_deleted": false })
        .await?
        .ok_or_else(|| AppError::NotFound("Answer not found".into()))
}

pub async fn list_questions(db: &MongoDB, query: &QuestionQuery) -> AppResult<Paginated<QuestionResponse>> {
    let paging = PageQuery { page: query.page, limit: query.limit };
    let filter = list_filter(query)?;
    let collection = db.collection::<Question>(QUESTIONS);

    let total = collection.count_documents(filter.clone()).await?;
    let questions: Vec<Question> = collection
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .skip(paging.skip())
        .limit(paging.limit())
        .await?
        .try_collect()
        .await?;

    Ok(Paginated::new(
        questions.into_iter().map(QuestionResponse::from).collect(),
        &paging,
        total,
    ))
}

pub async fn get_thread(db: &MongoDB, question_id: &ObjectId) -> AppResult<QuestionThreadResponse> {
    let question = find_question(db, question_id).await?;

    let mut answers: Vec<Answer> = db
        .collection::<Answer>(ANSWERS)
        .find(doc! { "question_id": question_id, "is_deleted": false })
        .await?
        .try_collect()
        .await?;
    sort_answers(&mut answers);

    Ok(QuestionThreadResponse {
        question: QuestionResponse::from(question),
        answers: answers.into_iter().map(AnswerResponse::from).collect(),
    })
}

pub async fn ask(db: &MongoDB, user_id: &ObjectId, request: &AskQuestionRequest) -> AppResult<QuestionResponse> {
    let author = user_service::find_user(db, user_id).await?;

    let course_id = request.course_id.as_deref().map(|raw| parse_object_id(raw, "course")).transpose()?;
    let lesson_id = request.lesson_id.as_deref().map(|raw| parse_object_id(raw, "lesson")).transpose()?;

    let now = now_ts();
    let mut question = Question {
        id: None,
        user_id: *user_id,
        author_name: author.name,
        course_id,
        lesson_id,
        title: request.title.trim().to_string(),
        body: request.body.clone(),
        tags: normalize_tags(request.tags.as_deref().unwrap_or_default()),
        upvotes: Vec::new(),
        answer_count: 0,
        accepted_answer_id: None,
        created_at: now,
        updated_at: now,
        is_deleted: false,
    };

    let result = db.collection::<Question>(QUESTIONS).insert_one(&question).await?;
    question.id = result.inserted_id.as_object_id();

    log::info!("❓ Question asked by {}: {}", user_id, question.title);
    Ok(QuestionResponse::from(question))
}

pub async fn answer(
    db: &MongoDB,
    user_id: &ObjectId,
    question_id: &ObjectId,
    request: &AnswerRequest,
) -> AppResult<AnswerResponse> {
    find_question(db, question_id).await?;
    let author = user_service::find_user(db, user_id).await?;

    let now = now_ts();
    let mut answer = Answer {
        id: None,
        question_id: *question_id,
        user_id: *user_id,
        author_name: author.name,
        body: request.body.clone(),
        upvotes: Vec::new(),
        is_accepted: false,
        created_at: now,
        updated_at: now,
        is_deleted: false,
    };

    let result = db.collection::<Answer>(ANSWERS).insert_one(&answer).await?;
    answer.id = result.inserted_id.as_object_id();

    db.collection::<Question>(QUESTIONS)
        .update_one(
            doc! { "_id": question_id },
            doc! { "$inc": { "answer_count": 1_i64 }, "$set": { "updated_at": now } },
        )
        .await?;

    Ok(AnswerResponse::from(answer))
}

/// Adds the caller's upvote, or takes it back if already given.
async fn toggle_vote(db: &MongoDB, collection: &str, id: &ObjectId, user_id: &ObjectId) -> AppResult<VoteResponse> {
    let collection = db.collection::<Document>(collection);

    let added = collection
        .update_one(
            doc! { "_id": id, "is_deleted": false, "upvotes": { "$ne": user_id } },
            doc! { "$addToSet": { "upvotes": user_id } },
        )
        .await?;

    let upvoted = if added.modified_count > 0 {
        true
    } else {
        let removed = collection
            .update_one(
                doc! { "_id": id, "is_deleted": false, "upvotes": user_id },
                doc! { "$pull": { "upvotes": user_id } },
            )
            .await?;
        if removed.matched_count == 0 {
            return Err(AppError::NotFound("Post not found".into()));
        }
        false
    };

    let upvotes = collection
        .find_one(doc! { "_id": id })
        .await?
        .and_then(|d| d.get_array("upvotes").ok().map(|a| a.len()))
        .unwrap_or(0);

    Ok(VoteResponse { upvoted, upvotes })
}

pub async fn toggle_question_vote(db: &MongoDB, user_id: &ObjectId, question_id: &ObjectId) -> AppResult<VoteResponse> {
    toggle_vote(db, QUESTIONS, question_id, user_id).await
}

pub async fn toggle_answer_vote(db: &MongoDB, user_id: &ObjectId, answer_id: &ObjectId) -> AppResult<VoteResponse> {
    toggle_vote(db, ANSWERS, answer_id, user_id).await
}

/// Question author marks `answer_id` as the accepted one, replacing any previous choice.
pub async fn accept_answer(
    db: &MongoDB,
    claims: &Claims,
    question_id: &ObjectId,
    answer_id: &ObjectId,
) -> AppResult<QuestionThreadResponse> {
    let question = find_question(db, question_id).await?;
    if claims.user_id()? != question.user_id {
        return Err(AppError::Forbidden("Only the question author can accept an answer".into()));
    }

    let answer = find_answer(db, answer_id).await?;
    if answer.question_id != *question_id {
        return Err(AppError::NotFound("Answer does not belong to this question".into()));
    }

    let now = now_ts();
    let answers = db.collection::<Answer>(ANSWERS);
    answers
        .update_many(
            doc! { "question_id": question_id, "is_accepted": true },
            doc! { "$set": { "is_accepted": false, "updated_at": now } },
        )
        .await?;
    answers
        .update_one(doc! { "_id": answer_id }, doc! { "$set": { "is_accepted": true, "updated_at": now } })
        .await?;
    db.collection::<Question>(QUESTIONS)
        .update_one(
            doc! { "_id": question_id },
            doc! { "$set": { "accepted_answer_id": answer_id, "updated_at": now } },
        )
        .await?;

    log::info!("✔️ Answer {} accepted on question {}", answer_id, question_id);
    get_thread(db, question_id).await
}

pub async fn delete_question(db: &MongoDB, claims: &Claims, question_id: &ObjectId) -> AppResult<()> {
    let question = find_question(db, question_id).await?;
    ensure_author_or_admin(claims, &question.user_id)?;

    db.collection::<Question>(QUESTIONS)
        .update_one(
            doc! { "_id": question_id },
            doc! { "$set": { "is_deleted": true, "updated_at": now_ts() } },
        )
        .await?;
    Ok(())
}

pub async fn delete_answer(db: &MongoDB, claims: &Claims, answer_id: &ObjectId) -> AppResult<()> {
    let answer = find_answer(db, answer_id).await?;
    ensure_author_or_admin(claims, &answer.user_id)?;

    let now = now_ts();
    db.collection::<Answer>(ANSWERS)
        .update_one(
            doc! { "_id": answer_id },
            doc! { "$set": { "is_deleted": true, "is_accepted": false, "updated_at": now } },
        )
        .await?;

    let mut update = doc! { "$inc": { "answer_count": -1_i64 }, "$set": { "updated_at": now } };
    if answer.is_accepted {
        update.insert("$unset", doc! { "accepted_answer_id": "" });
    }
    db.collection::<Question>(QUESTIONS)
        .update_one(doc! { "_id": answer.question_id, "answer_count": { "$gt": 0_i64 } }, update)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_rejects_malformed_ids() {
        let query = QuestionQuery { course_id: Some("nope".into()), ..Default::default() };
        assert!(matches!(list_filter(&query), Err(AppError::Validation(_))));
    }

    #[test]
    fn filter_combines_course_and_tag() {
        let course = ObjectId::new();
        let query = QuestionQuery {
            course_id: Some(course.to_hex()),
            tag: Some("Borrow-Checker".into()),
            ..Default::default()
        };
        let filter = list_filter(&query).unwrap();
        assert_eq!(filter.get_object_id("course_id").unwrap(), course);
        assert_eq!(filter.get_str("tags").unwrap(), "borrow-checker");
        assert!(!filter.get_bool("is_deleted").unwrap());
    }

    #[test]
    fn admins_may_moderate() {
        let author = ObjectId::new();
        let claims = |id: ObjectId, role: Role| Claims {
            sub: id.to_hex(),
            email: String::new(),
            role,
            token_type: crate::services::auth_service::TokenKind::Access,
            iat: 0,
            exp: 0,
            jti: String::new(),
            aud: String::new(),
            iss: String::new(),
        };
        assert!(ensure_author_or_admin(&claims(author, Role::Student), &author).is_ok());
        assert!(ensure_author_or_admin(&claims(ObjectId::new(), Role::Admin), &author).is_ok());
        assert!(ensure_author_or_admin(&claims(ObjectId::new(), Role::Instructor), &author).is_err());
    }
}

use actix_web::{web, HttpResponse};
use crate::database::MongoDB;
use crate::middleware::auth::{require_user, Claims};
use crate::models::{LeaderboardQuery, LeaderboardRow, MyRankResponse};
use crate::services::leaderboard_service;
use crate::utils::AppResult;

/// GET /api/v1/leaderboard?period=all_time|weekly&limit=50
#[utoipa::path(
    get,
    path = "/api/v1/leaderboard",
    tag = "Leaderboard",
    params(
        ("period" = Option<String>, Query, description = "all_time (default) or weekly"),
        ("limit" = Option<i64>, Query, description = "Rows to return, max 100")
    ),
    responses(
        (status = 200, description = "Ranked rows", body = [LeaderboardRow])
    )
)]
pub async fn get_leaderboard(query: web::Query<LeaderboardQuery>, db: web::Data<MongoDB>) -> AppResult<HttpResponse> {
    let rows = leaderboard_service::top(&db, &query).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "period": query.period,
        "leaderboard": rows
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/leaderboard/me",
    tag = "Leaderboard",
    params(("period" = Option<String>, Query, description = "all_time (default) or weekly")),
    responses(
        (status = 200, description = "Caller's rank, null when unranked", body = MyRankResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_my_rank(
    query: web::Query<LeaderboardQuery>,
    claims: Option<web::ReqData<Claims>>,
    db: web::Data<MongoDB>,
) -> AppResult<HttpResponse> {
    let claims = require_user(claims)?;
    let rank = leaderboard_service::my_rank(&db, &claims.user_id()?, query.period).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "rank": rank
    })))
}

pub mod health;
pub mod auth;
pub mod users;
pub mod courses;
pub mod topics;
pub mod lessons;
pub mod enrollments;
pub mod payments;
pub mod leaderboard;
pub mod challenges;
pub mod questions;
pub mod projects;
pub mod swagger;

use actix_web::HttpResponse;
use serde::Serialize;

use crate::models::Paginated;
use crate::utils::{AppError, AppResult};

/// Flattens a page into the `{ "success": true, items, page, ... }` envelope.
pub fn ok_page<T: Serialize>(page: &Paginated<T>) -> AppResult<HttpResponse> {
    let mut body = serde_json::to_value(page).map_err(|e| AppError::Internal(e.to_string()))?;
    body["success"] = serde_json::Value::Bool(true);
    Ok(HttpResponse::Ok().json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageQuery;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn page_envelope_carries_success_flag() {
        let query = PageQuery { page: Some(2), limit: Some(2) };
        let page = Paginated::new(vec!["c", "d"], &query, 5);

        let resp = ok_page(&page).unwrap();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["items"], serde_json::json!(["c", "d"]));
        assert_eq!(body["page"], 2);
        assert_eq!(body["total"], 5);
        assert_eq!(body["total_pages"], 3);
    }
}

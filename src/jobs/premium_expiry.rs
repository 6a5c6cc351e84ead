// ==================== PREMIUM EXPIRY ====================
// Job automático que desliga o premium de usuários cuja assinatura venceu

use crate::{
    database::{MongoDB, USERS},
    utils::time::now_ts,
    utils::AppResult,
};
use mongodb::bson::{doc, Document};
use tokio::time::{interval, Duration};

const SWEEP_INTERVAL_SECS: u64 = 3600;

/// Inicia o job de expiração do premium.
/// Roda uma vez na inicialização e depois a cada hora. O acesso premium já é
/// checado contra `expires_at` em cada request; o job só mantém a flag coerente.
pub async fn start_premium_expiry_job(db: MongoDB) {
    log::info!("📅 Starting premium expiry job (runs every hour)");

    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

        loop {
            // First tick completes immediately
            interval.tick().await;

            match expire_premium(&db, now_ts()).await {
                Ok(0) => log::debug!("⏰ Premium sweep: nothing expired"),
                Ok(count) => log::info!("⏰ Premium sweep: {} subscriptions expired", count),
                Err(e) => log::error!("❌ Premium sweep failed: {}", e),
            }
        }
    });

    log::info!("✅ Premium expiry job started");
}

fn expired_filter(now: i64) -> Document {
    doc! {
        "premium.is_premium": true,
        "premium.expires_at": { "$lte": now },
    }
}

/// Clears the premium flag of every user whose subscription ended at or before `now`.
pub async fn expire_premium(db: &MongoDB, now: i64) -> AppResult<u64> {
    let result = db
        .collection::<Document>(USERS)
        .update_many(
            expired_filter(now),
            doc! { "$set": { "premium.is_premium": false, "updated_at": now } },
        )
        .await?;

    Ok(result.modified_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_targets_flagged_users_past_expiry() {
        let filter = expired_filter(1_700_000_000);
        assert_eq!(filter.get_bool("premium.is_premium").unwrap(), true);
        let expires = filter.get_document("premium.expires_at").unwrap();
        assert_eq!(expires.get_i64("$lte").unwrap(), 1_700_000_000);
    }
}

use crate::{
    database::{MongoDB, LEADERBOARD, USERS},
    models::{rank_rows, LeaderboardEntry, LeaderboardQuery, LeaderboardRow, MyRankResponse, Period, User},
    utils::time::{now_ts, week_key},
    utils::{AppError, AppResult},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

/// Pipeline update that adds `amount` to both counters, restarting the
/// weekly one when the stored week differs from `week`.
fn award_pipeline(user_id: &ObjectId, name: &str, amount: i64, week: &str, now: i64) -> Vec<Document> {
    vec![doc! {
        "$set": {
            "user_id": user_id,
            "name": name,
            "total_xp": { "$add": [{ "$ifNull": ["$total_xp", 0_i64] }, amount] },
            "weekly_xp": {
                "$cond": [
                    { "$eq": ["$week_key", week] },
                    { "$add": [{ "$ifNull": ["$weekly_xp", 0_i64] }, amount] },
                    amount
                ]
            },
            "week_key": week,
            "updated_at": now,
        }
    }]
}

/// Credits xp to the user and their leaderboard entry.
pub async fn award_xp(db: &MongoDB, user_id: &ObjectId, amount: i64) -> AppResult<()> {
    if amount <= 0 {
        return Ok(());
    }

    let user = db
        .collection::<User>(USERS)
        .find_one_and_update(doc! { "_id": user_id }, doc! { "$inc": { "xp": amount } })
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let now = now_ts();
    db.collection::<Document>(LEADERBOARD)
        .update_one(
            doc! { "user_id": user_id },
            award_pipeline(user_id, &user.name, amount, &week_key(now), now),
        )
        .upsert(true)
        .await?;

    log::info!("🏆 +{} xp for user {}", amount, user_id);
    Ok(())
}

fn period_filter(period: Period, week: &str) -> Document {
    match period {
        Period::AllTime => doc! {},
        Period::Weekly => doc! { "week_key": week, "weekly_xp": { "$gt": 0_i64 } },
    }
}

pub async fn top(db: &MongoDB, query: &LeaderboardQuery) -> AppResult<Vec<LeaderboardRow>> {
    let week = week_key(now_ts());
    let field = query.period.xp_field();

    let entries: Vec<LeaderboardEntry> = db
        .collection::<LeaderboardEntry>(LEADERBOARD)
        .find(period_filter(query.period, &week))
        .sort(doc! { field: -1, "updated_at": 1 })
        .limit(query.limit())
        .await?
        .try_collect()
        .await?;

    Ok(rank_rows(entries, query.period, &week))
}

/// Entries ranked strictly ahead of `entry` for the period.
fn ahead_filter(entry: &LeaderboardEntry, period: Period, week: &str) -> Document {
    let field = period.xp_field();
    let xp = entry.xp_for(period, week);

    let mut filter = period_filter(period, week);
    filter.insert(
        "$or",
        vec![
            doc! { field: { "$gt": xp } },
            doc! { field: xp, "updated_at": { "$lt": entry.updated_at } },
        ],
    );
    filter
}

pub async fn my_rank(db: &MongoDB, user_id: &ObjectId, period: Period) -> AppResult<MyRankResponse> {
    let week = week_key(now_ts());
    let collection = db.collection::<LeaderboardEntry>(LEADERBOARD);

    let entry = match collection.find_one(doc! { "user_id": user_id }).await? {
        Some(entry) if entry.xp_for(period, &week) > 0 || period == Period::AllTime => entry,
        _ => return Ok(MyRankResponse { period, rank: None, xp: 0 }),
    };

    let ahead = collection.count_documents(ahead_filter(&entry, period, &week)).await?;
    Ok(MyRankResponse {
        period,
        rank: Some(ahead + 1),
        xp: entry.xp_for(period, &week),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(weekly: i64, week: &str) -> LeaderboardEntry {
        LeaderboardEntry {
            id: None,
            user_id: ObjectId::new(),
            name: "Ada".into(),
            total_xp: 500,
            weekly_xp: weekly,
            week_key: week.into(),
            updated_at: 42,
        }
    }

    #[test]
    fn weekly_counter_restarts_on_new_week() {
        let stage = award_pipeline(&ObjectId::new(), "Ada", 30, "2026-W43", 1);
        let set = stage[0].get_document("$set").unwrap();
        let cond = set.get_document("weekly_xp").unwrap().get_array("$cond").unwrap();

        assert_eq!(cond.len(), 3);
        assert_eq!(cond[2].as_i64(), Some(30));
        assert_eq!(set.get_str("week_key").unwrap(), "2026-W43");
    }

    #[test]
    fn weekly_ranking_only_counts_current_week() {
        let filter = period_filter(Period::Weekly, "2026-W42");
        assert_eq!(filter.get_str("week_key").unwrap(), "2026-W42");
        assert!(period_filter(Period::AllTime, "2026-W42").is_empty());
    }

    #[test]
    fn ahead_filter_breaks_ties_by_time() {
        let e = entry(80, "2026-W42");
        let filter = ahead_filter(&e, Period::Weekly, "2026-W42");
        let or = filter.get_array("$or").unwrap();

        let strictly_more = or[0].as_document().unwrap().get_document("weekly_xp").unwrap();
        assert_eq!(strictly_more.get_i64("$gt").unwrap(), 80);
        let tie = or[1].as_document().unwrap();
        assert_eq!(tie.get_i64("weekly_xp").unwrap(), 80);
        assert_eq!(tie.get_document("updated_at").unwrap().get_i64("$lt").unwrap(), 42);
    }

    #[test]
    fn stale_week_counts_as_zero() {
        let e = entry(80, "2026-W41");
        assert_eq!(e.xp_for(Period::Weekly, "2026-W42"), 0);
        assert_eq!(e.xp_for(Period::AllTime, "2026-W42"), 500);
    }
}

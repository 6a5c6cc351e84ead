use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    AllTime,
    Weekly,
}

impl Period {
    /// Field the ranking is sorted on
    pub fn xp_field(&self) -> &'static str {
        match self {
            Period::AllTime => "total_xp",
            Period::Weekly => "weekly_xp",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub name: String,
    pub total_xp: i64,
    pub weekly_xp: i64,
    /// ISO week `weekly_xp` belongs to
    pub week_key: String,
    pub updated_at: i64,
}

impl LeaderboardEntry {
    pub fn xp_for(&self, period: Period, current_week: &str) -> i64 {
        match period {
            Period::AllTime => self.total_xp,
            Period::Weekly if self.week_key == current_week => self.weekly_xp,
            Period::Weekly => 0,
        }
    }

    /// Adds xp, starting the weekly counter over when the week rolled.
    pub fn add_xp(&mut self, amount: i64, week_key: &str, now: i64) {
        if self.week_key != week_key {
            self.week_key = week_key.to_string();
            self.weekly_xp = 0;
        }
        self.total_xp += amount;
        self.weekly_xp += amount;
        self.updated_at = now;
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub period: Period,
    pub limit: Option<i64>,
}

impl LeaderboardQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 100)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LeaderboardRow {
    pub rank: u64,
    pub user_id: String,
    pub name: String,
    pub xp: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MyRankResponse {
    pub period: Period,
    pub rank: Option<u64>,
    pub xp: i64,
}

/// Turns entries already sorted by the ranking order into rows with 1-based ranks.
pub fn rank_rows(entries: Vec<LeaderboardEntry>, period: Period, current_week: &str) -> Vec<LeaderboardRow> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| LeaderboardRow {
            rank: i as u64 + 1,
            user_id: entry.user_id.to_hex(),
            xp: entry.xp_for(period, current_week),
            name: entry.name,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(total: i64, weekly: i64, week: &str) -> LeaderboardEntry {
        LeaderboardEntry {
            id: None,
            user_id: ObjectId::new(),
            name: "ada".into(),
            total_xp: total,
            weekly_xp: weekly,
            week_key: week.into(),
            updated_at: 0,
        }
    }

    #[test]
    fn weekly_xp_resets_on_new_week() {
        let mut e = entry(100, 40, "2026-W41");
        e.add_xp(15, "2026-W42", 10);
        assert_eq!(e.total_xp, 115);
        assert_eq!(e.weekly_xp, 15);
        assert_eq!(e.week_key, "2026-W42");

        e.add_xp(5, "2026-W42", 11);
        assert_eq!(e.weekly_xp, 20);
        assert_eq!(e.updated_at, 11);
    }

    #[test]
    fn stale_week_counts_zero() {
        let e = entry(100, 40, "2026-W41");
        assert_eq!(e.xp_for(Period::Weekly, "2026-W42"), 0);
        assert_eq!(e.xp_for(Period::AllTime, "2026-W42"), 100);
    }

    #[test]
    fn ranks_are_one_based() {
        let rows = rank_rows(vec![entry(30, 0, "w"), entry(20, 0, "w")], Period::AllTime, "w");
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[1].xp, 20);
    }

    #[test]
    fn period_parses_snake_case() {
        let q: LeaderboardQuery = serde_json::from_str(r#"{"period":"weekly"}"#).unwrap();
        assert_eq!(q.period, Period::Weekly);
        assert_eq!(q.limit(), 50);
        assert_eq!(Period::Weekly.xp_field(), "weekly_xp");
    }
}

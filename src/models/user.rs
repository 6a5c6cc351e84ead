use crate::utils::time::is_next_day;
use crate::utils::validation::{optional_text, optional_url, Validate};
use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }

    /// Instructors and admins may create and edit course material.
    pub fn can_author(&self) -> bool {
        matches!(self, Role::Instructor | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily challenge streak
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Streak {
    pub current: i32,
    pub longest: i32,
    pub last_day: Option<String>,
}

impl Streak {
    /// Registers activity on `day` (`YYYY-MM-DD`).
    pub fn record(&mut self, day: &str) {
        match self.last_day.as_deref() {
            Some(last) if last == day => return,
            Some(last) if is_next_day(last, day) => self.current += 1,
            _ => self.current = 1,
        }
        self.longest = self.longest.max(self.current);
        self.last_day = Some(day.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Premium {
    pub is_premium: bool,
    pub expires_at: Option<i64>,
}

impl Premium {
    pub fn until(expires_at: Option<i64>, now: i64) -> Self {
        Self {
            is_premium: expires_at.map(|exp| exp > now).unwrap_or(false),
            expires_at,
        }
    }

    pub fn is_active(&self, now: i64) -> bool {
        self.is_premium && self.expires_at.map(|exp| exp > now).unwrap_or(false)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub streak: Streak,
    #[serde(default)]
    pub premium: Premium,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_login: Option<i64>,
}

fn default_is_active() -> bool {
    true
}

impl User {
    pub fn has_active_premium(&self, now: i64) -> bool {
        self.premium.is_active(now)
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PremiumStatus {
    pub is_premium: bool,
    pub expires_at: Option<i64>,
    pub active: bool,
}

/// Profile as seen by its owner
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub xp: i64,
    pub streak: Streak,
    pub premium: PremiumStatus,
    pub created_at: i64,
}

impl UserProfile {
    pub fn from_user(user: User, now: i64) -> Self {
        let active = user.has_active_premium(now);
        UserProfile {
            id: user.id_hex(),
            name: user.name,
            email: user.email,
            role: user.role,
            avatar: user.avatar,
            bio: user.bio,
            xp: user.xp,
            streak: user.streak,
            premium: PremiumStatus {
                is_premium: user.premium.is_premium,
                expires_at: user.premium.expires_at,
                active,
            },
            created_at: user.created_at,
        }
    }
}

/// Profile visible to other learners
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub xp: i64,
    pub streak: i32,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        PublicProfile {
            id: user.id_hex(),
            name: user.name,
            avatar: user.avatar,
            bio: user.bio,
            xp: user.xp,
            streak: user.streak.current,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), AppError> {
        optional_text(self.name.as_deref(), "Name", 80)?;
        optional_url(self.avatar.as_deref(), "Avatar")?;
        if let Some(bio) = &self.bio {
            if bio.chars().count() > 500 {
                return Err(AppError::Validation("Bio must be at most 500 characters".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_grows_on_consecutive_days() {
        let mut streak = Streak::default();
        streak.record("2026-10-16");
        streak.record("2026-10-17");
        streak.record("2026-10-18");
        assert_eq!(streak.current, 3);
        assert_eq!(streak.longest, 3);
    }

    #[test]
    fn streak_same_day_is_idempotent_and_gap_resets() {
        let mut streak = Streak::default();
        streak.record("2026-10-16");
        streak.record("2026-10-17");
        streak.record("2026-10-17");
        assert_eq!(streak.current, 2);

        streak.record("2026-10-20");
        assert_eq!(streak.current, 1);
        assert_eq!(streak.longest, 2);
        assert_eq!(streak.last_day.as_deref(), Some("2026-10-20"));
    }

    #[test]
    fn premium_requires_future_expiry() {
        let now = 1_000;
        assert!(Premium::until(Some(2_000), now).is_active(now));
        assert!(!Premium::until(Some(500), now).is_active(now));
        assert!(!Premium::until(None, now).is_active(now));

        // flag still set after expiry until the job clears it
        let stale = Premium { is_premium: true, expires_at: Some(999) };
        assert!(!stale.is_active(now));
    }

    #[test]
    fn only_instructors_and_admins_author() {
        assert!(!Role::Student.can_author());
        assert!(Role::Instructor.can_author());
        assert!(Role::Admin.can_author());
        assert_eq!(Role::Admin.to_string(), "admin");
    }
}

use crate::{
    database::{MongoDB, LEADERBOARD, USERS},
    models::{Premium, PublicProfile, Streak, UpdateProfileRequest, User, UserProfile},
    utils::time::now_ts,
    utils::{AppError, AppResult},
};
use mongodb::bson::{doc, oid::ObjectId, to_bson, Bson, Document};

/// Loads a live (not deleted) user.
pub async fn find_user(db: &MongoDB, user_id: &ObjectId) -> AppResult<User> {
    db.collection::<User>(USERS)
        .find_one(doc! { "_id": user_id, "is_deleted": false })
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn get_profile(db: &MongoDB, user_id: &ObjectId) -> AppResult<UserProfile> {
    let user = find_user(db, user_id).await?;
    Ok(UserProfile::from_user(user, now_ts()))
}

pub async fn public_profile(db: &MongoDB, user_id: &ObjectId) -> AppResult<PublicProfile> {
    let user = find_user(db, user_id).await?;
    if !user.is_active {
        return Err(AppError::NotFound("User not found".into()));
    }
    Ok(PublicProfile::from(user))
}

fn profile_changes(request: &UpdateProfileRequest) -> Document {
    let mut set = Document::new();
    if let Some(name) = &request.name {
        set.insert("name", name.trim());
    }
    // empty string clears the field
    for (field, value) in [("avatar", &request.avatar), ("bio", &request.bio)] {
        if let Some(value) = value {
            let value = value.trim();
            set.insert(field, if value.is_empty() { Bson::Null } else { Bson::String(value.to_string()) });
        }
    }
    set
}

pub async fn update_profile(
    db: &MongoDB,
    user_id: &ObjectId,
    request: &UpdateProfileRequest,
) -> AppResult<UserProfile> {
    let mut set = profile_changes(request);
    if set.is_empty() {
        return get_profile(db, user_id).await;
    }
    set.insert("updated_at", now_ts());

    let result = db
        .collection::<User>(USERS)
        .update_one(doc! { "_id": user_id, "is_deleted": false }, doc! { "$set": set })
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }

    // Keep the denormalized leaderboard name in sync
    if let Some(name) = &request.name {
        db.collection::<Document>(LEADERBOARD)
            .update_one(doc! { "user_id": user_id }, doc! { "$set": { "name": name.trim() } })
            .await?;
    }

    log::info!("👤 Profile updated for user {}", user_id);
    get_profile(db, user_id).await
}

pub async fn set_premium(db: &MongoDB, user_id: &ObjectId, premium: &Premium) -> AppResult<()> {
    db.collection::<User>(USERS)
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "premium": to_bson(premium)?, "updated_at": now_ts() } },
        )
        .await?;
    Ok(())
}

/// Registers challenge activity on `day` and stores the new streak.
pub async fn record_streak(db: &MongoDB, user_id: &ObjectId, day: &str) -> AppResult<Streak> {
    let mut user = find_user(db, user_id).await?;
    user.streak.record(day);

    db.collection::<User>(USERS)
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "streak": to_bson(&user.streak)?, "updated_at": now_ts() } },
        )
        .await?;

    Ok(user.streak)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_changes_only_touch_given_fields() {
        let req = UpdateProfileRequest { name: Some(" Grace ".into()), avatar: None, bio: Some("".into()) };
        let set = profile_changes(&req);

        assert_eq!(set.get_str("name").unwrap(), "Grace");
        assert!(!set.contains_key("avatar"));
        assert_eq!(set.get("bio"), Some(&Bson::Null));
    }

    #[test]
    fn empty_update_has_no_changes() {
        let req = UpdateProfileRequest { name: None, avatar: None, bio: None };
        assert!(profile_changes(&req).is_empty());
    }
}

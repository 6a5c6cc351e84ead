use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;

pub const USERS: &str = "users";
pub const COURSES: &str = "courses";
pub const TOPICS: &str = "topics";
pub const LESSONS: &str = "lessons";
pub const ENROLLMENTS: &str = "enrollments";
pub const PAYMENTS: &str = "payments";
pub const LEADERBOARD: &str = "leaderboard";
pub const DAILY_CHALLENGES: &str = "daily_challenges";
pub const CHALLENGE_SUBMISSIONS: &str = "challenge_submissions";
pub const QUESTIONS: &str = "questions";
pub const ANSWERS: &str = "answers";
pub const PROJECTS: &str = "projects";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));
        client_options.app_name = Some("kodr-backend".to_string());

        let client = Client::with_options(client_options)?;

        // Database name comes from the URI path, e.g. mongodb://host/kodr?retryWrites=true
        let db_name = database_name(uri);
        let db = client.database(&db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes queries rely on. A unique index that cannot be
    /// built aborts startup, since the one-per-user invariants depend on it.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        for spec in index_specs() {
            let label = format!("{}({})", spec.collection, key_names(&spec.keys));
            match self.create_index(&spec).await {
                Ok(()) => log::info!("   ✅ Index ready: {}{}", label, if spec.unique { " unique" } else { "" }),
                Err(e) if spec.unique => {
                    log::error!("   ❌ Unique index {} not created: {}", label, e);
                    return Err(format!("unique index {} could not be created: {}", label, e).into());
                }
                Err(e) => log::warn!("   ⚠️  Index {} not created: {}", label, e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    async fn create_index(&self, spec: &IndexSpec) -> mongodb::error::Result<()> {
        let options = IndexOptions::builder().unique(spec.unique).build();
        let model = IndexModel::builder()
            .keys(spec.keys.clone())
            .options(options)
            .build();

        self.collection::<Document>(spec.collection).create_index(model).await?;
        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn ping(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }).await.is_ok()
    }
}

struct IndexSpec {
    collection: &'static str,
    keys: Document,
    unique: bool,
}

fn index(collection: &'static str, keys: Document, unique: bool) -> IndexSpec {
    IndexSpec { collection, keys, unique }
}

fn index_specs() -> Vec<IndexSpec> {
    vec![
        index(USERS, doc! { "email": 1 }, true),
        index(COURSES, doc! { "slug": 1 }, true),
        index(COURSES, doc! { "is_published": 1, "is_deleted": 1, "created_at": -1 }, false),
        index(TOPICS, doc! { "course_id": 1, "order": 1 }, false),
        index(LESSONS, doc! { "topic_id": 1, "order": 1 }, false),
        index(LESSONS, doc! { "course_id": 1 }, false),
        index(ENROLLMENTS, doc! { "user_id": 1, "course_id": 1 }, true),
        index(PAYMENTS, doc! { "user_id": 1, "created_at": -1 }, false),
        index(LEADERBOARD, doc! { "user_id": 1 }, true),
        index(LEADERBOARD, doc! { "total_xp": -1, "updated_at": 1 }, false),
        index(LEADERBOARD, doc! { "week_key": 1, "weekly_xp": -1 }, false),
        index(DAILY_CHALLENGES, doc! { "scheduled_for": 1 }, true),
        index(CHALLENGE_SUBMISSIONS, doc! { "user_id": 1, "challenge_id": 1, "day": 1 }, true),
        index(QUESTIONS, doc! { "course_id": 1, "created_at": -1 }, false),
        index(ANSWERS, doc! { "question_id": 1 }, false),
        index(PROJECTS, doc! { "user_id": 1 }, false),
        index(PROJECTS, doc! { "is_public": 1, "created_at": -1 }, false),
    ]
}

fn database_name(uri: &str) -> String {
    uri.split("://")
        .nth(1)
        .and_then(|rest| rest.split_once('/'))
        .map(|(_, path)| path.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or("kodr")
        .to_string()
}

fn key_names(keys: &Document) -> String {
    keys.keys().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_from_uri() {
        assert_eq!(database_name("mongodb://localhost:27017/kodr_dev"), "kodr_dev");
        assert_eq!(
            database_name("mongodb+srv://u:p@cluster.example.net/intellecta?retryWrites=true"),
            "intellecta"
        );
        assert_eq!(database_name("mongodb://localhost:27017"), "kodr");
        assert_eq!(database_name("mongodb://localhost:27017/?w=majority"), "kodr");
    }

    #[test]
    fn unique_indexes_cover_one_per_user_invariants() {
        let unique: Vec<String> = index_specs()
            .iter()
            .filter(|spec| spec.unique)
            .map(|spec| format!("{}({})", spec.collection, key_names(&spec.keys)))
            .collect();

        assert_eq!(
            unique,
            vec![
                "users(email)",
                "courses(slug)",
                "enrollments(user_id, course_id)",
                "leaderboard(user_id)",
                "daily_challenges(scheduled_for)",
                "challenge_submissions(user_id, challenge_id, day)",
            ]
        );
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn duplicate_data_blocks_startup() {
        let db_name = format!("kodr_dup_{}", mongodb::bson::oid::ObjectId::new().to_hex());
        let uri = format!("mongodb://localhost:27017/{}", db_name);

        let client = Client::with_uri_str(&uri).await.expect("client");
        let users = client.database(&db_name).collection::<Document>(USERS);
        users
            .insert_many(vec![doc! { "email": "a@kodr.dev" }, doc! { "email": "a@kodr.dev" }])
            .await
            .expect("seed");

        let result = MongoDB::new(&uri).await;
        client.database(&db_name).drop().await.ok();
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn connects_and_creates_indexes() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/kodr_test".to_string());
        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
        assert!(db.unwrap().ping().await);
    }
}

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("internal: {0}")]
    Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Persist a new user. Fails with `Conflict` when the email is taken.
    async fn create_user(&self, new: NewUser) -> RepoResult<User>;
    /// Exact (email, digest) match, the login primitive.
    async fn find_user_by_credentials(&self, email: &str, password_hash: &str)
        -> RepoResult<User>;
}

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    /// Full-replace reseed: delete every category, insert `seed` in order.
    /// Ids are freshly generated on every call.
    async fn reset_categories(&self, seed: Vec<NewCategory>) -> RepoResult<Vec<Category>>;
}

#[async_trait]
pub trait IssueRepo: Send + Sync {
    async fn create_issue(&self, new: NewIssue, voice_transcript: Option<String>)
        -> RepoResult<Issue>;
    /// All issues, highest vote count first, most recent first within ties.
    async fn list_issues(&self) -> RepoResult<Vec<Issue>>;
    async fn list_issues_by_category(&self, category_id: Id) -> RepoResult<Vec<Issue>>;
    /// Axis-aligned bounding box on (lat, long), inclusive on all edges.
    async fn list_issues_in_box(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lng: f64,
        max_lng: f64,
    ) -> RepoResult<Vec<Issue>>;
    async fn get_issue(&self, id: Id) -> RepoResult<Issue>;
    /// Atomic vote_count += 1; returns the updated issue. The increment must
    /// happen at the storage layer so concurrent votes never lose updates.
    async fn vote_issue(&self, id: Id) -> RepoResult<Issue>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn create_comment(&self, issue_id: Id, new: NewComment) -> RepoResult<Comment>;
    /// Comments for one issue, newest first.
    async fn list_comments(&self, issue_id: Id) -> RepoResult<Vec<Comment>>;
}

pub trait Repo: UserRepo + CategoryRepo + IssueRepo + CommentRepo {}

impl<T> Repo for T where T: UserRepo + CategoryRepo + IssueRepo + CommentRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock};

    fn by_votes_then_recency(a: &Issue, b: &Issue) -> std::cmp::Ordering {
        b.vote_count
            .cmp(&a.vote_count)
            .then(b.created_at.cmp(&a.created_at))
    }

    const SNAPSHOT_PATH: &str = "data/state.json";

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        users: HashMap<Id, User>,
        categories: HashMap<Id, Category>,
        issues: HashMap<Id, Issue>,
        comments: HashMap<Id, Comment>,
        next_id: Id,
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Arc<PathBuf>,
    }

    impl InMemRepo {
        fn data_dir() -> PathBuf {
            std::env::var("CIRS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data"))
        }

        fn snapshot_path() -> PathBuf {
            if std::env::var("CIRS_DATA_DIR").is_ok() {
                let mut p = Self::data_dir();
                p.push("state.json");
                p
            } else {
                PathBuf::from(SNAPSHOT_PATH)
            }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        log::info!("loaded snapshot '{}'", path.display());
                        s
                    }
                    Err(e) => {
                        log::warn!(
                            "failed to parse snapshot '{}': {e}. Starting empty.",
                            path.display()
                        );
                        State::default()
                    }
                },
                Err(_) => State::default(),
            }
        }

        fn persist(&self) {
            let path = self.snapshot_path.clone();
            if let Ok(s) = serde_json::to_vec_pretty(&*self.state.read().unwrap()) {
                if let Some(dir) = path.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                if let Err(e) = std::fs::write(&*path, s) {
                    log::error!("failed to write snapshot '{}': {e}", path.display());
                }
            }
        }

        pub fn new() -> Self {
            let snapshot_path = Self::snapshot_path();
            let state = Self::load_state_from(&snapshot_path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Arc::new(snapshot_path),
            }
        }

        fn next_id(state: &mut State) -> Id {
            state.next_id += 1;
            state.next_id
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn create_user(&self, new: NewUser) -> RepoResult<User> {
            let mut s = self.state.write().unwrap();
            if s.users.values().any(|u| u.email == new.email) {
                return Err(RepoError::Conflict);
            }
            let id = Self::next_id(&mut s);
            let user = User {
                id,
                name: new.name,
                email: new.email,
                password_hash: new.password_hash,
                phone: new.phone,
                role: new.role,
                created_at: Utc::now(),
            };
            s.users.insert(id, user.clone());
            drop(s);
            self.persist();
            Ok(user)
        }

        async fn find_user_by_credentials(
            &self,
            email: &str,
            password_hash: &str,
        ) -> RepoResult<User> {
            let s = self.state.read().unwrap();
            s.users
                .values()
                .find(|u| u.email == email && u.password_hash == password_hash)
                .cloned()
                .ok_or(RepoError::NotFound)
        }
    }

    #[async_trait]
    impl CategoryRepo for InMemRepo {
        async fn list_categories(&self) -> RepoResult<Vec<Category>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s.categories.values().cloned().collect();
            v.sort_by_key(|c| c.id); // insertion order
            Ok(v)
        }

        async fn reset_categories(&self, seed: Vec<NewCategory>) -> RepoResult<Vec<Category>> {
            let mut s = self.state.write().unwrap();
            s.categories.clear();
            let mut out = Vec::with_capacity(seed.len());
            for new in seed {
                let id = Self::next_id(&mut s);
                let cat = Category {
                    id,
                    name: new.name,
                    description: new.description,
                    icon: new.icon,
                };
                s.categories.insert(id, cat.clone());
                out.push(cat);
            }
            drop(s);
            self.persist();
            Ok(out)
        }
    }

    #[async_trait]
    impl IssueRepo for InMemRepo {
        async fn create_issue(
            &self,
            new: NewIssue,
            voice_transcript: Option<String>,
        ) -> RepoResult<Issue> {
            let mut s = self.state.write().unwrap();
            let now = Utc::now();
            let id = Self::next_id(&mut s);
            let issue = Issue {
                id,
                user_id: new.user_id,
                category_id: new.category_id,
                title: new.title,
                description: new.description,
                image_base64: new.image_base64,
                voice_base64: new.voice_base64,
                voice_transcript,
                location_lat: new.location_lat,
                location_long: new.location_long,
                address: new.address,
                status: STATUS_PENDING.to_string(),
                expected_completion: None,
                actual_completion: None,
                vote_count: 0,
                created_at: now,
                updated_at: now,
            };
            s.issues.insert(id, issue.clone());
            drop(s);
            self.persist();
            Ok(issue)
        }

        async fn list_issues(&self) -> RepoResult<Vec<Issue>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s.issues.values().cloned().collect();
            v.sort_by(by_votes_then_recency);
            Ok(v)
        }

        async fn list_issues_by_category(&self, category_id: Id) -> RepoResult<Vec<Issue>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .issues
                .values()
                .filter(|i| i.category_id == category_id)
                .cloned()
                .collect();
            v.sort_by(by_votes_then_recency);
            Ok(v)
        }

        async fn list_issues_in_box(
            &self,
            min_lat: f64,
            max_lat: f64,
            min_lng: f64,
            max_lng: f64,
        ) -> RepoResult<Vec<Issue>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .issues
                .values()
                .filter(|i| {
                    i.location_lat >= min_lat
                        && i.location_lat <= max_lat
                        && i.location_long >= min_lng
                        && i.location_long <= max_lng
                })
                .cloned()
                .collect();
            v.sort_by(by_votes_then_recency);
            Ok(v)
        }

        async fn get_issue(&self, id: Id) -> RepoResult<Issue> {
            let s = self.state.read().unwrap();
            s.issues.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn vote_issue(&self, id: Id) -> RepoResult<Issue> {
            let mut s = self.state.write().unwrap();
            let issue = s.issues.get_mut(&id).ok_or(RepoError::NotFound)?;
            // Increment under the write lock; updated_at stays untouched.
            issue.vote_count += 1;
            let updated = issue.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn create_comment(&self, issue_id: Id, new: NewComment) -> RepoResult<Comment> {
            let mut s = self.state.write().unwrap();
            if !s.issues.contains_key(&issue_id) {
                return Err(RepoError::NotFound);
            }
            let id = Self::next_id(&mut s);
            let comment = Comment {
                id,
                issue_id,
                user_id: new.user_id,
                message: new.message,
                created_at: Utc::now(),
            };
            s.comments.insert(id, comment.clone());
            drop(s);
            self.persist();
            Ok(comment)
        }

        async fn list_comments(&self, issue_id: Id) -> RepoResult<Vec<Comment>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .comments
                .values()
                .filter(|c| c.issue_id == issue_id)
                .cloned()
                .collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at)); // newest first
            Ok(v)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};

    #[derive(Clone)]
    pub struct PgRepo {
        pool: Pool<Postgres>,
    }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self {
            Self { pool }
        }
    }

    fn internal(e: sqlx::Error) -> RepoError {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            other => RepoError::Internal(other.to_string()),
        }
    }

    const ISSUE_COLUMNS: &str = "id, user_id, category_id, title, description, image_base64, \
         voice_base64, voice_transcript, location_lat, location_long, address, status, \
         expected_completion, actual_completion, vote_count, created_at, updated_at";

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn create_user(&self, new: NewUser) -> RepoResult<User> {
            sqlx::query_as::<_, User>(
                "INSERT INTO users (name, email, password_hash, phone, role) \
                 VALUES ($1,$2,$3,$4,$5) \
                 RETURNING id, name, email, password_hash, phone, role, created_at",
            )
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.phone)
            .bind(&new.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                // unique violation on users.email
                sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict,
                _ => internal(e),
            })
        }

        async fn find_user_by_credentials(
            &self,
            email: &str,
            password_hash: &str,
        ) -> RepoResult<User> {
            sqlx::query_as::<_, User>(
                "SELECT id, name, email, password_hash, phone, role, created_at \
                 FROM users WHERE email = $1 AND password_hash = $2",
            )
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(internal)
        }
    }

    #[async_trait]
    impl CategoryRepo for PgRepo {
        async fn list_categories(&self) -> RepoResult<Vec<Category>> {
            sqlx::query_as::<_, Category>(
                "SELECT id, name, description, icon FROM categories ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(internal)
        }

        async fn reset_categories(&self, seed: Vec<NewCategory>) -> RepoResult<Vec<Category>> {
            // One transaction so readers never observe an empty catalog.
            let mut tx = self.pool.begin().await.map_err(internal)?;
            sqlx::query("DELETE FROM categories")
                .execute(&mut *tx)
                .await
                .map_err(internal)?;
            let mut out = Vec::with_capacity(seed.len());
            for new in seed {
                let cat = sqlx::query_as::<_, Category>(
                    "INSERT INTO categories (name, description, icon) VALUES ($1,$2,$3) \
                     RETURNING id, name, description, icon",
                )
                .bind(&new.name)
                .bind(&new.description)
                .bind(&new.icon)
                .fetch_one(&mut *tx)
                .await
                .map_err(internal)?;
                out.push(cat);
            }
            tx.commit().await.map_err(internal)?;
            Ok(out)
        }
    }

    #[async_trait]
    impl IssueRepo for PgRepo {
        async fn create_issue(
            &self,
            new: NewIssue,
            voice_transcript: Option<String>,
        ) -> RepoResult<Issue> {
            let sql = format!(
                "INSERT INTO issues (user_id, category_id, title, description, image_base64, \
                 voice_base64, voice_transcript, location_lat, location_long, address) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10) RETURNING {ISSUE_COLUMNS}"
            );
            sqlx::query_as::<_, Issue>(&sql)
                .bind(new.user_id)
                .bind(new.category_id)
                .bind(&new.title)
                .bind(&new.description)
                .bind(&new.image_base64)
                .bind(&new.voice_base64)
                .bind(&voice_transcript)
                .bind(new.location_lat)
                .bind(new.location_long)
                .bind(&new.address)
                .fetch_one(&self.pool)
                .await
                .map_err(internal)
        }

        async fn list_issues(&self) -> RepoResult<Vec<Issue>> {
            let sql = format!(
                "SELECT {ISSUE_COLUMNS} FROM issues ORDER BY vote_count DESC, created_at DESC"
            );
            sqlx::query_as::<_, Issue>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(internal)
        }

        async fn list_issues_by_category(&self, category_id: Id) -> RepoResult<Vec<Issue>> {
            let sql = format!(
                "SELECT {ISSUE_COLUMNS} FROM issues WHERE category_id = $1 \
                 ORDER BY vote_count DESC, created_at DESC"
            );
            sqlx::query_as::<_, Issue>(&sql)
                .bind(category_id)
                .fetch_all(&self.pool)
                .await
                .map_err(internal)
        }

        async fn list_issues_in_box(
            &self,
            min_lat: f64,
            max_lat: f64,
            min_lng: f64,
            max_lng: f64,
        ) -> RepoResult<Vec<Issue>> {
            let sql = format!(
                "SELECT {ISSUE_COLUMNS} FROM issues \
                 WHERE location_lat BETWEEN $1 AND $2 AND location_long BETWEEN $3 AND $4 \
                 ORDER BY vote_count DESC, created_at DESC"
            );
            sqlx::query_as::<_, Issue>(&sql)
                .bind(min_lat)
                .bind(max_lat)
                .bind(min_lng)
                .bind(max_lng)
                .fetch_all(&self.pool)
                .await
                .map_err(internal)
        }

        async fn get_issue(&self, id: Id) -> RepoResult<Issue> {
            let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1");
            sqlx::query_as::<_, Issue>(&sql)
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(internal)
        }

        async fn vote_issue(&self, id: Id) -> RepoResult<Issue> {
            // Single-statement increment: no read-modify-write race.
            let sql = format!(
                "UPDATE issues SET vote_count = vote_count + 1 WHERE id = $1 \
                 RETURNING {ISSUE_COLUMNS}"
            );
            sqlx::query_as::<_, Issue>(&sql)
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(internal)
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn create_comment(&self, issue_id: Id, new: NewComment) -> RepoResult<Comment> {
            let exists: Option<(Id,)> = sqlx::query_as("SELECT id FROM issues WHERE id = $1")
                .bind(issue_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(internal)?;
            if exists.is_none() {
                return Err(RepoError::NotFound);
            }
            sqlx::query_as::<_, Comment>(
                "INSERT INTO comments (issue_id, user_id, message) VALUES ($1,$2,$3) \
                 RETURNING id, issue_id, user_id, message, created_at",
            )
            .bind(issue_id)
            .bind(new.user_id)
            .bind(&new.message)
            .fetch_one(&self.pool)
            .await
            .map_err(internal)
        }

        async fn list_comments(&self, issue_id: Id) -> RepoResult<Vec<Comment>> {
            sqlx::query_as::<_, Comment>(
                "SELECT id, issue_id, user_id, message, created_at FROM comments \
                 WHERE issue_id = $1 ORDER BY created_at DESC",
            )
            .bind(issue_id)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)
        }
    }
}

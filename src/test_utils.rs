use crate::database::session::SessionRepository;
use crate::database::shop_item::ShopItemRepository;
use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::models::pagination::PaginationParams;
use crate::models::session::{Session, SessionUser};
use crate::models::shop_item::{ShopItem, ShopItemRequest, ShopItemUpdateRequest};
use crate::models::user::{SortOrder, User, UserQuery, UserSearchField, UserSortField};
use crate::service::password::CredentialHasher;
use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

fn unavailable() -> AppError {
    AppError::db("Mock store unavailable", sqlx::Error::PoolTimedOut)
}

/// In-memory stand-in for the Postgres repository.
#[derive(Default)]
pub struct MockRepository {
    users: Mutex<Vec<User>>,
    sessions: Mutex<Vec<Session>>,
    shop_items: Mutex<Vec<ShopItem>>,
    email_lookups: AtomicUsize,
    fail_lookups: AtomicBool,
    fail_sessions: AtomicBool,
}

impl MockRepository {
    pub fn insert_user(&self, name: &str, email: &str, password_hash: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn user(&self, id: &Uuid) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == *id).cloned()
    }

    pub fn session(&self, id: &Uuid) -> Option<Session> {
        self.sessions.lock().unwrap().iter().find(|s| s.id == *id).cloned()
    }

    /// Number of `get_user_by_email` calls so far.
    pub fn lookups(&self) -> usize {
        self.email_lookups.load(Ordering::SeqCst)
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sessions(&self, fail: bool) {
        self.fail_sessions.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl UserRepository for MockRepository {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User, AppError> {
        Ok(self.insert_user(name, email, password_hash))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.email_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        Ok(self.user(id))
    }

    async fn list_users(&self, query: &UserQuery) -> Result<(Vec<User>, i64), AppError> {
        let mut users = self.users.lock().unwrap().clone();

        if let Some(search) = &query.search {
            let pattern = RegexBuilder::new(&search.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            users.retain(|u| match search.field {
                UserSearchField::Name => pattern.is_match(&u.name),
                UserSearchField::Email => pattern.is_match(&u.email),
            });
        }

        users.sort_by(|a, b| {
            let ordering = match query.sort_field {
                UserSortField::Name => a.name.cmp(&b.name),
                UserSortField::Email => a.email.cmp(&b.email),
                UserSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = users.len() as i64;
        if let Some(offset) = query.offset() {
            users = users.into_iter().skip(offset as usize).take(query.page_size as usize).collect();
        }

        Ok((users, total))
    }

    async fn update_user(&self, id: &Uuid, name: &str, email: &str) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == *id)
            .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;
        user.name = name.to_string();
        user.email = email.to_string();
        Ok(user.clone())
    }

    async fn update_password_hash(&self, id: &Uuid, password_hash: &str) -> Result<(), AppError> {
        if let Some(user) = self.users.lock().unwrap().iter_mut().find(|u| u.id == *id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn delete_user(&self, id: &Uuid) -> Result<(), AppError> {
        self.users.lock().unwrap().retain(|u| u.id != *id);
        self.sessions.lock().unwrap().retain(|s| s.user_id != *id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionRepository for MockRepository {
    async fn create_session(&self, user_id: &Uuid, expires_at: DateTime<Utc>) -> Result<Session, AppError> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let session = Session {
            id: Uuid::new_v4(),
            user_id: *user_id,
            created_at: Utc::now(),
            expires_at,
        };
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn get_active_session_user(&self, session_id: &Uuid, user_id: &Uuid) -> Result<Option<SessionUser>, AppError> {
        let active = self
            .session(session_id)
            .is_some_and(|s| s.user_id == *user_id && s.expires_at > Utc::now());
        if !active {
            return Ok(None);
        }
        Ok(self.user(user_id).map(|u| SessionUser { id: u.id, email: u.email }))
    }

    async fn delete_session(&self, session_id: &Uuid) -> Result<(), AppError> {
        self.sessions.lock().unwrap().retain(|s| s.id != *session_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ShopItemRepository for MockRepository {
    async fn create_shop_item(&self, request: &ShopItemRequest) -> Result<ShopItem, AppError> {
        let item = ShopItem {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            price: request.price.clone(),
            description: request.description.clone(),
            category: request.category.clone(),
            quantity: request.quantity,
            created_at: Utc::now(),
        };
        self.shop_items.lock().unwrap().push(item.clone());
        Ok(item)
    }

    async fn get_shop_item_by_id(&self, id: &Uuid) -> Result<Option<ShopItem>, AppError> {
        Ok(self.shop_items.lock().unwrap().iter().find(|i| i.id == *id).cloned())
    }

    async fn list_shop_items(&self, pagination: Option<&PaginationParams>) -> Result<(Vec<ShopItem>, i64), AppError> {
        let items = self.shop_items.lock().unwrap().clone();
        let total = items.len() as i64;
        let items = match pagination.and_then(|p| p.effective_limit().zip(p.offset())) {
            Some((limit, offset)) => items.into_iter().skip(offset as usize).take(limit as usize).collect(),
            None => items,
        };
        Ok((items, total))
    }

    async fn update_shop_item(&self, id: &Uuid, request: &ShopItemUpdateRequest) -> Result<Option<ShopItem>, AppError> {
        let mut items = self.shop_items.lock().unwrap();
        Ok(items.iter_mut().find(|i| i.id == *id).map(|item| {
            item.name = request.name.clone();
            item.price = request.price.clone();
            item.quantity = request.quantity;
            item.clone()
        }))
    }

    async fn delete_shop_item(&self, id: &Uuid) -> Result<bool, AppError> {
        let mut items = self.shop_items.lock().unwrap();
        let before = items.len();
        items.retain(|i| i.id != *id);
        Ok(items.len() < before)
    }
}

const PLACEHOLDER: &str = "placeholder:never-matches";

/// Cheap hasher that records every comparison it is asked to make.
#[derive(Default)]
pub struct MockHasher {
    calls: AtomicUsize,
    last_compared: Mutex<Option<String>>,
}

impl MockHasher {
    pub fn hash_now(&self, password: &str) -> String {
        format!("plain:{}", password)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_compared(&self) -> Option<String> {
        self.last_compared.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CredentialHasher for MockHasher {
    async fn hash(&self, password: &str) -> Result<String, AppError> {
        Ok(self.hash_now(password))
    }

    async fn matches(&self, password: &str, stored_hash: &str) -> Result<bool, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_compared.lock().unwrap() = Some(stored_hash.to_string());
        Ok(stored_hash != PLACEHOLDER && stored_hash == self.hash_now(password))
    }

    fn placeholder_hash(&self) -> &str {
        PLACEHOLDER
    }
}

/// Driver-level error carrying a Postgres SQLSTATE, for error mapping tests.
#[derive(Debug)]
pub struct FakeDatabaseError {
    code: &'static str,
}

impl FakeDatabaseError {
    pub fn error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(Self { code }))
    }
}

impl std::fmt::Display for FakeDatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "database error {}", self.code)
    }
}

impl std::error::Error for FakeDatabaseError {}

impl sqlx::error::DatabaseError for FakeDatabaseError {
    fn message(&self) -> &str {
        "database error"
    }

    fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
        Some(std::borrow::Cow::Borrowed(self.code))
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        match self.code {
            "23505" => sqlx::error::ErrorKind::UniqueViolation,
            "23503" => sqlx::error::ErrorKind::ForeignKeyViolation,
            _ => sqlx::error::ErrorKind::Other,
        }
    }
}

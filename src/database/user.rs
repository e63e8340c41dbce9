use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::user::{SortOrder, User, UserQuery, UserSearchField, UserSortField};
use uuid::Uuid;

/// Postgres SQLSTATE for an invalid regular expression.
const INVALID_REGULAR_EXPRESSION: &str = "2201B";

/// A concurrent insert or update can still hit the unique email index after
/// the service-level check passed.
fn email_conflict(e: sqlx::Error, email: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::UserAlreadyExists(email.to_string()),
        _ => AppError::from(e),
    }
}

/// Search patterns are pre-checked with `regex`, but Postgres has its own dialect.
fn search_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(INVALID_REGULAR_EXPRESSION) => {
            AppError::BadRequest(format!("Invalid search pattern: {}", db.message()))
        }
        _ => AppError::from(e),
    }
}

#[async_trait::async_trait]
pub trait UserRepository {
    /// Stores a user whose password has already been hashed.
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError>;
    async fn list_users(&self, query: &UserQuery) -> Result<(Vec<User>, i64), AppError>;
    async fn update_user(&self, id: &Uuid, name: &str, email: &str) -> Result<User, AppError>;
    async fn update_password_hash(&self, id: &Uuid, password_hash: &str) -> Result<(), AppError>;
    async fn delete_user(&self, id: &Uuid) -> Result<(), AppError>;
}

#[async_trait::async_trait]
impl UserRepository for PostgresRepository {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| email_conflict(e, email))?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_users(&self, query: &UserQuery) -> Result<(Vec<User>, i64), AppError> {
        // Column and direction come from closed enums, never from raw input
        let where_clause = match query.search.as_ref().map(|s| s.field) {
            Some(UserSearchField::Name) => "WHERE name ~* $1",
            Some(UserSearchField::Email) => "WHERE email ~* $1",
            None => "",
        };
        let sort_column = match query.sort_field {
            UserSortField::Name => "name",
            UserSortField::Email => "email",
            UserSortField::CreatedAt => "created_at",
        };
        let sort_direction = match query.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(search) = &query.search {
            count_query = count_query.bind(&search.pattern);
        }
        let total = count_query.fetch_one(&self.pool).await.map_err(search_error)?;

        let mut list_sql = format!(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            {}
            ORDER BY {} {}, id ASC
            "#,
            where_clause, sort_column, sort_direction
        );
        if let Some(offset) = query.offset() {
            list_sql.push_str(&format!(" LIMIT {} OFFSET {}", query.page_size, offset));
        }

        let mut list_query = sqlx::query_as::<_, User>(&list_sql);
        if let Some(search) = &query.search {
            list_query = list_query.bind(&search.pattern);
        }
        let users = list_query.fetch_all(&self.pool).await.map_err(search_error)?;

        Ok((users, total))
    }

    async fn update_user(&self, id: &Uuid, name: &str, email: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $1, email = $2
            WHERE id = $3
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| email_conflict(e, email))?;

        Ok(user)
    }

    async fn update_password_hash(&self, id: &Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_user(&self, id: &Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&self.pool).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeDatabaseError;

    #[test]
    fn unique_violation_becomes_conflict() {
        let err = email_conflict(FakeDatabaseError::error("23505"), "a@x.com");
        assert!(matches!(err, AppError::UserAlreadyExists(email) if email == "a@x.com"));
    }

    #[test]
    fn other_database_errors_stay_internal() {
        let err = email_conflict(FakeDatabaseError::error("23503"), "a@x.com");
        assert!(matches!(err, AppError::Db { .. }));

        let err = email_conflict(sqlx::Error::RowNotFound, "a@x.com");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn invalid_postgres_regex_is_bad_request() {
        let err = search_error(FakeDatabaseError::error(INVALID_REGULAR_EXPRESSION));
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = search_error(FakeDatabaseError::error("57014"));
        assert!(matches!(err, AppError::Db { .. }));
    }
}

use crate::error::app_error::AppError;
use chrono::{DateTime, Utc};
use regex::Regex;
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 32))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub password_confirm: String,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct CreateUserResponse {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub password_old: String,
    #[validate(length(min = 6, max = 32))]
    pub password_new: String,
    #[validate(must_match(other = "password_new"))]
    pub password_confirm: String,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct UserIdResponse {
    pub id: Uuid,
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct LoginResponse {
    pub email: String,
    pub name: String,
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct UserListResponse {
    pub page_number: i64,
    pub page_size: i64,
    pub count: i64,
    pub total_pages: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub data: Vec<UserResponse>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Column a user search applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSearchField {
    Name,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSearch {
    pub field: UserSearchField,
    /// Case-insensitive regular expression.
    pub pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortField {
    Name,
    #[default]
    Email,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Validated form of the `page_number`, `page_size`, `search` and `sort`
/// query parameters of the user listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub page_number: i64,
    /// Zero means every matching user on a single page.
    pub page_size: i64,
    pub search: Option<UserSearch>,
    pub sort_field: UserSortField,
    pub sort_order: SortOrder,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: 0,
            search: None,
            sort_field: UserSortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl UserQuery {
    pub fn parse(page_number: Option<&str>, page_size: Option<&str>, search: Option<&str>, sort: Option<&str>) -> Result<Self, AppError> {
        let page_number = match non_empty(page_number) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(value) if value >= 1 => value,
                _ => return Err(AppError::BadRequest("page_number must be a positive integer".to_string())),
            },
            None => 1,
        };

        let page_size = match non_empty(page_size) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(value) if value >= 0 => value,
                _ => return Err(AppError::BadRequest("page_size must be a non-negative integer".to_string())),
            },
            None => 0,
        };

        let (sort_field, sort_order) = non_empty(sort).map(parse_sort).unwrap_or_default();

        Ok(Self {
            page_number,
            page_size,
            search: non_empty(search).map(parse_search).transpose()?.flatten(),
            sort_field,
            sort_order,
        })
    }

    /// Rows to skip, `None` when the listing is not paginated.
    /// Saturates for page numbers far past the last row, which then yield an empty page.
    pub fn offset(&self) -> Option<i64> {
        (self.page_size > 0).then(|| (self.page_number - 1).saturating_mul(self.page_size))
    }

    pub fn total_pages(&self, count: i64) -> i64 {
        if self.page_size > 0 {
            count / self.page_size + i64::from(count % self.page_size != 0)
        } else {
            1
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// `field:pattern`; anything that is not a name or email search is ignored.
fn parse_search(raw: &str) -> Result<Option<UserSearch>, AppError> {
    if !raw.contains(':') {
        return Ok(None);
    }

    let mut parts = raw.split(':');
    let field = match parts.next() {
        Some("name") => UserSearchField::Name,
        Some("email") => UserSearchField::Email,
        _ => return Ok(None),
    };
    let pattern = parts.next().unwrap_or_default().to_string();

    Regex::new(&pattern).map_err(|e| AppError::BadRequest(format!("Invalid search pattern: {}", e)))?;

    Ok(Some(UserSearch { field, pattern }))
}

fn parse_sort(raw: &str) -> (UserSortField, SortOrder) {
    let parts: Vec<&str> = raw.split(':').collect();
    let [field, order] = parts.as_slice() else {
        return (UserSortField::default(), SortOrder::default());
    };

    let field = match *field {
        "name" => UserSortField::Name,
        "created_at" => UserSortField::CreatedAt,
        _ => UserSortField::Email,
    };
    let order = match *order {
        "desc" => SortOrder::Desc,
        _ => SortOrder::Asc,
    };

    (field, order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_supplied() {
        let query = UserQuery::parse(None, None, None, None).unwrap();
        assert_eq!(query, UserQuery::default());
        assert_eq!(query.offset(), None);
        assert_eq!(query.total_pages(42), 1);
    }

    #[test]
    fn empty_strings_fall_back_to_defaults() {
        let query = UserQuery::parse(Some(""), Some(""), Some(""), Some("")).unwrap();
        assert_eq!(query, UserQuery::default());
    }

    #[test]
    fn rejects_invalid_page_number() {
        assert!(matches!(UserQuery::parse(Some("0"), None, None, None), Err(AppError::BadRequest(_))));
        assert!(matches!(UserQuery::parse(Some("abc"), None, None, None), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_negative_page_size() {
        assert!(matches!(UserQuery::parse(None, Some("-1"), None, None), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn paginates_with_offset_and_total_pages() {
        let query = UserQuery::parse(Some("3"), Some("10"), None, None).unwrap();
        assert_eq!(query.offset(), Some(20));
        assert_eq!(query.total_pages(21), 3);
        assert_eq!(query.total_pages(20), 2);
        assert_eq!(query.total_pages(0), 0);
    }

    #[test]
    fn huge_page_values_do_not_overflow() {
        let query = UserQuery::parse(Some("9223372036854775807"), Some("2"), None, None).unwrap();
        assert_eq!(query.offset(), Some(i64::MAX));
        assert_eq!(query.total_pages(5), 3);

        let query = UserQuery::parse(Some("1"), Some("9223372036854775807"), None, None).unwrap();
        assert_eq!(query.offset(), Some(0));
        assert_eq!(query.total_pages(5), 1);
        assert_eq!(query.total_pages(i64::MAX), 1);
        assert_eq!(query.total_pages(0), 0);
    }

    #[test]
    fn parses_name_and_email_search() {
        let query = UserQuery::parse(None, None, Some("name:ali"), None).unwrap();
        assert_eq!(
            query.search,
            Some(UserSearch {
                field: UserSearchField::Name,
                pattern: "ali".to_string(),
            })
        );

        let query = UserQuery::parse(None, None, Some("email:@x.com"), None).unwrap();
        assert_eq!(query.search.map(|s| s.field), Some(UserSearchField::Email));
    }

    #[test]
    fn ignores_unsupported_search() {
        assert_eq!(UserQuery::parse(None, None, Some("role:admin"), None).unwrap().search, None);
        assert_eq!(UserQuery::parse(None, None, Some("ali"), None).unwrap().search, None);
    }

    #[test]
    fn rejects_invalid_search_regex() {
        assert!(matches!(UserQuery::parse(None, None, Some("name:(unclosed"), None), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn sort_parsing_falls_back_sensibly() {
        let query = UserQuery::parse(None, None, None, Some("name:desc")).unwrap();
        assert_eq!((query.sort_field, query.sort_order), (UserSortField::Name, SortOrder::Desc));

        let query = UserQuery::parse(None, None, None, Some("name:sideways")).unwrap();
        assert_eq!((query.sort_field, query.sort_order), (UserSortField::Name, SortOrder::Asc));

        let query = UserQuery::parse(None, None, None, Some("name")).unwrap();
        assert_eq!((query.sort_field, query.sort_order), (UserSortField::Email, SortOrder::Asc));

        let query = UserQuery::parse(None, None, None, Some("password_hash:desc")).unwrap();
        assert_eq!((query.sort_field, query.sort_order), (UserSortField::Email, SortOrder::Desc));
    }

    #[test]
    fn create_request_requires_matching_confirmation() {
        let request = CreateUserRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret123".to_string(),
            password_confirm: "secret124".to_string(),
        };
        assert!(request.validate().is_err());

        let request = CreateUserRequest {
            password_confirm: "secret123".to_string(),
            ..request
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn login_request_requires_email_shape() {
        let request = LoginRequest {
            email: "not-an-email".to_string(),
            password: "whatever".to_string(),
        };
        assert!(request.validate().is_err());
    }
}

use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::models::user::{
    ChangePasswordRequest, CreateUserRequest, CreateUserResponse, UpdateUserRequest, UserIdResponse, UserListResponse, UserQuery, UserResponse,
};
use crate::service::password::CredentialHasher;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

pub struct UserService<'a, R, H> {
    repository: &'a R,
    hasher: &'a H,
}

impl<'a, R, H> UserService<'a, R, H>
where
    R: UserRepository + Sync,
    H: CredentialHasher,
{
    pub fn new(repository: &'a R, hasher: &'a H) -> Self {
        UserService { repository, hasher }
    }

    pub async fn list_users(&self, query: &UserQuery) -> Result<UserListResponse, AppError> {
        let (users, count) = self.repository.list_users(query).await?;
        let total_pages = query.total_pages(count);

        Ok(UserListResponse {
            page_number: query.page_number,
            page_size: query.page_size,
            count,
            total_pages,
            has_previous_page: query.page_number > 1,
            has_next_page: query.page_number < total_pages,
            data: users.iter().map(UserResponse::from).collect(),
        })
    }

    pub async fn get_user(&self, id: &Uuid) -> Result<UserResponse, AppError> {
        let user = self.repository.get_user_by_id(id).await?.ok_or(AppError::UserNotFound)?;
        Ok(UserResponse::from(&user))
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<CreateUserResponse, AppError> {
        if self.repository.get_user_by_email(&request.email).await?.is_some() {
            return Err(AppError::UserAlreadyExists(request.email.clone()));
        }

        let password_hash = self.hasher.hash(&request.password).await?;
        let user = self.repository.create_user(&request.name, &request.email, &password_hash).await?;
        info!(user_id = %user.id, "user created");

        Ok(CreateUserResponse {
            name: user.name,
            email: user.email,
        })
    }

    /// Creates the account unless its email is already registered. Returns whether it was created.
    pub async fn ensure_user(&self, request: &CreateUserRequest) -> Result<bool, AppError> {
        request.validate()?;

        match self.create_user(request).await {
            Ok(_) => Ok(true),
            Err(AppError::UserAlreadyExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn update_user(&self, id: &Uuid, request: &UpdateUserRequest) -> Result<UserIdResponse, AppError> {
        self.repository.get_user_by_id(id).await?.ok_or(AppError::UserNotFound)?;

        if let Some(owner) = self.repository.get_user_by_email(&request.email).await?
            && owner.id != *id
        {
            return Err(AppError::UserAlreadyExists(request.email.clone()));
        }

        let user = self.repository.update_user(id, &request.name, &request.email).await?;
        Ok(UserIdResponse { id: user.id })
    }

    pub async fn delete_user(&self, id: &Uuid) -> Result<UserIdResponse, AppError> {
        self.repository.get_user_by_id(id).await?.ok_or(AppError::UserNotFound)?;
        self.repository.delete_user(id).await?;
        info!(user_id = %id, "user deleted");

        Ok(UserIdResponse { id: *id })
    }

    pub async fn change_password(&self, id: &Uuid, request: &ChangePasswordRequest) -> Result<UserIdResponse, AppError> {
        let user = self.repository.get_user_by_id(id).await?.ok_or(AppError::UserNotFound)?;

        if !self.hasher.matches(&request.password_old, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let password_hash = self.hasher.hash(&request.password_new).await?;
        self.repository.update_password_hash(id, &password_hash).await?;
        info!(user_id = %id, "password changed");

        Ok(UserIdResponse { id: *id })
    }
}

use crate::auth::session_token;
use crate::database::session::SessionRepository;
use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::service::login_guard::{GuardDecision, LoginGuard};
use crate::service::password::CredentialHasher;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// What happened during a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials valid and session created successfully.
    Success { email: String, name: String, user_id: Uuid, token: String },
    /// Unknown identity or wrong password; the two are deliberately not told apart.
    Failed { attempts: u32, message: String },
    /// Rejected before any credential check.
    Locked { until: DateTime<Utc> },
}

pub struct AuthService<'a, R, H> {
    repository: &'a R,
    hasher: &'a H,
    guard: &'a LoginGuard,
    session_ttl: Duration,
}

impl<'a, R, H> AuthService<'a, R, H>
where
    R: UserRepository + SessionRepository + Sync,
    H: CredentialHasher,
{
    pub fn new(repository: &'a R, hasher: &'a H, guard: &'a LoginGuard, session_ttl: Duration) -> Self {
        AuthService {
            repository,
            hasher,
            guard,
            session_ttl,
        }
    }

    pub async fn attempt_login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        self.attempt_login_at(email, password, Utc::now()).await
    }

    pub(crate) async fn attempt_login_at(&self, email: &str, password: &str, now: DateTime<Utc>) -> Result<LoginOutcome, AppError> {
        if let GuardDecision::Locked { until } = self.guard.admit(email, now).await {
            warn!(email = %email, locked_until = %until, "login rejected, too many failed attempts");
            return Ok(LoginOutcome::Locked { until });
        }

        let user = self.repository.get_user_by_email(email).await?;

        // Always run exactly one comparison so unknown emails cost the same as wrong passwords
        let stored_hash = user.as_ref().map_or(self.hasher.placeholder_hash(), |u| u.password_hash.as_str());
        let password_matches = self.hasher.matches(password, stored_hash).await?;

        match user {
            Some(user) if password_matches => {
                let token = self.issue_session_token(&user.id, now).await?;
                self.guard.record_success(email, now).await;
                info!(user_id = %user.id, "login succeeded");

                Ok(LoginOutcome::Success {
                    email: user.email,
                    name: user.name,
                    user_id: user.id,
                    token,
                })
            }
            _ => {
                let attempts = self.guard.record_failure(email, now).await;
                warn!(email = %email, attempts = attempts, "login failed");

                Ok(LoginOutcome::Failed {
                    attempts,
                    message: failed_login_message(email, attempts, now),
                })
            }
        }
    }

    async fn issue_session_token(&self, user_id: &Uuid, now: DateTime<Utc>) -> Result<String, AppError> {
        let session = self.repository.create_session(user_id, now + self.session_ttl).await?;
        Ok(session_token(&session.id, &session.user_id))
    }
}

/// `[2024-05-0108:00:00] User a@x.com failed login. Attempt = 3`
pub fn failed_login_message(email: &str, attempts: u32, now: DateTime<Utc>) -> String {
    format!("[{}] User {} failed login. Attempt = {}", now.format("%Y-%m-%d%H:%M:%S"), email, attempts)
}

use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use eyre::{ensure, ContextCompat, Result};
use log::info;
use rand::Rng;
use sqlx::types::Uuid;

use types::error::Error;

use crate::domain::auth::AuthUser;
use crate::repository::auth::AuthUserRepository;
use crate::repository::categories::CategoryRepository;
use crate::repository::verification::VerificationRepository;

const MAX_ACCOUNTS: i64 = 50;
const CODE_TTL_MINUTES: i64 = 10;
const RESET_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Clone)]
pub struct AuthService {
    pub auth_repository: AuthUserRepository,
    pub verification_repository: VerificationRepository,
    pub category_repository: Arc<CategoryRepository>,
}

impl AuthService {
    pub async fn register(&self, email: String, password: String) -> Result<()> {
        ensure!(
            !self.auth_repository.exists(email.clone()).await?,
            Error::EmailAlreadyExists
        );
        ensure!(
            self.auth_repository.count().await? < MAX_ACCOUNTS,
            Error::AccountLimitReached
        );
        let hashed_password = hash(password, DEFAULT_COST)?;
        let code = generate_code();
        let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);
        self.verification_repository
            .upsert_pending(email.clone(), hashed_password, code.clone(), expires_at)
            .await?;
        // delivery happens outside this service
        info!("registration code for {}: {}", email, code);
        Ok(())
    }

    pub async fn verify_registration(&self, email: String, code: String) -> Result<Uuid> {
        let pending = self
            .verification_repository
            .take_pending(email, code, Utc::now())
            .await?
            .wrap_err(Error::InvalidVerificationCode)?;
        let user = self
            .auth_repository
            .create_user(pending.email, pending.hashed_password)
            .await?;
        self.category_repository.seed_defaults(user.id).await?;
        self.issue_token(user.id).await
    }

    pub async fn login(&self, email: String, password: String) -> Result<Uuid> {
        // the same error for an unknown email and a wrong password, so
        // login failures do not reveal whether an account exists
        let user = self
            .auth_repository
            .get_by_email(email)
            .await?
            .wrap_err(Error::InvalidCredentials)?;
        ensure!(
            verify(password, &user.hashed_password)?,
            Error::InvalidCredentials
        );
        self.issue_token(user.id).await
    }

    pub async fn request_login_code(&self, email: String) -> Result<()> {
        // answers generically whether or not the account exists
        if self.auth_repository.exists(email.clone()).await? {
            let code = generate_code();
            let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);
            self.verification_repository
                .upsert_login_code(email.clone(), code.clone(), expires_at)
                .await?;
            info!("login code for {}: {}", email, code);
        }
        Ok(())
    }

    pub async fn login_with_code(&self, email: String, code: String) -> Result<Uuid> {
        let code = self
            .verification_repository
            .take_login_code(email, code, Utc::now())
            .await?
            .wrap_err(Error::InvalidVerificationCode)?;
        let user = self
            .auth_repository
            .get_by_email(code.email)
            .await?
            .wrap_err(Error::InvalidVerificationCode)?;
        self.issue_token(user.id).await
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: String,
        new_password: String,
    ) -> Result<()> {
        let user = self
            .auth_repository
            .get(user_id)
            .await?
            .wrap_err(Error::UserNotFound)?;
        ensure!(
            verify(current_password, &user.hashed_password)?,
            Error::InvalidCredentials
        );
        self.auth_repository
            .update_password(user_id, hash(new_password, DEFAULT_COST)?)
            .await
    }

    pub async fn request_password_reset(&self, email: String) -> Result<()> {
        if self.auth_repository.exists(email.clone()).await? {
            let token = Uuid::new_v4();
            let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
            self.verification_repository
                .create_reset_token(token, email.clone(), expires_at)
                .await?;
            info!("password reset token for {}: {}", email, token);
        }
        Ok(())
    }

    pub async fn reset_password(&self, token: Uuid, new_password: String) -> Result<()> {
        let reset = self
            .verification_repository
            .take_reset_token(token, Utc::now())
            .await?
            .wrap_err(Error::InvalidResetToken)?;
        let updated = self
            .auth_repository
            .update_password_by_email(reset.email, hash(new_password, DEFAULT_COST)?)
            .await?;
        ensure!(updated > 0, Error::InvalidResetToken);
        Ok(())
    }

    pub async fn delete_account(&self, user_id: Uuid) -> Result<()> {
        // dependent rows go with the user via the cascade constraints
        ensure!(
            self.auth_repository.delete(user_id).await? > 0,
            Error::UserNotFound
        );
        Ok(())
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Option<AuthUser>> {
        self.auth_repository.get(user_id).await
    }

    pub async fn get_user_by_session_token(&self, token: Uuid) -> Result<Option<AuthUser>> {
        self.auth_repository.get_by_session_token(token).await
    }

    pub async fn purge_expired(&self) -> Result<()> {
        self.verification_repository.purge_expired(Utc::now()).await
    }

    async fn issue_token(&self, user_id: Uuid) -> Result<Uuid> {
        let token = Uuid::new_v4();
        self.auth_repository.update_token(user_id, token).await?;
        Ok(token)
    }
}

fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn user_with_password(password: &str) -> AuthUser {
        AuthUser {
            id: Uuid::from_u128(1),
            email: "alice@example.com".to_string(),
            hashed_password: hash(password, 4).unwrap(),
            created_at: DateTime::UNIX_EPOCH,
        }
    }

    fn service(
        auth_repository: AuthUserRepository,
        verification_repository: VerificationRepository,
    ) -> AuthService {
        AuthService {
            auth_repository,
            verification_repository,
            category_repository: Arc::new(CategoryRepository::faux()),
        }
    }

    #[tokio::test]
    async fn register_rejects_an_existing_email() {
        let mut auth_repository = AuthUserRepository::faux();
        faux::when!(auth_repository.exists).then(|_| Ok(true));
        let service = service(auth_repository, VerificationRepository::faux());

        let result = service
            .register("alice@example.com".to_string(), "password123".to_string())
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            Error::EmailAlreadyExists.to_string()
        );
    }

    #[tokio::test]
    async fn register_rejects_when_the_account_limit_is_reached() {
        let mut auth_repository = AuthUserRepository::faux();
        faux::when!(auth_repository.exists).then(|_| Ok(false));
        faux::when!(auth_repository.count).then(|_| Ok(MAX_ACCOUNTS));
        let service = service(auth_repository, VerificationRepository::faux());

        let result = service
            .register("bob@example.com".to_string(), "password123".to_string())
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            Error::AccountLimitReached.to_string()
        );
    }

    #[tokio::test]
    async fn register_stores_a_pending_registration() {
        let mut auth_repository = AuthUserRepository::faux();
        faux::when!(auth_repository.exists).then(|_| Ok(false));
        faux::when!(auth_repository.count).then(|_| Ok(3));
        let mut verification_repository = VerificationRepository::faux();
        faux::when!(verification_repository.upsert_pending).then(|(_, _, code, _)| {
            assert_eq!(code.len(), 6);
            Ok(())
        });
        let service = service(auth_repository, verification_repository);

        let result = service
            .register("bob@example.com".to_string(), "password123".to_string())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn login_failures_do_not_reveal_whether_the_account_exists() {
        let mut auth_repository = AuthUserRepository::faux();
        faux::when!(auth_repository.get_by_email).then(|email| {
            if email == "alice@example.com" {
                Ok(Some(user_with_password("correct horse")))
            } else {
                Ok(None)
            }
        });
        let service = service(auth_repository, VerificationRepository::faux());

        let unknown_email = service
            .login("nobody@example.com".to_string(), "whatever".to_string())
            .await
            .unwrap_err();
        let wrong_password = service
            .login("alice@example.com".to_string(), "wrong".to_string())
            .await
            .unwrap_err();
        assert_eq!(unknown_email.to_string(), wrong_password.to_string());
        assert_eq!(
            unknown_email.to_string(),
            Error::InvalidCredentials.to_string()
        );
    }

    #[tokio::test]
    async fn login_with_the_right_password_issues_a_token() {
        let mut auth_repository = AuthUserRepository::faux();
        faux::when!(auth_repository.get_by_email)
            .then(|_| Ok(Some(user_with_password("correct horse"))));
        faux::when!(auth_repository.update_token).then(|(_, _)| Ok(()));
        let service = service(auth_repository, VerificationRepository::faux());

        let token = service
            .login("alice@example.com".to_string(), "correct horse".to_string())
            .await;
        assert!(token.is_ok());
    }

    #[tokio::test]
    async fn verification_with_a_wrong_or_expired_code_fails() {
        let mut verification_repository = VerificationRepository::faux();
        faux::when!(verification_repository.take_pending).then(|(_, _, _)| Ok(None));
        let service = service(AuthUserRepository::faux(), verification_repository);

        let result = service
            .verify_registration("alice@example.com".to_string(), "123456".to_string())
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            Error::InvalidVerificationCode.to_string()
        );
    }
}

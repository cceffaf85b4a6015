use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use base64::Engine;
use chrono::{Duration, NaiveDateTime};
use hmac::{Hmac, Mac};
use rusqlite::Connection;
use sha2::Sha256;

use crate::db::queries;
use crate::errors::DirectoryError;
use crate::models::{Role, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Accounts and login sessions.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, DirectoryError>;

    async fn create_account(&self, account: NewAccount) -> Result<User, DirectoryError>;

    /// Opaque bearer token for `user`.
    async fn issue_session(&self, user: &User, now: NaiveDateTime) -> Result<String, DirectoryError>;

    async fn user_for_session(
        &self,
        token: &str,
        now: NaiveDateTime,
    ) -> Result<Option<User>, DirectoryError>;

    async fn revoke_session(&self, token: &str) -> Result<(), DirectoryError>;
}

pub struct SqliteDirectory {
    db: Arc<Mutex<Connection>>,
    secret: String,
    session_ttl: Duration,
}

impl SqliteDirectory {
    pub fn new(db: Arc<Mutex<Connection>>, secret: String, session_ttl_hours: i64) -> Self {
        Self {
            db,
            secret,
            session_ttl: Duration::hours(session_ttl_hours),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DirectoryError> {
        self.db
            .lock()
            .map_err(|_| DirectoryError::Unavailable("database lock poisoned".to_string()))
    }

    /// Creates the account if needed and makes sure it carries the admin role.
    pub async fn ensure_admin(&self, account: NewAccount) -> Result<User, DirectoryError> {
        let email = normalize_email(&account.email);
        let existing = {
            let conn = self.conn()?;
            queries::get_credentials_by_email(&conn, &email).map_err(unavailable)?
        };

        let mut user = match existing {
            Some(creds) => creds.user,
            None => self.create_account(account).await?,
        };

        if user.role != Role::Admin {
            let conn = self.conn()?;
            queries::set_user_role(&conn, &user.id, Role::Admin).map_err(unavailable)?;
            user.role = Role::Admin;
            tracing::info!(email = %user.email, "granted admin role");
        }
        Ok(user)
    }

    fn digest(&self, salt: &str, password: &str) -> Result<HmacSha256, DirectoryError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| DirectoryError::Unavailable(format!("bad auth secret: {e}")))?;
        mac.update(salt.as_bytes());
        mac.update(b":");
        mac.update(password.as_bytes());
        Ok(mac)
    }

    fn hash_password(&self, salt: &str, password: &str) -> Result<String, DirectoryError> {
        let tag = self.digest(salt, password)?.finalize().into_bytes();
        Ok(base64::engine::general_purpose::STANDARD.encode(tag))
    }

    fn verify_password(&self, salt: &str, password: &str, stored: &str) -> bool {
        let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(stored) else {
            return false;
        };
        match self.digest(salt, password) {
            Ok(mac) => mac.verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }
}

fn unavailable(e: anyhow::Error) -> DirectoryError {
    tracing::error!(error = %e, "user directory query failed");
    DirectoryError::Unavailable(e.to_string())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_unique_violation(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(f, _))
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl UserDirectory for SqliteDirectory {
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, DirectoryError> {
        let email = normalize_email(email);
        let creds = {
            let conn = self.conn()?;
            queries::get_credentials_by_email(&conn, &email).map_err(unavailable)?
        };

        match creds {
            Some(c) if self.verify_password(&c.password_salt, password, &c.password_hash) => {
                Ok(c.user)
            }
            _ => {
                tracing::info!(%email, "failed login");
                Err(DirectoryError::InvalidCredentials)
            }
        }
    }

    async fn create_account(&self, account: NewAccount) -> Result<User, DirectoryError> {
        let name = account.name.trim();
        let email = normalize_email(&account.email);
        let phone = account.phone.trim();

        if name.is_empty() || email.is_empty() || phone.is_empty() || account.password.is_empty() {
            return Err(DirectoryError::Validation(
                "name, email, phone and password are required".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(DirectoryError::Validation(format!("invalid email: {email}")));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let salt = uuid::Uuid::new_v4().simple().to_string();
        let password_hash = self.hash_password(&salt, &account.password)?;

        let conn = self.conn()?;
        if queries::get_credentials_by_email(&conn, &email)
            .map_err(unavailable)?
            .is_some()
        {
            return Err(DirectoryError::EmailTaken);
        }

        queries::insert_user(
            &conn,
            &queries::NewUser {
                id: &id,
                name,
                email: &email,
                phone,
                password_hash: &password_hash,
                password_salt: &salt,
                role: Role::User,
            },
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                DirectoryError::EmailTaken
            } else {
                unavailable(e)
            }
        })?;

        tracing::info!(user_id = %id, %email, "account created");

        Ok(User {
            id,
            name: name.to_string(),
            email,
            phone: phone.to_string(),
            role: Role::User,
        })
    }

    async fn issue_session(&self, user: &User, now: NaiveDateTime) -> Result<String, DirectoryError> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let expires_at = now + self.session_ttl;

        let conn = self.conn()?;
        let expired = queries::delete_expired_sessions(&conn, &now).map_err(unavailable)?;
        if expired > 0 {
            tracing::debug!(expired, "pruned expired sessions");
        }
        queries::insert_session(&conn, &token, &user.id, &expires_at).map_err(unavailable)?;
        Ok(token)
    }

    async fn user_for_session(
        &self,
        token: &str,
        now: NaiveDateTime,
    ) -> Result<Option<User>, DirectoryError> {
        let conn = self.conn()?;
        queries::get_session_user(&conn, token, &now).map_err(unavailable)
    }

    async fn revoke_session(&self, token: &str) -> Result<(), DirectoryError> {
        let conn = self.conn()?;
        queries::delete_session(&conn, token).map_err(unavailable)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn directory() -> SqliteDirectory {
        let conn = db::init_db(":memory:").unwrap();
        SqliteDirectory::new(Arc::new(Mutex::new(conn)), "test-secret".to_string(), 24)
    }

    fn account(email: &str) -> NewAccount {
        NewAccount {
            name: "Bruno".to_string(),
            email: email.to_string(),
            phone: "+5511988887777".to_string(),
            password: "hunter22".to_string(),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-06-16 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let dir = directory();
        let created = dir.create_account(account(" Bruno@Example.com ")).await.unwrap();
        assert_eq!(created.email, "bruno@example.com");
        assert_eq!(created.role, Role::User);

        let user = dir.authenticate("bruno@example.com", "hunter22").await.unwrap();
        assert_eq!(user, created);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let dir = directory();
        dir.create_account(account("bruno@example.com")).await.unwrap();

        let err = dir.authenticate("bruno@example.com", "nope").await.unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidCredentials));
        let err = dir.authenticate("ghost@example.com", "hunter22").await.unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_password_is_not_stored_in_clear() {
        let dir = directory();
        dir.create_account(account("bruno@example.com")).await.unwrap();

        let conn = dir.conn().unwrap();
        let creds = queries::get_credentials_by_email(&conn, "bruno@example.com")
            .unwrap()
            .unwrap();
        assert_ne!(creds.password_hash, "hunter22");
        assert!(!creds.password_salt.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let dir = directory();
        dir.create_account(account("bruno@example.com")).await.unwrap();
        let err = dir
            .create_account(account("BRUNO@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::EmailTaken));
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let dir = directory();
        let err = dir
            .create_account(NewAccount {
                phone: " ".to_string(),
                ..account("bruno@example.com")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));

        let err = dir.create_account(account("not-an-email")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let dir = directory();
        let user = dir.create_account(account("bruno@example.com")).await.unwrap();
        let token = dir.issue_session(&user, now()).await.unwrap();

        let found = dir.user_for_session(&token, now()).await.unwrap();
        assert_eq!(found, Some(user.clone()));

        let later = now() + Duration::hours(25);
        assert_eq!(dir.user_for_session(&token, later).await.unwrap(), None);

        let token = dir.issue_session(&user, now()).await.unwrap();
        dir.revoke_session(&token).await.unwrap();
        assert_eq!(dir.user_for_session(&token, now()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let dir = directory();
        let first = dir.ensure_admin(account("boss@example.com")).await.unwrap();
        assert!(first.is_admin());
        let second = dir.ensure_admin(account("boss@example.com")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.is_admin());
    }
}

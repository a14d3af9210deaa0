use crate::store::{Slots, StoreError};
use shared::models::{BalanceOperation, User};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use uuid::Uuid;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("A user with this email already exists")]
    EmailTaken,
    #[error("Login required")]
    NotLoggedIn,
    #[error("Admin access required")]
    NotAdmin,
    #[error("Amount must be a non-negative number")]
    InvalidAmount,
    #[error("User {0} not found")]
    UserNotFound(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Tracks who is logged in and whether the session has been elevated to admin.
///
/// The admin flag lives only in memory and is lost on restart.
pub struct SessionManager {
    slots: Arc<Slots>,
    admin_passphrase: String,
    admin: AtomicBool,
}

impl SessionManager {
    pub fn new(slots: Arc<Slots>, admin_passphrase: impl Into<String>) -> Self {
        Self {
            slots,
            admin_passphrase: admin_passphrase.into(),
            admin: AtomicBool::new(false),
        }
    }

    pub async fn current_user(&self) -> Option<User> {
        self.slots.current_user.get().await
    }

    pub async fn require_user(&self) -> AuthResult<User> {
        self.current_user().await.ok_or(AuthError::NotLoggedIn)
    }

    pub async fn users(&self) -> Vec<User> {
        self.slots.users.get().await
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<User> {
        let user = self
            .slots
            .users
            .get()
            .await
            .into_iter()
            .find(|u| u.email == email && u.password == password)
            .ok_or(AuthError::InvalidCredentials)?;

        self.slots.current_user.set_value(Some(user.clone())).await?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    pub async fn signup(&self, email: &str, password: &str) -> AuthResult<User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let user = self
            .slots
            .users
            .try_update(|users| {
                if users.iter().any(|u| u.email == email) {
                    return Err(AuthError::EmailTaken);
                }
                let user = User::new(email, password);
                users.push(user.clone());
                Ok(user)
            })
            .await?;

        self.slots.current_user.set_value(Some(user.clone())).await?;
        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    pub async fn logout(&self) -> AuthResult<()> {
        self.admin.store(false, Ordering::SeqCst);
        self.slots.current_user.set_value(None).await?;
        Ok(())
    }

    /// No lockout or rate limiting: the passphrase is a convenience gate.
    pub fn elevate_admin(&self, passphrase: &str) -> bool {
        let granted = passphrase == self.admin_passphrase;
        if granted {
            self.admin.store(true, Ordering::SeqCst);
            tracing::info!("Admin elevation granted");
        } else {
            tracing::warn!("Admin elevation refused");
        }
        granted
    }

    pub fn is_admin(&self) -> bool {
        self.admin.load(Ordering::SeqCst)
    }

    pub fn require_admin(&self) -> AuthResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::NotAdmin)
        }
    }

    /// Charges `amount` coins, flooring the balance at zero.
    pub async fn debit(&self, user_id: Uuid, amount: f64) -> AuthResult<User> {
        self.update_user(user_id, |user| user.debit(amount)).await
    }

    pub async fn adjust_balance(
        &self,
        user_id: Uuid,
        amount: f64,
        operation: BalanceOperation,
    ) -> AuthResult<User> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AuthError::InvalidAmount);
        }
        let user = self
            .update_user(user_id, |user| match operation {
                BalanceOperation::Add => user.credit(amount),
                BalanceOperation::Subtract => user.debit(amount),
            })
            .await?;
        tracing::info!(user_id = %user_id, balance = user.balance, "Balance adjusted");
        Ok(user)
    }

    /// Updates the stored user and, when it is the one logged in, the
    /// current-user slot as well.
    async fn update_user(&self, user_id: Uuid, f: impl FnOnce(&mut User)) -> AuthResult<User> {
        let user = self
            .slots
            .users
            .try_update(|users| {
                let user = users
                    .iter_mut()
                    .find(|u| u.id == user_id)
                    .ok_or(AuthError::UserNotFound(user_id))?;
                f(user);
                Ok::<_, AuthError>(user.clone())
            })
            .await?;

        if self
            .current_user()
            .await
            .is_some_and(|current| current.id == user_id)
        {
            self.slots.current_user.set_value(Some(user.clone())).await?;
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalStore, Store};

    async fn manager() -> SessionManager {
        let store: Arc<dyn Store> = Arc::new(LocalStore::in_memory());
        SessionManager::new(Arc::new(Slots::load(store).await), "open sesame")
    }

    #[tokio::test]
    async fn test_signup_sets_current_user_with_starting_balance() {
        let session = manager().await;
        let user = session.signup("ali@example.com", "pw").await.unwrap();
        assert_eq!(user.balance, 15.0);
        assert_eq!(session.current_user().await, Some(user));
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicate_email() {
        let session = manager().await;
        session.signup("ali@example.com", "pw").await.unwrap();
        let err = session.signup("ali@example.com", "other").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
        assert_eq!(session.users().await.len(), 1);

        // Case-sensitive match
        session.signup("Ali@example.com", "pw").await.unwrap();
        assert_eq!(session.users().await.len(), 2);
    }

    #[tokio::test]
    async fn test_signup_requires_credentials() {
        let session = manager().await;
        let err = session.signup("  ", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
        assert!(session.users().await.is_empty());
    }

    #[tokio::test]
    async fn test_login_requires_exact_match() {
        let session = manager().await;
        session.signup("ali@example.com", "pw").await.unwrap();
        session.logout().await.unwrap();

        let err = session.login("ali@example.com", "PW").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(session.current_user().await.is_none());

        let user = session.login("ali@example.com", "pw").await.unwrap();
        assert_eq!(session.require_user().await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_logout_drops_admin_elevation() {
        let session = manager().await;
        session.signup("ali@example.com", "pw").await.unwrap();
        assert!(!session.elevate_admin("wrong"));
        assert!(session.elevate_admin("open sesame"));
        assert!(session.require_admin().is_ok());

        session.logout().await.unwrap();
        assert!(!session.is_admin());
        assert!(matches!(session.require_user().await, Err(AuthError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn test_debit_never_goes_negative() {
        let session = manager().await;
        let user = session.signup("ali@example.com", "pw").await.unwrap();
        session
            .adjust_balance(user.id, 13.0, BalanceOperation::Subtract)
            .await
            .unwrap();

        let user = session.debit(user.id, 5.0).await.unwrap();
        assert_eq!(user.balance, 0.0);
        assert_eq!(session.current_user().await.unwrap().balance, 0.0);
    }

    #[tokio::test]
    async fn test_adjust_balance_validates_amount() {
        let session = manager().await;
        let user = session.signup("ali@example.com", "pw").await.unwrap();
        for amount in [-1.0, f64::NAN, f64::INFINITY] {
            let err = session
                .adjust_balance(user.id, amount, BalanceOperation::Add)
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidAmount));
        }
        let user = session
            .adjust_balance(user.id, 2.5, BalanceOperation::Add)
            .await
            .unwrap();
        assert_eq!(user.balance, 17.5);
    }
}

//! Accounts and sign-in.
//!
//! Signing in yields an [`AuthContext`] that the caller passes to whatever
//! gates screens; dropping it (or calling [`AuthContext::logout`]) signs out.
//! There is no ambient "current user".

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ExamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
}

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user: User,
}

impl AuthContext {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    /// Guard for administrator-only screens and operations.
    pub fn require_admin(&self) -> Result<&User, ExamError> {
        if self.is_admin() {
            Ok(&self.user)
        } else {
            Err(ExamError::Forbidden)
        }
    }

    pub fn logout(self) {
        info!(user = %self.user.email, "signed out");
    }
}

/// In-memory account store
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    accounts: Vec<Account>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory with the two demo accounts.
    pub fn with_demo_accounts() -> Self {
        let mut dir = Self::new();
        let demo = [
            ("1", "Test User", "user@example.com", "user123", Role::User),
            ("2", "Admin User", "admin@example.com", "admin123", Role::Admin),
        ];
        for (id, name, email, password, role) in demo {
            // ids and emails above are distinct
            let _ = dir.add(
                User {
                    id: id.to_string(),
                    name: name.to_string(),
                    email: email.to_string(),
                    role,
                    status: AccountStatus::Active,
                },
                password,
            );
        }
        dir
    }

    pub fn login(&self, email: &str, password: &str) -> Result<AuthContext, ExamError> {
        let account = self
            .accounts
            .iter()
            .find(|a| a.user.email.eq_ignore_ascii_case(email) && a.password == password)
            .ok_or_else(|| {
                warn!(email, "sign-in failed");
                ExamError::InvalidCredentials
            })?;

        if account.user.status == AccountStatus::Inactive {
            return Err(ExamError::AccountInactive(account.user.email.clone()));
        }

        info!(user = %account.user.email, role = %account.user.role, "signed in");
        Ok(AuthContext {
            user: account.user.clone(),
        })
    }

    pub fn users(&self) -> Vec<&User> {
        self.accounts.iter().map(|a| &a.user).collect()
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.accounts.iter().map(|a| &a.user).find(|u| u.id == id)
    }

    pub fn add(&mut self, user: User, password: &str) -> Result<(), ExamError> {
        if self
            .accounts
            .iter()
            .any(|a| a.user.id == user.id || a.user.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ExamError::Duplicate {
                kind: "user",
                id: user.id,
            });
        }
        self.accounts.push(Account {
            user,
            password: password.to_string(),
        });
        Ok(())
    }

    pub fn update(&mut self, user: User) -> Result<(), ExamError> {
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.user.id == user.id)
            .ok_or_else(|| ExamError::UserNotFound(user.id.clone()))?;
        account.user = user;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<User, ExamError> {
        let pos = self
            .accounts
            .iter()
            .position(|a| a.user.id == id)
            .ok_or_else(|| ExamError::UserNotFound(id.to_string()))?;
        Ok(self.accounts.remove(pos).user)
    }

    /// Case-insensitive match on name or email
    pub fn search(&self, term: &str) -> Vec<&User> {
        let term = term.to_lowercase();
        self.accounts
            .iter()
            .map(|a| &a.user)
            .filter(|u| u.name.to_lowercase().contains(&term) || u.email.to_lowercase().contains(&term))
            .collect()
    }
}

//! Session — explicit signed-in user, passed into the views that need it.
//!
//! ARCHITECTURE
//! ============
//! A `Directory` is the static demo account table. `Session::login` looks up
//! an account and binds the matching directory user. Views take `&Session`
//! at construction and check the role there; nothing reads auth state from
//! ambient globals.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Client,
    Admin,
    Solicitor,
    Paralegal,
}

impl UserRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Admin => "admin",
            Self::Solicitor => "solicitor",
            Self::Paralegal => "paralegal",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "admin" => Ok(Self::Admin),
            "solicitor" => Ok(Self::Solicitor),
            "paralegal" => Ok(Self::Paralegal),
            other => Err(AuthError::UnknownRole(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("no directory user for role {0}")]
    NoUserForRole(UserRole),
    #[error("role {actual} may not open this view (requires {required})")]
    Forbidden { required: UserRole, actual: UserRole },
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// A directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
struct DemoAccount {
    email: &'static str,
    password: &'static str,
    role: UserRole,
}

const DEMO_PASSWORD: &str = "demo";

/// Static account table. One user per role.
#[derive(Debug, Clone)]
pub struct Directory {
    users: Vec<User>,
    accounts: Vec<DemoAccount>,
}

impl Directory {
    #[must_use]
    pub fn demo() -> Self {
        let user = |id: &str, name: &str, email: &str, role| User {
            id: id.to_owned(),
            name: name.to_owned(),
            email: email.to_owned(),
            role,
        };
        let users = vec![
            user("user-1", "Sarah Thompson", "sarah.thompson@example.com", UserRole::Client),
            user("user-2", "Michael Chen", "michael.chen@forbeskirby.com", UserRole::Solicitor),
            user("user-3", "Emma Wilson", "emma.wilson@forbeskirby.com", UserRole::Paralegal),
            user("user-4", "James Mitchell", "james.mitchell@forbeskirby.com", UserRole::Admin),
        ];
        let accounts = vec![
            DemoAccount { email: "client@demo.com", password: DEMO_PASSWORD, role: UserRole::Client },
            DemoAccount { email: "admin@demo.com", password: DEMO_PASSWORD, role: UserRole::Admin },
            DemoAccount { email: "solicitor@demo.com", password: DEMO_PASSWORD, role: UserRole::Solicitor },
            DemoAccount { email: "paralegal@demo.com", password: DEMO_PASSWORD, role: UserRole::Paralegal },
        ];
        Self { users, accounts }
    }

    #[must_use]
    pub fn user_for_role(&self, role: UserRole) -> Option<&User> {
        self.users.iter().find(|user| user.role == role)
    }

    fn account_role(&self, email: &str, password: &str) -> Option<UserRole> {
        self.accounts
            .iter()
            .find(|account| account.email.eq_ignore_ascii_case(email.trim()) && account.password == password)
            .map(|account| account.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: User,
}

impl Session {
    /// Sign in against the directory.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` when no account matches, or
    /// `NoUserForRole` when the account's role has no directory user.
    pub fn login(directory: &Directory, email: &str, password: &str) -> Result<Self, AuthError> {
        let Some(role) = directory.account_role(email, password) else {
            warn!(email, "session: login rejected");
            return Err(AuthError::InvalidCredentials);
        };
        let user = directory
            .user_for_role(role)
            .cloned()
            .ok_or(AuthError::NoUserForRole(role))?;
        info!(user_id = %user.id, %role, "session: signed in");
        Ok(Self { user })
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub fn role(&self) -> UserRole {
        self.user.role
    }

    /// Replace the signed-in user with the directory user for `role`.
    ///
    /// # Errors
    ///
    /// Returns `NoUserForRole` when the directory has no such user; the
    /// session is left unchanged.
    pub fn switch_role(&mut self, directory: &Directory, role: UserRole) -> Result<(), AuthError> {
        let user = directory
            .user_for_role(role)
            .cloned()
            .ok_or(AuthError::NoUserForRole(role))?;
        info!(from = %self.user.role, to = %role, "session: role switched");
        self.user = user;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Forbidden` when the session's role differs from `required`.
    pub fn require_role(&self, required: UserRole) -> Result<(), AuthError> {
        if self.user.role == required {
            Ok(())
        } else {
            Err(AuthError::Forbidden { required, actual: self.user.role })
        }
    }

    pub fn logout(self) {
        info!(user_id = %self.user.id, "session: signed out");
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

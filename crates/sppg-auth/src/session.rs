//! Session data structure

use serde::{Deserialize, Serialize};

use crate::user::User;

/// Durable storage entry names.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const USER: &str = "user";

    pub const ALL: [&str; 3] = [TOKEN, REFRESH_TOKEN, USER];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn new(user: User, access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            user: Some(user),
            access_token: non_empty(Some(access_token)),
            refresh_token: non_empty(refresh_token),
        }
    }

    /// A session is authenticated only when both halves are present; either
    /// one alone counts as logged out.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Blank credentials are treated as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

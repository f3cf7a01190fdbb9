//! Auth endpoint request and response bodies

use serde::{Deserialize, Serialize};

use crate::user::User;

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginPayload {
    #[serde(default, alias = "accessToken")]
    pub token: Option<String>,
    #[serde(default, rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshPayload {
    #[serde(default, alias = "accessToken")]
    pub token: Option<String>,
    #[serde(default, rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: Option<String>,
}

/// `/auth/me` answers either `{user: {...}}`, `{data: {...}}` or the bare profile.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfilePayload {
    Wrapped {
        #[serde(alias = "data")]
        user: User,
    },
    Bare(User),
}

impl ProfilePayload {
    pub fn into_user(self) -> User {
        match self {
            ProfilePayload::Wrapped { user } | ProfilePayload::Bare(user) => user,
        }
    }
}

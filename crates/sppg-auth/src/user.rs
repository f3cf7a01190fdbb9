//! User profile and role projections
//!
//! The profile is a value object owned by the backend. Fields the session
//! layer does not know about are kept in `extra` so they survive a round trip
//! through storage.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Owner,
    Admin,
    /// School-side liaison
    Pic,
    /// A role this client does not know yet; grants nothing
    Other(String),
}

impl Role {
    /// Case-insensitive; unrecognized names become `Role::Other`.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "owner" => Role::Owner,
            "admin" => Role::Admin,
            "pic" => Role::Pic,
            _ => Role::Other(name),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Pic => "pic",
            Role::Other(name) => name,
        }
    }

    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Owner => &[
                Permission::ManageUsers,
                Permission::ManageSppg,
                Permission::ManageSchools,
                Permission::ManageMenus,
                Permission::ViewReports,
                Permission::ExportReports,
            ],
            Role::Admin => &[
                Permission::ManageSchools,
                Permission::ManageMenus,
                Permission::ViewReports,
                Permission::ExportReports,
            ],
            Role::Pic => &[Permission::ConfirmDelivery, Permission::ViewReports],
            Role::Other(_) => &[],
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Role::from_name(s))
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Role::from_name(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    ManageSppg,
    ManageSchools,
    ManageMenus,
    /// Scan delivery QR codes at a school
    ConfirmDelivery,
    ViewReports,
    ExportReports,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub username: String,
    pub role: Role,
    #[serde(default, alias = "full_name", alias = "fullName")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Set for PIC accounts
    #[serde(default, alias = "school_id", deserialize_with = "opt_id_string")]
    pub school_id: Option<String>,
    /// Set for accounts bound to a provider kitchen
    #[serde(default, alias = "sppg_id", deserialize_with = "opt_id_string")]
    pub sppg_id: Option<String>,
    #[serde(default = "default_active", alias = "is_active")]
    pub is_active: bool,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updated_at")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.id = self.id.trim().to_string();
        self
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.allows(permission)
    }
}

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn opt_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<RawId>::deserialize(deserializer).map(|raw| raw.map(String::from))
}

/// Partial profile update; absent fields are left unchanged by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

use models::RoleName;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registration input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Login input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Domain user (business view)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: RoleName,
    pub is_active: bool,
}

/// Domain credentials (hashed)
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub password_algorithm: String,
}

/// Login result (session)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: AuthUser,
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User email.
    pub sub: String,
    pub uid: Uuid,
    pub role: RoleName,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: RoleName,
}

impl Actor {
    pub fn new(id: Uuid, role: RoleName) -> Self { Self { id, role } }

    pub fn is_admin(&self) -> bool { self.role == RoleName::Admin }

    /// Admins may act on anything; everyone else only on what they own.
    pub fn can_act_for(&self, owner_id: Uuid) -> bool { self.is_admin() || self.id == owner_id }
}

impl From<&Claims> for Actor {
    fn from(c: &Claims) -> Self { Actor { id: c.uid, role: c.role } }
}

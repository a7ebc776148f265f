//! Authentication models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User roles for authorization, stored as small integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Role {
    /// Administrator
    Admin = 1,
    /// Regular member
    Member = 2,
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role as u8
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Role::Admin),
            2 => Ok(Role::Member),
            other => Err(format!("unknown role {}", other)),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("role is not an integer: {:?}", s))?;
        Role::try_from(value)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Subscription state of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    #[default]
    Inactive,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Inactive => "INACTIVE",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(SubscriptionStatus::Active),
            "INACTIVE" => Ok(SubscriptionStatus::Inactive),
            other => Err(format!("unknown subscription status {:?}", other)),
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account as returned by the user directory, including the password hash
#[derive(Clone)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub subscription_status: SubscriptionStatus,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("subscription_status", &self.subscription_status)
            .finish_non_exhaustive()
    }
}

impl UserRecord {
    /// Public profile, without the password hash
    pub fn profile(&self) -> SubjectProfile {
        SubjectProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            subscription_status: self.subscription_status,
        }
    }
}

/// Public view of an authenticated subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub subscription_status: SubscriptionStatus,
}

/// Server-side state for one logged-in session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub subject_id: i64,
    pub role: Role,
    pub subscription_status: SubscriptionStatus,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl From<&SubjectProfile> for SessionRecord {
    fn from(profile: &SubjectProfile) -> Self {
        Self {
            subject_id: profile.id,
            role: profile.role,
            subscription_status: profile.subscription_status,
            name: Some(profile.name.clone()),
            email: Some(profile.email.clone()),
        }
    }
}

/// Per-request identity attached by the session gates
///
/// Role and subscription status are absent for sessions that were stored
/// in the legacy scalar shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationContext {
    #[serde(skip)]
    pub session_id: String,
    pub subject_id: i64,
    pub role: Option<Role>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl AuthorizationContext {
    pub fn from_record(session_id: &str, record: SessionRecord) -> Self {
        Self {
            session_id: session_id.to_string(),
            subject_id: record.subject_id,
            role: Some(record.role),
            subscription_status: Some(record.subscription_status),
            name: record.name,
            email: record.email,
        }
    }

    pub fn subject_only(session_id: &str, subject_id: i64) -> Self {
        Self {
            session_id: session_id.to_string(),
            subject_id,
            role: None,
            subscription_status: None,
            name: None,
            email: None,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    pub fn has_active_subscription(&self) -> bool {
        self.subscription_status == Some(SubscriptionStatus::Active)
    }
}

/// Login credentials
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response with token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub user: SubjectProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_integer_encoding() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "1");
        assert_eq!(serde_json::from_str::<Role>("2").unwrap(), Role::Member);
        assert!(serde_json::from_str::<Role>("7").is_err());
        assert_eq!("1".parse::<Role>().unwrap(), Role::Admin);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_subscription_status_encoding() {
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Active).unwrap(),
            "\"ACTIVE\""
        );
        assert_eq!(
            "INACTIVE".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Inactive
        );
        assert!("active".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn test_user_record_debug_hides_hash() {
        let user = UserRecord {
            id: 1,
            name: "Alice".to_string(),
            email: "alice".to_string(),
            password_hash: "$2b$04$secret-hash".to_string(),
            role: Role::Member,
            subscription_status: SubscriptionStatus::Active,
        };
        let debug = format!("{:?}", user);
        assert!(!debug.contains("secret-hash"));
        assert_eq!(user.profile().id, 1);
    }

    #[test]
    fn test_legacy_context_fails_capability_checks() {
        let ctx = AuthorizationContext::subject_only("sid", 9);
        assert!(!ctx.has_role(Role::Admin));
        assert!(!ctx.has_role(Role::Member));
        assert!(!ctx.has_active_subscription());
    }
}

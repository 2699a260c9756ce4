//! Data models for Admin SDK Directory API payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A Google Workspace group, keyed by its email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub email: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub admin_created: Option<bool>,
    #[serde(default)]
    pub aliases: Vec<String>,
    // The API serializes the count as a string.
    #[serde(default)]
    pub direct_members_count: Option<String>,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("-");
        let count = self.direct_members_count.as_deref().unwrap_or("-");
        write!(f, "{}\t{}\t{} member(s)", self.email, name, count)
    }
}

/// Membership roles accepted by the Directory API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Manager,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Manager => "MANAGER",
            Role::Member => "MEMBER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Role::Owner),
            "MANAGER" => Ok(Role::Manager),
            "MEMBER" => Ok(Role::Member),
            other => Err(format!(
                "Invalid role {}. Choose from OWNER, MANAGER, MEMBER",
                other
            )),
        }
    }
}

/// A group membership entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub email: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "type")]
    pub member_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = self.role.as_deref().unwrap_or("-");
        let member_type = self.member_type.as_deref().unwrap_or("-");
        let status = self.status.as_deref().unwrap_or("-");
        write!(f, "{}\t{}\t{}\t{}", self.email, role, member_type, status)
    }
}

/// Response from the members.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersListResponse {
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorItem {
    #[serde(default)]
    pub reason: Option<String>,
}

impl ApiErrorResponse {
    /// The `reason` code of the first error item, if any.
    pub fn reason(&self) -> Option<&str> {
        self.error.errors.first().and_then(|e| e.reason.as_deref())
    }
}

/// Service account credentials from JSON file.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: Option<String>,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_deserialize() {
        let json = r#"{
            "kind": "admin#directory#group",
            "id": "xxx",
            "email": "group1@example.com",
            "name": "group1@example.com",
            "description": "",
            "adminCreated": true,
            "directMembersCount": "2",
            "aliases": ["group2@example.com"]
        }"#;

        let group: Group = serde_json::from_str(json).unwrap();
        assert_eq!(group.email, "group1@example.com");
        assert_eq!(group.admin_created, Some(true));
        assert_eq!(group.direct_members_count, Some("2".to_string()));
        assert_eq!(group.aliases, vec!["group2@example.com"]);
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!("owner".parse::<Role>().unwrap(), Role::Owner);
        assert_eq!("MANAGER".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(Role::Member.to_string(), "MEMBER");
        assert!("ABC".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_screaming() {
        let json = serde_json::to_string(&Role::Owner).unwrap();
        assert_eq!(json, "\"OWNER\"");
    }

    #[test]
    fn test_member_deserialize() {
        let json = r#"{
            "email": "user1@example.com",
            "role": "OWNER",
            "type": "USER",
            "status": "ACTIVE",
            "id": "111"
        }"#;

        let member: Member = serde_json::from_str(json).unwrap();
        assert_eq!(member.email, "user1@example.com");
        assert_eq!(member.role.as_deref(), Some("OWNER"));
        assert_eq!(member.member_type.as_deref(), Some("USER"));
    }

    #[test]
    fn test_member_display() {
        let member = Member {
            email: "user1@example.com".to_string(),
            id: None,
            role: Some("MEMBER".to_string()),
            member_type: Some("USER".to_string()),
            status: Some("ACTIVE".to_string()),
        };

        let display = format!("{}", member);
        assert!(display.contains("user1@example.com"));
        assert!(display.contains("MEMBER"));
        assert!(display.contains("ACTIVE"));
    }

    #[test]
    fn test_api_error_reason() {
        let json = r#"{
            "error": {
                "code": 404,
                "message": "Resource Not Found: groupKey",
                "errors": [{"domain": "global", "reason": "notFound", "message": "Resource Not Found: groupKey"}]
            }
        }"#;

        let response: ApiErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.error.code, 404);
        assert_eq!(response.reason(), Some("notFound"));
    }
}

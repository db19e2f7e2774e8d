//! Organizations, memberships and invites.

use serde::{Deserialize, Serialize};

/// Role of a member within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    #[default]
    Member,
    Viewer,
}

impl MemberRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s {
            "owner" => Self::Owner,
            "admin" => Self::Admin,
            "viewer" => Self::Viewer,
            _ => Self::Member,
        }
    }

    /// Owners and admins manage invites.
    #[must_use]
    pub const fn can_manage(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

/// A team grouping of users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    #[serde(default)]
    pub members: Vec<Member>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Organization {
    pub fn new(name: String, created_by: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: super::new_id("org"),
            name,
            description: None,
            created_by,
            members: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Look up a member; emails compare case-insensitively.
    #[must_use]
    pub fn member(&self, email: &str) -> Option<&Member> {
        let email = crate::validate::normalize_email(email);
        self.members.iter().find(|m| m.email.eq_ignore_ascii_case(&email))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub email: String,
    pub role: MemberRole,
    pub joined_at: i64,
}

/// Invite lifecycle. Only `Pending` invites can change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

impl InviteStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s {
            "accepted" => Self::Accepted,
            "declined" => Self::Declined,
            "cancelled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

/// Invitation for an email address to join an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub invited_by: String,
    pub role: MemberRole,
    pub status: InviteStatus,
    pub invited_at: i64,
    pub responded_at: Option<i64>,
}

impl Invite {
    pub fn new(organization_id: String, email: String, invited_by: String, role: MemberRole) -> Self {
        Self {
            id: super::new_id("inv"),
            organization_id,
            email,
            invited_by,
            role,
            status: InviteStatus::Pending,
            invited_at: chrono::Utc::now().timestamp_millis(),
            responded_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_invite_is_pending() {
        let invite = Invite::new(
            "org_1".into(),
            "sam@example.com".into(),
            "alex@example.com".into(),
            MemberRole::Member,
        );
        assert!(invite.id.starts_with("inv_"));
        assert_eq!(invite.status, InviteStatus::Pending);
        assert!(invite.responded_at.is_none());
    }

    #[test]
    fn test_role_permissions() {
        assert!(MemberRole::Owner.can_manage());
        assert!(MemberRole::Admin.can_manage());
        assert!(!MemberRole::Member.can_manage());
        assert!(!MemberRole::Viewer.can_manage());
    }
}

//! Organizations, memberships and invites.
//!
//! Membership is keyed by email. Only owners and admins send invites, and
//! only the invitee answers one. An organization never loses its last owner
//! while other members remain.

use rusqlite::OptionalExtension;

use super::settings::set_setting_tx;
use super::{now_ms, SqliteStorage};
use crate::error::{Error, Result};
use crate::model::{Invite, InviteStatus, Member, MemberRole, Organization, SettingKey};
use crate::storage::events::EventType;
use crate::validate::{is_valid_email, normalize_email};

const ORG_COLUMNS: &str = "id, name, description, created_by, created_at, updated_at";
const INVITE_COLUMNS: &str = "id, org_id, email, invited_by, role, status, invited_at, responded_at";

impl SqliteStorage {
    /// Create an organization. The creator joins as owner and it becomes
    /// the current organization.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` when the name is taken.
    pub fn create_organization(&mut self, org: &Organization, actor: &str) -> Result<()> {
        if org.name.trim().is_empty() {
            return Err(Error::RequiredField("name"));
        }
        if self.get_organization(&org.name)?.is_some() {
            return Err(Error::AlreadyExists {
                entity: "Org",
                name: org.name.clone(),
            });
        }

        self.mutate("create_organization", actor, |tx, ctx| {
            tx.execute(
                &format!("INSERT INTO organizations ({ORG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                rusqlite::params![
                    org.id,
                    org.name,
                    org.description,
                    org.created_by,
                    org.created_at,
                    org.updated_at,
                ],
            )?;
            tx.execute(
                "INSERT INTO org_members (org_id, email, role, joined_at) VALUES (?1, ?2, 'owner', ?3)",
                rusqlite::params![org.id, normalize_email(&org.created_by), org.created_at],
            )?;
            set_setting_tx(tx, ctx, SettingKey::CurrentOrg.as_str(), &org.id)?;
            ctx.record_note("org", &org.id, EventType::OrgCreated, &org.name);
            Ok(())
        })
    }

    /// Find an organization by id or (case-insensitive) name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_organization(&self, id_or_name: &str) -> Result<Option<Organization>> {
        let org = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ORG_COLUMNS} FROM organizations
                     WHERE id = ?1 OR name = ?1 COLLATE NOCASE
                     LIMIT 1"
                ),
                [id_or_name],
                map_org_row,
            )
            .optional()?;

        match org {
            Some(mut org) => {
                org.members = self.load_members(&org.id)?;
                Ok(Some(org))
            }
            None => Ok(None),
        }
    }

    /// Get an organization or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches.
    pub fn require_organization(&self, id_or_name: &str) -> Result<Organization> {
        self.get_organization(id_or_name)?
            .ok_or_else(|| Error::not_found("Org", id_or_name))
    }

    /// List organizations, optionally only those `member` belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_organizations(&self, member: Option<&str>) -> Result<Vec<Organization>> {
        let member = member.map(normalize_email);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations o
             WHERE ?1 IS NULL OR EXISTS (
                 SELECT 1 FROM org_members m WHERE m.org_id = o.id AND m.email = ?1 COLLATE NOCASE
             )
             ORDER BY name COLLATE NOCASE"
        ))?;
        let mut orgs = stmt
            .query_map([member], map_org_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for org in &mut orgs {
            org.members = self.load_members(&org.id)?;
        }
        Ok(orgs)
    }

    /// Join an organization directly as a member.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the actor is already a member.
    pub fn join_organization(&mut self, org: &str, actor: &str) -> Result<Organization> {
        let org = self.require_organization(org)?;
        let email = normalize_email(actor);
        if org.member(&email).is_some() {
            return Err(Error::AlreadyExists {
                entity: "Member",
                name: email,
            });
        }

        self.mutate("join_organization", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO org_members (org_id, email, role, joined_at) VALUES (?1, ?2, 'member', ?3)",
                rusqlite::params![org.id, email, now_ms()],
            )?;
            ctx.record_note("org", &org.id, EventType::MemberJoined, &email);
            Ok(())
        })?;

        self.require_organization(&org.id)
    }

    /// Leave an organization.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the actor is not a member, or is the last
    /// owner while other members remain.
    pub fn leave_organization(&mut self, org: &str, actor: &str) -> Result<()> {
        let org = self.require_organization(org)?;
        let Some(member) = org.member(actor) else {
            return Err(Error::InvalidState(format!(
                "{actor} is not a member of {}",
                org.name
            )));
        };

        if member.role == MemberRole::Owner {
            let owners = org.members.iter().filter(|m| m.role == MemberRole::Owner).count();
            if owners == 1 && org.members.len() > 1 {
                return Err(Error::InvalidState(format!(
                    "{actor} is the last owner of {}; promote someone first",
                    org.name
                )));
            }
        }

        self.mutate("leave_organization", actor, |tx, ctx| {
            tx.execute(
                "DELETE FROM org_members WHERE org_id = ?1 AND email = ?2 COLLATE NOCASE",
                rusqlite::params![org.id, member.email],
            )?;
            tx.execute(
                "DELETE FROM settings WHERE key = ?1 AND value = ?2",
                rusqlite::params![SettingKey::CurrentOrg.as_str(), org.id],
            )?;
            ctx.record_note("org", &org.id, EventType::MemberLeft, actor);
            Ok(())
        })
    }

    /// Invite someone to an organization.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` unless the actor is an owner or admin,
    /// `InvalidArgument` for a bad email or the owner role, and
    /// `AlreadyExists` for existing members or pending invites.
    pub fn invite_member(&mut self, org: &str, email: &str, role: MemberRole, actor: &str) -> Result<Invite> {
        let org = self.require_organization(org)?;
        let email = normalize_email(email);

        if !org.member(actor).is_some_and(|m| m.role.can_manage()) {
            return Err(Error::PermissionDenied(format!(
                "only owners and admins of {} can invite",
                org.name
            )));
        }
        if !is_valid_email(&email) {
            return Err(Error::InvalidArgument(format!("invalid email '{email}'")));
        }
        if role == MemberRole::Owner {
            return Err(Error::InvalidArgument("invites cannot grant the owner role".into()));
        }
        if org.member(&email).is_some() {
            return Err(Error::AlreadyExists {
                entity: "Member",
                name: email,
            });
        }
        let pending = self.list_invites(Some(&org.id), Some(&email), Some(InviteStatus::Pending))?;
        if !pending.is_empty() {
            return Err(Error::AlreadyExists {
                entity: "Invite",
                name: email,
            });
        }

        let invite = Invite::new(org.id.clone(), email, actor.to_string(), role);
        self.mutate("invite_member", actor, |tx, ctx| {
            tx.execute(
                &format!("INSERT INTO invites ({INVITE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                rusqlite::params![
                    invite.id,
                    invite.organization_id,
                    invite.email,
                    invite.invited_by,
                    invite.role.as_str(),
                    invite.status.as_str(),
                    invite.invited_at,
                    invite.responded_at,
                ],
            )?;
            ctx.record_note("invite", &invite.id, EventType::InviteSent, &invite.email);
            Ok(())
        })?;

        Ok(invite)
    }

    /// List invites, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_invites(
        &self,
        org_id: Option<&str>,
        email: Option<&str>,
        status: Option<InviteStatus>,
    ) -> Result<Vec<Invite>> {
        let email = email.map(normalize_email);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INVITE_COLUMNS} FROM invites
             WHERE (?1 IS NULL OR org_id = ?1)
               AND (?2 IS NULL OR email = ?2 COLLATE NOCASE)
               AND (?3 IS NULL OR status = ?3)
             ORDER BY invited_at DESC"
        ))?;
        let invites = stmt
            .query_map(
                rusqlite::params![org_id, email, status.map(|s| s.as_str())],
                map_invite_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(invites)
    }

    /// Get an invite by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it doesn't exist.
    pub fn get_invite(&self, id: &str) -> Result<Invite> {
        self.conn
            .query_row(
                &format!("SELECT {INVITE_COLUMNS} FROM invites WHERE id = ?1"),
                [id],
                map_invite_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Invite", id))
    }

    /// Accept or decline a pending invite addressed to the actor.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for someone else's invite or
    /// `InvalidState` if it is no longer pending.
    pub fn respond_invite(&mut self, id: &str, accept: bool, actor: &str) -> Result<Invite> {
        let invite = self.get_invite(id)?;
        if !invite.email.eq_ignore_ascii_case(&normalize_email(actor)) {
            return Err(Error::PermissionDenied(format!(
                "invite {id} is addressed to {}",
                invite.email
            )));
        }
        if invite.status != InviteStatus::Pending {
            return Err(Error::InvalidState(format!(
                "invite {id} is already {}",
                invite.status.as_str()
            )));
        }

        let status = if accept {
            InviteStatus::Accepted
        } else {
            InviteStatus::Declined
        };

        self.mutate("respond_invite", actor, |tx, ctx| {
            let now = now_ms();
            tx.execute(
                "UPDATE invites SET status = ?1, responded_at = ?2 WHERE id = ?3",
                rusqlite::params![status.as_str(), now, invite.id],
            )?;
            if accept {
                tx.execute(
                    "INSERT OR IGNORE INTO org_members (org_id, email, role, joined_at) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![invite.organization_id, normalize_email(&invite.email), invite.role.as_str(), now],
                )?;
                ctx.record_note("invite", &invite.id, EventType::InviteAccepted, &invite.email);
                ctx.record_note("org", &invite.organization_id, EventType::MemberJoined, &invite.email);
            } else {
                ctx.record_note("invite", &invite.id, EventType::InviteDeclined, &invite.email);
            }
            Ok(())
        })?;

        self.get_invite(&invite.id)
    }

    /// Cancel a pending invite. Allowed for the inviter and org admins.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `InvalidState` if not pending.
    pub fn cancel_invite(&mut self, id: &str, actor: &str) -> Result<Invite> {
        let invite = self.get_invite(id)?;
        let org = self.require_organization(&invite.organization_id)?;

        let allowed = invite.invited_by.eq_ignore_ascii_case(actor.trim()) || org.member(actor).is_some_and(|m| m.role.can_manage());
        if !allowed {
            return Err(Error::PermissionDenied(format!(
                "only the inviter or an admin of {} can cancel",
                org.name
            )));
        }
        if invite.status != InviteStatus::Pending {
            return Err(Error::InvalidState(format!(
                "invite {id} is already {}",
                invite.status.as_str()
            )));
        }

        self.mutate("cancel_invite", actor, |tx, ctx| {
            tx.execute(
                "UPDATE invites SET status = 'cancelled', responded_at = ?1 WHERE id = ?2",
                rusqlite::params![now_ms(), invite.id],
            )?;
            ctx.record_note("invite", &invite.id, EventType::InviteCancelled, &invite.email);
            Ok(())
        })?;

        self.get_invite(&invite.id)
    }

    /// The current organization: the `current_org` setting, else the
    /// first organization the actor belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn current_organization(&self, actor: &str) -> Result<Option<Organization>> {
        if let Some(id) = self.get_setting(SettingKey::CurrentOrg.as_str())? {
            if let Some(org) = self.get_organization(&id)? {
                return Ok(Some(org));
            }
        }
        Ok(self.list_organizations(Some(actor))?.into_iter().next())
    }

    fn load_members(&self, org_id: &str) -> Result<Vec<Member>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT email, role, joined_at FROM org_members WHERE org_id = ?1
             ORDER BY CASE role WHEN 'owner' THEN 0 WHEN 'admin' THEN 1 WHEN 'member' THEN 2 ELSE 3 END, email",
        )?;
        let members = stmt
            .query_map([org_id], |row| {
                let role: String = row.get(1)?;
                Ok(Member {
                    email: row.get(0)?,
                    role: MemberRole::from_str(&role),
                    joined_at: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(members)
    }
}

fn map_org_row(row: &rusqlite::Row) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_by: row.get(3)?,
        members: Vec::new(),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn map_invite_row(row: &rusqlite::Row) -> rusqlite::Result<Invite> {
    let role: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(Invite {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        email: row.get(2)?,
        invited_by: row.get(3)?,
        role: MemberRole::from_str(&role),
        status: InviteStatus::from_str(&status),
        invited_at: row.get(6)?,
        responded_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ACTOR;
    use super::*;

    const SAM: &str = "sam@example.com";

    fn storage_with_org() -> (SqliteStorage, Organization) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let org = Organization::new("Acme".into(), ACTOR.into());
        storage.create_organization(&org, ACTOR).unwrap();
        (storage, org)
    }

    #[test]
    fn test_creator_is_owner_and_current() {
        let (storage, org) = storage_with_org();
        let loaded = storage.require_organization("acme").unwrap();
        assert_eq!(loaded.members.len(), 1);
        assert_eq!(loaded.members[0].role, MemberRole::Owner);

        let current = storage.current_organization(SAM).unwrap().unwrap();
        assert_eq!(current.id, org.id);
    }

    #[test]
    fn test_invite_accept_flow() {
        let (mut storage, org) = storage_with_org();
        let invite = storage.invite_member("Acme", SAM, MemberRole::Admin, ACTOR).unwrap();
        assert_eq!(invite.status, InviteStatus::Pending);

        // Duplicate pending invite
        assert!(matches!(
            storage.invite_member("Acme", SAM, MemberRole::Member, ACTOR),
            Err(Error::AlreadyExists { .. })
        ));

        // Only the invitee can respond
        assert!(matches!(
            storage.respond_invite(&invite.id, true, ACTOR),
            Err(Error::PermissionDenied(_))
        ));

        let accepted = storage.respond_invite(&invite.id, true, SAM).unwrap();
        assert_eq!(accepted.status, InviteStatus::Accepted);
        assert!(accepted.responded_at.is_some());

        let org = storage.require_organization(&org.id).unwrap();
        assert_eq!(org.member(SAM).unwrap().role, MemberRole::Admin);

        // Already answered
        assert!(matches!(
            storage.respond_invite(&invite.id, false, SAM),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_invite_rules() {
        let (mut storage, _) = storage_with_org();
        assert!(storage.invite_member("Acme", "not-an-email", MemberRole::Member, ACTOR).is_err());
        assert!(storage.invite_member("Acme", SAM, MemberRole::Owner, ACTOR).is_err());
        assert!(matches!(
            storage.invite_member("Acme", SAM, MemberRole::Member, "stranger@example.com"),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(
            storage.invite_member("Acme", ACTOR, MemberRole::Member, ACTOR),
            Err(Error::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_decline_and_cancel() {
        let (mut storage, _) = storage_with_org();
        let invite = storage.invite_member("Acme", SAM, MemberRole::Member, ACTOR).unwrap();
        let declined = storage.respond_invite(&invite.id, false, SAM).unwrap();
        assert_eq!(declined.status, InviteStatus::Declined);

        // A new invite is allowed once the old one is answered
        let again = storage.invite_member("Acme", SAM, MemberRole::Member, ACTOR).unwrap();
        let cancelled = storage.cancel_invite(&again.id, ACTOR).unwrap();
        assert_eq!(cancelled.status, InviteStatus::Cancelled);
    }

    #[test]
    fn test_last_owner_cannot_leave() {
        let (mut storage, org) = storage_with_org();
        storage.join_organization("Acme", SAM).unwrap();

        assert!(matches!(
            storage.leave_organization("Acme", ACTOR),
            Err(Error::InvalidState(_))
        ));

        storage.leave_organization("Acme", SAM).unwrap();
        storage.leave_organization("Acme", ACTOR).unwrap();
        let org = storage.require_organization(&org.id).unwrap();
        assert!(org.members.is_empty());
    }

    #[test]
    fn test_join_twice_rejected() {
        let (mut storage, _) = storage_with_org();
        storage.join_organization("Acme", SAM).unwrap();
        assert!(matches!(
            storage.join_organization("Acme", SAM),
            Err(Error::AlreadyExists { .. })
        ));
        assert_eq!(storage.list_organizations(Some(SAM)).unwrap().len(), 1);
        assert!(storage.list_organizations(Some("nobody@example.com")).unwrap().is_empty());
    }

    #[test]
    fn test_mixed_case_invitee_can_leave() {
        let (mut storage, org) = storage_with_org();
        let invite = storage.invite_member("Acme", "Sam@Acme.io", MemberRole::Member, ACTOR).unwrap();
        storage.respond_invite(&invite.id, true, "Sam@Acme.io").unwrap();

        let loaded = storage.require_organization(&org.id).unwrap();
        assert!(loaded.member("Sam@Acme.io").is_some());
        assert_eq!(storage.list_organizations(Some("SAM@acme.io")).unwrap().len(), 1);

        storage.leave_organization("Acme", "Sam@Acme.io").unwrap();
        let loaded = storage.require_organization(&org.id).unwrap();
        assert_eq!(loaded.members.len(), 1);
    }

    #[test]
    fn test_membership_unique_across_email_case() {
        let (mut storage, org) = storage_with_org();
        storage.join_organization("Acme", "Sam@Acme.io").unwrap();

        assert!(matches!(
            storage.join_organization("Acme", "sam@acme.io"),
            Err(Error::AlreadyExists { .. })
        ));
        assert!(matches!(
            storage.invite_member("Acme", "sam@acme.io", MemberRole::Member, ACTOR),
            Err(Error::AlreadyExists { .. })
        ));

        let loaded = storage.require_organization(&org.id).unwrap();
        let emails: Vec<&str> = loaded.members.iter().map(|m| m.email.as_str()).collect();
        assert_eq!(emails, vec![ACTOR, "sam@acme.io"]);
    }
}

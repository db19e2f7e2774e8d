//! Organization, membership and invite commands.
//!
//! Commands that take an optional organization fall back to the current
//! one (the `current_org` setting, else the first organization the actor
//! belongs to).

use super::{dry_run, format_short, open_storage, print_json, resolve_actor, Globals};
use crate::cli::OrgCommands;
use crate::error::{Error, Result};
use crate::model::{Invite, Organization, SettingKey};
use crate::storage::SqliteStorage;
use colored::Colorize;

/// Execute an organization command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(command: &OrgCommands, globals: Globals<'_>) -> Result<()> {
    let mut storage = open_storage(globals.db)?;
    let actor = resolve_actor(globals.actor);
    let json = globals.json;

    match command {
        OrgCommands::Create { name, description } => {
            if name.trim().is_empty() {
                return Err(Error::RequiredField("name"));
            }
            let mut org = Organization::new(name.trim().to_string(), actor.clone());
            org.description.clone_from(description);

            if dry_run(json, "create_organization", &org.name, &format!("create organization {}", org.name)) {
                return Ok(());
            }
            storage.create_organization(&org, &actor)?;
            let org = storage.require_organization(&org.id)?;

            if crate::is_silent() {
                println!("{}", org.id);
            } else if json {
                print_json(&org)?;
            } else {
                println!("Created organization: {}", org.name.bold());
                println!("  ID:    {}", org.id);
                println!("  Owner: {actor}");
            }
            Ok(())
        }
        OrgCommands::List { all } => {
            let member = if *all { None } else { Some(actor.as_str()) };
            let orgs = storage.list_organizations(member)?;
            let current = storage.current_organization(&actor)?.map(|o| o.id);

            if json {
                print_json(&serde_json::json!({ "organizations": orgs, "count": orgs.len() }))?;
            } else if orgs.is_empty() {
                println!("No organizations.");
                println!("\nCreate one with: pu org create \"Acme\"");
            } else {
                for org in &orgs {
                    let marker = if current.as_deref() == Some(org.id.as_str()) {
                        "*".green().to_string()
                    } else {
                        " ".to_string()
                    };
                    let role = org.member(&actor).map_or("-", |m| m.role.as_str());
                    println!(
                        "{marker} {:<24} {:>3} members  {role}",
                        org.name.bold(),
                        org.members.len()
                    );
                }
            }
            Ok(())
        }
        OrgCommands::Show { org } => {
            let org = target_org(&storage, org.as_deref(), &actor)?;
            if json {
                return print_json(&org);
            }
            println!("Organization: {}", org.name.bold());
            println!("  ID:          {}", org.id);
            println!("  Description: {}", org.description.as_deref().unwrap_or("-"));
            println!("  Created by:  {}", org.created_by);
            println!("  Members:     {}", org.members.len());
            Ok(())
        }
        OrgCommands::Members { org } => {
            let org = target_org(&storage, org.as_deref(), &actor)?;
            if crate::is_csv() {
                println!("email,role,joined");
                for m in &org.members {
                    println!("{},{},{}", crate::csv_escape(&m.email), m.role.as_str(), format_short(m.joined_at));
                }
            } else if json {
                print_json(&serde_json::json!({ "organization": org.name, "members": org.members }))?;
            } else {
                println!("Members of {} ({}):\n", org.name.bold(), org.members.len());
                for m in &org.members {
                    println!("  {:<32} {:<7} {}", m.email, m.role.as_str(), format_short(m.joined_at).dimmed());
                }
            }
            Ok(())
        }
        OrgCommands::Join { org } => {
            if dry_run(json, "join_organization", org, &format!("join organization {org}")) {
                return Ok(());
            }
            let org = storage.join_organization(org, &actor)?;
            if crate::is_silent() {
                println!("{}", org.id);
            } else if json {
                print_json(&org)?;
            } else {
                println!("Joined {}", org.name.bold());
            }
            Ok(())
        }
        OrgCommands::Leave { org } => {
            let org = storage.require_organization(org)?;
            if dry_run(json, "leave_organization", &org.name, &format!("leave organization {}", org.name)) {
                return Ok(());
            }
            storage.leave_organization(&org.id, &actor)?;
            if json {
                print_json(&serde_json::json!({ "left": true, "organization": org.name }))?;
            } else if !crate::is_silent() {
                println!("Left {}", org.name);
            }
            Ok(())
        }
        OrgCommands::Switch { org } => {
            let org = storage.require_organization(org)?;
            if org.member(&actor).is_none() {
                return Err(Error::PermissionDenied(format!(
                    "{actor} is not a member of {}",
                    org.name
                )));
            }
            if dry_run(json, "switch_organization", &org.name, &format!("switch to organization {}", org.name)) {
                return Ok(());
            }
            storage.set_setting(SettingKey::CurrentOrg.as_str(), &org.id, &actor)?;
            if crate::is_silent() {
                println!("{}", org.id);
            } else if json {
                print_json(&org)?;
            } else {
                println!("Now using organization {}", org.name.bold());
            }
            Ok(())
        }
        OrgCommands::Current => {
            let org = storage.current_organization(&actor)?;
            match org {
                Some(org) if json => print_json(&org)?,
                Some(org) => println!("{} ({})", org.name.bold(), org.id),
                None if json => print_json(&serde_json::Value::Null)?,
                None => println!("No current organization."),
            }
            Ok(())
        }
        OrgCommands::Invite { email, org, role } => {
            let org = target_org(&storage, org.as_deref(), &actor)?;
            if dry_run(json, "invite_member", email, &format!("invite {email} to {} as {}", org.name, role.as_str())) {
                return Ok(());
            }
            let invite = storage.invite_member(&org.id, email, *role, &actor)?;
            if crate::is_silent() {
                println!("{}", invite.id);
            } else if json {
                print_json(&invite)?;
            } else {
                println!("Invited {} to {} as {}", invite.email, org.name.bold(), invite.role.as_str());
                println!("  Invite: {}", invite.id);
            }
            Ok(())
        }
        OrgCommands::Invites { org, mine, status } => {
            let invites = if *mine {
                storage.list_invites(None, Some(&actor), *status)?
            } else {
                let org = target_org(&storage, org.as_deref(), &actor)?;
                storage.list_invites(Some(&org.id), None, *status)?
            };
            print_invites(&invites, json)
        }
        OrgCommands::Accept { invite_id } => respond(&mut storage, invite_id, true, json, &actor),
        OrgCommands::Decline { invite_id } => respond(&mut storage, invite_id, false, json, &actor),
        OrgCommands::Cancel { invite_id } => {
            if dry_run(json, "cancel_invite", invite_id, &format!("cancel invite {invite_id}")) {
                return Ok(());
            }
            let invite = storage.cancel_invite(invite_id, &actor)?;
            if json {
                print_json(&invite)?;
            } else if !crate::is_silent() {
                println!("Cancelled invite for {}", invite.email);
            }
            Ok(())
        }
    }
}

/// The named organization, else the current one.
fn target_org(storage: &SqliteStorage, org: Option<&str>, actor: &str) -> Result<Organization> {
    match org {
        Some(org) => storage.require_organization(org),
        None => storage
            .current_organization(actor)?
            .ok_or_else(|| Error::InvalidState("no current organization; pass one or run `pu org switch`".to_string())),
    }
}

fn respond(storage: &mut SqliteStorage, invite_id: &str, accept: bool, json: bool, actor: &str) -> Result<()> {
    let verb = if accept { "accept" } else { "decline" };
    if dry_run(json, &format!("{verb}_invite"), invite_id, &format!("{verb} invite {invite_id}")) {
        return Ok(());
    }
    let invite = storage.respond_invite(invite_id, accept, actor)?;
    if crate::is_silent() {
        println!("{}", invite.id);
    } else if json {
        print_json(&invite)?;
    } else if accept {
        let org = storage.require_organization(&invite.organization_id)?;
        println!("Joined {} as {}", org.name.bold(), invite.role.as_str());
    } else {
        println!("Declined invite {}", invite.id);
    }
    Ok(())
}

fn print_invites(invites: &[Invite], json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({ "invites": invites, "count": invites.len() }));
    }
    if invites.is_empty() {
        println!("No invites.");
        return Ok(());
    }
    for inv in invites {
        println!(
            "{} {:<32} {:<7} {:<9} by {} {}",
            inv.id.dimmed(),
            inv.email,
            inv.role.as_str(),
            inv.status.as_str(),
            inv.invited_by,
            format_short(inv.invited_at).dimmed()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::test_support::ACTOR;

    #[test]
    fn test_target_org_defaults_to_current() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let org = Organization::new("Acme".into(), ACTOR.into());
        storage.create_organization(&org, ACTOR).unwrap();

        assert_eq!(target_org(&storage, None, ACTOR).unwrap().id, org.id);
        assert_eq!(target_org(&storage, Some("acme"), ACTOR).unwrap().id, org.id);
    }

    #[test]
    fn test_target_org_without_membership() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert!(matches!(
            target_org(&storage, None, ACTOR),
            Err(Error::InvalidState(_))
        ));
    }
}

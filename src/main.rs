//! gsuite_groups CLI - manage Google Workspace groups.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gsuite_groups::{Authenticator, GroupDirectoryFacade, SettingsUpdate};

/// CLI tool for managing Google Workspace groups, settings and members.
#[derive(Parser)]
#[command(name = "gsuite_groups")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to service account JSON credentials file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials: PathBuf,

    /// Workspace admin to impersonate (domain-wide delegation).
    #[arg(long, env = "GOOGLE_ADMIN_SUBJECT")]
    admin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a group, its settings, and its members.
    Info {
        /// Group email address.
        group: String,
    },

    /// Create a group (name defaults to the email address).
    Create {
        /// Group email address.
        group: String,

        /// Allow posts from outside the domain.
        #[arg(long)]
        public: bool,
    },

    /// Apply the public-group settings preset to an existing group.
    MakePublic {
        /// Group email address.
        group: String,
    },

    /// Update individual settings fields (only changed fields are sent).
    UpdateSettings {
        /// Group email address.
        group: String,

        /// Settings as key=value pairs (e.g. whoCanJoin=INVITED_CAN_JOIN).
        #[arg(required = true)]
        settings: Vec<String>,
    },

    /// Add members to a group.
    AddMembers {
        /// Group email address.
        group: String,

        /// Member email addresses.
        #[arg(required = true)]
        members: Vec<String>,

        /// Membership role: OWNER, MANAGER or MEMBER.
        #[arg(long, default_value = "MEMBER")]
        role: String,
    },

    /// Remove members from a group.
    RemoveMembers {
        /// Group email address.
        group: String,

        /// Member email addresses.
        #[arg(required = true)]
        members: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut auth = Authenticator::from_file(&cli.credentials)
        .with_context(|| format!("Failed to load credentials from {:?}", cli.credentials))?;
    if let Some(admin) = cli.admin {
        auth = auth.with_subject(admin);
    }

    let mut facade = GroupDirectoryFacade::new(auth);

    let ok = match cli.command {
        Commands::Info { group } => {
            let info = facade.group_info(&group).await;

            match &info.group {
                Some(group) => println!("{}", group),
                None => println!("Group not found: {}", group),
            }

            if let Some(settings) = &info.settings {
                println!();
                println!(
                    "Settings ({}):",
                    if settings.is_public() { "public" } else { "internal" }
                );
                for (key, value) in &settings.0 {
                    println!("  {} = {}", key, value);
                }
            }

            if let Some(members) = &info.members {
                println!();
                println!("{:<40} {:<10} {:<8} {}", "EMAIL", "ROLE", "TYPE", "STATUS");
                println!("{}", "-".repeat(70));
                for member in members {
                    println!("{}", member);
                }
            }

            info.group.is_some()
        }

        Commands::Create { group, public } => {
            let created = facade.create_group(&group, public).await;

            match &created.group {
                Some(group) => println!("Created: {}", group),
                None => println!("Failed to create {}", group),
            }
            if let Some(settings) = &created.settings {
                println!("Public settings: {}", describe_update(settings));
            }

            created.group.is_some()
                && created.settings.as_ref().map_or(true, SettingsUpdate::succeeded)
        }

        Commands::MakePublic { group } => {
            let update = facade.update_group_to_public(&group).await;
            println!("Public settings: {}", describe_update(&update));
            update.succeeded()
        }

        Commands::UpdateSettings { group, settings } => {
            let desired = parse_settings(&settings)?;
            let update = facade.update_group_settings(&group, &desired).await;
            println!("Settings update: {}", describe_update(&update));
            update.succeeded()
        }

        Commands::AddMembers {
            group,
            members,
            role,
        } => {
            let ok = facade.add_group_members(&group, &members, &role).await;
            println!(
                "Added {} member(s) to {}{}",
                members.len(),
                group,
                if ok { "" } else { " (with errors)" }
            );
            ok
        }

        Commands::RemoveMembers { group, members } => {
            let ok = facade.remove_group_members(&group, &members).await;
            println!(
                "Removed {} member(s) from {}{}",
                members.len(),
                group,
                if ok { "" } else { " (with errors)" }
            );
            ok
        }
    };

    for event in facade.events() {
        eprintln!("{}", event);
    }

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}

fn describe_update(update: &SettingsUpdate) -> String {
    match update {
        SettingsUpdate::Applied(settings) => {
            let fields: Vec<&str> = settings.0.keys().map(String::as_str).collect();
            format!("applied ({})", fields.join(", "))
        }
        SettingsUpdate::Unchanged => "no change required".to_string(),
        SettingsUpdate::Failed => "FAILED".to_string(),
    }
}

/// Parse key=value pairs into a settings map.
fn parse_settings(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut desired = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Invalid setting (expected key=value): {}", pair))?;
        desired.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(desired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings() {
        let pairs = vec![
            "whoCanJoin=INVITED_CAN_JOIN".to_string(),
            "isArchived = true".to_string(),
        ];

        let desired = parse_settings(&pairs).unwrap();
        assert_eq!(
            desired.get("whoCanJoin").map(String::as_str),
            Some("INVITED_CAN_JOIN")
        );
        assert_eq!(desired.get("isArchived").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_parse_settings_rejects_bare_key() {
        assert!(parse_settings(&["whoCanJoin".to_string()]).is_err());
    }

    #[test]
    fn test_describe_update() {
        assert_eq!(describe_update(&SettingsUpdate::Unchanged), "no change required");
        assert_eq!(describe_update(&SettingsUpdate::Failed), "FAILED");
    }
}

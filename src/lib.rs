//! gsuite_groups - manage Google Workspace groups from the command line.
//!
//! This library wraps three Admin SDK resources behind one facade:
//! - Groups: look up and create groups
//! - Group settings: read, diff, and apply policy settings (with presets for
//!   the console defaults and for public groups)
//! - Members: list, add, and remove group members in bulk
//!
//! Expected per-item failures are recorded in the facade's event log rather
//! than returned as errors, so a batch keeps going past a bad address.
//!
//! # Example
//!
//! ```no_run
//! use gsuite_groups::{Authenticator, GroupDirectoryFacade};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::from_file("service-account.json")?
//!         .with_subject("admin@example.com");
//!     let mut facade = GroupDirectoryFacade::new(auth);
//!
//!     let info = facade.group_info("team@example.com").await;
//!     if let Some(members) = info.members {
//!         for member in members {
//!             println!("{}", member);
//!         }
//!     }
//!     for event in facade.events() {
//!         eprintln!("{}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod settings;

// Re-exports for convenience
pub use auth::Authenticator;
pub use client::{
    CreatedGroup, GroupDirectoryFacade, GroupInfo, Operation, OperationEvent, SettingsUpdate,
};
pub use error::{FailureKind, GroupsError, Result};
pub use models::{Group, Member, Role};
pub use settings::{default_group_settings, public_group_settings, GroupSettings};

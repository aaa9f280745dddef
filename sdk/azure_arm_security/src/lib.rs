//! # Azure ARM Security
//!
//! Resource-manager clients for the `Microsoft.Security` provider
//! (Microsoft Defender for Cloud).
//!
//! Every client wraps an [`ArmClient`](azure_arm_core::client::ArmClient)
//! together with the identifiers its operation paths need, formats the
//! provider's URL templates (with their `api-version` query parameters),
//! and maps JSON responses into the typed models in each module.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use azure_arm_core::auth::ArmCredential;
//! use azure_arm_core::client::ArmClient;
//! use azure_arm_security::automations::AutomationsClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let arm = ArmClient::builder()
//!         .credential(ArmCredential::from_env()?)
//!         .build()?;
//!
//!     let automations = AutomationsClient::new(arm, "my-subscription-id");
//!     let automation = automations.get("my-rg", "exportToWorkspace").await?;
//!     println!("{:?}", automation.tracked.resource.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`automations`] - Security automations (workflow automation)
//! - [`connectors`] - Cloud-account connectors
//! - [`device_security_groups`] - IoT device security groups
//! - `fake` - Fake servers for every client (feature `fake`, tests only)

pub mod automations;
pub mod connectors;
pub mod device_security_groups;

#[cfg(feature = "fake")]
pub mod fake;

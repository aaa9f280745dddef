//! # Azure ARM Kusto
//!
//! Resource-manager clients for the `Microsoft.Kusto` provider (Azure Data
//! Explorer).
//!
//! Database create and delete are long-running operations; the `begin_*`
//! methods return a [`Poller`](azure_arm_core::lro::Poller) driven by the
//! service's `Azure-AsyncOperation` monitor or the resource's
//! `provisioningState`.
//!
//! ## Modules
//!
//! - [`databases`] - Databases of a Kusto cluster
//! - `fake` - Fake server with scriptable operation statuses (feature
//!   `fake`, tests only)

pub mod databases;

#[cfg(feature = "fake")]
pub mod fake;

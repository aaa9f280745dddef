//! Databases of an Azure Data Explorer (Kusto) cluster.
//!
//! A database is either `ReadWrite` (owned by the cluster) or
//! `ReadOnlyFollowing` (following a leader cluster's database); the wire
//! format discriminates on `kind`. Create and delete are long-running
//! operations.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_arm_core::auth::ArmCredential;
//! use azure_arm_core::client::ArmClient;
//! use azure_arm_kusto::databases::{
//!     Database, DatabasesClient, ReadWriteDatabase, ReadWriteDatabaseProperties,
//! };
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let arm = ArmClient::builder()
//!     .credential(ArmCredential::from_env()?)
//!     .build()?;
//! let client = DatabasesClient::new(arm, "my-subscription-id");
//!
//! let database = Database::ReadWrite(ReadWriteDatabase {
//!     location: Some("westeurope".into()),
//!     properties: Some(ReadWriteDatabaseProperties {
//!         soft_delete_period: Some("P30D".into()),
//!         hot_cache_period: Some("P7D".into()),
//!         ..Default::default()
//!     }),
//!     ..Default::default()
//! });
//!
//! let created = client
//!     .begin_create_or_update("my-rg", "my-cluster", "telemetry", &database)
//!     .await?
//!     .wait(Duration::from_secs(5))
//!     .await?;
//!
//! println!("provisioned: {:?}", created.provisioning_state());
//! # Ok(())
//! # }
//! ```

use azure_arm_core::client::ArmClient;
use azure_arm_core::error::ArmResult;
use azure_arm_core::lro::{FinalState, Poller};
use azure_arm_core::models::Resource;
use azure_arm_core::paging::Pager;
use serde::{Deserialize, Serialize};

/// API version query parameter for all database requests.
pub(crate) const API_VERSION: &str = "api-version=2023-08-15";

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// A database of a Kusto cluster.
///
/// The wire format discriminates on `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Database {
    /// A database the cluster owns and writes to.
    ReadWrite(ReadWriteDatabase),

    /// A read-only database following a database in a leader cluster.
    ReadOnlyFollowing(ReadOnlyFollowingDatabase),
}

impl Database {
    /// The resource name, whatever the kind.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::ReadWrite(db) => db.resource.name.as_deref(),
            Self::ReadOnlyFollowing(db) => db.resource.name.as_deref(),
        }
    }

    /// The current provisioning state, whatever the kind.
    pub fn provisioning_state(&self) -> Option<&str> {
        match self {
            Self::ReadWrite(db) => db
                .properties
                .as_ref()
                .and_then(|p| p.provisioning_state.as_deref()),
            Self::ReadOnlyFollowing(db) => db
                .properties
                .as_ref()
                .and_then(|p| p.provisioning_state.as_deref()),
        }
    }
}

/// A read-write database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadWriteDatabase {
    #[serde(flatten)]
    pub resource: Resource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ReadWriteDatabaseProperties>,
}

/// Properties of a read-write database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadWriteDatabaseProperties {
    /// How long data is kept before hard deletion (ISO 8601, e.g. `P30D`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_delete_period: Option<String>,

    /// How long data stays in the cluster's hot cache (ISO 8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_cache_period: Option<String>,

    /// Server-populated provisioning state, e.g. `Creating`, `Succeeded`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,

    /// Whether any follower cluster follows this database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_followed: Option<bool>,
}

/// A read-only database following a leader cluster's database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadOnlyFollowingDatabase {
    #[serde(flatten)]
    pub resource: Resource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ReadOnlyFollowingDatabaseProperties>,
}

/// Properties of a read-only following database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOnlyFollowingDatabaseProperties {
    /// Resource id of the leader cluster.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader_cluster_resource_id: Option<String>,

    /// Name of the attached database configuration doing the following.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_database_configuration_name: Option<String>,

    /// How principals propagate from the leader: `Union`, `Replace`, `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principals_modification_kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_cache_period: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the `Microsoft.Kusto/clusters/{cluster}/databases` operation
/// group.
#[derive(Debug, Clone)]
pub struct DatabasesClient {
    client: ArmClient,
    subscription_id: String,
}

impl DatabasesClient {
    /// Create a client scoped to a subscription.
    pub fn new(client: ArmClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
        }
    }

    fn item_path(&self, resource_group: &str, cluster: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Kusto/clusters/{}/databases/{}?{}",
            self.subscription_id, resource_group, cluster, name, API_VERSION
        )
    }

    /// List the databases of a cluster.
    pub fn list_by_cluster(&self, resource_group: &str, cluster: &str) -> Pager<Database> {
        let path = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Kusto/clusters/{}/databases?{}",
            self.subscription_id, resource_group, cluster, API_VERSION
        );
        Pager::new(self.client.clone(), path)
    }

    /// Get a database.
    #[tracing::instrument(
        name = "kusto::databases::get",
        skip(self),
        fields(resource_group = %resource_group, cluster = %cluster, name = %name)
    )]
    pub async fn get(
        &self,
        resource_group: &str,
        cluster: &str,
        name: &str,
    ) -> ArmResult<Database> {
        tracing::debug!("getting database");

        let response = self
            .client
            .get(&self.item_path(resource_group, cluster, name))
            .await?;
        Ok(response.json::<Database>().await?)
    }

    /// Start creating or updating a database.
    ///
    /// Returns a poller tracking the operation; `wait` yields the final
    /// database once provisioning succeeds.
    #[tracing::instrument(
        name = "kusto::databases::begin_create_or_update",
        skip(self, database),
        fields(resource_group = %resource_group, cluster = %cluster, name = %name)
    )]
    pub async fn begin_create_or_update(
        &self,
        resource_group: &str,
        cluster: &str,
        name: &str,
        database: &Database,
    ) -> ArmResult<Poller<Database>> {
        tracing::debug!("starting database create or update");

        let path = self.item_path(resource_group, cluster, name);
        let response = self.client.put(&path, database).await?;
        Poller::from_response(self.client.clone(), &path, response, FinalState::GetResource).await
    }

    /// Start deleting a database.
    #[tracing::instrument(
        name = "kusto::databases::begin_delete",
        skip(self),
        fields(resource_group = %resource_group, cluster = %cluster, name = %name)
    )]
    pub async fn begin_delete(
        &self,
        resource_group: &str,
        cluster: &str,
        name: &str,
    ) -> ArmResult<Poller<()>> {
        tracing::debug!("starting database delete");

        let path = self.item_path(resource_group, cluster, name);
        let response = self.client.delete(&path).await?;
        Poller::from_response(self.client.clone(), &path, response, FinalState::None).await
    }
}

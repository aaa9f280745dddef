//! Cloud-account connectors for Microsoft Defender for Cloud.
//!
//! A connector onboards an external cloud account (AWS, GCP) to Defender.
//! Connectors are subscription-level resources: their paths carry no
//! resource group segment.

use azure_arm_core::client::ArmClient;
use azure_arm_core::error::ArmResult;
use azure_arm_core::models::Resource;
use azure_arm_core::paging::Pager;
use serde::{Deserialize, Serialize};

/// API version query parameter for all connector requests.
pub(crate) const API_VERSION: &str = "api-version=2020-01-01-preview";

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// A cloud-account connector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connector {
    #[serde(flatten)]
    pub resource: Resource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ConnectorProperties>,
}

/// Connector configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorProperties {
    /// Settings for onboarding the account's machines through Azure Arc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid_compute_settings: Option<HybridComputeSettings>,
}

/// Azure Arc onboarding configuration for a connected account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridComputeSettings {
    /// Whether to automatically install Azure Arc on discovered machines:
    /// `On` or `Off`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_provision: Option<String>,

    /// The resource group Arc machine resources are placed in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,

    /// The region Arc machine metadata is stored in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the `Microsoft.Security/connectors` operation group.
#[derive(Debug, Clone)]
pub struct ConnectorsClient {
    client: ArmClient,
    subscription_id: String,
}

impl ConnectorsClient {
    /// Create a client scoped to a subscription.
    pub fn new(client: ArmClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
        }
    }

    fn item_path(&self, name: &str) -> String {
        format!(
            "/subscriptions/{}/providers/Microsoft.Security/connectors/{}?{}",
            self.subscription_id, name, API_VERSION
        )
    }

    /// List the connectors of the subscription.
    pub fn list(&self) -> Pager<Connector> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.Security/connectors?{}",
            self.subscription_id, API_VERSION
        );
        Pager::new(self.client.clone(), path)
    }

    /// Get a connector.
    #[tracing::instrument(name = "security::connectors::get", skip(self), fields(name = %name))]
    pub async fn get(&self, name: &str) -> ArmResult<Connector> {
        tracing::debug!("getting connector");

        let response = self.client.get(&self.item_path(name)).await?;
        Ok(response.json::<Connector>().await?)
    }

    /// Create or update a connector.
    #[tracing::instrument(
        name = "security::connectors::create_or_update",
        skip(self, connector),
        fields(name = %name)
    )]
    pub async fn create_or_update(
        &self,
        name: &str,
        connector: &Connector,
    ) -> ArmResult<Connector> {
        tracing::debug!("creating or updating connector");

        let response = self.client.put(&self.item_path(name), connector).await?;
        Ok(response.json::<Connector>().await?)
    }

    /// Delete a connector.
    #[tracing::instrument(name = "security::connectors::delete", skip(self), fields(name = %name))]
    pub async fn delete(&self, name: &str) -> ArmResult<()> {
        tracing::debug!("deleting connector");

        self.client.delete(&self.item_path(name)).await?;
        Ok(())
    }
}

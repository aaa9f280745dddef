//! IoT device security groups for Microsoft Defender for Cloud.
//!
//! Device security groups are extension resources: they attach to an
//! arbitrary parent resource (typically an IoT Hub), so every operation
//! takes the parent's full resource id instead of a resource group and
//! name pair.

use azure_arm_core::client::ArmClient;
use azure_arm_core::error::ArmResult;
use azure_arm_core::models::Resource;
use azure_arm_core::paging::Pager;
use serde::{Deserialize, Serialize};

/// API version query parameter for all device security group requests.
pub(crate) const API_VERSION: &str = "api-version=2019-08-01";

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// A device security group attached to an IoT resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSecurityGroup {
    #[serde(flatten)]
    pub resource: Resource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<DeviceSecurityGroupProperties>,
}

/// The rule lists of a device security group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSecurityGroupProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_rules: Option<Vec<ThresholdCustomAlertRule>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window_rules: Option<Vec<TimeWindowCustomAlertRule>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowlist_rules: Option<Vec<AllowlistCustomAlertRule>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub denylist_rules: Option<Vec<DenylistCustomAlertRule>>,
}

/// Alert when a device metric leaves `[min_threshold, max_threshold]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdCustomAlertRule {
    /// The concrete rule type, e.g. `ActiveConnectionsNotInAllowedRange`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_threshold: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_threshold: Option<i64>,
}

/// A threshold rule evaluated over a sliding time window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindowCustomAlertRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_threshold: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_threshold: Option<i64>,

    /// ISO 8601 duration, e.g. `PT15M`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window_size: Option<String>,
}

/// Alert when a device value is not on the allow list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowlistCustomAlertRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowlist_values: Option<Vec<String>>,
}

/// Alert when a device value is on the deny list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenylistCustomAlertRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub denylist_values: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the `Microsoft.Security/deviceSecurityGroups` operation group.
///
/// Unlike the other clients in this crate it is not bound to a
/// subscription: the parent resource id passed to each operation already
/// carries one.
#[derive(Debug, Clone)]
pub struct DeviceSecurityGroupsClient {
    client: ArmClient,
}

impl DeviceSecurityGroupsClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    fn item_path(resource_id: &str, name: &str) -> String {
        format!(
            "{}/providers/Microsoft.Security/deviceSecurityGroups/{}?{}",
            resource_id, name, API_VERSION
        )
    }

    /// List the device security groups of a parent resource.
    ///
    /// `resource_id` is the parent's full id, e.g.
    /// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Devices/iotHubs/{hub}`.
    pub fn list(&self, resource_id: &str) -> Pager<DeviceSecurityGroup> {
        let path = format!(
            "{}/providers/Microsoft.Security/deviceSecurityGroups?{}",
            resource_id, API_VERSION
        );
        Pager::new(self.client.clone(), path)
    }

    /// Get a device security group.
    #[tracing::instrument(
        name = "security::device_security_groups::get",
        skip(self),
        fields(resource_id = %resource_id, name = %name)
    )]
    pub async fn get(&self, resource_id: &str, name: &str) -> ArmResult<DeviceSecurityGroup> {
        tracing::debug!("getting device security group");

        let response = self.client.get(&Self::item_path(resource_id, name)).await?;
        Ok(response.json::<DeviceSecurityGroup>().await?)
    }

    /// Create or update a device security group.
    #[tracing::instrument(
        name = "security::device_security_groups::create_or_update",
        skip(self, group),
        fields(resource_id = %resource_id, name = %name)
    )]
    pub async fn create_or_update(
        &self,
        resource_id: &str,
        name: &str,
        group: &DeviceSecurityGroup,
    ) -> ArmResult<DeviceSecurityGroup> {
        tracing::debug!("creating or updating device security group");

        let response = self
            .client
            .put(&Self::item_path(resource_id, name), group)
            .await?;
        Ok(response.json::<DeviceSecurityGroup>().await?)
    }

    /// Delete a device security group.
    #[tracing::instrument(
        name = "security::device_security_groups::delete",
        skip(self),
        fields(resource_id = %resource_id, name = %name)
    )]
    pub async fn delete(&self, resource_id: &str, name: &str) -> ArmResult<()> {
        tracing::debug!("deleting device security group");

        self.client
            .delete(&Self::item_path(resource_id, name))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azure_arm_core::auth::ArmCredential;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HUB_ID: &str =
        "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Devices/iotHubs/hub1";

    async fn setup_client(server: &MockServer) -> DeviceSecurityGroupsClient {
        let arm = ArmClient::builder()
            .endpoint(server.uri())
            .credential(ArmCredential::bearer_token("test-token"))
            .build()
            .expect("should build client");
        DeviceSecurityGroupsClient::new(arm)
    }

    #[test]
    fn rules_serialize_camel_case() {
        let group = DeviceSecurityGroup {
            resource: Resource::default(),
            properties: Some(DeviceSecurityGroupProperties {
                threshold_rules: None,
                time_window_rules: Some(vec![TimeWindowCustomAlertRule {
                    rule_type: Some("ActiveConnectionsNotInAllowedRange".into()),
                    is_enabled: Some(true),
                    min_threshold: Some(0),
                    max_threshold: Some(30),
                    time_window_size: Some("PT15M".into()),
                }]),
                allowlist_rules: Some(vec![AllowlistCustomAlertRule {
                    rule_type: Some("ConnectionToIpNotAllowed".into()),
                    is_enabled: Some(true),
                    allowlist_values: Some(vec!["10.0.0.0/24".into()]),
                }]),
                denylist_rules: None,
            }),
        };

        let json = serde_json::to_value(&group).unwrap();
        let rule = &json["properties"]["timeWindowRules"][0];
        assert_eq!(rule["ruleType"], "ActiveConnectionsNotInAllowedRange");
        assert_eq!(rule["timeWindowSize"], "PT15M");
        assert_eq!(
            json["properties"]["allowlistRules"][0]["allowlistValues"][0],
            "10.0.0.0/24"
        );
        assert!(json["properties"].get("thresholdRules").is_none());
    }

    #[tokio::test]
    async fn get_scopes_path_to_parent_resource() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!(
                "{HUB_ID}/providers/Microsoft.Security/deviceSecurityGroups/dsg1"
            )))
            .and(query_param("api-version", "2019-08-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "dsg1",
                "type": "Microsoft.Security/deviceSecurityGroups"
            })))
            .mount(&server)
            .await;

        let client = setup_client(&server).await;
        let group = client.get(HUB_ID, "dsg1").await.expect("should succeed");

        assert_eq!(group.resource.name.as_deref(), Some("dsg1"));
    }

    #[tokio::test]
    async fn list_walks_groups_of_a_hub() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!(
                "{HUB_ID}/providers/Microsoft.Security/deviceSecurityGroups"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{"name": "dsg1"}]
            })))
            .mount(&server)
            .await;

        let client = setup_client(&server).await;
        let page = client
            .list(HUB_ID)
            .next_page()
            .await
            .expect("a page")
            .expect("ok");

        assert_eq!(page.value.len(), 1);
    }
}

//! Security automations (workflow automation) for Microsoft Defender for Cloud.
//!
//! An automation wires security events (alerts, assessments, score changes)
//! to actions: triggering a Logic App, pushing to an Event Hub, or exporting
//! to a Log Analytics workspace. Automations are tracked resources living in
//! a resource group.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_arm_core::auth::ArmCredential;
//! use azure_arm_core::client::ArmClient;
//! use azure_arm_security::automations::{
//!     Automation, AutomationAction, AutomationProperties, AutomationScope,
//!     AutomationsClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let arm = ArmClient::builder()
//!     .credential(ArmCredential::from_env()?)
//!     .build()?;
//! let client = AutomationsClient::new(arm, "my-subscription-id");
//!
//! let mut automation = Automation::default();
//! automation.tracked.location = Some("westeurope".into());
//! automation.properties = Some(AutomationProperties {
//!     description: Some("export alerts".into()),
//!     is_enabled: Some(true),
//!     scopes: Some(vec![AutomationScope {
//!         description: None,
//!         scope_path: Some("/subscriptions/my-subscription-id".into()),
//!     }]),
//!     sources: None,
//!     actions: Some(vec![AutomationAction::Workspace {
//!         workspace_resource_id: Some("/subscriptions/.../workspaces/w1".into()),
//!     }]),
//! });
//!
//! let created = client.create_or_update("my-rg", "exportAlerts", &automation).await?;
//! println!("created {:?}", created.tracked.resource.id);
//! # Ok(())
//! # }
//! ```

use azure_arm_core::client::ArmClient;
use azure_arm_core::error::ArmResult;
use azure_arm_core::models::TrackedResource;
use azure_arm_core::paging::Pager;
use serde::{Deserialize, Serialize};

/// API version query parameter for all automation requests.
pub(crate) const API_VERSION: &str = "api-version=2023-12-01-preview";

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// A security automation resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Automation {
    #[serde(flatten)]
    pub tracked: TrackedResource,

    /// Entity tag used for optimistic concurrency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<AutomationProperties>,
}

/// The configurable part of an automation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the automation is active. Disabled automations keep their
    /// configuration but trigger nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,

    /// The scopes (subscription or resource group paths) the automation
    /// listens on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<AutomationScope>>,

    /// The event sources that trigger the automation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<AutomationSource>>,

    /// The actions executed when a source event passes its rule sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<AutomationAction>>,
}

/// A single scope the automation applies to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationScope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The resource path of the scope, e.g. `/subscriptions/{id}` or
    /// `/subscriptions/{id}/resourceGroups/{name}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_path: Option<String>,
}

/// An event source with optional filtering rule sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSource {
    /// The kind of event, e.g. `Alerts`, `Assessments`, `SecureScores`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_source: Option<String>,

    /// Rule sets are OR-ed; rules within a set are AND-ed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_sets: Option<Vec<AutomationRuleSet>>,
}

/// A conjunction of triggering rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutomationRuleSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<AutomationTriggeringRule>>,
}

/// A single comparison applied to the event payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationTriggeringRule {
    /// JPath of the inspected property, e.g. `properties.metadata.severity`.
    #[serde(rename = "propertyJPath", skip_serializing_if = "Option::is_none")]
    pub property_j_path: Option<String>,

    /// The property type: `String`, `Integer`, `Number`, or `Boolean`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<String>,

    /// The comparison operator, e.g. `Equals`, `Contains`, `GreaterThan`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

/// The action executed when an automation triggers.
///
/// The wire format discriminates on `actionType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "actionType")]
pub enum AutomationAction {
    /// Trigger a Logic App.
    #[serde(rename_all = "camelCase")]
    LogicApp {
        #[serde(skip_serializing_if = "Option::is_none")]
        logic_app_resource_id: Option<String>,

        /// The trigger URI of the Logic App. Write-only; reads return it
        /// empty.
        #[serde(skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
    },

    /// Publish the event to an Event Hub.
    #[serde(rename_all = "camelCase")]
    EventHub {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_hub_resource_id: Option<String>,

        /// SAS connection string. Write-only; reads return it empty.
        #[serde(skip_serializing_if = "Option::is_none")]
        connection_string: Option<String>,
    },

    /// Export the event to a Log Analytics workspace.
    #[serde(rename_all = "camelCase")]
    Workspace {
        #[serde(skip_serializing_if = "Option::is_none")]
        workspace_resource_id: Option<String>,
    },
}

/// The result of validating an automation model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationValidationStatus {
    pub is_valid: Option<bool>,
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the `Microsoft.Security/automations` operation group.
#[derive(Debug, Clone)]
pub struct AutomationsClient {
    client: ArmClient,
    subscription_id: String,
}

impl AutomationsClient {
    /// Create a client scoped to a subscription.
    pub fn new(client: ArmClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
        }
    }

    fn item_path(&self, resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Security/automations/{}?{}",
            self.subscription_id, resource_group, name, API_VERSION
        )
    }

    /// List every automation in the subscription.
    pub fn list(&self) -> Pager<Automation> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.Security/automations?{}",
            self.subscription_id, API_VERSION
        );
        Pager::new(self.client.clone(), path)
    }

    /// List the automations in a resource group.
    pub fn list_by_resource_group(&self, resource_group: &str) -> Pager<Automation> {
        let path = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Security/automations?{}",
            self.subscription_id, resource_group, API_VERSION
        );
        Pager::new(self.client.clone(), path)
    }

    /// Get an automation.
    #[tracing::instrument(
        name = "security::automations::get",
        skip(self),
        fields(resource_group = %resource_group, name = %name)
    )]
    pub async fn get(&self, resource_group: &str, name: &str) -> ArmResult<Automation> {
        tracing::debug!("getting automation");

        let response = self.client.get(&self.item_path(resource_group, name)).await?;
        Ok(response.json::<Automation>().await?)
    }

    /// Create or update an automation.
    #[tracing::instrument(
        name = "security::automations::create_or_update",
        skip(self, automation),
        fields(resource_group = %resource_group, name = %name)
    )]
    pub async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        automation: &Automation,
    ) -> ArmResult<Automation> {
        tracing::debug!("creating or updating automation");

        let response = self
            .client
            .put(&self.item_path(resource_group, name), automation)
            .await?;
        let automation = response.json::<Automation>().await?;

        tracing::debug!(id = ?automation.tracked.resource.id, "automation written");
        Ok(automation)
    }

    /// Delete an automation.
    ///
    /// Deleting an automation that does not exist is not an error (the
    /// service answers 204).
    #[tracing::instrument(
        name = "security::automations::delete",
        skip(self),
        fields(resource_group = %resource_group, name = %name)
    )]
    pub async fn delete(&self, resource_group: &str, name: &str) -> ArmResult<()> {
        tracing::debug!("deleting automation");

        self.client
            .delete(&self.item_path(resource_group, name))
            .await?;
        Ok(())
    }

    /// Validate an automation model without persisting it.
    #[tracing::instrument(
        name = "security::automations::validate",
        skip(self, automation),
        fields(resource_group = %resource_group, name = %name)
    )]
    pub async fn validate(
        &self,
        resource_group: &str,
        name: &str,
        automation: &Automation,
    ) -> ArmResult<AutomationValidationStatus> {
        tracing::debug!("validating automation");

        let path = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Security/automations/{}/validate?{}",
            self.subscription_id, resource_group, name, API_VERSION
        );
        let response = self.client.post(&path, automation).await?;
        Ok(response.json::<AutomationValidationStatus>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azure_arm_core::auth::ArmCredential;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_SUBSCRIPTION: &str = "11111111-2222-3333-4444-555555555555";

    async fn setup_client(server: &MockServer) -> AutomationsClient {
        let arm = ArmClient::builder()
            .endpoint(server.uri())
            .credential(ArmCredential::bearer_token("test-token"))
            .build()
            .expect("should build client");
        AutomationsClient::new(arm, TEST_SUBSCRIPTION)
    }

    fn sample_automation() -> Automation {
        let mut automation = Automation::default();
        automation.tracked.location = Some("westeurope".into());
        automation.properties = Some(AutomationProperties {
            description: Some("export high severity alerts".into()),
            is_enabled: Some(true),
            scopes: Some(vec![AutomationScope {
                description: None,
                scope_path: Some(format!("/subscriptions/{TEST_SUBSCRIPTION}")),
            }]),
            sources: Some(vec![AutomationSource {
                event_source: Some("Alerts".into()),
                rule_sets: Some(vec![AutomationRuleSet {
                    rules: Some(vec![AutomationTriggeringRule {
                        property_j_path: Some("Severity".into()),
                        property_type: Some("String".into()),
                        expected_value: Some("High".into()),
                        operator: Some("Equals".into()),
                    }]),
                }]),
            }]),
            actions: Some(vec![AutomationAction::Workspace {
                workspace_resource_id: Some("/subscriptions/s/rg/w".into()),
            }]),
        });
        automation
    }

    // --- Model serialization ---

    #[test]
    fn action_discriminator_serializes_action_type() {
        let action = AutomationAction::LogicApp {
            logic_app_resource_id: Some("/subscriptions/s/rg/logicApp".into()),
            uri: Some("https://trigger.example".into()),
        };

        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["actionType"], "LogicApp");
        assert_eq!(json["logicAppResourceId"], "/subscriptions/s/rg/logicApp");
        assert_eq!(json["uri"], "https://trigger.example");
    }

    #[test]
    fn action_discriminator_deserializes_each_kind() {
        let logic_app: AutomationAction = serde_json::from_value(serde_json::json!({
            "actionType": "LogicApp",
            "logicAppResourceId": "/s/la"
        }))
        .unwrap();
        assert!(matches!(logic_app, AutomationAction::LogicApp { .. }));

        let event_hub: AutomationAction = serde_json::from_value(serde_json::json!({
            "actionType": "EventHub",
            "eventHubResourceId": "/s/eh"
        }))
        .unwrap();
        assert!(matches!(event_hub, AutomationAction::EventHub { .. }));

        let workspace: AutomationAction = serde_json::from_value(serde_json::json!({
            "actionType": "Workspace",
            "workspaceResourceId": "/s/w"
        }))
        .unwrap();
        match workspace {
            AutomationAction::Workspace {
                workspace_resource_id,
            } => assert_eq!(workspace_resource_id.as_deref(), Some("/s/w")),
            other => panic!("expected Workspace, got {other:?}"),
        }
    }

    #[test]
    fn unknown_action_type_is_rejected() {
        let result: Result<AutomationAction, _> = serde_json::from_value(serde_json::json!({
            "actionType": "Pager",
            "pagerId": "x"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn automation_serializes_camel_case_properties() {
        let json = serde_json::to_value(sample_automation()).unwrap();

        assert_eq!(json["location"], "westeurope");
        assert_eq!(json["properties"]["isEnabled"], true);
        assert_eq!(
            json["properties"]["sources"][0]["eventSource"],
            "Alerts"
        );
        assert_eq!(
            json["properties"]["sources"][0]["ruleSets"][0]["rules"][0]["propertyJPath"],
            "Severity"
        );
        // Nothing unset leaks into the body.
        assert!(json.get("etag").is_none());
        assert!(json["properties"].get("description").is_some());
    }

    #[test]
    fn automation_deserializes_server_envelope() {
        let automation: Automation = serde_json::from_value(serde_json::json!({
            "id": format!("/subscriptions/{TEST_SUBSCRIPTION}/resourceGroups/rg1/providers/Microsoft.Security/automations/a1"),
            "name": "a1",
            "type": "Microsoft.Security/automations",
            "location": "westeurope",
            "tags": {"owner": "secops"},
            "properties": {"isEnabled": false}
        }))
        .unwrap();

        assert_eq!(automation.tracked.resource.name.as_deref(), Some("a1"));
        assert_eq!(
            automation.properties.unwrap().is_enabled,
            Some(false)
        );
    }

    // --- Operations ---

    #[tokio::test]
    async fn get_automation() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!(
                "/subscriptions/{TEST_SUBSCRIPTION}/resourceGroups/rg1/providers/Microsoft.Security/automations/a1"
            )))
            .and(query_param("api-version", "2023-12-01-preview"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "a1",
                "location": "westeurope"
            })))
            .mount(&server)
            .await;

        let client = setup_client(&server).await;
        let automation = client.get("rg1", "a1").await.expect("should succeed");

        assert_eq!(automation.tracked.resource.name.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn create_or_update_sends_model_as_body() {
        let server = MockServer::start().await;
        let automation = sample_automation();

        Mock::given(method("PUT"))
            .and(path(format!(
                "/subscriptions/{TEST_SUBSCRIPTION}/resourceGroups/rg1/providers/Microsoft.Security/automations/a1"
            )))
            .and(body_json(serde_json::to_value(&automation).unwrap()))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "/subscriptions/s/rg1/a1",
                "name": "a1",
                "location": "westeurope",
                "properties": {"isEnabled": true}
            })))
            .mount(&server)
            .await;

        let client = setup_client(&server).await;
        let created = client
            .create_or_update("rg1", "a1", &automation)
            .await
            .expect("should succeed");

        assert_eq!(created.tracked.resource.name.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn delete_automation() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path(format!(
                "/subscriptions/{TEST_SUBSCRIPTION}/resourceGroups/rg1/providers/Microsoft.Security/automations/a1"
            )))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = setup_client(&server).await;
        client.delete("rg1", "a1").await.expect("should succeed");
    }

    #[tokio::test]
    async fn validate_posts_to_validate_subpath() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!(
                "/subscriptions/{TEST_SUBSCRIPTION}/resourceGroups/rg1/providers/Microsoft.Security/automations/a1/validate"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "isValid": true,
                "message": "Validation Successful"
            })))
            .mount(&server)
            .await;

        let client = setup_client(&server).await;
        let status = client
            .validate("rg1", "a1", &sample_automation())
            .await
            .expect("should succeed");

        assert_eq!(status.is_valid, Some(true));
    }

    #[tokio::test]
    async fn list_walks_a_single_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!(
                "/subscriptions/{TEST_SUBSCRIPTION}/providers/Microsoft.Security/automations"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    {"name": "a1", "location": "westeurope"},
                    {"name": "a2", "location": "eastus"}
                ]
            })))
            .mount(&server)
            .await;

        let client = setup_client(&server).await;
        let mut pager = client.list();

        let page = pager.next_page().await.expect("a page").expect("ok");
        assert_eq!(page.value.len(), 2);
        assert_eq!(page.value[1].tracked.resource.name.as_deref(), Some("a2"));
        assert!(pager.next_page().await.is_none());
    }
}

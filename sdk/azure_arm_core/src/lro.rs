//! Long-running operations against Azure Resource Manager.
//!
//! ARM acknowledges a long-running PUT or DELETE with 200, 201, or 202 and
//! conveys progress one of two ways:
//!
//! - an `Azure-AsyncOperation` header pointing at a status monitor that
//!   returns `{"status": "...", "error": {...}}`, or
//! - a `provisioningState` inside the resource body, re-read by polling the
//!   resource URL itself.
//!
//! [`Poller`] picks the right mode from the initial response and loops until
//! a terminal state. State names are compared case-insensitively, matching
//! the service's behavior.
//!
//! # Examples
//!
//! ```rust,no_run
//! use azure_arm_core::client::ArmClient;
//! use azure_arm_core::lro::{FinalState, Poller};
//! use std::time::Duration;
//! # use serde::Deserialize;
//! # #[derive(Deserialize)]
//! # struct Database { name: Option<String> }
//!
//! # async fn example(client: ArmClient) -> Result<(), Box<dyn std::error::Error>> {
//! let path = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Kusto/clusters/c1/databases/db1?api-version=2023-08-15";
//! let body = serde_json::json!({"kind": "ReadWrite", "location": "westeurope"});
//!
//! let response = client.put(path, &body).await?;
//! let poller: Poller<Database> =
//!     Poller::from_response(client, path, response, FinalState::GetResource).await?;
//!
//! let database = poller.wait(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

use crate::client::ArmClient;
use crate::error::{ArmError, ArmResult};
use crate::models::ErrorDetail;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;
use std::time::Duration;

/// The state of a long-running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    /// The operation has not reached a terminal state yet.
    InProgress,
    /// The operation completed successfully.
    Succeeded,
    /// The operation failed.
    Failed,
    /// The operation was canceled.
    Canceled,
    /// A provider-specific state (e.g. `Creating`, `Deleting`). Not terminal.
    Other(String),
}

impl OperationStatus {
    /// Parse a state name, case-insensitively.
    pub fn parse(state: &str) -> Self {
        if state.eq_ignore_ascii_case("InProgress") || state.eq_ignore_ascii_case("Running") {
            Self::InProgress
        } else if state.eq_ignore_ascii_case("Succeeded") {
            Self::Succeeded
        } else if state.eq_ignore_ascii_case("Failed") {
            Self::Failed
        } else if state.eq_ignore_ascii_case("Canceled") || state.eq_ignore_ascii_case("Cancelled")
        {
            Self::Canceled
        } else {
            Self::Other(state.to_string())
        }
    }

    /// Whether this state ends the operation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "InProgress",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
            Self::Other(s) => s,
        }
    }
}

/// How the poller produces the final value once the operation succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalState {
    /// GET the resource URL and deserialize the body (create/update).
    GetResource,
    /// No final body; the result deserializes from `null` (delete).
    None,
}

/// The response body of an `Azure-AsyncOperation` status monitor.
#[derive(Debug, Deserialize)]
struct StatusMonitor {
    status: String,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug)]
enum Monitor {
    /// Poll the absolute URL from the `Azure-AsyncOperation` header.
    AsyncOperation(String),
    /// Re-read the resource and inspect `properties.provisioningState`.
    ProvisioningState,
}

/// Polls a long-running operation to completion.
#[derive(Debug)]
pub struct Poller<T> {
    client: ArmClient,
    resource_url: url::Url,
    monitor: Monitor,
    status: OperationStatus,
    monitor_error: Option<ErrorDetail>,
    final_state: FinalState,
    _result: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Poller<T> {
    /// Build a poller from the initial response of a long-running operation.
    ///
    /// `resource_path` is the operation path the request was sent to,
    /// including its `api-version`; the poller re-reads it for
    /// `provisioningState` polling and for the final GET.
    pub async fn from_response(
        client: ArmClient,
        resource_path: &str,
        response: reqwest::Response,
        final_state: FinalState,
    ) -> ArmResult<Self> {
        let resource_url = client.url(resource_path)?;

        let async_operation = response
            .headers()
            .get("azure-asyncoperation")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let status_code = response.status().as_u16();
        let body = response.bytes().await?;
        let body: Option<serde_json::Value> = serde_json::from_slice(&body).ok();

        let (monitor, status) = match async_operation {
            Some(url) => {
                // The monitor owns the status from here on.
                (Monitor::AsyncOperation(url), OperationStatus::InProgress)
            }
            None => {
                let status = match body.as_ref().and_then(provisioning_state) {
                    Some(state) => OperationStatus::parse(state),
                    // 202 without a monitor header still means "working on
                    // it"; a 200/201 body with no provisioningState is done.
                    None if status_code == 202 => OperationStatus::InProgress,
                    None => OperationStatus::Succeeded,
                };
                (Monitor::ProvisioningState, status)
            }
        };

        tracing::debug!(initial_status = status.as_str(), "started poller");

        Ok(Self {
            client,
            resource_url,
            monitor,
            status,
            monitor_error: None,
            final_state,
            _result: PhantomData,
        })
    }

    /// The most recently observed operation state.
    pub fn status(&self) -> &OperationStatus {
        &self.status
    }

    /// Probe the operation once and update the observed state.
    ///
    /// Calling `poll` after a terminal state is a no-op.
    pub async fn poll(&mut self) -> ArmResult<&OperationStatus> {
        if self.status.is_terminal() {
            return Ok(&self.status);
        }

        match &self.monitor {
            Monitor::AsyncOperation(url) => {
                let response = self.client.get_absolute(url).await?;
                let monitor = response.json::<StatusMonitor>().await?;
                self.status = OperationStatus::parse(&monitor.status);
                self.monitor_error = monitor.error;
            }
            Monitor::ProvisioningState => {
                let response = self.client.get_absolute(self.resource_url.as_str()).await?;
                let body = response.json::<serde_json::Value>().await?;
                self.status = match provisioning_state(&body) {
                    Some(state) => OperationStatus::parse(state),
                    None => OperationStatus::Succeeded,
                };
            }
        }

        tracing::trace!(status = self.status.as_str(), "polled operation");
        Ok(&self.status)
    }

    /// Poll until the operation reaches a terminal state, then produce the
    /// final result.
    ///
    /// On `Succeeded`, the result is either the re-fetched resource or the
    /// unit value, per [`FinalState`]. `Failed` and `Canceled` become
    /// [`ArmError::Operation`], carrying the status monitor's error detail
    /// when the service provided one.
    pub async fn wait(mut self, interval: Duration) -> ArmResult<T> {
        while !self.status.is_terminal() {
            tokio::time::sleep(interval).await;
            self.poll().await?;
        }

        match &self.status {
            OperationStatus::Succeeded => self.finalize().await,
            status => {
                let (code, message) = match self.monitor_error {
                    Some(detail) => (detail.code, detail.message),
                    None => (
                        "OperationFailed".to_string(),
                        format!("the operation reached the {} state", status.as_str()),
                    ),
                };
                Err(ArmError::Operation {
                    status: status.as_str().to_string(),
                    code,
                    message,
                })
            }
        }
    }

    async fn finalize(self) -> ArmResult<T> {
        match self.final_state {
            FinalState::GetResource => {
                let response = self.client.get_absolute(self.resource_url.as_str()).await?;
                Ok(response.json::<T>().await?)
            }
            FinalState::None => Ok(serde_json::from_value(serde_json::Value::Null)?),
        }
    }
}

fn provisioning_state(body: &serde_json::Value) -> Option<&str> {
    body.get("properties")?.get("provisioningState")?.as_str()
}

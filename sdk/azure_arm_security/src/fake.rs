//! Fake servers for the `Microsoft.Security` clients.
//!
//! Each server is a table of optional handler functions, one per operation
//! of the paired client. [`AutomationsServer::serve`] (and friends) mounts
//! the table on an in-process mock server; requests are dispatched by
//! regex-matching the same URL templates the client formats, so a test
//! exercises the full pipeline: URL building, authentication headers,
//! serialization, status handling, paging.
//!
//! Operations without a wired handler answer 500 `NotImplemented`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use azure_arm_core::fake::FakeError;
//! use azure_arm_security::fake::AutomationsServer;
//!
//! let server = AutomationsServer::new()
//!     .with_get(|rg, name| {
//!         if name == "exportAlerts" {
//!             Ok(sample_automation())
//!         } else {
//!             Err(FakeError::not_found(format!("{rg}/{name}")))
//!         }
//!     })
//!     .serve()
//!     .await;
//!
//! // point an ArmClient at server.uri() ...
//! ```

use std::sync::Arc;

use azure_arm_core::fake::{
    not_implemented, page_response, result_response, FakeResponse, FakeResult, FakeRouter,
    MockServer,
};
use azure_arm_core::paging::Page;

use crate::automations::{Automation, AutomationValidationStatus};
use crate::connectors::Connector;
use crate::device_security_groups::DeviceSecurityGroup;

// ---------------------------------------------------------------------------
// Automations
// ---------------------------------------------------------------------------

const AUTOMATION_ITEM: &str =
    r"^/subscriptions/([^/]+)/resourceGroups/([^/]+)/providers/Microsoft\.Security/automations/([^/]+)$";
const AUTOMATION_VALIDATE: &str =
    r"^/subscriptions/([^/]+)/resourceGroups/([^/]+)/providers/Microsoft\.Security/automations/([^/]+)/validate$";
const AUTOMATION_LIST: &str =
    r"^/subscriptions/([^/]+)/providers/Microsoft\.Security/automations$";
const AUTOMATION_LIST_BY_RG: &str =
    r"^/subscriptions/([^/]+)/resourceGroups/([^/]+)/providers/Microsoft\.Security/automations$";

/// Fake server for [`AutomationsClient`](crate::automations::AutomationsClient).
///
/// List handlers receive the `$skipToken` continuation (if any) and return
/// a [`Page`]; setting the page's `next_link` to an opaque token produces a
/// real `nextLink` URL in the response.
#[derive(Default, Clone)]
pub struct AutomationsServer {
    get: Option<Arc<dyn Fn(&str, &str) -> FakeResult<Automation> + Send + Sync>>,
    create_or_update: Option<Arc<dyn Fn(&str, &str, Automation) -> FakeResult<Automation> + Send + Sync>>,
    delete: Option<Arc<dyn Fn(&str, &str) -> FakeResult<()> + Send + Sync>>,
    validate: Option<Arc<dyn Fn(&str, &str, Automation) -> FakeResult<AutomationValidationStatus> + Send + Sync>>,
    list: Option<Arc<dyn Fn(Option<&str>) -> FakeResult<Page<Automation>> + Send + Sync>>,
    list_by_resource_group: Option<Arc<dyn Fn(&str, Option<&str>) -> FakeResult<Page<Automation>> + Send + Sync>>,
}

impl AutomationsServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler for `get(resource_group, name)`.
    pub fn with_get(
        mut self,
        handler: impl Fn(&str, &str) -> FakeResult<Automation> + Send + Sync + 'static,
    ) -> Self {
        self.get = Some(Arc::new(handler));
        self
    }

    /// Handler for `create_or_update(resource_group, name, automation)`.
    pub fn with_create_or_update(
        mut self,
        handler: impl Fn(&str, &str, Automation) -> FakeResult<Automation> + Send + Sync + 'static,
    ) -> Self {
        self.create_or_update = Some(Arc::new(handler));
        self
    }

    /// Handler for `delete(resource_group, name)`.
    pub fn with_delete(
        mut self,
        handler: impl Fn(&str, &str) -> FakeResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.delete = Some(Arc::new(handler));
        self
    }

    /// Handler for `validate(resource_group, name, automation)`.
    pub fn with_validate(
        mut self,
        handler: impl Fn(&str, &str, Automation) -> FakeResult<AutomationValidationStatus>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.validate = Some(Arc::new(handler));
        self
    }

    /// Handler for the subscription-level `list()`; receives the
    /// `$skipToken` continuation.
    pub fn with_list(
        mut self,
        handler: impl Fn(Option<&str>) -> FakeResult<Page<Automation>> + Send + Sync + 'static,
    ) -> Self {
        self.list = Some(Arc::new(handler));
        self
    }

    /// Handler for `list_by_resource_group(resource_group)`.
    pub fn with_list_by_resource_group(
        mut self,
        handler: impl Fn(&str, Option<&str>) -> FakeResult<Page<Automation>> + Send + Sync + 'static,
    ) -> Self {
        self.list_by_resource_group = Some(Arc::new(handler));
        self
    }

    /// Compile the handler table into a route table.
    pub fn into_router(self) -> FakeRouter {
        let mut router = FakeRouter::new();

        // Validate first: its path is a superset of the item path.
        let validate = self.validate;
        router = router.route("POST", AUTOMATION_VALIDATE, move |req| match &validate {
            Some(handler) => match req.body_json::<Automation>() {
                Ok(automation) => {
                    result_response(200, handler(req.capture(1), req.capture(2), automation))
                }
                Err(e) => FakeResponse::error(400, "InvalidRequestFormat", e.to_string()),
            },
            None => not_implemented("AutomationsServer::validate"),
        });

        let get = self.get;
        router = router.route("GET", AUTOMATION_ITEM, move |req| match &get {
            Some(handler) => result_response(200, handler(req.capture(1), req.capture(2))),
            None => not_implemented("AutomationsServer::get"),
        });

        let create_or_update = self.create_or_update;
        router = router.route("PUT", AUTOMATION_ITEM, move |req| {
            match &create_or_update {
                Some(handler) => match req.body_json::<Automation>() {
                    Ok(automation) => {
                        result_response(200, handler(req.capture(1), req.capture(2), automation))
                    }
                    Err(e) => FakeResponse::error(400, "InvalidRequestFormat", e.to_string()),
                },
                None => not_implemented("AutomationsServer::create_or_update"),
            }
        });

        let delete = self.delete;
        router = router.route("DELETE", AUTOMATION_ITEM, move |req| match &delete {
            Some(handler) => match handler(req.capture(1), req.capture(2)) {
                Ok(()) => FakeResponse::empty(204),
                Err(e) => e.into(),
            },
            None => not_implemented("AutomationsServer::delete"),
        });

        let list = self.list;
        router = router.route("GET", AUTOMATION_LIST, move |req| match &list {
            Some(handler) => {
                let skip = req.query("$skipToken");
                page_response(req, handler(skip.as_deref()))
            }
            None => not_implemented("AutomationsServer::list"),
        });

        let list_by_rg = self.list_by_resource_group;
        router = router.route("GET", AUTOMATION_LIST_BY_RG, move |req| match &list_by_rg {
            Some(handler) => {
                let skip = req.query("$skipToken");
                page_response(req, handler(req.capture(1), skip.as_deref()))
            }
            None => not_implemented("AutomationsServer::list_by_resource_group"),
        });

        router
    }

    /// Mount the table on a fresh mock server.
    pub async fn serve(self) -> MockServer {
        azure_arm_core::fake::serve(self.into_router()).await
    }
}

// ---------------------------------------------------------------------------
// Connectors
// ---------------------------------------------------------------------------

const CONNECTOR_ITEM: &str =
    r"^/subscriptions/([^/]+)/providers/Microsoft\.Security/connectors/([^/]+)$";
const CONNECTOR_LIST: &str = r"^/subscriptions/([^/]+)/providers/Microsoft\.Security/connectors$";

/// Fake server for [`ConnectorsClient`](crate::connectors::ConnectorsClient).
#[derive(Default, Clone)]
pub struct ConnectorsServer {
    get: Option<Arc<dyn Fn(&str) -> FakeResult<Connector> + Send + Sync>>,
    create_or_update: Option<Arc<dyn Fn(&str, Connector) -> FakeResult<Connector> + Send + Sync>>,
    delete: Option<Arc<dyn Fn(&str) -> FakeResult<()> + Send + Sync>>,
    list: Option<Arc<dyn Fn(Option<&str>) -> FakeResult<Page<Connector>> + Send + Sync>>,
}

impl ConnectorsServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_get(
        mut self,
        handler: impl Fn(&str) -> FakeResult<Connector> + Send + Sync + 'static,
    ) -> Self {
        self.get = Some(Arc::new(handler));
        self
    }

    pub fn with_create_or_update(
        mut self,
        handler: impl Fn(&str, Connector) -> FakeResult<Connector> + Send + Sync + 'static,
    ) -> Self {
        self.create_or_update = Some(Arc::new(handler));
        self
    }

    pub fn with_delete(
        mut self,
        handler: impl Fn(&str) -> FakeResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.delete = Some(Arc::new(handler));
        self
    }

    pub fn with_list(
        mut self,
        handler: impl Fn(Option<&str>) -> FakeResult<Page<Connector>> + Send + Sync + 'static,
    ) -> Self {
        self.list = Some(Arc::new(handler));
        self
    }

    pub fn into_router(self) -> FakeRouter {
        let mut router = FakeRouter::new();

        let get = self.get;
        router = router.route("GET", CONNECTOR_ITEM, move |req| match &get {
            Some(handler) => result_response(200, handler(req.capture(1))),
            None => not_implemented("ConnectorsServer::get"),
        });

        let create_or_update = self.create_or_update;
        router = router.route("PUT", CONNECTOR_ITEM, move |req| match &create_or_update {
            Some(handler) => match req.body_json::<Connector>() {
                Ok(connector) => result_response(200, handler(req.capture(1), connector)),
                Err(e) => FakeResponse::error(400, "InvalidRequestFormat", e.to_string()),
            },
            None => not_implemented("ConnectorsServer::create_or_update"),
        });

        let delete = self.delete;
        router = router.route("DELETE", CONNECTOR_ITEM, move |req| match &delete {
            Some(handler) => match handler(req.capture(1)) {
                Ok(()) => FakeResponse::empty(204),
                Err(e) => e.into(),
            },
            None => not_implemented("ConnectorsServer::delete"),
        });

        let list = self.list;
        router = router.route("GET", CONNECTOR_LIST, move |req| match &list {
            Some(handler) => {
                let skip = req.query("$skipToken");
                page_response(req, handler(skip.as_deref()))
            }
            None => not_implemented("ConnectorsServer::list"),
        });

        router
    }

    pub async fn serve(self) -> MockServer {
        azure_arm_core::fake::serve(self.into_router()).await
    }
}

// ---------------------------------------------------------------------------
// Device security groups
// ---------------------------------------------------------------------------

const DSG_ITEM: &str = r"^(.+)/providers/Microsoft\.Security/deviceSecurityGroups/([^/]+)$";
const DSG_LIST: &str = r"^(.+)/providers/Microsoft\.Security/deviceSecurityGroups$";

/// Fake server for
/// [`DeviceSecurityGroupsClient`](crate::device_security_groups::DeviceSecurityGroupsClient).
///
/// Handlers receive the parent resource id exactly as it appeared in the
/// request path.
#[derive(Default, Clone)]
pub struct DeviceSecurityGroupsServer {
    get: Option<Arc<dyn Fn(&str, &str) -> FakeResult<DeviceSecurityGroup> + Send + Sync>>,
    create_or_update:
        Option<Arc<dyn Fn(&str, &str, DeviceSecurityGroup) -> FakeResult<DeviceSecurityGroup> + Send + Sync>>,
    delete: Option<Arc<dyn Fn(&str, &str) -> FakeResult<()> + Send + Sync>>,
    list: Option<Arc<dyn Fn(&str, Option<&str>) -> FakeResult<Page<DeviceSecurityGroup>> + Send + Sync>>,
}

impl DeviceSecurityGroupsServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_get(
        mut self,
        handler: impl Fn(&str, &str) -> FakeResult<DeviceSecurityGroup> + Send + Sync + 'static,
    ) -> Self {
        self.get = Some(Arc::new(handler));
        self
    }

    pub fn with_create_or_update(
        mut self,
        handler: impl Fn(&str, &str, DeviceSecurityGroup) -> FakeResult<DeviceSecurityGroup>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.create_or_update = Some(Arc::new(handler));
        self
    }

    pub fn with_delete(
        mut self,
        handler: impl Fn(&str, &str) -> FakeResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.delete = Some(Arc::new(handler));
        self
    }

    pub fn with_list(
        mut self,
        handler: impl Fn(&str, Option<&str>) -> FakeResult<Page<DeviceSecurityGroup>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.list = Some(Arc::new(handler));
        self
    }

    pub fn into_router(self) -> FakeRouter {
        let mut router = FakeRouter::new();

        let get = self.get;
        router = router.route("GET", DSG_ITEM, move |req| match &get {
            Some(handler) => result_response(200, handler(req.capture(0), req.capture(1))),
            None => not_implemented("DeviceSecurityGroupsServer::get"),
        });

        let create_or_update = self.create_or_update;
        router = router.route("PUT", DSG_ITEM, move |req| match &create_or_update {
            Some(handler) => match req.body_json::<DeviceSecurityGroup>() {
                Ok(group) => result_response(200, handler(req.capture(0), req.capture(1), group)),
                Err(e) => FakeResponse::error(400, "InvalidRequestFormat", e.to_string()),
            },
            None => not_implemented("DeviceSecurityGroupsServer::create_or_update"),
        });

        let delete = self.delete;
        router = router.route("DELETE", DSG_ITEM, move |req| match &delete {
            Some(handler) => match handler(req.capture(0), req.capture(1)) {
                Ok(()) => FakeResponse::empty(204),
                Err(e) => e.into(),
            },
            None => not_implemented("DeviceSecurityGroupsServer::delete"),
        });

        let list = self.list;
        router = router.route("GET", DSG_LIST, move |req| match &list {
            Some(handler) => {
                let skip = req.query("$skipToken");
                page_response(req, handler(req.capture(0), skip.as_deref()))
            }
            None => not_implemented("DeviceSecurityGroupsServer::list"),
        });

        router
    }

    pub async fn serve(self) -> MockServer {
        azure_arm_core::fake::serve(self.into_router()).await
    }
}

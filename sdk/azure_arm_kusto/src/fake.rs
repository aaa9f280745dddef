//! Fake server for the `Microsoft.Kusto` databases client.
//!
//! Like the other fakes, [`DatabasesServer`] is a table of optional
//! per-operation handlers dispatched by regex-matching the client's URL
//! templates. The long-running `begin_*` operations are acknowledged with
//! 202 and an `Azure-AsyncOperation` URL served by the same router; the
//! sequence of statuses that monitor reports is scriptable via
//! [`DatabasesServer::with_operation_statuses`], so tests can march a
//! poller through `InProgress` to a terminal state deterministically.
//!
//! The poller's final GET goes through the `get` handler: a create test
//! wires both `create_or_update` and `get`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use azure_arm_core::fake::{
    not_implemented, page_response, result_response, FakeResponse, FakeResult, FakeRouter,
    MockServer,
};
use azure_arm_core::paging::Page;

use crate::databases::Database;

const DATABASE_ITEM: &str = r"^/subscriptions/([^/]+)/resourceGroups/([^/]+)/providers/Microsoft\.Kusto/clusters/([^/]+)/databases/([^/]+)$";
const DATABASE_LIST: &str = r"^/subscriptions/([^/]+)/resourceGroups/([^/]+)/providers/Microsoft\.Kusto/clusters/([^/]+)/databases$";
const OPERATION_STATUS: &str = r"^/fake/operations/([0-9]+)$";

/// Fake server for [`DatabasesClient`](crate::databases::DatabasesClient).
#[derive(Clone)]
pub struct DatabasesServer {
    get: Option<Arc<dyn Fn(&str, &str, &str) -> FakeResult<Database> + Send + Sync>>,
    create_or_update:
        Option<Arc<dyn Fn(&str, &str, &str, Database) -> FakeResult<Database> + Send + Sync>>,
    delete: Option<Arc<dyn Fn(&str, &str, &str) -> FakeResult<()> + Send + Sync>>,
    list_by_cluster:
        Option<Arc<dyn Fn(&str, &str, Option<&str>) -> FakeResult<Page<Database>> + Send + Sync>>,
    operation_statuses: Vec<String>,
}

impl Default for DatabasesServer {
    fn default() -> Self {
        Self {
            get: None,
            create_or_update: None,
            delete: None,
            list_by_cluster: None,
            // Terminal on the first poll unless a test scripts otherwise.
            operation_statuses: vec!["Succeeded".into()],
        }
    }
}

impl DatabasesServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler for `get(resource_group, cluster, name)`.
    pub fn with_get(
        mut self,
        handler: impl Fn(&str, &str, &str) -> FakeResult<Database> + Send + Sync + 'static,
    ) -> Self {
        self.get = Some(Arc::new(handler));
        self
    }

    /// Handler for `begin_create_or_update(resource_group, cluster, name,
    /// database)`. The accepted database is echoed in the 202 body; the
    /// poller's final value comes from the `get` handler.
    pub fn with_create_or_update(
        mut self,
        handler: impl Fn(&str, &str, &str, Database) -> FakeResult<Database> + Send + Sync + 'static,
    ) -> Self {
        self.create_or_update = Some(Arc::new(handler));
        self
    }

    /// Handler for `begin_delete(resource_group, cluster, name)`.
    pub fn with_delete(
        mut self,
        handler: impl Fn(&str, &str, &str) -> FakeResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.delete = Some(Arc::new(handler));
        self
    }

    /// Handler for `list_by_cluster(resource_group, cluster)`; receives the
    /// `$skipToken` continuation.
    pub fn with_list_by_cluster(
        mut self,
        handler: impl Fn(&str, &str, Option<&str>) -> FakeResult<Page<Database>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.list_by_cluster = Some(Arc::new(handler));
        self
    }

    /// Script the status sequence the `Azure-AsyncOperation` monitor
    /// reports, one entry per poll. The last entry repeats once the script
    /// is exhausted. Defaults to `["Succeeded"]`.
    pub fn with_operation_statuses(
        mut self,
        statuses: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.operation_statuses = statuses.into_iter().map(Into::into).collect();
        self
    }

    /// Compile the handler table into a route table.
    pub fn into_router(self) -> FakeRouter {
        let operations: Arc<Mutex<HashMap<u64, VecDeque<String>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let next_operation = Arc::new(AtomicU64::new(1));
        let script = Arc::new(self.operation_statuses);

        let mut router = FakeRouter::new();

        let get = self.get;
        router = router.route("GET", DATABASE_ITEM, move |req| match &get {
            Some(handler) => result_response(
                200,
                handler(req.capture(1), req.capture(2), req.capture(3)),
            ),
            None => not_implemented("DatabasesServer::get"),
        });

        let create_or_update = self.create_or_update;
        let create_operations = operations.clone();
        let create_next = next_operation.clone();
        let create_script = script.clone();
        router = router.route("PUT", DATABASE_ITEM, move |req| {
            let Some(handler) = &create_or_update else {
                return not_implemented("DatabasesServer::create_or_update");
            };
            let database = match req.body_json::<Database>() {
                Ok(database) => database,
                Err(e) => return FakeResponse::error(400, "InvalidRequestFormat", e.to_string()),
            };
            match handler(req.capture(1), req.capture(2), req.capture(3), database) {
                Ok(accepted) => {
                    let id = create_next.fetch_add(1, Ordering::SeqCst);
                    create_operations
                        .lock()
                        .unwrap()
                        .insert(id, create_script.iter().cloned().collect());
                    let origin = req.url.origin().ascii_serialization();
                    FakeResponse::json(202, accepted)
                        .with_header("Azure-AsyncOperation", format!("{origin}/fake/operations/{id}"))
                }
                Err(e) => e.into(),
            }
        });

        let delete = self.delete;
        let delete_operations = operations.clone();
        let delete_next = next_operation.clone();
        let delete_script = script.clone();
        router = router.route("DELETE", DATABASE_ITEM, move |req| {
            let Some(handler) = &delete else {
                return not_implemented("DatabasesServer::delete");
            };
            match handler(req.capture(1), req.capture(2), req.capture(3)) {
                Ok(()) => {
                    let id = delete_next.fetch_add(1, Ordering::SeqCst);
                    delete_operations
                        .lock()
                        .unwrap()
                        .insert(id, delete_script.iter().cloned().collect());
                    let origin = req.url.origin().ascii_serialization();
                    FakeResponse::empty(202)
                        .with_header("Azure-AsyncOperation", format!("{origin}/fake/operations/{id}"))
                }
                Err(e) => e.into(),
            }
        });

        let list_by_cluster = self.list_by_cluster;
        router = router.route("GET", DATABASE_LIST, move |req| match &list_by_cluster {
            Some(handler) => {
                let skip = req.query("$skipToken");
                page_response(
                    req,
                    handler(req.capture(1), req.capture(2), skip.as_deref()),
                )
            }
            None => not_implemented("DatabasesServer::list_by_cluster"),
        });

        let status_operations = operations;
        router = router.route("GET", OPERATION_STATUS, move |req| {
            let id: u64 = match req.capture(0).parse() {
                Ok(id) => id,
                Err(_) => return FakeResponse::error(400, "InvalidOperationId", "bad id"),
            };
            let mut map = status_operations.lock().unwrap();
            let Some(queue) = map.get_mut(&id) else {
                return FakeResponse::error(404, "OperationNotFound", format!("operation {id}"));
            };
            let status = if queue.len() > 1 {
                queue.pop_front().unwrap_or_else(|| "Succeeded".into())
            } else {
                queue
                    .front()
                    .cloned()
                    .unwrap_or_else(|| "Succeeded".into())
            };
            FakeResponse::json(200, serde_json::json!({ "status": status }))
        });

        router
    }

    /// Mount the table on a fresh mock server.
    pub async fn serve(self) -> MockServer {
        azure_arm_core::fake::serve(self.into_router()).await
    }
}

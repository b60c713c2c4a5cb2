//! Ambient client installation.
//!
//! Bindings that are constructed without an explicit [`Client`] resolve one
//! from a process-global provider stack. [`ClientScope::install`] pushes a
//! client for the lifetime of the returned guard; nested installs shadow
//! outer ones. Each guard uninstalls the entry it installed, so a guard
//! dropped out of nesting order never removes another scope's client.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::client::Client;

static CLIENT_STACK: RwLock<Vec<(u64, Client)>> = RwLock::new(Vec::new());

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

const MISSING_CLIENT: &str =
    "no GraphQL client installed; wrap the calling code in ClientScope::install";

/// A guard that keeps a client installed as the ambient client.
///
/// Dropping the guard uninstalls the client, restoring whatever was
/// installed before it.
#[must_use = "dropping the guard immediately uninstalls the client"]
pub struct ClientScope {
    id: u64,
}

impl ClientScope {
    /// Install `client` as the ambient client until the guard drops.
    pub fn install(client: Client) -> ClientScope {
        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        CLIENT_STACK.write().push((id, client));
        tracing::debug!(
            target: "meridian_graphql::context",
            depth = CLIENT_STACK.read().len(),
            "installed ambient client"
        );
        ClientScope { id }
    }
}

impl Drop for ClientScope {
    fn drop(&mut self) {
        // Remove this guard's own entry, wherever it sits in the stack.
        let mut stack = CLIENT_STACK.write();
        if let Some(position) = stack.iter().rposition(|(id, _)| *id == self.id) {
            stack.remove(position);
        }
    }
}

/// Get the innermost installed client.
///
/// # Panics
///
/// Panics when no client is installed. Constructing a binding without a
/// provider is a programming error, not a runtime condition; use
/// [`try_current_client`] to probe.
pub fn current_client() -> Client {
    match try_current_client() {
        Some(client) => client,
        None => panic!("{}", MISSING_CLIENT),
    }
}

/// Get the innermost installed client, or `None` when the stack is empty.
pub fn try_current_client() -> Option<Client> {
    CLIENT_STACK.read().last().map(|(_, client)| client.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    // The stack is process-global, so tests touching it run serialized
    // behind this lock to keep each other's guards out of view.
    pub(crate) static STACK_TEST_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

    use crate::client::GraphqlClient;
    use crate::error::ClientError;
    use crate::operation::Request;
    use crate::response::Response;
    use futures_util::future::BoxFuture;
    use futures_util::stream::BoxStream;
    use futures_util::{stream, FutureExt, StreamExt};
    use serde_json::{json, Value};

    struct TaggedClient {
        tag: &'static str,
    }

    impl GraphqlClient for TaggedClient {
        fn execute(
            &self,
            _request: Request,
        ) -> BoxFuture<'static, Result<Response<Value>, ClientError>> {
            let tag = self.tag;
            async move { Ok(Response::from_data(json!({ "tag": tag }))) }.boxed()
        }

        fn subscribe(
            &self,
            _request: Request,
        ) -> BoxStream<'static, Result<Response<Value>, ClientError>> {
            stream::empty().boxed()
        }
    }

    async fn tag_of(client: &Client) -> String {
        let operation: crate::operation::Operation<Value> =
            crate::operation::Operation::query("{ tag }");
        let data = client
            .query(&operation, &(), &crate::operation::RequestOptions::default())
            .await
            .unwrap();
        data["tag"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_install_and_restore() {
        let _serial = STACK_TEST_LOCK.lock();

        assert!(try_current_client().is_none());
        {
            let _guard = ClientScope::install(Client::new(TaggedClient { tag: "outer" }));
            assert_eq!(tag_of(&current_client()).await, "outer");
        }
        assert!(try_current_client().is_none());
    }

    #[tokio::test]
    async fn test_nested_install_shadows() {
        let _serial = STACK_TEST_LOCK.lock();

        let _outer = ClientScope::install(Client::new(TaggedClient { tag: "outer" }));
        {
            let _inner = ClientScope::install(Client::new(TaggedClient { tag: "inner" }));
            assert_eq!(tag_of(&current_client()).await, "inner");
        }
        assert_eq!(tag_of(&current_client()).await, "outer");
    }

    #[tokio::test]
    async fn test_out_of_order_drop_uninstalls_own_client() {
        let _serial = STACK_TEST_LOCK.lock();

        let outer = ClientScope::install(Client::new(TaggedClient { tag: "outer" }));
        let inner = ClientScope::install(Client::new(TaggedClient { tag: "inner" }));

        // Dropping the outer guard first must not uninstall the inner
        // client.
        drop(outer);
        assert_eq!(tag_of(&current_client()).await, "inner");

        drop(inner);
        assert!(try_current_client().is_none());
    }

    #[test]
    fn test_missing_client_panics_with_guidance() {
        let _serial = STACK_TEST_LOCK.lock();

        let panic = std::panic::catch_unwind(current_client).unwrap_err();
        let message = panic.downcast_ref::<String>().cloned().unwrap_or_default();
        assert_eq!(
            message,
            "no GraphQL client installed; wrap the calling code in ClientScope::install"
        );
    }
}

//! Dispatch adapter (`spec.md` §4.6): `invokeSelf`, a thin binding to the
//! peer-dispatch transport.
//!
//! Production bindings are expected to be a [`tower::Service`] over the
//! wire transport (gRPC, HTTP, a queue) — directly the shape the teacher
//! repo's `AgentClient`/`MetronClient` take in `grpc/src/agent.rs` and
//! `grpc/src/lib.rs`. [`ServiceDispatcher`] adapts any such `Service` into
//! the [`PeerDispatcher`] trait the orchestrator calls through, so callers
//! who already have a `tower` stack (load balancing, retries, timeouts —
//! though retries are explicitly disabled per `spec.md` §1) can reuse it
//! unchanged.

use std::time::Duration;

use tower::{Service, ServiceExt};

use crate::error::{Error, Result};
use crate::script::Script;

/// A sub-script dispatch, with the deployment-generation qualifier
/// (`spec.md` §6 "Runtime ambient") attached so the transport can route it
/// to a peer of the same stage.
#[derive(Clone, Debug)]
pub struct DispatchRequest {
    pub script: Script,
    pub stage: String,
}

/// `invokeSelf(delay, event, context, callback)`.
///
/// Dispatch is fire-and-forget: the returned future resolves once the
/// dispatch has been *submitted*, not when the peer finishes executing it.
/// Submission failure is fatal for this sub-tree; the peer's own execution
/// failures are never visible here (`spec.md` §4.6, §7).
#[async_trait::async_trait]
pub trait PeerDispatcher: Send + Sync {
    async fn invoke_self(&self, delay: Duration, request: DispatchRequest) -> Result<()>;
}

/// Adapts any `tower::Service<DispatchRequest>` into a [`PeerDispatcher`],
/// sleeping for `delay` (immediately if `delay` is zero) before submitting.
#[derive(Clone)]
pub struct ServiceDispatcher<S> {
    inner: S,
}

impl<S> ServiceDispatcher<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl<S> PeerDispatcher for ServiceDispatcher<S>
where
    S: Service<DispatchRequest, Response = ()> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    async fn invoke_self(&self, delay: Duration, request: DispatchRequest) -> Result<()> {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.clone();
        let ready = inner
            .ready()
            .await
            .map_err(|e| Error::Dispatch(e.to_string()))?;

        ready
            .call(request)
            .await
            .map_err(|e| Error::Dispatch(e.to_string()))
    }
}

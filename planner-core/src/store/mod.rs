//! Remote store seam.
//!
//! A backend implements [`RemoteStore`] by answering raw [`Request`]s with
//! JSON. [`Store`] is the cheap, cloneable handle the rest of the crate uses:
//! it turns typed [`StoreCommand`]s into requests and decodes the answer
//! into the command's response type.

mod memory;
pub mod protocol;

pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{PlannerError, PlannerResult};
use crate::store::protocol::{Request, StoreCommand};

/// A generic collection store (hosted database, in-memory reference, ...).
///
/// Acknowledgement-only commands answer `Value::Null`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn execute(&self, request: Request) -> PlannerResult<Value>;
}

#[derive(Clone)]
pub struct Store(Arc<dyn RemoteStore>);

impl Store {
    pub fn new(backend: impl RemoteStore + 'static) -> Self {
        Store(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn RemoteStore>) -> Self {
        Store(backend)
    }

    /// Call a typed store command and return the result.
    ///
    /// The response type is inferred from the command's associated type.
    pub async fn call<C: StoreCommand>(&self, cmd: C) -> PlannerResult<C::Response> {
        let params = serde_json::to_value(cmd)?;
        let request = Request {
            command: C::command(),
            params,
        };

        let data = self.0.execute(request).await?;

        serde_json::from_value(data)
            .map_err(|e| PlannerError::Store(format!("Failed to parse response: {}", e)))
    }
}

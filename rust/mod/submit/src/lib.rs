pub mod api;
pub mod model;
pub mod secret;
pub mod store;
pub mod validate;

use std::sync::Arc;

use axum::Router;
use stash_core::{Authenticator, Module, ServiceConfig};
use stash_kv::KVStore;

use api::SubmitState;
use store::RecordStore;

/// The submission module: `GET /` and the authenticated, validated
/// `POST /send` write path.
pub struct SubmitModule {
    state: SubmitState,
}

impl SubmitModule {
    /// Wire the module from its injected dependencies.
    pub fn new(
        kv: Arc<dyn KVStore>,
        auth: Arc<dyn Authenticator>,
        config: &ServiceConfig,
    ) -> Self {
        let records = Arc::new(RecordStore::new(kv, config.hash_secrets));
        Self {
            state: SubmitState {
                auth,
                records,
                body_limit: config.body_limit,
            },
        }
    }

    /// The record store, for inspection by operators and tests.
    pub fn records(&self) -> &Arc<RecordStore> {
        &self.state.records
    }
}

impl Module for SubmitModule {
    fn name(&self) -> &str {
        "submit"
    }

    fn routes(&self) -> Router {
        api::router(self.state.clone())
    }
}

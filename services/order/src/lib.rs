use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::atomic::{AtomicBool, AtomicU32};
use std::sync::Arc;

use uuid::{Builder, NoContext, Timestamp, Uuid};

use marketplace_common::confidentiality::AbstractConfidentiality;
use marketplace_common::config::AppConfig;
use marketplace_common::logging::AppLogContext;

pub mod api;
pub mod constant;
pub mod error;
pub mod model;
pub mod network;
pub mod repository;
pub mod usecase;

mod auth;
pub use auth::{
    AbstractAuthKeystore, AppAuthClaimPermission, AppAuthClaimQuota, AppAuthKeystore,
    AppAuthPermissionCode, AppAuthQuotaMatCode, AppAuthedClaim, AppJwtAuthentication,
};

mod adapter;
pub use adapter::datastore;
pub use adapter::processor;

use crate::error::AppError;
use crate::processor::AppPaymentGateway;

type WebApiHdlrLabel = &'static str;

pub struct AppDataStoreContext {
    pub in_mem: Option<Arc<Box<dyn datastore::AbstInMemoryDStore>>>,
    pub sql_dbs: Option<Vec<Arc<datastore::AppMariaDbStore>>>,
}

// global state shared by all threads
pub struct AppSharedState {
    _cfg: Arc<AppConfig>,
    _log: Arc<AppLogContext>,
    dstore: Arc<AppDataStoreContext>,
    _auth_keys: Arc<Box<dyn AbstractAuthKeystore>>,
    _gateway: Arc<AppPaymentGateway>,
    _shutdown: Arc<AtomicBool>,
    _num_reqs_processing: Arc<AtomicU32>,
}

impl AppSharedState {
    pub fn new(
        cfg: AppConfig,
        log: AppLogContext,
        confidential: Box<dyn AbstractConfidentiality>,
    ) -> DefaultResult<Self, AppError> {
        let confidential = Arc::new(confidential);
        let log = Arc::new(log);
        let (in_mem, sql_dbs) =
            datastore::build_context(log.clone(), &cfg.api_server.data_store, confidential)?;
        let in_mem = in_mem.map(Arc::new);
        let sql_dbs = sql_dbs.map(|m| m.into_iter().map(Arc::new).collect());
        let ds_ctx = Arc::new(AppDataStoreContext { in_mem, sql_dbs });
        let auth_keys = AppAuthKeystore::try_create(&cfg.basepath, &cfg.api_server.auth)?;
        let gateway = processor::build_context(&cfg.api_server.payment_gateway, log.clone());
        Ok(Self {
            _cfg: Arc::new(cfg),
            _log: log,
            dstore: ds_ctx,
            _auth_keys: Arc::new(Box::new(auth_keys)),
            _gateway: Arc::new(gateway),
            _shutdown: Arc::new(AtomicBool::new(false)),
            _num_reqs_processing: Arc::new(AtomicU32::new(0)),
        })
    } // end of fn new

    pub fn config(&self) -> &Arc<AppConfig> {
        &self._cfg
    }

    pub fn log_context(&self) -> &Arc<AppLogContext> {
        &self._log
    }

    pub fn datastore(&self) -> Arc<AppDataStoreContext> {
        self.dstore.clone()
    }

    pub fn auth_keystore(&self) -> Arc<Box<dyn AbstractAuthKeystore>> {
        self._auth_keys.clone()
    }

    pub fn payment_gateway(&self) -> Arc<AppPaymentGateway> {
        self._gateway.clone()
    }

    pub fn shutdown(&self) -> Arc<AtomicBool> {
        self._shutdown.clone()
    }

    /// return atomic field which represents current number of processing requests
    pub fn num_requests(&self) -> Arc<AtomicU32> {
        self._num_reqs_processing.clone()
    }
} // end of impl AppSharedState

impl Clone for AppSharedState {
    fn clone(&self) -> Self {
        Self {
            _cfg: self._cfg.clone(),
            _log: self._log.clone(),
            dstore: self.dstore.clone(),
            _auth_keys: self._auth_keys.clone(),
            _gateway: self._gateway.clone(),
            _shutdown: self._shutdown.clone(),
            _num_reqs_processing: self._num_reqs_processing.clone(),
        }
    }
}

pub(crate) fn generate_custom_uid(machine_code: u8) -> Uuid {
    // unix timestamp followed by random bytes, the first random byte is
    // replaced with machine code so instances sharing a data store never
    // collide within the same millisecond
    let ts_ctx = NoContext;
    let (secs, nano) = Timestamp::now(ts_ctx).to_unix();
    let millis = (secs * 1000).saturating_add((nano as u64) / 1_000_000);
    let mut node_id = rand::random::<[u8; 10]>();
    node_id[0] = machine_code;
    let builder = Builder::from_unix_timestamp_millis(millis, &node_id);
    builder.into_uuid()
}

/// object ID for orders, payments, cart lines and ledger entries, 32
/// lower-case hex characters without hyphens
pub fn generate_object_id() -> String {
    let uid = generate_custom_uid(constant::app_meta::MACHINE_CODE);
    uid.simple().to_string()
}

mod in_mem;
mod sql_db;

use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use marketplace_common::confidentiality::AbstractConfidentiality;
use marketplace_common::config::AppDataStoreCfg;
use marketplace_common::logging::{app_log_event, AppLogContext, AppLogLevel};

pub use in_mem::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemDeleteInfo, AppInMemDstoreLock,
    AppInMemFetchKeys, AppInMemFetchedData, AppInMemFetchedSingleRow, AppInMemFetchedSingleTable,
    AppInMemUpdateData, AppInMemoryDStore,
};
pub use sql_db::AppMariaDbStore;

use crate::error::{AppError, AppErrorCode};

type AppDStoreBuildResult = (
    Option<Box<dyn AbstInMemoryDStore>>,
    Option<Vec<AppMariaDbStore>>,
);

pub(crate) fn build_context(
    logctx: Arc<AppLogContext>,
    cfg: &[AppDataStoreCfg],
    confidential: Arc<Box<dyn AbstractConfidentiality>>,
) -> DefaultResult<AppDStoreBuildResult, AppError> {
    let mut inmem = None;
    let mut sqldb: Option<Vec<AppMariaDbStore>> = None;
    for c in cfg {
        match c {
            AppDataStoreCfg::InMemory(d) => {
                let item: Box<dyn AbstInMemoryDStore> = Box::new(AppInMemoryDStore::new(d));
                inmem = Some(item);
            }
            AppDataStoreCfg::DbServer(d) => {
                match AppMariaDbStore::try_build(d, confidential.clone()) {
                    Ok(item) => sqldb.get_or_insert_with(Vec::new).push(item),
                    Err(e) => {
                        app_log_event!(logctx, AppLogLevel::ERROR, "alias:{}, {}", d.alias, e);
                    }
                }
            }
        }
    }
    if inmem.is_none() && sqldb.is_none() {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("no-usable-store".to_string()),
        })
    } else {
        Ok((inmem, sqldb))
    }
}

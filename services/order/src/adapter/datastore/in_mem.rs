use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use marketplace_common::config::AppInMemoryDbCfg;

use crate::error::{AppError, AppErrorCode};

// simple implementation of in-memory data storage, every table is a map of
// primary key to row, each row is a list of serialized column values
pub type AppInMemFetchedSingleRow = Vec<String>;
pub type AppInMemFetchedSingleTable = HashMap<String, AppInMemFetchedSingleRow>;
type InnerAllTables = HashMap<String, AppInMemFetchedSingleTable>;

pub type AppInMemUpdateData = InnerAllTables;
pub type AppInMemFetchedData = InnerAllTables;
pub type AppInMemFetchKeys = HashMap<String, Vec<String>>;
pub type AppInMemDeleteInfo = AppInMemFetchKeys;

pub trait AbsDStoreFilterKeyOp: Send + Sync {
    fn filter(&self, k: &String, v: &Vec<String>) -> bool;
}

// Callers hold this lock from `fetch_acquire()` until `save_release()`, all
// other operations to the same store wait in the meantime, which turns a
// read-modify-write sequence into single atomic unit.
pub struct AppInMemDstoreLock {
    guard: OwnedMutexGuard<InnerAllTables>,
}

#[async_trait]
pub trait AbstInMemoryDStore: Send + Sync {
    async fn create_table(&self, label: &str) -> DefaultResult<(), AppError>;

    async fn save(&self, data: AppInMemUpdateData) -> DefaultResult<usize, AppError>;

    async fn delete(&self, info: AppInMemDeleteInfo) -> DefaultResult<usize, AppError>;

    async fn fetch(&self, info: AppInMemFetchKeys) -> DefaultResult<AppInMemFetchedData, AppError>;

    async fn fetch_acquire(
        &self,
        info: AppInMemFetchKeys,
    ) -> DefaultResult<(AppInMemFetchedData, AppInMemDstoreLock), AppError>;

    fn save_release(
        &self,
        data: AppInMemUpdateData,
        lock: AppInMemDstoreLock,
    ) -> DefaultResult<usize, AppError>;

    async fn filter_keys(
        &self,
        tbl_label: String,
        op: &dyn AbsDStoreFilterKeyOp,
    ) -> DefaultResult<Vec<String>, AppError>;
}

pub struct AppInMemoryDStore {
    max_items_per_table: u32,
    table_map: Arc<Mutex<InnerAllTables>>,
}

impl AppInMemoryDStore {
    pub fn new(cfg: &AppInMemoryDbCfg) -> Self {
        Self {
            max_items_per_table: cfg.max_items,
            table_map: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn check_table_existence(
        tables: &InnerAllTables,
        labels: Vec<&String>,
    ) -> DefaultResult<(), AppError> {
        let missing = labels
            .into_iter()
            .filter(|label| !tables.contains_key(label.as_str()))
            .map(String::as_str)
            .collect::<Vec<_>>();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError {
                code: AppErrorCode::DataTableNotExist,
                detail: Some(missing.join(",")),
            })
        }
    }

    fn fetch_common(
        tables: &InnerAllTables,
        info: AppInMemFetchKeys,
    ) -> DefaultResult<AppInMemFetchedData, AppError> {
        Self::check_table_existence(tables, info.keys().collect())?;
        let out = info
            .into_iter()
            .filter_map(|(label, keys)| {
                let table = tables.get(label.as_str())?;
                let rows = keys
                    .into_iter()
                    .filter_map(|k| table.get(k.as_str()).map(|row| (k, row.clone())))
                    .collect::<AppInMemFetchedSingleTable>();
                Some((label, rows))
            })
            .collect();
        Ok(out)
    }

    fn filter_keys_common(
        tables: &InnerAllTables,
        tbl_label: &str,
        op: &dyn AbsDStoreFilterKeyOp,
    ) -> DefaultResult<Vec<String>, AppError> {
        let table = tables.get(tbl_label).ok_or(AppError {
            code: AppErrorCode::DataTableNotExist,
            detail: Some(tbl_label.to_string()),
        })?;
        let out = table
            .iter()
            .filter(|(k, v)| op.filter(k, v))
            .map(|(k, _v)| k.clone())
            .collect();
        Ok(out)
    }

    fn save_common(
        &self,
        tables: &mut InnerAllTables,
        data: AppInMemUpdateData,
    ) -> DefaultResult<usize, AppError> {
        Self::check_table_existence(tables, data.keys().collect())?;
        // capacity is checked against every table before any row is written,
        // so a rejected save leaves the store untouched
        for (label, rows) in data.iter() {
            if let Some(table) = tables.get(label.as_str()) {
                let num_new = rows.keys().filter(|k| !table.contains_key(*k)).count();
                let expect = table.len() + num_new;
                if expect > self.max_items_per_table as usize {
                    let detail = format!(
                        "table:{label}, limit:{}, expect:{expect}",
                        self.max_items_per_table
                    );
                    return Err(AppError {
                        code: AppErrorCode::ExceedingMaxLimit,
                        detail: Some(detail),
                    });
                }
            }
        }
        let mut num_saved = 0usize;
        for (label, rows) in data.into_iter() {
            if let Some(table) = tables.get_mut(label.as_str()) {
                num_saved += rows.len();
                table.extend(rows);
            }
        }
        Ok(num_saved)
    } // end of fn save_common

    fn delete_common(
        tables: &mut InnerAllTables,
        info: AppInMemDeleteInfo,
    ) -> DefaultResult<usize, AppError> {
        Self::check_table_existence(tables, info.keys().collect())?;
        let mut num_deleted = 0usize;
        for (label, keys) in info.into_iter() {
            if let Some(table) = tables.get_mut(label.as_str()) {
                num_deleted += keys
                    .iter()
                    .filter_map(|k| table.remove(k.as_str()))
                    .count();
            }
        }
        Ok(num_deleted)
    }
} // end of impl AppInMemoryDStore

impl AppInMemDstoreLock {
    // read more rows while the store is still locked
    pub fn fetch(&self, info: AppInMemFetchKeys) -> DefaultResult<AppInMemFetchedData, AppError> {
        AppInMemoryDStore::fetch_common(&self.guard, info)
    }

    pub fn filter_keys(
        &self,
        tbl_label: &str,
        op: &dyn AbsDStoreFilterKeyOp,
    ) -> DefaultResult<Vec<String>, AppError> {
        AppInMemoryDStore::filter_keys_common(&self.guard, tbl_label, op)
    }

    pub fn delete_release(self, info: AppInMemDeleteInfo) -> DefaultResult<usize, AppError> {
        let mut guard = self.guard;
        AppInMemoryDStore::delete_common(&mut guard, info)
    } // lock released at here
}

#[async_trait]
impl AbstInMemoryDStore for AppInMemoryDStore {
    async fn create_table(&self, label: &str) -> DefaultResult<(), AppError> {
        let mut guard = self.table_map.lock().await;
        if !guard.contains_key(label) {
            guard.insert(label.to_string(), HashMap::new());
        }
        Ok(())
    }

    async fn save(&self, data: AppInMemUpdateData) -> DefaultResult<usize, AppError> {
        let mut guard = self.table_map.lock().await;
        self.save_common(&mut guard, data)
    }

    async fn delete(&self, info: AppInMemDeleteInfo) -> DefaultResult<usize, AppError> {
        let mut guard = self.table_map.lock().await;
        Self::delete_common(&mut guard, info)
    }

    async fn fetch(&self, info: AppInMemFetchKeys) -> DefaultResult<AppInMemFetchedData, AppError> {
        let guard = self.table_map.lock().await;
        Self::fetch_common(&guard, info)
    }

    async fn fetch_acquire(
        &self,
        info: AppInMemFetchKeys,
    ) -> DefaultResult<(AppInMemFetchedData, AppInMemDstoreLock), AppError> {
        let guard = self.table_map.clone().lock_owned().await;
        let fetched = Self::fetch_common(&guard, info)?;
        Ok((fetched, AppInMemDstoreLock { guard }))
    }

    fn save_release(
        &self,
        data: AppInMemUpdateData,
        lock: AppInMemDstoreLock,
    ) -> DefaultResult<usize, AppError> {
        let mut guard = lock.guard;
        self.save_common(&mut guard, data)
    } // lock released at here

    async fn filter_keys(
        &self,
        tbl_label: String,
        op: &dyn AbsDStoreFilterKeyOp,
    ) -> DefaultResult<Vec<String>, AppError> {
        let guard = self.table_map.lock().await;
        Self::filter_keys_common(&guard, tbl_label.as_str(), op)
    }
} // end of impl AbstInMemoryDStore

pub(super) mod artist_ledger;
pub(super) mod cart;
pub(super) mod order;
pub(super) mod payment;
pub(super) mod product_price;
pub(super) mod wishlist;

use std::fmt::Debug;
use std::result::Result as DefaultResult;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};

use crate::datastore::AbsDStoreFilterKeyOp;
use crate::error::{AppError, AppErrorCode};

// rows in the in-memory store are lists of strings, the helpers below convert
// each column back to its original type, any failure means the row has been
// corrupted
fn parse_column<T>(label: &str, raw: &str) -> DefaultResult<T, AppError>
where
    T: FromStr,
    <T as FromStr>::Err: Debug,
{
    raw.parse::<T>().map_err(|e| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("column:{label}, value:{raw}, error:{:?}", e)),
    })
}

fn parse_time(label: &str, raw: &str) -> DefaultResult<DateTime<FixedOffset>, AppError> {
    DateTime::parse_from_rfc3339(raw).map_err(|e| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("column:{label}, value:{raw}, error:{e}")),
    })
}

fn parse_opt_time(
    label: &str,
    raw: &str,
) -> DefaultResult<Option<DateTime<FixedOffset>>, AppError> {
    if raw.is_empty() {
        Ok(None)
    } else {
        parse_time(label, raw).map(Some)
    }
}

fn opt_time_to_col(value: Option<&DateTime<FixedOffset>>) -> String {
    value.map(|t| t.to_rfc3339()).unwrap_or_default()
}

fn opt_str_from_col(raw: String) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

fn take_column(row: &mut std::vec::IntoIter<String>, label: &str) -> DefaultResult<String, AppError> {
    row.next().ok_or(AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("missing-column:{label}")),
    })
}

struct KeyPrefixFilter(String);

impl AbsDStoreFilterKeyOp for KeyPrefixFilter {
    fn filter(&self, k: &String, _v: &Vec<String>) -> bool {
        k.starts_with(self.0.as_str())
    }
}

// match rows whose column at given index equals to the value
struct ColumnValueFilter {
    idx: usize,
    value: String,
}

impl AbsDStoreFilterKeyOp for ColumnValueFilter {
    fn filter(&self, _k: &String, v: &Vec<String>) -> bool {
        v.get(self.idx)
            .map(|c| c.as_str() == self.value.as_str())
            .unwrap_or(false)
    }
}

pub(super) mod artist_ledger;
pub(super) mod cart;
pub(super) mod order;
pub(super) mod payment;
pub(super) mod product_price;
pub(super) mod wishlist;

use std::io::ErrorKind;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use sqlx::error::{BoxDynError, Error};
use sqlx::mysql::{MySqlArguments, MySqlQueryResult, MySqlRow};
use sqlx::{MySql, Row, Transaction};

use marketplace_common::adapter::repository::OidBytes;

use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};
use crate::repository::AppRepoError;

type SqlRawQuery = (String, MySqlArguments);

impl From<Error> for AppError {
    fn from(value: Error) -> Self {
        let (code, detail) = match value {
            Error::Configuration(e) => (
                AppErrorCode::InvalidInput,
                e.to_string() + " invalid-db-config",
            ),
            Error::Io(e) => (
                AppErrorCode::IOerror(e.kind()),
                e.to_string() + " io-err-mariadb",
            ),
            Error::Database(e) => {
                if e.is_unique_violation() {
                    (AppErrorCode::DuplicateKey, e.to_string())
                } else {
                    (AppErrorCode::RemoteDbServerFailure, e.to_string())
                }
            }
            Error::Protocol(errmsg) => (AppErrorCode::IOerror(ErrorKind::InvalidData), errmsg),
            Error::Decode(e) => (AppErrorCode::DataCorruption, e.to_string()),
            Error::ColumnDecode { index, source } => (
                AppErrorCode::DataCorruption,
                source.to_string() + ", when decoding column at idx " + index.as_str(),
            ),
            Error::Tls(e) => (
                AppErrorCode::IOerror(ErrorKind::NotConnected),
                e.to_string(),
            ),
            Error::TypeNotFound { type_name } => {
                (AppErrorCode::InvalidInput, type_name + " wrong-col-typ")
            }
            Error::ColumnNotFound(col_name) => (
                AppErrorCode::IOerror(ErrorKind::NotFound),
                col_name + " no-col",
            ),
            Error::RowNotFound => (
                AppErrorCode::IOerror(ErrorKind::NotFound),
                "no-row".to_string(),
            ),
            Error::ColumnIndexOutOfBounds { index, len } => (
                AppErrorCode::InvalidInput,
                format!("req-idx:{}, limit:{}", index, len),
            ),
            Error::PoolTimedOut => (AppErrorCode::DatabaseServerBusy, "no-conn-avail".to_string()),
            Error::PoolClosed => (AppErrorCode::Unknown, "pool-closed".to_string()),
            Error::WorkerCrashed => (
                AppErrorCode::Unknown,
                "low-level-db-worker-crashed".to_string(),
            ),
            _others => (
                AppErrorCode::Unknown,
                "internal-implementation-issue".to_string(),
            ),
        };
        Self {
            code,
            detail: Some(detail),
        }
    } // end of fn from
} // end of impl AppError

fn encode_error(e: BoxDynError) -> AppError {
    AppError {
        code: AppErrorCode::InvalidInput,
        detail: Some(format!("sql-arg-encode, {e}")),
    }
}

fn first_db(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Arc<AppMariaDbStore>, AppError> {
    dbs.first().cloned().ok_or(AppError {
        code: AppErrorCode::MissingDataStore,
        detail: Some("mariadb".to_string()),
    })
}

fn oid_to_column(oid: &str) -> DefaultResult<Vec<u8>, AppError> {
    let out = OidBytes::try_from(oid)?;
    Ok(out.as_column())
}

fn opt_oid_to_column(oid: Option<&String>) -> DefaultResult<Option<Vec<u8>>, AppError> {
    oid.map(|v| oid_to_column(v.as_str())).transpose()
}

fn oid_from_row(row: &MySqlRow, idx: usize) -> DefaultResult<String, AppError> {
    let raw = row.try_get::<Vec<u8>, usize>(idx)?;
    let out = OidBytes::to_app_oid(raw)?;
    Ok(out)
}

fn opt_oid_from_row(row: &MySqlRow, idx: usize) -> DefaultResult<Option<String>, AppError> {
    let raw = row.try_get::<Option<Vec<u8>>, usize>(idx)?;
    let out = raw.map(OidBytes::to_app_oid).transpose()?;
    Ok(out)
}

// all time columns are saved in UTC without time zone
fn time_to_column(t: &DateTime<FixedOffset>) -> NaiveDateTime {
    t.naive_utc()
}

fn time_from_row(row: &MySqlRow, idx: usize) -> DefaultResult<DateTime<FixedOffset>, AppError> {
    let raw = row.try_get::<NaiveDateTime, usize>(idx)?;
    Ok(raw.and_utc().fixed_offset())
}

fn opt_time_from_row(
    row: &MySqlRow,
    idx: usize,
) -> DefaultResult<Option<DateTime<FixedOffset>>, AppError> {
    let raw = row.try_get::<Option<NaiveDateTime>, usize>(idx)?;
    Ok(raw.map(|t| t.and_utc().fixed_offset()))
}

fn parse_from_row<T: std::str::FromStr<Err = String>>(
    row: &MySqlRow,
    idx: usize,
) -> DefaultResult<T, AppError> {
    let raw = row.try_get::<String, usize>(idx)?;
    raw.parse::<T>().map_err(|detail| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(detail),
    })
}

async fn run_query_once(
    tx: &mut Transaction<'_, MySql>,
    rawsql: SqlRawQuery,
    maybe_num_batch: Option<usize>,
) -> DefaultResult<MySqlQueryResult, AppError> {
    let (sql_patt, args) = rawsql;
    let query = sqlx::query_with(sql_patt.as_str(), args);
    let resultset = query.execute(&mut **tx).await?;
    if let Some(num_batch) = maybe_num_batch {
        let num_affected = resultset.rows_affected() as usize;
        if num_affected == num_batch {
            Ok(resultset)
        } else {
            let detail = format!(
                "num_affected, actual:{}, expect:{}",
                num_affected, num_batch
            );
            Err(AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(detail),
            })
        }
    } else {
        Ok(resultset)
    }
}

async fn fetch_all_in_tx(
    tx: &mut Transaction<'_, MySql>,
    rawsql: SqlRawQuery,
) -> DefaultResult<Vec<MySqlRow>, AppError> {
    let (sql_patt, args) = rawsql;
    let rows = sqlx::query_with(sql_patt.as_str(), args)
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows)
}

async fn fetch_all_once(
    db: &AppMariaDbStore,
    rawsql: SqlRawQuery,
) -> DefaultResult<Vec<MySqlRow>, AppError> {
    let (sql_patt, args) = rawsql;
    let mut conn = db.acquire().await?;
    let rows = sqlx::query_with(sql_patt.as_str(), args)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

fn placeholders(num: usize, unit: &str) -> String {
    (0..num).map(|_| unit).collect::<Vec<_>>().join(",")
}

// malformed object ID from callers cannot refer to any saved row
fn oid_to_column_or_absent(oid: &str) -> DefaultResult<Vec<u8>, AppRepoError> {
    oid_to_column(oid).map_err(|_e| AppRepoError::NotExist(oid.to_string()))
}

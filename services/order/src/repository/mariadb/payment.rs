use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local as LocalTime;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Acquire, Arguments, MySql, Row, Transaction};

use crate::datastore::AppMariaDbStore;
use crate::error::AppError;
use crate::model::{
    ArtistTransactionModel, OrderModel, PaymentMethod, PaymentModel, PaymentOutcome,
    PaymentStatus,
};
use crate::repository::{AbsPaymentRepo, AppRepoError};

use super::artist_ledger::InsertEntriesArg;
use super::order::{load_order_in_tx, UpdateTopLvlArg};
use super::{
    encode_error, fetch_all_in_tx, first_db, oid_from_row, oid_to_column,
    oid_to_column_or_absent, opt_oid_from_row, opt_oid_to_column, opt_time_from_row,
    parse_from_row, run_query_once, time_from_row, time_to_column, SqlRawQuery,
};

const COLUMN_SEQ: &str = "`id`,`o_id`,`method`,`amount`,`transaction_id`,`status`,\
    `refund_of`,`payment_time`,`created_at`";

struct InsertArg<'a>(&'a PaymentModel);
struct SettleArg<'a>(&'a PaymentModel);

enum FetchArg {
    ById { pid: Vec<u8>, for_update: bool },
    ByOrder(Vec<u8>),
}
struct PaymentRow(MySqlRow);

impl TryFrom<InsertArg<'_>> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: InsertArg<'_>) -> DefaultResult<Self, Self::Error> {
        let m = value.0;
        let patt = format!("INSERT INTO `payment`({COLUMN_SEQ}) VALUES (?,?,?,?,?,?,?,?,?)");
        let mut args = MySqlArguments::default();
        args.add(oid_to_column(m.id_.as_str())?)
            .map_err(encode_error)?;
        args.add(oid_to_column(m.order_id.as_str())?)
            .map_err(encode_error)?;
        args.add(m.method.as_str()).map_err(encode_error)?;
        args.add(m.amount).map_err(encode_error)?;
        args.add(m.transaction_id.as_deref())
            .map_err(encode_error)?;
        args.add(m.status.as_str()).map_err(encode_error)?;
        args.add(opt_oid_to_column(m.refund_of.as_ref())?)
            .map_err(encode_error)?;
        args.add(m.payment_time.as_ref().map(time_to_column))
            .map_err(encode_error)?;
        args.add(time_to_column(&m.create_time))
            .map_err(encode_error)?;
        Ok((patt, args))
    }
}

// the row is written only once more, from pending to the final state
impl TryFrom<SettleArg<'_>> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: SettleArg<'_>) -> DefaultResult<Self, Self::Error> {
        let m = value.0;
        let patt = "UPDATE `payment` SET `transaction_id`=?,`status`=?,`payment_time`=? \
                    WHERE `id`=? AND `status`=?";
        let mut args = MySqlArguments::default();
        args.add(m.transaction_id.as_deref())
            .map_err(encode_error)?;
        args.add(m.status.as_str()).map_err(encode_error)?;
        args.add(m.payment_time.as_ref().map(time_to_column))
            .map_err(encode_error)?;
        args.add(oid_to_column(m.id_.as_str())?)
            .map_err(encode_error)?;
        args.add(PaymentStatus::Pending.as_str())
            .map_err(encode_error)?;
        Ok((patt.to_string(), args))
    }
}

impl TryFrom<FetchArg> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: FetchArg) -> DefaultResult<Self, Self::Error> {
        let mut args = MySqlArguments::default();
        let patt = match value {
            FetchArg::ById { pid, for_update } => {
                args.add(pid).map_err(encode_error)?;
                let suffix = if for_update { " FOR UPDATE" } else { "" };
                format!("SELECT {COLUMN_SEQ} FROM `payment` WHERE `id`=?{suffix}")
            }
            FetchArg::ByOrder(oid) => {
                args.add(oid).map_err(encode_error)?;
                format!(
                    "SELECT {COLUMN_SEQ} FROM `payment` WHERE `o_id`=? \
                     ORDER BY `created_at` ASC"
                )
            }
        };
        Ok((patt, args))
    }
}

impl TryFrom<PaymentRow> for PaymentModel {
    type Error = AppError;
    fn try_from(value: PaymentRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        Ok(Self {
            id_: oid_from_row(&row, 0)?,
            order_id: oid_from_row(&row, 1)?,
            method: parse_from_row::<PaymentMethod>(&row, 2)?,
            amount: row.try_get::<Decimal, usize>(3)?,
            transaction_id: row.try_get::<Option<String>, usize>(4)?,
            status: parse_from_row::<PaymentStatus>(&row, 5)?,
            refund_of: opt_oid_from_row(&row, 6)?,
            payment_time: opt_time_from_row(&row, 7)?,
            create_time: time_from_row(&row, 8)?,
        })
    }
}

fn convert_rows(rows: Vec<MySqlRow>) -> DefaultResult<Vec<PaymentModel>, AppError> {
    rows.into_iter()
        .map(|r| PaymentModel::try_from(PaymentRow(r)))
        .collect()
}

/// all payments of the order, oldest first
pub(super) async fn load_payments_in_tx(
    tx: &mut Transaction<'_, MySql>,
    oid: &str,
) -> DefaultResult<Vec<PaymentModel>, AppRepoError> {
    let arg = FetchArg::ByOrder(oid_to_column_or_absent(oid)?);
    let rows = fetch_all_in_tx(tx, arg.try_into()?).await?;
    let out = convert_rows(rows)?;
    Ok(out)
}

async fn load_payment_in_tx(
    tx: &mut Transaction<'_, MySql>,
    pid: &str,
    for_update: bool,
) -> DefaultResult<PaymentModel, AppRepoError> {
    let arg = FetchArg::ById {
        pid: oid_to_column_or_absent(pid)?,
        for_update,
    };
    let rows = fetch_all_in_tx(tx, arg.try_into()?).await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or(AppRepoError::NotExist(pid.to_string()))?;
    let out = PaymentModel::try_from(PaymentRow(row))?;
    Ok(out)
}

async fn load_locked_order(
    tx: &mut Transaction<'_, MySql>,
    oid: &str,
) -> DefaultResult<OrderModel, AppRepoError> {
    load_order_in_tx(tx, oid, true)
        .await?
        .ok_or(AppRepoError::NotExist(oid.to_string()))
}

pub(crate) struct PaymentMariaDbRepo {
    _db: Arc<AppMariaDbStore>,
}

impl PaymentMariaDbRepo {
    pub(crate) fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let _db = first_db(dbs)?;
        Ok(Self { _db })
    }
}

#[async_trait]
impl AbsPaymentRepo for PaymentMariaDbRepo {
    async fn create_charge(
        &self,
        oid: &str,
        method: PaymentMethod,
    ) -> DefaultResult<(PaymentModel, OrderModel), AppRepoError> {
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await.map_err(AppError::from)?;
        // the locked order row serializes charge attempts of the same order
        let order = load_locked_order(&mut tx, oid).await?;
        let existing = load_payments_in_tx(&mut tx, oid).await?;
        let payment = PaymentModel::try_new_charge(&order, &existing, method)?;
        let rawsql = SqlRawQuery::try_from(InsertArg(&payment))?;
        let _rs = run_query_once(&mut tx, rawsql, Some(1)).await?;
        tx.commit().await.map_err(AppError::from)?;
        Ok((payment, order))
    }

    async fn create_refund(
        &self,
        pid: &str,
    ) -> DefaultResult<(PaymentModel, PaymentModel), AppRepoError> {
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await.map_err(AppError::from)?;
        let original = load_payment_in_tx(&mut tx, pid, true).await?;
        let oid = original.order_id.clone();
        let order = load_locked_order(&mut tx, oid.as_str()).await?;
        let existing = load_payments_in_tx(&mut tx, oid.as_str()).await?;
        let refund = PaymentModel::try_new_refund(&original, &order, &existing)?;
        let rawsql = SqlRawQuery::try_from(InsertArg(&refund))?;
        let _rs = run_query_once(&mut tx, rawsql, Some(1)).await?;
        tx.commit().await.map_err(AppError::from)?;
        Ok((refund, original))
    }

    async fn settle(
        &self,
        pid: &str,
        outcome: PaymentOutcome,
    ) -> DefaultResult<(PaymentModel, OrderModel), AppRepoError> {
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await.map_err(AppError::from)?;
        let mut payment = load_payment_in_tx(&mut tx, pid, true).await?;
        let oid = payment.order_id.clone();
        let mut order = load_locked_order(&mut tx, oid.as_str()).await?;
        let time = LocalTime::now().fixed_offset();
        payment.settle(outcome, time)?;
        let rawsql = SqlRawQuery::try_from(SettleArg(&payment))?;
        let _rs = run_query_once(&mut tx, rawsql, Some(1)).await?;
        if let Some(event) = payment.order_event() {
            order.apply(event)?;
            let entries = if payment.is_refund() {
                ArtistTransactionModel::from_settled_refund(&order, time)
            } else {
                ArtistTransactionModel::from_settled_charge(&order, time)
            };
            let rawsql = SqlRawQuery::try_from(UpdateTopLvlArg(&order))?;
            let _rs = run_query_once(&mut tx, rawsql, Some(1)).await?;
            if !entries.is_empty() {
                let num_entries = entries.len();
                let rawsql = SqlRawQuery::try_from(InsertEntriesArg(&entries))?;
                let _rs = run_query_once(&mut tx, rawsql, Some(num_entries)).await?;
            }
        }
        tx.commit().await.map_err(AppError::from)?;
        Ok((payment, order))
    } // end of fn settle

    async fn fetch(&self, pid: &str) -> DefaultResult<PaymentModel, AppRepoError> {
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await.map_err(AppError::from)?;
        let out = load_payment_in_tx(&mut tx, pid, false).await?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(out)
    }

    async fn fetch_by_order(&self, oid: &str) -> DefaultResult<Vec<PaymentModel>, AppError> {
        let oid_b = match oid_to_column(oid) {
            Ok(v) => v,
            Err(_e) => {
                return Ok(Vec::new());
            }
        };
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;
        let rows = fetch_all_in_tx(&mut tx, FetchArg::ByOrder(oid_b).try_into()?).await?;
        tx.commit().await?;
        convert_rows(rows)
    }
} // end of impl PaymentMariaDbRepo

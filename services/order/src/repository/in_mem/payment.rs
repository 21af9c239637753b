use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local as LocalTime;

use crate::datastore::{
    AbstInMemoryDStore, AppInMemDstoreLock, AppInMemFetchedSingleRow, AppInMemFetchedSingleTable,
};
use crate::error::{AppError, AppErrorCode};
use crate::model::{
    ArtistTransactionModel, OrderModel, PaymentMethod, PaymentModel, PaymentOutcome, PaymentStatus,
};
use crate::repository::{AbsPaymentRepo, AppRepoError};

use super::artist_ledger::ArtistTxnTable;
use super::order::{load_order, order_update_data, OrderItemTable, OrderTable};
use super::{
    opt_str_from_col, opt_time_to_col, parse_column, parse_opt_time, parse_time, take_column,
    ColumnValueFilter,
};

#[allow(non_snake_case)]
pub(super) mod PaymentTable {
    use super::{opt_time_to_col, AppInMemFetchedSingleTable, HashMap, PaymentModel};

    pub(in super::super) const LABEL: &str = "payment";
    pub(in super::super) const COLUMN_IDX_ORDER_ID: usize = 0;

    pub(in super::super) struct UpdateArg<'a>(pub(in super::super) &'a PaymentModel);

    impl From<UpdateArg<'_>> for AppInMemFetchedSingleTable {
        fn from(value: UpdateArg<'_>) -> Self {
            let m = value.0;
            let row = vec![
                m.order_id.clone(),
                m.method.as_str().to_string(),
                m.amount.to_string(),
                m.transaction_id.clone().unwrap_or_default(),
                m.status.as_str().to_string(),
                m.refund_of.clone().unwrap_or_default(),
                opt_time_to_col(m.payment_time.as_ref()),
                m.create_time.to_rfc3339(),
            ];
            HashMap::from([(m.id_.clone(), row)])
        }
    }
} // end of inner-mod PaymentTable

fn corrupted(detail: String) -> AppError {
    AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(detail),
    }
}

impl TryFrom<(String, AppInMemFetchedSingleRow)> for PaymentModel {
    type Error = AppError;
    fn try_from(value: (String, AppInMemFetchedSingleRow)) -> DefaultResult<Self, Self::Error> {
        let (id_, row) = value;
        let mut row = row.into_iter();
        let order_id = take_column(&mut row, "order_id")?;
        let method = take_column(&mut row, "method")?
            .parse::<PaymentMethod>()
            .map_err(corrupted)?;
        let amount = parse_column("amount", take_column(&mut row, "amount")?.as_str())?;
        let transaction_id = opt_str_from_col(take_column(&mut row, "transaction_id")?);
        let status = take_column(&mut row, "status")?
            .parse::<PaymentStatus>()
            .map_err(corrupted)?;
        let refund_of = opt_str_from_col(take_column(&mut row, "refund_of")?);
        let payment_time =
            parse_opt_time("payment_time", take_column(&mut row, "payment_time")?.as_str())?;
        let create_time = parse_time("create_time", take_column(&mut row, "create_time")?.as_str())?;
        Ok(Self {
            id_,
            order_id,
            method,
            amount,
            transaction_id,
            status,
            refund_of,
            payment_time,
            create_time,
        })
    }
}

fn convert_rows(rows: AppInMemFetchedSingleTable) -> DefaultResult<Vec<PaymentModel>, AppError> {
    let mut out = rows
        .into_iter()
        .map(PaymentModel::try_from)
        .collect::<DefaultResult<Vec<_>, AppError>>()?;
    out.sort_by(|a, b| a.create_time.cmp(&b.create_time));
    Ok(out)
}

pub(super) fn load_payments_by_order(
    lock: &AppInMemDstoreLock,
    oid: &str,
) -> DefaultResult<Vec<PaymentModel>, AppError> {
    let op = ColumnValueFilter {
        idx: PaymentTable::COLUMN_IDX_ORDER_ID,
        value: oid.to_string(),
    };
    let keys = lock.filter_keys(PaymentTable::LABEL, &op)?;
    let info = HashMap::from([(PaymentTable::LABEL.to_string(), keys)]);
    let rows = lock
        .fetch(info)?
        .remove(PaymentTable::LABEL)
        .unwrap_or_default();
    convert_rows(rows)
}

fn load_payment(
    lock: &AppInMemDstoreLock,
    pid: &str,
) -> DefaultResult<PaymentModel, AppRepoError> {
    let info = HashMap::from([(PaymentTable::LABEL.to_string(), vec![pid.to_string()])]);
    let row = lock
        .fetch(info)?
        .remove(PaymentTable::LABEL)
        .and_then(|mut t| t.remove(pid))
        .ok_or(AppRepoError::NotExist(pid.to_string()))?;
    let out = PaymentModel::try_from((pid.to_string(), row))?;
    Ok(out)
}

pub struct PaymentInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl PaymentInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(PaymentTable::LABEL).await?;
        m.create_table(OrderTable::LABEL).await?;
        m.create_table(OrderItemTable::LABEL).await?;
        m.create_table(ArtistTxnTable::LABEL).await?;
        Ok(Self { datastore: m })
    }

    fn save_release_payment(
        &self,
        payment: &PaymentModel,
        lock: AppInMemDstoreLock,
    ) -> DefaultResult<(), AppError> {
        let rows: AppInMemFetchedSingleTable = PaymentTable::UpdateArg(payment).into();
        let data = HashMap::from([(PaymentTable::LABEL.to_string(), rows)]);
        let _num_saved = self.datastore.save_release(data, lock)?;
        Ok(())
    }
}

#[async_trait]
impl AbsPaymentRepo for PaymentInMemRepo {
    async fn create_charge(
        &self,
        oid: &str,
        method: PaymentMethod,
    ) -> DefaultResult<(PaymentModel, OrderModel), AppRepoError> {
        let (_empty, lock) = self.datastore.fetch_acquire(HashMap::new()).await?;
        let order = load_order(&lock, oid)?.ok_or(AppRepoError::NotExist(oid.to_string()))?;
        let existing = load_payments_by_order(&lock, oid)?;
        let payment = PaymentModel::try_new_charge(&order, &existing, method)?;
        self.save_release_payment(&payment, lock)?;
        Ok((payment, order))
    }

    async fn create_refund(
        &self,
        pid: &str,
    ) -> DefaultResult<(PaymentModel, PaymentModel), AppRepoError> {
        let (_empty, lock) = self.datastore.fetch_acquire(HashMap::new()).await?;
        let original = load_payment(&lock, pid)?;
        let oid = original.order_id.as_str();
        let order = load_order(&lock, oid)?.ok_or(AppRepoError::NotExist(oid.to_string()))?;
        let existing = load_payments_by_order(&lock, oid)?;
        let refund = PaymentModel::try_new_refund(&original, &order, &existing)?;
        self.save_release_payment(&refund, lock)?;
        Ok((refund, original))
    }

    async fn settle(
        &self,
        pid: &str,
        outcome: PaymentOutcome,
    ) -> DefaultResult<(PaymentModel, OrderModel), AppRepoError> {
        let (_empty, lock) = self.datastore.fetch_acquire(HashMap::new()).await?;
        let mut payment = load_payment(&lock, pid)?;
        let oid = payment.order_id.clone();
        let mut order =
            load_order(&lock, oid.as_str())?.ok_or(AppRepoError::NotExist(oid.clone()))?;
        let time = LocalTime::now().fixed_offset();
        payment.settle(outcome, time)?;
        let rows: AppInMemFetchedSingleTable = PaymentTable::UpdateArg(&payment).into();
        let mut data = HashMap::from([(PaymentTable::LABEL.to_string(), rows)]);
        if let Some(event) = payment.order_event() {
            order.apply(event)?;
            let entries = if payment.is_refund() {
                ArtistTransactionModel::from_settled_refund(&order, time)
            } else {
                ArtistTransactionModel::from_settled_charge(&order, time)
            };
            let (label, toplvl) = order_update_data(&order);
            data.insert(label, toplvl);
            data.insert(ArtistTxnTable::LABEL.to_string(), ArtistTxnTable::to_rows(&entries));
        }
        let _num_saved = self.datastore.save_release(data, lock)?;
        Ok((payment, order))
    } // end of fn settle

    async fn fetch(&self, pid: &str) -> DefaultResult<PaymentModel, AppRepoError> {
        let (_empty, lock) = self.datastore.fetch_acquire(HashMap::new()).await?;
        load_payment(&lock, pid)
    }

    async fn fetch_by_order(&self, oid: &str) -> DefaultResult<Vec<PaymentModel>, AppError> {
        let (_empty, lock) = self.datastore.fetch_acquire(HashMap::new()).await?;
        load_payments_by_order(&lock, oid)
    }
} // end of impl AbsPaymentRepo for PaymentInMemRepo

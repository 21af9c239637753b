use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::datastore::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemDstoreLock, AppInMemFetchedSingleRow,
    AppInMemFetchedSingleTable, AppInMemUpdateData,
};
use crate::error::{AppError, AppErrorCode};
use crate::model::{
    OrderEvent, OrderItemModel, OrderModel, OrderStatus, PaymentMethod, ShippingAddressModel,
};
use crate::repository::{AbsOrderRepo, AppOrderRepoUpdateUserFunc, AppRepoError};

use super::{
    opt_str_from_col, opt_time_to_col, parse_column, parse_opt_time, parse_time, take_column,
    KeyPrefixFilter,
};

enum InMemColIdx {
    Owner,
    Status,
}

impl From<InMemColIdx> for usize {
    fn from(value: InMemColIdx) -> usize {
        match value {
            InMemColIdx::Owner => 1,
            InMemColIdx::Status => 2,
        }
    }
}

#[allow(non_snake_case)]
pub(super) mod OrderTable {
    use super::{AppInMemFetchedSingleRow, OrderModel};
    use super::{money_col, opt_time_to_col};

    pub(in super::super) const LABEL: &str = "order_toplvl";

    pub(in super::super) fn to_row(m: &OrderModel) -> AppInMemFetchedSingleRow {
        let addr = &m.shipping_address;
        vec![
            m.order_number.clone(),
            m.owner.to_string(),
            m.status.as_str().to_string(),
            money_col(&m.total_amount),
            money_col(&m.shipping_fee),
            money_col(&m.discount_amount),
            money_col(&m.final_amount),
            addr.recipient.clone(),
            addr.country.clone(),
            addr.region.clone(),
            addr.city.clone(),
            addr.street.clone(),
            addr.postal_code.clone(),
            m.contact_name.clone(),
            m.contact_phone.clone(),
            m.notes.clone(),
            m.payment_method
                .map(|v| v.as_str().to_string())
                .unwrap_or_default(),
            opt_time_to_col(m.payment_time.as_ref()),
            opt_time_to_col(m.shipping_time.as_ref()),
            opt_time_to_col(m.delivery_time.as_ref()),
            m.create_time.to_rfc3339(),
            m.update_time.to_rfc3339(),
        ]
    }
} // end of inner-mod OrderTable

#[allow(non_snake_case)]
pub(super) mod OrderItemTable {
    use super::{money_col, AppInMemFetchedSingleTable, OrderModel};

    pub(in super::super) const LABEL: &str = "order_item";

    pub(in super::super) fn key_prefix(oid: &str) -> String {
        format!("{oid}-")
    }

    pub(in super::super) fn to_rows(m: &OrderModel) -> AppInMemFetchedSingleTable {
        m.items
            .iter()
            .map(|item| {
                let key = format!("{}{}", key_prefix(m.id_.as_str()), item.product_id);
                let row = vec![
                    item.artist_id.to_string(),
                    item.quantity.to_string(),
                    money_col(&item.unit_price),
                    money_col(&item.total_price),
                ];
                (key, row)
            })
            .collect()
    }
} // end of inner-mod OrderItemTable

#[allow(non_snake_case)]
mod OrderNumberTable {
    pub(super) const LABEL: &str = "order_number";
}

fn money_col(value: &Decimal) -> String {
    value.to_string()
}

fn item_from_row(key: String, row: AppInMemFetchedSingleRow) -> DefaultResult<OrderItemModel, AppError> {
    let product_id = key.rsplit('-').next().unwrap_or("");
    let mut row = row.into_iter();
    Ok(OrderItemModel {
        product_id: parse_column("product_id", product_id)?,
        artist_id: parse_column("artist_id", take_column(&mut row, "artist_id")?.as_str())?,
        quantity: parse_column("quantity", take_column(&mut row, "quantity")?.as_str())?,
        unit_price: parse_column("unit_price", take_column(&mut row, "unit_price")?.as_str())?,
        total_price: parse_column("total_price", take_column(&mut row, "total_price")?.as_str())?,
    })
}

fn order_from_row(
    oid: String,
    row: AppInMemFetchedSingleRow,
    mut items: Vec<OrderItemModel>,
) -> DefaultResult<OrderModel, AppError> {
    let mut row = row.into_iter();
    let mut next = |label: &str| take_column(&mut row, label);
    let order_number = next("order_number")?;
    let owner = parse_column::<u32>("owner", next("owner")?.as_str())?;
    let status = next("status")?;
    let status = status.parse::<OrderStatus>().map_err(|detail| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(detail),
    })?;
    let total_amount = parse_column::<Decimal>("total_amount", next("total_amount")?.as_str())?;
    let shipping_fee = parse_column::<Decimal>("shipping_fee", next("shipping_fee")?.as_str())?;
    let discount_amount =
        parse_column::<Decimal>("discount_amount", next("discount_amount")?.as_str())?;
    let final_amount = parse_column::<Decimal>("final_amount", next("final_amount")?.as_str())?;
    let shipping_address = ShippingAddressModel {
        recipient: next("recipient")?,
        country: next("country")?,
        region: next("region")?,
        city: next("city")?,
        street: next("street")?,
        postal_code: next("postal_code")?,
    };
    let contact_name = next("contact_name")?;
    let contact_phone = next("contact_phone")?;
    let notes = next("notes")?;
    let payment_method = match opt_str_from_col(next("payment_method")?) {
        Some(s) => Some(s.parse::<PaymentMethod>().map_err(|detail| AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(detail),
        })?),
        None => None,
    };
    let payment_time = parse_opt_time("payment_time", next("payment_time")?.as_str())?;
    let shipping_time = parse_opt_time("shipping_time", next("shipping_time")?.as_str())?;
    let delivery_time = parse_opt_time("delivery_time", next("delivery_time")?.as_str())?;
    let create_time = parse_time("create_time", next("create_time")?.as_str())?;
    let update_time = parse_time("update_time", next("update_time")?.as_str())?;
    items.sort_by_key(|i| i.product_id);
    Ok(OrderModel {
        id_: oid,
        order_number,
        owner,
        status,
        total_amount,
        shipping_fee,
        discount_amount,
        final_amount,
        shipping_address,
        contact_name,
        contact_phone,
        notes,
        payment_method,
        payment_time,
        shipping_time,
        delivery_time,
        create_time,
        update_time,
        items,
    })
} // end of fn order_from_row

/// load order with all its items while the store is locked
pub(super) fn load_order(
    lock: &AppInMemDstoreLock,
    oid: &str,
) -> DefaultResult<Option<OrderModel>, AppError> {
    let op = KeyPrefixFilter(OrderItemTable::key_prefix(oid));
    let item_keys = lock.filter_keys(OrderItemTable::LABEL, &op)?;
    let info = HashMap::from([
        (OrderTable::LABEL.to_string(), vec![oid.to_string()]),
        (OrderItemTable::LABEL.to_string(), item_keys),
    ]);
    let mut fetched = lock.fetch(info)?;
    let toplvl = fetched
        .remove(OrderTable::LABEL)
        .and_then(|mut t| t.remove(oid));
    let row = match toplvl {
        Some(v) => v,
        None => {
            return Ok(None);
        }
    };
    let items = fetched
        .remove(OrderItemTable::LABEL)
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| item_from_row(k, v))
        .collect::<DefaultResult<Vec<_>, AppError>>()?;
    order_from_row(oid.to_string(), row, items).map(Some)
}

/// header row of the order for saving, items never change after creation
pub(super) fn order_update_data(order: &OrderModel) -> (String, AppInMemFetchedSingleTable) {
    let row = OrderTable::to_row(order);
    let table = HashMap::from([(order.id_.clone(), row)]);
    (OrderTable::LABEL.to_string(), table)
}

struct OwnerStatusFilter {
    owner: String,
    status: Option<String>,
}

impl AbsDStoreFilterKeyOp for OwnerStatusFilter {
    fn filter(&self, _k: &String, v: &Vec<String>) -> bool {
        let owner_idx: usize = InMemColIdx::Owner.into();
        let status_idx: usize = InMemColIdx::Status.into();
        let owner_match = v.get(owner_idx) == Some(&self.owner);
        let status_match = match self.status.as_ref() {
            Some(s) => v.get(status_idx) == Some(s),
            None => true,
        };
        owner_match && status_match
    }
}

pub struct OrderInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl OrderInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(OrderTable::LABEL).await?;
        m.create_table(OrderItemTable::LABEL).await?;
        m.create_table(OrderNumberTable::LABEL).await?;
        // payments are loaded with order in the same lock for cross-check
        m.create_table(super::payment::PaymentTable::LABEL).await?;
        Ok(Self { datastore: m })
    }
}

#[async_trait]
impl AbsOrderRepo for OrderInMemRepo {
    async fn create(&self, order: &OrderModel) -> DefaultResult<(), AppError> {
        let num = order.order_number.clone();
        let info = HashMap::from([(OrderNumberTable::LABEL.to_string(), vec![num.clone()])]);
        let (fetched, lock) = self.datastore.fetch_acquire(info).await?;
        let taken = fetched
            .get(OrderNumberTable::LABEL)
            .map(|t| !t.is_empty())
            .unwrap_or(false);
        if taken {
            return Err(AppError {
                code: AppErrorCode::DuplicateKey,
                detail: Some(format!("order-number:{num}")),
            });
        }
        let (label, toplvl) = order_update_data(order);
        let number_row = HashMap::from([(num, vec![order.id_.clone()])]);
        let data: AppInMemUpdateData = HashMap::from([
            (label, toplvl),
            (OrderItemTable::LABEL.to_string(), OrderItemTable::to_rows(order)),
            (OrderNumberTable::LABEL.to_string(), number_row),
        ]);
        let _num_saved = self.datastore.save_release(data, lock)?;
        Ok(())
    }

    async fn fetch(&self, oid: &str) -> DefaultResult<OrderModel, AppRepoError> {
        let (_empty, lock) = self.datastore.fetch_acquire(HashMap::new()).await?;
        let order = load_order(&lock, oid)?;
        order.ok_or(AppRepoError::NotExist(oid.to_string()))
    }

    async fn fetch_by_owner(
        &self,
        owner: u32,
        status: Option<OrderStatus>,
    ) -> DefaultResult<Vec<OrderModel>, AppError> {
        let op = OwnerStatusFilter {
            owner: owner.to_string(),
            status: status.map(|s| s.as_str().to_string()),
        };
        let (_empty, lock) = self.datastore.fetch_acquire(HashMap::new()).await?;
        let oids = lock.filter_keys(OrderTable::LABEL, &op)?;
        let mut out = Vec::with_capacity(oids.len());
        for oid in oids {
            if let Some(m) = load_order(&lock, oid.as_str())? {
                out.push(m);
            }
        }
        out.sort_by(|a, b| b.create_time.cmp(&a.create_time));
        Ok(out)
    }

    async fn transition(
        &self,
        oid: &str,
        event: OrderEvent,
        usr_cb: AppOrderRepoUpdateUserFunc,
    ) -> DefaultResult<OrderModel, AppRepoError> {
        let (_empty, lock) = self.datastore.fetch_acquire(HashMap::new()).await?;
        let mut order =
            load_order(&lock, oid)?.ok_or(AppRepoError::NotExist(oid.to_string()))?;
        let payments = super::payment::load_payments_by_order(&lock, oid)?;
        usr_cb(&mut order, event, &payments)?;
        let (label, toplvl) = order_update_data(&order);
        let data = HashMap::from([(label, toplvl)]);
        let _num_saved = self.datastore.save_release(data, lock)?;
        Ok(order)
    }
} // end of impl AbsOrderRepo for OrderInMemRepo

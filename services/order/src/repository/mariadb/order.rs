use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Acquire, Arguments, MySql, Row, Transaction};

use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};
use crate::model::{
    OrderEvent, OrderItemModel, OrderModel, OrderStatus, PaymentMethod, ShippingAddressModel,
};
use crate::repository::{AbsOrderRepo, AppOrderRepoUpdateUserFunc, AppRepoError};

use super::payment::load_payments_in_tx;
use super::{
    encode_error, fetch_all_in_tx, fetch_all_once, first_db, oid_from_row, oid_to_column,
    oid_to_column_or_absent, opt_time_from_row, parse_from_row, placeholders, run_query_once,
    time_from_row, time_to_column, SqlRawQuery,
};

const TOPLVL_COLUMN_SEQ: &str = "`o_id`,`order_number`,`usr_id`,`status`,`total_amount`,\
    `shipping_fee`,`discount_amount`,`final_amount`,`recipient`,`country`,`region`,`city`,\
    `street`,`postal_code`,`contact_name`,`contact_phone`,`notes`,`payment_method`,\
    `payment_time`,`shipping_time`,`delivery_time`,`created_at`,`updated_at`";
const ITEM_COLUMN_SEQ: &str =
    "`o_id`,`product_id`,`artist_id`,`quantity`,`unit_price`,`total_price`";

struct InsertTopLvlArg<'a>(&'a OrderModel);
struct InsertItemsArg<'a>(&'a OrderModel);
pub(super) struct UpdateTopLvlArg<'a>(pub(super) &'a OrderModel);

enum FetchTopLvlArg {
    ById { oid: Vec<u8>, for_update: bool },
    ByOwner { owner: u32, status: Option<OrderStatus> },
}
struct FetchItemsArg<'a>(&'a [Vec<u8>]);

struct TopLvlRow(MySqlRow);
struct ItemRow(MySqlRow);

impl TryFrom<InsertTopLvlArg<'_>> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: InsertTopLvlArg<'_>) -> DefaultResult<Self, Self::Error> {
        let m = value.0;
        let addr = &m.shipping_address;
        let patt = format!(
            "INSERT INTO `order_toplvl`({TOPLVL_COLUMN_SEQ}) VALUES ({})",
            placeholders(23, "?")
        );
        let mut args = MySqlArguments::default();
        args.add(oid_to_column(m.id_.as_str())?)
            .map_err(encode_error)?;
        args.add(m.order_number.as_str()).map_err(encode_error)?;
        args.add(m.owner).map_err(encode_error)?;
        args.add(m.status.as_str()).map_err(encode_error)?;
        args.add(m.total_amount).map_err(encode_error)?;
        args.add(m.shipping_fee).map_err(encode_error)?;
        args.add(m.discount_amount).map_err(encode_error)?;
        args.add(m.final_amount).map_err(encode_error)?;
        args.add(addr.recipient.as_str()).map_err(encode_error)?;
        args.add(addr.country.as_str()).map_err(encode_error)?;
        args.add(addr.region.as_str()).map_err(encode_error)?;
        args.add(addr.city.as_str()).map_err(encode_error)?;
        args.add(addr.street.as_str()).map_err(encode_error)?;
        args.add(addr.postal_code.as_str()).map_err(encode_error)?;
        args.add(m.contact_name.as_str()).map_err(encode_error)?;
        args.add(m.contact_phone.as_str()).map_err(encode_error)?;
        args.add(m.notes.as_str()).map_err(encode_error)?;
        args.add(m.payment_method.map(|v| v.as_str()))
            .map_err(encode_error)?;
        args.add(m.payment_time.as_ref().map(time_to_column))
            .map_err(encode_error)?;
        args.add(m.shipping_time.as_ref().map(time_to_column))
            .map_err(encode_error)?;
        args.add(m.delivery_time.as_ref().map(time_to_column))
            .map_err(encode_error)?;
        args.add(time_to_column(&m.create_time))
            .map_err(encode_error)?;
        args.add(time_to_column(&m.update_time))
            .map_err(encode_error)?;
        Ok((patt, args))
    }
}

impl TryFrom<InsertItemsArg<'_>> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: InsertItemsArg<'_>) -> DefaultResult<Self, Self::Error> {
        let m = value.0;
        let patt = format!(
            "INSERT INTO `order_item`({ITEM_COLUMN_SEQ}) VALUES {}",
            placeholders(m.items.len(), "(?,?,?,?,?,?)")
        );
        let oid = oid_to_column(m.id_.as_str())?;
        let mut args = MySqlArguments::default();
        for item in m.items.iter() {
            args.add(oid.clone()).map_err(encode_error)?;
            args.add(item.product_id).map_err(encode_error)?;
            args.add(item.artist_id).map_err(encode_error)?;
            args.add(item.quantity).map_err(encode_error)?;
            args.add(item.unit_price).map_err(encode_error)?;
            args.add(item.total_price).map_err(encode_error)?;
        }
        Ok((patt, args))
    }
}

// only status and the time stamps change after the order is created
impl TryFrom<UpdateTopLvlArg<'_>> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: UpdateTopLvlArg<'_>) -> DefaultResult<Self, Self::Error> {
        let m = value.0;
        let patt = "UPDATE `order_toplvl` SET `status`=?,`payment_method`=?,`payment_time`=?,\
                    `shipping_time`=?,`delivery_time`=?,`updated_at`=? WHERE `o_id`=?";
        let mut args = MySqlArguments::default();
        args.add(m.status.as_str()).map_err(encode_error)?;
        args.add(m.payment_method.map(|v| v.as_str()))
            .map_err(encode_error)?;
        args.add(m.payment_time.as_ref().map(time_to_column))
            .map_err(encode_error)?;
        args.add(m.shipping_time.as_ref().map(time_to_column))
            .map_err(encode_error)?;
        args.add(m.delivery_time.as_ref().map(time_to_column))
            .map_err(encode_error)?;
        args.add(time_to_column(&m.update_time))
            .map_err(encode_error)?;
        args.add(oid_to_column(m.id_.as_str())?)
            .map_err(encode_error)?;
        Ok((patt.to_string(), args))
    }
}

impl TryFrom<FetchTopLvlArg> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: FetchTopLvlArg) -> DefaultResult<Self, Self::Error> {
        let mut args = MySqlArguments::default();
        let patt = match value {
            FetchTopLvlArg::ById { oid, for_update } => {
                args.add(oid).map_err(encode_error)?;
                let suffix = if for_update { " FOR UPDATE" } else { "" };
                format!("SELECT {TOPLVL_COLUMN_SEQ} FROM `order_toplvl` WHERE `o_id`=?{suffix}")
            }
            FetchTopLvlArg::ByOwner { owner, status } => {
                args.add(owner).map_err(encode_error)?;
                let cond = if let Some(s) = status {
                    args.add(s.as_str()).map_err(encode_error)?;
                    " AND `status`=?"
                } else {
                    ""
                };
                format!(
                    "SELECT {TOPLVL_COLUMN_SEQ} FROM `order_toplvl` WHERE `usr_id`=?{cond} \
                     ORDER BY `created_at` DESC"
                )
            }
        };
        Ok((patt, args))
    }
}

impl TryFrom<FetchItemsArg<'_>> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: FetchItemsArg<'_>) -> DefaultResult<Self, Self::Error> {
        let oids = value.0;
        let patt = format!(
            "SELECT {ITEM_COLUMN_SEQ} FROM `order_item` WHERE `o_id` IN ({}) \
             ORDER BY `product_id` ASC",
            placeholders(oids.len(), "?")
        );
        let mut args = MySqlArguments::default();
        for oid in oids {
            args.add(oid.as_slice()).map_err(encode_error)?;
        }
        Ok((patt, args))
    }
}

impl TryFrom<ItemRow> for (String, OrderItemModel) {
    type Error = AppError;
    fn try_from(value: ItemRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        let oid = oid_from_row(&row, 0)?;
        let item = OrderItemModel {
            product_id: row.try_get::<u64, usize>(1)?,
            artist_id: row.try_get::<u32, usize>(2)?,
            quantity: row.try_get::<u32, usize>(3)?,
            unit_price: row.try_get::<Decimal, usize>(4)?,
            total_price: row.try_get::<Decimal, usize>(5)?,
        };
        Ok((oid, item))
    }
}

impl TryFrom<TopLvlRow> for OrderModel {
    type Error = AppError;
    fn try_from(value: TopLvlRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        let shipping_address = ShippingAddressModel {
            recipient: row.try_get::<String, usize>(8)?,
            country: row.try_get::<String, usize>(9)?,
            region: row.try_get::<String, usize>(10)?,
            city: row.try_get::<String, usize>(11)?,
            street: row.try_get::<String, usize>(12)?,
            postal_code: row.try_get::<String, usize>(13)?,
        };
        let payment_method = match row.try_get::<Option<String>, usize>(17)? {
            Some(s) => Some(s.parse::<PaymentMethod>().map_err(|detail| AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(detail),
            })?),
            None => None,
        };
        Ok(Self {
            id_: oid_from_row(&row, 0)?,
            order_number: row.try_get::<String, usize>(1)?,
            owner: row.try_get::<u32, usize>(2)?,
            status: parse_from_row::<OrderStatus>(&row, 3)?,
            total_amount: row.try_get::<Decimal, usize>(4)?,
            shipping_fee: row.try_get::<Decimal, usize>(5)?,
            discount_amount: row.try_get::<Decimal, usize>(6)?,
            final_amount: row.try_get::<Decimal, usize>(7)?,
            shipping_address,
            contact_name: row.try_get::<String, usize>(14)?,
            contact_phone: row.try_get::<String, usize>(15)?,
            notes: row.try_get::<String, usize>(16)?,
            payment_method,
            payment_time: opt_time_from_row(&row, 18)?,
            shipping_time: opt_time_from_row(&row, 19)?,
            delivery_time: opt_time_from_row(&row, 20)?,
            create_time: time_from_row(&row, 21)?,
            update_time: time_from_row(&row, 22)?,
            items: Vec::new(),
        })
    }
}

fn attach_items(
    orders: &mut [OrderModel],
    item_rows: Vec<MySqlRow>,
) -> DefaultResult<(), AppError> {
    let mut grouped: HashMap<String, Vec<OrderItemModel>> = HashMap::new();
    for r in item_rows {
        let (oid, item) = <(String, OrderItemModel)>::try_from(ItemRow(r))?;
        grouped.entry(oid).or_default().push(item);
    }
    for o in orders.iter_mut() {
        o.items = grouped.remove(o.id_.as_str()).unwrap_or_default();
    }
    Ok(())
}

/// load order with its items in the transaction, the header row is
/// locked if `for_update` is set
pub(super) async fn load_order_in_tx(
    tx: &mut Transaction<'_, MySql>,
    oid: &str,
    for_update: bool,
) -> DefaultResult<Option<OrderModel>, AppRepoError> {
    let oid_b = oid_to_column_or_absent(oid)?;
    let arg = FetchTopLvlArg::ById {
        oid: oid_b.clone(),
        for_update,
    };
    let rows = fetch_all_in_tx(tx, arg.try_into()?).await?;
    let mut orders = rows
        .into_iter()
        .map(|r| OrderModel::try_from(TopLvlRow(r)))
        .collect::<DefaultResult<Vec<_>, AppError>>()?;
    if orders.is_empty() {
        return Ok(None);
    }
    let oids = [oid_b];
    let item_rows = fetch_all_in_tx(tx, FetchItemsArg(&oids).try_into()?).await?;
    attach_items(&mut orders, item_rows)?;
    Ok(orders.pop())
}

pub(crate) struct OrderMariaDbRepo {
    _db: Arc<AppMariaDbStore>,
}

impl OrderMariaDbRepo {
    pub(crate) fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let _db = first_db(dbs)?;
        Ok(Self { _db })
    }
}

#[async_trait]
impl AbsOrderRepo for OrderMariaDbRepo {
    async fn create(&self, order: &OrderModel) -> DefaultResult<(), AppError> {
        let sql_toplvl = SqlRawQuery::try_from(InsertTopLvlArg(order))?;
        let sql_items = SqlRawQuery::try_from(InsertItemsArg(order))?;
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;
        // unique index on order number reports `DuplicateKey`
        let _rs = run_query_once(&mut tx, sql_toplvl, Some(1)).await?;
        let _rs = run_query_once(&mut tx, sql_items, Some(order.items.len())).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch(&self, oid: &str) -> DefaultResult<OrderModel, AppRepoError> {
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await.map_err(AppError::from)?;
        let order = load_order_in_tx(&mut tx, oid, false).await?;
        tx.commit().await.map_err(AppError::from)?;
        order.ok_or(AppRepoError::NotExist(oid.to_string()))
    }

    async fn fetch_by_owner(
        &self,
        owner: u32,
        status: Option<OrderStatus>,
    ) -> DefaultResult<Vec<OrderModel>, AppError> {
        let arg = FetchTopLvlArg::ByOwner { owner, status };
        let rows = fetch_all_once(self._db.as_ref(), arg.try_into()?).await?;
        let mut orders = rows
            .into_iter()
            .map(|r| OrderModel::try_from(TopLvlRow(r)))
            .collect::<DefaultResult<Vec<_>, AppError>>()?;
        if orders.is_empty() {
            return Ok(orders);
        }
        let oids = orders
            .iter()
            .map(|o| oid_to_column(o.id_.as_str()))
            .collect::<DefaultResult<Vec<_>, AppError>>()?;
        let rawsql = SqlRawQuery::try_from(FetchItemsArg(&oids))?;
        let item_rows = fetch_all_once(self._db.as_ref(), rawsql).await?;
        attach_items(&mut orders, item_rows)?;
        Ok(orders)
    }

    async fn transition(
        &self,
        oid: &str,
        event: OrderEvent,
        usr_cb: AppOrderRepoUpdateUserFunc,
    ) -> DefaultResult<OrderModel, AppRepoError> {
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await.map_err(AppError::from)?;
        let mut order = load_order_in_tx(&mut tx, oid, true)
            .await?
            .ok_or(AppRepoError::NotExist(oid.to_string()))?;
        let payments = load_payments_in_tx(&mut tx, oid).await?;
        usr_cb(&mut order, event, &payments)?;
        let rawsql = SqlRawQuery::try_from(UpdateTopLvlArg(&order))?;
        let _rs = run_query_once(&mut tx, rawsql, Some(1)).await?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(order)
    }
} // end of impl OrderMariaDbRepo

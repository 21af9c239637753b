use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Acquire, Arguments, Row};

use crate::datastore::AppMariaDbStore;
use crate::error::AppError;
use crate::model::{CartLineModel, CartModelError};
use crate::repository::{AbsCartRepo, AppRepoError, CartLineFilter};

use super::{
    encode_error, fetch_all_in_tx, fetch_all_once, first_db, oid_from_row, oid_to_column,
    placeholders, run_query_once, time_from_row, time_to_column, SqlRawQuery,
};

const COLUMN_SEQ: &str = "`id`,`usr_id`,`product_id`,`quantity`,`created_at`";

struct FetchByOwnerArg {
    owner: u32,
    for_update: bool,
}
struct InsertLineArg<'a>(&'a CartLineModel);
struct UpdateQtyArg<'a>(&'a CartLineModel);
struct DiscardArg(u32, CartLineFilter);
struct CartLineRow(MySqlRow);

impl TryFrom<FetchByOwnerArg> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: FetchByOwnerArg) -> DefaultResult<Self, Self::Error> {
        let suffix = if value.for_update { " FOR UPDATE" } else { "" };
        let patt = format!(
            "SELECT {COLUMN_SEQ} FROM `cart_line` WHERE `usr_id`=? \
             ORDER BY `created_at` ASC{suffix}"
        );
        let mut args = MySqlArguments::default();
        args.add(value.owner).map_err(encode_error)?;
        Ok((patt, args))
    }
}

impl TryFrom<InsertLineArg<'_>> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: InsertLineArg<'_>) -> DefaultResult<Self, Self::Error> {
        let m = value.0;
        let patt = format!("INSERT INTO `cart_line`({COLUMN_SEQ}) VALUES (?,?,?,?,?)");
        let mut args = MySqlArguments::default();
        args.add(oid_to_column(m.id_.as_str())?)
            .map_err(encode_error)?;
        args.add(m.owner).map_err(encode_error)?;
        args.add(m.product_id).map_err(encode_error)?;
        args.add(m.quantity).map_err(encode_error)?;
        args.add(time_to_column(&m.create_time))
            .map_err(encode_error)?;
        Ok((patt, args))
    }
}

impl TryFrom<UpdateQtyArg<'_>> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: UpdateQtyArg<'_>) -> DefaultResult<Self, Self::Error> {
        let m = value.0;
        let patt = "UPDATE `cart_line` SET `quantity`=? WHERE `id`=?";
        let mut args = MySqlArguments::default();
        args.add(m.quantity).map_err(encode_error)?;
        args.add(oid_to_column(m.id_.as_str())?)
            .map_err(encode_error)?;
        Ok((patt.to_string(), args))
    }
}

impl TryFrom<DiscardArg> for Option<SqlRawQuery> {
    type Error = AppError;
    fn try_from(value: DiscardArg) -> DefaultResult<Self, Self::Error> {
        let DiscardArg(owner, filter) = value;
        let mut args = MySqlArguments::default();
        args.add(owner).map_err(encode_error)?;
        let cond = match filter {
            CartLineFilter::All => String::new(),
            CartLineFilter::LineIds(ids) => {
                // malformed ID never matches any saved line
                let ids = ids
                    .iter()
                    .filter_map(|id| oid_to_column(id.as_str()).ok())
                    .collect::<Vec<_>>();
                if ids.is_empty() {
                    return Ok(None);
                }
                let cond = format!(" AND `id` IN ({})", placeholders(ids.len(), "?"));
                for id in ids {
                    args.add(id).map_err(encode_error)?;
                }
                cond
            }
            CartLineFilter::ProductIds(pids) => {
                if pids.is_empty() {
                    return Ok(None);
                }
                let cond = format!(" AND `product_id` IN ({})", placeholders(pids.len(), "?"));
                for pid in pids {
                    args.add(pid).map_err(encode_error)?;
                }
                cond
            }
        };
        let patt = format!("DELETE FROM `cart_line` WHERE `usr_id`=?{cond}");
        Ok(Some((patt, args)))
    }
}

impl TryFrom<CartLineRow> for CartLineModel {
    type Error = AppError;
    fn try_from(value: CartLineRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        Ok(Self {
            id_: oid_from_row(&row, 0)?,
            owner: row.try_get::<u32, usize>(1)?,
            product_id: row.try_get::<u64, usize>(2)?,
            quantity: row.try_get::<u32, usize>(3)?,
            create_time: time_from_row(&row, 4)?,
        })
    }
}

fn convert_rows(rows: Vec<MySqlRow>) -> DefaultResult<Vec<CartLineModel>, AppError> {
    rows.into_iter()
        .map(|r| CartLineModel::try_from(CartLineRow(r)))
        .collect()
}

pub(crate) struct CartMariaDbRepo {
    _db: Arc<AppMariaDbStore>,
}

impl CartMariaDbRepo {
    pub(crate) fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let _db = first_db(dbs)?;
        Ok(Self { _db })
    }
}

#[async_trait]
impl AbsCartRepo for CartMariaDbRepo {
    async fn fetch_lines(&self, owner: u32) -> DefaultResult<Vec<CartLineModel>, AppError> {
        let arg = FetchByOwnerArg {
            owner,
            for_update: false,
        };
        let rows = fetch_all_once(self._db.as_ref(), arg.try_into()?).await?;
        convert_rows(rows)
    }

    async fn add_line(
        &self,
        owner: u32,
        product_id: u64,
        quantity: i64,
        max_num_lines: u32,
    ) -> DefaultResult<CartLineModel, AppRepoError> {
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await.map_err(AppError::from)?;
        // lock all lines of the owner, concurrent additions are serialized
        let arg = FetchByOwnerArg {
            owner,
            for_update: true,
        };
        let rows = fetch_all_in_tx(&mut tx, arg.try_into()?).await?;
        let saved = convert_rows(rows)?;
        let num_lines = saved.len();
        let existing = saved.into_iter().find(|l| l.product_id == product_id);
        let (line, rawsql) = if let Some(mut line) = existing {
            line.increment(quantity)?;
            let rawsql = SqlRawQuery::try_from(UpdateQtyArg(&line))?;
            (line, rawsql)
        } else {
            let line = CartLineModel::try_new(owner, product_id, quantity)?;
            if num_lines >= max_num_lines as usize {
                let e = CartModelError::ExceedNumLines {
                    limit: max_num_lines,
                };
                return Err(e.into());
            }
            let rawsql = SqlRawQuery::try_from(InsertLineArg(&line))?;
            (line, rawsql)
        };
        let _rs = run_query_once(&mut tx, rawsql, Some(1)).await?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(line)
    } // end of fn add_line

    async fn set_quantity(
        &self,
        owner: u32,
        line_id: &str,
        quantity: i64,
    ) -> DefaultResult<CartLineModel, AppRepoError> {
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await.map_err(AppError::from)?;
        let arg = FetchByOwnerArg {
            owner,
            for_update: true,
        };
        let rows = fetch_all_in_tx(&mut tx, arg.try_into()?).await?;
        let mut line = convert_rows(rows)?
            .into_iter()
            .find(|line| line.id_.as_str() == line_id)
            .ok_or(AppRepoError::NotExist(line_id.to_string()))?;
        line.set_quantity(quantity)?;
        let rawsql = SqlRawQuery::try_from(UpdateQtyArg(&line))?;
        // same quantity leaves the row untouched
        let _rs = run_query_once(&mut tx, rawsql, None).await?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(line)
    }

    async fn discard(&self, owner: u32, filter: CartLineFilter) -> DefaultResult<usize, AppError> {
        let maybe_sql: Option<SqlRawQuery> = DiscardArg(owner, filter).try_into()?;
        let rawsql = match maybe_sql {
            Some(v) => v,
            None => {
                return Ok(0);
            }
        };
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;
        let rs = run_query_once(&mut tx, rawsql, None).await?;
        tx.commit().await?;
        Ok(rs.rows_affected() as usize)
    }
} // end of impl CartMariaDbRepo

use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Acquire, Arguments, Row};

use crate::datastore::AppMariaDbStore;
use crate::error::AppError;
use crate::model::{ProductPriceModel, ProductPriceModelSet};
use crate::repository::AbsProductPriceRepo;

use super::{
    encode_error, fetch_all_once, first_db, placeholders, run_query_once, time_from_row,
    time_to_column, SqlRawQuery,
};

struct FetchArg(Vec<u64>);
struct UpsertArg(ProductPriceModelSet);
struct PriceRow(MySqlRow);

impl TryFrom<FetchArg> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: FetchArg) -> DefaultResult<Self, Self::Error> {
        let ids = value.0;
        let patt = format!(
            "SELECT `product_id`,`artist_id`,`price`,`available`,`last_update` \
             FROM `product_price` WHERE `product_id` IN ({})",
            placeholders(ids.len(), "?")
        );
        let mut args = MySqlArguments::default();
        for id in ids {
            args.add(id).map_err(encode_error)?;
        }
        Ok((patt, args))
    }
}

impl TryFrom<UpsertArg> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: UpsertArg) -> DefaultResult<Self, Self::Error> {
        let items = value.0.items;
        let patt = format!(
            "INSERT INTO `product_price`(`product_id`,`artist_id`,`price`,`available`,\
             `last_update`) VALUES {} ON DUPLICATE KEY UPDATE `artist_id`=VALUES(`artist_id`),\
             `price`=VALUES(`price`),`available`=VALUES(`available`),\
             `last_update`=VALUES(`last_update`)",
            placeholders(items.len(), "(?,?,?,?,?)")
        );
        let mut args = MySqlArguments::default();
        for m in items {
            args.add(m.product_id).map_err(encode_error)?;
            args.add(m.artist_id).map_err(encode_error)?;
            args.add(m.price).map_err(encode_error)?;
            args.add(m.available).map_err(encode_error)?;
            args.add(time_to_column(&m.last_update))
                .map_err(encode_error)?;
        }
        Ok((patt, args))
    }
}

impl TryFrom<PriceRow> for ProductPriceModel {
    type Error = AppError;
    fn try_from(value: PriceRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        Ok(Self {
            product_id: row.try_get::<u64, usize>(0)?,
            artist_id: row.try_get::<u32, usize>(1)?,
            price: row.try_get::<rust_decimal::Decimal, usize>(2)?,
            available: row.try_get::<bool, usize>(3)?,
            last_update: time_from_row(&row, 4)?,
        })
    }
}

pub(crate) struct ProductPriceMariaDbRepo {
    _db: Arc<AppMariaDbStore>,
}

impl ProductPriceMariaDbRepo {
    pub(crate) fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let _db = first_db(dbs)?;
        Ok(Self { _db })
    }
}

#[async_trait]
impl AbsProductPriceRepo for ProductPriceMariaDbRepo {
    async fn fetch(&self, ids: Vec<u64>) -> DefaultResult<ProductPriceModelSet, AppError> {
        if ids.is_empty() {
            return Ok(ProductPriceModelSet::default());
        }
        let rawsql = SqlRawQuery::try_from(FetchArg(ids))?;
        let rows = fetch_all_once(self._db.as_ref(), rawsql).await?;
        let items = rows
            .into_iter()
            .map(|r| ProductPriceModel::try_from(PriceRow(r)))
            .collect::<DefaultResult<Vec<_>, AppError>>()?;
        Ok(ProductPriceModelSet { items })
    }

    async fn save(&self, updated: ProductPriceModelSet) -> DefaultResult<usize, AppError> {
        let num_saved = updated.items.len();
        if num_saved == 0 {
            return Ok(0);
        }
        let rawsql = SqlRawQuery::try_from(UpsertArg(updated))?;
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;
        let _rs = run_query_once(&mut tx, rawsql, None).await?;
        tx.commit().await?;
        Ok(num_saved)
    }
} // end of impl ProductPriceMariaDbRepo

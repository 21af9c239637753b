use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Acquire, Arguments, Row};

use crate::datastore::AppMariaDbStore;
use crate::error::AppError;
use crate::model::WishlistItemModel;
use crate::repository::{AbsWishlistRepo, AppRepoError};

use super::{
    encode_error, fetch_all_in_tx, fetch_all_once, first_db, run_query_once, time_from_row,
    time_to_column, SqlRawQuery,
};

struct InsertArg<'a>(&'a WishlistItemModel);
struct FetchArg {
    owner: u32,
    product_id: Option<u64>,
}
struct DeleteArg(u32, u64);
struct WishlistRow(MySqlRow);

impl TryFrom<InsertArg<'_>> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: InsertArg<'_>) -> DefaultResult<Self, Self::Error> {
        let m = value.0;
        let patt = "INSERT IGNORE INTO `wishlist_item`(`usr_id`,`product_id`,`created_at`) \
                    VALUES (?,?,?)";
        let mut args = MySqlArguments::default();
        args.add(m.owner).map_err(encode_error)?;
        args.add(m.product_id).map_err(encode_error)?;
        args.add(time_to_column(&m.create_time))
            .map_err(encode_error)?;
        Ok((patt.to_string(), args))
    }
}

impl TryFrom<FetchArg> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: FetchArg) -> DefaultResult<Self, Self::Error> {
        let mut args = MySqlArguments::default();
        args.add(value.owner).map_err(encode_error)?;
        let cond = if let Some(pid) = value.product_id {
            args.add(pid).map_err(encode_error)?;
            " AND `product_id`=?"
        } else {
            ""
        };
        let patt = format!(
            "SELECT `usr_id`,`product_id`,`created_at` FROM `wishlist_item` \
             WHERE `usr_id`=?{cond} ORDER BY `created_at` DESC"
        );
        Ok((patt, args))
    }
}

impl TryFrom<DeleteArg> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: DeleteArg) -> DefaultResult<Self, Self::Error> {
        let patt = "DELETE FROM `wishlist_item` WHERE `usr_id`=? AND `product_id`=?";
        let mut args = MySqlArguments::default();
        args.add(value.0).map_err(encode_error)?;
        args.add(value.1).map_err(encode_error)?;
        Ok((patt.to_string(), args))
    }
}

impl TryFrom<WishlistRow> for WishlistItemModel {
    type Error = AppError;
    fn try_from(value: WishlistRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        Ok(Self {
            owner: row.try_get::<u32, usize>(0)?,
            product_id: row.try_get::<u64, usize>(1)?,
            create_time: time_from_row(&row, 2)?,
        })
    }
}

pub(crate) struct WishlistMariaDbRepo {
    _db: Arc<AppMariaDbStore>,
}

impl WishlistMariaDbRepo {
    pub(crate) fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let _db = first_db(dbs)?;
        Ok(Self { _db })
    }
}

#[async_trait]
impl AbsWishlistRepo for WishlistMariaDbRepo {
    async fn add(
        &self,
        item: WishlistItemModel,
    ) -> DefaultResult<(WishlistItemModel, bool), AppError> {
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;
        let rs = run_query_once(&mut tx, InsertArg(&item).try_into()?, None).await?;
        let out = if rs.rows_affected() == 1 {
            (item, true)
        } else {
            let arg = FetchArg {
                owner: item.owner,
                product_id: Some(item.product_id),
            };
            let row = fetch_all_in_tx(&mut tx, arg.try_into()?)
                .await?
                .into_iter()
                .next()
                .ok_or(sqlx::Error::RowNotFound)?;
            (WishlistItemModel::try_from(WishlistRow(row))?, false)
        };
        tx.commit().await?;
        Ok(out)
    }

    async fn fetch(&self, owner: u32) -> DefaultResult<Vec<WishlistItemModel>, AppError> {
        let arg = FetchArg {
            owner,
            product_id: None,
        };
        let rows = fetch_all_once(self._db.as_ref(), arg.try_into()?).await?;
        rows.into_iter()
            .map(|r| WishlistItemModel::try_from(WishlistRow(r)))
            .collect()
    }

    async fn remove(&self, owner: u32, product_id: u64) -> DefaultResult<(), AppRepoError> {
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await.map_err(AppError::from)?;
        let rawsql = SqlRawQuery::try_from(DeleteArg(owner, product_id))?;
        let rs = run_query_once(&mut tx, rawsql, None).await?;
        tx.commit().await.map_err(AppError::from)?;
        if rs.rows_affected() == 0 {
            Err(AppRepoError::NotExist(format!("{owner}-{product_id}")))
        } else {
            Ok(())
        }
    }
} // end of impl WishlistMariaDbRepo

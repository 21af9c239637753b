use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use crate::datastore::AbstInMemoryDStore;
use crate::error::AppError;
use crate::model::WishlistItemModel;
use crate::repository::{AbsWishlistRepo, AppRepoError};

use super::{parse_column, parse_time, KeyPrefixFilter};

const TABLE_LABEL: &str = "wishlist_item";

fn pkey(owner: u32, product_id: u64) -> String {
    format!("{owner}-{product_id}")
}

fn to_model(key: String, row: Vec<String>) -> DefaultResult<WishlistItemModel, AppError> {
    let (owner, product_id) = key.split_once('-').unwrap_or((key.as_str(), ""));
    let raw_time = row.first().map(String::as_str).unwrap_or("");
    Ok(WishlistItemModel {
        owner: parse_column("owner", owner)?,
        product_id: parse_column("product_id", product_id)?,
        create_time: parse_time("create_time", raw_time)?,
    })
}

pub struct WishlistInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl WishlistInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }
}

#[async_trait]
impl AbsWishlistRepo for WishlistInMemRepo {
    async fn add(
        &self,
        item: WishlistItemModel,
    ) -> DefaultResult<(WishlistItemModel, bool), AppError> {
        let key = pkey(item.owner, item.product_id);
        let info = HashMap::from([(TABLE_LABEL.to_string(), vec![key.clone()])]);
        let (mut fetched, lock) = self.datastore.fetch_acquire(info).await?;
        let saved = fetched
            .remove(TABLE_LABEL)
            .and_then(|mut t| t.remove(key.as_str()));
        if let Some(row) = saved {
            return Ok((to_model(key, row)?, false));
        }
        let row = vec![item.create_time.to_rfc3339()];
        let data = HashMap::from([(TABLE_LABEL.to_string(), HashMap::from([(key, row)]))]);
        let _num_saved = self.datastore.save_release(data, lock)?;
        Ok((item, true))
    }

    async fn fetch(&self, owner: u32) -> DefaultResult<Vec<WishlistItemModel>, AppError> {
        let op = KeyPrefixFilter(format!("{owner}-"));
        let keys = self.datastore.filter_keys(TABLE_LABEL.to_string(), &op).await?;
        let info = HashMap::from([(TABLE_LABEL.to_string(), keys)]);
        let rows = self
            .datastore
            .fetch(info)
            .await?
            .remove(TABLE_LABEL)
            .unwrap_or_default();
        let mut items = rows
            .into_iter()
            .map(|(k, v)| to_model(k, v))
            .collect::<DefaultResult<Vec<_>, AppError>>()?;
        items.sort_by(|a, b| b.create_time.cmp(&a.create_time));
        Ok(items)
    }

    async fn remove(&self, owner: u32, product_id: u64) -> DefaultResult<(), AppRepoError> {
        let key = pkey(owner, product_id);
        let info = HashMap::from([(TABLE_LABEL.to_string(), vec![key.clone()])]);
        let num_deleted = self.datastore.delete(info).await?;
        if num_deleted == 0 {
            Err(AppRepoError::NotExist(key))
        } else {
            Ok(())
        }
    }
}

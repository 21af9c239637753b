use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use crate::datastore::{
    AbstInMemoryDStore, AppInMemDstoreLock, AppInMemFetchedSingleRow, AppInMemFetchedSingleTable,
};
use crate::error::AppError;
use crate::model::{CartLineModel, CartModelError};
use crate::repository::{AbsCartRepo, AppRepoError, CartLineFilter};

use super::{parse_column, parse_time, take_column, KeyPrefixFilter};

#[allow(non_snake_case)]
mod CartLineTable {
    use super::{AppInMemFetchedSingleRow, AppInMemFetchedSingleTable, CartLineModel, HashMap};

    pub(super) const LABEL: &str = "cart_line";
    pub(super) struct UpdateArg<'a>(pub(super) &'a CartLineModel);

    // at most one line for each pair of owner and product
    pub(super) fn pkey(owner: u32, product_id: u64) -> String {
        format!("{owner}-{product_id}")
    }

    pub(super) fn owner_prefix(owner: u32) -> String {
        format!("{owner}-")
    }

    impl From<UpdateArg<'_>> for AppInMemFetchedSingleTable {
        fn from(value: UpdateArg<'_>) -> Self {
            let m = value.0;
            let row: AppInMemFetchedSingleRow = vec![
                m.id_.clone(),
                m.quantity.to_string(),
                m.create_time.to_rfc3339(),
            ];
            HashMap::from([(pkey(m.owner, m.product_id), row)])
        }
    }
} // end of inner-mod CartLineTable

impl TryFrom<(String, AppInMemFetchedSingleRow)> for CartLineModel {
    type Error = AppError;
    fn try_from(value: (String, AppInMemFetchedSingleRow)) -> DefaultResult<Self, Self::Error> {
        let (key, row) = value;
        let (owner, product_id) = key.split_once('-').unwrap_or((key.as_str(), ""));
        let owner = parse_column::<u32>("owner", owner)?;
        let product_id = parse_column::<u64>("product_id", product_id)?;
        let mut row = row.into_iter();
        let id_ = take_column(&mut row, "id")?;
        let quantity = parse_column::<u32>("quantity", take_column(&mut row, "quantity")?.as_str())?;
        let create_time = parse_time("create_time", take_column(&mut row, "create_time")?.as_str())?;
        Ok(Self {
            id_,
            owner,
            product_id,
            quantity,
            create_time,
        })
    }
}

pub struct CartInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl CartInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(CartLineTable::LABEL).await?;
        Ok(Self { datastore: m })
    }

    fn convert_rows(rows: AppInMemFetchedSingleTable) -> DefaultResult<Vec<CartLineModel>, AppError> {
        let mut lines = rows
            .into_iter()
            .map(CartLineModel::try_from)
            .collect::<DefaultResult<Vec<_>, AppError>>()?;
        lines.sort_by(|a, b| a.create_time.cmp(&b.create_time));
        Ok(lines)
    }

    fn save_line(
        &self,
        line: &CartLineModel,
        lock: AppInMemDstoreLock,
    ) -> DefaultResult<(), AppError> {
        let rows: AppInMemFetchedSingleTable = CartLineTable::UpdateArg(line).into();
        let data = HashMap::from([(CartLineTable::LABEL.to_string(), rows)]);
        let _num_saved = self.datastore.save_release(data, lock)?;
        Ok(())
    }
}

#[async_trait]
impl AbsCartRepo for CartInMemRepo {
    async fn fetch_lines(&self, owner: u32) -> DefaultResult<Vec<CartLineModel>, AppError> {
        let op = KeyPrefixFilter(CartLineTable::owner_prefix(owner));
        let keys = self
            .datastore
            .filter_keys(CartLineTable::LABEL.to_string(), &op)
            .await?;
        let info = HashMap::from([(CartLineTable::LABEL.to_string(), keys)]);
        let mut fetched = self.datastore.fetch(info).await?;
        let rows = fetched.remove(CartLineTable::LABEL).unwrap_or_default();
        Self::convert_rows(rows)
    }

    async fn add_line(
        &self,
        owner: u32,
        product_id: u64,
        quantity: i64,
        max_num_lines: u32,
    ) -> DefaultResult<CartLineModel, AppRepoError> {
        let key = CartLineTable::pkey(owner, product_id);
        let info = HashMap::from([(CartLineTable::LABEL.to_string(), vec![key.clone()])]);
        let (mut fetched, lock) = self.datastore.fetch_acquire(info).await?;
        let saved = fetched
            .remove(CartLineTable::LABEL)
            .and_then(|mut t| t.remove(key.as_str()));
        let line = if let Some(row) = saved {
            let mut line = CartLineModel::try_from((key, row))?;
            line.increment(quantity)?;
            line
        } else {
            let line = CartLineModel::try_new(owner, product_id, quantity)?;
            let op = KeyPrefixFilter(CartLineTable::owner_prefix(owner));
            let num_saved = lock.filter_keys(CartLineTable::LABEL, &op)?.len();
            if num_saved >= max_num_lines as usize {
                let e = CartModelError::ExceedNumLines {
                    limit: max_num_lines,
                };
                return Err(e.into());
            }
            line
        };
        self.save_line(&line, lock)?;
        Ok(line)
    } // end of fn add_line

    async fn set_quantity(
        &self,
        owner: u32,
        line_id: &str,
        quantity: i64,
    ) -> DefaultResult<CartLineModel, AppRepoError> {
        let (_empty, lock) = self.datastore.fetch_acquire(HashMap::new()).await?;
        let op = KeyPrefixFilter(CartLineTable::owner_prefix(owner));
        let keys = lock.filter_keys(CartLineTable::LABEL, &op)?;
        let info = HashMap::from([(CartLineTable::LABEL.to_string(), keys)]);
        let rows = lock
            .fetch(info)?
            .remove(CartLineTable::LABEL)
            .unwrap_or_default();
        let mut line = Self::convert_rows(rows)?
            .into_iter()
            .find(|line| line.id_.as_str() == line_id)
            .ok_or(AppRepoError::NotExist(line_id.to_string()))?;
        line.set_quantity(quantity)?;
        self.save_line(&line, lock)?;
        Ok(line)
    }

    async fn discard(&self, owner: u32, filter: CartLineFilter) -> DefaultResult<usize, AppError> {
        // lines added or removed concurrently are not missed between the read and the delete
        let (_empty, lock) = self.datastore.fetch_acquire(HashMap::new()).await?;
        let op = KeyPrefixFilter(CartLineTable::owner_prefix(owner));
        let keys = lock.filter_keys(CartLineTable::LABEL, &op)?;
        let info = HashMap::from([(CartLineTable::LABEL.to_string(), keys)]);
        let rows = lock
            .fetch(info)?
            .remove(CartLineTable::LABEL)
            .unwrap_or_default();
        let keys = Self::convert_rows(rows)?
            .into_iter()
            .filter(|line| match &filter {
                CartLineFilter::All => true,
                CartLineFilter::LineIds(ids) => ids.contains(&line.id_),
                CartLineFilter::ProductIds(pids) => pids.contains(&line.product_id),
            })
            .map(|line| CartLineTable::pkey(line.owner, line.product_id))
            .collect::<Vec<_>>();
        if keys.is_empty() {
            return Ok(0);
        }
        let info = HashMap::from([(CartLineTable::LABEL.to_string(), keys)]);
        lock.delete_release(info)
    }
} // end of impl AbsCartRepo for CartInMemRepo

use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::datastore::{AbstInMemoryDStore, AppInMemFetchedSingleRow, AppInMemFetchedSingleTable};
use crate::error::AppError;
use crate::model::{ProductPriceModel, ProductPriceModelSet};
use crate::repository::AbsProductPriceRepo;

use super::{parse_column, parse_time, take_column};

const TABLE_LABEL: &str = "product_price";

struct UpdateArg(ProductPriceModel);

impl From<UpdateArg> for (String, AppInMemFetchedSingleRow) {
    fn from(value: UpdateArg) -> Self {
        let m = value.0;
        let row = vec![
            m.artist_id.to_string(),
            m.price.to_string(),
            m.available.to_string(),
            m.last_update.to_rfc3339(),
        ];
        (m.product_id.to_string(), row)
    }
}

impl TryFrom<(String, AppInMemFetchedSingleRow)> for ProductPriceModel {
    type Error = AppError;
    fn try_from(value: (String, AppInMemFetchedSingleRow)) -> DefaultResult<Self, Self::Error> {
        let (key, row) = value;
        let mut row = row.into_iter();
        let product_id = parse_column::<u64>("product_id", key.as_str())?;
        let artist_id = parse_column::<u32>("artist_id", take_column(&mut row, "artist_id")?.as_str())?;
        let price = parse_column::<Decimal>("price", take_column(&mut row, "price")?.as_str())?;
        let available = parse_column::<bool>("available", take_column(&mut row, "available")?.as_str())?;
        let last_update = parse_time("last_update", take_column(&mut row, "last_update")?.as_str())?;
        Ok(Self {
            product_id,
            artist_id,
            price,
            available,
            last_update,
        })
    }
}

pub struct ProductPriceInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl ProductPriceInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }
}

#[async_trait]
impl AbsProductPriceRepo for ProductPriceInMemRepo {
    async fn fetch(&self, ids: Vec<u64>) -> DefaultResult<ProductPriceModelSet, AppError> {
        let keys = ids.iter().map(u64::to_string).collect::<Vec<_>>();
        let info = HashMap::from([(TABLE_LABEL.to_string(), keys)]);
        let mut fetched = self.datastore.fetch(info).await?;
        let rows = fetched.remove(TABLE_LABEL).unwrap_or_default();
        let items = rows
            .into_iter()
            .map(ProductPriceModel::try_from)
            .collect::<DefaultResult<Vec<_>, AppError>>()?;
        Ok(ProductPriceModelSet { items })
    }

    async fn save(&self, updated: ProductPriceModelSet) -> DefaultResult<usize, AppError> {
        let rows = updated
            .items
            .into_iter()
            .map(|m| UpdateArg(m).into())
            .collect::<AppInMemFetchedSingleTable>();
        let data = HashMap::from([(TABLE_LABEL.to_string(), rows)]);
        self.datastore.save(data).await
    }
}

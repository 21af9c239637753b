use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use crate::datastore::{AbstInMemoryDStore, AppInMemFetchedSingleRow, AppInMemFetchedSingleTable};
use crate::error::{AppError, AppErrorCode};
use crate::model::{ArtistTransactionKind, ArtistTransactionModel};
use crate::repository::AbsArtistLedgerRepo;

use super::{opt_str_from_col, parse_column, parse_time, take_column, ColumnValueFilter, KeyPrefixFilter};

#[allow(non_snake_case)]
pub(super) mod ArtistTxnTable {
    use super::{AppInMemFetchedSingleTable, ArtistTransactionModel};

    pub(in super::super) const LABEL: &str = "artist_transaction";
    pub(in super::super) const COLUMN_IDX_ARTIST_ID: usize = 0;

    pub(in super::super) fn to_rows(entries: &[ArtistTransactionModel]) -> AppInMemFetchedSingleTable {
        entries
            .iter()
            .map(|m| {
                let row = vec![
                    m.artist_id.to_string(),
                    m.kind.as_str().to_string(),
                    m.amount.to_string(),
                    m.description.clone(),
                    m.order_id.clone().unwrap_or_default(),
                    m.create_time.to_rfc3339(),
                ];
                (m.id_.clone(), row)
            })
            .collect()
    }
} // end of inner-mod ArtistTxnTable

impl TryFrom<(String, AppInMemFetchedSingleRow)> for ArtistTransactionModel {
    type Error = AppError;
    fn try_from(value: (String, AppInMemFetchedSingleRow)) -> DefaultResult<Self, Self::Error> {
        let (id_, row) = value;
        let mut row = row.into_iter();
        let artist_id = parse_column("artist_id", take_column(&mut row, "artist_id")?.as_str())?;
        let kind = take_column(&mut row, "kind")?
            .parse::<ArtistTransactionKind>()
            .map_err(|detail| AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(detail),
            })?;
        let amount = parse_column("amount", take_column(&mut row, "amount")?.as_str())?;
        let description = take_column(&mut row, "description")?;
        let order_id = opt_str_from_col(take_column(&mut row, "order_id")?);
        let create_time = parse_time("create_time", take_column(&mut row, "create_time")?.as_str())?;
        Ok(Self {
            id_,
            artist_id,
            kind,
            amount,
            description,
            order_id,
            create_time,
        })
    }
}

pub struct ArtistLedgerInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl ArtistLedgerInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(ArtistTxnTable::LABEL).await?;
        Ok(Self { datastore: m })
    }
}

#[async_trait]
impl AbsArtistLedgerRepo for ArtistLedgerInMemRepo {
    async fn fetch_by_artist(
        &self,
        artist_id: Option<u32>,
    ) -> DefaultResult<Vec<ArtistTransactionModel>, AppError> {
        let label = ArtistTxnTable::LABEL.to_string();
        let keys = if let Some(a) = artist_id {
            let op = ColumnValueFilter {
                idx: ArtistTxnTable::COLUMN_IDX_ARTIST_ID,
                value: a.to_string(),
            };
            self.datastore.filter_keys(label.clone(), &op).await?
        } else {
            let op = KeyPrefixFilter(String::new());
            self.datastore.filter_keys(label.clone(), &op).await?
        };
        let info = HashMap::from([(label, keys)]);
        let rows = self
            .datastore
            .fetch(info)
            .await?
            .remove(ArtistTxnTable::LABEL)
            .unwrap_or_default();
        let mut out = rows
            .into_iter()
            .map(ArtistTransactionModel::try_from)
            .collect::<DefaultResult<Vec<_>, AppError>>()?;
        // entries created in the same settlement share the same time
        out.sort_by(|a, b| b.create_time.cmp(&a.create_time).then(a.id_.cmp(&b.id_)));
        Ok(out)
    }
}

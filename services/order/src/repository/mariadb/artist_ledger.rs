use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Arguments, Row};

use crate::datastore::AppMariaDbStore;
use crate::error::AppError;
use crate::model::{ArtistTransactionKind, ArtistTransactionModel};
use crate::repository::AbsArtistLedgerRepo;

use super::{
    encode_error, fetch_all_once, first_db, oid_from_row, oid_to_column, opt_oid_from_row,
    opt_oid_to_column, parse_from_row, placeholders, time_from_row, time_to_column, SqlRawQuery,
};

const COLUMN_SEQ: &str = "`id`,`artist_id`,`kind`,`amount`,`description`,`o_id`,`created_at`";

pub(super) struct InsertEntriesArg<'a>(pub(super) &'a [ArtistTransactionModel]);
struct FetchArg(Option<u32>);
struct EntryRow(MySqlRow);

impl TryFrom<InsertEntriesArg<'_>> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: InsertEntriesArg<'_>) -> DefaultResult<Self, Self::Error> {
        let entries = value.0;
        let patt = format!(
            "INSERT INTO `artist_transaction`({COLUMN_SEQ}) VALUES {}",
            placeholders(entries.len(), "(?,?,?,?,?,?,?)")
        );
        let mut args = MySqlArguments::default();
        for m in entries {
            args.add(oid_to_column(m.id_.as_str())?)
                .map_err(encode_error)?;
            args.add(m.artist_id).map_err(encode_error)?;
            args.add(m.kind.as_str()).map_err(encode_error)?;
            args.add(m.amount).map_err(encode_error)?;
            args.add(m.description.as_str()).map_err(encode_error)?;
            args.add(opt_oid_to_column(m.order_id.as_ref())?)
                .map_err(encode_error)?;
            args.add(time_to_column(&m.create_time))
                .map_err(encode_error)?;
        }
        Ok((patt, args))
    }
}

impl TryFrom<FetchArg> for SqlRawQuery {
    type Error = AppError;
    fn try_from(value: FetchArg) -> DefaultResult<Self, Self::Error> {
        let mut args = MySqlArguments::default();
        let cond = if let Some(artist_id) = value.0 {
            args.add(artist_id).map_err(encode_error)?;
            "WHERE `artist_id`=? "
        } else {
            ""
        };
        let patt = format!(
            "SELECT {COLUMN_SEQ} FROM `artist_transaction` {cond}\
             ORDER BY `created_at` DESC, `artist_id` ASC"
        );
        Ok((patt, args))
    }
}

impl TryFrom<EntryRow> for ArtistTransactionModel {
    type Error = AppError;
    fn try_from(value: EntryRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        Ok(Self {
            id_: oid_from_row(&row, 0)?,
            artist_id: row.try_get::<u32, usize>(1)?,
            kind: parse_from_row::<ArtistTransactionKind>(&row, 2)?,
            amount: row.try_get::<Decimal, usize>(3)?,
            description: row.try_get::<String, usize>(4)?,
            order_id: opt_oid_from_row(&row, 5)?,
            create_time: time_from_row(&row, 6)?,
        })
    }
}

pub(crate) struct ArtistLedgerMariaDbRepo {
    _db: Arc<AppMariaDbStore>,
}

impl ArtistLedgerMariaDbRepo {
    pub(crate) fn new(dbs: &[Arc<AppMariaDbStore>]) -> DefaultResult<Self, AppError> {
        let _db = first_db(dbs)?;
        Ok(Self { _db })
    }
}

#[async_trait]
impl AbsArtistLedgerRepo for ArtistLedgerMariaDbRepo {
    async fn fetch_by_artist(
        &self,
        artist_id: Option<u32>,
    ) -> DefaultResult<Vec<ArtistTransactionModel>, AppError> {
        let rawsql = SqlRawQuery::try_from(FetchArg(artist_id))?;
        let rows = fetch_all_once(self._db.as_ref(), rawsql).await?;
        rows.into_iter()
            .map(|r| ArtistTransactionModel::try_from(EntryRow(r)))
            .collect()
    }
}

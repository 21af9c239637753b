use std::collections::BTreeMap;
use std::result::Result as DefaultResult;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;

use crate::api::web::dto::ArtistTransactionDto;
use crate::constant::ledger::COMMISSION_RATE_PERCENT;
use crate::generate_object_id;

use super::{money_to_string, round_money, OrderModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtistTransactionKind {
    Sale,
    Refund,
    Commission,
    Withdrawal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistTransactionModel {
    pub id_: String,
    pub artist_id: u32,
    pub kind: ArtistTransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub order_id: Option<String>,
    pub create_time: DateTime<FixedOffset>,
}

impl ArtistTransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Refund => "refund",
            Self::Commission => "commission",
            Self::Withdrawal => "withdrawal",
        }
    }
}

impl FromStr for ArtistTransactionKind {
    type Err = String;
    fn from_str(s: &str) -> DefaultResult<Self, Self::Err> {
        match s {
            "sale" => Ok(Self::Sale),
            "refund" => Ok(Self::Refund),
            "commission" => Ok(Self::Commission),
            "withdrawal" => Ok(Self::Withdrawal),
            _others => Err(format!("unknown-transaction-kind:{s}")),
        }
    }
}

impl ArtistTransactionModel {
    pub fn commission(gross: Decimal) -> Decimal {
        round_money(gross * Decimal::from(COMMISSION_RATE_PERCENT) / Decimal::ONE_HUNDRED)
    }

    // gross sale of each artist in the order, ordered by artist ID
    fn gross_per_artist(order: &OrderModel) -> BTreeMap<u32, Decimal> {
        order.items.iter().fold(BTreeMap::new(), |mut acc, item| {
            *acc.entry(item.artist_id).or_insert(Decimal::ZERO) += item.total_price;
            acc
        })
    }

    fn new_entry(
        order: &OrderModel,
        artist_id: u32,
        kind: ArtistTransactionKind,
        amount: Decimal,
        time: DateTime<FixedOffset>,
    ) -> Self {
        let description = match kind {
            ArtistTransactionKind::Commission => format!(
                "commission {}%, order {}",
                COMMISSION_RATE_PERCENT, order.order_number
            ),
            _others => format!("{}, order {}", kind.as_str(), order.order_number),
        };
        Self {
            id_: generate_object_id(),
            artist_id,
            kind,
            amount: round_money(amount),
            description,
            order_id: Some(order.id_.clone()),
            create_time: time,
        }
    }

    /// one sale entry and one (negative) commission entry per artist
    pub fn from_settled_charge(order: &OrderModel, time: DateTime<FixedOffset>) -> Vec<Self> {
        Self::gross_per_artist(order)
            .into_iter()
            .flat_map(|(artist_id, gross)| {
                let commission = Self::commission(gross);
                [
                    Self::new_entry(order, artist_id, ArtistTransactionKind::Sale, gross, time),
                    Self::new_entry(
                        order,
                        artist_id,
                        ArtistTransactionKind::Commission,
                        -commission,
                        time,
                    ),
                ]
            })
            .collect()
    }

    /// negated sale net of commission, one entry per artist
    pub fn from_settled_refund(order: &OrderModel, time: DateTime<FixedOffset>) -> Vec<Self> {
        Self::gross_per_artist(order)
            .into_iter()
            .map(|(artist_id, gross)| {
                let net = gross - Self::commission(gross);
                Self::new_entry(order, artist_id, ArtistTransactionKind::Refund, -net, time)
            })
            .collect()
    }
} // end of impl ArtistTransactionModel

impl From<ArtistTransactionModel> for ArtistTransactionDto {
    fn from(value: ArtistTransactionModel) -> Self {
        Self {
            id: value.id_,
            artist_id: value.artist_id,
            kind: value.kind.as_str().to_string(),
            amount: money_to_string(&value.amount),
            description: value.description,
            order_id: value.order_id,
            created_at: value.create_time,
        }
    }
}

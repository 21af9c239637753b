use std::collections::HashSet;
use std::result::Result as DefaultResult;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;

use crate::api::web::dto::{FieldErrorDto, FieldErrorReason, ProductPriceEditDto};
use crate::constant::hard_limit;

use super::parse_money;

// snapshot of catalog entry synced from the catalog owner, the only source
// of unit price and availability within this service
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPriceModel {
    pub product_id: u64,
    pub artist_id: u32,
    pub price: Decimal,
    pub available: bool,
    pub last_update: DateTime<FixedOffset>,
}

#[derive(Debug, Default)]
pub struct ProductPriceModelSet {
    pub items: Vec<ProductPriceModel>,
}

impl ProductPriceModelSet {
    pub fn find(&self, product_id: u64) -> Option<&ProductPriceModel> {
        self.items.iter().find(|m| m.product_id == product_id)
    }

    /// product IDs which cannot be resolved in this set
    pub fn missing(&self, product_ids: &[u64]) -> Vec<u64> {
        product_ids
            .iter()
            .filter(|pid| self.find(**pid).is_none())
            .copied()
            .collect()
    }

    pub fn try_from_dto(
        reqs: Vec<ProductPriceEditDto>,
        time: DateTime<FixedOffset>,
    ) -> DefaultResult<Self, Vec<FieldErrorDto>> {
        if reqs.is_empty() {
            let e = FieldErrorDto::new("items", FieldErrorReason::Empty);
            return Err(vec![e]);
        } else if reqs.len() > hard_limit::MAX_PRODUCT_PRICES_PER_REQUEST {
            let e = FieldErrorDto::new("items", FieldErrorReason::ExceedLimit);
            return Err(vec![e]);
        }
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(reqs.len());
        for (idx, req) in reqs.into_iter().enumerate() {
            if !seen.insert(req.product_id) {
                let field = format!("items[{idx}].product_id");
                errors.push(FieldErrorDto::new(&field, FieldErrorReason::Duplicate));
                continue;
            }
            let field = format!("items[{idx}].price");
            match parse_money(&field, req.price.as_str()) {
                Ok(price) => items.push(ProductPriceModel {
                    product_id: req.product_id,
                    artist_id: req.artist_id,
                    price,
                    available: req.available,
                    last_update: time,
                }),
                Err(e) => errors.push(e),
            }
        }
        if errors.is_empty() {
            Ok(Self { items })
        } else {
            Err(errors)
        }
    } // end of fn try_from_dto
} // end of impl ProductPriceModelSet

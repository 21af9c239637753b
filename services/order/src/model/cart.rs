use std::result::Result as DefaultResult;

use chrono::{DateTime, FixedOffset, Local as LocalTime};
use rust_decimal::Decimal;

use crate::api::web::dto::CartLineDto;
use crate::constant::hard_limit::MAX_QUANTITY_PER_LINE;
use crate::generate_object_id;

use super::{money_to_string, money_within_limit, ProductPriceModel, ProductPriceModelSet};

#[derive(Debug, Clone, PartialEq)]
pub enum CartModelError {
    NonPositiveQuantity(i64),
    ExceedQuantityLimit { given: u64, limit: u32 },
    ExceedNumLines { limit: u32 },
}

// single (owner, product) pair in a cart, repeated additions of the same
// product are merged into the same line
#[derive(Debug, Clone, PartialEq)]
pub struct CartLineModel {
    pub id_: String,
    pub owner: u32,
    pub product_id: u64,
    pub quantity: u32,
    pub create_time: DateTime<FixedOffset>,
}

impl CartLineModel {
    pub fn try_new(owner: u32, product_id: u64, quantity: i64) -> DefaultResult<Self, CartModelError> {
        let quantity = Self::check_quantity(quantity, 0)?;
        Ok(Self {
            id_: generate_object_id(),
            owner,
            product_id,
            quantity,
            create_time: LocalTime::now().fixed_offset(),
        })
    }

    pub fn increment(&mut self, quantity: i64) -> DefaultResult<(), CartModelError> {
        self.quantity = Self::check_quantity(quantity, self.quantity)?;
        Ok(())
    }

    // zero or negative quantity means removal, which is up to callers
    pub fn set_quantity(&mut self, quantity: i64) -> DefaultResult<(), CartModelError> {
        self.quantity = Self::check_quantity(quantity, 0)?;
        Ok(())
    }

    fn check_quantity(given: i64, base: u32) -> DefaultResult<u32, CartModelError> {
        if given <= 0 {
            return Err(CartModelError::NonPositiveQuantity(given));
        }
        let total = (given as u64).saturating_add(base as u64);
        if total > MAX_QUANTITY_PER_LINE as u64 {
            Err(CartModelError::ExceedQuantityLimit {
                given: total,
                limit: MAX_QUANTITY_PER_LINE,
            })
        } else {
            Ok(total as u32)
        }
    }

    /// `None` if the result exceeds the upper bound of money
    pub fn line_total(&self, price: &ProductPriceModel) -> Option<Decimal> {
        price
            .price
            .checked_mul(Decimal::from(self.quantity))
            .filter(money_within_limit)
    }

    /// sum of line totals with live catalog prices, lines whose product
    /// no longer exists in the catalog are skipped
    pub fn total(lines: &[Self], prices: &ProductPriceModelSet) -> Option<Decimal> {
        lines
            .iter()
            .filter_map(|line| prices.find(line.product_id).map(|p| line.line_total(p)))
            .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(t?))
            .filter(money_within_limit)
    }

    pub fn to_dto(&self, price: Option<&ProductPriceModel>) -> CartLineDto {
        CartLineDto {
            id: self.id_.clone(),
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: price.map(|p| money_to_string(&p.price)),
            line_total: price
                .and_then(|p| self.line_total(p))
                .map(|t| money_to_string(&t)),
            created_at: self.create_time,
        }
    }
} // end of impl CartLineModel

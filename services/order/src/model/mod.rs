mod artist_ledger;
mod cart;
mod order;
mod payment;
mod product_price;
mod wishlist;

use std::result::Result as DefaultResult;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

pub use artist_ledger::{ArtistTransactionKind, ArtistTransactionModel};
pub use cart::{CartLineModel, CartModelError};
pub use order::{
    OrderEvent, OrderItemModel, OrderModel, OrderModelError, OrderStatus, ShippingAddressModel,
};
pub use payment::{
    PaymentMethod, PaymentModel, PaymentModelError, PaymentOutcome, PaymentStatus,
};
pub use product_price::{ProductPriceModel, ProductPriceModelSet};
pub use wishlist::WishlistItemModel;

use crate::api::web::dto::{FieldErrorDto, FieldErrorReason};
use crate::constant::hard_limit::MAX_MONEY_AMOUNT;
use crate::constant::ledger::MONEY_FRACTION_DIGITS;

// parse non-negative amount of money with at most 2 fractional digits,
// below the upper bound of all stored amounts
pub(crate) fn parse_money(field: &str, raw: &str) -> DefaultResult<Decimal, FieldErrorDto> {
    let value = Decimal::from_str(raw.trim())
        .map_err(|_e| FieldErrorDto::new(field, FieldErrorReason::InvalidFormat))?;
    if value.scale() > MONEY_FRACTION_DIGITS {
        Err(FieldErrorDto::new(field, FieldErrorReason::InvalidFormat))
    } else if value.is_sign_negative() && !value.is_zero() {
        Err(FieldErrorDto::new(field, FieldErrorReason::Negative))
    } else if !money_within_limit(&value) {
        Err(FieldErrorDto::new(field, FieldErrorReason::ExceedLimit))
    } else {
        Ok(round_money(value))
    }
}

pub(crate) fn money_within_limit(value: &Decimal) -> bool {
    value.abs() < Decimal::from(MAX_MONEY_AMOUNT)
}

pub(crate) fn round_money(value: Decimal) -> Decimal {
    let mut out =
        value.round_dp_with_strategy(MONEY_FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero);
    // keep `-0.00` out of serialized output
    if out.is_zero() {
        out.set_sign_positive(true);
    }
    out.rescale(MONEY_FRACTION_DIGITS);
    out
}

pub(crate) fn money_to_string(value: &Decimal) -> String {
    round_money(*value).to_string()
}

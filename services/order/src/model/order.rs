use std::collections::HashSet;
use std::fmt::Display;
use std::result::Result as DefaultResult;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local as LocalTime};
use rust_decimal::Decimal;

use marketplace_common::util::validate_phone_number;

use crate::api::web::dto::{
    FieldErrorDto, FieldErrorReason, OrderCreateReqDto, OrderDto, OrderItemDto, OrderItemReqDto,
    ShippingAddressDto,
};
use crate::constant::{hard_limit, order_number};
use crate::generate_object_id;

use super::{
    money_to_string, money_within_limit, parse_money, PaymentMethod, ProductPriceModel,
    ProductPriceModelSet,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone)]
pub enum OrderEvent {
    PaymentSucceeded {
        method: PaymentMethod,
        time: DateTime<FixedOffset>,
    },
    Advance {
        target: OrderStatus,
        time: DateTime<FixedOffset>,
    },
    RefundIssued {
        time: DateTime<FixedOffset>,
    },
    Cancel {
        time: DateTime<FixedOffset>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderModelError {
    Validation(Vec<FieldErrorDto>),
    ProductNotFound(Vec<u64>),
    InvalidTransition {
        from: OrderStatus,
        event: &'static str,
    },
    // another payment of the order has not been settled yet
    PaymentInProgress(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShippingAddressModel {
    pub recipient: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub street: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemModel {
    pub product_id: u64,
    pub artist_id: u32,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderModel {
    pub id_: String,
    pub order_number: String,
    pub owner: u32,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub shipping_fee: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub shipping_address: ShippingAddressModel,
    pub contact_name: String,
    pub contact_phone: String,
    pub notes: String,
    pub payment_method: Option<PaymentMethod>,
    pub payment_time: Option<DateTime<FixedOffset>>,
    pub shipping_time: Option<DateTime<FixedOffset>>,
    pub delivery_time: Option<DateTime<FixedOffset>>,
    pub create_time: DateTime<FixedOffset>,
    pub update_time: DateTime<FixedOffset>,
    pub items: Vec<OrderItemModel>,
}

impl OrderStatus {
    // position in the main lifecycle, side branches have none
    fn stage(&self) -> Option<u8> {
        match self {
            Self::PendingPayment => Some(0),
            Self::Paid => Some(1),
            Self::Processing => Some(2),
            Self::Shipped => Some(3),
            Self::Delivered => Some(4),
            Self::Completed => Some(5),
            Self::Cancelled | Self::Refunded => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// status reached after the event, `None` if the event is not allowed
    /// in current status
    pub fn next(&self, event: &OrderEvent) -> Option<Self> {
        match (self, event) {
            (Self::PendingPayment, OrderEvent::PaymentSucceeded { .. }) => Some(Self::Paid),
            (Self::PendingPayment, OrderEvent::Cancel { .. }) => Some(Self::Cancelled),
            (_, OrderEvent::Advance { target, .. }) => {
                let (curr, tgt) = (self.stage()?, target.stage()?);
                if curr >= 1 && tgt > curr {
                    Some(*target)
                } else {
                    None
                }
            }
            (_, OrderEvent::RefundIssued { .. }) => match self.stage() {
                Some(curr) if curr >= 1 => Some(Self::Refunded),
                _others => None,
            },
            _others => None,
        }
    }
} // end of impl OrderStatus

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;
    fn from_str(s: &str) -> DefaultResult<Self, Self::Err> {
        let out = match s {
            "pending_payment" => Self::PendingPayment,
            "paid" => Self::Paid,
            "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            _others => {
                return Err(format!("unknown-order-status:{s}"));
            }
        };
        Ok(out)
    }
}

impl OrderEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PaymentSucceeded { .. } => "payment-succeeded",
            Self::Advance { .. } => "advance",
            Self::RefundIssued { .. } => "refund-issued",
            Self::Cancel { .. } => "cancel",
        }
    }

    fn time(&self) -> DateTime<FixedOffset> {
        match self {
            Self::PaymentSucceeded { time, .. }
            | Self::Advance { time, .. }
            | Self::RefundIssued { time }
            | Self::Cancel { time } => *time,
        }
    }
}

impl TryFrom<ShippingAddressDto> for ShippingAddressModel {
    type Error = Vec<FieldErrorDto>;
    fn try_from(value: ShippingAddressDto) -> DefaultResult<Self, Self::Error> {
        let required = [
            ("shipping_address.recipient", value.recipient.as_str()),
            ("shipping_address.country", value.country.as_str()),
            ("shipping_address.city", value.city.as_str()),
            ("shipping_address.street", value.street.as_str()),
        ];
        let mut errors = required
            .into_iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(field, _)| FieldErrorDto::new(field, FieldErrorReason::Empty))
            .collect::<Vec<_>>();
        #[rustfmt::skip]
        let bounded = [
            ("shipping_address.recipient", value.recipient.as_str(), hard_limit::MAX_LEN_ADDR_RECIPIENT),
            ("shipping_address.country", value.country.as_str(), hard_limit::MAX_LEN_ADDR_COUNTRY),
            ("shipping_address.region", value.region.as_str(), hard_limit::MAX_LEN_ADDR_REGION),
            ("shipping_address.city", value.city.as_str(), hard_limit::MAX_LEN_ADDR_CITY),
            ("shipping_address.street", value.street.as_str(), hard_limit::MAX_LEN_ADDR_STREET),
            ("shipping_address.postal_code", value.postal_code.as_str(), hard_limit::MAX_LEN_ADDR_POSTAL_CODE),
        ];
        bounded.into_iter().for_each(|(field, v, limit)| {
            check_text_length(field, v, limit, &mut errors);
        });
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self {
            recipient: value.recipient.trim().to_string(),
            country: value.country.trim().to_string(),
            region: value.region.trim().to_string(),
            city: value.city.trim().to_string(),
            street: value.street.trim().to_string(),
            postal_code: value.postal_code.trim().to_string(),
        })
    }
}

impl From<ShippingAddressModel> for ShippingAddressDto {
    fn from(value: ShippingAddressModel) -> Self {
        Self {
            recipient: value.recipient,
            country: value.country,
            region: value.region,
            city: value.city,
            street: value.street,
            postal_code: value.postal_code,
        }
    }
}

// length in characters after trimming, which is how the text is stored
fn check_text_length(field: &str, value: &str, limit: usize, errors: &mut Vec<FieldErrorDto>) {
    if value.trim().chars().count() > limit {
        errors.push(FieldErrorDto::new(field, FieldErrorReason::ExceedLimit));
    }
}

impl OrderItemModel {
    /// `None` if the line total does not fit the upper bound of money
    pub fn try_new(price: &ProductPriceModel, quantity: u32) -> Option<Self> {
        let total_price = price
            .price
            .checked_mul(Decimal::from(quantity))
            .filter(money_within_limit)?;
        Some(Self {
            product_id: price.product_id,
            artist_id: price.artist_id,
            quantity,
            unit_price: price.price,
            total_price,
        })
    }
}

impl From<OrderItemModel> for OrderItemDto {
    fn from(value: OrderItemModel) -> Self {
        Self {
            product_id: value.product_id,
            artist_id: value.artist_id,
            quantity: value.quantity,
            unit_price: money_to_string(&value.unit_price),
            total_price: money_to_string(&value.total_price),
        }
    }
}

impl OrderModel {
    pub fn try_build(
        owner: u32,
        req: OrderCreateReqDto,
        prices: &ProductPriceModelSet,
    ) -> DefaultResult<Self, OrderModelError> {
        let OrderCreateReqDto {
            items: req_items,
            shipping_address,
            contact_name,
            contact_phone,
            notes,
            shipping_fee,
            discount_amount,
        } = req;
        let mut errors = Self::check_item_requests(&req_items);
        let shipping_fee = Self::parse_optional_money("shipping_fee", shipping_fee, &mut errors);
        let discount_amount =
            Self::parse_optional_money("discount_amount", discount_amount, &mut errors);
        if contact_name.trim().is_empty() {
            errors.push(FieldErrorDto::new("contact_name", FieldErrorReason::Empty));
        }
        check_text_length(
            "contact_name",
            contact_name.as_str(),
            hard_limit::MAX_LEN_CONTACT_NAME,
            &mut errors,
        );
        if contact_phone.trim().is_empty() {
            errors.push(FieldErrorDto::new("contact_phone", FieldErrorReason::Empty));
        } else if contact_phone.trim().chars().count() > hard_limit::MAX_LEN_CONTACT_PHONE {
            errors.push(FieldErrorDto::new("contact_phone", FieldErrorReason::ExceedLimit));
        } else if validate_phone_number(contact_phone.trim()).is_err() {
            errors.push(FieldErrorDto::new(
                "contact_phone",
                FieldErrorReason::InvalidFormat,
            ));
        }
        if let Some(n) = notes.as_ref() {
            check_text_length("notes", n.as_str(), hard_limit::MAX_LEN_NOTES, &mut errors);
        }
        let shipping_address = match ShippingAddressModel::try_from(shipping_address) {
            Ok(v) => Some(v),
            Err(es) => {
                errors.extend(es);
                None
            }
        };
        if !errors.is_empty() {
            return Err(OrderModelError::Validation(errors));
        }
        let product_ids = req_items.iter().map(|r| r.product_id).collect::<Vec<_>>();
        let missing = prices.missing(&product_ids);
        if !missing.is_empty() {
            return Err(OrderModelError::ProductNotFound(missing));
        }
        let mut items = Vec::with_capacity(req_items.len());
        for (idx, r) in req_items.iter().enumerate() {
            match prices.find(r.product_id) {
                Some(p) if p.available => match OrderItemModel::try_new(p, r.quantity as u32) {
                    Some(item) => items.push(item),
                    None => {
                        let field = format!("items[{idx}].quantity");
                        errors.push(FieldErrorDto::new(&field, FieldErrorReason::ExceedLimit));
                    }
                },
                Some(_p) => {
                    let field = format!("items[{idx}].product_id");
                    errors.push(FieldErrorDto::new(&field, FieldErrorReason::Unavailable));
                }
                None => {
                    return Err(OrderModelError::ProductNotFound(vec![r.product_id]));
                }
            }
        }
        // both fields pass the parsing above once `errors` is empty
        let shipping_fee = shipping_fee.unwrap_or_default();
        let discount_amount = discount_amount.unwrap_or_default();
        let total_amount = items
            .iter()
            .try_fold(Decimal::ZERO, |acc, i| acc.checked_add(i.total_price))
            .filter(money_within_limit)
            .unwrap_or_else(|| {
                errors.push(FieldErrorDto::new("items", FieldErrorReason::ExceedLimit));
                Decimal::ZERO
            });
        let gross_amount = total_amount
            .checked_add(shipping_fee)
            .filter(money_within_limit);
        if gross_amount.is_none() {
            errors.push(FieldErrorDto::new("shipping_fee", FieldErrorReason::ExceedLimit));
        }
        if gross_amount.is_some_and(|g| discount_amount > g) {
            errors.push(FieldErrorDto::new(
                "discount_amount",
                FieldErrorReason::ExceedLimit,
            ));
        }
        let shipping_address = match shipping_address {
            Some(v) if errors.is_empty() => v,
            _others => {
                return Err(OrderModelError::Validation(errors));
            }
        };
        let timenow = LocalTime::now().fixed_offset();
        Ok(Self {
            id_: generate_object_id(),
            order_number: Self::generate_order_number(),
            owner,
            status: OrderStatus::PendingPayment,
            total_amount,
            shipping_fee,
            discount_amount,
            final_amount: gross_amount.unwrap_or_default() - discount_amount,
            shipping_address,
            contact_name: contact_name.trim().to_string(),
            contact_phone: contact_phone.trim().to_string(),
            notes: notes.map(|n| n.trim().to_string()).unwrap_or_default(),
            payment_method: None,
            payment_time: None,
            shipping_time: None,
            delivery_time: None,
            create_time: timenow,
            update_time: timenow,
            items,
        })
    } // end of fn try_build

    fn check_item_requests(reqs: &[OrderItemReqDto]) -> Vec<FieldErrorDto> {
        if reqs.is_empty() {
            return vec![FieldErrorDto::new("items", FieldErrorReason::Empty)];
        } else if reqs.len() > hard_limit::MAX_ITEMS_PER_ORDER {
            return vec![FieldErrorDto::new("items", FieldErrorReason::ExceedLimit)];
        }
        let mut seen = HashSet::new();
        let mut errors = Vec::new();
        for (idx, r) in reqs.iter().enumerate() {
            if r.quantity <= 0 {
                let field = format!("items[{idx}].quantity");
                errors.push(FieldErrorDto::new(&field, FieldErrorReason::NonPositive));
            } else if r.quantity > hard_limit::MAX_QUANTITY_PER_LINE as i64 {
                let field = format!("items[{idx}].quantity");
                errors.push(FieldErrorDto::new(&field, FieldErrorReason::ExceedLimit));
            }
            if !seen.insert(r.product_id) {
                let field = format!("items[{idx}].product_id");
                errors.push(FieldErrorDto::new(&field, FieldErrorReason::Duplicate));
            }
        }
        errors
    }

    fn parse_optional_money(
        field: &str,
        raw: Option<String>,
        errors: &mut Vec<FieldErrorDto>,
    ) -> Option<Decimal> {
        match raw {
            None => Some(Decimal::ZERO),
            Some(s) => match parse_money(field, s.as_str()) {
                Ok(v) => Some(v),
                Err(e) => {
                    errors.push(e);
                    None
                }
            },
        }
    }

    pub fn generate_order_number() -> String {
        let num = rand::random::<u32>();
        format!(
            "{}{:0width$X}",
            order_number::PREFIX,
            num,
            width = order_number::NUM_HEX_DIGITS
        )
    }

    pub fn is_valid_order_number(value: &str) -> bool {
        match value.strip_prefix(order_number::PREFIX) {
            Some(digits) => {
                digits.len() == order_number::NUM_HEX_DIGITS
                    && digits
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
            }
            None => false,
        }
    }

    // only applicable before the order is saved
    pub fn renew_order_number(&mut self) {
        self.order_number = Self::generate_order_number();
    }

    pub fn amounts_consistent(&self) -> bool {
        let total: Decimal = self.items.iter().map(|i| i.total_price).sum();
        let items_ok = self
            .items
            .iter()
            .all(|i| i.total_price == i.unit_price * Decimal::from(i.quantity));
        items_ok
            && total == self.total_amount
            && self.final_amount == self.total_amount + self.shipping_fee - self.discount_amount
            && !self.final_amount.is_sign_negative()
    }

    pub fn accepts(&self, event: &OrderEvent) -> bool {
        self.status.next(event).is_some()
    }

    pub fn apply(&mut self, event: OrderEvent) -> DefaultResult<(), OrderModelError> {
        let next = self
            .status
            .next(&event)
            .ok_or(OrderModelError::InvalidTransition {
                from: self.status,
                event: event.label(),
            })?;
        let time = event.time();
        match event {
            OrderEvent::PaymentSucceeded { method, time } => {
                self.payment_method = Some(method);
                self.payment_time = Some(time);
            }
            OrderEvent::Advance { target, time } => {
                // skipped stages stamp their fields as well
                let tgt = target.stage().unwrap_or(0);
                if tgt >= 3 && self.shipping_time.is_none() {
                    self.shipping_time = Some(time);
                }
                if tgt >= 4 && self.delivery_time.is_none() {
                    self.delivery_time = Some(time);
                }
            }
            OrderEvent::RefundIssued { .. } | OrderEvent::Cancel { .. } => {}
        }
        self.status = next;
        self.update_time = time;
        Ok(())
    }
} // end of impl OrderModel

impl From<OrderModel> for OrderDto {
    fn from(value: OrderModel) -> Self {
        Self {
            id: value.id_,
            order_number: value.order_number,
            owner: value.owner,
            status: value.status.to_string(),
            total_amount: money_to_string(&value.total_amount),
            shipping_fee: money_to_string(&value.shipping_fee),
            discount_amount: money_to_string(&value.discount_amount),
            final_amount: money_to_string(&value.final_amount),
            shipping_address: value.shipping_address.into(),
            contact_name: value.contact_name,
            contact_phone: value.contact_phone,
            notes: value.notes,
            payment_method: value.payment_method.map(|m| m.as_str().to_string()),
            payment_time: value.payment_time,
            shipping_time: value.shipping_time,
            delivery_time: value.delivery_time,
            created_at: value.create_time,
            updated_at: value.update_time,
            items: value.items.into_iter().map(OrderItemDto::from).collect(),
        }
    }
}

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// --- cart ---

#[derive(Deserialize, Serialize)]
pub struct CartLineAddReqDto {
    pub product_id: Option<u64>,
    pub quantity: Option<i64>,
}

#[derive(Deserialize, Serialize)]
pub struct CartLineQtyUpdateReqDto {
    pub quantity: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CartLineDto {
    pub id: String,
    pub product_id: u64,
    pub quantity: u32,
    // absent once the product disappears from catalog
    pub unit_price: Option<String>,
    pub line_total: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Deserialize, Serialize)]
pub struct CartTotalDto {
    pub total: String,
}

#[derive(Deserialize, Serialize)]
pub struct CartDiscardRespDto {
    pub num_removed: usize,
}

#[derive(Deserialize, Serialize)]
pub struct MessageRespDto {
    pub message: String,
}

// --- wishlist ---

#[derive(Deserialize, Serialize)]
pub struct WishlistAddReqDto {
    pub product_id: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct WishlistItemDto {
    pub product_id: u64,
    pub created_at: DateTime<FixedOffset>,
}

// --- order ---

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ShippingAddressDto {
    pub recipient: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub street: String,
    pub postal_code: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OrderItemReqDto {
    pub product_id: u64,
    pub quantity: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OrderCreateReqDto {
    pub items: Vec<OrderItemReqDto>,
    pub shipping_address: ShippingAddressDto,
    pub contact_name: String,
    pub contact_phone: String,
    pub notes: Option<String>,
    pub shipping_fee: Option<String>,
    pub discount_amount: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct OrderItemDto {
    pub product_id: u64,
    pub artist_id: u32,
    pub quantity: u32,
    pub unit_price: String,
    pub total_price: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct OrderDto {
    pub id: String,
    pub order_number: String,
    pub owner: u32,
    pub status: String,
    pub total_amount: String,
    pub shipping_fee: String,
    pub discount_amount: String,
    pub final_amount: String,
    pub shipping_address: ShippingAddressDto,
    pub contact_name: String,
    pub contact_phone: String,
    pub notes: String,
    pub payment_method: Option<String>,
    pub payment_time: Option<DateTime<FixedOffset>>,
    pub shipping_time: Option<DateTime<FixedOffset>>,
    pub delivery_time: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub items: Vec<OrderItemDto>,
}

#[derive(Deserialize, Serialize)]
pub struct OrderStatusUpdateReqDto {
    pub status: String,
}

#[derive(Deserialize, Serialize)]
pub struct OrderListQueryDto {
    pub status: Option<String>,
}

// --- payment ---

#[derive(Deserialize, Serialize)]
pub struct PaymentProcessReqDto {
    pub order_id: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct PaymentDto {
    pub id: String,
    pub order_id: String,
    pub payment_method: String,
    pub amount: String,
    pub transaction_id: Option<String>,
    pub status: String,
    pub refund_of: Option<String>,
    pub payment_time: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct PaymentProcessRespDto {
    pub payment: PaymentDto,
    pub order: OrderDto,
}

// --- artist ledger ---

#[derive(Deserialize, Serialize, Debug)]
pub struct ArtistTransactionDto {
    pub id: String,
    pub artist_id: u32,
    pub kind: String,
    pub amount: String,
    pub description: String,
    pub order_id: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

// --- catalog price ---

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProductPriceEditDto {
    pub product_id: u64,
    pub artist_id: u32,
    pub price: String,
    pub available: bool,
}

#[derive(Deserialize, Serialize)]
pub struct ProductPriceEditRespDto {
    pub num_saved: usize,
}

// --- errors ---

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum FieldErrorReason {
    Empty,
    Missing,
    NonPositive,
    Negative,
    InvalidFormat,
    InvalidChoice,
    Duplicate,
    ExceedLimit,
    Unavailable,
    NotExist,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FieldErrorDto {
    pub field: String,
    pub reason: FieldErrorReason,
}

impl FieldErrorDto {
    pub fn new(field: &str, reason: FieldErrorReason) -> Self {
        Self {
            field: field.to_string(),
            reason,
        }
    }
}

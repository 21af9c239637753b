use chrono::{DateTime, FixedOffset, Local as LocalTime};

use crate::api::web::dto::WishlistItemDto;

#[derive(Debug, Clone, PartialEq)]
pub struct WishlistItemModel {
    pub owner: u32,
    pub product_id: u64,
    pub create_time: DateTime<FixedOffset>,
}

impl WishlistItemModel {
    pub fn new(owner: u32, product_id: u64) -> Self {
        Self {
            owner,
            product_id,
            create_time: LocalTime::now().fixed_offset(),
        }
    }
}

impl From<WishlistItemModel> for WishlistItemDto {
    fn from(value: WishlistItemModel) -> Self {
        Self {
            product_id: value.product_id,
            created_at: value.create_time,
        }
    }
}

mod order;
mod payment;
mod product_price;

use marketplace_order::model::{OrderModel, ProductPriceModelSet};

use crate::{ut_order_req, ut_price_set};

pub(crate) fn ut_catalog() -> ProductPriceModelSet {
    ut_price_set(&[
        (101, 51, "100.00", true),
        (102, 52, "33.35", true),
        (103, 52, "9.90", false),
        (104, 53, "0.05", true),
    ])
}

pub(crate) fn ut_pending_order(owner: u32, items: &[(u64, i64)]) -> OrderModel {
    OrderModel::try_build(owner, ut_order_req(items), &ut_catalog()).unwrap()
}

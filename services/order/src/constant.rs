use crate::WebApiHdlrLabel;

pub mod app_meta {
    pub const LABEL: &str = "order";
    // embedded in every generated object ID, distinguishes instances of
    // this service which share the same data store
    pub const MACHINE_CODE: u8 = 1;
    pub const RESOURCE_QUOTA_AP_CODE: u8 = 4;
}

pub mod hard_limit {
    pub const MAX_ITEMS_STORED_PER_MODEL: u32 = 2200u32;
    pub const MAX_DB_CONNECTIONS: u32 = 10000u32;
    pub const MAX_SECONDS_DB_IDLE: u16 = 600u16;
    pub const MAX_ITEMS_PER_ORDER: usize = 100;
    pub const MAX_QUANTITY_PER_LINE: u32 = 9999;
    // applied when the authenticated claim carries no quota for cart lines
    pub const DEFAULT_MAX_CART_LINES: u32 = 50;
    pub const MAX_ORDER_NUMBER_ATTEMPTS: u8 = 5;
    pub const MAX_PRODUCT_PRICES_PER_REQUEST: usize = 200;
    // every amount of money stays below this bound, so it fits `DECIMAL(12,2)`
    pub const MAX_MONEY_AMOUNT: i64 = 10_000_000_000;
    // maximum number of characters in free-text fields of an order
    pub const MAX_LEN_CONTACT_NAME: usize = 64;
    pub const MAX_LEN_CONTACT_PHONE: usize = 32;
    pub const MAX_LEN_NOTES: usize = 512;
    pub const MAX_LEN_ADDR_RECIPIENT: usize = 64;
    pub const MAX_LEN_ADDR_COUNTRY: usize = 64;
    pub const MAX_LEN_ADDR_REGION: usize = 64;
    pub const MAX_LEN_ADDR_CITY: usize = 64;
    pub const MAX_LEN_ADDR_STREET: usize = 255;
    pub const MAX_LEN_ADDR_POSTAL_CODE: usize = 16;
}

pub mod order_number {
    pub const PREFIX: &str = "BL";
    pub const NUM_HEX_DIGITS: usize = 8;
}

pub mod transaction_prefix {
    pub const CHARGE: &str = "TX";
    pub const REFUND: &str = "RF";
}

pub mod ledger {
    // platform commission taken from every artist's gross sale, in percent
    pub const COMMISSION_RATE_PERCENT: u32 = 10;
    pub const MONEY_FRACTION_DIGITS: u32 = 2;
}

pub(crate) mod api {
    use super::WebApiHdlrLabel;

    #[allow(non_camel_case_types)]
    pub(crate) struct web {}

    impl web {
        pub(crate) const ADD_CART_LINE: WebApiHdlrLabel = "add_cart_line";
        pub(crate) const UPDATE_CART_LINE: WebApiHdlrLabel = "update_cart_line";
        pub(crate) const RETRIEVE_CART: WebApiHdlrLabel = "retrieve_cart";
        pub(crate) const CART_TOTAL: WebApiHdlrLabel = "cart_total";
        pub(crate) const DISCARD_CART: WebApiHdlrLabel = "discard_cart";
        pub(crate) const ADD_WISHLIST_ITEM: WebApiHdlrLabel = "add_wishlist_item";
        pub(crate) const RETRIEVE_WISHLIST: WebApiHdlrLabel = "retrieve_wishlist";
        pub(crate) const REMOVE_WISHLIST_ITEM: WebApiHdlrLabel = "remove_wishlist_item";
        pub(crate) const CREATE_NEW_ORDER: WebApiHdlrLabel = "create_new_order";
        pub(crate) const LIST_ORDERS_BY_STATUS: WebApiHdlrLabel = "list_orders_by_status";
        pub(crate) const ACCESS_EXISTING_ORDER: WebApiHdlrLabel = "access_existing_order";
        pub(crate) const CANCEL_ORDER: WebApiHdlrLabel = "cancel_order";
        pub(crate) const ADVANCE_ORDER_STATUS: WebApiHdlrLabel = "advance_order_status";
        pub(crate) const LIST_ORDER_PAYMENTS: WebApiHdlrLabel = "list_order_payments";
        pub(crate) const PROCESS_PAYMENT: WebApiHdlrLabel = "process_payment";
        pub(crate) const REFUND_PAYMENT: WebApiHdlrLabel = "refund_payment";
        pub(crate) const RECONCILE_PAYMENT: WebApiHdlrLabel = "reconcile_payment";
        pub(crate) const LIST_ARTIST_TRANSACTIONS: WebApiHdlrLabel = "list_artist_transactions";
        pub(crate) const UPDATE_PRODUCT_PRICE: WebApiHdlrLabel = "update_product_price";
    }
} // end of inner-mod api

pub(crate) const HTTP_CONTENT_TYPE_JSON: &str = "application/json";

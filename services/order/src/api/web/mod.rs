use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::routing::{delete, get, patch, post, put, MethodRouter};
use serde::Serialize;

use marketplace_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::constant::{api::web as WebConst, HTTP_CONTENT_TYPE_JSON};
use crate::usecase::AppUsKsError;
use crate::{AppSharedState, WebApiHdlrLabel};

use self::dto::{FieldErrorDto, FieldErrorReason};

mod artist_ledger;
mod cart;
pub mod dto;
mod error;
mod order;
mod payment;
mod product_price;
mod wishlist;

pub type ApiRouteType = MethodRouter<AppSharedState>;
pub type ApiRouteTableType = HashMap<WebApiHdlrLabel, ApiRouteType>;

pub(crate) type WebApiResponse = (StatusCode, HeaderMap, String);

pub fn route_table() -> ApiRouteTableType {
    let mut out: ApiRouteTableType = HashMap::new();
    out.insert(WebConst::ADD_CART_LINE, post(cart::add_line));
    out.insert(WebConst::UPDATE_CART_LINE, post(cart::update_quantity));
    out.insert(WebConst::RETRIEVE_CART, get(cart::retrieve));
    out.insert(WebConst::CART_TOTAL, get(cart::total));
    out.insert(WebConst::DISCARD_CART, delete(cart::discard));
    out.insert(WebConst::ADD_WISHLIST_ITEM, post(wishlist::add_item));
    out.insert(WebConst::RETRIEVE_WISHLIST, get(wishlist::retrieve));
    out.insert(WebConst::REMOVE_WISHLIST_ITEM, delete(wishlist::remove_item));
    out.insert(WebConst::CREATE_NEW_ORDER, post(order::create_handler));
    out.insert(WebConst::LIST_ORDERS_BY_STATUS, get(order::list_handler));
    out.insert(WebConst::ACCESS_EXISTING_ORDER, get(order::fetch_handler));
    out.insert(WebConst::CANCEL_ORDER, post(order::cancel_handler));
    out.insert(WebConst::ADVANCE_ORDER_STATUS, patch(order::advance_handler));
    out.insert(WebConst::LIST_ORDER_PAYMENTS, get(payment::list_by_order));
    out.insert(WebConst::PROCESS_PAYMENT, post(payment::process));
    out.insert(WebConst::REFUND_PAYMENT, post(payment::refund));
    out.insert(WebConst::RECONCILE_PAYMENT, post(payment::reconcile));
    out.insert(
        WebConst::LIST_ARTIST_TRANSACTIONS,
        get(artist_ledger::list_handler),
    );
    out.insert(
        WebConst::UPDATE_PRODUCT_PRICE,
        put(product_price::update_handler),
    );
    out
}

pub(crate) fn json_header() -> HeaderMap {
    let mut hdr_map = HeaderMap::new();
    hdr_map.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(HTTP_CONTENT_TYPE_JSON),
    );
    hdr_map
}

fn reply_json<T: Serialize>(
    status: StatusCode,
    body: &T,
    logctx: &Arc<AppLogContext>,
) -> WebApiResponse {
    match serde_json::to_string(body) {
        Ok(serialized) => (status, json_header(), serialized),
        Err(e) => {
            app_log_event!(logctx, AppLogLevel::ERROR, "serialize-response, {e}");
            let body = r#"{"reason":"internal-error"}"#.to_string();
            (StatusCode::INTERNAL_SERVER_ERROR, json_header(), body)
        }
    }
}

fn reply<T: Serialize>(
    status: StatusCode,
    result: DefaultResult<T, AppUsKsError>,
    logctx: &Arc<AppLogContext>,
) -> WebApiResponse {
    match result {
        Ok(v) => reply_json(status, &v, logctx),
        Err(e) => error::translate(e, logctx),
    }
}

// malformed json body or query string is reported in the same format as
// other validation errors
fn json_rejected(e: JsonRejection, logctx: &Arc<AppLogContext>) -> WebApiResponse {
    app_log_event!(logctx, AppLogLevel::DEBUG, "{e}");
    let field = FieldErrorDto::new("body", FieldErrorReason::InvalidFormat);
    error::translate(AppUsKsError::Validation(vec![field]), logctx)
}

fn query_rejected(e: QueryRejection, logctx: &Arc<AppLogContext>) -> WebApiResponse {
    app_log_event!(logctx, AppLogLevel::DEBUG, "{e}");
    let field = FieldErrorDto::new("query", FieldErrorReason::InvalidFormat);
    error::translate(AppUsKsError::Validation(vec![field]), logctx)
}

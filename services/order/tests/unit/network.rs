use std::sync::atomic::Ordering;

use axum::body::Body as AxumBody;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value as JsnVal};
use tower::ServiceExt;

use marketplace_order::api::web::route_table;
use marketplace_order::network::{app_web_service, middleware};
use marketplace_order::{AppAuthPermissionCode, AppSharedState};

use crate::auth::{ut_encode_token, UT_KEY_ID};
use crate::{ut_authed_claim, ut_default_shr_state, ut_shipping_address, EXAMPLE_REL_PATH};

const UT_CUSTOMER_ID: u32 = 1009;
const UT_STAFF_ID: u32 = 8;
const UT_CATALOG_ID: u32 = 3;

fn ut_router(shr_state: AppSharedState) -> Router {
    let cfg = shr_state.config().clone();
    let (router, num_applied) = app_web_service(&cfg.api_server.listen, route_table(), shr_state);
    // the route with unknown handler is skipped
    assert_eq!(num_applied, 12);
    router
}

fn ut_token(profile: u32, perms: Vec<AppAuthPermissionCode>) -> String {
    let claim = ut_authed_claim(profile, perms);
    ut_encode_token(&claim, Some(UT_KEY_ID))
}

async fn ut_send(
    router: &Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<String>,
) -> (StatusCode, JsnVal) {
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("/1.0.0{path}"))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let body = body.map(AxumBody::from).unwrap_or_else(AxumBody::empty);
    let req = builder.body(body).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let raw = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if raw.is_empty() {
        JsnVal::Null
    } else {
        serde_json::from_slice::<JsnVal>(&raw).unwrap()
    };
    (status, value)
}

async fn ut_sync_prices(router: &Router) {
    let token = ut_token(UT_CATALOG_ID, vec![AppAuthPermissionCode::can_edit_product_price]);
    let body = json!([
        {"product_id": 101, "artist_id": 51, "price": "100.00", "available": true},
        {"product_id": 102, "artist_id": 52, "price": "33.35", "available": true},
        {"product_id": 103, "artist_id": 52, "price": "9.90", "available": false},
    ]);
    let (status, value) = ut_send(
        router,
        Method::PUT,
        "/product/prices",
        Some(token.as_str()),
        Some(body.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["num_saved"], 3);
}

fn ut_order_body(items: JsnVal) -> String {
    json!({
        "items": items,
        "shipping_address": ut_shipping_address(),
        "contact_name": "Zhang Wei",
        "contact_phone": "+886912345678",
    })
    .to_string()
}

#[tokio::test]
async fn unauthenticated_request() {
    let router = ut_router(ut_default_shr_state());
    let (status, value) = ut_send(&router, Method::GET, "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(value["reason"], "authentication-failure");
    let (status, _value) =
        ut_send(&router, Method::GET, "/cart", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn price_sync_permission_denied() {
    let router = ut_router(ut_default_shr_state());
    let token = ut_token(UT_CUSTOMER_ID, vec![]);
    let body = json!([{"product_id": 101, "artist_id": 51, "price": "1.00", "available": true}]);
    let (status, value) = ut_send(
        &router,
        Method::PUT,
        "/product/prices",
        Some(token.as_str()),
        Some(body.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(value["reason"], "permission-denied");
}

#[tokio::test]
async fn cart_add_and_total() {
    let router = ut_router(ut_default_shr_state());
    ut_sync_prices(&router).await;
    let token = ut_token(UT_CUSTOMER_ID, vec![]);
    let tok = Some(token.as_str());
    let body = json!({"product_id": 102, "quantity": 3}).to_string();
    let (status, value) = ut_send(&router, Method::POST, "/cart/add", tok, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["quantity"], 3);
    assert_eq!(value["unit_price"], "33.35");
    assert_eq!(value["line_total"], "100.05");
    let (status, value) = ut_send(&router, Method::GET, "/cart/total", tok, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["total"], "100.05");
    // product absent from catalog, referenced in request body
    let body = json!({"product_id": 9999, "quantity": 1}).to_string();
    let (status, value) = ut_send(&router, Method::POST, "/cart/add", tok, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["reason"], "not-found");
    // nonexistent line referenced in URI path
    let body = json!({"quantity": 4}).to_string();
    let path = "/cart/update/0123456789abcdef0123456789abcdef";
    let (status, _value) = ut_send(&router, Method::POST, path, tok, Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_request_body() {
    let router = ut_router(ut_default_shr_state());
    let token = ut_token(UT_CUSTOMER_ID, vec![]);
    let tok = Some(token.as_str());
    let body = r#"{"items": [{"product_id": 101, "quantity"#.to_string();
    let (status, value) = ut_send(&router, Method::POST, "/orders", tok, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["reason"], "validation");
    assert_eq!(value["fields"][0]["field"], "body");
    let body = json!({"product_id": 101, "quantity": 0}).to_string();
    let (status, value) = ut_send(&router, Method::POST, "/cart/add", tok, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["fields"][0]["field"], "quantity");
    assert_eq!(value["fields"][0]["reason"], "NonPositive");
}

#[tokio::test]
async fn order_payment_refund_flow() {
    let router = ut_router(ut_default_shr_state());
    ut_sync_prices(&router).await;
    let token = ut_token(UT_CUSTOMER_ID, vec![]);
    let tok = Some(token.as_str());
    let body = ut_order_body(json!([{"product_id": 101, "quantity": 2}]));
    let (status, order) = ut_send(&router, Method::POST, "/orders", tok, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending_payment");
    assert_eq!(order["total_amount"], "200.00");
    assert_eq!(order["final_amount"], "200.00");
    let oid = order["id"].as_str().unwrap().to_string();

    // other customers cannot read the order
    let other = ut_token(UT_CUSTOMER_ID + 1, vec![]);
    let path = format!("/orders/{oid}");
    let (status, _v) = ut_send(&router, Method::GET, &path, Some(other.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let body = json!({"order_id": oid, "payment_method": "alipay"}).to_string();
    let (status, value) =
        ut_send(&router, Method::POST, "/payments/process", tok, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["order"]["status"], "paid");
    assert_eq!(value["payment"]["status"], "success");
    assert_eq!(value["payment"]["amount"], "200.00");
    let pid = value["payment"]["id"].as_str().unwrap().to_string();

    let path = format!("/payments/{pid}/refund");
    let (status, value) = ut_send(&router, Method::POST, &path, tok, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["amount"], "-200.00");
    assert_eq!(value["status"], "success");
    assert!(value["transaction_id"].as_str().unwrap().starts_with("RF"));

    let path = format!("/orders/{oid}");
    let (status, value) = ut_send(&router, Method::GET, &path, tok, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "refunded");
    // refunded order no longer accepts cancellation
    let path = format!("/orders/{oid}/cancel");
    let (status, value) = ut_send(&router, Method::POST, &path, tok, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["reason"], "invalid-state");
}

#[tokio::test]
async fn list_orders_require_status() {
    let router = ut_router(ut_default_shr_state());
    ut_sync_prices(&router).await;
    let token = ut_token(UT_CUSTOMER_ID, vec![]);
    let tok = Some(token.as_str());
    let body = ut_order_body(json!([{"product_id": 102, "quantity": 2}]));
    let (status, _order) = ut_send(&router, Method::POST, "/orders", tok, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, value) = ut_send(&router, Method::GET, "/orders", tok, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["fields"][0]["field"], "status");
    let path = "/orders?status=unpaid";
    let (status, value) = ut_send(&router, Method::GET, path, tok, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["fields"][0]["reason"], "InvalidChoice");
    let path = "/orders?status=pending_payment";
    let (status, value) = ut_send(&router, Method::GET, path, tok, None).await;
    assert_eq!(status, StatusCode::OK);
    let orders = value.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["total_amount"], "66.70");
    let path = "/orders?status=paid";
    let (_status, value) = ut_send(&router, Method::GET, path, tok, None).await;
    assert!(value.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn order_not_found() {
    let router = ut_router(ut_default_shr_state());
    let token = ut_token(UT_CUSTOMER_ID, vec![]);
    let tok = Some(token.as_str());
    let path = "/orders/0123456789abcdef0123456789abcdef";
    let (status, value) = ut_send(&router, Method::GET, path, tok, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value["resource"], "order");
    // the same identifier from request body
    let body = json!({
        "order_id": "0123456789abcdef0123456789abcdef", "payment_method": "wechat"
    })
    .to_string();
    let (status, _v) = ut_send(&router, Method::POST, "/payments/process", tok, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn advance_order_staff_only() {
    let router = ut_router(ut_default_shr_state());
    ut_sync_prices(&router).await;
    let token = ut_token(UT_CUSTOMER_ID, vec![]);
    let tok = Some(token.as_str());
    let body = ut_order_body(json!([{"product_id": 102, "quantity": 1}]));
    let (_status, order) = ut_send(&router, Method::POST, "/orders", tok, Some(body)).await;
    let oid = order["id"].as_str().unwrap().to_string();
    let path = format!("/orders/{oid}/status");
    let body = json!({"status": "shipped"}).to_string();
    let (status, _v) =
        ut_send(&router, Method::PATCH, &path, tok, Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let staff = ut_token(UT_STAFF_ID, vec![AppAuthPermissionCode::can_manage_order]);
    // unpaid order cannot be shipped
    let (status, value) =
        ut_send(&router, Method::PATCH, &path, Some(staff.as_str()), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["reason"], "invalid-state");
}

#[tokio::test]
async fn shutdown_rejects_new_requests() {
    let shr_state = ut_default_shr_state();
    let flag = shr_state.shutdown();
    let num_reqs = shr_state.num_requests();
    let router = ut_router(shr_state)
        .layer(middleware::ShutdownDetectionLayer::new(flag.clone(), num_reqs.clone()));
    let token = ut_token(UT_CUSTOMER_ID, vec![]);
    let (status, _v) = ut_send(&router, Method::GET, "/cart", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(num_reqs.load(Ordering::Relaxed), 0);
    flag.store(true, Ordering::Relaxed);
    let (status, value) =
        ut_send(&router, Method::GET, "/cart", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(value["reason"], "server-shutting-down");
}

#[test]
fn cors_from_file() {
    let path = env!("CARGO_MANIFEST_DIR").to_string() + EXAMPLE_REL_PATH + "cors.json";
    assert!(middleware::cors(path).is_ok());
    let path = env!("CARGO_MANIFEST_DIR").to_string() + EXAMPLE_REL_PATH + "nonexist.json";
    assert!(middleware::cors(path).is_err());
}

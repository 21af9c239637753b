use axum::debug_handler;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{
    Json as ExtractJson, Path as ExtractPath, Query as ExtractQuery, State as ExtractState,
};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::repository::{app_repo_cart, app_repo_order, app_repo_product_price};
use crate::usecase::{
    AdvanceOrderUseCase, AppUsKsError, CancelOrderUseCase, CreateOrderUseCase,
    FetchOrderUseCase, ListOrdersUseCase,
};
use crate::{AppAuthedClaim, AppSharedState};

use super::dto::{
    FieldErrorReason, OrderCreateReqDto, OrderListQueryDto, OrderStatusUpdateReqDto,
};
use super::{error, json_rejected, query_rejected, reply};

#[debug_handler(state = AppSharedState)]
pub(super) async fn create_handler(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    req_body: Result<ExtractJson<OrderCreateReqDto>, JsonRejection>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let req_body = match req_body {
        Ok(ExtractJson(v)) => v,
        Err(e) => return json_rejected(e, &logctx),
    };
    let ds = appstate.datastore();
    let result = async {
        let repo_order = app_repo_order(ds.clone()).await?;
        let repo_price = app_repo_product_price(ds.clone()).await?;
        let repo_cart = app_repo_cart(ds).await?;
        let uc = CreateOrderUseCase {
            repo_order,
            repo_price,
            repo_cart,
            authed_usr,
            log_ctx: logctx.clone(),
        };
        uc.execute(req_body).await
    }
    .await;
    reply(StatusCode::CREATED, result, &logctx)
} // end of fn create_handler

#[debug_handler(state = AppSharedState)]
pub(super) async fn list_handler(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    query: Result<ExtractQuery<OrderListQueryDto>, QueryRejection>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let status = match query {
        Ok(ExtractQuery(OrderListQueryDto { status: Some(s) })) => s,
        Ok(ExtractQuery(OrderListQueryDto { status: None })) => {
            let e = AppUsKsError::validation("status", FieldErrorReason::Missing);
            return error::translate(e, &logctx);
        }
        Err(e) => return query_rejected(e, &logctx),
    };
    let ds = appstate.datastore();
    let result = async {
        let repo_order = app_repo_order(ds).await?;
        let uc = ListOrdersUseCase {
            repo_order,
            authed_usr,
        };
        uc.execute(Some(status)).await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
} // end of fn list_handler

#[debug_handler(state = AppSharedState)]
pub(super) async fn fetch_handler(
    ExtractPath(oid): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let result = async {
        let repo_order = app_repo_order(ds).await?;
        let uc = FetchOrderUseCase {
            repo_order,
            authed_usr,
        };
        uc.execute(oid).await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
}

#[debug_handler(state = AppSharedState)]
pub(super) async fn cancel_handler(
    ExtractPath(oid): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let result = async {
        let repo_order = app_repo_order(ds).await?;
        let uc = CancelOrderUseCase {
            repo_order,
            authed_usr,
            log_ctx: logctx.clone(),
        };
        uc.execute(oid).await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
}

#[debug_handler(state = AppSharedState)]
pub(super) async fn advance_handler(
    ExtractPath(oid): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    req_body: Result<ExtractJson<OrderStatusUpdateReqDto>, JsonRejection>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let req_body = match req_body {
        Ok(ExtractJson(v)) => v,
        Err(e) => return json_rejected(e, &logctx),
    };
    let ds = appstate.datastore();
    let result = async {
        let repo_order = app_repo_order(ds).await?;
        let uc = AdvanceOrderUseCase {
            repo_order,
            authed_usr,
            log_ctx: logctx.clone(),
        };
        uc.execute(oid, req_body.status).await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
} // end of fn advance_handler

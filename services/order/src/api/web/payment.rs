use axum::debug_handler;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json as ExtractJson, Path as ExtractPath, State as ExtractState};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::repository::{app_repo_order, app_repo_payment};
use crate::usecase::{
    ListOrderPaymentsUseCase, ProcessPaymentUseCase, ReconcilePaymentUseCase,
    RefundPaymentUseCase,
};
use crate::{AppAuthedClaim, AppSharedState};

use super::dto::PaymentProcessReqDto;
use super::{json_rejected, reply};

#[debug_handler(state = AppSharedState)]
pub(super) async fn process(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    req_body: Result<ExtractJson<PaymentProcessReqDto>, JsonRejection>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let req_body = match req_body {
        Ok(ExtractJson(v)) => v,
        Err(e) => return json_rejected(e, &logctx),
    };
    let ds = appstate.datastore();
    let result = async {
        let repo_payment = app_repo_payment(ds.clone()).await?;
        let repo_order = app_repo_order(ds).await?;
        let uc = ProcessPaymentUseCase {
            repo_payment,
            repo_order,
            gateway: appstate.payment_gateway(),
            authed_usr,
            log_ctx: logctx.clone(),
        };
        uc.execute(req_body).await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
} // end of fn process

#[debug_handler(state = AppSharedState)]
pub(super) async fn refund(
    ExtractPath(pid): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let result = async {
        let repo_payment = app_repo_payment(ds.clone()).await?;
        let repo_order = app_repo_order(ds).await?;
        let uc = RefundPaymentUseCase {
            repo_payment,
            repo_order,
            gateway: appstate.payment_gateway(),
            authed_usr,
            log_ctx: logctx.clone(),
        };
        uc.execute(pid).await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
} // end of fn refund

#[debug_handler(state = AppSharedState)]
pub(super) async fn reconcile(
    ExtractPath(pid): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let result = async {
        let repo_payment = app_repo_payment(ds).await?;
        let uc = ReconcilePaymentUseCase {
            repo_payment,
            gateway: appstate.payment_gateway(),
            authed_usr,
            log_ctx: logctx.clone(),
        };
        uc.execute(pid).await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
}

#[debug_handler(state = AppSharedState)]
pub(super) async fn list_by_order(
    ExtractPath(oid): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let result = async {
        let repo_payment = app_repo_payment(ds.clone()).await?;
        let repo_order = app_repo_order(ds).await?;
        let uc = ListOrderPaymentsUseCase {
            repo_payment,
            repo_order,
            authed_usr,
        };
        uc.execute(oid).await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
}

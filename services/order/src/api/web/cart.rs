use axum::debug_handler;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json as ExtractJson, Path as ExtractPath, State as ExtractState};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::repository::{app_repo_cart, app_repo_product_price};
use crate::usecase::{
    AddCartLineUseCase, CartLineUpdateOutput, CartTotalUseCase, DiscardCartUseCase,
    RetrieveCartUseCase, UpdateCartLineUseCase,
};
use crate::{AppAuthedClaim, AppSharedState};

use super::dto::{
    CartDiscardRespDto, CartLineAddReqDto, CartLineQtyUpdateReqDto, MessageRespDto,
};
use super::{error, json_rejected, reply, reply_json};

#[debug_handler(state = AppSharedState)]
pub(super) async fn add_line(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    req_body: Result<ExtractJson<CartLineAddReqDto>, JsonRejection>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let req_body = match req_body {
        Ok(ExtractJson(v)) => v,
        Err(e) => return json_rejected(e, &logctx),
    };
    let ds = appstate.datastore();
    let result = async {
        let repo_cart = app_repo_cart(ds.clone()).await?;
        let repo_price = app_repo_product_price(ds).await?;
        let uc = AddCartLineUseCase {
            repo_cart,
            repo_price,
            authed_usr,
            log_ctx: logctx.clone(),
        };
        uc.execute(req_body).await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
} // end of fn add_line

#[debug_handler(state = AppSharedState)]
pub(super) async fn update_quantity(
    ExtractPath(line_id): ExtractPath<String>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    req_body: Result<ExtractJson<CartLineQtyUpdateReqDto>, JsonRejection>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let req_body = match req_body {
        Ok(ExtractJson(v)) => v,
        Err(e) => return json_rejected(e, &logctx),
    };
    let ds = appstate.datastore();
    let result = async {
        let repo_cart = app_repo_cart(ds.clone()).await?;
        let repo_price = app_repo_product_price(ds).await?;
        let uc = UpdateCartLineUseCase {
            repo_cart,
            repo_price,
            authed_usr,
        };
        uc.execute(line_id, req_body.quantity).await
    }
    .await;
    match result {
        Ok(CartLineUpdateOutput::Updated(line)) => reply_json(StatusCode::OK, &line, &logctx),
        Ok(CartLineUpdateOutput::Removed) => {
            let msg = MessageRespDto {
                message: "cart-line-removed".to_string(),
            };
            reply_json(StatusCode::OK, &msg, &logctx)
        }
        Err(e) => error::translate(e, &logctx),
    }
} // end of fn update_quantity

#[debug_handler(state = AppSharedState)]
pub(super) async fn retrieve(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let result = async {
        let repo_cart = app_repo_cart(ds.clone()).await?;
        let repo_price = app_repo_product_price(ds).await?;
        let uc = RetrieveCartUseCase {
            repo_cart,
            repo_price,
            authed_usr,
        };
        uc.execute().await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
}

#[debug_handler(state = AppSharedState)]
pub(super) async fn total(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let result = async {
        let repo_cart = app_repo_cart(ds.clone()).await?;
        let repo_price = app_repo_product_price(ds).await?;
        let uc = CartTotalUseCase {
            repo_cart,
            repo_price,
            authed_usr,
        };
        uc.execute().await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
}

#[debug_handler(state = AppSharedState)]
pub(super) async fn discard(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let result = async {
        let repo_cart = app_repo_cart(ds).await?;
        let uc = DiscardCartUseCase {
            repo_cart,
            authed_usr,
        };
        uc.execute().await
    }
    .await
    .map(|num_removed| CartDiscardRespDto { num_removed });
    reply(StatusCode::OK, result, &logctx)
}

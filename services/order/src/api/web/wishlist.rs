use axum::debug_handler;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json as ExtractJson, Path as ExtractPath, State as ExtractState};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::repository::{app_repo_product_price, app_repo_wishlist};
use crate::usecase::{
    AddWishlistItemUseCase, RemoveWishlistItemUseCase, RetrieveWishlistUseCase,
    WishlistAddOutput,
};
use crate::{AppAuthedClaim, AppSharedState};

use super::dto::{MessageRespDto, WishlistAddReqDto};
use super::{error, json_rejected, reply, reply_json};

#[debug_handler(state = AppSharedState)]
pub(super) async fn add_item(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    req_body: Result<ExtractJson<WishlistAddReqDto>, JsonRejection>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let req_body = match req_body {
        Ok(ExtractJson(v)) => v,
        Err(e) => return json_rejected(e, &logctx),
    };
    let ds = appstate.datastore();
    let result = async {
        let repo_wish = app_repo_wishlist(ds.clone()).await?;
        let repo_price = app_repo_product_price(ds).await?;
        let uc = AddWishlistItemUseCase {
            repo_wish,
            repo_price,
            authed_usr,
        };
        uc.execute(req_body).await
    }
    .await;
    match result {
        Ok(WishlistAddOutput::Created(item)) => reply_json(StatusCode::OK, &item, &logctx),
        Ok(WishlistAddOutput::AlreadyPresent(_item)) => {
            let msg = MessageRespDto {
                message: "already-present".to_string(),
            };
            reply_json(StatusCode::OK, &msg, &logctx)
        }
        Err(e) => error::translate(e, &logctx),
    }
} // end of fn add_item

#[debug_handler(state = AppSharedState)]
pub(super) async fn retrieve(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let result = async {
        let repo_wish = app_repo_wishlist(ds).await?;
        let uc = RetrieveWishlistUseCase {
            repo_wish,
            authed_usr,
        };
        uc.execute().await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
}

#[debug_handler(state = AppSharedState)]
pub(super) async fn remove_item(
    ExtractPath(product_id): ExtractPath<u64>,
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let result = async {
        let repo_wish = app_repo_wishlist(ds).await?;
        let uc = RemoveWishlistItemUseCase {
            repo_wish,
            authed_usr,
        };
        uc.execute(product_id).await
    }
    .await;
    match result {
        Ok(()) => (StatusCode::NO_CONTENT, HeaderMap::new(), String::new()),
        Err(e) => error::translate(e, &logctx),
    }
}

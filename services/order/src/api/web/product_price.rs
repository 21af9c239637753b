use axum::debug_handler;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json as ExtractJson, State as ExtractState};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::repository::app_repo_product_price;
use crate::usecase::EditProductPriceUseCase;
use crate::{AppAuthedClaim, AppSharedState};

use super::dto::ProductPriceEditDto;
use super::{json_rejected, reply};

// invoked by catalog service whenever artists change price or availability
#[debug_handler(state = AppSharedState)]
pub(super) async fn update_handler(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
    req_body: Result<ExtractJson<Vec<ProductPriceEditDto>>, JsonRejection>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let req_body = match req_body {
        Ok(ExtractJson(v)) => v,
        Err(e) => return json_rejected(e, &logctx),
    };
    let ds = appstate.datastore();
    let result = async {
        let repo = app_repo_product_price(ds).await?;
        let uc = EditProductPriceUseCase {
            repo,
            authed_usr,
            log_ctx: logctx.clone(),
        };
        uc.execute(req_body).await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
}

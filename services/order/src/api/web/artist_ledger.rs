use axum::debug_handler;
use axum::extract::State as ExtractState;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::repository::app_repo_artist_ledger;
use crate::usecase::ListArtistTransactionsUseCase;
use crate::{AppAuthedClaim, AppSharedState};

use super::reply;

#[debug_handler(state = AppSharedState)]
pub(super) async fn list_handler(
    authed_usr: AppAuthedClaim,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let result = async {
        let repo = app_repo_artist_ledger(ds).await?;
        let uc = ListArtistTransactionsUseCase { repo, authed_usr };
        uc.execute().await
    }
    .await;
    reply(StatusCode::OK, result, &logctx)
}

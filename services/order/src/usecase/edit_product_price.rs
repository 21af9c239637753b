use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use chrono::Local as LocalTime;

use marketplace_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::api::web::dto::{ProductPriceEditDto, ProductPriceEditRespDto};
use crate::model::ProductPriceModelSet;
use crate::repository::AbsProductPriceRepo;
use crate::{AppAuthPermissionCode, AppAuthedClaim};

use super::AppUsKsError;

pub struct EditProductPriceUseCase {
    pub repo: Box<dyn AbsProductPriceRepo>,
    pub authed_usr: AppAuthedClaim,
    pub log_ctx: Arc<AppLogContext>,
}

impl EditProductPriceUseCase {
    pub async fn execute(
        self,
        data: Vec<ProductPriceEditDto>,
    ) -> DefaultResult<ProductPriceEditRespDto, AppUsKsError> {
        if !self
            .authed_usr
            .contain_permission(AppAuthPermissionCode::can_edit_product_price)
        {
            let reason = format!("usr:{}, catalog-sync-only", self.authed_usr.profile);
            return Err(AppUsKsError::PermissionDenied(reason));
        }
        let time = LocalTime::now().fixed_offset();
        let updated =
            ProductPriceModelSet::try_from_dto(data, time).map_err(AppUsKsError::Validation)?;
        let num_requested = updated.items.len();
        let logctx = &self.log_ctx;
        let result = self.repo.save(updated).await;
        match &result {
            Ok(num) => app_log_event!(logctx, AppLogLevel::DEBUG, "num-saved:{num}"),
            Err(e) => app_log_event!(
                logctx,
                AppLogLevel::ERROR,
                "num-requested:{num_requested}, detail:{e}"
            ),
        }
        let num_saved = result?;
        Ok(ProductPriceEditRespDto { num_saved })
    }
} // end of impl EditProductPriceUseCase

use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use marketplace_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::api::web::dto::{
    CartLineAddReqDto, CartLineDto, CartTotalDto, FieldErrorReason,
};
use crate::constant::hard_limit;
use crate::model::{money_to_string, CartLineModel};
use crate::repository::{AbsCartRepo, AbsProductPriceRepo, CartLineFilter};
use crate::{AppAuthQuotaMatCode, AppAuthedClaim};

use super::AppUsKsError;

pub struct AddCartLineUseCase {
    pub repo_cart: Box<dyn AbsCartRepo>,
    pub repo_price: Box<dyn AbsProductPriceRepo>,
    pub authed_usr: AppAuthedClaim,
    pub log_ctx: Arc<AppLogContext>,
}
pub struct UpdateCartLineUseCase {
    pub repo_cart: Box<dyn AbsCartRepo>,
    pub repo_price: Box<dyn AbsProductPriceRepo>,
    pub authed_usr: AppAuthedClaim,
}
pub struct RetrieveCartUseCase {
    pub repo_cart: Box<dyn AbsCartRepo>,
    pub repo_price: Box<dyn AbsProductPriceRepo>,
    pub authed_usr: AppAuthedClaim,
}
pub struct CartTotalUseCase {
    pub repo_cart: Box<dyn AbsCartRepo>,
    pub repo_price: Box<dyn AbsProductPriceRepo>,
    pub authed_usr: AppAuthedClaim,
}
pub struct DiscardCartUseCase {
    pub repo_cart: Box<dyn AbsCartRepo>,
    pub authed_usr: AppAuthedClaim,
}

#[derive(Debug)]
pub enum CartLineUpdateOutput {
    Updated(CartLineDto),
    Removed,
}

impl AddCartLineUseCase {
    pub async fn execute(self, req: CartLineAddReqDto) -> DefaultResult<CartLineDto, AppUsKsError> {
        let product_id = req.product_id.ok_or(AppUsKsError::validation(
            "product_id",
            FieldErrorReason::Missing,
        ))?;
        let quantity = req.quantity.unwrap_or(1);
        if quantity <= 0 {
            return Err(AppUsKsError::validation(
                "quantity",
                FieldErrorReason::NonPositive,
            ));
        }
        let prices = self.repo_price.fetch(vec![product_id]).await?;
        let price = prices.find(product_id).ok_or(AppUsKsError::not_found(
            "product",
            product_id.to_string(),
            true,
        ))?;
        let owner = self.authed_usr.profile;
        let max_num_lines = self
            .authed_usr
            .quota_limit(AppAuthQuotaMatCode::NumCartLines)
            .unwrap_or(hard_limit::DEFAULT_MAX_CART_LINES);
        let line = self
            .repo_cart
            .add_line(owner, product_id, quantity, max_num_lines)
            .await
            .map_err(|e| AppUsKsError::from_repo(e, "cart-line", true))?;
        let logctx = &self.log_ctx;
        app_log_event!(
            logctx,
            AppLogLevel::DEBUG,
            "owner:{owner}, product:{product_id}, quantity:{}",
            line.quantity
        );
        Ok(line.to_dto(Some(price)))
    }
} // end of impl AddCartLineUseCase

impl UpdateCartLineUseCase {
    /// zero or negative quantity removes the line
    pub async fn execute(
        self,
        line_id: String,
        quantity: i64,
    ) -> DefaultResult<CartLineUpdateOutput, AppUsKsError> {
        let owner = self.authed_usr.profile;
        if quantity <= 0 {
            let filter = CartLineFilter::LineIds(vec![line_id.clone()]);
            let num_removed = self.repo_cart.discard(owner, filter).await?;
            if num_removed == 0 {
                Err(AppUsKsError::not_found("cart-line", line_id, false))
            } else {
                Ok(CartLineUpdateOutput::Removed)
            }
        } else {
            let line = self
                .repo_cart
                .set_quantity(owner, line_id.as_str(), quantity)
                .await
                .map_err(|e| AppUsKsError::from_repo(e, "cart-line", false))?;
            let prices = self.repo_price.fetch(vec![line.product_id]).await?;
            let dto = line.to_dto(prices.find(line.product_id));
            Ok(CartLineUpdateOutput::Updated(dto))
        }
    }
}

impl RetrieveCartUseCase {
    pub async fn execute(self) -> DefaultResult<Vec<CartLineDto>, AppUsKsError> {
        let lines = self.repo_cart.fetch_lines(self.authed_usr.profile).await?;
        let pids = lines.iter().map(|l| l.product_id).collect::<Vec<_>>();
        let prices = self.repo_price.fetch(pids).await?;
        let out = lines
            .iter()
            .map(|l| l.to_dto(prices.find(l.product_id)))
            .collect();
        Ok(out)
    }
}

impl CartTotalUseCase {
    // read-only, computed with current catalog prices
    pub async fn execute(self) -> DefaultResult<CartTotalDto, AppUsKsError> {
        let lines = self.repo_cart.fetch_lines(self.authed_usr.profile).await?;
        let pids = lines.iter().map(|l| l.product_id).collect::<Vec<_>>();
        let prices = self.repo_price.fetch(pids).await?;
        let total = CartLineModel::total(&lines, &prices)
            .ok_or_else(|| AppUsKsError::validation("total", FieldErrorReason::ExceedLimit))?;
        Ok(CartTotalDto {
            total: money_to_string(&total),
        })
    }
}

impl DiscardCartUseCase {
    pub async fn execute(self) -> DefaultResult<usize, AppUsKsError> {
        let owner = self.authed_usr.profile;
        let num_removed = self.repo_cart.discard(owner, CartLineFilter::All).await?;
        Ok(num_removed)
    }
}

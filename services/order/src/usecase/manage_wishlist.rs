use std::boxed::Box;
use std::result::Result as DefaultResult;

use crate::api::web::dto::{FieldErrorReason, WishlistAddReqDto, WishlistItemDto};
use crate::model::WishlistItemModel;
use crate::repository::{AbsProductPriceRepo, AbsWishlistRepo};
use crate::AppAuthedClaim;

use super::AppUsKsError;

pub struct AddWishlistItemUseCase {
    pub repo_wish: Box<dyn AbsWishlistRepo>,
    pub repo_price: Box<dyn AbsProductPriceRepo>,
    pub authed_usr: AppAuthedClaim,
}
pub struct RetrieveWishlistUseCase {
    pub repo_wish: Box<dyn AbsWishlistRepo>,
    pub authed_usr: AppAuthedClaim,
}
pub struct RemoveWishlistItemUseCase {
    pub repo_wish: Box<dyn AbsWishlistRepo>,
    pub authed_usr: AppAuthedClaim,
}

#[derive(Debug)]
pub enum WishlistAddOutput {
    Created(WishlistItemDto),
    AlreadyPresent(WishlistItemDto),
}

impl AddWishlistItemUseCase {
    pub async fn execute(
        self,
        req: WishlistAddReqDto,
    ) -> DefaultResult<WishlistAddOutput, AppUsKsError> {
        let product_id = req.product_id.ok_or(AppUsKsError::validation(
            "product_id",
            FieldErrorReason::Missing,
        ))?;
        let prices = self.repo_price.fetch(vec![product_id]).await?;
        if prices.find(product_id).is_none() {
            let id = product_id.to_string();
            return Err(AppUsKsError::not_found("product", id, true));
        }
        let item = WishlistItemModel::new(self.authed_usr.profile, product_id);
        let (item, created) = self.repo_wish.add(item).await?;
        let out = if created {
            WishlistAddOutput::Created(item.into())
        } else {
            WishlistAddOutput::AlreadyPresent(item.into())
        };
        Ok(out)
    }
}

impl RetrieveWishlistUseCase {
    pub async fn execute(self) -> DefaultResult<Vec<WishlistItemDto>, AppUsKsError> {
        let items = self.repo_wish.fetch(self.authed_usr.profile).await?;
        Ok(items.into_iter().map(WishlistItemDto::from).collect())
    }
}

impl RemoveWishlistItemUseCase {
    pub async fn execute(self, product_id: u64) -> DefaultResult<(), AppUsKsError> {
        self.repo_wish
            .remove(self.authed_usr.profile, product_id)
            .await
            .map_err(|e| AppUsKsError::from_repo(e, "wishlist-item", false))
    }
}

use marketplace_order::api::web::dto::WishlistAddReqDto;
use marketplace_order::repository::{AbsWishlistRepo, WishlistInMemRepo};
use marketplace_order::usecase::{
    AddWishlistItemUseCase, AppUsKsError, RemoveWishlistItemUseCase, RetrieveWishlistUseCase,
    WishlistAddOutput,
};

use super::{ut_repo_price, ut_seeded_dstore, UtDStore};
use crate::ut_authed_claim;

async fn ut_repo_wish(ds: &UtDStore) -> Box<dyn AbsWishlistRepo> {
    Box::new(WishlistInMemRepo::new(ds.clone()).await.unwrap())
}

async fn ut_add_item(
    ds: &UtDStore,
    owner: u32,
    product_id: Option<u64>,
) -> Result<WishlistAddOutput, AppUsKsError> {
    let uc = AddWishlistItemUseCase {
        repo_wish: ut_repo_wish(ds).await,
        repo_price: ut_repo_price(ds).await,
        authed_usr: ut_authed_claim(owner, vec![]),
    };
    uc.execute(WishlistAddReqDto { product_id }).await
}

#[tokio::test]
async fn add_twice_then_remove() {
    let ds = ut_seeded_dstore().await;
    let out = ut_add_item(&ds, 126, Some(102)).await.unwrap();
    assert!(matches!(out, WishlistAddOutput::Created(ref d) if d.product_id == 102));
    let out = ut_add_item(&ds, 126, Some(102)).await.unwrap();
    assert!(matches!(out, WishlistAddOutput::AlreadyPresent(ref d) if d.product_id == 102));
    // unavailable products can still be wished for
    ut_add_item(&ds, 126, Some(103)).await.unwrap();

    let uc = RetrieveWishlistUseCase {
        repo_wish: ut_repo_wish(&ds).await,
        authed_usr: ut_authed_claim(126, vec![]),
    };
    let items = uc.execute().await.unwrap();
    assert_eq!(items.len(), 2);

    let uc = RemoveWishlistItemUseCase {
        repo_wish: ut_repo_wish(&ds).await,
        authed_usr: ut_authed_claim(126, vec![]),
    };
    uc.execute(102).await.unwrap();
    let uc = RemoveWishlistItemUseCase {
        repo_wish: ut_repo_wish(&ds).await,
        authed_usr: ut_authed_claim(126, vec![]),
    };
    let result = uc.execute(102).await;
    assert!(matches!(
        result,
        Err(AppUsKsError::NotFound { from_body: false, .. })
    ));
}

#[tokio::test]
async fn add_invalid_product() {
    let ds = ut_seeded_dstore().await;
    let result = ut_add_item(&ds, 126, Some(999)).await;
    assert!(matches!(
        result,
        Err(AppUsKsError::NotFound { resource: "product", from_body: true, .. })
    ));
    let result = ut_add_item(&ds, 126, None).await;
    assert!(matches!(result, Err(AppUsKsError::Validation(_))));
}

use marketplace_order::api::web::dto::{
    CartLineAddReqDto, CartLineDto, FieldErrorDto, FieldErrorReason,
};
use marketplace_order::usecase::{
    AddCartLineUseCase, AppUsKsError, CartLineUpdateOutput, CartTotalUseCase,
    DiscardCartUseCase, RetrieveCartUseCase, UpdateCartLineUseCase,
};

use super::{ut_repo_cart, ut_repo_price, ut_seeded_dstore, UtDStore};
use crate::{ut_authed_claim, ut_log_context};

async fn ut_add_line(
    ds: &UtDStore,
    owner: u32,
    product_id: Option<u64>,
    quantity: Option<i64>,
) -> Result<CartLineDto, AppUsKsError> {
    let uc = AddCartLineUseCase {
        repo_cart: ut_repo_cart(ds).await,
        repo_price: ut_repo_price(ds).await,
        authed_usr: ut_authed_claim(owner, vec![]),
        log_ctx: ut_log_context(),
    };
    let req = CartLineAddReqDto {
        product_id,
        quantity,
    };
    uc.execute(req).await
}

async fn ut_update_line(
    ds: &UtDStore,
    owner: u32,
    line_id: &str,
    quantity: i64,
) -> Result<CartLineUpdateOutput, AppUsKsError> {
    let uc = UpdateCartLineUseCase {
        repo_cart: ut_repo_cart(ds).await,
        repo_price: ut_repo_price(ds).await,
        authed_usr: ut_authed_claim(owner, vec![]),
    };
    uc.execute(line_id.to_string(), quantity).await
}

async fn ut_cart_total(ds: &UtDStore, owner: u32) -> String {
    let uc = CartTotalUseCase {
        repo_cart: ut_repo_cart(ds).await,
        repo_price: ut_repo_price(ds).await,
        authed_usr: ut_authed_claim(owner, vec![]),
    };
    uc.execute().await.unwrap().total
}

#[tokio::test]
async fn add_same_product_twice() {
    let ds = ut_seeded_dstore().await;
    let first = ut_add_line(&ds, 126, Some(102), Some(2)).await.unwrap();
    let second = ut_add_line(&ds, 126, Some(102), Some(3)).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.quantity, 5);
    assert_eq!(second.unit_price.as_deref(), Some("33.35"));
    assert_eq!(second.line_total.as_deref(), Some("166.75"));
    // quantity defaults to 1
    let line = ut_add_line(&ds, 126, Some(101), None).await.unwrap();
    assert_eq!(line.quantity, 1);

    let uc = RetrieveCartUseCase {
        repo_cart: ut_repo_cart(&ds).await,
        repo_price: ut_repo_price(&ds).await,
        authed_usr: ut_authed_claim(126, vec![]),
    };
    let lines = uc.execute().await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(ut_cart_total(&ds, 126).await.as_str(), "266.75");
    assert_eq!(ut_cart_total(&ds, 127).await.as_str(), "0.00");
}

#[tokio::test]
async fn add_line_invalid() {
    let ds = ut_seeded_dstore().await;
    let result = ut_add_line(&ds, 126, None, Some(1)).await;
    if let Err(AppUsKsError::Validation(es)) = result {
        assert_eq!(es, vec![FieldErrorDto::new("product_id", FieldErrorReason::Missing)]);
    } else {
        panic!("expect validation error");
    }
    let result = ut_add_line(&ds, 126, Some(101), Some(-1)).await;
    if let Err(AppUsKsError::Validation(es)) = result {
        assert_eq!(es, vec![FieldErrorDto::new("quantity", FieldErrorReason::NonPositive)]);
    } else {
        panic!("expect validation error");
    }
    let result = ut_add_line(&ds, 126, Some(999), Some(1)).await;
    assert!(matches!(
        result,
        Err(AppUsKsError::NotFound {
            resource: "product",
            from_body: true,
            ..
        })
    ));
    let result = ut_add_line(&ds, 126, Some(101), Some(10000)).await;
    assert!(matches!(result, Err(AppUsKsError::Validation(_))));
}

#[tokio::test]
async fn update_line_quantity() {
    let ds = ut_seeded_dstore().await;
    let line = ut_add_line(&ds, 126, Some(101), Some(2)).await.unwrap();
    let result = ut_update_line(&ds, 126, line.id.as_str(), 7).await;
    if let Ok(CartLineUpdateOutput::Updated(dto)) = result {
        assert_eq!(dto.quantity, 7);
        assert_eq!(dto.line_total.as_deref(), Some("700.00"));
    } else {
        panic!("expect updated line");
    }
    // lines of other users are invisible
    let result = ut_update_line(&ds, 127, line.id.as_str(), 3).await;
    assert!(matches!(
        result,
        Err(AppUsKsError::NotFound {
            resource: "cart-line",
            from_body: false,
            ..
        })
    ));
}

#[tokio::test]
async fn update_line_zero_removes() {
    let ds = ut_seeded_dstore().await;
    let line = ut_add_line(&ds, 126, Some(101), Some(2)).await.unwrap();
    let _other = ut_add_line(&ds, 126, Some(104), Some(1)).await.unwrap();
    let result = ut_update_line(&ds, 126, line.id.as_str(), 0).await;
    assert!(matches!(result, Ok(CartLineUpdateOutput::Removed)));
    let lines = ut_repo_cart(&ds).await.fetch_lines(126).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, 104);
    let result = ut_update_line(&ds, 126, line.id.as_str(), 0).await;
    assert!(matches!(result, Err(AppUsKsError::NotFound { .. })));
}

#[tokio::test]
async fn discard_whole_cart() {
    let ds = ut_seeded_dstore().await;
    ut_add_line(&ds, 126, Some(101), Some(2)).await.unwrap();
    ut_add_line(&ds, 126, Some(102), Some(2)).await.unwrap();
    ut_add_line(&ds, 127, Some(102), Some(2)).await.unwrap();
    let uc = DiscardCartUseCase {
        repo_cart: ut_repo_cart(&ds).await,
        authed_usr: ut_authed_claim(126, vec![]),
    };
    assert_eq!(uc.execute().await.unwrap(), 2);
    assert_eq!(ut_cart_total(&ds, 126).await.as_str(), "0.00");
    assert_eq!(ut_cart_total(&ds, 127).await.as_str(), "66.70");
}

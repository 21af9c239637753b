use marketplace_order::model::CartModelError;
use marketplace_order::repository::{AbsCartRepo, AppRepoError, CartInMemRepo, CartLineFilter};

use crate::ut_inmem_dstore;

async fn ut_repo() -> CartInMemRepo {
    CartInMemRepo::new(ut_inmem_dstore(50)).await.unwrap()
}

#[tokio::test]
async fn add_same_product_merged() {
    let repo = ut_repo().await;
    let first = repo.add_line(126, 101, 2, 10).await.unwrap();
    let second = repo.add_line(126, 101, 3, 10).await.unwrap();
    assert_eq!(second.id_, first.id_);
    assert_eq!(second.quantity, 5);
    let lines = repo.fetch_lines(126).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 5);
    assert_eq!(lines[0].product_id, 101);
    // carts of other users are isolated
    let lines = repo.fetch_lines(1260).await.unwrap();
    assert!(lines.is_empty());
}

#[tokio::test]
async fn add_exceed_limits() {
    let repo = ut_repo().await;
    repo.add_line(126, 101, 1, 2).await.unwrap();
    repo.add_line(126, 102, 1, 2).await.unwrap();
    let result = repo.add_line(126, 103, 1, 2).await;
    assert!(matches!(
        result,
        Err(AppRepoError::Cart(CartModelError::ExceedNumLines { limit: 2 }))
    ));
    // existing lines can still grow
    let line = repo.add_line(126, 102, 4, 2).await.unwrap();
    assert_eq!(line.quantity, 5);
    let result = repo.add_line(126, 102, 9995, 2).await;
    assert!(matches!(
        result,
        Err(AppRepoError::Cart(CartModelError::ExceedQuantityLimit { .. }))
    ));
    let result = repo.add_line(126, 104, 0, 10).await;
    assert!(matches!(
        result,
        Err(AppRepoError::Cart(CartModelError::NonPositiveQuantity(0)))
    ));
    let lines = repo.fetch_lines(126).await.unwrap();
    assert_eq!(lines.len(), 2);
}

#[tokio::test]
async fn set_quantity_ok() {
    let repo = ut_repo().await;
    let line = repo.add_line(126, 101, 2, 10).await.unwrap();
    let updated = repo.set_quantity(126, line.id_.as_str(), 8).await.unwrap();
    assert_eq!(updated.quantity, 8);
    assert_eq!(updated.create_time, line.create_time);
    let result = repo.set_quantity(127, line.id_.as_str(), 8).await;
    assert!(matches!(result, Err(AppRepoError::NotExist(_))));
    let result = repo.set_quantity(126, line.id_.as_str(), 0).await;
    assert!(matches!(
        result,
        Err(AppRepoError::Cart(CartModelError::NonPositiveQuantity(0)))
    ));
    let lines = repo.fetch_lines(126).await.unwrap();
    assert_eq!(lines[0].quantity, 8);
}

#[tokio::test]
async fn discard_lines() {
    let repo = ut_repo().await;
    let l1 = repo.add_line(126, 101, 1, 10).await.unwrap();
    let _l2 = repo.add_line(126, 102, 1, 10).await.unwrap();
    let _l3 = repo.add_line(126, 103, 1, 10).await.unwrap();
    let _l4 = repo.add_line(127, 101, 1, 10).await.unwrap();

    let filter = CartLineFilter::LineIds(vec![l1.id_.clone()]);
    assert_eq!(repo.discard(126, filter).await.unwrap(), 1);
    let lines = repo.fetch_lines(126).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.id_ != l1.id_));
    // line of another owner is untouched
    let filter = CartLineFilter::LineIds(vec![l1.id_.clone()]);
    assert_eq!(repo.discard(126, filter).await.unwrap(), 0);

    let filter = CartLineFilter::ProductIds(vec![103, 101]);
    assert_eq!(repo.discard(126, filter).await.unwrap(), 1);
    assert_eq!(repo.discard(126, CartLineFilter::All).await.unwrap(), 1);
    assert!(repo.fetch_lines(126).await.unwrap().is_empty());
    assert_eq!(repo.fetch_lines(127).await.unwrap().len(), 1);
}

#[tokio::test]
async fn discard_while_adding() {
    let repo = ut_repo().await;
    repo.add_line(126, 101, 3, 20).await.unwrap();
    repo.add_line(126, 102, 1, 20).await.unwrap();
    let adding = async {
        for pid in 103..=110u64 {
            repo.add_line(126, pid, 1, 20).await.unwrap();
            repo.add_line(126, 102, 1, 20).await.unwrap();
        }
    };
    let discarding = async {
        let mut num_removed = 0usize;
        for _ in 0..8 {
            let filter = CartLineFilter::ProductIds(vec![101]);
            num_removed += repo.discard(126, filter).await.unwrap();
            tokio::task::yield_now().await;
        }
        num_removed
    };
    let ((), num_removed) = tokio::join!(adding, discarding);
    assert_eq!(num_removed, 1);
    let lines = repo.fetch_lines(126).await.unwrap();
    assert_eq!(lines.len(), 9);
    assert!(lines.iter().all(|l| l.product_id != 101));
    let merged = lines.iter().find(|l| l.product_id == 102).unwrap();
    assert_eq!(merged.quantity, 9);
}

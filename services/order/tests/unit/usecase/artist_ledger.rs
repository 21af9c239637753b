use marketplace_order::model::{OrderModel, PaymentMethod, PaymentOutcome};
use marketplace_order::usecase::ListArtistTransactionsUseCase;
use marketplace_order::AppAuthPermissionCode;

use super::{ut_repo_ledger, ut_repo_order, ut_repo_payment, ut_seeded_dstore, UtDStore};
use crate::model::ut_pending_order;
use crate::ut_authed_claim;

async fn ut_paid_order(ds: &UtDStore, items: &[(u64, i64)]) -> OrderModel {
    let order = ut_pending_order(126, items);
    ut_repo_order(ds).await.create(&order).await.unwrap();
    let repo = ut_repo_payment(ds).await;
    let (charge, _) = repo
        .create_charge(order.id_.as_str(), PaymentMethod::Alipay)
        .await
        .unwrap();
    let outcome = PaymentOutcome::Approved {
        reference: "L1".to_string(),
    };
    let (_, order) = repo.settle(charge.id_.as_str(), outcome).await.unwrap();
    order
}

#[tokio::test]
async fn list_own_entries() {
    let ds = ut_seeded_dstore().await;
    ut_paid_order(&ds, &[(101, 1), (102, 3)]).await;
    ut_paid_order(&ds, &[(102, 1)]).await;

    let uc = ListArtistTransactionsUseCase {
        repo: ut_repo_ledger(&ds).await,
        authed_usr: ut_authed_claim(52, vec![]),
    };
    let entries = uc.execute().await.unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries.iter().all(|e| e.artist_id == 52));
    let mut amounts = entries.iter().map(|e| e.amount.clone()).collect::<Vec<_>>();
    amounts.sort();
    assert_eq!(amounts, vec!["-10.01", "-3.34", "100.05", "33.35"]);

    let uc = ListArtistTransactionsUseCase {
        repo: ut_repo_ledger(&ds).await,
        authed_usr: ut_authed_claim(53, vec![]),
    };
    assert!(uc.execute().await.unwrap().is_empty());
}

#[tokio::test]
async fn staff_list_all_entries() {
    let ds = ut_seeded_dstore().await;
    ut_paid_order(&ds, &[(101, 1), (104, 1)]).await;
    let uc = ListArtistTransactionsUseCase {
        repo: ut_repo_ledger(&ds).await,
        authed_usr: ut_authed_claim(9, vec![AppAuthPermissionCode::can_manage_order]),
    };
    let entries = uc.execute().await.unwrap();
    assert_eq!(entries.len(), 4);
    let mut artists = entries.iter().map(|e| e.artist_id).collect::<Vec<_>>();
    artists.sort();
    artists.dedup();
    assert_eq!(artists, vec![51, 53]);
    let kinds = entries.iter().filter(|e| e.kind == "commission").count();
    assert_eq!(kinds, 2);
}

mod artist_ledger;
mod cart;
mod wishlist;

use std::boxed::Box;
use std::sync::Arc;

use marketplace_order::datastore::AbstInMemoryDStore;
use marketplace_order::repository::{
    AbsArtistLedgerRepo, AbsCartRepo, AbsOrderRepo, AbsPaymentRepo, AbsProductPriceRepo,
    ArtistLedgerInMemRepo, CartInMemRepo, OrderInMemRepo, PaymentInMemRepo,
    ProductPriceInMemRepo,
};

use crate::model::ut_catalog;
use crate::ut_inmem_dstore;

type UtDStore = Arc<Box<dyn AbstInMemoryDStore>>;

// all repositories share the same store, catalog prices are seeded
pub(crate) async fn ut_seeded_dstore() -> UtDStore {
    let ds = ut_inmem_dstore(100);
    let repo = ut_repo_price(&ds).await;
    repo.save(ut_catalog()).await.unwrap();
    ds
}

pub(crate) async fn ut_repo_price(ds: &UtDStore) -> Box<dyn AbsProductPriceRepo> {
    Box::new(ProductPriceInMemRepo::new(ds.clone()).await.unwrap())
}

pub(crate) async fn ut_repo_cart(ds: &UtDStore) -> Box<dyn AbsCartRepo> {
    Box::new(CartInMemRepo::new(ds.clone()).await.unwrap())
}

pub(crate) async fn ut_repo_order(ds: &UtDStore) -> Box<dyn AbsOrderRepo> {
    Box::new(OrderInMemRepo::new(ds.clone()).await.unwrap())
}

pub(crate) async fn ut_repo_payment(ds: &UtDStore) -> Box<dyn AbsPaymentRepo> {
    Box::new(PaymentInMemRepo::new(ds.clone()).await.unwrap())
}

pub(crate) async fn ut_repo_ledger(ds: &UtDStore) -> Box<dyn AbsArtistLedgerRepo> {
    Box::new(ArtistLedgerInMemRepo::new(ds.clone()).await.unwrap())
}

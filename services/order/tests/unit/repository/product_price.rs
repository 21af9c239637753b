use rust_decimal::Decimal;

use marketplace_order::repository::{AbsProductPriceRepo, ProductPriceInMemRepo};

use crate::model::ut_catalog;
use crate::{ut_inmem_dstore, ut_price_set};

#[tokio::test]
async fn save_overwrite_fetch() {
    let repo = ProductPriceInMemRepo::new(ut_inmem_dstore(20)).await.unwrap();
    assert_eq!(repo.save(ut_catalog()).await.unwrap(), 4);
    let fetched = repo.fetch(vec![102, 103, 999]).await.unwrap();
    assert_eq!(fetched.items.len(), 2);
    let item = fetched.find(102).unwrap();
    assert_eq!(item.price, "33.35".parse::<Decimal>().unwrap());
    assert_eq!(item.artist_id, 52);
    assert!(item.available);
    assert!(!fetched.find(103).unwrap().available);
    assert_eq!(fetched.missing(&[102, 999]), vec![999]);

    let updated = ut_price_set(&[(102, 52, "35.00", false)]);
    assert_eq!(repo.save(updated).await.unwrap(), 1);
    let fetched = repo.fetch(vec![102]).await.unwrap();
    let item = fetched.find(102).unwrap();
    assert_eq!(item.price, "35.00".parse::<Decimal>().unwrap());
    assert!(!item.available);
}

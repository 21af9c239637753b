use chrono::Local as LocalTime;
use rust_decimal::Decimal;

use marketplace_order::api::web::dto::{FieldErrorDto, FieldErrorReason, ProductPriceEditDto};
use marketplace_order::model::ProductPriceModelSet;

use super::ut_catalog;

fn ut_edit_req(product_id: u64, price: &str) -> ProductPriceEditDto {
    ProductPriceEditDto {
        product_id,
        artist_id: 60,
        price: price.to_string(),
        available: true,
    }
}

#[test]
fn convert_from_dto_ok() {
    let time = LocalTime::now().fixed_offset();
    let reqs = vec![ut_edit_req(301, "12"), ut_edit_req(302, "0.5")];
    let set = ProductPriceModelSet::try_from_dto(reqs, time).unwrap();
    assert_eq!(set.items.len(), 2);
    let item = set.find(302).unwrap();
    assert_eq!(item.price, "0.50".parse::<Decimal>().unwrap());
    assert_eq!(item.artist_id, 60);
    assert_eq!(item.last_update, time);
    assert!(set.find(303).is_none());
}

#[test]
fn convert_from_dto_error() {
    let time = LocalTime::now().fixed_offset();
    let result = ProductPriceModelSet::try_from_dto(vec![], time);
    assert_eq!(
        result.unwrap_err(),
        vec![FieldErrorDto::new("items", FieldErrorReason::Empty)]
    );
    let reqs = (0..201u64).map(|i| ut_edit_req(i + 1, "1.00")).collect();
    let result = ProductPriceModelSet::try_from_dto(reqs, time);
    assert_eq!(
        result.unwrap_err(),
        vec![FieldErrorDto::new("items", FieldErrorReason::ExceedLimit)]
    );
    let reqs = vec![
        ut_edit_req(301, "abc"),
        ut_edit_req(302, "-1.00"),
        ut_edit_req(301, "3.00"),
        ut_edit_req(303, "3.001"),
        ut_edit_req(304, "10000000000"),
        ut_edit_req(305, "9999999999.99"),
    ];
    let result = ProductPriceModelSet::try_from_dto(reqs, time);
    let expect = vec![
        FieldErrorDto::new("items[0].price", FieldErrorReason::InvalidFormat),
        FieldErrorDto::new("items[1].price", FieldErrorReason::Negative),
        FieldErrorDto::new("items[2].product_id", FieldErrorReason::Duplicate),
        FieldErrorDto::new("items[3].price", FieldErrorReason::InvalidFormat),
        FieldErrorDto::new("items[4].price", FieldErrorReason::ExceedLimit),
    ];
    assert_eq!(result.unwrap_err(), expect);
}

#[test]
fn find_missing_products() {
    let catalog = ut_catalog();
    assert!(catalog.missing(&[101, 102, 103, 104]).is_empty());
    assert_eq!(catalog.missing(&[105, 101, 106]), vec![105, 106]);
    // unavailable products are still known to the catalog
    assert!(!catalog.find(103).unwrap().available);
}

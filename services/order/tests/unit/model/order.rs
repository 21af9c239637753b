use chrono::Local as LocalTime;
use rust_decimal::Decimal;

use marketplace_order::api::web::dto::{FieldErrorDto, FieldErrorReason, OrderDto};
use marketplace_order::model::{
    OrderEvent, OrderModel, OrderModelError, OrderStatus, PaymentMethod,
};

use super::{ut_catalog, ut_pending_order};
use crate::{ut_order_req, ut_price_set};

fn ut_money(raw: &str) -> Decimal {
    raw.parse::<Decimal>().unwrap()
}

fn ut_validation_errors(result: Result<OrderModel, OrderModelError>) -> Vec<FieldErrorDto> {
    match result {
        Err(OrderModelError::Validation(es)) => es,
        _others => panic!("expect validation error"),
    }
}

#[test]
fn build_frozen_price_ok() {
    let order = ut_pending_order(126, &[(101, 2)]);
    assert_eq!(order.owner, 126);
    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert_eq!(order.total_amount, ut_money("200.00"));
    assert_eq!(order.final_amount, ut_money("200.00"));
    assert_eq!(order.items.len(), 1);
    let item = &order.items[0];
    assert_eq!(item.product_id, 101);
    assert_eq!(item.artist_id, 51);
    assert_eq!(item.unit_price, ut_money("100.00"));
    assert_eq!(item.total_price, ut_money("200.00"));
    assert!(order.amounts_consistent());
    assert!(OrderModel::is_valid_order_number(order.order_number.as_str()));
    assert!(order.payment_method.is_none());
    let dto = OrderDto::from(order);
    assert_eq!(dto.total_amount.as_str(), "200.00");
    assert_eq!(dto.shipping_fee.as_str(), "0.00");
    assert_eq!(dto.status.as_str(), "pending_payment");
}

#[test]
fn build_with_fee_and_discount() {
    let mut req = ut_order_req(&[(101, 1), (102, 3)]);
    req.shipping_fee = Some("15.5".to_string());
    req.discount_amount = Some("20".to_string());
    req.notes = Some("leave at door".to_string());
    let order = OrderModel::try_build(9, req, &ut_catalog()).unwrap();
    // 100.00 + 33.35 * 3
    assert_eq!(order.total_amount, ut_money("200.05"));
    assert_eq!(order.shipping_fee, ut_money("15.50"));
    assert_eq!(order.discount_amount, ut_money("20.00"));
    assert_eq!(order.final_amount, ut_money("195.55"));
    assert_eq!(order.notes.as_str(), "leave at door");
    assert!(order.amounts_consistent());
    let dto = OrderDto::from(order);
    assert_eq!(dto.final_amount.as_str(), "195.55");
    assert_eq!(dto.items[1].total_price.as_str(), "100.05");
}

#[test]
fn build_discount_exceeds_total() {
    let mut req = ut_order_req(&[(104, 2)]);
    req.shipping_fee = Some("1.00".to_string());
    req.discount_amount = Some("1.11".to_string());
    let result = OrderModel::try_build(9, req.clone(), &ut_catalog());
    let errors = ut_validation_errors(result);
    assert_eq!(
        errors,
        vec![FieldErrorDto::new("discount_amount", FieldErrorReason::ExceedLimit)]
    );
    // discount equal to total plus fee leaves nothing to pay
    req.discount_amount = Some("1.10".to_string());
    let order = OrderModel::try_build(9, req, &ut_catalog()).unwrap();
    assert_eq!(order.final_amount, Decimal::ZERO);
}

#[rustfmt::skip]
#[test]
fn build_invalid_fields() {
    let mut req = ut_order_req(&[(101, 0), (102, 10000), (101, 1)]);
    req.contact_name = "  ".to_string();
    req.contact_phone = "call-me-maybe".to_string();
    req.shipping_address.city = "".to_string();
    req.shipping_fee = Some("1.234".to_string());
    req.discount_amount = Some("-3".to_string());
    let errors = ut_validation_errors(OrderModel::try_build(9, req, &ut_catalog()));
    let expect = [
        ("items[0].quantity", FieldErrorReason::NonPositive),
        ("items[1].quantity", FieldErrorReason::ExceedLimit),
        ("items[2].product_id", FieldErrorReason::Duplicate),
        ("shipping_fee", FieldErrorReason::InvalidFormat),
        ("discount_amount", FieldErrorReason::Negative),
        ("contact_name", FieldErrorReason::Empty),
        ("contact_phone", FieldErrorReason::InvalidFormat),
        ("shipping_address.city", FieldErrorReason::Empty),
    ];
    assert_eq!(errors.len(), expect.len());
    expect.into_iter().for_each(|(field, reason)| {
        let e = FieldErrorDto::new(field, reason);
        assert!(errors.contains(&e), "missing error: {:?}", e);
    });
}

#[test]
fn build_amount_exceed_limit() {
    let mut req = ut_order_req(&[(101, 1)]);
    req.shipping_fee = Some("79228162514264337593543950335".to_string());
    let errors = ut_validation_errors(OrderModel::try_build(9, req.clone(), &ut_catalog()));
    assert_eq!(
        errors,
        vec![FieldErrorDto::new("shipping_fee", FieldErrorReason::ExceedLimit)]
    );
    req.shipping_fee = None;
    req.discount_amount = Some("10000000000.00".to_string());
    let errors = ut_validation_errors(OrderModel::try_build(9, req.clone(), &ut_catalog()));
    assert_eq!(
        errors,
        vec![FieldErrorDto::new("discount_amount", FieldErrorReason::ExceedLimit)]
    );
    // each amount fits, but the sum of product total and fee does not
    req.discount_amount = None;
    req.shipping_fee = Some("9999999999.99".to_string());
    let errors = ut_validation_errors(OrderModel::try_build(9, req, &ut_catalog()));
    assert_eq!(
        errors,
        vec![FieldErrorDto::new("shipping_fee", FieldErrorReason::ExceedLimit)]
    );
}

#[test]
fn build_item_total_exceed_limit() {
    let catalog = ut_price_set(&[
        (201, 61, "79228162514264337593543950335", true),
        (202, 61, "6000000000.00", true),
        (203, 62, "4000000000.00", true),
        (204, 62, "2000000000.00", true),
    ]);
    let req = ut_order_req(&[(201, 2)]);
    let errors = ut_validation_errors(OrderModel::try_build(9, req, &catalog));
    assert_eq!(
        errors,
        vec![FieldErrorDto::new("items[0].quantity", FieldErrorReason::ExceedLimit)]
    );
    let req = ut_order_req(&[(204, 4), (202, 2)]);
    let errors = ut_validation_errors(OrderModel::try_build(9, req, &catalog));
    assert_eq!(
        errors,
        vec![FieldErrorDto::new("items[1].quantity", FieldErrorReason::ExceedLimit)]
    );
    let req = ut_order_req(&[(202, 1), (203, 1)]);
    let errors = ut_validation_errors(OrderModel::try_build(9, req, &catalog));
    assert_eq!(errors, vec![FieldErrorDto::new("items", FieldErrorReason::ExceedLimit)]);

    let req = ut_order_req(&[(202, 1), (204, 1)]);
    let order = OrderModel::try_build(9, req, &catalog).unwrap();
    assert_eq!(order.final_amount, ut_money("8000000000.00"));
}

#[rustfmt::skip]
#[test]
fn build_text_exceed_limit() {
    let mut req = ut_order_req(&[(101, 1)]);
    req.notes = Some("x".repeat(513));
    req.contact_name = "名".repeat(65);
    req.contact_phone = "1".repeat(33);
    req.shipping_address.recipient = "r".repeat(65);
    req.shipping_address.country = "c".repeat(65);
    req.shipping_address.region = "g".repeat(65);
    req.shipping_address.city = "t".repeat(65);
    req.shipping_address.street = "s".repeat(256);
    req.shipping_address.postal_code = "1".repeat(17);
    let errors = ut_validation_errors(OrderModel::try_build(9, req, &ut_catalog()));
    let expect = [
        "notes", "contact_name", "contact_phone",
        "shipping_address.recipient", "shipping_address.country",
        "shipping_address.region", "shipping_address.city",
        "shipping_address.street", "shipping_address.postal_code",
    ];
    assert_eq!(errors.len(), expect.len());
    expect.into_iter().for_each(|field| {
        let e = FieldErrorDto::new(field, FieldErrorReason::ExceedLimit);
        assert!(errors.contains(&e), "missing error: {:?}", e);
    });

    // exactly at the limits, multi-byte characters count once
    let mut req = ut_order_req(&[(101, 1)]);
    req.notes = Some(format!("  {}  ", "x".repeat(512)));
    req.contact_name = "名".repeat(64);
    req.shipping_address.street = "s".repeat(255);
    req.shipping_address.postal_code = "1".repeat(16);
    let order = OrderModel::try_build(9, req, &ut_catalog()).unwrap();
    assert_eq!(order.notes.len(), 512);
    assert_eq!(order.contact_name.chars().count(), 64);
}

#[test]
fn build_empty_items() {
    let req = ut_order_req(&[]);
    let errors = ut_validation_errors(OrderModel::try_build(9, req, &ut_catalog()));
    assert_eq!(errors, vec![FieldErrorDto::new("items", FieldErrorReason::Empty)]);
}

#[test]
fn build_product_not_found() {
    let req = ut_order_req(&[(101, 1), (999, 2), (998, 1)]);
    let result = OrderModel::try_build(9, req, &ut_catalog());
    assert_eq!(result.unwrap_err(), OrderModelError::ProductNotFound(vec![999, 998]));
}

#[test]
fn build_product_unavailable() {
    let req = ut_order_req(&[(101, 1), (103, 2)]);
    let errors = ut_validation_errors(OrderModel::try_build(9, req, &ut_catalog()));
    assert_eq!(
        errors,
        vec![FieldErrorDto::new("items[1].product_id", FieldErrorReason::Unavailable)]
    );
}

#[test]
fn order_number_format() {
    (0..50).for_each(|_| {
        let num = OrderModel::generate_order_number();
        assert_eq!(num.len(), 10);
        assert!(num.starts_with("BL"));
        assert!(OrderModel::is_valid_order_number(num.as_str()));
    });
    ["BL1234abcd", "XX12345678", "BL123", "BL123456789", "bl12345678", "BL12G45678"]
        .into_iter()
        .for_each(|n| assert!(!OrderModel::is_valid_order_number(n), "{n}"));
    assert!(OrderModel::is_valid_order_number("BL00FF9A0C"));
}

#[test]
fn renew_order_number() {
    let mut order = ut_pending_order(9, &[(101, 1)]);
    let nums = (0..5)
        .map(|_| {
            order.renew_order_number();
            order.order_number.clone()
        })
        .collect::<std::collections::HashSet<_>>();
    // collision among 5 random 32-bit numbers is practically impossible
    assert_eq!(nums.len(), 5);
}

#[rustfmt::skip]
#[test]
fn status_transition_table() {
    let time = LocalTime::now().fixed_offset();
    let paid = OrderEvent::PaymentSucceeded { method: PaymentMethod::Wechat, time };
    let cancel = OrderEvent::Cancel { time };
    let refund = OrderEvent::RefundIssued { time };
    let adv = |target| OrderEvent::Advance { target, time };
    use OrderStatus::*;
    let cases = [
        (PendingPayment, paid.clone(), Some(Paid)),
        (PendingPayment, cancel.clone(), Some(Cancelled)),
        (PendingPayment, refund.clone(), None),
        (PendingPayment, adv(Processing), None),
        (Paid, paid.clone(), None),
        (Paid, cancel.clone(), None),
        (Paid, adv(Processing), Some(Processing)),
        (Paid, adv(Shipped), Some(Shipped)),
        (Paid, refund.clone(), Some(Refunded)),
        (Processing, adv(Paid), None),
        (Processing, adv(Processing), None),
        (Shipped, adv(Delivered), Some(Delivered)),
        (Shipped, refund.clone(), Some(Refunded)),
        (Delivered, adv(Completed), Some(Completed)),
        (Completed, refund.clone(), Some(Refunded)),
        (Completed, adv(Cancelled), None),
        (Cancelled, paid.clone(), None),
        (Cancelled, refund.clone(), None),
        (Refunded, refund.clone(), None),
        (Refunded, adv(Completed), None),
    ];
    cases.into_iter().for_each(|(from, event, expect)| {
        assert_eq!(from.next(&event), expect, "from:{from}, event:{}", event.label());
    });
}

#[test]
fn status_string_conversion() {
    use OrderStatus::*;
    [PendingPayment, Paid, Processing, Shipped, Delivered, Completed, Cancelled, Refunded]
        .into_iter()
        .for_each(|s| assert_eq!(s.as_str().parse::<OrderStatus>().unwrap(), s));
    assert!("unpaid".parse::<OrderStatus>().is_err());
    assert!(Cancelled.is_terminal());
    assert!(!Completed.is_terminal());
}

#[test]
fn apply_events() {
    let mut order = ut_pending_order(9, &[(101, 1)]);
    let t0 = LocalTime::now().fixed_offset();
    let event = OrderEvent::PaymentSucceeded {
        method: PaymentMethod::Alipay,
        time: t0,
    };
    assert!(order.accepts(&event));
    order.apply(event).unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.payment_method, Some(PaymentMethod::Alipay));
    assert_eq!(order.payment_time, Some(t0));
    assert_eq!(order.update_time, t0);
    // skipping to delivered stamps shipping time as well
    let t1 = LocalTime::now().fixed_offset();
    let event = OrderEvent::Advance {
        target: OrderStatus::Delivered,
        time: t1,
    };
    order.apply(event).unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert_eq!(order.shipping_time, Some(t1));
    assert_eq!(order.delivery_time, Some(t1));

    let result = order.apply(OrderEvent::Cancel { time: t1 });
    assert_eq!(
        result.unwrap_err(),
        OrderModelError::InvalidTransition {
            from: OrderStatus::Delivered,
            event: "cancel"
        }
    );
    assert_eq!(order.status, OrderStatus::Delivered);
}

#[test]
fn amounts_inconsistent() {
    let mut order = ut_pending_order(9, &[(101, 1), (104, 3)]);
    assert!(order.amounts_consistent());
    order.items[1].total_price = ut_money("0.16");
    assert!(!order.amounts_consistent());
    let mut order = ut_pending_order(9, &[(101, 1)]);
    order.final_amount = ut_money("99.99");
    assert!(!order.amounts_consistent());
}

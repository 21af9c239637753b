use chrono::Local as LocalTime;
use rust_decimal::Decimal;

use marketplace_order::api::web::dto::PaymentDto;
use marketplace_order::model::{
    OrderEvent, OrderModel, OrderStatus, PaymentMethod, PaymentModel, PaymentModelError,
    PaymentOutcome, PaymentStatus,
};

use super::ut_pending_order;

fn ut_settled_charge(order: &mut OrderModel, reference: &str) -> PaymentModel {
    let mut charge = PaymentModel::try_new_charge(order, &[], PaymentMethod::Alipay).unwrap();
    let time = LocalTime::now().fixed_offset();
    let outcome = PaymentOutcome::Approved {
        reference: reference.to_string(),
    };
    charge.settle(outcome, time).unwrap();
    order.apply(charge.order_event().unwrap()).unwrap();
    charge
}

#[test]
fn charge_settle_approved() {
    let order = ut_pending_order(126, &[(101, 2)]);
    let mut charge = PaymentModel::try_new_charge(&order, &[], PaymentMethod::Alipay).unwrap();
    assert_eq!(charge.status, PaymentStatus::Pending);
    assert_eq!(charge.amount, order.final_amount);
    assert_eq!(charge.order_id, order.id_);
    assert!(!charge.is_refund());
    assert!(charge.order_event().is_none());

    let time = LocalTime::now().fixed_offset();
    let outcome = PaymentOutcome::Approved {
        reference: "0A1B2C".to_string(),
    };
    charge.settle(outcome, time).unwrap();
    assert_eq!(charge.status, PaymentStatus::Success);
    assert_eq!(charge.transaction_id.as_deref(), Some("TX0A1B2C"));
    assert_eq!(charge.payment_time, Some(time));
    match charge.order_event() {
        Some(OrderEvent::PaymentSucceeded { method, time: t }) => {
            assert_eq!(method, PaymentMethod::Alipay);
            assert_eq!(t, time);
        }
        _others => panic!("expect payment-succeeded event"),
    }
    let dto = PaymentDto::from(charge);
    assert_eq!(dto.amount.as_str(), "200.00");
    assert_eq!(dto.status.as_str(), "success");
    assert_eq!(dto.payment_method.as_str(), "alipay");
}

#[test]
fn charge_settle_declined_or_vanished() {
    let order = ut_pending_order(126, &[(102, 1)]);
    let time = LocalTime::now().fixed_offset();
    let mut charge = PaymentModel::try_new_charge(&order, &[], PaymentMethod::Bank).unwrap();
    let outcome = PaymentOutcome::Declined {
        reason: "insufficient-fund".to_string(),
    };
    charge.settle(outcome, time).unwrap();
    assert_eq!(charge.status, PaymentStatus::Failed);
    assert!(charge.transaction_id.is_none());
    assert!(charge.order_event().is_none());
    // failed payment does not block a new attempt
    let existing = vec![charge];
    let mut charge = PaymentModel::try_new_charge(&order, &existing, PaymentMethod::Bank).unwrap();
    charge.settle(PaymentOutcome::Vanished, time).unwrap();
    assert_eq!(charge.status, PaymentStatus::Cancelled);
    assert!(charge.order_event().is_none());
}

#[test]
fn settle_twice_rejected() {
    let order = ut_pending_order(126, &[(102, 1)]);
    let time = LocalTime::now().fixed_offset();
    let mut charge = PaymentModel::try_new_charge(&order, &[], PaymentMethod::Wechat).unwrap();
    charge.settle(PaymentOutcome::Vanished, time).unwrap();
    let outcome = PaymentOutcome::Approved {
        reference: "late".to_string(),
    };
    let result = charge.settle(outcome, time);
    assert_eq!(
        result.unwrap_err(),
        PaymentModelError::AlreadySettled(PaymentStatus::Cancelled)
    );
    assert_eq!(charge.status, PaymentStatus::Cancelled);
}

#[test]
fn charge_rejected() {
    let order = ut_pending_order(126, &[(101, 1)]);
    let pending = PaymentModel::try_new_charge(&order, &[], PaymentMethod::Alipay).unwrap();
    let pending_id = pending.id_.clone();
    let result = PaymentModel::try_new_charge(&order, &[pending], PaymentMethod::Wechat);
    assert_eq!(
        result.unwrap_err(),
        PaymentModelError::PendingPaymentExists(pending_id)
    );
    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert_eq!(order.payment_method, None);

    let mut order = ut_pending_order(126, &[(101, 1)]);
    let charge = ut_settled_charge(&mut order, "1");
    assert_eq!(order.status, OrderStatus::Paid);
    let paid_time = order.update_time;
    let result = PaymentModel::try_new_charge(&order, &[charge], PaymentMethod::Alipay);
    assert_eq!(
        result.unwrap_err(),
        PaymentModelError::OrderNotPayable(OrderStatus::Paid)
    );
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.update_time, paid_time);
}

#[test]
fn refund_ok() {
    let mut order = ut_pending_order(126, &[(101, 2)]);
    let charge = ut_settled_charge(&mut order, "77");
    let existing = vec![charge.clone()];
    let mut refund = PaymentModel::try_new_refund(&charge, &order, &existing).unwrap();
    assert!(refund.is_refund());
    assert_eq!(refund.refund_of.as_deref(), Some(charge.id_.as_str()));
    assert_eq!(refund.amount, -charge.amount);
    assert_eq!(refund.method, charge.method);
    assert_eq!(refund.status, PaymentStatus::Pending);

    let time = LocalTime::now().fixed_offset();
    let outcome = PaymentOutcome::Approved {
        reference: "77".to_string(),
    };
    refund.settle(outcome, time).unwrap();
    assert_eq!(refund.transaction_id.as_deref(), Some("RF77"));
    let event = refund.order_event().unwrap();
    assert!(matches!(event, OrderEvent::RefundIssued { .. }));
    order.apply(event).unwrap();
    assert_eq!(order.status, OrderStatus::Refunded);
    let dto = PaymentDto::from(refund);
    assert_eq!(dto.amount.as_str(), "-200.00");
}

#[test]
fn refund_rejected() {
    let mut order = ut_pending_order(126, &[(101, 1)]);
    let charge = ut_settled_charge(&mut order, "5");

    // refund of a refund
    let existing = vec![charge.clone()];
    let refund = PaymentModel::try_new_refund(&charge, &order, &existing).unwrap();
    let result = PaymentModel::try_new_refund(&refund, &order, &existing);
    assert_eq!(
        result.unwrap_err(),
        PaymentModelError::NotRefundable {
            status: PaymentStatus::Pending,
            is_refund: true
        }
    );
    // another refund while the first one is still pending
    let existing = vec![charge.clone(), refund.clone()];
    let result = PaymentModel::try_new_refund(&charge, &order, &existing);
    assert_eq!(
        result.unwrap_err(),
        PaymentModelError::PendingPaymentExists(refund.id_.clone())
    );
    // charge already refunded
    let mut refund = refund;
    let time = LocalTime::now().fixed_offset();
    let outcome = PaymentOutcome::Approved {
        reference: "5".to_string(),
    };
    refund.settle(outcome, time).unwrap();
    let existing = vec![charge.clone(), refund];
    let result = PaymentModel::try_new_refund(&charge, &order, &existing);
    assert_eq!(
        result.unwrap_err(),
        PaymentModelError::AlreadyRefunded(charge.id_.clone())
    );
}

#[test]
fn refund_unsettled_charge() {
    let order = ut_pending_order(126, &[(101, 1)]);
    let charge = PaymentModel::try_new_charge(&order, &[], PaymentMethod::Alipay).unwrap();
    let existing = vec![charge.clone()];
    let result = PaymentModel::try_new_refund(&charge, &order, &existing);
    assert_eq!(
        result.unwrap_err(),
        PaymentModelError::NotRefundable {
            status: PaymentStatus::Pending,
            is_refund: false
        }
    );
}

#[test]
fn refund_order_cancelled() {
    let mut order = ut_pending_order(126, &[(101, 1)]);
    let charge = ut_settled_charge(&mut order, "8");
    // order modified elsewhere into a status not allowing refund
    order.status = OrderStatus::Cancelled;
    let existing = vec![charge.clone()];
    let result = PaymentModel::try_new_refund(&charge, &order, &existing);
    assert_eq!(
        result.unwrap_err(),
        PaymentModelError::OrderNotRefundable(OrderStatus::Cancelled)
    );
}

#[test]
fn free_order_not_refundable() {
    let mut order = ut_pending_order(126, &[(104, 1)]);
    order.discount_amount = order.total_amount;
    order.final_amount = Decimal::ZERO;
    let charge = ut_settled_charge(&mut order, "0");
    assert_eq!(charge.amount, Decimal::ZERO);
    let existing = vec![charge.clone()];
    let result = PaymentModel::try_new_refund(&charge, &order, &existing);
    assert!(matches!(
        result.unwrap_err(),
        PaymentModelError::NotRefundable { .. }
    ));
}

#[test]
fn status_and_method_strings() {
    ["alipay", "wechat", "bank", "other"]
        .into_iter()
        .for_each(|s| assert_eq!(s.parse::<PaymentMethod>().unwrap().as_str(), s));
    assert!("paypal".parse::<PaymentMethod>().is_err());
    ["pending", "success", "failed", "cancelled"]
        .into_iter()
        .for_each(|s| assert_eq!(s.parse::<PaymentStatus>().unwrap().as_str(), s));
    assert!("refunded".parse::<PaymentStatus>().is_err());
}

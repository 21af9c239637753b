use std::time::Duration;

use chrono::Local as LocalTime;

use marketplace_order::error::AppErrorCode;
use marketplace_order::model::{
    OrderEvent, OrderModel, OrderModelError, OrderStatus, PaymentMethod, PaymentModel,
};
use marketplace_order::repository::{AbsOrderRepo, AppRepoError, OrderInMemRepo};

use super::ut_saved_order;
use crate::model::ut_pending_order;
use crate::ut_inmem_dstore;

fn ut_apply_event(
    order: &mut OrderModel,
    event: OrderEvent,
    _payments: &[PaymentModel],
) -> Result<(), OrderModelError> {
    order.apply(event)
}

#[tokio::test]
async fn create_fetch_ok() {
    let repo = OrderInMemRepo::new(ut_inmem_dstore(50)).await.unwrap();
    let mut order = ut_pending_order(126, &[(102, 3), (101, 2)]);
    order.notes = "gift wrap".to_string();
    repo.create(&order).await.unwrap();
    let fetched = repo.fetch(order.id_.as_str()).await.unwrap();
    // items are loaded in product ID order
    order.items.sort_by_key(|i| i.product_id);
    assert_eq!(fetched, order);
    assert!(fetched.amounts_consistent());

    let result = repo.fetch("0123456789abcdef0123456789abcdef").await;
    assert!(matches!(result, Err(AppRepoError::NotExist(_))));
}

#[tokio::test]
async fn create_duplicate_order_number() {
    let repo = OrderInMemRepo::new(ut_inmem_dstore(50)).await.unwrap();
    let order = ut_pending_order(126, &[(101, 1)]);
    repo.create(&order).await.unwrap();
    let mut another = ut_pending_order(127, &[(102, 1)]);
    another.order_number = order.order_number.clone();
    let result = repo.create(&another).await;
    assert_eq!(result.unwrap_err().code, AppErrorCode::DuplicateKey);
    let result = repo.fetch(another.id_.as_str()).await;
    assert!(matches!(result, Err(AppRepoError::NotExist(_))));
    another.renew_order_number();
    repo.create(&another).await.unwrap();
}

#[tokio::test]
async fn fetch_by_owner_and_status() {
    let dstore = ut_inmem_dstore(50);
    let o1 = ut_saved_order(dstore.clone(), 126, &[(101, 1)]).await;
    tokio::time::sleep(Duration::from_millis(2)).await;
    let o2 = ut_saved_order(dstore.clone(), 126, &[(102, 1)]).await;
    let _o3 = ut_saved_order(dstore.clone(), 127, &[(101, 1)]).await;
    let repo = OrderInMemRepo::new(dstore).await.unwrap();
    let event = OrderEvent::Cancel {
        time: LocalTime::now().fixed_offset(),
    };
    repo.transition(o1.id_.as_str(), event, ut_apply_event)
        .await
        .unwrap();

    let orders = repo.fetch_by_owner(126, None).await.unwrap();
    assert_eq!(orders.len(), 2);
    // newest first
    assert_eq!(orders[0].id_, o2.id_);
    assert_eq!(orders[1].id_, o1.id_);
    let orders = repo
        .fetch_by_owner(126, Some(OrderStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id_, o1.id_);
    let orders = repo.fetch_by_owner(128, None).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn transition_ok_and_rejected() {
    let dstore = ut_inmem_dstore(50);
    let order = ut_saved_order(dstore.clone(), 126, &[(101, 1)]).await;
    let repo = OrderInMemRepo::new(dstore).await.unwrap();
    let time = LocalTime::now().fixed_offset();
    let event = OrderEvent::PaymentSucceeded {
        method: PaymentMethod::Wechat,
        time,
    };
    let updated = repo
        .transition(order.id_.as_str(), event, ut_apply_event)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Paid);
    let event = OrderEvent::Cancel { time };
    let result = repo
        .transition(order.id_.as_str(), event, ut_apply_event)
        .await;
    assert!(matches!(
        result,
        Err(AppRepoError::Order(OrderModelError::InvalidTransition {
            from: OrderStatus::Paid,
            ..
        }))
    ));
    let saved = repo.fetch(order.id_.as_str()).await.unwrap();
    assert_eq!(saved.status, OrderStatus::Paid);
    assert_eq!(saved.payment_method, Some(PaymentMethod::Wechat));
    assert_eq!(saved.payment_time, Some(time));
}

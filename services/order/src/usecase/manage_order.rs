use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use chrono::Local as LocalTime;

use marketplace_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::api::web::dto::{FieldErrorReason, OrderCreateReqDto, OrderDto};
use crate::constant::hard_limit;
use crate::error::{AppError, AppErrorCode};
use crate::model::{
    OrderEvent, OrderModel, OrderModelError, OrderStatus, PaymentModel, PaymentStatus,
};
use crate::repository::{AbsCartRepo, AbsOrderRepo, AbsProductPriceRepo, CartLineFilter};
use crate::AppAuthedClaim;

use super::AppUsKsError;

pub struct CreateOrderUseCase {
    pub repo_order: Box<dyn AbsOrderRepo>,
    pub repo_price: Box<dyn AbsProductPriceRepo>,
    pub repo_cart: Box<dyn AbsCartRepo>,
    pub authed_usr: AppAuthedClaim,
    pub log_ctx: Arc<AppLogContext>,
}
pub struct FetchOrderUseCase {
    pub repo_order: Box<dyn AbsOrderRepo>,
    pub authed_usr: AppAuthedClaim,
}
pub struct ListOrdersUseCase {
    pub repo_order: Box<dyn AbsOrderRepo>,
    pub authed_usr: AppAuthedClaim,
}
pub struct CancelOrderUseCase {
    pub repo_order: Box<dyn AbsOrderRepo>,
    pub authed_usr: AppAuthedClaim,
    pub log_ctx: Arc<AppLogContext>,
}
pub struct AdvanceOrderUseCase {
    pub repo_order: Box<dyn AbsOrderRepo>,
    pub authed_usr: AppAuthedClaim,
    pub log_ctx: Arc<AppLogContext>,
}

// owner of the order, or staff, can read or cancel it
pub(super) fn check_order_access(
    order: &OrderModel,
    authed_usr: &AppAuthedClaim,
) -> DefaultResult<(), AppUsKsError> {
    if order.owner == authed_usr.profile || authed_usr.is_staff() {
        Ok(())
    } else {
        let reason = format!("order:{}, usr:{}", order.id_, authed_usr.profile);
        Err(AppUsKsError::PermissionDenied(reason))
    }
}

fn cancel_cb(
    order: &mut OrderModel,
    event: OrderEvent,
    payments: &[PaymentModel],
) -> DefaultResult<(), OrderModelError> {
    // a charge waiting for the payment processor may still succeed
    if let Some(p) = payments.iter().find(|p| p.status == PaymentStatus::Pending) {
        return Err(OrderModelError::PaymentInProgress(p.id_.clone()));
    }
    order.apply(event)
}

fn advance_cb(
    order: &mut OrderModel,
    event: OrderEvent,
    _payments: &[PaymentModel],
) -> DefaultResult<(), OrderModelError> {
    order.apply(event)
}

impl CreateOrderUseCase {
    pub async fn execute(self, req: OrderCreateReqDto) -> DefaultResult<OrderDto, AppUsKsError> {
        let owner = self.authed_usr.profile;
        let pids = req.items.iter().map(|r| r.product_id).collect::<Vec<_>>();
        let prices = self.repo_price.fetch(pids.clone()).await?;
        let mut order = OrderModel::try_build(owner, req, &prices)?;
        self.save_with_unique_number(&mut order).await?;
        self.consume_cart(owner, pids).await;
        Ok(OrderDto::from(order))
    }

    async fn save_with_unique_number(&self, order: &mut OrderModel) -> DefaultResult<(), AppError> {
        let logctx = &self.log_ctx;
        for _ in 0..hard_limit::MAX_ORDER_NUMBER_ATTEMPTS {
            match self.repo_order.create(order).await {
                Ok(()) => {
                    return Ok(());
                }
                Err(e) if e.code == AppErrorCode::DuplicateKey => {
                    app_log_event!(logctx, AppLogLevel::WARNING, "{e}");
                    order.renew_order_number();
                }
                Err(e) => {
                    return Err(e);
                }
            }
        }
        let detail = format!(
            "order-number-attempts:{}",
            hard_limit::MAX_ORDER_NUMBER_ATTEMPTS
        );
        Err(AppError {
            code: AppErrorCode::DuplicateKey,
            detail: Some(detail),
        })
    }

    // the order has been committed, failure here is only logged
    async fn consume_cart(&self, owner: u32, pids: Vec<u64>) {
        let logctx = &self.log_ctx;
        match self
            .repo_cart
            .discard(owner, CartLineFilter::ProductIds(pids))
            .await
        {
            Ok(num) => app_log_event!(
                logctx,
                AppLogLevel::DEBUG,
                "owner:{owner}, cart-lines-removed:{num}"
            ),
            Err(e) => app_log_event!(
                logctx,
                AppLogLevel::ERROR,
                "owner:{owner}, cart-clear-failure:{e}"
            ),
        }
    }
} // end of impl CreateOrderUseCase

impl FetchOrderUseCase {
    pub async fn execute(self, oid: String) -> DefaultResult<OrderDto, AppUsKsError> {
        let order = self
            .repo_order
            .fetch(oid.as_str())
            .await
            .map_err(|e| AppUsKsError::from_repo(e, "order", false))?;
        check_order_access(&order, &self.authed_usr)?;
        Ok(order.into())
    }
}

impl ListOrdersUseCase {
    pub async fn execute(self, status: Option<String>) -> DefaultResult<Vec<OrderDto>, AppUsKsError> {
        let status = match status {
            Some(s) => Some(s.parse::<OrderStatus>().map_err(|_e| {
                AppUsKsError::validation("status", FieldErrorReason::InvalidChoice)
            })?),
            None => None,
        };
        let orders = self
            .repo_order
            .fetch_by_owner(self.authed_usr.profile, status)
            .await?;
        Ok(orders.into_iter().map(OrderDto::from).collect())
    }
}

impl CancelOrderUseCase {
    pub async fn execute(self, oid: String) -> DefaultResult<OrderDto, AppUsKsError> {
        let order = self
            .repo_order
            .fetch(oid.as_str())
            .await
            .map_err(|e| AppUsKsError::from_repo(e, "order", false))?;
        check_order_access(&order, &self.authed_usr)?;
        let event = OrderEvent::Cancel {
            time: LocalTime::now().fixed_offset(),
        };
        let order = self
            .repo_order
            .transition(oid.as_str(), event, cancel_cb)
            .await
            .map_err(|e| AppUsKsError::from_repo(e, "order", false))?;
        let logctx = &self.log_ctx;
        app_log_event!(
            logctx,
            AppLogLevel::INFO,
            "order:{}, usr:{}, cancelled",
            order.order_number,
            self.authed_usr.profile
        );
        Ok(order.into())
    }
}

impl AdvanceOrderUseCase {
    pub async fn execute(self, oid: String, target: String) -> DefaultResult<OrderDto, AppUsKsError> {
        if !self.authed_usr.is_staff() {
            let reason = format!("usr:{}, staff-only", self.authed_usr.profile);
            return Err(AppUsKsError::PermissionDenied(reason));
        }
        let target = target
            .parse::<OrderStatus>()
            .map_err(|_e| AppUsKsError::validation("status", FieldErrorReason::InvalidChoice))?;
        let event = OrderEvent::Advance {
            target,
            time: LocalTime::now().fixed_offset(),
        };
        let order = self
            .repo_order
            .transition(oid.as_str(), event, advance_cb)
            .await
            .map_err(|e| AppUsKsError::from_repo(e, "order", false))?;
        let logctx = &self.log_ctx;
        app_log_event!(
            logctx,
            AppLogLevel::INFO,
            "order:{}, status:{}, staff:{}",
            order.order_number,
            order.status,
            self.authed_usr.profile
        );
        Ok(order.into())
    }
} // end of impl AdvanceOrderUseCase

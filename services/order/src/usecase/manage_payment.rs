use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use marketplace_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::api::web::dto::{FieldErrorReason, PaymentDto, PaymentProcessReqDto, PaymentProcessRespDto};
use crate::error::{AppError, AppErrorCode};
use crate::model::{OrderModel, PaymentMethod, PaymentModel, PaymentOutcome, PaymentStatus};
use crate::processor::{AppPaymentGateway, AppProcessorError, AppProcessorReply, AppProcessorRequest};
use crate::repository::{AbsOrderRepo, AbsPaymentRepo, AppRepoError};
use crate::AppAuthedClaim;

use super::manage_order::check_order_access;
use super::AppUsKsError;

pub struct ProcessPaymentUseCase {
    pub repo_payment: Box<dyn AbsPaymentRepo>,
    pub repo_order: Box<dyn AbsOrderRepo>,
    pub gateway: Arc<AppPaymentGateway>,
    pub authed_usr: AppAuthedClaim,
    pub log_ctx: Arc<AppLogContext>,
}
pub struct RefundPaymentUseCase {
    pub repo_payment: Box<dyn AbsPaymentRepo>,
    pub repo_order: Box<dyn AbsOrderRepo>,
    pub gateway: Arc<AppPaymentGateway>,
    pub authed_usr: AppAuthedClaim,
    pub log_ctx: Arc<AppLogContext>,
}
pub struct ReconcilePaymentUseCase {
    pub repo_payment: Box<dyn AbsPaymentRepo>,
    pub gateway: Arc<AppPaymentGateway>,
    pub authed_usr: AppAuthedClaim,
    pub log_ctx: Arc<AppLogContext>,
}
pub struct ListOrderPaymentsUseCase {
    pub repo_payment: Box<dyn AbsPaymentRepo>,
    pub repo_order: Box<dyn AbsOrderRepo>,
    pub authed_usr: AppAuthedClaim,
}

impl From<AppProcessorReply> for PaymentOutcome {
    fn from(value: AppProcessorReply) -> Self {
        match value {
            AppProcessorReply::Approved { reference } => Self::Approved { reference },
            AppProcessorReply::Declined { reason } => Self::Declined { reason },
        }
    }
}

fn gateway_failure(e: AppProcessorError, pid: &str) -> AppUsKsError {
    let detail = format!("payment:{pid}, left-pending, error:{:?}", e);
    AppUsKsError::Unexpected(AppError {
        code: AppErrorCode::PaymentGatewayFailure,
        detail: Some(detail),
    })
}

fn settle_error(e: AppRepoError) -> AppUsKsError {
    match e {
        AppRepoError::NotExist(id) => AppUsKsError::Unexpected(AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(format!("missing-on-settlement:{id}")),
        }),
        others => AppUsKsError::from_repo(others, "payment", false),
    }
}

async fn settle_payment(
    repo: &dyn AbsPaymentRepo,
    logctx: &Arc<AppLogContext>,
    pid: &str,
    outcome: PaymentOutcome,
) -> DefaultResult<(PaymentModel, OrderModel), AppUsKsError> {
    if let PaymentOutcome::Declined { reason } = &outcome {
        app_log_event!(logctx, AppLogLevel::INFO, "payment:{pid}, declined:{reason}");
    }
    let (payment, order) = repo.settle(pid, outcome).await.map_err(settle_error)?;
    app_log_event!(
        logctx,
        AppLogLevel::INFO,
        "payment:{pid}, status:{}, order:{}, order-status:{}",
        payment.status,
        order.order_number,
        order.status
    );
    Ok((payment, order))
}

impl ProcessPaymentUseCase {
    pub async fn execute(
        self,
        req: PaymentProcessReqDto,
    ) -> DefaultResult<PaymentProcessRespDto, AppUsKsError> {
        let (oid, method) = Self::validate(req)?;
        // orders of other users are reported as nonexistent
        let order = match self.repo_order.fetch(oid.as_str()).await {
            Ok(o) if o.owner == self.authed_usr.profile => o,
            Ok(_o) => return Err(AppUsKsError::not_found("order", oid, true)),
            Err(e) => return Err(AppUsKsError::from_repo(e, "order", true)),
        };
        let (payment, _order) = self
            .repo_payment
            .create_charge(order.id_.as_str(), method)
            .await
            .map_err(|e| AppUsKsError::from_repo(e, "order", true))?;
        let pid = payment.id_.clone();
        let proc_req = AppProcessorRequest {
            idempotency_key: pid.clone(),
            order_id: payment.order_id.clone(),
            amount: payment.amount,
            method: payment.method,
            charge_reference: None,
        };
        let reply = self
            .gateway
            .charge(&proc_req)
            .await
            .map_err(|e| gateway_failure(e, pid.as_str()))?;
        let logctx = &self.log_ctx;
        let (payment, order) =
            settle_payment(self.repo_payment.as_ref(), logctx, pid.as_str(), reply.into()).await?;
        Ok(PaymentProcessRespDto {
            payment: payment.into(),
            order: order.into(),
        })
    }

    fn validate(req: PaymentProcessReqDto) -> DefaultResult<(String, PaymentMethod), AppUsKsError> {
        let oid = req.order_id.ok_or(AppUsKsError::validation(
            "order_id",
            FieldErrorReason::Missing,
        ))?;
        let method = req.payment_method.ok_or(AppUsKsError::validation(
            "payment_method",
            FieldErrorReason::Missing,
        ))?;
        let method = method.parse::<PaymentMethod>().map_err(|_e| {
            AppUsKsError::validation("payment_method", FieldErrorReason::InvalidChoice)
        })?;
        Ok((oid, method))
    }
} // end of impl ProcessPaymentUseCase

impl RefundPaymentUseCase {
    pub async fn execute(self, pid: String) -> DefaultResult<PaymentDto, AppUsKsError> {
        let original = self
            .repo_payment
            .fetch(pid.as_str())
            .await
            .map_err(|e| AppUsKsError::from_repo(e, "payment", false))?;
        let order = self
            .repo_order
            .fetch(original.order_id.as_str())
            .await
            .map_err(settle_error)?;
        check_order_access(&order, &self.authed_usr)?;
        let (refund, original) = self
            .repo_payment
            .create_refund(pid.as_str())
            .await
            .map_err(|e| AppUsKsError::from_repo(e, "payment", false))?;
        let refund_id = refund.id_.clone();
        let proc_req = AppProcessorRequest {
            idempotency_key: refund_id.clone(),
            order_id: refund.order_id.clone(),
            amount: -refund.amount,
            method: refund.method,
            charge_reference: original.transaction_id,
        };
        let reply = self
            .gateway
            .refund(&proc_req)
            .await
            .map_err(|e| gateway_failure(e, refund_id.as_str()))?;
        let logctx = &self.log_ctx;
        let (refund, _order) = settle_payment(
            self.repo_payment.as_ref(),
            logctx,
            refund_id.as_str(),
            reply.into(),
        )
        .await?;
        Ok(refund.into())
    }
} // end of impl RefundPaymentUseCase

impl ReconcilePaymentUseCase {
    pub async fn execute(self, pid: String) -> DefaultResult<PaymentDto, AppUsKsError> {
        if !self.authed_usr.is_staff() {
            let reason = format!("usr:{}, staff-only", self.authed_usr.profile);
            return Err(AppUsKsError::PermissionDenied(reason));
        }
        let payment = self
            .repo_payment
            .fetch(pid.as_str())
            .await
            .map_err(|e| AppUsKsError::from_repo(e, "payment", false))?;
        if payment.status != PaymentStatus::Pending {
            let reason = format!("payment-already-settled, status:{}", payment.status);
            return Err(AppUsKsError::InvalidState(reason));
        }
        let outcome = match self.gateway.query(pid.as_str()).await {
            Ok(Some(reply)) => PaymentOutcome::from(reply),
            Ok(None) => PaymentOutcome::Vanished,
            Err(e) => {
                return Err(gateway_failure(e, pid.as_str()));
            }
        };
        let logctx = &self.log_ctx;
        let (payment, _order) =
            settle_payment(self.repo_payment.as_ref(), logctx, pid.as_str(), outcome).await?;
        Ok(payment.into())
    }
} // end of impl ReconcilePaymentUseCase

impl ListOrderPaymentsUseCase {
    pub async fn execute(self, oid: String) -> DefaultResult<Vec<PaymentDto>, AppUsKsError> {
        let order = self
            .repo_order
            .fetch(oid.as_str())
            .await
            .map_err(|e| AppUsKsError::from_repo(e, "order", false))?;
        check_order_access(&order, &self.authed_usr)?;
        let payments = self.repo_payment.fetch_by_order(oid.as_str()).await?;
        Ok(payments.into_iter().map(PaymentDto::from).collect())
    }
}

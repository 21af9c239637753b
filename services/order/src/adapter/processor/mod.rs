mod dummy;

use std::boxed::Box;
use std::future::Future;
use std::marker::{Send, Sync};
use std::result::Result as DefaultResult;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use marketplace_common::config::{AppPaymentGatewayCfg, AppPaymentProcessorType};
use marketplace_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::model::PaymentMethod;

pub use dummy::DummyPaymentProcessor;

// one request to external payment processor, the idempotency key is the ID
// of local payment record, retrying with the same key never charges twice
#[derive(Debug, Clone)]
pub struct AppProcessorRequest {
    pub idempotency_key: String,
    pub order_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    // reference returned by processor for the original charge, refund only
    pub charge_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppProcessorReply {
    Approved { reference: String },
    Declined { reason: String },
}

#[derive(Debug, Clone)]
pub enum AppProcessorErrorReason {
    Timeout(u128),
    Unreachable(String),
    InvalidResponse(String),
    NotSupport,
}

#[derive(Debug, Clone)]
pub enum AppProcessorFnLabel {
    Charge,
    Refund,
    Query,
}

#[derive(Debug, Clone)]
pub struct AppProcessorError {
    pub reason: AppProcessorErrorReason,
    pub fn_label: AppProcessorFnLabel,
}

impl AppProcessorError {
    // only network-level failures are worth another attempt, the processor
    // has not made any decision in such case
    pub fn is_transient(&self) -> bool {
        matches!(
            self.reason,
            AppProcessorErrorReason::Timeout(_) | AppProcessorErrorReason::Unreachable(_)
        )
    }
}

#[async_trait]
pub trait AbstractPaymentProcessor: Send + Sync {
    async fn charge(
        &self,
        req: &AppProcessorRequest,
    ) -> DefaultResult<AppProcessorReply, AppProcessorError>;

    async fn refund(
        &self,
        req: &AppProcessorRequest,
    ) -> DefaultResult<AppProcessorReply, AppProcessorError>;

    // look up outcome of an earlier request, `None` means the processor
    // never received any request with the key
    async fn query(
        &self,
        idempotency_key: &str,
    ) -> DefaultResult<Option<AppProcessorReply>, AppProcessorError>;
}

pub struct AppPaymentGateway {
    processor: Box<dyn AbstractPaymentProcessor>,
    timeout: Duration,
    max_retries: u8,
    backoff_base: Duration,
    logctx: Arc<AppLogContext>,
}

pub(crate) fn build_context(
    cfg: &AppPaymentGatewayCfg,
    logctx: Arc<AppLogContext>,
) -> AppPaymentGateway {
    let processor: Box<dyn AbstractPaymentProcessor> = match cfg.processor {
        AppPaymentProcessorType::Dummy => Box::new(DummyPaymentProcessor::default()),
    };
    AppPaymentGateway::new(processor, cfg, logctx)
}

impl AppPaymentGateway {
    pub fn new(
        processor: Box<dyn AbstractPaymentProcessor>,
        cfg: &AppPaymentGatewayCfg,
        logctx: Arc<AppLogContext>,
    ) -> Self {
        Self {
            processor,
            timeout: Duration::from_millis(cfg.timeout_ms as u64),
            max_retries: cfg.max_retries,
            backoff_base: Duration::from_millis(cfg.backoff_base_ms as u64),
            logctx,
        }
    }

    pub async fn charge(
        &self,
        req: &AppProcessorRequest,
    ) -> DefaultResult<AppProcessorReply, AppProcessorError> {
        self.with_retry(AppProcessorFnLabel::Charge, || self.processor.charge(req))
            .await
    }

    pub async fn refund(
        &self,
        req: &AppProcessorRequest,
    ) -> DefaultResult<AppProcessorReply, AppProcessorError> {
        self.with_retry(AppProcessorFnLabel::Refund, || self.processor.refund(req))
            .await
    }

    pub async fn query(
        &self,
        idempotency_key: &str,
    ) -> DefaultResult<Option<AppProcessorReply>, AppProcessorError> {
        self.with_retry(AppProcessorFnLabel::Query, || {
            self.processor.query(idempotency_key)
        })
        .await
    }

    fn backoff_delay(&self, num_retried: u8) -> Duration {
        let factor = 1u32 << (num_retried.min(16) as u32);
        self.backoff_base.saturating_mul(factor)
    }

    async fn with_retry<T, F, Fut>(
        &self,
        label: AppProcessorFnLabel,
        op: F,
    ) -> DefaultResult<T, AppProcessorError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = DefaultResult<T, AppProcessorError>> + Send,
    {
        let logctx = &self.logctx;
        let mut num_retried = 0u8;
        loop {
            let result = match tokio::time::timeout(self.timeout, op()).await {
                Ok(r) => r,
                Err(_elapsed) => Err(AppProcessorError {
                    reason: AppProcessorErrorReason::Timeout(self.timeout.as_millis()),
                    fn_label: label.clone(),
                }),
            };
            match result {
                Err(e) if e.is_transient() && num_retried < self.max_retries => {
                    let delay = self.backoff_delay(num_retried);
                    app_log_event!(
                        logctx,
                        AppLogLevel::WARNING,
                        "num-retried:{num_retried}, delay-ms:{}, error:{:?}",
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    num_retried += 1;
                }
                others => break others,
            }
        }
    } // end of fn with_retry
} // end of impl AppPaymentGateway

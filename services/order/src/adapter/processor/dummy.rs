use std::collections::{HashMap, VecDeque};
use std::result::Result as DefaultResult;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::{AbstractPaymentProcessor, AppProcessorError, AppProcessorReply, AppProcessorRequest};

// In-process stand-in of external payment processor. It approves charges
// of non-negative amount and refunds carrying a charge reference, replies
// are kept by idempotency key so repeated requests get the same reply.
// Only the latest `capacity` replies are kept, older ones are evicted
// first-in first-out.
pub struct DummyPaymentProcessor {
    capacity: usize,
    replies: Mutex<DummyReplyLog>,
}

#[derive(Default)]
struct DummyReplyLog {
    order: VecDeque<String>,
    content: HashMap<String, AppProcessorReply>,
}

const DEFAULT_CAPACITY: usize = 4096;

impl Default for DummyPaymentProcessor {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl DummyPaymentProcessor {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            replies: Mutex::new(DummyReplyLog::default()),
        }
    }

    fn new_reference() -> String {
        format!("{:016X}", rand::random::<u64>())
    }

    async fn settle(&self, req: &AppProcessorRequest, accepted: bool, reason: &str) -> AppProcessorReply {
        let mut guard = self.replies.lock().await;
        if let Some(saved) = guard.content.get(req.idempotency_key.as_str()) {
            return saved.clone();
        }
        let reply = if accepted {
            AppProcessorReply::Approved {
                reference: Self::new_reference(),
            }
        } else {
            AppProcessorReply::Declined {
                reason: reason.to_string(),
            }
        };
        while guard.order.len() >= self.capacity {
            if let Some(evicted) = guard.order.pop_front() {
                guard.content.remove(evicted.as_str());
            }
        }
        guard.order.push_back(req.idempotency_key.clone());
        guard
            .content
            .insert(req.idempotency_key.clone(), reply.clone());
        reply
    }
}

#[async_trait]
impl AbstractPaymentProcessor for DummyPaymentProcessor {
    async fn charge(
        &self,
        req: &AppProcessorRequest,
    ) -> DefaultResult<AppProcessorReply, AppProcessorError> {
        let accepted = req.amount >= Decimal::ZERO;
        Ok(self.settle(req, accepted, "invalid-amount").await)
    }

    async fn refund(
        &self,
        req: &AppProcessorRequest,
    ) -> DefaultResult<AppProcessorReply, AppProcessorError> {
        let accepted = req.amount > Decimal::ZERO && req.charge_reference.is_some();
        Ok(self.settle(req, accepted, "unknown-charge").await)
    }

    async fn query(
        &self,
        idempotency_key: &str,
    ) -> DefaultResult<Option<AppProcessorReply>, AppProcessorError> {
        let guard = self.replies.lock().await;
        Ok(guard.content.get(idempotency_key).cloned())
    }
}

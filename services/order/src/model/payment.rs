use std::fmt::Display;
use std::result::Result as DefaultResult;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local as LocalTime};
use rust_decimal::Decimal;

use crate::api::web::dto::PaymentDto;
use crate::constant::transaction_prefix;
use crate::generate_object_id;

use super::{money_to_string, OrderEvent, OrderModel, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Alipay,
    Wechat,
    Bank,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

/// final answer from payment processor for a pending payment
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Approved { reference: String },
    Declined { reason: String },
    // the processor never received the request
    Vanished,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentModelError {
    OrderNotPayable(OrderStatus),
    OrderNotRefundable(OrderStatus),
    PendingPaymentExists(String),
    NotRefundable {
        status: PaymentStatus,
        is_refund: bool,
    },
    AlreadyRefunded(String),
    AlreadySettled(PaymentStatus),
}

// Row of payment ledger, never updated except the single settlement from
// `pending` to one of the final states. Refunds are separate rows with
// negated amount referring to the original charge.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentModel {
    pub id_: String,
    pub order_id: String,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub refund_of: Option<String>,
    pub payment_time: Option<DateTime<FixedOffset>>,
    pub create_time: DateTime<FixedOffset>,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alipay => "alipay",
            Self::Wechat => "wechat",
            Self::Bank => "bank",
            Self::Other => "other",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;
    fn from_str(s: &str) -> DefaultResult<Self, Self::Err> {
        match s {
            "alipay" => Ok(Self::Alipay),
            "wechat" => Ok(Self::Wechat),
            "bank" => Ok(Self::Bank),
            "other" => Ok(Self::Other),
            _others => Err(format!("unknown-payment-method:{s}")),
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;
    fn from_str(s: &str) -> DefaultResult<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _others => Err(format!("unknown-payment-status:{s}")),
        }
    }
}

impl PaymentModel {
    fn check_no_pending(existing: &[Self]) -> DefaultResult<(), PaymentModelError> {
        match existing.iter().find(|p| p.status == PaymentStatus::Pending) {
            Some(p) => Err(PaymentModelError::PendingPaymentExists(p.id_.clone())),
            None => Ok(()),
        }
    }

    /// `existing` contains all payments of the order
    pub fn try_new_charge(
        order: &OrderModel,
        existing: &[Self],
        method: PaymentMethod,
    ) -> DefaultResult<Self, PaymentModelError> {
        if order.status != OrderStatus::PendingPayment {
            return Err(PaymentModelError::OrderNotPayable(order.status));
        }
        Self::check_no_pending(existing)?;
        Ok(Self {
            id_: generate_object_id(),
            order_id: order.id_.clone(),
            method,
            amount: order.final_amount,
            transaction_id: None,
            status: PaymentStatus::Pending,
            refund_of: None,
            payment_time: None,
            create_time: LocalTime::now().fixed_offset(),
        })
    }

    pub fn try_new_refund(
        original: &Self,
        order: &OrderModel,
        existing: &[Self],
    ) -> DefaultResult<Self, PaymentModelError> {
        if original.status != PaymentStatus::Success
            || original.is_refund()
            || !original.amount.is_sign_positive()
            || original.amount.is_zero()
        {
            return Err(PaymentModelError::NotRefundable {
                status: original.status,
                is_refund: original.is_refund(),
            });
        }
        let refunded = existing.iter().any(|p| {
            p.refund_of.as_deref() == Some(original.id_.as_str())
                && p.status == PaymentStatus::Success
        });
        if refunded {
            return Err(PaymentModelError::AlreadyRefunded(original.id_.clone()));
        }
        Self::check_no_pending(existing)?;
        let time = LocalTime::now().fixed_offset();
        if !order.accepts(&OrderEvent::RefundIssued { time }) {
            return Err(PaymentModelError::OrderNotRefundable(order.status));
        }
        Ok(Self {
            id_: generate_object_id(),
            order_id: order.id_.clone(),
            method: original.method,
            amount: -original.amount,
            transaction_id: None,
            status: PaymentStatus::Pending,
            refund_of: Some(original.id_.clone()),
            payment_time: None,
            create_time: time,
        })
    } // end of fn try_new_refund

    pub fn is_refund(&self) -> bool {
        self.refund_of.is_some()
    }

    pub fn settle(
        &mut self,
        outcome: PaymentOutcome,
        time: DateTime<FixedOffset>,
    ) -> DefaultResult<(), PaymentModelError> {
        if self.status != PaymentStatus::Pending {
            return Err(PaymentModelError::AlreadySettled(self.status));
        }
        match outcome {
            PaymentOutcome::Approved { reference } => {
                let prefix = if self.is_refund() {
                    transaction_prefix::REFUND
                } else {
                    transaction_prefix::CHARGE
                };
                self.transaction_id = Some(format!("{prefix}{reference}"));
                self.status = PaymentStatus::Success;
                self.payment_time = Some(time);
            }
            PaymentOutcome::Declined { .. } => {
                self.status = PaymentStatus::Failed;
            }
            PaymentOutcome::Vanished => {
                self.status = PaymentStatus::Cancelled;
            }
        }
        Ok(())
    }

    /// order event implied by successful settlement of this payment
    pub fn order_event(&self) -> Option<OrderEvent> {
        let time = self.payment_time?;
        if self.status != PaymentStatus::Success {
            None
        } else if self.is_refund() {
            Some(OrderEvent::RefundIssued { time })
        } else {
            Some(OrderEvent::PaymentSucceeded {
                method: self.method,
                time,
            })
        }
    }
} // end of impl PaymentModel

impl From<PaymentModel> for PaymentDto {
    fn from(value: PaymentModel) -> Self {
        Self {
            id: value.id_,
            order_id: value.order_id,
            payment_method: value.method.as_str().to_string(),
            amount: money_to_string(&value.amount),
            transaction_id: value.transaction_id,
            status: value.status.to_string(),
            refund_of: value.refund_of,
            payment_time: value.payment_time,
            created_at: value.create_time,
        }
    }
}

mod artist_ledger;
mod edit_product_price;
mod manage_cart;
mod manage_order;
mod manage_payment;
mod manage_wishlist;

use crate::api::web::dto::{FieldErrorDto, FieldErrorReason};
use crate::error::AppError;
use crate::model::{CartModelError, OrderModelError, PaymentModelError};
use crate::repository::AppRepoError;

pub use artist_ledger::ListArtistTransactionsUseCase;
pub use edit_product_price::EditProductPriceUseCase;
pub use manage_cart::{
    AddCartLineUseCase, CartLineUpdateOutput, CartTotalUseCase, DiscardCartUseCase,
    RetrieveCartUseCase, UpdateCartLineUseCase,
};
pub use manage_order::{
    AdvanceOrderUseCase, CancelOrderUseCase, CreateOrderUseCase, FetchOrderUseCase,
    ListOrdersUseCase,
};
pub use manage_payment::{
    ListOrderPaymentsUseCase, ProcessPaymentUseCase, ReconcilePaymentUseCase,
    RefundPaymentUseCase,
};
pub use manage_wishlist::{
    AddWishlistItemUseCase, RemoveWishlistItemUseCase, RetrieveWishlistUseCase,
    WishlistAddOutput,
};

#[derive(Debug)]
pub enum AppUsKsError {
    Validation(Vec<FieldErrorDto>),
    NotFound {
        resource: &'static str,
        id: String,
        // the identifier comes from request body instead of URI path
        from_body: bool,
    },
    InvalidState(String),
    PermissionDenied(String),
    Unexpected(AppError),
}

impl AppUsKsError {
    pub(crate) fn validation(field: &str, reason: FieldErrorReason) -> Self {
        Self::Validation(vec![FieldErrorDto::new(field, reason)])
    }

    pub(crate) fn not_found(resource: &'static str, id: String, from_body: bool) -> Self {
        Self::NotFound {
            resource,
            id,
            from_body,
        }
    }

    // `resource` and `from_body` describe the object a repository could not find
    pub(crate) fn from_repo(e: AppRepoError, resource: &'static str, from_body: bool) -> Self {
        match e {
            AppRepoError::NotExist(id) => Self::not_found(resource, id, from_body),
            AppRepoError::Cart(e) => e.into(),
            AppRepoError::Order(e) => e.into(),
            AppRepoError::Payment(e) => e.into(),
            AppRepoError::DataStore(e) => Self::Unexpected(e),
        }
    }
}

impl From<AppError> for AppUsKsError {
    fn from(value: AppError) -> Self {
        Self::Unexpected(value)
    }
}

impl From<CartModelError> for AppUsKsError {
    fn from(value: CartModelError) -> Self {
        match value {
            CartModelError::NonPositiveQuantity(_) => {
                Self::validation("quantity", FieldErrorReason::NonPositive)
            }
            CartModelError::ExceedQuantityLimit { .. } => {
                Self::validation("quantity", FieldErrorReason::ExceedLimit)
            }
            CartModelError::ExceedNumLines { .. } => {
                Self::validation("product_id", FieldErrorReason::ExceedLimit)
            }
        }
    }
}

impl From<OrderModelError> for AppUsKsError {
    fn from(value: OrderModelError) -> Self {
        match value {
            OrderModelError::Validation(errors) => Self::Validation(errors),
            OrderModelError::ProductNotFound(ids) => {
                let ids = ids.iter().map(u64::to_string).collect::<Vec<_>>();
                Self::not_found("product", ids.join(","), true)
            }
            OrderModelError::InvalidTransition { from, event } => {
                Self::InvalidState(format!("order-status:{from}, event:{event}"))
            }
            OrderModelError::PaymentInProgress(pid) => {
                Self::InvalidState(format!("payment-in-progress:{pid}"))
            }
        }
    }
}

impl From<PaymentModelError> for AppUsKsError {
    fn from(value: PaymentModelError) -> Self {
        let reason = match value {
            PaymentModelError::OrderNotPayable(s) => format!("order-not-payable, status:{s}"),
            PaymentModelError::OrderNotRefundable(s) => {
                format!("order-not-refundable, status:{s}")
            }
            PaymentModelError::PendingPaymentExists(pid) => {
                format!("payment-in-progress:{pid}")
            }
            PaymentModelError::NotRefundable { status, is_refund } => {
                format!("payment-not-refundable, status:{status}, is-refund:{is_refund}")
            }
            PaymentModelError::AlreadyRefunded(pid) => format!("payment-already-refunded:{pid}"),
            PaymentModelError::AlreadySettled(s) => format!("payment-already-settled, status:{s}"),
        };
        Self::InvalidState(reason)
    }
}

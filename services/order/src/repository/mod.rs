use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;
use std::vec::Vec;

use async_trait::async_trait;

use crate::error::{AppError, AppErrorCode};
use crate::model::{
    ArtistTransactionModel, CartLineModel, CartModelError, OrderEvent, OrderModel,
    OrderModelError, OrderStatus, PaymentMethod, PaymentModel, PaymentModelError, PaymentOutcome,
    ProductPriceModelSet, WishlistItemModel,
};
use crate::AppDataStoreContext;

mod in_mem;
// make in-memory repo visible only for testing purpose
pub use in_mem::artist_ledger::ArtistLedgerInMemRepo;
pub use in_mem::cart::CartInMemRepo;
pub use in_mem::order::OrderInMemRepo;
pub use in_mem::payment::PaymentInMemRepo;
pub use in_mem::product_price::ProductPriceInMemRepo;
pub use in_mem::wishlist::WishlistInMemRepo;

#[cfg(feature = "mariadb")]
mod mariadb;

#[cfg(feature = "mariadb")]
use mariadb::artist_ledger::ArtistLedgerMariaDbRepo;
#[cfg(feature = "mariadb")]
use mariadb::cart::CartMariaDbRepo;
#[cfg(feature = "mariadb")]
use mariadb::order::OrderMariaDbRepo;
#[cfg(feature = "mariadb")]
use mariadb::payment::PaymentMariaDbRepo;
#[cfg(feature = "mariadb")]
use mariadb::product_price::ProductPriceMariaDbRepo;
#[cfg(feature = "mariadb")]
use mariadb::wishlist::WishlistMariaDbRepo;

#[derive(Debug)]
pub enum AppRepoError {
    NotExist(String),
    Cart(CartModelError),
    Order(OrderModelError),
    Payment(PaymentModelError),
    DataStore(AppError),
}

impl From<AppError> for AppRepoError {
    fn from(value: AppError) -> Self {
        Self::DataStore(value)
    }
}
impl From<CartModelError> for AppRepoError {
    fn from(value: CartModelError) -> Self {
        Self::Cart(value)
    }
}
impl From<OrderModelError> for AppRepoError {
    fn from(value: OrderModelError) -> Self {
        Self::Order(value)
    }
}
impl From<PaymentModelError> for AppRepoError {
    fn from(value: PaymentModelError) -> Self {
        Self::Payment(value)
    }
}

// the repository instance may be used across an await,
// the future created by app callers has to be able to pass to different threads
// , it is the reason to add `Send` and `Sync` as super-traits
#[async_trait]
pub trait AbsProductPriceRepo: Sync + Send {
    async fn fetch(&self, ids: Vec<u64>) -> DefaultResult<ProductPriceModelSet, AppError>;
    // insert or overwrite by product ID
    async fn save(&self, updated: ProductPriceModelSet) -> DefaultResult<usize, AppError>;
}

pub enum CartLineFilter {
    All,
    LineIds(Vec<String>),
    ProductIds(Vec<u64>),
}

#[async_trait]
pub trait AbsCartRepo: Sync + Send {
    async fn fetch_lines(&self, owner: u32) -> DefaultResult<Vec<CartLineModel>, AppError>;

    /// increase quantity of existing line for the same product, or create
    /// new line if the cart has less than `max_num_lines` lines
    async fn add_line(
        &self,
        owner: u32,
        product_id: u64,
        quantity: i64,
        max_num_lines: u32,
    ) -> DefaultResult<CartLineModel, AppRepoError>;

    async fn set_quantity(
        &self,
        owner: u32,
        line_id: &str,
        quantity: i64,
    ) -> DefaultResult<CartLineModel, AppRepoError>;

    /// return number of lines removed
    async fn discard(&self, owner: u32, filter: CartLineFilter) -> DefaultResult<usize, AppError>;
}

#[async_trait]
pub trait AbsWishlistRepo: Sync + Send {
    /// the boolean flag indicates whether the item is newly created, the
    /// existing item is returned untouched otherwise
    async fn add(
        &self,
        item: WishlistItemModel,
    ) -> DefaultResult<(WishlistItemModel, bool), AppError>;

    async fn fetch(&self, owner: u32) -> DefaultResult<Vec<WishlistItemModel>, AppError>;

    async fn remove(&self, owner: u32, product_id: u64) -> DefaultResult<(), AppRepoError>;
}

// the callback runs within the same transaction as the update, all payments
// of the order are given for cross-checking
pub type AppOrderRepoUpdateUserFunc =
    fn(&mut OrderModel, OrderEvent, &[PaymentModel]) -> DefaultResult<(), OrderModelError>;

#[async_trait]
pub trait AbsOrderRepo: Sync + Send {
    /// save order header, items and order number in one transaction,
    /// report `AppErrorCode::DuplicateKey` if the order number is taken
    async fn create(&self, order: &OrderModel) -> DefaultResult<(), AppError>;

    async fn fetch(&self, oid: &str) -> DefaultResult<OrderModel, AppRepoError>;

    /// orders of the owner, newest first
    async fn fetch_by_owner(
        &self,
        owner: u32,
        status: Option<OrderStatus>,
    ) -> DefaultResult<Vec<OrderModel>, AppError>;

    async fn transition(
        &self,
        oid: &str,
        event: OrderEvent,
        usr_cb: AppOrderRepoUpdateUserFunc,
    ) -> DefaultResult<OrderModel, AppRepoError>;
} // end of trait AbsOrderRepo

#[async_trait]
pub trait AbsPaymentRepo: Sync + Send {
    /// create pending charge for the order, the order is returned as well
    async fn create_charge(
        &self,
        oid: &str,
        method: PaymentMethod,
    ) -> DefaultResult<(PaymentModel, OrderModel), AppRepoError>;

    /// create pending refund against the successful charge `pid`, the
    /// original charge is returned with the new row
    async fn create_refund(
        &self,
        pid: &str,
    ) -> DefaultResult<(PaymentModel, PaymentModel), AppRepoError>;

    /// Settle a pending payment in one transaction : update the payment,
    /// transition the order and append artist ledger entries on success.
    async fn settle(
        &self,
        pid: &str,
        outcome: PaymentOutcome,
    ) -> DefaultResult<(PaymentModel, OrderModel), AppRepoError>;

    async fn fetch(&self, pid: &str) -> DefaultResult<PaymentModel, AppRepoError>;

    /// payments of the order, oldest first
    async fn fetch_by_order(&self, oid: &str) -> DefaultResult<Vec<PaymentModel>, AppError>;
} // end of trait AbsPaymentRepo

#[async_trait]
pub trait AbsArtistLedgerRepo: Sync + Send {
    /// newest first, `None` fetches entries of all artists
    async fn fetch_by_artist(
        &self,
        artist_id: Option<u32>,
    ) -> DefaultResult<Vec<ArtistTransactionModel>, AppError>;
}

pub async fn app_repo_product_price(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsProductPriceRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = ProductPriceMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = ds.in_mem.as_ref() {
        let obj = ProductPriceInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

pub async fn app_repo_cart(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsCartRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = CartMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = &ds.in_mem {
        let obj = CartInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

pub async fn app_repo_wishlist(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsWishlistRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = WishlistMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = &ds.in_mem {
        let obj = WishlistInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

pub async fn app_repo_order(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsOrderRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = OrderMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = &ds.in_mem {
        let obj = OrderInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

pub async fn app_repo_payment(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsPaymentRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = PaymentMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = &ds.in_mem {
        let obj = PaymentInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

pub async fn app_repo_artist_ledger(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsArtistLedgerRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = ArtistLedgerMariaDbRepo::new(dbs)?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = &ds.in_mem {
        let obj = ArtistLedgerInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

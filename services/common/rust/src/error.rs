use std::fmt::{Debug, Display};

#[derive(Debug, Clone, PartialEq)]
pub enum AppErrorCode {
    Unknown,
    NotImplemented,
    MissingSysBasePath,
    MissingAppBasePath,
    MissingConfigPath,
    MissingDataStore,
    InvalidJsonFormat,
    InvalidVersion,
    InvalidRouteConfig,
    NoRouteApiServerCfg,
    NoLogHandlerCfg,
    NoLoggerCfg,
    NoHandlerInLoggerCfg,
    InvalidHandlerLoggerCfg,
    InvalidPaymentGatewayCfg,
    FeatureDisabled,
    EmptyInputData, // for internal server error, do NOT dump detail to http response
    InvalidInput,   // for frontend client error
    CryptoFailure,
    NoConfidentialityCfg,
    NoDatabaseCfg,
    RemoteDbServerFailure,
    ExceedingMaxLimit,
    AcquireLockFailure,
    DatabaseServerBusy,
    DataTableNotExist,
    DataCorruption,
    // unique key already taken in a data store, callers may regenerate the
    // key and retry
    DuplicateKey,
    ProductNotExist,
    PaymentGatewayFailure,
    IOerror(std::io::ErrorKind),
} // end of AppErrorCode

#[derive(Debug)]
pub struct AppCfgError {
    pub code: AppErrorCode,
    pub detail: Option<String>,
}

#[derive(Debug)]
pub struct AppConfidentialityError {
    pub code: AppErrorCode,
    pub detail: String,
}

impl Display for AppCfgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dp = self.detail.as_deref().unwrap_or("none");
        write!(f, "code:{:?}, detail:{}", self.code, dp)
    }
}

impl Display for AppConfidentialityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code:{:?}, detail:{}", self.code, self.detail)
    }
}

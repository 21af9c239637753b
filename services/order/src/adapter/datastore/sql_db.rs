use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

#[cfg(feature = "mariadb")]
use std::time::Duration;

#[cfg(feature = "mariadb")]
use serde::Deserialize;
#[cfg(feature = "mariadb")]
use sqlx::mysql::MySqlConnectOptions;
#[cfg(feature = "mariadb")]
use sqlx::pool::{PoolConnection, PoolOptions};
#[cfg(feature = "mariadb")]
use sqlx::{MySql, Pool};

use marketplace_common::confidentiality::AbstractConfidentiality;
use marketplace_common::config::AppDbServerCfg;
#[cfg(feature = "mariadb")]
use marketplace_common::config::AppDbServerType;

use crate::error::{AppError, AppErrorCode};

#[cfg(feature = "mariadb")]
#[allow(non_snake_case)]
#[derive(Deserialize)]
struct DbSecret {
    HOST: String,
    PORT: u16,
    USER: String,
    PASSWORD: String,
}

#[cfg(feature = "mariadb")]
pub struct AppMariaDbStore {
    pub alias: String,
    pool: Pool<MySql>,
}
#[cfg(not(feature = "mariadb"))]
pub struct AppMariaDbStore {}

#[cfg(feature = "mariadb")]
impl AppMariaDbStore {
    pub fn try_build(
        cfg: &AppDbServerCfg,
        confidential: Arc<Box<dyn AbstractConfidentiality>>,
    ) -> DefaultResult<Self, AppError> {
        if !matches!(cfg.srv_type, AppDbServerType::MariaDB) {
            let detail = format!("db-cfg-server-type: {:?}", cfg.srv_type);
            return Err(AppError {
                code: AppErrorCode::InvalidInput,
                detail: Some(detail),
            });
        }
        let serial = confidential.try_get_payload(cfg.confidentiality_path.as_str())?;
        let secret = serde_json::from_str::<DbSecret>(serial.as_str()).map_err(|e| AppError {
            code: AppErrorCode::InvalidJsonFormat,
            detail: Some(e.to_string() + ", secret-parsing-error, source: AppMariaDbStore"),
        })?;
        let conn_opts = MySqlConnectOptions::new()
            .host(secret.HOST.as_str())
            .port(secret.PORT)
            .username(secret.USER.as_str())
            .password(secret.PASSWORD.as_str())
            .database(cfg.db_name.as_str());
        let pol_opts = PoolOptions::<MySql>::new()
            .max_connections(cfg.max_conns)
            .idle_timeout(Some(Duration::new(cfg.idle_timeout_secs as u64, 0)))
            .acquire_timeout(Duration::new(cfg.acquire_timeout_secs as u64, 0))
            .min_connections(0);
        // connections are established on first use, the service can start
        // before the database server is ready
        let pool = pol_opts.connect_lazy_with(conn_opts);
        Ok(Self {
            pool,
            alias: cfg.alias.clone(),
        })
    }

    pub async fn acquire(&self) -> DefaultResult<PoolConnection<MySql>, AppError> {
        self.pool.acquire().await.map_err(|e| {
            let mut out = AppError::from(e);
            let d = out.detail.take().unwrap_or_default();
            out.detail = Some(format!("{d}, pool-size:{}", self.pool.size()));
            out
        })
    }
} // end of impl AppMariaDbStore

#[cfg(not(feature = "mariadb"))]
impl AppMariaDbStore {
    pub fn try_build(
        cfg: &AppDbServerCfg,
        _confidential: Arc<Box<dyn AbstractConfidentiality>>,
    ) -> DefaultResult<Self, AppError> {
        let detail = format!(
            "sql-db, type:{:?}, alias:{}",
            cfg.srv_type,
            cfg.alias.as_str()
        );
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some(detail),
        })
    }
} // end of impl AppMariaDbStore

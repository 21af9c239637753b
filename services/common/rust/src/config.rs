use std::collections::hash_map::RandomState;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::fs::File;
use std::io::BufReader;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use serde::de::Error as DeserializeError;
use serde::{Deserialize, Deserializer};

use crate::constant::{env_vars, logging as const_log};
use crate::error::{AppCfgError, AppErrorCode};
use crate::{AppLogAlias, WebApiPath};

// each handler writes log events to one destination, `path` is required
// only for file destination and relative to system base path
#[derive(Deserialize)]
pub struct AppLogHandlerCfg {
    #[serde(deserialize_with = "jsn_deny_empty_alias")]
    pub alias: AppLogAlias,
    pub min_level: const_log::Level,
    pub destination: const_log::Destination,
    pub path: Option<String>,
}

// a logger is looked up by module path, e.g. `marketplace_order::usecase`,
// `level` overrides minimum level of all the handlers it refers to
#[derive(Deserialize)]
pub struct AppLoggerCfg {
    #[serde(deserialize_with = "jsn_deny_empty_alias")]
    pub alias: AppLogAlias,
    pub handlers: Vec<AppLogAlias>,
    pub level: Option<const_log::Level>,
}

#[derive(Deserialize)]
pub struct AppLoggingCfg {
    pub handlers: Vec<AppLogHandlerCfg>,
    pub loggers: Vec<AppLoggerCfg>,
}

#[derive(Deserialize)]
pub struct WebApiRouteCfg {
    pub path: WebApiPath,
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub handler: String,
}

impl Display for WebApiRouteCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "path:{}, handler:{}", self.path, self.handler)
    }
}

#[derive(Deserialize)]
pub struct WebApiListenCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub api_version: String,
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub cors: String,
    pub routes: Vec<WebApiRouteCfg>,
}

#[derive(Deserialize)]
pub struct AppAuthCfg {
    // JWK set for verifying access tokens, relative to system base path
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub keystore_path: String,
}

#[derive(Deserialize, Debug, Clone)]
pub enum AppPaymentProcessorType {
    // in-process stand-in which settles every request immediately
    Dummy,
}

#[derive(Deserialize, Debug)]
pub struct AppPaymentGatewayCfg {
    pub processor: AppPaymentProcessorType,
    // upper bound of each single request to the gateway
    pub timeout_ms: u32,
    pub max_retries: u8,
    // delay before the n-th retry is `backoff_base_ms * 2^(n-1)`
    pub backoff_base_ms: u32,
}

#[derive(Deserialize)]
#[serde(tag = "source")]
pub enum AppConfidentialCfg {
    UserSpace {
        #[serde(deserialize_with = "jsn_deny_empty_string")]
        sys_path: String,
    },
}

#[derive(Deserialize, Debug, Clone)]
pub enum AppDbServerType {
    MariaDB,
}

#[derive(Deserialize, Debug)]
pub struct AppInMemoryDbCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub alias: String,
    pub max_items: u32,
}

#[derive(Deserialize, Debug)]
pub struct AppDbServerCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub alias: String,
    pub srv_type: AppDbServerType,
    pub max_conns: u32,
    pub acquire_timeout_secs: u16, // for acquiring connection from pool
    pub idle_timeout_secs: u16,
    pub confidentiality_path: String,
    pub db_name: String,
}

#[derive(Deserialize)]
#[serde(tag = "_type")]
pub enum AppDataStoreCfg {
    InMemory(AppInMemoryDbCfg),
    DbServer(AppDbServerCfg),
}

#[derive(Deserialize)]
pub struct ApiServerCfg {
    pub logging: AppLoggingCfg,
    pub listen: WebApiListenCfg,
    pub limit_req_body_in_bytes: usize,
    pub num_workers: u8,
    pub stack_sz_kb: u16,
    pub data_store: Vec<AppDataStoreCfg>,
    pub auth: AppAuthCfg,
    pub confidentiality: AppConfidentialCfg,
    pub payment_gateway: AppPaymentGatewayCfg,
}

// shared resources (keystore, CORS, secrets, log files) are located
// relative to this path
pub struct AppBasepathCfg {
    pub system: String,
}

pub struct AppConfig {
    pub basepath: AppBasepathCfg,
    pub api_server: ApiServerCfg,
}

pub struct AppCfgHardLimit {
    pub nitems_per_inmem_table: u32,
    pub num_db_conns: u32,
    pub seconds_db_idle: u16,
}

pub struct AppCfgInitArgs {
    pub env_var_map: HashMap<String, String, RandomState>,
    pub limit: AppCfgHardLimit,
}

fn cfg_error(code: AppErrorCode, detail: Option<String>) -> AppCfgError {
    AppCfgError { code, detail }
}

fn take_env_var(
    map: &mut HashMap<String, String, RandomState>,
    label: &str,
    code: AppErrorCode,
) -> DefaultResult<String, AppCfgError> {
    map.remove(label).ok_or_else(|| cfg_error(code, None))
}

impl AppConfig {
    pub fn new(args: AppCfgInitArgs) -> DefaultResult<Self, AppCfgError> {
        let AppCfgInitArgs {
            mut env_var_map,
            limit,
        } = args;
        let sys_basepath = take_env_var(
            &mut env_var_map,
            env_vars::SYS_BASEPATH,
            AppErrorCode::MissingSysBasePath,
        )? + "/";
        let service_basepath = take_env_var(
            &mut env_var_map,
            env_vars::SERVICE_BASEPATH,
            AppErrorCode::MissingAppBasePath,
        )? + "/";
        let cfg_path = take_env_var(
            &mut env_var_map,
            env_vars::CFG_FILEPATH,
            AppErrorCode::MissingConfigPath,
        )?;
        let api_server = Self::parse_from_file(service_basepath + cfg_path.as_str(), limit)?;
        Ok(Self {
            api_server,
            basepath: AppBasepathCfg {
                system: sys_basepath,
            },
        })
    }

    pub fn parse_from_file(
        filepath: String,
        limit: AppCfgHardLimit,
    ) -> DefaultResult<ApiServerCfg, AppCfgError> {
        let fileobj = File::open(filepath)
            .map_err(|e| cfg_error(AppErrorCode::IOerror(e.kind()), Some(e.to_string())))?;
        let cfg = serde_json::from_reader::<_, ApiServerCfg>(BufReader::new(fileobj))
            .map_err(|e| cfg_error(AppErrorCode::InvalidJsonFormat, Some(e.to_string())))?;
        Self::_check_web_listener(&cfg.listen)?;
        Self::_check_payment_gateway(&cfg.payment_gateway)?;
        Self::_check_logging(&cfg.logging)?;
        Self::_check_datastore(&cfg.data_store, limit)?;
        Ok(cfg)
    }

    fn _check_web_listener(obj: &WebApiListenCfg) -> DefaultResult<(), AppCfgError> {
        if obj.routes.is_empty() {
            return Err(cfg_error(AppErrorCode::NoRouteApiServerCfg, None));
        }
        if obj.api_version.split('.').any(|v| v.parse::<u16>().is_err()) {
            let detail = format!("version must be numeric: {}", obj.api_version);
            return Err(cfg_error(AppErrorCode::InvalidVersion, Some(detail)));
        }
        match obj.routes.iter().find(|r| r.path.is_empty()) {
            Some(r) => Err(cfg_error(AppErrorCode::InvalidRouteConfig, Some(r.to_string()))),
            None => Ok(()),
        }
    }

    fn _check_payment_gateway(obj: &AppPaymentGatewayCfg) -> DefaultResult<(), AppCfgError> {
        let code = AppErrorCode::InvalidPaymentGatewayCfg;
        if obj.timeout_ms == 0 {
            Err(cfg_error(code, Some("timeout_ms".to_string())))
        } else if obj.max_retries > 0 && obj.backoff_base_ms == 0 {
            Err(cfg_error(code, Some("backoff_base_ms".to_string())))
        } else {
            Ok(())
        }
    }

    fn _check_logging(obj: &AppLoggingCfg) -> DefaultResult<(), AppCfgError> {
        if obj.handlers.is_empty() {
            return Err(cfg_error(AppErrorCode::NoLogHandlerCfg, None));
        }
        if obj.loggers.is_empty() {
            return Err(cfg_error(AppErrorCode::NoLoggerCfg, None));
        }
        let mut hdlr_aliases = HashSet::new();
        for hdlr in obj.handlers.iter() {
            if !hdlr_aliases.insert(hdlr.alias.as_str()) {
                let detail = format!("duplicate handler: {}", hdlr.alias);
                return Err(cfg_error(AppErrorCode::InvalidHandlerLoggerCfg, Some(detail)));
            }
            let missing_path = matches!(hdlr.destination, const_log::Destination::LOCALFS)
                && hdlr.path.as_deref().map_or(true, str::is_empty);
            if missing_path {
                let detail = format!("file handler without path: {}", hdlr.alias);
                return Err(cfg_error(AppErrorCode::InvalidHandlerLoggerCfg, Some(detail)));
            }
        }
        let mut logger_aliases = HashSet::new();
        for logger in obj.loggers.iter() {
            if logger.handlers.is_empty() {
                let detail = format!("logger without handler: {}", logger.alias);
                return Err(cfg_error(AppErrorCode::NoHandlerInLoggerCfg, Some(detail)));
            }
            if !logger_aliases.insert(logger.alias.as_str()) {
                let detail = format!("duplicate logger: {}", logger.alias);
                return Err(cfg_error(AppErrorCode::InvalidHandlerLoggerCfg, Some(detail)));
            }
            let unknown = logger
                .handlers
                .iter()
                .find(|a| !hdlr_aliases.contains(a.as_str()));
            if let Some(a) = unknown {
                let detail = format!("logger:{}, unknown handler:{a}", logger.alias);
                return Err(cfg_error(AppErrorCode::InvalidHandlerLoggerCfg, Some(detail)));
            }
        }
        Ok(())
    } // end of fn _check_logging

    fn _check_datastore(
        obj: &[AppDataStoreCfg],
        limit: AppCfgHardLimit,
    ) -> DefaultResult<(), AppCfgError> {
        if obj.is_empty() {
            return Err(cfg_error(AppErrorCode::NoDatabaseCfg, None));
        }
        let exceeded = obj.iter().find_map(|item| match item {
            AppDataStoreCfg::InMemory(c) if c.max_items > limit.nitems_per_inmem_table => {
                Some(format!("limit:{}", limit.nitems_per_inmem_table))
            }
            AppDataStoreCfg::DbServer(c) if c.max_conns > limit.num_db_conns => {
                Some(format!("limit-conn:{}", limit.num_db_conns))
            }
            AppDataStoreCfg::DbServer(c) if c.idle_timeout_secs > limit.seconds_db_idle => {
                Some(format!("limit-idle-time:{}", limit.seconds_db_idle))
            }
            _others => None,
        });
        match exceeded {
            Some(detail) => Err(cfg_error(AppErrorCode::ExceedingMaxLimit, Some(detail))),
            None => Ok(()),
        }
    }
} // end of impl AppConfig

fn jsn_deny_empty_string<'de, D>(raw: D) -> DefaultResult<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(raw)?;
    if s.is_empty() {
        Err(DeserializeError::invalid_length(0, &"non-empty string"))
    } else {
        Ok(s)
    }
}

fn jsn_deny_empty_alias<'de, D>(raw: D) -> DefaultResult<AppLogAlias, D::Error>
where
    D: Deserializer<'de>,
{
    jsn_deny_empty_string(raw).map(Arc::new)
}

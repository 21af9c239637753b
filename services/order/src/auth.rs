use std::boxed::Box;
use std::fs::File;
use std::future::Future;
use std::pin::Pin;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode as jwt_decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::auth::AsyncAuthorizeRequest;

use marketplace_common::auth::{jsn_validate_ap_code, quota_matcode_deserialize_error};
use marketplace_common::config::{AppAuthCfg, AppBasepathCfg};
use marketplace_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::constant::{app_meta, HTTP_CONTENT_TYPE_JSON};
use crate::error::{AppError, AppErrorCode};

const MAX_NBYTES_KEYSTORE_FILE: u64 = 65536;

#[async_trait]
pub trait AbstractAuthKeystore: Sync + Send {
    async fn find(&self, kid: &str) -> DefaultResult<Jwk, AppError>;
}

// verifying keys are issued by separate authentication service, this
// application only reads the published JWK set from local file system
pub struct AppAuthKeystore {
    keyset: RwLock<JwkSet>,
}

impl AppAuthKeystore {
    pub fn try_create(
        basepath: &AppBasepathCfg,
        cfg: &AppAuthCfg,
    ) -> DefaultResult<Self, AppError> {
        let fullpath = basepath.system.clone() + cfg.keystore_path.as_str();
        let keyset = Self::load(fullpath.as_str())?;
        Ok(Self {
            keyset: RwLock::new(keyset),
        })
    }

    fn load(fullpath: &str) -> DefaultResult<JwkSet, AppError> {
        let f = File::open(fullpath).map_err(|e| AppError {
            code: AppErrorCode::IOerror(e.kind()),
            detail: Some(format!("keystore, {e}")),
        })?;
        let fsize = f
            .metadata()
            .map_err(|e| AppError {
                code: AppErrorCode::IOerror(e.kind()),
                detail: Some(e.to_string()),
            })?
            .len();
        if fsize > MAX_NBYTES_KEYSTORE_FILE {
            return Err(AppError {
                code: AppErrorCode::ExceedingMaxLimit,
                detail: Some(format!("keystore-size:{fsize}")),
            });
        }
        let keyset = serde_json::from_reader::<File, JwkSet>(f).map_err(|e| AppError {
            code: AppErrorCode::InvalidJsonFormat,
            detail: Some(e.to_string()),
        })?;
        if keyset.keys.iter().any(|k| k.common.key_id.is_none()) {
            return Err(AppError {
                code: AppErrorCode::InvalidInput,
                detail: Some("keystore-missing-key-id".to_string()),
            });
        }
        Ok(keyset)
    }
} // end of impl AppAuthKeystore

#[async_trait]
impl AbstractAuthKeystore for AppAuthKeystore {
    async fn find(&self, kid: &str) -> DefaultResult<Jwk, AppError> {
        let guard = self.keyset.read().await;
        guard.find(kid).cloned().ok_or(AppError {
            code: AppErrorCode::CryptoFailure,
            detail: Some(format!("unknown-key-id:{kid}")),
        })
    }
}

#[allow(non_camel_case_types)]
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub enum AppAuthPermissionCode {
    can_manage_order,
    can_edit_product_price,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AppAuthQuotaMatCode {
    NumCartLines,
    NumWishlistItems,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct AppAuthClaimPermission {
    #[serde(deserialize_with = "AppAuthedClaim::_jsn_validate_ap_code")]
    pub app_code: u8,
    pub codename: AppAuthPermissionCode,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct AppAuthClaimQuota {
    #[serde(deserialize_with = "AppAuthedClaim::_jsn_validate_ap_code")]
    pub app_code: u8,
    pub mat_code: AppAuthQuotaMatCode,
    pub maxnum: u32,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct AppAuthedClaim {
    pub profile: u32,
    pub iat: i64,
    pub exp: i64,
    pub aud: Vec<String>,
    pub perms: Vec<AppAuthClaimPermission>,
    pub quota: Vec<AppAuthClaimQuota>,
}

impl AppAuthedClaim {
    fn _jsn_validate_ap_code<'de, D>(raw: D) -> DefaultResult<u8, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        jsn_validate_ap_code(raw, app_meta::RESOURCE_QUOTA_AP_CODE, app_meta::LABEL)
    }

    pub fn contain_permission(&self, code: AppAuthPermissionCode) -> bool {
        self.perms.iter().any(|p| p.codename == code)
    }

    pub fn quota_limit(&self, code: AppAuthQuotaMatCode) -> Option<u32> {
        self.quota
            .iter()
            .find(|q| q.mat_code == code)
            .map(|q| q.maxnum)
    }

    // staff members manage orders of all users
    pub fn is_staff(&self) -> bool {
        self.contain_permission(AppAuthPermissionCode::can_manage_order)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AppAuthedClaim
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> DefaultResult<Self, Self::Rejection> {
        // the claim is inserted by the authorization layer, missing claim
        // means the route was not wrapped with the layer
        parts
            .extensions
            .remove::<Self>()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

impl TryFrom<u8> for AppAuthQuotaMatCode {
    type Error = u8;
    fn try_from(value: u8) -> DefaultResult<Self, Self::Error> {
        match value {
            1 => Ok(Self::NumCartLines),
            2 => Ok(Self::NumWishlistItems),
            _others => Err(value),
        }
    }
}
impl From<AppAuthQuotaMatCode> for u8 {
    fn from(value: AppAuthQuotaMatCode) -> u8 {
        match value {
            AppAuthQuotaMatCode::NumCartLines => 1,
            AppAuthQuotaMatCode::NumWishlistItems => 2,
        }
    }
}
impl<'de> Deserialize<'de> for AppAuthQuotaMatCode {
    fn deserialize<D>(raw: D) -> DefaultResult<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let val = u8::deserialize(raw)?;
        Self::try_from(val).map_err(|v| quota_matcode_deserialize_error::<D>(v, (1, 2)))
    }
}
impl Serialize for AppAuthQuotaMatCode {
    fn serialize<S>(&self, serializer: S) -> DefaultResult<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let raw = u8::from(self.clone());
        serializer.serialize_u8(raw)
    }
}

impl From<JwtError> for AppError {
    fn from(value: JwtError) -> Self {
        let (code, detail) = match value.kind() {
            JwtErrorKind::InvalidToken | JwtErrorKind::Json(_) | JwtErrorKind::Utf8(_) => {
                (AppErrorCode::InvalidJsonFormat, value.to_string())
            }
            JwtErrorKind::Base64(_) | JwtErrorKind::InvalidKeyFormat => {
                (AppErrorCode::DataCorruption, value.to_string())
            }
            JwtErrorKind::InvalidSignature => {
                (AppErrorCode::CryptoFailure, "invalid-signature".to_string())
            }
            JwtErrorKind::ExpiredSignature => {
                (AppErrorCode::CryptoFailure, "expired".to_string())
            }
            JwtErrorKind::InvalidAudience => {
                (AppErrorCode::CryptoFailure, "invalid-audience".to_string())
            }
            JwtErrorKind::InvalidAlgorithm | JwtErrorKind::InvalidAlgorithmName => {
                (AppErrorCode::CryptoFailure, "invalid-algorithm".to_string())
            }
            JwtErrorKind::MissingRequiredClaim(c) => {
                (AppErrorCode::InvalidInput, format!("missing-claim:{c}"))
            }
            _others => (AppErrorCode::CryptoFailure, value.to_string()),
        };
        AppError {
            code,
            detail: Some(detail),
        }
    }
}

#[derive(Clone)]
pub struct AppJwtAuthentication {
    keystore: Arc<Box<dyn AbstractAuthKeystore>>,
    log_ctx: Option<Arc<AppLogContext>>,
}

impl AppJwtAuthentication {
    pub fn new(
        keystore: Arc<Box<dyn AbstractAuthKeystore>>,
        log_ctx: Option<Arc<AppLogContext>>,
    ) -> Self {
        Self { keystore, log_ctx }
    }

    fn bearer_token(hdr_val: Option<&HeaderValue>) -> DefaultResult<String, AppError> {
        let raw = hdr_val
            .ok_or(AppError {
                code: AppErrorCode::EmptyInputData,
                detail: Some("missing-authorization-header".to_string()),
            })?
            .to_str()
            .map_err(|e| AppError {
                code: AppErrorCode::InvalidInput,
                detail: Some(e.to_string()),
            })?;
        // the scheme is case-sensitive in this application
        raw.strip_prefix("Bearer ")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(AppError {
                code: AppErrorCode::InvalidInput,
                detail: Some("authorization-scheme".to_string()),
            })
    }

    async fn verify(
        keystore: Arc<Box<dyn AbstractAuthKeystore>>,
        encoded: &str,
    ) -> DefaultResult<AppAuthedClaim, AppError> {
        let hdr = decode_header(encoded)?;
        let kid = hdr.kid.as_ref().ok_or(AppError {
            code: AppErrorCode::InvalidJsonFormat,
            detail: Some("jwt-missing-key-id".to_string()),
        })?;
        let jwk = keystore.find(kid.as_str()).await?;
        let key = DecodingKey::from_jwk(&jwk)?;
        let validation = {
            let mut v = Validation::new(hdr.alg);
            v.set_audience(&[app_meta::LABEL]);
            v.set_required_spec_claims(&["exp", "aud", "iat"]);
            v
        };
        let decoded = jwt_decode::<AppAuthedClaim>(encoded, &key, &validation)?;
        Ok(decoded.claims)
    }

    fn error_response(e: AppError) -> Response<AxumBody> {
        let body = serde_json::json!({"reason": "authentication-failure"}).to_string();
        let mut resp = Response::new(AxumBody::from(body));
        *resp.status_mut() = StatusCode::UNAUTHORIZED;
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(HTTP_CONTENT_TYPE_JSON),
        );
        resp.extensions_mut().insert(e);
        resp
    }
} // end of impl AppJwtAuthentication

impl AsyncAuthorizeRequest<AxumBody> for AppJwtAuthentication {
    type RequestBody = AxumBody;
    type ResponseBody = AxumBody;
    type Future = Pin<
        Box<
            dyn Future<
                    Output = DefaultResult<Request<AxumBody>, Response<Self::ResponseBody>>,
                > + Send,
        >,
    >;

    fn authorize(&mut self, mut request: Request<AxumBody>) -> Self::Future {
        let keystore = self.keystore.clone();
        let log_ctx = self.log_ctx.clone();
        let result = Self::bearer_token(request.headers().get(header::AUTHORIZATION));
        Box::pin(async move {
            let verified = match result {
                Ok(token) => Self::verify(keystore, token.as_str()).await,
                Err(e) => Err(e),
            };
            match verified {
                Ok(claim) => {
                    request.extensions_mut().insert(claim);
                    Ok(request)
                }
                Err(e) => {
                    if let Some(logctx) = log_ctx {
                        app_log_event!(logctx, AppLogLevel::INFO, "{:?}", e);
                    }
                    Err(Self::error_response(e))
                }
            }
        })
    }
} // end of impl AppJwtAuthentication

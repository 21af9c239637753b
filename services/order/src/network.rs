use std::io::ErrorKind;
use std::net::ToSocketAddrs;
use std::result::Result as DefaultResult;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::auth::AsyncRequireAuthorizationLayer;

use marketplace_common::config::{WebApiListenCfg, WebApiRouteCfg};

use crate::api::web::{ApiRouteTableType, ApiRouteType};
use crate::error::{AppError, AppErrorCode};
use crate::{AppJwtAuthentication, AppSharedState};

pub type WebServiceRoute = Router<()>;

// Only handlers listed in the config are exposed, every exposed route
// requires a valid access token.
pub fn app_web_service(
    cfg: &WebApiListenCfg,
    rtable: ApiRouteTableType,
    shr_state: AppSharedState,
) -> (WebServiceRoute, u16) {
    let mut router: Router<AppSharedState> = Router::new();
    let filt_fn = |item: &&WebApiRouteCfg| -> bool {
        let hdlr_label = item.handler.as_str();
        rtable.contains_key(hdlr_label)
    };
    let mut num_applied: u16 = 0;
    for item in cfg.routes.iter().filter(filt_fn) {
        let hdlr_label = item.handler.as_str();
        if let Some(route) = rtable.get(hdlr_label) {
            let route_cpy: ApiRouteType = route.clone();
            router = router.route(item.path.as_str(), route_cpy);
            num_applied += 1u16;
        } // 2 different paths might linked to the same handler
    }
    let router = if num_applied > 0 {
        let authn = AppJwtAuthentication::new(
            shr_state.auth_keystore(),
            Some(shr_state.log_context().clone()),
        );
        let router = router.route_layer(AsyncRequireAuthorizationLayer::new(authn));
        let api_ver_path = String::from("/") + &cfg.api_version;
        Router::new().nest(api_ver_path.as_str(), router)
    } else {
        router
    };
    // the state type `S` of a router means the state which is still
    // missing, it becomes `()` once the state is provided
    let router = router.with_state(shr_state);
    (router, num_applied)
} // end of fn app_web_service

pub mod middleware {
    use std::fs::File;
    use std::future::Future;
    use std::pin::Pin;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use axum::body::{Body as AxumBody, Bytes as AxumBytes};
    use axum::BoxError;
    use http::{header, HeaderName, HeaderValue, Method, Response, StatusCode};
    use http_body::Body as HttpBody;
    use serde::Deserialize;
    use tower::limit::ConcurrencyLimitLayer;
    use tower::{Layer, Service};
    use tower_http::cors::CorsLayer;
    use tower_http::limit::RequestBodyLimitLayer;

    use super::{AppError, AppErrorCode, DefaultResult};
    use crate::constant::HTTP_CONTENT_TYPE_JSON;

    #[derive(Deserialize)]
    struct CorsAllowedOrigin {
        order: String,
    }

    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct CorsConfig {
        ALLOWED_ORIGIN: CorsAllowedOrigin,
        ALLOWED_METHODS: Vec<String>,
        ALLOWED_HEADERS: Vec<String>,
        ALLOW_CREDENTIALS: bool,
        PREFLIGHT_MAX_AGE: u64,
    }

    pub fn concurrency_limit(max_conn: u32) -> ConcurrencyLimitLayer {
        ConcurrencyLimitLayer::new(max_conn as usize)
    }

    pub fn req_body_limit(limit: usize) -> RequestBodyLimitLayer {
        RequestBodyLimitLayer::new(limit)
    }

    pub fn cors(cfg_path: String) -> DefaultResult<CorsLayer, AppError> {
        let f = File::open(cfg_path).map_err(|e| AppError {
            detail: Some(e.to_string()),
            code: AppErrorCode::IOerror(e.kind()),
        })?;
        let val = serde_json::from_reader::<File, CorsConfig>(f).map_err(|e| AppError {
            detail: Some(e.to_string()),
            code: AppErrorCode::InvalidJsonFormat,
        })?;
        let methods = val
            .ALLOWED_METHODS
            .iter()
            .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
            .collect::<Vec<Method>>();
        if val.ALLOWED_METHODS.len() > methods.len() {
            return Err(AppError {
                detail: Some("invalid-allowed-method".to_string()),
                code: AppErrorCode::InvalidInput,
            });
        }
        let headers = val
            .ALLOWED_HEADERS
            .iter()
            .filter_map(|h| HeaderName::from_str(h.as_str()).ok())
            .collect::<Vec<HeaderName>>();
        if !headers.contains(&header::AUTHORIZATION)
            || !headers.contains(&header::CONTENT_TYPE)
            || !headers.contains(&header::ACCEPT)
        {
            return Err(AppError {
                detail: Some("invalid-allowed-header".to_string()),
                code: AppErrorCode::InvalidInput,
            });
        }
        let origin = val
            .ALLOWED_ORIGIN
            .order
            .parse::<HeaderValue>()
            .map_err(|e| AppError {
                detail: Some(format!("invalid-origin-header: {}", e)),
                code: AppErrorCode::InvalidInput,
            })?;
        let co = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(val.ALLOW_CREDENTIALS)
            .max_age(Duration::from_secs(val.PREFLIGHT_MAX_AGE));
        Ok(co)
    } // end of fn cors

    // reject new requests once the shutdown flag is set, and count the
    // requests still in progress so the server knows when it is drained
    pub struct ShutdownDetection<S> {
        inner: S,
        flag: Arc<AtomicBool>,
        num_reqs: Arc<AtomicU32>,
    }
    pub struct ShutdownDetectionLayer {
        flag: Arc<AtomicBool>,
        num_reqs: Arc<AtomicU32>,
    }

    fn shutting_down_response() -> Response<AxumBody> {
        let body = AxumBody::from(r#"{"reason":"server-shutting-down"}"#);
        let mut resp = Response::new(body);
        *resp.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(HTTP_CONTENT_TYPE_JSON),
        );
        resp
    }

    impl<S, REQ, RB> Service<REQ> for ShutdownDetection<S>
    where
        S: Service<REQ, Response = Response<RB>>,
        S::Future: Future + Send + 'static,
        S::Error: Send + 'static,
        RB: HttpBody<Data = AxumBytes> + Send + 'static,
        RB::Error: Into<BoxError>,
    {
        type Response = Response<AxumBody>;
        type Error = S::Error;
        type Future =
            Pin<Box<dyn Future<Output = DefaultResult<Self::Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<DefaultResult<(), Self::Error>> {
            self.inner.poll_ready(cx)
        }

        fn call(&mut self, req: REQ) -> Self::Future {
            if self.flag.load(Ordering::Relaxed) {
                Box::pin(async { Ok(shutting_down_response()) })
            } else {
                let num_reqs = self.num_reqs.clone();
                let _prev = num_reqs.fetch_add(1u32, Ordering::Relaxed);
                let inner_fut = self.inner.call(req);
                Box::pin(async move {
                    let result = inner_fut.await;
                    let _prev = num_reqs.fetch_sub(1u32, Ordering::Relaxed);
                    // response body type varies with the layers wrapped inside
                    result.map(|resp| resp.map(AxumBody::new))
                })
            }
        }
    } // end of impl ShutdownDetection

    impl ShutdownDetectionLayer {
        pub fn new(flag: Arc<AtomicBool>, num_reqs: Arc<AtomicU32>) -> Self {
            Self { flag, num_reqs }
        }
    }
    impl<S> Layer<S> for ShutdownDetectionLayer {
        type Service = ShutdownDetection<S>;

        fn layer(&self, inner: S) -> Self::Service {
            ShutdownDetection {
                inner,
                flag: self.flag.clone(),
                num_reqs: self.num_reqs.clone(),
            }
        }
    }
    impl Clone for ShutdownDetectionLayer {
        fn clone(&self) -> Self {
            Self {
                flag: self.flag.clone(),
                num_reqs: self.num_reqs.clone(),
            }
        }
    }
    impl<S: Clone> Clone for ShutdownDetection<S> {
        fn clone(&self) -> Self {
            Self {
                inner: self.inner.clone(),
                flag: self.flag.clone(),
                num_reqs: self.num_reqs.clone(),
            }
        }
    }
} // end of inner-module middleware

pub async fn net_listener(
    mut domain_host: String,
    port: u16,
) -> DefaultResult<TcpListener, AppError> {
    if !domain_host.contains(':') {
        domain_host += ":0";
    }
    let mut iterator = domain_host.to_socket_addrs().map_err(
        // IP not found after domain name resolution
        |e| AppError {
            detail: Some(e.to_string() + ", domain_host:" + &domain_host),
            code: AppErrorCode::IOerror(ErrorKind::AddrNotAvailable),
        },
    )?;
    loop {
        let mut addr = iterator.next().ok_or(AppError {
            detail: Some("failed to bound with all IPs".to_string()),
            code: AppErrorCode::IOerror(ErrorKind::AddrInUse),
        })?;
        addr.set_port(port);
        if let Ok(b) = TcpListener::bind(addr).await {
            break Ok(b);
        }
    } // end of loop
} // end of fn net_listener

use std::collections::HashMap;
use std::env;
use std::sync::atomic::Ordering;

use tokio::runtime::Builder as RuntimeBuilder;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use marketplace_common::config::{AppCfgHardLimit, AppCfgInitArgs, AppConfig};
use marketplace_common::confidentiality::{self, AbstractConfidentiality};
use marketplace_common::constant::env_vars::EXPECTED_LABELS;
use marketplace_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use marketplace_order::api::web::route_table;
use marketplace_order::constant::hard_limit;
use marketplace_order::network::{app_web_service, middleware, net_listener};
use marketplace_order::AppSharedState;

async fn shutdown_signal(shr_state: AppSharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(_e) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    shr_state.shutdown().store(true, Ordering::Relaxed);
    let logctx = shr_state.log_context().clone();
    let num_reqs = shr_state.num_requests().load(Ordering::Relaxed);
    app_log_event!(
        logctx,
        AppLogLevel::WARNING,
        "shutdown requested, num-reqs-in-progress:{num_reqs}"
    );
}

async fn start_server(shr_state: AppSharedState) {
    let logctx = shr_state.log_context().clone();
    let cfg = shr_state.config().clone();
    let listen_cfg = &cfg.api_server.listen;
    let routes = route_table();
    let (service, num_applied) = app_web_service(listen_cfg, routes, shr_state.clone());
    if num_applied == 0 {
        app_log_event!(
            logctx,
            AppLogLevel::ERROR,
            "no route created, web API server failed to start"
        );
        return;
    }
    let listener = match net_listener(listen_cfg.host.clone(), listen_cfg.port).await {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(logctx, AppLogLevel::ERROR, "API server failed to start, {e}");
            return;
        }
    };
    let co = match middleware::cors(cfg.basepath.system.clone() + listen_cfg.cors.as_str()) {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(logctx, AppLogLevel::ERROR, "cors layer init error, {e}");
            CorsLayer::new()
        }
    };
    let shutdown_detect =
        middleware::ShutdownDetectionLayer::new(shr_state.shutdown(), shr_state.num_requests());
    let middlewares = ServiceBuilder::new()
        .layer(shutdown_detect)
        .layer(middleware::concurrency_limit(listen_cfg.max_connections))
        .layer(middleware::req_body_limit(cfg.api_server.limit_req_body_in_bytes))
        .layer(co);
    let service = service.layer(middlewares);
    app_log_event!(
        logctx,
        AppLogLevel::INFO,
        "API server starting, num-routes:{num_applied}"
    );
    let result = axum::serve(listener, service.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shr_state))
        .await;
    if let Err(e) = result {
        app_log_event!(logctx, AppLogLevel::ERROR, "API server error, {e}");
    }
    app_log_event!(logctx, AppLogLevel::WARNING, "API server terminated");
} // end of fn start_server

fn start_async_runtime(cfg: AppConfig, confidential: Box<dyn AbstractConfidentiality>) {
    let log_ctx = AppLogContext::new(&cfg.basepath, &cfg.api_server.logging);
    let stack_nbytes: usize = (cfg.api_server.stack_sz_kb as usize) << 10;
    let num_workers = cfg.api_server.num_workers as usize;
    let shr_state = match AppSharedState::new(cfg, log_ctx, confidential) {
        Ok(v) => v,
        Err(e) => {
            println!("app failed to init shared state, {e}");
            return;
        }
    };
    let log_ctx = shr_state.log_context().clone();
    let log_ctx2 = log_ctx.clone();
    let result = RuntimeBuilder::new_multi_thread()
        .worker_threads(num_workers)
        .on_thread_start(move || {
            let logctx = log_ctx.clone();
            app_log_event!(logctx, AppLogLevel::DEBUG, "[API server] worker started");
        })
        .on_thread_stop(move || {
            let logctx = log_ctx2.clone();
            app_log_event!(logctx, AppLogLevel::DEBUG, "[API server] worker terminating");
        })
        .thread_stack_size(stack_nbytes)
        .thread_name("web-api-worker")
        .enable_io()
        // timeout and backoff of payment gateway rely on the timer
        .enable_time()
        .build();
    match result {
        Ok(rt) => {
            rt.block_on(async move {
                start_server(shr_state).await;
            });
        }
        Err(e) => {
            let logctx = shr_state.log_context();
            app_log_event!(logctx, AppLogLevel::ERROR, "async runtime failed to build, {e}");
        }
    };
} // end of fn start_async_runtime

fn main() {
    let iter = env::vars().filter(|(k, _v)| EXPECTED_LABELS.contains(&k.as_str()));
    let env_var_map: HashMap<String, String> = HashMap::from_iter(iter);
    let args = AppCfgInitArgs {
        env_var_map,
        limit: AppCfgHardLimit {
            nitems_per_inmem_table: hard_limit::MAX_ITEMS_STORED_PER_MODEL,
            num_db_conns: hard_limit::MAX_DB_CONNECTIONS,
            seconds_db_idle: hard_limit::MAX_SECONDS_DB_IDLE,
        },
    };
    match AppConfig::new(args) {
        Ok(cfg) => match confidentiality::build_context(&cfg) {
            Ok(confidential) => start_async_runtime(cfg, confidential),
            Err(e) => {
                println!("app failed to init confidentiality handler, {e}");
            }
        },
        Err(e) => {
            println!("app failed to configure, {e}");
        }
    };
} // end of fn main

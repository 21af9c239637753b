use std::collections::HashMap;
use std::io::stdout;
use std::iter::successors;
use std::path::Path;

use tracing::dispatcher::Dispatch;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::Layer as TraceLayer;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::{Layer as LayerIntf, Registry};

use crate::config::{AppBasepathCfg, AppLogHandlerCfg, AppLoggerCfg, AppLoggingCfg};
use crate::constant::logging::{Destination, Level};
use crate::AppLogAlias;

pub type AppLogLevel = Level;

// `tracing` has no FATAL, it is merged into ERROR
pub const fn to_tracing_level(lvl: &AppLogLevel) -> tracing::Level {
    match lvl {
        Level::FATAL | Level::ERROR => tracing::Level::ERROR,
        Level::WARNING => tracing::Level::WARN,
        Level::INFO => tracing::Level::INFO,
        Level::DEBUG => tracing::Level::DEBUG,
        Level::TRACE => tracing::Level::TRACE,
    }
}

struct LogSink {
    writer: NonBlocking,
    min_level: tracing::Level,
}

// Loggers are keyed by module path. The worker guards flush pending events
// of the non-blocking writers on drop, so they live as long as the context.
pub struct AppLogContext {
    loggers: HashMap<AppLogAlias, Dispatch>,
    _flush_guards: Vec<WorkerGuard>,
}

fn open_sink(basepath: &AppBasepathCfg, cfg: &AppLogHandlerCfg) -> (NonBlocking, WorkerGuard) {
    match cfg.destination {
        Destination::CONSOLE => tracing_appender::non_blocking(stdout()),
        Destination::LOCALFS => {
            let fullpath = cfg
                .path
                .as_deref()
                .map(|p| p.trim_start_matches('/'))
                .filter(|p| !p.is_empty())
                .map(|p| Path::new(basepath.system.as_str()).join(p));
            let target = fullpath.as_ref().and_then(|p| Some((p.parent()?, p.file_name()?)));
            if let Some((dir, fname_prefix)) = target {
                let appender = RollingFileAppender::new(Rotation::DAILY, dir, fname_prefix);
                tracing_appender::non_blocking(appender)
            } else {
                println!("[WARN] log handler:{}, invalid file path, use console", cfg.alias);
                tracing_appender::non_blocking(stdout())
            }
        }
    } // each non-blocking writer owns a dedicated worker thread
}

fn build_dispatch(cfg: &AppLoggerCfg, sinks: &HashMap<AppLogAlias, LogSink>) -> Dispatch {
    let layers = cfg
        .handlers
        .iter()
        .filter_map(|alias| sinks.get(alias))
        .map(|sink| {
            let lvl = cfg.level.as_ref().map_or(sink.min_level, to_tracing_level);
            TraceLayer::new()
                .with_writer(sink.writer.clone())
                .with_file(false) // keep absolute source path out of log files
                .with_line_number(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(LevelFilter::from_level(lvl))
        })
        .collect::<Vec<_>>();
    Dispatch::new(Registry::default().with(layers))
}

impl AppLogContext {
    pub fn new(basepath: &AppBasepathCfg, cfg: &AppLoggingCfg) -> Self {
        let mut sinks = HashMap::new();
        let mut guards = Vec::with_capacity(cfg.handlers.len());
        for hdlr in cfg.handlers.iter() {
            let (writer, guard) = open_sink(basepath, hdlr);
            let min_level = to_tracing_level(&hdlr.min_level);
            sinks.insert(hdlr.alias.clone(), LogSink { writer, min_level });
            guards.push(guard);
        }
        let loggers = cfg
            .loggers
            .iter()
            .map(|lg| (lg.alias.clone(), build_dispatch(lg, &sinks)))
            .collect();
        Self {
            loggers,
            _flush_guards: guards,
        }
    }

    // a logger configured for `marketplace_order::usecase` also serves
    // `marketplace_order::usecase::cart` unless the latter has its own one
    pub fn get_assigner(&self, mod_path: &str) -> Option<&Dispatch> {
        successors(Some(mod_path), |&p| p.rfind("::").map(|pos| &p[..pos]))
            .find_map(|p| self.loggers.get(&p.to_string()))
    }
}

// exported since callers in other crates expand it with their own module path
#[macro_export]
macro_rules! app_log_event {
    ( $ctx:ident, $lvl:expr, $($arg:tt)+ ) => {{
        const MOD_PATH: &str = module_path!();
        if let Some(assigner) = $ctx.get_assigner(MOD_PATH) {
            const LVL_INNER: tracing::Level = $crate::logging::to_tracing_level(&$lvl);
            tracing::dispatcher::with_default(assigner, || {
                tracing::event!(LVL_INNER, $($arg)+);
            });
        } else {
            println!("[WARN] no logger for module path: {}", MOD_PATH);
            println!($($arg)+);
        }
    }};
}

pub use app_log_event;

use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use marquee::{
    application::{
        access::{AccessPolicy, OpenAccess, StaticTokens},
        catalog::EntityAdapter,
        error::AppError,
        query::PaginatedQueryService,
        repos::{CacheStore, IndexClient},
    },
    cache::InMemoryCacheStore,
    config,
    infra::{
        elastic::ElasticIndexClient,
        error::InfraError,
        http::{self, CatalogState},
        redis::RedisCacheStore,
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Check(_) => run_check(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = build_catalog_state(&settings)?;

    if !state.index.ping().await {
        warn!(url = %settings.index.url, "search index is not reachable yet");
    }

    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "catalog API listening");

    let shutdown = Arc::new(Notify::new());
    let trigger = Arc::clone(&shutdown);
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { trigger.notified().await })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        () = shutdown_signal() => {}
    }

    info!(
        grace_secs = settings.server.graceful_shutdown.as_secs(),
        "shutdown requested, draining connections"
    );
    shutdown.notify_one();
    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!("graceful shutdown timed out, dropping open connections");
            Ok(())
        }
    }
}

async fn run_check(settings: config::Settings) -> Result<(), AppError> {
    let index = ElasticIndexClient::new(&settings.index)?;
    let index_up = index.ping().await;
    info!(url = %settings.index.url, up = index_up, "search index");

    match build_cache(&settings.cache)? {
        Some(cache) => info!(up = cache.ping().await, "cache"),
        None => info!("cache disabled"),
    }

    if index_up {
        Ok(())
    } else {
        Err(AppError::from(InfraError::index(format!(
            "search index at {} is unreachable",
            settings.index.url
        ))))
    }
}

fn build_catalog_state(settings: &config::Settings) -> Result<CatalogState, AppError> {
    let index: Arc<dyn IndexClient> = Arc::new(ElasticIndexClient::new(&settings.index)?);
    let cache = build_cache(&settings.cache)?;
    let single_flight = settings.cache.single_flight && cache.is_some();

    let films = PaginatedQueryService::new(
        EntityAdapter::films().with_ttl(settings.ttl.films),
        Arc::clone(&index),
        cache.clone(),
    )
    .with_single_flight(single_flight);
    let genres = PaginatedQueryService::new(
        EntityAdapter::genres().with_ttl(settings.ttl.genres),
        Arc::clone(&index),
        cache.clone(),
    )
    .with_single_flight(single_flight);
    let persons = PaginatedQueryService::new(
        EntityAdapter::persons().with_ttl(settings.ttl.persons),
        Arc::clone(&index),
        cache.clone(),
    )
    .with_single_flight(single_flight);

    let access: Arc<dyn AccessPolicy> = if settings.auth.tokens.is_empty() {
        Arc::new(OpenAccess)
    } else {
        Arc::new(StaticTokens::new(&settings.auth.tokens))
    };

    Ok(CatalogState {
        films: Arc::new(films),
        genres: Arc::new(genres),
        persons: Arc::new(persons),
        index,
        cache,
        access,
    })
}

fn build_cache(
    settings: &config::CacheSettings,
) -> Result<Option<Arc<dyn CacheStore>>, AppError> {
    if !settings.enabled {
        info!("cache layer disabled");
        return Ok(None);
    }

    if let Some(url) = settings.url.as_ref() {
        let store = RedisCacheStore::new(url.as_str(), settings)?;
        return Ok(Some(Arc::new(store) as Arc<dyn CacheStore>));
    }

    info!("no cache URL configured, using in-process cache");
    let store = Arc::new(InMemoryCacheStore::new());
    let janitor = Arc::clone(&store);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EVICTION_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            janitor.evict_expired();
        }
    });
    Ok(Some(store as Arc<dyn CacheStore>))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

use std::{env, fs::OpenOptions, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use caddie_sync::{
    AppState, BackfillConfig, MAX_PAGE_SIZE, PlaidClient, ProviderConfig, build_router,
    graceful_shutdown, logging_middleware,
};

/// The REST API server for caddie_sync.
///
/// Reads the cookie secret from `SECRET` and the provider API keys from
/// `PROVIDER_CLIENT_ID` and `PROVIDER_SECRET`.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The base URL of the provider's API.
    #[arg(long, default_value = "https://sandbox.plaid.com")]
    provider_url: String,

    /// How many transactions to request per page when loading history.
    #[arg(long, default_value_t = MAX_PAGE_SIZE)]
    page_size: usize,

    /// The most transactions a single history request may load.
    #[arg(long)]
    max_history_records: Option<usize>,

    /// Log request and response bodies, with credentials redacted.
    #[arg(long)]
    log_bodies: bool,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");
    let client_id = env::var("PROVIDER_CLIENT_ID")
        .expect("The environment variable 'PROVIDER_CLIENT_ID' must be set");
    let provider_secret = env::var("PROVIDER_SECRET")
        .expect("The environment variable 'PROVIDER_SECRET' must be set");

    let provider = PlaidClient::new(ProviderConfig::new(
        &args.provider_url,
        &client_id,
        &provider_secret,
    ))
    .expect("Could not create the provider client");

    let backfill_config = BackfillConfig {
        page_size: args.page_size,
        max_records: args
            .max_history_records
            .or(BackfillConfig::default().max_records),
    };

    let conn = Connection::open(&args.db_path).expect("Could not open the database");
    let state = AppState::new(conn, &secret, Arc::new(provider), backfill_config)
        .expect("Could not initialize the database");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let mut router = build_router(state);

    if args.log_bodies {
        router = router.layer(middleware::from_fn(logging_middleware));
    }

    let router = add_tracing_layer(router);

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .unwrap();
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but the error
        // responses already log themselves.
        .on_failure(());

    router.layer(tracing_layer)
}

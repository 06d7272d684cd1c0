//! Radiation Monitor — Binary Entrypoint
//! Boots the Axum HTTP server: relay endpoint, dashboard views, and the refresh loop.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Before tracing, so RUST_LOG / MONITOR_LOG_JSON from .env apply.
    let _ = dotenvy::dotenv();

    // No-op when the runtime already installed a subscriber.
    radiation_monitor::init_tracing();

    let router = radiation_monitor::app()
        .await
        .map_err(shuttle_runtime::Error::Custom)?;

    Ok(router.into())
}

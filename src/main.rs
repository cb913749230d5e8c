use anyhow::Result;
use axum::Router;
use kepler_energy_planner::config::Config;
use kepler_energy_planner::telemetry::{self, init_tracing};
use kepler_energy_planner::{api, controller};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;
    let app_state = controller::AppState::new(cfg.clone()).await?;

    let mut app: Router = api::router(app_state.clone(), &cfg);

    #[cfg(feature = "swagger")]
    {
        app = api::with_swagger(app);
    }

    #[cfg(feature = "metrics")]
    {
        app = api::with_metrics(app);
    }

    let addr = cfg.server.socket_addr()?;
    info!(%addr, "starting kepler energy planner");

    let planner_runtime = controller::spawn_controller_tasks(app_state.clone(), cfg.clone());
    app = app.nest(
        "/api/v2",
        api::planner::router(planner_runtime, cfg.auth.token.clone()),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}

use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use chainsim_auth::configuration::get_configuration;
use chainsim_auth::startup::run;
use chainsim_auth::telemetry::init_telemetry;
use chainsim_auth::user_store::PgUserRepository;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let configuration = match get_configuration() {
        Ok(config) => config,
        Err(e) => {
            init_telemetry("info");
            tracing::error!(error = %e, "Failed to read configuration");
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    init_telemetry(&configuration.application.log_filter);
    tracing::info!(
        environment = %configuration.application.environment,
        "Configuration loaded successfully"
    );

    // Connections are opened on first use; an unreachable database
    // surfaces as 503 per request instead of failing startup.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(
            configuration.database.acquire_timeout_seconds,
        ))
        .connect_lazy(&configuration.database.connection_string())
        .map_err(|e| {
            tracing::error!(error = %e, "Invalid database connection settings");
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Database configuration error")
        })?;

    let users = Arc::new(PgUserRepository::new(pool));

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(address = %address, "Server listening");

    run(listener, users, configuration)?.await
}

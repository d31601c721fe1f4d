use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use tessera_server::config::Config;
use tessera_server::gateway::StripeGateway;
use tessera_server::identity::HttpIdentityDirectory;
use tessera_server::routes::create_routes;
use tessera_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let gateway = Arc::new(StripeGateway::new(config.stripe_secret_key.clone()));
    let identity = Arc::new(HttpIdentityDirectory::new(
        config.identity_api_url.clone(),
        config.identity_api_key.clone(),
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = AppState {
        pool,
        gateway,
        identity,
        config: Arc::new(config),
    };
    let app = create_routes(state);

    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}

use refined_crm::{app, db, docs, jobs, utils};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::load_env();
    init_tracing();

    let pool = db::init().await?;
    let app = app::create_app(pool.clone()).await?;

    let reminders = jobs::ReminderConfig::from_env()?;
    let _reminder_task = jobs::spawn(pool, reminders);

    let port = utils::env_port("APP_PORT", 8000)?;

    let openapi = docs::build_openapi(port)?;
    let app = app.merge(docs::swagger_routes(&openapi)?);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

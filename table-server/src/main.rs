use table_server::utils::logger::init_logger_with_file;
use table_server::{Config, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    tracing::info!(
        work_dir = %config.work_dir,
        store_id = config.store.store_id,
        timezone = %config.store.timezone,
        numbering = %config.store.numbering,
        "Starting table server"
    );

    Server::new(config).run().await?;
    Ok(())
}

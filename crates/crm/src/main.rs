use std::sync::Arc;

use crm_core::config::Config;
use crm_db::CrmDb;

#[tokio::main]
async fn main() -> Result<(), crm_core::Error> {
    crm_core::logging::init("crm")?;

    let cfg = Arc::new(Config::load()?);

    let db = CrmDb::open(&cfg.database_path).await?;
    tracing::info!(path = %cfg.database_path, "database ready");

    crm_telegram::router::run_polling(cfg, db)
        .await
        .map_err(|e| crm_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}

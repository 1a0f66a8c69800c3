use chrono::Utc;
use dotenvy::dotenv;

use meetcheck::{config::PruneConfig, database, services::token_service};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match PruneConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let pool = match database::connect(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("cannot open database: {e}");
            std::process::exit(1);
        }
    };

    match token_service::prune_expired_tokens(&pool, Utc::now(), config.grace_hours).await {
        Ok(deleted) => {
            println!(
                "token prune: deleted={}, grace_hours={}",
                deleted, config.grace_hours
            );
        }
        Err(e) => {
            eprintln!("token prune failed: {e}");
            std::process::exit(1);
        }
    }
}

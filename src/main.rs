#[macro_use]
extern crate log;

use std::error::Error;
use std::time::Duration;

use actix_web::{App, HttpServer, middleware::Logger, web::Data};
use sqlx::postgres::PgPoolOptions;

use ballot_box::{BallotFile, Blocklist};
use config::{Config, Mode};
use db::PollDb;
use operations::PollOperations;

mod ballot_box;
mod config;
mod db;
mod model;
mod operations;
mod paths;
mod util;
mod views;

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let bind = (config.bind.clone(), config.port);

    match config.mode {
        Mode::Database { db_url, max_connections } => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_secs(2))
                .test_before_acquire(true)
                .connect(&db_url)
                .await?;
            let db = PollDb::new(pool);
            db.ensure_schema().await?;

            info!("serving polls from the database on {}:{}", bind.0, bind.1);
            let ops = Data::new(PollOperations::new(db));
            HttpServer::new(move || {
                App::new()
                    .wrap(Logger::default())
                    .app_data(ops.clone())
                    .configure(paths::config::<PollOperations>)
            }).bind(bind)?
            .run()
            .await?;
        }
        Mode::BallotBox { ballot_file, blocked_addresses } => {
            let file = Data::new(BallotFile::new(ballot_file));
            let gate = Data::new(Blocklist::new(blocked_addresses));

            info!("serving the ballot box from {} on {}:{}", file.path().display(), bind.0, bind.1);
            HttpServer::new(move || {
                App::new()
                    .wrap(Logger::default())
                    .app_data(file.clone())
                    .app_data(gate.clone())
                    .configure(paths::ballot_box::config::<Blocklist>)
            }).bind(bind)?
            .run()
            .await?;
        }
    }
    Ok(())
}

use actix_web::{dev::Server, middleware, web, App, HttpServer};
use anyhow::Context;
use tracing::info;

use crate::{
    configuration::{AppState, State},
    controller::{bets, claims, events, purge, resync, status, version},
    error::Error,
};

pub async fn server_task(app_state: &AppState<State>) -> Result<(), Error> {
    let app = app_state.clone();
    tokio::spawn(async move {
        let server = init_server(app)?;
        server.await?;
        Ok(())
    })
    .await?
}

fn init_server(app_state: AppState<State>) -> Result<Server, Error> {
    let host = app_state.config.server_host.to_owned();
    let port = app_state.config.port;
    let address = format!("{}:{}", host, port);

    info!(%address, "starting http trigger surface");

    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(4096))
            .service(
                web::scope("/api")
                    .service(version::index)
                    .service(status::index)
                    .service(resync::index)
                    .service(resync::pools)
                    .service(purge::index)
                    .service(claims::verify)
                    .service(claims::eligibility)
                    .service(bets::index)
                    .service(events::index),
            )
    })
    .bind((host, port))
    .with_context(|| format!("failed to bind {}", address))?
    .run();
    Ok(server)
}

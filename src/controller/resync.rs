use actix_web::{post, web, Responder};

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::reconcile,
};

#[post("/resync")]
async fn index(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let report = reconcile::resync_all(&state).await?;
    Ok(web::Json(report))
}

#[post("/resync/pools")]
async fn pools(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let report = reconcile::resync_pools(&state).await?;
    Ok(web::Json(report))
}

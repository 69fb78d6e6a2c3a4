use actix_web::{get, web, Responder};

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::reconcile,
};

#[get("/status")]
async fn index(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let status = reconcile::sync_status(&state).await?;
    Ok(web::Json(status))
}

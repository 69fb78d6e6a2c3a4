use actix_web::{post, web, Responder};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::reconcile,
};

#[post("/purge")]
async fn index(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let purged = reconcile::purge_foreign_markets(&state).await?;
    Ok(web::Json(Response { purged }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub purged: u64,
}

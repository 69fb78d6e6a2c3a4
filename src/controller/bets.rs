use actix_web::{post, web, Responder};

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::bet,
    types::BetRequest,
};

#[post("/bets")]
async fn index(
    state: web::Data<AppState<State>>,
    data: web::Json<BetRequest>,
) -> Result<impl Responder, Error> {
    let recorded = bet::record_bet(&state, &data).await?;
    Ok(web::Json(recorded))
}

use actix_web::{get, web, Responder};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
    helpers::address_key,
};

#[get("/version")]
async fn index(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

    Ok(web::Json(Response {
        version: VERSION,
        factory: address_key(&state.config.factory_address),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response<'a> {
    pub version: Option<&'a str>,
    pub factory: String,
}

use actix_web::{post, web, Responder};

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::event_processor,
    types::ProcessRequest,
};

#[post("/events/process")]
async fn index(
    state: web::Data<AppState<State>>,
    data: web::Json<ProcessRequest>,
) -> Result<impl Responder, Error> {
    let report = event_processor::process_events(&state, &data).await?;
    Ok(web::Json(report))
}

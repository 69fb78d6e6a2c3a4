use actix_web::{get, post, web, Responder};
use serde::Deserialize;

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::claim,
    types::ClaimRequest,
};

#[post("/claims/verify")]
async fn verify(
    state: web::Data<AppState<State>>,
    data: web::Json<ClaimRequest>,
) -> Result<impl Responder, Error> {
    let claim = claim::verify_claim(&state, &data).await?;
    Ok(web::Json(claim))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityQuery {
    market_id: String,
    user_id: String,
}

#[get("/claims/eligibility")]
async fn eligibility(
    state: web::Data<AppState<State>>,
    query: web::Query<EligibilityQuery>,
) -> Result<impl Responder, Error> {
    let eligibility =
        claim::can_claim(&state, &query.market_id, &query.user_id).await?;
    Ok(web::Json(eligibility))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, App};
    use chrono::Utc;
    use serde_json::Value;

    use super::*;
    use crate::{
        dao::Store,
        model::Market_Snapshot,
        provider::mock::{test_state, MockChain},
    };

    #[actix_web::test]
    async fn eligibility_answers_with_a_reason() {
        let (state, store) = test_state(Arc::new(MockChain::new()));
        store
            .upsert_market(Market_Snapshot {
                MS_id: 0,
                MS_address: String::from(
                    "0x000000000000000000000000000000000000000a",
                ),
                MS_factory: String::from(
                    "0x00000000000000000000000000000000000000fa",
                ),
                MS_factory_index: Some(0),
                MS_title: String::from("open"),
                MS_end_time: Utc::now(),
                MS_resolved: false,
                MS_winning_outcome: None,
                MS_pool_totals: vec![],
                MS_last_synced_at: Utc::now(),
            })
            .await
            .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(state)))
                .service(web::scope("/api").service(eligibility)),
        )
        .await;

        let uri = format!(
            "/api/claims/eligibility?marketId={}&userId=0xuser1",
            "0x000000000000000000000000000000000000000a"
        );
        let req = test::TestRequest::get().uri(&uri).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            serde_json::json!({
                "canClaim": false,
                "reason": "market not resolved",
            })
        );

        let req = test::TestRequest::get()
            .uri("/api/claims/eligibility?marketId=0x12&userId=0xuser1")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(
            body,
            serde_json::json!({
                "canClaim": false,
                "reason": "market not found",
            })
        );
    }
}

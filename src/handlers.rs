use crate::errors::AppError;
use crate::models::{ClickRequest, ClickResponse, CountersResponse, EntityCode};
use crate::state::AppState;
use crate::stats::podium;
use crate::ui::render_index;
use axum::{
    Form, Json,
    extract::State,
    response::{Html, Redirect},
};
use std::collections::BTreeMap;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(
        &state.personal.snapshot(),
        &state.shared.snapshot(),
        state.shared.total(),
        state.shared.is_loading(),
    ))
}

pub async fn get_counters(State(state): State<AppState>) -> Json<CountersResponse> {
    let mine = state.personal.snapshot();
    let shared = state.shared.snapshot();

    Json(CountersResponse {
        my_total: mine.total(),
        my_clicks: stringify_keys(mine.clicks()),
        total: state.shared.total(),
        clicks: stringify_keys(shared.clicks()),
        carried_shortfall: state.shared.carried_shortfall(),
        phase: state.scheduler.phase().to_string(),
        top: podium(shared.clicks()),
    })
}

pub async fn click(
    State(state): State<AppState>,
    Json(payload): Json<ClickRequest>,
) -> Result<Json<ClickResponse>, AppError> {
    let entity = EntityCode::parse(&payload.country_code)?;
    Ok(Json(state.register_click(&entity)))
}

pub async fn click_form(
    State(state): State<AppState>,
    Form(payload): Form<ClickRequest>,
) -> Result<Redirect, AppError> {
    let entity = EntityCode::parse(&payload.country_code)?;
    state.register_click(&entity);
    Ok(Redirect::to("/"))
}

fn stringify_keys(clicks: &BTreeMap<EntityCode, u64>) -> BTreeMap<String, u64> {
    clicks
        .iter()
        .map(|(code, count)| (code.to_string(), *count))
        .collect()
}

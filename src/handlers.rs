use crate::errors::AppError;
use crate::models::{ViewOutput, ViewSummary};
use crate::pipeline::Pipeline;
use crate::state::AppState;
use crate::ui::render_page;
use crate::views::ViewId;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse},
    Json,
};
use serde::Deserialize;
use tokio::fs;

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub view: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FilterQuery {
    pub filter: Option<String>,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let view = match query.view.as_deref().map(str::trim) {
        None | Some("") => ViewId::default(),
        Some(slug) => resolve_view(slug)?,
    };

    let output = Pipeline::for_view(view)
        .run(&state.db, query.filter.as_deref())
        .await?;
    Ok(Html(render_page(&output)))
}

pub async fn list_views() -> Json<Vec<ViewSummary>> {
    Json(ViewId::ALL.into_iter().map(ViewId::summary).collect())
}

pub async fn get_view(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<ViewOutput>, AppError> {
    let view = resolve_view(&slug)?;
    let output = Pipeline::for_view(view)
        .run(&state.db, query.filter.as_deref())
        .await?;
    Ok(Json(output))
}

pub async fn logo(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let bytes = fs::read(state.logo_path.as_path()).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

fn resolve_view(slug: &str) -> Result<ViewId, AppError> {
    ViewId::from_slug(slug).ok_or_else(|| AppError::not_found(format!("unknown view '{slug}'")))
}

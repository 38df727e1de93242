use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use http::{HeaderMap, HeaderValue, StatusCode, header};
use serde_json::json;

use crate::{
    ApiError, Catalog,
    extract::{JsonBody, MovieId},
    filters::MovieQuery,
    movies::{self, MovieUpdate, NewMovie},
    permissions::{MOVIES_READ, MOVIES_WRITE, Principal},
    validator::Validator,
};

const EXPECTED_VERSION: &str = "x-expected-version";

pub(crate) async fn list(
    State(catalog): State<Catalog>,
    principal: Principal,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    catalog.require_permission(&principal, MOVIES_READ).await?;

    let mut v = Validator::default();
    let query = MovieQuery::from_params(&params, &mut v);
    v.finish()?;

    let (movies, metadata) = catalog.inner.movies.list(&query).await?;

    log::debug!(
        "Listing {} of {} movies",
        movies.len(),
        metadata.total_records()
    );

    Ok(Json(json!({ "movies": movies, "metadata": metadata })))
}

pub(crate) async fn create(
    State(catalog): State<Catalog>,
    principal: Principal,
    JsonBody(input): JsonBody<NewMovie>,
) -> Result<Response, ApiError> {
    catalog.require_permission(&principal, MOVIES_WRITE).await?;

    let mut v = Validator::default();
    movies::validate(&mut v, &input.title, input.year, input.runtime, &input.genres);
    v.finish()?;

    let movie = catalog.inner.movies.insert(input).await?;

    log::info!("Created movie {} '{}'", movie.id, movie.title);

    let location = HeaderValue::from_str(&format!("/v1/movies/{}", movie.id))
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Invalid location header: {e}")))?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "movie": movie })),
    )
        .into_response())
}

pub(crate) async fn show(
    State(catalog): State<Catalog>,
    principal: Principal,
    MovieId(id): MovieId,
) -> Result<impl IntoResponse, ApiError> {
    catalog.require_permission(&principal, MOVIES_READ).await?;

    let movie = catalog.inner.movies.get(id).await?;

    Ok(Json(json!({ "movie": movie })))
}

pub(crate) async fn update(
    State(catalog): State<Catalog>,
    principal: Principal,
    MovieId(id): MovieId,
    headers: HeaderMap,
    JsonBody(update): JsonBody<MovieUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    catalog.require_permission(&principal, MOVIES_WRITE).await?;

    let mut movie = catalog.inner.movies.get(id).await?;

    if let Some(expected) = headers.get(EXPECTED_VERSION) {
        let expected = expected.to_str().ok().and_then(|value| value.parse::<u32>().ok());

        if expected != Some(movie.version) {
            return Err(ApiError::EditConflict);
        }
    }

    movie.apply(update);

    let mut v = Validator::default();
    movies::validate(&mut v, &movie.title, movie.year, movie.runtime, &movie.genres);
    v.finish()?;

    let movie = catalog.inner.movies.update(movie).await?;

    log::info!("Updated movie {} to version {}", movie.id, movie.version);

    Ok(Json(json!({ "movie": movie })))
}

pub(crate) async fn delete(
    State(catalog): State<Catalog>,
    principal: Principal,
    MovieId(id): MovieId,
) -> Result<impl IntoResponse, ApiError> {
    catalog.require_permission(&principal, MOVIES_WRITE).await?;

    catalog.inner.movies.delete(id).await?;

    log::info!("Deleted movie {id}");

    Ok(Json(json!({ "message": "movie successfully deleted" })))
}

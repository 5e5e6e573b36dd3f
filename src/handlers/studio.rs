//! Single entry point for every request: CORS preflight, proxy, API dispatch, error envelope.

use super::proxy;
use crate::error::StudioError;
use crate::provider::ListRowsOptions;
use crate::request::{match_route, parse_non_negative_int, remove_prefix, ApiRoute};
use crate::response::{json, no_content, with_headers, ApiInfo, HealthBody, API_MESSAGE};
use crate::state::StudioState;
use axum::{
    extract::{Query, Request, State},
    http::{Method, Uri},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

pub async fn handle(State(state): State<StudioState>, req: Request) -> Response {
    let config = state.config.clone();
    let cors = config.cors.header_map();

    if req.method() == Method::OPTIONS {
        return with_headers(no_content(), cors);
    }

    let Some(internal_path) = remove_prefix(req.uri().path(), &config.api_prefix) else {
        if let Some(origin) = config.proxy.target() {
            return proxy::forward(&state.http, origin, req).await;
        }
        return with_headers(StudioError::route_not_found().into_response(), cors);
    };

    let method = req.method().clone();
    let uri = req.uri().clone();
    drop(req);
    let response = match dispatch(&state, &method, &internal_path, &uri).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    with_headers(response, cors)
}

async fn dispatch(state: &StudioState, method: &Method, internal_path: &str, uri: &Uri) -> Result<Response, StudioError> {
    if method != Method::GET {
        return Err(StudioError::MethodNotAllowed("Method not allowed".into()));
    }
    let provider = &state.config.provider;
    match match_route(internal_path)? {
        ApiRoute::Index => Ok(json(ApiInfo {
            ok: true,
            message: API_MESSAGE,
        })),
        ApiRoute::Health => Ok(json(HealthBody {
            ok: true,
            status: "healthy",
        })),
        ApiRoute::Schema => Ok(json(provider.get_schema().await?)),
        ApiRoute::Shape(table) => Ok(json(provider.get_model_shape(&table).await?)),
        ApiRoute::Rows(table) => {
            let options = list_rows_options(uri)?;
            Ok(json(provider.list_rows(&table, options).await?))
        }
    }
}

fn list_rows_options(uri: &Uri) -> Result<ListRowsOptions, StudioError> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri)
        .map_err(|_| StudioError::InvalidArgument("Invalid query string".into()))?;
    Ok(ListRowsOptions {
        limit: parse_non_negative_int(params.get("limit").map(String::as_str), "limit")?,
        offset: parse_non_negative_int(params.get("offset").map(String::as_str), "offset")?,
        search: params.get("search").cloned(),
    })
}

use crate::database::Database;
use crate::model::{Barrel, Beverage, PourReport, Rounding, TemperatureReport, Unit, Window};
use crate::report;
use crate::source::TransactionSource;

use core::future::Future;
use futures_util::TryFutureExt;
use http_body_util::{BodyExt, Full};
use hyper::{
    body::{Bytes, Incoming},
    header::{HeaderValue, CONTENT_TYPE},
    http::request::Parts,
    Method, Request, Response, StatusCode,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Everything a request handler needs: the database and the configured
/// rounding policy for converted volumes.
pub struct State {
    pub db: Database,
    pub rounding: Rounding,
}

fn query_param<'q>(query: &'q str, key: &str) -> Option<&'q str> {
    query.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name == key).then_some(value)
    })
}

/// Parses `?hours=` and `?unit=`, falling back to the dashboard defaults
/// (12 hours, glasses). Values outside the offered sets are a 400.
fn display_params(query: Option<&str>) -> Result<(Window, Unit), StatusCode> {
    let query = query.unwrap_or("");
    let window = match query_param(query, "hours") {
        Some(hours) => hours
            .parse()
            .ok()
            .and_then(Window::from_hours)
            .ok_or(StatusCode::BAD_REQUEST)?,
        None => Window::default(),
    };
    let unit = match query_param(query, "unit") {
        Some(unit) => unit.parse().map_err(|err| {
            log::warn!("{err}");
            StatusCode::BAD_REQUEST
        })?,
        None => Unit::Glasses,
    };
    Ok((window, unit))
}

fn id_param(query: Option<&str>) -> Result<Uuid, StatusCode> {
    let id = query_param(query.unwrap_or(""), "id").ok_or(StatusCode::BAD_REQUEST)?;
    Uuid::parse_str(id).map_err(|_| StatusCode::BAD_REQUEST)
}

fn internal(err: impl core::fmt::Debug) -> StatusCode {
    log::error!("{err:?}");
    StatusCode::INTERNAL_SERVER_ERROR
}

fn json<T: Serialize>(value: &T, status: StatusCode) -> Result<Response<Full<Bytes>>, StatusCode> {
    let bytes = serde_json::to_vec(value).map_err(internal)?;
    let mut res = Response::new(Full::new(Bytes::from(bytes)));
    *res.status_mut() = status;
    res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(res)
}

fn empty(status: StatusCode) -> Response<Full<Bytes>> {
    let mut res = Response::default();
    *res.status_mut() = status;
    res
}

async fn try_handle(state: Arc<State>, req: Request<Incoming>) -> Result<Response<Full<Bytes>>, StatusCode> {
    let (Parts { uri, method, .. }, incoming) = req.into_parts();
    let bytes = match incoming.collect().await {
        Ok(body) => body.to_bytes(),
        Err(err) => {
            log::error!("{err}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    match method {
        Method::GET => match uri.path() {
            "/api/report" => {
                let (window, unit) = display_params(uri.query())?;
                let pours = state.db.in_window(window).await.map_err(internal)?;
                json(&report::summarize(&pours, unit, state.rounding), StatusCode::OK)
            }
            "/api/report/watch" => {
                // Long poll: answer with a fresh summary once the pour
                // set changes. The subscription dies with the request.
                let (window, unit) = display_params(uri.query())?;
                let mut live = state.db.watch();
                if !live.changed().await {
                    return Err(StatusCode::SERVICE_UNAVAILABLE);
                }
                let pours = state.db.in_window(window).await.map_err(internal)?;
                json(&report::summarize(&pours, unit, state.rounding), StatusCode::OK)
            }
            "/api/beverages" => {
                let beverages = state.db.beverages().await.map_err(internal)?;
                json(&beverages, StatusCode::OK)
            }
            "/api/barrels" => {
                let barrels = state.db.barrels().await.map_err(internal)?;
                json(&barrels, StatusCode::OK)
            }
            path => {
                log::warn!("unexpected request to GET {path}");
                Err(StatusCode::NOT_FOUND)
            }
        },
        Method::POST => match uri.path() {
            "/api/beverages" => {
                let Ok(beverage) = serde_json::from_slice::<Beverage>(&bytes) else {
                    return Err(StatusCode::BAD_REQUEST);
                };
                let id = state.db.save_beverage(&beverage).await.map_err(internal)?;
                json(&Beverage { id: Some(id), ..beverage }, StatusCode::CREATED)
            }
            "/api/barrels" => {
                let Ok(barrel) = serde_json::from_slice::<Barrel>(&bytes) else {
                    return Err(StatusCode::BAD_REQUEST);
                };
                let id = state.db.save_barrel(&barrel).await.map_err(internal)?;
                json(&Barrel { id: Some(id), ..barrel }, StatusCode::CREATED)
            }
            "/report/pour" => {
                let Ok(pour) = serde_json::from_slice::<PourReport>(&bytes) else {
                    log::error!("malformed pour reported");
                    return Err(StatusCode::BAD_REQUEST);
                };

                log::info!("{} poured {} oz of {}", pour.keg, pour.ounces_poured, pour.beverage);

                let pour = state.db.record_pour(pour).await.map_err(internal)?;
                json(&pour, StatusCode::CREATED)
            }
            "/report/temperature" => {
                let Ok(report) = serde_json::from_slice::<TemperatureReport>(&bytes) else {
                    log::error!("malformed temperature reported");
                    return Err(StatusCode::BAD_REQUEST);
                };

                if state.db.record_temperature(report).await.map_err(internal)? {
                    Ok(empty(StatusCode::NO_CONTENT))
                } else {
                    log::warn!("temperature reported for unknown barrel {}", report.barrel);
                    Err(StatusCode::NOT_FOUND)
                }
            }
            path => {
                log::warn!("unexpected request to POST {path}");
                Err(StatusCode::NOT_FOUND)
            }
        },
        Method::DELETE => match uri.path() {
            "/api/beverages" => {
                let id = id_param(uri.query())?;
                if state.db.delete_beverage(id).await.map_err(internal)? {
                    Ok(empty(StatusCode::NO_CONTENT))
                } else {
                    Err(StatusCode::NOT_FOUND)
                }
            }
            "/api/barrels" => {
                let id = id_param(uri.query())?;
                if state.db.delete_barrel(id).await.map_err(internal)? {
                    Ok(empty(StatusCode::NO_CONTENT))
                } else {
                    Err(StatusCode::NOT_FOUND)
                }
            }
            path => {
                log::warn!("unexpected request to DELETE {path}");
                Err(StatusCode::NOT_FOUND)
            }
        },
        method => {
            log::warn!("unexpected {method} method received");
            Err(StatusCode::METHOD_NOT_ALLOWED)
        }
    }
}

pub fn handle(state: Arc<State>, req: Request<Incoming>) -> impl Future<Output = Response<Full<Bytes>>> {
    try_handle(state, req).unwrap_or_else(empty)
}

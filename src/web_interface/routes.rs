use std::convert::Infallible;
use std::sync::Arc;

use log::warn;
use serde::Serialize;
use warp::reply::Response;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::types::{ApiError, HistoryEntryResponse, HistoryQuery, MessageResponse, SessionResponse};
use crate::error_handling::types::SessionError;
use crate::session_management::session_manager::{SessionManager, DEFAULT_HISTORY_LIMIT};

fn json_response<T: Serialize>(body: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(body), status).into_response()
}

fn error_response(message: String, status: StatusCode) -> Response {
    json_response(&ApiError { message }, status)
}

/// Transport trouble is the daemon being unavailable, not a fault of this service.
fn session_error_response(err: SessionError) -> Response {
    let status = match err {
        SessionError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SessionError::InvalidName(_) | SessionError::InvalidLimit(_) => StatusCode::BAD_REQUEST,
        SessionError::CycleInProgress => StatusCode::CONFLICT,
    };
    if status.is_server_error() {
        warn!("request failed: {}", err);
    }
    error_response(err.to_string(), status)
}

/// End of the path, with or without one trailing slash.
fn end_of_path() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path::tail()
        .and_then(|tail: warp::path::Tail| async move {
            match tail.as_str() {
                "" | "/" => Ok(()),
                _ => Err(warp::reject::not_found()),
            }
        })
        .untuple_one()
}

fn with_manager(
    manager: Arc<SessionManager>,
) -> impl Filter<Extract = (Arc<SessionManager>,), Error = Infallible> + Clone {
    warp::any().map(move || manager.clone())
}

pub async fn handle_status(manager: Arc<SessionManager>) -> Response {
    match manager.get_status().await {
        Ok(sessions) => {
            let body: Vec<SessionResponse> = sessions.iter().map(SessionResponse::from).collect();
            json_response(&body, StatusCode::OK)
        }
        Err(e) => session_error_response(e),
    }
}

pub async fn handle_kill(manager: Arc<SessionManager>, name: String) -> Response {
    match manager.kill(&name).await {
        Ok(message) => json_response(&MessageResponse { message }, StatusCode::OK),
        Err(e) => session_error_response(e),
    }
}

pub async fn handle_record(manager: Arc<SessionManager>) -> Response {
    match manager.record_now().await {
        Ok(report) => json_response(&report, StatusCode::OK),
        Err(e) => session_error_response(e),
    }
}

/// An empty history is only a 404 when the name is not a registered user either.
pub async fn handle_history(
    manager: Arc<SessionManager>,
    name: String,
    query: HistoryQuery,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let samples = match manager.history(&name, limit).await {
        Ok(samples) => samples,
        Err(e) => return session_error_response(e),
    };

    if samples.is_empty() {
        match manager.is_registered(&name).await {
            Ok(true) => {}
            Ok(false) => {
                return error_response(
                    format!("No traffic recorded for {}", name),
                    StatusCode::NOT_FOUND,
                )
            }
            Err(e) => return session_error_response(e),
        }
    }

    let body: Vec<HistoryEntryResponse> = samples.iter().map(HistoryEntryResponse::from).collect();
    json_response(&body, StatusCode::OK)
}

/// GET /management/status[/]
pub fn status_route(
    manager: Arc<SessionManager>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path!("management" / "status" / ..)
        .and(end_of_path())
        .and(warp::get())
        .and(with_manager(manager))
        .and_then(|manager: Arc<SessionManager>| async move {
            Ok::<_, Rejection>(handle_status(manager).await)
        })
}

/// POST /management/kill/:name
pub fn kill_route(
    manager: Arc<SessionManager>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path!("management" / "kill" / String / ..)
        .and(end_of_path())
        .and(warp::post())
        .and(with_manager(manager))
        .and_then(|name: String, manager: Arc<SessionManager>| async move {
            Ok::<_, Rejection>(handle_kill(manager, name).await)
        })
}

/// POST /management/record
pub fn record_route(
    manager: Arc<SessionManager>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path!("management" / "record" / ..)
        .and(end_of_path())
        .and(warp::post())
        .and(with_manager(manager))
        .and_then(|manager: Arc<SessionManager>| async move {
            Ok::<_, Rejection>(handle_record(manager).await)
        })
}

/// GET /traffic/history/:name?limit=N
pub fn history_route(
    manager: Arc<SessionManager>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path!("traffic" / "history" / String / ..)
        .and(end_of_path())
        .and(warp::get())
        .and(warp::query::<HistoryQuery>())
        .and(with_manager(manager))
        .and_then(|name: String, query: HistoryQuery, manager: Arc<SessionManager>| async move {
            Ok::<_, Rejection>(handle_history(manager, name, query).await)
        })
}

/// Every API route, with unmatched requests answered as JSON errors.
pub fn api_routes(
    manager: Arc<SessionManager>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    status_route(manager.clone())
        .or(kill_route(manager.clone()))
        .or(record_route(manager.clone()))
        .or(history_route(manager))
        .recover(handle_rejection)
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (message, status) = if err.is_not_found() {
        ("Not found", StatusCode::NOT_FOUND)
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        ("Invalid query string", StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ("Method not allowed", StatusCode::METHOD_NOT_ALLOWED)
    } else {
        warn!("unhandled rejection: {:?}", err);
        ("Internal error", StatusCode::INTERNAL_SERVER_ERROR)
    };
    Ok(error_response(message.to_string(), status))
}

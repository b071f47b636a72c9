use super::types::{DoneView, ErrorView, RunRequest, RunView, StreamEvent};
use super::AppState;
use crate::driver::FeedbackLoop;
use crate::models::Run;
use crate::Error;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    Json,
};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use tracing::{info, warn};

const INDEX_HTML: &str = include_str!("../../assets/index.html");

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::CollaboratorFailure { .. } | Error::Service(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &Error) -> Response {
    (status_for(error), Json(ErrorView::from(error))).into_response()
}

/// Validate the request and build the run plus the loop that will drive it.
fn prepare(
    state: &AppState,
    request: Result<Json<RunRequest>, JsonRejection>,
) -> Result<(Run, FeedbackLoop), Error> {
    let Json(request) = request.map_err(|rejection| Error::InvalidInput(rejection.body_text()))?;

    if request.iterations > i64::from(state.max_iterations) {
        return Err(Error::InvalidInput(format!(
            "iteration count must be at most {}",
            state.max_iterations
        )));
    }
    let iterations = u32::try_from(request.iterations)
        .map_err(|_| Error::InvalidInput("iteration count must be at least 1".to_string()))?;

    let run = Run::new(&request.seed_prompt, iterations)?;
    let services = state.provider.services(request.api_token)?;
    Ok((run, FeedbackLoop::new(services)))
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "max_iterations": state.max_iterations
    }))
}

/// Run the loop to completion and return every record at once.
pub async fn create_run(
    State(state): State<AppState>,
    request: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    let (mut run, feedback_loop) = match prepare(&state, request) {
        Ok(prepared) => prepared,
        Err(e) => {
            warn!("Rejected run request: {}", e);
            return error_response(&e);
        }
    };

    let result = feedback_loop.drive(&mut run).await;
    let error = result.err();
    let status = error.as_ref().map(status_for).unwrap_or(StatusCode::OK);

    (status, Json(RunView::new(&run, error.as_ref()))).into_response()
}

fn to_sse(event: StreamEvent) -> Result<Event, Infallible> {
    let sse = match event.to_json() {
        Ok(json) => Event::default().event(event.name()).data(json),
        Err(e) => Event::default().event("error").data(format!(
            "{{\"message\":\"failed to encode {} event: {}\"}}",
            event.name(),
            e
        )),
    };
    Ok(sse)
}

/// Run the loop in the background and stream stage, record, and final
/// events as they happen. Closing the stream abandons the run.
pub async fn stream_run(
    State(state): State<AppState>,
    request: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    let (mut run, feedback_loop) = match prepare(&state, request) {
        Ok(prepared) => prepared,
        Err(e) => {
            warn!("Rejected run request: {}", e);
            return error_response(&e);
        }
    };

    let (tx, rx) = mpsc::unbounded_channel::<StreamEvent>();

    tokio::spawn(async move {
        let run_id = run.id();
        let finished = tokio::select! {
            result = feedback_loop.drive_with(&mut run, |event| {
                let _ = tx.send(StreamEvent::from(event));
            }) => Some(result),
            _ = tx.closed() => None,
        };

        let final_event = match finished {
            Some(Ok(())) => StreamEvent::Done(DoneView {
                id: run_id,
                records: run.records().len(),
            }),
            Some(Err(e)) => StreamEvent::Error(ErrorView::from(&e)),
            None => {
                info!("Client disconnected, abandoning run {}", run_id);
                return;
            }
        };
        let _ = tx.send(final_event);
    });

    let stream = UnboundedReceiverStream::new(rx).map(to_sse);
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&Error::InvalidInput("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::Service("x".to_string()).at_stage(0, Stage::ExpandText)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Error::Config("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_index_page_refreshes_slider_label_after_cap() {
        let cap = INDEX_HTML.find("slider.max = h.max_iterations;").unwrap();
        let refresh = INDEX_HTML[cap..]
            .find("sliderValue.textContent = slider.value;")
            .unwrap();
        assert!(refresh < 80);
    }

    #[test]
    fn test_index_page_posts_to_stream_endpoint() {
        assert!(INDEX_HTML.contains("/api/runs/stream"));
    }
}

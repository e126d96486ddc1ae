//! Server-Sent Events (SSE) stream for real-time updates.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use pinhub_app::ports::{Clock, HouseRepository, OutputPort, SwitchRecorder};

use crate::state::AppState;

/// `GET /api/events/stream` — SSE stream of controller events.
///
/// Subscribes to the event bus and sends each event as a JSON `data:` frame,
/// tagged with its event type. The stream ends when the client disconnects.
pub async fn stream<S, P, C>(
    State(state): State<AppState<S, P, C>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    let event_rx = state.event_bus().subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match Event::default()
            .event(event.event_type.as_str())
            .json_data(&event)
        {
            Ok(frame) => Some(Ok(frame)),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize event for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "SSE subscriber lagged, some events were dropped");
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}

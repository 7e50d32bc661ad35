//! SSE plumbing: pumps chat event payloads into an `actix-web-lab` SSE
//! responder over a bounded channel.

use std::time::Duration;

use actix_web_lab::{sse, util::InfallibleStream};
use futures_util::StreamExt;
use log::debug;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::services::chat_service::ChatEventStream;

const CHANNEL_CAPACITY: usize = 32;
const KEEP_ALIVE: Duration = Duration::from_secs(15);

pub type SseResponder = sse::Sse<InfallibleStream<ReceiverStream<sse::Event>>>;

/// Drive `events` to completion in a background task, forwarding each
/// payload as one SSE data frame. When the client disconnects, the pump
/// keeps draining the stream without forwarding so the terminal event still
/// runs and the delivered text gets persisted.
pub fn respond(events: ChatEventStream) -> SseResponder {
    let (tx, rx) = mpsc::channel::<sse::Event>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut events = events;
        let mut client_connected = true;
        while let Some(payload) = events.next().await {
            if !client_connected {
                continue;
            }
            let frame = match sse::Data::new_json(&payload) {
                Ok(data) => sse::Event::Data(data),
                Err(err) => {
                    debug!("unserializable SSE payload dropped: {err}");
                    continue;
                }
            };
            if tx.send(frame).await.is_err() {
                debug!("SSE client disconnected, draining stream");
                client_connected = false;
            }
        }
    });

    sse::Sse::from_infallible_receiver(rx).with_keep_alive(KEEP_ALIVE)
}

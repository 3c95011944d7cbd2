//! HTML pages served through request events
//!
//! Handlers always hand the event back: failures are written into its
//! output with [`Event::fail`] so every response is concluded by the event.

use serde_json::json;

use crate::context::Event;

/// GET /
pub async fn index(mut event: Event) -> Event {
    let args = json!({
        "requestID": event.id(),
        "startTime": event.start_time.to_rfc3339(),
    });
    if let Err(e) = event.html("index", &args) {
        event.fail(e.into());
    }
    event
}

/// GET /hello/:name
pub async fn hello(mut event: Event) -> Event {
    let name = event.input.get("name").unwrap_or("stranger").to_string();
    let args = json!({
        "requestID": event.id(),
        "name": name,
    });
    if let Err(e) = event.html("hello", &args) {
        event.fail(e.into());
    }
    event
}

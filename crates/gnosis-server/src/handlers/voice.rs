use actix_web::{web, HttpRequest, HttpResponse};

use crate::state::AppState;
use crate::voice::{connect_backend, run_session, ClientSink, ClientSource, VoiceSession};

const MAX_CONTINUATION_SIZE: usize = 2 * 1024 * 1024;

/// Upgrades to a websocket and relays it to the voice agent backend. The key
/// is checked before the upgrade.
pub async fn handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Payload,
) -> Result<HttpResponse, actix_web::Error> {
    state.auth.authorize(&req)?;

    let (response, session, stream) = actix_ws::handle(&req, body)?;
    let stream = stream
        .aggregate_continuations()
        .max_continuation_size(MAX_CONTINUATION_SIZE);

    let backend = state.voice.clone();
    actix_web::rt::spawn(async move {
        let mut voice_session = VoiceSession::new();
        let client_source = ClientSource::new(stream, session.clone());
        let client_sink = ClientSink::new(session);

        run_session(
            &mut voice_session,
            client_source,
            client_sink,
            connect_backend(&backend.url, &backend.api_key),
            backend.connect_timeout,
        )
        .await;
    });

    Ok(response)
}

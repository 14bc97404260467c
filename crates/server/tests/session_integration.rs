//! End-to-end coverage of the three-stage pipeline (§8's scenario list)
//! wired exactly as `main.rs` wires it: `Session::spawn` driving the real
//! `TurnOrchestrator` -> `TtsWorker` -> `AudioStreamer` chain against the
//! server's own reference collaborator implementations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use parlance_core::{Result, TransportSink};
use parlance_server::reference::{default_roster, EchoLanguageModel, RosterCatalog, SilentTts};
use parlance_server::session::Session;

#[derive(Default, Clone)]
struct RecordingTransport {
    json: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl RecordingTransport {
    fn types(&self) -> Vec<String> {
        self.json.lock().iter().map(|e| e["type"].as_str().unwrap().to_string()).collect()
    }
}

#[async_trait]
impl TransportSink for RecordingTransport {
    async fn send_json(&self, value: serde_json::Value) -> Result<()> {
        self.json.lock().push(value);
        Ok(())
    }

    async fn send_binary(&self, _data: Vec<u8>) -> Result<()> {
        Ok(())
    }
}

async fn wait_until(transport: &RecordingTransport, predicate: impl Fn(&[String]) -> bool) {
    for _ in 0..500 {
        if predicate(&transport.types()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within timeout; events so far: {:?}", transport.types());
}

fn spawn_session(transport: RecordingTransport) -> Session {
    Session::spawn(
        64,
        Duration::from_millis(500),
        Arc::new(RosterCatalog::new(default_roster())),
        Arc::new(EchoLanguageModel),
        Arc::new(SilentTts::new()),
        Arc::new(transport),
    )
}

#[tokio::test]
async fn single_speaker_reaches_full_text_and_audio_lifecycle() {
    let transport = RecordingTransport::default();
    let session = spawn_session(transport.clone());

    session.submit_user_message("@Ava hello there".to_string()).await;

    wait_until(&transport, |t| t.contains(&"audio_stream_stop".to_string())).await;

    let types = transport.types();
    assert_eq!(types[0], "text_stream_start");
    assert!(types.contains(&"text_chunk".to_string()));
    assert!(types.contains(&"text_stream_stop".to_string()));
    assert!(types.contains(&"audio_stream_start".to_string()));
    assert!(types.contains(&"audio_chunk".to_string()));

    let text_stop = types.iter().position(|t| t == "text_stream_stop").unwrap();
    let audio_start = types.iter().position(|t| t == "audio_stream_start").unwrap();
    assert!(text_stop < audio_start, "text must start streaming before audio for the same speaker");

    session.shutdown().await;
}

#[tokio::test]
async fn two_addressed_characters_each_get_a_full_lifecycle_in_order() {
    let transport = RecordingTransport::default();
    let session = spawn_session(transport.clone());

    session.submit_user_message("@Ava @Bo hello both of you".to_string()).await;

    wait_until(&transport, |t| t.iter().filter(|e| *e == "audio_stream_stop").count() == 2).await;

    let events = transport.json.lock().clone();
    let speaker_of = |event_type: &str, nth: usize| -> u64 {
        events
            .iter()
            .filter(|e| e["type"] == event_type)
            .nth(nth)
            .and_then(|e| e["data"]["speaker_index"].as_u64())
            .unwrap()
    };
    assert_eq!(speaker_of("audio_stream_start", 0), 0);
    assert_eq!(speaker_of("audio_stream_start", 1), 1);

    session.shutdown().await;
}

#[tokio::test]
async fn message_addressing_nobody_produces_no_events() {
    let transport = RecordingTransport::default();
    let session = spawn_session(transport.clone());

    session.submit_user_message("hello, nobody in particular".to_string()).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(transport.types().is_empty());

    session.shutdown().await;
}

#[tokio::test]
async fn shutdown_drains_workers_within_the_graceful_window() {
    let transport = RecordingTransport::default();
    let session = spawn_session(transport.clone());

    session.submit_user_message("@Ava hi".to_string()).await;
    wait_until(&transport, |t| t.contains(&"audio_stream_stop".to_string())).await;

    session.shutdown().await;
}

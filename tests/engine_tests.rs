//! End-to-end engine behavior against scripted collaborators

mod common;

use common::{fast_config, harness, settle, MockSpeechService};
use kibitz::engine::Engine;
use kibitz::llm::PersonaPromptBuilder;
use kibitz::orchestrator::{Outcome, NOT_RUNNING_STATUS};
use kibitz::transcript::Speaker;
use kibitz::KibitzError;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn capture_lifecycle_round_trip() {
    let h = harness(fast_config());

    assert!(!h.engine.is_running());
    h.engine.start_capture("en").await.unwrap();
    assert!(h.engine.is_running());
    assert_eq!(h.speech.connects(), 2);

    // Starting again is a no-op
    h.engine.start_capture("en").await.unwrap();
    assert_eq!(h.speech.connects(), 2);

    h.engine.stop_capture().await;
    assert!(!h.engine.is_running());
    assert!(h.speech.me().is_stopped());
    assert!(h.speech.companion().is_stopped());
}

#[tokio::test]
async fn partial_startup_is_fully_unwound() {
    let speech = MockSpeechService::failing_at(1);
    let providers: Vec<Arc<dyn kibitz::llm::Provider>> =
        vec![common::MockProvider::named("mock")];
    let engine = Engine::new(
        fast_config(),
        speech.clone(),
        common::MockSummarizer::new(),
        Arc::new(PersonaPromptBuilder::new("sys", "persona")),
        providers,
    );

    let err = engine.start_capture("en").await.unwrap_err();
    assert!(matches!(err, KibitzError::SessionStart(_)));
    assert!(!engine.is_running());
    // The channel that connected first was stopped during the unwind
    assert!(speech.me().is_stopped());
}

#[tokio::test]
async fn audio_frames_route_to_their_channel() {
    let h = harness(fast_config());
    h.engine.start_capture("en").await.unwrap();

    h.engine.push_audio(Speaker::Me, vec![1, 2]);
    h.engine.push_audio(Speaker::Companion, vec![3, 4, 5]);
    settle().await;

    assert_eq!(h.speech.me().frames.lock().clone(), vec![vec![1, 2]]);
    assert_eq!(h.speech.companion().frames.lock().clone(), vec![vec![3, 4, 5]]);

    h.engine.stop_capture().await;
    // Frames pushed with no session registered are dropped, not an error
    h.engine.push_audio(Speaker::Me, vec![9]);
}

#[tokio::test]
async fn transcripts_flow_into_the_store_and_buffers() {
    let h = harness(fast_config());
    h.engine.start_capture("en").await.unwrap();

    h.speech.me().transcript("I think we are on track.").await;
    h.speech.companion().transcript("what does the timeline look like?").await;
    settle().await;

    let log = h.engine.formatted_log();
    assert!(log.contains("[Me "));
    assert!(log.contains("]: I think we are on track."));
    assert!(log.contains("[Companion "));
    assert!(log.contains("]: what does the timeline look like?"));

    // Only companion speech feeds the question buffer
    assert_eq!(
        h.engine.take_complete_question().as_deref(),
        Some("what does the timeline look like?")
    );
    assert!(h.engine.take_complete_question().is_none());

    h.engine.stop_capture().await;
}

#[tokio::test]
async fn pop_new_text_is_exactly_once() {
    let h = harness(fast_config());
    h.engine.start_capture("en").await.unwrap();

    h.speech.companion().transcript("first fragment").await;
    h.speech.companion().transcript("second fragment").await;
    settle().await;

    assert_eq!(h.engine.pop_new_text(), "first fragment second fragment");
    assert_eq!(h.engine.pop_new_text(), "");

    h.engine.stop_capture().await;
}

#[tokio::test]
async fn stop_capture_clears_the_transcript() {
    let h = harness(fast_config());
    h.engine.start_capture("en").await.unwrap();

    h.speech.companion().transcript("remember this").await;
    settle().await;
    assert_eq!(h.engine.transcript().len(), 1);

    h.engine.stop_capture().await;
    assert!(h.engine.transcript().is_empty());
    assert!(h.engine.formatted_log().is_empty());
}

#[tokio::test]
async fn one_shot_before_start_returns_status_without_provider_call() {
    let h = harness(fast_config());

    let outcome = h.engine.send_message("mock fast", "hello", None).await.unwrap();
    assert_eq!(outcome, Outcome::NotRunning);
    assert_eq!(outcome.into_text(), NOT_RUNNING_STATUS);
    assert_eq!(h.provider.generate_calls(), 0);
}

#[tokio::test]
async fn one_shot_builds_prompt_from_live_transcript() {
    let h = harness(fast_config());
    h.engine.start_capture("en").await.unwrap();

    h.speech.companion().transcript("can we delay the launch?").await;
    settle().await;

    h.provider.push_reply("We could move it by one week.");
    let outcome = h.engine
        .send_message("mock fast", "Answer the last question.", None)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Answer("We could move it by one week.".into()));

    let prompt = h.provider.last_prompt().unwrap();
    assert!(prompt.contains("--- CURRENT DIALOGUE TRANSCRIPT ---"));
    assert!(prompt.contains("can we delay the launch?"));
    assert!(prompt.contains("--- YOUR TASK ---"));
    assert!(prompt.contains("Answer the last question."));

    h.engine.stop_capture().await;
}

#[tokio::test]
async fn assist_and_followup_are_guarded_like_messages() {
    let h = harness(fast_config());

    assert_eq!(h.engine.assist("mock fast", None).await.unwrap(), Outcome::NotRunning);
    assert_eq!(h.engine.followup("mock fast", None).await.unwrap(), Outcome::NotRunning);

    h.engine.start_capture("en").await.unwrap();
    h.provider.push_reply("Try asking about the budget.");
    let outcome = h.engine.followup("mock fast", None).await.unwrap();
    assert_eq!(outcome, Outcome::Answer("Try asking about the budget.".into()));

    h.engine.stop_capture().await;
}

#[tokio::test]
async fn unknown_model_is_a_client_error() {
    let h = harness(fast_config());
    h.engine.start_capture("en").await.unwrap();

    let err = h.engine.send_message("unknown-model", "hi", None).await.unwrap_err();
    assert!(matches!(err, KibitzError::ModelNotFound(ref m) if m == "unknown-model"));

    let err = h.engine.send_message("ghost v2", "hi", None).await.unwrap_err();
    assert!(matches!(err, KibitzError::ModelNotFound(_)));
    assert_eq!(h.provider.generate_calls(), 0);

    h.engine.stop_capture().await;
}

#[tokio::test]
async fn provider_failure_propagates_on_one_shots() {
    let h = harness(fast_config());
    h.engine.start_capture("en").await.unwrap();

    h.provider.push_reply_error();
    let err = h.engine.send_message("mock fast", "hi", None).await.unwrap_err();
    assert!(matches!(err, KibitzError::Upstream(_)));

    h.engine.stop_capture().await;
}

#[tokio::test]
async fn streaming_before_start_yields_the_status_chunk() {
    use futures::StreamExt;

    let h = harness(fast_config());
    let mut stream = h.engine.stream_message("mock fast", "hi", None).await.unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap(), NOT_RUNNING_STATUS);
    assert!(stream.next().await.is_none());
    assert_eq!(h.provider.stream_calls(), 0);
}

#[tokio::test]
async fn streaming_delivers_provider_chunks_in_order() {
    use futures::StreamExt;

    let h = harness(fast_config());
    h.engine.start_capture("en").await.unwrap();

    h.provider.push_stream(&["alpha", " beta", " gamma"]);
    let mut stream = h.engine.stream_message("mock fast", "go", None).await.unwrap();

    let mut collected = String::new();
    while let Some(chunk) = stream.next().await {
        collected.push_str(&chunk.unwrap());
    }
    assert_eq!(collected, "alpha beta gamma");

    h.engine.stop_capture().await;
}

#[tokio::test]
async fn archival_compacts_once_threshold_is_crossed() {
    // Zero merge window keeps the 35 synthetic fragments distinct
    let h = harness(fast_config().with_merge_window(Duration::ZERO));
    h.engine.start_capture("en").await.unwrap();

    for i in 0..35 {
        h.engine
            .transcript()
            .add_message(Speaker::Companion, &format!("unique line {i}"));
    }
    h.summarizer.set_reply("They reviewed 25 lines of discussion.");

    h.provider.push_reply("done");
    h.engine.send_message("mock fast", "summarise away", None).await.unwrap();

    assert_eq!(h.summarizer.calls(), 1);
    assert_eq!(h.engine.transcript().len(), 10);
    let archives = h.engine.transcript().archives();
    assert_eq!(archives.len(), 1);
    assert_eq!(archives[0].text, "They reviewed 25 lines of discussion.");

    // The retained tail is the most recent ten
    let messages = h.engine.transcript().messages();
    assert_eq!(messages[0].text, "unique line 25");
    assert_eq!(messages[9].text, "unique line 34");

    h.engine.stop_capture().await;
}

#[tokio::test]
async fn empty_summary_never_archives_or_compacts() {
    let h = harness(fast_config().with_merge_window(Duration::ZERO));
    h.engine.start_capture("en").await.unwrap();

    for i in 0..35 {
        h.engine
            .transcript()
            .add_message(Speaker::Companion, &format!("line {i}"));
    }
    // MockSummarizer replies with an empty string by default

    h.provider.push_reply("done");
    h.engine.send_message("mock fast", "hi", None).await.unwrap();

    assert_eq!(h.summarizer.calls(), 1);
    assert_eq!(h.engine.transcript().len(), 35);
    assert!(h.engine.transcript().archives().is_empty());

    h.engine.stop_capture().await;
}

#[tokio::test]
async fn latency_is_tracked_for_one_shots() {
    let h = harness(fast_config());
    h.engine.start_capture("en").await.unwrap();
    assert_eq!(h.engine.average_latency_ms(), 0.0);

    h.provider.push_reply("quick");
    h.engine.send_message("mock fast", "hi", None).await.unwrap();
    // One sample recorded; its magnitude depends on the scheduler
    assert!(h.engine.average_latency_ms() >= 0.0);

    h.engine.stop_capture().await;
}

#[tokio::test]
async fn provider_listing_names_the_registry() {
    let h = harness(fast_config());
    assert_eq!(h.engine.provider_names(), vec!["mock"]);
}

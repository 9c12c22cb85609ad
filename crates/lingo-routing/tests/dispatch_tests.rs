//! End-to-end dispatch through the engine: callbacks, timeouts, escalation and memory
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::tests_outside_test_module,
        clippy::too_many_lines,
        reason = "Test allows"
    )
)]

mod common;

use common::{StubHandler, builder, ready_engine, stub_factory};
use lingo_core::Role;
use lingo_providers::MockProvider;
use lingo_routing::{ERROR_PREFIX, GENERIC_UNMATCHED, SUGGESTION_HEADER, TIMEOUT_REPLY};
use regex::Regex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_time_question_answered_by_intrinsic() {
    let engine = ready_engine(builder());

    let outcome = engine.resolve("mấy giờ rồi").expect("time resolves");
    assert_eq!(outcome.name(), "time");
    assert!((outcome.confidence - 1.0).abs() < f64::EPSILON);

    let reply = engine.dispatch("mấy giờ rồi");
    let format = Regex::new(r"^Bây giờ là \d{1,2}:\d{2}$").expect("valid regex");
    assert!(format.is_match(&reply), "unexpected reply: {reply}");
}

#[test]
fn test_callback_runs_exactly_once() {
    let engine = ready_engine(builder());
    let calls = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let counter = Arc::clone(&calls);
    engine.dispatch_async("trợ giúp", move |reply| {
        counter.fetch_add(1, Ordering::SeqCst);
        sender.send(reply).expect("receiver alive");
    });

    let reply = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("callback invoked");
    assert!(!reply.is_empty());
    thread::sleep(Duration::from_millis(200));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_handler_panic_becomes_error_reply() {
    let engine = ready_engine(builder().factory(stub_factory("calculator", &StubHandler::panicking())));
    let calls = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let counter = Arc::clone(&calls);
    engine.dispatch_async("tính 2+2", move |reply| {
        counter.fetch_add(1, Ordering::SeqCst);
        sender.send(reply).expect("receiver alive");
    });

    let reply = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("callback invoked after panic");
    assert!(reply.starts_with(ERROR_PREFIX), "unexpected reply: {reply}");
    assert!(reply.contains("handler exploded"));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The worker survives the panic
    let reply = engine.dispatch("mấy giờ rồi");
    assert!(reply.starts_with("Bây giờ là"));
}

#[test]
fn test_sync_dispatch_times_out() {
    let hanging = StubHandler::echo().with_delay(Duration::from_secs(3));
    let engine = ready_engine(builder().factory(stub_factory("weather", &hanging)));

    let started = Instant::now();
    let reply = engine.dispatch_sync("thời tiết hôm nay", Duration::from_secs(1));

    assert_eq!(reply, TIMEOUT_REPLY);
    assert!(started.elapsed() < Duration::from_millis(2_500));
}

#[test]
fn test_concurrent_dispatches_each_get_a_reply() {
    let echo = StubHandler::echo();
    let engine = ready_engine(builder().factory(stub_factory("reminder", &echo)));
    let (sender, receiver) = mpsc::channel();

    for index in 0..20 {
        let sender = sender.clone();
        engine.dispatch_async(format!("nhắc tôi việc {index}"), move |reply| {
            sender.send(reply).expect("receiver alive");
        });
    }
    drop(sender);

    let mut replies: Vec<String> = receiver.iter().collect();
    replies.sort();
    assert_eq!(replies.len(), 20);
    assert!(replies.iter().all(|reply| reply.starts_with("nhắc tôi việc")));
    assert_eq!(echo.invocations().len(), 20);
}

#[test]
fn test_domain_handler_receives_trimmed_input() {
    let echo = StubHandler::echo();
    let engine = ready_engine(builder().factory(stub_factory("calculator", &echo)));

    let reply = engine.dispatch("  tính 12 * 3  ");

    assert_eq!(reply, "tính 12 * 3");
}

#[test]
fn test_unmatched_without_providers() {
    let engine = ready_engine(builder());

    let reply = engine.dispatch("xyz123");

    assert!(
        reply == GENERIC_UNMATCHED || reply.starts_with(SUGGESTION_HEADER),
        "unexpected reply: {reply}"
    );
}

#[test]
fn test_unmatched_suggests_similar_phrases() {
    let lights = StubHandler::echo().with_patterns(&["bật đèn phòng khách"]);
    let engine = ready_engine(builder().factory(stub_factory("lights", &lights)));

    let reply = engine.dispatch("bat den phong");

    assert!(reply.starts_with(SUGGESTION_HEADER), "unexpected reply: {reply}");
    assert!(reply.contains("- bật đèn phòng khách"));
    assert!(lights.invocations().is_empty());
}

#[test]
fn test_unmatched_escalates_to_provider() {
    let provider = MockProvider::new("chatgpt").with_default_response("Đây là câu trả lời.");
    let engine = ready_engine(builder().provider(Arc::new(provider.clone())));

    let reply = engine.dispatch("xyzzy plugh");

    assert_eq!(reply, "Đây là câu trả lời.");
    assert_eq!(provider.call_count(), 1);
    assert_eq!(provider.get_call_history()[0].text, "xyzzy plugh");
}

#[test]
fn test_unconfigured_provider_is_not_consulted() {
    let provider = MockProvider::new("chatgpt").with_default_response("never");
    provider.set_configured(false);
    let engine = ready_engine(builder().provider(Arc::new(provider.clone())));

    let reply = engine.dispatch("xyzzy plugh");

    assert!(reply == GENERIC_UNMATCHED || reply.starts_with(SUGGESTION_HEADER));
    assert_eq!(provider.call_count(), 0);
}

#[test]
fn test_low_information_answer_escalates() {
    let nlp = StubHandler::replying("unknown");
    let provider = MockProvider::new("gemini").with_default_response("Câu này nói về thời tiết.");
    let engine = ready_engine(
        builder()
            .factory(stub_factory("nlp_processor", &nlp))
            .provider(Arc::new(provider.clone())),
    );

    let reply = engine.dispatch("phân tích câu này");

    assert_eq!(reply, "Câu này nói về thời tiết.");
    assert_eq!(nlp.invocations().len(), 1);
    assert_eq!(provider.get_call_history()[0].text, "phân tích câu này");
}

#[test]
fn test_informative_answer_is_kept() {
    let nlp = StubHandler::replying("Câu này mang cảm xúc tích cực.");
    let provider = MockProvider::new("gemini").with_default_response("never");
    let engine = ready_engine(
        builder()
            .factory(stub_factory("nlp_processor", &nlp))
            .provider(Arc::new(provider.clone())),
    );

    let reply = engine.dispatch("phân tích cảm xúc câu này");

    assert_eq!(reply, "Câu này mang cảm xúc tích cực.");
    assert_eq!(provider.call_count(), 0);
}

#[test]
fn test_low_information_answer_kept_when_escalation_fails() {
    let nlp = StubHandler::replying("intent: unknown");
    let provider = MockProvider::new("chatgpt").with_failure("quota exceeded");
    let engine = ready_engine(
        builder()
            .factory(stub_factory("nlp_processor", &nlp))
            .provider(Arc::new(provider.clone())),
    );

    let reply = engine.dispatch("phân tích câu này");

    assert_eq!(reply, "intent: unknown");
    assert_eq!(provider.call_count(), 1);
}

#[test]
fn test_language_handler_receives_history() {
    let nlp = StubHandler::replying("Đã phân tích.");
    let engine = ready_engine(builder().factory(stub_factory("nlp_processor", &nlp)));

    engine.dispatch("mấy giờ rồi");
    engine.dispatch("phân tích câu trước");

    let invocations = nlp.invocations();
    assert_eq!(invocations.len(), 1);
    let history = &invocations[0].history;
    assert!(history.iter().any(|message| message.content == "mấy giờ rồi"));
    assert_eq!(
        history.last().map(|message| message.content.as_str()),
        Some("phân tích câu trước")
    );
}

#[test]
fn test_provider_trigger_routes_question() {
    let provider = MockProvider::new("chatgpt").with_response("thủ đô của Pháp", "Paris");
    let engine = ready_engine(builder().provider(Arc::new(provider.clone())));

    let reply = engine.dispatch("hỏi chatgpt thủ đô của Pháp");

    assert_eq!(reply, "Paris");
    assert_eq!(provider.get_call_history()[0].text, "thủ đô của Pháp");
}

#[test]
fn test_provider_trigger_without_question() {
    let provider = MockProvider::new("chatgpt").with_default_response("never");
    let engine = ready_engine(builder().provider(Arc::new(provider.clone())));

    let reply = engine.dispatch("chatgpt ơi");

    assert_eq!(reply, "Bạn muốn hỏi chatgpt điều gì?");
    assert_eq!(provider.call_count(), 0);
}

#[test]
fn test_provider_trigger_failure_is_reported() {
    let provider = MockProvider::new("gemini").with_failure("network down");
    let engine = ready_engine(builder().provider(Arc::new(provider)));

    let reply = engine.dispatch("hỏi gemini ai là người giàu nhất");

    assert!(reply.starts_with("Lỗi khi gọi gemini:"), "unexpected reply: {reply}");
    assert!(reply.contains("network down"));
}

#[test]
fn test_taught_pattern_preempts_matching() {
    let engine = ready_engine(builder());
    engine.teach("bạn tên gì", "Tôi là Lingo.");

    assert_eq!(engine.dispatch("Ban ten gi vay?"), "Tôi là Lingo.");
    assert_eq!(engine.dispatch("Bạn tên gì"), "Tôi là Lingo.");
}

#[test]
fn test_turns_are_remembered() {
    let engine = ready_engine(builder());

    let reply = engine.dispatch("mấy giờ rồi");

    let history = engine.memory().recent_history(2);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "mấy giờ rồi");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, reply);
}

#[test]
fn test_application_launch_without_name() {
    let engine = ready_engine(builder());

    assert_eq!(engine.dispatch("mở"), "Bạn muốn mở ứng dụng nào?");
}

use super::*;
use crate::fakes::{FakeClipboard, FakeKeyboard, ScriptedProvider, StaticTabSource, response};
use crate::injector::InjectorSettings;
use serde_json::json;
use webask_protocols::{BlockVerdict, CaptureError, ExtractionMode, ExtractionSource};

use OrchestratorState::*;

type TestOrchestrator = AskOrchestrator<FakeClipboard, FakeKeyboard>;

fn options() -> AskOptions {
    let mut options = AskOptions::new(UrlPattern::parse("chat.example").unwrap());
    options.attempt_timeout = Duration::from_secs(30);
    options.max_attempts = 3;
    options.backoff = Duration::from_secs(1);
    options.poll.interval = Duration::from_secs(2);
    options
}

fn quick_injector() -> InputInjector {
    InputInjector::new(InjectorSettings {
        clipboard_settle: Duration::from_millis(50),
        focus_settle: Duration::from_millis(50),
        submit_settle: Duration::from_millis(50),
        ..Default::default()
    })
}

fn build(
    tabs: Arc<StaticTabSource>,
    provider: Arc<ScriptedProvider>,
    keyboard: FakeKeyboard,
    options: AskOptions,
) -> TestOrchestrator {
    let desktop = DesktopHandle::new(FakeClipboard::with_text("user clipboard"), keyboard);
    AskOrchestrator::new(tabs, provider, desktop, options).with_injector(quick_injector())
}

fn chat_tabs() -> Arc<StaticTabSource> {
    Arc::new(StaticTabSource::single_window(&[
        "https://news.example/",
        "https://chat.example/c/1",
    ]))
}

fn challenge() -> Snapshot {
    Snapshot::new(
        "https://chat.example/c/1",
        "Checking if the site connection is secure",
        "<div id=\"cf-turnstile\"></div>",
    )
}

fn object(value: serde_json::Value) -> webask_protocols::JsonObject {
    value.as_object().cloned().unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_target_not_found_exhausts_attempts() {
    let tabs = Arc::new(StaticTabSource::single_window(&["https://news.example/"]));
    let provider = ScriptedProvider::responses(&[""]);
    let mut orchestrator = build(tabs.clone(), provider.clone(), FakeKeyboard::default(), options());

    let outcome = orchestrator
        .run(&Prompt::new("hello"), &CancellationToken::new())
        .await;

    assert_eq!(outcome.failure_reason(), Some(&FailureReason::TargetNotFound));
    assert_eq!(outcome.attempts().len(), 3);
    assert!(outcome
        .attempts()
        .iter()
        .all(|a| a.outcome == AttemptOutcome::NoTargetFound));
    assert_eq!(
        outcome.attempts().iter().map(|a| a.attempt_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    // Every attempt rescans; nothing is ever typed or captured.
    assert_eq!(tabs.list_calls(), 3);
    assert_eq!(provider.calls(), 0);
    assert!(orchestrator.desktop().keyboard().events.is_empty());
    assert_eq!(
        orchestrator.state_history(),
        &[Idle, Locating, Retrying, Locating, Retrying, Locating, Failed]
    );
    assert_eq!(outcome.exit_code(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_growing_reply_then_fenced_answer_succeeds() {
    let provider = ScriptedProvider::responses(&[
        "",
        "Thinking",
        "```json\n{\"answer\": \"Pa",
        "```json\n{\"answer\": \"Paris\"}\n```",
    ]);
    let mut orchestrator = build(chat_tabs(), provider.clone(), FakeKeyboard::default(), options());

    let outcome = orchestrator
        .run(&Prompt::new("Capital of France?"), &CancellationToken::new())
        .await;

    match &outcome {
        Outcome::Success { result, attempts } => {
            assert_eq!(result.objects, vec![object(json!({"answer": "Paris"}))]);
            assert_eq!(result.source, ExtractionSource::FencedBlock);
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].outcome, AttemptOutcome::Success);
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(
        orchestrator.state_history(),
        &[Idle, Locating, Injecting, Polling, Classifying, Extracting, Succeeded]
    );
    // Baseline plus four samples.
    assert_eq!(provider.calls(), 5);
    assert_eq!(orchestrator.desktop().keyboard().submits(), 1);
    assert_eq!(
        orchestrator.desktop().clipboard().content.as_deref(),
        Some("user clipboard")
    );
    assert_eq!(orchestrator.session().unwrap().handle.tab_id, "t2");
    assert!(orchestrator
        .last_snapshot()
        .unwrap()
        .content_text()
        .contains("Paris"));
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_challenge_fatal_when_block_retry_disabled() {
    let provider = ScriptedProvider::new(vec![
        Ok(response("")),
        Ok(response("Thinking")),
        Ok(challenge()),
    ]);
    let mut opts = options();
    opts.retry_on_block = false;
    let mut orchestrator = build(chat_tabs(), provider, FakeKeyboard::default(), opts);

    let outcome = orchestrator
        .run(&Prompt::new("hello"), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome.failure_reason(),
        Some(&FailureReason::BlockDetected(BlockVerdict::ChallengePresent))
    );
    assert_eq!(outcome.attempts().len(), 1);
    assert_eq!(
        outcome.attempts()[0].outcome,
        AttemptOutcome::Blocked(BlockVerdict::ChallengePresent)
    );
    assert_eq!(*orchestrator.state_history().last().unwrap(), Failed);
    assert_eq!(outcome.exit_code(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_block_retried_reuses_session() {
    let provider = ScriptedProvider::new(vec![
        Ok(response("")),
        Ok(challenge()),
        Ok(response("")),
        Ok(response("{\"answer\": \"Paris\", \"extra\": 1}")),
    ]);
    let tabs = chat_tabs();
    let mut opts = options();
    opts.extraction = ExtractOptions::new(ExtractionMode::Last).with_fields(vec!["answer".to_string()]);
    let mut orchestrator = build(tabs.clone(), provider, FakeKeyboard::default(), opts);

    let outcome = orchestrator
        .run(&Prompt::new("hello"), &CancellationToken::new())
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts().len(), 2);
    assert_eq!(
        outcome.attempts()[0].outcome,
        AttemptOutcome::Blocked(BlockVerdict::ChallengePresent)
    );
    if let Outcome::Success { result, .. } = &outcome {
        assert_eq!(result.objects, vec![object(json!({"answer": "Paris"}))]);
    }
    // Located once, refocused on the retry.
    assert_eq!(tabs.list_calls(), 1);
    assert_eq!(tabs.activated(), vec!["t2", "t2"]);
    assert_eq!(orchestrator.desktop().keyboard().submits(), 2);
    assert!(orchestrator.state_history().contains(&Retrying));
    assert_eq!(
        &orchestrator.state_history()[..3],
        &[Idle, Locating, Injecting]
    );
}

#[tokio::test(start_paused = true)]
async fn test_poll_timeout_each_attempt() {
    let growing: Vec<_> = (0..200).map(|n| Ok(response(&"x".repeat(n + 1)))).collect();
    let provider = ScriptedProvider::new(growing);
    let mut opts = options();
    opts.max_attempts = 2;
    opts.attempt_timeout = Duration::from_secs(10);
    let mut orchestrator = build(chat_tabs(), provider, FakeKeyboard::default(), opts);

    let start = Instant::now();
    let outcome = orchestrator
        .run(&Prompt::new("hello"), &CancellationToken::new())
        .await;
    let elapsed = start.elapsed();

    assert_eq!(outcome.failure_reason(), Some(&FailureReason::PollTimeout));
    assert_eq!(outcome.attempts().len(), 2);
    // Two attempt budgets plus one backoff, each overrun by at most an interval.
    assert!(elapsed <= Duration::from_secs(10 + 2) * 2 + Duration::from_secs(1));
    assert_eq!(outcome.exit_code(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_plain_text_reply_is_extraction_empty() {
    let provider = ScriptedProvider::responses(&["", "The capital is Paris."]);
    let mut opts = options();
    opts.max_attempts = 1;
    let mut orchestrator = build(chat_tabs(), provider, FakeKeyboard::default(), opts);

    let outcome = orchestrator
        .run(&Prompt::new("hello"), &CancellationToken::new())
        .await;

    assert_eq!(outcome.failure_reason(), Some(&FailureReason::ExtractionEmpty));
    assert_eq!(outcome.attempts()[0].outcome, AttemptOutcome::ExtractionEmpty);
    assert_eq!(
        orchestrator.state_history(),
        &[Idle, Locating, Injecting, Polling, Classifying, Extracting, Failed]
    );
    assert_eq!(outcome.exit_code(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_plain_text_reply_accepted_with_fallback() {
    let provider = ScriptedProvider::responses(&["", "The capital is Paris."]);
    let mut opts = options();
    opts.extraction = ExtractOptions::new(ExtractionMode::Last).with_fallback(true);
    let mut orchestrator = build(chat_tabs(), provider, FakeKeyboard::default(), opts);

    let outcome = orchestrator
        .run(&Prompt::new("hello"), &CancellationToken::new())
        .await;

    match outcome {
        Outcome::Success { result, attempts } => {
            assert!(result.is_empty());
            assert_eq!(result.source, ExtractionSource::Fallback);
            assert!(result.fallback_text.unwrap().contains("The capital is Paris."));
            assert_eq!(attempts.len(), 1);
        }
        other => panic!("expected fallback success, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start() {
    let provider = ScriptedProvider::responses(&[""]);
    let mut orchestrator = build(chat_tabs(), provider.clone(), FakeKeyboard::default(), options());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = orchestrator.run(&Prompt::new("hello"), &cancel).await;

    assert_eq!(outcome.failure_reason(), Some(&FailureReason::Cancelled));
    assert_eq!(outcome.attempts().len(), 1);
    assert_eq!(provider.calls(), 0);
    assert_eq!(orchestrator.state_history(), &[Idle, Locating, Failed]);
    assert_eq!(outcome.exit_code(), 130);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_poll_is_never_retried() {
    let growing: Vec<_> = (0..200).map(|n| Ok(response(&"y".repeat(n + 1)))).collect();
    let provider = ScriptedProvider::new(growing);
    let mut orchestrator = build(chat_tabs(), provider, FakeKeyboard::default(), options());
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        canceller.cancel();
    });

    let outcome = orchestrator.run(&Prompt::new("hello"), &cancel).await;

    assert_eq!(outcome.failure_reason(), Some(&FailureReason::Cancelled));
    assert_eq!(outcome.attempts().len(), 1);
    assert_eq!(
        orchestrator.desktop().clipboard().content.as_deref(),
        Some("user clipboard")
    );
}

#[tokio::test(start_paused = true)]
async fn test_injection_failure_retried_and_clipboard_restored() {
    let provider = ScriptedProvider::responses(&[""]);
    let keyboard = FakeKeyboard {
        fail_press: true,
        ..Default::default()
    };
    let mut opts = options();
    opts.max_attempts = 2;
    let mut orchestrator = build(chat_tabs(), provider, keyboard, opts);

    let outcome = orchestrator
        .run(&Prompt::new("hello"), &CancellationToken::new())
        .await;

    assert!(matches!(
        outcome.failure_reason(),
        Some(FailureReason::InjectionFailed(_))
    ));
    assert_eq!(outcome.attempts().len(), 2);
    assert_eq!(
        orchestrator.desktop().clipboard().content.as_deref(),
        Some("user clipboard")
    );
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_capture_failure() {
    let provider = ScriptedProvider::new(vec![Err(CaptureError::PageClosed("t2".to_string()))]);
    let mut opts = options();
    opts.max_attempts = 1;
    let mut orchestrator = build(chat_tabs(), provider.clone(), FakeKeyboard::default(), opts);

    let outcome = orchestrator
        .run(&Prompt::new("hello"), &CancellationToken::new())
        .await;

    assert!(matches!(
        outcome.failure_reason(),
        Some(FailureReason::CaptureFailed(_))
    ));
    // Failed baseline plus three failed samples.
    assert_eq!(provider.calls(), 4);
    assert!(orchestrator.last_snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unfocusable_tab_reported_as_not_found() {
    let tabs = Arc::new(StaticTabSource {
        fail_activate: true,
        ..StaticTabSource::single_window(&["https://chat.example/c/1"])
    });
    let provider = ScriptedProvider::responses(&[""]);
    let mut opts = options();
    opts.max_attempts = 2;
    let mut orchestrator = build(tabs, provider, FakeKeyboard::default(), opts);

    let outcome = orchestrator
        .run(&Prompt::new("hello"), &CancellationToken::new())
        .await;

    assert_eq!(outcome.failure_reason(), Some(&FailureReason::TargetNotFound));
    assert!(orchestrator.session().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_all_mode_returns_every_object() {
    let provider = ScriptedProvider::responses(&[
        "",
        "{\"question\": \"a\"} and {\"question\": \"b\"}",
    ]);
    let mut opts = options();
    opts.extraction = ExtractOptions::new(ExtractionMode::All);
    let mut orchestrator = build(chat_tabs(), provider, FakeKeyboard::default(), opts);

    let outcome = orchestrator
        .run(&Prompt::new("hello"), &CancellationToken::new())
        .await;

    match outcome {
        Outcome::Success { result, .. } => {
            assert_eq!(
                result.to_output(ExtractionMode::All),
                json!([{"question": "a"}, {"question": "b"}])
            );
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_second_run_reuses_session_and_resets_history() {
    let provider = ScriptedProvider::responses(&["", "{\"answer\": 1}"]);
    let tabs = chat_tabs();
    let mut orchestrator = build(tabs.clone(), provider, FakeKeyboard::default(), options());

    let first = orchestrator
        .run(&Prompt::new("one"), &CancellationToken::new())
        .await;
    assert!(first.is_success());

    // The page still shows the first answer, so the second run can only time
    // out; what matters is that it refocused rather than rescanned.
    let second = orchestrator
        .run(&Prompt::new("two"), &CancellationToken::new())
        .await;

    assert_eq!(second.failure_reason(), Some(&FailureReason::PollTimeout));
    assert_eq!(tabs.list_calls(), 1);
    assert_eq!(orchestrator.state_history()[..2], [Idle, Injecting]);
}

#[tokio::test(start_paused = true)]
async fn test_input_selector_focused_before_paste() {
    let tabs = Arc::new(StaticTabSource {
        inputs: vec!["textarea#chat-input".to_string()],
        ..StaticTabSource::single_window(&["https://chat.example/c/1"])
    });
    let provider = ScriptedProvider::responses(&["", "{\"answer\": 4}"]);
    let desktop = DesktopHandle::new(FakeClipboard::default(), FakeKeyboard::default());
    let injector = InputInjector::new(InjectorSettings {
        input_selector: Some("textarea#chat-input".to_string()),
        ..quick_injector().settings().clone()
    });
    let mut orchestrator =
        AskOrchestrator::new(tabs.clone(), provider, desktop, options()).with_injector(injector);

    let outcome = orchestrator
        .run(&Prompt::new("2+2?"), &CancellationToken::new())
        .await;

    assert!(outcome.is_success());
    assert_eq!(
        tabs.focused_inputs(),
        vec![("t1".to_string(), "textarea#chat-input".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_input_selector_never_pastes() {
    let tabs = Arc::new(StaticTabSource::single_window(&["https://chat.example/c/1"]));
    let provider = ScriptedProvider::responses(&[""]);
    let desktop = DesktopHandle::new(FakeClipboard::with_text("keep me"), FakeKeyboard::default());
    let injector = InputInjector::new(InjectorSettings {
        input_selector: Some("#no-such-input".to_string()),
        ..quick_injector().settings().clone()
    });
    let mut opts = options();
    opts.max_attempts = 2;
    let mut orchestrator =
        AskOrchestrator::new(tabs.clone(), provider, desktop, opts).with_injector(injector);

    let outcome = orchestrator
        .run(&Prompt::new("hello"), &CancellationToken::new())
        .await;

    assert_eq!(outcome.failure_reason(), Some(&FailureReason::NoActiveTarget));
    assert_eq!(outcome.attempts().len(), 2);
    assert!(orchestrator.desktop().keyboard().events.is_empty());
    assert!(orchestrator.desktop().clipboard().writes.is_empty());
    assert_eq!(tabs.focused_inputs().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_echoed_rate_limit_question_is_not_a_block() {
    let question = "What does HTTP 429 Too Many Requests mean?";
    let answer = "{\"answer\": \"the server is throttling you\"}";
    let before = Snapshot::new("https://chat.example/c/1", "Chat", "<main>Chat</main>")
        .with_notice_text("Chat");
    let page = format!("Chat\n{}\n{}", question, answer);
    let after = Snapshot::new("https://chat.example/c/1", page.clone(), format!("<main>{}</main>", page))
        .with_response(webask_protocols::PageLayout::Generic, answer)
        .with_notice_text("Chat");
    let provider = ScriptedProvider::new(vec![Ok(before), Ok(after)]);
    let mut opts = options();
    opts.retry_on_block = false;
    let mut orchestrator = build(chat_tabs(), provider, FakeKeyboard::default(), opts);

    let outcome = orchestrator
        .run(&Prompt::new(question), &CancellationToken::new())
        .await;

    assert!(outcome.is_success(), "got {:?}", outcome);
    assert_eq!(outcome.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_answer_in_new_turn_completes() {
    let answer = "{\"answer\": 4}";
    let turn = |n: usize| {
        let page = format!("Chat\n{}", answer.repeat(n));
        Snapshot::new("https://chat.example/c/1", page.clone(), format!("<main>{}</main>", page))
            .with_response(webask_protocols::PageLayout::Generic, answer)
            .with_turns(n)
    };
    let provider = ScriptedProvider::new(vec![Ok(turn(1)), Ok(turn(1)), Ok(turn(2))]);
    let mut orchestrator = build(chat_tabs(), provider, FakeKeyboard::default(), options());

    let outcome = orchestrator
        .run(&Prompt::new("2+2?"), &CancellationToken::new())
        .await;

    assert!(outcome.is_success(), "got {:?}", outcome);
    assert_eq!(outcome.attempts().len(), 1);
}

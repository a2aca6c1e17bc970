mod support;

use std::time::Duration;

use casabot_agent::agent::{CANCELLED_NOTICE, ITERATION_LIMIT_MESSAGE};
use casabot_agent::{AgentConfig, AgentError, CancelSignal};
use chat_provider::{Message, ProviderError, Role, ToolCall};
use chat_provider_mock::ScriptedReply;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use support::{contents, Harness};

fn run_command(id: &str, command: &str) -> ToolCall {
    ToolCall::new(id, "run_command", serde_json::json!({ "command": command }).to_string())
}

#[tokio::test]
async fn reply_without_tool_calls_ends_the_run() {
    let mut harness = Harness::new([ScriptedReply::from(Message::assistant("hello!"))]);

    let outcome = harness.drive("hi", CancelSignal::new()).await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.produced, vec![Message::assistant("hello!")]);
    assert_eq!(
        harness.persisted().await,
        vec![Message::user("hi"), Message::assistant("hello!")]
    );

    let requests = harness.provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages[0].role, Role::System);
    assert!(requests[0].messages[0].content.contains("No skills available."));
    assert_eq!(requests[0].messages[1..].to_vec(), vec![Message::user("hi")]);
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].tools[0].name, "run_command");
}

#[tokio::test]
async fn every_tool_call_is_answered_in_order_before_next_request() {
    let calls = vec![run_command("a", "echo one"), run_command("b", "echo two")];
    let mut harness = Harness::new([
        ScriptedReply::from(Message::assistant_with_tool_calls("working", calls.clone())),
        ScriptedReply::from(Message::assistant("done")),
    ]);

    let outcome = harness.drive("go", CancelSignal::new()).await;
    assert!(outcome.error.is_none());
    assert_eq!(
        outcome.produced,
        vec![
            Message::assistant_with_tool_calls("working", calls.clone()),
            Message::tool("a", "one\n"),
            Message::tool("b", "two\n"),
            Message::assistant("done"),
        ]
    );

    let requests = harness.provider.requests();
    assert_eq!(requests.len(), 2);
    let second = &requests[1].messages;
    assert_eq!(
        second[1..].to_vec(),
        vec![
            Message::user("go"),
            Message::assistant_with_tool_calls("working", calls),
            Message::tool("a", "one\n"),
            Message::tool("b", "two\n"),
        ]
    );
    assert_eq!(harness.persisted().await.len(), 5);
}

#[tokio::test]
async fn bad_arguments_and_unknown_tools_are_answered_not_fatal() {
    let mut harness = Harness::new([
        ScriptedReply::from(Message::assistant_with_tool_calls(
            "",
            vec![
                ToolCall::new("bad", "run_command", "{\"command\":"),
                ToolCall::new("odd", "write_file", "{}"),
            ],
        )),
        ScriptedReply::from(Message::assistant("recovered")),
    ]);

    let outcome = harness.drive("go", CancelSignal::new()).await;

    assert!(outcome.error.is_none());
    assert_eq!(
        contents(&outcome.produced),
        vec![
            "",
            "Error: failed to parse tool arguments: {\"command\":",
            "Unknown tool: write_file",
            "recovered",
        ]
    );
}

#[tokio::test]
async fn iteration_limit_appends_warning() {
    let config = AgentConfig {
        max_iterations: 3,
        ..AgentConfig::default()
    };
    let replies = (0..3).map(|index| {
        ScriptedReply::from(Message::assistant_with_tool_calls(
            "",
            vec![run_command(&format!("c{index}"), "true")],
        ))
    });
    let mut harness = Harness::with_config(replies, config);

    let outcome = harness.drive("loop forever", CancelSignal::new()).await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.produced.len(), 7);
    let last = outcome.produced.last().expect("warning");
    assert_eq!(last, &Message::assistant(ITERATION_LIMIT_MESSAGE));
    assert_eq!(harness.provider.call_count(), 3);
    assert_eq!(
        harness.persisted().await.last(),
        Some(&Message::assistant(ITERATION_LIMIT_MESSAGE))
    );
}

#[tokio::test(start_paused = true)]
async fn retries_back_off_exponentially_then_succeed() {
    let mut harness = Harness::new([
        ScriptedReply::from(ProviderError::new("HTTP 503 overloaded")),
        ScriptedReply::from(ProviderError::new("HTTP 503 overloaded")),
        ScriptedReply::from(ProviderError::new("HTTP 503 overloaded")),
        ScriptedReply::from(Message::assistant("finally")),
    ]);

    let started = tokio::time::Instant::now();
    let mut arrivals = Vec::new();
    let mut produced = Vec::new();
    {
        let stream = harness.agent.run(
            &mut harness.conversation,
            "hi".to_string(),
            &[],
            CancelSignal::new(),
        );
        futures_util::pin_mut!(stream);
        while let Some(item) = stream.next().await {
            arrivals.push(started.elapsed());
            produced.push(item.expect("run should recover"));
        }
    }

    assert_eq!(produced.len(), 4);
    assert!(produced[0].content.contains("Retrying in 2s (1/3)"), "{}", produced[0].content);
    assert!(produced[1].content.contains("Retrying in 4s (2/3)"), "{}", produced[1].content);
    assert!(produced[2].content.contains("Retrying in 8s (3/3)"), "{}", produced[2].content);
    assert_eq!(produced[3], Message::assistant("finally"));

    let expected = [0_u64, 2000, 6000, 14000];
    for (arrival, expected_ms) in arrivals.iter().zip(expected) {
        let expected = Duration::from_millis(expected_ms);
        assert!(
            *arrival >= expected && *arrival < expected + Duration::from_millis(100),
            "arrived at {arrival:?}, expected about {expected:?}"
        );
    }

    // Retry notices are transcript-only.
    assert_eq!(
        harness.persisted().await,
        vec![Message::user("hi"), Message::assistant("finally")]
    );
}

#[tokio::test(start_paused = true)]
async fn fourth_failure_propagates() {
    let mut harness = Harness::new((0..4).map(|_| ScriptedReply::from(ProviderError::new("HTTP 500 boom"))));

    let outcome = harness.drive("hi", CancelSignal::new()).await;

    assert_eq!(outcome.produced.len(), 3);
    match outcome.error {
        Some(AgentError::ProviderExhausted { attempts, source }) => {
            assert_eq!(attempts, 4);
            assert_eq!(source.message(), "HTTP 500 boom");
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
    assert_eq!(harness.provider.call_count(), 4);
    assert_eq!(harness.persisted().await, vec![Message::user("hi")]);
}

#[tokio::test]
async fn cancellation_before_provider_call_is_silent() {
    let mut harness = Harness::new([ScriptedReply::from(Message::assistant("never"))]);
    let cancel = CancelSignal::new();
    cancel.cancel();

    let outcome = harness.drive("hi", cancel).await;

    assert!(outcome.error.is_none());
    assert!(outcome.produced.is_empty());
    assert_eq!(harness.provider.call_count(), 0);
    assert_eq!(harness.persisted().await, vec![Message::user("hi")]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_stops_retrying() {
    let mut harness = Harness::new([
        ScriptedReply::from(ProviderError::new("HTTP 429 slow down")),
        ScriptedReply::from(Message::assistant("never")),
    ]);
    let cancel = CancelSignal::new();

    let mut produced = Vec::new();
    {
        let stream = harness.agent.run(
            &mut harness.conversation,
            "hi".to_string(),
            &[],
            cancel.clone(),
        );
        futures_util::pin_mut!(stream);
        while let Some(item) = stream.next().await {
            produced.push(item.expect("cancellation is not an error"));
            cancel.cancel();
        }
    }

    assert_eq!(produced.len(), 1);
    assert!(produced[0].content.contains("slow down"));
    assert_eq!(harness.provider.call_count(), 1);
    assert_eq!(harness.provider.remaining_replies(), 1);
}

#[tokio::test]
async fn cancellation_interrupts_hanging_provider_call() {
    let mut harness = Harness::new([ScriptedReply::Hang]);
    let cancel = CancelSignal::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(5), harness.drive("hi", cancel))
        .await
        .expect("run must end promptly after cancel");

    assert!(outcome.error.is_none());
    assert!(outcome.produced.is_empty());
}

#[tokio::test]
async fn cancellation_before_tool_dispatch_drops_remaining_calls() {
    let cancel = CancelSignal::new();
    let mut harness = Harness::new([]);
    let marker = harness.dir.path().join("should-not-exist");
    let calls = vec![
        run_command("x", &format!("touch '{}'", marker.display())),
        run_command("y", "true"),
    ];
    harness.provider.push_reply(ScriptedReply::MessageThenCancel(
        Message::assistant_with_tool_calls("", calls.clone()),
        cancel.clone(),
    ));

    let outcome = harness.drive("go", cancel).await;

    assert!(outcome.error.is_none());
    assert!(!marker.exists(), "cancelled tool call must not run");
    assert_eq!(harness.provider.call_count(), 1);
    assert_eq!(
        outcome.produced,
        vec![
            Message::assistant_with_tool_calls("", calls.clone()),
            Message::assistant(CANCELLED_NOTICE),
        ]
    );
    assert_eq!(
        harness.persisted().await,
        vec![Message::user("go"), Message::assistant_with_tool_calls("", calls)]
    );
}

#[tokio::test]
async fn cancellation_during_running_command_keeps_its_result_then_notifies() {
    let calls = vec![
        run_command("slow", "sleep 1 && echo finished"),
        run_command("next", "echo never"),
    ];
    let mut harness = Harness::new([
        ScriptedReply::from(Message::assistant_with_tool_calls("", calls.clone())),
        ScriptedReply::from(Message::assistant("unreachable")),
    ]);

    let cancel = CancelSignal::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(10), harness.drive("go", cancel))
        .await
        .expect("run must end after the running command");

    assert!(outcome.error.is_none());
    assert_eq!(
        outcome.produced,
        vec![
            Message::assistant_with_tool_calls("", calls.clone()),
            Message::tool("slow", "finished\n"),
            Message::assistant(CANCELLED_NOTICE),
        ]
    );
    assert_eq!(harness.provider.call_count(), 1);
    assert_eq!(
        harness.persisted().await,
        vec![
            Message::user("go"),
            Message::assistant_with_tool_calls("", calls),
            Message::tool("slow", "finished\n"),
        ]
    );
}

#[tokio::test]
async fn stale_tool_call_is_answered_before_new_user_message() {
    let cancel = CancelSignal::new();
    let calls = vec![run_command("x", "true")];
    let mut harness = Harness::new([ScriptedReply::MessageThenCancel(
        Message::assistant_with_tool_calls("", calls.clone()),
        cancel.clone(),
    )]);
    harness.drive("first", cancel).await;

    harness.provider.push_reply(Message::assistant("back again"));
    let outcome = harness.drive("second", CancelSignal::new()).await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.produced.len(), 2);
    let repair = &outcome.produced[0];
    assert_eq!(repair.role, Role::Tool);
    assert_eq!(repair.tool_call_id.as_deref(), Some("x"));
    assert!(repair.content.starts_with("Error occurred:"));
    assert_eq!(outcome.produced[1], Message::assistant("back again"));

    let requests = harness.provider.requests();
    let last = &requests.last().expect("second request").messages;
    let roles: Vec<Role> = last.iter().map(|message| message.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::User]
    );
}

#[tokio::test]
async fn store_failure_escapes_the_run() {
    let mut harness = Harness::new([ScriptedReply::from(Message::assistant("unused"))]);
    std::fs::write(harness.dir.path().join("history"), "not a directory").expect("block history dir");

    let outcome = harness.drive("hi", CancelSignal::new()).await;

    assert!(outcome.produced.is_empty());
    assert!(matches!(outcome.error, Some(AgentError::Store(_))));
    assert_eq!(harness.provider.call_count(), 0);
}

//! Compaction properties over generated histories

use async_trait::async_trait;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use repo_analyst::context::{fallback_digest, ContextBudget, ContextWindow, Summarizer, TokenCounter};
use repo_analyst::errors::{AnalysisError, Result};
use repo_analyst::types::{Message, Role};

struct ShortSummary;

#[async_trait]
impl Summarizer for ShortSummary {
    async fn summarize(&self, _transcript: &str) -> Result<String> {
        Ok("Earlier turns covered the project layout.".to_string())
    }
}

struct Unavailable;

#[async_trait]
impl Summarizer for Unavailable {
    async fn summarize(&self, _transcript: &str) -> Result<String> {
        Err(AnalysisError::ModelApi("503 Service Unavailable".to_string()))
    }
}

fn summarizer(fail: bool) -> &'static dyn Summarizer {
    if fail {
        &Unavailable
    } else {
        &ShortSummary
    }
}

/// Alternating user/assistant turns with the given sizes
fn window(sizes: &[u16], keep_last: usize) -> ContextWindow {
    let budget = ContextBudget::new(2000, 1500, keep_last).unwrap();
    let mut window = ContextWindow::new(budget);
    window.initialize(Message::system("You analyze repositories.")).unwrap();

    for (i, size) in sizes.iter().enumerate() {
        let text = "w".repeat(usize::from(*size % 1200) + 1);
        let message = if i % 2 == 0 {
            Message::user(text)
        } else {
            Message::assistant(text)
        };
        window.append(message).unwrap();
    }

    window
}

fn keep(k: u8) -> usize {
    usize::from(k % 6) + 1
}

#[quickcheck]
fn prop_compaction_preserves_system_and_tail(sizes: Vec<u16>, k: u8, fail: bool) -> TestResult {
    let keep_last = keep(k);
    let mut window = window(&sizes, keep_last);
    let before = window.messages().to_vec();

    let compacted = tokio_test::block_on(window.compact(summarizer(fail))).unwrap();
    if !compacted {
        return TestResult::from_bool(window.messages() == before.as_slice());
    }

    let after = window.messages();
    let tail = &before[before.len() - keep_last..];

    TestResult::from_bool(
        after[0] == before[0]
            && after[1].role == Role::Summary
            && &after[2..] == tail
            && after.len() <= before.len(),
    )
}

#[quickcheck]
fn prop_second_compaction_is_noop(sizes: Vec<u16>, k: u8, fail: bool) -> bool {
    let mut window = window(&sizes, keep(k));

    tokio_test::block_on(window.compact(summarizer(fail))).unwrap();
    let once = window.messages().to_vec();

    let again = tokio_test::block_on(window.compact(summarizer(fail))).unwrap();
    !again && window.messages() == once.as_slice()
}

#[quickcheck]
fn prop_below_threshold_or_at_floor(sizes: Vec<u16>, k: u8, fail: bool) -> bool {
    let keep_last = keep(k);
    let mut window = window(&sizes, keep_last);

    let outcome = tokio_test::block_on(window.maybe_compact(summarizer(fail)));
    if let Err(e) = &outcome {
        if !matches!(e, AnalysisError::BudgetExceeded { .. }) {
            return false;
        }
    }

    // Floor: system, at most one summary, and the protected tail; or a
    // middle so small that even the digest would not shrink it
    window.current_token_estimate() < window.budget().summary_threshold()
        || window.messages().len() <= keep_last + 2
        || digest_would_grow(&window)
}

fn digest_would_grow(window: &ContextWindow) -> bool {
    let Some(history) = window.history() else {
        return false;
    };
    let counter = TokenCounter::new();
    let middle = &history.messages()[history.leading_system_len()..history.kept_tail_start(window.budget().keep_last())];
    let char_budget = (window.budget().summary_threshold() / 4).max(64) * 4;
    let digest = Message::summary(fallback_digest(middle, char_budget));

    counter.estimate_message(&digest) >= counter.estimate_messages(middle)
}

#[quickcheck]
fn prop_hard_limit_reported_not_hidden(sizes: Vec<u16>, k: u8) -> bool {
    let mut window = window(&sizes, keep(k));

    match tokio_test::block_on(window.maybe_compact(&ShortSummary)) {
        Ok(_) => window.current_token_estimate() <= window.budget().max_tokens(),
        Err(AnalysisError::BudgetExceeded { current, max }) => {
            current == window.current_token_estimate() && current > max
        }
        Err(_) => false,
    }
}

#[tokio::test]
async fn scenario_a_single_compaction_before_ceiling() {
    let budget = ContextBudget::new(1000, 800, 2).unwrap();
    let mut window = ContextWindow::new(budget);
    window.initialize(Message::system("You analyze repositories.")).unwrap();

    let mut compactions = 0;
    for i in 0..12 {
        window.append(Message::user(format!("question {} {}", i, "q".repeat(300)))).unwrap();
        window.append(Message::assistant(format!("answer {} {}", i, "a".repeat(300)))).unwrap();

        let before = window.messages().to_vec();
        if window.maybe_compact(&ShortSummary).await.unwrap() {
            compactions += 1;
            let after = window.messages();
            assert!(after.len() < before.len());
            assert_eq!(&after[after.len() - 2..], &before[before.len() - 2..]);
            assert!(window.last_compaction().unwrap().tokens_before < 1000);
        }
        assert!(window.current_token_estimate() < 1000);
    }

    assert!(compactions >= 1);
    assert_eq!(window.compactions(), compactions);
}

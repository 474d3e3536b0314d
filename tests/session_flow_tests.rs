//! Integration tests for the coaching session against a scripted backend.
//!
//! The backend mock answers instantly and records every request, so tests
//! can assert on deduplication, staleness handling, and wire parameters
//! without a network.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use chesscoach::analysis::key::RequestKind;
use chesscoach::backend::{
    AnalysisBackend, ChatRequest, ChatResponse, EvaluateRequest, EvaluateResponse,
    RecommendRequest, RecommendResponse,
};
use chesscoach::chat::Role;
use chesscoach::config::CoachConfig;
use chesscoach::error::{BackendError, CoachError};
use chesscoach::session::{CoachSession, QueryStatus};

/// Scripted analysis service: canned answers, full request log.
#[derive(Default)]
struct ScriptedBackend {
    evaluate_calls: AtomicUsize,
    recommend_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    fail_evaluate: AtomicBool,
    fail_chat: AtomicBool,
    evaluate_requests: Mutex<Vec<EvaluateRequest>>,
    recommend_requests: Mutex<Vec<RecommendRequest>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    fn recommend_calls_for(&self, fen: &str) -> usize {
        self.recommend_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.fen == fen)
            .count()
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse, BackendError> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        let graded = request.mv.is_some();
        self.evaluate_requests.lock().unwrap().push(request);
        if self.fail_evaluate.load(Ordering::SeqCst) {
            return Err(BackendError::Status(503));
        }
        Ok(EvaluateResponse {
            score_cp: Some(35.0),
            mate: None,
            best_move: Some("Nf3".into()),
            pv: Some("Nf3 Nc6 Bb5".into()),
            grade: graded.then(|| "Good".to_string()),
            grade_description: graded.then(|| "A solid move.".to_string()),
            diff_cp: graded.then_some(-12.0),
        })
    }

    async fn recommend(
        &self,
        request: RecommendRequest,
    ) -> Result<RecommendResponse, BackendError> {
        self.recommend_calls.fetch_add(1, Ordering::SeqCst);
        let fen = request.fen.clone();
        let explain = request.explain;
        self.recommend_requests.lock().unwrap().push(request);
        Ok(RecommendResponse {
            mv: Some("Nf3".into()),
            analysis: if explain {
                format!("rec for {fen}")
            } else {
                String::new()
            },
        })
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        let context_lines = request.history.len();
        self.chat_requests.lock().unwrap().push(request);
        if self.fail_chat.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("connection refused".into()));
        }
        Ok(ChatResponse {
            reply: format!("reply with {context_lines} context lines"),
        })
    }
}

fn session_with(config: CoachConfig) -> (CoachSession, Arc<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::default());
    let session = CoachSession::new(backend.clone(), config);
    (session, backend)
}

fn session() -> (CoachSession, Arc<ScriptedBackend>) {
    session_with(CoachConfig::default())
}

#[tokio::test]
async fn move_produces_synchronized_views() {
    let (mut session, backend) = session();

    session.play_san("e4").unwrap();
    assert_eq!(session.pending_requests(), 2);
    session.settle_pending().await;
    session.pump();

    assert_eq!(session.pending_requests(), 0);
    assert_eq!(session.status(RequestKind::Evaluate), QueryStatus::Ready);
    assert_eq!(session.status(RequestKind::Recommend), QueryStatus::Ready);
    assert_eq!(session.eval_bar_percent(), Some(51.75));
    assert_eq!(session.grade_badge().unwrap().label, "Good");

    // Nf3 is a Black-to-move position here, so the suggestion cannot apply;
    // highlight degrades silently.
    let recommendation = session.recommendation().unwrap();
    assert_eq!(recommendation.mv.as_deref(), Some("Nf3"));

    // The grading request carried the move and the effective skill.
    let graded = backend.evaluate_requests.lock().unwrap();
    assert_eq!(graded.len(), 1);
    assert_eq!(graded[0].mv.as_deref(), Some("e4"));
    assert_eq!(graded[0].elo, Some(1600));
    assert_eq!(graded[0].depth, 15);
}

#[tokio::test]
async fn repeated_requests_before_settlement_issue_one_call() {
    let (mut session, backend) = session();

    session.play_san("e4").unwrap();
    let fen = session.fen().to_string();

    // Explicit re-requests while the first fetch is still pending.
    session.retry(RequestKind::Recommend).unwrap();
    session.retry(RequestKind::Recommend).unwrap();
    session.settle_pending().await;

    assert_eq!(backend.recommend_calls_for(&fen), 1);
}

#[tokio::test]
async fn fresh_results_are_reused_without_new_calls() {
    let (mut session, backend) = session_with(CoachConfig {
        freshness_window: Duration::from_secs(3600),
        ..CoachConfig::default()
    });

    session.play_san("e4").unwrap();
    session.settle_pending().await;
    let evaluates = backend.evaluate_calls.load(Ordering::SeqCst);
    let recommends = backend.recommend_calls.load(Ordering::SeqCst);

    // Re-applying the unchanged skill re-derives identical keys.
    session.apply_skill();
    session.settle_pending().await;

    assert_eq!(backend.evaluate_calls.load(Ordering::SeqCst), evaluates);
    assert_eq!(backend.recommend_calls.load(Ordering::SeqCst), recommends);
    assert_eq!(session.status(RequestKind::Recommend), QueryStatus::Ready);
}

#[tokio::test]
async fn stale_results_refetch_on_explicit_request() {
    let (mut session, backend) = session_with(CoachConfig {
        freshness_window: Duration::ZERO,
        ..CoachConfig::default()
    });

    session.play_san("e4").unwrap();
    session.settle_pending().await;
    let recommends = backend.recommend_calls.load(Ordering::SeqCst);

    session.retry(RequestKind::Recommend).unwrap();
    session.settle_pending().await;

    assert_eq!(
        backend.recommend_calls.load(Ordering::SeqCst),
        recommends + 1
    );
}

#[tokio::test]
async fn rapid_moves_surface_only_the_latest_position() {
    let (mut session, _backend) = session();

    session.play_san("e4").unwrap();
    session.play_san("e5").unwrap();
    let latest_fen = session.fen().to_string();
    session.settle_pending().await;

    // Whatever order the four completions landed in, only the second
    // position's results are active.
    let recommendation = session.recommendation().unwrap();
    assert_eq!(recommendation.analysis, format!("rec for {latest_fen}"));
    let eval_key = session.current_key(RequestKind::Evaluate).unwrap();
    assert_eq!(eval_key.fen, latest_fen);
    assert_eq!(eval_key.graded_move.as_deref(), Some("e5"));
}

#[tokio::test]
async fn evaluation_failure_leaves_recommendation_working() {
    let (mut session, backend) = session();
    backend.fail_evaluate.store(true, Ordering::SeqCst);

    session.play_san("e4").unwrap();
    session.settle_pending().await;

    assert_eq!(
        session.status(RequestKind::Evaluate),
        QueryStatus::Unavailable
    );
    assert_eq!(session.status(RequestKind::Recommend), QueryStatus::Ready);
    assert!(session.evaluation().is_none());
    assert!(session.eval_bar_percent().is_none());

    // Failed entries retry only on explicit request.
    backend.fail_evaluate.store(false, Ordering::SeqCst);
    session.retry(RequestKind::Evaluate).unwrap();
    session.settle_pending().await;

    assert_eq!(session.status(RequestKind::Evaluate), QueryStatus::Ready);
}

#[tokio::test]
async fn retry_before_any_analysis_reports_missing_position() {
    let (mut session, _backend) = session();

    assert!(matches!(
        session.retry(RequestKind::Evaluate),
        Err(CoachError::MissingPosition)
    ));
}

#[tokio::test]
async fn coaching_toggle_controls_the_explain_flag() {
    let (mut session, backend) = session();

    session.play_san("e4").unwrap();
    session.settle_pending().await;

    session.set_coaching_enabled(false);
    session.settle_pending().await;

    let requests = backend.recommend_requests.lock().unwrap();
    assert!(requests.first().unwrap().explain);
    assert!(!requests.last().unwrap().explain);
    drop(requests);

    // With coaching off the analysis text is empty but the move remains.
    let recommendation = session.recommendation().unwrap();
    assert!(recommendation.analysis.is_empty());
    assert_eq!(recommendation.mv.as_deref(), Some("Nf3"));
}

#[tokio::test]
async fn first_chat_sends_empty_history_and_builds_two_turns() {
    let (mut session, backend) = session();

    session.send_chat("What's the best move?");
    assert!(session.chat_pending());
    session.settle_pending().await;

    let requests = backend.chat_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].history.is_empty());
    assert_eq!(requests[0].message, "What's the best move?");
    drop(requests);

    let turns = session.transcript().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "What's the best move?");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, "reply with 0 context lines");
}

#[tokio::test]
async fn second_chat_carries_the_prior_turns_as_context() {
    let (mut session, backend) = session();

    session.send_chat("What's the best move?");
    session.settle_pending().await;
    session.send_chat("Why?");
    session.settle_pending().await;

    let requests = backend.chat_requests.lock().unwrap();
    assert_eq!(requests[1].history.len(), 2);
    assert_eq!(requests[1].history[0], "user: What's the best move?");
    drop(requests);

    assert_eq!(session.transcript().len(), 4);
}

#[tokio::test]
async fn failed_chat_keeps_the_user_turn_for_resend() {
    let (mut session, backend) = session();
    backend.fail_chat.store(true, Ordering::SeqCst);

    session.send_chat("Hello coach");
    session.settle_pending().await;

    assert!(session.chat_failed());
    assert_eq!(session.transcript().len(), 1);
    assert_eq!(session.transcript().last().unwrap().role, Role::User);

    // Re-send succeeds once the service is back.
    backend.fail_chat.store(false, Ordering::SeqCst);
    session.send_chat("Hello coach");
    session.settle_pending().await;

    assert!(!session.chat_failed());
    assert_eq!(session.transcript().last().unwrap().role, Role::Assistant);
}

#[tokio::test]
async fn empty_chat_input_is_ignored() {
    let (mut session, backend) = session();

    session.send_chat("   ");
    session.settle_pending().await;

    assert_eq!(backend.chat_calls.load(Ordering::SeqCst), 0);
    assert!(session.transcript().is_empty());
}

#[tokio::test]
async fn reset_clears_views_transcript_and_cache() {
    let (mut session, _backend) = session();

    session.play_san("e4").unwrap();
    session.send_chat("Thoughts?");
    session.settle_pending().await;

    session.reset();

    assert_eq!(session.status(RequestKind::Evaluate), QueryStatus::NotReady);
    assert!(session.evaluation().is_none());
    assert!(session.recommendation().is_none());
    assert!(session.transcript().is_empty());
    assert_eq!(
        session.fen(),
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    );
}

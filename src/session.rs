//! Session coordinator.
//!
//! [`CoachSession`] owns the position, the parameters, the query cache, and
//! the transcript, and is the only place any of them mutate. Backend calls
//! run on spawned tasks that post a [`SessionEvent`] back through a channel;
//! the owner applies completions by pumping that channel, so no shared state
//! is ever touched concurrently.
//!
//! The race rule: a completion is surfaced only if its key still equals the
//! currently derived key for its kind *at resolution time*. Late results are
//! recorded in the cache for reuse but never overwrite newer state.

use std::sync::Arc;

use shakmaty::{Chess, Role, Square};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::analysis::cache::{AnalysisCache, BeginOutcome, EntryStatus};
use crate::analysis::key::{RequestKey, RequestKind};
use crate::analysis::{AnalysisPayload, EvaluationResult, RecommendationResult};
use crate::backend::{AnalysisBackend, ChatRequest, EvaluateRequest, RecommendRequest};
use crate::chat::Transcript;
use crate::config::CoachConfig;
use crate::error::{BackendError, CoachError};
use crate::params::ParameterSet;
use crate::position::{PlayedMove, PositionState};
use crate::view::{self, GradeBadge, MoveHighlight};

// --- Events ---

/// Completion scheduled back onto the session.
#[derive(Debug)]
pub enum SessionEvent {
    AnalysisSettled {
        key: RequestKey,
        outcome: Result<AnalysisPayload, BackendError>,
    },
    ChatSettled {
        epoch: u64,
        outcome: Result<String, BackendError>,
    },
}

/// Rendering status of one analysis kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No request has been derived for this kind yet.
    NotReady,
    Loading,
    Ready,
    /// The last request failed; eligible for an explicit retry.
    Unavailable,
}

// --- Coordinator ---

/// Explicitly constructed, explicitly scoped owner of all coaching state.
pub struct CoachSession {
    backend: Arc<dyn AnalysisBackend>,
    position: PositionState,
    params: ParameterSet,
    cache: AnalysisCache,
    transcript: Transcript,

    current_eval_key: Option<RequestKey>,
    current_rec_key: Option<RequestKey>,
    active_eval: Option<(RequestKey, EvaluationResult)>,
    active_rec: Option<(RequestKey, RecommendationResult)>,

    chat_epoch: u64,
    chat_in_flight: usize,
    chat_failed: bool,

    analysis_in_flight: usize,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
}

impl CoachSession {
    pub fn new(backend: Arc<dyn AnalysisBackend>, config: CoachConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let params = ParameterSet::new(config.search_depth, config.skill, config.coaching_enabled);
        let cache = AnalysisCache::new(config.freshness_window);
        Self {
            backend,
            position: PositionState::new(),
            params,
            cache,
            transcript: Transcript::new(),
            current_eval_key: None,
            current_rec_key: None,
            active_eval: None,
            active_rec: None,
            chat_epoch: 0,
            chat_in_flight: 0,
            chat_failed: false,
            analysis_in_flight: 0,
            events_tx,
            events_rx,
        }
    }

    // --- Inputs: moves and position ---

    /// Attempt a drag move. On acceptance the position is replaced and the
    /// move is sent for grading; on rejection nothing changes.
    pub fn try_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Role>,
    ) -> Result<(), CoachError> {
        let played = self.position.try_move(from, to, promotion)?;
        info!("[SESSION] played {}", played.san);
        self.refresh_after_move(&played);
        Ok(())
    }

    /// Apply a SAN move (same pipeline as a drag move).
    pub fn play_san(&mut self, san: &str) -> Result<(), CoachError> {
        let played = self.position.apply_san(san)?;
        info!("[SESSION] played {}", played.san);
        self.refresh_after_move(&played);
        Ok(())
    }

    /// Adopt an external position (e.g. a pasted FEN), starting plain
    /// analysis with no move under review.
    pub fn set_position_fen(&mut self, fen: &str) -> Result<(), CoachError> {
        self.position = PositionState::from_fen(fen)?;
        info!("[SESSION] adopted external position {}", self.position.fen());
        let eval_key = RequestKey::evaluate(self.position.fen(), &self.params);
        let rec_key = RequestKey::recommend(self.position.fen(), &self.params);
        self.adopt_keys(eval_key, rec_key);
        Ok(())
    }

    /// Back to the starting position. Superseded entries are dropped, the
    /// transcript is cleared, and replies to pre-reset chat sends will be
    /// ignored when they land.
    pub fn reset(&mut self) {
        self.position.reset();
        self.cache.invalidate(|_| true);
        self.current_eval_key = None;
        self.current_rec_key = None;
        self.active_eval = None;
        self.active_rec = None;
        self.transcript.reset();
        self.chat_epoch += 1;
        self.chat_failed = false;
        info!("[SESSION] reset to initial position");
    }

    // --- Inputs: parameters ---

    /// Continuous input (slider drag). Never derives a key, never issues a
    /// request.
    pub fn set_raw_skill(&mut self, skill: u32) {
        self.params.set_raw_skill(skill);
    }

    /// Promote the dragged skill value and re-derive keys with it.
    pub fn apply_skill(&mut self) {
        let effective = self.params.apply_skill();
        info!("[PARAMS] effective skill now {}", effective);
        self.refresh_current();
    }

    /// The coaching toggle has no raw/effective split; it re-derives keys
    /// immediately.
    pub fn set_coaching_enabled(&mut self, enabled: bool) {
        self.params.set_coaching_enabled(enabled);
        info!("[PARAMS] coaching {}", if enabled { "on" } else { "off" });
        self.refresh_current();
    }

    pub fn set_search_depth(&mut self, depth: u32) {
        self.params.set_search_depth(depth);
        info!("[PARAMS] search depth now {}", self.params.search_depth());
        self.refresh_current();
    }

    // --- Inputs: chat ---

    /// Two-phase send: the user turn shows immediately, the request carries
    /// the pre-append history, and the assistant turn lands on success. On
    /// failure the user turn stays visible and the caller may re-send.
    pub fn send_chat(&mut self, message: &str) {
        let message = message.trim();
        if message.is_empty() {
            return;
        }
        let history = self.transcript.history_for_next_turn();
        self.transcript.append_user(message);
        self.chat_failed = false;
        self.chat_in_flight += 1;

        let request = ChatRequest {
            message: message.to_string(),
            history,
            fen: self.position.fen().to_string(),
        };
        info!(
            "[CHAT] sending message with {} context lines",
            request.history.len()
        );

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let epoch = self.chat_epoch;
        tokio::spawn(async move {
            let outcome = backend.chat(request).await.map(|wire| wire.reply);
            let _ = tx.send(SessionEvent::ChatSettled { epoch, outcome });
        });
    }

    // --- Inputs: explicit refresh ---

    /// User-triggered retry of a failed or stale kind. Errors with
    /// [`CoachError::MissingPosition`] when analysis has not started yet.
    pub fn retry(&mut self, kind: RequestKind) -> Result<(), CoachError> {
        let key = self
            .current_key(kind)
            .cloned()
            .ok_or(CoachError::MissingPosition)?;
        self.issue(key);
        Ok(())
    }

    // --- Event pump ---

    /// Apply completions that have already been delivered, without waiting.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_delivered(event);
        }
    }

    /// Await every in-flight backend call and apply its completion.
    pub async fn settle_pending(&mut self) {
        while self.analysis_in_flight + self.chat_in_flight > 0 {
            match self.events_rx.recv().await {
                Some(event) => self.apply_delivered(event),
                None => break,
            }
        }
    }

    fn apply_delivered(&mut self, event: SessionEvent) {
        match &event {
            SessionEvent::AnalysisSettled { .. } => {
                self.analysis_in_flight = self.analysis_in_flight.saturating_sub(1);
            }
            SessionEvent::ChatSettled { .. } => {
                self.chat_in_flight = self.chat_in_flight.saturating_sub(1);
            }
        }
        self.handle_event(event);
    }

    /// Apply one completion to the session's state.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::AnalysisSettled { key, outcome } => {
                self.cache.settle(&key, outcome.clone());
                match outcome {
                    Ok(payload) => {
                        if self.is_current(&key) {
                            self.surface(&key, payload);
                        } else {
                            debug!("[ANALYSIS] stale {} result discarded", key.kind);
                        }
                    }
                    Err(error) => warn!("[ANALYSIS] {} failed: {}", key.kind, error),
                }
            }
            SessionEvent::ChatSettled { epoch, outcome } => {
                if epoch != self.chat_epoch {
                    debug!("[CHAT] reply for a reset conversation discarded");
                    return;
                }
                match outcome {
                    Ok(reply) => {
                        self.chat_failed = false;
                        self.transcript.append_assistant(reply);
                    }
                    Err(error) => {
                        warn!("[CHAT] send failed: {}", error);
                        self.chat_failed = true;
                    }
                }
            }
        }
    }

    // --- Observable state ---

    pub fn fen(&self) -> &str {
        self.position.fen()
    }

    pub fn board(&self) -> &Chess {
        self.position.position()
    }

    pub fn position_state(&self) -> &PositionState {
        &self.position
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn chat_pending(&self) -> bool {
        self.chat_in_flight > 0
    }

    pub fn chat_failed(&self) -> bool {
        self.chat_failed
    }

    /// Latest evaluation whose key still matches the current one.
    pub fn evaluation(&self) -> Option<&EvaluationResult> {
        let (key, result) = self.active_eval.as_ref()?;
        (self.current_eval_key.as_ref() == Some(key)).then_some(result)
    }

    /// Latest recommendation whose key still matches the current one.
    pub fn recommendation(&self) -> Option<&RecommendationResult> {
        let (key, result) = self.active_rec.as_ref()?;
        (self.current_rec_key.as_ref() == Some(key)).then_some(result)
    }

    pub fn status(&self, kind: RequestKind) -> QueryStatus {
        let Some(key) = self.current_key(kind) else {
            return QueryStatus::NotReady;
        };
        let ready = match kind {
            RequestKind::Evaluate => self.evaluation().is_some(),
            RequestKind::Recommend => self.recommendation().is_some(),
        };
        if ready {
            return QueryStatus::Ready;
        }
        match self.cache.get(key).map(|entry| entry.status) {
            Some(EntryStatus::Failed) => QueryStatus::Unavailable,
            _ => QueryStatus::Loading,
        }
    }

    pub fn current_key(&self, kind: RequestKind) -> Option<&RequestKey> {
        match kind {
            RequestKind::Evaluate => self.current_eval_key.as_ref(),
            RequestKind::Recommend => self.current_rec_key.as_ref(),
        }
    }

    /// Backend calls issued and not yet applied.
    pub fn pending_requests(&self) -> usize {
        self.analysis_in_flight + self.chat_in_flight
    }

    // --- Derived views ---

    /// Eval-bar fill for the latest non-superseded evaluation.
    pub fn eval_bar_percent(&self) -> Option<f64> {
        self.evaluation().map(view::eval_bar_percent)
    }

    /// Squares to highlight for the current recommendation, best-effort.
    pub fn best_move_highlight(&self) -> Option<MoveHighlight> {
        let recommendation = self.recommendation()?;
        let san = recommendation.mv.as_deref()?;
        view::best_move_highlight(self.position.position(), san)
    }

    /// Badge for the grade of the move under review, when graded.
    pub fn grade_badge(&self) -> Option<GradeBadge> {
        self.evaluation()
            .and_then(|result| result.grade)
            .map(view::grade_badge)
    }

    // --- Internals ---

    fn refresh_after_move(&mut self, played: &PlayedMove) {
        let eval_key = RequestKey::grade_move(self.position.fen(), &self.params, &played.san);
        let rec_key = RequestKey::recommend(self.position.fen(), &self.params);
        self.adopt_keys(eval_key, rec_key);
    }

    /// Re-derive keys after a parameter change, preserving the grading
    /// context of the current evaluate key. No-op until analysis has
    /// started: the next move picks the new parameters up anyway.
    fn refresh_current(&mut self) {
        if self.current_eval_key.is_none() && self.current_rec_key.is_none() {
            return;
        }
        let graded = self
            .current_eval_key
            .as_ref()
            .and_then(|key| key.graded_move.clone());
        let eval_key = match graded {
            Some(san) => RequestKey::grade_move(self.position.fen(), &self.params, &san),
            None => RequestKey::evaluate(self.position.fen(), &self.params),
        };
        let rec_key = RequestKey::recommend(self.position.fen(), &self.params);
        self.adopt_keys(eval_key, rec_key);
    }

    fn adopt_keys(&mut self, eval_key: RequestKey, rec_key: RequestKey) {
        let keep_eval = eval_key.clone();
        let keep_rec = rec_key.clone();
        let dropped = self
            .cache
            .invalidate(|key| *key != keep_eval && *key != keep_rec);
        if dropped > 0 {
            debug!("[ANALYSIS] dropped {} superseded entries", dropped);
        }
        self.current_eval_key = Some(eval_key.clone());
        self.current_rec_key = Some(rec_key.clone());
        self.issue(eval_key);
        self.issue(rec_key);
    }

    fn issue(&mut self, key: RequestKey) {
        match self.cache.begin(&key) {
            BeginOutcome::Fresh(payload) => {
                debug!("[ANALYSIS] fresh cache hit for {}", key.kind);
                self.surface(&key, payload);
            }
            BeginOutcome::InFlight => {
                debug!("[ANALYSIS] joining in-flight {} request", key.kind);
            }
            BeginOutcome::Issue => self.spawn_fetch(key),
        }
    }

    fn spawn_fetch(&mut self, key: RequestKey) {
        self.analysis_in_flight += 1;
        info!("[ANALYSIS] fetch {} at depth {}", key.kind, key.depth);

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = match key.kind {
                RequestKind::Evaluate => backend
                    .evaluate(EvaluateRequest {
                        fen: key.fen.clone(),
                        depth: key.depth,
                        elo: key.skill,
                        mv: key.graded_move.clone(),
                    })
                    .await
                    .map(|wire| AnalysisPayload::Evaluation(wire.into())),
                RequestKind::Recommend => backend
                    .recommend(RecommendRequest {
                        fen: key.fen.clone(),
                        depth: key.depth,
                        elo: key.skill,
                        explain: key.coaching,
                    })
                    .await
                    .map(|wire| AnalysisPayload::Recommendation(wire.into())),
            };
            let _ = tx.send(SessionEvent::AnalysisSettled { key, outcome });
        });
    }

    fn is_current(&self, key: &RequestKey) -> bool {
        self.current_eval_key.as_ref() == Some(key) || self.current_rec_key.as_ref() == Some(key)
    }

    fn surface(&mut self, key: &RequestKey, payload: AnalysisPayload) {
        match payload {
            AnalysisPayload::Evaluation(result) => {
                self.active_eval = Some((key.clone(), result));
            }
            AnalysisPayload::Recommendation(result) => {
                self.active_rec = Some((key.clone(), result));
            }
        }
    }
}

//! The guidance service — async scheduling and publication around the engine.
//!
//! Wraps a [`GuidanceEngine`] in a `tokio` mutex and drives it with two
//! periodic tasks: a fast action tick (retract-then-generate) and a slow
//! strategy tick (applicability refresh). Each tick phase and each observer
//! interaction runs to completion under the engine lock, so rule evaluation
//! never observes a half-applied update.
//!
//! Engine-originated envelopes (`make`, `retract`) are published on a
//! broadcast channel; interaction results are returned to the caller only.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use pharos_core::{Envelope, GuidanceError, Interaction, SuggestionId};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::context::{ContextState, Delta, StateCallback};
use crate::engine::GuidanceEngine;

/// Capacity of the envelope broadcast channel. Slow subscribers see a lag
/// error rather than blocking the evaluation loops.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Intervals for the two evaluation loops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickConfig {
    /// Fast tick: retract-then-generate over the active action set.
    pub action_interval: Duration,
    /// Slow tick: strategy applicability refresh and action regeneration.
    pub strategy_interval: Duration,
}

impl TickConfig {
    /// Config from whole-second intervals.
    #[must_use]
    pub fn from_secs(action: u64, strategy: u64) -> Self {
        Self {
            action_interval: Duration::from_secs(action),
            strategy_interval: Duration::from_secs(strategy),
        }
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self::from_secs(2, 30)
    }
}

struct RunningTasks {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// Async facade over the guidance engine: periodic evaluation, envelope
/// broadcast, and the control operations the HTTP surface exposes.
pub struct GuidanceService {
    engine: tokio::sync::Mutex<GuidanceEngine>,
    events: broadcast::Sender<Envelope>,
    config: TickConfig,
    running: parking_lot::Mutex<Option<RunningTasks>>,
}

impl GuidanceService {
    /// Wrap an engine with the given tick configuration. The loops do not
    /// run until [`GuidanceService::start`] is called.
    #[must_use]
    pub fn new(engine: GuidanceEngine, config: TickConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine: tokio::sync::Mutex::new(engine),
            events,
            config,
            running: parking_lot::Mutex::new(None),
        }
    }

    /// Subscribe to engine-originated envelopes (`make` and `retract`).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.events.subscribe()
    }

    /// Whether the evaluation loops are currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Start the periodic evaluation loops.
    ///
    /// # Errors
    ///
    /// [`GuidanceError::AlreadyRunning`] if the loops are already up.
    pub fn start(self: &Arc<Self>) -> Result<(), GuidanceError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(GuidanceError::AlreadyRunning);
        }
        let cancel = CancellationToken::new();
        let handles = vec![
            self.spawn_action_loop(cancel.child_token()),
            self.spawn_strategy_loop(cancel.child_token()),
        ];
        *running = Some(RunningTasks { cancel, handles });
        tracing::info!(
            action_interval = ?self.config.action_interval,
            strategy_interval = ?self.config.strategy_interval,
            "guidance evaluation started"
        );
        Ok(())
    }

    /// Stop the evaluation loops and wait for them to finish their current
    /// tick. Context, live suggestions, and subscribers are untouched.
    ///
    /// # Errors
    ///
    /// [`GuidanceError::NotRunning`] if the loops are not up.
    pub async fn stop(&self) -> Result<(), GuidanceError> {
        let tasks = self
            .running
            .lock()
            .take()
            .ok_or(GuidanceError::NotRunning)?;
        tasks.cancel.cancel();
        for handle in tasks.handles {
            let _ = handle.await;
        }
        tracing::info!("guidance evaluation stopped");
        Ok(())
    }

    fn spawn_action_loop(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.config.action_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // a panicking rule hook must not kill the loop; the
                        // tick is skipped and scheduling continues
                        let pass = AssertUnwindSafe(service.evaluate_actions());
                        if pass.catch_unwind().await.is_err() {
                            tracing::error!("action evaluation pass panicked, tick skipped");
                        }
                    }
                    () = cancel.cancelled() => {
                        tracing::debug!("action evaluation loop stopped");
                        break;
                    }
                }
            }
        })
    }

    fn spawn_strategy_loop(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.config.strategy_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let pass = AssertUnwindSafe(service.evaluate_strategies());
                        if pass.catch_unwind().await.is_err() {
                            tracing::error!("strategy evaluation pass panicked, tick skipped");
                        }
                    }
                    () = cancel.cancelled() => {
                        tracing::debug!("strategy evaluation loop stopped");
                        break;
                    }
                }
            }
        })
    }

    /// One fast-tick pass: retractions first, then fresh suggestions, all
    /// under a single engine lock. Retract envelopes are published before the
    /// makes of the same pass.
    pub async fn evaluate_actions(&self) {
        let (retracted, made) = {
            let mut engine = self.engine.lock().await;
            let retracted = engine.suggestions_to_retract();
            let made = engine.generate_suggestions();
            (retracted, made)
        };
        for envelope in retracted.into_iter().chain(made) {
            // no subscribers is fine
            let _ = self.events.send(envelope);
        }
    }

    /// One slow-tick pass: refresh strategy applicability.
    pub async fn evaluate_strategies(&self) {
        self.engine.lock().await.evaluate_strategies();
    }

    /// Merge key/value updates into the context.
    pub async fn update_state(&self, updates: ContextState) -> Delta {
        self.engine.lock().await.apply_update(updates)
    }

    /// Invoke a named state callback.
    ///
    /// # Errors
    ///
    /// [`GuidanceError::UnknownCallback`] if the name is not registered.
    pub async fn update_with_callback(
        &self,
        name: &str,
        params: Value,
    ) -> Result<Delta, GuidanceError> {
        self.engine.lock().await.apply_callback(name, params)
    }

    /// Apply an observer interaction to a live suggestion. The re-tagged
    /// envelope goes back to the caller; it is not broadcast.
    ///
    /// # Errors
    ///
    /// See [`GuidanceEngine::interact`].
    pub async fn interact(
        &self,
        id: &SuggestionId,
        interaction: Interaction,
    ) -> Result<Envelope, GuidanceError> {
        self.engine.lock().await.interact(id, interaction)
    }

    /// Snapshot of the live suggestion list.
    pub async fn suggestions(&self) -> Vec<Envelope> {
        self.engine.lock().await.suggestions()
    }

    /// Register a named state callback.
    pub async fn register_callback(&self, name: impl Into<String>, callback: StateCallback) {
        self.engine.lock().await.register_callback(name, callback);
    }
}

impl std::fmt::Debug for GuidanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuidanceService")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionMetadata, FnAction, SuggestionContent};
    use crate::context::ContextStore;
    use crate::meta::Passthrough;
    use crate::strategy::{StaticStrategy, StrategyMetadata};
    use pharos_core::Degree;
    use serde_json::json;
    use tokio::sync::broadcast::error::TryRecvError;

    fn updates(pairs: &[(&str, Value)]) -> ContextState {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    /// Suggests highlighting the current focus; retracts when focus moves.
    fn focus_action() -> FnAction {
        FnAction::new(
            ActionMetadata::new("map-highlight", Degree::Directing),
            StrategyMetadata::new("focus-strategy", Degree::Directing),
            |context, _| context.contains_key("focus"),
        )
        .with_content(|context| {
            Ok(SuggestionContent::new(
                json!({ "highlight": context["focus"] }),
                "Highlight",
                "",
            ))
        })
        .with_retraction(|context, _, live| {
            context.get("focus") != Some(&live.suggestion.event.value["highlight"])
        })
    }

    fn service() -> Arc<GuidanceService> {
        let strategy = StaticStrategy::new(StrategyMetadata::new(
            "focus-strategy",
            Degree::Directing,
        ))
        .with_action(Arc::new(focus_action()));
        let engine = GuidanceEngine::new(
            vec![Arc::new(strategy)],
            Arc::new(Passthrough),
            ContextStore::new(),
        );
        Arc::new(GuidanceService::new(engine, TickConfig::from_secs(2, 30)))
    }

    async fn recv(
        rx: &mut broadcast::Receiver<Envelope>,
    ) -> Envelope {
        tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("timed out waiting for envelope")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn start_twice_is_already_running() {
        let service = service();
        service.start().unwrap();
        let err = service.start().unwrap_err();
        assert_eq!(err.code(), "ALREADY_RUNNING");
        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_is_not_running() {
        let service = service();
        let err = service.stop().await.unwrap_err();
        assert_eq!(err.code(), "NOT_RUNNING");
    }

    #[tokio::test]
    async fn start_stop_start_roundtrip() {
        let service = service();
        assert!(!service.is_running());
        service.start().unwrap();
        assert!(service.is_running());
        service.stop().await.unwrap();
        assert!(!service.is_running());
        service.start().unwrap();
        service.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn tick_publishes_make_envelopes() {
        let service = service();
        let mut rx = service.subscribe();
        let _ = service.update_state(updates(&[("focus", json!("r1"))])).await;

        service.start().unwrap();
        let envelope = recv(&mut rx).await;
        assert_eq!(envelope.interaction, Interaction::Make);
        assert_eq!(envelope.suggestion.event.value["highlight"], "r1");
        assert_eq!(service.suggestions().await.len(), 1);

        service.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn retract_is_published_before_make() {
        let service = service();
        let mut rx = service.subscribe();
        let _ = service.update_state(updates(&[("focus", json!("r1"))])).await;
        service.start().unwrap();

        let first = recv(&mut rx).await;
        assert_eq!(first.interaction, Interaction::Make);

        // focus moves: the next pass retracts the stale suggestion and makes
        // a fresh one, in that order
        let _ = service.update_state(updates(&[("focus", json!("r2"))])).await;
        let second = recv(&mut rx).await;
        let third = recv(&mut rx).await;
        assert_eq!(second.interaction, Interaction::Retract);
        assert_eq!(second.id(), first.id());
        assert_eq!(third.interaction, Interaction::Make);
        assert_eq!(third.suggestion.event.value["highlight"], "r2");

        service.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn interaction_results_are_not_broadcast() {
        let service = service();
        let mut rx = service.subscribe();
        let _ = service.update_state(updates(&[("focus", json!("r1"))])).await;
        service.start().unwrap();

        let made = recv(&mut rx).await;
        let accepted = service
            .interact(made.id(), Interaction::Accept)
            .await
            .unwrap();
        assert_eq!(accepted.interaction, Interaction::Accept);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn no_suggestions_while_context_empty() {
        let service = service();
        service.evaluate_actions().await;
        assert!(service.suggestions().await.is_empty());
    }

    #[tokio::test]
    async fn manual_passes_work_without_loops() {
        let service = service();
        let _ = service.update_state(updates(&[("focus", json!("r1"))])).await;
        service.evaluate_strategies().await;
        service.evaluate_actions().await;
        assert_eq!(service.suggestions().await.len(), 1);
    }

    #[tokio::test]
    async fn callback_delta_passes_through() {
        let service = service();
        service
            .register_callback(
                "shift_focus",
                Arc::new(|state, params| {
                    let _ = state.insert("focus".into(), params["to"].clone());
                    json!({ "shifted_to": params["to"] })
                }),
            )
            .await;

        let delta = service
            .update_with_callback("shift_focus", json!({ "to": "r9" }))
            .await
            .unwrap();
        assert_eq!(delta, json!({ "shifted_to": "r9" }));

        let err = service
            .update_with_callback("missing", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_CALLBACK");
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_rule_skips_tick_and_loop_recovers() {
        // panics while "boom" is set, behaves like focus_action otherwise
        let action = FnAction::new(
            ActionMetadata::new("map-highlight", Degree::Directing),
            StrategyMetadata::new("focus-strategy", Degree::Directing),
            |context, _| {
                assert!(context.get("boom") != Some(&json!(true)), "rule blew up");
                context.contains_key("focus")
            },
        )
        .with_content(|context| {
            Ok(SuggestionContent::new(
                json!({ "highlight": context["focus"] }),
                "Highlight",
                "",
            ))
        });
        let strategy = StaticStrategy::new(StrategyMetadata::new(
            "focus-strategy",
            Degree::Directing,
        ))
        .with_action(Arc::new(action));
        let engine = GuidanceEngine::new(
            vec![Arc::new(strategy)],
            Arc::new(Passthrough),
            ContextStore::new(),
        );
        let service = Arc::new(GuidanceService::new(engine, TickConfig::from_secs(2, 30)));
        let mut rx = service.subscribe();

        let _ = service.update_state(updates(&[("boom", json!(true))])).await;
        service.start().unwrap();

        // several ticks panic inside the rule; the loop must survive them
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(service.is_running());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // once the rule stops panicking, evaluation resumes on the next tick
        let _ = service
            .update_state(updates(&[("boom", json!(false)), ("focus", json!("r1"))]))
            .await;
        let envelope = recv(&mut rx).await;
        assert_eq!(envelope.interaction, Interaction::Make);
        assert_eq!(envelope.suggestion.event.value["highlight"], "r1");

        service.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_halts_evaluation() {
        let service = service();
        let mut rx = service.subscribe();
        service.start().unwrap();
        service.stop().await.unwrap();

        // updates after stop are not evaluated until the loops run again
        let _ = service.update_state(updates(&[("focus", json!("r1"))])).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}

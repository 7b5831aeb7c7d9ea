//! The owner of a running game.
//!
//! A [`Session`] holds the canonical [`GameState`] together with the engine,
//! the scheduler and the save store, and is the only place state changes.
//! Every command takes `&mut self`, so a buy or an upgrade reads, decides and
//! writes without anything interleaving.
//!
//! The host drives it with [`Session::pump`], passing the wall clock. Each
//! fired frame advances production by the time since the previous frame,
//! pays passive workers and refreshes the throttled [`Snapshot`]; the
//! autosave timer writes the save slot.

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{GeneratorCatalog, Tier};
use crate::config::{ConfigError, EngineConfig};
use crate::engine::{ProductionEngine, Snapshot, SnapshotThrottle, TickReport, WorkerClock};
use crate::fixed::Millis;
use crate::narrative::{NarrativeRequest, NarrativeSnapshot, Narrator};
use crate::purchase::{BuyMode, PurchaseQuote, PurchaseReceipt, buy, calculate_purchase};
use crate::save::{SAVE_KEY, SaveStore, StoreError, load_from_store, save_to_store};
use crate::schedule::{FrameHandle, FramePolicy, Fired, Scheduler, TimerHandle};
use crate::skill::{SkillCatalog, UpgradeOutcome};
use crate::state::GameState;

/// Timers a session registers with its scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTask {
    Autosave,
}

pub struct Session<S: SaveStore> {
    state: GameState,
    engine: ProductionEngine,
    workers: WorkerClock,
    throttle: SnapshotThrottle,
    scheduler: Scheduler<SessionTask>,
    frame: Option<FrameHandle>,
    autosave: Option<TimerHandle>,
    store: S,
    config: EngineConfig,
    resetting: bool,
    last_frame_ms: Option<Millis>,
    latest: Option<Snapshot>,
    buy_mode: BuyMode,
}

impl<S: SaveStore> Session<S> {
    /// Open a session on the built-in catalogs, loading whatever `store`
    /// holds.
    pub fn new(store: S, config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_catalogs(store, config, GeneratorCatalog::standard(), SkillCatalog::standard())
    }

    pub fn with_catalogs(
        store: S,
        config: EngineConfig,
        generators: GeneratorCatalog,
        skills: SkillCatalog,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = load_from_store(&store, &skills);
        Ok(Self {
            state,
            engine: ProductionEngine::new(generators, skills, &config),
            workers: WorkerClock::from_config(&config),
            throttle: SnapshotThrottle::new(config.snapshot_interval_ms),
            scheduler: Scheduler::new(config.frame_policy),
            frame: None,
            autosave: None,
            store,
            config,
            resetting: false,
            last_frame_ms: None,
            latest: None,
            buy_mode: BuyMode::default(),
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn engine(&self) -> &ProductionEngine {
        &self.engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Latest throttled snapshot, if a frame has produced one.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    pub fn buy_mode(&self) -> BuyMode {
        self.buy_mode
    }

    pub fn frame_policy(&self) -> FramePolicy {
        self.scheduler.policy()
    }

    pub fn is_running(&self) -> bool {
        self.frame.is_some()
    }

    pub fn is_resetting(&self) -> bool {
        self.resetting
    }

    /// When the host should call [`Session::pump`] next.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.scheduler.next_deadline()
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    /// Begin the frame loop and the autosave timer. Also resumes a session
    /// stopped by a reset, starting from the fresh state.
    pub fn start(&mut self, now_ms: Millis) {
        self.stop();
        self.resetting = false;
        self.last_frame_ms = Some(now_ms);
        self.workers.resume(now_ms);
        self.frame = Some(self.scheduler.request_frame(now_ms));
        self.autosave = Some(self.scheduler.set_interval(
            SessionTask::Autosave,
            self.config.autosave_interval_ms,
            now_ms,
        ));
        log::info!("session started ({:?})", self.scheduler.policy());
    }

    /// Cancel the pending frame and the autosave timer. Worker progress is
    /// kept as of the last frame and resumes on the next [`Session::start`].
    pub fn stop(&mut self) {
        if let Some(at) = self.last_frame_ms {
            self.workers.pause(at);
        }
        if let Some(handle) = self.frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        if let Some(handle) = self.autosave.take() {
            self.scheduler.clear_interval(handle);
        }
    }

    /// Run everything due at `now_ms`. Returns one report per frame run.
    pub fn pump(&mut self, now_ms: Millis) -> Vec<TickReport> {
        let mut reports = Vec::new();
        for fired in self.scheduler.poll(now_ms) {
            match fired {
                Fired::Frame(handle) => {
                    if self.frame != Some(handle) {
                        continue;
                    }
                    self.frame = None;
                    if self.resetting {
                        continue;
                    }
                    reports.push(self.run_frame(now_ms));
                    self.frame = Some(self.scheduler.request_frame(now_ms));
                }
                Fired::Timer(_, SessionTask::Autosave) => self.autosave(),
            }
        }
        reports
    }

    fn run_frame(&mut self, now_ms: Millis) -> TickReport {
        let dt = self
            .last_frame_ms
            .map_or(0, |last| now_ms.saturating_sub(last));
        self.last_frame_ms = Some(now_ms);
        let report = self.engine.tick(&mut self.state, dt as f64);
        self.workers.accrue(&mut self.state, now_ms);
        if let Some(snapshot) = self.throttle.poll(&self.engine, &self.state, now_ms) {
            self.latest = Some(snapshot);
        }
        report
    }

    fn autosave(&mut self) {
        if self.resetting {
            log::debug!("autosave skipped during reset");
            return;
        }
        if let Err(e) = save_to_store(&mut self.store, &self.state) {
            log::warn!("autosave failed: {e}");
        }
    }

    /// Switch frame pacing. A pending frame is rescheduled with a handle of
    /// the new kind.
    pub fn set_frame_policy(&mut self, policy: FramePolicy, now_ms: Millis) {
        let replaced = self.scheduler.set_policy(policy, now_ms);
        if self.frame.is_some() {
            self.frame = replaced;
        }
        self.config.frame_policy = policy;
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    pub fn cycle_buy_mode(&mut self) -> BuyMode {
        self.buy_mode = self.buy_mode.next();
        self.buy_mode
    }

    pub fn set_buy_mode(&mut self, mode: BuyMode) {
        self.buy_mode = mode;
    }

    /// What buying `tier` in the current mode would cost right now.
    pub fn quote(&self, tier: Tier) -> PurchaseQuote {
        calculate_purchase(self.engine.generators(), tier, &self.state, self.buy_mode)
    }

    pub fn buy(&mut self, tier: Tier) -> Option<PurchaseReceipt> {
        buy(self.engine.generators(), tier, &mut self.state, self.buy_mode)
    }

    pub fn purchase_upgrade(&mut self, id: &str) -> UpgradeOutcome {
        self.engine.skills().purchase(id, &mut self.state)
    }

    /// Write the save slot and stop the loop.
    pub fn save_and_exit(&mut self) -> Result<(), StoreError> {
        save_to_store(&mut self.store, &self.state)?;
        self.stop();
        log::info!("saved and stopped");
        Ok(())
    }

    /// Wipe the game. Does nothing unless `confirmed`. The session stays
    /// stopped with autosave suppressed until [`Session::start`] is called.
    pub fn reset(&mut self, confirmed: bool) -> Result<bool, StoreError> {
        if !confirmed {
            return Ok(false);
        }
        self.resetting = true;
        self.stop();
        self.store.remove(SAVE_KEY)?;
        self.state = GameState::new();
        self.engine.reset();
        self.workers = WorkerClock::from_config(&self.config);
        self.latest = None;
        self.last_frame_ms = None;
        log::info!("game reset");
        Ok(true)
    }

    /// Ask `narrator` about the current state without blocking.
    pub fn request_narrative(&self, narrator: Arc<dyn Narrator>) -> NarrativeRequest {
        NarrativeRequest::spawn(
            narrator,
            NarrativeSnapshot::from_state(&self.state),
            Duration::from_millis(self.config.narrative_timeout_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::BigNumber;
    use crate::save::{MemoryStore, load, save};

    fn session() -> Session<MemoryStore> {
        Session::new(MemoryStore::new(), EngineConfig::default()).unwrap()
    }

    fn saved(session: &Session<MemoryStore>) -> Option<GameState> {
        let raw = session.store().get(SAVE_KEY).unwrap()?;
        Some(load(&raw, session.engine().skills()))
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            luck_chance: 2.0,
            ..EngineConfig::default()
        };
        assert!(Session::new(MemoryStore::new(), config).is_err());
    }

    #[test]
    fn loads_existing_save() {
        let mut state = GameState::new();
        state.wheat = BigNumber::from(77u32);
        let mut store = MemoryStore::new();
        store.set(SAVE_KEY, &save(&state)).unwrap();
        let session = Session::new(store, EngineConfig::default()).unwrap();
        assert_eq!(session.state().wheat, BigNumber::from(77u32));
    }

    #[test]
    fn frames_advance_production_and_workers() {
        let mut s = session();
        s.start(0);
        assert!(s.is_running());
        assert_eq!(s.pump(0).len(), 1);
        assert!(s.pump(10).is_empty());
        let reports = s.pump(2000);
        assert_eq!(reports.len(), 1);
        assert_eq!(s.state().wheat, BigNumber::from(3u32));
        assert_eq!(s.state().workers, BigNumber::from(2u32));
        let snap = s.snapshot().unwrap();
        assert_eq!(snap.taken_at_ms, 2000);
        assert_eq!(snap.state.wheat, BigNumber::from(3u32));
    }

    #[test]
    fn autosave_writes_every_interval() {
        let mut s = session();
        s.start(0);
        s.pump(0);
        s.pump(4999);
        assert!(saved(&s).is_none());
        s.pump(5000);
        assert_eq!(saved(&s).as_ref(), Some(s.state()));
    }

    #[test]
    fn reset_clears_storage_and_stops_everything() {
        let mut s = session();
        s.start(0);
        s.pump(0);
        s.pump(5000);
        assert!(saved(&s).is_some());

        assert!(!s.reset(false).unwrap());
        assert!(s.is_running());

        assert!(s.reset(true).unwrap());
        assert!(s.is_resetting());
        assert!(!s.is_running());
        assert_eq!(*s.state(), GameState::new());
        assert!(s.pump(20_000).is_empty());
        assert!(saved(&s).is_none());

        s.start(30_000);
        assert!(!s.is_resetting());
        assert_eq!(s.pump(30_000).len(), 1);
    }

    #[test]
    fn save_and_exit_persists_and_stops() {
        let mut s = session();
        s.start(0);
        s.state_mut().wheat = BigNumber::from(42u32);
        s.save_and_exit().unwrap();
        assert!(!s.is_running());
        assert_eq!(saved(&s).unwrap().wheat, BigNumber::from(42u32));
        assert!(s.pump(60_000).is_empty());
    }

    #[test]
    fn restart_keeps_partial_worker_second() {
        let mut s = session();
        s.start(0);
        s.pump(0);
        s.pump(1500);
        assert_eq!(s.state().workers, BigNumber::ONE);
        s.save_and_exit().unwrap();

        s.start(10_000);
        s.pump(10_000);
        s.pump(10_499);
        assert_eq!(s.state().workers, BigNumber::ONE);
        s.pump(10_520);
        assert_eq!(s.state().workers, BigNumber::from(2u32));
    }

    #[test]
    fn policy_switch_swaps_frame_kind() {
        let mut s = session();
        s.start(0);
        s.set_frame_policy(FramePolicy::Unlimited, 0);
        assert_eq!(s.frame_policy(), FramePolicy::Unlimited);
        assert!(matches!(s.frame, Some(FrameHandle::Immediate(_))));
        assert_eq!(s.pump(1).len(), 1);
        assert!(matches!(s.frame, Some(FrameHandle::Immediate(_))));
        s.stop();
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn buying_uses_current_mode() {
        let mut s = session();
        s.state_mut().wheat = BigNumber::from(1000u32);
        s.state_mut().workers = BigNumber::from(1000u32);
        assert_eq!(s.cycle_buy_mode(), BuyMode::OnePercent);
        s.set_buy_mode(BuyMode::Max);
        let quote = s.quote(Tier::Peasant);
        assert_eq!(quote.amount, BigNumber::from(100u32));
        let receipt = s.buy(Tier::Peasant).unwrap();
        assert_eq!(receipt.amount, BigNumber::from(100u32));
        assert_eq!(*s.state().count(Tier::Peasant), BigNumber::from(101u32));
        assert!(s.state().wheat.is_zero());
    }

    #[test]
    fn upgrades_go_through_the_catalog() {
        let mut s = session();
        assert!(matches!(
            s.purchase_upgrade("peasant_eff_1"),
            UpgradeOutcome::CannotAfford { .. }
        ));
        s.state_mut().wheat = BigNumber::from(100u32);
        assert!(matches!(
            s.purchase_upgrade("peasant_eff_1"),
            UpgradeOutcome::Purchased { rank: 1, .. }
        ));
        assert_eq!(s.state().rank("peasant_eff_1"), 1);
    }

    struct Cheer;

    impl Narrator for Cheer {
        fn narrate(&self, s: &NarrativeSnapshot) -> Result<String, crate::narrative::NarrativeError> {
            Ok(format!("{} camponês", s.peasants))
        }
    }

    #[test]
    fn narrative_requests_see_current_state() {
        let s = session();
        assert_eq!(s.request_narrative(Arc::new(Cheer)).wait(), "1 camponês");
    }
}

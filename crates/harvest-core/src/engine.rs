//! Per-frame production.
//!
//! Each tier carries, in fixed-point, the effective milliseconds spent in
//! its current cycle. A frame of `dt` milliseconds adds `dt × speed`; every
//! full `base_duration` is one completed cycle. Progress percentages are
//! derived from it for display. Completed cycles pay out
//! `count × base_output × efficiency` to the tier below (wheat for peasants),
//! optionally boosted by a luck proc.
//!
//! Tiers are processed in ascending chain order every tick, so a unit
//! produced by a higher tier this tick starts working on the next one.
//!
//! Two companions run on wall-clock time rather than frame deltas:
//! [`WorkerClock`] grants passive workers per whole elapsed interval, and
//! [`SnapshotThrottle`] rate-limits read-only [`Snapshot`]s for rendering.

use crate::catalog::{GeneratorCatalog, Tier};
use crate::config::{EngineConfig, LuckPolicy};
use crate::fixed::{Fixed64, Fixed128, Millis, elapsed_delta, percent_of};
use crate::multiplier::{Multipliers, resolve};
use crate::number::BigNumber;
use crate::rng::SimRng;
use crate::skill::SkillCatalog;
use crate::state::GameState;

/// Above this many cycles in one tick, per-cycle luck samples this many
/// trials and scales the hit count.
const MAX_LUCK_TRIALS: u64 = 1024;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ProductionEvent {
    pub tier: Tier,
    pub cycles: u64,
    pub produced: BigNumber,
    /// Cycles that received the luck factor.
    pub lucky_cycles: u64,
}

impl ProductionEvent {
    pub fn lucky(&self) -> bool {
        self.lucky_cycles > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<ProductionEvent>,
}

impl TickReport {
    pub fn event(&self, tier: Tier) -> Option<&ProductionEvent> {
        self.events.iter().find(|e| e.tier == tier)
    }
}

/// Read-only view handed to renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: GameState,
    /// Progress of each tier in [0, 100), indexed by [`Tier::index`].
    pub progress: [f64; Tier::COUNT],
    pub tick: u64,
    pub taken_at_ms: Millis,
}

impl Snapshot {
    pub fn progress(&self, tier: Tier) -> f64 {
        self.progress[tier.index()]
    }
}

// ---------------------------------------------------------------------------
// Production engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProductionEngine {
    generators: GeneratorCatalog,
    skills: SkillCatalog,
    /// Effective milliseconds into each tier's current cycle.
    elapsed: [Fixed128; Tier::COUNT],
    rng: SimRng,
    luck_chance: Fixed64,
    luck_policy: LuckPolicy,
    tick: u64,
}

impl ProductionEngine {
    pub fn new(generators: GeneratorCatalog, skills: SkillCatalog, config: &EngineConfig) -> Self {
        Self {
            generators,
            skills,
            elapsed: [Fixed128::ZERO; Tier::COUNT],
            rng: SimRng::new(config.rng_seed),
            luck_chance: config.luck_probability(),
            luck_policy: config.luck_policy,
            tick: 0,
        }
    }

    pub fn generators(&self) -> &GeneratorCatalog {
        &self.generators
    }

    pub fn skills(&self) -> &SkillCatalog {
        &self.skills
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn multipliers(&self, tier: Tier, state: &GameState) -> Multipliers {
        resolve(&self.skills, tier, &state.upgrades)
    }

    /// Progress of `tier` as a percentage in [0, 100).
    pub fn progress(&self, tier: Tier) -> f64 {
        percent_of(self.elapsed[tier.index()], self.generators.get(tier).base_duration_ms)
    }

    /// Effective milliseconds into the current cycle of `tier`.
    pub fn cycle_elapsed(&self, tier: Tier) -> Fixed128 {
        self.elapsed[tier.index()]
    }

    pub fn progress_percentages(&self) -> [f64; Tier::COUNT] {
        Tier::ALL.map(|tier| self.progress(tier))
    }

    /// Clear transient progress, e.g. after a reset or load.
    pub fn reset(&mut self) {
        self.elapsed = [Fixed128::ZERO; Tier::COUNT];
        self.tick = 0;
    }

    /// Advance every tier by `dt_ms` of game time.
    pub fn tick(&mut self, state: &mut GameState, dt_ms: f64) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            events: Vec::new(),
        };
        for tier in Tier::ALL {
            if let Some(event) = self.advance_tier(tier, state, dt_ms) {
                log::debug!(
                    "tick {}: {tier} x{} -> {} ({} lucky)",
                    self.tick,
                    event.cycles,
                    event.produced,
                    event.lucky_cycles
                );
                report.events.push(event);
            }
        }
        report
    }

    fn advance_tier(&mut self, tier: Tier, state: &mut GameState, dt_ms: f64) -> Option<ProductionEvent> {
        let count = *state.count(tier);
        if !count.is_positive() {
            return None;
        }
        let mults = resolve(&self.skills, tier, &state.upgrades);
        let def = self.generators.get(tier);
        if def.base_duration_ms == 0 {
            return None;
        }
        let duration = Fixed128::from_num(def.base_duration_ms);

        let elapsed = &mut self.elapsed[tier.index()];
        *elapsed = elapsed.saturating_add(elapsed_delta(dt_ms, mults.speed));
        if *elapsed < duration {
            return None;
        }
        let cycles: u64 = (*elapsed / duration).int().to_num();
        *elapsed -= duration * Fixed128::from_num(cycles);

        let lucky_cycles = if mults.luck_active {
            match self.luck_policy {
                LuckPolicy::PerTick => {
                    if self.rng.chance(self.luck_chance) { cycles } else { 0 }
                }
                LuckPolicy::PerCycle => {
                    let trials = cycles.min(MAX_LUCK_TRIALS);
                    let hits = self.rng.successes(self.luck_chance, trials);
                    if trials == cycles {
                        hits
                    } else {
                        ((hits as u128 * cycles as u128) / trials as u128) as u64
                    }
                }
            }
        } else {
            0
        };

        let output = BigNumber::from(def.base_output) * mults.efficiency;
        let mut effective_cycles = BigNumber::from(cycles);
        if lucky_cycles > 0 {
            let bonus = BigNumber::from_f64(mults.luck_factor - 1.0).unwrap_or(BigNumber::ZERO);
            effective_cycles += BigNumber::from(lucky_cycles) * bonus;
        }
        let produced = count * output * effective_cycles;

        *state.resource_mut(tier.upstream()) += produced;
        *state.lifetime_mut(tier) += produced;

        Some(ProductionEvent {
            tier,
            cycles,
            produced,
            lucky_cycles,
        })
    }

    pub fn snapshot(&self, state: &GameState, now_ms: Millis) -> Snapshot {
        Snapshot {
            state: state.clone(),
            progress: self.progress_percentages(),
            tick: self.tick,
            taken_at_ms: now_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Passive workers
// ---------------------------------------------------------------------------

/// Grants `rate` workers per whole `interval_ms` of wall-clock time.
/// Partial intervals carry over; the clock advances only by what it paid.
#[derive(Debug, Clone)]
pub struct WorkerClock {
    last_ms: Option<Millis>,
    /// Progress toward the next interval saved by [`WorkerClock::pause`].
    paused_carry_ms: Millis,
    interval_ms: Millis,
    rate: u64,
}

impl WorkerClock {
    pub fn new(interval_ms: Millis, rate: u64) -> Self {
        Self {
            last_ms: None,
            paused_carry_ms: 0,
            interval_ms: interval_ms.max(1),
            rate,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.worker_interval_ms, config.worker_rate)
    }

    /// Anchor the clock without paying anything. Drops any paused carry.
    pub fn start(&mut self, now_ms: Millis) {
        self.last_ms = Some(now_ms);
        self.paused_carry_ms = 0;
    }

    /// Stop counting at `at_ms`, keeping the partial interval. A clock that
    /// is not running is left as it is.
    pub fn pause(&mut self, at_ms: Millis) {
        if let Some(last) = self.last_ms.take() {
            self.paused_carry_ms = at_ms.saturating_sub(last);
        }
    }

    /// Start counting again from `now_ms`, with the carry saved by the last
    /// pause already elapsed.
    pub fn resume(&mut self, now_ms: Millis) {
        self.last_ms = Some(now_ms.saturating_sub(self.paused_carry_ms));
        self.paused_carry_ms = 0;
    }

    /// Milliseconds accumulated toward the next interval.
    pub fn carried_ms(&self, now_ms: Millis) -> Millis {
        self.last_ms.map_or(0, |last| now_ms.saturating_sub(last))
    }

    /// Pay out whole intervals elapsed since the last payout. Returns the
    /// number of intervals paid.
    pub fn accrue(&mut self, state: &mut GameState, now_ms: Millis) -> u64 {
        let last = *self.last_ms.get_or_insert(now_ms);
        if now_ms < last {
            // Wall clock moved backwards; resync instead of paying.
            self.last_ms = Some(now_ms);
            return 0;
        }
        let intervals = (now_ms - last) / self.interval_ms;
        if intervals == 0 {
            return 0;
        }
        self.last_ms = Some(last + intervals * self.interval_ms);
        let added = BigNumber::from(intervals) * BigNumber::from(self.rate);
        state.workers += added;
        state.total_workers_generated += added;
        intervals
    }
}

// ---------------------------------------------------------------------------
// Snapshot throttling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SnapshotThrottle {
    interval_ms: Millis,
    last_emit_ms: Option<Millis>,
}

impl SnapshotThrottle {
    pub fn new(interval_ms: Millis) -> Self {
        Self {
            interval_ms,
            last_emit_ms: None,
        }
    }

    /// True at most once per interval. The first call always passes.
    pub fn ready(&mut self, now_ms: Millis) -> bool {
        let due = self
            .last_emit_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.interval_ms);
        if due {
            self.last_emit_ms = Some(now_ms);
        }
        due
    }

    pub fn poll(
        &mut self,
        engine: &ProductionEngine,
        state: &GameState,
        now_ms: Millis,
    ) -> Option<Snapshot> {
        self.ready(now_ms).then(|| engine.snapshot(state, now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(config: EngineConfig) -> ProductionEngine {
        ProductionEngine::new(GeneratorCatalog::standard(), SkillCatalog::standard(), &config)
    }

    fn engine() -> ProductionEngine {
        engine_with(EngineConfig::default())
    }

    // -----------------------------------------------------------------------
    // Production
    // -----------------------------------------------------------------------

    #[test]
    fn one_peasant_cycle_yields_three_wheat() {
        let mut engine = engine();
        let mut state = GameState::new();
        for _ in 0..19 {
            let report = engine.tick(&mut state, 100.0);
            assert!(report.events.is_empty());
        }
        assert!((engine.progress(Tier::Peasant) - 95.0).abs() < 1e-9);
        let report = engine.tick(&mut state, 100.0);
        let event = report.event(Tier::Peasant).unwrap();
        assert_eq!(event.cycles, 1);
        assert_eq!(state.wheat, BigNumber::from(3u32));
        assert_eq!(*state.lifetime(Tier::Peasant), BigNumber::from(3u32));
        assert_eq!(engine.progress(Tier::Peasant), 0.0);
    }

    #[test]
    fn millisecond_frames_finish_cycles_on_time() {
        let mut engine = engine();
        let mut state = GameState::new();
        *state.count_mut(Tier::Mill) = BigNumber::ONE;
        for ms in 1..=5000u32 {
            let report = engine.tick(&mut state, 1.0);
            let peasant_done = report.event(Tier::Peasant).is_some();
            assert_eq!(peasant_done, ms % 2000 == 0, "peasant at {ms} ms");
            assert_eq!(report.event(Tier::Mill).is_some(), ms == 5000, "mill at {ms} ms");
        }
        assert_eq!(state.wheat, BigNumber::from(6u32));
        assert_eq!(*state.count(Tier::Peasant), BigNumber::from(5u32));
        assert_eq!(engine.progress(Tier::Mill), 0.0);
        assert_eq!(engine.progress(Tier::Peasant), 50.0);
    }

    #[test]
    fn empty_tiers_keep_progress() {
        let mut engine = engine();
        let mut state = GameState::new();
        engine.tick(&mut state, 1000.0);
        assert_eq!(engine.progress(Tier::Peasant), 50.0);
        *state.count_mut(Tier::Peasant) = BigNumber::ZERO;
        engine.tick(&mut state, 1000.0);
        assert_eq!(engine.progress(Tier::Peasant), 50.0);
        assert_eq!(engine.progress(Tier::Mill), 0.0);
    }

    #[test]
    fn long_frames_complete_several_cycles() {
        let mut engine = engine();
        let mut state = GameState::new();
        *state.count_mut(Tier::Peasant) = BigNumber::from(2u32);
        let report = engine.tick(&mut state, 7000.0);
        assert_eq!(report.event(Tier::Peasant).unwrap().cycles, 3);
        assert_eq!(state.wheat, BigNumber::from(18u32));
        assert_eq!(engine.progress(Tier::Peasant), 50.0);
    }

    #[test]
    fn mills_produce_peasants() {
        let mut engine = engine();
        let mut state = GameState::new();
        *state.count_mut(Tier::Mill) = BigNumber::ONE;
        engine.tick(&mut state, 5000.0);
        // 1 starting peasant + 4 from the mill
        assert_eq!(*state.count(Tier::Peasant), BigNumber::from(5u32));
        assert_eq!(*state.lifetime(Tier::Mill), BigNumber::from(4u32));
        // The peasant ran first with one unit: 2 cycles x 3 wheat.
        assert_eq!(state.wheat, BigNumber::from(6u32));
    }

    #[test]
    fn upgrades_scale_speed_and_output() {
        let mut engine = engine();
        let mut state = GameState::new();
        state.upgrades.insert("peasant_eff_1".into(), 1);
        state.upgrades.insert("peasant_spd_1".into(), 1);
        engine.tick(&mut state, 1000.0);
        assert_eq!(state.wheat, BigNumber::from(6u32));
    }

    #[test]
    fn certain_luck_per_tick_doubles_output() {
        let mut engine = engine_with(EngineConfig {
            luck_chance: 1.0,
            ..EngineConfig::default()
        });
        let mut state = GameState::new();
        state.upgrades.insert("peasant_luck_1".into(), 1);
        let report = engine.tick(&mut state, 4000.0);
        let event = report.event(Tier::Peasant).unwrap();
        assert_eq!(event.lucky_cycles, 2);
        assert_eq!(state.wheat, BigNumber::from(12u32));
    }

    #[test]
    fn per_cycle_luck_rolls_each_cycle() {
        let mut engine = engine_with(EngineConfig {
            luck_chance: 1.0,
            luck_policy: LuckPolicy::PerCycle,
            ..EngineConfig::default()
        });
        let mut state = GameState::new();
        state.upgrades.insert("peasant_luck_1".into(), 1);
        engine.tick(&mut state, 6000.0);
        // 3 cycles, all lucky: 3 × 3 × 2
        assert_eq!(state.wheat, BigNumber::from(18u32));
    }

    #[test]
    fn zero_luck_chance_never_procs() {
        let mut engine = engine_with(EngineConfig {
            luck_chance: 0.0,
            ..EngineConfig::default()
        });
        let mut state = GameState::new();
        state.upgrades.insert("peasant_luck_1".into(), 1);
        for _ in 0..50 {
            engine.tick(&mut state, 2000.0);
        }
        assert_eq!(state.wheat, BigNumber::from(150u32));
    }

    #[test]
    fn same_seed_replays_identically() {
        let config = EngineConfig {
            luck_chance: 0.5,
            ..EngineConfig::default()
        };
        let run = || {
            let mut engine = engine_with(config.clone());
            let mut state = GameState::new();
            state.upgrades.insert("peasant_luck_1".into(), 1);
            for _ in 0..200 {
                engine.tick(&mut state, 700.0);
            }
            state
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn reset_clears_progress() {
        let mut engine = engine();
        let mut state = GameState::new();
        engine.tick(&mut state, 500.0);
        engine.reset();
        assert_eq!(engine.progress(Tier::Peasant), 0.0);
        assert_eq!(engine.tick_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Workers
    // -----------------------------------------------------------------------

    #[test]
    fn worker_clock_pays_whole_seconds_and_carries_remainder() {
        let mut clock = WorkerClock::new(1000, 1);
        let mut state = GameState::new();
        clock.start(10_000);
        assert_eq!(clock.accrue(&mut state, 13_400), 3);
        assert_eq!(state.workers, BigNumber::from(3u32));
        assert_eq!(state.total_workers_generated, BigNumber::from(3u32));
        assert_eq!(clock.carried_ms(13_400), 400);
        assert_eq!(clock.accrue(&mut state, 13_900), 0);
        assert_eq!(clock.accrue(&mut state, 14_000), 1);
        assert_eq!(state.workers, BigNumber::from(4u32));
    }

    #[test]
    fn worker_clock_first_call_anchors() {
        let mut clock = WorkerClock::new(1000, 2);
        let mut state = GameState::new();
        assert_eq!(clock.accrue(&mut state, 5000), 0);
        assert_eq!(clock.accrue(&mut state, 7000), 2);
        assert_eq!(state.workers, BigNumber::from(4u32));
    }

    #[test]
    fn worker_clock_keeps_carry_across_pause() {
        let mut clock = WorkerClock::new(1000, 1);
        let mut state = GameState::new();
        clock.start(0);
        assert_eq!(clock.accrue(&mut state, 1600), 1);
        clock.pause(1600);
        clock.pause(9000);
        assert_eq!(clock.carried_ms(9000), 0);
        clock.resume(50_000);
        assert_eq!(clock.carried_ms(50_000), 600);
        assert_eq!(clock.accrue(&mut state, 50_399), 0);
        assert_eq!(clock.accrue(&mut state, 50_400), 1);
        assert_eq!(state.workers, BigNumber::from(2u32));
    }

    #[test]
    fn worker_clock_resyncs_on_backwards_time() {
        let mut clock = WorkerClock::new(1000, 1);
        let mut state = GameState::new();
        clock.start(5000);
        assert_eq!(clock.accrue(&mut state, 3000), 0);
        assert_eq!(clock.accrue(&mut state, 4000), 1);
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    #[test]
    fn snapshots_are_throttled() {
        let engine = engine();
        let state = GameState::new();
        let mut throttle = SnapshotThrottle::new(100);
        assert!(throttle.poll(&engine, &state, 0).is_some());
        assert!(throttle.poll(&engine, &state, 50).is_none());
        assert!(throttle.poll(&engine, &state, 99).is_none());
        let snap = throttle.poll(&engine, &state, 100).unwrap();
        assert_eq!(snap.taken_at_ms, 100);
        assert_eq!(snap.state, state);
    }
}

//! The canonical resource pool.

use std::collections::BTreeMap;

use crate::catalog::{Resource, Tier};
use crate::number::BigNumber;

/// Skill node id to owned rank. Absent or 0 means not owned.
pub type Ranks = BTreeMap<String, u32>;

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub wheat: BigNumber,
    pub workers: BigNumber,
    pub total_workers_generated: BigNumber,
    pub counts: [BigNumber; Tier::COUNT],
    /// Everything each tier has ever produced, indexed by the producing tier.
    pub lifetime: [BigNumber; Tier::COUNT],
    pub upgrades: Ranks,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Fresh game: one peasant, nothing else.
    pub fn new() -> Self {
        let mut counts = [BigNumber::ZERO; Tier::COUNT];
        counts[Tier::Peasant.index()] = BigNumber::ONE;
        Self {
            wheat: BigNumber::ZERO,
            workers: BigNumber::ZERO,
            total_workers_generated: BigNumber::ZERO,
            counts,
            lifetime: [BigNumber::ZERO; Tier::COUNT],
            upgrades: Ranks::new(),
        }
    }

    pub fn count(&self, tier: Tier) -> &BigNumber {
        &self.counts[tier.index()]
    }

    pub fn count_mut(&mut self, tier: Tier) -> &mut BigNumber {
        &mut self.counts[tier.index()]
    }

    pub fn lifetime(&self, tier: Tier) -> &BigNumber {
        &self.lifetime[tier.index()]
    }

    pub fn lifetime_mut(&mut self, tier: Tier) -> &mut BigNumber {
        &mut self.lifetime[tier.index()]
    }

    pub fn resource(&self, resource: Resource) -> &BigNumber {
        match resource {
            Resource::Wheat => &self.wheat,
            Resource::Workers => &self.workers,
            Resource::Tier(tier) => self.count(tier),
        }
    }

    pub fn resource_mut(&mut self, resource: Resource) -> &mut BigNumber {
        match resource {
            Resource::Wheat => &mut self.wheat,
            Resource::Workers => &mut self.workers,
            Resource::Tier(tier) => self.count_mut(tier),
        }
    }

    pub fn rank(&self, upgrade_id: &str) -> u32 {
        self.upgrades.get(upgrade_id).copied().unwrap_or(0)
    }

    /// Every stored quantity is non-negative.
    pub fn is_non_negative(&self) -> bool {
        let scalars = [&self.wheat, &self.workers, &self.total_workers_generated];
        scalars
            .into_iter()
            .chain(self.counts.iter())
            .chain(self.lifetime.iter())
            .all(|v| !v.is_negative())
    }
}

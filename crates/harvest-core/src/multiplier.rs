//! Effective per-tier multipliers from owned skill ranks.

use crate::catalog::Tier;
use crate::number::BigNumber;
use crate::skill::{EffectKind, SkillCatalog};
use crate::state::Ranks;

#[derive(Debug, Clone, PartialEq)]
pub struct Multipliers {
    /// Cycle speed factor; f64 suffices since speed nodes are few and capped.
    pub speed: f64,
    pub efficiency: BigNumber,
    pub luck_active: bool,
    /// Output factor applied on a luck proc.
    pub luck_factor: f64,
}

impl Default for Multipliers {
    fn default() -> Self {
        Self {
            speed: 1.0,
            efficiency: BigNumber::ONE,
            luck_active: false,
            luck_factor: 1.0,
        }
    }
}

/// Combine every owned node targeting `tier`.
///
/// Speed and efficiency multiply (`magnitude^rank` per node), so the result
/// does not depend on iteration order. Luck takes the largest owned
/// magnitude rather than stacking.
pub fn resolve(catalog: &SkillCatalog, tier: Tier, ranks: &Ranks) -> Multipliers {
    let mut out = Multipliers::default();
    for node in catalog.nodes_for_tier(tier) {
        let rank = ranks.get(&node.id).copied().unwrap_or(0);
        if rank == 0 {
            continue;
        }
        let magnitude = node.effect.magnitude;
        match node.effect.kind {
            EffectKind::Speed => out.speed *= magnitude.powi(rank as i32),
            EffectKind::Efficiency => {
                let factor = BigNumber::from_f64(magnitude)
                    .unwrap_or(BigNumber::ONE)
                    .pow(rank as f64);
                out.efficiency *= factor;
            }
            EffectKind::Luck => {
                out.luck_factor = if out.luck_active {
                    out.luck_factor.max(magnitude)
                } else {
                    magnitude
                };
                out.luck_active = true;
            }
        }
    }
    out
}

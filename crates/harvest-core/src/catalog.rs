//! The sixteen generator tiers and their balance table.
//!
//! Tier `i` costs wheat, a quantity of tier `i − 1` and one worker, and each
//! completed cycle produces the count resource of tier `i − 1` (wheat for
//! peasants).

use serde::{Deserialize, Serialize};

use crate::fixed::Millis;
use crate::number::BigNumber;
use crate::state::GameState;

/// Successor count at which a tier reads as automated.
pub const AUTOMATION_THRESHOLD: u32 = 5;

/// Workers spent per unit of any tier.
pub const WORKER_COST: u32 = 1;

const BASE_DURATIONS_MS: [Millis; Tier::COUNT] = [
    2_000, 5_000, 12_000, 20_000, 30_000, 45_000, 60_000, 90_000, 120_000, 180_000, 240_000,
    360_000, 480_000, 720_000, 960_000, 1_440_000,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Peasant,
    Mill,
    Stable,
    Guild,
    Market,
    Castle,
    Cathedral,
    Citadel,
    Kingdom,
    Empire,
    Continent,
    World,
    StarSystem,
    Galaxy,
    Universe,
    Multiverse,
}

impl Tier {
    pub const COUNT: usize = 16;

    /// Chain order, lowest first.
    pub const ALL: [Tier; Tier::COUNT] = [
        Tier::Peasant,
        Tier::Mill,
        Tier::Stable,
        Tier::Guild,
        Tier::Market,
        Tier::Castle,
        Tier::Cathedral,
        Tier::Citadel,
        Tier::Kingdom,
        Tier::Empire,
        Tier::Continent,
        Tier::World,
        Tier::StarSystem,
        Tier::Galaxy,
        Tier::Universe,
        Tier::Multiverse,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Tier> {
        Self::ALL.get(index).copied()
    }

    /// Identifier used in skill node ids (`peasant_eff_1`).
    pub fn key(self) -> &'static str {
        match self {
            Tier::Peasant => "peasant",
            Tier::Mill => "mill",
            Tier::Stable => "stable",
            Tier::Guild => "guild",
            Tier::Market => "market",
            Tier::Castle => "castle",
            Tier::Cathedral => "cathedral",
            Tier::Citadel => "citadel",
            Tier::Kingdom => "kingdom",
            Tier::Empire => "empire",
            Tier::Continent => "continent",
            Tier::World => "world",
            Tier::StarSystem => "star_system",
            Tier::Galaxy => "galaxy",
            Tier::Universe => "universe",
            Tier::Multiverse => "multiverse",
        }
    }

    pub fn from_key(key: &str) -> Option<Tier> {
        Self::ALL.into_iter().find(|t| t.key() == key)
    }

    /// Field holding this tier's count in the save document.
    pub fn count_key(self) -> &'static str {
        match self {
            Tier::Peasant => "peasants",
            Tier::Mill => "mills",
            Tier::Stable => "stables",
            Tier::Guild => "guilds",
            Tier::Market => "markets",
            Tier::Castle => "castles",
            Tier::Cathedral => "cathedrals",
            Tier::Citadel => "citadels",
            Tier::Kingdom => "kingdoms",
            Tier::Empire => "empires",
            Tier::Continent => "continents",
            Tier::World => "worlds",
            Tier::StarSystem => "starSystems",
            Tier::Galaxy => "galaxies",
            Tier::Universe => "universes",
            Tier::Multiverse => "multiverses",
        }
    }

    /// Field holding everything this tier has ever produced.
    pub fn lifetime_key(self) -> &'static str {
        match self {
            Tier::Peasant => "totalHarvested",
            Tier::Mill => "totalPeasantsGenerated",
            Tier::Stable => "totalMillsGenerated",
            Tier::Guild => "totalStablesGenerated",
            Tier::Market => "totalGuildsGenerated",
            Tier::Castle => "totalMarketsGenerated",
            Tier::Cathedral => "totalCastlesGenerated",
            Tier::Citadel => "totalCathedralsGenerated",
            Tier::Kingdom => "totalCitadelsGenerated",
            Tier::Empire => "totalKingdomsGenerated",
            Tier::Continent => "totalEmpiresGenerated",
            Tier::World => "totalContinentsGenerated",
            Tier::StarSystem => "totalWorldsGenerated",
            Tier::Galaxy => "totalStarSystemsGenerated",
            Tier::Universe => "totalGalaxiesGenerated",
            Tier::Multiverse => "totalUniversesGenerated",
        }
    }

    pub fn predecessor(self) -> Option<Tier> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn successor(self) -> Option<Tier> {
        Self::from_index(self.index() + 1)
    }

    /// What one cycle of this tier produces.
    pub fn upstream(self) -> Resource {
        match self.predecessor() {
            Some(prev) => Resource::Tier(prev),
            None => Resource::Wheat,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Any quantity held in [`GameState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Wheat,
    Workers,
    Tier(Tier),
}

/// Static data for one tier.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorDef {
    pub tier: Tier,
    pub name: &'static str,
    pub lifetime_label: &'static str,
    pub base_duration_ms: Millis,
    pub base_output: u32,
    pub wheat_cost: BigNumber,
    pub prev_tier_cost: u32,
    pub worker_cost: u32,
}

impl GeneratorDef {
    fn standard(tier: Tier) -> Self {
        let i = tier.index();
        let (name, lifetime_label) = LABELS[i];
        Self {
            tier,
            name,
            lifetime_label,
            base_duration_ms: BASE_DURATIONS_MS[i],
            base_output: 3 + i as u32,
            wheat_cost: BigNumber::from(10u32) * BigNumber::pow10(i as i64),
            prev_tier_cost: if i == 0 { 0 } else { 15 + 10 * (i as u32 - 1) },
            worker_cost: WORKER_COST,
        }
    }
}

const LABELS: [(&str, &str); Tier::COUNT] = [
    ("Camponês", "Colheita Vitalícia"),
    ("Moinho de Vento", "População Atraída"),
    ("Estábulo", "Indústria Expandida"),
    ("Guilda de Comércio", "Logística Financiada"),
    ("Mercado Central", "Comércio Gerado"),
    ("Castelo Feudal", "Decretos Reais"),
    ("Grande Catedral", "Fortalezas Abençoadas"),
    ("Cidadela Fortificada", "Templos Erguidos"),
    ("Reino Soberano", "Império Expandido"),
    ("Império", "Reinos Unificados"),
    ("Continente", "Impérios Fundados"),
    ("Mundo", "Continentes Erguidos"),
    ("Sistema Estelar", "Mundos Povoados"),
    ("Galáxia", "Sistemas Colonizados"),
    ("Universo", "Galáxias Formadas"),
    ("Multiverso", "Universos Criados"),
];

/// Table of all sixteen tiers, indexed by [`Tier::index`].
#[derive(Debug, Clone)]
pub struct GeneratorCatalog {
    defs: Vec<GeneratorDef>,
}

impl Default for GeneratorCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl GeneratorCatalog {
    pub fn standard() -> Self {
        Self {
            defs: Tier::ALL.into_iter().map(GeneratorDef::standard).collect(),
        }
    }

    pub fn get(&self, tier: Tier) -> &GeneratorDef {
        &self.defs[tier.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratorDef> {
        self.defs.iter()
    }

    /// The first tier is always shown; later ones once their predecessor or
    /// they themselves have been acquired.
    pub fn is_visible(&self, tier: Tier, state: &GameState) -> bool {
        match tier.predecessor() {
            None => true,
            Some(prev) => state.count(prev).is_positive() || state.count(tier).is_positive(),
        }
    }

    /// Whether enough of the next tier exist to keep this one stocked.
    /// Display-only; buying is never automatic.
    pub fn is_automated(&self, tier: Tier, state: &GameState) -> bool {
        tier.successor()
            .is_some_and(|next| *state.count(next) >= BigNumber::from(AUTOMATION_THRESHOLD))
    }
}

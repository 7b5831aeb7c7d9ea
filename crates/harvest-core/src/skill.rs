//! Skill tree: upgrade nodes, their costs, and which ones can be bought.
//!
//! Nodes are registered once at construction and validated as a whole
//! (unique ids, existing neighbors, sane ranks and costs). Ownership lives in
//! [`GameState::upgrades`] as a rank map; the catalog itself is immutable.
//!
//! A node is purchasable when it is the root, or when any node connected to
//! it (in either direction) is owned.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{Resource, Tier};
use crate::number::BigNumber;
use crate::state::{GameState, Ranks};

/// The node that is always purchasable.
pub const ROOT_NODE: &str = "peasant_eff_1";

pub const DEFAULT_COST_MULTIPLIER: f64 = 2.5;
pub const DEFAULT_MAX_RANK: u32 = 10;

// ---------------------------------------------------------------------------
// Node definition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Speed,
    Efficiency,
    Luck,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,
    pub tier: Tier,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Wheat,
    Workers,
}

impl Currency {
    pub fn resource(self) -> Resource {
        match self {
            Currency::Wheat => Resource::Wheat,
            Currency::Workers => Resource::Workers,
        }
    }
}

fn default_cost_multiplier() -> f64 {
    DEFAULT_COST_MULTIPLIER
}

fn default_max_rank() -> u32 {
    DEFAULT_MAX_RANK
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Layout position for the tree view.
    #[serde(default)]
    pub position: (f32, f32),
    #[serde(default)]
    pub neighbors: Vec<String>,
    pub base_cost: BigNumber,
    #[serde(default = "default_cost_multiplier")]
    pub cost_multiplier: f64,
    pub currency: Currency,
    #[serde(default = "default_max_rank")]
    pub max_rank: u32,
    pub effect: Effect,
}

impl SkillNode {
    /// `floor(base_cost × cost_multiplier^rank)`.
    pub fn cost_at_rank(&self, rank: u32) -> BigNumber {
        let scale = BigNumber::from_f64(self.cost_multiplier)
            .unwrap_or(BigNumber::ONE)
            .pow(rank as f64);
        (self.base_cost * scale).floor()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Not connected to anything owned.
    Locked,
    /// Purchasable (subject to cost), rank 0.
    Available,
    /// Owned below its max rank.
    Owned,
    Maxed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpgradeOutcome {
    Purchased { rank: u32, cost: BigNumber },
    CannotAfford { cost: BigNumber },
    AtMaxRank,
    Locked,
    UnknownNode,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkillTreeError {
    #[error("duplicate skill node id: {0}")]
    DuplicateId(String),
    #[error("neighbor {neighbor} of skill node {node} does not exist")]
    InvalidNeighbor { node: String, neighbor: String },
    #[error("skill node {0} must have max_rank >= 1")]
    InvalidMaxRank(String),
    #[error("skill node {0} must have a positive cost and cost multiplier")]
    InvalidCost(String),
    #[error("skill node not found: {0}")]
    UnknownNode(String),
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SkillCatalog {
    nodes: Vec<SkillNode>,
    by_id: BTreeMap<String, usize>,
    /// Symmetric adjacency, by node index.
    adjacency: Vec<BTreeSet<usize>>,
    root: usize,
}

impl Default for SkillCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl SkillCatalog {
    /// Validate and index a set of nodes.
    pub fn new(nodes: Vec<SkillNode>, root: &str) -> Result<Self, SkillTreeError> {
        let mut by_id = BTreeMap::new();
        for (i, node) in nodes.iter().enumerate() {
            if by_id.insert(node.id.clone(), i).is_some() {
                return Err(SkillTreeError::DuplicateId(node.id.clone()));
            }
            if node.max_rank == 0 {
                return Err(SkillTreeError::InvalidMaxRank(node.id.clone()));
            }
            if !node.base_cost.is_positive() || node.cost_multiplier.is_nan() || node.cost_multiplier <= 0.0 {
                return Err(SkillTreeError::InvalidCost(node.id.clone()));
            }
        }
        for node in &nodes {
            if let Some(missing) = node.neighbors.iter().find(|n| !by_id.contains_key(*n)) {
                return Err(SkillTreeError::InvalidNeighbor {
                    node: node.id.clone(),
                    neighbor: missing.clone(),
                });
            }
        }
        let root = *by_id
            .get(root)
            .ok_or_else(|| SkillTreeError::UnknownNode(root.to_string()))?;
        Ok(Self::index(nodes, by_id, root))
    }

    fn index(nodes: Vec<SkillNode>, by_id: BTreeMap<String, usize>, root: usize) -> Self {
        let mut adjacency = vec![BTreeSet::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            for neighbor in &node.neighbors {
                if let Some(&j) = by_id.get(neighbor) {
                    adjacency[i].insert(j);
                    adjacency[j].insert(i);
                }
            }
        }
        Self {
            nodes,
            by_id,
            adjacency,
            root,
        }
    }

    /// The built-in tree: efficiency, speed and luck nodes for every tier.
    pub fn standard() -> Self {
        let nodes = standard_nodes();
        let by_id: BTreeMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let root = by_id.get(ROOT_NODE).copied().unwrap_or(0);
        Self::index(nodes, by_id, root)
    }

    pub fn get(&self, id: &str) -> Option<&SkillNode> {
        self.by_id.get(id).map(|&i| &self.nodes[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &SkillNode {
        &self.nodes[self.root]
    }

    pub fn nodes_for_tier(&self, tier: Tier) -> impl Iterator<Item = &SkillNode> {
        self.nodes.iter().filter(move |n| n.effect.tier == tier)
    }

    pub fn upgrade_cost(&self, id: &str, rank: u32) -> Option<BigNumber> {
        self.get(id).map(|n| n.cost_at_rank(rank))
    }

    pub fn node_status(&self, id: &str, ranks: &Ranks) -> NodeStatus {
        let Some(&idx) = self.by_id.get(id) else {
            return NodeStatus::Locked;
        };
        let node = &self.nodes[idx];
        let rank = ranks.get(id).copied().unwrap_or(0);
        if rank >= node.max_rank {
            return NodeStatus::Maxed;
        }
        if rank > 0 {
            return NodeStatus::Owned;
        }
        let reachable = idx == self.root
            || self.adjacency[idx].iter().any(|&j| {
                ranks.get(&self.nodes[j].id).copied().unwrap_or(0) > 0
            });
        if reachable {
            NodeStatus::Available
        } else {
            NodeStatus::Locked
        }
    }

    /// Clamp a stored rank to the node's max. Unknown ids pass through.
    pub fn clamp_rank(&self, id: &str, rank: u32) -> u32 {
        self.get(id).map_or(rank, |n| rank.min(n.max_rank))
    }

    /// Buy one rank of `id`, paying from the node's currency.
    pub fn purchase(&self, id: &str, state: &mut GameState) -> UpgradeOutcome {
        let Some(node) = self.get(id) else {
            return UpgradeOutcome::UnknownNode;
        };
        match self.node_status(id, &state.upgrades) {
            NodeStatus::Maxed => return UpgradeOutcome::AtMaxRank,
            NodeStatus::Locked => return UpgradeOutcome::Locked,
            NodeStatus::Available | NodeStatus::Owned => {}
        }
        let rank = state.rank(id);
        let cost = node.cost_at_rank(rank);
        let wallet = state.resource_mut(node.currency.resource());
        if *wallet < cost {
            return UpgradeOutcome::CannotAfford { cost };
        }
        *wallet -= cost;
        let new_rank = rank + 1;
        state.upgrades.insert(id.to_string(), new_rank);
        log::debug!("upgrade {id} bought: rank {new_rank}, cost {cost}");
        UpgradeOutcome::Purchased {
            rank: new_rank,
            cost,
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in content
// ---------------------------------------------------------------------------

/// (efficiency name, speed name, luck name) per tier.
const NODE_NAMES: [(&str, &str, &str); Tier::COUNT] = [
    ("Foices de Aço", "Botas Leves", "Trevo de Quatro Folhas"),
    ("Velas Reforçadas", "Engrenagens Óleadas", "Ventos Favoráveis"),
    ("Cavalos de Tração", "Estradas Pavimentadas", "Ferradura da Sorte"),
    ("Pesos Padronizados", "Rotas Comerciais", "Contratos Abençoados"),
    ("Moedas de Ouro", "Ábacos Avançados", "Dia de Feira"),
    ("Muralhas de Pedra", "Decretos Reais", "Favor do Rei"),
    ("Vitrais Sagrados", "Cantos Gregorianos", "Milagre"),
    ("Torres de Balista", "Fossos Profundos", "Sentinela Atenta"),
    ("Jóias da Coroa", "Exército Imperial", "Bênção Real"),
    ("Estandartes Imperiais", "Legiões Velozes", "Destino Manifesto"),
    ("Rotas Marítimas", "Navios Rápidos", "Maré Propícia"),
    ("Alianças Globais", "Correio Alado", "Conjunção Astral"),
    ("Forjas Estelares", "Velas Solares", "Cometa Auspicioso"),
    ("Braços Espirais", "Saltos Hiperespaciais", "Nebulosa Dourada"),
    ("Constantes Afinadas", "Expansão Acelerada", "Flutuação Quântica"),
    ("Tecido da Realidade", "Dobra Temporal", "Infinitas Possibilidades"),
];

const NODE_SPACING: f32 = 220.0;

pub fn standard_nodes() -> Vec<SkillNode> {
    let mut nodes = Vec::with_capacity(Tier::COUNT * 3);
    for tier in Tier::ALL {
        let i = tier.index();
        let key = tier.key();
        let (eff_name, spd_name, luck_name) = NODE_NAMES[i];
        let x = i as f32 * NODE_SPACING;
        let scale = BigNumber::pow10(i as i64);

        let mut eff_neighbors = vec![format!("{key}_spd_1")];
        if let Some(next) = tier.successor() {
            eff_neighbors.push(format!("{}_eff_1", next.key()));
        }

        nodes.push(SkillNode {
            id: format!("{key}_eff_1"),
            name: eff_name.to_string(),
            description: format!("Dobra a produção de {}.", tier.key()),
            position: (x, 0.0),
            neighbors: eff_neighbors,
            base_cost: BigNumber::from(100u32) * scale,
            cost_multiplier: DEFAULT_COST_MULTIPLIER,
            currency: Currency::Wheat,
            max_rank: DEFAULT_MAX_RANK,
            effect: Effect {
                kind: EffectKind::Efficiency,
                tier,
                magnitude: 2.0,
            },
        });
        nodes.push(SkillNode {
            id: format!("{key}_spd_1"),
            name: spd_name.to_string(),
            description: format!("Dobra a velocidade de {}.", tier.key()),
            position: (x, 120.0),
            neighbors: vec![format!("{key}_luck_1")],
            base_cost: BigNumber::from(250u32) * scale,
            cost_multiplier: DEFAULT_COST_MULTIPLIER,
            currency: Currency::Wheat,
            max_rank: DEFAULT_MAX_RANK,
            effect: Effect {
                kind: EffectKind::Speed,
                tier,
                magnitude: 2.0,
            },
        });
        nodes.push(SkillNode {
            id: format!("{key}_luck_1"),
            name: luck_name.to_string(),
            description: "10% de chance de dobrar a produção.".to_string(),
            position: (x, 240.0),
            neighbors: Vec::new(),
            base_cost: BigNumber::from(50u32) * BigNumber::from(4u32).pow(i as f64),
            cost_multiplier: DEFAULT_COST_MULTIPLIER,
            currency: Currency::Workers,
            max_rank: 1,
            effect: Effect {
                kind: EffectKind::Luck,
                tier,
                magnitude: 2.0,
            },
        });
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks(pairs: &[(&str, u32)]) -> Ranks {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn node(id: &str, neighbors: &[&str]) -> SkillNode {
        SkillNode {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            position: (0.0, 0.0),
            neighbors: neighbors.iter().map(|s| s.to_string()).collect(),
            base_cost: BigNumber::from(10u32),
            cost_multiplier: DEFAULT_COST_MULTIPLIER,
            currency: Currency::Wheat,
            max_rank: 3,
            effect: Effect {
                kind: EffectKind::Speed,
                tier: Tier::Peasant,
                magnitude: 2.0,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn standard_tree_passes_validation() {
        let catalog = SkillCatalog::new(standard_nodes(), ROOT_NODE).unwrap();
        assert_eq!(catalog.len(), Tier::COUNT * 3);
        assert_eq!(catalog.root().id, ROOT_NODE);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = SkillCatalog::new(vec![node("a", &[]), node("a", &[])], "a").unwrap_err();
        assert_eq!(err, SkillTreeError::DuplicateId("a".into()));
    }

    #[test]
    fn dangling_neighbor_rejected() {
        let err = SkillCatalog::new(vec![node("a", &["ghost"])], "a").unwrap_err();
        assert_eq!(
            err,
            SkillTreeError::InvalidNeighbor {
                node: "a".into(),
                neighbor: "ghost".into()
            }
        );
    }

    #[test]
    fn zero_max_rank_and_zero_cost_rejected() {
        let mut a = node("a", &[]);
        a.max_rank = 0;
        assert!(matches!(
            SkillCatalog::new(vec![a], "a"),
            Err(SkillTreeError::InvalidMaxRank(_))
        ));
        let mut b = node("b", &[]);
        b.base_cost = BigNumber::ZERO;
        assert!(matches!(
            SkillCatalog::new(vec![b], "b"),
            Err(SkillTreeError::InvalidCost(_))
        ));
    }

    #[test]
    fn unknown_root_rejected() {
        assert!(matches!(
            SkillCatalog::new(vec![node("a", &[])], "b"),
            Err(SkillTreeError::UnknownNode(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Costs and status
    // -----------------------------------------------------------------------

    #[test]
    fn costs_follow_progressions() {
        let catalog = SkillCatalog::standard();
        assert_eq!(catalog.upgrade_cost("peasant_eff_1", 0), Some(BigNumber::from(100u32)));
        assert_eq!(catalog.upgrade_cost("peasant_eff_1", 1), Some(BigNumber::from(250u32)));
        // 100 × 2.5² = 625
        assert_eq!(catalog.upgrade_cost("peasant_eff_1", 2), Some(BigNumber::from(625u32)));
        // 250 × 2.5³ = 3906.25, floored
        assert_eq!(catalog.upgrade_cost("peasant_spd_1", 3), Some(BigNumber::from(3906u32)));
        assert_eq!(catalog.upgrade_cost("mill_spd_1", 0), Some(BigNumber::from(2500u32)));
        assert_eq!(catalog.upgrade_cost("stable_luck_1", 0), Some(BigNumber::from(800u32)));
        assert_eq!(catalog.upgrade_cost("nope", 0), None);
    }

    #[test]
    fn status_progression() {
        let catalog = SkillCatalog::standard();
        let empty = Ranks::new();
        assert_eq!(catalog.node_status(ROOT_NODE, &empty), NodeStatus::Available);
        assert_eq!(catalog.node_status("peasant_spd_1", &empty), NodeStatus::Locked);

        let owned = ranks(&[("peasant_eff_1", 1)]);
        assert_eq!(catalog.node_status(ROOT_NODE, &owned), NodeStatus::Owned);
        assert_eq!(catalog.node_status("peasant_spd_1", &owned), NodeStatus::Available);
        assert_eq!(catalog.node_status("mill_eff_1", &owned), NodeStatus::Available);
        assert_eq!(catalog.node_status("peasant_luck_1", &owned), NodeStatus::Locked);

        let maxed = ranks(&[("peasant_eff_1", 10)]);
        assert_eq!(catalog.node_status(ROOT_NODE, &maxed), NodeStatus::Maxed);
    }

    #[test]
    fn adjacency_is_symmetric() {
        let catalog = SkillCatalog::standard();
        // mill_eff_1 lists no edge back to peasant_eff_1, but owning it
        // still opens the peasant node.
        let r = ranks(&[("mill_eff_1", 1)]);
        assert_eq!(catalog.node_status("peasant_eff_1", &r), NodeStatus::Available);
        assert_eq!(catalog.node_status("mill_spd_1", &r), NodeStatus::Available);
    }

    #[test]
    fn nodes_for_tier_lists_three() {
        let catalog = SkillCatalog::standard();
        let ids: Vec<_> = catalog.nodes_for_tier(Tier::Galaxy).map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["galaxy_eff_1", "galaxy_spd_1", "galaxy_luck_1"]);
    }

    // -----------------------------------------------------------------------
    // Purchasing
    // -----------------------------------------------------------------------

    #[test]
    fn purchase_deducts_and_ranks_up() {
        let catalog = SkillCatalog::standard();
        let mut state = GameState::new();
        state.wheat = BigNumber::from(400u32);
        assert_eq!(
            catalog.purchase(ROOT_NODE, &mut state),
            UpgradeOutcome::Purchased {
                rank: 1,
                cost: BigNumber::from(100u32)
            }
        );
        assert_eq!(state.wheat, BigNumber::from(300u32));
        assert_eq!(state.rank(ROOT_NODE), 1);
        assert_eq!(
            catalog.purchase(ROOT_NODE, &mut state),
            UpgradeOutcome::Purchased {
                rank: 2,
                cost: BigNumber::from(250u32)
            }
        );
        assert_eq!(state.wheat, BigNumber::from(50u32));
    }

    #[test]
    fn purchase_refused_without_funds_or_access() {
        let catalog = SkillCatalog::standard();
        let mut state = GameState::new();
        state.wheat = BigNumber::from(99u32);
        let before = state.clone();
        assert_eq!(
            catalog.purchase(ROOT_NODE, &mut state),
            UpgradeOutcome::CannotAfford {
                cost: BigNumber::from(100u32)
            }
        );
        assert_eq!(catalog.purchase("peasant_spd_1", &mut state), UpgradeOutcome::Locked);
        assert_eq!(catalog.purchase("ghost", &mut state), UpgradeOutcome::UnknownNode);
        assert_eq!(state, before);
    }

    #[test]
    fn purchase_at_max_rank_is_free_noop() {
        let catalog = SkillCatalog::standard();
        let mut state = GameState::new();
        state.upgrades.insert(ROOT_NODE.into(), 1);
        state.upgrades.insert("peasant_spd_1".into(), 1);
        state.upgrades.insert("peasant_luck_1".into(), 1);
        state.workers = BigNumber::from(1000u32);
        let before = state.clone();
        assert_eq!(catalog.purchase("peasant_luck_1", &mut state), UpgradeOutcome::AtMaxRank);
        assert_eq!(state, before);
    }

    #[test]
    fn luck_nodes_spend_workers() {
        let catalog = SkillCatalog::standard();
        let mut state = GameState::new();
        state.upgrades.insert("peasant_spd_1".into(), 1);
        state.workers = BigNumber::from(60u32);
        state.wheat = BigNumber::from(1_000_000u32);
        assert!(matches!(
            catalog.purchase("peasant_luck_1", &mut state),
            UpgradeOutcome::Purchased { rank: 1, .. }
        ));
        assert_eq!(state.workers, BigNumber::from(10u32));
        assert_eq!(state.wheat, BigNumber::from(1_000_000u32));
    }

    #[test]
    fn clamp_rank_respects_max() {
        let catalog = SkillCatalog::standard();
        assert_eq!(catalog.clamp_rank("peasant_luck_1", 7), 1);
        assert_eq!(catalog.clamp_rank("peasant_eff_1", 7), 7);
        assert_eq!(catalog.clamp_rank("legacy_node", 7), 7);
    }

    #[test]
    fn nodes_deserialize_with_defaults() {
        let json = r#"{
            "id": "x", "name": "X", "base_cost": "10", "currency": "wheat",
            "effect": {"kind": "speed", "tier": "mill", "magnitude": 3.0}
        }"#;
        let node: SkillNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.max_rank, DEFAULT_MAX_RANK);
        assert_eq!(node.cost_multiplier, DEFAULT_COST_MULTIPLIER);
        assert_eq!(node.effect.tier, Tier::Mill);
    }
}

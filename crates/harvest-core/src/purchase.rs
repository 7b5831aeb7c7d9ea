//! Affordability and buying of generator units.
//!
//! A unit of tier `i` costs wheat, workers and (above the first tier) units
//! of tier `i − 1`. The quantity on offer is capped by the scarcest of the
//! three and shaped by the [`BuyMode`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{GeneratorCatalog, Tier};
use crate::number::BigNumber;
use crate::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BuyMode {
    #[default]
    One,
    OnePercent,
    TenPercent,
    HalfMax,
    Max,
}

impl BuyMode {
    pub const ALL: [BuyMode; 5] = [
        BuyMode::One,
        BuyMode::OnePercent,
        BuyMode::TenPercent,
        BuyMode::HalfMax,
        BuyMode::Max,
    ];

    /// Next mode in the selector cycle, wrapping back to `1`.
    pub fn next(self) -> BuyMode {
        let i = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    /// Share of the affordable maximum, or `None` for single-unit mode.
    pub fn percent(self) -> Option<u32> {
        match self {
            BuyMode::One => None,
            BuyMode::OnePercent => Some(1),
            BuyMode::TenPercent => Some(10),
            BuyMode::HalfMax => Some(50),
            BuyMode::Max => Some(100),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuyMode::One => "1",
            BuyMode::OnePercent => "1%",
            BuyMode::TenPercent => "10%",
            BuyMode::HalfMax => "50%",
            BuyMode::Max => "100%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown buy mode: {0:?}")]
pub struct UnknownBuyMode(pub String);

impl FromStr for BuyMode {
    type Err = UnknownBuyMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| UnknownBuyMode(s.to_string()))
    }
}

impl TryFrom<String> for BuyMode {
    type Error = UnknownBuyMode;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BuyMode> for String {
    fn from(mode: BuyMode) -> String {
        mode.as_str().to_string()
    }
}

impl fmt::Display for BuyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseCosts {
    pub wheat: BigNumber,
    pub workers: BigNumber,
    /// Units of the previous tier; zero for the first tier.
    pub prev_tier: BigNumber,
    pub prev_tier_key: Option<Tier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseQuote {
    pub tier: Tier,
    /// Units that would be bought; 0 when nothing is affordable.
    pub amount: BigNumber,
    /// Cost of `max(amount, 1)` units, so a blocked quote still shows the
    /// price of one.
    pub costs: PurchaseCosts,
    pub can_afford: bool,
    pub max_affordable: BigNumber,
}

/// Applied purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseReceipt {
    pub tier: Tier,
    pub amount: BigNumber,
    pub costs: PurchaseCosts,
}

/// How much of each resource is missing for a quote's costs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shortfall {
    pub wheat: BigNumber,
    pub workers: BigNumber,
    pub prev_tier: BigNumber,
}

impl Shortfall {
    pub fn is_empty(&self) -> bool {
        self.wheat.is_zero() && self.workers.is_zero() && self.prev_tier.is_zero()
    }
}

/// Whole units of `unit` coverable by `available`, such that the units'
/// total cost never exceeds `available`. `None` means the constraint does
/// not apply.
fn units_within(available: &BigNumber, unit: &BigNumber) -> Option<BigNumber> {
    if !unit.is_positive() {
        return None;
    }
    if !available.is_positive() {
        return Some(BigNumber::ZERO);
    }
    let mut whole = available.checked_div(unit).ok()?.floor();
    if *available >= *unit && whole < BigNumber::ONE {
        whole = BigNumber::ONE;
    }
    // Past f64 precision the quotient can land a few ulps high.
    let ulps = BigNumber::from_f64(8.0 * f64::EPSILON).unwrap_or(BigNumber::ZERO);
    while whole.is_positive() && whole * *unit > *available {
        let step = (whole * ulps).max(BigNumber::ONE);
        whole = (whole - step).floor().max(BigNumber::ZERO);
    }
    Some(whole)
}

pub fn calculate_purchase(
    catalog: &GeneratorCatalog,
    tier: Tier,
    state: &GameState,
    mode: BuyMode,
) -> PurchaseQuote {
    let def = catalog.get(tier);
    let wheat_unit = def.wheat_cost;
    let worker_unit = BigNumber::from(def.worker_cost);
    let prev = tier.predecessor();
    let prev_unit = match prev {
        Some(_) => BigNumber::from(def.prev_tier_cost),
        None => BigNumber::ZERO,
    };

    let mut limits = vec![
        units_within(&state.wheat, &wheat_unit),
        units_within(&state.workers, &worker_unit),
    ];
    if let Some(prev) = prev {
        limits.push(units_within(state.count(prev), &prev_unit));
    }
    let max_affordable = limits
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(BigNumber::ZERO);

    let mut amount = match mode.percent() {
        None => BigNumber::ONE,
        Some(pct) => (max_affordable * BigNumber::from(pct) / BigNumber::from(100u32))
            .floor()
            .max(BigNumber::ONE),
    };
    if amount > max_affordable {
        amount = max_affordable;
    }
    if max_affordable.is_zero() {
        amount = BigNumber::ZERO;
    }

    let units = amount.max(BigNumber::ONE);
    PurchaseQuote {
        tier,
        amount,
        costs: PurchaseCosts {
            wheat: units * wheat_unit,
            workers: units * worker_unit,
            prev_tier: units * prev_unit,
            prev_tier_key: prev,
        },
        can_afford: amount.is_positive(),
        max_affordable,
    }
}

fn deduct(from: &mut BigNumber, cost: &BigNumber) {
    debug_assert!(*cost <= *from, "cost {cost} exceeds balance {from}");
    *from -= *cost;
}

/// Re-quote against the live state and apply the purchase if affordable.
/// State is untouched when nothing can be bought.
pub fn buy(
    catalog: &GeneratorCatalog,
    tier: Tier,
    state: &mut GameState,
    mode: BuyMode,
) -> Option<PurchaseReceipt> {
    let quote = calculate_purchase(catalog, tier, state, mode);
    if !quote.can_afford {
        log::debug!("buy {tier} x{mode}: not affordable");
        return None;
    }
    let costs = quote.costs;
    deduct(&mut state.wheat, &costs.wheat);
    deduct(&mut state.workers, &costs.workers);
    if let Some(prev) = costs.prev_tier_key {
        deduct(state.count_mut(prev), &costs.prev_tier);
    }
    *state.count_mut(tier) += quote.amount;
    log::debug!("bought {} {tier}", quote.amount);
    Some(PurchaseReceipt {
        tier,
        amount: quote.amount,
        costs,
    })
}

pub fn shortfall(quote: &PurchaseQuote, state: &GameState) -> Shortfall {
    let missing = |cost: &BigNumber, have: &BigNumber| (*cost - *have).max(BigNumber::ZERO);
    Shortfall {
        wheat: missing(&quote.costs.wheat, &state.wheat),
        workers: missing(&quote.costs.workers, &state.workers),
        prev_tier: match quote.costs.prev_tier_key {
            Some(prev) => missing(&quote.costs.prev_tier, state.count(prev)),
            None => BigNumber::ZERO,
        },
    }
}

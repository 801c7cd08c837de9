use crate::domain::{Leg, PerLeg, Position, Side};
use serde::{Deserialize, Serialize};

/// What to do when some legs already sit on their target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalancePolicy {
    /// Any leg with a zero delta cancels the whole rebalance.
    #[default]
    AbortIfAnyLegAtTarget,
    /// Legs already at target are left alone; the others still trade.
    SkipLegsAtTarget,
}

/// A single-leg order produced by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegOrder {
    pub leg: Leg,
    pub side: Side,
    pub volume: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Orders in leg order pr, ta, eg.
    Orders(Vec<LegOrder>),
    /// The policy refused to trade because these legs are already on target.
    Blocked { legs_at_target: Vec<Leg> },
    /// Every leg is already on target.
    AtTarget,
}

impl PlanOutcome {
    pub fn orders(&self) -> &[LegOrder] {
        match self {
            PlanOutcome::Orders(orders) => orders,
            _ => &[],
        }
    }
}

/// Turns a layer multiplier into per-leg orders against the current position.
#[derive(Debug, Clone, Copy)]
pub struct TargetPositionPlanner {
    unit: PerLeg<i64>,
    policy: RebalancePolicy,
}

impl TargetPositionPlanner {
    pub fn new(unit: PerLeg<i64>, policy: RebalancePolicy) -> Self {
        Self { unit, policy }
    }

    pub fn policy(&self) -> RebalancePolicy {
        self.policy
    }

    /// `target_net[leg] = unit[leg] * multiplier`.
    pub fn target(&self, multiplier: i64) -> PerLeg<i64> {
        self.unit.map(|_, unit| unit * multiplier)
    }

    pub fn plan(&self, multiplier: i64, current: &Position) -> PlanOutcome {
        let target = self.target(multiplier);
        let net = current.net();

        let mut orders = Vec::with_capacity(Leg::ALL.len());
        let mut legs_at_target = Vec::new();
        for leg in Leg::ALL {
            let delta = target[leg] - net[leg];
            if delta == 0 {
                legs_at_target.push(leg);
                continue;
            }
            let side = if delta > 0 { Side::Buy } else { Side::Sell };
            orders.push(LegOrder {
                leg,
                side,
                volume: delta.abs(),
            });
        }

        if orders.is_empty() {
            return PlanOutcome::AtTarget;
        }
        match self.policy {
            RebalancePolicy::AbortIfAnyLegAtTarget if !legs_at_target.is_empty() => {
                PlanOutcome::Blocked { legs_at_target }
            }
            _ => PlanOutcome::Orders(orders),
        }
    }
}

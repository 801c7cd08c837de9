use crate::domain::{Decimal, GridBucket, GridTable, Side};

/// A layer transition the grid engine wants to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceSignal {
    /// BUY for a downward move, SELL for an upward move.
    pub direction: Side,
    pub fee: Decimal,
    pub from_layer: i32,
    pub to_layer: i32,
    /// Layer multiplier from the triggering bucket (`down` or `up`).
    pub multiplier: i64,
}

/// Why a side produced no signal this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hold {
    /// Fee is outside the table.
    OutOfGrid,
    /// Candidate layer does not move in the signal's direction.
    NoMove { candidate: i32 },
}

pub type Evaluation = Result<RebalanceSignal, Hold>;

/// Maps fees to layers and decides whether the strategy should move.
#[derive(Debug, Clone)]
pub struct GridLayerEngine {
    table: GridTable,
}

impl GridLayerEngine {
    pub fn new(table: GridTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &GridTable {
        &self.table
    }

    pub fn classify(&self, fee: Decimal) -> Option<&GridBucket> {
        self.table.classify(fee)
    }

    /// BUY-side fee: move down only if the candidate layer is below the current one.
    pub fn evaluate_buy(&self, fee: Decimal, current_layer: i32) -> Evaluation {
        let bucket = self.classify(fee).ok_or(Hold::OutOfGrid)?;
        if bucket.layer < current_layer {
            Ok(RebalanceSignal {
                direction: Side::Buy,
                fee,
                from_layer: current_layer,
                to_layer: bucket.layer,
                multiplier: bucket.down,
            })
        } else {
            Err(Hold::NoMove {
                candidate: bucket.layer,
            })
        }
    }

    /// SELL-side fee: move up only if the candidate layer is above the current one.
    pub fn evaluate_sell(&self, fee: Decimal, current_layer: i32) -> Evaluation {
        let bucket = self.classify(fee).ok_or(Hold::OutOfGrid)?;
        if bucket.layer > current_layer {
            Ok(RebalanceSignal {
                direction: Side::Sell,
                fee,
                from_layer: current_layer,
                to_layer: bucket.layer,
                multiplier: bucket.up,
            })
        } else {
            Err(Hold::NoMove {
                candidate: bucket.layer,
            })
        }
    }

    /// Dispatch on the fee's evaluation side.
    pub fn evaluate(&self, side: Side, fee: Decimal, current_layer: i32) -> Evaluation {
        match side {
            Side::Buy => self.evaluate_buy(fee, current_layer),
            Side::Sell => self.evaluate_sell(fee, current_layer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn engine() -> GridLayerEngine {
        let json = r#"[
            {"layer": -1, "min": 0, "max": 360, "up": 4, "down": 4},
            {"layer": 0, "min": 360, "max": 370, "up": 4, "down": 3},
            {"layer": 1, "min": 370, "max": 380, "up": 3, "down": 2},
            {"layer": 2, "min": 380, "up": 2, "down": 1}
        ]"#;
        GridLayerEngine::new(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_buy_moves_down_with_down_multiplier() {
        let signal = engine().evaluate_buy(d("365"), 2).unwrap();
        assert_eq!(signal.direction, Side::Buy);
        assert_eq!(signal.to_layer, 0);
        assert_eq!(signal.multiplier, 3);
    }

    #[test]
    fn test_buy_never_fires_at_or_above_current_layer() {
        let engine = engine();
        assert_eq!(
            engine.evaluate_buy(d("375"), 1),
            Err(Hold::NoMove { candidate: 1 })
        );
        assert_eq!(
            engine.evaluate_buy(d("385"), 1),
            Err(Hold::NoMove { candidate: 2 })
        );
    }

    #[test]
    fn test_sell_moves_up_with_up_multiplier() {
        let signal = engine().evaluate_sell(d("375"), 0).unwrap();
        assert_eq!(signal.direction, Side::Sell);
        assert_eq!(signal.from_layer, 0);
        assert_eq!(signal.to_layer, 1);
        assert_eq!(signal.multiplier, 3);
    }

    #[test]
    fn test_sell_never_fires_at_or_below_current_layer() {
        let engine = engine();
        assert!(engine.evaluate_sell(d("375"), 1).is_err());
        assert!(engine.evaluate_sell(d("355"), 1).is_err());
    }

    #[test]
    fn test_fee_below_grid_holds() {
        assert_eq!(engine().evaluate_sell(d("-5"), 0), Err(Hold::OutOfGrid));
        assert_eq!(engine().evaluate(Side::Buy, d("-5"), 0), Err(Hold::OutOfGrid));
    }

    #[test]
    fn test_classify_is_monotonic() {
        let engine = engine();
        let mut last = i32::MIN;
        for fee in (0..500).map(|f| Decimal::from(f as i64)) {
            let layer = engine.classify(fee).unwrap().layer;
            assert!(layer >= last);
            last = layer;
        }
    }
}

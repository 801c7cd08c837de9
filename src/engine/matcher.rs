use crate::domain::ordering::{newest_first, oldest_first};
use crate::domain::{Decimal, Leg, MergedTrade, Offset, PerLeg, ProfitLedgerRow, Side, Timestamp};

/// Running book for one leg: lots held each way and one shared average price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LegBook {
    pub long: i64,
    pub short: i64,
    pub avg_price: Decimal,
}

impl LegBook {
    fn held(&mut self, long: bool) -> &mut i64 {
        if long {
            &mut self.long
        } else {
            &mut self.short
        }
    }

    /// Add `volume` at `price` to one side and re-weight the average.
    fn open(&mut self, long: bool, volume: i64, price: Decimal) {
        let avg = self.avg_price;
        let held = self.held(long);
        let qty = *held + volume;
        if qty <= 0 {
            return;
        }
        let value = avg * Decimal::from(*held) + price * Decimal::from(volume);
        *held = qty;
        self.avg_price = (value / Decimal::from(qty)).round_money();
    }

    /// Remove `volume` from one side, taking `fill_value` out of the book's value.
    fn close(&mut self, long: bool, volume: i64, fill_value: Decimal) {
        let avg = self.avg_price;
        let held = self.held(long);
        let qty = *held - volume;
        if qty > 0 {
            let value = avg * Decimal::from(*held) - fill_value;
            *held = qty;
            self.avg_price = (value / Decimal::from(qty)).round_money();
        } else {
            *held = 0;
            self.avg_price = Decimal::zero();
        }
    }
}

/// Realized-profit totals and per-leg books, restored from the last ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerState {
    pub today_close_profit: Decimal,
    pub history_close_profit: Decimal,
    pub total_close_profit: Decimal,
    pub books: PerLeg<LegBook>,
}

impl LedgerState {
    pub fn from_row(row: &ProfitLedgerRow) -> Self {
        Self {
            today_close_profit: row.today_close_profit,
            history_close_profit: row.history_close_profit,
            total_close_profit: row.total_close_profit,
            books: PerLeg::new(
                LegBook {
                    long: row.pr_long,
                    short: row.pr_short,
                    avg_price: row.pr_avg_price,
                },
                LegBook {
                    long: row.ta_long,
                    short: row.ta_short,
                    avg_price: row.ta_avg_price,
                },
                LegBook {
                    long: row.eg_long,
                    short: row.eg_short,
                    avg_price: row.eg_avg_price,
                },
            ),
        }
    }

    pub fn to_row(&self, timestamp: Timestamp, trade_id: &str) -> ProfitLedgerRow {
        let b = &self.books;
        ProfitLedgerRow {
            timestamp,
            trade_id: trade_id.to_string(),
            today_close_profit: self.today_close_profit.round_money(),
            history_close_profit: self.history_close_profit.round_money(),
            total_close_profit: self.total_close_profit.round_money(),
            pr_long: b.pr.long,
            pr_short: b.pr.short,
            pr_avg_price: b.pr.avg_price.round_money(),
            ta_long: b.ta.long,
            ta_short: b.ta.short,
            ta_avg_price: b.ta.avg_price.round_money(),
            eg_long: b.eg.long,
            eg_short: b.eg.short,
            eg_avg_price: b.eg.avg_price.round_money(),
        }
    }
}

/// Whether a trade in `direction` touches the long side of `leg`'s book.
///
/// pr follows the spread direction, the hedge legs trade the opposite side.
fn leg_is_long(leg: Leg, direction: Side) -> bool {
    let side = if leg.is_hedge() {
        direction.opposite()
    } else {
        direction
    };
    side == Side::Buy
}

/// Sign applied to a close's pairing profit.
fn close_tag(direction: Side) -> i64 {
    match direction {
        Side::Buy => -1,
        Side::Sell => 1,
    }
}

/// One close matched against one open lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub close_trade_id: String,
    pub open_trade_id: String,
    pub consumed: PerLeg<i64>,
    pub profit: Decimal,
}

/// LIFO matcher of merged spread trades into realized profit and running books.
///
/// Rows must be the complete merged log: candidates for a close are searched across
/// every row, while only unmatched and unbooked rows are processed.
pub struct PositionPnLMatcher {
    pub state: LedgerState,

    // Outputs accumulated during processing.
    ledger: Vec<ProfitLedgerRow>,
    pairings: Vec<Pairing>,
}

impl PositionPnLMatcher {
    pub fn new(state: LedgerState) -> Self {
        Self {
            state,
            ledger: Vec::new(),
            pairings: Vec::new(),
        }
    }

    /// Resume from the last ledger row, or from zero state if there is none.
    pub fn resume(last: Option<&ProfitLedgerRow>) -> Self {
        Self::new(last.map(LedgerState::from_row).unwrap_or_default())
    }

    /// Process every eligible row in chronological order, mutating `rows` in place.
    pub fn process_all(&mut self, rows: &mut [MergedTrade]) {
        let order = oldest_first(rows, |row| !row.matched && !row.booked);
        for idx in order {
            match rows[idx].offset {
                Offset::Open => self.process_open(&rows[idx]),
                Offset::Close => self.process_close(rows, idx),
            }
            rows[idx].booked = true;
            let row = &rows[idx];
            self.ledger
                .push(self.state.to_row(row.timestamp, &row.trade_id));
        }
    }

    fn process_open(&mut self, row: &MergedTrade) {
        for leg in Leg::ALL {
            let fill = row.leg(leg);
            self.state.books[leg].open(leg_is_long(leg, row.direction), fill.volume, fill.price);
        }
        tracing::debug!("Booked open {} {}", row.trade_id, row.direction);
    }

    fn process_close(&mut self, rows: &mut [MergedTrade], close_idx: usize) {
        let close = rows[close_idx].clone();
        let tag = Decimal::from(close_tag(close.direction));
        let close_prices = close.prices();
        let mut remaining = close.left();
        let mut fill_value = PerLeg::<Decimal>::default();
        let mut close_profit = Decimal::zero();

        let candidates = newest_first(rows, |row| {
            row.is_open_lot()
                && row.direction == close.direction.opposite()
                && row.timestamp < close.timestamp
        });

        for open_idx in candidates {
            if remaining.pr <= 0 {
                break;
            }
            let open = &mut rows[open_idx];
            let open_left = open.left();
            let full = remaining.pr >= open_left.pr;
            let consumed = if full { open_left } else { remaining };

            let open_prices = open.prices();
            let open_volumes = open.volumes();
            for leg in Leg::ALL {
                fill_value[leg] += open_prices[leg] * Decimal::from(consumed[leg]);
            }
            // Profit is weighted by the open's full traded volume, even on a partial match.
            let leg_pnl = |leg: Leg| {
                (close_prices[leg] - open_prices[leg]) * Decimal::from(open_volumes[leg])
            };
            let profit = ((leg_pnl(Leg::Pr) - leg_pnl(Leg::Ta) - leg_pnl(Leg::Eg)) * tag)
                .round_money();

            open.set_left(open_left.map(|leg, left| left - consumed[leg]));
            open.matched = full;
            open.profit = (open.profit + profit).round_money();
            open.note_counterparty(&close.trade_id);
            let open_trade_id = open.trade_id.clone();

            remaining = remaining.map(|leg, left| left - consumed[leg]);
            close_profit += profit;
            rows[close_idx].note_counterparty(&open_trade_id);

            tracing::info!(
                "Matched close {} against open {} ({}), profit {}",
                close.trade_id,
                open_trade_id,
                if full { "full" } else { "partial" },
                profit
            );
            self.pairings.push(Pairing {
                close_trade_id: close.trade_id.clone(),
                open_trade_id,
                consumed,
                profit,
            });

            if !full {
                break;
            }
        }

        if remaining.pr > 0 {
            tracing::warn!(
                "Close {} left {} pr lots without an open counterpart",
                close.trade_id,
                remaining.pr
            );
        }

        let row = &mut rows[close_idx];
        row.profit = (row.profit + close_profit).round_money();
        row.set_left(PerLeg::default());
        row.matched = true;

        for leg in Leg::ALL {
            // A BUY close covers pr shorts and ta/eg longs; a SELL close mirrors it.
            let long = !leg_is_long(leg, close.direction);
            self.state.books[leg].close(long, close.volumes()[leg], fill_value[leg]);
        }
        self.state.today_close_profit += close_profit;
        self.state.total_close_profit += close_profit;
    }

    pub fn ledger_rows(&self) -> &[ProfitLedgerRow] {
        &self.ledger
    }

    pub fn pairings(&self) -> &[Pairing] {
        &self.pairings
    }

    /// Consume the matcher, returning the ledger rows to append.
    pub fn into_ledger(self) -> Vec<ProfitLedgerRow> {
        self.ledger
    }
}

use crate::domain::{Position, PositionRecord, Timestamp};
use crate::store::{StoreError, StrategyStore};

/// Everything the control loop needs to resume after a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyState {
    pub position: Position,
    pub layer: i32,
}

impl StrategyState {
    /// Restore from the last position snapshot; zero state when there is none.
    pub fn load(store: &StrategyStore) -> Result<Self, StoreError> {
        Ok(store
            .last_position()?
            .map(|record| Self {
                position: record.position(),
                layer: record.layer,
            })
            .unwrap_or_default())
    }

    pub fn record(&self) -> PositionRecord {
        PositionRecord::new(Timestamp::now(), &self.position, self.layer)
    }

    /// Append the current snapshot to the position log.
    pub fn save(&self, store: &StrategyStore) -> Result<(), StoreError> {
        store.append_position(&self.record())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LegPosition, PerLeg};
    use tempfile::TempDir;

    #[test]
    fn test_missing_log_is_zero_state() {
        let dir = TempDir::new().unwrap();
        let store = StrategyStore::new(dir.path(), "s");
        assert_eq!(StrategyState::load(&store).unwrap(), StrategyState::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = StrategyStore::new(dir.path(), "s");
        store.ensure_dir().unwrap();

        let state = StrategyState {
            position: PerLeg::new(
                LegPosition::new(6, 0),
                LegPosition::new(0, 15),
                LegPosition::new(0, 3),
            ),
            layer: 1,
        };
        state.save(&store).unwrap();
        assert_eq!(StrategyState::load(&store).unwrap(), state);
    }
}

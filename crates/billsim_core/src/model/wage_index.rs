//! Average-wage-index table, loaded once from `averageWageIndex.json` and
//! read-only thereafter. Used to index social-security earnings histories.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WageIndexEntry {
    pub year: i16,
    pub index: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WageIndex {
    pub entries: Vec<WageIndexEntry>,
}

impl WageIndex {
    pub fn index_for(&self, year: i16) -> Option<f64> {
        self.entries.iter().find(|e| e.year == year).map(|e| e.index)
    }

    pub fn latest_year(&self) -> Option<i16> {
        self.entries.iter().map(|e| e.year).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_latest() {
        let table = WageIndex {
            entries: vec![
                WageIndexEntry { year: 2020, index: 55_628.60 },
                WageIndexEntry { year: 2021, index: 60_575.07 },
            ],
        };
        assert_eq!(table.index_for(2020), Some(55_628.60));
        assert_eq!(table.index_for(1999), None);
        assert_eq!(table.latest_year(), Some(2021));
    }
}

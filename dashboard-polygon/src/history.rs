//! Lazy chart series over stock aggregates

use dashboard_core::ChartPoint;

use crate::types::AggregateBar;

/// Ascending chart points built from each candle's close
///
/// Conversion happens as the iterator is consumed; once drained it cannot be
/// restarted.
#[derive(Debug)]
pub struct StockHistory {
    bars: std::vec::IntoIter<AggregateBar>,
}

impl StockHistory {
    pub(crate) fn new(bars: Vec<AggregateBar>) -> Self {
        Self {
            bars: bars.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for StockHistory {
    type Item = ChartPoint;

    fn next(&mut self) -> Option<Self::Item> {
        self.bars.next().map(|bar| bar.to_chart_point())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.bars.size_hint()
    }
}

impl ExactSizeIterator for StockHistory {}

//! Catalog aggregation — flat series overviews into a nested browse tree.
//!
//! Pure functions over data the caller already fetched; the catalog never
//! touches the store itself and is rebuilt fresh on every call.

use crate::domain::{Exchange, Interval, SeriesOverview, BAR_INTERVALS};

/// Three-level view: interval → exchange → series sorted by symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub intervals: Vec<IntervalNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalNode {
    pub interval: Interval,
    pub exchanges: Vec<ExchangeNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeNode {
    pub exchange: Exchange,
    pub series: Vec<SeriesOverview>,
}

impl Catalog {
    /// Build the tree from a flat overview list.
    ///
    /// The top level is always exactly {minute, hour, daily} in that order,
    /// present even when empty. Exchange subgroups keep first-seen input
    /// order; each exchange's series are sorted by symbol, case-sensitive
    /// ordinal ascending. Tick overviews carry no bars and are skipped.
    pub fn build(overviews: &[SeriesOverview]) -> Catalog {
        let mut intervals: Vec<IntervalNode> = BAR_INTERVALS
            .iter()
            .map(|&interval| IntervalNode {
                interval,
                exchanges: Vec::new(),
            })
            .collect();

        for overview in overviews {
            let Some(node) = intervals
                .iter_mut()
                .find(|n| n.interval == overview.key.interval)
            else {
                continue;
            };

            let exchange = overview.key.exchange;
            let group = match node.exchanges.iter_mut().find(|g| g.exchange == exchange) {
                Some(group) => group,
                None => {
                    node.exchanges.push(ExchangeNode {
                        exchange,
                        series: Vec::new(),
                    });
                    node.exchanges.last_mut().unwrap()
                }
            };
            group.series.push(overview.clone());
        }

        for node in &mut intervals {
            for group in &mut node.exchanges {
                group.series.sort_by(|a, b| a.key.symbol.cmp(&b.key.symbol));
            }
        }

        Catalog { intervals }
    }

    /// Total number of leaf series entries.
    pub fn total_series(&self) -> usize {
        self.intervals
            .iter()
            .flat_map(|n| &n.exchanges)
            .map(|g| g.series.len())
            .sum()
    }
}

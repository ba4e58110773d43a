// Aggregation pipeline - totals, rankings, categorical leaders, distribution
// Every query filters the dataset by a year selection once, then runs a set
// of independent reductions over that same filtered view. Nothing is cached
// between queries and the dataset is never mutated.

use crate::dataset::{Dataset, Transaction};
use crate::error::{PulseError, Result};
use crate::ranking::{average_rank_descending, round4, RankedEntity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Revenue summed per calendar month of one selected year.
/// Feeds the sales trend chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    pub revenue: f64,
}

/// Per-transaction revenue values for histogram bucketing, plus their mean.
/// Binning itself is a rendering concern and happens in the frontends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub values: Vec<f64>,
    pub mean: f64,
}

/// The four categorical "best of" reductions, computed independently over
/// one filtered view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalLeaders {
    /// Category with the highest summed revenue
    pub category: String,
    /// Payment method with the most transactions
    pub payment_method: String,
    /// Sales channel with the most transactions
    pub sales_channel: String,
    /// Region with the highest summed revenue
    pub region: String,
}

/// Complete result of one `summarize` query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Years the query was actually scoped to (after defaulting)
    pub years: BTreeSet<i32>,

    pub total_revenue: f64,
    pub total_units: u64,
    pub avg_revenue_per_unit: f64,
    pub avg_discount: f64,

    pub top_category: String,
    pub top_payment_method: String,
    pub top_channel: String,
    pub top_region: String,

    pub product_ranking: Vec<RankedEntity>,
    pub sales_rep_ranking: Vec<RankedEntity>,

    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub distribution: Distribution,
}

/// Computes aggregate metrics over an immutable dataset.
///
/// Construction takes the dataset by value; there is no ambient global
/// state. Queries are synchronous and side-effect free, so the aggregator
/// can be shared freely across threads behind an `Arc`.
pub struct Aggregator {
    dataset: Dataset,
}

impl Aggregator {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Resolve a selection: empty means "all years present in the dataset".
    fn resolve_selection(&self, selection: &BTreeSet<i32>) -> BTreeSet<i32> {
        if selection.is_empty() {
            self.dataset.years()
        } else {
            selection.clone()
        }
    }

    /// Rows whose year falls in the (resolved) selection, in dataset order.
    /// Errors with `EmptySelection` when no row matches, so downstream
    /// reductions never run over an empty view.
    fn filtered(&self, years: &BTreeSet<i32>) -> Result<Vec<&Transaction>> {
        let rows: Vec<&Transaction> = self
            .dataset
            .transactions()
            .iter()
            .filter(|tx| years.contains(&tx.year))
            .collect();

        if rows.is_empty() {
            return Err(PulseError::EmptySelection {
                years: years.clone(),
            });
        }

        Ok(rows)
    }

    /// Group filtered rows by a key, sum revenue per group, attach
    /// participation shares against `total_revenue` and competition ranks,
    /// and return rows sorted ascending by rank (ties in key order).
    ///
    /// `total_revenue` is supplied by the caller so that participation
    /// shares stay consistent with the totals reported elsewhere in the
    /// same query.
    fn rank_by_key<'a, F>(rows: &[&'a Transaction], key: F, total_revenue: f64) -> Vec<RankedEntity>
    where
        F: Fn(&'a Transaction) -> &'a str,
    {
        // BTreeMap gives groups in lexicographic key order, which fixes the
        // output order of tied ranks deterministically
        let mut revenue_by_key: BTreeMap<&str, f64> = BTreeMap::new();
        for &tx in rows {
            *revenue_by_key.entry(key(tx)).or_insert(0.0) += tx.sales_amount;
        }

        let keys: Vec<&str> = revenue_by_key.keys().copied().collect();
        let revenues: Vec<f64> = revenue_by_key.values().copied().collect();
        let ranks = average_rank_descending(&revenues);

        let mut entities: Vec<RankedEntity> = keys
            .into_iter()
            .zip(revenues.iter().zip(ranks.iter()))
            .map(|(key, (&revenue, &rank))| RankedEntity {
                key: key.to_string(),
                revenue,
                participation: round4(revenue / total_revenue),
                rank,
            })
            .collect();

        // Stable sort keeps tied ranks in key order
        entities.sort_by(|a, b| {
            a.rank
                .partial_cmp(&b.rank)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        entities
    }

    /// Rank products by revenue over the selection.
    pub fn rank_products(
        &self,
        selection: &BTreeSet<i32>,
        total_revenue: f64,
    ) -> Result<Vec<RankedEntity>> {
        let years = self.resolve_selection(selection);
        let rows = self.filtered(&years)?;
        Ok(Self::rank_by_key(&rows, |tx| &tx.product_id, total_revenue))
    }

    /// Rank sales representatives by revenue over the selection.
    /// The participation column doubles as the pie-chart breakdown; it is
    /// not recomputed separately.
    pub fn rank_sales_reps(
        &self,
        selection: &BTreeSet<i32>,
        total_revenue: f64,
    ) -> Result<Vec<RankedEntity>> {
        let years = self.resolve_selection(selection);
        let rows = self.filtered(&years)?;
        Ok(Self::rank_by_key(&rows, |tx| &tx.sales_rep, total_revenue))
    }

    /// Key with the maximum summed revenue.
    /// Tie-break: lexicographically smallest key among ties (the scan walks
    /// keys in order and only a strictly greater sum displaces the leader).
    fn max_by_revenue<'a, F>(rows: &[&'a Transaction], key: F) -> String
    where
        F: Fn(&'a Transaction) -> &'a str,
    {
        let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
        for &tx in rows {
            *sums.entry(key(tx)).or_insert(0.0) += tx.sales_amount;
        }

        let mut best = ("", f64::NEG_INFINITY);
        for (k, &sum) in &sums {
            if sum > best.1 {
                best = (k, sum);
            }
        }
        best.0.to_string()
    }

    /// Key with the maximum transaction count, same tie-break as
    /// `max_by_revenue`.
    fn max_by_count<'a, F>(rows: &[&'a Transaction], key: F) -> String
    where
        F: Fn(&'a Transaction) -> &'a str,
    {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for &tx in rows {
            *counts.entry(key(tx)).or_insert(0) += 1;
        }

        let mut best = ("", 0usize);
        for (k, &count) in &counts {
            if count > best.1 {
                best = (k, count);
            }
        }
        best.0.to_string()
    }

    fn leaders_from(rows: &[&Transaction]) -> CategoricalLeaders {
        CategoricalLeaders {
            category: Self::max_by_revenue(rows, |tx| &tx.product_category),
            payment_method: Self::max_by_count(rows, |tx| &tx.payment_method),
            sales_channel: Self::max_by_count(rows, |tx| &tx.sales_channel),
            region: Self::max_by_revenue(rows, |tx| &tx.region),
        }
    }

    fn distribution_from(rows: &[&Transaction]) -> Distribution {
        let values: Vec<f64> = rows.iter().map(|tx| tx.sales_amount).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Distribution { values, mean }
    }

    /// The four categorical leaders over the selection.
    pub fn categorical_leaders(&self, selection: &BTreeSet<i32>) -> Result<CategoricalLeaders> {
        let years = self.resolve_selection(selection);
        let rows = self.filtered(&years)?;
        Ok(Self::leaders_from(&rows))
    }

    /// Raw per-transaction revenue values over the selection plus their
    /// mean, for histogram bucketing by the caller.
    pub fn distribution_stats(&self, selection: &BTreeSet<i32>) -> Result<Distribution> {
        let years = self.resolve_selection(selection);
        let rows = self.filtered(&years)?;
        Ok(Self::distribution_from(&rows))
    }

    fn monthly_from(rows: &[&Transaction]) -> Vec<MonthlyRevenue> {
        let mut sums: BTreeMap<(i32, u32), f64> = BTreeMap::new();
        for &tx in rows {
            *sums.entry((tx.year, tx.month)).or_insert(0.0) += tx.sales_amount;
        }

        sums.into_iter()
            .map(|((year, month), revenue)| MonthlyRevenue {
                year,
                month,
                revenue,
            })
            .collect()
    }

    /// Per-month revenue for each selected year, sorted by year then month.
    pub fn monthly_revenue(&self, selection: &BTreeSet<i32>) -> Result<Vec<MonthlyRevenue>> {
        let years = self.resolve_selection(selection);
        let rows = self.filtered(&years)?;
        Ok(Self::monthly_from(&rows))
    }

    /// Compute the full summary for a selection of years.
    ///
    /// The selection is resolved once, the dataset filtered once, and all
    /// reductions run over that shared view. Pure function of
    /// (dataset, selection) - calling it twice yields identical results.
    pub fn summarize(&self, selection: &BTreeSet<i32>) -> Result<Summary> {
        let years = self.resolve_selection(selection);
        let rows = self.filtered(&years)?;

        let total_revenue: f64 = rows.iter().map(|tx| tx.sales_amount).sum();
        let total_units: u64 = rows.iter().map(|tx| u64::from(tx.quantity_sold)).sum();

        if total_units == 0 {
            // Unreachable from a validated dataset (quantities are positive)
            // but surfaced explicitly rather than returning NaN
            return Err(PulseError::DegenerateAggregate {
                what: "total units sold is zero",
            });
        }

        let avg_revenue_per_unit = total_revenue / total_units as f64;
        let avg_discount =
            rows.iter().map(|tx| tx.discount).sum::<f64>() / rows.len() as f64;

        let leaders = Self::leaders_from(&rows);

        let product_ranking = Self::rank_by_key(&rows, |tx| &tx.product_id, total_revenue);
        let sales_rep_ranking = Self::rank_by_key(&rows, |tx| &tx.sales_rep, total_revenue);

        let distribution = Self::distribution_from(&rows);
        let monthly_revenue = Self::monthly_from(&rows);

        Ok(Summary {
            years,
            total_revenue,
            total_units,
            avg_revenue_per_unit,
            avg_discount,
            top_category: leaders.category,
            top_payment_method: leaders.payment_method,
            top_channel: leaders.sales_channel,
            top_region: leaders.region,
            product_ranking,
            sales_rep_ranking,
            monthly_revenue,
            distribution,
        })
    }
}

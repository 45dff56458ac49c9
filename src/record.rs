//! Club financial records and their canonical text form

use crate::error::{FfpError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A tracked monetary metric, in the order it is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    Wages,
    TransferSpending,
    NetSpend,
    ProfitLoss,
    Debt,
    SquadCost,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Revenue,
        Metric::Wages,
        Metric::TransferSpending,
        Metric::NetSpend,
        Metric::ProfitLoss,
        Metric::Debt,
        Metric::SquadCost,
    ];

    /// Field name in the upstream JSON.
    pub fn key(&self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::Wages => "wages",
            Metric::TransferSpending => "transfer_spending",
            Metric::NetSpend => "net_spend",
            Metric::ProfitLoss => "profit_loss",
            Metric::Debt => "debt",
            Metric::SquadCost => "squad_cost",
        }
    }

    /// Human-readable label used in the text representation.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Revenue => "Revenue",
            Metric::Wages => "Wages",
            Metric::TransferSpending => "Transfer Spending",
            Metric::NetSpend => "Net Spend",
            Metric::ProfitLoss => "Profit/Loss",
            Metric::Debt => "Debt",
            Metric::SquadCost => "Squad Cost",
        }
    }
}

/// Monetary amounts (whole currency units) keyed by metric. Any may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wages: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_spending: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_spend: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_loss: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squad_cost: Option<i64>,
}

impl Metrics {
    fn slot(&mut self, metric: Metric) -> &mut Option<i64> {
        match metric {
            Metric::Revenue => &mut self.revenue,
            Metric::Wages => &mut self.wages,
            Metric::TransferSpending => &mut self.transfer_spending,
            Metric::NetSpend => &mut self.net_spend,
            Metric::ProfitLoss => &mut self.profit_loss,
            Metric::Debt => &mut self.debt,
            Metric::SquadCost => &mut self.squad_cost,
        }
    }

    pub fn get(&self, metric: Metric) -> Option<i64> {
        match metric {
            Metric::Revenue => self.revenue,
            Metric::Wages => self.wages,
            Metric::TransferSpending => self.transfer_spending,
            Metric::NetSpend => self.net_spend,
            Metric::ProfitLoss => self.profit_loss,
            Metric::Debt => self.debt,
            Metric::SquadCost => self.squad_cost,
        }
    }

    pub fn set(&mut self, metric: Metric, value: i64) {
        *self.slot(metric) = Some(value);
    }

    /// Present metrics in rendering order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, i64)> + '_ {
        Metric::ALL
            .iter()
            .filter_map(move |&m| self.get(m).map(|v| (m, v)))
    }
}

/// One club's finances for one year, as supplied by the upstream producer.
///
/// Identified by `(club, year)`. The JSON shape is flat:
/// `{"club": .., "year": .., "revenue": .., .., "ffp_compliance": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub club: String,
    pub year: i32,
    #[serde(flatten)]
    pub metrics: Metrics,
    pub ffp_compliance: bool,
    /// When the producer captured the figures, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<String>,
}

impl FinancialRecord {
    pub fn new(club: impl Into<String>, year: i32, ffp_compliance: bool) -> Self {
        Self {
            club: club.into(),
            year,
            metrics: Metrics::default(),
            ffp_compliance,
            scraped_at: None,
        }
    }

    pub fn with_metric(mut self, metric: Metric, value: i64) -> Self {
        self.metrics.set(metric, value);
        self
    }

    pub fn metric(&self, metric: Metric) -> Option<i64> {
        self.metrics.get(metric)
    }

    /// Shape check applied before a record is embedded.
    pub fn validate(&self) -> Result<()> {
        if self.club.trim().is_empty() {
            return Err(FfpError::validation("record has an empty club identifier"));
        }
        Ok(())
    }

    /// Canonical text submitted to the embedding model.
    ///
    /// Pure: the same record always renders to the same bytes.
    pub fn text_representation(&self) -> String {
        let mut text = String::with_capacity(256);
        // Writing into a String cannot fail.
        let _ = write!(text, "Club: {}\nYear: {}", self.club, self.year);
        for (metric, value) in self.metrics.iter() {
            let _ = write!(text, "\n{}: {}", metric.label(), format_millions(value));
        }
        let _ = write!(
            text,
            "\nFFP Compliance: {}",
            if self.ffp_compliance { "Yes" } else { "No" }
        );
        text
    }
}

/// `450_000_000` -> `£450.0M`
pub fn format_millions(amount: i64) -> String {
    format!("£{:.1}M", amount as f64 / 1_000_000.0)
}

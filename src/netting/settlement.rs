use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    balance::implied_balances,
    engine::ConsolidationStatus,
    matrix::{DebtMatrix, PersonIndex, ZERO_EPSILON},
};
use crate::{
    currency::{format_currency_value, CurrencyCode, FormatOptions, LocaleConfig},
    errors::{LedgerError, Result},
    ledger::AMOUNT_TOLERANCE,
};

/// Largest ledger-wide imbalance tolerated before a sweep starts.
pub const ZERO_SUM_TOLERANCE: f64 = 1e-4;

/// How the group should settle up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementMode {
    /// Netted payments directly between members.
    PeerToPeer,
    /// Everyone settles with one designated member.
    Bank(String),
    /// Largest creditor is paid first by the remaining debtors.
    Greedy,
}

impl fmt::Display for SettlementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementMode::PeerToPeer => write!(f, "peer-to-peer"),
            SettlementMode::Bank(bank) => write!(f, "bank ({bank})"),
            SettlementMode::Greedy => write!(f, "greedy"),
        }
    }
}

/// One settling payment: `from` owes `to` the `amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub from: String,
    pub to: String,
    pub amount: f64,
}

impl Payment {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }

    pub fn render(
        &self,
        code: &CurrencyCode,
        locale: &LocaleConfig,
        options: &FormatOptions,
    ) -> String {
        format!(
            "{} owes {} {}",
            self.from,
            self.to,
            format_currency_value(self.amount, code, locale, options)
        )
    }
}

impl fmt::Display for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} owes {} ${:.2}", self.from, self.to, self.amount)
    }
}

/// Structured result of a settlement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub mode: SettlementMode,
    pub payments: Vec<Payment>,
    /// Only set for peer-to-peer netting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidation: Option<ConsolidationStatus>,
}

impl SettlementReport {
    pub fn total_moved(&self) -> f64 {
        self.payments.iter().map(|payment| payment.amount).sum()
    }

    pub fn as_tuples(&self) -> Vec<(&str, &str, f64)> {
        self.payments
            .iter()
            .map(|payment| (payment.from.as_str(), payment.to.as_str(), payment.amount))
            .collect()
    }

    /// Net debt per person implied by the payments, in `names` order.
    pub fn implied_balances(&self, names: &[String]) -> Vec<f64> {
        implied_balances(names, self.as_tuples())
    }

    /// One line per payment.
    pub fn render(
        &self,
        code: &CurrencyCode,
        locale: &LocaleConfig,
        options: &FormatOptions,
    ) -> String {
        self.payments
            .iter()
            .map(|payment| payment.render(code, locale, options))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Lists every netted entry, grouped by creditor and then by debtor in roster order.
pub fn peer_to_peer(matrix: &DebtMatrix, index: &PersonIndex) -> Vec<Payment> {
    let mut entries: Vec<_> = matrix.entries().collect();
    entries.sort_by_key(|&(debtor, creditor, _)| (creditor, debtor));
    entries
        .into_iter()
        .map(|(debtor, creditor, amount)| {
            Payment::new(index.name(debtor), index.name(creditor), amount)
        })
        .collect()
}

/// Settles every member against `bank` using their individual balances.
///
/// `balances` holds each member's net debt in `names` order. Members whose balance
/// is exactly settled are left out.
pub fn through_bank(names: &[String], balances: &[f64], bank: &str) -> Vec<Payment> {
    names
        .iter()
        .zip(balances)
        .filter(|(name, _)| name.as_str() != bank)
        .filter(|(_, debt)| debt.abs() > ZERO_EPSILON)
        .map(|(name, &debt)| {
            if debt < 0.0 {
                Payment::new(bank, name.as_str(), -debt)
            } else {
                Payment::new(name.as_str(), bank, debt)
            }
        })
        .collect()
}

/// Pays off the largest creditors first, always drawing from the last debtor in line.
pub fn greedy(names: &[String], balances: &[f64]) -> Result<Vec<Payment>> {
    let imbalance: f64 = balances.iter().sum();
    if imbalance.abs() > ZERO_SUM_TOLERANCE {
        return Err(LedgerError::Integrity(format!(
            "credits and debts don't balance (off by {imbalance:.6})"
        )));
    }

    let mut order: Vec<(usize, f64)> = balances
        .iter()
        .map(|debt| -debt)
        .enumerate()
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut payments = Vec::new();
    for position in 0..order.len() {
        while order[position].1 > AMOUNT_TOLERANCE {
            let Some(last) = order
                .iter()
                .rposition(|(_, credit)| credit.abs() > AMOUNT_TOLERANCE)
            else {
                break;
            };
            if last <= position || order[last].1 >= 0.0 {
                break;
            }
            let amount = order[position].1.min(-order[last].1);
            order[position].1 -= amount;
            order[last].1 += amount;
            payments.push(Payment::new(
                names[order[last].0].as_str(),
                names[order[position].0].as_str(),
                amount,
            ));
        }
    }
    Ok(payments)
}

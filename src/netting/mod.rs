//! Balance calculation, debt matrix construction, netting and settlement reporting.

pub mod balance;
pub mod engine;
pub mod matrix;
pub mod settlement;

pub use balance::{balances, implied_balances, person_balance};
pub use engine::{
    net, ConsolidationStatus, NettingOptions, NettingOutcome, CHAIN_PASS_LIMIT,
    DEFAULT_CONSOLIDATION_LIMIT,
};
pub use matrix::{build_matrix, DebtMatrix, PersonIndex};
pub use settlement::{Payment, SettlementMode, SettlementReport};

use tracing::error;

use crate::{
    errors::{LedgerError, Result},
    ledger::{Transaction, AMOUNT_TOLERANCE},
};

/// Produces the settlement for `transactions` among `names` in the requested mode.
///
/// Every matrix and balance vector is rebuilt from scratch, so repeated calls on an
/// unchanged ledger give the same answer.
pub fn settle(
    names: &[String],
    transactions: &[Transaction],
    mode: SettlementMode,
    options: &NettingOptions,
) -> Result<SettlementReport> {
    let ground_truth = balances(names, transactions);
    let (payments, consolidation) = match &mode {
        SettlementMode::PeerToPeer => {
            let index = PersonIndex::new(names);
            let matrix = build_matrix(transactions, &index)?;
            let outcome = net(matrix, &ground_truth, options)?;
            (
                settlement::peer_to_peer(&outcome.matrix, &index),
                Some(outcome.consolidation),
            )
        }
        SettlementMode::Bank(bank) => (
            settlement::through_bank(names, &ground_truth, bank),
            None,
        ),
        SettlementMode::Greedy => (settlement::greedy(names, &ground_truth)?, None),
    };

    let report = SettlementReport {
        mode,
        payments,
        consolidation,
    };
    verify_report(names, &report, &ground_truth)?;
    Ok(report)
}

/// Checks that a report moves nobody's balance and pays nobody to themselves.
pub fn verify_report(names: &[String], report: &SettlementReport, expected: &[f64]) -> Result<()> {
    if let Some(payment) = report.payments.iter().find(|p| p.from == p.to) {
        error!(person = %payment.from, "settlement contains a self-payment");
        return Err(LedgerError::Integrity(format!(
            "{} would pay themselves",
            payment.from
        )));
    }
    let implied = report.implied_balances(names);
    for ((name, got), want) in names.iter().zip(&implied).zip(expected) {
        if (got - want).abs() > AMOUNT_TOLERANCE {
            error!(%name, got, want, mode = %report.mode, "settlement moves a balance");
            return Err(LedgerError::Integrity(format!(
                "settlement leaves {name} at {got:.4} instead of {want:.4}"
            )));
        }
    }
    Ok(())
}

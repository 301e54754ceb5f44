//! Reduces a debt matrix to a small set of payments without moving any balance.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::matrix::{DebtMatrix, ZERO_EPSILON};
use crate::{
    errors::{LedgerError, Result},
    ledger::AMOUNT_TOLERANCE,
};

/// Default ceiling for rectangle rotations during consolidation.
pub const DEFAULT_CONSOLIDATION_LIMIT: usize = 10_000;

/// Upper bound on re-routing passes during chain elimination.
pub const CHAIN_PASS_LIMIT: usize = 10_000;

/// Tunables for a netting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NettingOptions {
    pub consolidation_limit: usize,
}

impl Default for NettingOptions {
    fn default() -> Self {
        Self {
            consolidation_limit: DEFAULT_CONSOLIDATION_LIMIT,
        }
    }
}

/// Outcome of the multi-payment consolidation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsolidationStatus {
    /// No two debtors share two or more creditors any more.
    Consolidated { rotations: usize },
    /// The rotation ceiling stopped the phase early. The matrix is still valid.
    CeilingReached { rotations: usize },
}

impl ConsolidationStatus {
    pub fn rotations(&self) -> usize {
        match self {
            ConsolidationStatus::Consolidated { rotations }
            | ConsolidationStatus::CeilingReached { rotations } => *rotations,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ConsolidationStatus::Consolidated { .. })
    }
}

/// Reduced matrix plus how far consolidation got.
#[derive(Debug, Clone)]
pub struct NettingOutcome {
    pub matrix: DebtMatrix,
    pub consolidation: ConsolidationStatus,
}

/// Runs the three netting phases and verifies the result against `expected`.
///
/// `expected` holds the ground-truth balance of every person in matrix order.
pub fn net(
    mut matrix: DebtMatrix,
    expected: &[f64],
    options: &NettingOptions,
) -> Result<NettingOutcome> {
    let gross = matrix.payment_count();

    eliminate_self_debts(&mut matrix);
    verify_balances(&matrix, expected, "before netting")?;

    let passes = eliminate_chains(&mut matrix);
    debug!(
        before = gross,
        after = matrix.payment_count(),
        passes,
        "chain elimination finished"
    );

    let consolidation = consolidate(&mut matrix, options.consolidation_limit);
    matrix.clear_dust();
    if let ConsolidationStatus::CeilingReached { rotations } = consolidation {
        warn!(
            rotations,
            limit = options.consolidation_limit,
            "consolidation stopped at its iteration ceiling"
        );
    }

    verify_balances(&matrix, expected, "after netting")?;
    debug!(
        payments = matrix.payment_count(),
        rotations = consolidation.rotations(),
        "netting finished"
    );
    Ok(NettingOutcome {
        matrix,
        consolidation,
    })
}

/// Nobody owes themselves.
pub fn eliminate_self_debts(matrix: &mut DebtMatrix) {
    matrix.zero_diagonal();
}

/// Re-routes "debtor owes creditor who owes someone else" straight to the end creditor.
///
/// Passes repeat until nobody who is owed money still owes onward, or until
/// [`CHAIN_PASS_LIMIT`] is reached. Loops leave entries on the diagonal, which are
/// zeroed after every pass. Returns the number of passes that moved debt.
pub fn eliminate_chains(matrix: &mut DebtMatrix) -> usize {
    let mut passes = 0;
    while passes < CHAIN_PASS_LIMIT && reroute_chains(matrix) {
        passes += 1;
    }
    if passes == CHAIN_PASS_LIMIT {
        warn!(passes, "chain elimination stopped at its pass ceiling");
    }
    passes
}

/// One row-major sweep. Every re-route moves more than [`ZERO_EPSILON`], so the
/// total owed strictly shrinks while this keeps returning `true`.
fn reroute_chains(matrix: &mut DebtMatrix) -> bool {
    let size = matrix.size();
    let mut changed = false;
    for debtor in 0..size {
        for creditor in 0..size {
            if debtor == creditor || !matrix.is_positive(debtor, creditor) {
                continue;
            }
            let onward: f64 = (0..size)
                .filter(|&next| next != creditor && matrix.is_positive(creditor, next))
                .map(|next| matrix.get(creditor, next))
                .sum();
            if onward <= ZERO_EPSILON {
                continue;
            }
            changed = true;

            let owed = matrix.get(debtor, creditor);
            if onward < owed {
                for next in (0..size).filter(|&next| next != creditor) {
                    let passed = matrix.get(creditor, next);
                    if passed > ZERO_EPSILON {
                        matrix.add(debtor, next, passed);
                        matrix.set(creditor, next, 0.0);
                    }
                }
                matrix.set(debtor, creditor, owed - onward);
            } else {
                let mut remaining = owed;
                for next in (0..size).filter(|&next| next != creditor) {
                    if remaining <= ZERO_EPSILON {
                        break;
                    }
                    if !matrix.is_positive(creditor, next) {
                        continue;
                    }
                    let passed = matrix.get(creditor, next);
                    let moved = remaining.min(passed);
                    matrix.add(debtor, next, moved);
                    matrix.set(creditor, next, passed - moved);
                    remaining -= moved;
                }
                matrix.set(debtor, creditor, remaining.max(0.0));
            }
        }
    }
    eliminate_self_debts(matrix);
    changed
}

/// Cancels 2×2 rectangles between debtors sharing creditors.
///
/// Each rotation zeroes the smallest of the four entries and shifts the same amount
/// around the rectangle so both row totals and both column totals are unchanged.
pub fn consolidate(matrix: &mut DebtMatrix, limit: usize) -> ConsolidationStatus {
    let mut rotations = 0;
    loop {
        let Some(rectangle) = find_rectangle(matrix) else {
            return ConsolidationStatus::Consolidated { rotations };
        };
        if rotations >= limit {
            return ConsolidationStatus::CeilingReached { rotations };
        }
        rotate(matrix, rectangle);
        rotations += 1;
    }
}

#[derive(Debug, Clone, Copy)]
struct Rectangle {
    rows: [usize; 2],
    columns: [usize; 2],
}

fn find_rectangle(matrix: &DebtMatrix) -> Option<Rectangle> {
    let size = matrix.size();
    for first in 0..size {
        for second in (first + 1)..size {
            let mut shared = (0..size).filter(|&creditor| {
                matrix.is_positive(first, creditor) && matrix.is_positive(second, creditor)
            });
            if let (Some(a), Some(b)) = (shared.next(), shared.next()) {
                return Some(Rectangle {
                    rows: [first, second],
                    columns: [a, b],
                });
            }
        }
    }
    None
}

fn rotate(matrix: &mut DebtMatrix, rect: Rectangle) {
    let corners = [
        (rect.rows[0], rect.columns[0]),
        (rect.rows[0], rect.columns[1]),
        (rect.rows[1], rect.columns[0]),
        (rect.rows[1], rect.columns[1]),
    ];
    let mut smallest = 0;
    for (idx, &(row, column)) in corners.iter().enumerate().skip(1) {
        let (min_row, min_column) = corners[smallest];
        if matrix.get(row, column) < matrix.get(min_row, min_column) {
            smallest = idx;
        }
    }
    let (row, column) = corners[smallest];
    let other_row = if row == rect.rows[0] { rect.rows[1] } else { rect.rows[0] };
    let other_column = if column == rect.columns[0] {
        rect.columns[1]
    } else {
        rect.columns[0]
    };
    let shift = matrix.get(row, column);

    matrix.set(row, column, 0.0);
    let opposite = matrix.get(other_row, other_column) - shift;
    matrix.set(other_row, other_column, opposite.max(0.0));
    matrix.add(row, other_column, shift);
    matrix.add(other_row, column, shift);
}

/// Fails when any balance implied by `matrix` drifts from `expected`.
pub fn verify_balances(matrix: &DebtMatrix, expected: &[f64], stage: &str) -> Result<()> {
    let actual = matrix.balances();
    if actual.len() != expected.len() {
        return Err(LedgerError::Integrity(format!(
            "{stage}: matrix covers {} people but {} balances were expected",
            actual.len(),
            expected.len()
        )));
    }
    for (idx, (got, want)) in actual.iter().zip(expected).enumerate() {
        if (got - want).abs() > AMOUNT_TOLERANCE {
            error!(stage, person = idx, got, want, "balance drifted during netting");
            return Err(LedgerError::Integrity(format!(
                "{stage}: person #{idx} balance {got:.4} differs from {want:.4}"
            )));
        }
    }
    Ok(())
}

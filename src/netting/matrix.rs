use std::collections::HashMap;

use tracing::error;

use crate::{
    errors::{LedgerError, Result},
    ledger::{Transaction, AMOUNT_TOLERANCE},
};

/// Entries at or below this magnitude are treated as settled.
pub const ZERO_EPSILON: f64 = 1e-9;

/// Stable name → row/column index mapping, rebuilt whenever the roster changes.
#[derive(Debug, Clone)]
pub struct PersonIndex {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl PersonIndex {
    pub fn new(names: &[String]) -> Self {
        let lookup = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self {
            names: names.to_vec(),
            lookup,
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    pub fn name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Square matrix where `(i, j)` is what person `i` owes person `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct DebtMatrix {
    size: usize,
    cells: Vec<f64>,
}

impl DebtMatrix {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            cells: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, debtor: usize, creditor: usize) -> f64 {
        self.cells[debtor * self.size + creditor]
    }

    pub fn set(&mut self, debtor: usize, creditor: usize, amount: f64) {
        self.cells[debtor * self.size + creditor] = amount;
    }

    pub fn add(&mut self, debtor: usize, creditor: usize, amount: f64) {
        self.cells[debtor * self.size + creditor] += amount;
    }

    pub fn is_positive(&self, debtor: usize, creditor: usize) -> bool {
        self.get(debtor, creditor) > ZERO_EPSILON
    }

    /// Total owed by `debtor` to everyone else.
    pub fn row_total(&self, debtor: usize) -> f64 {
        (0..self.size)
            .filter(|&creditor| creditor != debtor)
            .map(|creditor| self.get(debtor, creditor))
            .sum()
    }

    /// Total owed to `creditor` by everyone else.
    pub fn column_total(&self, creditor: usize) -> f64 {
        (0..self.size)
            .filter(|&debtor| debtor != creditor)
            .map(|debtor| self.get(debtor, creditor))
            .sum()
    }

    pub fn zero_diagonal(&mut self) {
        for idx in 0..self.size {
            self.set(idx, idx, 0.0);
        }
    }

    /// Snaps dust left over by floating point arithmetic to exactly zero.
    pub fn clear_dust(&mut self) {
        for cell in &mut self.cells {
            if cell.abs() <= ZERO_EPSILON {
                *cell = 0.0;
            }
        }
    }

    /// Net debt per person as implied by the matrix.
    pub fn balances(&self) -> Vec<f64> {
        (0..self.size)
            .map(|idx| self.row_total(idx) - self.column_total(idx))
            .collect()
    }

    /// Number of off-diagonal entries that still represent a payment.
    pub fn payment_count(&self) -> usize {
        self.entries().count()
    }

    /// Off-diagonal positive entries as `(debtor, creditor, amount)`, row-major.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.size).flat_map(move |debtor| {
            (0..self.size)
                .filter(move |&creditor| creditor != debtor)
                .map(move |creditor| (debtor, creditor, self.get(debtor, creditor)))
                .filter(|(_, _, amount)| *amount > ZERO_EPSILON)
        })
    }
}

/// Builds the pairwise debt matrix for `transactions`.
///
/// Inside one transaction every debtor's shortfall is spread across the creditors
/// in proportion to their surplus, then accumulated into the running matrix.
pub fn build_matrix(transactions: &[Transaction], index: &PersonIndex) -> Result<DebtMatrix> {
    let mut matrix = DebtMatrix::zeros(index.len());
    for txn in transactions {
        let mut creditors = Vec::new();
        let mut debtors = Vec::new();
        for name in index.names() {
            let contribution = txn.contribution_of(name);
            let idx = index
                .index_of(name)
                .ok_or_else(|| LedgerError::Integrity(format!("`{name}` missing from index")))?;
            if contribution > 0.0 {
                creditors.push((idx, contribution));
            } else if contribution < 0.0 {
                debtors.push((idx, -contribution));
            }
        }
        if let Some(stranger) = txn.participants().find(|name| index.index_of(name).is_none()) {
            error!(transaction = %txn.id(), %stranger, "transaction references a non-member");
            return Err(LedgerError::Integrity(format!(
                "transaction {} references `{stranger}` who is not in the group",
                txn.id()
            )));
        }

        let credit: f64 = creditors.iter().map(|(_, amount)| amount).sum();
        let debt: f64 = debtors.iter().map(|(_, amount)| amount).sum();
        if (credit - debt).abs() > AMOUNT_TOLERANCE {
            error!(transaction = %txn.id(), credit, debt, "transaction does not conserve money");
            return Err(LedgerError::Integrity(format!(
                "transaction {} has credits {credit:.4} but debts {debt:.4}",
                txn.id()
            )));
        }
        if credit <= 0.0 {
            continue;
        }

        for &(debtor, owed) in &debtors {
            for &(creditor, surplus) in &creditors {
                matrix.add(debtor, creditor, owed * surplus / credit);
            }
        }
    }
    Ok(matrix)
}

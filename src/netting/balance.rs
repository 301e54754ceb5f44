//! Ground-truth balances derived straight from the transaction list.

use crate::ledger::Transaction;

/// Net debt of `name` across `transactions`.
///
/// Payments reduce the figure, shares owed increase it. Positive means the person
/// owes the group; negative means the group owes them.
pub fn person_balance(transactions: &[Transaction], name: &str) -> f64 {
    transactions.iter().fold(0.0, |debt, txn| {
        let paid = txn.payers().get(name).copied().unwrap_or(0.0);
        let owed = txn.split().get(name).copied().unwrap_or(0.0);
        debt - paid + owed
    })
}

/// Balances for every person in `names`, in the same order.
pub fn balances(names: &[String], transactions: &[Transaction]) -> Vec<f64> {
    names
        .iter()
        .map(|name| person_balance(transactions, name))
        .collect()
}

/// Debt implied by a list of `(debtor, creditor, amount)` payments, in `names` order.
pub fn implied_balances<'a, I>(names: &[String], payments: I) -> Vec<f64>
where
    I: IntoIterator<Item = (&'a str, &'a str, f64)>,
{
    let mut debts = vec![0.0; names.len()];
    for (from, to, amount) in payments {
        if let Some(idx) = names.iter().position(|name| name == from) {
            debts[idx] += amount;
        }
        if let Some(idx) = names.iter().position(|name| name == to) {
            debts[idx] -= amount;
        }
    }
    debts
}

//! Validation and canonicalization of raw expense descriptions.

use std::collections::{BTreeMap, BTreeSet};

use strsim::levenshtein;

use super::transaction::{Involvement, Payers, Transaction, TransactionRequest};
use crate::errors::{LedgerError, Result};

/// Absolute tolerance used when comparing money totals.
pub const AMOUNT_TOLERANCE: f64 = 1e-3;

const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Turns a [`TransactionRequest`] into a canonical [`Transaction`] against `roster`.
///
/// Nothing is stored here; the caller appends the result only when this succeeds.
pub fn normalize(roster: &[String], request: TransactionRequest) -> Result<Transaction> {
    let context = request.context();
    let TransactionRequest {
        payers,
        split,
        involved,
        total,
        comment,
    } = request;

    if let Payers::Multiple(map) = &payers {
        if map.is_empty() {
            return Err(invalid(&context, "at least one payer is required"));
        }
        for (name, amount) in map {
            ensure_positive(&context, name, *amount, "paid")?;
        }
    }
    if let Payers::Single(name) = &payers {
        if name.trim().is_empty() {
            return Err(invalid(&context, "payer name cannot be blank"));
        }
    }
    if let Some(split) = &split {
        if split.is_empty() {
            return Err(invalid(&context, "split must name at least one person"));
        }
        for (name, amount) in split {
            ensure_non_negative(&context, name, *amount)?;
        }
    }
    match (&split, &involved) {
        (Some(_), Some(_)) | (None, None) => {
            return Err(invalid(
                &context,
                "specify either an explicit split or the people involved",
            ))
        }
        _ => {}
    }
    if let Some(total) = total {
        if !total.is_finite() || total <= 0.0 {
            return Err(invalid(
                &context,
                format!("total must be a positive amount, got {total}"),
            ));
        }
    }

    let mut total = total;
    if let Payers::Multiple(map) = &payers {
        let paid_total: f64 = map.values().sum();
        if let Some(stated) = total {
            if (paid_total - stated).abs() > AMOUNT_TOLERANCE {
                return Err(conservation(
                    &context,
                    format!("paid total {paid_total:.2} doesn't match transaction total {stated:.2}"),
                ));
            }
        }
        total = Some(paid_total);
        if let Some(split) = &split {
            let split_total: f64 = split.values().sum();
            if (paid_total - split_total).abs() > AMOUNT_TOLERANCE {
                return Err(conservation(
                    &context,
                    format!("paid total {paid_total:.2} doesn't match split total {split_total:.2}"),
                ));
            }
        }
    }
    if let Some(split) = &split {
        let split_total: f64 = split.values().sum();
        if let Some(stated) = total {
            if (split_total - stated).abs() > AMOUNT_TOLERANCE {
                return Err(conservation(
                    &context,
                    format!(
                        "split total {split_total:.2} doesn't match transaction total {stated:.2}"
                    ),
                ));
            }
        }
        total.get_or_insert(split_total);
    }
    let total = match total {
        Some(total) if total > 0.0 => total,
        _ => return Err(LedgerError::MissingTotal { context }),
    };

    let payers = match payers {
        Payers::Single(name) => BTreeMap::from([(name, total)]),
        Payers::Multiple(map) => map,
    };
    for payer in payers.keys() {
        ensure_member(roster, payer, &context)?;
    }

    let split = match (split, involved) {
        (Some(split), _) => rescale(split, total),
        (None, Some(involvement)) => even_split(roster, &payers, involvement, total, &context)?,
        (None, None) => return Err(invalid(&context, "no split could be derived")),
    };
    for person in split.keys() {
        ensure_member(roster, person, &context)?;
    }

    Ok(Transaction::new(payers, split, comment))
}

/// Scales an explicit split so it sums to exactly `total`.
///
/// Totals were already checked to agree within [`AMOUNT_TOLERANCE`]; this removes the
/// residue so balances across the ledger sum to zero.
fn rescale(split: BTreeMap<String, f64>, total: f64) -> BTreeMap<String, f64> {
    let split_total: f64 = split.values().sum();
    if split_total <= 0.0 || split_total == total {
        return split;
    }
    let factor = total / split_total;
    split
        .into_iter()
        .map(|(name, amount)| (name, amount * factor))
        .collect()
}

/// Expands an [`Involvement`] into an even split of `total`.
///
/// Payers who are involved owe themselves their share, which nets to zero.
fn even_split(
    roster: &[String],
    payers: &BTreeMap<String, f64>,
    involvement: Involvement,
    total: f64,
    context: &str,
) -> Result<BTreeMap<String, f64>> {
    let involved: Vec<String> = match involvement {
        Involvement::All => roster.to_vec(),
        Involvement::AllOthers => roster
            .iter()
            .filter(|name| !payers.contains_key(*name))
            .cloned()
            .collect(),
        Involvement::Named(names) => {
            let mut seen = BTreeSet::new();
            for name in &names {
                if !seen.insert(name.as_str()) {
                    return Err(invalid(
                        context,
                        format!("`{name}` is listed more than once among the people involved"),
                    ));
                }
            }
            names
        }
    };
    if involved.is_empty() {
        return Err(invalid(context, "nobody is involved in this transaction"));
    }
    let share = total / involved.len() as f64;
    Ok(involved.into_iter().map(|name| (name, share)).collect())
}

fn ensure_member(roster: &[String], name: &str, context: &str) -> Result<()> {
    if roster.iter().any(|member| member == name) {
        return Ok(());
    }
    Err(LedgerError::NotAMember {
        name: name.to_string(),
        context: context.to_string(),
        hint: suggestion_hint(roster, name),
    })
}

/// Formats a "did you mean" suffix for the roster name closest to `input`.
pub(crate) fn suggestion_hint(roster: &[String], input: &str) -> String {
    roster
        .iter()
        .map(|member| (levenshtein(member, input), member))
        .min_by_key(|(distance, _)| *distance)
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .map(|(_, best)| format!("; did you mean `{best}`?"))
        .unwrap_or_default()
}

fn ensure_positive(context: &str, name: &str, amount: f64, verb: &str) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(invalid(
            context,
            format!("`{name}` {verb} {amount}; amounts must be positive"),
        ))
    }
}

fn ensure_non_negative(context: &str, name: &str, amount: f64) -> Result<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(invalid(
            context,
            format!("`{name}` owes {amount}; split amounts cannot be negative"),
        ))
    }
}

fn invalid(context: &str, message: impl Into<String>) -> LedgerError {
    LedgerError::InvalidInput {
        context: context.to_string(),
        message: message.into(),
    }
}

fn conservation(context: &str, message: String) -> LedgerError {
    LedgerError::Conservation {
        context: context.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<String> {
        ["Jon", "Sue", "Joe", "Beth", "Jane"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn single_payer_even_split_among_all() {
        let txn = normalize(
            &roster(),
            TransactionRequest::paid_by("Jon")
                .involving(Involvement::All)
                .total(198.13),
        )
        .expect("valid transaction");
        assert_eq!(txn.payers().get("Jon"), Some(&198.13));
        assert_eq!(txn.split().len(), 5);
        for share in txn.split().values() {
            assert!((share - 39.626).abs() < 1e-9);
        }
    }

    #[test]
    fn all_others_excludes_payers() {
        let txn = normalize(
            &roster(),
            TransactionRequest::paid_by("Jane")
                .involving(Involvement::AllOthers)
                .total(55.0),
        )
        .expect("valid transaction");
        assert!(!txn.split().contains_key("Jane"));
        assert_eq!(txn.split().get("Beth"), Some(&13.75));
    }

    #[test]
    fn multiple_payers_supply_the_total() {
        let txn = normalize(
            &roster(),
            TransactionRequest::paid_by([("Joe", 20.0), ("Sue", 35.0)])
                .involving(Involvement::named(["Joe", "Sue", "Jane"])),
        )
        .expect("valid transaction");
        assert!((txn.total_owed() - 55.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_split_sets_total_for_single_payer() {
        let txn = normalize(
            &roster(),
            TransactionRequest::paid_by("Beth").split([("Sue", 12.5), ("Joe", 7.5)]),
        )
        .expect("valid transaction");
        assert_eq!(txn.payers().get("Beth"), Some(&20.0));
    }

    #[test]
    fn both_split_and_involved_is_rejected() {
        let err = normalize(
            &roster(),
            TransactionRequest::paid_by("Jon")
                .split([("Sue", 10.0)])
                .involving(Involvement::All),
        )
        .expect_err("over-specified");
        assert!(matches!(err, LedgerError::InvalidInput { .. }));
    }

    #[test]
    fn neither_split_nor_involved_is_rejected() {
        let err = normalize(&roster(), TransactionRequest::paid_by("Jon").total(10.0))
            .expect_err("under-specified");
        assert!(matches!(err, LedgerError::InvalidInput { .. }));
    }

    #[test]
    fn missing_total_is_its_own_error() {
        let err = normalize(
            &roster(),
            TransactionRequest::paid_by("Jon")
                .involving(Involvement::All)
                .comment("Groceries"),
        )
        .expect_err("no total");
        match err {
            LedgerError::MissingTotal { context } => assert!(context.contains("Groceries")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn paid_total_must_match_stated_total() {
        let err = normalize(
            &roster(),
            TransactionRequest::paid_by([("Joe", 20.0), ("Sue", 35.0)])
                .involving(Involvement::All)
                .total(60.0),
        )
        .expect_err("mismatch");
        assert!(matches!(err, LedgerError::Conservation { .. }));
    }

    #[test]
    fn paid_total_must_match_split_total() {
        let err = normalize(
            &roster(),
            TransactionRequest::paid_by([("Jane", 15.0), ("Beth", 25.0)])
                .split([("Jane", 10.0), ("Beth", 10.0), ("Jon", 10.0)]),
        )
        .expect_err("mismatch");
        assert!(matches!(err, LedgerError::Conservation { .. }));
    }

    #[test]
    fn tiny_rounding_differences_are_tolerated() {
        let txn = normalize(
            &roster(),
            TransactionRequest::paid_by([("Jane", 15.0), ("Beth", 25.0)])
                .split([("Jane", 10.0), ("Beth", 10.0), ("Jon", 20.0004)]),
        )
        .expect("within tolerance");
        assert!((txn.total_owed() - txn.total_paid()).abs() < 1e-9);
    }

    #[test]
    fn unknown_payer_gets_a_suggestion() {
        let err = normalize(
            &roster(),
            TransactionRequest::paid_by("Jonn")
                .involving(Involvement::All)
                .total(10.0),
        )
        .expect_err("unknown payer");
        match err {
            LedgerError::NotAMember { name, hint, .. } => {
                assert_eq!(name, "Jonn");
                assert!(hint.contains("Jon"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_person_in_split_is_rejected() {
        let err = normalize(
            &roster(),
            TransactionRequest::paid_by("Jon")
                .involving(Involvement::named(["Sue", "Bartholomew"]))
                .total(10.0),
        )
        .expect_err("unknown member");
        assert!(matches!(err, LedgerError::NotAMember { .. }));
    }

    #[test]
    fn duplicate_involved_names_are_rejected() {
        let err = normalize(
            &roster(),
            TransactionRequest::paid_by("Jon")
                .involving(Involvement::named(["Sue", "Sue"]))
                .total(10.0),
        )
        .expect_err("duplicate");
        assert!(matches!(err, LedgerError::InvalidInput { .. }));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let err = normalize(
            &roster(),
            TransactionRequest::paid_by([("Jon", -5.0)]).involving(Involvement::All),
        )
        .expect_err("negative payer");
        assert!(matches!(err, LedgerError::InvalidInput { .. }));
    }
}

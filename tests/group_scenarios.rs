mod common;

use common::{assert_close, weekend_group};
use settle_core::{
    ledger::{Group, Involvement, TransactionRequest},
    netting::{ConsolidationStatus, NettingOptions, Payment, SettlementMode},
    LedgerError,
};

#[test]
fn weekend_balances_match_hand_calculation() {
    let group = weekend_group();
    assert_close(group.get_balance("Jon").expect("Jon"), -124.754);
    assert_close(group.get_balance("Sue").expect("Sue"), 68.709_333);
    assert_close(group.get_balance("Joe").expect("Joe"), 51.709_333);
    assert_close(group.get_balance("Beth").expect("Beth"), 6.376);
    assert_close(group.get_balance("Jane").expect("Jane"), -2.040_667);
}

#[test]
fn weekend_balances_sum_to_zero() {
    let group = weekend_group();
    let total: f64 = group.balances().iter().map(|(_, debt)| debt).sum();
    assert!(total.abs() < 1e-4, "balances sum to {total}");
}

#[test]
fn weekend_settlement_reproduces_every_balance() {
    let group = weekend_group();
    let report = group.simplify(None).expect("settled");
    assert_eq!(report.mode, SettlementMode::PeerToPeer);
    assert!(matches!(
        report.consolidation,
        Some(ConsolidationStatus::Consolidated { .. })
    ));
    assert!(report.payments.iter().all(|p| p.from != p.to));
    assert!(report.payments.iter().all(|p| p.amount > 0.0));

    let implied = report.implied_balances(group.names());
    for ((name, expected), got) in group.balances().iter().zip(implied) {
        assert!(
            (expected - got).abs() < 1e-3,
            "{name}: expected {expected}, got {got}"
        );
    }
    let net: f64 = report.implied_balances(group.names()).iter().sum();
    assert!(net.abs() < 1e-6);
}

#[test]
fn weekend_settlement_is_netted() {
    let group = weekend_group();
    let report = group.simplify(None).expect("settled");
    assert_eq!(report.payments.len(), 4, "{:?}", report.payments);

    let expected = [
        ("Sue", "Jon", 68.709_333),
        ("Joe", "Jon", 51.709_333),
        ("Beth", "Jon", 4.335_333),
        ("Beth", "Jane", 2.040_667),
    ];
    for (payment, (from, to, amount)) in report.payments.iter().zip(expected) {
        assert_eq!((payment.from.as_str(), payment.to.as_str()), (from, to));
        assert_close(payment.amount, amount);
    }
}

#[test]
fn nobody_is_paid_and_also_paying() {
    let group = weekend_group();
    let report = group.simplify(None).expect("settled");
    for payment in &report.payments {
        assert!(
            report.payments.iter().all(|other| other.from != payment.to),
            "{} receives from {} but also pays out",
            payment.to,
            payment.from
        );
    }
}

#[test]
fn jane_as_bank_settles_everyone_with_her() {
    let group = weekend_group();
    let report = group.simplify(Some("Jane")).expect("bank settlement");
    assert_eq!(report.mode, SettlementMode::Bank("Jane".into()));
    assert!(report.consolidation.is_none());
    assert_eq!(report.payments.len(), 4);
    assert!(report
        .payments
        .iter()
        .all(|p| (p.from == "Jane") ^ (p.to == "Jane")));

    for payment in &report.payments {
        let person = if payment.from == "Jane" {
            &payment.to
        } else {
            &payment.from
        };
        let debt = group.get_balance(person).expect("member");
        assert_close(payment.amount, debt.abs());
        if debt < 0.0 {
            assert_eq!(payment.from, "Jane");
        } else {
            assert_eq!(payment.to, "Jane");
        }
    }
}

#[test]
fn bank_totals_offset_the_bank_balance() {
    let group = weekend_group();
    for bank in group.names() {
        let report = group.simplify(Some(bank)).expect("bank settlement");
        let bank_owes: f64 = report
            .payments
            .iter()
            .filter(|p| &p.from == bank)
            .map(|p| p.amount)
            .sum();
        let owed_to_bank: f64 = report
            .payments
            .iter()
            .filter(|p| &p.to == bank)
            .map(|p| p.amount)
            .sum();
        let credit = -group.get_balance(bank).expect("member");
        assert_close(bank_owes - owed_to_bank, -credit);
    }
}

#[test]
fn unknown_bank_is_rejected() {
    let group = weekend_group();
    let err = group.simplify(Some("Janet")).expect_err("not a member");
    match err {
        LedgerError::NotAMember { name, hint, .. } => {
            assert_eq!(name, "Janet");
            assert!(hint.contains("Jane"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn greedy_sweep_uses_at_most_n_minus_one_payments() {
    let group = weekend_group();
    let report = group
        .simplify_with(SettlementMode::Greedy, &NettingOptions::default())
        .expect("greedy");
    assert!(report.payments.len() <= group.names().len() - 1);
    // Jon is the biggest creditor and is paid first.
    assert_eq!(report.payments[0].to, "Jon");
    let implied = report.implied_balances(group.names());
    for ((_, expected), got) in group.balances().iter().zip(implied) {
        assert_close(got, *expected);
    }
}

#[test]
fn simplify_twice_gives_identical_results() {
    let group = weekend_group();
    let first = group.simplify(None).expect("first run");
    let second = group.simplify(None).expect("second run");
    assert_eq!(first, second);
}

#[test]
fn shared_creditors_are_consolidated() {
    let mut group = Group::new(["Ann", "Bob", "Cat", "Dan"]).expect("valid group");
    group
        .record_transaction(
            TransactionRequest::paid_by("Cat")
                .involving(Involvement::named(["Ann", "Bob"]))
                .total(100.0),
        )
        .expect("recorded");
    group
        .record_transaction(
            TransactionRequest::paid_by("Dan")
                .involving(Involvement::named(["Ann", "Bob"]))
                .total(100.0),
        )
        .expect("recorded");

    let report = group.simplify(None).expect("settled");
    assert_eq!(
        report.payments,
        vec![Payment::new("Bob", "Cat", 100.0), Payment::new("Ann", "Dan", 100.0)]
    );
    assert_eq!(
        report.consolidation,
        Some(ConsolidationStatus::Consolidated { rotations: 1 })
    );
}

#[test]
fn consolidation_ceiling_still_returns_a_valid_settlement() {
    let mut group = Group::new(["Ann", "Bob", "Cat", "Dan"]).expect("valid group");
    for payer in ["Cat", "Dan"] {
        group
            .record_transaction(
                TransactionRequest::paid_by(payer)
                    .involving(Involvement::named(["Ann", "Bob"]))
                    .total(100.0),
            )
            .expect("recorded");
    }

    let report = group
        .simplify_with(
            SettlementMode::PeerToPeer,
            &NettingOptions {
                consolidation_limit: 0,
            },
        )
        .expect("settled");
    assert_eq!(
        report.consolidation,
        Some(ConsolidationStatus::CeilingReached { rotations: 0 })
    );
    assert_eq!(report.payments.len(), 4);
}

#[test]
fn payment_chain_is_shortened() {
    let mut group = Group::new(["Ann", "Bob", "Cat"]).expect("valid group");
    group
        .record_transaction(
            TransactionRequest::paid_by("Ann")
                .involving(Involvement::named(["Bob"]))
                .total(30.0)
                .comment("Ann covered Bob"),
        )
        .expect("recorded");
    group
        .record_transaction(
            TransactionRequest::paid_by("Bob")
                .involving(Involvement::named(["Cat"]))
                .total(30.0)
                .comment("Bob covered Cat"),
        )
        .expect("recorded");

    let report = group.simplify(None).expect("settled");
    assert_eq!(report.payments, vec![Payment::new("Cat", "Ann", 30.0)]);
}

#[test]
fn empty_group_settles_with_no_payments() {
    let group = Group::new(["Ann", "Bob"]).expect("valid group");
    assert!(group.simplify(None).expect("settled").payments.is_empty());
    assert!(group.simplify(Some("Ann")).expect("bank").payments.is_empty());
}

#[test]
fn conservation_error_never_reaches_the_ledger() {
    let mut group = weekend_group();
    let before = group.transaction_count();
    let err = group
        .record_transaction(
            TransactionRequest::paid_by([("Jane", 15.0), ("Beth", 25.0)])
                .split([("Jane", 10.0), ("Beth", 10.0), ("Jon", 25.0)])
                .comment("Bad dinner maths"),
        )
        .expect_err("sums differ");
    assert!(matches!(err, LedgerError::Conservation { .. }));
    assert!(err.to_string().contains("Bad dinner maths"));
    assert_eq!(group.transaction_count(), before);
    group.simplify(None).expect("ledger still settles");
}

#![allow(dead_code)]

use settle_core::ledger::{Group, Involvement, TransactionRequest};

pub const TOLERANCE: f64 = 1e-3;

/// Five friends, a loan, two dinners and show tickets.
pub fn weekend_group() -> Group {
    let mut group =
        Group::named("Weekend", ["Jon", "Sue", "Joe", "Beth", "Jane"]).expect("valid group");
    group
        .record_transaction(
            TransactionRequest::paid_by("Jon")
                .involving(Involvement::All)
                .total(198.13)
                .comment("Jon's total group expenses"),
        )
        .expect("shared expenses");
    group
        .record_transaction(
            TransactionRequest::paid_by("Beth")
                .involving(Involvement::named(["Sue"]))
                .total(32.0)
                .comment("Beth loaned Sue money"),
        )
        .expect("loan");
    group
        .record_transaction(
            TransactionRequest::paid_by([("Joe", 20.0), ("Sue", 35.0)])
                .involving(Involvement::named(["Joe", "Sue", "Jane"]))
                .comment("Dinner out on Friday"),
        )
        .expect("friday dinner");
    group
        .record_transaction(
            TransactionRequest::paid_by([("Jane", 15.0), ("Beth", 25.0)])
                .split([("Jane", 10.0), ("Beth", 10.0), ("Jon", 20.0)])
                .comment("Dinner out on Saturday"),
        )
        .expect("saturday dinner");
    group
        .record_transaction(
            TransactionRequest::paid_by("Jane")
                .involving(Involvement::AllOthers)
                .total(55.0)
                .comment("Show tickets"),
        )
        .expect("show tickets");
    group
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

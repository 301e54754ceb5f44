use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    normalizer::{self, suggestion_hint, AMOUNT_TOLERANCE},
    transaction::{Transaction, TransactionRequest},
};
use crate::{
    errors::{LedgerError, Result},
    netting::{self, NettingOptions, SettlementMode, SettlementReport},
};

pub(crate) const CURRENT_SCHEMA_VERSION: u8 = 1;
const DEFAULT_GROUP_NAME: &str = "Group";
const MIN_MEMBERS: usize = 2;

/// A fixed group of people sharing expenses, and the expenses they recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    id: Uuid,
    name: String,
    names: Vec<String>,
    #[serde(default)]
    transactions: Vec<Transaction>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default = "Group::schema_version_default")]
    schema_version: u8,
}

impl Group {
    /// Creates a group from an ordered list of unique names.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::named(DEFAULT_GROUP_NAME, names)
    }

    /// Creates a group with a display name.
    pub fn named<I, S>(title: impl Into<String>, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        validate_roster(&names)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: title.into(),
            names,
            transactions: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn schema_version(&self) -> u8 {
        self.schema_version
    }

    pub fn is_member(&self, name: &str) -> bool {
        self.names.iter().any(|member| member == name)
    }

    /// Normalizes `request` and appends it. The group is unchanged on error.
    pub fn record_transaction(&mut self, request: TransactionRequest) -> Result<Uuid> {
        let context = request.context();
        let transaction = normalizer::normalize(&self.names, request).map_err(|err| {
            warn!(%context, error = %err, "transaction rejected");
            err
        })?;
        let id = transaction.id();
        debug!(
            %id,
            payers = transaction.payers().len(),
            owing = transaction.split().len(),
            total = transaction.total_paid(),
            "transaction recorded"
        );
        self.transactions.push(transaction);
        self.touch();
        Ok(id)
    }

    pub fn transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id() == id)
    }

    /// Net debt of `name`: positive when they owe the group, negative when owed.
    pub fn get_balance(&self, name: &str) -> Result<f64> {
        self.ensure_member(name)?;
        Ok(netting::person_balance(&self.transactions, name))
    }

    /// Every member's balance in roster order.
    pub fn balances(&self) -> Vec<(String, f64)> {
        self.names
            .iter()
            .cloned()
            .zip(netting::balances(&self.names, &self.transactions))
            .collect()
    }

    /// Settles the group peer-to-peer, or through `bank` when one is named.
    pub fn simplify(&self, bank: Option<&str>) -> Result<SettlementReport> {
        let mode = match bank {
            Some(bank) => SettlementMode::Bank(bank.to_string()),
            None => SettlementMode::PeerToPeer,
        };
        self.simplify_with(mode, &NettingOptions::default())
    }

    pub fn simplify_with(
        &self,
        mode: SettlementMode,
        options: &NettingOptions,
    ) -> Result<SettlementReport> {
        if let SettlementMode::Bank(bank) = &mode {
            self.ensure_member(bank)?;
        }
        let report = netting::settle(&self.names, &self.transactions, mode, options)?;
        info!(
            group = %self.name,
            mode = %report.mode,
            payments = report.payments.len(),
            "group simplified"
        );
        Ok(report)
    }

    /// Adds a new member to the roster.
    pub fn add_person(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LedgerError::InvalidGroup("names cannot be blank".into()));
        }
        if self.is_member(&name) {
            return Err(LedgerError::InvalidGroup(format!(
                "`{name}` is already in the group"
            )));
        }
        self.names.push(name);
        self.touch();
        Ok(())
    }

    /// Removes a member who takes part in no recorded transaction.
    pub fn remove_person(&mut self, name: &str) -> Result<()> {
        self.ensure_member(name)?;
        if self.transactions.iter().any(|txn| txn.involves(name)) {
            return Err(LedgerError::InvalidGroup(format!(
                "`{name}` appears in recorded transactions"
            )));
        }
        if self.names.len() <= MIN_MEMBERS {
            return Err(LedgerError::InvalidGroup(format!(
                "a group needs at least {MIN_MEMBERS} people"
            )));
        }
        self.names.retain(|member| member != name);
        self.touch();
        Ok(())
    }

    /// Checks the roster rules and that every stored transaction is well formed,
    /// conserves money and only names members.
    pub fn validate(&self) -> Result<()> {
        validate_roster(&self.names)?;
        for txn in &self.transactions {
            validate_stored(txn)?;
            if let Some(stranger) = txn.participants().find(|name| !self.is_member(name)) {
                return Err(LedgerError::Integrity(format!(
                    "transaction {} references `{stranger}` who is not in the group",
                    txn.id()
                )));
            }
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }

    fn ensure_member(&self, name: &str) -> Result<()> {
        if self.is_member(name) {
            Ok(())
        } else {
            Err(LedgerError::NotAMember {
                name: name.to_string(),
                context: format!("group {}", self.name),
                hint: suggestion_hint(&self.names, name),
            })
        }
    }
}

/// Re-checks a transaction that bypassed the normalizer, e.g. one read from disk.
fn validate_stored(txn: &Transaction) -> Result<()> {
    let context = match txn.comment().map(str::trim) {
        Some(comment) if !comment.is_empty() => format!("comment: {comment}"),
        _ => format!("transaction {}", txn.id()),
    };
    if txn.payers().is_empty() || txn.split().is_empty() {
        return Err(LedgerError::InvalidGroup(format!(
            "{context} needs at least one payer and one person owing"
        )));
    }
    if let Some((name, amount)) = txn
        .payers()
        .iter()
        .find(|(_, amount)| !amount.is_finite() || **amount <= 0.0)
    {
        return Err(LedgerError::InvalidGroup(format!(
            "{context}: `{name}` paid {amount}; amounts must be positive"
        )));
    }
    if let Some((name, amount)) = txn
        .split()
        .iter()
        .find(|(_, amount)| !amount.is_finite() || **amount < 0.0)
    {
        return Err(LedgerError::InvalidGroup(format!(
            "{context}: `{name}` owes {amount}; split amounts cannot be negative"
        )));
    }
    let (paid, owed) = (txn.total_paid(), txn.total_owed());
    if (paid - owed).abs() > AMOUNT_TOLERANCE {
        warn!(%context, paid, owed, "stored transaction does not conserve money");
        return Err(LedgerError::Conservation {
            context,
            message: format!("paid total {paid:.2} doesn't match split total {owed:.2}"),
        });
    }
    Ok(())
}

fn validate_roster(names: &[String]) -> Result<()> {
    if names.len() < MIN_MEMBERS {
        return Err(LedgerError::InvalidGroup(format!(
            "a group needs at least {MIN_MEMBERS} people, got {}",
            names.len()
        )));
    }
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(LedgerError::InvalidGroup("names cannot be blank".into()));
        }
        if !seen.insert(name.as_str()) {
            return Err(LedgerError::InvalidGroup(format!(
                "`{name}` is listed more than once"
            )));
        }
    }
    Ok(())
}

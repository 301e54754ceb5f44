use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A normalized expense: who paid how much and who owes how much.
///
/// Stored transactions are never mutated. The sum of `payers` always matches the
/// sum of `split` within the ledger tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: Uuid,
    payers: BTreeMap<String, f64>,
    split: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl Transaction {
    pub(crate) fn new(
        payers: BTreeMap<String, f64>,
        split: BTreeMap<String, f64>,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            payers,
            split,
            comment,
            recorded_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn payers(&self) -> &BTreeMap<String, f64> {
        &self.payers
    }

    pub fn split(&self) -> &BTreeMap<String, f64> {
        &self.split
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn total_paid(&self) -> f64 {
        self.payers.values().sum()
    }

    pub fn total_owed(&self) -> f64 {
        self.split.values().sum()
    }

    /// Amount paid minus amount owed for `name` in this transaction.
    pub fn contribution_of(&self, name: &str) -> f64 {
        self.payers.get(name).copied().unwrap_or(0.0) - self.split.get(name).copied().unwrap_or(0.0)
    }

    /// Every person named by this transaction, payers first.
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.payers
            .keys()
            .chain(self.split.keys())
            .map(String::as_str)
    }

    pub fn involves(&self, name: &str) -> bool {
        self.payers.contains_key(name) || self.split.contains_key(name)
    }
}

/// Who paid for an expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payers {
    /// One person covered the whole total.
    Single(String),
    /// Several people each covered part of it.
    Multiple(BTreeMap<String, f64>),
}

impl From<&str> for Payers {
    fn from(name: &str) -> Self {
        Payers::Single(name.to_string())
    }
}

impl From<String> for Payers {
    fn from(name: String) -> Self {
        Payers::Single(name)
    }
}

impl<const N: usize> From<[(&str, f64); N]> for Payers {
    fn from(entries: [(&str, f64); N]) -> Self {
        Payers::Multiple(
            entries
                .into_iter()
                .map(|(name, amount)| (name.to_string(), amount))
                .collect(),
        )
    }
}

/// Shorthand for the people sharing an evenly split expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InvolvementRepr", into = "InvolvementRepr")]
pub enum Involvement {
    /// Every member of the group, payers included.
    All,
    /// Every member except the payers.
    AllOthers,
    /// An explicit list of members.
    Named(Vec<String>),
}

impl Involvement {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Involvement::Named(names.into_iter().map(Into::into).collect())
    }
}

const KEYWORD_ALL: &str = "all";
const KEYWORD_ALL_OTHERS: &str = "all others";

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum InvolvementRepr {
    Keyword(String),
    Names(Vec<String>),
}

impl TryFrom<InvolvementRepr> for Involvement {
    type Error = String;

    fn try_from(repr: InvolvementRepr) -> Result<Self, Self::Error> {
        match repr {
            InvolvementRepr::Keyword(keyword) => match keyword.trim() {
                KEYWORD_ALL => Ok(Involvement::All),
                KEYWORD_ALL_OTHERS => Ok(Involvement::AllOthers),
                other => Err(format!(
                    "involved must be `{KEYWORD_ALL}`, `{KEYWORD_ALL_OTHERS}` or a list of names, got `{other}`"
                )),
            },
            InvolvementRepr::Names(names) => Ok(Involvement::Named(names)),
        }
    }
}

impl From<Involvement> for InvolvementRepr {
    fn from(involvement: Involvement) -> Self {
        match involvement {
            Involvement::All => InvolvementRepr::Keyword(KEYWORD_ALL.into()),
            Involvement::AllOthers => InvolvementRepr::Keyword(KEYWORD_ALL_OTHERS.into()),
            Involvement::Named(names) => InvolvementRepr::Names(names),
        }
    }
}

/// A raw expense description as entered by a caller, before normalization.
///
/// Exactly one of `split` or `involved` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub payers: Payers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub involved: Option<Involvement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl TransactionRequest {
    pub fn paid_by(payers: impl Into<Payers>) -> Self {
        Self {
            payers: payers.into(),
            split: None,
            involved: None,
            total: None,
            comment: None,
        }
    }

    pub fn involving(mut self, involved: Involvement) -> Self {
        self.involved = Some(involved);
        self
    }

    pub fn split<I, S>(mut self, shares: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.split = Some(
            shares
                .into_iter()
                .map(|(name, amount)| (name.into(), amount))
                .collect(),
        );
        self
    }

    pub fn total(mut self, total: f64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Label used in error messages to point at the offending transaction.
    pub fn context(&self) -> String {
        match self.comment.as_deref().map(str::trim) {
            Some(comment) if !comment.is_empty() => format!("comment: {comment}"),
            _ => "<no comment>".to_string(),
        }
    }
}

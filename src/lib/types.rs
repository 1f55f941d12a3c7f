use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Label used by callers to mean "every lobby".
pub const ALL_LOBBIES: &str = "All Lobbies";

#[derive(Default, Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SfaId(String);

impl SfaId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SfaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonetaryAmount(Decimal);

impl MonetaryAmount {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Parses a currency formatted amount such as `₹1,234.50`.
    ///
    /// The rupee sign, thousands separators and surrounding whitespace are
    /// stripped. What remains must be plain digits with at most one `.` and an
    /// optional leading `-`; anything else yields `None`, with no fallback to
    /// zero.
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| *c != '₹' && *c != ',' && !c.is_whitespace())
            .collect();
        if !is_plain_number(&cleaned) {
            return None;
        }
        Decimal::from_str(&cleaned).ok().map(Self)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

fn is_plain_number(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    unsigned.chars().any(|c| c.is_ascii_digit())
        && unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
        && unsigned.matches('.').count() <= 1
}

impl fmt::Display for MonetaryAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Month token used in partition keys. September is `sept`, not `sep`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sept,
    Oct,
    Nov,
    Dec,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sept,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Month::Jan => "jan",
            Month::Feb => "feb",
            Month::Mar => "mar",
            Month::Apr => "apr",
            Month::May => "may",
            Month::Jun => "jun",
            Month::Jul => "jul",
            Month::Aug => "aug",
            Month::Sept => "sept",
            Month::Oct => "oct",
            Month::Nov => "nov",
            Month::Dec => "dec",
        }
    }

    /// Calendar month number, 1 based.
    pub fn from_number(number: u32) -> Option<Month> {
        let idx = usize::try_from(number).ok()?.checked_sub(1)?;
        Month::ALL.get(idx).copied()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Month::ALL
            .into_iter()
            .find(|m| m.token() == wanted)
            .ok_or_else(|| format!("unknown month token `{}`", s))
    }
}

/// Storage scope for one import batch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    pub month: Month,
    pub year: String,
}

impl PartitionKey {
    pub fn new(month: Month, year: impl Into<String>) -> Self {
        Self {
            month,
            year: year.into(),
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.month, self.year)
    }
}

/// Document id of a stored transaction, `{sfaId}_{DD}{YYYY}`. Further manual
/// entries for the same day get a `_2`, `_3`, ... suffix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocKey(String);

impl DocKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One payment row read from an import CSV.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentRecord {
    pub sr_no: u32,
    pub pay_date: String,
    pub lobby: String,
    pub sfa_id: SfaId,
    pub name: String,
    pub cms_id: String,
    pub receiver: String,
    pub amount: MonetaryAmount,
    pub payment_mode: String,
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub sfa_id: SfaId,
    pub lobby: String,
    pub amount: MonetaryAmount,
    pub date: String,
    pub mode: String,
    pub remarks: String,
    pub receiver: String,
    pub month: Month,
    pub year: String,
    /// Assigned by the store when the write is committed.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl StoredTransaction {
    pub fn partition(&self) -> PartitionKey {
        PartitionKey::new(self.month, self.year.clone())
    }
}

/// A transaction together with the document key it is written under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionWrite {
    pub key: DocKey,
    pub transaction: StoredTransaction,
}

/// Member document from the users collection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub sfa_id: SfaId,
    #[serde(default)]
    pub cms_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub lobby_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub emergency_number: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LobbyFilter {
    All,
    Lobby(String),
}

impl LobbyFilter {
    pub fn label(&self) -> &str {
        match self {
            LobbyFilter::All => ALL_LOBBIES,
            LobbyFilter::Lobby(name) => name,
        }
    }

    pub fn matches(&self, lobby: &str) -> bool {
        match self {
            LobbyFilter::All => true,
            LobbyFilter::Lobby(name) => name == lobby,
        }
    }
}

impl From<&str> for LobbyFilter {
    fn from(value: &str) -> Self {
        if value == ALL_LOBBIES {
            LobbyFilter::All
        } else {
            LobbyFilter::Lobby(value.to_string())
        }
    }
}

/// Denormalised payment row shown in lobby reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LobbyReportRow {
    pub sr_no: usize,
    pub pay_date: String,
    pub lobby: String,
    pub sfa_id: SfaId,
    pub name: String,
    pub cms_id: String,
    pub receiver: String,
    pub amount: MonetaryAmount,
    pub payment_mode: String,
    pub remarks: String,
}

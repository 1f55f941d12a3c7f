use std::{cmp::Reverse, slice};

use chrono::NaiveDate;
use tracing::debug;

use crate::error::PipelineError;
use crate::store::{DocumentStore, TransactionQuery};
use crate::types::{SfaId, StoredTransaction, UserRecord};

/// Finds a member by SFA id, falling back to CMS id.
///
/// The id is trimmed and upper-cased before either lookup. A blank id finds
/// nobody.
pub fn find_member<S: DocumentStore>(
    store: &S,
    id: &str,
) -> Result<Option<UserRecord>, PipelineError> {
    let id = id.trim().to_uppercase();
    if id.is_empty() {
        return Ok(None);
    }

    let sfa_id = SfaId::new(id.as_str());
    if let Some(user) = store.get_users(slice::from_ref(&sfa_id))?.into_iter().next() {
        return Ok(Some(user));
    }

    let by_cms_id = store
        .list_users()?
        .into_iter()
        .find(|user| user.cms_id.eq_ignore_ascii_case(&id));
    debug!(id = %id, found = by_cms_id.is_some(), "member not found by sfa id, tried cms id");
    Ok(by_cms_id)
}

fn pay_date(tx: &StoredTransaction) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&tx.date, "%d-%b-%Y").ok()
}

/// Every payment made by `sfa_id`, newest pay date first.
///
/// Payments on the same day are ordered by when they were stored, newest
/// first. Unreadable dates sort last.
pub fn payment_history<S: DocumentStore>(
    store: &S,
    sfa_id: &SfaId,
) -> Result<Vec<StoredTransaction>, PipelineError> {
    let mut history = store.query_transactions(&TransactionQuery::for_member(sfa_id.clone()))?;
    history.sort_by_key(|tx| Reverse((pay_date(tx), tx.created_at)));
    debug!(%sfa_id, payments = history.len(), "loaded payment history");
    Ok(history)
}

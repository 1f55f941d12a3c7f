use std::slice;

use chrono::NaiveDate;
use tracing::info;

use crate::error::PipelineError;
use crate::partition::{derive_partition, document_key, format_pay_date};
use crate::store::DocumentStore;
use crate::types::{
    DocKey, MonetaryAmount, PartitionKey, SfaId, StoredTransaction, TransactionWrite,
};

/// A payment entered by hand rather than imported.
#[derive(Debug, Clone, Default)]
pub struct PaymentForm {
    pub amount: String,
    pub collector_name: String,
    pub mode: String,
    pub description: String,
}

fn required(field: &'static str, value: &str) -> Result<(), PipelineError> {
    if value.trim().is_empty() {
        return Err(PipelineError::validation(field, "is required"));
    }
    Ok(())
}

/// Checks the form without touching the store and returns the amount.
pub fn validate_form(form: &PaymentForm) -> Result<MonetaryAmount, PipelineError> {
    required("amount", &form.amount)?;
    required("collector_name", &form.collector_name)?;
    required("mode", &form.mode)?;

    match MonetaryAmount::parse(&form.amount) {
        Some(amount) if amount.is_positive() => Ok(amount),
        _ => Err(PipelineError::validation(
            "amount",
            format!("`{}` is not a valid amount", form.amount.trim()),
        )),
    }
}

/// First key not yet taken in `partition`: `base` itself, then `base_2`,
/// `base_3` and so on.
fn unused_key<S: DocumentStore>(
    store: &S,
    partition: &PartitionKey,
    base: DocKey,
) -> Result<DocKey, PipelineError> {
    if !store.contains_transaction(partition, &base)? {
        return Ok(base);
    }
    let mut n: usize = 2;
    loop {
        let candidate = DocKey::new(format!("{}_{}", base, n));
        if !store.contains_transaction(partition, &candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Records one payment for `sfa_id`, dated `today`.
///
/// The member must exist; their lobby is copied onto the payment and the
/// collector becomes the receiver. Every call stores a new document, so
/// neither an earlier entry nor an imported payment for the same day is
/// replaced.
pub fn record_payment<S: DocumentStore>(
    store: &mut S,
    sfa_id: &SfaId,
    form: &PaymentForm,
    today: NaiveDate,
) -> Result<DocKey, PipelineError> {
    let amount = validate_form(form)?;

    let member = store
        .get_users(slice::from_ref(sfa_id))?
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::validation("sfa_id", format!("no member `{}`", sfa_id)))?;

    let date = format_pay_date(today);
    let partition = derive_partition(&date, today);
    let key = unused_key(store, &partition, document_key(sfa_id, &date))?;
    let transaction = StoredTransaction {
        sfa_id: sfa_id.clone(),
        lobby: member.lobby_id,
        amount,
        date,
        mode: form.mode.trim().to_string(),
        remarks: form.description.trim().to_string(),
        receiver: form.collector_name.trim().to_string(),
        month: partition.month,
        year: partition.year,
        created_at: None,
    };

    store.commit_transactions(vec![TransactionWrite {
        key: key.clone(),
        transaction,
    }])?;
    info!(%sfa_id, %key, %amount, "recorded payment");
    Ok(key)
}

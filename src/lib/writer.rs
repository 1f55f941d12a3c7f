use std::num::NonZeroUsize;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, StoreError};
use crate::io::{parse_members, parse_payments};
use crate::partition::{derive_partition_now, document_key};
use crate::store::DocumentStore;
use crate::types::{PartitionKey, PaymentRecord, StoredTransaction, TransactionWrite};

/// Result of a chunked import. On failure `imported_count` is the number of
/// records committed by the chunks before the failing one.
#[derive(Debug)]
pub struct ImportOutcome {
    pub success: bool,
    pub imported_count: usize,
    pub error: Option<PipelineError>,
}

impl ImportOutcome {
    fn succeeded(imported_count: usize) -> Self {
        Self {
            success: true,
            imported_count,
            error: None,
        }
    }

    fn failed(imported_count: usize, error: PipelineError) -> Self {
        Self {
            success: false,
            imported_count,
            error: Some(error),
        }
    }
}

/// Commits `records` in contiguous chunks of at most `chunk_size`, one
/// chunk at a time. Stops at the first failed chunk; earlier chunks stay
/// committed and later ones are never attempted.
pub fn write_in_chunks<T, F>(records: &[T], chunk_size: NonZeroUsize, mut commit: F) -> ImportOutcome
where
    F: FnMut(&[T]) -> Result<(), StoreError>,
{
    let mut imported_count = 0;
    for (idx, chunk) in records.chunks(chunk_size.get()).enumerate() {
        let chunk_no = idx + 1;
        debug!(chunk = chunk_no, size = chunk.len(), "committing chunk");
        if let Err(source) = commit(chunk) {
            warn!(chunk = chunk_no, imported = imported_count, error = %source, "chunk commit failed");
            return ImportOutcome::failed(
                imported_count,
                PipelineError::Write {
                    imported: imported_count,
                    chunk: chunk_no,
                    source,
                },
            );
        }
        imported_count += chunk.len();
    }
    ImportOutcome::succeeded(imported_count)
}

/// Partition for a whole import, taken from the first record's pay date.
pub fn import_partition(records: &[PaymentRecord]) -> PartitionKey {
    let first_date = records.first().map_or("", |r| r.pay_date.as_str());
    derive_partition_now(first_date)
}

fn to_write(record: &PaymentRecord, partition: &PartitionKey) -> TransactionWrite {
    TransactionWrite {
        key: document_key(&record.sfa_id, &record.pay_date),
        transaction: StoredTransaction {
            sfa_id: record.sfa_id.clone(),
            lobby: record.lobby.clone(),
            amount: record.amount,
            date: record.pay_date.clone(),
            mode: record.payment_mode.clone(),
            remarks: record.remarks.clone().unwrap_or_default(),
            receiver: record.receiver.clone(),
            month: partition.month,
            year: partition.year.clone(),
            created_at: None,
        },
    }
}

/// Writes already parsed payments into one partition.
///
/// Every record lands in `partition` whatever its own pay date says, so the
/// input is expected to be a single month's batch.
pub fn write_payments<S: DocumentStore>(
    store: &mut S,
    records: &[PaymentRecord],
    partition: &PartitionKey,
    chunk_size: NonZeroUsize,
) -> ImportOutcome {
    info!(records = records.len(), %partition, "importing payments");
    let outcome = write_in_chunks(records, chunk_size, |chunk| {
        store.commit_transactions(chunk.iter().map(|r| to_write(r, partition)).collect())
    });
    info!(imported = outcome.imported_count, success = outcome.success, "payment import finished");
    outcome
}

/// Parses a payment CSV and writes it in chunks.
///
/// A malformed row fails the call before anything is written.
pub fn import_payments<S: DocumentStore>(
    store: &mut S,
    csv_text: &str,
    config: &PipelineConfig,
) -> Result<ImportOutcome, PipelineError> {
    let records = parse_payments(csv_text)?;
    let partition = import_partition(&records);
    Ok(write_payments(store, &records, &partition, config.chunk_size))
}

/// Parses a member CSV and writes it to the users collection in chunks.
pub fn import_members<S: DocumentStore>(
    store: &mut S,
    csv_text: &str,
    config: &PipelineConfig,
) -> Result<ImportOutcome, PipelineError> {
    let users = parse_members(csv_text)?;
    info!(records = users.len(), "importing members");
    let outcome = write_in_chunks(&users, config.chunk_size, |chunk| {
        store.commit_users(chunk.to_vec())
    });
    info!(imported = outcome.imported_count, success = outcome.success, "member import finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::{import_partition, write_in_chunks};
    use crate::error::{PipelineError, StoreError};
    use crate::types::{MonetaryAmount, Month, PaymentRecord, SfaId};

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn rejected() -> StoreError {
        StoreError::InvalidKey("boom".into())
    }

    fn record(pay_date: &str) -> PaymentRecord {
        PaymentRecord {
            sr_no: 1,
            pay_date: pay_date.into(),
            lobby: "DLI".into(),
            sfa_id: SfaId::new("SFA1"),
            name: "Asha".into(),
            cms_id: "CMS1".into(),
            receiver: "Ravi".into(),
            amount: MonetaryAmount::default(),
            payment_mode: "UPI".into(),
            remarks: None,
        }
    }

    #[test]
    fn twelve_hundred_records_take_three_commits() {
        let records: Vec<u32> = (0..1200).collect();
        let mut commits = Vec::new();

        let sut = write_in_chunks(&records, size(500), |chunk| {
            commits.push(chunk.len());
            Ok(())
        });

        assert_eq!(commits, vec![500, 500, 200]);
        assert!(sut.success);
        assert_eq!(sut.imported_count, 1200);
        assert!(sut.error.is_none());
    }

    #[test]
    fn failed_second_chunk_stops_the_import() {
        let records: Vec<u32> = (0..1200).collect();
        let mut attempts = 0;

        let sut = write_in_chunks(&records, size(500), |_| {
            attempts += 1;
            if attempts == 2 {
                Err(rejected())
            } else {
                Ok(())
            }
        });

        assert_eq!(attempts, 2);
        assert!(!sut.success);
        assert_eq!(sut.imported_count, 500);
        assert!(matches!(
            sut.error,
            Some(PipelineError::Write {
                imported: 500,
                chunk: 2,
                ..
            })
        ));
    }

    #[test]
    fn chunks_preserve_record_order() {
        let records: Vec<u32> = (0..7).collect();
        let mut seen = Vec::new();
        write_in_chunks(&records, size(3), |chunk| {
            seen.extend_from_slice(chunk);
            Ok(())
        });
        assert_eq!(seen, records);
    }

    #[test]
    fn empty_input_commits_nothing() {
        let mut attempts = 0;
        let sut = write_in_chunks::<u32, _>(&[], size(500), |_| {
            attempts += 1;
            Ok(())
        });
        assert_eq!(attempts, 0);
        assert!(sut.success);
        assert_eq!(sut.imported_count, 0);
    }

    #[test]
    fn partition_comes_from_the_first_record_only() {
        let records = vec![record("14-Sep-2025"), record("01-Oct-2025")];
        let sut = import_partition(&records);
        assert_eq!(sut.month, Month::Sept);
        assert_eq!(sut.year, "2025");
    }
}

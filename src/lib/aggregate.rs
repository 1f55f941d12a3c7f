use std::num::NonZeroUsize;

use im::{HashMap, HashSet};
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::store::{DocumentStore, TransactionQuery};
use crate::types::{LobbyFilter, LobbyReportRow, SfaId, StoredTransaction, UserRecord};
use crate::utils::OrDefault;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_CMS_ID: &str = "-";

/// Name and CMS id shown for a payer. Defaults to the placeholders used when
/// the payer has no user record.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ResolvedMember {
    name: String,
    cms_id: String,
}

impl Default for ResolvedMember {
    fn default() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            cms_id: UNKNOWN_CMS_ID.to_string(),
        }
    }
}

fn or_placeholder(value: String, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        value
    }
}

/// Blank fields on the record fall back to the same placeholders.
impl From<UserRecord> for ResolvedMember {
    fn from(user: UserRecord) -> Self {
        Self {
            name: or_placeholder(user.full_name, UNKNOWN_NAME),
            cms_id: or_placeholder(user.cms_id, UNKNOWN_CMS_ID),
        }
    }
}

/// Payer ids in first-seen order, without repeats or blanks.
fn distinct_sfa_ids(transactions: &[StoredTransaction]) -> Vec<SfaId> {
    let mut seen = HashSet::new();
    transactions
        .iter()
        .map(|tx| &tx.sfa_id)
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert((*id).clone()).is_none())
        .cloned()
        .collect()
}

/// One store read per `lookup_batch` distinct payers.
fn resolve_members<S: DocumentStore>(
    store: &S,
    transactions: &[StoredTransaction],
    lookup_batch: NonZeroUsize,
) -> Result<HashMap<SfaId, ResolvedMember>, PipelineError> {
    let ids = distinct_sfa_ids(transactions);
    ids.chunks(lookup_batch.get())
        .try_fold(HashMap::new(), |acc, group| -> Result<_, PipelineError> {
            let found = store.get_users(group)?;
            debug!(requested = group.len(), found = found.len(), "resolved member batch");
            Ok(found
                .into_iter()
                .fold(acc, |members, user| {
                    members.update(user.sfa_id.clone(), ResolvedMember::from(user))
                }))
        })
}

fn join_rows(
    transactions: Vec<StoredTransaction>,
    members: &HashMap<SfaId, ResolvedMember>,
    filter: &LobbyFilter,
) -> Vec<LobbyReportRow> {
    transactions
        .into_iter()
        .enumerate()
        .map(|(idx, tx)| {
            let member = members.get_or_default(&tx.sfa_id);
            let lobby = if tx.lobby.is_empty() {
                filter.label().to_string()
            } else {
                tx.lobby
            };
            LobbyReportRow {
                sr_no: idx + 1,
                pay_date: tx.date,
                lobby,
                sfa_id: tx.sfa_id,
                name: member.name,
                cms_id: member.cms_id,
                receiver: tx.receiver,
                amount: tx.amount,
                payment_mode: tx.mode,
                remarks: tx.remarks,
            }
        })
        .collect()
}

/// Builds the lobby payment report for `query`.
///
/// Rows keep the order the store returned them in and are numbered from 1.
/// Payers are resolved in batches of `lookup_batch` ids, so R rows over D
/// distinct payers cost 1 + ceil(D / lookup_batch) reads.
pub fn load_lobby_data<S: DocumentStore>(
    store: &S,
    query: &TransactionQuery,
    lookup_batch: NonZeroUsize,
) -> Result<Vec<LobbyReportRow>, PipelineError> {
    let transactions = store.query_transactions(query)?;
    let members = resolve_members(store, &transactions, lookup_batch)?;
    let rows = join_rows(transactions, &members, &query.lobby);
    info!(
        lobby = query.lobby.label(),
        rows = rows.len(),
        resolved = members.len(),
        "built lobby report"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, num::NonZeroUsize, str::FromStr};

    use rust_decimal::Decimal;

    use super::load_lobby_data;
    use crate::error::StoreError;
    use crate::store::{DocumentStore, MemoryStore, TransactionQuery};
    use crate::types::{
        DocKey, LobbyFilter, MonetaryAmount, Month, PartitionKey, SfaId, StoredTransaction,
        TransactionWrite, UserRecord,
    };

    /// Counts user lookups made against the wrapped store.
    struct CountingStore {
        inner: MemoryStore,
        lookups: RefCell<Vec<usize>>,
    }

    impl DocumentStore for CountingStore {
        fn commit_transactions(&mut self, writes: Vec<TransactionWrite>) -> Result<(), StoreError> {
            self.inner.commit_transactions(writes)
        }

        fn commit_users(&mut self, users: Vec<UserRecord>) -> Result<(), StoreError> {
            self.inner.commit_users(users)
        }

        fn query_transactions(
            &self,
            query: &TransactionQuery,
        ) -> Result<Vec<StoredTransaction>, StoreError> {
            self.inner.query_transactions(query)
        }

        fn contains_transaction(
            &self,
            partition: &PartitionKey,
            key: &DocKey,
        ) -> Result<bool, StoreError> {
            self.inner.contains_transaction(partition, key)
        }

        fn get_users(&self, sfa_ids: &[SfaId]) -> Result<Vec<UserRecord>, StoreError> {
            self.lookups.borrow_mut().push(sfa_ids.len());
            self.inner.get_users(sfa_ids)
        }

        fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
            self.inner.list_users()
        }
    }

    fn ten() -> NonZeroUsize {
        NonZeroUsize::new(10).unwrap()
    }

    fn write(sfa_id: &str, day: u32, lobby: &str, month: Month) -> TransactionWrite {
        let date = format!("{:02}-Jan-2025", day);
        TransactionWrite {
            key: DocKey::new(format!("{}_{}{}", sfa_id, day, lobby)),
            transaction: StoredTransaction {
                sfa_id: SfaId::new(sfa_id),
                lobby: lobby.into(),
                amount: MonetaryAmount::new(Decimal::from_str("100.00").unwrap()),
                date,
                mode: "UPI".into(),
                remarks: String::new(),
                receiver: "Ravi".into(),
                month,
                year: "2025".into(),
                created_at: None,
            },
        }
    }

    fn user(sfa_id: &str, name: &str) -> UserRecord {
        UserRecord {
            sfa_id: SfaId::new(sfa_id),
            full_name: name.into(),
            cms_id: format!("CMS-{}", sfa_id),
            ..UserRecord::default()
        }
    }

    fn store_with(writes: Vec<TransactionWrite>, users: Vec<UserRecord>) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.commit_transactions(writes).unwrap();
        store.commit_users(users).unwrap();
        store
    }

    #[test]
    fn unknown_payer_gets_placeholders() {
        let store = store_with(vec![write("S9", 1, "DLI", Month::Jan)], vec![]);
        let sut = load_lobby_data(&store, &TransactionQuery::new(LobbyFilter::All), ten()).unwrap();
        assert_eq!(sut[0].name, "Unknown");
        assert_eq!(sut[0].cms_id, "-");
    }

    #[test]
    fn blank_member_fields_get_placeholders() {
        let store = store_with(
            vec![write("S1", 1, "DLI", Month::Jan)],
            vec![UserRecord {
                sfa_id: SfaId::new("S1"),
                full_name: "  ".into(),
                ..UserRecord::default()
            }],
        );
        let sut = load_lobby_data(&store, &TransactionQuery::new(LobbyFilter::All), ten()).unwrap();
        assert_eq!(sut[0].name, "Unknown");
        assert_eq!(sut[0].cms_id, "-");
    }

    #[test]
    fn known_payer_is_resolved() {
        let store = store_with(
            vec![write("S1", 1, "DLI", Month::Jan)],
            vec![user("S1", "Asha Rao")],
        );
        let sut = load_lobby_data(&store, &TransactionQuery::new(LobbyFilter::All), ten()).unwrap();
        assert_eq!(sut[0].name, "Asha Rao");
        assert_eq!(sut[0].cms_id, "CMS-S1");
        assert_eq!(sut[0].pay_date, "01-Jan-2025");
    }

    #[test]
    fn rows_are_renumbered_in_store_order() {
        let store = store_with(
            vec![
                write("S1", 1, "DLI", Month::Jan),
                write("S2", 2, "ROK", Month::Jan),
                write("S3", 3, "DLI", Month::Jan),
            ],
            vec![],
        );
        let query = TransactionQuery::new(LobbyFilter::from("DLI"));
        let sut = load_lobby_data(&store, &query, ten()).unwrap();
        let ids: Vec<(usize, &str)> = sut.iter().map(|r| (r.sr_no, r.sfa_id.value())).collect();
        assert_eq!(ids, vec![(1, "S1"), (2, "S3")]);
    }

    #[test]
    fn row_count_follows_the_filter_not_the_store_size() {
        let mut writes = Vec::new();
        for day in 1..=20 {
            writes.push(write(&format!("S{}", day), day, "DLI", Month::Jan));
            writes.push(write(&format!("S{}", day), day, "DLI", Month::Feb));
            writes.push(write(&format!("S{}", day), day, "ROK", Month::Jan));
        }
        let store = store_with(writes, vec![]);
        let query = TransactionQuery::new(LobbyFilter::from("DLI"))
            .in_month(Month::Jan)
            .in_year("2025");
        assert_eq!(load_lobby_data(&store, &query, ten()).unwrap().len(), 20);
    }

    #[test]
    fn lookups_are_batched_over_distinct_payers() {
        let writes: Vec<TransactionWrite> = (1..=25)
            .flat_map(|n| {
                let id = format!("S{}", n);
                vec![
                    write(&id, 1, "DLI", Month::Jan),
                    write(&id, 2, "DLI", Month::Jan),
                ]
            })
            .collect();
        let store = CountingStore {
            inner: store_with(writes, vec![user("S1", "Asha")]),
            lookups: RefCell::new(Vec::new()),
        };

        let sut = load_lobby_data(&store, &TransactionQuery::new(LobbyFilter::All), ten()).unwrap();

        assert_eq!(sut.len(), 50);
        assert_eq!(*store.lookups.borrow(), vec![10, 10, 5]);
        assert_eq!(sut.iter().filter(|r| r.name == "Asha").count(), 2);
    }

    #[test]
    fn blank_lobby_takes_the_filter_label() {
        let store = store_with(vec![write("S1", 1, "", Month::Jan)], vec![]);
        let sut = load_lobby_data(&store, &TransactionQuery::new(LobbyFilter::All), ten()).unwrap();
        assert_eq!(sut[0].lobby, "All Lobbies");
    }
}

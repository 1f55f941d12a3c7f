mod aggregate;
mod config;
mod error;
mod export;
mod io;
mod members;
mod partition;
mod payments;
mod store;
mod types;
mod utils;
mod writer;

pub use aggregate::{load_lobby_data, UNKNOWN_CMS_ID, UNKNOWN_NAME};
pub use config::{PipelineConfig, DEFAULT_CHUNK_SIZE, DEFAULT_LOOKUP_BATCH};
pub use error::{PipelineError, StoreError};
pub use export::{
    export_lobby_report, export_members, members_filename, report_filename, save_export,
    ExportFile,
};
pub use io::{
    output_members_csv, output_report_csv, parse_members, parse_payments, parse_report,
    MEMBER_HEADERS, REPORT_HEADERS,
};
pub use members::{find_member, payment_history};
pub use partition::{
    date_digits, derive_partition, derive_partition_now, document_key, format_pay_date,
    today_partition,
};
pub use payments::{record_payment, validate_form, PaymentForm};
pub use store::{DocumentStore, JsonFileStore, MemoryStore, TransactionQuery, MAX_BATCH_WRITES};
pub use types::{
    DocKey, LobbyFilter, LobbyReportRow, MonetaryAmount, Month, PartitionKey, PaymentRecord,
    SfaId, StoredTransaction, TransactionWrite, UserRecord, ALL_LOBBIES,
};
pub use writer::{
    import_members, import_partition, import_payments, write_in_chunks, write_payments,
    ImportOutcome,
};

use chrono::NaiveDate;

/// Loads the report for `query` and renders it as a downloadable CSV.
pub fn lobby_report<S: DocumentStore>(
    store: &S,
    query: &TransactionQuery,
    config: &PipelineConfig,
    today: NaiveDate,
) -> Result<ExportFile, PipelineError> {
    let rows = load_lobby_data(store, query, config.lookup_batch)?;
    export_lobby_report(&rows, &query.lobby, today)
}

/// Renders every member as a downloadable CSV.
pub fn members_report<S: DocumentStore>(
    store: &S,
    today: NaiveDate,
) -> Result<ExportFile, PipelineError> {
    let users = store.list_users()?;
    export_members(&users, today)
}

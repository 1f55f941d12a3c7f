use ::serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::{LobbyReportRow, MonetaryAmount, PaymentRecord, SfaId, UserRecord};

/// Payment columns an import cannot do without. `Sr.no` and `remarks` are
/// optional.
const REQUIRED_PAYMENT_HEADERS: [&str; 8] = [
    "Pay Date",
    "Lobby",
    "SFA id",
    "name",
    "cms id",
    "receiver",
    "amount",
    "payment mode",
];

const REQUIRED_MEMBER_HEADERS: [&str; 4] = ["sfa_id", "cmsid", "full_name", "lobby_id"];

pub const REPORT_HEADERS: [&str; 10] = [
    "Sr. No",
    "Pay Date",
    "Lobby",
    "SFA ID",
    "Name",
    "CMS ID",
    "Receiver",
    "Amount (₹)",
    "Payment Mode",
    "Remarks",
];

pub const MEMBER_HEADERS: [&str; 8] = [
    "Name",
    "SFA ID",
    "CMS ID",
    "Lobby",
    "Email",
    "Phone Number",
    "Emergency Number",
    "Role",
];

#[derive(Debug, Deserialize)]
struct PaymentRowEntity {
    #[serde(rename = "Sr.no", default)]
    sr_no: Option<String>,
    #[serde(rename = "Pay Date")]
    pay_date: String,
    #[serde(rename = "Lobby")]
    lobby: String,
    #[serde(rename = "SFA id")]
    sfa_id: String,
    name: String,
    #[serde(rename = "cms id")]
    cms_id: String,
    receiver: String,
    amount: String,
    #[serde(rename = "payment mode")]
    payment_mode: String,
    #[serde(default)]
    remarks: Option<String>,
}

impl PaymentRowEntity {
    /// `row` is the 1 based position of the record after the header.
    fn into_domain(self, row: usize) -> Result<PaymentRecord, PipelineError> {
        let sr_no = match self.sr_no.as_deref().map(str::trim) {
            None | Some("") => u32::try_from(row)
                .map_err(|_| PipelineError::parse(row, "too many rows to number"))?,
            Some(raw) => raw
                .parse()
                .map_err(|_| PipelineError::parse(row, format!("invalid Sr.no `{}`", raw)))?,
        };

        let amount = MonetaryAmount::parse(&self.amount).ok_or_else(|| {
            PipelineError::parse(row, format!("invalid amount `{}`", self.amount))
        })?;

        let remarks = self
            .remarks
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        Ok(PaymentRecord {
            sr_no,
            pay_date: self.pay_date.trim().to_string(),
            lobby: self.lobby.trim().to_string(),
            sfa_id: SfaId::new(self.sfa_id.trim()),
            name: self.name.trim().to_string(),
            cms_id: self.cms_id.trim().to_string(),
            receiver: self.receiver.trim().to_string(),
            amount,
            payment_mode: self.payment_mode.trim().to_string(),
            remarks,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MemberRowEntity {
    sfa_id: String,
    cmsid: String,
    full_name: String,
    lobby_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone_number: String,
    #[serde(default)]
    emergency_number: String,
    #[serde(default)]
    role: String,
}

impl MemberRowEntity {
    fn into_domain(self, row: usize) -> Result<UserRecord, PipelineError> {
        let sfa_id = self.sfa_id.trim();
        if sfa_id.is_empty() {
            return Err(PipelineError::parse(row, "empty sfa_id"));
        }
        Ok(UserRecord {
            sfa_id: SfaId::new(sfa_id),
            cms_id: self.cmsid.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            lobby_id: self.lobby_id.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            emergency_number: self.emergency_number.trim().to_string(),
            role: self.role.trim().to_string(),
        })
    }
}

/// Field order follows [`REPORT_HEADERS`].
#[derive(Debug, Serialize, Deserialize)]
pub struct LobbyReportRowEntity {
    #[serde(rename = "Sr. No")]
    sr_no: usize,
    #[serde(rename = "Pay Date")]
    pay_date: String,
    #[serde(rename = "Lobby")]
    lobby: String,
    #[serde(rename = "SFA ID")]
    sfa_id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "CMS ID")]
    cms_id: String,
    #[serde(rename = "Receiver")]
    receiver: String,
    #[serde(rename = "Amount (₹)")]
    amount: String,
    #[serde(rename = "Payment Mode")]
    payment_mode: String,
    #[serde(rename = "Remarks")]
    remarks: String,
}

impl LobbyReportRowEntity {
    pub fn from_row(row: &LobbyReportRow) -> Self {
        Self {
            sr_no: row.sr_no,
            pay_date: row.pay_date.clone(),
            lobby: row.lobby.clone(),
            sfa_id: row.sfa_id.value().to_string(),
            name: row.name.clone(),
            cms_id: row.cms_id.clone(),
            receiver: row.receiver.clone(),
            amount: row.amount.to_string(),
            payment_mode: row.payment_mode.clone(),
            remarks: row.remarks.clone(),
        }
    }

    fn into_domain(self, row: usize) -> Result<LobbyReportRow, PipelineError> {
        let amount = MonetaryAmount::parse(&self.amount).ok_or_else(|| {
            PipelineError::parse(row, format!("invalid amount `{}`", self.amount))
        })?;
        Ok(LobbyReportRow {
            sr_no: self.sr_no,
            pay_date: self.pay_date,
            lobby: self.lobby,
            sfa_id: SfaId::new(self.sfa_id),
            name: self.name,
            cms_id: self.cms_id,
            receiver: self.receiver,
            amount,
            payment_mode: self.payment_mode,
            remarks: self.remarks,
        })
    }
}

/// Field order follows [`MEMBER_HEADERS`].
#[derive(Debug, Serialize)]
pub struct MemberExportEntity<'a> {
    name: &'a str,
    sfa_id: &'a str,
    cms_id: &'a str,
    lobby: &'a str,
    email: &'a str,
    phone_number: &'a str,
    emergency_number: &'a str,
    role: &'a str,
}

impl<'a> MemberExportEntity<'a> {
    pub fn from_user(user: &'a UserRecord) -> Self {
        Self {
            name: &user.full_name,
            sfa_id: user.sfa_id.value(),
            cms_id: &user.cms_id,
            lobby: &user.lobby_id,
            email: &user.email,
            phone_number: &user.phone_number,
            emergency_number: &user.emergency_number,
            role: &user.role,
        }
    }
}

/// The one CSV reader every caller goes through. Quoted fields may hold
/// delimiters, doubled quotes and line breaks. Header names are trimmed,
/// field values are left as written.
fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(text.as_bytes())
}

fn require_headers(
    reader: &mut csv::Reader<&[u8]>,
    required: &[&str],
) -> Result<(), PipelineError> {
    let headers = reader.headers()?;
    match required.iter().find(|h| !headers.iter().any(|x| x == **h)) {
        Some(missing) => Err(PipelineError::MissingColumn(missing.to_string())),
        None => Ok(()),
    }
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Deserializes every non blank record and converts it with `into_domain`.
/// Rows are numbered from 1 after blank lines are dropped.
fn read_rows<E, T, F>(
    text: &str,
    required: &[&str],
    into_domain: F,
) -> Result<Vec<T>, PipelineError>
where
    E: DeserializeOwned,
    F: Fn(E, usize) -> Result<T, PipelineError>,
{
    let mut reader = csv_reader(text);
    require_headers(&mut reader, required)?;
    let headers = reader.headers()?.clone();

    let records = reader
        .records()
        .filter(|record| record.as_ref().map_or(true, |r| !is_blank(r)));

    let mut rows: Vec<T> = Vec::new();
    for (idx, record) in records.enumerate() {
        let row = idx + 1;
        let record = record?;
        if record.len() != headers.len() {
            return Err(PipelineError::parse(
                row,
                format!("expected {} fields, found {}", headers.len(), record.len()),
            ));
        }
        // fail if cannot deserialise, no point in a partial import
        let entity: E = record.deserialize(Some(&headers))?;
        rows.push(into_domain(entity, row)?);
    }

    Ok(rows)
}

pub fn parse_payments(text: &str) -> Result<Vec<PaymentRecord>, PipelineError> {
    read_rows(text, &REQUIRED_PAYMENT_HEADERS, PaymentRowEntity::into_domain)
}

pub fn parse_members(text: &str) -> Result<Vec<UserRecord>, PipelineError> {
    read_rows(text, &REQUIRED_MEMBER_HEADERS, MemberRowEntity::into_domain)
}

/// Reads back a file produced by [`output_report_csv`].
pub fn parse_report(text: &str) -> Result<Vec<LobbyReportRow>, PipelineError> {
    read_rows(text, &REPORT_HEADERS, LobbyReportRowEntity::into_domain)
}

fn quoted_writer(headers: &[&str]) -> Result<csv::Writer<Vec<u8>>, PipelineError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(vec![]);
    wtr.write_record(headers)?;
    Ok(wtr)
}

fn into_text(wtr: csv::Writer<Vec<u8>>) -> Result<String, PipelineError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

/// Every field is quoted and embedded quotes are doubled, so any value
/// survives [`parse_report`] unchanged.
pub fn output_report_csv(rows: &[LobbyReportRow]) -> Result<String, PipelineError> {
    let mut wtr = quoted_writer(&REPORT_HEADERS)?;

    for row in rows {
        wtr.serialize(LobbyReportRowEntity::from_row(row))?
    }

    wtr.flush()?;
    into_text(wtr)
}

pub fn output_members_csv(users: &[UserRecord]) -> Result<String, PipelineError> {
    let mut wtr = quoted_writer(&MEMBER_HEADERS)?;

    for user in users {
        wtr.serialize(MemberExportEntity::from_user(user))?
    }

    wtr.flush()?;
    into_text(wtr)
}

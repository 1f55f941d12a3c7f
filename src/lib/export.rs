use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use tracing::info;

use crate::error::PipelineError;
use crate::io::{output_members_csv, output_report_csv};
use crate::types::{LobbyFilter, LobbyReportRow, UserRecord};

/// A CSV document ready to be handed to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub contents: String,
}

/// `{Lobby}_Payments_{ISODate}.csv`, spaces in the lobby name become `_`.
pub fn report_filename(filter: &LobbyFilter, date: NaiveDate) -> String {
    format!(
        "{}_Payments_{}.csv",
        filter.label().replace(' ', "_"),
        date.format("%Y-%m-%d")
    )
}

pub fn members_filename(date: NaiveDate) -> String {
    format!("SFA_Members_{}.csv", date.format("%Y-%m-%d"))
}

pub fn export_lobby_report(
    rows: &[LobbyReportRow],
    filter: &LobbyFilter,
    date: NaiveDate,
) -> Result<ExportFile, PipelineError> {
    Ok(ExportFile {
        filename: report_filename(filter, date),
        contents: output_report_csv(rows)?,
    })
}

pub fn export_members(users: &[UserRecord], date: NaiveDate) -> Result<ExportFile, PipelineError> {
    Ok(ExportFile {
        filename: members_filename(date),
        contents: output_members_csv(users)?,
    })
}

/// Writes `file` into `dir`, creating the directory if needed.
pub fn save_export(dir: &Path, file: &ExportFile) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(&file.filename);
    fs::write(&path, &file.contents)?;
    info!(path = %path.display(), bytes = file.contents.len(), "saved export");
    Ok(path)
}

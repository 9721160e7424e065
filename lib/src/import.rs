// lib/src/import.rs

//! Bulk doctor import from CSV exports of the admin spreadsheet.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use models::errors::{ClinicError, ClinicResult, ValidationError};
use models::labels::Labeled;
use models::medical::{Department, Doctor, NewDoctor, Specialty, WorkingHours};

use crate::database::Repository;

const REQUIRED_COLUMNS: [&str; 5] = ["name", "email", "phone", "specialty", "department"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// 1-based line of the row in the input.
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: Vec<RowError>,
}

/// Imports every row of `text` as a doctor. The header row names the columns
/// (`name`, `email`, `phone`, `specialty`, `department` required; `bio`,
/// `experience_years`, `languages` and `image_id` optional). Bad rows are
/// reported and skipped; the rest are still imported.
pub async fn import_doctors_csv(repo: &Repository<Doctor>, text: &str) -> ClinicResult<ImportReport> {
    let mut rows = parse_csv(text)?.into_iter();
    let Some((_, header)) = rows.next() else {
        return Err(ClinicError::InvalidData("CSV input is empty".to_string()));
    };
    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_lowercase(), i))
        .collect();
    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            return Err(ClinicError::InvalidData(format!("CSV header lacks column '{}'", required)));
        }
    }

    let mut report = ImportReport::default();
    for (line, fields) in rows {
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let outcome = match row_to_doctor(&columns, &fields) {
            Ok(input) => match input.into_doctor() {
                Ok(doctor) => repo.create(&doctor).await.map(|_| ()),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => report.imported += 1,
            Err(e) => {
                warn!("doctor import: line {} rejected: {}", line, e);
                report.failed.push(RowError { line, message: e.to_string() });
            }
        }
    }
    info!("doctor import finished: {} imported, {} failed", report.imported, report.failed.len());
    Ok(report)
}

fn row_to_doctor(columns: &HashMap<String, usize>, fields: &[String]) -> ClinicResult<NewDoctor> {
    let get = |name: &str| -> &str {
        columns
            .get(name)
            .and_then(|&i| fields.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    };

    let experience_years = match get("experience_years") {
        "" => 0,
        raw => raw
            .parse()
            .map_err(|_| ClinicError::InvalidData(format!("experience_years '{}' is not a number", raw)))?,
    };
    let languages = get("languages")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    let image_id = Some(get("image_id")).filter(|s| !s.is_empty()).map(str::to_string);

    Ok(NewDoctor {
        name: get("name").to_string(),
        email: get("email").to_string(),
        phone: get("phone").to_string(),
        specialty: enum_field::<Specialty>(get("specialty"))?,
        department: enum_field::<Department>(get("department"))?,
        bio: get("bio").to_string(),
        image_id,
        experience_years,
        languages,
        working_hours: WorkingHours::default(),
    })
}

/// Accepts either the numeric index or the label of `T`.
fn enum_field<T: Labeled>(raw: &str) -> ClinicResult<T> {
    if raw.is_empty() {
        return Err(ValidationError::MissingField(T::KIND).into());
    }
    if let Ok(index) = raw.parse::<u8>() {
        return T::from_index(index)
            .ok_or(ValidationError::InvalidEnumIndex { kind: T::KIND, index }.into());
    }
    T::from_label(raw).ok_or_else(|| ClinicError::InvalidData(format!("unknown {} '{}'", T::KIND, raw)))
}

/// Splits CSV text into records, each tagged with the line it starts on.
/// Fields may be quoted; inside quotes `""` is a literal quote and line
/// breaks are kept.
fn parse_csv(text: &str) -> ClinicResult<Vec<(usize, Vec<String>)>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push((record_line, std::mem::take(&mut record)));
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(ClinicError::InvalidData(format!(
            "unterminated quoted field starting on line {}",
            record_line
        )));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push((record_line, record));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::storage_engine::Query;

    #[test]
    fn quoted_fields_and_escapes() {
        let rows = parse_csv("a,b\n\"x, y\",\"say \"\"hi\"\"\"\n\"multi\nline\",z\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], (2, vec!["x, y".to_string(), "say \"hi\"".to_string()]));
        assert_eq!(rows[2], (3, vec!["multi\nline".to_string(), "z".to_string()]));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(parse_csv("a,b\n\"open,1\n").is_err());
    }

    #[test]
    fn enum_columns_take_index_or_label() {
        assert_eq!(enum_field::<Specialty>("1").unwrap(), Specialty::Cardiology);
        assert_eq!(enum_field::<Specialty>("cardiology").unwrap(), Specialty::Cardiology);
        assert!(enum_field::<Department>("99").is_err());
        assert!(enum_field::<Department>("Basement").is_err());
    }

    #[tokio::test]
    async fn good_rows_import_and_bad_rows_are_reported() {
        let db = Database::in_memory();
        let repo = db.repository::<Doctor>();
        let csv = "name,email,phone,specialty,department,languages,experience_years\r\n\
                   Dr. Ana Lima,ana@clinic.org,+55 11 5555-0100,Cardiology,0,English;Portuguese,12\r\n\
                   Dr. Bad Mail,not-an-email,+1 555 0100,1,1,,3\r\n\
                   \r\n\
                   \"Dr. Chen, Wei\",chen@clinic.org,+86 10 5555 0100,Neurology,Diagnostics,,x\r\n\
                   Dr. Omar Haddad,omar@clinic.org,+20 2 5555 0100,4,Emergency,Arabic,\r\n";

        let report = import_doctors_csv(&repo, csv).await.unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.failed.iter().map(|f| f.line).collect::<Vec<_>>(), vec![3, 5]);

        let stored = repo.list(&Query::new()).await.unwrap();
        assert_eq!(stored.total, 2);
        let ana = stored.items.iter().find(|d| d.record.name == "Dr. Ana Lima").unwrap();
        assert_eq!(ana.record.languages(), vec!["English", "Portuguese"]);
        assert_eq!(ana.record.experience_years, 12);
    }

    #[tokio::test]
    async fn missing_required_column_rejects_the_batch() {
        let db = Database::in_memory();
        let repo = db.repository::<Doctor>();
        let err = import_doctors_csv(&repo, "name,email\nA,a@b.co\n").await.unwrap_err();
        assert!(matches!(err, ClinicError::InvalidData(_)));
    }
}

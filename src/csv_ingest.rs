//! CSV transaction ingestion.
//!
//! Expected columns: `id,from_account,to_account,amount,timestamp,description`.
//! `timestamp` is RFC 3339 (`Z`-suffixed UTC accepted). `description` may be
//! empty. Rows that fail to parse are skipped and logged, not fatal —
//! analysis proceeds on whatever survives.

use crate::error::EngineError;
use crate::transaction::Transaction;
use chrono::DateTime;
use std::io::Read;
use std::path::Path;

/// Load transactions from a CSV reader, returning `InvalidInput` only if
/// every row was unparsable.
pub fn load_from_reader<R: Read>(reader: R) -> Result<Vec<Transaction>, EngineError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut transactions = Vec::new();
    let mut skipped = 0usize;

    for (row_number, record) in csv_reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(row = row_number + 2, error = %err, "skipping malformed csv row");
                skipped += 1;
                continue;
            }
        };

        match parse_record(&record) {
            Ok(txn) => transactions.push(txn),
            Err(err) => {
                tracing::warn!(row = row_number + 2, error = %err, "skipping invalid transaction row");
                skipped += 1;
            }
        }
    }

    if transactions.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "no valid transactions parsed ({skipped} rows skipped)"
        )));
    }

    if skipped > 0 {
        tracing::info!(skipped, parsed = transactions.len(), "csv ingestion completed with skipped rows");
    }

    Ok(transactions)
}

fn parse_record(record: &csv::StringRecord) -> Result<Transaction, EngineError> {
    let get = |idx: usize, name: &str| -> Result<&str, EngineError> {
        record
            .get(idx)
            .ok_or_else(|| EngineError::InvalidInput(format!("missing column {name}")))
    };

    let id = get(0, "id")?;
    let from_account = get(1, "from_account")?;
    let to_account = get(2, "to_account")?;
    let amount: f64 = get(3, "amount")?
        .parse()
        .map_err(|_| EngineError::InvalidInput("amount is not a number".to_string()))?;
    let timestamp = DateTime::parse_from_rfc3339(get(4, "timestamp")?)
        .map_err(|_| EngineError::InvalidInput("timestamp is not rfc3339".to_string()))?
        .with_timezone(&chrono::Utc);
    let description = record.get(5).filter(|s| !s.is_empty()).map(|s| s.to_string());

    Transaction::new(id, from_account, to_account, amount, timestamp, description)
}

/// Load transactions from a CSV file on disk.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Vec<Transaction>, EngineError> {
    let file = std::fs::File::open(path.as_ref()).map_err(|err| {
        EngineError::InvalidInput(format!("cannot open {}: {err}", path.as_ref().display()))
    })?;
    load_from_reader(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_rows() {
        let csv = "id,from_account,to_account,amount,timestamp,description\n\
                    T1,A,B,100.0,2025-01-01T00:00:00Z,payroll\n\
                    T2,B,C,50.0,2025-01-02T00:00:00Z,\n";
        let txns = load_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].id, "T1");
        assert_eq!(txns[0].description.as_deref(), Some("payroll"));
        assert_eq!(txns[1].description, None);
    }

    #[test]
    fn skips_rows_with_bad_amount_but_keeps_others() {
        let csv = "id,from_account,to_account,amount,timestamp,description\n\
                    T1,A,B,not-a-number,2025-01-01T00:00:00Z,\n\
                    T2,B,C,50.0,2025-01-02T00:00:00Z,\n";
        let txns = load_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].id, "T2");
    }

    #[test]
    fn all_rows_invalid_is_an_error() {
        let csv = "id,from_account,to_account,amount,timestamp,description\n\
                    T1,A,B,not-a-number,2025-01-01T00:00:00Z,\n";
        let result = load_from_reader(csv.as_bytes());
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn loads_from_a_temp_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,from_account,to_account,amount,timestamp,description").unwrap();
        writeln!(file, "T1,A,B,100.0,2025-01-01T00:00:00Z,").unwrap();
        let txns = load_from_path(file.path()).unwrap();
        assert_eq!(txns.len(), 1);
    }
}

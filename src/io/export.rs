use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Account, TransactionRecord, format_cents};

/// An account's full history as written by [`Exporter::export_history_json`]
#[derive(Debug, Clone, Serialize)]
pub struct HistorySnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub account: Account,
    pub transactions: Vec<TransactionRecord>,
}

/// Writes an account's transaction history in portable formats
pub struct Exporter<'a> {
    ledger: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(ledger: &'a LedgerService) -> Self {
        Self { ledger }
    }

    /// Export the history as CSV, oldest first. Returns the number of rows written.
    pub async fn export_history_csv<W: Write>(&self, account: &Account, writer: W) -> Result<usize> {
        let records = self.ledger.history(account).await?;
        write_history_csv(&records, writer)
    }

    /// Export the account and its history as pretty-printed JSON.
    pub async fn export_history_json<W: Write>(
        &self,
        account: &Account,
        mut writer: W,
    ) -> Result<HistorySnapshot> {
        let account = self.ledger.balance(account).await?;
        let transactions = self.ledger.history(&account).await?;

        let snapshot = HistorySnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            account,
            transactions,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(snapshot)
    }
}

fn write_history_csv<W: Write>(records: &[TransactionRecord], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["sequence", "date", "type", "amount", "amount_cents"])?;

    for record in records {
        csv_writer.write_record(&[
            record.sequence.to_string(),
            record.timestamp.to_rfc3339(),
            record.kind.to_string(),
            format_cents(record.amount_cents),
            record.amount_cents.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;
    use crate::domain::TransactionKind;

    #[test]
    fn test_csv_rows_use_signed_decimal_amounts() -> Result<()> {
        let account_id = Uuid::new_v4();
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
        let records = vec![
            TransactionRecord {
                sequence: 1,
                account_id,
                kind: TransactionKind::Deposit,
                amount_cents: 10000,
                timestamp,
            },
            TransactionRecord {
                sequence: 2,
                account_id,
                kind: TransactionKind::Transfer,
                amount_cents: -5000,
                timestamp,
            },
        ];

        let mut buffer = Vec::new();
        let written = write_history_csv(&records, &mut buffer)?;
        let output = String::from_utf8(buffer)?;

        assert_eq!(written, 2);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "sequence,date,type,amount,amount_cents");
        assert_eq!(lines[1], "1,2024-01-15T09:30:00+00:00,Deposit,100.00,10000");
        assert_eq!(lines[2], "2,2024-01-15T09:30:00+00:00,Transfer,-50.00,-5000");
        Ok(())
    }

    #[test]
    fn test_csv_for_empty_history_has_only_header() -> Result<()> {
        let mut buffer = Vec::new();
        assert_eq!(write_history_csv(&[], &mut buffer)?, 0);
        assert_eq!(String::from_utf8(buffer)?.lines().count(), 1);
        Ok(())
    }
}

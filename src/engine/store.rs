use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use rusqlite::{Connection, OptionalExtension as _, Row, params};

use crate::payment::{PaymentDirection, PaymentRecord, PaymentStatus};

use super::RefundableSwap;

/// SQLite persistence for the sandbox engine: payment history plus the
/// refundable-swap set. The engine owns this state; the orchestration layer
/// only ever sees snapshots.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create store dir {}", dir.display()))?;
        }

        let conn =
            Connection::open(&path).with_context(|| format!("open sqlite {}", path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .context("set sqlite busy_timeout")?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .context("configure sqlite pragmas")?;

        migrate(&conn).context("migrate sqlite schema")?;

        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn insert_payment(&mut self, record: &PaymentRecord) -> Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO payments (
  id,
  direction,
  rail,
  amount_sat,
  fee_sat,
  status,
  created_at,
  counterparty
) VALUES (
  ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
)
"#,
                params![
                    &record.id,
                    direction_to_str(record.direction),
                    record.rail.to_string(),
                    record.amount_sat,
                    record.fee_sat,
                    status_to_str(record.status),
                    record.created_at,
                    &record.counterparty,
                ],
            )
            .with_context(|| format!("insert payment {}", record.id))?;
        Ok(())
    }

    pub fn get_payment(&self, id: &str) -> Result<Option<PaymentRecord>> {
        self.conn
            .query_row(
                r#"
SELECT id, direction, rail, amount_sat, fee_sat, status, created_at, counterparty
FROM payments
WHERE id = ?1
"#,
                params![id],
                payment_from_row,
            )
            .optional()
            .with_context(|| format!("get payment {id}"))
    }

    pub fn list_payments(&self) -> Result<Vec<PaymentRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
SELECT id, direction, rail, amount_sat, fee_sat, status, created_at, counterparty
FROM payments
ORDER BY created_at, id
"#,
            )
            .context("prepare list payments")?;

        let rows = stmt
            .query_map([], payment_from_row)
            .context("query list payments")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("read payment row")?);
        }
        Ok(out)
    }

    /// Flips every pending record to complete; the sandbox stand-in for the
    /// engine's settlement callbacks. Returns the number of records settled.
    pub fn complete_pending(&mut self) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE payments SET status = ?1 WHERE status = ?2",
                params![
                    status_to_str(PaymentStatus::Complete),
                    status_to_str(PaymentStatus::Pending)
                ],
            )
            .context("settle pending payments")
    }

    pub fn upsert_refundable(&mut self, swap: &RefundableSwap) -> Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO refundable_swaps (swap_address, amount_sat, status)
VALUES (?1, ?2, 'refundable')
ON CONFLICT(swap_address) DO NOTHING
"#,
                params![&swap.swap_address, swap.amount_sat],
            )
            .with_context(|| format!("upsert refundable swap {}", swap.swap_address))?;
        Ok(())
    }

    pub fn list_refundable_swaps(&self) -> Result<Vec<RefundableSwap>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
SELECT swap_address, amount_sat
FROM refundable_swaps
WHERE status = 'refundable'
ORDER BY swap_address
"#,
            )
            .context("prepare list refundable swaps")?;

        let rows = stmt
            .query_map([], |row| {
                Ok(RefundableSwap {
                    swap_address: row.get(0)?,
                    amount_sat: u64_col(row, 1)?,
                })
            })
            .context("query list refundable swaps")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("read refundable swap row")?);
        }
        Ok(out)
    }

    /// Moves a swap from refundable to refund-pending. Returns false when
    /// the swap is unknown or already past refundable.
    pub fn mark_refund_pending(&mut self, swap_address: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                r#"
UPDATE refundable_swaps
SET status = 'refund_pending'
WHERE swap_address = ?1 AND status = 'refundable'
"#,
                params![swap_address],
            )
            .with_context(|| format!("mark refund pending {swap_address}"))?;
        Ok(rows == 1)
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS payments (
  id TEXT PRIMARY KEY,
  direction TEXT NOT NULL,
  rail TEXT NOT NULL,
  amount_sat INTEGER NOT NULL,
  fee_sat INTEGER NOT NULL,
  status TEXT NOT NULL,
  created_at INTEGER NOT NULL,
  counterparty TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS payments_status_idx ON payments(status);

CREATE TABLE IF NOT EXISTS refundable_swaps (
  swap_address TEXT PRIMARY KEY,
  amount_sat INTEGER NOT NULL,
  status TEXT NOT NULL
);
"#,
    )
    .context("create tables")?;
    Ok(())
}

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<PaymentRecord> {
    let direction_str: String = row.get(1)?;
    let rail_str: String = row.get(2)?;
    let status_str: String = row.get(5)?;
    Ok(PaymentRecord {
        id: row.get(0)?,
        direction: direction_from_str(&direction_str, 1)?,
        rail: rail_str.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        amount_sat: u64_col(row, 3)?,
        fee_sat: u64_col(row, 4)?,
        status: status_from_str(&status_str, 5)?,
        created_at: u64_col(row, 6)?,
        counterparty: row.get(7)?,
    })
}

fn u64_col(row: &Row<'_>, col: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(col)?;
    u64::try_from(value).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Integer,
            format!("negative column value {value}").into(),
        )
    })
}

fn direction_to_str(direction: PaymentDirection) -> &'static str {
    match direction {
        PaymentDirection::Send => "send",
        PaymentDirection::Receive => "receive",
    }
}

fn direction_from_str(s: &str, col: usize) -> rusqlite::Result<PaymentDirection> {
    match s {
        "send" => Ok(PaymentDirection::Send),
        "receive" => Ok(PaymentDirection::Receive),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Text,
            format!("unknown payment direction: {other}").into(),
        )),
    }
}

fn status_to_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Created => "created",
        PaymentStatus::Pending => "pending",
        PaymentStatus::Complete => "complete",
        PaymentStatus::Failed => "failed",
        PaymentStatus::TimedOut => "timed_out",
        PaymentStatus::Refundable => "refundable",
        PaymentStatus::RefundPending => "refund_pending",
    }
}

fn status_from_str(s: &str, col: usize) -> rusqlite::Result<PaymentStatus> {
    match s {
        "created" => Ok(PaymentStatus::Created),
        "pending" => Ok(PaymentStatus::Pending),
        "complete" => Ok(PaymentStatus::Complete),
        "failed" => Ok(PaymentStatus::Failed),
        "timed_out" => Ok(PaymentStatus::TimedOut),
        "refundable" => Ok(PaymentStatus::Refundable),
        "refund_pending" => Ok(PaymentStatus::RefundPending),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Text,
            format!("unknown payment status: {other}").into(),
        )),
    }
}

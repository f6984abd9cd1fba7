//! # Bill History Log
//!
//! The local durable record of completed sales: a JSON array in one file,
//! read-modify-append-written on each checkout. The remote mirror gets a
//! best-effort copy through the outbox; THIS file is the source of truth
//! for analytics and export.
//!
//! ## File Location
//! ```text
//! ~/.local/share/beacon-pos/bill_history.json      (Linux)
//! ~/Library/Application Support/com.beacon.pos/... (macOS)
//! %APPDATA%\beacon\beacon-pos\data\...             (Windows)
//! ```
//! A missing file means an empty history, not an error.

use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use beacon_core::types::Bill;

use crate::error::{StoreError, StoreResult};

/// File name under the platform data directory.
const BILL_LOG_FILE: &str = "bill_history.json";

// =============================================================================
// Bill Log
// =============================================================================

/// Append-only local log of completed bills.
#[derive(Debug, Clone)]
pub struct BillLog {
    path: PathBuf,
}

impl BillLog {
    /// Opens the log at the platform default location.
    pub fn open_default() -> StoreResult<Self> {
        let dirs = ProjectDirs::from("com", "beacon", "beacon-pos").ok_or(StoreError::NoDataDir)?;
        fs::create_dir_all(dirs.data_dir())?;
        Ok(BillLog {
            path: dirs.data_dir().join(BILL_LOG_FILE),
        })
    }

    /// Opens the log at an explicit path (tests, portable installs).
    pub fn open_at(path: impl Into<PathBuf>) -> Self {
        BillLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the full history. A missing file is an empty history.
    pub fn load(&self) -> StoreResult<Vec<Bill>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let bills: Vec<Bill> = serde_json::from_str(&content)?;
                debug!(count = bills.len(), path = %self.path.display(), "Loaded bill history");
                Ok(bills)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Appends one bill: read, push, rewrite.
    ///
    /// The write goes through a temp file + rename so a crash mid-write
    /// cannot truncate existing history.
    pub fn append(&self, bill: &Bill) -> StoreResult<()> {
        let mut bills = self.load()?;
        bills.push(bill.clone());

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&bills)?)?;
        fs::rename(&tmp, &self.path)?;

        info!(bill_id = %bill.bill_id, total = %bill.total, "Bill appended to history");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::cart::FeeDirection;
    use beacon_core::{FeeRate, Money, PaymentMethod};
    use chrono::Utc;

    fn bill(id: &str, total_cents: i64) -> Bill {
        Bill {
            bill_id: id.to_string(),
            items: Vec::new(),
            subtotal: Money::from_cents(total_cents),
            fee_percent: FeeRate::zero(),
            fee_direction: FeeDirection::Discount,
            fee_amount: Money::zero(),
            total: Money::from_cents(total_cents),
            payment_method: PaymentMethod::Cash,
            customer_name: None,
            customer_phone: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let log = BillLog::open_at(dir.path().join(BILL_LOG_FILE));
        assert!(log.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let log = BillLog::open_at(dir.path().join(BILL_LOG_FILE));

        log.append(&bill("BL20240301001", 11700)).unwrap();
        log.append(&bill("BL20240301002", 5000)).unwrap();

        let bills = log.load().unwrap();
        assert_eq!(bills.len(), 2);
        assert_eq!(bills[0].bill_id, "BL20240301001");
        assert_eq!(bills[1].total.cents(), 5000);
    }

    #[test]
    fn test_corrupt_file_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(BILL_LOG_FILE);
        fs::write(&path, "not json").unwrap();

        let log = BillLog::open_at(&path);
        assert!(matches!(log.load(), Err(StoreError::Serde(_))));
    }
}

//! File-backed store.
//!
//! Layout under the data directory:
//! - `assets.json`: the asset table, rewritten on every upsert
//! - `trades.jsonl`: one trade per line, opened in append mode
//!
//! The in-memory view changes only after the file write succeeds, so a
//! failed write can be retried with the same rows. A line that fails to
//! parse on load is skipped and repeated trade ids are ignored, so an
//! interrupted write only loses its own tail.

use crate::error::PersistenceResult;
use crate::memory::{upsert_row, MemoryStore};
use crate::store::TickerStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use ticker_core::{AssetRecord, BoxFuture, MarketRow, PartialMarketRow, StoredTrade};
use tracing::{debug, info, warn};

const ASSETS_FILE: &str = "assets.json";
const TRADES_FILE: &str = "trades.jsonl";

/// Append side of `trades.jsonl`.
struct TradeLog {
    out: Box<dyn Write + Send>,
    /// A previous write may have left a partial line.
    dirty: bool,
}

impl TradeLog {
    fn new(out: Box<dyn Write + Send>, terminated: bool) -> Self {
        Self {
            out,
            dirty: !terminated,
        }
    }

    /// Write `lines` in one call, starting on a fresh line.
    fn append(&mut self, lines: &[u8]) -> std::io::Result<()> {
        let result = if self.dirty {
            self.out
                .write_all(b"\n")
                .and_then(|_| self.out.write_all(lines))
        } else {
            self.out.write_all(lines)
        }
        .and_then(|_| self.out.flush());

        self.dirty = result.is_err();
        result
    }
}

pub struct JsonLinesStore {
    dir: PathBuf,
    inner: MemoryStore,
    /// Also serializes the check-write-commit sequence of trade appends.
    trades_log: Mutex<TradeLog>,
    /// Serializes rewrites of the asset table.
    assets_lock: Mutex<()>,
}

impl JsonLinesStore {
    /// Open the store in `dir`, creating the directory and files as needed.
    pub fn open(dir: impl AsRef<Path>) -> PersistenceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let assets = load_assets(&dir.join(ASSETS_FILE))?;
        let (trades, terminated) = load_trades(&dir.join(TRADES_FILE))?;
        info!(
            dir = %dir.display(),
            assets = assets.len(),
            trades = trades.len(),
            "Opened JSON Lines store (append mode)"
        );

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(TRADES_FILE))?;

        Ok(Self {
            dir,
            inner: MemoryStore::from_rows(assets, trades),
            trades_log: Mutex::new(TradeLog::new(Box::new(file), terminated)),
            assets_lock: Mutex::new(()),
        })
    }

    #[cfg(test)]
    fn set_trade_writer(&self, out: Box<dyn Write + Send>) {
        *self.trades_log.lock() = TradeLog::new(out, true);
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append_trades(&self, trades: Vec<StoredTrade>) -> PersistenceResult<usize> {
        let mut log = self.trades_log.lock();
        let pending = self.inner.unseen_trades(trades);
        if pending.is_empty() {
            return Ok(0);
        }

        let mut lines = Vec::new();
        for trade in &pending {
            serde_json::to_writer(&mut lines, trade)?;
            lines.push(b'\n');
        }
        log.append(&lines)?;

        let inserted = self.inner.insert_trades(pending).len();
        debug!(count = inserted, "Appended trades");
        Ok(inserted)
    }

    fn save_asset(&self, asset: AssetRecord) -> PersistenceResult<i32> {
        let _guard = self.assets_lock.lock();
        let mut table = self.inner.assets();
        let stored = upsert_row(&mut table, asset);

        let path = self.dir.join(ASSETS_FILE);
        let tmp = self.dir.join(format!("{ASSETS_FILE}.tmp"));
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, &table)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;

        self.inner.replace_assets(table);
        Ok(stored.id)
    }
}

fn load_assets(path: &Path) -> PersistenceResult<Vec<AssetRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Returns the parsed trades and whether the file ends on a line boundary.
fn load_trades(path: &Path) -> PersistenceResult<(Vec<StoredTrade>, bool)> {
    if !path.exists() {
        return Ok((Vec::new(), true));
    }

    let content = fs::read_to_string(path)?;
    let mut trades = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<StoredTrade>(line) {
            Ok(trade) => trades.push(trade),
            Err(e) => warn!(line = index + 1, error = %e, "Skipping corrupt trade line"),
        }
    }
    let terminated = content.is_empty() || content.ends_with('\n');
    Ok((trades, terminated))
}

impl TickerStore for JsonLinesStore {
    fn asset_id<'a>(&'a self, code: &'a str, issuer: &'a str) -> BoxFuture<'a, PersistenceResult<Option<i32>>> {
        Box::pin(async move { Ok(self.inner.find_asset_id(code, issuer)) })
    }

    fn last_trade(&self) -> BoxFuture<'_, PersistenceResult<Option<StoredTrade>>> {
        Box::pin(async move { Ok(self.inner.latest_trade()) })
    }

    fn bulk_insert_trades(&self, trades: Vec<StoredTrade>) -> BoxFuture<'_, PersistenceResult<usize>> {
        Box::pin(async move { self.append_trades(trades) })
    }

    fn upsert_asset(&self, asset: AssetRecord) -> BoxFuture<'_, PersistenceResult<i32>> {
        Box::pin(async move { self.save_asset(asset) })
    }

    fn list_assets(&self) -> BoxFuture<'_, PersistenceResult<Vec<AssetRecord>>> {
        Box::pin(async move { Ok(self.inner.assets()) })
    }

    fn market_rows(&self, now: DateTime<Utc>) -> BoxFuture<'_, PersistenceResult<Vec<MarketRow>>> {
        Box::pin(async move { Ok(self.inner.compute_market_rows(now)) })
    }

    fn partial_markets_by_issuer<'a>(
        &'a self,
        issuer: &'a str,
        hours: i64,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, PersistenceResult<Vec<PartialMarketRow>>> {
        Box::pin(async move { Ok(self.inner.compute_partial_markets(issuer, hours, now)) })
    }
}

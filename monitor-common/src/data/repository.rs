// monitor-common/src/data/repository.rs
// ====
// Market Monitor - SQLite archive
// Snapshots, regimes, analyses, alerts, releases and Fed communications
// ====

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use super::types::{
    Alert, AnalysisRecord, DataError, DataResult, EconomicRelease, FedCommunication,
    MarketSnapshot, RegimeRecord,
};
use crate::analysis::regime::MarketRegime;
use crate::analysis::store::HistoricalStore;

// =================================================================
// Schema
// =================================================================

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS market_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp INTEGER NOT NULL,
        asset_class TEXT NOT NULL,
        asset TEXT NOT NULL,
        symbol TEXT NOT NULL,
        price REAL NOT NULL,
        change_pct REAL NOT NULL,
        volume REAL NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_market_data_asset_ts ON market_data(asset, timestamp)",
    r#"
    CREATE TABLE IF NOT EXISTS market_regimes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp INTEGER NOT NULL,
        risk_environment TEXT NOT NULL,
        volatility_regime TEXT NOT NULL,
        liquidity_conditions TEXT NOT NULL,
        correlation_regime TEXT NOT NULL,
        dominant_factors TEXT NOT NULL,
        degradations TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS analyses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp INTEGER NOT NULL,
        analysis_type TEXT NOT NULL,
        content TEXT NOT NULL,
        confidence REAL NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_analyses_type_ts ON analyses(analysis_type, timestamp)",
    r#"
    CREATE TABLE IF NOT EXISTS alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp INTEGER NOT NULL,
        alert_type TEXT NOT NULL,
        severity TEXT NOT NULL,
        message TEXT NOT NULL,
        resolved INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS economic_releases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        indicator TEXT NOT NULL,
        name TEXT NOT NULL,
        value REAL NOT NULL,
        previous REAL,
        expected REAL,
        observation_date TEXT NOT NULL,
        source TEXT NOT NULL,
        importance TEXT NOT NULL,
        recorded_at INTEGER NOT NULL,
        UNIQUE(indicator, observation_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fed_speeches (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        published_at INTEGER NOT NULL,
        title TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        speaker TEXT NOT NULL,
        source TEXT NOT NULL,
        kind TEXT NOT NULL,
        full_text TEXT,
        analysis TEXT,
        recorded_at INTEGER NOT NULL
    )
    "#,
];

// =================================================================
// Repository
// =================================================================

pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub async fn connect(db_url: &str, max_connections: u32) -> DataResult<Self> {
        let opts = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(opts)
            .await?;

        let repo = Self { pool };
        repo.ensure_schema().await?;
        info!("Archive ready at {}", db_url);
        Ok(repo)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> DataResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    // --- Market data ---

    /// Archives every observation of the snapshot. Returns the row count.
    pub async fn store_market_snapshot(&self, snapshot: &MarketSnapshot) -> DataResult<usize> {
        let ts = snapshot.timestamp.timestamp_millis();
        let mut tx = self.pool.begin().await?;
        let mut rows = 0;

        for (class, name, point) in snapshot.iter_assets() {
            sqlx::query(
                "INSERT INTO market_data (timestamp, asset_class, asset, symbol, price, change_pct, volume)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(ts)
            .bind(class.as_str())
            .bind(name)
            .bind(&point.symbol)
            .bind(point.price)
            .bind(point.change_pct)
            .bind(point.volume)
            .execute(&mut *tx)
            .await?;
            rows += 1;
        }

        tx.commit().await?;
        debug!("Archived {} observations", rows);
        Ok(rows)
    }

    /// Replays archived prices into `store`, oldest first. Returns the row count.
    pub async fn warm_store(&self, store: &mut HistoricalStore) -> DataResult<usize> {
        let rows = sqlx::query("SELECT asset, price, volume FROM market_data ORDER BY timestamp ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;

        for row in &rows {
            let asset: String = row.try_get("asset")?;
            store.record(&asset, row.try_get("price")?, row.try_get("volume")?);
        }
        Ok(rows.len())
    }

    // --- Regimes ---

    pub async fn store_market_regime(
        &self,
        timestamp: DateTime<Utc>,
        regime: &MarketRegime,
    ) -> DataResult<i64> {
        let factors = serde_json::to_string(&regime.factor_names())?;
        let degradations = serde_json::to_string(&regime.degradations)?;

        let result = sqlx::query(
            "INSERT INTO market_regimes
             (timestamp, risk_environment, volatility_regime, liquidity_conditions, correlation_regime, dominant_factors, degradations)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(timestamp.timestamp_millis())
        .bind(regime.risk_environment.as_str())
        .bind(regime.volatility_regime.as_str())
        .bind(regime.liquidity_conditions.as_str())
        .bind(regime.correlation_regime.as_str())
        .bind(factors)
        .bind(degradations)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_latest_market_regime(&self) -> DataResult<Option<RegimeRecord>> {
        let row = sqlx::query("SELECT * FROM market_regimes ORDER BY timestamp DESC, id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> DataResult<RegimeRecord> {
            let factors: String = row.try_get("dominant_factors")?;
            Ok(RegimeRecord {
                id: row.try_get("id")?,
                timestamp: millis_to_utc(row.try_get("timestamp")?)?,
                risk_environment: row.try_get("risk_environment")?,
                volatility_regime: row.try_get("volatility_regime")?,
                liquidity_conditions: row.try_get("liquidity_conditions")?,
                correlation_regime: row.try_get("correlation_regime")?,
                dominant_factors: serde_json::from_str(&factors)?,
            })
        })
        .transpose()
    }

    // --- Analyses ---

    pub async fn store_analysis<T: Serialize>(
        &self,
        timestamp: DateTime<Utc>,
        analysis_type: &str,
        content: &T,
        confidence: f64,
    ) -> DataResult<i64> {
        let content = serde_json::to_string(content)?;
        let result = sqlx::query(
            "INSERT INTO analyses (timestamp, analysis_type, content, confidence) VALUES (?, ?, ?, ?)",
        )
        .bind(timestamp.timestamp_millis())
        .bind(analysis_type)
        .bind(content)
        .bind(confidence)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_latest_analysis(&self, analysis_type: &str) -> DataResult<Option<AnalysisRecord>> {
        let row = sqlx::query(
            "SELECT * FROM analyses WHERE analysis_type = ? ORDER BY timestamp DESC, id DESC LIMIT 1",
        )
        .bind(analysis_type)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| analysis_from_row(&row)).transpose()
    }

    // --- Alerts ---

    pub async fn create_alert(&self, alert_type: &str, severity: &str, message: &str) -> DataResult<i64> {
        if message.is_empty() {
            return Err(DataError::Validation("Alert message cannot be empty".into()));
        }

        let result = sqlx::query(
            "INSERT INTO alerts (timestamp, alert_type, severity, message, resolved) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(Utc::now().timestamp_millis())
        .bind(alert_type)
        .bind(severity)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_unresolved_alerts(&self) -> DataResult<Vec<Alert>> {
        let rows = sqlx::query("SELECT * FROM alerts WHERE resolved = 0 ORDER BY timestamp ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> DataResult<Alert> {
                Ok(Alert {
                    id: row.try_get("id")?,
                    timestamp: millis_to_utc(row.try_get("timestamp")?)?,
                    alert_type: row.try_get("alert_type")?,
                    severity: row.try_get("severity")?,
                    message: row.try_get("message")?,
                    resolved: row.try_get::<i64, _>("resolved")? != 0,
                })
            })
            .collect()
    }

    pub async fn resolve_alert(&self, id: i64) -> DataResult<()> {
        let result = sqlx::query("UPDATE alerts SET resolved = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("alert {}", id)));
        }
        Ok(())
    }

    // --- Economic releases ---

    /// Returns `false` when this indicator/date pair was already stored.
    pub async fn store_economic_release(&self, release: &EconomicRelease) -> DataResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO economic_releases
             (indicator, name, value, previous, expected, observation_date, source, importance, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&release.indicator)
        .bind(&release.name)
        .bind(release.value)
        .bind(release.previous)
        .bind(release.expected)
        .bind(release.observation_date.to_string())
        .bind(release.source.as_str())
        .bind(release.importance.as_str())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn latest_release_date(&self, indicator: &str) -> DataResult<Option<NaiveDate>> {
        let row = sqlx::query(
            "SELECT observation_date FROM economic_releases WHERE indicator = ? ORDER BY observation_date DESC LIMIT 1",
        )
        .bind(indicator)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> DataResult<NaiveDate> {
            let raw: String = row.try_get("observation_date")?;
            NaiveDate::from_str(&raw).map_err(|e| DataError::Validation(e.to_string()))
        })
        .transpose()
    }

    // --- Fed communications ---

    /// Returns `false` when the URL is already archived.
    pub async fn store_fed_speech<T: Serialize>(
        &self,
        communication: &FedCommunication,
        analysis: Option<&T>,
    ) -> DataResult<bool> {
        let analysis = analysis.map(serde_json::to_string).transpose()?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO fed_speeches
             (published_at, title, url, speaker, source, kind, full_text, analysis, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(communication.published_at.timestamp_millis())
        .bind(&communication.title)
        .bind(&communication.url)
        .bind(&communication.speaker)
        .bind(&communication.source)
        .bind(communication.kind.as_str())
        .bind(&communication.full_text)
        .bind(analysis)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn has_fed_speech(&self, url: &str) -> DataResult<bool> {
        let row = sqlx::query("SELECT 1 FROM fed_speeches WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    // --- Retention ---

    /// Deletes time-series rows and resolved alerts older than `days_to_keep`.
    pub async fn cleanup_old_data(&self, days_to_keep: i64) -> DataResult<u64> {
        let cutoff = (Utc::now() - Duration::days(days_to_keep)).timestamp_millis();
        let mut removed = 0;

        for statement in [
            "DELETE FROM market_data WHERE timestamp < ?",
            "DELETE FROM market_regimes WHERE timestamp < ?",
            "DELETE FROM analyses WHERE timestamp < ?",
            "DELETE FROM alerts WHERE resolved = 1 AND timestamp < ?",
        ] {
            removed += sqlx::query(statement)
                .bind(cutoff)
                .execute(&self.pool)
                .await?
                .rows_affected();
        }

        if removed > 0 {
            info!("Retention cleanup removed {} rows", removed);
        }
        Ok(removed)
    }
}

fn analysis_from_row(row: &SqliteRow) -> DataResult<AnalysisRecord> {
    let content: String = row.try_get("content")?;
    Ok(AnalysisRecord {
        id: row.try_get("id")?,
        timestamp: millis_to_utc(row.try_get("timestamp")?)?,
        analysis_type: row.try_get("analysis_type")?,
        content: serde_json::from_str(&content)?,
        confidence: row.try_get("confidence")?,
    })
}

fn millis_to_utc(ms: i64) -> DataResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| DataError::Validation(format!("timestamp out of range: {}", ms)))
}

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::version::error::CacheError;
use crate::version::types::PackageMetadata;

/// Bumped whenever the table layout changes; older caches are rebuilt
const SCHEMA_VERSION: i32 = 1;

/// Result of looking a package up in the store
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Fresh metadata
    Hit(PackageMetadata),
    /// The registry recently reported the package as missing
    NotFound,
    /// Nothing cached, or the entry is older than the freshness window
    Miss,
}

/// Persistent storage for fetched package metadata
#[cfg_attr(test, automock)]
pub trait MetadataStore: Send + Sync + 'static {
    /// Look up a package, honoring the freshness window
    fn lookup(&self, package_name: &str) -> Result<CacheLookup, CacheError>;

    /// Replace everything stored for a package
    fn replace_metadata(&self, metadata: &PackageMetadata) -> Result<(), CacheError>;

    /// Remember that the registry does not know this package
    fn mark_not_found(&self, package_name: &str) -> Result<(), CacheError>;
}

pub struct Cache {
    conn: Mutex<Connection>,
    /// Freshness window in milliseconds
    ttl: i64,
}

impl Cache {
    pub fn new(db_path: &Path, ttl: i64) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        debug!("Database connection established");

        let cache = Self {
            conn: Mutex::new(conn),
            ttl,
        };

        cache.create_schema()?;
        info!("Cache initialized successfully");

        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Get current timestamp in milliseconds since UNIX epoch
    fn current_timestamp_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if current_version != SCHEMA_VERSION {
            debug!(
                "Cache schema v{} does not match v{}, rebuilding",
                current_version, SCHEMA_VERSION
            );
            conn.execute_batch(
                r#"
                DROP TABLE IF EXISTS dist_tags;
                DROP TABLE IF EXISTS versions;
                DROP TABLE IF EXISTS packages;
                "#,
            )?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_name TEXT NOT NULL UNIQUE,
                updated_at INTEGER NOT NULL,
                not_found INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_updated_at ON packages(updated_at);

            CREATE TABLE IF NOT EXISTS versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id INTEGER NOT NULL,
                version TEXT NOT NULL,
                published_at TEXT,
                integrity TEXT,
                FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
                UNIQUE(package_id, version)
            );

            CREATE INDEX IF NOT EXISTS idx_package_id ON versions(package_id);

            CREATE TABLE IF NOT EXISTS dist_tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id INTEGER NOT NULL,
                tag_name TEXT NOT NULL,
                version TEXT NOT NULL,
                FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
                UNIQUE(package_id, tag_name)
            );

            CREATE INDEX IF NOT EXISTS idx_dist_tags_package_id ON dist_tags(package_id);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    fn read_metadata(
        conn: &Connection,
        package_id: i64,
        package_name: &str,
    ) -> Result<PackageMetadata, CacheError> {
        let mut stmt = conn.prepare(
            "SELECT version, published_at, integrity FROM versions WHERE package_id = ?1",
        )?;
        let rows = stmt
            .query_map([package_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut versions = Vec::with_capacity(rows.len());
        let mut publish_times = HashMap::new();
        let mut integrity = HashMap::new();
        for (version, published_at, hash) in rows {
            if let Some(ts) = published_at {
                let parsed = DateTime::parse_from_rfc3339(&ts)
                    .map_err(|e| CacheError::Serialization(format!("{version}: {e}")))?;
                publish_times.insert(version.clone(), parsed.with_timezone(&Utc));
            }
            if let Some(hash) = hash {
                integrity.insert(version.clone(), hash);
            }
            versions.push(version);
        }

        versions.sort_by(|a, b| match (semver::Version::parse(a), semver::Version::parse(b)) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            _ => a.cmp(b),
        });

        let mut stmt = conn.prepare("SELECT tag_name, version FROM dist_tags WHERE package_id = ?1")?;
        let dist_tags = stmt
            .query_map([package_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<String, String>, _>>()?;

        Ok(PackageMetadata::new(package_name, versions)
            .with_dist_tags(dist_tags)
            .with_publish_times(publish_times)
            .with_integrity(integrity))
    }
}

impl MetadataStore for Cache {
    fn lookup(&self, package_name: &str) -> Result<CacheLookup, CacheError> {
        let threshold = Self::current_timestamp_ms() - self.ttl;
        let conn = self.lock_conn()?;

        let row = conn
            .query_row(
                "SELECT id, updated_at, not_found FROM packages WHERE package_name = ?1",
                [package_name],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((package_id, updated_at, not_found)) = row else {
            return Ok(CacheLookup::Miss);
        };

        if updated_at < threshold {
            debug!("Cached metadata for {} is stale", package_name);
            return Ok(CacheLookup::Miss);
        }

        if not_found {
            return Ok(CacheLookup::NotFound);
        }

        let metadata = Self::read_metadata(&conn, package_id, package_name)?;
        Ok(CacheLookup::Hit(metadata))
    }

    fn replace_metadata(&self, metadata: &PackageMetadata) -> Result<(), CacheError> {
        let package_name = metadata.name.as_str();
        debug!(
            "Saving {} versions for {}",
            metadata.versions.len(),
            package_name
        );

        let now = Self::current_timestamp_ms();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        // Insert or update package
        tx.execute(
            r#"
            INSERT INTO packages (package_name, updated_at, not_found)
            VALUES (?1, ?2, 0)
            ON CONFLICT(package_name) DO UPDATE SET updated_at = excluded.updated_at, not_found = 0
            "#,
            (package_name, now),
        )?;

        let package_id: i64 = tx.query_row(
            "SELECT id FROM packages WHERE package_name = ?1",
            [package_name],
            |row| row.get(0),
        )?;

        tx.execute("DELETE FROM versions WHERE package_id = ?1", [package_id])?;
        tx.execute("DELETE FROM dist_tags WHERE package_id = ?1", [package_id])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO versions (package_id, version, published_at, integrity) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for version in &metadata.versions {
                let published_at = metadata.publish_time(version).map(|t| t.to_rfc3339());
                let integrity = metadata.integrity.get(version);
                stmt.execute((package_id, version, published_at, integrity))?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO dist_tags (package_id, tag_name, version) VALUES (?1, ?2, ?3)",
            )?;
            for (tag_name, version) in &metadata.dist_tags {
                stmt.execute((package_id, tag_name, version))?;
            }
        }

        tx.commit()?;

        debug!("Successfully saved metadata for {}", package_name);
        Ok(())
    }

    fn mark_not_found(&self, package_name: &str) -> Result<(), CacheError> {
        let now = Self::current_timestamp_ms();
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            INSERT INTO packages (package_name, updated_at, not_found)
            VALUES (?1, ?2, 1)
            ON CONFLICT(package_name) DO UPDATE SET updated_at = excluded.updated_at, not_found = 1
            "#,
            (package_name, now),
        )?;

        Ok(())
    }
}

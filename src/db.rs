use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

use crate::ingest::JobStore;
use crate::models::{JobPosting, NewJobPosting, Platform};

const POSTING_COLUMNS: &str = "id, platform, job_key, raw_url, canonical_url, title, company, location,
     rating, salary, summary, easy_apply, active_hiring, posted_at, source_email_id, created_at";

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS job_postings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                platform TEXT NOT NULL,
                job_key TEXT,
                raw_url TEXT,
                canonical_url TEXT,
                title TEXT NOT NULL,
                company TEXT,
                location TEXT,
                rating REAL,
                salary TEXT,
                summary TEXT,
                easy_apply INTEGER,
                active_hiring INTEGER,
                posted_at TEXT,
                source_email_id TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (platform, job_key)
            );

            CREATE INDEX IF NOT EXISTS idx_postings_raw_url ON job_postings(raw_url);
            CREATE INDEX IF NOT EXISTS idx_postings_platform ON job_postings(platform);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='job_postings'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'jobmail init' first."));
        }
        Ok(())
    }

    pub fn get_posting(&self, id: i64) -> Result<Option<JobPosting>> {
        self.conn
            .query_row(
                &format!("SELECT {POSTING_COLUMNS} FROM job_postings WHERE id = ?1"),
                [id],
                Self::row_to_posting,
            )
            .optional()
            .context("Failed to load job posting")
    }

    pub fn list_postings(&self, platform: Option<Platform>) -> Result<Vec<JobPosting>> {
        let mut sql = format!("SELECT {POSTING_COLUMNS} FROM job_postings");
        if platform.is_some() {
            sql.push_str(" WHERE platform = ?1");
        }
        sql.push_str(" ORDER BY id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if let Some(p) = platform {
            stmt.query_map([p.as_str()], Self::row_to_posting)?
        } else {
            stmt.query_map([], Self::row_to_posting)?
        };

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list job postings")
    }

    fn row_to_posting(row: &rusqlite::Row) -> rusqlite::Result<JobPosting> {
        let platform: String = row.get(1)?;
        let platform = platform.parse::<Platform>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
        })?;

        let posted_at: Option<String> = row.get(13)?;
        let posted_at = posted_at
            .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(13, rusqlite::types::Type::Text, Box::new(e))
            })?;

        Ok(JobPosting {
            id: row.get(0)?,
            platform,
            job_key: row.get(2)?,
            raw_url: row.get(3)?,
            canonical_url: row.get(4)?,
            title: row.get(5)?,
            company: row.get(6)?,
            location: row.get(7)?,
            rating: row.get(8)?,
            salary: row.get(9)?,
            summary: row.get(10)?,
            easy_apply: row.get(11)?,
            active_hiring: row.get(12)?,
            posted_at,
            source_email_id: row.get(14)?,
            created_at: row.get(15)?,
        })
    }
}

impl JobStore for Database {
    fn find_by_job_key(&self, platform: Platform, job_key: &str) -> Result<Option<JobPosting>> {
        self.conn
            .query_row(
                &format!("SELECT {POSTING_COLUMNS} FROM job_postings WHERE platform = ?1 AND job_key = ?2"),
                params![platform.as_str(), job_key],
                Self::row_to_posting,
            )
            .optional()
            .context("Failed to look up posting by job key")
    }

    fn find_by_raw_url(&self, raw_url: &str) -> Result<Option<JobPosting>> {
        self.conn
            .query_row(
                &format!("SELECT {POSTING_COLUMNS} FROM job_postings WHERE raw_url = ?1 LIMIT 1"),
                [raw_url],
                Self::row_to_posting,
            )
            .optional()
            .context("Failed to look up posting by raw URL")
    }

    fn insert(&self, posting: NewJobPosting) -> Result<JobPosting> {
        self.conn.execute(
            "INSERT INTO job_postings (platform, job_key, raw_url, canonical_url, title, company,
                location, rating, salary, summary, easy_apply, active_hiring, posted_at, source_email_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                posting.platform.as_str(),
                posting.job_key,
                posting.raw_url,
                posting.canonical_url,
                posting.title,
                posting.company,
                posting.location,
                posting.rating,
                posting.salary,
                posting.summary,
                posting.easy_apply,
                posting.active_hiring,
                posting.posted_at.map(|dt| dt.to_rfc3339()),
                posting.source_email_id,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_posting(id)?
            .ok_or_else(|| anyhow!("Posting #{} vanished after insert", id))
    }
}

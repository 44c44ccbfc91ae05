use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::TitleSink;
use crate::scanner::PageId;
use crate::title::{TitleId, TitleMetadata, TitleRecord, TitleSource};

const TITLE_COLUMNS: &str = "t.id, t.title, t.folder, t.executable, t.thumbnail, t.developer, \
     t.publisher, t.release_date, t.rating, t.overview, t.xbe_title_id, t.source";

/// SQLite-backed title catalog
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open the catalog, creating the database file and tables if needed
    pub fn open(path: &Path) -> crate::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(2))?;
        Self::initialize_schema(&conn)?;
        debug!(path = %path.display(), "catalog opened");
        Ok(Self { conn })
    }

    /// In-memory catalog (useful for testing)
    pub fn in_memory() -> crate::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_schema(conn: &Connection) -> crate::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS titles (
                executable TEXT PRIMARY KEY,
                id INTEGER NOT NULL,
                page INTEGER,
                title TEXT NOT NULL,
                folder TEXT NOT NULL,
                thumbnail TEXT,
                developer TEXT,
                publisher TEXT,
                release_date TEXT,
                rating TEXT,
                overview TEXT,
                xbe_title_id INTEGER,
                source TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_titles_id ON titles(id);

            -- Launch history, newest has the highest seq
            CREATE TABLE IF NOT EXISTS recent (
                executable TEXT PRIMARY KEY REFERENCES titles(executable) ON DELETE CASCADE,
                launched_at INTEGER NOT NULL,
                seq INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_recent_seq ON recent(seq);
            "#,
        )?;
        Ok(())
    }

    fn upsert(&self, page: Option<PageId>, record: &TitleRecord) -> crate::Result<()> {
        let meta = &record.metadata;
        self.conn.execute(
            "INSERT INTO titles (executable, id, page, title, folder, thumbnail, developer,
                 publisher, release_date, rating, overview, xbe_title_id, source, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(executable) DO UPDATE SET
                 id = excluded.id,
                 page = COALESCE(excluded.page, titles.page),
                 title = excluded.title,
                 folder = excluded.folder,
                 thumbnail = excluded.thumbnail,
                 developer = excluded.developer,
                 publisher = excluded.publisher,
                 release_date = excluded.release_date,
                 rating = excluded.rating,
                 overview = excluded.overview,
                 xbe_title_id = excluded.xbe_title_id,
                 source = excluded.source,
                 updated_at = excluded.updated_at",
            params![
                path_text(&record.executable),
                record.id.0 as i64,
                page.map(|p| p as i64),
                record.title,
                path_text(&record.folder),
                record.thumbnail.as_deref().map(path_text),
                meta.developer,
                meta.publisher,
                meta.release_date,
                meta.rating,
                meta.overview,
                record.xbe_title_id,
                record.source.as_str(),
                unix_now(),
            ],
        )?;
        Ok(())
    }

    /// Remember that `record` was launched, moving it to the front of the
    /// recent list
    pub fn record_launch(&mut self, record: &TitleRecord) -> crate::Result<()> {
        self.upsert(None, record)?;
        self.conn.execute(
            "INSERT INTO recent (executable, launched_at, seq)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM recent))
             ON CONFLICT(executable) DO UPDATE SET
                 launched_at = excluded.launched_at,
                 seq = excluded.seq",
            params![path_text(&record.executable), unix_now()],
        )?;
        Ok(())
    }

    /// Most recently launched titles, newest first
    pub fn recent_titles(&self, limit: usize) -> crate::Result<Vec<TitleRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TITLE_COLUMNS} FROM recent r
             JOIN titles t ON t.executable = r.executable
             ORDER BY r.seq DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], row_to_record)?;

        let mut titles = Vec::new();
        for row in rows {
            titles.push(row?);
        }
        Ok(titles)
    }

    /// Drop launch history beyond the newest `limit` entries
    pub fn prune_recent(&mut self, limit: usize) -> crate::Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM recent WHERE executable NOT IN
                 (SELECT executable FROM recent ORDER BY seq DESC LIMIT ?1)",
            params![limit as i64],
        )?;
        Ok(removed)
    }

    pub fn title_count(&self) -> crate::Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM titles", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn find_title(&self, executable: &Path) -> crate::Result<Option<TitleRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {TITLE_COLUMNS} FROM titles t WHERE t.executable = ?1"),
                params![path_text(executable)],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }
}

impl TitleSink for SqliteCatalog {
    fn record_title(&mut self, page: PageId, record: &TitleRecord) -> crate::Result<()> {
        self.upsert(Some(page), record)
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<TitleRecord> {
    let id: i64 = row.get(0)?;
    let thumbnail: Option<String> = row.get(4)?;
    let source: String = row.get(11)?;

    Ok(TitleRecord {
        id: TitleId(id as u64),
        title: row.get(1)?,
        folder: PathBuf::from(row.get::<_, String>(2)?),
        executable: PathBuf::from(row.get::<_, String>(3)?),
        thumbnail: thumbnail.map(PathBuf::from),
        metadata: TitleMetadata {
            developer: row.get(5)?,
            publisher: row.get(6)?,
            release_date: row.get(7)?,
            rating: row.get(8)?,
            overview: row.get(9)?,
        },
        xbe_title_id: row.get(10)?,
        source: TitleSource::parse(&source),
    })
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanSettings;
    use tempfile::TempDir;

    fn record(name: &str) -> TitleRecord {
        let folder = PathBuf::from("/games").join(name);
        let mut record = TitleRecord::discover(
            &folder,
            folder.join("default.xbe"),
            Some(folder.join("default.tbn")),
            &ScanSettings::default(),
        );
        record.metadata.developer = Some(format!("{} Studio", name));
        record
    }

    #[test]
    fn test_record_title_upserts() {
        let mut catalog = SqliteCatalog::in_memory().unwrap();
        catalog.record_title(0, &record("Halo")).unwrap();
        catalog.record_title(0, &record("Halo")).unwrap();
        catalog.record_title(1, &record("Fable")).unwrap();

        assert_eq!(catalog.title_count().unwrap(), 2);
        let found = catalog
            .find_title(Path::new("/games/Halo/default.xbe"))
            .unwrap()
            .unwrap();
        assert_eq!(found, record("Halo"));
    }

    #[test]
    fn test_recent_order_and_relaunch() {
        let mut catalog = SqliteCatalog::in_memory().unwrap();
        for name in ["A", "B", "C"] {
            catalog.record_launch(&record(name)).unwrap();
        }
        catalog.record_launch(&record("A")).unwrap();

        let titles: Vec<String> = catalog
            .recent_titles(10)
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["A", "C", "B"]);
        assert_eq!(catalog.recent_titles(1).unwrap().len(), 1);
    }

    #[test]
    fn test_prune_recent() {
        let mut catalog = SqliteCatalog::in_memory().unwrap();
        for name in ["A", "B", "C", "D"] {
            catalog.record_launch(&record(name)).unwrap();
        }

        assert_eq!(catalog.prune_recent(2).unwrap(), 2);
        let titles: Vec<String> = catalog
            .recent_titles(10)
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["D", "C"]);
        // Pruning history keeps the titles themselves
        assert_eq!(catalog.title_count().unwrap(), 4);
    }

    #[test]
    fn test_open_persists_between_connections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("catalog.db");

        let mut catalog = SqliteCatalog::open(&path).unwrap();
        catalog.record_launch(&record("Halo")).unwrap();
        drop(catalog);

        let catalog = SqliteCatalog::open(&path).unwrap();
        assert_eq!(catalog.recent_titles(5).unwrap()[0].title, "Halo");
    }
}

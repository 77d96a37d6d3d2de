use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use crate::entry::{Entry, EntryId, EntryKind, NewEntry, VisibilityWindow};
use crate::error::StoreError;
use crate::store::{AllocatorStore, EntryStore, MessageStore, SiteMessage};
use crate::title::AllocatorState;

/// SQLite-backed store for curated entries, the title allocator and the site
/// message.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Mutex<rusqlite::Connection>>,
}

impl Database {
    pub fn memory() -> Result<Self, StoreError> {
        let db = rusqlite::Connection::open_in_memory()?;
        setup_connection(&db)?;

        let db = Arc::new(Mutex::new(db));
        Ok(Self { inner: db })
    }

    pub fn file<P: AsRef<Path>>(file: P) -> Result<Self, StoreError> {
        let db = rusqlite::Connection::open(file)?;
        setup_connection(&db)?;

        let db = Arc::new(Mutex::new(db));
        Ok(Self { inner: db })
    }

    fn lock(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

const ENTRY_COLUMNS: &str = "id, title, external_id, kind, added_at, starts_at, expires_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let kind: String = row.get(3)?;
    let kind = kind
        .parse::<EntryKind>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let window = VisibilityWindow::new(row.get(5)?, row.get(6)?)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(Entry {
        id: EntryId(row.get(0)?),
        title: row.get(1)?,
        external_id: row.get(2)?,
        kind,
        added_at: row.get(4)?,
        window,
    })
}

impl EntryStore for Database {
    fn list_all(&self) -> Result<Vec<Entry>, StoreError> {
        let db = self.lock()?;

        let mut stmt = db.prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY id"))?;
        let rows = stmt
            .query_map([], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    fn get(&self, id: EntryId) -> Result<Option<Entry>, StoreError> {
        let db = self.lock()?;

        let entry = db
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                [id.0],
                entry_from_row,
            )
            .optional()?;

        Ok(entry)
    }

    fn insert(&self, entry: NewEntry) -> Result<Entry, StoreError> {
        let db = self.lock()?;

        db.execute(
            "INSERT INTO entries (title, external_id, kind, added_at, starts_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.title,
                entry.external_id,
                entry.kind.as_str(),
                entry.added_at,
                entry.window.starts_at(),
                entry.window.expires_at(),
            ],
        )?;

        Ok(Entry {
            id: EntryId(db.last_insert_rowid()),
            title: entry.title,
            external_id: entry.external_id,
            kind: entry.kind,
            added_at: entry.added_at,
            window: entry.window,
        })
    }

    fn delete_by_id(&self, id: EntryId) -> Result<bool, StoreError> {
        let db = self.lock()?;
        let removed = db.execute("DELETE FROM entries WHERE id = ?1", [id.0])?;

        Ok(removed > 0)
    }

    fn delete_by_title_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let db = self.lock()?;

        // substr instead of LIKE so '%' and '_' in the prefix match literally.
        let removed = db.execute(
            "DELETE FROM entries WHERE substr(title, 1, length(?1)) = ?1",
            [prefix],
        )?;

        Ok(removed)
    }
}

impl AllocatorStore for Database {
    fn load(&self) -> Result<AllocatorState, StoreError> {
        let db = self.lock()?;
        ensure_allocator_row(&db)?;

        let state = db.query_row(
            "SELECT prefix, counter FROM allocator WHERE id = 1",
            [],
            |row| {
                Ok(AllocatorState {
                    prefix: row.get(0)?,
                    counter: row.get(1)?,
                })
            },
        )?;

        Ok(state)
    }

    fn compare_and_swap(
        &self,
        expected: &AllocatorState,
        new_state: &AllocatorState,
    ) -> Result<bool, StoreError> {
        let db = self.lock()?;
        ensure_allocator_row(&db)?;

        let swapped = db.execute(
            "UPDATE allocator SET prefix = ?1, counter = ?2
             WHERE id = 1 AND prefix = ?3 AND counter = ?4",
            params![
                new_state.prefix,
                new_state.counter,
                expected.prefix,
                expected.counter
            ],
        )?;

        Ok(swapped == 1)
    }
}

impl MessageStore for Database {
    fn current(&self) -> Result<Option<SiteMessage>, StoreError> {
        let db = self.lock()?;

        let message = db
            .query_row(
                "SELECT content, updated_at FROM message WHERE id = 1",
                [],
                |row| {
                    Ok(SiteMessage {
                        content: row.get(0)?,
                        updated_at: row.get::<_, DateTime<Utc>>(1)?,
                    })
                },
            )
            .optional()?;

        Ok(message)
    }

    fn set(&self, message: SiteMessage) -> Result<(), StoreError> {
        let db = self.lock()?;

        db.execute(
            "INSERT INTO message (id, content, updated_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at",
            params![message.content, message.updated_at],
        )?;

        Ok(())
    }
}

fn ensure_allocator_row(db: &rusqlite::Connection) -> Result<(), StoreError> {
    let defaults = AllocatorState::default();
    db.execute(
        "INSERT OR IGNORE INTO allocator (id, prefix, counter) VALUES (1, ?1, ?2)",
        params![defaults.prefix, defaults.counter],
    )?;

    Ok(())
}

fn setup_connection(db: &rusqlite::Connection) -> Result<(), StoreError> {
    db.execute_batch(
        r#"
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL CHECK (length(title) > 0),
                external_id TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('video', 'playlist')),
                added_at DATETIME NOT NULL,
                starts_at DATETIME,
                expires_at DATETIME,
                -- Instants are written as fixed-layout UTC text, so text order is
                -- time order down to the nanosecond. julianday() stops at milliseconds.
                CHECK (starts_at IS NULL OR expires_at IS NULL
                       OR expires_at > starts_at)
            );

            CREATE TABLE IF NOT EXISTS allocator (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                prefix TEXT NOT NULL,
                counter INTEGER NOT NULL CHECK (counter >= 0)
            );

            CREATE TABLE IF NOT EXISTS message (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                content TEXT NOT NULL,
                updated_at DATETIME NOT NULL
            );
            "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use chrono::{DateTime, TimeDelta, Utc};

    use crate::db::Database;
    use crate::entry::{EntryId, EntryKind, NewEntry, VisibilityWindow};
    use crate::store::{AllocatorStore, EntryStore, MessageStore, SiteMessage};
    use crate::title::AllocatorState;

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::from_str("2000-01-01 00:00:00Z").unwrap()
    }

    fn video(title: &str, added_at: DateTime<Utc>) -> NewEntry {
        NewEntry {
            title: title.to_string(),
            external_id: "dQw4w9WgXcQ".to_string(),
            kind: EntryKind::Video,
            added_at,
            window: VisibilityWindow::unbounded(),
        }
    }

    #[test]
    pub fn test_init() {
        let db = Database::memory().unwrap();
        assert!(db.list_all().unwrap().is_empty());
        assert!(db.current().unwrap().is_none());
    }

    #[test]
    pub fn test_rw() {
        let db = Database::memory().unwrap();

        let start = t0() + TimeDelta::hours(13);
        let expiry = t0() + TimeDelta::hours(15);
        let scheduled = NewEntry {
            title: "Evening stream".to_string(),
            external_id: "PLrAXtmRdnEQy".to_string(),
            kind: EntryKind::Playlist,
            added_at: t0(),
            window: VisibilityWindow::new(Some(start), Some(expiry)).unwrap(),
        };

        let a = db.insert(scheduled.clone()).unwrap();
        let b = db.insert(video("Video 1", t0() + TimeDelta::seconds(30))).unwrap();
        assert_ne!(a.id, b.id);

        let all = db.list_all().unwrap();
        assert_eq!(all, vec![a.clone(), b.clone()]);
        assert_eq!(all[0].window.starts_at(), Some(start));
        assert_eq!(all[0].window.expires_at(), Some(expiry));
        assert_eq!(all[0].kind, EntryKind::Playlist);

        assert_eq!(db.get(b.id).unwrap(), Some(b));
        assert_eq!(db.get(EntryId(999)).unwrap(), None);
    }

    #[test]
    pub fn test_sub_millisecond_window() {
        let db = Database::memory().unwrap();

        let start = t0() + TimeDelta::microseconds(100);
        let expiry = start + TimeDelta::microseconds(200);
        let mut entry = video("Video 1", t0());
        entry.window = VisibilityWindow::new(Some(start), Some(expiry)).unwrap();

        let id = db.insert(entry).unwrap().id;
        let stored = db.get(id).unwrap().unwrap();
        assert_eq!(stored.window.starts_at(), Some(start));
        assert_eq!(stored.window.expires_at(), Some(expiry));

        // The table still refuses an empty window written behind the type's back.
        let conn = db.lock().unwrap();
        let rejected = conn.execute(
            "INSERT INTO entries (title, external_id, kind, added_at, starts_at, expires_at)
             VALUES ('x', 'dQw4w9WgXcQ', 'video', ?1, ?2, ?2)",
            rusqlite::params![t0(), start],
        );
        assert!(rejected.is_err());
    }

    #[test]
    pub fn test_ids_never_reused() {
        let db = Database::memory().unwrap();

        let first = db.insert(video("Video 1", t0())).unwrap();
        assert!(db.delete_by_id(first.id).unwrap());
        assert!(!db.delete_by_id(first.id).unwrap());

        let second = db.insert(video("Video 2", t0())).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    pub fn test_delete_by_title_prefix() {
        let db = Database::memory().unwrap();

        db.insert(video("TEST - one", t0())).unwrap();
        db.insert(video("TEST - two", t0())).unwrap();
        db.insert(video("Video 1", t0())).unwrap();
        db.insert(video("TEST_100% real", t0())).unwrap();

        assert_eq!(db.delete_by_title_prefix("TEST -").unwrap(), 2);
        let titles: Vec<String> = db.list_all().unwrap().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["Video 1", "TEST_100% real"]);

        assert_eq!(db.delete_by_title_prefix("TEST%").unwrap(), 0);
    }

    #[test]
    pub fn test_allocator_lazy_default_and_swap() {
        let db = Database::memory().unwrap();

        let state = db.load().unwrap();
        assert_eq!(state, AllocatorState::default());

        let next = AllocatorState {
            prefix: "Video".to_string(),
            counter: 1,
        };
        assert!(db.compare_and_swap(&state, &next).unwrap());
        // The stale expectation no longer matches.
        assert!(!db.compare_and_swap(&state, &next).unwrap());
        assert_eq!(db.load().unwrap(), next);

        // A prefix change alone also invalidates the expectation.
        let renamed = AllocatorState {
            prefix: "Episode".to_string(),
            counter: 1,
        };
        assert!(db.compare_and_swap(&next, &renamed).unwrap());
        assert!(!db.compare_and_swap(&next, &next).unwrap());
    }

    #[test]
    pub fn test_message_upsert() {
        let db = Database::memory().unwrap();

        db.set(SiteMessage {
            content: "Welcome".to_string(),
            updated_at: t0(),
        })
        .unwrap();
        db.set(SiteMessage {
            content: "Live tonight at 18:30".to_string(),
            updated_at: t0() + TimeDelta::days(1),
        })
        .unwrap();

        let message = db.current().unwrap().unwrap();
        assert_eq!(message.content, "Live tonight at 18:30");
        assert_eq!(message.updated_at, t0() + TimeDelta::days(1));
    }
}

use std::path::Path;
use std::str::FromStr;
use std::sync::{ Arc, Mutex, MutexGuard };

use async_trait::async_trait;
use log::error;
use rusqlite::{ params, Connection };

use crate::error::HistoryError;
use crate::models::chat::{ MessageRecord, Role };
use super::HistoryStore;

/// Embedded document store backed by a local SQLite file. Records are keyed
/// by conversation id and role metadata; `search` is a plain metadata
/// equality query, so recall is exact for everything ever appended.
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                UNIQUE(conversation_id, sequence)
            );
            CREATE INDEX IF NOT EXISTS idx_messages_conversation
                ON messages(conversation_id);"
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, HistoryError> {
        self.conn
            .lock()
            .map_err(|_| HistoryError::BackendUnavailable("sqlite connection poisoned".to_string()))
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, record: MessageRecord) -> Result<(), HistoryError> {
        record.validate()?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO messages (conversation_id, role, content, sequence)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.conversation_id,
                record.role.as_str(),
                record.content,
                record.sequence
            ]
        )?;
        Ok(())
    }

    async fn search(&self, conversation_id: &str) -> Result<Vec<MessageRecord>, HistoryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT role, content, sequence FROM messages
             WHERE conversation_id = ?1 ORDER BY sequence ASC"
        )?;

        let rows = stmt.query_map(params![conversation_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (role, content, sequence) = row?;
            match Role::from_str(&role) {
                Ok(role) => {
                    messages.push(MessageRecord::new(conversation_id, role, &content, sequence));
                }
                Err(e) => {
                    error!("Skipping undecodable history row: {}", e);
                }
            }
        }

        Ok(messages)
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), HistoryError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM messages WHERE conversation_id = ?1", params![conversation_id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_store(dir: &tempfile::TempDir) -> SqliteHistoryStore {
        SqliteHistoryStore::open(dir.path().join("history.db")).unwrap()
    }

    #[tokio::test]
    async fn search_returns_records_in_append_order() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.append(MessageRecord::new("c1", Role::User, "Hola", 10)).await.unwrap();
        store
            .append(
                MessageRecord::new("c1", Role::Assistant, "Hola, ¿en qué puedo ayudarte?", 20)
            ).await
            .unwrap();

        let found = store.search("c1").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].content, "Hola");
        assert_eq!(found[1].content, "Hola, ¿en qué puedo ayudarte?");
        assert!(store.search("c2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_record_leaves_sequence_untouched() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.append(MessageRecord::new("c1", Role::User, "hola", 1)).await.unwrap();
        let result = store.append(MessageRecord::new("c1", Role::User, "  ", 2)).await;

        assert!(matches!(result, Err(HistoryError::InvalidRecord(_))));
        assert_eq!(store.search("c1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_truncates_and_id_stays_usable() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.append(MessageRecord::new("c1", Role::User, "hola", 1)).await.unwrap();
        store.clear("c1").await.unwrap();
        assert!(store.search("c1").await.unwrap().is_empty());

        store.append(MessageRecord::new("c1", Role::User, "de nuevo", 2)).await.unwrap();
        assert_eq!(store.search("c1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.db");

        {
            let store = SqliteHistoryStore::open(&path).unwrap();
            store.append(MessageRecord::new("c1", Role::User, "persistente", 1)).await.unwrap();
        }

        let reopened = SqliteHistoryStore::open(&path).unwrap();
        let found = reopened.search("c1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "persistente");
    }

    #[tokio::test]
    async fn duplicate_sequence_is_refused() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.append(MessageRecord::new("c1", Role::User, "uno", 5)).await.unwrap();
        let result = store.append(MessageRecord::new("c1", Role::User, "dos", 5)).await;
        assert!(matches!(result, Err(HistoryError::BackendUnavailable(_))));

        // Same position in a different conversation is fine.
        store.append(MessageRecord::new("c2", Role::User, "dos", 5)).await.unwrap();
    }
}

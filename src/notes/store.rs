//! Note Storage
//! Mission: Every query scoped to one owner, notes written atomically with their tags

use crate::db::{conflict_on_unique, now_timestamp, Database, StoreError};
use crate::notes::models::{
    Collection, Folder, FolderChange, NewNote, Note, NoteFilter, NoteUpdate, OwnedRef, Tag,
};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

/// Storage for notes and the folders/tags they reference
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn find_owned_by_id(
        &self,
        collection: Collection,
        id: &str,
        user_id: &str,
    ) -> Result<Option<OwnedRef>, StoreError>;

    /// Every row of `collection` whose id is in `ids` and that `user_id` owns
    async fn find_owned_by_ids(
        &self,
        collection: Collection,
        ids: &[String],
        user_id: &str,
    ) -> Result<Vec<OwnedRef>, StoreError>;

    async fn list_notes(&self, user_id: &str, filter: NoteFilter)
        -> Result<Vec<Note>, StoreError>;

    async fn get_note(&self, user_id: &str, id: &str) -> Result<Option<Note>, StoreError>;

    async fn create_note(&self, user_id: &str, note: NewNote) -> Result<Note, StoreError>;

    /// `Ok(None)` when the note does not exist for this user
    async fn update_note(
        &self,
        user_id: &str,
        id: &str,
        update: NoteUpdate,
    ) -> Result<Option<Note>, StoreError>;

    async fn delete_note(&self, user_id: &str, id: &str) -> Result<bool, StoreError>;

    async fn list_folders(&self, user_id: &str) -> Result<Vec<Folder>, StoreError>;

    async fn create_folder(&self, user_id: &str, name: &str) -> Result<Folder, StoreError>;

    async fn list_tags(&self, user_id: &str) -> Result<Vec<Tag>, StoreError>;

    async fn create_tag(&self, user_id: &str, name: &str) -> Result<Tag, StoreError>;
}

const NOTE_COLUMNS: &str =
    "id, title, content, folder_id, user_id, created_at, updated_at";

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        folder_id: row.get(3)?,
        tags: Vec::new(),
        user_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        user_id: row.get(2)?,
    })
}

fn folder_from_row(row: &Row<'_>) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        name: row.get(1)?,
        user_id: row.get(2)?,
    })
}

fn populate_tags(conn: &Connection, note: &mut Note) -> Result<(), StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT t.id, t.name, t.user_id
         FROM note_tags nt JOIN tags t ON t.id = nt.tag_id
         WHERE nt.note_id = ?1
         ORDER BY t.name",
    )?;
    note.tags = stmt
        .query_map(params![note.id], tag_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(())
}

fn load_note(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Note>, StoreError> {
    let note = conn
        .query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id],
            note_from_row,
        )
        .optional()?;

    match note {
        Some(mut note) => {
            populate_tags(conn, &mut note)?;
            Ok(Some(note))
        }
        None => Ok(None),
    }
}

fn link_tags(conn: &Connection, note_id: &str, tags: &[String]) -> Result<(), StoreError> {
    let mut stmt = conn.prepare_cached("INSERT INTO note_tags (note_id, tag_id) VALUES (?1, ?2)")?;
    for tag_id in tags {
        stmt.execute(params![note_id, tag_id])?;
    }
    Ok(())
}

/// `%term%` for LIKE, with the wildcards inside `term` escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl NoteStore for Database {
    async fn find_owned_by_id(
        &self,
        collection: Collection,
        id: &str,
        user_id: &str,
    ) -> Result<Option<OwnedRef>, StoreError> {
        let (id, user_id) = (id.to_string(), user_id.to_string());
        self.call(move |conn| {
            let sql = format!(
                "SELECT id FROM {} WHERE id = ?1 AND user_id = ?2",
                collection.table()
            );
            let found = conn
                .query_row(&sql, params![id, user_id], |row| {
                    Ok(OwnedRef { id: row.get(0)? })
                })
                .optional()?;
            Ok(found)
        })
        .await
    }

    async fn find_owned_by_ids(
        &self,
        collection: Collection,
        ids: &[String],
        user_id: &str,
    ) -> Result<Vec<OwnedRef>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut values = Vec::with_capacity(ids.len() + 1);
        values.push(user_id.to_string());
        values.extend(ids.iter().cloned());

        self.call(move |conn| {
            let placeholders = (2..=values.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT id FROM {} WHERE user_id = ?1 AND id IN ({placeholders})",
                collection.table()
            );
            let mut stmt = conn.prepare(&sql)?;
            let found = stmt
                .query_map(params_from_iter(values.iter()), |row| {
                    Ok(OwnedRef { id: row.get(0)? })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(found)
        })
        .await
    }

    async fn list_notes(
        &self,
        user_id: &str,
        filter: NoteFilter,
    ) -> Result<Vec<Note>, StoreError> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            let mut sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = ?1");
            let mut values = vec![user_id];

            if let Some(term) = filter.search_term.filter(|t| !t.is_empty()) {
                values.push(like_pattern(&term));
                let n = values.len();
                sql.push_str(&format!(
                    " AND (lower(title) LIKE ?{n} ESCAPE '\\' OR lower(content) LIKE ?{n} ESCAPE '\\')"
                ));
            }
            if let Some(folder_id) = filter.folder_id.filter(|f| !f.is_empty()) {
                values.push(folder_id);
                sql.push_str(&format!(" AND folder_id = ?{}", values.len()));
            }
            if let Some(tag_id) = filter.tag_id.filter(|t| !t.is_empty()) {
                values.push(tag_id);
                sql.push_str(&format!(
                    " AND EXISTS (SELECT 1 FROM note_tags nt WHERE nt.note_id = notes.id AND nt.tag_id = ?{})",
                    values.len()
                ));
            }
            sql.push_str(" ORDER BY updated_at DESC, rowid DESC");

            let mut stmt = conn.prepare(&sql)?;
            let mut notes = stmt
                .query_map(params_from_iter(values.iter()), note_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            for note in &mut notes {
                populate_tags(conn, note)?;
            }

            debug!(count = notes.len(), "Listed notes");
            Ok(notes)
        })
        .await
    }

    async fn get_note(&self, user_id: &str, id: &str) -> Result<Option<Note>, StoreError> {
        let (user_id, id) = (user_id.to_string(), id.to_string());
        self.call(move |conn| load_note(conn, &user_id, &id)).await
    }

    async fn create_note(&self, user_id: &str, note: NewNote) -> Result<Note, StoreError> {
        let user_id = user_id.to_string();
        let note = self
            .call(move |conn| {
                let id = Uuid::new_v4().to_string();
                let now = now_timestamp();

                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO notes (id, title, content, folder_id, user_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                    params![id, note.title, note.content, note.folder_id, user_id, now],
                )?;
                link_tags(&tx, &id, &note.tags)?;
                tx.commit()?;

                load_note(conn, &user_id, &id)?
                    .ok_or_else(|| StoreError::Task(format!("note {id} vanished after insert")))
            })
            .await?;

        info!(note_id = %note.id, user_id = %note.user_id, "Created note");
        Ok(note)
    }

    async fn update_note(
        &self,
        user_id: &str,
        id: &str,
        update: NoteUpdate,
    ) -> Result<Option<Note>, StoreError> {
        let (user_id, id) = (user_id.to_string(), id.to_string());
        self.call(move |conn| {
            let tx = conn.transaction()?;

            let exists = tx
                .query_row(
                    "SELECT 1 FROM notes WHERE id = ?1 AND user_id = ?2",
                    params![id, user_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !exists {
                return Ok(None);
            }

            if let Some(title) = &update.title {
                tx.execute("UPDATE notes SET title = ?1 WHERE id = ?2", params![title, id])?;
            }
            if let Some(content) = &update.content {
                tx.execute("UPDATE notes SET content = ?1 WHERE id = ?2", params![content, id])?;
            }
            match &update.folder {
                FolderChange::Keep => {}
                FolderChange::Clear => {
                    tx.execute("UPDATE notes SET folder_id = NULL WHERE id = ?1", params![id])?;
                }
                FolderChange::Set(folder_id) => {
                    tx.execute(
                        "UPDATE notes SET folder_id = ?1 WHERE id = ?2",
                        params![folder_id, id],
                    )?;
                }
            }
            if let Some(tags) = &update.tags {
                tx.execute("DELETE FROM note_tags WHERE note_id = ?1", params![id])?;
                link_tags(&tx, &id, tags)?;
            }
            tx.execute(
                "UPDATE notes SET updated_at = ?1 WHERE id = ?2",
                params![now_timestamp(), id],
            )?;
            tx.commit()?;

            load_note(conn, &user_id, &id)
        })
        .await
    }

    async fn delete_note(&self, user_id: &str, id: &str) -> Result<bool, StoreError> {
        let (user_id, id) = (user_id.to_string(), id.to_string());
        let deleted = self
            .call(move |conn| {
                let rows = conn.execute(
                    "DELETE FROM notes WHERE id = ?1 AND user_id = ?2",
                    params![id, user_id],
                )?;
                Ok(rows > 0)
            })
            .await?;
        Ok(deleted)
    }

    async fn list_folders(&self, user_id: &str) -> Result<Vec<Folder>, StoreError> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, user_id FROM folders WHERE user_id = ?1 ORDER BY name",
            )?;
            let folders = stmt
                .query_map(params![user_id], folder_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(folders)
        })
        .await
    }

    async fn create_folder(&self, user_id: &str, name: &str) -> Result<Folder, StoreError> {
        let folder = Folder {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            user_id: user_id.to_string(),
        };
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO folders (id, name, user_id) VALUES (?1, ?2, ?3)",
                params![folder.id, folder.name, folder.user_id],
            )
            .map_err(|e| conflict_on_unique(e, "The folder name already exists"))?;
            Ok(folder)
        })
        .await
    }

    async fn list_tags(&self, user_id: &str) -> Result<Vec<Tag>, StoreError> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, user_id FROM tags WHERE user_id = ?1 ORDER BY name")?;
            let tags = stmt
                .query_map(params![user_id], tag_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tags)
        })
        .await
    }

    async fn create_tag(&self, user_id: &str, name: &str) -> Result<Tag, StoreError> {
        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            user_id: user_id.to_string(),
        };
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO tags (id, name, user_id) VALUES (?1, ?2, ?3)",
                params![tag.id, tag.name, tag.user_id],
            )
            .map_err(|e| conflict_on_unique(e, "The tag name already exists"))?;
            Ok(tag)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::NewUser;
    use crate::auth::user_store::CredentialStore;
    use tempfile::NamedTempFile;

    struct Fixture {
        db: Database,
        alice: String,
        bob: String,
        _temp: NamedTempFile,
    }

    async fn fixture() -> Fixture {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let mut ids = Vec::new();
        for username in ["alice", "bob"] {
            let user = db
                .create_user(NewUser {
                    username: username.to_string(),
                    fullname: String::new(),
                    password_hash: "digest".to_string(),
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        let bob = ids.pop().unwrap();
        let alice = ids.pop().unwrap();
        Fixture {
            db,
            alice,
            bob,
            _temp: temp,
        }
    }

    fn new_note(title: &str, folder_id: Option<String>, tags: Vec<String>) -> NewNote {
        NewNote {
            title: title.to_string(),
            content: format!("{title} body"),
            folder_id,
            tags,
        }
    }

    #[tokio::test]
    async fn test_owned_lookups_are_scoped() {
        let f = fixture().await;
        let folder = f.db.create_folder(&f.alice, "Work").await.unwrap();
        let tag = f.db.create_tag(&f.alice, "urgent").await.unwrap();

        assert!(f
            .db
            .find_owned_by_id(Collection::Folders, &folder.id, &f.alice)
            .await
            .unwrap()
            .is_some());
        assert!(f
            .db
            .find_owned_by_id(Collection::Folders, &folder.id, &f.bob)
            .await
            .unwrap()
            .is_none());

        let ids = vec![tag.id.clone(), Uuid::new_v4().to_string()];
        let owned = f
            .db
            .find_owned_by_ids(Collection::Tags, &ids, &f.alice)
            .await
            .unwrap();
        assert_eq!(owned, vec![OwnedRef { id: tag.id.clone() }]);
        assert!(f
            .db
            .find_owned_by_ids(Collection::Tags, &ids, &f.bob)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_create_and_get_note_with_tags() {
        let f = fixture().await;
        let folder = f.db.create_folder(&f.alice, "Work").await.unwrap();
        let tag = f.db.create_tag(&f.alice, "urgent").await.unwrap();

        let note = f
            .db
            .create_note(
                &f.alice,
                new_note("Plan", Some(folder.id.clone()), vec![tag.id.clone()]),
            )
            .await
            .unwrap();
        assert_eq!(note.folder_id.as_deref(), Some(folder.id.as_str()));
        assert_eq!(note.tags, vec![tag]);

        let fetched = f.db.get_note(&f.alice, &note.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Plan");
        assert!(f.db.get_note(&f.bob, &note.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let f = fixture().await;
        let folder = f.db.create_folder(&f.alice, "Work").await.unwrap();
        let tag = f.db.create_tag(&f.alice, "urgent").await.unwrap();

        f.db.create_note(&f.alice, new_note("Groceries", None, vec![]))
            .await
            .unwrap();
        f.db.create_note(
            &f.alice,
            new_note("Quarterly report", Some(folder.id.clone()), vec![tag.id.clone()]),
        )
        .await
        .unwrap();
        f.db.create_note(&f.bob, new_note("Bob's groceries", None, vec![]))
            .await
            .unwrap();

        let all = f.db.list_notes(&f.alice, NoteFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Quarterly report");

        let search = NoteFilter {
            search_term: Some("GROCER".to_string()),
            ..Default::default()
        };
        let found = f.db.list_notes(&f.alice, search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Groceries");

        let by_folder = NoteFilter {
            folder_id: Some(folder.id.clone()),
            ..Default::default()
        };
        assert_eq!(f.db.list_notes(&f.alice, by_folder).await.unwrap().len(), 1);

        let by_tag = NoteFilter {
            tag_id: Some(tag.id.clone()),
            ..Default::default()
        };
        let tagged = f.db.list_notes(&f.alice, by_tag).await.unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].tags.len(), 1);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let f = fixture().await;
        f.db.create_note(&f.alice, new_note("100% done", None, vec![]))
            .await
            .unwrap();
        f.db.create_note(&f.alice, new_note("100 items", None, vec![]))
            .await
            .unwrap();

        let filter = NoteFilter {
            search_term: Some("100%".to_string()),
            ..Default::default()
        };
        let found = f.db.list_notes(&f.alice, filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "100% done");
    }

    #[tokio::test]
    async fn test_update_note() {
        let f = fixture().await;
        let folder = f.db.create_folder(&f.alice, "Work").await.unwrap();
        let tag = f.db.create_tag(&f.alice, "urgent").await.unwrap();
        let note = f
            .db
            .create_note(
                &f.alice,
                new_note("Draft", Some(folder.id.clone()), vec![tag.id.clone()]),
            )
            .await
            .unwrap();

        let update = NoteUpdate {
            title: Some("Final".to_string()),
            content: None,
            folder: FolderChange::Clear,
            tags: Some(vec![]),
        };
        let updated = f
            .db
            .update_note(&f.alice, &note.id, update.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.content, "Draft body");
        assert_eq!(updated.folder_id, None);
        assert!(updated.tags.is_empty());
        assert!(updated.updated_at >= note.updated_at);

        assert!(f
            .db
            .update_note(&f.bob, &note.id, update)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_note_is_scoped() {
        let f = fixture().await;
        let tag = f.db.create_tag(&f.alice, "urgent").await.unwrap();
        let note = f
            .db
            .create_note(&f.alice, new_note("Temp", None, vec![tag.id]))
            .await
            .unwrap();

        assert!(!f.db.delete_note(&f.bob, &note.id).await.unwrap());
        assert!(f.db.delete_note(&f.alice, &note.id).await.unwrap());
        assert!(f.db.get_note(&f.alice, &note.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_folder_and_tag_names_unique_per_user() {
        let f = fixture().await;
        f.db.create_folder(&f.alice, "Work").await.unwrap();
        f.db.create_folder(&f.bob, "Work").await.unwrap();
        assert!(matches!(
            f.db.create_folder(&f.alice, "Work").await,
            Err(StoreError::Conflict(_))
        ));

        f.db.create_tag(&f.alice, "urgent").await.unwrap();
        assert!(matches!(
            f.db.create_tag(&f.alice, "urgent").await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(f.db.list_folders(&f.alice).await.unwrap().len(), 1);
        assert_eq!(f.db.list_tags(&f.bob).await.unwrap().len(), 0);
    }
}

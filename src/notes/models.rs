//! Note, Folder and Tag Models
//! Mission: Define note data structures and turn raw request bodies into checked inputs

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub user_id: String,
}

/// A note with its tags populated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub tags: Vec<Tag>,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Collections whose rows belong to a single user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Folders,
    Tags,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Folders => "folders",
            Collection::Tags => "tags",
        }
    }
}

/// Minimal view of an owned row, enough to prove it exists for a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedRef {
    pub id: String,
}

/// Query-string filters for listing notes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFilter {
    pub search_term: Option<String>,
    pub folder_id: Option<String>,
    pub tag_id: Option<String>,
}

/// Body of POST /api/folders and POST /api/tags
#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: Option<String>,
}

/// A validated note ready to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub folder_id: Option<String>,
    pub tags: Vec<String>,
}

/// What an update does to the folder reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderChange {
    Keep,
    Clear,
    Set(String),
}

/// A validated partial update. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder: FolderChange,
    pub tags: Option<Vec<String>>,
}

impl NoteUpdate {
    pub fn folder_id(&self) -> Option<&str> {
        match &self.folder {
            FolderChange::Set(id) => Some(id),
            _ => None,
        }
    }
}

/// Only the lowercase hyphenated form ids are stored in
pub fn is_valid_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok_and(|uuid| uuid.hyphenated().to_string() == id)
}

/// 400 unless `id` looks like one of ours
pub fn ensure_valid_id(id: &str, message: &str) -> Result<(), ApiError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(message.to_string()))
    }
}

fn object(body: &Value) -> Result<&Map<String, Value>, ApiError> {
    body.as_object()
        .ok_or_else(|| ApiError::BadRequest("Request body must be a JSON object".to_string()))
}

/// Present and not null
fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

fn parse_title(value: Option<&Value>) -> Result<String, ApiError> {
    match value.and_then(Value::as_str) {
        Some(title) if !title.is_empty() => Ok(title.to_string()),
        _ => Err(ApiError::BadRequest(
            "Missing `title` in request body".to_string(),
        )),
    }
}

fn parse_content(value: Option<&Value>) -> Result<String, ApiError> {
    match value {
        None => Ok(String::new()),
        Some(Value::String(content)) => Ok(content.clone()),
        Some(_) => Err(ApiError::BadRequest(
            "The `content` must be a string".to_string(),
        )),
    }
}

/// `Ok(None)` for an empty folder id, which means "no folder"
fn parse_folder_id(value: &Value) -> Result<Option<String>, ApiError> {
    match value.as_str() {
        Some("") => Ok(None),
        Some(id) if is_valid_id(id) => Ok(Some(id.to_string())),
        _ => Err(ApiError::BadRequest("The `folderId` is not valid".to_string())),
    }
}

/// Tag ids in request order with duplicates dropped
fn parse_tags(value: &Value) -> Result<Vec<String>, ApiError> {
    let Some(items) = value.as_array() else {
        return Err(ApiError::BadRequest("`tags` are not an array".to_string()));
    };

    let mut tags: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str() {
            Some(id) if is_valid_id(id) => {
                if !tags.iter().any(|t| t == id) {
                    tags.push(id.to_string());
                }
            }
            _ => {
                return Err(ApiError::BadRequest(
                    "The `tags` array contains an invalid `id`".to_string(),
                ))
            }
        }
    }
    Ok(tags)
}

impl NewNote {
    pub fn from_json(body: &Value) -> Result<Self, ApiError> {
        let fields = object(body)?;

        let title = parse_title(field(fields, "title"))?;
        let tags = match field(fields, "tags") {
            Some(tags) => parse_tags(tags)?,
            None => Vec::new(),
        };
        let folder_id = match field(fields, "folderId") {
            Some(folder_id) => parse_folder_id(folder_id)?,
            None => None,
        };
        let content = parse_content(field(fields, "content"))?;

        Ok(Self {
            title,
            content,
            folder_id,
            tags,
        })
    }
}

impl NoteUpdate {
    pub fn from_json(body: &Value) -> Result<Self, ApiError> {
        let fields = object(body)?;

        let title = match fields.get("title") {
            Some(title) => Some(parse_title(Some(title))?),
            None => None,
        };
        let content = match fields.get("content") {
            Some(content) => Some(parse_content(Some(content))?),
            None => None,
        };
        let folder = match fields.get("folderId") {
            None => FolderChange::Keep,
            Some(Value::Null) => FolderChange::Clear,
            Some(folder_id) => match parse_folder_id(folder_id)? {
                Some(id) => FolderChange::Set(id),
                None => FolderChange::Clear,
            },
        };
        let tags = match fields.get("tags") {
            None => None,
            Some(Value::Null) => Some(Vec::new()),
            Some(tags) => Some(parse_tags(tags)?),
        };

        Ok(Self {
            title,
            content,
            folder,
            tags,
        })
    }
}

use std::fmt;
use std::str::FromStr;

use mongodb::bson::oid::ObjectId;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Identifier of a stored record.
///
/// The in-memory accessor hands out sequential numbers, the document store
/// generates `ObjectId`s. In JSON a `Seq` id is a number and an `Object` id is
/// its 24 character hex string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordId {
    /// Sequential identifier.
    Seq(u64),
    /// Document store identifier.
    Object(ObjectId),
}

/// Error returned when a path segment is not a valid [`RecordId`].
#[derive(Debug, Error)]
#[error("invalid record id `{0}`")]
pub struct ParseRecordIdError(String);

impl FromStr for RecordId {
    type Err = ParseRecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse::<u64>()
                .map(Self::Seq)
                .map_err(|_| ParseRecordIdError(s.to_owned()))
        } else {
            ObjectId::parse_str(s)
                .map(Self::Object)
                .map_err(|_| ParseRecordIdError(s.to_owned()))
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seq(id) => write!(f, "{id}"),
            Self::Object(oid) => write!(f, "{}", oid.to_hex()),
        }
    }
}

impl From<ObjectId> for RecordId {
    fn from(oid: ObjectId) -> Self {
        Self::Object(oid)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Seq(id) => serializer.serialize_u64(*id),
            Self::Object(oid) => serializer.serialize_str(&oid.to_hex()),
        }
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Seq(u64),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Seq(id) => Ok(Self::Seq(id)),
            Repr::Text(text) => text.parse().map_err(de::Error::custom),
        }
    }
}

/// A published blog post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    /// Store assigned identifier.
    pub id: RecordId,
    /// Post title.
    pub title: String,
    /// Post body.
    pub content: String,
}

/// Rejected input for a new record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Title or content is missing or empty.
    #[error("title and content are required")]
    MissingPostFields,
    /// Username or password is missing or empty.
    #[error("username and password are required")]
    MissingCredentials,
}

/// A validated post that has not been stored yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPost {
    pub(crate) title: String,
    pub(crate) content: String,
}

impl NewPost {
    /// Builds a post from optional request fields.
    ///
    /// Both fields must be present and non-empty.
    pub fn new(title: Option<String>, content: Option<String>) -> Result<Self, ValidationError> {
        match (non_empty(title), non_empty(content)) {
            (Some(title), Some(content)) => Ok(Self { title, content }),
            _ => Err(ValidationError::MissingPostFields),
        }
    }

    /// Post title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Post body.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn into_post(self, id: RecordId) -> BlogPost {
        BlogPost {
            id,
            title: self.title,
            content: self.content,
        }
    }
}

/// A registered account.
///
/// The password hash is kept out of the serialized form.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Store assigned identifier.
    pub id: RecordId,
    /// Unique login name.
    pub username: String,
    /// Salted one-way hash of the password.
    #[serde(skip)]
    pub password_hash: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// An account that has not been stored yet.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Salted one-way hash of the password, never the plaintext.
    pub password_hash: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl NewUser {
    pub(crate) fn into_user(self, id: RecordId) -> User {
        User {
            id,
            username: self.username,
            password_hash: self.password_hash,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/******************************************************************************
    Author: Joaquín Béjar García
    Email: jb@taunais.com
    Date: 19/10/26
 ******************************************************************************/
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Renditions of one photo as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlsResult {
    pub raw: String,
    pub full: String,
    pub regular: String,
    pub small: String,
    pub thumb: String,
}

/// Photo record as it comes over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoResult {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub likes: u32,
    pub liked_by_user: bool,
    pub description: Option<String>,
    pub urls: UrlsResult,
}

/// Body of the like/unlike endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct LikeResponse {
    pub photo: PhotoResult,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PhotoSize {
    pub width: u32,
    pub height: u32,
}

/// Photo as held in the feed. Only ever replaced as a whole.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Photo {
    pub id: String,
    pub size: PhotoSize,
    pub created_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub thumb_url: String,
    pub large_url: String,
    pub full_url: String,
    pub is_liked: bool,
}

impl From<PhotoResult> for Photo {
    fn from(result: PhotoResult) -> Self {
        Photo {
            id: result.id,
            size: PhotoSize {
                width: result.width,
                height: result.height,
            },
            created_at: result.created_at,
            description: result.description,
            thumb_url: result.urls.small,
            large_url: result.urls.regular,
            full_url: result.urls.full,
            is_liked: result.liked_by_user,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhotoSummary<'a> {
    id: &'a str,
    width: u32,
    height: u32,
    is_liked: bool,
}

impl fmt::Display for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = PhotoSummary {
            id: &self.id,
            width: self.size.width,
            height: self.size.height,
            is_liked: self.is_liked,
        };
        let s = serde_json::to_string(&summary).map_err(|_| fmt::Error)?;
        write!(f, "{}", s)
    }
}

/// Ordered photos, unique by id, with an id index for in-place replacement.
#[derive(Debug, Clone, Default)]
pub struct PhotoCollection {
    items: Vec<Photo>,
    index: HashMap<String, usize>,
}

impl PhotoCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Photo> {
        self.index.get(id).map(|&position| &self.items[position])
    }

    pub fn as_slice(&self) -> &[Photo] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Photo> {
        self.items.iter()
    }

    /// Appends in order every photo whose id is not present yet. Returns how many were added.
    pub fn append_unique<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = Photo>,
    {
        let before = self.items.len();
        for photo in incoming {
            if self.index.contains_key(&photo.id) {
                continue;
            }
            self.index.insert(photo.id.clone(), self.items.len());
            self.items.push(photo);
        }
        self.items.len() - before
    }

    /// Swaps in `photo` at the position of `id`. Returns false when `id` is absent.
    pub fn replace(&mut self, id: &str, photo: Photo) -> bool {
        let Some(&position) = self.index.get(id) else {
            return false;
        };
        if photo.id != id {
            if self.index.contains_key(&photo.id) {
                return false;
            }
            self.index.remove(id);
            self.index.insert(photo.id.clone(), position);
        }
        self.items[position] = photo;
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}

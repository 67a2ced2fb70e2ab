use serde::{Deserialize, Serialize};

// API Response Types
#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Bookmark {
    pub id: i32,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub favicon: Option<String>,
    pub image: Option<String>,
    pub is_favorite: bool,
    pub folder_id: Option<i32>,
    pub tags: Vec<String>,
    #[cfg_attr(feature = "utoipa", schema(format = DateTime, value_type=String))]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    #[cfg_attr(feature = "utoipa", schema(format = DateTime, value_type=String))]
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: time::OffsetDateTime,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct CreateBookmark {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub folder_id: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of a bookmark.
///
/// Nullable columns use a double option: a missing field keeps the stored value,
/// an explicit `null` clears it.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ModifyBookmark {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::double_option"
    )]
    #[cfg_attr(feature = "utoipa", schema(value_type = Option<String>))]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub is_favorite: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::double_option"
    )]
    #[cfg_attr(feature = "utoipa", schema(value_type = Option<i32>))]
    pub folder_id: Option<Option<i32>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl ModifyBookmark {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.is_favorite.is_none()
            && self.folder_id.is_none()
            && self.tags.is_none()
    }
}

/// Batch import of URLs. Every created bookmark lands in `folder_id` and carries `tags`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ImportBookmarks {
    pub urls: Vec<String>,
    #[serde(default)]
    pub folder_id: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Re-fetch metadata for existing bookmarks.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ResyncBookmarks {
    pub ids: Vec<i32>,
    /// Only refresh favicon and preview image, keep name and description.
    #[serde(default)]
    pub assets_only: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct DeleteBookmarks {
    pub ids: Vec<i32>,
}

// src/projects/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One generated thumbnail attempt, as stored.
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "selectedStyleId")]
    pub selected_style_id: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_storage_path: String,
    #[serde(rename = "generatedTitle")]
    pub generated_yt_title: Option<String>,
    #[serde(rename = "generatedDescription")]
    pub generated_yt_description: Option<String>,
    #[serde(rename = "generatedTags")]
    pub generated_yt_tags: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Fields for a new project row.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub selected_style_id: String,
    pub thumbnail_storage_path: String,
    pub generated_yt_title: Option<String>,
    pub generated_yt_description: Option<String>,
    pub generated_yt_tags: Option<String>,
}

/// Partial update of the generated text columns. `None` leaves a column
/// untouched, which is what keeps single-field regeneration from clobbering
/// its siblings.
#[derive(Debug, Clone, Default)]
pub struct ContentPatch {
    pub generated_yt_title: Option<String>,
    pub generated_yt_description: Option<String>,
    pub generated_yt_tags: Option<String>,
}

impl ContentPatch {
    pub fn is_empty(&self) -> bool {
        self.generated_yt_title.is_none()
            && self.generated_yt_description.is_none()
            && self.generated_yt_tags.is_none()
    }
}

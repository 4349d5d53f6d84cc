use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Color token or image URL.
    #[serde(default)]
    pub background: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub list_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub position: i32,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cover_color: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Card priority. The column is free text on the platform, so values the
/// client does not know are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
    Other(String),
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        match value.as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "urgent" => Self::Urgent,
            _ => Self::Other(value),
        }
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Invalid priority: empty".to_string());
        }
        match Self::from(trimmed.to_lowercase()) {
            Self::Other(_) => Ok(Self::Other(trimmed.to_string())),
            known => Ok(known),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial card update. Only the fields that are `Some` are written;
/// nullable columns take `Some(None)` to clear them.
///
/// `id`, `created_at` and `list_id` are deliberately absent: membership
/// changes go through `BoardStore::move_card`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_color: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Option<Priority>>,
}

impl CardPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn cover_color(mut self, cover_color: Option<String>) -> Self {
        self.cover_color = Some(cover_color);
        self
    }

    pub fn cover_image(mut self, cover_image: Option<String>) -> Self {
        self.cover_image = Some(cover_image);
        self
    }

    pub fn priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Copy the present fields onto a cached card.
    pub fn apply_to(&self, card: &mut Card) {
        if let Some(title) = &self.title {
            card.title = title.clone();
        }
        if let Some(description) = &self.description {
            card.description = description.clone();
        }
        if let Some(due_date) = &self.due_date {
            card.due_date = *due_date;
        }
        if let Some(cover_color) = &self.cover_color {
            card.cover_color = cover_color.clone();
        }
        if let Some(cover_image) = &self.cover_image {
            card.cover_image = cover_image.clone();
        }
        if let Some(priority) = &self.priority {
            card.priority = priority.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn card_json() -> serde_json::Value {
        json!({
            "id": "0d6f5c9e-9a57-4d44-9b7c-3c4b1f0a2e10",
            "list_id": "5a1c3e7f-1b2d-4c8e-8f90-123456789abc",
            "title": "Write release notes",
            "description": null,
            "position": 3,
            "due_date": "2024-06-01T12:00:00+00:00",
            "cover_color": "#ff8800",
            "cover_image": null,
            "priority": "high",
            "created_at": "2024-05-01T09:30:00.123456+00:00",
            "updated_at": "2024-05-02T09:30:00.123456+00:00"
        })
    }

    #[test]
    fn test_card_decodes_platform_row() {
        let card: Card = serde_json::from_value(card_json()).unwrap();
        assert_eq!(card.title, "Write release notes");
        assert_eq!(card.position, 3);
        assert_eq!(card.priority, Some(Priority::High));
        assert_eq!(card.cover_color.as_deref(), Some("#ff8800"));
        assert!(card.description.is_none());
        assert!(card.due_date.is_some());
    }

    #[test]
    fn test_card_decodes_without_optional_columns() {
        let mut row = card_json();
        let obj = row.as_object_mut().unwrap();
        for key in ["description", "due_date", "cover_color", "cover_image", "priority"] {
            obj.remove(key);
        }
        let card: Card = serde_json::from_value(row).unwrap();
        assert!(card.priority.is_none());
        assert!(card.cover_color.is_none());
    }

    #[test]
    fn test_unknown_priority_is_preserved() {
        let mut row = card_json();
        row["priority"] = json!("someday");
        let card: Card = serde_json::from_value(row).unwrap();
        assert_eq!(card.priority, Some(Priority::Other("someday".to_string())));
        let back = serde_json::to_value(&card).unwrap();
        assert_eq!(back["priority"], "someday");
    }

    #[test]
    fn test_priority_from_str_normalizes_case() {
        assert_eq!(Priority::from_str("HIGH").unwrap(), Priority::High);
        assert_eq!(Priority::from_str(" urgent ").unwrap(), Priority::Urgent);
        assert!(Priority::from_str("").is_err());
    }

    #[test]
    fn test_priority_from_str_keeps_unknown_verbatim() {
        assert_eq!(
            Priority::from_str(" Someday ").unwrap(),
            Priority::Other("Someday".to_string())
        );
        assert_eq!(Priority::from_str("Someday").unwrap().to_string(), "Someday");
    }

    #[test]
    fn test_card_patch_serializes_only_present_fields() {
        let patch = CardPatch::new().title("X");
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"title": "X"}));
    }

    #[test]
    fn test_card_patch_clear_serializes_null() {
        let patch = CardPatch::new().due_date(None).priority(Some(Priority::Low));
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"due_date": null, "priority": "low"})
        );
    }

    #[test]
    fn test_card_patch_apply_touches_only_present_fields() {
        let mut card: Card = serde_json::from_value(card_json()).unwrap();
        let before = card.clone();

        CardPatch::new().title("Renamed").apply_to(&mut card);
        assert_eq!(card.title, "Renamed");
        assert_eq!(card.cover_color, before.cover_color);
        assert_eq!(card.priority, before.priority);
        assert_eq!(card.due_date, before.due_date);

        CardPatch::new().cover_color(None).apply_to(&mut card);
        assert!(card.cover_color.is_none());
        assert_eq!(card.title, "Renamed");
    }

    #[test]
    fn test_empty_patch_is_empty() {
        assert!(CardPatch::new().is_empty());
        assert!(!CardPatch::new().description(None).is_empty());
    }
}

//! Classroom record types: logs, students, time blocks, domain tags, weather.
//!
//! These mirror what the persistence collaborator stores. The refinement
//! core only builds [`LogInput`] values and reads [`LogEntry`] values back
//! for the timeline and reports.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ── Logs ───────────────────────────────────────────────────────────

/// A log as handed to persistence when a draft is accepted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LogInput {
    pub date: NaiveDate,
    pub block_id: String,
    pub raw_content: String,
    pub refined_content: Option<String>,
    pub interpretation: Option<String>,
    pub student_ids: Vec<String>,
    pub domain_tags: Vec<String>,
    pub weather: Option<Weather>,
}

impl LogInput {
    /// A log that names no child is class-wide.
    pub fn is_class_wide(&self) -> bool {
        self.student_ids.is_empty()
    }
}

/// A stored log.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub id: String,
    pub date: NaiveDate,
    pub block_id: String,
    pub raw_content: String,
    pub refined_content: Option<String>,
    pub interpretation: Option<String>,
    pub student_ids: Vec<String>,
    pub domain_tags: Vec<String>,
    pub weather: Option<Weather>,
    pub is_class_wide: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LogEntry {
    /// Materialize a stored entry. `is_class_wide` is computed here, never
    /// copied from elsewhere.
    pub fn from_input(id: impl Into<String>, input: LogInput, now: DateTime<Utc>) -> Self {
        let is_class_wide = input.is_class_wide();
        Self {
            id: id.into(),
            date: input.date,
            block_id: input.block_id,
            raw_content: input.raw_content,
            refined_content: input.refined_content,
            interpretation: input.interpretation,
            student_ids: input.student_ids,
            domain_tags: input.domain_tags,
            weather: input.weather,
            is_class_wide,
            created_at: now,
            updated_at: now,
        }
    }

    /// Text shown for the log: the refined content when present, else the
    /// raw note.
    pub fn display_text(&self) -> &str {
        self.refined_content
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.raw_content)
    }

    /// Interpretation, if there is one worth showing.
    pub fn display_interpretation(&self) -> Option<&str> {
        self.interpretation.as_deref().filter(|s| !s.is_empty())
    }

    pub fn mentions_student(&self, student_id: &str) -> bool {
        self.student_ids.iter().any(|id| id == student_id)
    }
}

// ── Students ───────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Student {
    pub id: String,
    pub class_id: String,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
}

impl Student {
    pub fn new(id: impl Into<String>, class_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class_id: class_id.into(),
            name: name.into(),
            birth_date: None,
        }
    }
}

/// Resolve student ids to names, dropping ids not on the roster.
pub fn student_names(ids: &[String], roster: &[Student]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| roster.iter().find(|s| &s.id == id))
        .map(|s| s.name.clone())
        .collect()
}

// ── Time blocks ────────────────────────────────────────────────────

/// A named, ordered segment of the school day.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TimeBlock {
    pub id: String,
    pub name: String,
    pub name_en: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub icon: Option<String>,
    pub display_order: u32,
    pub is_active: bool,
}

impl TimeBlock {
    fn standard(
        order: u32,
        name: &str,
        name_en: &str,
        start: &str,
        end: &str,
        icon: &str,
    ) -> Self {
        Self {
            id: format!("tb{order}"),
            name: name.to_string(),
            name_en: name_en.to_string(),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            icon: Some(icon.to_string()),
            display_order: order,
            is_active: true,
        }
    }

    /// The standard nine-block day, arrival through departure.
    pub fn default_schedule() -> Vec<TimeBlock> {
        vec![
            Self::standard(1, "등원", "Arrival", "09:00", "09:30", "🏫"),
            Self::standard(2, "오전간식", "Morning Snack", "09:30", "10:00", "🍎"),
            Self::standard(3, "자유놀이", "Free Play", "10:00", "11:30", "🧩"),
            Self::standard(4, "대소집단활동", "Group Activity", "11:30", "12:00", "👥"),
            Self::standard(5, "점심", "Lunch", "12:00", "13:00", "🍚"),
            Self::standard(6, "낮잠/휴식", "Nap/Rest", "13:00", "15:00", "😴"),
            Self::standard(7, "오후간식", "Afternoon Snack", "15:00", "15:30", "🍪"),
            Self::standard(8, "오후활동", "Afternoon Activity", "15:30", "17:00", "🎨"),
            Self::standard(9, "하원", "Departure", "17:00", "19:00", "👋"),
        ]
    }
}

// ── Domain tags ────────────────────────────────────────────────────

/// One area of the five-area developmental taxonomy.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DomainTag {
    pub id: String,
    pub name: String,
    pub name_en: String,
    pub color: String,
    pub display_order: u32,
}

/// Korean names of the five areas, in display order.
pub const DOMAIN_TAG_NAMES: [&str; 5] = ["신체운동·건강", "의사소통", "사회관계", "예술경험", "자연탐구"];

/// Badge color for tags outside the taxonomy.
pub const FALLBACK_TAG_COLOR: &str = "#888";

impl DomainTag {
    /// The fixed taxonomy.
    pub fn taxonomy() -> Vec<DomainTag> {
        const EN: [&str; 5] = [
            "Physical/Health",
            "Communication",
            "Social Relations",
            "Art Experience",
            "Nature Inquiry",
        ];
        const COLORS: [&str; 5] = ["#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7"];
        DOMAIN_TAG_NAMES
            .iter()
            .zip(EN)
            .zip(COLORS)
            .enumerate()
            .map(|(i, ((name, name_en), color))| DomainTag {
                id: format!("d{}", i + 1),
                name: (*name).to_string(),
                name_en: name_en.to_string(),
                color: color.to_string(),
                display_order: i as u32 + 1,
            })
            .collect()
    }

    /// Whether `name` is one of the five areas.
    pub fn is_known(name: &str) -> bool {
        DOMAIN_TAG_NAMES.contains(&name)
    }

    /// Badge color for a tag name.
    pub fn color_for(name: &str) -> String {
        Self::taxonomy()
            .into_iter()
            .find(|t| t.name == name)
            .map_or_else(|| FALLBACK_TAG_COLOR.to_string(), |t| t.color)
    }
}

// ── Weather ────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
}

impl Weather {
    pub fn label(self) -> &'static str {
        match self {
            Weather::Sunny => "맑음",
            Weather::Cloudy => "흐림",
            Weather::Rainy => "비",
            Weather::Snowy => "눈",
        }
    }
}

impl std::str::FromStr for Weather {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sunny" => Ok(Weather::Sunny),
            "cloudy" => Ok(Weather::Cloudy),
            "rainy" => Ok(Weather::Rainy),
            "snowy" => Ok(Weather::Snowy),
            other => Err(format!(
                "unknown weather '{other}' (expected sunny, cloudy, rainy or snowy)"
            )),
        }
    }
}

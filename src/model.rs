use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::lifecycle::CourseState;

/// Course delivery mode. The backend stores `virtual` for online courses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    #[serde(alias = "virtual")]
    Online,
    Presencial,
    Hibrido,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Online => "online",
            Modality::Presencial => "presencial",
            Modality::Hibrido => "hibrido",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Modality::Online => "En línea",
            Modality::Presencial => "Presencial",
            Modality::Hibrido => "Híbrido",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" | "virtual" => Some(Modality::Online),
            "presencial" => Some(Modality::Presencial),
            "hibrido" | "híbrido" => Some(Modality::Hibrido),
            _ => None,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::Beginner => "Principiante",
            Level::Intermediate => "Intermedio",
            Level::Advanced => "Avanzado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Level::Beginner),
            "intermediate" => Some(Level::Intermediate),
            "advanced" => Some(Level::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Course record as returned by the backend. The client treats it as opaque:
/// every field defaults so endpoints that omit some of them still parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(from = "CourseRecord")]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub instructor: Option<i64>,
    pub instructor_name: Option<String>,
    pub category: Option<String>,
    pub level: Option<Level>,
    pub modality: Option<Modality>,
    pub duration_hours: Option<f64>,
    pub price: Option<f64>,
    pub max_students: Option<u32>,
    pub is_active: bool,
    pub status: Option<CourseState>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub enrollment_end_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub enrolled_students_count: u32,
}

/// Wire shape of a course. Serializers differ between endpoints: some send
/// both spellings of a field, some send explicit nulls.
#[derive(Deserialize)]
struct CourseRecord {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "instructor_ref")]
    instructor: Option<i64>,
    #[serde(default)]
    instructor_name: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient_enum")]
    level: Option<Level>,
    #[serde(default, deserialize_with = "lenient_enum")]
    modality: Option<Modality>,
    #[serde(default, deserialize_with = "flexible_f64")]
    duration_hours: Option<f64>,
    #[serde(default, deserialize_with = "flexible_f64")]
    duration: Option<f64>,
    #[serde(default, deserialize_with = "flexible_f64")]
    price: Option<f64>,
    #[serde(default, deserialize_with = "flexible_u32")]
    max_students: Option<u32>,
    #[serde(default, deserialize_with = "flexible_u32")]
    capacity: Option<u32>,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default, deserialize_with = "lenient_enum")]
    status: Option<CourseState>,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    enrollment_end_date: Option<NaiveDate>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_u32")]
    enrolled_students_count: Option<u32>,
    #[serde(default, deserialize_with = "flexible_u32")]
    enrolled_students: Option<u32>,
}

impl From<CourseRecord> for Course {
    fn from(r: CourseRecord) -> Self {
        Self {
            id: r.id,
            title: r.title.unwrap_or_default(),
            description: r.description.unwrap_or_default(),
            instructor: r.instructor,
            instructor_name: r.instructor_name,
            category: r.category,
            level: r.level,
            modality: r.modality,
            duration_hours: r.duration_hours.or(r.duration),
            price: r.price,
            max_students: r.max_students.or(r.capacity),
            is_active: r.is_active.unwrap_or(true),
            status: r.status,
            start_date: r.start_date,
            end_date: r.end_date,
            enrollment_end_date: r.enrollment_end_date,
            created_at: r.created_at,
            updated_at: r.updated_at,
            enrolled_students_count: r
                .enrolled_students_count
                .or(r.enrolled_students)
                .unwrap_or(0),
        }
    }
}

impl Course {
    /// Effective lifecycle state: the explicit status when the backend sends
    /// one, otherwise derived from the active flag.
    pub fn state(&self) -> CourseState {
        self.status.unwrap_or(if self.is_active {
            CourseState::Active
        } else {
            CourseState::Inactive
        })
    }

    pub fn instructor_label(&self) -> &str {
        self.instructor_name.as_deref().unwrap_or("")
    }
}

/// Accepts `7`, `"7"` or `{"id": 7, ...}` for the instructor reference.
fn instructor_ref<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(Value::Object(map)) => map.get("id").and_then(Value::as_i64),
        _ => None,
    })
}

/// Decimal fields arrive either as JSON numbers or as strings ("120.00").
fn flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Counts arrive as numbers or numeric strings; anything else is absent.
fn flexible_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Unknown enum spellings become `None` instead of failing the whole list.
fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Editable course fields collected by the create/edit/duplicate forms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<i64>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modality: Option<Modality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_students: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl CourseDraft {
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            description: course.description.clone(),
            instructor_id: course.instructor,
            category: course.category.clone().unwrap_or_default(),
            level: course.level,
            modality: course.modality,
            duration_hours: course.duration_hours,
            price: course.price,
            max_students: course.max_students.map(i64::from),
            image_url: String::new(),
            start_date: course.start_date,
            end_date: course.end_date,
            is_active: course.is_active,
        }
    }
}

/// Authenticated user as returned by `users/me/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AdminUser {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Instructor {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Aggregate numbers for the admin dashboard. Fields the client does not
/// know about are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AdminMetrics {
    #[serde(default)]
    pub total_courses: u64,
    #[serde(default)]
    pub active_courses: u64,
    #[serde(default)]
    pub inactive_courses: u64,
    #[serde(default)]
    pub total_students: u64,
    #[serde(default)]
    pub total_instructors: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InstructorStats {
    #[serde(default, alias = "id")]
    pub instructor_id: i64,
    #[serde(default, alias = "name")]
    pub instructor_name: String,
    #[serde(default, alias = "courses")]
    pub course_count: u64,
    #[serde(default, alias = "students")]
    pub student_count: u64,
}

/// Body returned by mutating endpoints: `{message, ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OperationResult {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OperationResult {
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn course_parses_backend_shapes() {
        let course: Course = serde_json::from_value(json!({
            "id": 4,
            "title": "Archivística Básica",
            "description": "Introducción",
            "instructor": {"id": 9, "username": "ana"},
            "instructor_name": "Ana Ruiz",
            "modality": "virtual",
            "duration_hours": 40,
            "price": "120.50",
            "is_active": false,
            "enrolled_students_count": 17
        }))
        .unwrap();
        assert_eq!(course.instructor, Some(9));
        assert_eq!(course.modality, Some(Modality::Online));
        assert_eq!(course.price, Some(120.5));
        assert_eq!(course.state(), CourseState::Inactive);
        assert_eq!(course.enrolled_students_count, 17);
    }

    #[test]
    fn unknown_enum_values_do_not_fail() {
        let course: Course =
            serde_json::from_value(json!({"id": 1, "level": "expert", "modality": "mars"}))
                .unwrap();
        assert_eq!(course.level, None);
        assert_eq!(course.modality, None);
        assert!(course.is_active);
    }

    #[test]
    fn both_field_spellings_parse() {
        let course: Course = serde_json::from_value(json!({
            "id": 1,
            "duration": 40,
            "duration_hours": 40,
            "capacity": "25",
            "enrolled_students": 3,
            "enrolled_students_count": 3
        }))
        .unwrap();
        assert_eq!(course.duration_hours, Some(40.0));
        assert_eq!(course.max_students, Some(25));
        assert_eq!(course.enrolled_students_count, 3);

        let legacy: Course =
            serde_json::from_value(json!({"id": 2, "duration": 12, "enrolled_students": 7})).unwrap();
        assert_eq!(legacy.duration_hours, Some(12.0));
        assert_eq!(legacy.enrolled_students_count, 7);
    }

    #[test]
    fn explicit_nulls_fall_back_to_defaults() {
        let course: Course = serde_json::from_value(json!({
            "id": 1,
            "title": null,
            "description": null,
            "max_students": null,
            "duration_hours": null,
            "is_active": null,
            "enrolled_students_count": null
        }))
        .unwrap();
        assert_eq!(course.title, "");
        assert_eq!(course.description, "");
        assert_eq!(course.max_students, None);
        assert_eq!(course.duration_hours, None);
        assert!(course.is_active);
        assert_eq!(course.enrolled_students_count, 0);
    }

    #[test]
    fn serialized_course_parses_back() {
        let course = Course {
            id: 5,
            title: "Paleografía".into(),
            max_students: Some(20),
            enrolled_students_count: 4,
            ..Default::default()
        };
        let back: Course = serde_json::from_value(serde_json::to_value(&course).unwrap()).unwrap();
        assert_eq!(back, course);
    }

    #[test]
    fn draft_serialization_skips_empty_optionals() {
        let draft = CourseDraft {
            title: "Gestión Digital".into(),
            ..Default::default()
        };
        let body = serde_json::to_value(&draft).unwrap();
        assert!(body.get("instructor_id").is_none());
        assert!(body.get("image_url").is_none());
        assert_eq!(body["title"], "Gestión Digital");
    }

    #[test]
    fn operation_result_falls_back_on_blank_message() {
        let r: OperationResult = serde_json::from_value(json!({"message": " ", "count": 3})).unwrap();
        assert_eq!(r.message_or("ok"), "ok");
        assert_eq!(r.extra["count"], 3);
    }
}

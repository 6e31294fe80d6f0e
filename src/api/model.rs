use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::AdminOperation;
use crate::lifecycle::CourseState;
use crate::model::{Level, Modality};

#[derive(Serialize, Debug)]
pub struct ReasonBody<'a> {
    pub reason: &'a str,
}

#[derive(Serialize, Debug)]
pub struct TransferBody<'a> {
    pub new_instructor_id: i64,
    pub reason: &'a str,
}

#[derive(Serialize, Debug)]
pub struct ChangeStateBody<'a> {
    pub state: CourseState,
    pub reason: &'a str,
}

#[derive(Serialize, Debug)]
pub struct CopyContentBody {
    pub source_course_id: i64,
    pub include_enrollments: bool,
}

#[derive(Serialize, Debug)]
pub struct RefreshBody<'a> {
    pub refresh: &'a str,
}

/// A bulk operation together with the field it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkAction {
    Activate,
    Deactivate,
    Delete,
    Duplicate,
    Transfer { new_instructor_id: i64 },
    UpdateCategory { category: String },
    UpdateLevel { level: Level },
    UpdateModality { modality: Modality },
    SetPrice { price: f64 },
    SetCapacity { capacity: u32 },
}

impl BulkAction {
    /// Path below the API root, e.g. `courses/bulk-activate/`.
    pub fn path(&self) -> &'static str {
        match self {
            BulkAction::Activate => "courses/bulk-activate/",
            BulkAction::Deactivate => "courses/bulk-deactivate/",
            BulkAction::Delete => "courses/bulk-delete/",
            BulkAction::Duplicate => "courses/bulk-duplicate/",
            BulkAction::Transfer { .. } => "courses/bulk-transfer/",
            BulkAction::UpdateCategory { .. } => "courses/bulk-update-category/",
            BulkAction::UpdateLevel { .. } => "courses/bulk-update-level/",
            BulkAction::UpdateModality { .. } => "courses/bulk-update-modality/",
            BulkAction::SetPrice { .. } => "courses/bulk-set-price/",
            BulkAction::SetCapacity { .. } => "courses/bulk-set-capacity/",
        }
    }

    pub fn operation(&self) -> AdminOperation {
        match self {
            BulkAction::Activate => AdminOperation::Activate,
            BulkAction::Deactivate => AdminOperation::Deactivate,
            BulkAction::Delete => AdminOperation::Delete,
            BulkAction::Duplicate => AdminOperation::Duplicate,
            BulkAction::Transfer { .. } => AdminOperation::Transfer,
            BulkAction::UpdateCategory { .. } => AdminOperation::UpdateCategory,
            BulkAction::UpdateLevel { .. } => AdminOperation::UpdateLevel,
            BulkAction::UpdateModality { .. } => AdminOperation::UpdateModality,
            BulkAction::SetPrice { .. } => AdminOperation::SetPrice,
            BulkAction::SetCapacity { .. } => AdminOperation::SetCapacity,
        }
    }

    /// `{course_ids, reason, <op-specific field>}`.
    pub fn body(&self, course_ids: &[i64], reason: &str) -> Value {
        let mut body = json!({
            "course_ids": course_ids,
            "reason": reason,
        });
        let extra = match self {
            BulkAction::Transfer { new_instructor_id } => {
                Some(("new_instructor_id", json!(new_instructor_id)))
            }
            BulkAction::UpdateCategory { category } => Some(("category", json!(category))),
            BulkAction::UpdateLevel { level } => Some(("level", json!(level))),
            BulkAction::UpdateModality { modality } => Some(("modality", json!(modality))),
            BulkAction::SetPrice { price } => Some(("price", json!(price))),
            BulkAction::SetCapacity { capacity } => Some(("max_students", json!(capacity))),
            _ => None,
        };
        if let (Some((key, value)), Some(map)) = (extra, body.as_object_mut()) {
            map.insert(key.to_string(), value);
        }
        body
    }
}

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::model::{AdminUser, CourseDraft};

static ANGLE_BRACKETS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[<>]").expect("Invalid angle bracket regex"));

static JS_SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript\s*:").expect("Invalid javascript scheme regex"));

static EVENT_HANDLER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bon[a-z]+\s*=").expect("Invalid event handler regex"));

static IMAGE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://.+\.(jpg|jpeg|png|gif|webp)$").expect("Invalid image URL regex")
});

pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 200;
pub const DESCRIPTION_MIN: usize = 20;
pub const DESCRIPTION_MAX: usize = 2000;
pub const REASON_MAX: usize = 500;

/// Field name → message. Ordered so output is stable.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CourseField {
    Title,
    Description,
    InstructorId,
    Category,
    Level,
    Modality,
    Duration,
    Price,
    MaxStudents,
    StartDate,
    EndDate,
    ImageUrl,
}

impl CourseField {
    pub const ALL: [CourseField; 12] = [
        CourseField::Title,
        CourseField::Description,
        CourseField::InstructorId,
        CourseField::Category,
        CourseField::Level,
        CourseField::Modality,
        CourseField::Duration,
        CourseField::Price,
        CourseField::MaxStudents,
        CourseField::StartDate,
        CourseField::EndDate,
        CourseField::ImageUrl,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            CourseField::Title => "title",
            CourseField::Description => "description",
            CourseField::InstructorId => "instructor_id",
            CourseField::Category => "category",
            CourseField::Level => "level",
            CourseField::Modality => "modality",
            CourseField::Duration => "duration",
            CourseField::Price => "price",
            CourseField::MaxStudents => "max_students",
            CourseField::StartDate => "start_date",
            CourseField::EndDate => "end_date",
            CourseField::ImageUrl => "image_url",
        }
    }
}

/// Strip angle brackets, `javascript:` schemes and inline `onxxx=` handlers,
/// then trim. This is input tidying, not an XSS defence: whatever renders
/// the text must still encode it.
pub fn sanitize_input(input: &str) -> String {
    let s = ANGLE_BRACKETS_RE.replace_all(input, "");
    let s = JS_SCHEME_RE.replace_all(&s, "");
    let s = EVENT_HANDLER_RE.replace_all(&s, "");
    s.trim().to_string()
}

pub fn sanitize_course_draft(draft: &CourseDraft) -> CourseDraft {
    CourseDraft {
        title: sanitize_input(&draft.title),
        description: sanitize_input(&draft.description),
        category: sanitize_input(&draft.category),
        image_url: sanitize_input(&draft.image_url),
        ..draft.clone()
    }
}

fn char_len(s: &str) -> usize {
    s.trim().chars().count()
}

/// Check one field of the draft. Cross-field rules (end after start) are
/// reported on the later field.
pub fn validate_field(draft: &CourseDraft, field: CourseField) -> Option<String> {
    let msg = match field {
        CourseField::Title => {
            let len = char_len(&draft.title);
            if len == 0 {
                "El título del curso es obligatorio".to_string()
            } else if len < TITLE_MIN {
                format!("El título debe tener al menos {TITLE_MIN} caracteres")
            } else if len > TITLE_MAX {
                format!("El título no puede tener más de {TITLE_MAX} caracteres")
            } else {
                return None;
            }
        }
        CourseField::Description => {
            let len = char_len(&draft.description);
            if len == 0 {
                "La descripción es obligatoria".to_string()
            } else if len < DESCRIPTION_MIN {
                format!("La descripción debe tener al menos {DESCRIPTION_MIN} caracteres")
            } else if len > DESCRIPTION_MAX {
                format!("La descripción no puede tener más de {DESCRIPTION_MAX} caracteres")
            } else {
                return None;
            }
        }
        CourseField::InstructorId => match draft.instructor_id {
            Some(id) if id > 0 => return None,
            _ => "Debe seleccionar un instructor".to_string(),
        },
        CourseField::Category => {
            if draft.category.trim().is_empty() {
                "La categoría es obligatoria".to_string()
            } else {
                return None;
            }
        }
        CourseField::Level => {
            if draft.level.is_some() {
                return None;
            }
            "Debe seleccionar un nivel".to_string()
        }
        CourseField::Modality => {
            if draft.modality.is_some() {
                return None;
            }
            "Debe seleccionar una modalidad".to_string()
        }
        CourseField::Duration => match draft.duration_hours {
            Some(d) if !d.is_finite() || d <= 0.0 => {
                "La duración debe ser un número positivo".to_string()
            }
            _ => return None,
        },
        CourseField::Price => match draft.price {
            Some(p) if !p.is_finite() || p < 0.0 => "El precio debe ser un número positivo".to_string(),
            _ => return None,
        },
        CourseField::MaxStudents => match draft.max_students {
            Some(n) if n <= 0 => "La capacidad debe ser un número positivo".to_string(),
            _ => return None,
        },
        CourseField::StartDate => return None,
        CourseField::EndDate => match (draft.start_date, draft.end_date) {
            (Some(start), Some(end)) if start >= end => {
                "La fecha de fin debe ser posterior a la fecha de inicio".to_string()
            }
            _ => return None,
        },
        CourseField::ImageUrl => {
            let url = draft.image_url.trim();
            if url.is_empty() || IMAGE_URL_RE.is_match(url) {
                return None;
            }
            "Ingresa una URL válida de imagen".to_string()
        }
    };
    Some(msg)
}

pub fn validate_course_form(draft: &CourseDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for field in CourseField::ALL {
        if let Some(msg) = validate_field(draft, field) {
            errors.insert(field.key(), msg);
        }
    }
    errors
}

/// Admin gate used before any mutation.
pub fn validate_admin_permissions(
    user: Option<&AdminUser>,
    required: &[&str],
) -> Result<(), String> {
    let Some(user) = user else {
        return Err("Usuario no autenticado".to_string());
    };
    if !user.is_superuser {
        return Err("Se requieren permisos de administrador".to_string());
    }
    let missing = required
        .iter()
        .any(|perm| !user.permissions.iter().any(|p| p == perm));
    if missing {
        return Err(format!("Permisos requeridos: {}", required.join(", ")));
    }
    Ok(())
}

pub fn validate_reason(reason: &str, required: bool) -> Result<(), &'static str> {
    if required && reason.trim().is_empty() {
        return Err("Debe proporcionar una razón para esta acción");
    }
    if reason.chars().count() > REASON_MAX {
        return Err("La razón no puede tener más de 500 caracteres");
    }
    Ok(())
}

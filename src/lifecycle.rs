//! Course publication states, their allowed transitions, and the
//! date-driven rules that suggest a transition.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Course;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CourseState {
    Draft,
    Review,
    Published,
    Active,
    Inactive,
    Completed,
    Archived,
    Rejected,
}

impl CourseState {
    pub const ALL: [CourseState; 8] = [
        CourseState::Draft,
        CourseState::Review,
        CourseState::Published,
        CourseState::Active,
        CourseState::Inactive,
        CourseState::Completed,
        CourseState::Archived,
        CourseState::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CourseState::Draft => "draft",
            CourseState::Review => "review",
            CourseState::Published => "published",
            CourseState::Active => "active",
            CourseState::Inactive => "inactive",
            CourseState::Completed => "completed",
            CourseState::Archived => "archived",
            CourseState::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|st| st.as_str().eq_ignore_ascii_case(s))
    }

    pub fn label(&self) -> &'static str {
        match self {
            CourseState::Draft => "Borrador",
            CourseState::Review => "En Revisión",
            CourseState::Published => "Publicado",
            CourseState::Active => "Activo",
            CourseState::Inactive => "Inactivo",
            CourseState::Completed => "Completado",
            CourseState::Archived => "Archivado",
            CourseState::Rejected => "Rechazado",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CourseState::Draft => "Curso en preparación, no visible para estudiantes",
            CourseState::Review => "Curso pendiente de aprobación",
            CourseState::Published => "Curso visible pero no disponible para inscripción",
            CourseState::Active => "Curso disponible para inscripción y estudio",
            CourseState::Inactive => "Curso temporalmente no disponible",
            CourseState::Completed => "Curso terminado, estudiantes pueden ver contenido",
            CourseState::Archived => "Curso archivado, no visible para nuevos estudiantes",
            CourseState::Rejected => "Curso rechazado, requiere modificaciones",
        }
    }

    pub fn allowed_transitions(&self) -> &'static [CourseState] {
        use CourseState::*;
        match self {
            Draft => &[Review, Published],
            Review => &[Draft, Published, Rejected],
            Published => &[Active, Draft, Archived],
            Active => &[Completed, Inactive, Published],
            Inactive => &[Active, Archived],
            Completed => &[Active, Archived],
            Archived => &[Published],
            Rejected => &[Draft, Review],
        }
    }

    pub fn can_transition_to(&self, next: CourseState) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl fmt::Display for CourseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition the dates on a course say is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoTransition {
    pub from: CourseState,
    pub to: CourseState,
    pub description: &'static str,
}

/// Rules evaluated against `today`:
/// - published → active once the start date arrives;
/// - active → completed once the end date arrives;
/// - active → inactive once enrollment closed with under half the capacity.
pub fn auto_transitions(course: &Course, today: NaiveDate) -> Vec<AutoTransition> {
    let state = course.state();
    let mut due = Vec::new();

    if state == CourseState::Published && course.start_date.is_some_and(|d| d <= today) {
        due.push(AutoTransition {
            from: state,
            to: CourseState::Active,
            description: "Transición automática cuando llega la fecha de inicio",
        });
    }

    if state == CourseState::Active {
        if course.end_date.is_some_and(|d| d <= today) {
            due.push(AutoTransition {
                from: state,
                to: CourseState::Completed,
                description: "Transición automática cuando llega la fecha de fin",
            });
        }
        let low_enrollment = course
            .max_students
            .is_some_and(|cap| f64::from(course.enrolled_students_count) < f64::from(cap) * 0.5);
        if course.enrollment_end_date.is_some_and(|d| d <= today) && low_enrollment {
            due.push(AutoTransition {
                from: state,
                to: CourseState::Inactive,
                description: "Transición automática por baja inscripción",
            });
        }
    }

    due
}

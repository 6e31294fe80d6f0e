//! Form state behind the course, transfer and state-change dialogs.
//!
//! Each form owns its field values and errors, validates locally, and makes
//! exactly one service call per submit (two for a duplicate that also copies
//! content). Errors from the service are mapped through
//! [`handle_admin_error`] and stored on the form.
use tracing::{info, instrument, warn};

use crate::api::CourseApi;
use crate::errors::{handle_admin_error, AdminOperation};
use crate::lifecycle::CourseState;
use crate::model::{Course, CourseDraft, OperationResult};
use crate::validation::{
    sanitize_course_draft, sanitize_input, validate_course_form, validate_field, validate_reason,
    CourseField, FieldErrors,
};

/// Key under which a failed submit stores its message.
pub const SUBMIT_KEY: &str = "submit";

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<T> {
    /// A previous submit is still running.
    Busy,
    /// Local validation failed; nothing was sent.
    Invalid,
    Saved(T),
    Failed(String),
}

impl<T> SubmitOutcome<T> {
    pub fn is_saved(&self) -> bool {
        matches!(self, SubmitOutcome::Saved(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { course_id: i64 },
    Duplicate { source_id: i64 },
}

/// A course saved by [`CourseForm::submit`]. `copy_error` is set when the
/// course was duplicated but copying its content afterwards failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedCourse {
    pub course: Course,
    pub copy_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CourseForm {
    pub mode: FormMode,
    pub draft: CourseDraft,
    pub errors: FieldErrors,
    pub submit_attempted: bool,
    pub loading: bool,
    pub duplicate_content: bool,
    pub duplicate_enrollments: bool,
}

impl CourseForm {
    pub fn create() -> Self {
        Self::with(FormMode::Create, CourseDraft {
            is_active: true,
            ..Default::default()
        })
    }

    pub fn edit(course: &Course) -> Self {
        Self::with(
            FormMode::Edit {
                course_id: course.id,
            },
            CourseDraft::from_course(course),
        )
    }

    /// Prefilled copy of `course` titled `"<title> (Copia)"`.
    pub fn duplicate(course: &Course) -> Self {
        let mut draft = CourseDraft::from_course(course);
        draft.title = format!("{} (Copia)", course.title);
        Self::with(
            FormMode::Duplicate {
                source_id: course.id,
            },
            draft,
        )
    }

    fn with(mode: FormMode, draft: CourseDraft) -> Self {
        Self {
            mode,
            draft,
            errors: FieldErrors::new(),
            submit_attempted: false,
            loading: false,
            duplicate_content: false,
            duplicate_enrollments: false,
        }
    }

    pub fn operation(&self) -> AdminOperation {
        match self.mode {
            FormMode::Create => AdminOperation::Create,
            FormMode::Edit { .. } => AdminOperation::Update,
            FormMode::Duplicate { .. } => AdminOperation::Duplicate,
        }
    }

    pub fn heading(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "Crear Nuevo Curso",
            FormMode::Edit { .. } => "Editar Curso",
            FormMode::Duplicate { .. } => "Duplicar Curso",
        }
    }

    pub fn success_message(&self, course: &Course) -> String {
        let verb = match self.mode {
            FormMode::Create => "creado",
            FormMode::Edit { .. } => "actualizado",
            FormMode::Duplicate { .. } => "duplicado",
        };
        let title = if course.title.is_empty() {
            &self.draft.title
        } else {
            &course.title
        };
        format!("Curso \"{title}\" {verb} exitosamente")
    }

    /// Apply an edit to one field. Before the first submit attempt fields are
    /// not revalidated, so the user is not nagged while typing.
    pub fn on_field_change(&mut self, field: CourseField, edit: impl FnOnce(&mut CourseDraft)) {
        edit(&mut self.draft);
        if !self.submit_attempted {
            return;
        }
        match validate_field(&self.draft, field) {
            Some(msg) => {
                self.errors.insert(field.key(), msg);
            }
            None => {
                self.errors.remove(field.key());
            }
        }
        // the end-date rule depends on both dates
        if field == CourseField::StartDate {
            match validate_field(&self.draft, CourseField::EndDate) {
                Some(msg) => self.errors.insert(CourseField::EndDate.key(), msg),
                None => self.errors.remove(CourseField::EndDate.key()),
            };
        }
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.errors.get(SUBMIT_KEY).map(String::as_str)
    }

    #[instrument(skip_all, fields(operation = %self.operation()))]
    pub async fn submit(&mut self, api: &dyn CourseApi) -> SubmitOutcome<SavedCourse> {
        if self.loading {
            return SubmitOutcome::Busy;
        }
        self.submit_attempted = true;
        self.draft = sanitize_course_draft(&self.draft);
        self.errors = validate_course_form(&self.draft);
        if !self.errors.is_empty() {
            return SubmitOutcome::Invalid;
        }

        self.loading = true;
        let op = self.operation();
        let saved = match self.mode {
            FormMode::Edit { course_id } => api.update_course(course_id, &self.draft).await,
            FormMode::Create | FormMode::Duplicate { .. } => api.create_course(&self.draft).await,
        };
        let outcome = match saved {
            Ok(course) => {
                info!(course_id = course.id, "course saved");
                let copy_error = self.copy_content(api, &course).await;
                SubmitOutcome::Saved(SavedCourse { course, copy_error })
            }
            Err(err) => {
                warn!(error = %err, "course save failed");
                let msg = handle_admin_error(&err, op);
                self.errors.insert(SUBMIT_KEY, msg.clone());
                SubmitOutcome::Failed(msg)
            }
        };
        self.loading = false;
        outcome
    }

    async fn copy_content(&self, api: &dyn CourseApi, copy: &Course) -> Option<String> {
        let FormMode::Duplicate { source_id } = self.mode else {
            return None;
        };
        if !self.duplicate_content && !self.duplicate_enrollments {
            return None;
        }
        match api
            .copy_course_content(source_id, copy.id, self.duplicate_enrollments)
            .await
        {
            Ok(_) => None,
            Err(err) => {
                warn!(source_id, target_id = copy.id, error = %err, "content copy failed");
                Some(handle_admin_error(&err, AdminOperation::CopyContent))
            }
        }
    }
}

/// Reassign a course to another instructor.
#[derive(Debug, Clone)]
pub struct TransferForm {
    pub course_id: i64,
    pub course_title: String,
    pub current_instructor: Option<i64>,
    pub new_instructor_id: Option<i64>,
    pub reason: String,
    pub error: Option<String>,
    pub loading: bool,
}

impl TransferForm {
    pub fn new(course: &Course) -> Self {
        Self {
            course_id: course.id,
            course_title: course.title.clone(),
            current_instructor: course.instructor,
            new_instructor_id: None,
            reason: String::new(),
            error: None,
            loading: false,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let Some(target) = self.new_instructor_id else {
            return Err("Selecciona un instructor".to_string());
        };
        if Some(target) == self.current_instructor {
            return Err("El curso ya está asignado a este instructor".to_string());
        }
        validate_reason(&self.reason, false).map_err(str::to_string)
    }

    #[instrument(skip_all, fields(course_id = self.course_id))]
    pub async fn submit(&mut self, api: &dyn CourseApi) -> SubmitOutcome<OperationResult> {
        if self.loading {
            return SubmitOutcome::Busy;
        }
        if let Err(msg) = self.validate() {
            self.error = Some(msg);
            return SubmitOutcome::Invalid;
        }
        let Some(target) = self.new_instructor_id else {
            return SubmitOutcome::Invalid;
        };
        self.error = None;
        self.loading = true;
        let reason = sanitize_input(&self.reason);
        let outcome = match api.transfer_course(self.course_id, target, &reason).await {
            Ok(res) => SubmitOutcome::Saved(res),
            Err(err) => {
                let msg = handle_admin_error(&err, AdminOperation::Transfer);
                self.error = Some(msg.clone());
                SubmitOutcome::Failed(msg)
            }
        };
        self.loading = false;
        outcome
    }
}

/// Move a course to another lifecycle state.
#[derive(Debug, Clone)]
pub struct StateChangeForm {
    pub course_id: i64,
    pub current: CourseState,
    pub target: Option<CourseState>,
    pub reason: String,
    pub error: Option<String>,
    pub loading: bool,
}

impl StateChangeForm {
    pub fn new(course: &Course) -> Self {
        Self {
            course_id: course.id,
            current: course.state(),
            target: None,
            reason: String::new(),
            error: None,
            loading: false,
        }
    }

    /// States offered in the selector.
    pub fn options(&self) -> &'static [CourseState] {
        self.current.allowed_transitions()
    }

    pub fn validate(&self) -> Result<CourseState, String> {
        let Some(target) = self.target else {
            return Err("Selecciona un estado".to_string());
        };
        if !self.current.can_transition_to(target) {
            return Err("Transición no permitida desde el estado actual".to_string());
        }
        validate_reason(&self.reason, true).map_err(str::to_string)?;
        Ok(target)
    }

    #[instrument(skip_all, fields(course_id = self.course_id))]
    pub async fn submit(&mut self, api: &dyn CourseApi) -> SubmitOutcome<OperationResult> {
        if self.loading {
            return SubmitOutcome::Busy;
        }
        let target = match self.validate() {
            Ok(target) => target,
            Err(msg) => {
                self.error = Some(msg);
                return SubmitOutcome::Invalid;
            }
        };
        self.error = None;
        self.loading = true;
        let reason = sanitize_input(&self.reason);
        let outcome = match api.change_course_state(self.course_id, target, &reason).await {
            Ok(res) => SubmitOutcome::Saved(res),
            Err(err) => {
                let msg = handle_admin_error(&err, AdminOperation::ChangeState);
                self.error = Some(msg.clone());
                SubmitOutcome::Failed(msg)
            }
        };
        self.loading = false;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> Course {
        Course {
            id: 9,
            title: "Gestión Documental".into(),
            instructor: Some(4),
            is_active: true,
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_prefills_copy_title() {
        let form = CourseForm::duplicate(&course());
        assert_eq!(form.draft.title, "Gestión Documental (Copia)");
        assert_eq!(form.operation(), AdminOperation::Duplicate);
        assert_eq!(form.heading(), "Duplicar Curso");
    }

    #[test]
    fn field_changes_validate_only_after_submit_attempt() {
        let mut form = CourseForm::create();
        form.on_field_change(CourseField::Title, |d| d.title = "AB".into());
        assert!(form.errors.is_empty());

        form.submit_attempted = true;
        form.on_field_change(CourseField::Title, |d| d.title = "ABC".into());
        assert_eq!(
            form.errors.get("title").map(String::as_str),
            Some("El título debe tener al menos 5 caracteres")
        );
        form.on_field_change(CourseField::Title, |d| d.title = "Archivos".into());
        assert!(!form.errors.contains_key("title"));
    }

    #[test]
    fn transfer_requires_a_different_instructor() {
        let mut form = TransferForm::new(&course());
        assert_eq!(form.validate().unwrap_err(), "Selecciona un instructor");
        form.new_instructor_id = Some(4);
        assert!(form.validate().is_err());
        form.new_instructor_id = Some(5);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn state_change_checks_transition_and_reason() {
        let mut form = StateChangeForm::new(&course());
        assert_eq!(form.current, CourseState::Active);
        form.target = Some(CourseState::Draft);
        assert_eq!(
            form.validate().unwrap_err(),
            "Transición no permitida desde el estado actual"
        );
        form.target = Some(CourseState::Completed);
        assert_eq!(
            form.validate().unwrap_err(),
            "Debe proporcionar una razón para esta acción"
        );
        form.reason = "fin del periodo".into();
        assert_eq!(form.validate(), Ok(CourseState::Completed));
    }
}

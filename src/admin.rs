//! The course administration workflow.
//!
//! [`CourseAdmin`] owns everything the admin screen shows: the fetched
//! lists, the selection, pagination, filters and exactly one open
//! [`Dialog`]. Every mutation goes through the same steps: permission
//! check, one service call, a notification, an audit record, and on
//! success a full reload from the server.
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::api::{BulkAction, CourseApi};
use crate::db::{self, AuditOutcome, NewAuditEntry, Pool};
use crate::errors::{handle_admin_error, AdminOperation, ApiError};
use crate::filters::{paginate, total_pages, CourseFilters, Debouncer, DEFAULT_DEBOUNCE};
use crate::forms::{CourseForm, FormMode, StateChangeForm, SubmitOutcome, TransferForm};
use crate::lifecycle::{auto_transitions, AutoTransition};
use crate::model::{AdminMetrics, AdminUser, Course, InstructorStats, Level, Modality};
use crate::notify::Notifier;
use crate::validation::{validate_admin_permissions, validate_reason};

pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const EMPTY_SELECTION_MESSAGE: &str = "Selecciona al menos un curso para realizar la operación";
const ACTION_SUCCESS: &str = "Operación completada exitosamente";
const BULK_SUCCESS: &str = "Operación masiva completada exitosamente";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Cards,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    All,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Submitting,
}

/// Single-course actions dispatched from a course card or row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseAction {
    Activate,
    Deactivate,
    Delete,
}

impl CourseAction {
    pub fn operation(&self) -> AdminOperation {
        match self {
            CourseAction::Activate => AdminOperation::Activate,
            CourseAction::Deactivate => AdminOperation::Deactivate,
            CourseAction::Delete => AdminOperation::Delete,
        }
    }

    /// Destructive actions wait for an explicit confirmation.
    pub fn needs_confirmation(&self) -> bool {
        !matches!(self, CourseAction::Activate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKind {
    Danger,
    Warning,
}

/// What the confirmation dialog shows for a pending destructive action.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmDialog {
    pub action: CourseAction,
    pub course_id: i64,
    pub title: String,
    pub message: String,
    pub kind: ConfirmKind,
    pub confirm_text: &'static str,
    pub cancel_text: &'static str,
    pub reason_label: &'static str,
    pub reason_placeholder: &'static str,
    pub reason: String,
}

impl ConfirmDialog {
    fn new(action: CourseAction, course_id: i64, course_title: &str) -> Self {
        let (title, message, kind, confirm_text, reason_label, reason_placeholder) = match action {
            CourseAction::Delete => (
                "Eliminar Curso",
                format!(
                    "¿Estás seguro de que deseas eliminar permanentemente el curso \"{course_title}\"? Esta acción no se puede deshacer."
                ),
                ConfirmKind::Danger,
                "Eliminar Permanentemente",
                "Razón de eliminación",
                "Explica por qué se elimina este curso...",
            ),
            _ => (
                "Desactivar Curso",
                format!(
                    "¿Estás seguro de que deseas desactivar el curso \"{course_title}\"? Los estudiantes inscritos perderán acceso al curso."
                ),
                ConfirmKind::Warning,
                "Desactivar Curso",
                "Razón de desactivación",
                "Explica por qué se desactiva este curso...",
            ),
        };
        Self {
            action,
            course_id,
            title: title.to_string(),
            message,
            kind,
            confirm_text,
            cancel_text: "Cancelar",
            reason_label,
            reason_placeholder,
            reason: String::new(),
        }
    }
}

/// The one dialog that can be open at a time.
#[derive(Debug, Clone, Default)]
pub enum Dialog {
    #[default]
    None,
    CourseForm(CourseForm),
    Transfer(TransferForm),
    StateChange(StateChangeForm),
    BulkOperations,
    Detail(i64),
    Confirm(ConfirmDialog),
}

impl Dialog {
    pub fn is_open(&self) -> bool {
        !matches!(self, Dialog::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperationKind {
    Activate,
    Deactivate,
    Delete,
    Duplicate,
    Transfer,
    UpdateCategory,
    UpdateLevel,
    UpdateModality,
    SetPrice,
    SetCapacity,
}

impl BulkOperationKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "activate" => Some(Self::Activate),
            "deactivate" => Some(Self::Deactivate),
            "delete" => Some(Self::Delete),
            "duplicate" => Some(Self::Duplicate),
            "transfer" => Some(Self::Transfer),
            "update_category" | "category" => Some(Self::UpdateCategory),
            "update_level" | "level" => Some(Self::UpdateLevel),
            "update_modality" | "modality" => Some(Self::UpdateModality),
            "set_price" | "price" => Some(Self::SetPrice),
            "set_capacity" | "capacity" => Some(Self::SetCapacity),
            _ => None,
        }
    }

    /// Pair the operation with the field it needs from `options`.
    pub fn resolve(&self, options: &AdvancedOptions) -> Result<BulkAction, &'static str> {
        Ok(match self {
            Self::Activate => BulkAction::Activate,
            Self::Deactivate => BulkAction::Deactivate,
            Self::Delete => BulkAction::Delete,
            Self::Duplicate => BulkAction::Duplicate,
            Self::Transfer => BulkAction::Transfer {
                new_instructor_id: options
                    .new_instructor_id
                    .ok_or("Debes seleccionar un instructor para la transferencia")?,
            },
            Self::UpdateCategory => BulkAction::UpdateCategory {
                category: options
                    .category
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .ok_or("Debes seleccionar una categoría")?,
            },
            Self::UpdateLevel => BulkAction::UpdateLevel {
                level: options.level.ok_or("Debes seleccionar un nivel")?,
            },
            Self::UpdateModality => BulkAction::UpdateModality {
                modality: options.modality.ok_or("Debes seleccionar una modalidad")?,
            },
            Self::SetPrice => BulkAction::SetPrice {
                price: options
                    .price
                    .filter(|p| p.is_finite() && *p >= 0.0)
                    .ok_or("Debes especificar un precio")?,
            },
            Self::SetCapacity => BulkAction::SetCapacity {
                capacity: options
                    .capacity
                    .filter(|c| *c > 0)
                    .ok_or("Debes especificar una capacidad")?,
            },
        })
    }
}

/// Operation-specific inputs of the bulk dialog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvancedOptions {
    pub new_instructor_id: Option<i64>,
    pub category: Option<String>,
    pub level: Option<Level>,
    pub modality: Option<Modality>,
    pub price: Option<f64>,
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The server accepted the change; carries the message shown.
    Completed(String),
    /// A confirmation dialog is now open; nothing was sent.
    AwaitingConfirmation,
    /// Refused locally before any network call.
    Rejected(String),
    /// The server (or the network) refused the change.
    Failed(String),
}

enum Submitted {
    Saved {
        op: AdminOperation,
        course_ids: Vec<i64>,
        reason: Option<String>,
        message: String,
        warning: Option<String>,
    },
    Invalid(String),
    Failed {
        op: AdminOperation,
        course_ids: Vec<i64>,
        reason: Option<String>,
        message: String,
    },
    Busy,
}

pub struct CourseAdmin {
    api: Arc<dyn CourseApi>,
    notifier: Arc<dyn Notifier>,
    audit: Option<Pool>,
    user: Option<AdminUser>,

    courses: Vec<Course>,
    inactive: Vec<Course>,
    metrics: Option<AdminMetrics>,
    instructor_stats: Vec<InstructorStats>,

    selection: BTreeSet<i64>,
    view: ViewMode,
    tab: Tab,
    page: usize,
    per_page: usize,
    filters: CourseFilters,
    filter_input: CourseFilters,
    filter_debounce: Debouncer<CourseFilters>,
    phase: Phase,
    load_error: Option<String>,
    dialog: Dialog,
}

impl std::fmt::Debug for CourseAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CourseAdmin")
            .field("user", &self.user.as_ref().map(|u| &u.username))
            .field("courses", &self.courses.len())
            .field("inactive", &self.inactive.len())
            .field("selection", &self.selection)
            .field("phase", &self.phase)
            .field("dialog", &self.dialog)
            .finish()
    }
}

impl CourseAdmin {
    pub fn new(api: Arc<dyn CourseApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            audit: None,
            user: None,
            courses: Vec::new(),
            inactive: Vec::new(),
            metrics: None,
            instructor_stats: Vec::new(),
            selection: BTreeSet::new(),
            view: ViewMode::default(),
            tab: Tab::default(),
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
            filters: CourseFilters::default(),
            filter_input: CourseFilters::default(),
            filter_debounce: Debouncer::new(DEFAULT_DEBOUNCE),
            phase: Phase::Idle,
            load_error: None,
            dialog: Dialog::None,
        }
    }

    pub fn with_audit(mut self, pool: Pool) -> Self {
        self.audit = Some(pool);
        self
    }

    pub fn with_user(mut self, user: AdminUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_page_size(mut self, per_page: usize) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn with_filter_debounce(mut self, delay: Duration) -> Self {
        self.filter_debounce = Debouncer::new(delay);
        self
    }

    /// Fetch the signed-in user. Without one every mutation is refused.
    pub async fn authenticate(&mut self) -> Result<&AdminUser, ApiError> {
        let user = self.api.current_user().await?;
        info!(user = %user.username, superuser = user.is_superuser, "authenticated");
        Ok(&*self.user.insert(user))
    }

    pub fn user(&self) -> Option<&AdminUser> {
        self.user.as_ref()
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn inactive_courses(&self) -> &[Course] {
        &self.inactive
    }

    pub fn metrics(&self) -> Option<&AdminMetrics> {
        self.metrics.as_ref()
    }

    pub fn instructor_stats(&self) -> &[InstructorStats] {
        &self.instructor_stats
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    /// Mutable access for editing the open form's fields.
    pub fn dialog_mut(&mut self) -> &mut Dialog {
        &mut self.dialog
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn filters(&self) -> &CourseFilters {
        &self.filters
    }

    pub fn find_course(&self, course_id: i64) -> Option<&Course> {
        self.courses
            .iter()
            .chain(self.inactive.iter())
            .find(|c| c.id == course_id)
    }

    /// Fetch the four lists concurrently. A failure keeps the previous data
    /// and records `"Error al cargar los datos: <msg>"`.
    #[instrument(skip_all)]
    pub async fn load_data(&mut self) -> Result<(), String> {
        self.phase = Phase::Loading;
        let api = Arc::clone(&self.api);
        let loaded = futures::try_join!(
            api.get_all_courses_admin(),
            api.get_inactive_courses_admin(),
            api.get_admin_metrics(),
            api.get_instructor_stats(),
        );
        self.phase = Phase::Ready;
        match loaded {
            Ok((courses, inactive, metrics, stats)) => {
                info!(
                    count = courses.len(),
                    inactive = inactive.len(),
                    "course lists loaded"
                );
                self.courses = courses;
                self.inactive = inactive;
                self.metrics = Some(metrics);
                self.instructor_stats = stats;
                self.load_error = None;
                self.clamp_page();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "loading course lists failed");
                let msg = format!(
                    "Error al cargar los datos: {}",
                    handle_admin_error(&err, AdminOperation::Load)
                );
                self.notifier.show_error(&msg);
                self.load_error = Some(msg.clone());
                Err(msg)
            }
        }
    }

    fn check_permissions(&self) -> Result<(), String> {
        validate_admin_permissions(self.user.as_ref(), &[])
    }

    fn reject(&self, msg: impl Into<String>) -> ActionOutcome {
        let msg = msg.into();
        self.notifier.show_error(&msg);
        ActionOutcome::Rejected(msg)
    }

    /// Activate runs at once. Deactivate and delete only open a
    /// confirmation dialog; [`Self::confirm_dialog`] performs them.
    #[instrument(skip_all, fields(course_id = course_id, action = ?action))]
    pub async fn handle_course_action(
        &mut self,
        action: CourseAction,
        course_id: i64,
        reason: Option<&str>,
    ) -> ActionOutcome {
        if let Err(msg) = self.check_permissions() {
            return self.reject(msg);
        }
        if action.needs_confirmation() {
            let title = self
                .find_course(course_id)
                .map(|c| c.title.clone())
                .unwrap_or_else(|| format!("#{course_id}"));
            let mut dialog = ConfirmDialog::new(action, course_id, &title);
            dialog.reason = reason.unwrap_or_default().to_string();
            self.dialog = Dialog::Confirm(dialog);
            return ActionOutcome::AwaitingConfirmation;
        }
        self.perform(action, course_id, reason.unwrap_or_default()).await
    }

    /// Run the action waiting in the confirmation dialog. A missing reason
    /// keeps the dialog open.
    pub async fn confirm_dialog(&mut self, reason: &str) -> ActionOutcome {
        let Dialog::Confirm(pending) = &self.dialog else {
            return ActionOutcome::Rejected(
                "No hay ninguna acción pendiente de confirmación".to_string(),
            );
        };
        if let Err(msg) = validate_reason(reason, true) {
            self.notifier.show_warning(msg);
            return ActionOutcome::Rejected(msg.to_string());
        }
        let (action, course_id) = (pending.action, pending.course_id);
        self.dialog = Dialog::None;
        self.perform(action, course_id, reason.trim()).await
    }

    /// Close whatever is open. A pending confirmation is dropped unsent.
    pub fn close_dialog(&mut self) {
        self.dialog = Dialog::None;
    }

    async fn perform(&mut self, action: CourseAction, course_id: i64, reason: &str) -> ActionOutcome {
        if self.phase == Phase::Submitting {
            return ActionOutcome::Rejected("Ya hay una operación en curso".to_string());
        }
        self.phase = Phase::Submitting;
        let op = action.operation();
        let result = match action {
            CourseAction::Activate => self.api.activate_course(course_id, reason).await,
            CourseAction::Deactivate => self.api.deactivate_course(course_id, reason).await,
            CourseAction::Delete => self.api.delete_course_admin(course_id, reason).await,
        };
        self.phase = Phase::Ready;
        match result {
            Ok(res) => {
                let msg = res.message_or(ACTION_SUCCESS).to_string();
                info!(course_id, operation = %op, "course action completed");
                self.notifier.show_success(&msg);
                self.record_audit(op, &[course_id], reason, AuditOutcome::Succeeded, &msg)
                    .await;
                let _ = self.load_data().await;
                ActionOutcome::Completed(msg)
            }
            Err(err) => {
                let mapped = handle_admin_error(&err, op);
                warn!(course_id, operation = %op, error = %err, "course action failed");
                self.notifier.show_error(&format!("Error: {mapped}"));
                self.record_audit(op, &[course_id], reason, AuditOutcome::Failed, &mapped)
                    .await;
                ActionOutcome::Failed(mapped)
            }
        }
    }

    /// Apply `kind` to every selected course in one request. Whatever the
    /// server answers, the selection is cleared and the lists reloaded once.
    #[instrument(skip_all, fields(operation = ?kind, count = self.selection.len()))]
    pub async fn handle_bulk_operation(
        &mut self,
        kind: BulkOperationKind,
        reason: &str,
        options: &AdvancedOptions,
    ) -> ActionOutcome {
        if self.selection.is_empty() {
            self.notifier.show_warning(EMPTY_SELECTION_MESSAGE);
            return ActionOutcome::Rejected(EMPTY_SELECTION_MESSAGE.to_string());
        }
        if let Err(msg) = self.check_permissions() {
            return self.reject(msg);
        }
        let action = match kind.resolve(options) {
            Ok(action) => action,
            Err(msg) => return self.reject(msg),
        };
        if let Err(msg) = validate_reason(reason, false) {
            return self.reject(msg);
        }

        let reason = reason.trim();
        let ids: Vec<i64> = self.selection.iter().copied().collect();
        let op = action.operation();
        self.phase = Phase::Submitting;
        let result = self.api.bulk_operation(&action, &ids, reason).await;
        self.phase = Phase::Ready;

        let outcome = match result {
            Ok(res) => {
                let msg = res.message_or(BULK_SUCCESS).to_string();
                info!(count = ids.len(), operation = %op, "bulk operation completed");
                self.notifier.show_success(&msg);
                self.record_audit(op, &ids, reason, AuditOutcome::Succeeded, &msg).await;
                ActionOutcome::Completed(msg)
            }
            Err(err) => {
                let mapped = handle_admin_error(&err, op);
                warn!(count = ids.len(), operation = %op, error = %err, "bulk operation failed");
                self.notifier
                    .show_error(&format!("Error en operación masiva: {mapped}"));
                self.record_audit(op, &ids, reason, AuditOutcome::Failed, &mapped).await;
                ActionOutcome::Failed(mapped)
            }
        };

        self.selection.clear();
        if matches!(self.dialog, Dialog::BulkOperations) {
            self.dialog = Dialog::None;
        }
        let _ = self.load_data().await;
        outcome
    }

    /// Submit the open course, transfer or state-change form.
    pub async fn submit_dialog(&mut self) -> ActionOutcome {
        if let Err(msg) = self.check_permissions() {
            return self.reject(msg);
        }
        let api = Arc::clone(&self.api);
        let submitted = match &mut self.dialog {
            Dialog::CourseForm(form) => {
                let op = form.operation();
                match form.submit(api.as_ref()).await {
                    SubmitOutcome::Saved(saved) => {
                        let course_ids = match form.mode {
                            FormMode::Duplicate { source_id } => vec![source_id, saved.course.id],
                            FormMode::Edit { course_id } => vec![course_id],
                            FormMode::Create => vec![saved.course.id],
                        };
                        Submitted::Saved {
                            op,
                            course_ids,
                            reason: None,
                            message: form.success_message(&saved.course),
                            warning: saved.copy_error,
                        }
                    }
                    SubmitOutcome::Invalid => {
                        Submitted::Invalid("Corrige los errores del formulario".to_string())
                    }
                    SubmitOutcome::Failed(message) => Submitted::Failed {
                        op,
                        course_ids: match form.mode {
                            FormMode::Edit { course_id } => vec![course_id],
                            FormMode::Duplicate { source_id } => vec![source_id],
                            FormMode::Create => Vec::new(),
                        },
                        reason: None,
                        message,
                    },
                    SubmitOutcome::Busy => Submitted::Busy,
                }
            }
            Dialog::Transfer(form) => {
                let course_ids = vec![form.course_id];
                let reason = Some(form.reason.clone());
                match form.submit(api.as_ref()).await {
                    SubmitOutcome::Saved(res) => Submitted::Saved {
                        op: AdminOperation::Transfer,
                        course_ids,
                        reason,
                        message: res
                            .message_or(&format!(
                                "Curso \"{}\" transferido exitosamente",
                                form.course_title
                            ))
                            .to_string(),
                        warning: None,
                    },
                    SubmitOutcome::Invalid => {
                        Submitted::Invalid(form.error.clone().unwrap_or_default())
                    }
                    SubmitOutcome::Failed(message) => Submitted::Failed {
                        op: AdminOperation::Transfer,
                        course_ids,
                        reason,
                        message,
                    },
                    SubmitOutcome::Busy => Submitted::Busy,
                }
            }
            Dialog::StateChange(form) => {
                let course_ids = vec![form.course_id];
                let reason = Some(form.reason.clone());
                match form.submit(api.as_ref()).await {
                    SubmitOutcome::Saved(res) => Submitted::Saved {
                        op: AdminOperation::ChangeState,
                        course_ids,
                        reason,
                        message: res
                            .message_or("Estado del curso actualizado exitosamente")
                            .to_string(),
                        warning: None,
                    },
                    SubmitOutcome::Invalid => {
                        Submitted::Invalid(form.error.clone().unwrap_or_default())
                    }
                    SubmitOutcome::Failed(message) => Submitted::Failed {
                        op: AdminOperation::ChangeState,
                        course_ids,
                        reason,
                        message,
                    },
                    SubmitOutcome::Busy => Submitted::Busy,
                }
            }
            _ => {
                return ActionOutcome::Rejected("No hay ningún formulario abierto".to_string());
            }
        };

        match submitted {
            Submitted::Saved {
                op,
                course_ids,
                reason,
                message,
                warning,
            } => {
                self.notifier.show_success(&message);
                if let Some(warning) = &warning {
                    self.notifier.show_warning(warning);
                }
                self.record_audit(
                    op,
                    &course_ids,
                    reason.as_deref().unwrap_or_default(),
                    AuditOutcome::Succeeded,
                    &message,
                )
                .await;
                self.dialog = Dialog::None;
                let _ = self.load_data().await;
                ActionOutcome::Completed(message)
            }
            // field errors stay on the open form
            Submitted::Invalid(msg) => ActionOutcome::Rejected(msg),
            Submitted::Failed {
                op,
                course_ids,
                reason,
                message,
            } => {
                self.notifier.show_error(&format!("Error: {message}"));
                self.record_audit(
                    op,
                    &course_ids,
                    reason.as_deref().unwrap_or_default(),
                    AuditOutcome::Failed,
                    &message,
                )
                .await;
                ActionOutcome::Failed(message)
            }
            Submitted::Busy => ActionOutcome::Rejected("Ya hay una operación en curso".to_string()),
        }
    }

    async fn record_audit(
        &self,
        op: AdminOperation,
        course_ids: &[i64],
        reason: &str,
        outcome: AuditOutcome,
        message: &str,
    ) {
        let Some(pool) = &self.audit else {
            return;
        };
        let entry = NewAuditEntry {
            operation: op.as_str().to_string(),
            course_ids: course_ids.to_vec(),
            reason: Some(reason.to_string()),
            outcome,
            message: message.to_string(),
            actor: self.user.as_ref().map(|u| u.username.clone()),
        };
        if let Err(err) = db::record_operation(pool, &entry).await {
            warn!(error = %err, operation = %op, "failed to write audit entry");
        }
    }

    // dialog openers

    pub fn open_create(&mut self) {
        self.dialog = Dialog::CourseForm(CourseForm::create());
    }

    pub fn open_edit(&mut self, course_id: i64) -> bool {
        self.open_with(course_id, |c| Dialog::CourseForm(CourseForm::edit(c)))
    }

    pub fn open_duplicate(&mut self, course_id: i64) -> bool {
        self.open_with(course_id, |c| Dialog::CourseForm(CourseForm::duplicate(c)))
    }

    pub fn open_transfer(&mut self, course_id: i64) -> bool {
        self.open_with(course_id, |c| Dialog::Transfer(TransferForm::new(c)))
    }

    pub fn open_state_change(&mut self, course_id: i64) -> bool {
        self.open_with(course_id, |c| Dialog::StateChange(StateChangeForm::new(c)))
    }

    pub fn open_detail(&mut self, course_id: i64) -> bool {
        self.open_with(course_id, |c| Dialog::Detail(c.id))
    }

    /// The bulk dialog needs a non-empty selection.
    pub fn open_bulk_operations(&mut self) -> bool {
        if self.selection.is_empty() {
            self.notifier.show_warning(EMPTY_SELECTION_MESSAGE);
            return false;
        }
        self.dialog = Dialog::BulkOperations;
        true
    }

    fn open_with(&mut self, course_id: i64, make: impl FnOnce(&Course) -> Dialog) -> bool {
        let Some(dialog) = self.find_course(course_id).map(make) else {
            self.notifier.show_error("Curso no encontrado");
            return false;
        };
        self.dialog = dialog;
        true
    }

    // selection

    pub fn selected_ids(&self) -> Vec<i64> {
        self.selection.iter().copied().collect()
    }

    pub fn is_selected(&self, course_id: i64) -> bool {
        self.selection.contains(&course_id)
    }

    pub fn toggle_selection(&mut self, course_id: i64) {
        if !self.selection.remove(&course_id) {
            self.selection.insert(course_id);
        }
    }

    /// Select every course on the current page, or clear them if they are
    /// all selected already.
    pub fn toggle_select_page(&mut self) {
        let ids: Vec<i64> = self.current_page().iter().map(|c| c.id).collect();
        if !ids.is_empty() && ids.iter().all(|id| self.selection.contains(id)) {
            for id in &ids {
                self.selection.remove(id);
            }
        } else {
            self.selection.extend(ids);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // view, tab, filters, pagination

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn set_tab(&mut self, tab: Tab) {
        if self.tab != tab {
            self.tab = tab;
            self.selection.clear();
            self.page = 1;
        }
    }

    /// Edit the filter inputs. The change is applied once the debounce
    /// window passes; see [`Self::apply_pending_filters`].
    pub fn update_filters(&mut self, edit: impl FnOnce(&mut CourseFilters)) {
        edit(&mut self.filter_input);
        self.filter_debounce.push(self.filter_input.clone());
    }

    /// Apply debounced filter input if it has settled. Returns true when the
    /// filters changed.
    pub fn apply_pending_filters(&mut self) -> bool {
        match self.filter_debounce.poll() {
            Some(filters) => self.set_filters(filters),
            None => false,
        }
    }

    /// Apply filters immediately, skipping the debounce.
    pub fn set_filters(&mut self, filters: CourseFilters) -> bool {
        if filters == self.filters {
            return false;
        }
        self.filter_input = filters.clone();
        self.filters = filters;
        self.page = 1;
        true
    }

    pub fn clear_filters(&mut self) {
        self.set_filters(CourseFilters::default());
    }

    pub fn active_filter_count(&self) -> usize {
        self.filters.active_count()
    }

    /// Courses of the current tab after filters and sort.
    pub fn visible_courses(&self) -> Vec<Course> {
        let source = match self.tab {
            Tab::All => &self.courses,
            Tab::Inactive => &self.inactive,
        };
        self.filters.apply(source)
    }

    pub fn current_page(&self) -> Vec<Course> {
        let visible = self.visible_courses();
        paginate(&visible, self.page, self.per_page).to_vec()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.visible_courses().len(), self.per_page)
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages().max(1));
    }

    fn clamp_page(&mut self) {
        self.set_page(self.page);
    }

    /// Date-driven transitions due for the loaded courses.
    pub fn due_transitions(&self, today: NaiveDate) -> Vec<(i64, AutoTransition)> {
        self.courses
            .iter()
            .chain(self.inactive.iter())
            .flat_map(|c| {
                auto_transitions(c, today)
                    .into_iter()
                    .map(move |t| (c.id, t))
            })
            .collect()
    }
}

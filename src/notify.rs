//! Transient notifications: success/error toasts, confirmations, progress.
//!
//! The workflow talks to notifications only through the [`Notifier`] port,
//! so it can be driven and tested without any UI. [`NotificationHub`] is the
//! in-process implementation: one list behind a mutex, ids that only grow,
//! and auto-dismiss timers on the tokio runtime.
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::config::Notifications as DurationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
    Confirm,
    Bulk,
    Progress,
    Loading,
    Achievement,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Warning => "warning",
            NotificationKind::Info => "info",
            NotificationKind::Confirm => "confirm",
            NotificationKind::Bulk => "bulk",
            NotificationKind::Progress => "progress",
            NotificationKind::Loading => "loading",
            NotificationKind::Achievement => "achievement",
            NotificationKind::System => "system",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NotificationKind::Success => "✅",
            NotificationKind::Error => "❌",
            NotificationKind::Warning => "⚠️",
            NotificationKind::Info => "ℹ️",
            NotificationKind::Confirm => "❓",
            NotificationKind::Bulk => "📦",
            NotificationKind::Progress => "⏳",
            NotificationKind::Loading => "🔄",
            NotificationKind::Achievement => "🏆",
            NotificationKind::System => "⚙️",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Closures attached to a confirm or bulk notification.
#[derive(Default)]
pub struct ConfirmActions {
    pub on_confirm: Option<Callback>,
    pub on_cancel: Option<Callback>,
}

impl fmt::Debug for ConfirmActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmActions")
            .field("on_confirm", &self.on_confirm.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .finish()
    }
}

/// What a caller asks for. `None` fields take the hub defaults
/// (`info`, 5000 ms, auto-close).
#[derive(Debug, Default)]
pub struct NotificationSpec {
    pub kind: Option<NotificationKind>,
    pub message: String,
    pub details: Option<String>,
    pub duration: Option<Duration>,
    pub auto_close: Option<bool>,
    pub progress: Option<f32>,
    pub confirm_text: Option<String>,
    pub cancel_text: Option<String>,
    pub actions: Option<ConfirmActions>,
}

impl NotificationSpec {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn sticky(mut self) -> Self {
        self.duration = Some(Duration::ZERO);
        self.auto_close = Some(false);
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Snapshot of a live notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub details: Option<String>,
    pub duration: Duration,
    pub auto_close: bool,
    /// 0..=100. For auto-closing notifications this is the remaining time.
    pub progress: f32,
    pub confirm_text: Option<String>,
    pub cancel_text: Option<String>,
    pub has_actions: bool,
    pub timestamp: DateTime<Utc>,
}

/// The port the workflow uses to raise notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, spec: NotificationSpec) -> u64;

    fn update_progress(&self, id: u64, percent: f32, message: Option<String>);

    fn dismiss(&self, id: u64);

    /// Per-kind auto-dismiss durations.
    fn durations(&self) -> DurationConfig {
        DurationConfig::default()
    }

    fn show_success(&self, message: &str) -> u64 {
        self.notify(NotificationSpec::new(NotificationKind::Success, message))
    }

    fn show_error(&self, message: &str) -> u64 {
        let d = Duration::from_millis(self.durations().error_ms);
        self.notify(NotificationSpec::new(NotificationKind::Error, message).duration(d))
    }

    fn show_warning(&self, message: &str) -> u64 {
        let d = Duration::from_millis(self.durations().warning_ms);
        self.notify(NotificationSpec::new(NotificationKind::Warning, message).duration(d))
    }

    fn show_info(&self, message: &str) -> u64 {
        self.notify(NotificationSpec::new(NotificationKind::Info, message))
    }

    fn show_confirm(&self, message: &str, on_confirm: Callback, on_cancel: Option<Callback>) -> u64 {
        let mut spec = NotificationSpec::new(NotificationKind::Confirm, message).sticky();
        spec.confirm_text = Some("Confirmar".into());
        spec.cancel_text = Some("Cancelar".into());
        spec.actions = Some(ConfirmActions {
            on_confirm: Some(on_confirm),
            on_cancel,
        });
        self.notify(spec)
    }

    /// Confirmation for applying `operation` to `count` courses.
    fn show_bulk_operation(
        &self,
        operation: &str,
        count: usize,
        on_confirm: Callback,
        on_cancel: Option<Callback>,
    ) -> u64 {
        let verb = bulk_verb(operation);
        let mut spec = NotificationSpec::new(
            NotificationKind::Bulk,
            format!("¿Estás seguro de que deseas {verb} {count} cursos?"),
        )
        .sticky();
        spec.confirm_text = Some(format!("{} {count} cursos", capitalize(verb)));
        spec.cancel_text = Some("Cancelar".into());
        spec.actions = Some(ConfirmActions {
            on_confirm: Some(on_confirm),
            on_cancel,
        });
        self.notify(spec)
    }

    fn show_progress(&self, message: &str) -> u64 {
        let mut spec = NotificationSpec::new(NotificationKind::Progress, message).sticky();
        spec.progress = Some(0.0);
        self.notify(spec)
    }

    fn show_loading(&self, message: &str) -> u64 {
        self.notify(NotificationSpec::new(NotificationKind::Loading, message).sticky())
    }

    fn show_system(&self, message: &str) -> u64 {
        let d = Duration::from_millis(self.durations().system_ms);
        self.notify(NotificationSpec::new(NotificationKind::System, message).duration(d))
    }

    fn show_achievement(&self, title: &str, details: &str) -> u64 {
        let d = Duration::from_millis(self.durations().achievement_ms);
        let mut spec = NotificationSpec::new(NotificationKind::Achievement, title).duration(d);
        spec.details = Some(details.to_string());
        self.notify(spec)
    }
}

fn bulk_verb(operation: &str) -> &str {
    match operation {
        "activate" => "activar",
        "deactivate" => "desactivar",
        "delete" => "eliminar",
        "duplicate" => "duplicar",
        "transfer" => "transferir",
        _ => "modificar",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

struct Entry {
    notification: Notification,
    started: Instant,
    actions: Option<ConfirmActions>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.notification.auto_close
            && !self.notification.duration.is_zero()
            && now.duration_since(self.started) >= self.notification.duration
    }

    fn remaining_percent(&self, now: Instant) -> f32 {
        let total = self.notification.duration.as_secs_f32();
        if total <= 0.0 {
            return self.notification.progress;
        }
        let elapsed = now.duration_since(self.started).as_secs_f32();
        ((total - elapsed).max(0.0) / total) * 100.0
    }
}

#[derive(Default)]
struct HubState {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Process-wide list of live notifications.
#[derive(Clone)]
pub struct NotificationHub {
    state: Arc<Mutex<HubState>>,
    durations: DurationConfig,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DurationConfig::default())
    }
}

impl fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHub")
            .field("live", &self.lock().entries.len())
            .finish()
    }
}

impl NotificationHub {
    pub fn new(durations: DurationConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                next_id: 1,
                entries: Vec::new(),
            })),
            durations,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        // A panicking callback must not take the whole list down with it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_notification(&self, spec: NotificationSpec) -> u64 {
        let kind = spec.kind.unwrap_or(NotificationKind::Info);
        let duration = spec
            .duration
            .unwrap_or_else(|| Duration::from_millis(self.durations.default_ms));
        let auto_close = spec.auto_close.unwrap_or(true);

        let id = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.entries.push(Entry {
                notification: Notification {
                    id,
                    kind,
                    message: spec.message,
                    details: spec.details,
                    duration,
                    auto_close,
                    progress: spec.progress.unwrap_or(100.0).clamp(0.0, 100.0),
                    confirm_text: spec.confirm_text,
                    cancel_text: spec.cancel_text,
                    has_actions: spec.actions.is_some(),
                    timestamp: Utc::now(),
                },
                started: Instant::now(),
                actions: spec.actions,
            });
            id
        };
        debug!(id, kind = %kind, "notification added");

        if auto_close && !duration.is_zero() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let hub = self.clone();
                handle.spawn(async move {
                    tokio::time::sleep(duration).await;
                    hub.remove_notification(id);
                });
            }
        }
        id
    }

    pub fn remove_notification(&self, id: u64) -> bool {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|e| e.notification.id != id);
        before != state.entries.len()
    }

    pub fn clear_all(&self) {
        self.lock().entries.clear();
    }

    /// Live notifications, oldest first. Expired auto-close entries are
    /// dropped here as well so the list stays right without a runtime.
    pub fn snapshot(&self) -> Vec<Notification> {
        let now = Instant::now();
        let mut state = self.lock();
        state.entries.retain(|e| !e.expired(now));
        state
            .entries
            .iter()
            .map(|e| {
                let mut n = e.notification.clone();
                if n.auto_close && !n.duration.is_zero() {
                    n.progress = e.remaining_percent(now);
                }
                n
            })
            .collect()
    }

    pub fn get(&self, id: u64) -> Option<Notification> {
        self.snapshot().into_iter().find(|n| n.id == id)
    }

    /// Run the confirm callback of `id` and remove it. Returns false when no
    /// such notification is live.
    pub fn confirm(&self, id: u64) -> bool {
        self.resolve(id, true)
    }

    pub fn cancel(&self, id: u64) -> bool {
        self.resolve(id, false)
    }

    fn resolve(&self, id: u64, confirmed: bool) -> bool {
        let actions = {
            let mut state = self.lock();
            let Some(pos) = state.entries.iter().position(|e| e.notification.id == id) else {
                return false;
            };
            state.entries.remove(pos).actions
        };
        // Callbacks run outside the lock; they may raise new notifications.
        let callback = actions.and_then(|a| if confirmed { a.on_confirm } else { a.on_cancel });
        if let Some(cb) = callback {
            cb();
        }
        true
    }
}

impl Notifier for NotificationHub {
    fn notify(&self, spec: NotificationSpec) -> u64 {
        self.add_notification(spec)
    }

    fn update_progress(&self, id: u64, percent: f32, message: Option<String>) {
        let mut state = self.lock();
        if let Some(entry) = state.entries.iter_mut().find(|e| e.notification.id == id) {
            entry.notification.progress = percent.clamp(0.0, 100.0);
            if let Some(message) = message {
                entry.notification.message = message;
            }
        }
    }

    fn dismiss(&self, id: u64) {
        self.remove_notification(id);
    }

    fn durations(&self) -> DurationConfig {
        self.durations.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn ids_increase_and_defaults_apply() {
        let hub = NotificationHub::default();
        let a = hub.add_notification(NotificationSpec {
            message: "hola".into(),
            ..Default::default()
        });
        let b = hub.show_success("listo");
        assert!(b > a);
        let n = hub.get(a).unwrap();
        assert_eq!(n.kind, NotificationKind::Info);
        assert_eq!(n.duration, Duration::from_millis(5000));
        assert!(n.auto_close);
    }

    #[test]
    fn error_and_warning_use_longer_durations() {
        let hub = NotificationHub::default();
        let e = hub.show_error("falló");
        let w = hub.show_warning("cuidado");
        assert_eq!(hub.get(e).unwrap().duration, Duration::from_millis(8000));
        assert_eq!(hub.get(w).unwrap().duration, Duration::from_millis(6000));
    }

    #[test]
    fn confirm_runs_callback_once_and_removes() {
        let hub = NotificationHub::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = hub.show_confirm(
            "¿Seguro?",
            Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }),
            None,
        );
        let n = hub.get(id).unwrap();
        assert!(!n.auto_close);
        assert_eq!(n.confirm_text.as_deref(), Some("Confirmar"));
        assert!(hub.confirm(id));
        assert!(!hub.confirm(id));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(hub.get(id).is_none());
    }

    #[test]
    fn cancel_runs_cancel_callback() {
        let hub = NotificationHub::default();
        let cancelled = Arc::new(AtomicUsize::new(0));
        let c = cancelled.clone();
        let id = hub.show_bulk_operation(
            "deactivate",
            3,
            Box::new(|| panic!("must not confirm")),
            Some(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })),
        );
        let n = hub.get(id).unwrap();
        assert_eq!(n.message, "¿Estás seguro de que deseas desactivar 3 cursos?");
        assert_eq!(n.confirm_text.as_deref(), Some("Desactivar 3 cursos"));
        assert!(hub.cancel(id));
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn update_progress_patches_in_place() {
        let hub = NotificationHub::default();
        let id = hub.show_progress("Exportando");
        hub.update_progress(id, 140.0, Some("Casi".into()));
        let n = hub.get(id).unwrap();
        assert_eq!(n.progress, 100.0);
        assert_eq!(n.message, "Casi");
        hub.update_progress(999, 10.0, None);
    }

    #[test]
    fn clear_all_empties_the_list() {
        let hub = NotificationHub::default();
        hub.show_info("a");
        hub.show_loading("b");
        hub.clear_all();
        assert!(hub.snapshot().is_empty());
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aula_admin::config::Notifications;
use aula_admin::notify::{NotificationHub, NotificationKind, NotificationSpec, Notifier};

#[tokio::test(start_paused = true)]
async fn default_notification_auto_removes_after_five_seconds() {
    let hub = NotificationHub::default();
    let id = hub.add_notification(NotificationSpec {
        message: "Curso guardado".into(),
        ..Default::default()
    });

    tokio::time::advance(Duration::from_millis(2500)).await;
    let n = hub.get(id).expect("still visible halfway");
    assert!((n.progress - 50.0).abs() < 1.0, "progress {}", n.progress);

    tokio::time::advance(Duration::from_millis(2499)).await;
    assert!(hub.get(id).is_some());

    tokio::time::advance(Duration::from_millis(1)).await;
    tokio::task::yield_now().await;
    assert!(hub.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn sticky_notifications_survive_until_dismissed() {
    let hub = NotificationHub::default();
    let loading = hub.show_loading("Cargando cursos");
    let confirm = hub.show_confirm("¿Continuar?", Box::new(|| {}), None);

    tokio::time::advance(Duration::from_secs(60)).await;
    tokio::task::yield_now().await;
    assert_eq!(hub.snapshot().len(), 2);

    hub.dismiss(loading);
    assert!(hub.get(loading).is_none());
    assert!(hub.get(confirm).is_some());
}

#[tokio::test(start_paused = true)]
async fn durations_come_from_configuration() {
    let hub = NotificationHub::new(Notifications {
        default_ms: 1000,
        error_ms: 2000,
        warning_ms: 1500,
        system_ms: 500,
        achievement_ms: 3000,
    });
    let info = hub.show_info("hola");
    let error = hub.show_error("fallo");
    let system = hub.show_system("sincronizado");

    tokio::time::advance(Duration::from_millis(1000)).await;
    tokio::task::yield_now().await;
    assert!(hub.get(info).is_none());
    assert!(hub.get(system).is_none());
    assert!(hub.get(error).is_some());
}

#[tokio::test]
async fn confirm_callback_may_raise_a_new_notification() {
    let hub = Arc::new(NotificationHub::default());
    let inner = hub.clone();
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    let id = hub.show_bulk_operation(
        "delete",
        2,
        Box::new(move || {
            flag.store(true, Ordering::SeqCst);
            inner.show_success("2 cursos eliminados");
        }),
        None,
    );

    assert!(hub.confirm(id));
    assert!(ran.load(Ordering::SeqCst));
    let live = hub.snapshot();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].kind, NotificationKind::Success);
}

#[tokio::test]
async fn notifier_port_works_through_a_trait_object() {
    let hub = NotificationHub::default();
    let port: Arc<dyn Notifier> = Arc::new(hub.clone());
    let id = port.show_achievement("Primer curso publicado", "¡Bien hecho!");
    port.update_progress(id, -5.0, None);

    let n = hub.get(id).unwrap();
    assert_eq!(n.kind, NotificationKind::Achievement);
    assert_eq!(n.details.as_deref(), Some("¡Bien hecho!"));
    assert_eq!(n.duration, Duration::from_millis(6000));
}

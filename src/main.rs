use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use aula_admin::admin::{
    ActionOutcome, AdvancedOptions, BulkOperationKind, CourseAction, CourseAdmin, Dialog, Tab,
};
use aula_admin::api::{CourseApi, CourseClient};
use aula_admin::config;
use aula_admin::db;
use aula_admin::filters::{CourseFilters, SortField, SortOrder, StatusFilter};
use aula_admin::lifecycle::CourseState;
use aula_admin::model::{Course, Level, Modality};
use aula_admin::notify::NotificationHub;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print an example configuration file
    ExampleConfig,
    /// List courses with optional filters
    List {
        /// Show the inactive-courses tab
        #[arg(long)]
        inactive: bool,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        modality: Option<String>,
        /// active | inactive
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        instructor: Option<String>,
        #[arg(long)]
        min_students: Option<u32>,
        #[arg(long)]
        max_students: Option<u32>,
        /// title | created_at | start_date | students | price | instructor
        #[arg(long, default_value = "title")]
        sort: String,
        #[arg(long)]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show one course, its lifecycle state and due transitions
    Show { id: i64 },
    /// Activate a course immediately
    Activate {
        id: i64,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Deactivate a course (requires --yes and a reason)
    Deactivate {
        id: i64,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        yes: bool,
    },
    /// Permanently delete a course (requires --yes and a reason)
    Delete {
        id: i64,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        yes: bool,
    },
    /// Move a course to another instructor
    Transfer {
        id: i64,
        #[arg(long)]
        instructor: i64,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Change the lifecycle state of a course
    State {
        id: i64,
        state: String,
        #[arg(long)]
        reason: String,
    },
    /// Duplicate a course, optionally copying its content and enrollments
    Duplicate {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: bool,
        #[arg(long)]
        enrollments: bool,
    },
    /// Apply one operation to several courses
    Bulk {
        /// activate | deactivate | delete | duplicate | transfer | update-category |
        /// update-level | update-modality | set-price | set-capacity
        operation: String,
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long)]
        instructor: Option<i64>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        modality: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        capacity: Option<u32>,
    },
    /// Dashboard metrics and instructor statistics
    Metrics,
    /// List instructors available for transfers
    Instructors,
    /// Show the local audit journal
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long)]
        course: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Command::ExampleConfig = args.command {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    cfg.ensure_dirs()?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.audit_database_url());
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    if let Command::Audit { limit, course } = args.command {
        let entries = match course {
            Some(id) => db::list_for_course(&pool, id).await?,
            None => db::list_recent(&pool, limit).await?,
        };
        for e in entries {
            println!(
                "{} {} {:<16} {:<9} {:?} {}{}",
                e.created_at.format("%Y-%m-%d %H:%M:%S"),
                e.operation_id,
                e.operation,
                e.outcome,
                e.course_ids,
                e.message,
                e.reason.map(|r| format!(" (razón: {r})")).unwrap_or_default()
            );
        }
        return Ok(());
    }

    let client = Arc::new(CourseClient::from_config(&cfg)?);
    let hub = Arc::new(NotificationHub::new(cfg.notifications.clone()));
    let mut admin = CourseAdmin::new(client.clone(), hub.clone())
        .with_audit(pool)
        .with_page_size(cfg.app.page_size)
        .with_filter_debounce(cfg.filter_debounce());

    let user = admin
        .authenticate()
        .await
        .map_err(|e| anyhow!("authentication failed: {e}"))?;
    info!(user = %user.username, "signed in");

    let result = run(&mut admin, client.as_ref(), args.command).await;
    print_notifications(&hub);
    result
}

async fn run(admin: &mut CourseAdmin, api: &dyn CourseApi, command: Command) -> Result<()> {
    match command {
        Command::ExampleConfig | Command::Audit { .. } => Ok(()),
        Command::List {
            inactive,
            search,
            modality,
            status,
            instructor,
            min_students,
            max_students,
            sort,
            desc,
            page,
        } => {
            admin.load_data().await.map_err(|e| anyhow!(e))?;
            let filters = CourseFilters {
                search: search.unwrap_or_default(),
                modality: parse_opt(modality.as_deref(), Modality::parse, "modality")?,
                status: parse_opt(status.as_deref(), parse_status, "status")?,
                instructor: instructor.unwrap_or_default(),
                students_min: min_students,
                students_max: max_students,
                sort_by: SortField::parse(&sort).ok_or_else(|| anyhow!("unknown sort field {sort}"))?,
                sort_order: if desc { SortOrder::Desc } else { SortOrder::Asc },
                ..Default::default()
            };
            if inactive {
                admin.set_tab(Tab::Inactive);
            }
            admin.set_filters(filters);
            admin.set_page(page);
            for course in admin.current_page() {
                print_course_row(&course);
            }
            println!(
                "página {}/{} · {} cursos · {} filtros activos",
                admin.page(),
                admin.total_pages().max(1),
                admin.visible_courses().len(),
                admin.active_filter_count()
            );
            Ok(())
        }
        Command::Show { id } => {
            let course = api.get_course(id).await.map_err(|e| anyhow!(e))?;
            print_course_detail(&course);
            Ok(())
        }
        Command::Activate { id, reason } => {
            admin.load_data().await.map_err(|e| anyhow!(e))?;
            report(
                admin
                    .handle_course_action(CourseAction::Activate, id, Some(&reason))
                    .await,
            )
        }
        Command::Deactivate { id, reason, yes } => {
            confirm_destructive(admin, CourseAction::Deactivate, id, &reason, yes).await
        }
        Command::Delete { id, reason, yes } => {
            confirm_destructive(admin, CourseAction::Delete, id, &reason, yes).await
        }
        Command::Transfer {
            id,
            instructor,
            reason,
        } => {
            admin.load_data().await.map_err(|e| anyhow!(e))?;
            if !admin.open_transfer(id) {
                bail!("course {id} not found");
            }
            if let Dialog::Transfer(form) = admin.dialog_mut() {
                form.new_instructor_id = Some(instructor);
                form.reason = reason;
            }
            report(admin.submit_dialog().await)
        }
        Command::State { id, state, reason } => {
            let target =
                CourseState::parse(&state).ok_or_else(|| anyhow!("unknown state {state}"))?;
            admin.load_data().await.map_err(|e| anyhow!(e))?;
            if !admin.open_state_change(id) {
                bail!("course {id} not found");
            }
            if let Dialog::StateChange(form) = admin.dialog_mut() {
                form.target = Some(target);
                form.reason = reason;
            }
            report(admin.submit_dialog().await)
        }
        Command::Duplicate {
            id,
            title,
            content,
            enrollments,
        } => {
            admin.load_data().await.map_err(|e| anyhow!(e))?;
            if !admin.open_duplicate(id) {
                bail!("course {id} not found");
            }
            if let Dialog::CourseForm(form) = admin.dialog_mut() {
                if let Some(title) = title {
                    form.draft.title = title;
                }
                form.duplicate_content = content;
                form.duplicate_enrollments = enrollments;
            }
            let outcome = admin.submit_dialog().await;
            if let Dialog::CourseForm(form) = admin.dialog() {
                for (field, msg) in &form.errors {
                    eprintln!("  {field}: {msg}");
                }
            }
            report(outcome)
        }
        Command::Bulk {
            operation,
            ids,
            reason,
            instructor,
            category,
            level,
            modality,
            price,
            capacity,
        } => {
            let kind = BulkOperationKind::parse(&operation)
                .ok_or_else(|| anyhow!("unknown bulk operation {operation}"))?;
            let options = AdvancedOptions {
                new_instructor_id: instructor,
                category,
                level: parse_opt(level.as_deref(), Level::parse, "level")?,
                modality: parse_opt(modality.as_deref(), Modality::parse, "modality")?,
                price,
                capacity,
            };
            admin.load_data().await.map_err(|e| anyhow!(e))?;
            for id in ids {
                if !admin.is_selected(id) {
                    admin.toggle_selection(id);
                }
            }
            report(admin.handle_bulk_operation(kind, &reason, &options).await)
        }
        Command::Metrics => {
            admin.load_data().await.map_err(|e| anyhow!(e))?;
            if let Some(m) = admin.metrics() {
                println!("cursos totales:     {}", m.total_courses);
                println!("cursos activos:     {}", m.active_courses);
                println!("cursos inactivos:   {}", m.inactive_courses);
                println!("estudiantes:        {}", m.total_students);
                println!("instructores:       {}", m.total_instructors);
            }
            for s in admin.instructor_stats() {
                println!(
                    "  {:<30} {:>4} cursos {:>6} estudiantes",
                    s.instructor_name, s.course_count, s.student_count
                );
            }
            let due = admin.due_transitions(Utc::now().date_naive());
            if !due.is_empty() {
                println!("transiciones pendientes:");
                for (id, t) in due {
                    println!("  #{id}: {} → {} ({})", t.from.label(), t.to.label(), t.description);
                }
            }
            Ok(())
        }
        Command::Instructors => {
            for i in api.list_instructors().await.map_err(|e| anyhow!(e))? {
                println!("{:>5}  {:<20} {:<30} {}", i.id, i.username, i.name, i.email);
            }
            Ok(())
        }
    }
}

async fn confirm_destructive(
    admin: &mut CourseAdmin,
    action: CourseAction,
    id: i64,
    reason: &str,
    yes: bool,
) -> Result<()> {
    admin.load_data().await.map_err(|e| anyhow!(e))?;
    match admin.handle_course_action(action, id, Some(reason)).await {
        ActionOutcome::AwaitingConfirmation => {}
        other => return report(other),
    }
    if let Dialog::Confirm(dialog) = admin.dialog() {
        println!("{}\n{}", dialog.title, dialog.message);
    }
    if !yes {
        admin.close_dialog();
        println!("cancelado: vuelve a ejecutar con --yes para confirmar");
        return Ok(());
    }
    report(admin.confirm_dialog(reason).await)
}

fn report(outcome: ActionOutcome) -> Result<()> {
    match outcome {
        ActionOutcome::Completed(msg) => {
            println!("{msg}");
            Ok(())
        }
        ActionOutcome::AwaitingConfirmation => Ok(()),
        ActionOutcome::Rejected(msg) | ActionOutcome::Failed(msg) => bail!(msg),
    }
}

fn parse_opt<T>(raw: Option<&str>, parse: fn(&str) -> Option<T>, what: &str) -> Result<Option<T>> {
    raw.map(|s| parse(s).ok_or_else(|| anyhow!("unknown {what} {s}")))
        .transpose()
}

fn parse_status(s: &str) -> Option<StatusFilter> {
    match s.trim().to_ascii_lowercase().as_str() {
        "active" | "activo" => Some(StatusFilter::Active),
        "inactive" | "inactivo" => Some(StatusFilter::Inactive),
        _ => None,
    }
}

fn print_course_row(c: &Course) {
    println!(
        "{:>5}  {:<40} {:<20} {:<10} {:>4} est.  {}",
        c.id,
        c.title,
        c.instructor_label(),
        c.modality.map(|m| m.label()).unwrap_or("-"),
        c.enrolled_students_count,
        c.state().label()
    );
}

fn print_course_detail(c: &Course) {
    println!("#{} {}", c.id, c.title);
    println!("{}", c.description);
    println!("instructor:  {}", c.instructor_label());
    println!("categoría:   {}", c.category.as_deref().unwrap_or("-"));
    println!("nivel:       {}", c.level.map(|l| l.label()).unwrap_or("-"));
    println!("modalidad:   {}", c.modality.map(|m| m.label()).unwrap_or("-"));
    if let Some(price) = c.price {
        println!("precio:      {price:.2}");
    }
    if let Some(cap) = c.max_students {
        println!("capacidad:   {} / {cap}", c.enrolled_students_count);
    }
    let state = c.state();
    println!("estado:      {} ({})", state.label(), state.description());
    let next: Vec<&str> = state.allowed_transitions().iter().map(|s| s.as_str()).collect();
    println!("transiciones: {}", next.join(", "));
    for t in aula_admin::lifecycle::auto_transitions(c, Utc::now().date_naive()) {
        println!("pendiente:   {} → {} ({})", t.from.label(), t.to.label(), t.description);
    }
}

fn print_notifications(hub: &NotificationHub) {
    for n in hub.snapshot() {
        eprintln!("{} {}", n.kind.icon(), n.message);
    }
}

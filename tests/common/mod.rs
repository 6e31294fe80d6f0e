#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use aula_admin::api::{BulkAction, CourseApi};
use aula_admin::errors::ApiError;
use aula_admin::lifecycle::CourseState;
use aula_admin::model::{
    AdminMetrics, AdminUser, Course, CourseDraft, Instructor, InstructorStats, OperationResult,
};

/// One recorded service call: endpoint name, course ids, free-form argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: &'static str,
    pub ids: Vec<i64>,
    pub arg: String,
}

#[derive(Clone, Default)]
pub struct RecordingApi {
    courses: Arc<Mutex<Vec<Course>>>,
    responses: Arc<Mutex<VecDeque<Result<OperationResult, ApiError>>>>,
    load_failure: Arc<Mutex<Option<ApiError>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingApi {
    pub fn with_courses(courses: Vec<Course>) -> Self {
        Self {
            courses: Arc::new(Mutex::new(courses)),
            ..Default::default()
        }
    }

    /// Queue the result of the next mutating call.
    pub async fn push_response(&self, response: Result<OperationResult, ApiError>) {
        self.responses.lock().await.push_back(response);
    }

    pub async fn fail_loads_with(&self, err: ApiError) {
        *self.load_failure.lock().await = Some(err);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, name: &str) -> usize {
        self.calls.lock().await.iter().filter(|c| c.name == name).count()
    }

    /// Calls other than the four list loads and `users/me`.
    pub async fn mutations(&self) -> Vec<Call> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| {
                !matches!(
                    c.name,
                    "get_all_courses_admin"
                        | "get_inactive_courses_admin"
                        | "get_admin_metrics"
                        | "get_instructor_stats"
                        | "current_user"
                )
            })
            .cloned()
            .collect()
    }

    async fn record(&self, name: &'static str, ids: &[i64], arg: impl Into<String>) {
        self.calls.lock().await.push(Call {
            name,
            ids: ids.to_vec(),
            arg: arg.into(),
        });
    }

    async fn next_response(&self) -> Result<OperationResult, ApiError> {
        self.responses.lock().await.pop_front().unwrap_or_else(|| {
            Ok(OperationResult {
                message: Some("ok".into()),
                ..Default::default()
            })
        })
    }

    async fn load_guard(&self) -> Result<(), ApiError> {
        match self.load_failure.lock().await.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CourseApi for RecordingApi {
    async fn get_all_courses_admin(&self) -> Result<Vec<Course>, ApiError> {
        self.record("get_all_courses_admin", &[], "").await;
        self.load_guard().await?;
        Ok(self.courses.lock().await.clone())
    }

    async fn get_inactive_courses_admin(&self) -> Result<Vec<Course>, ApiError> {
        self.record("get_inactive_courses_admin", &[], "").await;
        self.load_guard().await?;
        let courses = self.courses.lock().await;
        Ok(courses.iter().filter(|c| !c.is_active).cloned().collect())
    }

    async fn get_admin_metrics(&self) -> Result<AdminMetrics, ApiError> {
        self.record("get_admin_metrics", &[], "").await;
        self.load_guard().await?;
        let courses = self.courses.lock().await;
        Ok(AdminMetrics {
            total_courses: courses.len() as u64,
            active_courses: courses.iter().filter(|c| c.is_active).count() as u64,
            ..Default::default()
        })
    }

    async fn get_instructor_stats(&self) -> Result<Vec<InstructorStats>, ApiError> {
        self.record("get_instructor_stats", &[], "").await;
        self.load_guard().await?;
        Ok(Vec::new())
    }

    async fn get_course(&self, course_id: i64) -> Result<Course, ApiError> {
        self.record("get_course", &[course_id], "").await;
        self.courses
            .lock()
            .await
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or(ApiError::Http {
                status: 404,
                message: "No encontrado.".into(),
            })
    }

    async fn current_user(&self) -> Result<AdminUser, ApiError> {
        self.record("current_user", &[], "").await;
        Ok(admin_user())
    }

    async fn list_instructors(&self) -> Result<Vec<Instructor>, ApiError> {
        self.record("list_instructors", &[], "").await;
        Ok(Vec::new())
    }

    async fn create_course(&self, draft: &CourseDraft) -> Result<Course, ApiError> {
        self.record("create_course", &[], draft.title.clone()).await;
        self.next_response().await?;
        let mut courses = self.courses.lock().await;
        let course = Course {
            id: 100 + courses.len() as i64,
            title: draft.title.clone(),
            description: draft.description.clone(),
            instructor: draft.instructor_id,
            is_active: draft.is_active,
            ..Default::default()
        };
        courses.push(course.clone());
        Ok(course)
    }

    async fn update_course(&self, course_id: i64, draft: &CourseDraft) -> Result<Course, ApiError> {
        self.record("update_course", &[course_id], draft.title.clone()).await;
        self.next_response().await?;
        Ok(Course {
            id: course_id,
            title: draft.title.clone(),
            ..Default::default()
        })
    }

    async fn activate_course(&self, course_id: i64, reason: &str) -> Result<OperationResult, ApiError> {
        self.record("activate_course", &[course_id], reason).await;
        self.next_response().await
    }

    async fn deactivate_course(
        &self,
        course_id: i64,
        reason: &str,
    ) -> Result<OperationResult, ApiError> {
        self.record("deactivate_course", &[course_id], reason).await;
        self.next_response().await
    }

    async fn delete_course_admin(
        &self,
        course_id: i64,
        reason: &str,
    ) -> Result<OperationResult, ApiError> {
        self.record("delete_course_admin", &[course_id], reason).await;
        self.next_response().await
    }

    async fn transfer_course(
        &self,
        course_id: i64,
        new_instructor_id: i64,
        reason: &str,
    ) -> Result<OperationResult, ApiError> {
        self.record(
            "transfer_course",
            &[course_id],
            format!("{new_instructor_id}:{reason}"),
        )
        .await;
        self.next_response().await
    }

    async fn change_course_state(
        &self,
        course_id: i64,
        state: CourseState,
        reason: &str,
    ) -> Result<OperationResult, ApiError> {
        self.record("change_course_state", &[course_id], format!("{state}:{reason}"))
            .await;
        self.next_response().await
    }

    async fn copy_course_content(
        &self,
        source_id: i64,
        target_id: i64,
        include_enrollments: bool,
    ) -> Result<OperationResult, ApiError> {
        self.record(
            "copy_course_content",
            &[source_id, target_id],
            include_enrollments.to_string(),
        )
        .await;
        self.next_response().await
    }

    async fn bulk_operation(
        &self,
        action: &BulkAction,
        course_ids: &[i64],
        reason: &str,
    ) -> Result<OperationResult, ApiError> {
        self.record("bulk_operation", course_ids, format!("{}|{reason}", action.path()))
            .await;
        self.next_response().await
    }
}

pub fn admin_user() -> AdminUser {
    AdminUser {
        id: 1,
        username: "admin".into(),
        is_superuser: true,
        permissions: Vec::new(),
    }
}

pub fn course(id: i64, title: &str, active: bool) -> Course {
    Course {
        id,
        title: title.into(),
        description: format!("Curso de {title} para personal de archivo"),
        instructor: Some(7),
        instructor_name: Some("Ana Ruiz".into()),
        is_active: active,
        enrolled_students_count: id as u32,
        ..Default::default()
    }
}

pub fn sample_courses() -> Vec<Course> {
    vec![
        course(1, "Archivística básica", true),
        course(2, "Conservación preventiva", true),
        course(3, "Digitalización de fondos", true),
        course(4, "Paleografía", false),
    ]
}

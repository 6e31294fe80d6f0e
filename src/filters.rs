//! Client-side filter, sort and pagination over fetched course lists.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;
use tokio::time::Instant;

use crate::model::{Course, Modality};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Title,
    CreatedAt,
    StartDate,
    Students,
    Price,
    Instructor,
}

impl SortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Some(SortField::Title),
            "created_at" | "created" => Some(SortField::CreatedAt),
            "start_date" | "start" => Some(SortField::StartDate),
            "students" | "enrolled" => Some(SortField::Students),
            "price" => Some(SortField::Price),
            "instructor" => Some(SortField::Instructor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Filter and sort state of the course list. All filters are optional; an
/// empty value means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseFilters {
    pub search: String,
    pub modality: Option<Modality>,
    pub status: Option<StatusFilter>,
    pub instructor: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub students_min: Option<u32>,
    pub students_max: Option<u32>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl CourseFilters {
    /// Number of set filters shown on the filter badge. Search and sort do
    /// not count.
    pub fn active_count(&self) -> usize {
        [
            self.modality.is_some(),
            self.status.is_some(),
            !self.instructor.trim().is_empty(),
            self.date_from.is_some(),
            self.date_to.is_some(),
            self.students_min.is_some(),
            self.students_max.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.active_count() == 0
    }

    pub fn matches(&self, course: &Course) -> bool {
        let search = self.search.trim().to_lowercase();
        if !search.is_empty() {
            let hit = course.title.to_lowercase().contains(&search)
                || course.description.to_lowercase().contains(&search)
                || course.instructor_label().to_lowercase().contains(&search);
            if !hit {
                return false;
            }
        }
        if let Some(modality) = self.modality {
            if course.modality != Some(modality) {
                return false;
            }
        }
        match self.status {
            Some(StatusFilter::Active) if !course.is_active => return false,
            Some(StatusFilter::Inactive) if course.is_active => return false,
            _ => {}
        }
        let instructor = self.instructor.trim().to_lowercase();
        if !instructor.is_empty()
            && !course.instructor_label().to_lowercase().contains(&instructor)
        {
            return false;
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(created) = course.created_at.map(|t| t.date_naive()) else {
                return false;
            };
            if self.date_from.is_some_and(|from| created < from) {
                return false;
            }
            if self.date_to.is_some_and(|to| created > to) {
                return false;
            }
        }
        let students = course.enrolled_students_count;
        if self.students_min.is_some_and(|min| students < min) {
            return false;
        }
        if self.students_max.is_some_and(|max| students > max) {
            return false;
        }
        true
    }

    /// Filter then sort. The sort is stable so equal keys keep server order.
    pub fn apply(&self, courses: &[Course]) -> Vec<Course> {
        let mut out: Vec<Course> = courses.iter().filter(|c| self.matches(c)).cloned().collect();
        out.sort_by(|a, b| {
            let ord = compare(a, b, self.sort_by);
            match self.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        out
    }
}

fn compare(a: &Course, b: &Course, field: SortField) -> Ordering {
    match field {
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::StartDate => a.start_date.cmp(&b.start_date),
        SortField::Students => a.enrolled_students_count.cmp(&b.enrolled_students_count),
        SortField::Price => a
            .price
            .unwrap_or(0.0)
            .partial_cmp(&b.price.unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        SortField::Instructor => a
            .instructor_label()
            .to_lowercase()
            .cmp(&b.instructor_label().to_lowercase()),
    }
}

pub fn total_pages(total: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page)
}

/// Slice for a 1-based page. Out-of-range pages are empty.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    if page == 0 || per_page == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(per_page);
    if start >= items.len() {
        return &[];
    }
    let end = (start + per_page).min(items.len());
    &items[start..end]
}

/// Holds the most recent value until it has been quiet for `delay`.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending value and restart the quiet period.
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now()));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending value once its quiet period has elapsed.
    pub fn poll(&mut self) -> Option<T> {
        match &self.pending {
            Some((_, at)) if at.elapsed() >= self.delay => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    /// Wait out the remaining quiet period and return the value.
    pub async fn settle(&mut self) -> Option<T> {
        let (_, at) = self.pending.as_ref()?;
        tokio::time::sleep_until(*at + self.delay).await;
        self.pending.take().map(|(v, _)| v)
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn course(id: i64, title: &str, instructor: &str, students: u32, active: bool) -> Course {
        Course {
            id,
            title: title.into(),
            description: format!("Descripción de {title}"),
            instructor_name: Some(instructor.into()),
            enrolled_students_count: students,
            is_active: active,
            ..Default::default()
        }
    }

    fn sample() -> Vec<Course> {
        let mut a = course(1, "Archivística básica", "Ana Ruiz", 30, true);
        a.modality = Some(Modality::Online);
        a.created_at = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).single();
        let mut b = course(2, "Conservación preventiva", "Luis Peña", 5, false);
        b.modality = Some(Modality::Presencial);
        b.created_at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single();
        let mut c = course(3, "Digitalización", "Ana Ruiz", 12, true);
        c.modality = Some(Modality::Hibrido);
        vec![b, c, a]
    }

    #[test]
    fn default_filters_sort_by_title() {
        let out = CourseFilters::default().apply(&sample());
        let ids: Vec<i64> = out.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn search_matches_instructor_case_insensitively() {
        let filters = CourseFilters {
            search: "ANA".into(),
            sort_by: SortField::Students,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        let ids: Vec<i64> = filters.apply(&sample()).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn combined_filters() {
        let filters = CourseFilters {
            status: Some(StatusFilter::Active),
            students_min: Some(10),
            students_max: Some(20),
            ..Default::default()
        };
        let out = filters.apply(&sample());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 3);
        assert_eq!(filters.active_count(), 3);
    }

    #[test]
    fn date_range_excludes_courses_without_timestamp() {
        let filters = CourseFilters {
            date_from: NaiveDate::from_ymd_opt(2026, 2, 1),
            ..Default::default()
        };
        let out = filters.apply(&sample());
        assert_eq!(out.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn active_count_ignores_search_and_sort() {
        let filters = CourseFilters {
            search: "x".into(),
            sort_by: SortField::Price,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        assert_eq!(filters.active_count(), 0);
        assert!(!filters.is_empty());
    }

    #[test]
    fn pagination_bounds() {
        let items: Vec<u32> = (1..=25).collect();
        assert_eq!(total_pages(items.len(), 12), 3);
        assert_eq!(paginate(&items, 1, 12).len(), 12);
        assert_eq!(paginate(&items, 3, 12), &[25]);
        assert!(paginate(&items, 4, 12).is_empty());
        assert!(paginate(&items, 0, 12).is_empty());
        assert_eq!(total_pages(0, 12), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_yields_latest_after_quiet_period() {
        let mut d = Debouncer::default();
        d.push("ar");
        tokio::time::advance(Duration::from_millis(200)).await;
        d.push("arch");
        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(d.poll(), None);
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(d.poll(), Some("arch"));
        assert!(!d.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn settle_waits_for_remaining_delay() {
        let mut d = Debouncer::new(Duration::from_millis(300));
        d.push(7);
        assert_eq!(d.settle().await, Some(7));
        assert_eq!(d.settle().await, None);
    }
}

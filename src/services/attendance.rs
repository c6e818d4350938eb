use crate::{
    calendar::Month,
    db::{db_err, with_transaction, DbPool},
    entities::{
        attendance::{self, AttendanceStatus, Entity as AttendanceEntity, Model as AttendanceModel},
        schedule::{self, ScheduleKind},
    },
    errors::ServiceError,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct MarkAttendanceRequest {
    pub schedule_id: Uuid,
    pub student_id: Uuid,
    /// Defaults to the schedule's own date
    pub attendance_date: Option<NaiveDate>,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BulkAttendanceRequest {
    #[validate(length(min = 1, max = 500, message = "between 1 and 500 marks per batch"))]
    pub items: Vec<MarkAttendanceRequest>,
}

/// An attendance mark joined with the lesson it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub student_id: Uuid,
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    pub marked_by: Option<String>,
    pub kind: Option<ScheduleKind>,
    pub course_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    pub room: Option<String>,
    pub title: Option<String>,
}

impl AttendanceRecord {
    fn from_pair(mark: AttendanceModel, lesson: Option<schedule::Model>) -> Self {
        Self {
            id: mark.id,
            schedule_id: mark.schedule_id,
            student_id: mark.student_id,
            attendance_date: mark.attendance_date,
            status: mark.status,
            marked_by: mark.marked_by,
            kind: lesson.as_ref().map(|s| s.kind),
            course_id: lesson.as_ref().and_then(|s| s.course_id),
            teacher_id: lesson.as_ref().and_then(|s| s.teacher_id),
            start_time: lesson.as_ref().map(|s| s.start_time),
            end_time: lesson.as_ref().map(|s| s.end_time),
            room: lesson.as_ref().and_then(|s| s.room.clone()),
            title: lesson.and_then(|s| s.title),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceCounts {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub cancelled: usize,
    pub today: usize,
    pub this_month: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceOverview {
    pub records: Vec<AttendanceRecord>,
    pub counts: AttendanceCounts,
    /// Status keyed by `"{schedule_id}_{date}"`
    pub status_map: BTreeMap<String, AttendanceStatus>,
}

pub fn status_key(schedule_id: Uuid, date: NaiveDate) -> String {
    format!("{}_{}", schedule_id, date.format("%Y-%m-%d"))
}

/// Tallies marks relative to the studio's `today`.
pub fn summarize(records: Vec<AttendanceRecord>, today: NaiveDate) -> AttendanceOverview {
    let month = Month::of(today);
    let mut counts = AttendanceCounts {
        total: records.len(),
        ..Default::default()
    };
    let mut status_map = BTreeMap::new();

    for record in &records {
        match record.status {
            AttendanceStatus::Present => counts.present += 1,
            AttendanceStatus::Absent => counts.absent += 1,
            AttendanceStatus::Cancelled => counts.cancelled += 1,
        }
        if record.attendance_date == today {
            counts.today += 1;
        }
        if month.contains(record.attendance_date) {
            counts.this_month += 1;
        }
        status_map.insert(
            status_key(record.schedule_id, record.attendance_date),
            record.status,
        );
    }

    AttendanceOverview {
        records,
        counts,
        status_map,
    }
}

/// Inserts or overwrites the mark for (schedule, date, student).
async fn upsert_mark<C: ConnectionTrait>(
    conn: &C,
    item: MarkAttendanceRequest,
    marked_by: Option<String>,
) -> Result<AttendanceModel, ServiceError> {
    let lesson = schedule::Entity::find_by_id(item.schedule_id)
        .one(conn)
        .await
        .map_err(db_err("load schedule"))?
        .ok_or_else(|| ServiceError::not_found("schedule", item.schedule_id))?;
    let date = item.attendance_date.unwrap_or(lesson.specific_date);

    let existing = AttendanceEntity::find()
        .filter(attendance::Column::ScheduleId.eq(item.schedule_id))
        .filter(attendance::Column::AttendanceDate.eq(date))
        .filter(attendance::Column::StudentId.eq(item.student_id))
        .one(conn)
        .await
        .map_err(db_err("load attendance"))?;

    let now = Utc::now();
    let saved = match existing {
        Some(mark) => {
            debug!(attendance_id = %mark.id, from = %mark.status, to = %item.status, "overwriting attendance mark");
            let mut active: attendance::ActiveModel = mark.into();
            active.status = Set(item.status);
            active.marked_by = Set(marked_by);
            active.updated_at = Set(now);
            active.update(conn).await.map_err(db_err("update attendance"))?
        }
        None => attendance::ActiveModel {
            id: Set(Uuid::new_v4()),
            schedule_id: Set(item.schedule_id),
            student_id: Set(item.student_id),
            attendance_date: Set(date),
            status: Set(item.status),
            marked_by: Set(marked_by),
            updated_at: Set(now),
        }
        .insert(conn)
        .await
        .map_err(db_err("insert attendance"))?,
    };
    Ok(saved)
}

#[derive(Clone)]
pub struct AttendanceService {
    db_pool: Arc<DbPool>,
}

impl AttendanceService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(schedule_id = %request.schedule_id, student_id = %request.student_id, status = %request.status))]
    pub async fn mark(
        &self,
        request: MarkAttendanceRequest,
        marked_by: Option<String>,
    ) -> Result<AttendanceModel, ServiceError> {
        // find-then-write must be atomic
        let saved = with_transaction(&self.db_pool, "mark_attendance", move |txn| {
            Box::pin(async move { upsert_mark(txn, request, marked_by).await })
        })
        .await?;
        info!(attendance_id = %saved.id, "attendance marked");
        counter!("atelier.attendance.marked", 1, "mode" => "single");
        Ok(saved)
    }

    /// Applies every mark or none of them.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn mark_bulk(
        &self,
        request: BulkAttendanceRequest,
        marked_by: Option<String>,
    ) -> Result<Vec<AttendanceModel>, ServiceError> {
        request.validate()?;

        let saved = with_transaction(&self.db_pool, "mark_attendance_bulk", move |txn| {
            Box::pin(async move {
                let mut saved = Vec::with_capacity(request.items.len());
                for item in request.items {
                    saved.push(upsert_mark(txn, item, marked_by.clone()).await?);
                }
                Ok(saved)
            })
        })
        .await?;

        info!(count = saved.len(), "attendance batch applied");
        counter!("atelier.attendance.marked", saved.len() as u64, "mode" => "bulk");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn get_by_student(
        &self,
        student_id: Uuid,
        today: NaiveDate,
    ) -> Result<AttendanceOverview, ServiceError> {
        let rows = AttendanceEntity::find()
            .find_also_related(schedule::Entity)
            .filter(attendance::Column::StudentId.eq(student_id))
            .order_by_desc(attendance::Column::AttendanceDate)
            .all(&*self.db_pool)
            .await
            .map_err(db_err("load student attendance"))?;

        let records = rows
            .into_iter()
            .map(|(mark, lesson)| AttendanceRecord::from_pair(mark, lesson))
            .collect();
        Ok(summarize(records, today))
    }

    #[instrument(skip(self))]
    pub async fn get_by_teacher(
        &self,
        teacher_id: Uuid,
        today: NaiveDate,
    ) -> Result<AttendanceOverview, ServiceError> {
        let rows = AttendanceEntity::find()
            .find_also_related(schedule::Entity)
            .filter(schedule::Column::TeacherId.eq(teacher_id))
            .order_by_desc(attendance::Column::AttendanceDate)
            .all(&*self.db_pool)
            .await
            .map_err(db_err("load teacher attendance"))?;

        let records = rows
            .into_iter()
            .map(|(mark, lesson)| AttendanceRecord::from_pair(mark, lesson))
            .collect();
        Ok(summarize(records, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(schedule_id: Uuid, day: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            schedule_id,
            student_id: Uuid::nil(),
            attendance_date: day,
            status,
            marked_by: None,
            kind: Some(ScheduleKind::RegularLesson),
            course_id: None,
            teacher_id: None,
            start_time: None,
            end_time: None,
            room: None,
            title: None,
        }
    }

    #[test]
    fn counts_split_by_status_and_period() {
        let lesson = Uuid::new_v4();
        let today = date(2026, 10, 18);
        let overview = summarize(
            vec![
                record(lesson, today, AttendanceStatus::Present),
                record(lesson, date(2026, 10, 11), AttendanceStatus::Absent),
                record(lesson, date(2026, 9, 27), AttendanceStatus::Present),
                record(lesson, date(2026, 10, 4), AttendanceStatus::Cancelled),
            ],
            today,
        );

        assert_eq!(
            overview.counts,
            AttendanceCounts {
                total: 4,
                present: 2,
                absent: 1,
                cancelled: 1,
                today: 1,
                this_month: 3,
            }
        );
        assert_eq!(overview.status_map.len(), 4);
        assert_eq!(
            overview.status_map.get(&status_key(lesson, today)),
            Some(&AttendanceStatus::Present)
        );
    }

    #[test]
    fn status_key_uses_iso_date() {
        let id = Uuid::parse_str("6f1c2d3e-0000-4000-8000-000000000001").unwrap();
        assert_eq!(
            status_key(id, date(2026, 3, 9)),
            "6f1c2d3e-0000-4000-8000-000000000001_2026-03-09"
        );
    }

    mod marked_counter {
        use super::*;
        use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
        use crate::services::schedules::{CreateScheduleRequest, ScheduleDetails, ScheduleService};
        use metrics::{
            Counter, CounterFn, Gauge, Histogram, Key, KeyName, Recorder, SharedString, Unit,
        };
        use std::sync::atomic::{AtomicU64, Ordering};

        struct Tally(Arc<AtomicU64>);

        impl CounterFn for Tally {
            fn increment(&self, value: u64) {
                self.0.fetch_add(value, Ordering::SeqCst);
            }

            fn absolute(&self, value: u64) {
                self.0.fetch_max(value, Ordering::SeqCst);
            }
        }

        /// Counts `atelier.attendance.marked{mode="single"}` and drops everything else.
        struct SingleMarks(Arc<AtomicU64>);

        impl Recorder for SingleMarks {
            fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
            fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
            fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

            fn register_counter(&self, key: &Key) -> Counter {
                let single = key.name() == "atelier.attendance.marked"
                    && key
                        .labels()
                        .any(|label| label.key() == "mode" && label.value() == "single");
                if single {
                    Counter::from_arc(Arc::new(Tally(self.0.clone())))
                } else {
                    Counter::noop()
                }
            }

            fn register_gauge(&self, _: &Key) -> Gauge {
                Gauge::noop()
            }

            fn register_histogram(&self, _: &Key) -> Histogram {
                Histogram::noop()
            }
        }

        #[tokio::test]
        async fn single_marks_are_counted() {
            let marks = Arc::new(AtomicU64::new(0));
            metrics::set_boxed_recorder(Box::new(SingleMarks(marks.clone())))
                .expect("no other recorder in this test binary");

            let pool = establish_connection_with_config(&DbConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
                min_connections: 1,
                ..Default::default()
            })
            .await
            .expect("sqlite memory pool");
            run_migrations(&pool).await.expect("migrations");
            let pool = Arc::new(pool);

            let created = ScheduleService::new(pool.clone())
                .create_appointment(CreateScheduleRequest {
                    specific_date: date(2030, 3, 4),
                    start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                    teacher_id: None,
                    room: None,
                    details: ScheduleDetails::Appointment {
                        title: "Portfolio review".into(),
                        contact_name: None,
                        contact_phone: None,
                        notes: None,
                    },
                })
                .await
                .unwrap();
            let schedule_id = created.schedules[0].id;

            let service = AttendanceService::new(pool);
            let student_id = Uuid::new_v4();
            for status in [AttendanceStatus::Present, AttendanceStatus::Absent] {
                service
                    .mark(
                        MarkAttendanceRequest {
                            schedule_id,
                            student_id,
                            attendance_date: None,
                            status,
                        },
                        None,
                    )
                    .await
                    .unwrap();
            }

            assert_eq!(marks.load(Ordering::SeqCst), 2);
        }
    }
}

use crate::{
    calendar::DayOfWeek,
    db::{db_err, with_transaction, DbPool},
    entities::{
        attendance,
        event::{self, EventStatus},
        schedule::{self, Entity as ScheduleEntity, Model as ScheduleModel, ScheduleKind},
    },
    errors::ServiceError,
    money,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const MAX_RECURRING_RANGE_DAYS: i64 = 366;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ExpandRecurringRequest {
    pub course_id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Option<Uuid>,
    pub day_of_week: DayOfWeek,
    #[schema(value_type = String, example = "14:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "15:30:00")]
    pub end_time: NaiveTime,
    #[validate(length(max = 100))]
    pub room: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// What a one-off calendar entry is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleDetails {
    Appointment {
        title: String,
        contact_name: Option<String>,
        contact_phone: Option<String>,
        notes: Option<String>,
    },
    Workshop {
        title: String,
        course_id: Option<Uuid>,
        #[schema(value_type = Option<String>)]
        price: Option<Decimal>,
    },
    Event {
        event_id: Uuid,
    },
    RegularLesson {
        course_id: Uuid,
        student_id: Option<Uuid>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateScheduleRequest {
    pub specific_date: NaiveDate,
    #[schema(value_type = String, example = "10:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "11:00:00")]
    pub end_time: NaiveTime,
    pub teacher_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub room: Option<String>,
    pub details: ScheduleDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ScheduleFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub teacher_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
}

/// Rows written by a create call, plus existing rows they collide with.
///
/// Overlaps are advisory; the rows are saved regardless.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleCreated {
    #[schema(value_type = Vec<crate::entities::schedule::Model>)]
    pub schedules: Vec<ScheduleModel>,
    pub conflicts: Vec<Uuid>,
}

/// Every date in `[start, end]` that falls on `day`.
pub fn recurring_dates(day: DayOfWeek, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if end < start {
        return Vec::new();
    }
    let target = day.weekday().num_days_from_monday() as i64;
    let first = start.weekday().num_days_from_monday() as i64;
    let offset = (target - first).rem_euclid(7);

    let mut dates = Vec::new();
    let mut current = start + Duration::days(offset);
    while current <= end {
        dates.push(current);
        current += Duration::days(7);
    }
    dates
}

fn same_room(a: &ScheduleModel, b: &ScheduleModel) -> bool {
    match (a.room.as_deref(), b.room.as_deref()) {
        (Some(x), Some(y)) => x.trim().eq_ignore_ascii_case(y.trim()),
        _ => false,
    }
}

fn same_teacher(a: &ScheduleModel, b: &ScheduleModel) -> bool {
    matches!((a.teacher_id, b.teacher_id), (Some(x), Some(y)) if x == y)
}

/// Ids of `existing` rows that overlap a candidate in the same room or with the same teacher.
pub fn find_conflicts(candidates: &[ScheduleModel], existing: &[ScheduleModel]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = existing
        .iter()
        .filter(|other| {
            candidates.iter().any(|candidate| {
                candidate.id != other.id
                    && candidate.overlaps(other)
                    && (same_room(candidate, other) || same_teacher(candidate, other))
            })
        })
        .map(|other| other.id)
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

fn validate_times(start: NaiveTime, end: NaiveTime) -> Result<(), ServiceError> {
    if start >= end {
        return Err(ServiceError::ValidationError(
            "start_time must be before end_time".into(),
        ));
    }
    Ok(())
}

fn required_title(title: &str) -> Result<String, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::ValidationError("title is required".into()));
    }
    Ok(title.to_string())
}

fn blank_schedule(date: NaiveDate, start: NaiveTime, end: NaiveTime, kind: ScheduleKind) -> ScheduleModel {
    ScheduleModel {
        id: Uuid::new_v4(),
        kind,
        course_id: None,
        teacher_id: None,
        student_id: None,
        event_id: None,
        specific_date: date,
        day_of_week: DayOfWeek::of(date),
        start_time: start,
        end_time: end,
        room: None,
        title: None,
        contact_name: None,
        contact_phone: None,
        notes: None,
        price: None,
        created_at: Utc::now(),
    }
}

async fn schedules_between<C: ConnectionTrait>(
    conn: &C,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ScheduleModel>, ServiceError> {
    ScheduleEntity::find()
        .filter(schedule::Column::SpecificDate.between(from, to))
        .all(conn)
        .await
        .map_err(db_err("load schedules in range"))
}

async fn insert_all<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<ScheduleModel>,
) -> Result<Vec<ScheduleModel>, ServiceError> {
    let mut saved = Vec::with_capacity(rows.len());
    for row in rows {
        let model = schedule::ActiveModel {
            id: Set(row.id),
            kind: Set(row.kind),
            course_id: Set(row.course_id),
            teacher_id: Set(row.teacher_id),
            student_id: Set(row.student_id),
            event_id: Set(row.event_id),
            specific_date: Set(row.specific_date),
            day_of_week: Set(row.day_of_week),
            start_time: Set(row.start_time),
            end_time: Set(row.end_time),
            room: Set(row.room),
            title: Set(row.title),
            contact_name: Set(row.contact_name),
            contact_phone: Set(row.contact_phone),
            notes: Set(row.notes),
            price: Set(row.price),
            created_at: Set(row.created_at),
        }
        .insert(conn)
        .await
        .map_err(db_err("insert schedule"))?;
        saved.push(model);
    }
    Ok(saved)
}

#[derive(Clone)]
pub struct ScheduleService {
    db_pool: Arc<DbPool>,
}

impl ScheduleService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Expands a weekly lesson into one dated row per matching day in the range.
    #[instrument(skip(self, request), fields(course_id = %request.course_id, teacher_id = %request.teacher_id, day = %request.day_of_week))]
    pub async fn expand_recurring(
        &self,
        request: ExpandRecurringRequest,
    ) -> Result<ScheduleCreated, ServiceError> {
        request.validate()?;
        validate_times(request.start_time, request.end_time)?;
        if request.end_date < request.start_date {
            return Err(ServiceError::ValidationError(
                "end_date must not be before start_date".into(),
            ));
        }
        if (request.end_date - request.start_date).num_days() > MAX_RECURRING_RANGE_DAYS {
            return Err(ServiceError::ValidationError(format!(
                "date range may span at most {} days",
                MAX_RECURRING_RANGE_DAYS
            )));
        }

        let room = request
            .room
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        let rows: Vec<ScheduleModel> =
            recurring_dates(request.day_of_week, request.start_date, request.end_date)
                .into_iter()
                .map(|date| ScheduleModel {
                    course_id: Some(request.course_id),
                    teacher_id: Some(request.teacher_id),
                    student_id: request.student_id,
                    room: room.clone(),
                    ..blank_schedule(
                        date,
                        request.start_time,
                        request.end_time,
                        ScheduleKind::RegularLesson,
                    )
                })
                .collect();

        if rows.is_empty() {
            info!("no matching weekdays in range; nothing to create");
            return Ok(ScheduleCreated {
                schedules: Vec::new(),
                conflicts: Vec::new(),
            });
        }

        let (from, to) = (request.start_date, request.end_date);
        let created = with_transaction(&self.db_pool, "expand_recurring", move |txn| {
            Box::pin(async move {
                let existing = schedules_between(txn, from, to).await?;
                let conflicts = find_conflicts(&rows, &existing);
                let schedules = insert_all(txn, rows).await?;
                Ok(ScheduleCreated {
                    schedules,
                    conflicts,
                })
            })
        })
        .await?;

        if !created.conflicts.is_empty() {
            warn!(conflicts = created.conflicts.len(), "recurring lessons overlap existing schedules");
        }
        info!(count = created.schedules.len(), "recurring lessons created");
        Ok(created)
    }

    /// Creates a single dated entry: an appointment, workshop, event session or lesson.
    #[instrument(skip(self, request), fields(date = %request.specific_date))]
    pub async fn create_appointment(
        &self,
        request: CreateScheduleRequest,
    ) -> Result<ScheduleCreated, ServiceError> {
        request.validate()?;
        validate_times(request.start_time, request.end_time)?;

        let db = &*self.db_pool;
        let base = ScheduleModel {
            teacher_id: request.teacher_id,
            room: request
                .room
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            ..blank_schedule(
                request.specific_date,
                request.start_time,
                request.end_time,
                ScheduleKind::Appointment,
            )
        };

        let row = match request.details {
            ScheduleDetails::Appointment {
                title,
                contact_name,
                contact_phone,
                notes,
            } => ScheduleModel {
                kind: ScheduleKind::Appointment,
                title: Some(required_title(&title)?),
                contact_name,
                contact_phone,
                notes,
                ..base
            },
            ScheduleDetails::Workshop {
                title,
                course_id,
                price,
            } => {
                let price = price
                    .map(|p| money::non_negative_amount(p, "price"))
                    .transpose()?;
                ScheduleModel {
                    kind: ScheduleKind::Workshop,
                    title: Some(required_title(&title)?),
                    course_id,
                    price,
                    ..base
                }
            }
            ScheduleDetails::Event { event_id } => {
                let event = event::Entity::find_by_id(event_id)
                    .one(db)
                    .await
                    .map_err(db_err("load event"))?
                    .ok_or_else(|| ServiceError::not_found("event", event_id))?;
                if event.status == EventStatus::Cancelled {
                    return Err(ServiceError::InvalidOperation(format!(
                        "event {} is cancelled",
                        event_id
                    )));
                }
                ScheduleModel {
                    kind: ScheduleKind::Event,
                    event_id: Some(event_id),
                    title: Some(event.name),
                    price: Some(event.price),
                    ..base
                }
            }
            ScheduleDetails::RegularLesson {
                course_id,
                student_id,
            } => ScheduleModel {
                kind: ScheduleKind::RegularLesson,
                course_id: Some(course_id),
                student_id,
                ..base
            },
        };

        let date = row.specific_date;
        let existing = schedules_between(db, date, date).await?;
        let conflicts = find_conflicts(std::slice::from_ref(&row), &existing);
        let schedules = insert_all(db, vec![row]).await?;

        if !conflicts.is_empty() {
            warn!(conflicts = conflicts.len(), "schedule overlaps existing entries");
        }
        info!(schedule_id = %schedules[0].id, kind = %schedules[0].kind, "schedule created");
        Ok(ScheduleCreated {
            schedules,
            conflicts,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_schedule(&self, schedule_id: Uuid) -> Result<ScheduleModel, ServiceError> {
        ScheduleEntity::find_by_id(schedule_id)
            .one(&*self.db_pool)
            .await
            .map_err(db_err("load schedule"))?
            .ok_or_else(|| ServiceError::not_found("schedule", schedule_id))
    }

    #[instrument(skip(self))]
    pub async fn list_schedules(
        &self,
        filter: ScheduleFilter,
    ) -> Result<Vec<ScheduleModel>, ServiceError> {
        let mut query = ScheduleEntity::find();
        if let Some(from) = filter.from {
            query = query.filter(schedule::Column::SpecificDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(schedule::Column::SpecificDate.lte(to));
        }
        if let Some(teacher_id) = filter.teacher_id {
            query = query.filter(schedule::Column::TeacherId.eq(teacher_id));
        }
        if let Some(student_id) = filter.student_id {
            query = query.filter(schedule::Column::StudentId.eq(student_id));
        }
        if let Some(course_id) = filter.course_id {
            query = query.filter(schedule::Column::CourseId.eq(course_id));
        }

        query
            .order_by_asc(schedule::Column::SpecificDate)
            .order_by_asc(schedule::Column::StartTime)
            .all(&*self.db_pool)
            .await
            .map_err(db_err("list schedules"))
    }

    /// Removes a schedule row together with its attendance marks.
    #[instrument(skip(self))]
    pub async fn delete_schedule(&self, schedule_id: Uuid) -> Result<(), ServiceError> {
        let removed = with_transaction(&self.db_pool, "delete_schedule", move |txn| {
            Box::pin(async move {
                ScheduleEntity::find_by_id(schedule_id)
                    .one(txn)
                    .await
                    .map_err(db_err("load schedule"))?
                    .ok_or_else(|| ServiceError::not_found("schedule", schedule_id))?;

                let marks = attendance::Entity::delete_many()
                    .filter(attendance::Column::ScheduleId.eq(schedule_id))
                    .exec(txn)
                    .await
                    .map_err(db_err("delete attendance for schedule"))?;

                ScheduleEntity::delete_by_id(schedule_id)
                    .exec(txn)
                    .await
                    .map_err(db_err("delete schedule"))?;

                Ok(marks.rows_affected)
            })
        })
        .await?;

        info!(schedule_id = %schedule_id, attendance_removed = removed, "schedule deleted");
        Ok(())
    }
}

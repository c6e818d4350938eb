use crate::{
    calendar::{lesson_hours, Month},
    db::{db_err, with_transaction, DbPool},
    entities::{
        attendance::{self, AttendanceStatus},
        payment::PaymentMethod,
        schedule,
        teacher_payment::{
            self, Entity as TeacherPaymentEntity, Model as TeacherPaymentModel,
            TeacherPaymentStatus,
        },
        teacher_payment_record,
    },
    errors::ServiceError,
    money,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTeacherPaymentRequest {
    pub teacher_id: Uuid,
    /// `YYYY-MM`
    #[schema(example = "2026-10")]
    pub month_year: String,
    /// Derived from attended lessons when omitted
    #[schema(value_type = Option<String>)]
    pub total_hours: Option<Decimal>,
    #[schema(value_type = String, example = "350.00")]
    pub hourly_rate: Decimal,
    #[serde(default)]
    #[schema(value_type = String)]
    pub trial_lessons_fee: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordTeacherPaymentRequest {
    pub teacher_payment_id: Uuid,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct TeacherPaymentFilter {
    /// `YYYY-MM`
    pub month_year: Option<String>,
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeacherPaymentView {
    #[schema(value_type = crate::entities::teacher_payment::Model)]
    pub payment: TeacherPaymentModel,
    #[schema(value_type = String)]
    pub remaining_amount: Decimal,
    #[schema(value_type = Vec<crate::entities::teacher_payment_record::Model>)]
    pub records: Vec<teacher_payment_record::Model>,
}

/// `hours × rate + trial fee`, rounded to kuruş.
pub fn payroll_total(hours: Decimal, rate: Decimal, trial_fee: Decimal) -> Decimal {
    money::round2(hours * rate + trial_fee)
}

/// Payroll amounts in the form they are stored: every input rounded to kuruş,
/// and the total computed from the rounded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayrollFigures {
    pub hours: Decimal,
    pub rate: Decimal,
    pub trial_fee: Decimal,
    pub total: Decimal,
}

impl PayrollFigures {
    pub fn new(hours: Decimal, rate: Decimal, trial_fee: Decimal) -> Result<Self, ServiceError> {
        let hours = money::non_negative_amount(hours, "total_hours")?;
        let rate = money::non_negative_amount(rate, "hourly_rate")?;
        let trial_fee = money::non_negative_amount(trial_fee, "trial_lessons_fee")?;
        Ok(Self {
            hours,
            rate,
            trial_fee,
            total: payroll_total(hours, rate, trial_fee),
        })
    }
}

/// Recovers the trial-lesson part of a stored total.
pub fn derived_trial_fee(total: Decimal, hours: Decimal, rate: Decimal) -> Decimal {
    money::round2(total - hours * rate)
}

fn unique_violation_to_conflict(teacher_id: Uuid, month: Month) -> impl FnOnce(DbErr) -> ServiceError {
    move |e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(format!(
            "teacher {} already has a payroll row for {}",
            teacher_id, month
        )),
        _ => db_err("insert teacher payment")(e),
    }
}

/// Hours taught by `teacher_id` in `month`, counting lessons with at least one present student.
pub async fn attended_hours<C: ConnectionTrait>(
    conn: &C,
    teacher_id: Uuid,
    month: Month,
) -> Result<Decimal, ServiceError> {
    let lessons = schedule::Entity::find()
        .filter(schedule::Column::TeacherId.eq(teacher_id))
        .filter(schedule::Column::SpecificDate.between(month.first_day(), month.last_day()))
        .all(conn)
        .await
        .map_err(db_err("load teacher schedules"))?;
    if lessons.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let ids: Vec<Uuid> = lessons.iter().map(|s| s.id).collect();
    let attended: HashSet<Uuid> = attendance::Entity::find()
        .filter(attendance::Column::ScheduleId.is_in(ids))
        .filter(attendance::Column::Status.eq(AttendanceStatus::Present))
        .all(conn)
        .await
        .map_err(db_err("load present marks"))?
        .into_iter()
        .map(|mark| mark.schedule_id)
        .collect();

    let hours: Decimal = lessons
        .iter()
        .filter(|lesson| attended.contains(&lesson.id))
        .map(|lesson| lesson_hours(lesson.start_time, lesson.end_time))
        .sum();
    Ok(money::round2(hours))
}

async fn load_payment<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<TeacherPaymentModel, ServiceError> {
    TeacherPaymentEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(db_err("load teacher payment"))?
        .ok_or_else(|| ServiceError::not_found("teacher payment", id))
}

async fn load_records<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Vec<teacher_payment_record::Model>, ServiceError> {
    teacher_payment_record::Entity::find()
        .filter(teacher_payment_record::Column::TeacherPaymentId.eq(id))
        .order_by_asc(teacher_payment_record::Column::PaymentDate)
        .order_by_asc(teacher_payment_record::Column::CreatedAt)
        .all(conn)
        .await
        .map_err(db_err("load teacher payment records"))
}

fn view(payment: TeacherPaymentModel, records: Vec<teacher_payment_record::Model>) -> TeacherPaymentView {
    TeacherPaymentView {
        remaining_amount: money::non_negative(payment.total_amount - payment.paid_amount),
        payment,
        records,
    }
}

/// Monthly teacher payroll.
#[derive(Clone)]
pub struct TeacherPaymentService {
    db_pool: Arc<DbPool>,
}

impl TeacherPaymentService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(teacher_id = %request.teacher_id, month = %request.month_year))]
    pub async fn create(
        &self,
        request: CreateTeacherPaymentRequest,
    ) -> Result<TeacherPaymentView, ServiceError> {
        request.validate()?;
        let rate = money::non_negative_amount(request.hourly_rate, "hourly_rate")?;
        let trial_fee = money::non_negative_amount(request.trial_lessons_fee, "trial_lessons_fee")?;
        let given_hours = request
            .total_hours
            .map(|h| money::non_negative_amount(h, "total_hours"))
            .transpose()?;

        let db = &*self.db_pool;
        let month: Month = request.month_year.parse()?;
        let month_key = month.to_string();

        let duplicate = TeacherPaymentEntity::find()
            .filter(teacher_payment::Column::TeacherId.eq(request.teacher_id))
            .filter(teacher_payment::Column::MonthYear.eq(month_key.clone()))
            .one(db)
            .await
            .map_err(db_err("check teacher payment"))?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "teacher {} already has a payroll row for {}",
                request.teacher_id, month
            )));
        }

        let hours = match given_hours {
            Some(hours) => hours,
            None => attended_hours(db, request.teacher_id, month).await?,
        };
        let figures = PayrollFigures::new(hours, rate, trial_fee)?;

        let now = Utc::now();
        let payment = teacher_payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            teacher_id: Set(request.teacher_id),
            month_year: Set(month_key),
            total_hours: Set(figures.hours),
            hourly_rate: Set(figures.rate),
            trial_lessons_fee: Set(figures.trial_fee),
            total_amount: Set(figures.total),
            paid_amount: Set(Decimal::ZERO),
            status: Set(TeacherPaymentStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(unique_violation_to_conflict(request.teacher_id, month))?;

        info!(teacher_payment_id = %payment.id, hours = %figures.hours, total = %figures.total, "teacher payroll created");
        Ok(view(payment, Vec::new()))
    }

    #[instrument(skip(self, request), fields(teacher_payment_id = %request.teacher_payment_id, amount = %request.amount))]
    pub async fn record_payment(
        &self,
        request: RecordTeacherPaymentRequest,
        today: NaiveDate,
    ) -> Result<TeacherPaymentView, ServiceError> {
        request.validate()?;
        let amount = money::positive_amount(request.amount, "amount")?;

        let id = request.teacher_payment_id;
        let payment_date = request.payment_date.unwrap_or(today);

        let updated = with_transaction(&self.db_pool, "record_teacher_payment", move |txn| {
            Box::pin(async move {
                let payment = load_payment(txn, id).await?;

                teacher_payment_record::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    teacher_payment_id: Set(id),
                    amount: Set(amount),
                    payment_date: Set(payment_date),
                    payment_method: Set(request.payment_method),
                    notes: Set(request.notes),
                    created_at: Set(Utc::now()),
                }
                .insert(txn)
                .await
                .map_err(db_err("insert teacher payment record"))?;

                let records = load_records(txn, id).await?;
                let paid = money::round2(records.iter().map(|r| r.amount).sum());
                let status = TeacherPaymentStatus::derive(paid, payment.total_amount);

                let mut active: teacher_payment::ActiveModel = payment.into();
                active.paid_amount = Set(paid);
                active.status = Set(status);
                active.updated_at = Set(Utc::now());
                let payment = active
                    .update(txn)
                    .await
                    .map_err(db_err("update teacher payment"))?;

                Ok(view(payment, records))
            })
        })
        .await?;

        info!(
            teacher_payment_id = %id,
            paid = %updated.payment.paid_amount,
            status = %updated.payment.status,
            "teacher payment recorded"
        );
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<TeacherPaymentView, ServiceError> {
        let db = &*self.db_pool;
        let payment = load_payment(db, id).await?;
        let records = load_records(db, id).await?;
        Ok(view(payment, records))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: TeacherPaymentFilter,
    ) -> Result<Vec<TeacherPaymentModel>, ServiceError> {
        let mut query = TeacherPaymentEntity::find();
        if let Some(raw) = filter.month_year.as_deref() {
            let month: Month = raw.parse()?;
            query = query.filter(teacher_payment::Column::MonthYear.eq(month.to_string()));
        }
        if let Some(teacher_id) = filter.teacher_id {
            query = query.filter(teacher_payment::Column::TeacherId.eq(teacher_id));
        }
        query
            .order_by_desc(teacher_payment::Column::MonthYear)
            .order_by_asc(teacher_payment::Column::TeacherId)
            .all(&*self.db_pool)
            .await
            .map_err(db_err("list teacher payments"))
    }
}

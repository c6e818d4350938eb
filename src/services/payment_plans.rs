use crate::{
    db::{db_err, with_transaction, DbPool},
    entities::{
        event::{self, EventStatus},
        payment::{self, PaymentMethod},
        payment_plan::{self, Entity as PaymentPlanEntity, Model as PaymentPlanModel, PlanStatus},
    },
    errors::ServiceError,
    money,
};
use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentPlanRequest {
    pub student_id: Uuid,
    pub course_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    #[schema(value_type = String, example = "1200.00")]
    pub total_amount: Decimal,
    #[validate(range(min = 1, max = 120, message = "installments must be between 1 and 120"))]
    pub installments: i32,
    pub start_date: NaiveDate,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentRequest {
    pub payment_plan_id: Uuid,
    #[schema(value_type = String, example = "400.00")]
    pub amount: Decimal,
    /// Defaults to the studio's current date
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CancelPlanRequest {
    #[validate(length(min = 1, max = 2000, message = "a cancellation reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PlanFilter {
    pub student_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub status: Option<PlanStatus>,
}

/// Status as shown to staff, derived from the stored status and the amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlanProgress {
    Pending,
    Partial,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Paid,
    Partial,
    Due,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Installment {
    pub number: u32,
    pub due_date: NaiveDate,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub paid: Decimal,
    #[schema(value_type = String)]
    pub remaining: Decimal,
    pub status: InstallmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanView {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub installments: i32,
    pub start_date: NaiveDate,
    #[schema(value_type = String)]
    pub paid_amount: Decimal,
    #[schema(value_type = String)]
    pub remaining_amount: Decimal,
    #[schema(value_type = String)]
    pub overpaid_amount: Decimal,
    #[schema(value_type = String)]
    pub written_off_amount: Decimal,
    pub status: PlanProgress,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub installment_schedule: Vec<Installment>,
    #[schema(value_type = Vec<crate::entities::payment::Model>)]
    pub payments: Vec<payment::Model>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordPaymentResponse {
    #[schema(value_type = crate::entities::payment::Model)]
    pub payment: payment::Model,
    pub plan: PlanView,
}

pub fn derive_progress(status: PlanStatus, total: Decimal, paid: Decimal) -> PlanProgress {
    match status {
        PlanStatus::Cancelled => PlanProgress::Cancelled,
        _ if paid >= total => PlanProgress::Completed,
        _ if paid > Decimal::ZERO => PlanProgress::Partial,
        _ => PlanProgress::Pending,
    }
}

/// Splits `total` into `count` monthly installments starting at `start_date`
/// and applies `paid` to them oldest first.
///
/// Every installment but the last is `total / count` truncated to kuruş; the
/// last one takes the remainder so the amounts always sum to `total`.
pub fn build_installments(
    total: Decimal,
    count: i32,
    start_date: NaiveDate,
    paid: Decimal,
    today: NaiveDate,
) -> Vec<Installment> {
    let count = count.max(1) as u32;
    let base = money::floor2(total / Decimal::from(count));
    let last = total - base * Decimal::from(count - 1);

    let mut unapplied = money::non_negative(paid);
    (1..=count)
        .map(|number| {
            let amount = if number == count { last } else { base };
            let applied = unapplied.min(amount).max(Decimal::ZERO);
            unapplied -= applied;
            let remaining = amount - applied;
            let due_date = crate::calendar::add_months(start_date, number - 1);

            let status = if remaining <= Decimal::ZERO {
                InstallmentStatus::Paid
            } else if due_date < today {
                InstallmentStatus::Overdue
            } else if applied > Decimal::ZERO {
                InstallmentStatus::Partial
            } else {
                InstallmentStatus::Due
            };

            Installment {
                number,
                due_date,
                amount,
                paid: applied,
                remaining,
                status,
            }
        })
        .collect()
}

pub fn sum_payments(payments: &[payment::Model]) -> Decimal {
    money::round2(payments.iter().map(|p| p.amount).sum())
}

/// Builds the staff-facing view of a plan from its row and payment trail.
pub fn plan_view(
    plan: PaymentPlanModel,
    payments: Vec<payment::Model>,
    today: NaiveDate,
) -> PlanView {
    let paid = plan.paid_amount;
    let total = plan.total_amount;
    let cancelled = plan.status == PlanStatus::Cancelled;
    let outstanding = money::non_negative(total - paid);

    PlanView {
        id: plan.id,
        student_id: plan.student_id,
        course_id: plan.course_id,
        event_id: plan.event_id,
        total_amount: total,
        installments: plan.installments,
        start_date: plan.start_date,
        paid_amount: paid,
        remaining_amount: if cancelled { Decimal::ZERO } else { outstanding },
        overpaid_amount: money::non_negative(paid - total),
        written_off_amount: if cancelled { outstanding } else { Decimal::ZERO },
        status: derive_progress(plan.status, total, paid),
        cancelled_at: plan.cancelled_at,
        cancelled_by: plan.cancelled_by,
        cancellation_reason: plan.cancellation_reason,
        notes: plan.notes,
        version: plan.version,
        created_at: plan.created_at,
        updated_at: plan.updated_at,
        installment_schedule: build_installments(
            total,
            plan.installments,
            plan.start_date,
            paid,
            today,
        ),
        payments,
    }
}

pub(crate) async fn load_plan<C: ConnectionTrait>(
    conn: &C,
    plan_id: Uuid,
) -> Result<PaymentPlanModel, ServiceError> {
    PaymentPlanEntity::find_by_id(plan_id)
        .one(conn)
        .await
        .map_err(db_err("load payment plan"))?
        .ok_or_else(|| ServiceError::not_found("payment plan", plan_id))
}

async fn load_payments<C: ConnectionTrait>(
    conn: &C,
    plan_id: Uuid,
) -> Result<Vec<payment::Model>, ServiceError> {
    payment::Entity::find()
        .filter(payment::Column::PaymentPlanId.eq(plan_id))
        .order_by_asc(payment::Column::PaymentDate)
        .order_by_asc(payment::Column::CreatedAt)
        .all(conn)
        .await
        .map_err(db_err("load payments"))
}

/// Writes `changes` only if the row still carries `expected_version`.
async fn guarded_update<C: ConnectionTrait>(
    conn: &C,
    plan_id: Uuid,
    expected_version: i32,
    mut changes: payment_plan::ActiveModel,
) -> Result<(), ServiceError> {
    changes.version = Set(expected_version + 1);
    changes.updated_at = Set(Utc::now());

    let result = PaymentPlanEntity::update_many()
        .set(changes)
        .filter(payment_plan::Column::Id.eq(plan_id))
        .filter(payment_plan::Column::Version.eq(expected_version))
        .exec(conn)
        .await
        .map_err(db_err("update payment plan"))?;

    if result.rows_affected == 0 {
        warn!(plan_id = %plan_id, expected_version, "payment plan changed underneath us");
        return Err(ServiceError::ConcurrentModification(plan_id));
    }
    Ok(())
}

/// Student payment plans, their installments and the payment trail.
#[derive(Clone)]
pub struct PaymentPlanService {
    db_pool: Arc<DbPool>,
}

impl PaymentPlanService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(student_id = %request.student_id))]
    pub async fn create_plan(
        &self,
        request: CreatePaymentPlanRequest,
        today: NaiveDate,
    ) -> Result<PlanView, ServiceError> {
        request.validate()?;
        let total = money::positive_amount(request.total_amount, "total_amount")?;
        if request.course_id.is_some() == request.event_id.is_some() {
            return Err(ServiceError::ValidationError(
                "exactly one of course_id or event_id must be given".into(),
            ));
        }

        let db = &*self.db_pool;

        if let Some(event_id) = request.event_id {
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
        }

        let now = Utc::now();
        let plan = payment_plan::ActiveModel {
            id: Set(Uuid::new_v4()),
            student_id: Set(request.student_id),
            course_id: Set(request.course_id),
            event_id: Set(request.event_id),
            total_amount: Set(total),
            installments: Set(request.installments),
            start_date: Set(request.start_date),
            paid_amount: Set(Decimal::ZERO),
            status: Set(PlanStatus::Active),
            cancelled_at: Set(None),
            cancelled_by: Set(None),
            cancellation_reason: Set(None),
            notes: Set(request.notes),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(db_err("insert payment plan"))?;

        info!(plan_id = %plan.id, total = %plan.total_amount, installments = plan.installments, "payment plan created");
        Ok(plan_view(plan, Vec::new(), today))
    }

    /// Appends a payment and refreshes the plan's cached paid amount in one transaction.
    #[instrument(skip(self, request), fields(plan_id = %request.payment_plan_id, amount = %request.amount))]
    pub async fn record_payment(
        &self,
        request: RecordPaymentRequest,
        today: NaiveDate,
    ) -> Result<RecordPaymentResponse, ServiceError> {
        request.validate()?;
        let amount = money::positive_amount(request.amount, "amount")?;

        let plan_id = request.payment_plan_id;
        let payment_date = request.payment_date.unwrap_or(today);

        with_transaction(&self.db_pool, "record_payment", move |txn| {
            Box::pin(async move {
                let plan = load_plan(txn, plan_id).await?;
                if plan.status == PlanStatus::Cancelled {
                    return Err(ServiceError::InvalidOperation(format!(
                        "payment plan {} is cancelled",
                        plan_id
                    )));
                }

                let payment = payment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    payment_plan_id: Set(plan_id),
                    amount: Set(amount),
                    payment_date: Set(payment_date),
                    payment_method: Set(request.payment_method),
                    notes: Set(request.notes),
                    created_at: Set(Utc::now()),
                }
                .insert(txn)
                .await
                .map_err(db_err("insert payment"))?;

                let payments = load_payments(txn, plan_id).await?;
                let paid = sum_payments(&payments);
                if paid > plan.total_amount {
                    warn!(
                        plan_id = %plan_id,
                        paid = %paid,
                        total = %plan.total_amount,
                        "payment plan is overpaid"
                    );
                }

                let status = if plan.status == PlanStatus::Active && paid >= plan.total_amount {
                    PlanStatus::Completed
                } else {
                    plan.status
                };

                guarded_update(
                    txn,
                    plan_id,
                    plan.version,
                    payment_plan::ActiveModel {
                        paid_amount: Set(paid),
                        status: Set(status),
                        ..Default::default()
                    },
                )
                .await?;

                let plan = load_plan(txn, plan_id).await?;
                info!(plan_id = %plan_id, paid = %paid, status = %status, "payment recorded");
                counter!("atelier.payments.recorded", 1);

                Ok(RecordPaymentResponse {
                    payment,
                    plan: plan_view(plan, payments, today),
                })
            })
        })
        .await
    }

    /// Stops further collection on an active plan and writes the remainder off.
    #[instrument(skip(self, request))]
    pub async fn cancel_remaining(
        &self,
        plan_id: Uuid,
        request: CancelPlanRequest,
        cancelled_by: Option<String>,
        today: NaiveDate,
    ) -> Result<PlanView, ServiceError> {
        let reason = request.reason.trim().to_string();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "a cancellation reason is required".into(),
            ));
        }
        request.validate()?;

        let db = &*self.db_pool;
        let plan = load_plan(db, plan_id).await?;
        match plan.status {
            PlanStatus::Active => {}
            PlanStatus::Completed => {
                return Err(ServiceError::InvalidOperation(format!(
                    "payment plan {} is already completed",
                    plan_id
                )))
            }
            PlanStatus::Cancelled => {
                return Err(ServiceError::InvalidOperation(format!(
                    "payment plan {} is already cancelled",
                    plan_id
                )))
            }
        }

        guarded_update(
            db,
            plan_id,
            plan.version,
            payment_plan::ActiveModel {
                status: Set(PlanStatus::Cancelled),
                cancelled_at: Set(Some(Utc::now())),
                cancelled_by: Set(cancelled_by.clone()),
                cancellation_reason: Set(Some(reason)),
                ..Default::default()
            },
        )
        .await?;

        let plan = load_plan(db, plan_id).await?;
        let payments = load_payments(db, plan_id).await?;
        let view = plan_view(plan, payments, today);
        info!(
            plan_id = %plan_id,
            paid = %view.paid_amount,
            written_off = %view.written_off_amount,
            cancelled_by = cancelled_by.as_deref().unwrap_or("anonymous"),
            "payment plan cancelled"
        );
        Ok(view)
    }

    /// Replaces the reason on a cancelled plan. Concurrent edits are last-write-wins.
    #[instrument(skip(self, request))]
    pub async fn update_cancellation_reason(
        &self,
        plan_id: Uuid,
        request: CancelPlanRequest,
        actor: Option<String>,
        today: NaiveDate,
    ) -> Result<PlanView, ServiceError> {
        let reason = request.reason.trim().to_string();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "a cancellation reason is required".into(),
            ));
        }
        request.validate()?;

        let db = &*self.db_pool;
        let plan = load_plan(db, plan_id).await?;
        if plan.status != PlanStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(format!(
                "payment plan {} is not cancelled",
                plan_id
            )));
        }

        let version = plan.version;
        let mut active: payment_plan::ActiveModel = plan.into();
        active.cancellation_reason = Set(Some(reason));
        active.version = Set(version + 1);
        active.updated_at = Set(Utc::now());
        let plan = active
            .update(db)
            .await
            .map_err(db_err("update cancellation reason"))?;

        info!(plan_id = %plan_id, actor = actor.as_deref().unwrap_or("anonymous"), "cancellation reason updated");
        let payments = load_payments(db, plan_id).await?;
        Ok(plan_view(plan, payments, today))
    }

    #[instrument(skip(self))]
    pub async fn get_plan(&self, plan_id: Uuid, today: NaiveDate) -> Result<PlanView, ServiceError> {
        let db = &*self.db_pool;
        let plan = load_plan(db, plan_id).await?;
        let payments = load_payments(db, plan_id).await?;
        Ok(plan_view(plan, payments, today))
    }

    #[instrument(skip(self))]
    pub async fn list_plans(
        &self,
        filter: PlanFilter,
        today: NaiveDate,
    ) -> Result<Vec<PlanView>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = PaymentPlanEntity::find();
        if let Some(student_id) = filter.student_id {
            query = query.filter(payment_plan::Column::StudentId.eq(student_id));
        }
        if let Some(course_id) = filter.course_id {
            query = query.filter(payment_plan::Column::CourseId.eq(course_id));
        }
        if let Some(event_id) = filter.event_id {
            query = query.filter(payment_plan::Column::EventId.eq(event_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(payment_plan::Column::Status.eq(status));
        }

        let plans = query
            .order_by_desc(payment_plan::Column::CreatedAt)
            .all(db)
            .await
            .map_err(db_err("list payment plans"))?;

        let ids: Vec<Uuid> = plans.iter().map(|p| p.id).collect();
        let mut by_plan: HashMap<Uuid, Vec<payment::Model>> = HashMap::new();
        if !ids.is_empty() {
            let payments = payment::Entity::find()
                .filter(payment::Column::PaymentPlanId.is_in(ids))
                .order_by_asc(payment::Column::PaymentDate)
                .order_by_asc(payment::Column::CreatedAt)
                .all(db)
                .await
                .map_err(db_err("list payments"))?;
            for payment in payments {
                by_plan.entry(payment.payment_plan_id).or_default().push(payment);
            }
        }

        Ok(plans
            .into_iter()
            .map(|plan| {
                let payments = by_plan.remove(&plan.id).unwrap_or_default();
                plan_view(plan, payments, today)
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn list_payments(&self, plan_id: Uuid) -> Result<Vec<payment::Model>, ServiceError> {
        let db = &*self.db_pool;
        load_plan(db, plan_id).await?;
        load_payments(db, plan_id).await
    }
}

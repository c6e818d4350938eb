//! Monthly income, expense and profit figures.
//!
//! The database work is plain row loading; every sum is done by the pure
//! functions below on raw decimals and only formatted at the edge.

use crate::{
    calendar::Month,
    db::{db_err, DbPool},
    entities::{
        expense,
        payment::{self, PaymentMethod},
        payment_plan::{self, PlanStatus},
        teacher_payment::{self, TeacherPaymentStatus},
        teacher_payment_record,
    },
    errors::ServiceError,
    money::{self, Money},
    services::{expenses::expense_in, payment_plans::build_installments, teacher_payments::derived_trial_fee},
};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    /// `YYYY-MM`
    pub month: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FinancialSummary {
    pub month: String,
    #[schema(value_type = String)]
    pub actual_income: Decimal,
    #[schema(value_type = String)]
    pub actual_expense: Decimal,
    #[schema(value_type = String)]
    pub planned_income: Decimal,
    #[schema(value_type = String)]
    pub planned_expense: Decimal,
    #[schema(value_type = String)]
    pub net_profit: Decimal,
    #[schema(value_type = String)]
    pub projected_profit: Decimal,
}

impl FinancialSummary {
    pub fn compute(
        month: Month,
        actual_income: Decimal,
        actual_expense: Decimal,
        planned_income: Decimal,
        planned_expense: Decimal,
    ) -> Self {
        Self {
            month: month.to_string(),
            actual_income,
            actual_expense,
            planned_income,
            planned_expense,
            net_profit: actual_income - actual_expense,
            projected_profit: (actual_income + planned_income) - (actual_expense + planned_expense),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentLine {
    pub payment_id: Uuid,
    pub payment_plan_id: Uuid,
    pub student_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayrollLine {
    pub teacher_payment_id: Uuid,
    pub teacher_id: Uuid,
    #[schema(value_type = String)]
    pub total_hours: Decimal,
    pub hourly_rate: Money,
    pub trial_lessons_fee: Money,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub remaining_amount: Money,
    pub status: TeacherPaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpenseLine {
    pub expense_id: Uuid,
    pub category: String,
    pub description: Option<String>,
    pub expense_date: NaiveDate,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancellationLine {
    pub payment_plan_id: Uuid,
    pub student_id: Uuid,
    pub course_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub written_off_amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportTotals {
    pub student_income: Money,
    pub event_income: Money,
    pub total_income: Money,
    pub teacher_payments_made: Money,
    pub teacher_payroll_due: Money,
    pub general_expenses: Money,
    pub total_expense: Money,
    pub net_profit: Money,
    pub written_off: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinancialReport {
    pub month: String,
    pub student_payments: Vec<PaymentLine>,
    pub event_payments: Vec<PaymentLine>,
    pub teacher_payments: Vec<PayrollLine>,
    pub expenses: Vec<ExpenseLine>,
    pub cancellations: Vec<CancellationLine>,
    pub totals: ReportTotals,
}

fn total<I: IntoIterator<Item = Decimal>>(amounts: I) -> Decimal {
    money::round2(amounts.into_iter().sum())
}

/// Unpaid installment amounts of active plans that fall due in `month`.
pub fn planned_income(month: Month, plans: &[payment_plan::Model], today: NaiveDate) -> Decimal {
    total(
        plans
            .iter()
            .filter(|plan| plan.status == PlanStatus::Active)
            .flat_map(|plan| {
                build_installments(
                    plan.total_amount,
                    plan.installments,
                    plan.start_date,
                    plan.paid_amount,
                    today,
                )
            })
            .filter(|installment| month.contains(installment.due_date))
            .map(|installment| installment.remaining),
    )
}

/// What is still owed to teachers on the month's payroll rows.
pub fn planned_expense(payroll: &[teacher_payment::Model]) -> Decimal {
    total(
        payroll
            .iter()
            .map(|row| money::non_negative(row.total_amount - row.paid_amount)),
    )
}

fn payment_line(payment: payment::Model, plan: Option<&payment_plan::Model>) -> PaymentLine {
    PaymentLine {
        payment_id: payment.id,
        payment_plan_id: payment.payment_plan_id,
        student_id: plan.map(|p| p.student_id),
        course_id: plan.and_then(|p| p.course_id),
        event_id: plan.and_then(|p| p.event_id),
        payment_date: payment.payment_date,
        payment_method: payment.payment_method,
        amount: payment.amount.into(),
    }
}

fn payroll_line(row: teacher_payment::Model) -> PayrollLine {
    PayrollLine {
        teacher_payment_id: row.id,
        teacher_id: row.teacher_id,
        total_hours: row.total_hours,
        hourly_rate: row.hourly_rate.into(),
        trial_lessons_fee: derived_trial_fee(row.total_amount, row.total_hours, row.hourly_rate)
            .into(),
        total_amount: row.total_amount.into(),
        paid_amount: row.paid_amount.into(),
        remaining_amount: money::non_negative(row.total_amount - row.paid_amount).into(),
        status: row.status,
    }
}

fn cancellation_line(plan: payment_plan::Model) -> CancellationLine {
    CancellationLine {
        payment_plan_id: plan.id,
        student_id: plan.student_id,
        course_id: plan.course_id,
        event_id: plan.event_id,
        cancelled_at: plan.cancelled_at,
        cancelled_by: plan.cancelled_by,
        cancellation_reason: plan.cancellation_reason,
        total_amount: plan.total_amount.into(),
        paid_amount: plan.paid_amount.into(),
        written_off_amount: money::non_negative(plan.total_amount - plan.paid_amount).into(),
    }
}

/// Raw rows a report is assembled from.
#[derive(Debug, Default)]
pub struct ReportInputs {
    pub payments: Vec<(payment::Model, Option<payment_plan::Model>)>,
    pub payroll: Vec<teacher_payment::Model>,
    pub payroll_records: Vec<teacher_payment_record::Model>,
    pub expenses: Vec<expense::Model>,
    pub cancelled_plans: Vec<payment_plan::Model>,
}

/// Builds the report; cancellations fall in the month of their studio-local date.
pub fn assemble_report(month: Month, inputs: ReportInputs, offset: FixedOffset) -> FinancialReport {
    let mut student_payments = Vec::new();
    let mut event_payments = Vec::new();
    for (payment, plan) in inputs.payments {
        let is_event = plan.as_ref().map_or(false, |p| p.event_id.is_some());
        let line = payment_line(payment, plan.as_ref());
        if is_event {
            event_payments.push(line);
        } else {
            student_payments.push(line);
        }
    }

    let cancellations: Vec<CancellationLine> = inputs
        .cancelled_plans
        .into_iter()
        .filter(|plan| {
            plan.cancelled_at
                .map_or(false, |at| month.contains(at.with_timezone(&offset).date_naive()))
        })
        .map(cancellation_line)
        .collect();

    let student_income = total(student_payments.iter().map(|l| l.amount.amount));
    let event_income = total(event_payments.iter().map(|l| l.amount.amount));
    let teacher_payments_made = total(inputs.payroll_records.iter().map(|r| r.amount));
    let teacher_payroll_due = total(inputs.payroll.iter().map(|r| r.total_amount));
    let general_expenses = total(inputs.expenses.iter().map(|e| e.amount));
    let written_off = total(cancellations.iter().map(|c| c.written_off_amount.amount));

    let total_income = student_income + event_income;
    let total_expense = teacher_payments_made + general_expenses;

    let teacher_payments = inputs.payroll.into_iter().map(payroll_line).collect();
    let expenses = inputs
        .expenses
        .into_iter()
        .map(|e| ExpenseLine {
            expense_id: e.id,
            category: e.category,
            description: e.description,
            expense_date: e.expense_date,
            amount: e.amount.into(),
        })
        .collect();

    FinancialReport {
        month: month.to_string(),
        student_payments,
        event_payments,
        teacher_payments,
        expenses,
        cancellations,
        totals: ReportTotals {
            student_income: student_income.into(),
            event_income: event_income.into(),
            total_income: total_income.into(),
            teacher_payments_made: teacher_payments_made.into(),
            teacher_payroll_due: teacher_payroll_due.into(),
            general_expenses: general_expenses.into(),
            total_expense: total_expense.into(),
            net_profit: (total_income - total_expense).into(),
            written_off: written_off.into(),
        },
    }
}

#[derive(Clone)]
pub struct FinancialService {
    db_pool: Arc<DbPool>,
}

impl FinancialService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn payments_in(
        &self,
        month: Month,
    ) -> Result<Vec<(payment::Model, Option<payment_plan::Model>)>, ServiceError> {
        payment::Entity::find()
            .find_also_related(payment_plan::Entity)
            .filter(payment::Column::PaymentDate.between(month.first_day(), month.last_day()))
            .order_by_asc(payment::Column::PaymentDate)
            .all(&*self.db_pool)
            .await
            .map_err(db_err("load payments for month"))
    }

    async fn payroll_records_in(
        &self,
        month: Month,
    ) -> Result<Vec<teacher_payment_record::Model>, ServiceError> {
        teacher_payment_record::Entity::find()
            .filter(
                teacher_payment_record::Column::PaymentDate
                    .between(month.first_day(), month.last_day()),
            )
            .all(&*self.db_pool)
            .await
            .map_err(db_err("load teacher payment records for month"))
    }

    async fn expenses_in(&self, month: Month) -> Result<Vec<expense::Model>, ServiceError> {
        expense::Entity::find()
            .filter(expense_in(month))
            .order_by_asc(expense::Column::ExpenseDate)
            .all(&*self.db_pool)
            .await
            .map_err(db_err("load expenses for month"))
    }

    async fn payroll_for(&self, month: Month) -> Result<Vec<teacher_payment::Model>, ServiceError> {
        teacher_payment::Entity::find()
            .filter(teacher_payment::Column::MonthYear.eq(month.to_string()))
            .all(&*self.db_pool)
            .await
            .map_err(db_err("load payroll for month"))
    }

    async fn plans_with_status(
        &self,
        status: PlanStatus,
    ) -> Result<Vec<payment_plan::Model>, ServiceError> {
        payment_plan::Entity::find()
            .filter(payment_plan::Column::Status.eq(status))
            .all(&*self.db_pool)
            .await
            .map_err(db_err("load payment plans by status"))
    }

    #[instrument(skip(self))]
    pub async fn get_summary(
        &self,
        month: &str,
        today: NaiveDate,
    ) -> Result<FinancialSummary, ServiceError> {
        let month: Month = month.parse()?;

        let actual_income = total(self.payments_in(month).await?.iter().map(|(p, _)| p.amount));
        let actual_expense = total(
            self.payroll_records_in(month)
                .await?
                .iter()
                .map(|r| r.amount)
                .chain(self.expenses_in(month).await?.iter().map(|e| e.amount)),
        );
        let planned_income = planned_income(
            month,
            &self.plans_with_status(PlanStatus::Active).await?,
            today,
        );
        let planned_expense = planned_expense(&self.payroll_for(month).await?);

        let summary = FinancialSummary::compute(
            month,
            actual_income,
            actual_expense,
            planned_income,
            planned_expense,
        );
        debug!(
            month = %month,
            income = %summary.actual_income,
            expense = %summary.actual_expense,
            net = %summary.net_profit,
            "financial summary computed"
        );
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn get_report(
        &self,
        month: &str,
        offset: FixedOffset,
    ) -> Result<FinancialReport, ServiceError> {
        let month: Month = month.parse()?;

        let inputs = ReportInputs {
            payments: self.payments_in(month).await?,
            payroll: self.payroll_for(month).await?,
            payroll_records: self.payroll_records_in(month).await?,
            expenses: self.expenses_in(month).await?,
            cancelled_plans: self.plans_with_status(PlanStatus::Cancelled).await?,
        };

        let report = assemble_report(month, inputs, offset);
        debug!(month = %month, net = %report.totals.net_profit.amount, "financial report assembled");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn studio() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn month(raw: &str) -> Month {
        raw.parse().unwrap()
    }

    fn plan(total: Decimal, installments: i32, start: NaiveDate, paid: Decimal) -> payment_plan::Model {
        let now = Utc::now();
        payment_plan::Model {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            course_id: Some(Uuid::new_v4()),
            event_id: None,
            total_amount: total,
            installments,
            start_date: start,
            paid_amount: paid,
            status: PlanStatus::Active,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn payroll(total: Decimal, paid: Decimal) -> teacher_payment::Model {
        let now = Utc::now();
        teacher_payment::Model {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            month_year: "2026-10".into(),
            total_hours: dec!(10),
            hourly_rate: dec!(300),
            trial_lessons_fee: total - dec!(3000),
            total_amount: total,
            paid_amount: paid,
            status: TeacherPaymentStatus::derive(paid, total),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn summary_arithmetic() {
        let summary = FinancialSummary::compute(
            month("2026-10"),
            dec!(5000),
            dec!(3200),
            dec!(1800),
            dec!(700),
        );
        assert_eq!(summary.net_profit, dec!(1800));
        assert_eq!(summary.projected_profit, dec!(2900));
        assert_eq!(summary.month, "2026-10");
    }

    #[test]
    fn planned_income_counts_unpaid_installments_due_in_month() {
        let today = date(2026, 10, 1);
        let plans = vec![
            // 400/month Sep, Oct, Nov; 500 paid covers Sep and 100 of Oct
            plan(dec!(1200), 3, date(2026, 9, 5), dec!(500)),
            // single installment due in October, untouched
            plan(dec!(750), 1, date(2026, 10, 20), dec!(0)),
            // nothing due in October
            plan(dec!(600), 2, date(2026, 11, 1), dec!(0)),
        ];
        assert_eq!(planned_income(month("2026-10"), &plans, today), dec!(1050));
    }

    #[test]
    fn planned_income_ignores_cancelled_and_completed_plans() {
        let mut cancelled = plan(dec!(1000), 1, date(2026, 10, 1), dec!(0));
        cancelled.status = PlanStatus::Cancelled;
        let mut completed = plan(dec!(1000), 1, date(2026, 10, 1), dec!(1000));
        completed.status = PlanStatus::Completed;
        assert_eq!(
            planned_income(month("2026-10"), &[cancelled, completed], date(2026, 10, 1)),
            Decimal::ZERO
        );
    }

    #[test]
    fn planned_expense_never_goes_negative() {
        let rows = vec![payroll(dec!(3450), dec!(1000)), payroll(dec!(3000), dec!(3200))];
        assert_eq!(planned_expense(&rows), dec!(2450));
    }

    #[test]
    fn report_splits_course_and_event_income() {
        let course_plan = plan(dec!(1200), 3, date(2026, 10, 1), dec!(400));
        let mut event_plan = plan(dec!(500), 1, date(2026, 10, 1), dec!(500));
        event_plan.course_id = None;
        event_plan.event_id = Some(Uuid::new_v4());

        let pay = |plan: &payment_plan::Model, amount: Decimal| payment::Model {
            id: Uuid::new_v4(),
            payment_plan_id: plan.id,
            amount,
            payment_date: date(2026, 10, 3),
            payment_method: PaymentMethod::Cash,
            notes: None,
            created_at: Utc::now(),
        };

        let mut cancelled = plan(dec!(1000), 2, date(2026, 9, 1), dec!(300));
        cancelled.status = PlanStatus::Cancelled;
        cancelled.cancelled_at = Some(
            date(2026, 10, 12)
                .and_hms_opt(9, 0, 0)
                .unwrap()
                .and_utc(),
        );
        cancelled.cancellation_reason = Some("moved abroad".into());

        let inputs = ReportInputs {
            payments: vec![
                (pay(&course_plan, dec!(400)), Some(course_plan.clone())),
                (pay(&event_plan, dec!(500)), Some(event_plan.clone())),
            ],
            payroll: vec![payroll(dec!(3450), dec!(1000))],
            payroll_records: Vec::new(),
            expenses: vec![expense::Model {
                id: Uuid::new_v4(),
                category: "rent".into(),
                description: None,
                amount: dec!(1234.56),
                expense_date: date(2026, 10, 1),
                created_at: Utc::now(),
            }],
            cancelled_plans: vec![cancelled],
        };

        let report = assemble_report(month("2026-10"), inputs, studio());
        assert_eq!(report.student_payments.len(), 1);
        assert_eq!(report.event_payments.len(), 1);
        assert_eq!(report.totals.total_income.amount, dec!(900));
        assert_eq!(report.totals.general_expenses.display, "₺1.234,56");
        assert_eq!(report.teacher_payments[0].trial_lessons_fee.amount, dec!(450));
        assert_eq!(report.cancellations.len(), 1);
        assert_eq!(report.totals.written_off.amount, dec!(700));
        assert_eq!(report.totals.net_profit.amount, dec!(900) - dec!(1234.56));
    }

    #[test]
    fn late_evening_cancellations_count_in_the_studio_month() {
        let mut cancelled = plan(dec!(1000), 2, date(2026, 9, 1), dec!(300));
        cancelled.status = PlanStatus::Cancelled;
        // 01:30 on 1 November in the studio
        cancelled.cancelled_at = Some(
            date(2026, 10, 31)
                .and_hms_opt(22, 30, 0)
                .unwrap()
                .and_utc(),
        );
        let inputs = || ReportInputs {
            payments: Vec::new(),
            payroll: Vec::new(),
            payroll_records: Vec::new(),
            expenses: Vec::new(),
            cancelled_plans: vec![cancelled.clone()],
        };

        let october = assemble_report(month("2026-10"), inputs(), studio());
        assert!(october.cancellations.is_empty());

        let november = assemble_report(month("2026-11"), inputs(), studio());
        assert_eq!(november.cancellations.len(), 1);
        assert_eq!(november.totals.written_off.amount, dec!(700));
    }
}

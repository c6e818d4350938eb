pub mod attendance;
pub mod common;
pub mod events;
pub mod expenses;
pub mod financial;
pub mod payment_plans;
pub mod schedules;
pub mod teacher_payments;

use crate::db::DbPool;
use crate::services::{
    attendance::AttendanceService, events::EventService, expenses::ExpenseService,
    financial::FinancialService, payment_plans::PaymentPlanService, schedules::ScheduleService,
    teacher_payments::TeacherPaymentService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub payment_plans: Arc<PaymentPlanService>,
    pub schedules: Arc<ScheduleService>,
    pub attendance: Arc<AttendanceService>,
    pub teacher_payments: Arc<TeacherPaymentService>,
    pub events: Arc<EventService>,
    pub expenses: Arc<ExpenseService>,
    pub financial: Arc<FinancialService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            payment_plans: Arc::new(PaymentPlanService::new(db_pool.clone())),
            schedules: Arc::new(ScheduleService::new(db_pool.clone())),
            attendance: Arc::new(AttendanceService::new(db_pool.clone())),
            teacher_payments: Arc::new(TeacherPaymentService::new(db_pool.clone())),
            events: Arc::new(EventService::new(db_pool.clone())),
            expenses: Arc::new(ExpenseService::new(db_pool.clone())),
            financial: Arc::new(FinancialService::new(db_pool)),
        }
    }
}

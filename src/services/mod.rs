pub mod attendance;
pub mod events;
pub mod expenses;
pub mod financial;
pub mod payment_plans;
pub mod schedules;
pub mod teacher_payments;

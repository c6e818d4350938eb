pub mod attendance;
pub mod event;
pub mod expense;
pub mod payment;
pub mod payment_plan;
pub mod schedule;
pub mod teacher_payment;
pub mod teacher_payment_record;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A teacher's payroll line for one month.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "teacher_payments")]
#[schema(as = TeacherPayment)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub teacher_id: Uuid,
    /// `YYYY-MM`
    pub month_year: String,
    #[schema(value_type = String)]
    pub total_hours: Decimal,
    #[schema(value_type = String)]
    pub hourly_rate: Decimal,
    #[schema(value_type = String)]
    pub trial_lessons_fee: Decimal,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub paid_amount: Decimal,
    pub status: TeacherPaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::teacher_payment_record::Entity")]
    Records,
}

impl Related<super::teacher_payment_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TeacherPaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "paid")]
    Paid,
}

impl TeacherPaymentStatus {
    pub fn derive(paid: Decimal, total: Decimal) -> Self {
        if paid > Decimal::ZERO && paid >= total {
            Self::Paid
        } else if paid > Decimal::ZERO {
            Self::Partial
        } else {
            Self::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_follows_paid_amount() {
        assert_eq!(
            TeacherPaymentStatus::derive(dec!(0), dec!(500)),
            TeacherPaymentStatus::Pending
        );
        assert_eq!(
            TeacherPaymentStatus::derive(dec!(200), dec!(500)),
            TeacherPaymentStatus::Partial
        );
        assert_eq!(
            TeacherPaymentStatus::derive(dec!(500), dec!(500)),
            TeacherPaymentStatus::Paid
        );
        assert_eq!(
            TeacherPaymentStatus::derive(dec!(650), dec!(500)),
            TeacherPaymentStatus::Paid
        );
    }
}

use super::payment::PaymentMethod;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "teacher_payment_records")]
#[schema(as = TeacherPaymentRecord)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub teacher_payment_id: Uuid,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::teacher_payment::Entity",
        from = "Column::TeacherPaymentId",
        to = "super::teacher_payment::Column::Id"
    )]
    TeacherPayment,
}

impl Related<super::teacher_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TeacherPayment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

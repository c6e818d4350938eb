use crate::calendar::DayOfWeek;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One dated occurrence on the studio calendar.
///
/// `day_of_week` always matches `specific_date`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "schedules")]
#[schema(as = Schedule)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: ScheduleKind,
    pub course_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub specific_date: NaiveDate,
    pub day_of_week: DayOfWeek,
    #[schema(value_type = String, example = "14:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "15:30:00")]
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub title: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Whether two rows share a date and their time ranges intersect.
    pub fn overlaps(&self, other: &Model) -> bool {
        self.specific_date == other.specific_date
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendances,
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendances.def()
    }
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
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
pub enum ScheduleKind {
    #[sea_orm(string_value = "regular_lesson")]
    RegularLesson,
    #[sea_orm(string_value = "appointment")]
    Appointment,
    #[sea_orm(string_value = "workshop")]
    Workshop,
    #[sea_orm(string_value = "event")]
    Event,
}

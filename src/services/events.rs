use crate::{
    db::{db_err, DbPool},
    entities::event::{self, Entity as EventEntity, EventStatus, Model as EventModel},
    errors::ServiceError,
    money,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[schema(value_type = String, example = "750.00")]
    pub price: Decimal,
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    /// Events that end on or after this date
    pub from: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct EventService {
    db_pool: Arc<DbPool>,
}

impl EventService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_event(&self, request: CreateEventRequest) -> Result<EventModel, ServiceError> {
        request.validate()?;
        if request.name.trim().is_empty() {
            return Err(ServiceError::ValidationError("name is required".into()));
        }
        if request.end_date < request.start_date {
            return Err(ServiceError::ValidationError(
                "end_date must not be before start_date".into(),
            ));
        }
        let price = money::non_negative_amount(request.price, "price")?;

        let event = event::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            start_date: Set(request.start_date),
            end_date: Set(request.end_date),
            price: Set(price),
            capacity: Set(request.capacity),
            status: Set(EventStatus::Active),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await
        .map_err(db_err("insert event"))?;

        info!(event_id = %event.id, "event created");
        Ok(event)
    }

    #[instrument(skip(self))]
    pub async fn get_event(&self, event_id: Uuid) -> Result<EventModel, ServiceError> {
        EventEntity::find_by_id(event_id)
            .one(&*self.db_pool)
            .await
            .map_err(db_err("load event"))?
            .ok_or_else(|| ServiceError::not_found("event", event_id))
    }

    #[instrument(skip(self))]
    pub async fn list_events(&self, filter: EventFilter) -> Result<Vec<EventModel>, ServiceError> {
        let mut query = EventEntity::find();
        if let Some(status) = filter.status {
            query = query.filter(event::Column::Status.eq(status));
        }
        if let Some(from) = filter.from {
            query = query.filter(event::Column::EndDate.gte(from));
        }
        query
            .order_by_asc(event::Column::StartDate)
            .all(&*self.db_pool)
            .await
            .map_err(db_err("list events"))
    }

    /// Flags the event cancelled. Plans and schedules that reference it are kept.
    #[instrument(skip(self))]
    pub async fn cancel_event(&self, event_id: Uuid) -> Result<EventModel, ServiceError> {
        let event = self.get_event(event_id).await?;
        if event.status == EventStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(format!(
                "event {} is already cancelled",
                event_id
            )));
        }

        let mut active: event::ActiveModel = event.into();
        active.status = Set(EventStatus::Cancelled);
        let event = active
            .update(&*self.db_pool)
            .await
            .map_err(db_err("cancel event"))?;

        info!(event_id = %event_id, "event cancelled");
        Ok(event)
    }
}

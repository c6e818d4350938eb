use crate::{
    calendar::Month,
    db::{db_err, DbPool},
    entities::expense::{self, Entity as ExpenseEntity, Model as ExpenseModel},
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
pub struct CreateExpenseRequest {
    #[validate(length(min = 1, max = 100, message = "category must be between 1 and 100 characters"))]
    pub category: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[schema(value_type = String, example = "2500.00")]
    pub amount: Decimal,
    pub expense_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ExpenseFilter {
    /// `YYYY-MM`
    pub month: Option<String>,
}

#[derive(Clone)]
pub struct ExpenseService {
    db_pool: Arc<DbPool>,
}

impl ExpenseService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(category = %request.category, amount = %request.amount))]
    pub async fn create_expense(
        &self,
        request: CreateExpenseRequest,
    ) -> Result<ExpenseModel, ServiceError> {
        request.validate()?;
        let amount = money::positive_amount(request.amount, "amount")?;

        let expense = expense::ActiveModel {
            id: Set(Uuid::new_v4()),
            category: Set(request.category.trim().to_string()),
            description: Set(request.description),
            amount: Set(amount),
            expense_date: Set(request.expense_date),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await
        .map_err(db_err("insert expense"))?;

        info!(expense_id = %expense.id, "expense recorded");
        Ok(expense)
    }

    #[instrument(skip(self))]
    pub async fn list_expenses(&self, filter: ExpenseFilter) -> Result<Vec<ExpenseModel>, ServiceError> {
        let mut query = ExpenseEntity::find();
        if let Some(raw) = filter.month.as_deref() {
            let month: Month = raw.parse()?;
            query = query.filter(expense_in(month));
        }
        query
            .order_by_desc(expense::Column::ExpenseDate)
            .all(&*self.db_pool)
            .await
            .map_err(db_err("list expenses"))
    }
}

/// Filter for expenses dated inside `month`.
pub(crate) fn expense_in(month: Month) -> sea_orm::sea_query::SimpleExpr {
    expense::Column::ExpenseDate.between(month.first_day(), month.last_day())
}

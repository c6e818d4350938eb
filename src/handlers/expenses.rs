use super::common::{created, ok, Created};
use crate::{
    entities::expense,
    errors::ServiceError,
    services::expenses::{CreateExpenseRequest, ExpenseFilter},
    ApiResult, AppState,
};
use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};

#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = crate::ApiResponse<crate::entities::expense::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
    ),
    tag = "expenses"
)]
pub async fn create_expense(
    State(state): State<AppState>,
    Json(payload): Json<CreateExpenseRequest>,
) -> Result<Created<expense::Model>, ServiceError> {
    let expense = state.services.expenses.create_expense(payload).await?;
    Ok(created(expense))
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    params(ExpenseFilter),
    responses(
        (status = 200, description = "Expenses, newest first", body = crate::ApiResponse<Vec<crate::entities::expense::Model>>),
        (status = 400, description = "Invalid month", body = crate::errors::ErrorResponse),
    ),
    tag = "expenses"
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    Query(filter): Query<ExpenseFilter>,
) -> ApiResult<Vec<expense::Model>> {
    let expenses = state.services.expenses.list_expenses(filter).await?;
    Ok(ok(expenses))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/expenses", post(create_expense).get(list_expenses))
}

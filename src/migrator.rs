use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240901_000001_create_events_table::Migration),
            Box::new(m20240901_000002_create_payment_plan_tables::Migration),
            Box::new(m20240901_000003_create_schedule_tables::Migration),
            Box::new(m20240901_000004_create_teacher_payment_tables::Migration),
            Box::new(m20240901_000005_create_expenses_table::Migration),
        ]
    }
}

mod m20240901_000001_create_events_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240901_000001_create_events_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Events::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Events::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Events::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Events::Description).text().null())
                        .col(ColumnDef::new(Events::StartDate).date().not_null())
                        .col(ColumnDef::new(Events::EndDate).date().not_null())
                        .col(
                            ColumnDef::new(Events::Price)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Events::Capacity).integer().null())
                        .col(ColumnDef::new(Events::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Events::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_events_start_date")
                        .table(Events::Table)
                        .col(Events::StartDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Events::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Events {
        Table,
        Id,
        Name,
        Description,
        StartDate,
        EndDate,
        Price,
        Capacity,
        Status,
        CreatedAt,
    }
}

mod m20240901_000002_create_payment_plan_tables {

    use super::m20240901_000001_create_events_table::Events;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240901_000002_create_payment_plan_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PaymentPlans::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentPlans::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentPlans::StudentId).uuid().not_null())
                        .col(ColumnDef::new(PaymentPlans::CourseId).uuid().null())
                        .col(ColumnDef::new(PaymentPlans::EventId).uuid().null())
                        .col(
                            ColumnDef::new(PaymentPlans::TotalAmount)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentPlans::Installments)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(PaymentPlans::StartDate).date().not_null())
                        .col(
                            ColumnDef::new(PaymentPlans::PaidAmount)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PaymentPlans::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentPlans::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentPlans::CancelledBy)
                                .string_len(100)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentPlans::CancellationReason)
                                .text()
                                .null(),
                        )
                        .col(ColumnDef::new(PaymentPlans::Notes).text().null())
                        .col(
                            ColumnDef::new(PaymentPlans::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(PaymentPlans::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentPlans::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payment_plans_event_id")
                                .from(PaymentPlans::Table, PaymentPlans::EventId)
                                .to(Events::Table, Events::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_plans_student_id")
                        .table(PaymentPlans::Table)
                        .col(PaymentPlans::StudentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_plans_status")
                        .table(PaymentPlans::Table)
                        .col(PaymentPlans::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Payments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Payments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Payments::PaymentPlanId).uuid().not_null())
                        .col(
                            ColumnDef::new(Payments::Amount)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Payments::PaymentDate).date().not_null())
                        .col(
                            ColumnDef::new(Payments::PaymentMethod)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Payments::Notes).text().null())
                        .col(
                            ColumnDef::new(Payments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payments_payment_plan_id")
                                .from(Payments::Table, Payments::PaymentPlanId)
                                .to(PaymentPlans::Table, PaymentPlans::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payments_payment_plan_id")
                        .table(Payments::Table)
                        .col(Payments::PaymentPlanId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payments_payment_date")
                        .table(Payments::Table)
                        .col(Payments::PaymentDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PaymentPlans::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PaymentPlans {
        Table,
        Id,
        StudentId,
        CourseId,
        EventId,
        TotalAmount,
        Installments,
        StartDate,
        PaidAmount,
        Status,
        CancelledAt,
        CancelledBy,
        CancellationReason,
        Notes,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Payments {
        Table,
        Id,
        PaymentPlanId,
        Amount,
        PaymentDate,
        PaymentMethod,
        Notes,
        CreatedAt,
    }
}

mod m20240901_000003_create_schedule_tables {

    use super::m20240901_000001_create_events_table::Events;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240901_000003_create_schedule_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Schedules::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Schedules::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Schedules::Kind).string_len(16).not_null())
                        .col(ColumnDef::new(Schedules::CourseId).uuid().null())
                        .col(ColumnDef::new(Schedules::TeacherId).uuid().null())
                        .col(ColumnDef::new(Schedules::StudentId).uuid().null())
                        .col(ColumnDef::new(Schedules::EventId).uuid().null())
                        .col(ColumnDef::new(Schedules::SpecificDate).date().not_null())
                        .col(
                            ColumnDef::new(Schedules::DayOfWeek)
                                .string_len(12)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Schedules::StartTime).time().not_null())
                        .col(ColumnDef::new(Schedules::EndTime).time().not_null())
                        .col(ColumnDef::new(Schedules::Room).string_len(100).null())
                        .col(ColumnDef::new(Schedules::Title).string_len(200).null())
                        .col(
                            ColumnDef::new(Schedules::ContactName)
                                .string_len(200)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Schedules::ContactPhone)
                                .string_len(50)
                                .null(),
                        )
                        .col(ColumnDef::new(Schedules::Notes).text().null())
                        .col(ColumnDef::new(Schedules::Price).decimal_len(12, 2).null())
                        .col(
                            ColumnDef::new(Schedules::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_schedules_event_id")
                                .from(Schedules::Table, Schedules::EventId)
                                .to(Events::Table, Events::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_schedules_specific_date")
                        .table(Schedules::Table)
                        .col(Schedules::SpecificDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_schedules_teacher_id")
                        .table(Schedules::Table)
                        .col(Schedules::TeacherId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Attendances::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Attendances::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Attendances::ScheduleId).uuid().not_null())
                        .col(ColumnDef::new(Attendances::StudentId).uuid().not_null())
                        .col(
                            ColumnDef::new(Attendances::AttendanceDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Attendances::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Attendances::MarkedBy)
                                .string_len(100)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Attendances::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_attendances_schedule_id")
                                .from(Attendances::Table, Attendances::ScheduleId)
                                .to(Schedules::Table, Schedules::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_attendances_schedule_date_student")
                        .table(Attendances::Table)
                        .col(Attendances::ScheduleId)
                        .col(Attendances::AttendanceDate)
                        .col(Attendances::StudentId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_attendances_student_id")
                        .table(Attendances::Table)
                        .col(Attendances::StudentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Attendances::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Schedules::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Schedules {
        Table,
        Id,
        Kind,
        CourseId,
        TeacherId,
        StudentId,
        EventId,
        SpecificDate,
        DayOfWeek,
        StartTime,
        EndTime,
        Room,
        Title,
        ContactName,
        ContactPhone,
        Notes,
        Price,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Attendances {
        Table,
        Id,
        ScheduleId,
        StudentId,
        AttendanceDate,
        Status,
        MarkedBy,
        UpdatedAt,
    }
}

mod m20240901_000004_create_teacher_payment_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240901_000004_create_teacher_payment_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TeacherPayments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TeacherPayments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TeacherPayments::TeacherId).uuid().not_null())
                        .col(
                            ColumnDef::new(TeacherPayments::MonthYear)
                                .string_len(7)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TeacherPayments::TotalHours)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TeacherPayments::HourlyRate)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TeacherPayments::TrialLessonsFee)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TeacherPayments::TotalAmount)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TeacherPayments::PaidAmount)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TeacherPayments::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TeacherPayments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TeacherPayments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_teacher_payments_teacher_month")
                        .table(TeacherPayments::Table)
                        .col(TeacherPayments::TeacherId)
                        .col(TeacherPayments::MonthYear)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TeacherPaymentRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TeacherPaymentRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TeacherPaymentRecords::TeacherPaymentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TeacherPaymentRecords::Amount)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TeacherPaymentRecords::PaymentDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TeacherPaymentRecords::PaymentMethod)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(TeacherPaymentRecords::Notes).text().null())
                        .col(
                            ColumnDef::new(TeacherPaymentRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_teacher_payment_records_teacher_payment_id")
                                .from(
                                    TeacherPaymentRecords::Table,
                                    TeacherPaymentRecords::TeacherPaymentId,
                                )
                                .to(TeacherPayments::Table, TeacherPayments::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_teacher_payment_records_payment_date")
                        .table(TeacherPaymentRecords::Table)
                        .col(TeacherPaymentRecords::PaymentDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TeacherPaymentRecords::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TeacherPayments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum TeacherPayments {
        Table,
        Id,
        TeacherId,
        MonthYear,
        TotalHours,
        HourlyRate,
        TrialLessonsFee,
        TotalAmount,
        PaidAmount,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum TeacherPaymentRecords {
        Table,
        Id,
        TeacherPaymentId,
        Amount,
        PaymentDate,
        PaymentMethod,
        Notes,
        CreatedAt,
    }
}

mod m20240901_000005_create_expenses_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240901_000005_create_expenses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Expenses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Expenses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Expenses::Category).string_len(100).not_null())
                        .col(ColumnDef::new(Expenses::Description).text().null())
                        .col(
                            ColumnDef::new(Expenses::Amount)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Expenses::ExpenseDate).date().not_null())
                        .col(
                            ColumnDef::new(Expenses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_expenses_expense_date")
                        .table(Expenses::Table)
                        .col(Expenses::ExpenseDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Expenses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Expenses {
        Table,
        Id,
        Category,
        Description,
        Amount,
        ExpenseDate,
        CreatedAt,
    }
}

/// Standalone migration runner used by `atelier-api --migrate-only`.
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(2)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}

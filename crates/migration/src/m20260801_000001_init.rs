use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Currencies {
    Table,
    Id,
    Title,
    ShortName,
    ExchangeRate,
    Position,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeletedAt,
    DeletedBy,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Title,
    Kind,
    AmountMinor,
    CurrencyId,
    Closed,
    Position,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeletedAt,
    DeletedBy,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    Title,
    OperationKind,
    Kind,
    ParentId,
    Position,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeletedAt,
    DeletedBy,
}

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    AmountMinor,
    CurrencyId,
    CategoryId,
    Position,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeletedAt,
    DeletedBy,
}

#[derive(Iden)]
enum Operations {
    Table,
    Id,
    Kind,
    OccurredAt,
    AmountMinor,
    Comment,
    CategoryId,
    AccountId,
    CurrencyId,
    ToAccountId,
    ToCurrencyId,
    ToAmountMinor,
    Position,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    DeletedAt,
    DeletedBy,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Currencies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Currencies::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Currencies::Title).string().not_null())
                    .col(ColumnDef::new(Currencies::ShortName).string().not_null())
                    .col(
                        ColumnDef::new(Currencies::ExchangeRate)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Currencies::Position).big_integer().not_null())
                    .col(ColumnDef::new(Currencies::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Currencies::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Currencies::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Currencies::UpdatedBy).string().not_null())
                    .col(ColumnDef::new(Currencies::DeletedAt).timestamp())
                    .col(ColumnDef::new(Currencies::DeletedBy).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-currencies-position")
                    .table(Currencies::Table)
                    .col(Currencies::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Title).string().not_null())
                    .col(ColumnDef::new(Accounts::Kind).string().not_null())
                    .col(ColumnDef::new(Accounts::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Accounts::CurrencyId).big_integer().not_null())
                    .col(ColumnDef::new(Accounts::Closed).boolean().not_null())
                    .col(ColumnDef::new(Accounts::Position).big_integer().not_null())
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Accounts::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedBy).string().not_null())
                    .col(ColumnDef::new(Accounts::DeletedAt).timestamp())
                    .col(ColumnDef::new(Accounts::DeletedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-currency_id")
                            .from(Accounts::Table, Accounts::CurrencyId)
                            .to(Currencies::Table, Currencies::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-position")
                    .table(Accounts::Table)
                    .col(Accounts::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-currency_id")
                    .table(Accounts::Table)
                    .col(Accounts::CurrencyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Title).string().not_null())
                    .col(ColumnDef::new(Categories::OperationKind).string().not_null())
                    .col(ColumnDef::new(Categories::Kind).string().not_null())
                    .col(ColumnDef::new(Categories::ParentId).big_integer())
                    .col(ColumnDef::new(Categories::Position).big_integer().not_null())
                    .col(ColumnDef::new(Categories::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Categories::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Categories::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Categories::UpdatedBy).string().not_null())
                    .col(ColumnDef::new(Categories::DeletedAt).timestamp())
                    .col(ColumnDef::new(Categories::DeletedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-parent_id")
                            .from(Categories::Table, Categories::ParentId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-position")
                    .table(Categories::Table)
                    .col(Categories::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Budgets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Budgets::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Budgets::CurrencyId).big_integer().not_null())
                    .col(ColumnDef::new(Budgets::CategoryId).big_integer())
                    .col(ColumnDef::new(Budgets::Position).big_integer().not_null())
                    .col(ColumnDef::new(Budgets::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Budgets::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Budgets::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Budgets::UpdatedBy).string().not_null())
                    .col(ColumnDef::new(Budgets::DeletedAt).timestamp())
                    .col(ColumnDef::new(Budgets::DeletedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets-currency_id")
                            .from(Budgets::Table, Budgets::CurrencyId)
                            .to(Currencies::Table, Currencies::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets-category_id")
                            .from(Budgets::Table, Budgets::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-category_id")
                    .table(Budgets::Table)
                    .col(Budgets::CategoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Operations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Operations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Operations::Kind).string().not_null())
                    .col(ColumnDef::new(Operations::OccurredAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(Operations::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Operations::Comment).string())
                    .col(ColumnDef::new(Operations::CategoryId).big_integer())
                    .col(ColumnDef::new(Operations::AccountId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Operations::CurrencyId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Operations::ToAccountId).big_integer())
                    .col(ColumnDef::new(Operations::ToCurrencyId).big_integer())
                    .col(ColumnDef::new(Operations::ToAmountMinor).big_integer())
                    .col(ColumnDef::new(Operations::Position).big_integer().not_null())
                    .col(ColumnDef::new(Operations::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Operations::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Operations::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Operations::UpdatedBy).string().not_null())
                    .col(ColumnDef::new(Operations::DeletedAt).timestamp())
                    .col(ColumnDef::new(Operations::DeletedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-operations-account_id")
                            .from(Operations::Table, Operations::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-operations-to_account_id")
                            .from(Operations::Table, Operations::ToAccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-operations-currency_id")
                            .from(Operations::Table, Operations::CurrencyId)
                            .to(Currencies::Table, Currencies::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-operations-category_id")
                            .from(Operations::Table, Operations::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-operations-account_id-occurred_at")
                    .table(Operations::Table)
                    .col(Operations::AccountId)
                    .col(Operations::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-operations-category_id")
                    .table(Operations::Table)
                    .col(Operations::CategoryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Operations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Currencies::Table).to_owned())
            .await?;
        Ok(())
    }
}

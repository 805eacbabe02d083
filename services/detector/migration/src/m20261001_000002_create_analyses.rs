use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Analyses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Analyses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Analyses::UserId).uuid().not_null())
                    .col(ColumnDef::new(Analyses::AiScore).double().not_null())
                    .col(ColumnDef::new(Analyses::Confidence).string_len(8).not_null())
                    .col(ColumnDef::new(Analyses::IsAiGenerated).boolean().not_null())
                    .col(
                        ColumnDef::new(Analyses::Indicators)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(ColumnDef::new(Analyses::Explanation).text().not_null())
                    .col(
                        ColumnDef::new(Analyses::SuspiciousParts)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Analyses::ProcessingTimeMs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Analyses::WordCount).integer().not_null())
                    .col(ColumnDef::new(Analyses::CharCount).integer().not_null())
                    .col(ColumnDef::new(Analyses::Language).string_len(2).not_null())
                    .col(
                        ColumnDef::new(Analyses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Analyses::Table, Analyses::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Analyses::Table)
                    .col(Analyses::UserId)
                    .col((Analyses::CreatedAt, IndexOrder::Desc))
                    .name("idx_analyses_user_id_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Analyses::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Analyses {
    Table,
    Id,
    UserId,
    AiScore,
    Confidence,
    IsAiGenerated,
    Indicators,
    Explanation,
    SuspiciousParts,
    ProcessingTimeMs,
    WordCount,
    CharCount,
    Language,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}

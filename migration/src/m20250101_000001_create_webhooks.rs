// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create strapi_webhooks table
        manager
            .create_table(
                Table::create()
                    .table(StrapiWebhooks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StrapiWebhooks::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StrapiWebhooks::Name).string().not_null())
                    .col(ColumnDef::new(StrapiWebhooks::Url).text().not_null())
                    .col(ColumnDef::new(StrapiWebhooks::Headers).json().not_null())
                    .col(ColumnDef::new(StrapiWebhooks::Events).json().not_null())
                    .col(
                        ColumnDef::new(StrapiWebhooks::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(StrapiWebhooks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StrapiWebhooks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StrapiWebhooks {
    Table,
    Id,
    Name,
    Url,
    Headers,
    Events,
    Enabled,
    CreatedAt,
}

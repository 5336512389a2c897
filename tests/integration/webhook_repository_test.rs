// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::webhook_input;
use migration::{Migrator, MigratorTrait};
use std::collections::HashMap;
use std::sync::Arc;
use strapi_core::config::settings::DatabaseSettings;
use strapi_core::domain::repositories::webhook_repository::WebhookRepository;
use strapi_core::infrastructure::database::connection;
use strapi_core::infrastructure::repositories::webhook_repo_impl::WebhookRepoImpl;

async fn create_repo() -> WebhookRepoImpl {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: None,
        min_connections: None,
        connect_timeout: Some(5),
        idle_timeout: None,
    };
    let db = connection::create_pool(&settings)
        .await
        .expect("Failed to connect to sqlite");
    Migrator::up(&db, None).await.expect("Failed to migrate");
    WebhookRepoImpl::new(Arc::new(db))
}

#[tokio::test]
async fn test_create_and_find_round_trips_json_columns() {
    let repo = create_repo().await;

    let mut input = webhook_input("http://example.test/hook", &["entry.create", "entry.update"]);
    input.headers = HashMap::from([("Authorization".to_string(), "Bearer abc".to_string())]);
    input.is_enabled = false;

    let created = repo.create(input).await.unwrap();
    let found = repo.find_by_id(&created.id).await.unwrap().unwrap();

    assert_eq!(found, created);
    assert_eq!(found.headers["Authorization"], "Bearer abc");
    assert_eq!(found.events, vec!["entry.create", "entry.update"]);
    assert!(!found.is_enabled);
}

#[tokio::test]
async fn test_find_all_returns_every_webhook() {
    let repo = create_repo().await;

    let first = repo
        .create(webhook_input("http://example.test/1", &["entry.create"]))
        .await
        .unwrap();
    let second = repo
        .create(webhook_input("http://example.test/2", &["entry.delete"]))
        .await
        .unwrap();

    let all = repo.find_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.contains(&first));
    assert!(all.contains(&second));
}

#[tokio::test]
async fn test_update_and_delete() {
    let repo = create_repo().await;
    let created = repo
        .create(webhook_input("http://example.test/hook", &["entry.create"]))
        .await
        .unwrap();

    let mut input = webhook_input("http://example.test/moved", &["entry.publish"]);
    input.name = "moved".to_string();
    let updated = repo.update(&created.id, input).await.unwrap().unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(
        repo.find_by_id(&created.id).await.unwrap().unwrap().url,
        "http://example.test/moved"
    );

    assert_eq!(
        repo.update("missing", webhook_input("http://example.test", &[]))
            .await
            .unwrap(),
        None
    );

    assert_eq!(repo.delete(&created.id).await.unwrap(), Some(updated));
    assert_eq!(repo.delete(&created.id).await.unwrap(), None);
    assert!(repo.find_all().await.unwrap().is_empty());
}

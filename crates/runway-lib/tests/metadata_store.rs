mod common;

use runway_lib::game::metadata::{Component, LoadOutcome, MetaFetcher, MetadataStore, MinecraftFile};
use runway_lib::MetadataError;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_catalog(server: &MockServer, index_hits: u64) {
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "formatVersion": 1,
            "packages": [{ "uid": "net.minecraft", "name": "Minecraft" }]
        })))
        .expect(index_hits)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/net.minecraft/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::minecraft_versions()))
        .expect(index_hits)
        .mount(server)
        .await;
}

fn store(server: &MockServer, meta_dir: &std::path::Path) -> MetadataStore {
    common::init_logging();
    let fetcher = MetaFetcher::new(&server.uri()).unwrap().with_max_retries(1);
    MetadataStore::new(meta_dir.to_path_buf(), fetcher)
}

#[tokio::test]
async fn second_load_within_window_stays_offline() {
    let server = MockServer::start().await;
    mount_catalog(&server, 1).await;
    let tmp = TempDir::new().unwrap();
    let meta_dir = tmp.path().join("meta");

    let first = store(&server, &meta_dir);
    assert_eq!(first.load(false).await.unwrap(), LoadOutcome::Refreshed);
    assert!(meta_dir.join("index.json").exists());
    assert!(meta_dir.join("net.minecraft/index.json").exists());

    // A new store over the same directory reads the persisted catalog
    let second = store(&server, &meta_dir);
    assert_eq!(second.load(false).await.unwrap(), LoadOutcome::Cached);

    let versions = second.get_versions(Component::Minecraft).await.unwrap();
    assert_eq!(versions[0].version, "1.16.1");
    assert_eq!(versions[1].version, "1.8.9");
    assert!(second.contains_version(Component::Minecraft, "1.8.9").await);
}

#[tokio::test]
async fn version_without_requirements_has_no_dependencies() {
    let server = MockServer::start().await;
    mount_catalog(&server, 1).await;
    let tmp = TempDir::new().unwrap();

    let store = store(&server, &tmp.path().join("meta"));
    store.load(false).await.unwrap();

    let deps = store.dependencies(Component::Minecraft, "1.8.9").await.unwrap();
    assert!(deps.is_empty());

    let err = store.find_version(Component::Minecraft, "1.0").await.unwrap_err();
    assert!(matches!(err, MetadataError::VersionNotFound { .. }));
}

#[tokio::test]
async fn failed_refresh_falls_back_to_cached_catalog() {
    let tmp = TempDir::new().unwrap();
    let meta_dir = tmp.path().join("meta");

    let server = MockServer::start().await;
    mount_catalog(&server, 1).await;
    store(&server, &meta_dir).load(false).await.unwrap();

    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;

    let fallback = store(&broken, &meta_dir);
    assert_eq!(fallback.refresh().await.unwrap(), LoadOutcome::Stale);
    assert!(fallback.contains_version(Component::Minecraft, "1.16.1").await);
}

#[tokio::test]
async fn failed_first_load_is_fatal() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;
    let tmp = TempDir::new().unwrap();

    let store = store(&broken, &tmp.path().join("meta"));
    assert!(matches!(store.load(false).await, Err(MetadataError::NoCatalog)));
    assert!(!store.is_loaded().await);
}

#[tokio::test]
async fn version_files_are_cached_on_disk() {
    let server = MockServer::start().await;
    mount_catalog(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/net.minecraft/1.8.9.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "1.8.9",
            "mainClass": "net.minecraft.client.main.Main",
            "mainJar": { "name": "com.mojang:minecraft:1.8.9:client" },
            "assetIndex": { "id": "1.8" },
            "+traits": ["FirstThreadOnMacOS"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    let meta_dir = tmp.path().join("meta");

    let store = store(&server, &meta_dir);
    store.load(false).await.unwrap();
    let file = store
        .get_version_meta::<MinecraftFile>(Component::Minecraft, "1.8.9")
        .await
        .unwrap();
    assert_eq!(file.main_class, "net.minecraft.client.main.Main");
    // Served from memory the second time
    store
        .get_version_file(Component::Minecraft, "1.8.9")
        .await
        .unwrap();
    assert!(meta_dir.join("net.minecraft/1.8.9.json").exists());
}

#[tokio::test]
async fn forced_refresh_forgets_loaded_version_files() {
    let server = MockServer::start().await;
    mount_catalog(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/net.minecraft/1.8.9.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "1.8.9",
            "mainClass": "net.minecraft.client.main.Main",
            "mainJar": { "name": "com.mojang:minecraft:1.8.9:client" },
            "assetIndex": { "id": "1.8" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    let meta_dir = tmp.path().join("meta");

    let store = store(&server, &meta_dir);
    store.load(false).await.unwrap();
    let first: MinecraftFile = store.get_version_meta(Component::Minecraft, "1.8.9").await.unwrap();
    assert_eq!(first.main_class, "net.minecraft.client.main.Main");

    let on_disk = meta_dir.join("net.minecraft/1.8.9.json");
    std::fs::write(
        &on_disk,
        json!({
            "version": "1.8.9",
            "mainClass": "net.minecraft.client.Minecraft",
            "mainJar": { "name": "com.mojang:minecraft:1.8.9:client" },
            "assetIndex": { "id": "1.8" }
        })
        .to_string(),
    )
    .unwrap();

    let remembered: MinecraftFile = store.get_version_meta(Component::Minecraft, "1.8.9").await.unwrap();
    assert_eq!(remembered.main_class, "net.minecraft.client.main.Main");

    assert_eq!(store.refresh().await.unwrap(), LoadOutcome::Refreshed);
    let reread: MinecraftFile = store.get_version_meta(Component::Minecraft, "1.8.9").await.unwrap();
    assert_eq!(reread.main_class, "net.minecraft.client.Minecraft");
}

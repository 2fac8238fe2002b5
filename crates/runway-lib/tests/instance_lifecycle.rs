mod common;

use runway_lib::auth::StaticAuthProvider;
use runway_lib::game::instance::{NewFabricInstance, NewInstance, DEFAULT_GROUP};
use runway_lib::game::metadata::Component;
use runway_lib::{InstanceError, LauncherContext, LauncherPaths};
use std::sync::Arc;
use tempfile::TempDir;

async fn context(base: &std::path::Path) -> LauncherContext {
    LauncherContext::initialize(
        LauncherPaths::new(base),
        Arc::new(StaticAuthProvider::new(None)),
    )
    .await
    .unwrap()
}

fn request(name: &str, fabric: bool) -> NewInstance {
    NewInstance {
        name: name.to_string(),
        group: None,
        minecraft_version: "1.16.1".to_string(),
        fabric: fabric.then(NewFabricInstance::default),
    }
}

#[tokio::test]
async fn create_pins_catalog_versions() {
    let tmp = TempDir::new().unwrap();
    common::write_catalog(&tmp.path().join("meta"));
    let ctx = context(tmp.path()).await;

    let instance = ctx
        .instances()
        .create(request("RSG Practice", true), ctx.metadata())
        .await
        .unwrap();

    assert_eq!(instance.id, "RSG_Practice");
    assert_eq!(instance.display_name, "RSG Practice");
    assert_eq!(instance.group, DEFAULT_GROUP);
    assert_eq!(instance.lwjgl.component, Component::Lwjgl3);
    assert_eq!(instance.lwjgl.version, "3.2.2");

    let fabric = instance.fabric.as_ref().unwrap();
    assert_eq!(fabric.loader_version, "0.16.10");
    assert_eq!(fabric.intermediary_type, "fabric");
    assert_eq!(fabric.intermediary_version, "1.16.1");

    assert!(tmp.path().join("instances/RSG_Practice/.minecraft").is_dir());
}

#[tokio::test]
async fn duplicate_names_get_suffixes() {
    let tmp = TempDir::new().unwrap();
    common::write_catalog(&tmp.path().join("meta"));
    let ctx = context(tmp.path()).await;

    let a = ctx.instances().create(request("SSG", false), ctx.metadata()).await.unwrap();
    let b = ctx.instances().create(request("SSG", false), ctx.metadata()).await.unwrap();
    let c = ctx.instances().create(request("SSG", false), ctx.metadata()).await.unwrap();

    assert_eq!(a.id, "SSG");
    assert_eq!(b.id, "SSG-2");
    assert_eq!(c.id, "SSG-3");
    assert!(a.fabric.is_none());

    let err = ctx
        .instances()
        .create(request("???", false), ctx.metadata())
        .await
        .unwrap_err();
    assert!(matches!(err, InstanceError::InvalidName));
}

#[tokio::test]
async fn registry_survives_reload() {
    let tmp = TempDir::new().unwrap();
    common::write_catalog(&tmp.path().join("meta"));

    {
        let ctx = context(tmp.path()).await;
        let instances = ctx.instances();
        instances.create(request("One", false), ctx.metadata()).await.unwrap();
        instances.create(request("Two", true), ctx.metadata()).await.unwrap();
        instances.rename("One", "First run").await.unwrap();
        instances.move_to_group("Two", "Fabric").await.unwrap();
    }

    let ctx = context(tmp.path()).await;
    let groups = ctx.instances().groups().await;
    assert_eq!(groups.keys().collect::<Vec<_>>(), vec![DEFAULT_GROUP, "Fabric"]);

    let one = ctx.instances().get("One").await.unwrap();
    assert_eq!(one.display_name, "First run");
    assert_eq!(one.group, DEFAULT_GROUP);

    let two = ctx.instances().get("Two").await.unwrap();
    assert_eq!(two.group, "Fabric");
    assert!(two.fabric.is_some());

    ctx.delete_instance("One").await.unwrap();
    assert!(ctx.instances().get("One").await.is_none());
    assert!(!tmp.path().join("instances/One").exists());
    assert_eq!(
        ctx.instances().groups().await.keys().collect::<Vec<_>>(),
        vec!["Fabric"]
    );
}

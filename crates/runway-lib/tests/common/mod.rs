#![allow(dead_code)]

use runway_lib::game::launcher::maven_to_path;
use serde_json::json;
use std::io::Write;
use std::path::Path;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn write_jar(path: &Path, entries: &[(&str, &str)]) {
    if let Some(p) = path.parent() {
        std::fs::create_dir_all(p).unwrap();
    }
    let f = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(f);
    use zip::write::FileOptions;
    for (name, data) in entries {
        zip.start_file::<&str, ()>(*name, FileOptions::default())
            .unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Place the jar of `coords` under `libraries_dir`
pub fn place_library(libraries_dir: &Path, coords: &str) {
    let path = libraries_dir.join(maven_to_path(coords).unwrap());
    write_jar(&path, &[("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n")]);
}

fn write_json(path: &Path, value: &serde_json::Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

pub const GAME_MAIN_CLASS: &str = "net.minecraft.client.main.Main";
pub const LOADER_MAIN_CLASS: &str = "net.fabricmc.loader.impl.launch.knot.KnotClient";

pub fn index_document() -> serde_json::Value {
    json!({
        "formatVersion": 1,
        "packages": [
            { "uid": "net.minecraft", "name": "Minecraft" },
            { "uid": "org.lwjgl3", "name": "LWJGL 3" },
            { "uid": "net.fabricmc.fabric-loader", "name": "Fabric Loader" },
            { "uid": "net.fabricmc.intermediary", "name": "Intermediary Mappings" }
        ]
    })
}

pub fn minecraft_versions() -> serde_json::Value {
    json!({
        "uid": "net.minecraft",
        "versions": [
            {
                "version": "1.16.1",
                "type": "release",
                "releaseTime": "2020-06-24T10:12:42+00:00",
                "recommended": true,
                "requires": [{ "uid": "org.lwjgl3", "suggests": "3.2.2" }],
                "compatibleIntermediaries": ["fabric"]
            },
            {
                "version": "1.8.9",
                "type": "release",
                "releaseTime": "2015-12-03T09:24:39+00:00",
                "requires": []
            }
        ]
    })
}

/// Fresh on-disk catalog for a 1.16.1 + LWJGL 3.2.2 + fabric stack under `meta_dir`
pub fn write_catalog(meta_dir: &Path) {
    let mut index = index_document();
    index["latestUpdate"] = json!(chrono::Utc::now().timestamp_millis());
    write_json(&meta_dir.join("index.json"), &index);

    write_json(&meta_dir.join("net.minecraft/index.json"), &minecraft_versions());
    write_json(
        &meta_dir.join("org.lwjgl3/index.json"),
        &json!({
            "uid": "org.lwjgl3",
            "versions": [{ "version": "3.2.2", "releaseTime": "2019-03-27T00:00:00+00:00" }]
        }),
    );
    write_json(
        &meta_dir.join("net.fabricmc.fabric-loader/index.json"),
        &json!({
            "uid": "net.fabricmc.fabric-loader",
            "versions": [
                { "version": "0.16.10", "releaseTime": "2025-01-05T00:00:00+00:00", "recommended": true },
                { "version": "0.16.11", "releaseTime": "2025-03-01T00:00:00+00:00" }
            ]
        }),
    );
    write_json(
        &meta_dir.join("net.fabricmc.intermediary/index.json"),
        &json!({
            "uid": "net.fabricmc.intermediary",
            "versions": [{ "version": "1.16.1", "releaseTime": "2020-06-24T10:12:42+00:00" }]
        }),
    );

    write_json(
        &meta_dir.join("net.minecraft/1.16.1.json"),
        &json!({
            "version": "1.16.1",
            "type": "release",
            "mainClass": GAME_MAIN_CLASS,
            "minecraftArguments": "--username ${auth_player_name} --version ${version_name} --gameDir ${game_directory} --assetsDir ${assets_root} --assetIndex ${assets_index_name} --uuid ${auth_uuid} --accessToken ${auth_access_token} --userType ${user_type} --versionType ${version_type}",
            "libraries": [{ "name": "org.apache.commons:commons-lang3:3.12.0" }],
            "mainJar": { "name": "com.mojang:minecraft:1.16.1:client" },
            "assetIndex": { "id": "1.16" },
            "compatibleJavaMajors": [8, 16, 17]
        }),
    );
    write_json(
        &meta_dir.join("org.lwjgl3/3.2.2.json"),
        &json!({
            "version": "3.2.2",
            "libraries": [
                { "name": "org.lwjgl:lwjgl:3.2.2" },
                { "name": "org.lwjgl:lwjgl:3.2.2:natives-linux" }
            ]
        }),
    );
    write_json(
        &meta_dir.join("net.fabricmc.fabric-loader/0.16.10.json"),
        &json!({
            "version": "0.16.10",
            "mainClass": LOADER_MAIN_CLASS,
            "libraries": [
                { "name": "net.fabricmc:fabric-loader:0.16.10" },
                { "name": "org.apache.commons:commons-lang3:3.17.0" }
            ]
        }),
    );
    write_json(
        &meta_dir.join("net.fabricmc.intermediary/1.16.1.json"),
        &json!({
            "version": "1.16.1",
            "libraries": [{ "type": "fabric", "name": "net.fabricmc:intermediary:1.16.1" }]
        }),
    );
}

/// Every jar the fixture catalog's 1.16.1 fabric stack needs
pub fn write_libraries(libraries_dir: &Path) {
    for coords in [
        "org.apache.commons:commons-lang3:3.12.0",
        "org.apache.commons:commons-lang3:3.17.0",
        "com.mojang:minecraft:1.16.1:client",
        "org.lwjgl:lwjgl:3.2.2",
        "net.fabricmc:fabric-loader:0.16.10",
        "net.fabricmc:intermediary:1.16.1",
    ] {
        place_library(libraries_dir, coords);
    }
    let native = libraries_dir.join(maven_to_path("org.lwjgl:lwjgl:3.2.2:natives-linux").unwrap());
    write_jar(
        &native,
        &[
            ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n"),
            ("linux/x64/org/lwjgl/liblwjgl.so", "elf"),
        ],
    );
}

/// Native library extraction for the launcher
use crate::error::ResolveError;
use crate::game::launcher::resolver::NativeArtifact;
use anyhow::{Context, Result};
use std::path::Path;

/// Wipe `natives_dir` and unpack every native jar into it.
///
/// Entries are flattened to their file name; later jars overwrite earlier
/// ones on a name clash. Entries under an exclude prefix are skipped.
pub async fn extract_natives(natives: &[NativeArtifact], natives_dir: &Path) -> Result<(), ResolveError> {
    reset_dir(natives_dir)
        .await
        .map_err(|source| ResolveError::Extraction {
            path: natives_dir.to_string_lossy().to_string(),
            source,
        })?;

    for native in natives {
        if !native.path.exists() {
            return Err(ResolveError::NativeNotFound {
                library: native.library.clone(),
                path: native.path.to_string_lossy().to_string(),
            });
        }

        log::debug!("Native extracting: {:?}", native.path);
        let jar = native.path.clone();
        let out = natives_dir.to_path_buf();
        let exclude = native.exclude.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_jar(&jar, &out, &exclude))
            .await
            .map_err(anyhow::Error::from)
            .and_then(|r| r);

        if let Err(source) = extracted {
            return Err(ResolveError::Extraction {
                path: native.path.to_string_lossy().to_string(),
                source,
            });
        }
    }

    Ok(())
}

async fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        tokio::fs::remove_dir_all(dir)
            .await
            .context(format!("Failed to clear natives directory {:?}", dir))?;
    }
    tokio::fs::create_dir_all(dir)
        .await
        .context(format!("Failed to create natives directory {:?}", dir))?;
    Ok(())
}

/// Extract a JAR file's file entries into a directory, flattened
fn extract_jar(jar_path: &Path, output_dir: &Path, exclusions: &[String]) -> Result<usize> {
    let file =
        std::fs::File::open(jar_path).context(format!("Failed to open JAR: {:?}", jar_path))?;

    let mut archive =
        zip::ZipArchive::new(file).context(format!("Failed to read JAR: {:?}", jar_path))?;

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        // Skip directories
        if entry.is_dir() {
            continue;
        }

        let entry_name = entry.name().to_string();
        if should_exclude(&entry_name, exclusions) {
            continue;
        }

        let Some(file_name) = Path::new(&entry_name).file_name() else {
            continue;
        };

        let output_path = output_dir.join(file_name);
        let mut output_file = std::fs::File::create(&output_path)
            .context(format!("Failed to create {:?}", output_path))?;
        std::io::copy(&mut entry, &mut output_file)?;
        count += 1;
    }

    log::debug!("Extracted {} files from {:?}", count, jar_path);
    Ok(count)
}

/// Check if a file should be excluded
fn should_exclude(file_path: &str, exclusions: &[String]) -> bool {
    exclusions
        .iter()
        .any(|exclusion| file_path.starts_with(exclusion.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_jar(path: &Path, entries: &[(&str, &str)]) {
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

    #[test]
    fn test_should_exclude() {
        let exclusions = vec!["META-INF/".to_string(), "module-info.class".to_string()];

        assert!(should_exclude("META-INF/MANIFEST.MF", &exclusions));
        assert!(should_exclude("module-info.class", &exclusions));
        assert!(!should_exclude("org/lwjgl/Library.class", &exclusions));
    }

    #[tokio::test]
    async fn wipes_then_flattens_entries() {
        let tmp = TempDir::new().expect("tmpdir");
        let natives_dir = tmp.path().join("natives");
        std::fs::create_dir_all(&natives_dir).unwrap();
        std::fs::write(natives_dir.join("stale.so"), b"old").unwrap();

        let jar = tmp.path().join("libs/lwjgl-natives-linux.jar");
        write_jar(
            &jar,
            &[
                ("linux/x64/org/lwjgl/liblwjgl.so", "lwjgl"),
                ("META-INF/MANIFEST.MF", "manifest"),
            ],
        );

        let natives = vec![NativeArtifact {
            library: "org.lwjgl:lwjgl:3.2.2:natives-linux".to_string(),
            path: jar,
            exclude: vec!["META-INF/".to_string()],
        }];
        extract_natives(&natives, &natives_dir).await.expect("extract failed");

        assert!(!natives_dir.join("stale.so").exists());
        assert_eq!(std::fs::read_to_string(natives_dir.join("liblwjgl.so")).unwrap(), "lwjgl");
        assert!(!natives_dir.join("MANIFEST.MF").exists());
    }

    #[tokio::test]
    async fn later_jar_overwrites_on_conflict() {
        let tmp = TempDir::new().expect("tmpdir");
        let natives_dir = tmp.path().join("natives");
        let first = tmp.path().join("a.jar");
        let second = tmp.path().join("b.jar");
        write_jar(&first, &[("libopenal.so", "first")]);
        write_jar(&second, &[("nested/libopenal.so", "second")]);

        let natives = vec![
            NativeArtifact {
                library: "a".to_string(),
                path: first,
                exclude: vec![],
            },
            NativeArtifact {
                library: "b".to_string(),
                path: second,
                exclude: vec![],
            },
        ];
        extract_natives(&natives, &natives_dir).await.unwrap();
        assert_eq!(std::fs::read_to_string(natives_dir.join("libopenal.so")).unwrap(), "second");
    }

    #[tokio::test]
    async fn missing_native_jar_is_fatal() {
        let tmp = TempDir::new().expect("tmpdir");
        let natives = vec![NativeArtifact {
            library: "org.lwjgl:lwjgl-platform:2.9.4".to_string(),
            path: tmp.path().join("nope.jar"),
            exclude: vec![],
        }];
        let err = extract_natives(&natives, &tmp.path().join("natives"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NativeNotFound { .. }));
    }
}

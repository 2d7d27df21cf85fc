//! Basic tests for the native FileSystem implementation.

use refprune_fs::{DiscoveryOptions, FileSystem, NativeFileSystem};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[tokio::test]
async fn test_native_read_write() {
    let temp_dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::new(temp_dir.path()).unwrap();

    let test_file = temp_dir.path().join("App.csproj");
    fs.write(&test_file, "<Project />").await.unwrap();

    let read_back = fs.read_to_string(&test_file).await.unwrap();
    assert_eq!(read_back, "<Project />");
    assert!(fs.is_file(&test_file).await.unwrap());
}

#[tokio::test]
async fn test_native_rename_replaces_target() {
    let temp_dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::new(temp_dir.path()).unwrap();

    let target = temp_dir.path().join("App.csproj");
    let temp = temp_dir.path().join("App.csproj.tmp");
    fs.write(&target, "old").await.unwrap();
    fs.write(&temp, "new").await.unwrap();

    fs.rename(&temp, &target).await.unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    assert!(!fs.exists(&temp).await.unwrap());
}

#[tokio::test]
async fn test_native_discover_manifests() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("src/App")).unwrap();
    fs::create_dir_all(root.join("src/Lib/obj")).unwrap();
    fs::create_dir_all(root.join("tests/App.Tests")).unwrap();
    fs::write(root.join("src/App/App.csproj"), "<Project />").unwrap();
    fs::write(root.join("src/App/Program.cs"), "").unwrap();
    fs::write(root.join("src/Lib/Lib.FSPROJ"), "<Project />").unwrap();
    fs::write(root.join("src/Lib/obj/Lib.csproj"), "<Project />").unwrap();
    fs::write(root.join("tests/App.Tests/App.Tests.csproj"), "<Project />").unwrap();

    let fs = NativeFileSystem::new(root).unwrap();
    let found = fs
        .discover_files(root, &[".csproj", ".fsproj"], &DiscoveryOptions::default())
        .await
        .unwrap();

    let names: Vec<String> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["App.csproj", "Lib.FSPROJ", "App.Tests.csproj"]);
}

#[tokio::test]
async fn test_native_rejects_path_traversal() {
    let temp_dir = TempDir::new().unwrap();
    let inner = temp_dir.path().join("inner");
    fs::create_dir_all(&inner).unwrap();
    fs::write(temp_dir.path().join("secret.csproj"), "x").unwrap();

    let fs = NativeFileSystem::new(&inner).unwrap();
    let err = fs
        .read_to_string(Path::new("../secret.csproj"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_native_canonicalize_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::new(temp_dir.path()).unwrap();

    let err = fs
        .canonicalize(&temp_dir.path().join("Missing.csproj"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}

//! Integration tests for project graph construction

mod common;

use common::{build, manifest, names, write};
use refprune_deps::{traversal, Error, StructuralError};
use tempfile::TempDir;

#[tokio::test]
async fn test_build_links_projects_and_finds_roots() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "src/App/App.csproj",
        &manifest("net8.0", &[("Serilog", "3.1.1")], &[r"..\Lib\Lib.csproj"]),
    );
    write(root, "src/Lib/Lib.csproj", &manifest("netstandard2.0", &[("Serilog", "3.1.1")], &[]));
    write(
        root,
        "tests/App.Tests/App.Tests.csproj",
        &manifest("net8.0", &[("xunit", "2.6.2")], &[r"..\..\src\App\App.csproj"]),
    );

    let model = build(&dir).await.unwrap();
    assert_eq!(names(&model), vec!["App", "Lib", "App.Tests"]);

    let roots: Vec<&str> = model.roots().map(|p| p.name.as_str()).collect();
    assert_eq!(roots, vec!["App.Tests"]);

    // Serilog 3.1.1 is declared twice but registered once
    assert_eq!(model.packages().count(), 2);

    let tests = model.roots().next().unwrap();
    let below: Vec<&str> = traversal::enumerate(&model, tests.id, false)
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(below, vec!["App", "Lib"]);

    let app = model.find(&model.project(tests.project_references[0].project).path).unwrap();
    assert_eq!(app.name, "App");
    assert_eq!(app.target_frameworks[0].moniker, "net8.0");
    assert_eq!(app.package("serilog").unwrap().version_text, "3.1.1");
}

#[tokio::test]
async fn test_cycle_is_rejected_with_its_path() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "A/A.csproj", &manifest("net8.0", &[], &["../B/B.csproj"]));
    write(dir.path(), "B/B.csproj", &manifest("net8.0", &[], &["../A/A.csproj"]));

    let err = build(&dir).await.unwrap_err();
    let Error::Structural(StructuralError::Cycle { cycle }) = err else {
        panic!("expected a cycle error, got {err:?}");
    };
    let files: Vec<String> = cycle
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec!["A.csproj", "B.csproj", "A.csproj"]);
}

#[tokio::test]
async fn test_missing_reference_fails_build() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App/App.csproj", &manifest("net8.0", &[], &["../Gone/Gone.csproj"]));

    let err = build(&dir).await.unwrap_err();
    assert!(
        matches!(err, Error::Structural(StructuralError::MissingProject { ref include, .. }) if include == "../Gone/Gone.csproj"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_reference_outside_root_fails_build() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Outside/Outside.csproj", &manifest("net8.0", &[], &[]));
    write(
        dir.path(),
        "repo/App/App.csproj",
        &manifest("net8.0", &[], &[r"..\..\Outside\Outside.csproj"]),
    );

    let repo = dir.path().join("repo");
    let err = refprune_deps::GraphBuilder::native(&repo)
        .unwrap()
        .build(&repo)
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Structural(StructuralError::OutsideRoot { .. })),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_build_output_directories_are_skipped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App/App.csproj", &manifest("net8.0", &[], &[]));
    write(dir.path(), "App/obj/App.csproj", "not xml at all");
    write(dir.path(), "App/bin/Debug/App.csproj", "not xml at all");

    let model = build(&dir).await.unwrap();
    assert_eq!(names(&model), vec!["App"]);
}

#[tokio::test]
async fn test_unparseable_manifest_fails_build() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App/App.csproj", "<Project><ItemGroup></Project>");

    let err = build(&dir).await.unwrap_err();
    assert!(
        matches!(err, Error::Structural(StructuralError::Unparseable { .. })),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_empty_directory_builds_empty_model() {
    let dir = TempDir::new().unwrap();
    let model = build(&dir).await.unwrap();
    assert!(model.is_empty());
    assert_eq!(model.roots().count(), 0);
}

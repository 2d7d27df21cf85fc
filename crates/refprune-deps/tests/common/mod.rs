//! Fixture helpers shared by the integration tests

#![allow(dead_code)]

use refprune_deps::{GraphBuilder, Model};
use std::path::Path;
use tempfile::TempDir;

/// Render a minimal SDK-style manifest
pub fn manifest(framework: &str, packages: &[(&str, &str)], references: &[&str]) -> String {
    let mut xml = String::from("<Project Sdk=\"Microsoft.NET.Sdk\">\n");
    xml.push_str(&format!(
        "  <PropertyGroup>\n    <TargetFramework>{framework}</TargetFramework>\n  </PropertyGroup>\n"
    ));
    if !packages.is_empty() {
        xml.push_str("  <ItemGroup>\n");
        for (name, version) in packages {
            xml.push_str(&format!(
                "    <PackageReference Include=\"{name}\" Version=\"{version}\" />\n"
            ));
        }
        xml.push_str("  </ItemGroup>\n");
    }
    if !references.is_empty() {
        xml.push_str("  <ItemGroup>\n");
        for include in references {
            xml.push_str(&format!("    <ProjectReference Include=\"{include}\" />\n"));
        }
        xml.push_str("  </ItemGroup>\n");
    }
    xml.push_str("</Project>\n");
    xml
}

/// Write `contents` at `relative` under `root`, creating directories
pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Build the model of everything under `dir`
pub async fn build(dir: &TempDir) -> refprune_deps::Result<Model> {
    GraphBuilder::native(dir.path())?.build(dir.path()).await
}

/// Project names in model order
pub fn names(model: &Model) -> Vec<String> {
    model.projects().map(|p| p.name.clone()).collect()
}

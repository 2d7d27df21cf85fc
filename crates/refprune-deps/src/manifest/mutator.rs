//! Structural edits on a parsed manifest

use super::document::{Document, NodeId};
use crate::error::{MutationError, ReferenceKind};

/// Applies edits to one project's manifest document.
///
/// Edits aimed at a reference that isn't declared fail with
/// [`MutationError::MissingReference`] and leave the document unchanged.
pub struct ManifestMutator<'a> {
    document: &'a mut Document,
    project: &'a str,
}

type Result<T> = std::result::Result<T, MutationError>;

impl<'a> ManifestMutator<'a> {
    /// Edit `document`, naming `project` in errors
    pub fn new(document: &'a mut Document, project: &'a str) -> Self {
        Self { document, project }
    }

    fn root(&self) -> Result<NodeId> {
        self.document
            .root()
            .ok_or_else(|| MutationError::NoRootElement {
                project: self.project.to_string(),
            })
    }

    fn missing(&self, kind: ReferenceKind, reference: &str) -> MutationError {
        MutationError::MissingReference {
            project: self.project.to_string(),
            kind,
            reference: reference.to_string(),
        }
    }

    /// First reference element of `kind` whose `Include` matches `name`
    pub fn find_reference(&self, kind: ReferenceKind, name: &str) -> Option<NodeId> {
        let root = self.document.root()?;
        self.document
            .descendants_named(root, kind.element_name())
            .into_iter()
            .find(|node| {
                self.document
                    .attribute(*node, "Include")
                    .is_some_and(|include| same_reference(kind, &include, name))
            })
    }

    fn require_reference(&self, kind: ReferenceKind, name: &str) -> Result<NodeId> {
        self.find_reference(kind, name)
            .ok_or_else(|| self.missing(kind, name))
    }

    /// Set the version of a package reference, in whichever form it is declared
    pub fn set_reference_version(&mut self, name: &str, version: &str) -> Result<()> {
        let node = self.require_reference(ReferenceKind::Package, name)?;
        self.write_version(node, version);
        Ok(())
    }

    fn write_version(&mut self, node: NodeId, version: &str) {
        let has_attribute = self.document.attribute(node, "Version").is_some();
        let element = self.document.children_named(node, "Version").next();
        match element {
            Some(child) if !has_attribute => self.document.set_text(child, version),
            _ => self.document.set_attribute(node, "Version", version),
        }
    }

    /// Swap a package reference for another package
    pub fn replace_reference(&mut self, old_name: &str, new_name: &str, version: &str) -> Result<()> {
        let node = self.require_reference(ReferenceKind::Package, old_name)?;
        self.document.set_attribute(node, "Include", new_name);
        self.write_version(node, version);
        Ok(())
    }

    /// Remove a reference, and its item group when nothing else is left in it
    pub fn remove_reference(&mut self, kind: ReferenceKind, name: &str) -> Result<()> {
        let node = self.require_reference(kind, name)?;
        let parent = self.document.parent(node);
        self.document.detach(node);

        if let Some(group) = parent {
            if self.document.is_named(group, "ItemGroup")
                && self.document.child_elements(group).next().is_none()
            {
                self.document.detach(group);
            }
        }
        Ok(())
    }

    /// Add or update a property, creating a property group if needed
    pub fn set_property(&mut self, name: &str, value: &str) -> Result<()> {
        let root = self.root()?;
        if let Some(existing) = self.find_property(root, name) {
            self.document.set_text(existing, value);
            return Ok(());
        }

        let first_group = self.document.children_named(root, "PropertyGroup").next();
        let group = match first_group {
            Some(group) => group,
            None => {
                let group = self.document.create_element("PropertyGroup");
                let first_element = self
                    .document
                    .children(root)
                    .iter()
                    .position(|c| self.document.element(*c).is_some())
                    .unwrap_or(self.document.children(root).len());
                self.document.insert_child(root, first_element, group);
                group
            }
        };

        let property = self.document.create_element(name);
        self.document.set_text(property, value);
        self.document.append_child(group, property);
        Ok(())
    }

    fn find_property(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.document
            .children_named(root, "PropertyGroup")
            .find_map(|group| self.document.children_named(group, name).next())
    }

    /// Remove every declaration of a property; returns whether one existed
    pub fn remove_property(&mut self, name: &str) -> Result<bool> {
        let root = self.root()?;
        let declared: Vec<NodeId> = self
            .document
            .children_named(root, "PropertyGroup")
            .flat_map(|group| self.document.children_named(group, name).collect::<Vec<_>>())
            .collect();
        for node in &declared {
            self.document.detach(*node);
        }
        Ok(!declared.is_empty())
    }

    /// Add a reference to the first item group already holding that kind of
    /// reference, or to a new trailing item group. An existing reference to
    /// the same target only has its version updated.
    pub fn add_reference(
        &mut self,
        kind: ReferenceKind,
        include: &str,
        version: Option<&str>,
    ) -> Result<NodeId> {
        if let Some(existing) = self.find_reference(kind, include) {
            if let Some(version) = version {
                self.write_version(existing, version);
            }
            return Ok(existing);
        }

        let group = self.preferred_item_group(kind.element_name())?;
        let node = self.document.create_element(kind.element_name());
        self.document.set_attribute(node, "Include", include);
        if let Some(version) = version {
            self.document.set_attribute(node, "Version", version);
        }
        self.document.append_child(group, node);
        Ok(node)
    }

    /// Ship a file inside the package: `<None Include=".." Pack="true" PackagePath=".." />`
    pub fn add_packaged_file(&mut self, include: &str, package_path: &str) -> Result<NodeId> {
        let root = self.root()?;
        let existing = self
            .document
            .descendants_named(root, "None")
            .into_iter()
            .find(|n| {
                self.document
                    .attribute(*n, "Include")
                    .is_some_and(|i| same_path(&i, include))
            });

        let node = match existing {
            Some(node) => node,
            None => {
                let group = self.preferred_item_group("None")?;
                let node = self.document.create_element("None");
                self.document.set_attribute(node, "Include", include);
                self.document.append_child(group, node);
                node
            }
        };
        self.document.set_attribute(node, "Pack", "true");
        self.document.set_attribute(node, "PackagePath", package_path);
        Ok(node)
    }

    fn preferred_item_group(&mut self, item: &str) -> Result<NodeId> {
        let root = self.root()?;
        let existing = self
            .document
            .children_named(root, "ItemGroup")
            .find(|group| self.document.children_named(*group, item).next().is_some());
        if let Some(group) = existing {
            return Ok(group);
        }

        let group = self.document.create_element("ItemGroup");
        self.document.append_child(root, group);
        Ok(group)
    }
}

fn same_reference(kind: ReferenceKind, declared: &str, wanted: &str) -> bool {
    match kind {
        ReferenceKind::Package => declared.trim().eq_ignore_ascii_case(wanted.trim()),
        ReferenceKind::Project => same_path(declared, wanted),
    }
}

fn same_path(a: &str, b: &str) -> bool {
    a.trim().replace('\\', "/").eq_ignore_ascii_case(&b.trim().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>net8.0</TargetFramework>
  </PropertyGroup>
  <ItemGroup>
    <PackageReference Include="Serilog" Version="3.1.1" />
    <PackageReference Include="Polly">
      <Version>8.2.0</Version>
    </PackageReference>
  </ItemGroup>
  <ItemGroup>
    <ProjectReference Include="..\Lib\Lib.csproj" />
  </ItemGroup>
</Project>
"#;

    fn edit(f: impl FnOnce(&mut ManifestMutator<'_>)) -> String {
        let mut doc = Document::parse(MANIFEST).unwrap();
        f(&mut ManifestMutator::new(&mut doc, "App"));
        doc.to_xml()
    }

    #[test]
    fn test_set_version_attribute_and_child() {
        let output = edit(|m| {
            m.set_reference_version("serilog", "4.0.0").unwrap();
            m.set_reference_version("Polly", "8.4.1").unwrap();
        });
        assert!(output.contains(r#"<PackageReference Include="Serilog" Version="4.0.0" />"#));
        assert!(output.contains("<Version>8.4.1</Version>"));
    }

    #[test]
    fn test_replace_reference() {
        let output = edit(|m| m.replace_reference("Serilog", "Serilog.AspNetCore", "8.0.0").unwrap());
        assert!(output.contains(r#"<PackageReference Include="Serilog.AspNetCore" Version="8.0.0" />"#));
        assert!(!output.contains(r#"Include="Serilog""#));
    }

    #[test]
    fn test_remove_last_reference_drops_group() {
        let output = edit(|m| {
            m.remove_reference(ReferenceKind::Project, "../lib/Lib.csproj")
                .unwrap()
        });
        assert!(!output.contains("ProjectReference"));
        assert_eq!(output.matches("<ItemGroup>").count(), 1);
    }

    #[test]
    fn test_remove_keeps_non_empty_group() {
        let output = edit(|m| m.remove_reference(ReferenceKind::Package, "Polly").unwrap());
        assert!(!output.contains("Polly"));
        assert!(output.contains("Serilog"));
        assert_eq!(output.matches("<ItemGroup>").count(), 2);
    }

    #[test]
    fn test_missing_reference_is_an_error() {
        let mut doc = Document::parse(MANIFEST).unwrap();
        let before = doc.to_xml();
        let err = ManifestMutator::new(&mut doc, "App")
            .remove_reference(ReferenceKind::Package, "Newtonsoft.Json")
            .unwrap_err();
        assert!(matches!(err, MutationError::MissingReference { .. }));
        assert!(err.to_string().contains("App"));
        assert!(err.to_string().contains("Newtonsoft.Json"));
        assert_eq!(doc.to_xml(), before);
    }

    #[test]
    fn test_set_property_canonical_position() {
        let output = edit(|m| {
            m.set_property("Nullable", "enable").unwrap();
            m.set_property("OutputType", "Exe").unwrap();
            m.set_property("TargetFramework", "net9.0").unwrap();
        });
        assert!(output.contains(
            "    <OutputType>Exe</OutputType>\n    <TargetFramework>net9.0</TargetFramework>\n    <Nullable>enable</Nullable>\n"
        ));
    }

    #[test]
    fn test_set_property_creates_group() {
        let mut doc = Document::parse("<Project>\n  <ItemGroup />\n</Project>\n").unwrap();
        ManifestMutator::new(&mut doc, "App")
            .set_property("IsPackable", "false")
            .unwrap();
        assert_eq!(
            doc.to_xml(),
            "<Project>\n  <PropertyGroup>\n    <IsPackable>false</IsPackable>\n  </PropertyGroup>\n  <ItemGroup />\n</Project>\n"
        );
    }

    #[test]
    fn test_remove_property() {
        let mut doc = Document::parse(MANIFEST).unwrap();
        let mut mutator = ManifestMutator::new(&mut doc, "App");
        assert!(mutator.remove_property("TargetFramework").unwrap());
        assert!(!mutator.remove_property("TargetFramework").unwrap());
    }

    #[test]
    fn test_add_reference_prefers_matching_group() {
        let output = edit(|m| {
            m.add_reference(ReferenceKind::Project, "..\\Core\\Core.csproj", None)
                .unwrap();
            m.add_reference(ReferenceKind::Package, "Dapper", Some("2.1.35"))
                .unwrap();
        });
        assert!(output.contains(
            "    <ProjectReference Include=\"..\\Lib\\Lib.csproj\" />\n    <ProjectReference Include=\"..\\Core\\Core.csproj\" />\n"
        ));
        assert!(output.contains(
            "    </PackageReference>\n    <PackageReference Include=\"Dapper\" Version=\"2.1.35\" />\n"
        ));
    }

    #[test]
    fn test_add_packaged_file_creates_trailing_group() {
        let output = edit(|m| {
            m.add_packaged_file("README.md", "\\").unwrap();
        });
        assert!(output.ends_with(
            "  <ItemGroup>\n    <None Include=\"README.md\" Pack=\"true\" PackagePath=\"\\\" />\n  </ItemGroup>\n</Project>\n"
        ));
    }
}

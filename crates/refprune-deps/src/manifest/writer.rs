//! Deterministic manifest serializer
//!
//! Output is a pure function of the document: property groups are put in
//! canonical order, everything is re-indented with two spaces and empty
//! items on the allow-list are written self-closing. Writing a re-parsed
//! output again yields the same bytes.

use super::document::{Document, LineEnding, NodeId, NodeKind};

/// Properties in the order they are written inside a `<PropertyGroup>`.
/// Properties not listed follow in their original order.
pub const CANONICAL_PROPERTY_ORDER: &[&str] = &[
    "OutputType",
    "TargetFramework",
    "TargetFrameworks",
    "RuntimeIdentifier",
    "RuntimeIdentifiers",
    "LangVersion",
    "Nullable",
    "ImplicitUsings",
    "RootNamespace",
    "AssemblyName",
    "IsPackable",
    "PackageId",
    "Version",
    "VersionPrefix",
    "VersionSuffix",
    "Authors",
    "Company",
    "Product",
    "Description",
    "Copyright",
    "PackageTags",
    "PackageProjectUrl",
    "RepositoryUrl",
    "PackageLicenseExpression",
    "PackageReadmeFile",
    "PackageIcon",
    "GeneratePackageOnBuild",
    "GenerateDocumentationFile",
    "TreatWarningsAsErrors",
];

/// Elements written as `<X />` whenever they have no content
pub const SELF_CLOSING_ELEMENTS: &[&str] = &[
    "PackageReference",
    "ProjectReference",
    "PackageVersion",
    "FrameworkReference",
    "Reference",
    "Compile",
    "Content",
    "None",
    "EmbeddedResource",
    "Folder",
    "Using",
    "InternalsVisibleTo",
];

const INDENT: &str = "  ";

impl Document {
    /// Serialize the document
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push('\u{feff}');
        }
        if let Some(declaration) = &self.declaration {
            out.push_str(declaration);
            out.push('\n');
        }
        for child in self.children(self.document_node()) {
            write_node(self, *child, 0, &mut out);
        }
        if !self.trailing_newline && out.ends_with('\n') {
            out.pop();
        }

        match self.line_ending {
            LineEnding::Lf => out,
            LineEnding::CrLf => out.replace('\n', "\r\n"),
        }
    }
}

fn write_node(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    match doc.kind(id) {
        NodeKind::Document => {}
        NodeKind::Element(element) => {
            out.push_str(&indent);
            out.push('<');
            out.push_str(&element.name);
            for (name, raw) in &element.attributes {
                let quote = if raw.contains('"') { '\'' } else { '"' };
                out.push(' ');
                out.push_str(name);
                out.push('=');
                out.push(quote);
                out.push_str(raw);
                out.push(quote);
            }

            let children = ordered_children(doc, id);
            if children.is_empty() {
                if element.self_closing || is_self_closing(&element.name) {
                    out.push_str(" />");
                } else {
                    out.push_str("></");
                    out.push_str(&element.name);
                    out.push('>');
                }
            } else if children.iter().all(|c| is_character_data(doc, *c)) {
                out.push('>');
                for child in &children {
                    match doc.kind(*child) {
                        NodeKind::Text(raw) => out.push_str(raw),
                        NodeKind::CData(raw) => write_cdata(raw, out),
                        _ => {}
                    }
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            } else {
                out.push_str(">\n");
                for child in &children {
                    write_node(doc, *child, depth + 1, out);
                }
                out.push_str(&indent);
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
            out.push('\n');
        }
        NodeKind::Text(raw) => {
            out.push_str(&indent);
            out.push_str(raw.trim());
            out.push('\n');
        }
        NodeKind::CData(raw) => {
            out.push_str(&indent);
            write_cdata(raw, out);
            out.push('\n');
        }
        NodeKind::Comment(raw) => {
            out.push_str(&indent);
            out.push_str("<!--");
            out.push_str(raw);
            out.push_str("-->\n");
        }
        NodeKind::Instruction(raw) => {
            out.push_str(&indent);
            out.push_str("<?");
            out.push_str(raw);
            out.push_str("?>\n");
        }
        NodeKind::DocType(raw) => {
            out.push_str(&indent);
            out.push_str("<!DOCTYPE ");
            out.push_str(raw);
            out.push_str(">\n");
        }
    }
}

fn write_cdata(raw: &str, out: &mut String) {
    out.push_str("<![CDATA[");
    out.push_str(raw);
    out.push_str("]]>");
}

fn is_character_data(doc: &Document, id: NodeId) -> bool {
    matches!(doc.kind(id), NodeKind::Text(_) | NodeKind::CData(_))
}

fn is_self_closing(name: &str) -> bool {
    SELF_CLOSING_ELEMENTS
        .iter()
        .any(|n| n.eq_ignore_ascii_case(name))
}

fn canonical_rank(doc: &Document, id: NodeId) -> usize {
    doc.name(id)
        .and_then(|name| {
            CANONICAL_PROPERTY_ORDER
                .iter()
                .position(|p| p.eq_ignore_ascii_case(name))
        })
        .unwrap_or(usize::MAX)
}

/// Children in output order. Inside a property group, comments and other
/// non-element nodes move with the element that follows them; whatever
/// trails the last element stays last.
fn ordered_children(doc: &Document, id: NodeId) -> Vec<NodeId> {
    let children = doc.children(id);
    if !doc.is_named(id, "PropertyGroup") {
        return children.to_vec();
    }

    let mut units: Vec<(usize, Vec<NodeId>)> = Vec::new();
    let mut pending = Vec::new();
    for child in children {
        pending.push(*child);
        if doc.element(*child).is_some() {
            units.push((canonical_rank(doc, *child), std::mem::take(&mut pending)));
        }
    }
    units.sort_by_key(|(rank, _)| *rank);

    let mut ordered: Vec<NodeId> = units.into_iter().flat_map(|(_, nodes)| nodes).collect();
    ordered.extend(pending);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(text: &str) -> String {
        Document::parse(text).unwrap().to_xml()
    }

    #[test]
    fn test_reindents_with_two_spaces() {
        let output = rewrite(
            "<Project>\n\t<ItemGroup>\n\t\t\t<PackageReference Include=\"A\" Version=\"1.0\"/>\n</ItemGroup></Project>\n",
        );
        assert_eq!(
            output,
            "<Project>\n  <ItemGroup>\n    <PackageReference Include=\"A\" Version=\"1.0\" />\n  </ItemGroup>\n</Project>\n"
        );
    }

    #[test]
    fn test_canonical_property_order_with_comments() {
        let output = rewrite(
            r#"<Project>
  <PropertyGroup>
    <Custom>x</Custom>
    <Nullable>enable</Nullable>
    <!-- keep in sync with the build image -->
    <TargetFramework>net8.0</TargetFramework>
    <OutputType>Exe</OutputType>
    <Another>y</Another>
    <!-- trailing -->
  </PropertyGroup>
</Project>
"#,
        );
        assert_eq!(
            output,
            r#"<Project>
  <PropertyGroup>
    <OutputType>Exe</OutputType>
    <!-- keep in sync with the build image -->
    <TargetFramework>net8.0</TargetFramework>
    <Nullable>enable</Nullable>
    <Custom>x</Custom>
    <Another>y</Another>
    <!-- trailing -->
  </PropertyGroup>
</Project>
"#
        );
    }

    #[test]
    fn test_self_closing_allow_list() {
        let output = rewrite(
            "<Project><ItemGroup><PackageReference Include=\"A\"></PackageReference><Weird></Weird><Odd/></ItemGroup></Project>",
        );
        assert_eq!(
            output,
            "<Project>\n  <ItemGroup>\n    <PackageReference Include=\"A\" />\n    <Weird></Weird>\n    <Odd />\n  </ItemGroup>\n</Project>"
        );
    }

    #[test]
    fn test_preserves_declaration_bom_and_crlf() {
        let input = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n<Project>\r\n  <PropertyGroup>\r\n    <Version>1.0.0</Version>\r\n  </PropertyGroup>\r\n</Project>\r\n";
        assert_eq!(rewrite(input), input);
    }

    #[test]
    fn test_preserves_escapes_and_single_quotes() {
        let input = "<Project>\n  <PropertyGroup Condition=\"'$(Configuration)' == 'Release'\">\n    <Description>A &amp; B &lt;C&gt;</Description>\n  </PropertyGroup>\n  <Target Name=\"X\" Condition='\"a\" != \"\"' />\n</Project>\n";
        assert_eq!(rewrite(input), input);
    }

    #[test]
    fn test_mixed_content_and_cdata() {
        let input = "<Project>\n  <Target Name=\"T\">\n    loose text\n    <Exec Command=\"echo\" />\n  </Target>\n  <PropertyGroup>\n    <Script><![CDATA[a < b]]></Script>\n  </PropertyGroup>\n</Project>\n";
        assert_eq!(rewrite(input), input);
    }

    #[test]
    fn test_writer_output_is_a_fixed_point() {
        let messy = r#"<?xml version="1.0"?>
<!-- header -->
<Project Sdk="Microsoft.NET.Sdk">
<PropertyGroup><Authors>me</Authors><TargetFrameworks>net7.0;net8.0</TargetFrameworks>
      <!-- why -->
   <LangVersion>latest</LangVersion></PropertyGroup>
  <ItemGroup>
        <PackageReference Include="A" Version="1.0"></PackageReference>
    <None Include="README.md" Pack="true" PackagePath="\"/>
  </ItemGroup>
</Project>"#;
        let once = rewrite(messy);
        let twice = rewrite(&once);
        assert_eq!(once, twice);
        assert!(!once.ends_with('\n'));
    }
}

//! Rust source rendering for page artifacts
//!
//! A rendered page object embeds its artifact as JSON and wraps a
//! [`LivePage`](crate::page::LivePage) with one typed method per operation.

use crate::{
    error::Result,
    generator::{
        artifact::{ElementField, Operation, PageArtifact},
        naming::{NameAllocator, package_dir, to_snake_case},
    },
};
use std::{fs, path::{Path, PathBuf}};

/// Render an artifact as a Rust module
pub fn render_rust(artifact: &PageArtifact) -> Result<String> {
    let json = artifact.to_json()?;
    let hashes = "#".repeat(raw_string_hashes(&json));
    let class = artifact.class_name();

    let mut out = String::new();
    out.push_str(&format!("//! Page object for <{}>\n", artifact.source_url()));
    out.push_str("//!\n");
    out.push_str(&format!("//! Generated by pom-gen into `{}`.\n", artifact.package()));
    out.push('\n');
    out.push_str("use pom_gen::{Driver, LivePage, PageArtifact, Result};\n\n");
    out.push_str(&format!("const ARTIFACT: &str = r{h}\"{json}\"{h};\n", h = hashes, json = json));
    out.push('\n');
    out.push_str(&format!("pub struct {}<'d, D: Driver> {{\n", class));
    out.push_str("    page: LivePage<'d, D>,\n");
    out.push_str("}\n\n");
    out.push_str(&format!("impl<'d, D: Driver> {}<'d, D> {{\n", class));

    let doc = match artifact.title_check() {
        Some(title) => format!("    /// Bind to the live page; fails unless its title contains {:?}\n", title),
        None => "    /// Bind to the live page\n".to_string(),
    };
    out.push_str(&doc);
    out.push_str("    pub fn new(driver: &'d D) -> Result<Self> {\n");
    out.push_str("        let artifact = PageArtifact::from_json(ARTIFACT)?;\n");
    out.push_str("        Ok(Self { page: LivePage::bind(driver, artifact)? })\n");
    out.push_str("    }\n");

    let mut methods = NameAllocator::new();
    for field in artifact.fields() {
        for operation in &field.operations {
            out.push('\n');
            render_operation(&mut out, &mut methods, field, operation);
        }
    }

    out.push_str("}\n");
    Ok(out)
}

fn render_operation(out: &mut String, methods: &mut NameAllocator, field: &ElementField, operation: &Operation) {
    let f = to_snake_case(&field.name);
    let name = &field.name;
    let (method, args, ret, call) = match operation {
        Operation::SetValue => (format!("set_{}", f), ", text: &str", "()", format!("set_value({:?}, text)", name)),
        Operation::GetValue => (format!("{}_value", f), "", "Option<String>", format!("value({:?})", name)),
        Operation::Check => (format!("check_{}", f), "", "()", format!("check({:?})", name)),
        Operation::Uncheck => (format!("uncheck_{}", f), "", "()", format!("uncheck({:?})", name)),
        Operation::IsChecked => (format!("is_{}_checked", f), "", "bool", format!("is_checked({:?})", name)),
        Operation::Click => (format!("click_{}", f), "", "()", format!("click({:?})", name)),
        Operation::IsEnabled => (format!("is_{}_enabled", f), "", "bool", format!("is_enabled({:?})", name)),
        Operation::GetHref => (format!("{}_href", f), "", "Option<String>", format!("href({:?})", name)),
        Operation::SelectByText => {
            (format!("select_{}_by_text", f), ", text: &str", "()", format!("select_by_text({:?}, text)", name))
        }
        Operation::SelectByValue => {
            (format!("select_{}_by_value", f), ", value: &str", "()", format!("select_by_value({:?}, value)", name))
        }
        Operation::GetSelectedText => (format!("{}_selected_text", f), "", "String", format!("selected_text({:?})", name)),
        Operation::GetText => (format!("{}_text", f), "", "String", format!("text({:?})", name)),
        Operation::NavigateTo { method, .. } => (to_snake_case(method), "", "()", format!("navigate({:?})", name)),
    };
    let method = methods.reserve(method);

    let doc = match operation {
        Operation::NavigateTo { target, .. } => format!("    /// Click `{}` through to `{}`\n", name, target),
        _ => format!("    /// {} {} located by {}\n", operation.name(), name, field.locator),
    };
    out.push_str(&doc);
    out.push_str(&format!("    pub fn {}(&self{}) -> Result<{}> {{\n", method, args, ret));
    out.push_str(&format!("        self.page.{}\n", call));
    out.push_str("    }\n");
}

/// Hash count that makes a raw string literal safe for `content`
fn raw_string_hashes(content: &str) -> usize {
    let mut longest = 0;
    let mut run: Option<usize> = None;
    for c in content.chars() {
        match (c, run) {
            ('"', _) => run = Some(0),
            ('#', Some(n)) => {
                run = Some(n + 1);
                longest = longest.max(n + 1);
            }
            _ => run = None,
        }
    }
    longest + 1
}

/// Write the rendered source under `dir`, in the artifact's package directory
pub fn write_source(dir: &Path, artifact: &PageArtifact) -> Result<PathBuf> {
    let directory = dir.join(package_dir(artifact.package()));
    fs::create_dir_all(&directory)?;

    let path = directory.join(format!("{}.rs", to_snake_case(artifact.class_name())));
    fs::write(&path, render_rust(artifact)?)?;
    log::info!("Saved page object to file: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collector::ElementKey, generator::locator::{ElementRole, infer_locator}};

    fn artifact() -> PageArtifact {
        let key = ElementKey::id("q");
        let mut link = ElementField {
            name: "about".into(),
            locator: infer_locator(&ElementKey::id("about")),
            key: ElementKey::id("about"),
            role: ElementRole::Link,
            operations: ElementRole::Link.operations(),
        };
        link.operations.push(Operation::NavigateTo { target: "AboutPage".into(), method: "navigateToAboutPage".into() });

        PageArtifact::new(
            "HomePage",
            "pages.com.example",
            "https://example.com/",
            Some("Search \"#1\"".into()),
            vec![
                ElementField {
                    name: "q".into(),
                    locator: infer_locator(&key),
                    key,
                    role: ElementRole::TextInput,
                    operations: ElementRole::TextInput.operations(),
                },
                link,
            ],
        )
    }

    #[test]
    fn test_raw_string_hashes() {
        assert_eq!(raw_string_hashes("plain"), 1);
        assert_eq!(raw_string_hashes(r##"say "#hi""##), 2);
        assert_eq!(raw_string_hashes("\"###"), 4);
    }

    #[test]
    fn test_render_methods() {
        let source = render_rust(&artifact()).unwrap();

        assert!(source.contains("pub struct HomePage<'d, D: Driver>"));
        assert!(source.contains("pub fn set_q(&self, text: &str) -> Result<()>"));
        assert!(source.contains("self.page.set_value(\"q\", text)"));
        assert!(source.contains("pub fn q_value(&self) -> Result<Option<String>>"));
        assert!(source.contains("pub fn click_about(&self) -> Result<()>"));
        assert!(source.contains("pub fn navigate_to_about_page(&self) -> Result<()>"));
        assert!(source.contains("r##\""));
    }

    #[test]
    fn test_digit_keys_render_valid_methods() {
        let key = ElementKey::id("-1");
        let field = ElementField {
            name: crate::generator::naming::normalize_field_name(&key.to_string()),
            locator: infer_locator(&key),
            key,
            role: ElementRole::TextInput,
            operations: ElementRole::TextInput.operations(),
        };
        let page = PageArtifact::new("FormPage", "pages.com.example", "https://example.com/form", None, vec![field]);

        let source = render_rust(&page).unwrap();

        assert!(source.contains("pub fn element1_value(&self) -> Result<Option<String>>"));
        assert!(!source.contains("pub fn 1_value"));
    }

    #[test]
    fn test_embedded_json_reads_back() {
        let original = artifact();
        let source = render_rust(&original).unwrap();

        let start = source.find("r##\"").unwrap() + 4;
        let end = source.rfind("\"##;").unwrap();
        let back = PageArtifact::from_json(&source[start..end]).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_write_source_uses_package_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), &artifact()).unwrap();

        assert_eq!(path, dir.path().join("pages/com/example/home_page.rs"));
        assert!(fs::read_to_string(path).unwrap().contains("HomePage"));
    }
}

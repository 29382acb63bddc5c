use std::{collections::{HashMap, HashSet}, path::PathBuf};
use url::Url;

pub const HOME_PAGE: &str = "HomePage";
pub const NEXT_PAGE: &str = "NextPage";
pub const DEFAULT_PAGE: &str = "DefaultPage";
pub const ROOT_PACKAGE: &str = "pages";
pub const DEFAULT_PACKAGE: &str = "pages.default";

/// Hands out unique, identifier-safe field names for one emission
///
/// Two keys can normalize to the same name (`my_button`, `My-Button`);
/// later ones get `2`, `3`, ... appended until the name is unused.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a field name for an element key
    pub fn allocate(&mut self, key: &str) -> String {
        self.reserve(normalize_field_name(key))
    }

    /// Claim `base`, or the first free `base<N>` for N >= 2
    pub fn reserve(&mut self, base: String) -> String {
        if self.used.insert(base.clone()) {
            return base;
        }

        let mut suffix = self.next_suffix.get(&base).copied().unwrap_or(2);
        loop {
            let candidate = format!("{}{}", base, suffix);
            suffix += 1;
            if self.used.insert(candidate.clone()) {
                self.next_suffix.insert(base, suffix);
                return candidate;
            }
        }
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }
}

/// Normalize a key to a lower camelCase identifier
///
/// Non-alphanumeric runs become word breaks and leading ones are dropped;
/// a name that would start with a digit gets the `element_` prefix first.
pub fn normalize_field_name(key: &str) -> String {
    let mut snake = String::with_capacity(key.len());
    let mut in_gap = false;
    for c in key.chars() {
        if c.is_ascii_alphanumeric() {
            snake.push(c);
            in_gap = false;
        } else if !in_gap && !snake.is_empty() {
            snake.push('_');
            in_gap = true;
        }
    }

    if snake.starts_with(|c: char| c.is_ascii_digit()) {
        snake.insert_str(0, "element_");
    }

    let mut camel = String::with_capacity(snake.len());
    let mut upper_next = false;
    for c in snake.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            camel.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            camel.push(c);
        }
    }

    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => "element".to_string(),
    }
}

/// Upper-case the first character
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// `camelCase` or `PascalCase` to `snake_case`
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_lower_or_digit = true;
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower_or_digit = false;
        }
    }
    out.trim_end_matches('_').to_string()
}

/// Class name for a URL path: the last segment, extension dropped, each
/// alphanumeric word capitalized, with `Page` appended
pub fn class_name_from_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return HOME_PAGE.to_string();
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    let last = segments.last().copied().unwrap_or_default();
    let stem = match last.rfind('.') {
        Some(dot) => &last[..dot],
        None => last,
    };

    let mut name: String = stem
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect();

    if name.is_empty() {
        name = format!("Page{}", segments.len());
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "Page");
    }
    name.push_str("Page");
    name
}

/// Class name of the page at `url`, `DefaultPage` when it cannot be parsed
pub fn page_class_name(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => class_name_from_path(parsed.path()),
        Err(e) => {
            log::debug!("Cannot derive class name from '{}': {}", url, e);
            DEFAULT_PAGE.to_string()
        }
    }
}

/// Class name for a link target resolved against the page it sits on;
/// `NextPage` when the href cannot be resolved
pub fn target_class_name(href: &str, page_url: &str) -> String {
    let resolved = Url::parse(page_url).and_then(|base| base.join(href)).or_else(|_| Url::parse(href));
    match resolved {
        Ok(target) => class_name_from_path(target.path()),
        Err(e) => {
            log::debug!("Cannot derive target class name from '{}': {}", href, e);
            NEXT_PAGE.to_string()
        }
    }
}

fn package_segment(part: &str) -> String {
    part.chars().filter(char::is_ascii_alphanumeric).collect::<String>().to_ascii_lowercase()
}

/// Dotted package for a URL: `pages`, the reversed host labels, then up to
/// the first two path segments
pub fn package_from_url(url: &str) -> String {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::debug!("Cannot derive package from '{}': {}", url, e);
            return DEFAULT_PACKAGE.to_string();
        }
    };
    let Some(host) = parsed.host_str() else {
        return DEFAULT_PACKAGE.to_string();
    };

    let mut parts = vec![ROOT_PACKAGE.to_string()];
    parts.extend(host.rsplit('.').map(package_segment).filter(|p| !p.is_empty()));
    parts.extend(
        parsed
            .path()
            .trim_matches('/')
            .split('/')
            .filter(|p| !p.is_empty())
            .take(2)
            .map(package_segment)
            .filter(|p| !p.is_empty()),
    );
    parts.join(".")
}

/// Directory a package's sources are written to, relative to the output root
pub fn package_dir(package: &str) -> PathBuf {
    package.split('.').filter(|p| !p.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_field_name("q"), "q");
        assert_eq!(normalize_field_name("go_button"), "goButton");
        assert_eq!(normalize_field_name("name_first-name"), "nameFirstName");
        assert_eq!(normalize_field_name("iframe0_q"), "iframe0Q");
        assert_eq!(normalize_field_name("3rd-step"), "element3rdStep");
        assert_eq!(normalize_field_name("Submit"), "submit");
        assert_eq!(normalize_field_name("---"), "element");
        assert_eq!(normalize_field_name("-1"), "element1");
        assert_eq!(normalize_field_name("_9x"), "element9x");
        assert_eq!(normalize_field_name("__top"), "top");
    }

    #[test]
    fn test_collisions_get_suffixes() {
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate("my-button"), "myButton");
        assert_eq!(names.allocate("my_button"), "myButton2");
        assert_eq!(names.allocate("My--Button"), "myButton3");
    }

    #[test]
    fn test_suffix_skips_taken_names() {
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate("btn2"), "btn2");
        assert_eq!(names.allocate("btn"), "btn");
        assert_eq!(names.allocate("btn"), "btn3");
        assert!(names.is_used("btn2"));
    }

    #[test]
    fn test_class_name_from_path() {
        assert_eq!(class_name_from_path("/"), "HomePage");
        assert_eq!(class_name_from_path(""), "HomePage");
        assert_eq!(class_name_from_path("/about"), "AboutPage");
        assert_eq!(class_name_from_path("/shop/product-list.html"), "ProductListPage");
        assert_eq!(class_name_from_path("/docs/"), "DocsPage");
        assert_eq!(class_name_from_path("/a/b/---"), "Page3Page");
        assert_eq!(class_name_from_path("/2024"), "Page2024Page");
    }

    #[test]
    fn test_page_class_name_fallback() {
        assert_eq!(page_class_name("https://example.com/login"), "LoginPage");
        assert_eq!(page_class_name("not a url"), "DefaultPage");
    }

    #[test]
    fn test_target_class_name() {
        assert_eq!(target_class_name("/about", "https://example.com/"), "AboutPage");
        assert_eq!(target_class_name("contact.php", "https://example.com/info/"), "ContactPage");
        assert_eq!(target_class_name("https://other.org/", "https://example.com/"), "HomePage");
        assert_eq!(target_class_name("http://[::1", "not a url"), "NextPage");
    }

    #[test]
    fn test_package_from_url() {
        assert_eq!(package_from_url("https://www.example.com/"), "pages.com.example.www");
        assert_eq!(package_from_url("https://example.com/shop/items/42"), "pages.com.example.shop.items");
        assert_eq!(package_from_url("https://my-site.io/User_Area"), "pages.io.mysite.userarea");
        assert_eq!(package_from_url("nonsense"), "pages.default");
    }

    #[test]
    fn test_package_dir() {
        assert_eq!(package_dir("pages.com.example"), PathBuf::from("pages/com/example"));
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("goButton"), "go_button");
        assert_eq!(to_snake_case("navigateToAboutPage2"), "navigate_to_about_page2");
        assert_eq!(to_snake_case("iframe0Q"), "iframe0_q");
        assert_eq!(to_snake_case("q"), "q");
    }
}

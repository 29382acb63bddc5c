//! Runtime for generated page objects
//!
//! [`LivePage`] binds a [`PageArtifact`] to a driver and carries out the
//! operations the artifact declares. Every operation first waits for its
//! element to be ready (visible for reads, displayed and enabled for
//! actions) and fails with [`PomError::Timeout`] if it never is.

use crate::{
    browser::{driver::{By, Driver, ElementHandle}, frame::FrameGuard, wait::Wait},
    collector::ElementKey,
    error::{PomError, Result},
    generator::artifact::{ElementField, Operation, PageArtifact, Readiness},
};

pub struct LivePage<'d, D: Driver> {
    driver: &'d D,
    artifact: PageArtifact,
    wait: Wait,
}

impl<'d, D: Driver> LivePage<'d, D> {
    /// Bind with the default wait, checking page identity first
    pub fn bind(driver: &'d D, artifact: PageArtifact) -> Result<Self> {
        Self::bind_with(driver, artifact, Wait::default())
    }

    pub fn bind_with(driver: &'d D, artifact: PageArtifact, wait: Wait) -> Result<Self> {
        artifact.verify_identity(driver)?;
        log::debug!("Bound {} to {}", artifact.class_name(), driver.current_url().unwrap_or_default());
        Ok(Self { driver, artifact, wait })
    }

    pub fn artifact(&self) -> &PageArtifact {
        &self.artifact
    }

    pub fn set_value(&self, field: &str, text: &str) -> Result<()> {
        self.perform(field, &Operation::SetValue, |el| {
            self.driver.clear(el)?;
            self.driver.send_keys(el, text)
        })
    }

    pub fn value(&self, field: &str) -> Result<Option<String>> {
        self.perform(field, &Operation::GetValue, |el| self.driver.attribute(el, "value"))
    }

    pub fn check(&self, field: &str) -> Result<()> {
        self.perform(field, &Operation::Check, |el| {
            if !self.driver.is_selected(el)? {
                self.driver.click(el)?;
            }
            Ok(())
        })
    }

    pub fn uncheck(&self, field: &str) -> Result<()> {
        self.perform(field, &Operation::Uncheck, |el| {
            if self.driver.is_selected(el)? {
                self.driver.click(el)?;
            }
            Ok(())
        })
    }

    pub fn is_checked(&self, field: &str) -> Result<bool> {
        self.perform(field, &Operation::IsChecked, |el| self.driver.is_selected(el))
    }

    pub fn click(&self, field: &str) -> Result<()> {
        self.perform(field, &Operation::Click, |el| self.driver.click(el))
    }

    pub fn is_enabled(&self, field: &str) -> Result<bool> {
        self.perform(field, &Operation::IsEnabled, |el| self.driver.is_enabled(el))
    }

    pub fn href(&self, field: &str) -> Result<Option<String>> {
        self.perform(field, &Operation::GetHref, |el| self.driver.attribute(el, "href"))
    }

    pub fn select_by_text(&self, field: &str, text: &str) -> Result<()> {
        self.perform(field, &Operation::SelectByText, |el| {
            let option = self.find_option(el, |option| Ok(self.driver.text(option)?.trim() == text.trim()))?;
            option
                .map(|option| self.driver.click(&option))
                .unwrap_or_else(|| Err(PomError::ElementNotFound(format!("option with text '{}' in '{}'", text, field))))
        })
    }

    pub fn select_by_value(&self, field: &str, value: &str) -> Result<()> {
        self.perform(field, &Operation::SelectByValue, |el| {
            let option = self.find_option(el, |option| {
                Ok(self.driver.attribute(option, "value")?.as_deref() == Some(value))
            })?;
            option
                .map(|option| self.driver.click(&option))
                .unwrap_or_else(|| Err(PomError::ElementNotFound(format!("option with value '{}' in '{}'", value, field))))
        })
    }

    /// Text of the selected option; the first option when none is marked
    pub fn selected_text(&self, field: &str) -> Result<String> {
        self.perform(field, &Operation::GetSelectedText, |el| {
            let options = self.driver.find_within(el, &By::TagName("option".to_string()))?;
            for option in &options {
                if self.driver.is_selected(option)? {
                    return self.driver.text(option);
                }
            }
            match options.first() {
                Some(first) => self.driver.text(first),
                None => Ok(String::new()),
            }
        })
    }

    pub fn text(&self, field: &str) -> Result<String> {
        self.perform(field, &Operation::GetText, |el| self.driver.text(el))
    }

    /// Click a link through to its target and wait for the new document
    pub fn navigate(&self, field: &str) -> Result<()> {
        let any_target = Operation::NavigateTo { target: String::new(), method: String::new() };
        self.perform(field, &any_target, |el| self.driver.click(el))?;
        self.wait.until("document ready", || self.driver.document_ready())
    }

    fn find_option<F>(&self, select: &ElementHandle, mut accept: F) -> Result<Option<ElementHandle>>
    where
        F: FnMut(&ElementHandle) -> Result<bool>,
    {
        for option in self.driver.find_within(select, &By::TagName("option".to_string()))? {
            if accept(&option)? {
                return Ok(Some(option));
            }
        }
        Ok(None)
    }

    fn field(&self, name: &str, operation: &Operation) -> Result<&ElementField> {
        let field = self.artifact.field(name).ok_or_else(|| PomError::UnknownField(name.to_string()))?;
        if !field.supports(operation) {
            return Err(PomError::UnsupportedOperation {
                field: name.to_string(),
                operation: operation.name().to_string(),
            });
        }
        Ok(field)
    }

    /// Locate the field's element, wait for readiness, then act on it
    fn perform<T, F>(&self, name: &str, operation: &Operation, action: F) -> Result<T>
    where
        F: FnOnce(&ElementHandle) -> Result<T>,
    {
        let field = self.field(name, operation)?;
        let readiness = operation.readiness();

        match &field.key {
            ElementKey::Frame { index, inner } => {
                let frame = self.wait.until_some(&format!("iframe {}", index), || {
                    Ok(self.driver.find_elements(&By::TagName("iframe".to_string()))?.get(*index).cloned())
                })?;
                let guard = FrameGuard::enter(self.driver, &frame)?;
                let result = self.ready(field, inner, readiness).and_then(|el| action(&el));
                guard.exit()?;
                result
            }
            key => {
                let element = self.ready(field, key, readiness)?;
                action(&element)
            }
        }
    }

    fn ready(&self, field: &ElementField, key: &ElementKey, readiness: Readiness) -> Result<ElementHandle> {
        let condition = match readiness {
            Readiness::Visible => format!("'{}' ({}) visible", field.name, field.locator),
            Readiness::Clickable => format!("'{}' ({}) clickable", field.name, field.locator),
        };

        self.wait.until_some(&condition, || {
            let Some(element) = locate(self.driver, key)? else {
                return Ok(None);
            };
            let ready = match readiness {
                Readiness::Visible => self.driver.is_displayed(&element)?,
                Readiness::Clickable => self.driver.is_displayed(&element)? && self.driver.is_enabled(&element)?,
            };
            Ok(ready.then_some(element))
        })
    }
}

/// Find the element a key names in the current frame
pub fn locate<D: Driver + ?Sized>(driver: &D, key: &ElementKey) -> Result<Option<ElementHandle>> {
    let found = match key {
        ElementKey::Id(id) => driver.find_elements(&By::Id(id.clone()))?.into_iter().next(),
        ElementKey::Name(name) => driver.find_elements(&By::Name(name.clone()))?.into_iter().next(),
        ElementKey::Class { class, tag } => {
            let mut found = None;
            for element in driver.find_elements(&By::ClassName(class.clone()))? {
                if driver.tag_name(&element)?.eq_ignore_ascii_case(tag) {
                    found = Some(element);
                    break;
                }
            }
            found
        }
        ElementKey::TagPosition { tag, index } => driver.find_elements(&By::TagName(tag.clone()))?.into_iter().nth(*index),
        ElementKey::Frame { .. } => {
            return Err(PomError::Unsupported(format!("nested frame key '{}'", key)));
        }
    };
    Ok(found)
}

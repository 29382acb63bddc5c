use crate::{
    browser::driver::Driver,
    collector::ElementKey,
    error::{PomError, Result},
    generator::locator::{ElementRole, LocatorSpec},
};
use serde::{Deserialize, Serialize};

/// An accessor or action a generated page object exposes for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Clear the field, then type the text
    SetValue,
    GetValue,
    /// Click only when not already selected
    Check,
    /// Click only when selected
    Uncheck,
    IsChecked,
    Click,
    IsEnabled,
    GetHref,
    SelectByText,
    SelectByValue,
    GetSelectedText,
    GetText,
    /// Click through to another page object
    NavigateTo { target: String, method: String },
}

/// State an element must reach before an operation acts on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Visible,
    Clickable,
}

impl Operation {
    /// Method name in the generated object, e.g. `setValue`
    pub fn name(&self) -> &str {
        match self {
            Operation::SetValue => "setValue",
            Operation::GetValue => "getValue",
            Operation::Check => "check",
            Operation::Uncheck => "uncheck",
            Operation::IsChecked => "isChecked",
            Operation::Click => "click",
            Operation::IsEnabled => "isEnabled",
            Operation::GetHref => "getHref",
            Operation::SelectByText => "selectByText",
            Operation::SelectByValue => "selectByValue",
            Operation::GetSelectedText => "getSelectedText",
            Operation::GetText => "getText",
            Operation::NavigateTo { method, .. } => method,
        }
    }

    pub fn readiness(&self) -> Readiness {
        match self {
            Operation::SetValue
            | Operation::Check
            | Operation::Uncheck
            | Operation::Click
            | Operation::SelectByText
            | Operation::SelectByValue
            | Operation::NavigateTo { .. } => Readiness::Clickable,
            Operation::GetValue
            | Operation::IsChecked
            | Operation::IsEnabled
            | Operation::GetHref
            | Operation::GetSelectedText
            | Operation::GetText => Readiness::Visible,
        }
    }

    /// Same operation, ignoring navigation targets
    pub fn same_kind(&self, other: &Operation) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl ElementRole {
    /// The fixed operation set for a role; navigation is added per link
    pub fn operations(&self) -> Vec<Operation> {
        match self {
            ElementRole::TextInput | ElementRole::Password | ElementRole::TextArea => {
                vec![Operation::SetValue, Operation::GetValue]
            }
            ElementRole::Checkbox | ElementRole::Radio => {
                vec![Operation::Check, Operation::Uncheck, Operation::IsChecked]
            }
            ElementRole::Button => vec![Operation::Click, Operation::IsEnabled],
            ElementRole::Link => vec![Operation::Click, Operation::GetHref],
            ElementRole::Select => {
                vec![Operation::SelectByText, Operation::SelectByValue, Operation::GetSelectedText]
            }
            ElementRole::Generic => vec![Operation::Click, Operation::GetText],
        }
    }
}

/// One named, located, role-tagged element of a page object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementField {
    pub name: String,
    pub key: ElementKey,
    pub locator: LocatorSpec,
    pub role: ElementRole,
    pub operations: Vec<Operation>,
}

impl ElementField {
    pub fn supports(&self, operation: &Operation) -> bool {
        self.operations.iter().any(|op| op.same_kind(operation))
    }

    pub fn navigation(&self) -> Option<(&str, &str)> {
        self.operations.iter().find_map(|op| match op {
            Operation::NavigateTo { target, method } => Some((target.as_str(), method.as_str())),
            _ => None,
        })
    }
}

/// A generated page object
///
/// Built once by the emitter and never modified; renderers and the live
/// runtime read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageArtifact {
    class_name: String,
    package: String,
    source_url: String,
    /// Substring the live page title must contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title_check: Option<String>,
    fields: Vec<ElementField>,
}

impl PageArtifact {
    pub fn new(
        class_name: impl Into<String>,
        package: impl Into<String>,
        source_url: impl Into<String>,
        title_check: Option<String>,
        fields: Vec<ElementField>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            package: package.into(),
            source_url: source_url.into(),
            title_check: title_check.filter(|t| !t.trim().is_empty()),
            fields,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn title_check(&self) -> Option<&str> {
        self.title_check.as_deref()
    }

    pub fn fields(&self) -> &[ElementField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ElementField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check the live page against the recorded title
    pub fn verify_identity<D: Driver + ?Sized>(&self, driver: &D) -> Result<()> {
        let Some(expected) = self.title_check() else {
            return Ok(());
        };

        let title = driver.title()?;
        if title.contains(expected) {
            return Ok(());
        }

        Err(PomError::PageMismatch {
            class_name: self.class_name.clone(),
            expected: expected.to_string(),
            url: driver.current_url().unwrap_or_else(|_| "<unknown>".to_string()),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

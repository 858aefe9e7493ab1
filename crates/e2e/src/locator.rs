//! Deferred element descriptions
//!
//! A [`Locator`] says how to find an element, not which element was found.
//! It is sent to the driver with every interaction and resolved there, so a
//! re-rendered DOM never leaves a stale handle behind.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root selection strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    /// Playwright selector string (CSS, `text=`, `:has-text()`)
    Css { selector: String },
    /// ARIA role with optional accessible name
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        exact: bool,
    },
    /// Text content
    Text {
        text: String,
        #[serde(default)]
        exact: bool,
    },
    /// Input placeholder
    Placeholder { text: String },
    /// `data-testid` attribute
    TestId { id: String },
}

/// Narrowing applied after the root selector, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Refinement {
    HasText { text: String },
    Has { locator: Locator },
    HasNot { locator: Locator },
    First,
    Nth { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub selector: Selector,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refinements: Vec<Refinement>,
}

impl Locator {
    fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            refinements: Vec::new(),
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css {
            selector: selector.into(),
        })
    }

    pub fn role(role: impl Into<String>) -> Self {
        Self::from_selector(Selector::Role {
            role: role.into(),
            name: None,
            exact: false,
        })
    }

    /// `getByRole(role, { name })`
    pub fn role_named(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_selector(Selector::Role {
            role: role.into(),
            name: Some(name.into()),
            exact: false,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text {
            text: text.into(),
            exact: false,
        })
    }

    pub fn exact_text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text {
            text: text.into(),
            exact: true,
        })
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Placeholder { text: text.into() })
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::TestId { id: id.into() })
    }

    fn refine(mut self, refinement: Refinement) -> Self {
        self.refinements.push(refinement);
        self
    }

    pub fn has_text(self, text: impl Into<String>) -> Self {
        self.refine(Refinement::HasText { text: text.into() })
    }

    pub fn has(self, inner: Locator) -> Self {
        self.refine(Refinement::Has { locator: inner })
    }

    pub fn has_not(self, inner: Locator) -> Self {
        self.refine(Refinement::HasNot { locator: inner })
    }

    pub fn first(self) -> Self {
        self.refine(Refinement::First)
    }

    pub fn nth(self, index: usize) -> Self {
        self.refine(Refinement::Nth { index })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Selector::Css { selector } => write!(f, "locator('{}')", selector)?,
            Selector::Role { role, name: Some(name), .. } => {
                write!(f, "getByRole('{}', {{ name: '{}' }})", role, name)?
            }
            Selector::Role { role, name: None, .. } => write!(f, "getByRole('{}')", role)?,
            Selector::Text { text, exact } => {
                if *exact {
                    write!(f, "getByText('{}', {{ exact: true }})", text)?
                } else {
                    write!(f, "getByText('{}')", text)?
                }
            }
            Selector::Placeholder { text } => write!(f, "getByPlaceholder('{}')", text)?,
            Selector::TestId { id } => write!(f, "getByTestId('{}')", id)?,
        }
        for refinement in &self.refinements {
            match refinement {
                Refinement::HasText { text } => write!(f, ".filter({{ hasText: '{}' }})", text)?,
                Refinement::Has { locator } => write!(f, ".filter({{ has: {} }})", locator)?,
                Refinement::HasNot { locator } => write!(f, ".filter({{ hasNot: {} }})", locator)?,
                Refinement::First => write!(f, ".first()")?,
                Refinement::Nth { index } => write!(f, ".nth({})", index)?,
            }
        }
        Ok(())
    }
}

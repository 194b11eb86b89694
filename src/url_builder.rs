//! Building request URLs from a base template and identifiers.
//!
//! A template containing the `{id}` placeholder gets each identifier
//! substituted there. Any other template has the identifier appended verbatim,
//! so `https://example.com/` and `100` yield `https://example.com/100`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::input::Identifier;

/// Placeholder replaced by the identifier.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Errors from parsing a URL template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template is empty or whitespace only.
    #[error("URL template is empty")]
    Empty,

    /// A sample URL built from the template is not an absolute URL.
    #[error("URL template `{template}` does not produce a valid URL: {reason}")]
    Invalid {
        /// The rejected template.
        template: String,
        /// Parser message.
        reason: String,
    },
}

/// Validated base URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    /// Parses and validates a template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Empty`] for a blank template and
    /// [`TemplateError::Invalid`] when substituting a sample identifier does not
    /// give an absolute URL.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let template = template.trim();
        if template.is_empty() {
            return Err(TemplateError::Empty);
        }
        let parsed = Self {
            template: template.to_string(),
        };
        url::Url::parse(&parsed.render("0")).map_err(|e| TemplateError::Invalid {
            template: template.to_string(),
            reason: e.to_string(),
        })?;
        Ok(parsed)
    }

    /// The template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Returns true when the template uses the `{id}` placeholder.
    #[must_use]
    pub fn has_placeholder(&self) -> bool {
        self.template.contains(ID_PLACEHOLDER)
    }

    /// Builds the URL for one identifier.
    #[must_use]
    pub fn build(&self, id: &Identifier) -> String {
        self.render(id.as_str())
    }

    /// Builds one URL per identifier, in order.
    #[must_use]
    pub fn build_all(&self, ids: &[Identifier]) -> Vec<String> {
        ids.iter().map(|id| self.build(id)).collect()
    }

    fn render(&self, id: &str) -> String {
        if self.has_placeholder() {
            self.template.replace(ID_PLACEHOLDER, id)
        } else {
            format!("{}{id}", self.template)
        }
    }
}

impl FromStr for UrlTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

use crate::domain::Quote;

/// Custom actions for CatalogItem entities.
#[derive(Debug, Clone)]
pub enum CatalogAction {
    /// Prices one unit with the given variant and modifiers.
    ///
    /// # Arguments
    /// * `variant` - Name of the chosen variant, if any
    /// * `modifiers` - Names of the chosen modifiers
    Quote {
        variant: Option<String>,
        modifiers: Vec<String>,
    },
}

/// Results from CatalogActions.
///
/// Unknown names are reported as outcomes so the caller keeps the typed error.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogActionResult {
    Quoted(Quote),
    UnknownVariant(String),
    UnknownModifier(String),
}

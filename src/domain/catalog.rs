use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A priced option on a catalog item: a variant or a modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceOption {
    pub name: String,
    pub additional_price: Decimal,
}

impl PriceOption {
    pub fn new(name: impl Into<String>, additional_price: Decimal) -> Self {
        Self {
            name: name.into(),
            additional_price,
        }
    }
}

/// Detail of a catalog item as served by the catalog service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub variants: Vec<PriceOption>,
    #[serde(default)]
    pub modifiers: Vec<PriceOption>,
}

impl CatalogItem {
    pub fn variant(&self, name: &str) -> Option<&PriceOption> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn modifier(&self, name: &str) -> Option<&PriceOption> {
        self.modifiers.iter().find(|m| m.name == name)
    }
}

/// Quote request body: the variant and modifiers picked for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub variant: Option<String>,
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub total_price: Decimal,
}

/// Payload for creating a new catalog item.
#[derive(Debug, Clone)]
pub struct CatalogItemCreate {
    pub name: String,
    pub base_price: Decimal,
    pub variants: Vec<PriceOption>,
    pub modifiers: Vec<PriceOption>,
}

/// Payload for updating an existing catalog item.
#[derive(Debug, Clone, Default)]
pub struct CatalogItemPatch {
    pub name: Option<String>,
    pub base_price: Option<Decimal>,
    pub variants: Option<Vec<PriceOption>>,
    pub modifiers: Option<Vec<PriceOption>>,
}

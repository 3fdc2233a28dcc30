use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::actor_framework::Entity;
use crate::domain::{CatalogItem, CatalogItemCreate, CatalogItemPatch, Quote};
use super::actions::{CatalogAction, CatalogActionResult};

fn validate_price(label: &str, price: Decimal) -> Result<(), String> {
    if price.is_sign_negative() {
        return Err(format!("{} must not be negative", label));
    }
    Ok(())
}

impl Entity for CatalogItem {
    type Id = String;
    type CreateParams = CatalogItemCreate;
    type Patch = CatalogItemPatch;
    type Action = CatalogAction;
    type ActionResult = CatalogActionResult;
    type Filter = ();

    fn id(&self) -> &String {
        &self.id
    }

    /// Creates a new CatalogItem from creation parameters.
    ///
    /// # Arguments
    /// * `id` - Unique identifier for the item
    /// * `params` - Name, base price and the priced variants/modifiers
    fn from_create_params(id: String, params: CatalogItemCreate) -> Result<Self, String> {
        if params.name.trim().is_empty() {
            return Err("item name is required".to_string());
        }
        validate_price("base price", params.base_price)?;
        for option in params.variants.iter().chain(params.modifiers.iter()) {
            validate_price(&option.name, option.additional_price)?;
        }
        Ok(Self {
            id,
            name: params.name,
            base_price: params.base_price,
            variants: params.variants,
            modifiers: params.modifiers,
        })
    }

    fn list_cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }

    /// Updates the item's name, base price and/or option lists.
    fn on_update(&mut self, patch: CatalogItemPatch) -> Result<(), String> {
        if let Some(price) = patch.base_price {
            validate_price("base price", price)?;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.base_price {
            self.base_price = price;
        }
        if let Some(variants) = patch.variants {
            self.variants = variants;
        }
        if let Some(modifiers) = patch.modifiers {
            self.modifiers = modifiers;
        }
        Ok(())
    }

    /// Handles catalog-specific actions.
    ///
    /// # Actions
    /// - `Quote`: base price + variant price + every modifier price
    fn handle_action(&mut self, action: CatalogAction) -> Result<CatalogActionResult, String> {
        match action {
            CatalogAction::Quote { variant, modifiers } => {
                let mut prices = vec![self.base_price];

                if let Some(name) = variant {
                    match self.variant(&name) {
                        Some(v) => prices.push(v.additional_price),
                        None => return Ok(CatalogActionResult::UnknownVariant(name)),
                    }
                }
                for name in modifiers {
                    match self.modifier(&name) {
                        Some(m) => prices.push(m.additional_price),
                        None => return Ok(CatalogActionResult::UnknownModifier(name)),
                    }
                }
                let total = prices
                    .into_iter()
                    .try_fold(Decimal::ZERO, |acc, price| acc.checked_add(price))
                    .ok_or_else(|| format!("quote for {} is out of range", self.id))?;
                Ok(CatalogActionResult::Quoted(Quote { total_price: total }))
            }
        }
    }
}

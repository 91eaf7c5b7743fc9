use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{carts::Address, tenant::TenantId};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Destination {
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl From<&Address> for Destination {
    fn from(address: &Address) -> Self {
        Self {
            country: address.country.clone(),
            state: address.state.clone(),
            city: Some(address.city.clone()),
            postal_code: Some(address.postal_code.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeightBracket {
    #[serde(default)]
    pub min_weight_grams: Option<i64>,
    #[serde(default)]
    pub max_weight_grams: Option<i64>,
    pub price_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceBracket {
    #[serde(default)]
    pub min_order_value_minor: Option<i64>,
    #[serde(default)]
    pub max_order_value_minor: Option<i64>,
    pub price_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocationRule {
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub price_minor: i64,
}

/// Pricing strategy of a shipping option, stored as JSON on the option row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ShippingPricing {
    Fixed,
    Free,
    Pickup,
    WeightBased { brackets: Vec<WeightBracket> },
    PriceBased { brackets: Vec<PriceBracket> },
    LocationBased { rules: Vec<LocationRule> },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShippingOptionModel {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub pricing: ShippingPricing,
    pub base_price_minor: i64,
    pub free_shipping_threshold_minor: Option<i64>,
    pub min_order_value_minor: Option<i64>,
    pub max_order_value_minor: Option<i64>,
    pub estimated_delivery_days: Option<i32>,
    pub is_active: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewShippingOption {
    pub name: String,
    pub pricing: ShippingPricing,
    pub base_price_minor: i64,
    #[serde(default)]
    pub free_shipping_threshold_minor: Option<i64>,
    #[serde(default)]
    pub min_order_value_minor: Option<i64>,
    #[serde(default)]
    pub max_order_value_minor: Option<i64>,
    #[serde(default)]
    pub estimated_delivery_days: Option<i32>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderShippingOptionsRequest {
    pub ordered_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateResolution {
    Price(i64),
    NotApplicable,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShippingQuote {
    pub option_id: Uuid,
    pub name: String,
    pub price_minor: i64,
    pub estimated_delivery_days: Option<i32>,
}

fn within(value: i64, min: Option<i64>, max: Option<i64>) -> bool {
    min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
}

fn normalize_text(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalize_postal_code(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_lowercase()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl LocationRule {
    /// Number of fields this rule pins down when it matches the destination.
    fn specificity(&self, destination: &Destination) -> Option<usize> {
        if normalize_text(&self.country) != normalize_text(&destination.country) {
            return None;
        }

        let mut matched = 1;
        let text_fields = [
            (non_empty(&self.state), non_empty(&destination.state)),
            (non_empty(&self.city), non_empty(&destination.city)),
        ];
        for (rule_value, destination_value) in text_fields {
            if let Some(rule_value) = rule_value {
                match destination_value {
                    Some(d) if normalize_text(d) == normalize_text(rule_value) => matched += 1,
                    _ => return None,
                }
            }
        }

        if let Some(rule_postal) = non_empty(&self.postal_code) {
            match non_empty(&destination.postal_code) {
                Some(d) if normalize_postal_code(d) == normalize_postal_code(rule_postal) => {
                    matched += 1
                }
                _ => return None,
            }
        }

        Some(matched)
    }
}

impl ShippingOptionModel {
    pub fn resolve_rate(
        &self,
        subtotal_minor: i64,
        weight_grams: i64,
        destination: &Destination,
    ) -> RateResolution {
        if let Some(threshold) = self.free_shipping_threshold_minor {
            if subtotal_minor >= threshold {
                return RateResolution::Price(0);
            }
        }

        if !within(
            subtotal_minor,
            self.min_order_value_minor,
            self.max_order_value_minor,
        ) {
            return RateResolution::NotApplicable;
        }

        let price = match &self.pricing {
            ShippingPricing::Fixed => self.base_price_minor,
            ShippingPricing::Free | ShippingPricing::Pickup => 0,
            ShippingPricing::WeightBased { brackets } => brackets
                .iter()
                .find(|b| within(weight_grams, b.min_weight_grams, b.max_weight_grams))
                .map_or(self.base_price_minor, |b| b.price_minor),
            ShippingPricing::PriceBased { brackets } => brackets
                .iter()
                .find(|b| {
                    within(
                        subtotal_minor,
                        b.min_order_value_minor,
                        b.max_order_value_minor,
                    )
                })
                .map_or(self.base_price_minor, |b| b.price_minor),
            ShippingPricing::LocationBased { rules } => {
                let mut best: Option<(usize, &LocationRule)> = None;
                for rule in rules {
                    if let Some(score) = rule.specificity(destination) {
                        // strict comparison keeps the earlier rule on ties
                        if best.is_none_or(|(best_score, _)| score > best_score) {
                            best = Some((score, rule));
                        }
                    }
                }
                best.map_or(self.base_price_minor, |(_, rule)| rule.price_minor)
            }
        };

        RateResolution::Price(price)
    }
}

/// Prices every active option for the given cart contents, in sort order.
/// Options that do not apply are left out.
pub fn quote_shipping(
    options: &[ShippingOptionModel],
    subtotal_minor: i64,
    weight_grams: i64,
    destination: &Destination,
) -> Vec<ShippingQuote> {
    let mut active: Vec<&ShippingOptionModel> = options.iter().filter(|o| o.is_active).collect();
    active.sort_by_key(|o| o.sort_order);

    active
        .into_iter()
        .filter_map(
            |option| match option.resolve_rate(subtotal_minor, weight_grams, destination) {
                RateResolution::Price(price_minor) => Some(ShippingQuote {
                    option_id: option.id,
                    name: option.name.clone(),
                    price_minor,
                    estimated_delivery_days: option.estimated_delivery_days,
                }),
                RateResolution::NotApplicable => None,
            },
        )
        .collect()
}

//! Packaging matcher
//!
//! Resolves an abstract packaging need (format size + category) to a
//! concrete stock item. Pure lookup: candidates are loaded by the caller.

use serde::Serialize;

use shared::{IntegrityWarning, StockCategory, StockItem, WarningCode};

/// Category tag for the pouches a recipe unit is sold in
pub const SACHET_CATEGORY: &str = "sachet";

/// How a packaging item was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// `capacity_g` equals the requested format
    ExactCapacity,
    /// Deprecated path: the item name mentions the format ("100g", "100 g")
    NameFallback,
    /// Nothing matched; callers price the need at zero and surface the gap
    None,
}

/// Result of a packaging lookup
#[derive(Debug, Clone)]
pub struct PackagingMatch<'a> {
    pub item: Option<&'a StockItem>,
    pub method: MatchMethod,
    pub warnings: Vec<IntegrityWarning>,
}

impl PackagingMatch<'_> {
    /// Current per-piece cost of the matched item, zero when unmatched
    pub fn unit_cost(&self) -> f64 {
        self.item.map(|i| i.weighted_average_cost).unwrap_or(0.0)
    }
}

/// Resolve a packaging need against candidate stock items.
///
/// Candidates are filtered to packaging items whose subtype matches
/// `category` (falling back to a name-substring check when no subtype is
/// set). An exact capacity match wins; otherwise the name heuristic is
/// tried and flagged with a warning recommending the capacity field be
/// populated.
pub fn match_packaging<'a>(
    candidates: &'a [StockItem],
    format_g: u32,
    category: &str,
) -> PackagingMatch<'a> {
    let category_lower = category.to_lowercase();
    let in_category: Vec<&StockItem> = candidates
        .iter()
        .filter(|item| item.category == StockCategory::Packaging)
        .filter(|item| match &item.subtype {
            Some(subtype) => subtype.to_lowercase() == category_lower,
            None => item.name.to_lowercase().contains(&category_lower),
        })
        .collect();

    if let Some(item) = in_category
        .iter()
        .find(|item| item.capacity_g == Some(format_g))
    {
        return PackagingMatch {
            item: Some(item),
            method: MatchMethod::ExactCapacity,
            warnings: Vec::new(),
        };
    }

    let with_g = format!("{format_g}g");
    let with_space = format!("{format_g} g");
    if let Some(item) = in_category
        .iter()
        .find(|item| item.name.contains(&with_g) || item.name.contains(&with_space))
    {
        let warning = IntegrityWarning::new(
            WarningCode::PackagingFallback,
            "stock_item",
            Some(item.id),
            format!(
                "packaging '{}' matched format {}g by name only; set its capacity field",
                item.name, format_g
            ),
        );
        return PackagingMatch {
            item: Some(item),
            method: MatchMethod::NameFallback,
            warnings: vec![warning],
        };
    }

    PackagingMatch {
        item: None,
        method: MatchMethod::None,
        warnings: Vec::new(),
    }
}

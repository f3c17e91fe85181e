use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Stable identifier of a catalog item.
///
/// Ordering is lexicographic and is used as the deterministic tie-breaker
/// whenever two items score the same.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Product domain a catalog item belongs to.
///
/// The set is closed: every category has a tuned game profile.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    FountainPens,
    Movies,
}

impl Category {
    pub const ALL: [Self; 2] = [Self::FountainPens, Self::Movies];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FountainPens => "fountain_pens",
            Self::Movies => "movies",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unsupported category `{name}`")]
pub struct UnknownCategoryError {
    #[error(not(source))]
    name: String,
}

impl FromStr for Category {
    type Err = UnknownCategoryError;

    /// Accepts `fountain_pens`, `fountain-pens`, `pens`, `movies` and `films`,
    /// ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fountain_pens" | "pens" => Ok(Self::FountainPens),
            "movies" | "films" => Ok(Self::Movies),
            _ => Err(UnknownCategoryError { name: s.to_owned() }),
        }
    }
}

/// A product as seen by the preference engine.
///
/// Items are immutable once loaded into a session's catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default, alias = "product_type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Attribute name to the set of values the item is offered in
    /// (e.g. `"Nib Size" -> ["Fine", "Medium"]`).
    #[serde(default)]
    pub options: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub price_min: Option<f32>,
    #[serde(default)]
    pub price_max: Option<f32>,
}

impl CatalogItem {
    /// Creates an item with only an id and a category; attributes are added
    /// with the `with_*` builders.
    #[must_use]
    pub fn new(id: impl Into<ItemId>, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
            title: String::new(),
            vendor: None,
            item_type: None,
            tags: Vec::new(),
            options: BTreeMap::new(),
            price_min: None,
            price_max: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    #[must_use]
    pub fn with_item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_option<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_price(mut self, min: f32, max: f32) -> Self {
        self.price_min = Some(min);
        self.price_max = Some(max);
        self
    }

    /// Vendor label used for diversity bucketing; missing vendors share one
    /// bucket.
    #[must_use]
    pub fn vendor_or_unknown(&self) -> &str {
        self.vendor.as_deref().unwrap_or("Unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing_accepts_aliases() {
        assert_eq!("fountain_pens".parse(), Ok(Category::FountainPens));
        assert_eq!(" Fountain-Pens ".parse(), Ok(Category::FountainPens));
        assert_eq!("FILMS".parse(), Ok(Category::Movies));
        assert!("toasters".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_display_matches_serde_name() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
        }
    }

    #[test]
    fn test_item_deserializes_with_defaults() {
        let json = r#"{"id": "p1", "product_type": "Fountain Pen", "price_min": 12.5}"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, ItemId::from("p1"));
        assert_eq!(item.category, Category::FountainPens);
        assert_eq!(item.item_type.as_deref(), Some("Fountain Pen"));
        assert_eq!(item.price_min, Some(12.5));
        assert!(item.tags.is_empty());
        assert_eq!(item.vendor_or_unknown(), "Unknown");
    }

    #[test]
    fn test_builders_accumulate_options() {
        let item = CatalogItem::new("p2", Category::FountainPens)
            .with_option("Nib Size", ["Fine"])
            .with_option("Nib Size", ["Medium"]);
        assert_eq!(item.options["Nib Size"], vec!["Fine", "Medium"]);
    }
}

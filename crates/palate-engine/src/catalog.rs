use std::collections::{HashMap, hash_map::Entry};

use palate_model::{CatalogItem, Category, FeatureSpace, FeatureVector, ItemId};

/// A vectorized catalog snapshot.
///
/// Every item is vectorized once at construction against a [`FeatureSpace`]
/// built from the same snapshot. The value is read-only afterwards and is
/// shared between sessions behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    vectors: Vec<FeatureVector>,
    index: HashMap<ItemId, usize>,
    space: FeatureSpace,
}

impl Catalog {
    /// Builds the snapshot. Later duplicates of an id are dropped.
    #[must_use]
    pub fn new(items: Vec<CatalogItem>) -> Self {
        let mut index = HashMap::with_capacity(items.len());
        let mut unique = Vec::with_capacity(items.len());
        for item in items {
            match index.entry(item.id.clone()) {
                Entry::Occupied(_) => {
                    tracing::warn!(item_id = %item.id, "duplicate catalog item ignored");
                }
                Entry::Vacant(entry) => {
                    entry.insert(unique.len());
                    unique.push(item);
                }
            }
        }
        let space = FeatureSpace::build(&unique);
        let vectors = unique.iter().map(|item| space.vectorize(item)).collect();
        tracing::debug!(
            items = unique.len(),
            dimension = space.dimension(),
            "catalog snapshot built"
        );
        Self {
            items: unique,
            vectors,
            index,
            space,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn space(&self) -> &FeatureSpace {
        &self.space
    }

    #[must_use]
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.index.get(id).copied()
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&CatalogItem> {
        self.position(id).map(|i| &self.items[i])
    }

    #[must_use]
    pub fn vector(&self, id: &ItemId) -> Option<&FeatureVector> {
        self.position(id).map(|i| &self.vectors[i])
    }

    /// Positions of every item of `category`, in snapshot order.
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = usize> + '_ {
        self.items
            .iter()
            .enumerate()
            .filter(move |(_, item)| item.category == category)
            .map(|(i, _)| i)
    }

    #[must_use]
    pub fn item_at(&self, position: usize) -> &CatalogItem {
        &self.items[position]
    }

    #[must_use]
    pub fn vector_at(&self, position: usize) -> &FeatureVector {
        &self.vectors[position]
    }
}

#[cfg(test)]
mod tests {
    use palate_model::FeatureKey;

    use super::*;

    #[test]
    fn test_duplicates_keep_first() {
        let catalog = Catalog::new(vec![
            CatalogItem::new("a", Category::Movies).with_vendor("A24"),
            CatalogItem::new("b", Category::FountainPens),
            CatalogItem::new("a", Category::Movies).with_vendor("Neon"),
        ]);
        assert_eq!(catalog.len(), 2);
        let a = ItemId::from("a");
        assert_eq!(catalog.get(&a).unwrap().vendor.as_deref(), Some("A24"));
        // The dropped duplicate contributes no vocabulary.
        assert!(catalog.space().index_of(&FeatureKey::vendor("Neon")).is_none());
    }

    #[test]
    fn test_vectors_match_space() {
        let catalog = Catalog::new(vec![
            CatalogItem::new("a", Category::Movies).with_tags(["noir"]),
            CatalogItem::new("b", Category::Movies).with_tags(["heist"]),
        ]);
        let a = ItemId::from("a");
        let expected = catalog.space().vectorize(catalog.get(&a).unwrap());
        assert_eq!(catalog.vector(&a), Some(&expected));
        assert_eq!(catalog.in_category(Category::Movies).count(), 2);
        assert_eq!(catalog.in_category(Category::FountainPens).count(), 0);
        assert!(catalog.vector(&ItemId::from("zzz")).is_none());
    }
}

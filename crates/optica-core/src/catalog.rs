//! # Catalog
//!
//! The product list loaded on mount, with the lookups the POS and order
//! screens need: by id, quick search for the "Agregar" box, and the
//! category/type filters of the order modal.

use std::collections::{BTreeSet, HashMap};

use crate::types::{Product, ProductId};
use crate::validation::validate_search_query;

/// Products in backend order, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
}

impl Catalog {
    /// Builds a catalog. If an id repeats, the first product keeps the slot.
    pub fn new(products: Vec<Product>) -> Self {
        let mut index = HashMap::with_capacity(products.len());
        for (pos, product) in products.iter().enumerate() {
            index.entry(product.id).or_insert(pos);
        }
        Catalog { products, index }
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.index.get(&id).map(|&pos| &self.products[pos])
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// First product whose SKU or name contains `query`.
    ///
    /// Matching ignores case and Spanish accents, so "armazon" finds
    /// "Armazón". A blank or over-long query matches nothing.
    pub fn search(&self, query: &str) -> Option<&Product> {
        let query = validate_search_query(query).ok()?;
        if query.is_empty() {
            return None;
        }
        let needle = normalize_text(&query);

        self.products.iter().find(|p| {
            normalize_text(&p.sku).contains(&needle) || normalize_text(&p.name).contains(&needle)
        })
    }

    /// Products matching the order-modal filters. `None` or an empty string
    /// means "any".
    pub fn filter<'a>(
        &'a self,
        text: Option<&'a str>,
        category: Option<&'a str>,
        product_type: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Product> + 'a {
        let needle = text.map(normalize_text).filter(|s| !s.is_empty());
        let category = category.filter(|s| !s.is_empty());
        let product_type = product_type.filter(|s| !s.is_empty());

        self.products.iter().filter(move |p| {
            let text_ok = needle.as_ref().map_or(true, |n| {
                normalize_text(&p.sku).contains(n.as_str()) || normalize_text(&p.name).contains(n.as_str())
            });
            let category_ok = category.map_or(true, |c| p.category.as_deref() == Some(c));
            let type_ok = product_type.map_or(true, |t| p.product_type.as_deref() == Some(t));
            text_ok && category_ok && type_ok
        })
    }

    /// Distinct non-empty categories, sorted.
    pub fn categories(&self) -> Vec<&str> {
        distinct(self.products.iter().filter_map(|p| p.category.as_deref()))
    }

    /// Distinct non-empty product types, sorted.
    pub fn product_types(&self) -> Vec<&str> {
        distinct(self.products.iter().filter_map(|p| p.product_type.as_deref()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Lower-cases, trims and strips the accents used in Spanish product names.
pub fn normalize_text(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

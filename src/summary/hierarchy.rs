use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Display;
use tracing::debug;

use crate::{
    processor::{
        ProcessorError, Value,
        column::{Column, ColumnType},
        table::Table,
    },
    summary::{
        CATEGORY_NAME, DIM_PRODUCT, DIM_PRODUCT_CATEGORY, DIM_PRODUCT_SUBCATEGORY,
        PRODUCT_CATEGORY_KEY, PRODUCT_KEY, PRODUCT_SUBCATEGORY_KEY,
    },
};

/// Product key → category name, resolved through the product hierarchy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryLookup {
    categories: HashMap<Value, String>,
    key_type: Option<ColumnType>,
}

impl CategoryLookup {
    pub fn category_of(&self, product_key: &Value) -> Option<&str> {
        self.categories.get(product_key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Column type of the product keys the lookup was built from
    pub fn key_type(&self) -> Option<ColumnType> {
        self.key_type
    }
}

/// Joins product → subcategory → category into a product-level lookup.
///
/// Inner-join semantics: a product whose subcategory, or a subcategory whose
/// category, has no match is left out. A key that appears twice in one
/// dimension table with different parents (or names) is rejected; exact
/// duplicate rows collapse into one entry.
pub fn resolve_categories(
    product: &Table,
    subcategory: &Table,
    category: &Table,
) -> Result<CategoryLookup, ProcessorError> {
    let product_keys = key_column(product, PRODUCT_KEY)?;
    let product_parents = key_column(product, PRODUCT_SUBCATEGORY_KEY)?;
    let subcategory_keys = key_column(subcategory, PRODUCT_SUBCATEGORY_KEY)?;
    let subcategory_parents = key_column(subcategory, PRODUCT_CATEGORY_KEY)?;
    let category_keys = key_column(category, PRODUCT_CATEGORY_KEY)?;

    let name_col = category.get_col(CATEGORY_NAME)?;
    let names = name_col.iter_str().ok_or(ProcessorError::ColumnType {
        column: CATEGORY_NAME.to_string(),
        expected: "string",
        found: name_col.column_type(),
    })?;

    same_key_kind(PRODUCT_SUBCATEGORY_KEY, product_parents, subcategory_keys)?;
    same_key_kind(PRODUCT_CATEGORY_KEY, subcategory_parents, category_keys)?;

    let category_names = unique_mapping(DIM_PRODUCT_CATEGORY, category_keys, names)?;
    let subcategory_to_category = unique_mapping(
        DIM_PRODUCT_SUBCATEGORY,
        subcategory_keys,
        subcategory_parents.to_values(),
    )?;
    let product_to_subcategory =
        unique_mapping(DIM_PRODUCT, product_keys, product_parents.to_values())?;

    let categories: HashMap<Value, String> = product_to_subcategory
        .into_iter()
        .filter_map(|(product_key, subcategory_key)| {
            let category_key = subcategory_to_category.get(&subcategory_key)?;
            let name = category_names.get(category_key)?;
            Some((product_key, name.to_string()))
        })
        .collect();

    debug!(
        products = product.row_count(),
        resolved = categories.len(),
        "resolved product categories"
    );

    Ok(CategoryLookup {
        categories,
        key_type: Some(product_keys.column_type()),
    })
}

fn key_column<'a>(table: &'a Table, name: &str) -> Result<&'a Column, ProcessorError> {
    let col = table.get_col(name)?;
    match col.column_type() {
        ColumnType::Int64 | ColumnType::Str => Ok(col),
        found => Err(ProcessorError::ColumnType {
            column: name.to_string(),
            expected: "integer or string key",
            found,
        }),
    }
}

fn same_key_kind(column: &str, left: &Column, right: &Column) -> Result<(), ProcessorError> {
    if left.column_type() == right.column_type() {
        Ok(())
    } else {
        Err(ProcessorError::KeyTypeMismatch {
            column: column.to_string(),
            left: left.column_type(),
            right: right.column_type(),
        })
    }
}

fn unique_mapping<V: PartialEq + Display>(
    table: &'static str,
    keys: &Column,
    parents: impl IntoIterator<Item = V>,
) -> Result<HashMap<Value, V>, ProcessorError> {
    let mut mapping: HashMap<Value, V> = HashMap::with_capacity(keys.total_len());

    for (key, parent) in keys.to_values().into_iter().zip(parents) {
        match mapping.entry(key) {
            Entry::Occupied(existing) => {
                if *existing.get() != parent {
                    return Err(ProcessorError::AmbiguousHierarchy {
                        table,
                        key: existing.key().to_string(),
                        first: existing.get().to_string(),
                        second: parent.to_string(),
                    });
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(parent);
            }
        }
    }

    Ok(mapping)
}

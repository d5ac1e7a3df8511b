//! In-memory table storage.
//!
//! Items live in a [`DashMap`] of partitions, each partition a [`BTreeMap`]
//! ordered by sort key:
//!
//! ```text
//! DashMap<SortableAttributeValue, BTreeMap<SortableAttributeValue, Item>>
//! ```
//!
//! Tables without a sort key use [`SortableAttributeValue::Sentinel`] as the
//! single key of each partition. Global secondary indexes are not
//! materialized; an index query walks every partition and keeps the items
//! that carry the index keys (sparse indexes).

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use dashmap::DashMap;
use dynaquery_model::{AttributeValue, Item, RawPage};
use thiserror::Error;
use tracing::debug;

/// Errors raised by table storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A required key attribute was not found.
    #[error("missing required key attribute: {attr}")]
    MissingKeyAttribute {
        /// The missing attribute.
        attr: String,
    },
    /// A key attribute has the wrong type.
    #[error("key attribute '{attr}' has wrong type: expected {expected}, got {actual}")]
    InvalidKeyType {
        /// The attribute.
        attr: String,
        /// Expected type descriptor.
        expected: String,
        /// Actual type descriptor.
        actual: String,
    },
    /// The requested index is not defined on the table.
    #[error("the table does not have the specified index: {name}")]
    IndexNotFound {
        /// The index name.
        name: String,
    },
}

/// Scalar types allowed for key attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// String.
    S,
    /// Number.
    N,
    /// Binary.
    B,
}

impl ScalarType {
    /// The type descriptor (`"S"`, `"N"` or `"B"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key attribute definition.
#[derive(Debug, Clone)]
pub struct KeyAttribute {
    /// Attribute name.
    pub name: String,
    /// Scalar type.
    pub attr_type: ScalarType,
}

impl KeyAttribute {
    /// A key attribute named `name` of type `attr_type`.
    #[must_use]
    pub fn new(name: impl Into<String>, attr_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            attr_type,
        }
    }
}

/// Partition key plus optional sort key, for a table or an index.
#[derive(Debug, Clone)]
pub struct KeySchema {
    /// Partition (HASH) key.
    pub partition_key: KeyAttribute,
    /// Sort (RANGE) key.
    pub sort_key: Option<KeyAttribute>,
}

impl KeySchema {
    /// A schema with only a partition key.
    #[must_use]
    pub fn new(partition_key: KeyAttribute) -> Self {
        Self {
            partition_key,
            sort_key: None,
        }
    }

    /// Add a sort key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: KeyAttribute) -> Self {
        self.sort_key = Some(sort_key);
        self
    }

    /// Names of the key attributes, partition key first.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.name.as_str())
            .chain(self.sort_key.as_ref().map(|k| k.name.as_str()))
    }
}

/// The primary key of a stored item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey {
    /// Partition key value.
    pub partition_key: SortableAttributeValue,
    /// Sort key value.
    pub sort_key: Option<SortableAttributeValue>,
}

/// A key-eligible value with a total order.
///
/// Strings order by UTF-8 bytes, numbers numerically (as `f64`), binary
/// bytewise. `Sentinel` stands in for the absent sort key.
#[derive(Debug, Clone)]
pub enum SortableAttributeValue {
    /// String key.
    S(String),
    /// Number key, original text.
    N(String),
    /// Binary key.
    B(bytes::Bytes),
    /// Placeholder for tables without a sort key.
    Sentinel,
}

impl SortableAttributeValue {
    /// Back to a wire value; `None` for `Sentinel`.
    #[must_use]
    pub fn to_attribute_value(&self) -> Option<AttributeValue> {
        match self {
            Self::S(s) => Some(AttributeValue::S(s.clone())),
            Self::N(n) => Some(AttributeValue::N(n.clone())),
            Self::B(b) => Some(AttributeValue::B(b.clone())),
            Self::Sentinel => None,
        }
    }

    /// Wrap a key-eligible wire value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKeyType` unless `value` is S, N or B.
    pub fn from_attribute_value(
        attr_name: &str,
        value: &AttributeValue,
    ) -> Result<Self, StorageError> {
        match value {
            AttributeValue::S(s) => Ok(Self::S(s.clone())),
            AttributeValue::N(n) => Ok(Self::N(n.clone())),
            AttributeValue::B(b) => Ok(Self::B(b.clone())),
            other => Err(StorageError::InvalidKeyType {
                attr: attr_name.to_owned(),
                expected: "S, N, or B".to_owned(),
                actual: other.type_descriptor().to_owned(),
            }),
        }
    }
}

/// Unparseable numbers sort last.
fn parse_number(s: &str) -> f64 {
    s.parse::<f64>().unwrap_or(f64::NAN)
}

impl PartialEq for SortableAttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortableAttributeValue {}

impl PartialOrd for SortableAttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortableAttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::S(a), Self::S(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::N(a), Self::N(b)) => parse_number(a)
                .partial_cmp(&parse_number(b))
                .unwrap_or(Ordering::Equal),
            (Self::B(a), Self::B(b)) => a.as_ref().cmp(b.as_ref()),
            (Self::Sentinel, Self::Sentinel) => Ordering::Equal,
            // Mixed variants never share a key position; keep the order total.
            (Self::S(_), _) => Ordering::Less,
            (_, Self::S(_)) => Ordering::Greater,
            (Self::N(_), _) => Ordering::Less,
            (_, Self::N(_)) => Ordering::Greater,
            (Self::B(_), _) => Ordering::Less,
            (_, Self::B(_)) => Ordering::Greater,
        }
    }
}

impl std::hash::Hash for SortableAttributeValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::S(s) => s.hash(state),
            // Numerically equal texts ("1" and "1.0") must hash alike.
            Self::N(n) => parse_number(n).to_bits().hash(state),
            Self::B(b) => b.hash(state),
            Self::Sentinel => {}
        }
    }
}

/// A sort-key range from a key-condition expression.
#[derive(Debug, Clone)]
pub enum SortKeyCondition {
    /// `= v`
    Eq(SortableAttributeValue),
    /// `< v`
    Lt(SortableAttributeValue),
    /// `<= v`
    Le(SortableAttributeValue),
    /// `> v`
    Gt(SortableAttributeValue),
    /// `>= v`
    Ge(SortableAttributeValue),
    /// Inclusive range.
    Between(SortableAttributeValue, SortableAttributeValue),
    /// String prefix.
    BeginsWith(String),
}

impl SortKeyCondition {
    /// Whether `value` satisfies the condition.
    #[must_use]
    pub fn matches(&self, value: &SortableAttributeValue) -> bool {
        match self {
            Self::Eq(v) => value == v,
            Self::Lt(v) => value < v,
            Self::Le(v) => value <= v,
            Self::Gt(v) => value > v,
            Self::Ge(v) => value >= v,
            Self::Between(low, high) => low <= value && value <= high,
            Self::BeginsWith(prefix) => {
                matches!(value, SortableAttributeValue::S(s) if s.starts_with(prefix.as_str()))
            }
        }
    }
}

/// One key-bounded read against a table or one of its indexes.
#[derive(Debug, Clone)]
pub struct KeyQuery<'a> {
    /// Index to read; `None` reads the base table.
    pub index: Option<&'a str>,
    /// Partition key value.
    pub partition: SortableAttributeValue,
    /// Optional sort-key range.
    pub sort: Option<SortKeyCondition>,
    /// Ascending sort-key order when `true`.
    pub forward: bool,
    /// Maximum number of items to read.
    pub limit: Option<usize>,
    /// Resume after this key (the previous page's last evaluated key).
    pub exclusive_start: Option<&'a Item>,
}

/// Storage for a single table and its index definitions.
#[derive(Debug)]
pub struct TableStorage {
    key_schema: KeySchema,
    indexes: HashMap<String, KeySchema>,
    data: DashMap<SortableAttributeValue, BTreeMap<SortableAttributeValue, Item>>,
    item_count: AtomicU64,
}

impl TableStorage {
    /// An empty table with the given primary key schema.
    #[must_use]
    pub fn new(key_schema: KeySchema) -> Self {
        Self {
            key_schema,
            indexes: HashMap::new(),
            data: DashMap::new(),
            item_count: AtomicU64::new(0),
        }
    }

    /// Define a global secondary index.
    #[must_use]
    pub fn with_index(mut self, name: impl Into<String>, key_schema: KeySchema) -> Self {
        self.indexes.insert(name.into(), key_schema);
        self
    }

    /// The primary key schema.
    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        &self.key_schema
    }

    /// The key schema used to read `index`, or the table's own for `None`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::IndexNotFound` for an unknown index.
    pub fn schema_for(&self, index: Option<&str>) -> Result<&KeySchema, StorageError> {
        match index {
            None => Ok(&self.key_schema),
            Some(name) => self
                .indexes
                .get(name)
                .ok_or_else(|| StorageError::IndexNotFound {
                    name: name.to_owned(),
                }),
        }
    }

    /// Number of stored items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.item_count.load(AtomicOrdering::Relaxed)
    }

    /// Insert or replace an item, returning the replaced one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when a table key attribute is missing, or any
    /// present key attribute (table or index) has the wrong type.
    pub fn put_item(&self, item: Item) -> Result<Option<Item>, StorageError> {
        let key = extract_primary_key(&self.key_schema, &item)?;
        for schema in self.indexes.values() {
            for attr in std::iter::once(&schema.partition_key).chain(&schema.sort_key) {
                if let Some(value) = item.get(&attr.name) {
                    validate_key_type(attr, value)?;
                }
            }
        }

        let sort_key = key.sort_key.unwrap_or(SortableAttributeValue::Sentinel);
        let old = self
            .data
            .entry(key.partition_key)
            .or_default()
            .insert(sort_key, item);

        if old.is_some() {
            debug!("replaced existing item");
        } else {
            self.item_count.fetch_add(1, AtomicOrdering::Relaxed);
            debug!("inserted new item");
        }
        Ok(old)
    }

    /// Fetch an item by primary key.
    #[must_use]
    pub fn get_item(&self, key: &PrimaryKey) -> Option<Item> {
        let sort_key = key
            .sort_key
            .as_ref()
            .unwrap_or(&SortableAttributeValue::Sentinel);
        self.data
            .get(&key.partition_key)
            .and_then(|partition| partition.get(sort_key).cloned())
    }

    /// Read one page of items matching `query`.
    ///
    /// Items come back in key order (reversed when not forward). At most
    /// `limit` are returned; the last evaluated key is set only when more
    /// matching items remain, and carries the table keys plus, for an index
    /// read, the index keys.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for an unknown index or an exclusive start key
    /// missing key attributes.
    pub fn query(&self, query: &KeyQuery<'_>) -> Result<RawPage, StorageError> {
        let schema = self.schema_for(query.index)?;
        let index_schema = query.index.map(|_| schema);

        let mut candidates = match index_schema {
            None => self.collect_table_partition(query),
            Some(schema) => self.collect_index_partition(schema, query),
        };
        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        if !query.forward {
            candidates.reverse();
        }

        if let Some(start) = query.exclusive_start {
            let start = self.position_of(index_schema, start)?;
            let skip = candidates
                .iter()
                .take_while(|(position, _)| {
                    if query.forward {
                        *position <= start
                    } else {
                        *position >= start
                    }
                })
                .count();
            candidates.drain(..skip);
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        let has_more = candidates.len() > limit;
        candidates.truncate(limit);

        let last_evaluated_key = if has_more {
            candidates
                .last()
                .map(|(_, item)| self.last_key_of(index_schema, item))
        } else {
            None
        };

        debug!(
            index = query.index,
            count = candidates.len(),
            has_more,
            "read partition"
        );
        Ok(RawPage {
            items: candidates.into_iter().map(|(_, item)| item).collect(),
            last_evaluated_key,
        })
    }

    fn collect_table_partition(&self, query: &KeyQuery<'_>) -> Vec<(Vec<SortableAttributeValue>, Item)> {
        let Some(partition) = self.data.get(&query.partition) else {
            return Vec::new();
        };
        partition
            .iter()
            .filter(|(sk, _)| sort_matches(query.sort.as_ref(), sk))
            .map(|(sk, item)| (vec![sk.clone()], item.clone()))
            .collect()
    }

    fn collect_index_partition(
        &self,
        schema: &KeySchema,
        query: &KeyQuery<'_>,
    ) -> Vec<(Vec<SortableAttributeValue>, Item)> {
        let mut out = Vec::new();
        for partition in &self.data {
            for (table_sk, item) in partition.value() {
                let Some(pk) = key_value(&schema.partition_key, item) else {
                    continue;
                };
                if pk != query.partition {
                    continue;
                }
                let index_sk = match &schema.sort_key {
                    Some(attr) => match key_value(attr, item) {
                        Some(sk) => sk,
                        None => continue,
                    },
                    None => SortableAttributeValue::Sentinel,
                };
                if !sort_matches(query.sort.as_ref(), &index_sk) {
                    continue;
                }
                let position = vec![index_sk, partition.key().clone(), table_sk.clone()];
                out.push((position, item.clone()));
            }
        }
        out
    }

    /// Ordering position of a (start) key: the table sort key, or for an
    /// index the index sort key followed by the table keys.
    fn position_of(
        &self,
        index_schema: Option<&KeySchema>,
        key: &Item,
    ) -> Result<Vec<SortableAttributeValue>, StorageError> {
        let table_key = extract_primary_key(&self.key_schema, key)?;
        let table_sk = table_key
            .sort_key
            .unwrap_or(SortableAttributeValue::Sentinel);
        let Some(schema) = index_schema else {
            return Ok(vec![table_sk]);
        };
        let index_sk = match &schema.sort_key {
            Some(attr) => {
                let value = key
                    .get(&attr.name)
                    .ok_or_else(|| StorageError::MissingKeyAttribute {
                        attr: attr.name.clone(),
                    })?;
                SortableAttributeValue::from_attribute_value(&attr.name, value)?
            }
            None => SortableAttributeValue::Sentinel,
        };
        Ok(vec![index_sk, table_key.partition_key, table_sk])
    }

    fn last_key_of(&self, index_schema: Option<&KeySchema>, item: &Item) -> Item {
        self.key_schema
            .attribute_names()
            .chain(index_schema.into_iter().flat_map(KeySchema::attribute_names))
            .filter_map(|name| item.get(name).map(|v| (name.to_owned(), v.clone())))
            .collect()
    }
}

fn sort_matches(condition: Option<&SortKeyCondition>, value: &SortableAttributeValue) -> bool {
    condition.is_none_or(|c| c.matches(value))
}

fn key_value(attr: &KeyAttribute, item: &Item) -> Option<SortableAttributeValue> {
    let value = item.get(&attr.name)?;
    validate_key_type(attr, value).ok()?;
    SortableAttributeValue::from_attribute_value(&attr.name, value).ok()
}

/// Extract and type-check the primary key of `item`.
///
/// # Errors
///
/// Returns `StorageError` for a missing or mistyped key attribute.
pub fn extract_primary_key(key_schema: &KeySchema, item: &Item) -> Result<PrimaryKey, StorageError> {
    let partition_key = required_key(&key_schema.partition_key, item)?;
    let sort_key = key_schema
        .sort_key
        .as_ref()
        .map(|attr| required_key(attr, item))
        .transpose()?;
    Ok(PrimaryKey {
        partition_key,
        sort_key,
    })
}

fn required_key(attr: &KeyAttribute, item: &Item) -> Result<SortableAttributeValue, StorageError> {
    let value = item
        .get(&attr.name)
        .ok_or_else(|| StorageError::MissingKeyAttribute {
            attr: attr.name.clone(),
        })?;
    validate_key_type(attr, value)?;
    SortableAttributeValue::from_attribute_value(&attr.name, value)
}

/// Check that `value` has the declared type of `attr`.
///
/// # Errors
///
/// Returns `StorageError::InvalidKeyType` on mismatch.
pub fn validate_key_type(attr: &KeyAttribute, value: &AttributeValue) -> Result<(), StorageError> {
    if matches!(
        (attr.attr_type, value),
        (ScalarType::S, AttributeValue::S(_))
            | (ScalarType::N, AttributeValue::N(_))
            | (ScalarType::B, AttributeValue::B(_))
    ) {
        Ok(())
    } else {
        Err(StorageError::InvalidKeyType {
            attr: attr.name.clone(),
            expected: attr.attr_type.as_str().to_owned(),
            actual: value.type_descriptor().to_owned(),
        })
    }
}

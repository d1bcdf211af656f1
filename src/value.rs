//! Runtime values for field storage and the wire representation
//!
//! One enum serves both sides of a conversion:
//! - The wire subset is nil, bool, integer, float, text, array and maps with text keys
//! - `Set`, `Struct` and `Custom` only ever live inside instances
//! - `Clone` shares text and custom payloads; `deep_clone` copies everything

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::{Equivalent, IndexMap, IndexSet};

use crate::instance::Instance;

/// A field value or a wire value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Immutable text, shared on clone
    Text(Arc<str>),
    Array(Vec<Value>),
    /// Unique elements in insertion order
    Set(Vec<Value>),
    Map(ValueMap),
    /// Nested struct instance
    Struct(Box<Instance>),
    /// Decoded custom scalar
    Custom(CustomValue),
}

impl Value {
    /// Create a text value
    pub fn text(s: impl AsRef<str>) -> Self {
        Value::Text(Arc::from(s.as_ref()))
    }

    /// Create a set, dropping duplicate elements
    pub fn set_of(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Set(dedup_values(items))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&[Value]> {
        match self {
            Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Instance> {
        match self {
            Value::Struct(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn as_custom(&self) -> Option<&CustomValue> {
        match self {
            Value::Custom(c) => Some(c),
            _ => None,
        }
    }

    /// Short name of the value's shape, used in error messages
    pub fn shape_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Custom(_) => "custom",
        }
    }

    /// Returns true if the value (recursively) is legal on the wire.
    pub fn is_wire(&self) -> bool {
        match self {
            Value::Nil | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Text(_) => true,
            Value::Array(items) => items.iter().all(Value::is_wire),
            Value::Map(map) => map.is_wire(),
            Value::Set(_) | Value::Struct(_) | Value::Custom(_) => false,
        }
    }

    /// Structural clone that also duplicates custom payloads.
    ///
    /// Text stays shared: it is immutable.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::Nil => Value::Nil,
            Value::Bool(b) => Value::Bool(*b),
            Value::Int(i) => Value::Int(*i),
            Value::Float(f) => Value::Float(*f),
            Value::Text(s) => Value::Text(Arc::clone(s)),
            Value::Array(items) => Value::Array(items.iter().map(Value::deep_clone).collect()),
            Value::Set(items) => Value::Set(items.iter().map(Value::deep_clone).collect()),
            Value::Map(map) => Value::Map(map.deep_clone()),
            Value::Struct(inst) => Value::Struct(Box::new(inst.deep_clone())),
            Value::Custom(c) => Value::Custom(c.deep_clone()),
        }
    }

    /// Convert a JSON document into a wire value.
    ///
    /// Integers that do not fit in `i64` become floats.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => {
                let mut map = ValueMap::with_capacity(obj.len());
                for (k, v) in obj {
                    map.insert(Value::text(k), Value::from_json(v));
                }
                Value::Map(map)
            }
        }
    }

    /// Convert a wire value into JSON.
    ///
    /// Returns `None` if the value is not wire-legal or holds a non-finite float.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Value::Nil => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::Number(serde_json::Number::from_f64(*f)?),
            Value::Text(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Option<Vec<_>>>()?,
            ),
            Value::Map(map) => serde_json::Value::Object(map.to_json()?),
            Value::Set(_) | Value::Struct(_) | Value::Custom(_) => return None,
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                let theirs: HashSet<ValueRef<'_>> = b.iter().map(ValueRef).collect();
                a.iter().all(|item| theirs.contains(&ValueRef(item)))
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::Set(items) => {
                f.write_str("Set")?;
                f.debug_set().entries(items).finish()
            }
            Value::Map(map) => fmt::Debug::fmt(map, f),
            Value::Struct(inst) => fmt::Debug::fmt(inst, f),
            Value::Custom(c) => fmt::Debug::fmt(c, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

impl From<Instance> for Value {
    fn from(inst: Instance) -> Self {
        Value::Struct(Box::new(inst))
    }
}

impl From<CustomValue> for Value {
    fn from(c: CustomValue) -> Self {
        Value::Custom(c)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Nil, Into::into)
    }
}

/// Drop duplicate elements, keeping the first occurrence of each.
pub(crate) fn dedup_values(items: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let unique: IndexSet<ValueKey> = items.into_iter().map(ValueKey).collect();
    unique.into_iter().map(|k| k.0).collect()
}

// ════════════════════════════════════════════════════════════════
//  Hashing
// ════════════════════════════════════════════════════════════════

const TAG_NIL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_TEXT: u8 = 4;
const TAG_ARRAY: u8 = 5;
const TAG_SET: u8 = 6;
const TAG_MAP: u8 = 7;
const TAG_STRUCT: u8 = 8;
const TAG_CUSTOM: u8 = 9;

/// Hash consistent with `Value`'s equality.
///
/// Sets and maps compare without regard to order, so only their length is
/// hashed. Structs and custom scalars hash their type name.
fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Nil => state.write_u8(TAG_NIL),
        Value::Bool(b) => {
            state.write_u8(TAG_BOOL);
            b.hash(state);
        }
        Value::Int(i) => {
            state.write_u8(TAG_INT);
            i.hash(state);
        }
        Value::Float(f) => {
            state.write_u8(TAG_FLOAT);
            // 0.0 == -0.0
            let bits = if *f == 0.0 { 0 } else { f.to_bits() };
            bits.hash(state);
        }
        Value::Text(s) => hash_text(s, state),
        Value::Array(items) => {
            state.write_u8(TAG_ARRAY);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Set(items) => {
            state.write_u8(TAG_SET);
            items.len().hash(state);
        }
        Value::Map(map) => {
            state.write_u8(TAG_MAP);
            map.len().hash(state);
        }
        Value::Struct(inst) => {
            state.write_u8(TAG_STRUCT);
            inst.type_name().hash(state);
        }
        Value::Custom(c) => {
            state.write_u8(TAG_CUSTOM);
            c.type_name().hash(state);
        }
    }
}

fn hash_text<H: Hasher>(s: &str, state: &mut H) {
    state.write_u8(TAG_TEXT);
    s.hash(state);
}

/// Owned map key
#[derive(Clone)]
struct ValueKey(Value);

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for ValueKey {}

/// Borrowed set element
struct ValueRef<'a>(&'a Value);

impl Hash for ValueRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(self.0, state);
    }
}

impl PartialEq for ValueRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for ValueRef<'_> {}

/// Text lookup key, hashed like `Value::Text`
struct TextKey<'a>(&'a str);

impl Hash for TextKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_text(self.0, state);
    }
}

impl Equivalent<ValueKey> for TextKey<'_> {
    fn equivalent(&self, key: &ValueKey) -> bool {
        key.0.as_text() == Some(self.0)
    }
}

// ════════════════════════════════════════════════════════════════
//  ValueMap
// ════════════════════════════════════════════════════════════════

/// Insertion-ordered key/value map.
///
/// Equality ignores order. Keys are unique; `insert` replaces in place.
#[derive(Clone, Default)]
pub struct ValueMap {
    entries: IndexMap<ValueKey, Value>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a text key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(&TextKey(key))
    }

    /// Look up an arbitrary key
    pub fn get_value(&self, key: &Value) -> Option<&Value> {
        match key {
            Value::Text(s) => self.get(s),
            other => self.entries.get(&ValueKey(other.clone())),
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(&TextKey(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&TextKey(key))
    }

    /// Insert or replace, returning the previous value
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(ValueKey(key.into()), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(&TextKey(key))
    }

    /// Insert every entry of `other`, replacing existing keys
    pub fn merge(&mut self, other: &ValueMap) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (&k.0, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.keys().map(|k| &k.0)
    }

    /// Text keys only, in insertion order
    pub fn text_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().filter_map(|k| k.0.as_text())
    }

    /// Keep only the entries for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&Value, &Value) -> bool) {
        self.entries.retain(|k, v| keep(&k.0, v));
    }

    pub fn is_wire(&self) -> bool {
        self.entries
            .iter()
            .all(|(k, v)| matches!(k.0, Value::Text(_)) && v.is_wire())
    }

    pub fn deep_clone(&self) -> ValueMap {
        ValueMap {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (ValueKey(k.0.deep_clone()), v.deep_clone()))
                .collect(),
        }
    }

    pub fn from_json_object(obj: &serde_json::Map<String, serde_json::Value>) -> ValueMap {
        let mut map = ValueMap::with_capacity(obj.len());
        for (k, v) in obj {
            map.insert(Value::text(k), Value::from_json(v));
        }
        map
    }

    pub fn to_json(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        let mut out = serde_json::Map::new();
        for (k, v) in self.iter() {
            out.insert(k.as_text()?.to_string(), v.to_json()?);
        }
        Some(out)
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Debug for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for ValueMap {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .into_iter()
            .map(|(k, v)| (k.0, v))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

// ════════════════════════════════════════════════════════════════
//  CustomValue
// ════════════════════════════════════════════════════════════════

/// Object-safe view of a decoded custom scalar.
///
/// Implemented for every `Clone + PartialEq + Debug` type that is `Send + Sync`.
pub trait ScalarObject: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn eq_dyn(&self, other: &dyn ScalarObject) -> bool;
    fn clone_shared(&self) -> Arc<dyn ScalarObject>;
    fn type_name(&self) -> &'static str;
}

impl<T> ScalarObject for T
where
    T: Any + fmt::Debug + Clone + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_dyn(&self, other: &dyn ScalarObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn clone_shared(&self) -> Arc<dyn ScalarObject> {
        Arc::new(self.clone())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Shared, immutable decoded custom scalar.
#[derive(Clone)]
pub struct CustomValue(Arc<dyn ScalarObject>);

impl CustomValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + fmt::Debug + Clone + PartialEq + Send + Sync,
    {
        CustomValue(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    /// Fresh copy of the payload, not sharing the original allocation
    pub fn deep_clone(&self) -> CustomValue {
        CustomValue(self.0.clone_shared())
    }

    /// True if both handles share one payload
    pub fn ptr_eq(&self, other: &CustomValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_dyn(other.0.as_ref())
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_equality_ignores_order() {
        let a: ValueMap = [("a", Value::Int(1)), ("b", Value::Int(2))].into_iter().collect();
        let b: ValueMap = [("b", Value::Int(2)), ("a", Value::Int(1))].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_insert_replaces_existing_key() {
        let mut map = ValueMap::new();
        assert!(map.insert("k", 1).is_none());
        assert_eq!(map.insert("k", 2), Some(Value::Int(1)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("k"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_non_text_keys_hash_by_value() {
        let id = CustomValue::new(42u32);
        let mut map = ValueMap::new();
        map.insert(Value::Custom(id.clone()), "a");
        map.insert(Value::Float(-0.0), "zero");
        map.insert(Value::Array(vec![Value::Int(1)]), "list");

        assert_eq!(map.get_value(&Value::Custom(id.deep_clone())), Some(&Value::text("a")));
        assert_eq!(map.get_value(&Value::Float(0.0)), Some(&Value::text("zero")));
        assert_eq!(map.get_value(&Value::Array(vec![Value::Int(1)])), Some(&Value::text("list")));
        assert!(map.get_value(&Value::Int(42)).is_none());
        assert!(map.get_value(&Value::text("zero")).is_none());

        map.insert("k", 1);
        assert_eq!(map.remove("k"), Some(Value::Int(1)));
        assert_eq!(map.keys().count(), 3);
    }

    #[test]
    fn test_set_of_drops_duplicates() {
        let set = Value::set_of(vec![Value::Int(1), Value::Int(2), Value::Int(1)]);
        assert_eq!(set.as_set().map(|s| s.len()), Some(2));
        assert_eq!(set, Value::set_of(vec![Value::Int(2), Value::Int(1)]));
    }

    #[test]
    fn test_json_conversion() {
        let doc = json!({"a": 1, "b": [true, null, 2.5], "c": {"d": "x"}});
        let value = Value::from_json(&doc);
        assert!(value.is_wire());
        assert_eq!(value.to_json(), Some(doc));
    }

    #[test]
    fn test_non_wire_values() {
        assert!(!Value::set_of(vec![Value::Int(1)]).is_wire());
        assert!(!Value::Custom(CustomValue::new(7u8)).is_wire());
        let mut map = ValueMap::new();
        map.insert(Value::Int(1), Value::Nil);
        assert!(!map.is_wire());
        assert!(Value::Map(map).to_json().is_none());
    }

    #[test]
    fn test_custom_value_equality_and_deep_clone() {
        let a = CustomValue::new(String::from("x"));
        let b = a.clone();
        let c = a.deep_clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a, c);
        assert_ne!(a, CustomValue::new(String::from("y")));
        assert_ne!(a, CustomValue::new(1i64));
        assert_eq!(c.downcast_ref::<String>().map(String::as_str), Some("x"));
    }

    #[test]
    fn test_large_unsigned_becomes_float() {
        let value = Value::from_json(&json!(u64::MAX));
        assert!(matches!(value, Value::Float(_)));
    }
}

// resource.rs — Resource model and property catalogs.
//
// Every discovered cloud object implements `Resource`: it has a kind, a
// provider-assigned id, and a flat set of typed properties readable by name.
//
// The compiler never looks at instances. It binds rule text against a
// `ResourceDescriptor`, the per-kind property catalog, so property references
// can be validated (and listed for `describe`) before any discovery call.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// The semantic type of a resource property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    StringSet,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::String => write!(f, "string"),
            PropertyType::Number => write!(f, "number"),
            PropertyType::Boolean => write!(f, "boolean"),
            PropertyType::StringSet => write!(f, "string set"),
        }
    }
}

/// A property value read from a resource.
///
/// Integers and floating point values share the `Number` variant; this is the
/// numeric widening the rule language relies on when comparing `1` to `1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Number(f64),
    String(String),
    StringSet(BTreeSet<String>),
}

impl PropertyValue {
    /// Build a string-set value from any iterator of strings.
    pub fn set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyValue::StringSet(items.into_iter().map(Into::into).collect())
    }

    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::Number(_) => PropertyType::Number,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::StringSet(_) => PropertyType::StringSet,
        }
    }
}

/// Render a number the way authors write it: `3` rather than `3.0`.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Number(n) => write!(f, "{}", format_number(*n)),
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::StringSet(items) => {
                let joined: Vec<&str> = items.iter().map(String::as_str).collect();
                write!(f, "{}", joined.join(", "))
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

/// Display hook for a single property. Never consulted during evaluation.
pub type PropertyFormatter = fn(&PropertyValue) -> String;

/// One entry in a resource kind's property catalog.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip)]
    pub formatter: Option<PropertyFormatter>,
}

/// The property catalog of one resource kind.
///
/// Property order is the declaration order; `sorted_properties()` gives the
/// alphabetical view used for help output.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDescriptor {
    pub kind: String,
    pub provider: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub properties: Vec<PropertyDescriptor>,
}

impl ResourceDescriptor {
    pub fn new(kind: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            provider: provider.into(),
            description: String::new(),
            properties: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a property with default display formatting.
    pub fn property(
        self,
        name: impl Into<String>,
        property_type: PropertyType,
        description: impl Into<String>,
    ) -> Self {
        self.push_property(name.into(), property_type, description.into(), None)
    }

    /// Declare a property with a custom display formatter.
    pub fn formatted_property(
        self,
        name: impl Into<String>,
        property_type: PropertyType,
        description: impl Into<String>,
        formatter: PropertyFormatter,
    ) -> Self {
        self.push_property(name.into(), property_type, description.into(), Some(formatter))
    }

    fn push_property(
        mut self,
        name: String,
        property_type: PropertyType,
        description: String,
        formatter: Option<PropertyFormatter>,
    ) -> Self {
        // Redeclaring a property replaces the earlier entry so names stay unique.
        self.properties.retain(|p| p.name != name);
        self.properties.push(PropertyDescriptor {
            name,
            property_type,
            description,
            formatter,
        });
        self
    }

    /// Exact (case-sensitive) property lookup.
    pub fn property_named(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Case-insensitive lookup, used only to suggest a spelling in diagnostics.
    pub fn property_like(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn sorted_properties(&self) -> Vec<&PropertyDescriptor> {
        let mut props: Vec<&PropertyDescriptor> = self.properties.iter().collect();
        props.sort_by(|a, b| a.name.cmp(&b.name));
        props
    }

    /// Display text for one property of a resource.
    ///
    /// Preference order: the resource's own formatting hook, the catalog's
    /// formatter, then the value's `Display`. Missing values render empty.
    pub fn format_value(&self, resource: &dyn Resource, name: &str) -> String {
        if let Some(custom) = resource.format_property(name) {
            return custom;
        }
        let Some(value) = resource.property(name) else {
            return String::new();
        };
        match self.property_named(name).and_then(|p| p.formatter) {
            Some(formatter) => formatter(&value),
            None => value.to_string(),
        }
    }
}

/// Identity of a discovered resource: its kind plus the provider-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentity {
    pub kind: String,
    pub id: String,
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// The capability every discovered cloud object provides.
///
/// `property` returns `None` when the resource has no value for the name;
/// the evaluator reports that as a fault rather than a failed check.
pub trait Resource: Send + Sync + fmt::Debug {
    fn kind(&self) -> &str;

    fn id(&self) -> &str;

    fn property(&self, name: &str) -> Option<PropertyValue>;

    /// Optional per-property display override.
    fn format_property(&self, _name: &str) -> Option<String> {
        None
    }

    fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            kind: self.kind().to_string(),
            id: self.id().to_string(),
        }
    }
}

/// A resource backed by a property map.
///
/// Useful for inventories that are not modelled as typed structs, and for tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicResource {
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl DynamicResource {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

impl Resource for DynamicResource {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.properties.get(name).cloned()
    }
}

/// Property catalogs for every resource kind a set of providers can discover.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    descriptors: BTreeMap<String, ResourceDescriptor>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ResourceDescriptor) {
        self.descriptors.insert(descriptor.kind.clone(), descriptor);
    }

    pub fn with(mut self, descriptor: ResourceDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Add every descriptor of `other`; later registrations win on name clashes.
    pub fn merge(&mut self, other: &ResourceCatalog) {
        for descriptor in other.descriptors.values() {
            self.register(descriptor.clone());
        }
    }

    /// Look up a kind by exact name, falling back to a case-insensitive match.
    pub fn get(&self, kind: &str) -> Option<&ResourceDescriptor> {
        self.descriptors.get(kind).or_else(|| {
            self.descriptors
                .values()
                .find(|d| d.kind.eq_ignore_ascii_case(kind))
        })
    }

    pub fn require(&self, kind: &str) -> Result<&ResourceDescriptor, PolicyError> {
        self.get(kind).ok_or_else(|| PolicyError::UnknownResource {
            kind: kind.to_string(),
        })
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

//! Describe payloads
//!
//! Shapes of the global and per-object describe responses. Only the members
//! the resolver reads are modelled; everything else in the payload is ignored.

use serde::{Deserialize, Serialize};

/// Global describe: every object visible to the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalDescribe {
    #[serde(default)]
    pub sobjects: Vec<SObjectSummary>,
}

/// One entry of the global describe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SObjectSummary {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub queryable: bool,
}

/// Full describe of a single object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SObjectDescribe {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub fields: Vec<FieldDescribe>,
    #[serde(default)]
    pub child_relationships: Vec<ChildRelationship>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescribe {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub nillable: bool,
    #[serde(default)]
    pub picklist_values: Vec<PicklistValue>,
    #[serde(default)]
    pub relationship_name: Option<String>,
    /// Target objects of a lookup; more than one for polymorphic fields
    #[serde(default)]
    pub reference_to: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PicklistValue {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl PicklistValue {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRelationship {
    #[serde(default)]
    pub relationship_name: Option<String>,
    #[serde(rename = "childSObject")]
    pub child_sobject: String,
    #[serde(default)]
    pub field: String,
}

impl GlobalDescribe {
    /// Case-insensitive lookup of an object summary
    pub fn find(&self, name: &str) -> Option<&SObjectSummary> {
        self.sobjects
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

impl SObjectDescribe {
    /// Fields whose relationship name matches `relationship` (case-insensitive)
    pub fn relationship_fields<'a>(
        &'a self,
        relationship: &'a str,
    ) -> impl Iterator<Item = &'a FieldDescribe> + 'a {
        self.fields.iter().filter(move |f| {
            f.relationship_name
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(relationship))
        })
    }
}

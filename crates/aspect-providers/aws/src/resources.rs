// resources.rs — Typed AWS resource kinds.
//
// Each kind is a plain struct deserialized from an inventory snapshot
// (field names follow the AWS API's PascalCase). A kind exposes its
// properties to policies through `Resource::property` and declares them,
// with types, in a static descriptor; the two must agree, which the tests
// below check for every kind.

use std::collections::BTreeMap;

use aspect_policy::{PropertyType, PropertyValue, Resource, ResourceCatalog, ResourceDescriptor};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::PROVIDER_NAME;

/// A resource kind the AWS provider can load from a snapshot.
pub trait AwsResource: Resource + DeserializeOwned + 'static {
    const KIND: &'static str;

    fn descriptor() -> ResourceDescriptor;

    /// Snapshots are stored per region; the loader stamps the region in.
    fn set_region(&mut self, region: &str);
}

/// Descriptors for every AWS resource kind.
pub fn catalog() -> ResourceCatalog {
    ResourceCatalog::new()
        .with(AwsRouteTable::descriptor())
        .with(AwsSecurityGroup::descriptor())
        .with(AwsS3Bucket::descriptor())
}

type Tags = BTreeMap<String, String>;

fn tag_keys(tags: &Tags) -> PropertyValue {
    PropertyValue::set(tags.keys().map(String::as_str))
}

fn format_tags(tags: &Tags) -> String {
    tags.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_set(value: &PropertyValue) -> String {
    match value {
        PropertyValue::StringSet(items) => items.iter().cloned().collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

// ── Route tables ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AwsRouteTable {
    pub route_table_id: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub is_main: bool,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub associated_subnets: Vec<String>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Route {
    pub destination_cidr_block: String,
    #[serde(default)]
    pub gateway_id: Option<String>,
}

impl AwsResource for AwsRouteTable {
    const KIND: &'static str = "AwsRouteTable";

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(Self::KIND, PROVIDER_NAME)
            .describe("VPC route table")
            .property("Id", PropertyType::String, "Route table id (rtb-...)")
            .property("VpcId", PropertyType::String, "Owning VPC")
            .property("Region", PropertyType::String, "AWS region")
            .property("IsMain", PropertyType::Boolean, "Main route table of its VPC")
            .property("RouteCount", PropertyType::Number, "Number of routes")
            .formatted_property(
                "DestinationCidrs",
                PropertyType::StringSet,
                "Destination CIDR blocks of all routes",
                join_set,
            )
            .formatted_property(
                "GatewayIds",
                PropertyType::StringSet,
                "Gateways targeted by routes",
                join_set,
            )
            .property(
                "HasInternetRoute",
                PropertyType::Boolean,
                "A default route points at an internet gateway",
            )
            .property("SubnetAssociations", PropertyType::Number, "Associated subnets")
            .property("Tags", PropertyType::StringSet, "Tag keys")
    }

    fn set_region(&mut self, region: &str) {
        self.region = region.to_string();
    }
}

impl Resource for AwsRouteTable {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn id(&self) -> &str {
        &self.route_table_id
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        let value: PropertyValue = match name {
            "Id" => self.route_table_id.as_str().into(),
            "VpcId" => self.vpc_id.as_str().into(),
            "Region" => self.region.as_str().into(),
            "IsMain" => self.is_main.into(),
            "RouteCount" => (self.routes.len() as f64).into(),
            "DestinationCidrs" => PropertyValue::set(
                self.routes.iter().map(|r| r.destination_cidr_block.as_str()),
            ),
            "GatewayIds" => {
                PropertyValue::set(self.routes.iter().filter_map(|r| r.gateway_id.as_deref()))
            }
            "HasInternetRoute" => self
                .routes
                .iter()
                .any(|r| {
                    matches!(r.destination_cidr_block.as_str(), "0.0.0.0/0" | "::/0")
                        && r.gateway_id.as_deref().is_some_and(|g| g.starts_with("igw-"))
                })
                .into(),
            "SubnetAssociations" => (self.associated_subnets.len() as f64).into(),
            "Tags" => tag_keys(&self.tags),
            _ => return None,
        };
        Some(value)
    }

    fn format_property(&self, name: &str) -> Option<String> {
        (name == "Tags").then(|| format_tags(&self.tags))
    }
}

// ── Security groups ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AwsSecurityGroup {
    pub group_id: String,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub ingress: Vec<IngressRule>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngressRule {
    /// `tcp`, `udp`, `icmp` or `-1` for all traffic.
    pub protocol: String,
    #[serde(default)]
    pub from_port: Option<u16>,
    #[serde(default)]
    pub to_port: Option<u16>,
    #[serde(default)]
    pub cidr_blocks: Vec<String>,
}

impl IngressRule {
    /// `22`, `8000-8080`, or `all`.
    fn ports(&self) -> String {
        match (self.protocol.as_str(), self.from_port, self.to_port) {
            ("-1", _, _) | (_, None, _) => "all".to_string(),
            (_, Some(from), Some(to)) if from != to => format!("{}-{}", from, to),
            (_, Some(from), _) => from.to_string(),
        }
    }

    fn open_to_world(&self) -> bool {
        self.cidr_blocks
            .iter()
            .any(|c| c == "0.0.0.0/0" || c == "::/0")
    }
}

impl AwsResource for AwsSecurityGroup {
    const KIND: &'static str = "AwsSecurityGroup";

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(Self::KIND, PROVIDER_NAME)
            .describe("EC2 security group")
            .property("Id", PropertyType::String, "Group id (sg-...)")
            .property("Name", PropertyType::String, "Group name")
            .property("Description", PropertyType::String, "Group description")
            .property("VpcId", PropertyType::String, "Owning VPC")
            .property("Region", PropertyType::String, "AWS region")
            .property("IngressRuleCount", PropertyType::Number, "Number of inbound rules")
            .formatted_property(
                "IngressPorts",
                PropertyType::StringSet,
                "Ports or ranges allowed inbound",
                join_set,
            )
            .formatted_property(
                "WorldOpenPorts",
                PropertyType::StringSet,
                "Inbound ports open to 0.0.0.0/0 or ::/0",
                join_set,
            )
            .property("Tags", PropertyType::StringSet, "Tag keys")
    }

    fn set_region(&mut self, region: &str) {
        self.region = region.to_string();
    }
}

impl Resource for AwsSecurityGroup {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn id(&self) -> &str {
        &self.group_id
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        let value: PropertyValue = match name {
            "Id" => self.group_id.as_str().into(),
            "Name" => self.group_name.as_str().into(),
            "Description" => self.description.as_str().into(),
            "VpcId" => self.vpc_id.as_str().into(),
            "Region" => self.region.as_str().into(),
            "IngressRuleCount" => (self.ingress.len() as f64).into(),
            "IngressPorts" => PropertyValue::set(self.ingress.iter().map(IngressRule::ports)),
            "WorldOpenPorts" => PropertyValue::set(
                self.ingress
                    .iter()
                    .filter(|r| r.open_to_world())
                    .map(IngressRule::ports),
            ),
            "Tags" => tag_keys(&self.tags),
            _ => return None,
        };
        Some(value)
    }

    fn format_property(&self, name: &str) -> Option<String> {
        (name == "Tags").then(|| format_tags(&self.tags))
    }
}

// ── S3 buckets ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AwsS3Bucket {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub versioning: bool,
    /// Default encryption algorithm (`AES256`, `aws:kms`); absent when unencrypted.
    #[serde(default)]
    pub encryption: Option<String>,
    #[serde(default)]
    pub logging_enabled: bool,
    #[serde(default)]
    pub creation_date: String,
    #[serde(default)]
    pub tags: Tags,
}

impl AwsResource for AwsS3Bucket {
    const KIND: &'static str = "AwsS3Bucket";

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(Self::KIND, PROVIDER_NAME)
            .describe("S3 bucket")
            .property("Name", PropertyType::String, "Bucket name")
            .property("Region", PropertyType::String, "AWS region")
            .property("Public", PropertyType::Boolean, "Readable by anyone")
            .property("Versioning", PropertyType::Boolean, "Object versioning enabled")
            .property(
                "Encryption",
                PropertyType::String,
                "Default encryption algorithm, or \"None\"",
            )
            .property("LoggingEnabled", PropertyType::Boolean, "Server access logging enabled")
            .property("CreationDate", PropertyType::String, "ISO-8601 creation time")
            .property("Tags", PropertyType::StringSet, "Tag keys")
    }

    fn set_region(&mut self, region: &str) {
        self.region = region.to_string();
    }
}

impl Resource for AwsS3Bucket {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn id(&self) -> &str {
        &self.name
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        let value: PropertyValue = match name {
            "Name" => self.name.as_str().into(),
            "Region" => self.region.as_str().into(),
            "Public" => self.public.into(),
            "Versioning" => self.versioning.into(),
            "Encryption" => self.encryption.as_deref().unwrap_or("None").into(),
            "LoggingEnabled" => self.logging_enabled.into(),
            "CreationDate" => self.creation_date.as_str().into(),
            "Tags" => tag_keys(&self.tags),
            _ => return None,
        };
        Some(value)
    }

    fn format_property(&self, name: &str) -> Option<String> {
        (name == "Tags").then(|| format_tags(&self.tags))
    }
}

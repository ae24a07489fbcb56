// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! EC2 resource properties: VPC plumbing, security groups, and key pairs

use crate::template::LogicalId;
use crate::template::ResourceProperties;
use crate::value::Value;
use serde::Serialize;

/// Transport protocol for a security group rule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// An inclusive port range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortRange {
    pub from: u16,
    pub to: u16,
}

impl PortRange {
    pub const fn single(port: u16) -> PortRange {
        PortRange { from: port, to: port }
    }

    pub const fn range(from: u16, to: u16) -> PortRange {
        PortRange { from, to }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcProperties {
    pub cidr_block: String,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
}

impl ResourceProperties for VpcProperties {
    const TYPE: &'static str = "AWS::EC2::VPC";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetProperties {
    pub availability_zone: Value,
    pub cidr_block: String,
    pub map_public_ip_on_launch: bool,
    pub vpc_id: Value,
}

impl ResourceProperties for SubnetProperties {
    const TYPE: &'static str = "AWS::EC2::Subnet";
}

/// Resource type for an internet gateway, which takes no properties; declare
/// one with [`crate::Resource::without_properties`].
pub const INTERNET_GATEWAY_TYPE: &str = "AWS::EC2::InternetGateway";

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcGatewayAttachmentProperties {
    pub internet_gateway_id: Value,
    pub vpc_id: Value,
}

impl ResourceProperties for VpcGatewayAttachmentProperties {
    const TYPE: &'static str = "AWS::EC2::VPCGatewayAttachment";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteTableProperties {
    pub vpc_id: Value,
}

impl ResourceProperties for RouteTableProperties {
    const TYPE: &'static str = "AWS::EC2::RouteTable";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetRouteTableAssociationProperties {
    pub route_table_id: Value,
    pub subnet_id: Value,
}

impl ResourceProperties for SubnetRouteTableAssociationProperties {
    const TYPE: &'static str = "AWS::EC2::SubnetRouteTableAssociation";
}

/// A route to a single target; use [`RouteProperties::internet`] or
/// [`RouteProperties::nat`] so exactly one target is set.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteProperties {
    pub destination_cidr_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_gateway_id: Option<Value>,
    pub route_table_id: Value,
}

impl RouteProperties {
    pub fn internet(route_table_id: Value, gateway_id: Value) -> RouteProperties {
        RouteProperties {
            destination_cidr_block: "0.0.0.0/0".to_string(),
            gateway_id: Some(gateway_id),
            nat_gateway_id: None,
            route_table_id,
        }
    }

    pub fn nat(route_table_id: Value, nat_gateway_id: Value) -> RouteProperties {
        RouteProperties {
            destination_cidr_block: "0.0.0.0/0".to_string(),
            gateway_id: None,
            nat_gateway_id: Some(nat_gateway_id),
            route_table_id,
        }
    }
}

impl ResourceProperties for RouteProperties {
    const TYPE: &'static str = "AWS::EC2::Route";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EipProperties {
    pub domain: String,
}

impl EipProperties {
    pub fn vpc() -> EipProperties {
        EipProperties { domain: "vpc".to_string() }
    }
}

impl ResourceProperties for EipProperties {
    const TYPE: &'static str = "AWS::EC2::EIP";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NatGatewayProperties {
    pub allocation_id: Value,
    pub subnet_id: Value,
}

impl ResourceProperties for NatGatewayProperties {
    const TYPE: &'static str = "AWS::EC2::NatGateway";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupProperties {
    pub group_description: String,
    pub security_group_egress: Vec<EgressRule>,
    pub vpc_id: Value,
}

impl SecurityGroupProperties {
    /// Declares a security group with the conventional allow-all egress
    /// rule; ingress rules are attached separately so a group may refer to
    /// itself (see [`SecurityGroupIngressProperties::self_referencing`]).
    pub fn allowing_all_outbound(
        group_description: &str,
        vpc_id: Value,
    ) -> SecurityGroupProperties {
        SecurityGroupProperties {
            group_description: group_description.to_string(),
            security_group_egress: vec![EgressRule {
                cidr_ip: "0.0.0.0/0".to_string(),
                description: "Allow all outbound traffic by default"
                    .to_string(),
                ip_protocol: "-1".to_string(),
            }],
            vpc_id,
        }
    }
}

impl ResourceProperties for SecurityGroupProperties {
    const TYPE: &'static str = "AWS::EC2::SecurityGroup";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EgressRule {
    pub cidr_ip: String,
    pub description: String,
    pub ip_protocol: String,
}

/// A standalone ingress rule
///
/// A rule whose source is the group it attaches to cannot be embedded in the
/// group's own `SecurityGroupIngress` property (the reference would be
/// cyclic), so ingress rules are always declared as separate resources.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupIngressProperties {
    pub description: String,
    pub from_port: u16,
    pub group_id: Value,
    pub ip_protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_security_group_id: Option<Value>,
    pub to_port: u16,
}

impl SecurityGroupIngressProperties {
    /// A rule admitting traffic from members of `group` to members of
    /// `group` on the given ports.
    pub fn self_referencing(
        group: &LogicalId,
        protocol: Protocol,
        ports: PortRange,
        description: &str,
    ) -> SecurityGroupIngressProperties {
        SecurityGroupIngressProperties {
            description: description.to_string(),
            from_port: ports.from,
            group_id: Value::get_att(group, "GroupId"),
            ip_protocol: protocol.as_str().to_string(),
            source_security_group_id: Some(Value::get_att(group, "GroupId")),
            to_port: ports.to,
        }
    }
}

impl ResourceProperties for SecurityGroupIngressProperties {
    const TYPE: &'static str = "AWS::EC2::SecurityGroupIngress";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyPairProperties {
    pub key_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_material: Option<String>,
}

impl KeyPairProperties {
    /// A key pair imported from caller-supplied public key material.
    pub fn imported(key_name: &str, public_key_material: &str) -> KeyPairProperties {
        KeyPairProperties {
            key_name: key_name.to_string(),
            public_key_material: Some(public_key_material.to_string()),
        }
    }

    /// A key pair whose material is generated at creation time; the private
    /// key lands in the platform's parameter store.
    pub fn generated(key_name: &str) -> KeyPairProperties {
        KeyPairProperties {
            key_name: key_name.to_string(),
            public_key_material: None,
        }
    }
}

impl ResourceProperties for KeyPairProperties {
    const TYPE: &'static str = "AWS::EC2::KeyPair";
}

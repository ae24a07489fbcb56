// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The network stack: one VPC with three subnet tiers
//!
//! The VPC's CIDR block is carved into equal slices, one per subnet, laid
//! out tier-major: all public subnets first, then private, then isolated.
//! Each tier has one subnet per enabled availability zone.  Public subnets
//! route to an internet gateway; private subnets route to NAT gateways
//! (one per zone, or a single shared one, per configuration); isolated
//! subnets route nowhere.

use anyhow::ensure;
use cfn_types::ec2;
use cfn_types::LogicalId;
use cfn_types::Output;
use cfn_types::Resource;
use cfn_types::Stack;
use cfn_types::Template;
use cfn_types::Value;
use hpc_config::DeployConfig;
use hpc_config::VpcConfig;
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

pub const STACK_NAME: &str = "HpcNetwork";

/// Smallest subnet the platform accepts.
const MAX_SUBNET_PREFIX: u8 = 28;

/// The three subnet tiers, in the order their CIDR slices are laid out.
const TIERS: [Tier; 3] = [
    Tier { label: "Public", map_public_ip: true },
    Tier { label: "Private", map_public_ip: false },
    Tier { label: "Isolated", map_public_ip: false },
];

#[derive(Clone, Copy)]
struct Tier {
    label: &'static str,
    map_public_ip: bool,
}

/// What downstream stacks need to know about the network: import tokens
/// for the VPC and subnet ids, plus the literal CIDR block
#[derive(Clone, Debug)]
pub struct NetworkFacts {
    pub vpc_id: Value,
    pub vpc_cidr: Ipv4Network,
    pub public_subnet_ids: Vec<Value>,
    pub private_subnet_ids: Vec<Value>,
    pub isolated_subnet_ids: Vec<Value>,
}

/// How many NAT gateways the configuration calls for.
pub fn nat_gateway_count(vpc: &VpcConfig) -> usize {
    if vpc.nat_per_az {
        vpc.enabled_az_count
    } else {
        1
    }
}

pub fn build(config: &DeployConfig) -> anyhow::Result<(Stack, NetworkFacts)> {
    let vpc_config = &config.vpc;
    let az_count = vpc_config.enabled_az_count;
    ensure!(az_count >= 1, "vpc.enabled_az_count must be at least 1");

    let subnet_cidrs = carve(vpc_config.cidr, TIERS.len() * az_count)?;
    let mut stack = Stack::new(
        STACK_NAME,
        "VPC with public, private, and isolated subnet tiers",
    )?;

    let vpc = stack.template_mut().resource(
        "Vpc",
        Resource::new(&ec2::VpcProperties {
            cidr_block: vpc_config.cidr.to_string(),
            enable_dns_hostnames: true,
            enable_dns_support: true,
        })?,
    )?;

    let internet_gateway = stack.template_mut().resource(
        "InternetGateway",
        Resource::without_properties(ec2::INTERNET_GATEWAY_TYPE),
    )?;
    let gateway_attachment = stack.template_mut().resource(
        "VpcGatewayAttachment",
        Resource::new(&ec2::VpcGatewayAttachmentProperties {
            internet_gateway_id: Value::reference(&internet_gateway),
            vpc_id: Value::reference(&vpc),
        })?,
    )?;

    // Public tier, with a default route to the internet gateway.
    let mut public_subnets = Vec::new();
    for (index, cidr) in subnet_cidrs[..az_count].iter().enumerate() {
        let (subnet, route_table) = declare_subnet(
            stack.template_mut(),
            &vpc,
            TIERS[0],
            index,
            cidr,
        )?;
        stack.template_mut().resource(
            &format!("PublicSubnet{}DefaultRoute", index),
            Resource::new(&ec2::RouteProperties::internet(
                Value::reference(&route_table),
                Value::reference(&internet_gateway),
            ))?
            .depends_on(&gateway_attachment),
        )?;
        public_subnets.push(subnet);
    }

    // NAT gateways live in the public tier; with a shared gateway every
    // private subnet routes through the first public subnet's gateway.
    let mut nat_gateways = Vec::new();
    for index in 0..nat_gateway_count(vpc_config) {
        let eip = stack.template_mut().resource(
            &format!("NatGatewayEip{}", index),
            Resource::new(&ec2::EipProperties::vpc())?,
        )?;
        let nat_gateway = stack.template_mut().resource(
            &format!("NatGateway{}", index),
            Resource::new(&ec2::NatGatewayProperties {
                allocation_id: Value::get_att(&eip, "AllocationId"),
                subnet_id: Value::reference(&public_subnets[index]),
            })?,
        )?;
        nat_gateways.push(nat_gateway);
    }

    // Private tier, with a default route to this zone's NAT gateway.
    let mut private_subnets = Vec::new();
    for (index, cidr) in
        subnet_cidrs[az_count..2 * az_count].iter().enumerate()
    {
        let (subnet, route_table) = declare_subnet(
            stack.template_mut(),
            &vpc,
            TIERS[1],
            index,
            cidr,
        )?;
        let nat_gateway = if vpc_config.nat_per_az {
            &nat_gateways[index]
        } else {
            &nat_gateways[0]
        };
        stack.template_mut().resource(
            &format!("PrivateSubnet{}DefaultRoute", index),
            Resource::new(&ec2::RouteProperties::nat(
                Value::reference(&route_table),
                Value::reference(nat_gateway),
            ))?,
        )?;
        private_subnets.push(subnet);
    }

    // Isolated tier: no route out at all.
    let mut isolated_subnets = Vec::new();
    for (index, cidr) in subnet_cidrs[2 * az_count..].iter().enumerate() {
        let (subnet, _) = declare_subnet(
            stack.template_mut(),
            &vpc,
            TIERS[2],
            index,
            cidr,
        )?;
        isolated_subnets.push(subnet);
    }

    let vpc_id = stack.export(
        "VpcId",
        Output::new(Value::reference(&vpc)).description("VPC id"),
    )?;
    let public_subnet_ids = export_subnet_ids(&mut stack, TIERS[0], &public_subnets)?;
    let private_subnet_ids =
        export_subnet_ids(&mut stack, TIERS[1], &private_subnets)?;
    let isolated_subnet_ids =
        export_subnet_ids(&mut stack, TIERS[2], &isolated_subnets)?;

    let facts = NetworkFacts {
        vpc_id,
        vpc_cidr: vpc_config.cidr,
        public_subnet_ids,
        private_subnet_ids,
        isolated_subnet_ids,
    };
    Ok((stack, facts))
}

/// Declares one subnet with its route table and association, returning the
/// pair so the caller can attach tier-specific routes.
fn declare_subnet(
    template: &mut Template,
    vpc: &LogicalId,
    tier: Tier,
    index: usize,
    cidr: &Ipv4Network,
) -> anyhow::Result<(LogicalId, LogicalId)> {
    let subnet = template.resource(
        &format!("{}Subnet{}", tier.label, index),
        Resource::new(&ec2::SubnetProperties {
            availability_zone: Value::availability_zone(index as u64),
            cidr_block: cidr.to_string(),
            map_public_ip_on_launch: tier.map_public_ip,
            vpc_id: Value::reference(vpc),
        })?,
    )?;
    let route_table = template.resource(
        &format!("{}Subnet{}RouteTable", tier.label, index),
        Resource::new(&ec2::RouteTableProperties {
            vpc_id: Value::reference(vpc),
        })?,
    )?;
    template.resource(
        &format!("{}Subnet{}RouteTableAssociation", tier.label, index),
        Resource::new(&ec2::SubnetRouteTableAssociationProperties {
            route_table_id: Value::reference(&route_table),
            subnet_id: Value::reference(&subnet),
        })?,
    )?;
    Ok((subnet, route_table))
}

fn export_subnet_ids(
    stack: &mut Stack,
    tier: Tier,
    subnets: &[LogicalId],
) -> anyhow::Result<Vec<Value>> {
    subnets
        .iter()
        .enumerate()
        .map(|(index, subnet)| {
            stack.export(
                &format!("{}Subnet{}Id", tier.label, index),
                Output::new(Value::reference(subnet)),
            )
        })
        .collect()
}

/// Splits `network` into `count` equal consecutive subnets (the next power
/// of two's worth of address space, so slices align on their own size).
fn carve(network: Ipv4Network, count: usize) -> anyhow::Result<Vec<Ipv4Network>> {
    ensure!(count > 0, "cannot carve {} into zero subnets", network);
    let slices = count.next_power_of_two();
    let prefix = network.prefix() + slices.trailing_zeros() as u8;
    ensure!(
        prefix <= MAX_SUBNET_PREFIX,
        "cannot carve {} into {} subnets of at least /{}",
        network,
        count,
        MAX_SUBNET_PREFIX
    );
    let base = u32::from(network.network());
    let block = 1u32 << (32 - prefix);
    (0..count as u32)
        .map(|index| {
            Ipv4Network::new(Ipv4Addr::from(base + index * block), prefix)
                .map_err(anyhow::Error::from)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::build;
    use super::carve;
    use super::nat_gateway_count;
    use crate::test_helpers;
    use serde_json::json;

    #[test]
    fn carves_tier_major_slices() {
        let cidrs = carve("10.80.0.0/16".parse().unwrap(), 9).unwrap();
        let rendered: Vec<String> =
            cidrs.iter().map(|c| c.to_string()).collect();
        // 9 subnets round up to 16 slices, so each is a /20.
        assert_eq!(
            rendered,
            vec![
                "10.80.0.0/20",
                "10.80.16.0/20",
                "10.80.32.0/20",
                "10.80.48.0/20",
                "10.80.64.0/20",
                "10.80.80.0/20",
                "10.80.96.0/20",
                "10.80.112.0/20",
                "10.80.128.0/20",
            ]
        );
    }

    #[test]
    fn rejects_blocks_too_small_to_carve() {
        let err = carve("10.80.0.0/28".parse().unwrap(), 9).unwrap_err();
        assert!(err.to_string().contains("cannot carve"));
    }

    #[test]
    fn one_subnet_per_tier_per_zone() {
        let config = test_helpers::config();
        let (stack, facts) = build(&config).unwrap();
        let subnets: Vec<_> = stack
            .template()
            .resources_of_type("AWS::EC2::Subnet")
            .collect();
        assert_eq!(subnets.len(), 9);
        assert_eq!(facts.public_subnet_ids.len(), 3);
        assert_eq!(facts.private_subnet_ids.len(), 3);
        assert_eq!(facts.isolated_subnet_ids.len(), 3);
    }

    #[test]
    fn shared_nat_gateway() {
        let config = test_helpers::config();
        assert!(!config.vpc.nat_per_az);
        assert_eq!(nat_gateway_count(&config.vpc), 1);
        let (stack, _) = build(&config).unwrap();
        assert_eq!(
            stack
                .template()
                .resources_of_type("AWS::EC2::NatGateway")
                .count(),
            1
        );
    }

    #[test]
    fn nat_gateway_per_zone() {
        let mut config = test_helpers::config();
        config.vpc.nat_per_az = true;
        assert_eq!(nat_gateway_count(&config.vpc), 3);
        let (stack, _) = build(&config).unwrap();
        assert_eq!(
            stack
                .template()
                .resources_of_type("AWS::EC2::NatGateway")
                .count(),
            3
        );
        // Each private subnet routes through its own zone's gateway.
        for index in 0..3 {
            let route = stack
                .template()
                .resources()
                .find(|(id, _)| {
                    id.as_str()
                        == format!("PrivateSubnet{}DefaultRoute", index)
                })
                .map(|(_, r)| r)
                .unwrap();
            assert_eq!(
                route.property("NatGatewayId").unwrap(),
                &json!({ "Ref": format!("NatGateway{}", index) })
            );
        }
    }

    #[test]
    fn subnets_bound_to_distinct_zones() {
        let config = test_helpers::config();
        let (stack, _) = build(&config).unwrap();
        for index in 0..3 {
            let subnet = stack
                .template()
                .resources()
                .find(|(id, _)| {
                    id.as_str() == format!("PrivateSubnet{}", index)
                })
                .map(|(_, r)| r)
                .unwrap();
            assert_eq!(
                subnet.property("AvailabilityZone").unwrap(),
                &json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
            );
        }
    }

    #[test]
    fn subnet_ids_exported() {
        let config = test_helpers::config();
        let (stack, _) = build(&config).unwrap();
        for name in ["PublicSubnet0Id", "PrivateSubnet2Id", "IsolatedSubnet1Id"]
        {
            let output = stack.template().get_output(name).unwrap();
            assert_eq!(
                output.export_name(),
                Some(format!("HpcNetwork:{}", name).as_str())
            );
        }
    }

    #[test]
    fn isolated_subnets_route_nowhere() {
        let config = test_helpers::config();
        let (stack, _) = build(&config).unwrap();
        let isolated_routes = stack
            .template()
            .resources_of_type("AWS::EC2::Route")
            .filter(|(id, _)| id.as_str().starts_with("Isolated"))
            .count();
        assert_eq!(isolated_routes, 0);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The cluster-provider stack: installs the ParallelCluster custom-resource
//! provider as a nested stack
//!
//! The provider template is hosted by the ParallelCluster release bucket
//! for the deployment region, pinned to the configured release.  Its
//! `ServiceToken` output is the endpoint the cluster stack submits the
//! cluster resource to.

use cfn_types::cloudformation::NestedStackProperties;
use cfn_types::Output;
use cfn_types::Resource;
use cfn_types::Stack;
use cfn_types::Value;
use hpc_config::DeployConfig;
use hpc_config::DeployEnv;

pub const STACK_NAME: &str = "HpcClusterProvider";

/// How long the platform waits for the nested stack to create.
const PROVIDER_TIMEOUT_MINUTES: u64 = 30;

#[derive(Clone, Debug)]
pub struct ProviderFacts {
    pub service_token: Value,
}

/// The region-scoped, version-pinned URL the provider template is fetched
/// from.
pub fn template_url(region: &str, version: &str) -> String {
    format!(
        "https://{region}-aws-parallelcluster.s3.{region}.amazonaws.com\
         /parallelcluster/{version}/templates/custom_resource/cluster.yaml"
    )
}

pub fn build(
    config: &DeployConfig,
    env: &DeployEnv,
) -> anyhow::Result<(Stack, ProviderFacts)> {
    let mut stack = Stack::new(
        STACK_NAME,
        "ParallelCluster custom-resource provider",
    )?;
    let provider = stack.template_mut().resource(
        "ClusterProvider",
        Resource::new(&NestedStackProperties {
            template_url: template_url(
                &env.region,
                &config.pcluster.version,
            ),
            timeout_in_minutes: PROVIDER_TIMEOUT_MINUTES,
        })?,
    )?;
    let service_token = stack.export(
        "ServiceToken",
        Output::new(Value::get_att(&provider, "Outputs.ServiceToken"))
            .description("Endpoint for Custom::PClusterCluster resources"),
    )?;
    Ok((stack, ProviderFacts { service_token }))
}

#[cfg(test)]
mod test {
    use super::build;
    use super::template_url;
    use crate::test_helpers;
    use serde_json::json;

    #[test]
    fn url_pins_region_and_version() {
        assert_eq!(
            template_url("eu-west-1", "3.8.0"),
            "https://eu-west-1-aws-parallelcluster.s3.eu-west-1.amazonaws.com\
             /parallelcluster/3.8.0/templates/custom_resource/cluster.yaml"
        );
    }

    #[test]
    fn service_token_exported_from_nested_stack() {
        let config = test_helpers::config();
        let env = test_helpers::env();
        let (stack, facts) = build(&config, &env).unwrap();
        let (_, provider) = stack
            .template()
            .resources_of_type("AWS::CloudFormation::Stack")
            .next()
            .unwrap();
        assert_eq!(
            provider.property("TimeoutInMinutes").unwrap(),
            &json!(30)
        );
        let output = stack.template().get_output("ServiceToken").unwrap();
        assert_eq!(
            serde_json::to_value(output.value()).unwrap(),
            json!({
                "Fn::GetAtt": ["ClusterProvider", "Outputs.ServiceToken"]
            })
        );
        assert_eq!(
            serde_json::to_value(&facts.service_token).unwrap(),
            json!({ "Fn::ImportValue": "HpcClusterProvider:ServiceToken" })
        );
    }
}

//! Registration document: the one-time setup requests that attach this
//! endpoint to the autoscaling controller.
//!
//! Only renders the requests; nothing here calls a remote API.

use serde_json::{Value, json};

use docscale_core::config::RegistrationConfig;

const SERVICE_NAMESPACE: &str = "custom-resource";
const SCALABLE_DIMENSION: &str = "custom-resource:ResourceType:Property";

/// Where the endpoint lives and which cluster it scales.
#[derive(Debug, Clone)]
pub struct Target {
    pub api_endpoint: String,
    pub region: String,
    pub cluster: String,
    pub account: String,
}

impl Target {
    pub fn resource_id(&self) -> String {
        format!(
            "https://{}.execute-api.{}.amazonaws.com/prod/scalableTargetDimensions/{}",
            self.api_endpoint, self.region, self.cluster
        )
    }

    pub fn role_arn(&self) -> String {
        format!(
            "arn:aws:iam::{}:role/aws-service-role/custom-resource.application-autoscaling.amazonaws.com/AWSServiceRoleForApplicationAutoScaling_CustomResource",
            self.account
        )
    }
}

/// Both setup requests: register the scalable target, then attach a
/// target-tracking policy on reader CPU utilization.
pub fn registration_document(target: &Target, config: &RegistrationConfig) -> Value {
    let resource_id = target.resource_id();
    json!({
        "registerScalableTarget": {
            "ServiceNamespace": SERVICE_NAMESPACE,
            "ResourceId": resource_id,
            "ScalableDimension": SCALABLE_DIMENSION,
            "MinCapacity": config.min_capacity,
            "MaxCapacity": config.max_capacity,
            "RoleARN": target.role_arn(),
        },
        "putScalingPolicy": {
            "PolicyName": config.policy_name,
            "ServiceNamespace": SERVICE_NAMESPACE,
            "ResourceId": resource_id,
            "ScalableDimension": SCALABLE_DIMENSION,
            "PolicyType": "TargetTrackingScaling",
            "TargetTrackingScalingPolicyConfiguration": {
                "TargetValue": config.target_value,
                "CustomizedMetricSpecification": {
                    "MetricName": "CPUUtilization",
                    "Namespace": "AWS/DocDB",
                    "Dimensions": [
                        { "Name": "Role", "Value": "READER" },
                        { "Name": "DBClusterIdentifier", "Value": target.cluster },
                    ],
                    "Statistic": "Average",
                    "Unit": "Percent",
                },
                "ScaleOutCooldown": config.scale_out_cooldown,
                "ScaleInCooldown": config.scale_in_cooldown,
                "DisableScaleIn": false,
            },
        },
    })
}

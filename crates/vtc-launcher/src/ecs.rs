//! ECS task launcher.

use async_trait::async_trait;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, ContainerOverride, KeyValuePair, LaunchType,
    NetworkConfiguration, TaskOverride,
};
use aws_sdk_ecs::Client;
use tracing::{debug, info};

use crate::error::{LaunchError, LaunchResult};

/// One worker invocation, carried entirely as environment-style
/// key/value parameters. Opaque to the launcher itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub environment: Vec<(String, String)>,
}

impl LaunchRequest {
    pub fn new(environment: Vec<(String, String)>) -> Self {
        Self { environment }
    }
}

/// Narrow launcher capability the dispatcher submits jobs through.
///
/// Tests substitute an in-memory fake; production uses [`EcsLauncher`].
#[async_trait]
pub trait JobLauncher: Send + Sync {
    /// Submit one job-launch request. Only the success or failure of
    /// the submission itself is observed.
    async fn launch(&self, request: LaunchRequest) -> LaunchResult<()>;
}

/// ECS launcher configuration.
#[derive(Debug, Clone)]
pub struct EcsConfig {
    /// Target cluster name or ARN
    pub cluster: String,
    /// Task definition family or ARN for the worker image
    pub task_definition: String,
    /// Container name within the task definition to override
    pub container_name: String,
    /// Subnets for awsvpc networking
    pub subnets: Vec<String>,
    /// Security groups for awsvpc networking
    pub security_groups: Vec<String>,
    /// Whether the task gets a public IP
    pub assign_public_ip: bool,
}

impl EcsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> LaunchResult<Self> {
        Ok(Self {
            cluster: std::env::var("ECS_CLUSTER")
                .map_err(|_| LaunchError::config("ECS_CLUSTER not set"))?,
            task_definition: std::env::var("ECS_TASK_DEFINITION")
                .map_err(|_| LaunchError::config("ECS_TASK_DEFINITION not set"))?,
            container_name: std::env::var("ECS_CONTAINER_NAME")
                .map_err(|_| LaunchError::config("ECS_CONTAINER_NAME not set"))?,
            subnets: split_csv(
                &std::env::var("ECS_SUBNETS")
                    .map_err(|_| LaunchError::config("ECS_SUBNETS not set"))?,
            ),
            security_groups: std::env::var("ECS_SECURITY_GROUPS")
                .map(|s| split_csv(&s))
                .unwrap_or_default(),
            assign_public_ip: std::env::var("ECS_ASSIGN_PUBLIC_IP")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Launches one ephemeral Fargate task per job.
#[derive(Clone)]
pub struct EcsLauncher {
    client: Client,
    config: EcsConfig,
}

impl EcsLauncher {
    /// Create a launcher from configuration.
    ///
    /// Region and credentials come from the default provider chain.
    pub async fn new(config: EcsConfig) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: Client::new(&sdk_config),
            config,
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> LaunchResult<Self> {
        let config = EcsConfig::from_env()?;
        Ok(Self::new(config).await)
    }
}

#[async_trait]
impl JobLauncher for EcsLauncher {
    async fn launch(&self, request: LaunchRequest) -> LaunchResult<()> {
        debug!(
            "Launching task {} on cluster {}",
            self.config.task_definition, self.config.cluster
        );

        let environment: Vec<KeyValuePair> = request
            .environment
            .into_iter()
            .map(|(name, value)| KeyValuePair::builder().name(name).value(value).build())
            .collect();

        let overrides = TaskOverride::builder()
            .container_overrides(
                ContainerOverride::builder()
                    .name(&self.config.container_name)
                    .set_environment(Some(environment))
                    .build(),
            )
            .build();

        let vpc = AwsVpcConfiguration::builder()
            .set_subnets(Some(self.config.subnets.clone()))
            .set_security_groups(Some(self.config.security_groups.clone()))
            .assign_public_ip(if self.config.assign_public_ip {
                AssignPublicIp::Enabled
            } else {
                AssignPublicIp::Disabled
            })
            .build()
            .map_err(|e| LaunchError::config(e.to_string()))?;

        let output = self
            .client
            .run_task()
            .cluster(&self.config.cluster)
            .task_definition(&self.config.task_definition)
            .launch_type(LaunchType::Fargate)
            .count(1)
            .network_configuration(
                NetworkConfiguration::builder()
                    .awsvpc_configuration(vpc)
                    .build(),
            )
            .overrides(overrides)
            .send()
            .await
            .map_err(|e| LaunchError::request_failed(e.to_string()))?;

        // run_task can succeed as a call while still placing nothing.
        if let Some(failure) = output.failures().first() {
            return Err(LaunchError::rejected(
                failure.reason().unwrap_or("unknown").to_string(),
            ));
        }

        info!("Launched worker task on cluster {}", self.config.cluster);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv() {
        assert_eq!(
            split_csv("subnet-a, subnet-b,,subnet-c"),
            vec!["subnet-a", "subnet-b", "subnet-c"]
        );
        assert!(split_csv("").is_empty());
    }
}

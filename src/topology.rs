//!
//! Projects, hosts and disks visible to the API key
//!
use crate::config::DeploymentMode;
use crate::types::{DiskPartition, Host, Page, Project};
use crate::{Client, Result};

/// Returns the projects the API key can access
pub async fn list_projects(client: &Client) -> Result<Vec<Project>> {
    tracing::info!("Fetching all projects");
    let page: Page<Project> = client.get_json(&["groups"], None).await?;
    let projects = page.into_results();
    tracing::debug!("{} projects", projects.len());
    Ok(projects)
}

/// Returns the hosts (processes on Atlas) of a project
pub async fn list_hosts(
    client: &Client,
    mode: DeploymentMode,
    project_id: &str,
) -> Result<Vec<Host>> {
    tracing::info!("Fetching hosts for project {}", project_id);
    let page: Page<Host> = client
        .get_json(&["groups", project_id, mode.host_collection()], None)
        .await?;
    Ok(page.into_results())
}

/// Returns the disk partitions of a host
pub async fn list_disks(
    client: &Client,
    mode: DeploymentMode,
    project_id: &str,
    host_id: &str,
) -> Result<Vec<DiskPartition>> {
    let page: Page<DiskPartition> = client
        .get_json(
            &["groups", project_id, mode.host_collection(), host_id, "disks"],
            None,
        )
        .await?;
    Ok(page.into_results())
}

//! Inventory lookups

use crate::operations::{
    ContinueRetrievePropertiesExOperation, ContinueRetrievePropertiesExRequest,
    FindDatacentersOperation, FindDatacentersRequest,
};
use crate::types::{InventoryRoot, ServiceContent};
use crate::{Result, VimClient};

/// List every datacenter reachable from the root folder
///
/// Follows continuation tokens until the server has returned all pages.
pub fn find_datacenters(client: &VimClient, content: &ServiceContent) -> Result<Vec<InventoryRoot>> {
    let request = FindDatacentersRequest {
        property_collector: content.property_collector.clone(),
        root_folder: content.root_folder.clone(),
    };
    let mut page = client.execute::<FindDatacentersOperation>(&request)?;
    let mut datacenters = std::mem::take(&mut page.datacenters);

    while let Some(token) = page.token.take() {
        let request = ContinueRetrievePropertiesExRequest {
            property_collector: content.property_collector.clone(),
            token,
        };
        page = client.execute::<ContinueRetrievePropertiesExOperation>(&request)?;
        datacenters.append(&mut page.datacenters);
    }

    tracing::debug!(count = datacenters.len(), "found datacenters");
    Ok(datacenters)
}

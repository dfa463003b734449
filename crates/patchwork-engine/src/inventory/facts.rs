/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Extraction of hierarchy names and server attributes from node facts.

use super::NodeRecord;
use patchwork_models::models::{Backend, NewServer};
use uuid::Uuid;

const FACT_APPLICATION: &str = "application";
const FACT_ENVIRONMENT: &str = "application_environment";
const FACT_COMPONENT: &str = "application_component";
const FACT_PROCEDURE: &str = "patching-automation.patching_procedure_url";
const FACT_HEALTH_CHECK: &str = "patching-automation.post_reboot_scriptpath";
const FACT_IP: &str = "ipaddress";
const FACT_OS_NAME: &str = "os.name";
const FACT_OS_VERSION: &str = "os.release.full";
const FACT_HOSTNAME: &str = "hostname";
/// Legacy CliQr-provisioned nodes carry their VM name in a separate fact.
const FACT_CLIQR_HOSTNAME: &str = "cliqr.cliqrNodeHostname";
/// Marks legacy nodes whose hostname fact is not the VM name.
pub(crate) const CLIQR_CERTNAME_MARKER: &str = "cliqa";
const FACT_HARDWARE_UUID: &str = "dmi.product.uuid";

/// Everything the reconciler needs from one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerFacts {
    pub certname: String,
    pub application: String,
    pub environment: String,
    pub component: String,
    pub patching_procedure: String,
    pub health_check: String,
    pub ip_address: String,
    pub operating_system: String,
    pub os_version: String,
    pub package_updates: Option<i32>,
    pub security_updates: Option<i32>,
    pub patch_window: String,
    pub pinned_packages: Vec<String>,
    pub vm_name: String,
    pub hardware_uuid: String,
}

impl ServerFacts {
    /// Reads a node's facts using the backend's patching module and window fact.
    pub fn extract(node: &NodeRecord, backend: &Backend) -> Self {
        let module = backend.patching_module();
        Self {
            certname: node.certname.clone(),
            application: node.fact_string(FACT_APPLICATION),
            environment: node.fact_string(FACT_ENVIRONMENT),
            component: node.fact_string(FACT_COMPONENT),
            patching_procedure: node.fact_string(FACT_PROCEDURE),
            health_check: node.fact_string(FACT_HEALTH_CHECK),
            ip_address: node.fact_string(FACT_IP),
            operating_system: node.fact_string(FACT_OS_NAME),
            os_version: node.fact_string(FACT_OS_VERSION),
            package_updates: node.fact_count(&format!("{}.package_update_count", module)),
            security_updates: node
                .fact_count(&format!("{}.security_package_update_count", module)),
            patch_window: node.fact_string(&backend.fact_name),
            pinned_packages: node.fact_strings(&format!("{}.pinned_packages", module)),
            vm_name: vm_name(node),
            hardware_uuid: node.fact_string(FACT_HARDWARE_UUID),
        }
    }

    /// The server row for this node under `component_id`.
    pub fn to_new_server(&self, component_id: Uuid, backend_id: Uuid) -> NewServer {
        NewServer {
            component_id,
            name: self.certname.clone(),
            ip_address: self.ip_address.clone(),
            vm_name: self.vm_name.clone(),
            operating_system: self.operating_system.clone(),
            os_version: self.os_version.clone(),
            package_updates: self.package_updates,
            security_updates: self.security_updates,
            patch_window: self.patch_window.clone(),
            pinned_packages: self.pinned_packages.clone(),
            hardware_uuid: self.hardware_uuid.clone(),
            backend_id: Some(backend_id),
        }
    }
}

fn vm_name(node: &NodeRecord) -> String {
    if node.certname.contains(CLIQR_CERTNAME_MARKER) {
        node.fact_string(FACT_CLIQR_HOSTNAME)
    } else {
        node.fact_string(FACT_HOSTNAME)
    }
}

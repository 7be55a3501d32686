//! Storage Collaborators
//!
//! The engine never persists anything itself. These traits are the seams
//! where the host application plugs in its tenant and design storage.

use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::GeneratedDesign;
use crate::projection::Tenant;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate design id: {0}")]
    Duplicate(Uuid),
}

pub trait TenantStore {
    fn find_tenant(&self, id: Uuid) -> Option<Tenant>;
}

pub trait DesignStore {
    /// Persists a generated design and returns its stored id.
    fn save_design(&mut self, design: &GeneratedDesign) -> Result<Uuid, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryTenants {
    tenants: HashMap<Uuid, Tenant>,
}

impl InMemoryTenants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tenant: Tenant) {
        self.tenants.insert(tenant.id, tenant);
    }
}

impl TenantStore for InMemoryTenants {
    fn find_tenant(&self, id: Uuid) -> Option<Tenant> {
        self.tenants.get(&id).cloned()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDesigns {
    designs: Vec<GeneratedDesign>,
}

impl InMemoryDesigns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn designs(&self) -> &[GeneratedDesign] {
        &self.designs
    }

    pub fn for_event(&self, event_id: Uuid) -> Vec<&GeneratedDesign> {
        self.designs.iter().filter(|d| d.event_id == event_id).collect()
    }
}

impl DesignStore for InMemoryDesigns {
    fn save_design(&mut self, design: &GeneratedDesign) -> Result<Uuid, StoreError> {
        if self.designs.iter().any(|d| d.id == design.id) {
            return Err(StoreError::Duplicate(design.id));
        }
        self.designs.push(design.clone());
        Ok(design.id)
    }
}

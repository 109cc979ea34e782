pub mod admin_status;
pub mod configuration_service;

pub use admin_status::{AdminStatusError, AdminStatusService};
pub use configuration_service::{
    BlobConfigurationStore, ConfigurationError, ConfigurationService, ConfigurationStore,
    MemoryConfigurationStore, StoreError, TenantConfiguration,
};

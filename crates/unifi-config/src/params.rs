//! The recognized stack parameters.

/// A single recognized parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    /// Key as written in the stack file and on the command line.
    pub key: &'static str,
    /// Environment variable that overrides the default.
    pub env: &'static str,
    /// Built-in default. `None` marks the parameter as required.
    pub default: Option<&'static str>,
}

impl Parameter {
    pub const fn with_default(key: &'static str, env: &'static str, default: &'static str) -> Self {
        Self {
            key,
            env,
            default: Some(default),
        }
    }

    pub const fn required(key: &'static str, env: &'static str) -> Self {
        Self {
            key,
            env,
            default: None,
        }
    }
}

/// Parameter keys, so consumers never spell them by hand.
pub mod keys {
    pub const NAMESPACE: &str = "namespace";
    pub const STORAGE_CLASS: &str = "storageClass";
    pub const DATA_SIZE: &str = "dataSize";
    pub const TIMEZONE: &str = "timezone";
    pub const MEM_LIMIT: &str = "memLimit";
    pub const MEM_STARTUP: &str = "memStartup";
    pub const CPU: &str = "cpu";
    pub const MEMORY: &str = "memory";
    pub const CPU_LIMIT: &str = "cpuLimit";
    pub const MEMORY_LIMIT: &str = "memoryLimit";
    pub const IMAGE: &str = "image";
    pub const MONGO_IMAGE: &str = "mongoImage";
    pub const MONGO_ROOT_USERNAME: &str = "mongoRootUsername";
    pub const MONGO_ROOT_PASSWORD: &str = "mongoRootPassword";
    pub const MONGO_USER: &str = "mongoUser";
    pub const MONGO_PASSWORD: &str = "mongoPassword";
    pub const MONGO_HOST: &str = "mongoHost";
    pub const MONGO_PORT: &str = "mongoPort";
    pub const MONGO_DBNAME: &str = "mongoDbName";
    pub const MONGO_AUTHSOURCE: &str = "mongoAuthSource";
    pub const PUID: &str = "puid";
    pub const PGID: &str = "pgid";
    pub const SERVICE_TYPE: &str = "serviceType";
}

/// Every parameter the UniFi stack recognizes.
pub const PARAMETERS: &[Parameter] = &[
    // ── Placement and storage ──────────────────────────────────────
    Parameter::with_default(keys::NAMESPACE, "UNIFI_NAMESPACE", "unifi"),
    Parameter::with_default(keys::STORAGE_CLASS, "UNIFI_STORAGE_CLASS", "truenas-hdd-mirror-nfs"),
    Parameter::with_default(keys::DATA_SIZE, "UNIFI_DATA_SIZE", "10Gi"),
    // ── Application runtime ────────────────────────────────────────
    Parameter::with_default(keys::TIMEZONE, "UNIFI_TIMEZONE", "Europe/Brussels"),
    Parameter::with_default(keys::MEM_LIMIT, "UNIFI_MEM_LIMIT", "1024"),
    Parameter::with_default(keys::MEM_STARTUP, "UNIFI_MEM_STARTUP", "1024"),
    Parameter::with_default(keys::CPU, "UNIFI_CPU", "500m"),
    Parameter::with_default(keys::MEMORY, "UNIFI_MEMORY", "1Gi"),
    Parameter::with_default(keys::CPU_LIMIT, "UNIFI_CPU_LIMIT", "2"),
    Parameter::with_default(keys::MEMORY_LIMIT, "UNIFI_MEMORY_LIMIT", "2Gi"),
    Parameter::with_default(
        keys::IMAGE,
        "UNIFI_IMAGE",
        "lscr.io/linuxserver/unifi-network-application:9.3.45-ls100",
    ),
    Parameter::with_default(keys::PUID, "UNIFI_PUID", "1000"),
    Parameter::with_default(keys::PGID, "UNIFI_PGID", "1000"),
    Parameter::with_default(keys::SERVICE_TYPE, "UNIFI_SERVICE_TYPE", "LoadBalancer"),
    // ── Database ───────────────────────────────────────────────────
    Parameter::with_default(keys::MONGO_IMAGE, "MONGODB_IMAGE", "mongo:7.0"),
    Parameter::with_default(keys::MONGO_ROOT_USERNAME, "MONGODB_ROOT_USERNAME", "admin"),
    Parameter::with_default(keys::MONGO_ROOT_PASSWORD, "MONGODB_ROOT_PASSWORD", "changeme"),
    Parameter::with_default(keys::MONGO_USER, "UNIFI_MONGO_USER", "unifi"),
    Parameter::with_default(keys::MONGO_PASSWORD, "UNIFI_MONGO_PASSWORD", "changeme"),
    Parameter::with_default(keys::MONGO_HOST, "UNIFI_MONGO_HOST", "mongodb.mongodb"),
    Parameter::with_default(keys::MONGO_PORT, "UNIFI_MONGO_PORT", "27017"),
    Parameter::with_default(keys::MONGO_DBNAME, "UNIFI_MONGO_DBNAME", "unifi"),
    Parameter::with_default(keys::MONGO_AUTHSOURCE, "UNIFI_MONGO_AUTHSOURCE", "unifi"),
];

/// Look up a parameter by key.
pub fn find(key: &str) -> Option<&'static Parameter> {
    PARAMETERS.iter().find(|p| p.key == key)
}

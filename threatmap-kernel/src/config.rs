use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KernelConfig {
    pub backend: BackendConf,
    pub mqtt: Option<MqttConf>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConf {
    pub base_url: String, // ex: "http://localhost:9000/api"
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

fn default_poll_interval() -> u64 {
    30
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            backend: BackendConf { base_url: "http://localhost:9000/api".into() },
            mqtt: Some(MqttConf { host: "localhost".into(), port: 1883 }),
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var("THREATMAP_KERNEL_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() { return KernelConfig::default(); }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            eprintln!("[kernel] config invalide: {e}");
            KernelConfig::default()
        })
    } else {
        eprintln!("[kernel] pas de kernel.yaml, usage config par défaut");
        KernelConfig::default()
    }
}

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session game mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// Plain co-op sync
    Standard,
    /// Two-party position-swap mode
    Swap,
    /// Prop hunt
    PropHunt,
}

impl Default for GameMode {
    fn default() -> Self {
        GameMode::Standard
    }
}

/// Per-session settings, handed to clients on admission and immutable
/// for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub game_mode: GameMode,
    /// Mirror enemy health between clients
    pub enemy_sync: bool,
    /// Mirror quest completion between clients
    pub quest_sync: bool,
    /// Pin the weather server-side; client weather updates are ignored
    pub forced_weather: bool,
    /// Minimum seconds between swap triggers (swap mode)
    pub swap_min_interval_secs: u64,
    /// Maximum seconds between swap triggers (swap mode)
    pub swap_max_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            game_mode: GameMode::Standard,
            enemy_sync: true,
            quest_sync: true,
            forced_weather: false,
            swap_min_interval_secs: 120,
            swap_max_interval_secs: 300,
        }
    }
}

impl SessionSettings {
    pub fn swap_interval_range(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.swap_min_interval_secs),
            Duration::from_secs(self.swap_max_interval_secs),
        )
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shared secret; empty string disables the credential gate
    pub password: String,
    /// Free-form session description shown to clients
    pub description: String,
    /// Path to the equipment id remap file
    pub equipment_map_path: String,
    /// Session settings
    pub settings: SessionSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 5671,
            password: String::new(),
            description: "Co-op sync session".to_string(),
            equipment_map_path: "EquipmentMapping.json".to_string(),
            settings: SessionSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            } else {
                tracing::warn!("Invalid BIND_ADDRESS '{}', using default", addr);
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                if parsed > 0 {
                    config.port = parsed;
                } else {
                    tracing::warn!("PORT must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid PORT '{}', using default", port);
            }
        }

        if let Ok(password) = std::env::var("SESSION_PASSWORD") {
            config.password = password;
        }

        if let Ok(description) = std::env::var("SESSION_DESCRIPTION") {
            config.description = description;
        }

        if let Ok(path) = std::env::var("EQUIPMENT_MAP_PATH") {
            config.equipment_map_path = path;
        }

        if let Ok(mode) = std::env::var("GAME_MODE") {
            match mode.to_ascii_lowercase().as_str() {
                "standard" => config.settings.game_mode = GameMode::Standard,
                "swap" => config.settings.game_mode = GameMode::Swap,
                "prophunt" => config.settings.game_mode = GameMode::PropHunt,
                other => tracing::warn!("Unknown GAME_MODE '{}', using default", other),
            }
        }

        if let Ok(enemy_sync) = std::env::var("ENEMY_SYNC") {
            match enemy_sync.parse::<bool>() {
                Ok(parsed) => config.settings.enemy_sync = parsed,
                Err(_) => tracing::warn!("Invalid ENEMY_SYNC '{}', using default", enemy_sync),
            }
        }

        if let Ok(quest_sync) = std::env::var("QUEST_SYNC") {
            match quest_sync.parse::<bool>() {
                Ok(parsed) => config.settings.quest_sync = parsed,
                Err(_) => tracing::warn!("Invalid QUEST_SYNC '{}', using default", quest_sync),
            }
        }

        if let Ok(forced) = std::env::var("FORCED_WEATHER") {
            match forced.parse::<bool>() {
                Ok(parsed) => config.settings.forced_weather = parsed,
                Err(_) => tracing::warn!("Invalid FORCED_WEATHER '{}', using default", forced),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.settings.swap_min_interval_secs > self.settings.swap_max_interval_secs {
            return Err("swap_min_interval_secs cannot exceed swap_max_interval_secs".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5671);
        assert!(config.password.is_empty());
        assert_eq!(config.settings.game_mode, GameMode::Standard);
        assert!(config.settings.enemy_sync);
    }

    #[test]
    fn test_validate_default() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_swap_range() {
        let mut config = ServerConfig::default();
        config.settings.swap_min_interval_secs = 500;
        config.settings.swap_max_interval_secs = 100;
        assert!(config.validate().is_err());
    }
}

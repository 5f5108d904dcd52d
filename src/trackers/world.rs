use serde::{Deserialize, Serialize};

/// Client-observed world clock and weather fields
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorldUpdate {
    /// Time of day in in-game minutes since midnight
    pub time_of_day: f32,
    /// In-game day counter
    pub day: u32,
    /// Weather id
    pub weather: u8,
}

/// Canonical world clock and weather state.
///
/// Time fields follow every update; the weather field is gated behind
/// the weather-authority rule enforced by the engine, and behind the
/// forced-weather session setting.
#[derive(Debug, Clone)]
pub struct WorldState {
    time_of_day: f32,
    day: u32,
    weather: u8,
    forced_weather: bool,
}

impl WorldState {
    pub fn new(forced_weather: bool) -> Self {
        Self {
            time_of_day: 0.0,
            day: 1,
            weather: 0,
            forced_weather,
        }
    }

    pub fn apply_time(&mut self, update: &WorldUpdate) {
        self.time_of_day = update.time_of_day;
        self.day = update.day;
    }

    pub fn apply_weather(&mut self, update: &WorldUpdate) {
        self.weather = update.weather;
    }

    pub fn time_of_day(&self) -> f32 {
        self.time_of_day
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn weather(&self) -> u8 {
        self.weather
    }

    pub fn is_forced_weather(&self) -> bool {
        self.forced_weather
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_time_leaves_weather() {
        let mut world = WorldState::new(false);
        world.apply_weather(&WorldUpdate {
            weather: 3,
            ..Default::default()
        });

        world.apply_time(&WorldUpdate {
            time_of_day: 720.0,
            day: 12,
            weather: 9,
        });

        assert_eq!(world.time_of_day(), 720.0);
        assert_eq!(world.day(), 12);
        assert_eq!(world.weather(), 3);
    }

    #[test]
    fn test_forced_flag() {
        assert!(WorldState::new(true).is_forced_weather());
        assert!(!WorldState::new(false).is_forced_weather());
    }
}

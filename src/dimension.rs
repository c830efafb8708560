use std::fmt;

/// One of the sensor channels reported by a weather station.
///
/// The order of [`Dimension::ALL`] is the column order used in both tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    AirTemperature,
    WetBulbTemperature,
    Humidity,
    RainIntensity,
    IntervalRain,
    TotalRain,
    PrecipitationType,
    WindDirection,
    WindSpeed,
    MaxWindSpeed,
    BarometricPressure,
    SolarRadiation,
    Heading,
    BatteryLife,
}

impl Dimension {
    pub const ALL: [Dimension; 14] = [
        Dimension::AirTemperature,
        Dimension::WetBulbTemperature,
        Dimension::Humidity,
        Dimension::RainIntensity,
        Dimension::IntervalRain,
        Dimension::TotalRain,
        Dimension::PrecipitationType,
        Dimension::WindDirection,
        Dimension::WindSpeed,
        Dimension::MaxWindSpeed,
        Dimension::BarometricPressure,
        Dimension::SolarRadiation,
        Dimension::Heading,
        Dimension::BatteryLife,
    ];

    /// Column name in `preprocessed_data`, and the column stem in `aggregated_data`.
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::AirTemperature => "air_temperature",
            Dimension::WetBulbTemperature => "wet_bulb_temperature",
            Dimension::Humidity => "humidity",
            Dimension::RainIntensity => "rain_intensity",
            Dimension::IntervalRain => "interval_rain",
            Dimension::TotalRain => "total_rain",
            Dimension::PrecipitationType => "precipitation_type",
            Dimension::WindDirection => "wind_direction",
            Dimension::WindSpeed => "wind_speed",
            Dimension::MaxWindSpeed => "max_wind_speed",
            Dimension::BarometricPressure => "barometric_pressure",
            Dimension::SolarRadiation => "solar_radiation",
            Dimension::Heading => "heading",
            Dimension::BatteryLife => "battery_life",
        }
    }

    /// Header used by the upstream preprocessing step, e.g. "Air Temperature".
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::AirTemperature => "Air Temperature",
            Dimension::WetBulbTemperature => "Wet Bulb Temperature",
            Dimension::Humidity => "Humidity",
            Dimension::RainIntensity => "Rain Intensity",
            Dimension::IntervalRain => "Interval Rain",
            Dimension::TotalRain => "Total Rain",
            Dimension::PrecipitationType => "Precipitation Type",
            Dimension::WindDirection => "Wind Direction",
            Dimension::WindSpeed => "Wind Speed",
            Dimension::MaxWindSpeed => "Maximum Wind Speed",
            Dimension::BarometricPressure => "Barometric Pressure",
            Dimension::SolarRadiation => "Solar Radiation",
            Dimension::Heading => "Heading",
            Dimension::BatteryLife => "Battery Life",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A summary statistic stored per dimension in `aggregated_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Min,
    Max,
    Mean,
    Std,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::Min,
        Statistic::Max,
        Statistic::Mean,
        Statistic::Std,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Mean => "mean",
            Statistic::Std => "std",
        }
    }
}

/// The four statistics of one dimension for one source file.  A missing
/// value is stored as NULL.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

impl Stats {
    pub fn get(&self, statistic: Statistic) -> Option<f64> {
        match statistic {
            Statistic::Min => self.min,
            Statistic::Max => self.max,
            Statistic::Mean => self.mean,
            Statistic::Std => self.std,
        }
    }

    pub fn set(&mut self, statistic: Statistic, value: Option<f64>) {
        match statistic {
            Statistic::Min => self.min = value,
            Statistic::Max => self.max = value,
            Statistic::Mean => self.mean = value,
            Statistic::Std => self.std = value,
        }
    }
}

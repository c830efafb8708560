use std::io::Read;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, SubsecRound};
use serde::Deserialize;

use crate::dimension::Dimension;
use crate::input::{
    check_headers, csv_reader, deserialize_time, deserialize_timestamp, error_line, InputBatch,
    InputError, SUBSEC_DIGITS,
};

/// One sensor reading, a row of the `preprocessed_data` table.
///
/// Field names on the CSV side are the ones written by the preprocessing step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Measurement {
    #[serde(rename = "Measurement ID")]
    pub measurement_id: String,
    #[serde(rename = "Station Name")]
    pub station_name: String,
    #[serde(rename = "Measurement Timestamp", deserialize_with = "deserialize_timestamp")]
    pub measurement_timestamp: NaiveDateTime,
    pub date: NaiveDate,
    #[serde(deserialize_with = "deserialize_time")]
    pub time: NaiveTime,
    #[serde(rename = "Air Temperature")]
    pub air_temperature: Option<f64>,
    #[serde(rename = "Wet Bulb Temperature")]
    pub wet_bulb_temperature: Option<f64>,
    #[serde(rename = "Humidity")]
    pub humidity: Option<f64>,
    #[serde(rename = "Rain Intensity")]
    pub rain_intensity: Option<f64>,
    #[serde(rename = "Interval Rain")]
    pub interval_rain: Option<f64>,
    #[serde(rename = "Total Rain")]
    pub total_rain: Option<f64>,
    #[serde(rename = "Precipitation Type")]
    pub precipitation_type: Option<f64>,
    #[serde(rename = "Wind Direction")]
    pub wind_direction: Option<f64>,
    #[serde(rename = "Wind Speed")]
    pub wind_speed: Option<f64>,
    #[serde(rename = "Maximum Wind Speed")]
    pub max_wind_speed: Option<f64>,
    #[serde(rename = "Barometric Pressure")]
    pub barometric_pressure: Option<f64>,
    #[serde(rename = "Solar Radiation")]
    pub solar_radiation: Option<f64>,
    #[serde(rename = "Heading")]
    pub heading: Option<f64>,
    #[serde(rename = "Battery Life")]
    pub battery_life: Option<f64>,
}

impl Measurement {
    /// A reading with all sensor values missing.  The timestamp is truncated
    /// to the microsecond.
    pub fn new(
        measurement_id: impl Into<String>,
        station_name: impl Into<String>,
        measurement_timestamp: NaiveDateTime,
    ) -> Measurement {
        let measurement_timestamp = measurement_timestamp.trunc_subsecs(SUBSEC_DIGITS);
        Measurement {
            measurement_id: measurement_id.into(),
            station_name: station_name.into(),
            measurement_timestamp,
            date: measurement_timestamp.date(),
            time: measurement_timestamp.time(),
            air_temperature: None,
            wet_bulb_temperature: None,
            humidity: None,
            rain_intensity: None,
            interval_rain: None,
            total_rain: None,
            precipitation_type: None,
            wind_direction: None,
            wind_speed: None,
            max_wind_speed: None,
            barometric_pressure: None,
            solar_radiation: None,
            heading: None,
            battery_life: None,
        }
    }

    pub fn value(&self, dimension: Dimension) -> Option<f64> {
        match dimension {
            Dimension::AirTemperature => self.air_temperature,
            Dimension::WetBulbTemperature => self.wet_bulb_temperature,
            Dimension::Humidity => self.humidity,
            Dimension::RainIntensity => self.rain_intensity,
            Dimension::IntervalRain => self.interval_rain,
            Dimension::TotalRain => self.total_rain,
            Dimension::PrecipitationType => self.precipitation_type,
            Dimension::WindDirection => self.wind_direction,
            Dimension::WindSpeed => self.wind_speed,
            Dimension::MaxWindSpeed => self.max_wind_speed,
            Dimension::BarometricPressure => self.barometric_pressure,
            Dimension::SolarRadiation => self.solar_radiation,
            Dimension::Heading => self.heading,
            Dimension::BatteryLife => self.battery_life,
        }
    }

    pub fn set_value(&mut self, dimension: Dimension, value: Option<f64>) {
        let slot = match dimension {
            Dimension::AirTemperature => &mut self.air_temperature,
            Dimension::WetBulbTemperature => &mut self.wet_bulb_temperature,
            Dimension::Humidity => &mut self.humidity,
            Dimension::RainIntensity => &mut self.rain_intensity,
            Dimension::IntervalRain => &mut self.interval_rain,
            Dimension::TotalRain => &mut self.total_rain,
            Dimension::PrecipitationType => &mut self.precipitation_type,
            Dimension::WindDirection => &mut self.wind_direction,
            Dimension::WindSpeed => &mut self.wind_speed,
            Dimension::MaxWindSpeed => &mut self.max_wind_speed,
            Dimension::BarometricPressure => &mut self.barometric_pressure,
            Dimension::SolarRadiation => &mut self.solar_radiation,
            Dimension::Heading => &mut self.heading,
            Dimension::BatteryLife => &mut self.battery_life,
        };
        *slot = value;
    }

    /// Sensor values in column order.
    pub fn values(&self) -> [Option<f64>; 14] {
        Dimension::ALL.map(|dim| self.value(dim))
    }
}

fn required_columns() -> Vec<String> {
    let mut columns: Vec<String> = [
        "Measurement ID",
        "Station Name",
        "Measurement Timestamp",
        "date",
        "time",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    columns.extend(Dimension::ALL.iter().map(|dim| dim.label().to_string()));
    columns
}

/// Read the preprocessed measurements CSV.  Rows that don't parse are logged
/// and returned in `rejected`; a missing column fails the whole file.
pub fn read_measurements<R: Read>(rdr: R) -> Result<InputBatch<Measurement>, InputError> {
    let mut rdr = csv_reader(rdr);
    check_headers(rdr.headers()?, &required_columns())?;

    let mut batch = InputBatch::new();
    for (i, record) in rdr.deserialize::<Measurement>().enumerate() {
        match record {
            Ok(row) => batch.rows.push(row),
            Err(e) => {
                let line = error_line(&e, i as u64 + 2);
                batch.reject(line, e.to_string());
            }
        }
    }
    batch.log_summary("measurement");
    Ok(batch)
}

//! Column names of the emission-rate tables produced by the batch runs.

pub const AREA: &str = "Area";
pub const YEAR: &str = "yearid";
pub const MONTH: &str = "monthid";
pub const ROAD_CLASS: &str = "funclass";
pub const AVG_SPEED: &str = "avgspeed";
pub const VEHICLE_TYPE: &str = "VehicleType";
pub const FUEL_TYPE: &str = "FUELTYPE";
pub const PROCESS_TYPE: &str = "Processtype";

/// Pollutant rate columns, in output order.
pub const POLLUTANTS: [&str; 17] = [
    "CO", "NOX", "SO2", "NO2", "CO2EQ", "VOC", "PM10", "PM25", "BENZ", "NAPTH", "BUTA", "FORM",
    "ACTE", "ACROL", "ETYB", "DPM", "POM",
];

pub fn pollutants() -> Vec<String> {
    POLLUTANTS.iter().map(|p| p.to_string()).collect()
}

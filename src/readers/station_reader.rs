use crate::config::StationTableConfig;
use crate::error::{PipelineError, Result};
use crate::models::Station;
use crate::utils::coordinates::{parse_decimal, parse_identifier};
use csv::ReaderBuilder;
use encoding_rs::Encoding;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use validator::Validate;

/// Reads the delimited station table (identifier, longitude, latitude and any
/// number of extra columns)
pub struct StationReader {
    id_column: String,
    lon_column: String,
    lat_column: String,
    delimiter: u8,
    decimal: char,
    encoding: &'static Encoding,
}

impl StationReader {
    pub fn new(config: &StationTableConfig) -> Result<Self> {
        let encoding = Encoding::for_label(config.encoding.as_bytes()).ok_or_else(|| {
            PipelineError::config(format!("Unknown station table encoding '{}'", config.encoding))
        })?;

        Ok(Self {
            id_column: config.id_column.clone(),
            lon_column: config.lon_column.clone(),
            lat_column: config.lat_column.clone(),
            delimiter: config.delimiter_byte(),
            decimal: config.decimal_char(),
            encoding,
        })
    }

    /// Read every station of the table at `path`
    pub fn read_stations(&self, path: &Path) -> Result<Vec<Station>> {
        let bytes = fs::read(path)?;
        let (text, _, had_errors) = self.encoding.decode(&bytes);
        if had_errors {
            warn!(
                "Station table {} contains bytes invalid in {}; they were replaced",
                path.display(),
                self.encoding.name()
            );
        }

        let stations = self.parse(&text)?;
        if stations.is_empty() {
            return Err(PipelineError::data_format(format!(
                "Station table {} has no station",
                path.display()
            )));
        }

        debug!("Read {} stations from {}", stations.len(), path.display());
        Ok(stations)
    }

    fn parse(&self, text: &str) -> Result<Vec<Station>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                PipelineError::data_format(format!(
                    "Station table has no '{}' column (found: {})",
                    name,
                    headers.iter().collect::<Vec<_>>().join(", ")
                ))
            })
        };
        let id_idx = column(&self.id_column)?;
        let lon_idx = column(&self.lon_column)?;
        let lat_idx = column(&self.lat_column)?;

        let mut stations = Vec::new();
        let mut seen = HashSet::new();

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            // Header is line 1
            let line = row + 2;

            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }

            let cell = |idx: usize| record.get(idx).unwrap_or("");
            let with_line = |e: PipelineError| match e {
                PipelineError::DataFormat(msg) => {
                    PipelineError::data_format(format!("line {}: {}", line, msg))
                }
                other => other,
            };

            let id = parse_identifier(cell(id_idx), self.decimal).map_err(with_line)?;
            let longitude = parse_decimal(cell(lon_idx), self.decimal).map_err(with_line)?;
            let latitude = parse_decimal(cell(lat_idx), self.decimal).map_err(with_line)?;

            if !seen.insert(id) {
                return Err(PipelineError::DuplicateStation(id));
            }

            let attributes = headers
                .iter()
                .enumerate()
                .filter(|(idx, _)| ![id_idx, lon_idx, lat_idx].contains(idx))
                .map(|(idx, name)| (name.to_string(), cell(idx).to_string()))
                .collect();

            let station = Station::new(id, longitude, latitude).with_attributes(attributes);
            station.validate().map_err(|e| {
                PipelineError::data_format(format!(
                    "line {}: station {} has out-of-range coordinates: {}",
                    line, id, e
                ))
            })?;

            stations.push(station);
        }

        Ok(stations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn table_config(delimiter: &str, decimal: &str) -> StationTableConfig {
        let toml = format!(
            r#"
            [stations]
            path = "stations.csv"
            delimiter = "{}"
            decimal = "{}"
            [buffers]
            radii = [100]
            [[datasets]]
            kind = "osm"
            [paths]
            geoclimate_output = "gc"
            results_output = "res"
            "#,
            delimiter, decimal
        );
        PipelineConfig::from_toml_str(&toml).unwrap().stations
    }

    #[test]
    fn test_read_semicolon_comma_table() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "SITE;NAME;LON;LAT;LCZ")?;
        writeln!(file, "1;Montsouris;2,3375;48,8217;2")?;
        writeln!(file, "2; Jussieu ;2,3561;48,8464;2")?;
        writeln!(file, ";;;;")?;

        let reader = StationReader::new(&table_config(";", ","))?;
        let stations = reader.read_stations(file.path())?;

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].id, 1);
        assert!((stations[0].longitude - 2.3375).abs() < 1e-12);
        assert!((stations[1].latitude - 48.8464).abs() < 1e-12);
        assert_eq!(stations[1].attribute("NAME"), Some("Jussieu"));
        assert_eq!(stations[1].attribute("LCZ"), Some("2"));
        Ok(())
    }

    #[test]
    fn test_read_comma_point_table() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "LAT,LON,SITE")?;
        writeln!(file, "48.8217,2.3375,15")?;

        let reader = StationReader::new(&table_config(",", "."))?;
        let stations = reader.read_stations(file.path())?;
        assert_eq!(stations[0].id, 15);
        assert!((stations[0].latitude - 48.8217).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_latin1_table() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        // "Orsay-Université" in windows-1252
        file.write_all(b"SITE;NAME;LON;LAT\n3;Orsay-Universit\xe9;2,17;48,70\n")?;

        let mut config = table_config(";", ",");
        config.encoding = "windows-1252".to_string();
        let stations = StationReader::new(&config)?.read_stations(file.path())?;
        assert_eq!(stations[0].attribute("NAME"), Some("Orsay-Université"));
        Ok(())
    }

    #[test]
    fn test_non_numeric_coordinate() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "SITE;LON;LAT")?;
        writeln!(file, "1;2,3375;n/a")?;

        let err = StationReader::new(&table_config(";", ","))?
            .read_stations(file.path())
            .unwrap_err();
        match err {
            PipelineError::DataFormat(msg) => assert!(msg.contains("line 2")),
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }

    #[test]
    fn test_missing_column() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "SITE;X;Y")?;
        writeln!(file, "1;2,3;48,8")?;

        let err = StationReader::new(&table_config(";", ","))?
            .read_stations(file.path())
            .unwrap_err();
        assert!(matches!(err, PipelineError::DataFormat(_)));
        Ok(())
    }

    #[test]
    fn test_duplicate_and_out_of_range() -> Result<()> {
        let reader = StationReader::new(&table_config(";", ","))?;

        let mut file = NamedTempFile::new()?;
        writeln!(file, "SITE;LON;LAT")?;
        writeln!(file, "1;2,3;48,8")?;
        writeln!(file, "1;2,4;48,9")?;
        assert!(matches!(
            reader.read_stations(file.path()),
            Err(PipelineError::DuplicateStation(1))
        ));

        let mut file = NamedTempFile::new()?;
        writeln!(file, "SITE;LON;LAT")?;
        writeln!(file, "1;652469;6862035")?;
        assert!(matches!(
            reader.read_stations(file.path()),
            Err(PipelineError::DataFormat(_))
        ));
        Ok(())
    }

    #[test]
    fn test_empty_table() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "SITE;LON;LAT")?;
        let reader = StationReader::new(&table_config(";", ","))?;
        assert!(matches!(
            reader.read_stations(file.path()),
            Err(PipelineError::DataFormat(_))
        ));
        Ok(())
    }
}

//! Loaders for station JSON and trip CSV files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDateTime};
use csv::StringRecord;
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::model::{Station, Trip};

#[derive(Deserialize)]
struct StationRecord {
    #[serde(alias = "Number")]
    short_name: String,
    #[serde(default, alias = "NAME")]
    name: Option<String>,
    #[serde(alias = "Lat")]
    lat: Coordinate,
    #[serde(alias = "Long")]
    lon: Coordinate,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn value(&self, field: &str, station: &str) -> Result<f64> {
        match self {
            Coordinate::Number(v) => Ok(*v),
            Coordinate::Text(s) => s
                .trim()
                .parse()
                .with_context(|| format!("station {station}: {field} '{s}' is not a number")),
        }
    }
}

impl StationRecord {
    fn into_station(self) -> Result<Station> {
        let latitude = self.lat.value("lat", &self.short_name)?;
        let longitude = self.lon.value("lon", &self.short_name)?;
        Ok(Station {
            code: self.short_name,
            name: self.name,
            longitude,
            latitude,
        })
    }
}

/// One row of a trip CSV. Timestamps stay raw until [`TripRecord::into_trip`].
#[derive(Deserialize)]
struct TripRecord {
    #[serde(default)]
    ride_id: Option<String>,
    #[serde(default)]
    rideable_type: Option<String>,
    started_at: String,
    ended_at: String,
    start_station_id: String,
    end_station_id: String,
    #[serde(default)]
    member_casual: Option<String>,
}

impl TripRecord {
    fn into_trip(self) -> Result<Trip> {
        Ok(Trip {
            started_at: parse_timestamp(&self.started_at)
                .with_context(|| format!("invalid started_at '{}'", self.started_at))?,
            ended_at: parse_timestamp(&self.ended_at)
                .with_context(|| format!("invalid ended_at '{}'", self.ended_at))?,
            ride_id: self.ride_id,
            rideable_type: self.rideable_type,
            start_station_id: self.start_station_id,
            end_station_id: self.end_station_id,
            member_casual: self.member_casual,
        })
    }
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a trip timestamp, keeping the wall-clock time as written.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts);
        }
    }
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.naive_local())
        .map_err(|_| anyhow!("unrecognized timestamp format"))
}

/// Opens `path` for reading, gunzipping it when the name ends in `.gz`.
fn open(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let gzipped = path.extension().and_then(|e| e.to_str()) == Some("gz");
    debug!(path = %path.display(), gzipped, "Opening input");

    if gzipped {
        Ok(Box::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Parses stations from JSON read from `reader`.
///
/// Station files come either wrapped as `{"data": {"stations": [...]}}` or as
/// a bare array. Each record is decoded on its own so errors name the record.
pub fn parse_stations<R: Read>(reader: R) -> Result<Vec<Station>> {
    let json: Value = serde_json::from_reader(reader).context("malformed station JSON")?;
    let records = match json {
        Value::Array(records) => records,
        Value::Object(mut root) => match root
            .get_mut("data")
            .and_then(|data| data.get_mut("stations"))
            .map(Value::take)
        {
            Some(Value::Array(records)) => records,
            _ => bail!("expected a station array or an object with data.stations"),
        },
        _ => bail!("expected a station array or an object with data.stations"),
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let code = ["short_name", "Number"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
                .map(str::to_string);
            let describe = || match &code {
                Some(code) => format!("station #{index} ({code})"),
                None => format!("station #{index}"),
            };
            StationRecord::deserialize(value)
                .map_err(anyhow::Error::from)
                .and_then(StationRecord::into_station)
                .with_context(describe)
        })
        .collect()
}

/// Parses trips from CSV (with a header row) read from `reader`.
pub fn parse_trips<R: Read>(reader: R) -> Result<Vec<Trip>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().context("reading trip CSV header")?.clone();
    let mut row = StringRecord::new();
    let mut trips = Vec::new();

    while rdr.read_record(&mut row).context("reading trip CSV")? {
        // a quoted field may span lines; report where the record starts
        let line = row.position().map_or(0, |p| p.line());
        let trip = row
            .deserialize::<TripRecord>(Some(&headers))
            .map_err(anyhow::Error::from)
            .and_then(TripRecord::into_trip)
            .with_context(|| format!("trip row at line {line}"))?;
        trips.push(trip);
    }

    Ok(trips)
}

/// Loads the station list from a JSON file.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_stations<P: AsRef<Path>>(path: P) -> Result<Vec<Station>> {
    let path = path.as_ref();
    let stations =
        parse_stations(open(path)?).with_context(|| format!("loading {}", path.display()))?;
    info!(count = stations.len(), "Stations loaded");
    Ok(stations)
}

/// Loads trips from a CSV file, optionally gzip-compressed.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_trips<P: AsRef<Path>>(path: P) -> Result<Vec<Trip>> {
    let path = path.as_ref();
    let trips = parse_trips(open(path)?).with_context(|| format!("loading {}", path.display()))?;
    info!(count = trips.len(), "Trips loaded");
    Ok(trips)
}

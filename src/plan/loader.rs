//! Import plan requests from scenario JSON and CSV tables, export scenario JSON

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use log::debug;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{PlanRequest, SolveMode};
use crate::annuity::Timing;
use crate::error::{EquivalenceError, Result};
use crate::schedule::Periodicity;
use crate::solver::MAX_INSTALLMENTS;

const PRICE_COLUMNS: &[&str] = &["precio_contado", "contado", "precio", "price"];
const COUNT_COLUMNS: &[&str] = &["CANT C", "cant_c", "cuotas", "n", "count"];
const PAYMENT_COLUMNS: &[&str] = &["monto_cuota", "cuota", "pmt", "payment"];
const RATE_COLUMNS: &[&str] = &["tasa_periodo", "i_periodo", "tasa", "i", "rate"];
const TIMING_COLUMNS: &[&str] = &["tipo_pago", "timing"];
const PERIODICITY_COLUMNS: &[&str] = &["periodicidad", "periodicity"];
const START_DATE_COLUMNS: &[&str] = &["fecha_inicial", "start_date"];

/// A scenario number written either as a JSON number or as text
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Number(f64),
    Text(String),
}

impl LenientNumber {
    fn value(self) -> Option<f64> {
        match self {
            LenientNumber::Number(v) => Some(v),
            LenientNumber::Text(s) => parse_decimal(&s),
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    LenientNumber::deserialize(deserializer)?
        .value()
        .ok_or_else(|| de::Error::custom("expected a number"))
}

/// Blank text reads as absent
fn lenient_opt_f64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<f64>, D::Error> {
    match Option::<LenientNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LenientNumber::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .value()
            .map(Some)
            .ok_or_else(|| de::Error::custom("expected a number")),
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u32>, D::Error> {
    lenient_opt_f64(deserializer)?
        .map(count_from_real)
        .transpose()
        .map_err(de::Error::custom)
}

/// Whole installment count from an imported number, truncating any fraction
fn count_from_real(n: f64) -> Result<u32> {
    if !n.is_finite() || n < 0.0 || n.trunc() > MAX_INSTALLMENTS as f64 {
        return Err(EquivalenceError::invalid(format!(
            "installment count {} is not between 0 and {}",
            n, MAX_INSTALLMENTS
        )));
    }
    Ok(n.trunc() as u32)
}

/// Scenario file layout shared by JSON import and export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(rename = "precio_contado", default, deserialize_with = "lenient_f64")]
    pub price: f64,

    #[serde(rename = "monto_cuota", default, deserialize_with = "lenient_f64")]
    pub payment: f64,

    #[serde(
        rename = "CANT C",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub count: Option<u32>,

    #[serde(rename = "tipo_pago", default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<String>,

    #[serde(rename = "modo", default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(
        rename = "tasa_periodo",
        default,
        deserialize_with = "lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub periodic_rate: Option<f64>,

    /// Rate found by a previous solve, exported for reference only
    #[serde(
        rename = "tasa_periodo_calculada",
        default,
        deserialize_with = "lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub solved_rate: Option<f64>,

    #[serde(rename = "periodicidad", default, skip_serializing_if = "Option::is_none")]
    pub periodicity: Option<String>,

    #[serde(rename = "fecha_inicial", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

impl ScenarioFile {
    /// Describe a request in the scenario layout
    ///
    /// Rate-mode scenarios carry the count (and the solved rate when given);
    /// count-mode scenarios carry the periodic rate.
    pub fn from_request(request: &PlanRequest, solved_rate: Option<f64>) -> Self {
        let (count, periodic_rate, solved_rate) = match request.mode {
            SolveMode::Rate => (request.count, None, solved_rate),
            SolveMode::Count => (None, request.periodic_rate, None),
        };

        Self {
            price: request.price,
            payment: request.payment,
            count,
            timing: Some(request.timing.as_str().to_string()),
            mode: Some(request.mode.as_str().to_string()),
            periodic_rate,
            solved_rate,
            periodicity: Some(request.periodicity.as_str().to_string()),
            start_date: request.start_date,
        }
    }

    /// Convert to a request; missing fields take the form defaults
    pub fn into_request(self) -> Result<PlanRequest> {
        let timing = match self.timing.as_deref() {
            Some(label) if !label.trim().is_empty() => label.parse()?,
            _ => Timing::default(),
        };
        let periodicity = match self.periodicity.as_deref() {
            Some(label) if !label.trim().is_empty() => label.parse()?,
            _ => Periodicity::default(),
        };
        let mode = match self.mode.as_deref() {
            Some(label) if !label.trim().is_empty() => label.parse()?,
            _ if self.count.is_none() && self.periodic_rate.is_some() => SolveMode::Count,
            _ => SolveMode::Rate,
        };

        Ok(PlanRequest {
            price: self.price,
            payment: self.payment,
            count: match mode {
                SolveMode::Rate => Some(self.count.unwrap_or(1)),
                SolveMode::Count => self.count,
            },
            periodic_rate: self.periodic_rate,
            timing,
            mode,
            periodicity,
            start_date: self.start_date,
            adjust_last_payment: true,
        })
    }
}

/// Parse a request from scenario JSON text
pub fn request_from_json_str(json: &str) -> Result<PlanRequest> {
    let file: ScenarioFile = serde_json::from_str(json)?;
    file.into_request()
}

/// Load a request from a scenario JSON file
pub fn load_request_json<P: AsRef<Path>>(path: P) -> Result<PlanRequest> {
    let file: ScenarioFile = serde_json::from_reader(File::open(path)?)?;
    file.into_request()
}

/// Render a request (and optionally its solved rate) as scenario JSON
pub fn scenario_to_json(request: &PlanRequest, solved_rate: Option<f64>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ScenarioFile::from_request(request, solved_rate))?)
}

/// Parse a number that may use a decimal comma (`0,03`, `1.234,56`)
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return None;
    }

    let normalised = if s.matches(',').count() == 1 && s.contains('.') {
        s.replace('.', "").replace(',', ".")
    } else {
        s.replace(',', ".")
    };
    normalised.parse().ok()
}

/// One CSV row keyed by trimmed header
struct TableRow(HashMap<String, String>);

impl TableRow {
    fn new(headers: &StringRecord, record: &StringRecord) -> Self {
        let cells = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.trim().to_string(), v.trim().to_string()))
            .collect();
        TableRow(cells)
    }

    /// First non-empty value among the column aliases
    fn pick(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|n| self.0.get(*n))
            .map(String::as_str)
            .find(|v| !v.is_empty())
    }

    fn number(&self, names: &[&str]) -> Option<f64> {
        self.pick(names).and_then(parse_decimal)
    }

    fn to_request(&self) -> Result<PlanRequest> {
        let price = self.number(PRICE_COLUMNS);
        let payment = self.number(PAYMENT_COLUMNS);
        let count = self.number(COUNT_COLUMNS).map(count_from_real).transpose()?;
        let rate = self.number(RATE_COLUMNS);

        let timing = match self.pick(TIMING_COLUMNS) {
            Some(label) => label.parse()?,
            None => Timing::default(),
        };
        let periodicity = match self.pick(PERIODICITY_COLUMNS) {
            Some(label) => label.parse()?,
            None => Periodicity::default(),
        };
        let start_date = match self.pick(START_DATE_COLUMNS) {
            Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?),
            None => None,
        };

        let request = match (price, payment, count, rate) {
            (Some(price), Some(payment), Some(count), _) => {
                PlanRequest::for_rate(price, payment, count, timing)
            }
            (Some(price), Some(payment), None, Some(rate)) => {
                PlanRequest::for_count(price, payment, rate, timing)
            }
            _ => {
                return Err(EquivalenceError::MissingColumns(
                    "rate mode needs precio_contado, CANT C, monto_cuota; \
                     count mode needs precio_contado, monto_cuota, tasa_periodo"
                        .to_string(),
                ))
            }
        };

        let request = request.with_periodicity(periodicity);
        Ok(match start_date {
            Some(date) => request.with_start_date(date),
            None => request,
        })
    }
}

/// Semicolon-separated files are common where the decimal mark is a comma
fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    if header.contains(';') && !header.contains(',') {
        b';'
    } else {
        b','
    }
}

/// Load every row of a CSV table as a request
pub fn load_requests<P: AsRef<Path>>(path: P) -> Result<Vec<PlanRequest>> {
    load_requests_from_reader(File::open(path)?)
}

/// Load requests from any reader (e.g., string buffer, upload body)
pub fn load_requests_from_reader<R: Read>(mut reader: R) -> Result<Vec<PlanRequest>> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;

    let delimiter = sniff_delimiter(&content);
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = csv_reader.headers()?.clone();

    let mut requests = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        requests.push(TableRow::new(&headers, &record).to_request()?);
    }

    debug!("Loaded {} plan requests (delimiter {:?})", requests.len(), delimiter as char);
    Ok(requests)
}

/// Load the first row of a CSV table, as a single-scenario import
pub fn load_first_request<P: AsRef<Path>>(path: P) -> Result<PlanRequest> {
    load_requests(path)?
        .into_iter()
        .next()
        .ok_or_else(|| EquivalenceError::invalid("the file has no rows"))
}

/// Load a request from either a `.json` scenario or a CSV table
pub fn load_request<P: AsRef<Path>>(path: P) -> Result<PlanRequest> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        load_request_json(path)
    } else {
        load_first_request(path)
    }
}

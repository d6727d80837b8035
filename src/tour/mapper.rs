//! Field mapping from raw upstream records to the normalized place document.
//!
//! The upstream API has shipped several versions with inconsistent field
//! spellings (all-lowercase vs camelCase), and village upload files carry a
//! third set of names. Each logical field therefore resolves against an
//! explicit ordered list of candidate keys; the first present non-empty value
//! wins.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One raw upstream record: field name -> string value, spelling preserved.
#[derive(Debug, Default, Clone)]
pub struct RawRecord(HashMap<String, String>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First present non-empty value among the candidate spellings.
    pub fn first(&self, candidates: &[&str]) -> Option<&str> {
        candidates
            .iter()
            .filter_map(|k| self.0.get(*k))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }
}

// Candidate spellings per logical field, most common first.
const CONTENT_ID: &[&str] = &["contentid", "contentId"];
const TITLE: &[&str] = &["title", "name"];
const DESCRIPTION: &[&str] = &["overview", "eventdescription", "description"];
const START_DATE: &[&str] = &["eventstartdate", "eventStartDate", "startDate"];
const END_DATE: &[&str] = &["eventenddate", "eventEndDate", "endDate"];
const ADDR1: &[&str] = &["addr1", "address"];
const ADDR2: &[&str] = &["addr2"];
const ZIPCODE: &[&str] = &["zipcode", "zipCode"];
const TEL: &[&str] = &["tel", "telephone"];
const MAPX: &[&str] = &["mapx", "mapX", "longitude"];
const MAPY: &[&str] = &["mapy", "mapY", "latitude"];
const AREA_CODE: &[&str] = &["areacode", "areaCode"];
const SIGUNGU_CODE: &[&str] = &["sigungucode", "sigunguCode"];
const IMAGE_URL: &[&str] = &["firstimage", "firstImage", "imageUrl"];
const IMAGE_URL2: &[&str] = &["firstimage2", "firstImage2", "imageUrl2"];
const HOMEPAGE_URL: &[&str] = &["homepageurl", "homepage", "homepageUrl"];

/// Normalized document written to the store. Field names match the stored
/// schema, so the struct serializes directly into the document payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDoc {
    pub content_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub addr1: Option<String>,
    pub addr2: Option<String>,
    pub zipcode: Option<String>,
    pub tel: Option<String>,
    pub mapx: Option<f64>,
    pub mapy: Option<f64>,
    pub area_code: Option<String>,
    pub sigungu_code: Option<String>,
    pub image_url: Option<String>,
    pub image_url2: Option<String>,
    pub homepage_url: Option<String>,
    pub source: String,
    pub last_fetched: String,
}

fn text(raw: &RawRecord, candidates: &[&str]) -> Option<String> {
    raw.first(candidates).map(|v| v.to_string())
}

/// Map one raw record into the normalized document. Pure: missing fields
/// become null, unparseable numerics become null, and the geo pair is emitted
/// only when both coordinates parse to finite numbers.
pub fn map_record(raw: &RawRecord, source: &str, now: DateTime<Utc>) -> PlaceDoc {
    let mapx = raw.first(MAPX).and_then(parse_finite);
    let mapy = raw.first(MAPY).and_then(parse_finite);
    let (mapx, mapy) = match (mapx, mapy) {
        (Some(x), Some(y)) => (Some(x), Some(y)),
        _ => (None, None),
    };

    PlaceDoc {
        content_id: text(raw, CONTENT_ID),
        title: text(raw, TITLE),
        description: text(raw, DESCRIPTION),
        start_date: text(raw, START_DATE),
        end_date: text(raw, END_DATE),
        addr1: text(raw, ADDR1),
        addr2: text(raw, ADDR2),
        zipcode: text(raw, ZIPCODE),
        tel: text(raw, TEL),
        mapx,
        mapy,
        area_code: text(raw, AREA_CODE),
        sigungu_code: text(raw, SIGUNGU_CODE),
        image_url: text(raw, IMAGE_URL),
        image_url2: text(raw, IMAGE_URL2),
        homepage_url: text(raw, HOMEPAGE_URL),
        source: source.to_string(),
        last_fetched: now.to_rfc3339(),
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Derive the document key: upstream id if present, else title + start date.
/// Percent-encoded so any input is safe as a document key. Returns None for
/// records with neither an id nor a title (not addressable; skipped upstream).
pub fn doc_key(raw: &RawRecord) -> Option<String> {
    let raw_id = match raw.first(CONTENT_ID) {
        Some(id) => id.to_string(),
        None => {
            let title = raw.first(TITLE)?;
            let start = raw.first(START_DATE).unwrap_or("");
            format!("{title}-{start}")
        }
    };
    Some(urlencoding::encode(&raw_id).into_owned())
}

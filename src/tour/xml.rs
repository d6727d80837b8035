//! XML payload parsing for the Tour API and village upload files.
//!
//! Both payloads are flat: a repeated item element whose children are
//! single-valued text fields. The event reader collects each item's child
//! elements into a `RawRecord` without committing to any fixed spelling;
//! field resolution happens later in the mapper.

use anyhow::{bail, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::mapper::RawRecord;

/// One parsed Tour API page.
#[derive(Debug, Default)]
pub struct TourPage {
    /// `resultCode` from the response header ("0000" on success).
    pub result_code: Option<String>,
    pub result_msg: Option<String>,
    pub items: Vec<RawRecord>,
}

/// Result code the upstream API uses for a successful response.
pub const RESULT_OK: &str = "0000";

/// Parse a full Tour API response document.
pub fn parse_tour_page(xml: &str) -> Result<TourPage> {
    let mut page = TourPage {
        items: collect_records(xml, "item")?,
        ..Default::default()
    };
    page.result_code = element_text(xml, "resultCode")?;
    page.result_msg = element_text(xml, "resultMsg")?;
    Ok(page)
}

/// Parse a village upload file: repeated `<village>` records.
pub fn parse_village_file(xml: &str) -> Result<Vec<RawRecord>> {
    collect_records(xml, "village")
}

/// Collect every `<{item_tag}>` element's children into raw records.
/// Any well-formedness error aborts the whole parse.
pub fn collect_records(xml: &str, item_tag: &str) -> Result<Vec<RawRecord>> {
    let mut reader = Reader::from_str(xml);
    let mut records: Vec<RawRecord> = Vec::new();

    let mut current: Option<RawRecord> = None;
    let mut field: Option<String> = None;
    let mut text_buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e.name().as_ref())?;
                if current.is_none() {
                    if name == item_tag {
                        current = Some(RawRecord::new());
                    }
                } else if field.is_none() {
                    field = Some(name);
                    text_buf.clear();
                }
                // deeper nesting inside a field is ignored; only its text counts
            }
            Ok(Event::Text(ref e)) => {
                if field.is_some() {
                    let unescaped = e.unescape().context("bad text node")?;
                    text_buf.push_str(&unescaped);
                }
            }
            Ok(Event::CData(ref e)) => {
                if field.is_some() {
                    text_buf.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(ref e)) => {
                let name = local_name(e.name().as_ref())?;
                if field.as_deref() == Some(name.as_str()) {
                    let value = text_buf.trim().to_string();
                    if !value.is_empty() {
                        if let Some(rec) = current.as_mut() {
                            rec.insert(name, value);
                        }
                    }
                    field = None;
                } else if current.is_some() && name == item_tag {
                    if let Some(rec) = current.take() {
                        if !rec.is_empty() {
                            records.push(rec);
                        }
                    }
                }
            }
            Ok(Event::Eof) => {
                if current.is_some() || field.is_some() {
                    bail!("malformed XML: document ends inside <{item_tag}>");
                }
                break;
            }
            Ok(_) => {}
            Err(e) => bail!(
                "malformed XML at byte {}: {}",
                reader.buffer_position(),
                e
            ),
        }
    }

    Ok(records)
}

/// First text content of the named element, if present.
fn element_text(xml: &str, tag: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    let mut buf = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if local_name(e.name().as_ref())? == tag {
                    inside = true;
                    buf.clear();
                }
            }
            Ok(Event::Text(ref e)) => {
                if inside {
                    buf.push_str(&e.unescape().context("bad text node")?);
                }
            }
            Ok(Event::End(ref e)) => {
                if inside && local_name(e.name().as_ref())? == tag {
                    let out = buf.trim().to_string();
                    return Ok((!out.is_empty()).then_some(out));
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Ok(_) => {}
            Err(e) => bail!("malformed XML: {}", e),
        }
    }
}

fn local_name(qname: &[u8]) -> Result<String> {
    let full = std::str::from_utf8(qname).context("non-UTF8 element name")?;
    Ok(full.rsplit(':').next().unwrap_or(full).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
  <header>
    <resultCode>0000</resultCode>
    <resultMsg>OK</resultMsg>
  </header>
  <body>
    <items>
      <item>
        <contentid>3113671</contentid>
        <title>수안보 온천제</title>
        <eventstartdate>20260424</eventstartdate>
        <mapx>127.9954</mapx>
        <mapy>36.8467</mapy>
      </item>
      <item>
        <contentid>2687645</contentid>
        <title>영동 난계국악축제</title>
      </item>
    </items>
    <numOfRows>100</numOfRows>
    <pageNo>1</pageNo>
  </body>
</response>"#;

    #[test]
    fn parses_items_and_header() {
        let page = parse_tour_page(PAGE).unwrap();
        assert_eq!(page.result_code.as_deref(), Some(RESULT_OK));
        assert_eq!(page.result_msg.as_deref(), Some("OK"));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].first(&["contentid"]), Some("3113671"));
        assert_eq!(page.items[1].first(&["title"]), Some("영동 난계국악축제"));
    }

    #[test]
    fn single_item_still_yields_one_record() {
        let xml = r#"<response><body><items><item><title>혼자</title></item></items></body></response>"#;
        let items = collect_records(xml, "item").unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn empty_items_yield_no_records() {
        let xml = r#"<response><body><items></items></body></response>"#;
        assert!(collect_records(xml, "item").unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = "<response><body><items><item><title>broken";
        assert!(collect_records(xml, "item").is_err());
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        let xml = "<response><item><title>x</wrong></item></response>";
        assert!(collect_records(xml, "item").is_err());
    }

    #[test]
    fn entities_are_unescaped() {
        let xml = r#"<r><item><title>봄 &amp; 가을</title></item></r>"#;
        let items = collect_records(xml, "item").unwrap();
        assert_eq!(items[0].first(&["title"]), Some("봄 & 가을"));
    }

    #[test]
    fn village_file_uses_village_elements() {
        let xml = r#"<villages>
  <village><name>산골마을</name><address>충북 단양군</address></village>
  <village><name>강변마을</name></village>
</villages>"#;
        let records = parse_village_file(xml).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].first(&["name"]), Some("산골마을"));
    }
}

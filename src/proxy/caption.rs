//! Caption text from asset metadata

use chrono::NaiveDate;
use tracing::debug;

use crate::photos::AssetRecord;

/// Caption lines for an asset: capture date, then location
///
/// The date comes from the first ten characters of `localDateTime`
/// (`YYYY-MM-DD`) and is shown as `DD/MM/YYYY`; an unparsable date gives an
/// empty line, which the overlay drops. The location keeps its two commas
/// even when fields are missing, e.g. `", , France"`.
pub fn caption_lines(asset: &AssetRecord) -> Vec<String> {
    vec![capture_date(&asset.local_date_time), location(asset)]
}

fn capture_date(timestamp: &str) -> String {
    let date = timestamp.get(..10).unwrap_or(timestamp);
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(e) => {
            debug!(timestamp = timestamp, error = %e, "Unparsable capture date");
            String::new()
        }
    }
}

fn location(asset: &AssetRecord) -> String {
    let exif = asset.exif_info.clone().unwrap_or_default();
    format!(
        "{}, {}, {}",
        exif.city.unwrap_or_default(),
        exif.state.unwrap_or_default(),
        exif.country.unwrap_or_default()
    )
}

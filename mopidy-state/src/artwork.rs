//! Artwork url normalization

use chrono::NaiveDate;
use url::Url;

/// Query parameter that makes browsers refetch artwork once per day
pub const CACHE_BUST_PARAM: &str = "mopt";

/// Resolve `raw` against `base` and append the daily cache-busting parameter
///
/// Absolute urls keep their host. A `mopt` parameter already present is left
/// untouched. Urls that cannot be parsed are returned as given.
pub fn expand_url(base: &str, raw: &str, date: NaiveDate) -> String {
    let parsed = match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(base).and_then(|base| base.join(raw))
        }
        Err(e) => Err(e),
    };

    let mut url = match parsed {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Leaving artwork url {} as is: {}", raw, e);
            return raw.to_string();
        }
    };

    if !url.query_pairs().any(|(key, _)| key == CACHE_BUST_PARAM) {
        url.query_pairs_mut()
            .append_pair(CACHE_BUST_PARAM, &date.format("%Y%m%d").to_string());
    }
    url.to_string()
}

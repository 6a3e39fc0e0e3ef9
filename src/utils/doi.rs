use chrono::{DateTime, Utc};
use rand::Rng;

pub const DOI_PREFIX: &str = "10.";

/// Generates a citation identifier `10.<YYYYMMDD>/<8 uppercase hex>` for `now`.
pub fn generate_doi(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("{}{}/{:08X}", DOI_PREFIX, now.format("%Y%m%d"), suffix)
}

/// Checks the shape of an identifier without looking at the date.
pub fn is_well_formed(doi: &str) -> bool {
    let Some(rest) = doi.strip_prefix(DOI_PREFIX) else {
        return false;
    };
    let mut parts = rest.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(date), Some(suffix), None) => {
            date.len() == 8
                && date.chars().all(|c| c.is_ascii_digit())
                && suffix.len() == 8
                && suffix.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        }
        _ => false,
    }
}

use serde::{Deserialize, Serialize};

/// A discovered panorama, keyed by `pano_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanoramaRecord {
    pub pano_id: String,
    pub lat: f64,
    pub lon: f64,
    /// Capture date at month granularity ("YYYY-MM")
    pub date: Option<String>,
    pub copyright: Option<String>,
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl PanoramaRecord {
    /// Create a record with no date, copyright or orientation
    pub fn new(pano_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            pano_id: pano_id.into(),
            lat,
            lon,
            date: None,
            copyright: None,
            heading: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    pub fn with_date(mut self, date: Option<impl Into<String>>) -> Self {
        self.date = non_empty(date.map(Into::into));
        self
    }

    pub fn with_copyright(mut self, copyright: Option<impl Into<String>>) -> Self {
        self.copyright = non_empty(copyright.map(Into::into));
        self
    }

    pub fn with_orientation(mut self, heading: f64, pitch: f64, roll: f64) -> Self {
        self.heading = heading;
        self.pitch = pitch;
        self.roll = roll;
        self
    }

    /// Turn empty strings into `None` so "known absent" has a single representation
    pub fn normalized(mut self) -> Self {
        self.date = non_empty(self.date.take());
        self.copyright = non_empty(self.copyright.take());
        self
    }

    /// Whether both date and copyright are known
    pub fn has_complete_metadata(&self) -> bool {
        self.date.is_some() && self.copyright.is_some()
    }

    /// Fold a re-discovery of the same panorama into this record.
    ///
    /// Non-empty incoming date/copyright replace the stored value; null or empty
    /// ones never overwrite a known value. Position and orientation keep the
    /// first-seen values.
    pub fn merge_from(&mut self, incoming: &PanoramaRecord) {
        debug_assert_eq!(self.pano_id, incoming.pano_id);

        if let Some(date) = non_empty(incoming.date.clone()) {
            self.date = Some(date);
        }
        if let Some(copyright) = non_empty(incoming.copyright.clone()) {
            self.copyright = Some(copyright);
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PanoramaRecord {
        PanoramaRecord::new("pano-1", 37.77, -122.41).with_orientation(90.0, 1.5, -0.5)
    }

    #[test]
    fn test_empty_strings_become_none() {
        let rec = record().with_date(Some("")).with_copyright(Some("  "));
        assert!(rec.date.is_none());
        assert!(rec.copyright.is_none());
        assert!(!rec.has_complete_metadata());
    }

    #[test]
    fn test_merge_keeps_known_fields() {
        let mut stored = record().with_date(Some("2024-04")).with_copyright(Some("© Google"));
        let incoming = PanoramaRecord::new("pano-1", 37.0, -122.0);

        stored.merge_from(&incoming);

        assert_eq!(stored.date.as_deref(), Some("2024-04"));
        assert_eq!(stored.copyright.as_deref(), Some("© Google"));
        assert_eq!(stored.lat, 37.77);
        assert_eq!(stored.heading, 90.0);
    }

    #[test]
    fn test_merge_fills_missing_fields() {
        let mut stored = record().with_date(Some("2023-01"));
        let incoming = record().with_copyright(Some("© Someone"));

        stored.merge_from(&incoming);

        assert_eq!(stored.date.as_deref(), Some("2023-01"));
        assert_eq!(stored.copyright.as_deref(), Some("© Someone"));
        assert!(stored.has_complete_metadata());
    }

    #[test]
    fn test_merge_prefers_incoming_when_both_known() {
        let mut stored = record().with_date(Some("2019-06"));
        let incoming = record().with_date(Some("2024-04"));

        stored.merge_from(&incoming);

        assert_eq!(stored.date.as_deref(), Some("2024-04"));
    }
}

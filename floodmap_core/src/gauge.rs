// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Live river gauge readings.
//!
//! [`GaugePoller`] is the host-independent half of the gauge feed: it hands
//! out a ticket per poll round, applies responses only for the current
//! round, and degrades every failure to [`GaugeReading::Offline`]. The host
//! performs the actual HTTP requests and aborts the requests of a superseded
//! round.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use serde_json::Value;

use crate::trace::{GaugeAction, GaugeEvent, TraceSink, Tracer};

/// Value the USGS service reports when a sensor has no data.
const NO_DATA: f64 = -999_999.0;

/// One monitored gauge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GaugeSite {
    /// Service site number, e.g. `"01463500"`.
    pub id: String,
    /// Display label.
    pub label: String,
}

impl GaugeSite {
    /// Creates a site.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Latest known reading of one gauge.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum GaugeReading {
    /// A current water level.
    Live {
        /// Gauge height in feet.
        feet: f64,
        /// Service timestamp of the measurement.
        timestamp: String,
    },
    /// No usable reading.
    #[default]
    Offline,
}

impl GaugeReading {
    /// Returns whether the reading is live.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    /// Timestamp of a live reading, or `"N/A"`.
    #[must_use]
    pub fn timestamp_label(&self) -> &str {
        match self {
            Self::Live { timestamp, .. } => timestamp,
            Self::Offline => "N/A",
        }
    }
}

impl fmt::Display for GaugeReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live { feet, .. } => write!(f, "{feet:.1} ft"),
            Self::Offline => f.write_str("Offline"),
        }
    }
}

/// Why a gauge request produced no body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchError {
    /// The request failed before a response arrived.
    Network(String),
    /// The service answered with a non-success status.
    Status(u16),
    /// The request was aborted.
    Aborted,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(reason) => write!(f, "gauge request failed: {reason}"),
            Self::Status(status) => write!(f, "gauge service returned HTTP {status}"),
            Self::Aborted => f.write_str("gauge request aborted"),
        }
    }
}

impl core::error::Error for FetchError {}

/// Where and how often to poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GaugeConfig {
    /// Request URL with a `{site}` placeholder.
    pub endpoint: String,
    /// Gauges to poll.
    pub sites: Vec<GaugeSite>,
    /// Time between poll rounds.
    pub interval_ms: u32,
}

impl GaugeConfig {
    /// USGS instantaneous-values service, gauge height, every five minutes.
    #[must_use]
    pub fn usgs(sites: Vec<GaugeSite>) -> Self {
        Self {
            endpoint: String::from(
                "https://waterservices.usgs.gov/nwis/iv/?format=json&sites={site}&parameterCd=00065&siteStatus=all",
            ),
            sites,
            interval_ms: 5 * 60 * 1000,
        }
    }

    /// Request URL for `site`.
    #[must_use]
    pub fn url(&self, site: &GaugeSite) -> String {
        self.endpoint.replace("{site}", &site.id)
    }
}

/// Extracts the newest reading from an instantaneous-values document.
///
/// Anything unexpected yields [`GaugeReading::Offline`].
#[must_use]
pub fn parse_reading(body: &str) -> GaugeReading {
    let Ok(doc) = serde_json::from_str::<Value>(body) else {
        return GaugeReading::Offline;
    };
    let Some(latest) = doc
        .pointer("/value/timeSeries/0/values/0/value")
        .and_then(Value::as_array)
        .and_then(|values| values.last())
    else {
        return GaugeReading::Offline;
    };
    let feet = match latest.get("value") {
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };
    let Some(feet) = feet.filter(|feet| feet.is_finite() && *feet != NO_DATA) else {
        return GaugeReading::Offline;
    };
    let timestamp = latest
        .get("dateTime")
        .and_then(Value::as_str)
        .unwrap_or("N/A")
        .to_string();
    GaugeReading::Live { feet, timestamp }
}

/// Identifies one poll round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

/// Returned by [`GaugePoller::begin`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollRound {
    /// Ticket to pass back with every response of this round.
    pub ticket: Ticket,
    /// The unfinished round this one replaced. Its requests should be
    /// aborted.
    pub superseded: Option<Ticket>,
}

/// Poll-round bookkeeping and current readings for a set of gauges.
pub struct GaugePoller {
    sites: Vec<GaugeSite>,
    readings: Vec<GaugeReading>,
    round: u64,
    active: Option<Ticket>,
    outstanding: usize,
    tracer: Tracer,
}

impl fmt::Debug for GaugePoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaugePoller")
            .field("sites", &self.sites.len())
            .field("round", &self.round)
            .field("active", &self.active)
            .field("outstanding", &self.outstanding)
            .finish_non_exhaustive()
    }
}

impl GaugePoller {
    /// Creates a poller with every site offline.
    #[must_use]
    pub fn new(sites: Vec<GaugeSite>) -> Self {
        let readings = sites.iter().map(|_| GaugeReading::Offline).collect();
        Self {
            sites,
            readings,
            round: 0,
            active: None,
            outstanding: 0,
            tracer: Tracer::none(),
        }
    }

    /// Routes gauge events to `sink`.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.tracer = Tracer::new(sink);
        self
    }

    /// Polled sites.
    #[must_use]
    pub fn sites(&self) -> &[GaugeSite] {
        &self.sites
    }

    /// Latest readings, parallel to [`sites`](Self::sites).
    #[must_use]
    pub fn readings(&self) -> &[GaugeReading] {
        &self.readings
    }

    /// Latest reading for site `index`.
    #[must_use]
    pub fn reading(&self, index: usize) -> Option<&GaugeReading> {
        self.readings.get(index)
    }

    /// Returns whether a round has responses outstanding.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.active.is_some()
    }

    /// Starts a new round, superseding any unfinished one.
    pub fn begin(&mut self) -> PollRound {
        self.round += 1;
        let ticket = Ticket(self.round);
        let superseded = self.active.replace(ticket);
        self.outstanding = self.sites.len();
        if self.outstanding == 0 {
            self.active = None;
        }
        self.tracer.gauge(&GaugeEvent {
            round: self.round,
            action: GaugeAction::PollStarted,
            site: None,
            online: false,
        });
        PollRound { ticket, superseded }
    }

    /// Applies the response for `site` in round `ticket`.
    ///
    /// Returns `false` (and changes nothing) if the round was superseded or
    /// cancelled, or `site` is out of range.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        site: usize,
        result: Result<&str, FetchError>,
    ) -> bool {
        if self.active != Some(ticket) || site >= self.readings.len() {
            self.tracer.gauge(&GaugeEvent {
                round: ticket.0,
                action: GaugeAction::StaleDropped,
                site: Some(site),
                online: false,
            });
            return false;
        }
        let reading = match result {
            Ok(body) => parse_reading(body),
            Err(_) => GaugeReading::Offline,
        };
        let online = reading.is_live();
        self.readings[site] = reading;
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.outstanding == 0 {
            self.active = None;
        }
        self.tracer.gauge(&GaugeEvent {
            round: ticket.0,
            action: GaugeAction::Accepted,
            site: Some(site),
            online,
        });
        true
    }

    /// Ends the current round; later responses for it are dropped.
    pub fn cancel(&mut self) -> Option<Ticket> {
        let cancelled = self.active.take()?;
        self.outstanding = 0;
        self.tracer.gauge(&GaugeEvent {
            round: cancelled.0,
            action: GaugeAction::Cancelled,
            site: None,
            online: false,
        });
        Some(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    const SAMPLE: &str = r#"{
        "value": {
            "timeSeries": [{
                "values": [{
                    "value": [
                        {"value": "11.90", "dateTime": "2026-03-01T10:00:00.000-05:00"},
                        {"value": "12.34", "dateTime": "2026-03-01T10:15:00.000-05:00"}
                    ]
                }]
            }]
        }
    }"#;

    fn sites() -> Vec<GaugeSite> {
        vec![
            GaugeSite::new("01463500", "Trenton"),
            GaugeSite::new("01467200", "Philadelphia"),
        ]
    }

    #[test]
    fn parses_latest_value() {
        let reading = parse_reading(SAMPLE);
        assert_eq!(
            reading,
            GaugeReading::Live {
                feet: 12.34,
                timestamp: String::from("2026-03-01T10:15:00.000-05:00"),
            }
        );
        assert_eq!(reading.to_string(), "12.3 ft");
    }

    #[test]
    fn malformed_documents_are_offline() {
        assert_eq!(parse_reading("not json"), GaugeReading::Offline);
        assert_eq!(parse_reading("{}"), GaugeReading::Offline);
        assert_eq!(
            parse_reading(r#"{"value":{"timeSeries":[]}}"#),
            GaugeReading::Offline
        );
        assert_eq!(
            parse_reading(r#"{"value":{"timeSeries":[{"values":[{"value":[]}]}]}}"#),
            GaugeReading::Offline
        );
        assert_eq!(
            parse_reading(
                r#"{"value":{"timeSeries":[{"values":[{"value":[{"value":"ice"}]}]}]}}"#
            ),
            GaugeReading::Offline
        );
    }

    #[test]
    fn no_data_sentinel_is_offline() {
        let body = r#"{"value":{"timeSeries":[{"values":[{"value":[
            {"value":"-999999","dateTime":"2026-03-01T10:15:00.000-05:00"}
        ]}]}]}}"#;
        assert_eq!(parse_reading(body), GaugeReading::Offline);
    }

    #[test]
    fn offline_labels() {
        assert_eq!(GaugeReading::Offline.to_string(), "Offline");
        assert_eq!(GaugeReading::Offline.timestamp_label(), "N/A");
    }

    #[test]
    fn responses_apply_only_to_current_round() {
        let mut poller = GaugePoller::new(sites());
        let first = poller.begin();
        assert_eq!(first.superseded, None);
        let second = poller.begin();
        assert_eq!(second.superseded, Some(first.ticket));

        assert!(
            !poller.complete(first.ticket, 0, Ok(SAMPLE)),
            "stale round must be dropped"
        );
        assert_eq!(poller.reading(0), Some(&GaugeReading::Offline));

        assert!(poller.complete(second.ticket, 0, Ok(SAMPLE)));
        assert!(poller.reading(0).is_some_and(GaugeReading::is_live));
        assert!(poller.is_polling(), "site 1 still outstanding");
        assert!(poller.complete(second.ticket, 1, Err(FetchError::Status(503))));
        assert_eq!(poller.reading(1), Some(&GaugeReading::Offline));
        assert!(!poller.is_polling(), "round finished");
    }

    #[test]
    fn cancel_drops_late_responses() {
        let mut poller = GaugePoller::new(sites());
        let round = poller.begin();
        assert_eq!(poller.cancel(), Some(round.ticket));
        assert_eq!(poller.cancel(), None);
        assert!(!poller.complete(round.ticket, 0, Ok(SAMPLE)));
        assert!(poller.readings().iter().all(|r| !r.is_live()));
    }

    #[test]
    fn failure_replaces_previous_live_reading() {
        let mut poller = GaugePoller::new(sites());
        let round = poller.begin();
        assert!(poller.complete(round.ticket, 0, Ok(SAMPLE)));
        let round = poller.begin();
        assert!(poller.complete(
            round.ticket,
            0,
            Err(FetchError::Network(String::from("offline")))
        ));
        assert_eq!(poller.reading(0), Some(&GaugeReading::Offline));
    }

    #[test]
    fn out_of_range_site_is_rejected() {
        let mut poller = GaugePoller::new(sites());
        let round = poller.begin();
        assert!(!poller.complete(round.ticket, 7, Ok(SAMPLE)));
    }

    #[test]
    fn usgs_url_substitutes_site() {
        let config = GaugeConfig::usgs(sites());
        let url = config.url(&config.sites[0]);
        assert!(url.contains("sites=01463500"), "got {url}");
        assert!(!url.contains("{site}"), "placeholder left in {url}");
    }
}

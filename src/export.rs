use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use serde::Serialize;

use crate::track_types::{Trail, Waypoint};

pub const GPX_CREATOR: &str = "HikeTracker";
pub const GPX_MIME_TYPE: &str = "application/gpx+xml";

/// A generated document ready to be offered as a download.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub contents: String,
}

fn iso8601(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn header() -> String {
    format!("<?xml version=\"1.0\"?>\n<gpx version=\"1.1\" creator=\"{GPX_CREATOR}\">\n")
}

/// GPX document with one `wpt` per waypoint.
pub fn waypoints_to_gpx(waypoints: &[Waypoint]) -> String {
    let mut out = header();
    for wpt in waypoints {
        let _ = writeln!(
            out,
            "  <wpt lat=\"{}\" lon=\"{}\"><name>{}</name><time>{}</time></wpt>",
            wpt.lat,
            wpt.lon,
            escape(wpt.name.as_str()),
            iso8601(&wpt.created_at)
        );
    }
    out.push_str("</gpx>\n");
    out
}

/// GPX document with a single track segment.
pub fn trail_to_gpx(trail: &Trail) -> String {
    let mut out = header();
    out.push_str("  <trk>\n");
    let _ = writeln!(out, "    <name>{}</name>", escape(trail.name.as_str()));
    out.push_str("    <trkseg>\n");
    for pt in &trail.points {
        let _ = writeln!(
            out,
            "      <trkpt lat=\"{}\" lon=\"{}\"><time>{}</time></trkpt>",
            pt.lat,
            pt.lon,
            iso8601(&pt.timestamp)
        );
    }
    out.push_str("    </trkseg>\n  </trk>\n</gpx>\n");
    out
}

pub fn waypoints_file_name(today: DateTime<Utc>) -> String {
    format!("waypoints-{}.gpx", today.format("%Y-%m-%d"))
}

/// Trail name with every whitespace run replaced by '-', then the start date.
pub fn trail_file_name(trail: &Trail) -> String {
    let mut slug = String::with_capacity(trail.name.len());
    let mut in_space = false;
    for ch in trail.name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
        } else {
            slug.push(ch);
            in_space = false;
        }
    }
    format!("{slug}-{}.gpx", trail.start_time.format("%Y-%m-%d"))
}

pub fn export_waypoints(waypoints: &[Waypoint], today: DateTime<Utc>) -> ExportFile {
    ExportFile {
        file_name: waypoints_file_name(today),
        mime_type: GPX_MIME_TYPE,
        contents: waypoints_to_gpx(waypoints),
    }
}

pub fn export_trail(trail: &Trail) -> ExportFile {
    ExportFile {
        file_name: trail_file_name(trail),
        mime_type: GPX_MIME_TYPE,
        contents: trail_to_gpx(trail),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::parser::parse_trail_at;
    use crate::track_types::{TrackFormat, TrailId, TrailPoint, TrailProvenance, WaypointId};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    fn sample_trail(name: &str) -> Trail {
        Trail {
            id: TrailId(1),
            name: name.to_string(),
            provenance: TrailProvenance::Recorded,
            points: vec![
                TrailPoint::new(46.5, 7.9, at(8, 0, 0)),
                TrailPoint::new(46.51, 7.91, at(8, 0, 30)),
            ],
            start_time: at(8, 0, 0),
            end_time: Some(at(8, 1, 0)),
            distance: None,
        }
    }

    #[test]
    fn test_waypoint_document() {
        let waypoints = vec![Waypoint {
            id: WaypointId(7),
            name: "Hut <A> & Co".to_string(),
            lat: 46.5,
            lon: 7.9,
            created_at: at(9, 30, 0),
        }];
        let doc = waypoints_to_gpx(&waypoints);
        assert_eq!(
            doc,
            "<?xml version=\"1.0\"?>\n\
             <gpx version=\"1.1\" creator=\"HikeTracker\">\n  \
             <wpt lat=\"46.5\" lon=\"7.9\"><name>Hut &lt;A&gt; &amp; Co</name><time>2024-05-01T09:30:00.000Z</time></wpt>\n\
             </gpx>\n"
        );
    }

    #[test]
    fn test_trail_document_reimports() {
        let trail = sample_trail("Lake Loop");
        let doc = trail_to_gpx(&trail);
        assert!(doc.contains("<trk>"));
        assert!(doc.contains("<name>Lake Loop</name>"));
        assert!(doc.contains(
            "<trkpt lat=\"46.51\" lon=\"7.91\"><time>2024-05-01T08:00:30.000Z</time></trkpt>"
        ));

        let reimported = parse_trail_at(&doc, "x.gpx", TrackFormat::Gpx, at(12, 0, 0)).unwrap();
        assert_eq!(reimported.points, trail.points);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(waypoints_file_name(at(9, 0, 0)), "waypoints-2024-05-01.gpx");
        assert_eq!(
            trail_file_name(&sample_trail("Lake  Loop\tnorth")),
            "Lake-Loop-north-2024-05-01.gpx"
        );
        let file = export_trail(&sample_trail("Trail 1"));
        assert_eq!(file.file_name, "Trail-1-2024-05-01.gpx");
        assert_eq!(file.mime_type, "application/gpx+xml");
    }
}

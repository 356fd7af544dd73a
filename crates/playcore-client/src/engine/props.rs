//! Property access on the engine thread.
//!
//! All verbs run via the dispatch bridge once the engine is initialized, so
//! the playback state is only ever touched from the engine thread. Values
//! travel as text in both directions; `Print` renders a human-friendly
//! variant of the same value.

use super::options::parse_flag;
use super::Playback;
use crate::error::{Error, Result};

/// What to do with a property.
#[derive(Debug)]
pub(crate) enum Verb<'a> {
    /// Read the value as text.
    GetText,
    /// Read a print-friendly rendering of the value.
    Print,
    /// Write the value from text.
    SetText(&'a str),
}

/// Runs one property access against the playback state.
///
/// Returns the value text for the read verbs and `None` for writes.
/// Unknown names map to [`Error::NotFound`]; properties whose backing
/// subsystem is inactive map to [`Error::PropertyUnavailable`]; bad values
/// and writes to read-only properties map to [`Error::Property`].
pub(crate) fn property_do(core: &mut Playback, name: &str, verb: Verb<'_>) -> Result<Option<String>> {
    // Option names double as properties once the engine runs; a write to
    // "options/volume" lands on the volume property.
    let name = name.strip_prefix("options/").unwrap_or(name);

    match (name, verb) {
        ("pause", Verb::GetText | Verb::Print) => Ok(Some(flag_text(core.pause()))),
        ("pause", Verb::SetText(value)) => {
            let flag = parse_flag(value).ok_or(Error::Property)?;
            core.set_pause(flag);
            Ok(None)
        }

        ("volume", Verb::GetText) => Ok(Some(format!("{:.1}", core.volume()))),
        ("volume", Verb::Print) => Ok(Some(format!("{:.0}%", core.volume()))),
        ("volume", Verb::SetText(value)) => {
            core.set_volume(parse_float(value)?)?;
            Ok(None)
        }

        ("speed", Verb::GetText) => Ok(Some(format!("{:.2}", core.speed()))),
        ("speed", Verb::Print) => Ok(Some(format!("x{:.2}", core.speed()))),
        ("speed", Verb::SetText(value)) => {
            core.set_speed(parse_float(value)?)?;
            Ok(None)
        }

        ("track", Verb::GetText | Verb::Print) => Ok(Some(core.track().to_string())),
        ("track", Verb::SetText(value)) => {
            let track = value.parse().map_err(|_| Error::Property)?;
            core.set_track(track);
            Ok(None)
        }

        ("filename", Verb::GetText | Verb::Print) => {
            let path = core.current_path().ok_or(Error::PropertyUnavailable)?;
            Ok(Some(file_name(path).to_string()))
        }

        ("path", Verb::GetText | Verb::Print) => {
            let path = core.current_path().ok_or(Error::PropertyUnavailable)?;
            Ok(Some(path.to_string()))
        }

        ("media-title", Verb::GetText | Verb::Print) => {
            // Falls back to the file name; there is no tag reader here.
            let path = core.current_path().ok_or(Error::PropertyUnavailable)?;
            Ok(Some(file_name(path).to_string()))
        }

        ("time-pos", Verb::GetText) => {
            core.current_path().ok_or(Error::PropertyUnavailable)?;
            Ok(Some(format!("{:.6}", core.time_pos())))
        }
        ("time-pos", Verb::Print) => {
            core.current_path().ok_or(Error::PropertyUnavailable)?;
            Ok(Some(format_time(core.time_pos())))
        }
        ("time-pos", Verb::SetText(value)) => {
            core.current_path().ok_or(Error::PropertyUnavailable)?;
            core.seek_absolute(parse_float(value)?);
            Ok(None)
        }

        ("idle-active", Verb::GetText | Verb::Print) => Ok(Some(flag_text(core.idle_active()))),
        ("idle-active", Verb::SetText(_)) => Err(Error::Property),

        ("playlist-count", Verb::GetText | Verb::Print) => {
            Ok(Some(core.playlist_count().to_string()))
        }
        ("playlist-count", Verb::SetText(_)) => Err(Error::Property),

        _ => Err(Error::NotFound),
    }
}

fn flag_text(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

fn parse_float(value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(Error::Property)
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Renders seconds as `mm:ss` or `h:mm:ss`.
fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (h, m, s) = (total / 3600, (total / 60) % 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Engine, Playback};
    use super::*;
    use std::sync::Arc;

    fn core() -> Playback {
        let engine = Arc::new(Engine::new());
        let opts = engine.options.lock();
        Playback::new(Arc::clone(&engine), &opts)
    }

    #[test]
    fn test_flag_property_round_trip() {
        let mut core = core();
        assert_eq!(
            property_do(&mut core, "pause", Verb::GetText).unwrap(),
            Some("no".into())
        );
        property_do(&mut core, "pause", Verb::SetText("yes")).unwrap();
        assert_eq!(
            property_do(&mut core, "pause", Verb::GetText).unwrap(),
            Some("yes".into())
        );
        assert_eq!(
            property_do(&mut core, "pause", Verb::SetText("sideways")),
            Err(Error::Property)
        );
    }

    #[test]
    fn test_numeric_properties_validate() {
        let mut core = core();
        property_do(&mut core, "volume", Verb::SetText("85")).unwrap();
        assert_eq!(
            property_do(&mut core, "volume", Verb::GetText).unwrap(),
            Some("85.0".into())
        );
        assert_eq!(
            property_do(&mut core, "volume", Verb::Print).unwrap(),
            Some("85%".into())
        );
        assert_eq!(
            property_do(&mut core, "volume", Verb::SetText("loud")),
            Err(Error::Property)
        );
        assert_eq!(
            property_do(&mut core, "volume", Verb::SetText("2000")),
            Err(Error::Property)
        );
    }

    #[test]
    fn test_unavailable_without_file() {
        let mut core = core();
        assert_eq!(
            property_do(&mut core, "filename", Verb::GetText),
            Err(Error::PropertyUnavailable)
        );
        assert_eq!(
            property_do(&mut core, "time-pos", Verb::Print),
            Err(Error::PropertyUnavailable)
        );
    }

    #[test]
    fn test_file_properties() {
        let mut core = core();
        core.start_file("/media/music/track one.flac".into());
        assert_eq!(
            property_do(&mut core, "filename", Verb::GetText).unwrap(),
            Some("track one.flac".into())
        );
        assert_eq!(
            property_do(&mut core, "path", Verb::GetText).unwrap(),
            Some("/media/music/track one.flac".into())
        );
        assert_eq!(
            property_do(&mut core, "time-pos", Verb::Print).unwrap(),
            Some("00:00".into())
        );
    }

    #[test]
    fn test_unknown_and_read_only() {
        let mut core = core();
        assert_eq!(
            property_do(&mut core, "chapters", Verb::GetText),
            Err(Error::NotFound)
        );
        assert_eq!(
            property_do(&mut core, "idle-active", Verb::SetText("yes")),
            Err(Error::Property)
        );
    }

    #[test]
    fn test_options_prefix_maps_to_property() {
        let mut core = core();
        property_do(&mut core, "options/volume", Verb::SetText("40")).unwrap();
        assert_eq!(
            property_do(&mut core, "volume", Verb::GetText).unwrap(),
            Some("40.0".into())
        );
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(65.9), "01:05");
        assert_eq!(format_time(3725.0), "1:02:05");
    }
}

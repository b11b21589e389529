//! Text rendering of the feed.

use std::fmt::Display;

use chrono::TimeZone;
use glass_store::StoredEvent;
use glass_types::display_label_in;

/// Renders one line per event, most recent arrival first.
///
/// Each line reads `"{HH:mm:ss}: {content}"`, with the label taken from
/// the payload timestamp in `tz`. An unresolvable timestamp renders an
/// empty label.
pub fn render_feed<Tz>(events: &[StoredEvent], tz: &Tz) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    events
        .iter()
        .rev()
        .map(|stored| {
            let event = stored.event();
            format!(
                "{}: {}",
                display_label_in(event.timestamp_raw(), tz),
                event.content()
            )
        })
        .collect()
}

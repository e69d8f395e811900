//! Response templating.
//!
//! Markers look like `*{*name*}*`. Each one is replaced by the customization
//! with that name, or removed when no such customization exists. The `date`
//! tag always renders the current time as an HTTP date.

use std::borrow::Cow;
use std::sync::LazyLock;
use regex::{Captures, Regex};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::signatures::Customizations;

/// Tag recomputed on every render.
pub const DATE_TAG: &str = "date";

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\{\*(\w+)\*\}\*").expect("tag pattern is valid"));

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(at: OffsetDateTime) -> String {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    at.to_offset(time::UtcOffset::UTC)
        .format(&format)
        .unwrap_or_default()
}

/// Substitute every tag marker in `text`.
pub fn render(text: &str, tags: &Customizations) -> String {
    render_at(text, tags, OffsetDateTime::now_utc())
}

/// Like [`render`] with an explicit clock for the `date` tag.
pub fn render_at(text: &str, tags: &Customizations, now: OffsetDateTime) -> String {
    if !TAG_PATTERN.is_match(text) {
        return text.to_string();
    }

    let date = http_date(now);
    let rendered: Cow<'_, str> = TAG_PATTERN.replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        if name == DATE_TAG {
            date.clone()
        } else {
            tags.get(name).unwrap_or_default().to_string()
        }
    });
    rendered.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn tags(pairs: &[(&str, &str)]) -> Customizations {
        pairs.iter().copied().collect()
    }

    #[test]
    fn replaces_defined_tags() {
        let rendered = render("Server: *{*banner*}*", &tags(&[("banner", "Apache/2.4.41")]));
        assert_eq!(rendered, "Server: Apache/2.4.41");
    }

    #[test]
    fn removes_undefined_tags() {
        assert_eq!(render("*{*unknown*}*", &Customizations::default()), "");
        assert_eq!(render("a*{*x*}*b*{*x*}*c", &Customizations::default()), "abc");
    }

    #[test]
    fn text_without_markers_is_unchanged() {
        let text = "<html>*{* not a tag *}* {*x*} *{x}*</html>";
        let once = render(text, &tags(&[("x", "y")]));
        assert_eq!(once, text);
        assert_eq!(render(&once, &tags(&[("x", "y")])), once);
    }

    #[test]
    fn date_tag_ignores_stored_value() {
        let now = datetime!(1994-11-06 08:49:37 UTC);
        let rendered = render_at("Date: *{*date*}*", &tags(&[("date", "stale")]), now);
        assert_eq!(rendered, "Date: Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn date_tag_tracks_the_clock() {
        let first = render("*{*date*}*", &Customizations::default());
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let second = render("*{*date*}*", &Customizations::default());
        assert_ne!(first, second);
        for value in [&first, &second] {
            assert_eq!(value.len(), 29);
            assert!(value.ends_with(" GMT"));
            assert_eq!(&value[3..5], ", ");
        }
    }
}

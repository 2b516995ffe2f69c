//! Card signature detection over raw file content.
//!
//! Card files carry their metadata as plain strings inside the image container,
//! so a file's kind can be recovered by searching its bytes for known marker
//! names. Studio scenes additionally carry timeline data, from which the
//! timeline kind and clip duration are extracted.
//!
//! # Examples
//!
//! ```
//! use kkcards::signature::{CardKind, CardSignature, SignatureDetector, Timeline};
//!
//! let detector = SignatureDetector::default();
//! assert_eq!(
//!     detector.detect(b"..KoiKatuCharaSP.."),
//!     CardSignature::Card(CardKind::KoiKatuCharaSP)
//! );
//! assert_eq!(
//!     detector.detect(b"KStudio timeline"),
//!     CardSignature::Studio { timeline: Timeline::Static }
//! );
//! assert_eq!(detector.detect(b""), CardSignature::Unknown);
//! ```

use std::path::PathBuf;

/// Marker identifying a studio scene card. Checked before every other marker.
pub const STUDIO_MARKER: &str = "KStudio";
/// Present only in scenes whose timeline carries animated keyframes.
pub const DYNAMIC_TIMELINE_MARKER: &str = "Timeline";
/// Present in any scene that has a timeline at all.
pub const STATIC_TIMELINE_MARKER: &str = "timeline";
/// Precedes the clip length, in seconds, of an animated timeline.
pub const DURATION_MARKER: &str = "duration";

/// Clips longer than this many seconds are sorted as movies, the rest as GIFs.
pub const MOVIE_THRESHOLD_SECS: f64 = 10.0;

/// A non-studio card family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CardKind {
    KoiKatuCharaSun,
    KoiKatuCharaSP,
    KoiKatuCharaS,
    KoiKatuChara,
    KoiKatuClothes,
    /// A family registered at runtime through [`SignatureDetector::add_marker`].
    Other(String),
}

impl CardKind {
    /// Returns the marker string, which doubles as the directory name.
    ///
    /// ```
    /// use kkcards::signature::CardKind;
    ///
    /// assert_eq!(CardKind::KoiKatuCharaSun.marker(), "KoiKatuCharaSun");
    /// assert_eq!(CardKind::Other("AIS_Chara".into()).marker(), "AIS_Chara");
    /// ```
    pub fn marker(&self) -> &str {
        match self {
            CardKind::KoiKatuCharaSun => "KoiKatuCharaSun",
            CardKind::KoiKatuCharaSP => "KoiKatuCharaSP",
            CardKind::KoiKatuCharaS => "KoiKatuCharaS",
            CardKind::KoiKatuChara => "KoiKatuChara",
            CardKind::KoiKatuClothes => "KoiKatuClothes",
            CardKind::Other(marker) => marker,
        }
    }
}

/// Timeline information carried by a studio scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timeline {
    /// The scene has no timeline.
    Absent,
    /// The scene has a timeline without animation.
    Static,
    /// The scene has an animated timeline, with its length if one was found.
    Dynamic { duration: Option<f64> },
}

/// The classification of a single file.
#[derive(Debug, Clone, PartialEq)]
pub enum CardSignature {
    /// A studio scene card.
    Studio { timeline: Timeline },
    /// A character, clothing or other registered card family.
    Card(CardKind),
    /// No known marker was found.
    Unknown,
}

impl CardSignature {
    /// Returns the directory for this signature, relative to the output root.
    ///
    /// This performs no filesystem access; see
    /// [`resolve_target_dir`](crate::placement::resolve_target_dir) for the
    /// variant that also creates the directory.
    ///
    /// ```
    /// use kkcards::signature::{CardSignature, Timeline};
    /// use std::path::PathBuf;
    ///
    /// let sig = CardSignature::Studio { timeline: Timeline::Dynamic { duration: Some(3.0) } };
    /// assert_eq!(
    ///     sig.relative_dir(),
    ///     PathBuf::from("KStudio/has_timeline/dynamic/GIF_duration_elt_10s")
    /// );
    /// ```
    pub fn relative_dir(&self) -> PathBuf {
        match self {
            CardSignature::Unknown => PathBuf::from("Unknown_cards"),
            CardSignature::Card(kind) => PathBuf::from(kind.marker()),
            CardSignature::Studio { timeline } => {
                let studio = PathBuf::from(STUDIO_MARKER);
                match timeline {
                    Timeline::Absent => studio.join("no_timeline"),
                    Timeline::Static => studio.join("has_timeline").join("static"),
                    Timeline::Dynamic { duration } => {
                        let dynamic = studio.join("has_timeline").join("dynamic");
                        match duration {
                            None => dynamic,
                            Some(secs) if *secs > MOVIE_THRESHOLD_SECS => {
                                dynamic.join("movie_duration_gt_10s")
                            }
                            Some(_) => dynamic.join("GIF_duration_elt_10s"),
                        }
                    }
                }
            }
        }
    }

    /// Returns a short label for summaries, e.g. `KStudio/no_timeline`.
    pub fn label(&self) -> String {
        self.relative_dir()
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Detects card signatures using an ordered table of markers.
///
/// The table is consulted top to bottom and the first marker found wins, so
/// every marker must appear before any shorter marker it contains
/// (`KoiKatuCharaSun` before `KoiKatuCharaS` before `KoiKatuChara`). The studio
/// marker is not part of the table: it is checked first and overrides all of it.
#[derive(Debug, Clone)]
pub struct SignatureDetector {
    markers: Vec<CardKind>,
}

impl SignatureDetector {
    /// Creates a detector with the built-in card families.
    pub fn new() -> Self {
        Self {
            markers: vec![
                CardKind::KoiKatuCharaSun,
                CardKind::KoiKatuCharaSP,
                CardKind::KoiKatuCharaS,
                CardKind::KoiKatuChara,
                CardKind::KoiKatuClothes,
            ],
        }
    }

    /// Appends a marker at the lowest priority.
    ///
    /// Returns `false` without changing the table if the marker is the studio
    /// marker, is already registered, or cannot be used as a directory name.
    pub fn add_marker(&mut self, marker: &str) -> bool {
        if marker.is_empty()
            || marker == "."
            || marker == ".."
            || marker.contains(['/', '\\'])
            || marker == STUDIO_MARKER
            || self.markers.iter().any(|kind| kind.marker() == marker)
        {
            return false;
        }
        self.markers.push(CardKind::Other(marker.to_string()));
        true
    }

    /// Returns the card families in priority order.
    pub fn markers(&self) -> &[CardKind] {
        &self.markers
    }

    /// Classifies raw file content.
    ///
    /// Invalid UTF-8 sequences are dropped before matching, so this never fails.
    pub fn detect(&self, content: &[u8]) -> CardSignature {
        let text = decode_lossy(content);

        if text.contains(STUDIO_MARKER) {
            return CardSignature::Studio {
                timeline: detect_timeline(&text),
            };
        }

        self.markers
            .iter()
            .find(|kind| text.contains(kind.marker()))
            .map(|kind| CardSignature::Card(kind.clone()))
            .unwrap_or(CardSignature::Unknown)
    }
}

impl Default for SignatureDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes UTF-8, skipping any byte sequences that are not valid.
fn decode_lossy(content: &[u8]) -> String {
    content.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

fn detect_timeline(text: &str) -> Timeline {
    if text.contains(DYNAMIC_TIMELINE_MARKER) {
        Timeline::Dynamic {
            duration: parse_duration(text),
        }
    } else if text.contains(STATIC_TIMELINE_MARKER) {
        Timeline::Static
    } else {
        Timeline::Absent
    }
}

/// Reads the number following the first duration marker.
///
/// Skips ahead to the first numeric character after the marker, then takes
/// the longest run of numeric characters and dots. Decimal digits from any
/// script count (`٣` reads as 3). A run holding a numeric character that is
/// not a decimal digit, such as `²`, or that is not a valid float (`1.2.3`)
/// yields `None`.
fn parse_duration(text: &str) -> Option<f64> {
    let start = text.find(DURATION_MARKER)? + DURATION_MARKER.len();
    let rest = &text[start..];
    let digits_at = rest.find(char::is_numeric)?;
    let number = &rest[digits_at..];
    let end = number
        .find(|c: char| !(c.is_numeric() || c == '.'))
        .unwrap_or(number.len());

    let ascii = number[..end]
        .chars()
        .map(|c| match c {
            '.' => Some('.'),
            _ => decimal_value(c).and_then(|d| char::from_digit(d, 10)),
        })
        .collect::<Option<String>>()?;
    ascii.parse().ok()
}

/// Code points of the digit zero in scripts with a contiguous 0-9 block.
const DECIMAL_ZEROS: &[u32] = &[
    0x0030, // ASCII
    0x0660, // Arabic-Indic
    0x06F0, // Extended Arabic-Indic
    0x07C0, // NKo
    0x0966, // Devanagari
    0x09E6, // Bengali
    0x0A66, // Gurmukhi
    0x0AE6, // Gujarati
    0x0B66, // Oriya
    0x0BE6, // Tamil
    0x0C66, // Telugu
    0x0CE6, // Kannada
    0x0D66, // Malayalam
    0x0DE6, // Sinhala Lith
    0x0E50, // Thai
    0x0ED0, // Lao
    0x0F20, // Tibetan
    0x1040, // Myanmar
    0x1090, // Myanmar Shan
    0x17E0, // Khmer
    0x1810, // Mongolian
    0x1946, // Limbu
    0x19D0, // New Tai Lue
    0x1A80, // Tai Tham Hora
    0x1A90, // Tai Tham Tham
    0x1B50, // Balinese
    0x1BB0, // Sundanese
    0x1C40, // Lepcha
    0x1C50, // Ol Chiki
    0xA620, // Vai
    0xA8D0, // Saurashtra
    0xA900, // Kayah Li
    0xA9D0, // Javanese
    0xA9F0, // Myanmar Tai Laing
    0xAA50, // Cham
    0xABF0, // Meetei Mayek
    0xFF10, // Fullwidth
];

/// Returns the value of a decimal digit from any listed script.
fn decimal_value(c: char) -> Option<u32> {
    let code = u32::from(c);
    DECIMAL_ZEROS
        .iter()
        .find(|&&zero| (zero..zero + 10).contains(&code))
        .map(|&zero| code - zero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn studio(timeline: Timeline) -> CardSignature {
        CardSignature::Studio { timeline }
    }

    #[test]
    fn test_empty_content_is_unknown() {
        let detector = SignatureDetector::default();
        assert_eq!(detector.detect(b""), CardSignature::Unknown);
    }

    #[test]
    fn test_unrelated_content_is_unknown() {
        let detector = SignatureDetector::default();
        assert_eq!(
            detector.detect(b"\x89PNG\r\n\x1a\nIHDR plain image"),
            CardSignature::Unknown
        );
    }

    #[test]
    fn test_dynamic_timeline_with_long_duration() {
        let detector = SignatureDetector::default();
        let sig = detector.detect(b"KStudio..Timeline..duration\x00\x04 12.5\x00");
        assert_eq!(
            sig,
            studio(Timeline::Dynamic {
                duration: Some(12.5)
            })
        );
        assert_eq!(
            sig.relative_dir(),
            PathBuf::from("KStudio/has_timeline/dynamic/movie_duration_gt_10s")
        );
    }

    #[test]
    fn test_lowercase_timeline_only_is_static() {
        let detector = SignatureDetector::default();
        let sig = detector.detect(b"KStudio timeline duration 30 KoiKatuChara");
        assert_eq!(sig, studio(Timeline::Static));
        assert_eq!(
            sig.relative_dir(),
            PathBuf::from("KStudio/has_timeline/static")
        );
    }

    #[test]
    fn test_capitalized_timeline_alone_is_dynamic() {
        let detector = SignatureDetector::default();
        assert_eq!(
            detector.detect(b"KStudio Timeline"),
            studio(Timeline::Dynamic { duration: None })
        );
    }

    #[test]
    fn test_no_timeline_marker_is_absent() {
        let detector = SignatureDetector::default();
        let sig = detector.detect(b"KStudio duration 99");
        assert_eq!(sig, studio(Timeline::Absent));
        assert_eq!(sig.relative_dir(), PathBuf::from("KStudio/no_timeline"));
    }

    #[test]
    fn test_duration_at_threshold_is_gif() {
        let detector = SignatureDetector::default();
        let sig = detector.detect(b"KStudio Timeline timeline duration:10.0;");
        assert_eq!(
            sig,
            studio(Timeline::Dynamic {
                duration: Some(10.0)
            })
        );
        assert_eq!(
            sig.relative_dir(),
            PathBuf::from("KStudio/has_timeline/dynamic/GIF_duration_elt_10s")
        );
    }

    #[test]
    fn test_dynamic_without_duration_stays_in_dynamic_dir() {
        let sig = studio(Timeline::Dynamic { duration: None });
        assert_eq!(
            sig.relative_dir(),
            PathBuf::from("KStudio/has_timeline/dynamic")
        );
    }

    #[test]
    fn test_only_first_duration_marker_is_used() {
        let detector = SignatureDetector::default();
        assert_eq!(
            detector.detect(b"KStudio Timeline duration=4 duration=40"),
            studio(Timeline::Dynamic {
                duration: Some(4.0)
            })
        );
    }

    #[test]
    fn test_duration_without_digits_is_unset() {
        let detector = SignatureDetector::default();
        assert_eq!(
            detector.detect(b"KStudio Timeline duration none"),
            studio(Timeline::Dynamic { duration: None })
        );
    }

    #[test]
    fn test_malformed_duration_is_unset() {
        let detector = SignatureDetector::default();
        assert_eq!(
            detector.detect(b"KStudio Timeline duration 1.2.3"),
            studio(Timeline::Dynamic { duration: None })
        );
    }

    #[test]
    fn test_superscript_stops_the_scan() {
        let detector = SignatureDetector::default();
        // The scan lands on the superscript two, which is not a decimal digit.
        assert_eq!(
            detector.detect("KStudio Timeline duration ² 12.5".as_bytes()),
            studio(Timeline::Dynamic { duration: None })
        );
        assert_eq!(
            detector.detect(b"KStudio Timeline duration \xc2\xb3 4"),
            studio(Timeline::Dynamic { duration: None })
        );
    }

    #[test]
    fn test_non_ascii_decimal_digits_parse() {
        let detector = SignatureDetector::default();
        let sig = detector.detect("KStudio Timeline duration ٣".as_bytes());
        assert_eq!(
            sig,
            studio(Timeline::Dynamic {
                duration: Some(3.0)
            })
        );
        assert_eq!(
            sig.relative_dir(),
            PathBuf::from("KStudio/has_timeline/dynamic/GIF_duration_elt_10s")
        );
        assert_eq!(parse_duration("duration \u{FF11}\u{FF12}.5"), Some(12.5));
        assert_eq!(parse_duration("duration \u{0967}\u{0966}"), Some(10.0));
    }

    #[test]
    fn test_decimal_value() {
        assert_eq!(decimal_value('7'), Some(7));
        assert_eq!(decimal_value('\u{0669}'), Some(9));
        assert_eq!(decimal_value('²'), None);
        assert_eq!(decimal_value('a'), None);
    }

    #[test]
    fn test_trailing_dot_duration_parses() {
        assert_eq!(parse_duration("duration 7."), Some(7.0));
    }

    #[test]
    fn test_invalid_utf8_is_dropped_not_replaced() {
        let detector = SignatureDetector::default();
        // The stray 0xFF between the digits disappears when decoding.
        assert_eq!(
            detector.detect(b"KStudio Timeline duration 1\xff5"),
            studio(Timeline::Dynamic {
                duration: Some(15.0)
            })
        );
        assert_eq!(
            detector.detect(b"\xfe\xffKoiKatu\xc3Clothes KoiKatuClothes"),
            CardSignature::Card(CardKind::KoiKatuClothes)
        );
    }

    #[test]
    fn test_studio_marker_overrides_other_markers() {
        let detector = SignatureDetector::default();
        assert_eq!(
            detector.detect(b"KoiKatuCharaSun KoiKatuClothes KStudio"),
            studio(Timeline::Absent)
        );
    }

    #[test]
    fn test_specific_variant_beats_base_name() {
        let detector = SignatureDetector::default();
        assert_eq!(
            detector.detect(b"KoiKatuChara KoiKatuCharaSun"),
            CardSignature::Card(CardKind::KoiKatuCharaSun)
        );
        assert_eq!(
            detector.detect(b"KoiKatuCharaSP"),
            CardSignature::Card(CardKind::KoiKatuCharaSP)
        );
        assert_eq!(
            detector.detect(b"KoiKatuCharaS"),
            CardSignature::Card(CardKind::KoiKatuCharaS)
        );
        assert_eq!(
            detector.detect(b"KoiKatuChara"),
            CardSignature::Card(CardKind::KoiKatuChara)
        );
    }

    #[test]
    fn test_character_beats_clothes() {
        let detector = SignatureDetector::default();
        assert_eq!(
            detector.detect(b"KoiKatuClothes KoiKatuChara"),
            CardSignature::Card(CardKind::KoiKatuChara)
        );
    }

    #[test]
    fn test_added_marker_has_lowest_priority() {
        let mut detector = SignatureDetector::default();
        assert!(detector.add_marker("AIS_Chara"));

        assert_eq!(
            detector.detect(b"AIS_Chara"),
            CardSignature::Card(CardKind::Other("AIS_Chara".to_string()))
        );
        assert_eq!(
            detector.detect(b"AIS_Chara KoiKatuClothes"),
            CardSignature::Card(CardKind::KoiKatuClothes)
        );
    }

    #[test]
    fn test_add_marker_rejects_duplicates_and_studio() {
        let mut detector = SignatureDetector::default();
        assert!(!detector.add_marker("KoiKatuChara"));
        assert!(!detector.add_marker(STUDIO_MARKER));
        assert!(!detector.add_marker(""));
        assert!(!detector.add_marker("../escape"));
        assert!(detector.add_marker("HCChara"));
        assert!(!detector.add_marker("HCChara"));
        assert_eq!(detector.markers().len(), 6);
    }

    #[test]
    fn test_card_dirs_use_marker_names() {
        assert_eq!(
            CardSignature::Card(CardKind::KoiKatuClothes).relative_dir(),
            PathBuf::from("KoiKatuClothes")
        );
        assert_eq!(
            CardSignature::Unknown.relative_dir(),
            PathBuf::from("Unknown_cards")
        );
    }

    #[test]
    fn test_label_uses_forward_slashes() {
        assert_eq!(
            studio(Timeline::Static).label(),
            "KStudio/has_timeline/static"
        );
        assert_eq!(CardSignature::Unknown.label(), "Unknown_cards");
    }
}

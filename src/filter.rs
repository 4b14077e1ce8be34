//! The fixed catalog of Christmas filters and the prompt built from them.
//!
//! Filters travel over the wire as plain string identifiers (`"snow"`,
//! `"santa"`, `"lights"`, `"frame"`). Inside the crate they are the
//! [`Filter`] enum; identifiers outside the catalog are tolerated on the
//! wire and simply contribute nothing to the prompt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Filter
// ============================================================================

/// One of the decorative effects a user can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    Snow,
    Santa,
    Lights,
    Frame,
}

impl Filter {
    /// Every filter, in catalog order.
    pub const ALL: [Filter; 4] = [Filter::Snow, Filter::Santa, Filter::Lights, Filter::Frame];

    /// Wire identifier.
    pub fn id(self) -> &'static str {
        match self {
            Filter::Snow => "snow",
            Filter::Santa => "santa",
            Filter::Lights => "lights",
            Filter::Frame => "frame",
        }
    }

    /// Looks up a filter by its wire identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.id() == id)
    }

    /// Display name shown on the filter card.
    pub fn name(self) -> &'static str {
        match self {
            Filter::Snow => "Snow",
            Filter::Santa => "Santa Hat",
            Filter::Lights => "Lights",
            Filter::Frame => "Frame",
        }
    }

    /// Card icon.
    pub fn icon(self) -> &'static str {
        match self {
            Filter::Snow => "❄️",
            Filter::Santa => "🎅",
            Filter::Lights => "✨",
            Filter::Frame => "🎄",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Filter::Snow => "Add falling snow",
            Filter::Santa => "Add Santa hat",
            Filter::Lights => "Add festive lights",
            Filter::Frame => "Christmas frame",
        }
    }

    /// The instruction phrase this filter contributes to an AI prompt.
    pub fn phrase(self) -> &'static str {
        match self {
            Filter::Snow => {
                "Add realistic falling snow, snowflakes, and winter atmosphere with snow on surfaces"
            }
            Filter::Santa => {
                "Add a festive red Santa hat with white fur trim on the main subject's head"
            }
            Filter::Lights => {
                "Add colorful twinkling Christmas lights, warm glowing string lights, and festive illumination"
            }
            Filter::Frame => {
                "Add an elegant Christmas-themed decorative border frame with holly leaves, red berries, pine branches, and ornaments"
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error for identifiers that are not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter `{0}` (expected one of snow, santa, lights, frame)")]
pub struct UnknownFilter(pub String);

impl FromStr for Filter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s.trim()).ok_or_else(|| UnknownFilter(s.to_string()))
    }
}

// ============================================================================
// Prompt
// ============================================================================

const PROMPT_PREFIX: &str = "Transform this photo with Christmas holiday theme: ";

const PROMPT_SUFFIX: &str = ". Maintain the original composition and subject while naturally blending festive Christmas elements. Make it look magical and festive with rich holiday colors and warm atmosphere.";

/// Prompt used when no identifier matches the catalog.
pub const FALLBACK_PROMPT: &str = "Add festive Christmas decorations, holiday atmosphere, warm lighting, and seasonal elements while keeping the original subject intact";

/// Builds the transformation prompt for a list of wire identifiers.
///
/// Phrases appear in list order; unknown identifiers are skipped. If nothing
/// matches, [`FALLBACK_PROMPT`] is returned.
pub fn generate_prompt<S: AsRef<str>>(filters: &[S]) -> String {
    let phrases: Vec<&str> = filters
        .iter()
        .filter_map(|id| Filter::from_id(id.as_ref()))
        .map(Filter::phrase)
        .collect();

    if phrases.is_empty() {
        return FALLBACK_PROMPT.to_string();
    }

    format!("{PROMPT_PREFIX}{}{PROMPT_SUFFIX}", phrases.join(", "))
}

/// Picks the caller's prompt when it has content, otherwise generates one.
pub fn resolve_prompt<S: AsRef<str>>(custom: Option<&str>, filters: &[S]) -> String {
    match custom.map(str::trim) {
        Some(prompt) if !prompt.is_empty() => prompt.to_string(),
        _ => generate_prompt(filters),
    }
}

// ============================================================================
// FilterSelection
// ============================================================================

/// The user's current set of filters, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSelection {
    filters: Vec<Filter>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the filter if absent, removes it if present.
    ///
    /// Returns true when the filter is selected after the call.
    pub fn toggle(&mut self, filter: Filter) -> bool {
        if let Some(pos) = self.filters.iter().position(|f| *f == filter) {
            self.filters.remove(pos);
            false
        } else {
            self.filters.push(filter);
            true
        }
    }

    pub fn contains(&self, filter: Filter) -> bool {
        self.filters.contains(&filter)
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Filter> + '_ {
        self.filters.iter().copied()
    }

    /// Wire identifiers in selection order.
    pub fn ids(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.id().to_string()).collect()
    }
}

impl FromIterator<Filter> for FilterSelection {
    fn from_iter<T: IntoIterator<Item = Filter>>(iter: T) -> Self {
        let mut selection = Self::new();
        for filter in iter {
            if !selection.contains(filter) {
                selection.filters.push(filter);
            }
        }
        selection
    }
}

// ============================================================================
// Tests
// ============================================================================

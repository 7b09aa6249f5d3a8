//! Sort mode vocabulary and its mapping to listing parameters.
//!
//! | Mode    | Listing | Time filter |
//! |---------|---------|-------------|
//! | `hot`   | `hot`   | none        |
//! | `new`   | `new`   | none        |
//! | `week`  | `top`   | `week`      |
//! | `month` | `top`   | `month`     |
//! | `year`  | `top`   | `year`      |

use std::fmt;
use std::str::FromStr;

use crate::error::IngestError;

/// Accepted external sort strings, in display order.
pub const SORT_VOCABULARY: [&str; 5] = ["hot", "new", "week", "month", "year"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortMode {
    Hot,
    TopWeek,
    TopMonth,
    TopYear,
    New,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Hot => "hot",
            SortMode::New => "new",
            SortMode::TopWeek => "week",
            SortMode::TopMonth => "month",
            SortMode::TopYear => "year",
        }
    }

    /// Resolve to concrete listing parameters for `requested` items.
    ///
    /// The listing limit is `requested * overfetch` so that pinned items
    /// skipped during filtering do not starve the result.
    pub fn resolve(&self, requested: usize, overfetch: usize) -> ListingQuery {
        let (listing, time_filter) = match self {
            SortMode::Hot => (Listing::Hot, None),
            SortMode::New => (Listing::New, None),
            SortMode::TopWeek => (Listing::Top, Some("week")),
            SortMode::TopMonth => (Listing::Top, Some("month")),
            SortMode::TopYear => (Listing::Top, Some("year")),
        };
        ListingQuery {
            listing,
            time_filter,
            limit: requested.saturating_mul(overfetch.max(1)),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(SortMode::Hot),
            "new" => Ok(SortMode::New),
            "week" => Ok(SortMode::TopWeek),
            "month" => Ok(SortMode::TopMonth),
            "year" => Ok(SortMode::TopYear),
            other => Err(IngestError::Validation(format!(
                "Invalid sort option '{}'. Choose from: {}",
                other,
                SORT_VOCABULARY.join(", ")
            ))),
        }
    }
}

/// Listing endpoint of a subreddit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Hot,
    Top,
    New,
}

impl Listing {
    pub fn path(&self) -> &'static str {
        match self {
            Listing::Hot => "hot",
            Listing::Top => "top",
            Listing::New => "new",
        }
    }
}

/// Fully resolved parameters for one listing read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub listing: Listing,
    pub time_filter: Option<&'static str>,
    /// Maximum number of items to pull from the listing.
    pub limit: usize,
}

/// Site registry and geospatial resolver for the Irish coastal monitoring network.
///
/// Defines the canonical list of named coastal sites this service aggregates
/// against, along with the nearest-site resolver that assigns every satellite
/// observation to exactly one site. This is the single source of truth for
/// site ids — all other modules should reference sites from here rather than
/// hardcoding ids.

// ---------------------------------------------------------------------------
// Sentinel
// ---------------------------------------------------------------------------

/// Sentinel id/name assigned when an observation is not within
/// `MATCH_THRESHOLD_DEGREES` of any registered site.
pub const OPEN_WATER_ID: &str = "S999";
pub const OPEN_WATER_NAME: &str = "Open Water";

/// Maximum nearest-site distance, in degrees, for a named assignment.
/// Roughly 50 km at Irish latitudes — acceptable in degree space because the
/// monitored region spans only a few degrees.
pub const MATCH_THRESHOLD_DEGREES: f64 = 0.5;

// ---------------------------------------------------------------------------
// Site metadata
// ---------------------------------------------------------------------------

/// Metadata for a single named coastal monitoring site.
pub struct Site {
    /// Stable site id, "S" + 3 digits.
    pub id: &'static str,
    /// Curated site name. The HAEDAT event log uses free-text variants of
    /// these names; only the event matcher compares them, and it does so
    /// fuzzily.
    pub name: &'static str,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
}

/// All registered monitoring sites, ordered roughly west coast north-to-south
/// then east coast. Registry order is also the resolver tie-break: when two
/// sites are exactly equidistant from a point, the first entry wins.
pub static SITE_REGISTRY: &[Site] = &[
    Site {
        id: "S001",
        name: "Galway Bay",
        latitude: 53.27,
        longitude: -9.06,
    },
    Site {
        id: "S002",
        name: "Cork Harbor",
        latitude: 51.85,
        longitude: -8.29,
    },
    Site {
        id: "S003",
        name: "Dublin Bay",
        latitude: 53.35,
        longitude: -6.26,
    },
    Site {
        id: "S004",
        name: "Bantry Bay",
        latitude: 51.68,
        longitude: -9.47,
    },
    Site {
        id: "S005",
        name: "Carlingford Lough",
        latitude: 54.04,
        longitude: -6.19,
    },
    Site {
        id: "S006",
        name: "Killary Harbor",
        latitude: 53.61,
        longitude: -9.75,
    },
    Site {
        id: "S007",
        name: "Roaringwater Bay",
        latitude: 51.53,
        longitude: -9.38,
    },
    Site {
        id: "S008",
        name: "Castletownbere",
        latitude: 51.65,
        longitude: -9.91,
    },
];

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves an observation point to the nearest registered site, or to the
/// open-water sentinel when nothing is within `MATCH_THRESHOLD_DEGREES`.
///
/// Distance is Euclidean in degree space, not great-circle — at this regional
/// scale the error is negligible and it keeps the resolver a pure arithmetic
/// scan. The registry has a handful of entries, so a linear scan per point is
/// fine even for full-batch enrichment of thousands of observations.
pub fn resolve(latitude: f64, longitude: f64) -> (&'static str, &'static str) {
    let mut best: Option<(&'static Site, f64)> = None;
    for site in SITE_REGISTRY {
        let d_lat = latitude - site.latitude;
        let d_lon = longitude - site.longitude;
        let dist = (d_lat * d_lat + d_lon * d_lon).sqrt();
        // Strict < keeps the first registry entry on exact ties.
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((site, dist)),
        }
    }
    match best {
        Some((site, dist)) if dist < MATCH_THRESHOLD_DEGREES => (site.id, site.name),
        _ => (OPEN_WATER_ID, OPEN_WATER_NAME),
    }
}

/// Looks up a site by id. Returns `None` for unknown ids (including the
/// open-water sentinel, which is not a registered site).
pub fn find_site(id: &str) -> Option<&'static Site> {
    SITE_REGISTRY.iter().find(|s| s.id == id)
}

/// Returns the curated names of all registered sites.
pub fn all_site_names() -> Vec<&'static str> {
    SITE_REGISTRY.iter().map(|s| s.name).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Snapshot ingestion for the HAB monitoring service.
///
/// The service is fed by two flat tabular snapshots written out-of-band:
/// the enriched measurement table from the satellite pipeline and the HAEDAT
/// historical event export. Both are read once at startup; re-ingestion is a
/// full reload.
///
/// Submodules:
/// - `snapshot` — CSV parsing for both tables, with row-level drop semantics.

pub mod snapshot;

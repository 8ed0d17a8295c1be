//! # Vitrina
//!
//! A content pipeline for digital exhibit sites. Curators author content as
//! CSV spreadsheets and markdown fragments; vitrina validates it,
//! cross-links it, and materializes the JSON collections, per-entity
//! documents, and IIIF manifests a static-site renderer consumes.
//!
//! # Architecture: A Stage Graph
//!
//! The build runs as independent stages that hand data to each other
//! through the files they write:
//!
//! ```text
//! project.csv   →  project    →  _data/project.json
//! objects.csv   →  catalog    →  _data/objects.json
//! glossary.csv  →  glossary   →  _data/glossary.json
//! story-N.csv   →  stories    →  _data/story-N.json      (needs catalog)
//!                  collections→  _collections/…           (needs data)
//!                  manifests  →  iiif/objects/*/manifest.json
//! ```
//!
//! Stages declare the artifacts they consume and produce, and
//! [`pipeline`] computes execution order from those declarations. This
//! keeps the one real ordering constraint — story reference validation
//! needs the catalog materialized first — structural rather than an
//! accident of call order. Since the interchange format is plain JSON on
//! disk, any subset of stages can run alone against a previous build's
//! output, and every intermediate is inspectable.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`tabular`] | CSV loading: comment stripping, malformed-row skipping, ordered rows |
//! | [`transform`] | Per-artifact row transformers: project, catalog, glossary, story |
//! | [`markdown`] | Fragment resolution: front-matter split, title extraction, HTML rendering |
//! | [`remote`] | Advisory IIIF manifest validation over HTTP (HEAD + GET state machine) |
//! | [`collections`] | Materialization: JSON data documents and per-entity collection files |
//! | [`iiif`] | IIIF Presentation v3 manifest writer for tiled objects |
//! | [`pipeline`] | Stage graph, execution order, and the check mode |
//! | [`config`] | `vitrina.toml` loading plus the shared string sentinels |
//! | [`types`] | Ordered row records and the structured warning types |
//! | [`output`] | CLI output formatting for stage reports |
//!
//! # Design Decisions
//!
//! ## Warnings, Not Errors
//!
//! The authors of the input are curators, not engineers, and a museum
//! exhibit should never fail to build because one remote server had a bad
//! afternoon. Every content problem — a missing object reference, an
//! unreachable IIIF manifest, a typo'd panel filename — becomes a warning
//! that travels *with the data* (`object_warning` columns, the story
//! `_metadata` element, visible callouts) so it surfaces in the rendered
//! site where the curator will actually see it. Only real I/O failures
//! while writing output abort the run.
//!
//! ## Ordered Rows, Deterministic Output
//!
//! Rows preserve spreadsheet column order end to end ([`types::Row`] is an
//! ordered map, and `serde_json` runs with `preserve_order`). Two builds
//! over unchanged input produce byte-identical output, which keeps the
//! generated files diffable in version control — the curator's actual
//! review workflow.
//!
//! ## Blocking HTTP
//!
//! Remote validation uses `reqwest`'s blocking client. The pipeline is a
//! short-lived batch CLI checking a handful of URLs sequentially; an async
//! runtime would add a dependency tree and an `.await` ceremony for no
//! measurable gain. Validation sits behind the [`remote::RemoteValidator`]
//! trait, so tests (and `validate = false` builds) never touch the
//! network.

pub mod collections;
pub mod config;
pub mod iiif;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod remote;
pub mod tabular;
pub mod transform;
pub mod types;

//! Catalog (object) record transformation.
//!
//! Each row describes one exhibit artifact. The rules run in a fixed order
//! because later rules depend on earlier results (the image-source check
//! reads the manifest column *after* validation may have cleared it):
//!
//! 1. Drop the instruction column, drop rows with an empty `object_id`.
//! 2. Normalize the key: strip a trailing image extension, reject keys with
//!    whitespace or path characters (key left unmodified, warning attached).
//! 3. Normalize the thumbnail: clear placeholder tokens and unrecognized
//!    extensions, collapse duplicate separators, warn on a missing file.
//! 4. Validate `iiif_manifest` against the remote validator; clear the
//!    reference when the state machine says so.
//! 5. Require a usable image source: a reachable manifest or a local image
//!    matching the key — otherwise the record carries the long-form
//!    "no image source" warning.
//!
//! Failures never drop a record (beyond the empty-key rule) and never abort
//! the run: `object_warning` / `object_warning_short` carry the outcome to
//! the renderer. The first failing rule wins those columns; later rules
//! never overwrite an existing warning.

use crate::config::{IMAGE_EXTENSIONS, PLACEHOLDER_TOKENS};
use crate::remote::RemoteValidator;
use crate::tabular::{drop_instruction_column, drop_rows_with_empty_key};
use crate::types::{Row, filesystem_safe};
use std::path::{Path, PathBuf};

pub const KEY_COLUMN: &str = "object_id";
pub const THUMBNAIL_COLUMN: &str = "thumbnail";
pub const MANIFEST_COLUMN: &str = "iiif_manifest";
pub const WARNING_COLUMN: &str = "object_warning";
pub const WARNING_SHORT_COLUMN: &str = "object_warning_short";

pub struct CatalogContext<'a> {
    /// Project root; thumbnails are site-absolute paths under it.
    pub root: &'a Path,
    /// Directory holding local object images named after their key.
    pub images_dir: &'a Path,
    pub validator: &'a dyn RemoteValidator,
}

#[derive(Debug, Default)]
pub struct CatalogOutcome {
    pub rows: Vec<Row>,
    pub diagnostics: Vec<String>,
}

pub fn transform(rows: Vec<Row>, ctx: &CatalogContext) -> CatalogOutcome {
    let rows = drop_rows_with_empty_key(drop_instruction_column(rows), KEY_COLUMN);

    let mut outcome = CatalogOutcome::default();
    for row in rows {
        let (row, diagnostics) = transform_row(row, ctx);
        outcome.rows.push(row);
        outcome.diagnostics.extend(diagnostics);
    }
    outcome
}

/// Run all per-row rules in order, collecting diagnostics along the way.
fn transform_row(row: Row, ctx: &CatalogContext) -> (Row, Vec<String>) {
    let mut diagnostics = Vec::new();
    let mut row = ensure_warning_columns(row);

    for rule in [
        normalize_key,
        normalize_thumbnail,
        validate_manifest,
        ensure_image_source,
    ] {
        let (next, mut emitted) = rule(row, ctx);
        row = next;
        diagnostics.append(&mut emitted);
    }
    (row, diagnostics)
}

/// Warning columns are part of the output schema even for clean records.
fn ensure_warning_columns(mut row: Row) -> Row {
    if !row.contains(WARNING_COLUMN) {
        row.set(WARNING_COLUMN, "");
    }
    if !row.contains(WARNING_SHORT_COLUMN) {
        row.set(WARNING_SHORT_COLUMN, "");
    }
    row
}

fn set_warning_if_unset(row: &mut Row, short: &str, long: &str) {
    if row.value(WARNING_COLUMN).is_empty() && row.value(WARNING_SHORT_COLUMN).is_empty() {
        row.set(WARNING_COLUMN, long);
        row.set(WARNING_SHORT_COLUMN, short);
    }
}

/// Strip a trailing image extension from the key (with a diagnostic), then
/// reject keys that cannot serve as lookup keys and filenames. Rejected keys
/// are left unmodified — guessing a fix would silently change every
/// cross-reference pointing at them.
fn normalize_key(mut row: Row, _ctx: &CatalogContext) -> (Row, Vec<String>) {
    let mut diagnostics = Vec::new();
    let id = row.value(KEY_COLUMN).trim().to_string();

    let id = match strip_image_extension(&id) {
        Some(base) => {
            diagnostics.push(format!(
                "object \"{id}\": object_id had an image extension; using \"{base}\""
            ));
            base.to_string()
        }
        None => id,
    };
    row.set(KEY_COLUMN, id.as_str());

    if let Some(reason) = invalid_key_reason(&id) {
        diagnostics.push(format!("object \"{id}\": invalid object_id ({reason})"));
        set_warning_if_unset(
            &mut row,
            "Invalid object ID",
            &format!(
                "The object ID \"{id}\" {reason}. IDs are used as lookup keys and filenames, so they must be a single word without path characters."
            ),
        );
    }
    (row, diagnostics)
}

fn invalid_key_reason(id: &str) -> Option<&'static str> {
    if id.chars().any(char::is_whitespace) {
        Some("contains whitespace")
    } else if !filesystem_safe(id) {
        Some("contains path characters")
    } else {
        None
    }
}

/// Trailing recognized image extension, if any, split off the key.
fn strip_image_extension(id: &str) -> Option<&str> {
    let (base, ext) = id.rsplit_once('.')?;
    if base.is_empty() {
        return None;
    }
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
        .then_some(base)
}

/// Thumbnail cleanup: placeholders and unrecognized extensions are cleared
/// (empty means "derive from the object image"); duplicate separators in
/// site-absolute values are collapsed; a missing file is only warned about
/// because the image may be generated by a later tiling step.
fn normalize_thumbnail(mut row: Row, ctx: &CatalogContext) -> (Row, Vec<String>) {
    let mut diagnostics = Vec::new();
    let id = row.value(KEY_COLUMN).to_string();
    let value = row.value(THUMBNAIL_COLUMN).trim().to_string();

    if value.is_empty() {
        return (row, diagnostics);
    }

    if PLACEHOLDER_TOKENS
        .iter()
        .any(|token| value.eq_ignore_ascii_case(token))
    {
        diagnostics.push(format!(
            "object \"{id}\": thumbnail placeholder \"{value}\" cleared"
        ));
        row.set(THUMBNAIL_COLUMN, "");
        return (row, diagnostics);
    }

    if !has_recognized_extension(&value) {
        diagnostics.push(format!(
            "object \"{id}\": thumbnail \"{value}\" has no recognized image extension; cleared"
        ));
        row.set(THUMBNAIL_COLUMN, "");
        return (row, diagnostics);
    }

    let value = if value.starts_with('/') {
        collapse_separators(&value)
    } else {
        value
    };
    row.set(THUMBNAIL_COLUMN, value.as_str());

    let on_disk = ctx.root.join(value.trim_start_matches('/'));
    if !on_disk.is_file() {
        diagnostics.push(format!(
            "object \"{id}\": thumbnail \"{value}\" not found on disk (kept)"
        ));
    }
    (row, diagnostics)
}

fn has_recognized_extension(value: &str) -> bool {
    Path::new(value)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Collapse runs of `/` into one: `/a//b.png` → `/a/b.png`.
fn collapse_separators(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_was_sep = false;
    for c in value.chars() {
        if c == '/' {
            if !last_was_sep {
                out.push(c);
            }
            last_was_sep = true;
        } else {
            out.push(c);
            last_was_sep = false;
        }
    }
    out
}

/// Run the manifest reference through the remote validator, writing the
/// warning columns and clearing the reference when the outcome demands it.
fn validate_manifest(mut row: Row, ctx: &CatalogContext) -> (Row, Vec<String>) {
    let mut diagnostics = Vec::new();
    let reference = row.value(MANIFEST_COLUMN).trim().to_string();
    row.set(MANIFEST_COLUMN, reference.as_str());

    let check = ctx.validator.validate(&reference);
    if check.passed() {
        return (row, diagnostics);
    }

    let id = row.value(KEY_COLUMN).to_string();
    diagnostics.push(format!("object \"{id}\": {}", check.short));
    if check.clears_reference() {
        row.set(MANIFEST_COLUMN, "");
    }
    set_warning_if_unset(&mut row, &check.short, &check.long);
    (row, diagnostics)
}

/// Every record must end up with *some* way to show an image: a manifest
/// reference that survived validation, or a local image named after the key.
fn ensure_image_source(mut row: Row, ctx: &CatalogContext) -> (Row, Vec<String>) {
    let mut diagnostics = Vec::new();
    let id = row.value(KEY_COLUMN).to_string();

    let has_manifest = !row.value(MANIFEST_COLUMN).is_empty();
    if has_manifest || local_image_for(ctx.images_dir, &id).is_some() {
        return (row, diagnostics);
    }

    diagnostics.push(format!("object \"{id}\": no image source"));
    set_warning_if_unset(
        &mut row,
        "No image source",
        &format!(
            "This object has no usable image source. Add an image named \"{id}\" (jpg, jpeg, png, tif, or tiff) to the object images folder, or provide a IIIF manifest URL."
        ),
    );
    (row, diagnostics)
}

/// First local image matching the key, probing extensions in fixed order.
/// First match wins; additional matches are never flagged.
pub fn local_image_for(images_dir: &Path, id: &str) -> Option<PathBuf> {
    IMAGE_EXTENSIONS.iter().find_map(|ext| {
        let candidate = images_dir.join(format!("{id}.{ext}"));
        candidate.is_file().then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{ManifestCheck, ManifestStatus, SkipValidator, status_warning};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Programmable validator: URL → canned check, anything else passes.
    struct StubValidator {
        responses: HashMap<String, ManifestCheck>,
    }

    impl StubValidator {
        fn with(url: &str, check: ManifestCheck) -> Self {
            let mut responses = HashMap::new();
            responses.insert(url.to_string(), check);
            Self { responses }
        }
    }

    impl RemoteValidator for StubValidator {
        fn validate(&self, reference: &str) -> ManifestCheck {
            if let Some(check) = self.responses.get(reference) {
                return check.clone();
            }
            SkipValidator.validate(reference)
        }
    }

    fn http_error(code: u16, url: &str) -> ManifestCheck {
        let (short, long) = status_warning(code, url);
        ManifestCheck {
            status: ManifestStatus::HttpError(code),
            short,
            long,
        }
    }

    struct Fixture {
        tmp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            fs::create_dir_all(tmp.path().join("images/objects")).unwrap();
            Self { tmp }
        }

        fn add_image(&self, name: &str) {
            fs::write(self.tmp.path().join("images/objects").join(name), "img").unwrap();
        }

        fn images_dir(&self) -> PathBuf {
            self.tmp.path().join("images/objects")
        }

        fn transform_with(&self, rows: Vec<Row>, validator: &dyn RemoteValidator) -> CatalogOutcome {
            let ctx = CatalogContext {
                root: self.tmp.path(),
                images_dir: &self.images_dir(),
                validator,
            };
            transform(rows, &ctx)
        }

        fn transform(&self, rows: Vec<Row>) -> CatalogOutcome {
            self.transform_with(rows, &SkipValidator)
        }
    }

    fn object_row(id: &str) -> Row {
        Row::from_pairs([
            ("object_id", id),
            ("title", "A thing"),
            ("thumbnail", ""),
            ("iiif_manifest", ""),
        ])
    }

    #[test]
    fn empty_keys_dropped_before_rules() {
        let fx = Fixture::new();
        let outcome = fx.transform(vec![object_row(""), object_row("vase")]);
        assert_eq!(outcome.rows.len(), 1);
    }

    #[test]
    fn trailing_extension_stripped_with_diagnostic() {
        let fx = Fixture::new();
        fx.add_image("photo.jpg");
        let outcome = fx.transform(vec![object_row("photo.jpg")]);
        assert_eq!(outcome.rows[0].value("object_id"), "photo");
        assert!(outcome.diagnostics.iter().any(|d| d.contains("image extension")));
        // Normalized key still resolves the local image.
        assert_eq!(outcome.rows[0].value("object_warning"), "");
    }

    #[test]
    fn whitespace_key_rejected_not_fixed() {
        let fx = Fixture::new();
        let outcome = fx.transform(vec![object_row("obj 1")]);
        let row = &outcome.rows[0];
        assert_eq!(row.value("object_id"), "obj 1");
        assert_eq!(row.value("object_warning_short"), "Invalid object ID");
        assert!(row.value("object_warning").contains("obj 1"));
    }

    #[test]
    fn path_characters_in_key_rejected() {
        let fx = Fixture::new();
        let outcome = fx.transform(vec![object_row("../escape")]);
        assert_eq!(outcome.rows[0].value("object_warning_short"), "Invalid object ID");
    }

    #[test]
    fn placeholder_thumbnail_cleared() {
        let fx = Fixture::new();
        fx.add_image("vase.jpg");
        let mut row = object_row("vase");
        row.set("thumbnail", "n/a");
        let outcome = fx.transform(vec![row]);
        assert_eq!(outcome.rows[0].value("thumbnail"), "");
        assert!(outcome.diagnostics.iter().any(|d| d.contains("placeholder")));
    }

    #[test]
    fn placeholder_matching_is_case_insensitive() {
        let fx = Fixture::new();
        fx.add_image("vase.jpg");
        let mut row = object_row("vase");
        row.set("thumbnail", "N/A");
        let outcome = fx.transform(vec![row]);
        assert_eq!(outcome.rows[0].value("thumbnail"), "");
    }

    #[test]
    fn unrecognized_thumbnail_extension_cleared() {
        let fx = Fixture::new();
        fx.add_image("vase.jpg");
        let mut row = object_row("vase");
        row.set("thumbnail", "/thumbs/vase.pdf");
        let outcome = fx.transform(vec![row]);
        assert_eq!(outcome.rows[0].value("thumbnail"), "");
    }

    #[test]
    fn absolute_thumbnail_separators_collapsed() {
        let fx = Fixture::new();
        fx.add_image("vase.jpg");
        let mut row = object_row("vase");
        row.set("thumbnail", "/a//b.png");
        let outcome = fx.transform(vec![row]);
        assert_eq!(outcome.rows[0].value("thumbnail"), "/a/b.png");
    }

    #[test]
    fn missing_thumbnail_file_warned_but_kept() {
        let fx = Fixture::new();
        fx.add_image("vase.jpg");
        let mut row = object_row("vase");
        row.set("thumbnail", "/thumbs/vase.png");
        let outcome = fx.transform(vec![row]);
        assert_eq!(outcome.rows[0].value("thumbnail"), "/thumbs/vase.png");
        assert!(outcome.diagnostics.iter().any(|d| d.contains("not found on disk")));
    }

    #[test]
    fn manifest_404_sets_short_warning_and_clears_reference() {
        let fx = Fixture::new();
        fx.add_image("vase.jpg");
        let url = "https://iiif.example.org/vase/manifest.json";
        let mut row = object_row("vase");
        row.set("iiif_manifest", url);
        let outcome = fx.transform_with(vec![row], &StubValidator::with(url, http_error(404, url)));
        let row = &outcome.rows[0];
        assert_eq!(row.value("object_warning_short"), "Error 404: manifest not found");
        assert_eq!(row.value("iiif_manifest"), "");
    }

    #[test]
    fn wrong_content_type_warns_but_keeps_reference() {
        let fx = Fixture::new();
        fx.add_image("vase.jpg");
        let url = "https://iiif.example.org/vase/manifest.json";
        let check = ManifestCheck {
            status: ManifestStatus::WrongContentType,
            short: "Manifest may not be JSON".into(),
            long: "The server reports text/html.".into(),
        };
        let mut row = object_row("vase");
        row.set("iiif_manifest", url);
        let outcome = fx.transform_with(vec![row], &StubValidator::with(url, check));
        let row = &outcome.rows[0];
        assert_eq!(row.value("iiif_manifest"), url);
        assert_eq!(row.value("object_warning_short"), "Manifest may not be JSON");
    }

    #[test]
    fn no_image_source_sets_long_warning() {
        let fx = Fixture::new();
        let outcome = fx.transform(vec![object_row("ghost")]);
        let row = &outcome.rows[0];
        assert_eq!(row.value("object_warning_short"), "No image source");
        assert!(row.value("object_warning").contains("ghost"));
    }

    #[test]
    fn local_image_satisfies_image_source() {
        let fx = Fixture::new();
        fx.add_image("vase.png");
        let outcome = fx.transform(vec![object_row("vase")]);
        assert_eq!(outcome.rows[0].value("object_warning"), "");
    }

    #[test]
    fn cleared_manifest_falls_back_to_local_image() {
        let fx = Fixture::new();
        fx.add_image("vase.jpg");
        let url = "https://iiif.example.org/gone/manifest.json";
        let mut row = object_row("vase");
        row.set("iiif_manifest", url);
        let outcome = fx.transform_with(vec![row], &StubValidator::with(url, http_error(404, url)));
        // 404 warning stays (first failure wins); no "no image source" overwrite.
        assert_eq!(
            outcome.rows[0].value("object_warning_short"),
            "Error 404: manifest not found"
        );
    }

    #[test]
    fn first_matching_extension_wins() {
        let fx = Fixture::new();
        fx.add_image("vase.png");
        fx.add_image("vase.jpg");
        let found = local_image_for(&fx.images_dir(), "vase").unwrap();
        assert!(found.to_string_lossy().ends_with("vase.jpg"));
    }

    #[test]
    fn warning_columns_present_on_clean_records() {
        let fx = Fixture::new();
        fx.add_image("vase.jpg");
        let outcome = fx.transform(vec![Row::from_pairs([("object_id", "vase")])]);
        let row = &outcome.rows[0];
        assert!(row.contains("object_warning"));
        assert!(row.contains("object_warning_short"));
    }
}

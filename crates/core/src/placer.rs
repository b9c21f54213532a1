use crate::config::CollisionPolicy;
use crate::error::OrganizeError;
use crate::models::{NormalizedLocation, PlaceOutcome, Placement, UNKNOWN};
use sha2::{Digest, Sha256};
use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

const MAX_RENAME_ATTEMPTS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Move,
    Copy,
    /// Report the target without touching the filesystem.
    DryRun,
}

/// Turns a canonical name into a single safe path component.
///
/// Path separators, characters Windows rejects, and control characters are
/// stripped; trailing dots and spaces go too. Anything that ends up empty or
/// as a relative-directory name becomes [`UNKNOWN`].
pub fn sanitize_component(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|&ch| {
            !ch.is_control()
                && !matches!(ch, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*')
        })
        .collect();

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_end_matches(['.', ' ']).trim();

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn destination_dir(root: &Path, location: &NormalizedLocation) -> PathBuf {
    root.join(sanitize_component(&location.continent))
        .join(sanitize_component(&location.country))
        .join(sanitize_component(&location.city))
}

pub fn plan_placement(
    root: &Path,
    location: &NormalizedLocation,
    file_name: impl AsRef<OsStr>,
) -> Placement {
    Placement {
        directory: destination_dir(root, location),
        file_name: file_name.as_ref().to_os_string(),
    }
}

/// Moves or copies `source` into `placement` without ever overwriting.
///
/// A same-named file with identical content counts as already placed and the
/// source is left alone. A same-named file with different content is resolved
/// by `collision`: `Rename` picks `stem (n).ext`, `Refuse` reports and stops.
pub fn place_file(
    source: &Path,
    placement: &Placement,
    collision: CollisionPolicy,
    transfer: Transfer,
) -> Result<PlaceOutcome, OrganizeError> {
    let target = match resolve_target(source, placement, collision)? {
        Resolved::Free(target) => target,
        Resolved::Done(outcome) => return Ok(outcome),
    };

    match transfer {
        Transfer::DryRun => Ok(PlaceOutcome::Planned(target)),
        Transfer::Copy => {
            ensure_dir(&placement.directory)?;
            copy_new(source, &target).map_err(|source| OrganizeError::Placement {
                path: target.clone(),
                source,
            })?;
            Ok(PlaceOutcome::Copied(target))
        }
        Transfer::Move => {
            ensure_dir(&placement.directory)?;
            move_file(source, &target).map_err(|source| OrganizeError::Placement {
                path: target.clone(),
                source,
            })?;
            Ok(PlaceOutcome::Moved(target))
        }
    }
}

enum Resolved {
    Free(PathBuf),
    Done(PlaceOutcome),
}

fn resolve_target(
    source: &Path,
    placement: &Placement,
    collision: CollisionPolicy,
) -> Result<Resolved, OrganizeError> {
    let target = placement.target();
    if !target.exists() {
        return Ok(Resolved::Free(target));
    }
    if same_content(source, &target)? {
        return Ok(Resolved::Done(PlaceOutcome::AlreadyPresent(target)));
    }
    if collision == CollisionPolicy::Refuse {
        return Ok(Resolved::Done(PlaceOutcome::Refused(target)));
    }

    let (stem, extension) = split_file_name(&placement.file_name);
    for attempt in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = placement
            .directory
            .join(numbered_name(stem, attempt, extension));
        if !candidate.exists() {
            return Ok(Resolved::Free(candidate));
        }
        if same_content(source, &candidate)? {
            return Ok(Resolved::Done(PlaceOutcome::AlreadyPresent(candidate)));
        }
    }

    Err(OrganizeError::Placement {
        path: target,
        source: io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free name after {MAX_RENAME_ATTEMPTS} attempts"),
        ),
    })
}

/// Splits into stem and extension without touching the name's bytes;
/// `.hidden` and `noext` have no extension.
fn split_file_name(file_name: &OsStr) -> (&OsStr, Option<&OsStr>) {
    let path = Path::new(file_name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), extension) => (stem, extension),
        (None, _) => (file_name, None),
    }
}

fn numbered_name(stem: &OsStr, attempt: u32, extension: Option<&OsStr>) -> OsString {
    let mut name = stem.to_os_string();
    name.push(format!(" ({attempt})"));
    if let Some(extension) = extension {
        name.push(".");
        name.push(extension);
    }
    name
}

fn ensure_dir(directory: &Path) -> Result<(), OrganizeError> {
    fs::create_dir_all(directory).map_err(|source| OrganizeError::Placement {
        path: directory.to_path_buf(),
        source,
    })
}

/// Links the source under the new name, then unlinks the old one. `rename`
/// would silently replace a target created after the free-name check; a hard
/// link fails with `AlreadyExists` instead. Where linking is not possible
/// (another filesystem) the copy goes through `create_new`, which fails the
/// same way. If the source cannot be removed the new name is deleted again.
fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    match fs::hard_link(source, target) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => return Err(error),
        Err(_) => copy_new(source, target)?,
    }

    if let Err(error) = fs::remove_file(source) {
        let _ = fs::remove_file(target);
        return Err(error);
    }
    Ok(())
}

/// Copies into a file that must not exist yet; a failed copy leaves nothing behind.
fn copy_new(source: &Path, target: &Path) -> io::Result<()> {
    let mut reader = File::open(source)?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(target)?;

    let copied = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all());
    if let Err(error) = copied {
        drop(writer);
        let _ = fs::remove_file(target);
        return Err(error);
    }
    Ok(())
}

pub fn digest_file(path: &Path) -> Result<String, OrganizeError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn same_content(left: &Path, right: &Path) -> Result<bool, OrganizeError> {
    if left.canonicalize()? == right.canonicalize()? {
        return Ok(true);
    }
    if fs::metadata(left)?.len() != fs::metadata(right)?.len() {
        return Ok(false);
    }
    Ok(digest_file(left)? == digest_file(right)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn brazil() -> NormalizedLocation {
        NormalizedLocation {
            continent: "South America".to_string(),
            country: "Brazil".to_string(),
            city: "Rio de Janeiro".to_string(),
        }
    }

    #[test]
    fn components_are_sanitized() {
        assert_eq!(sanitize_component("Bosnia/Herzegovina"), "BosniaHerzegovina");
        assert_eq!(sanitize_component("a\\b:c*d?"), "abcd");
        assert_eq!(sanitize_component(".."), UNKNOWN);
        assert_eq!(sanitize_component("  "), UNKNOWN);
        assert_eq!(sanitize_component("St. Louis."), "St. Louis");
        assert_eq!(sanitize_component("Rio de Janeiro"), "Rio de Janeiro");
    }

    #[test]
    fn destination_follows_continent_country_city() {
        let dir = destination_dir(Path::new("/dest"), &brazil());
        assert_eq!(dir, Path::new("/dest/South America/Brazil/Rio de Janeiro"));
    }

    #[test]
    fn move_creates_directories_and_removes_source() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let source = dir.path().join("rio.pdf");
        fs::write(&source, b"carnival")?;

        let placement = plan_placement(&dir.path().join("dest"), &brazil(), "rio.pdf");
        let outcome = place_file(&source, &placement, CollisionPolicy::Rename, Transfer::Move)?;

        let expected = dir.path().join("dest/South America/Brazil/Rio de Janeiro/rio.pdf");
        assert_eq!(outcome, PlaceOutcome::Moved(expected.clone()));
        assert!(!source.exists());
        assert_eq!(fs::read(expected)?, b"carnival");
        Ok(())
    }

    #[test]
    fn identical_file_is_already_present() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let source = dir.path().join("rio.pdf");
        fs::write(&source, b"carnival")?;
        let placement = plan_placement(&dir.path().join("dest"), &brazil(), "rio.pdf");
        fs::create_dir_all(&placement.directory)?;
        fs::write(placement.target(), b"carnival")?;

        let outcome = place_file(&source, &placement, CollisionPolicy::Rename, Transfer::Move)?;

        assert_eq!(outcome, PlaceOutcome::AlreadyPresent(placement.target()));
        assert!(source.exists());
        Ok(())
    }

    #[test]
    fn different_file_is_renamed_with_counter() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let source = dir.path().join("rio.pdf");
        fs::write(&source, b"new trip")?;
        let placement = plan_placement(&dir.path().join("dest"), &brazil(), "rio.pdf");
        fs::create_dir_all(&placement.directory)?;
        fs::write(placement.target(), b"old trip")?;
        fs::write(placement.directory.join("rio (1).pdf"), b"older trip")?;

        let outcome = place_file(&source, &placement, CollisionPolicy::Rename, Transfer::Copy)?;

        let renamed = placement.directory.join("rio (2).pdf");
        assert_eq!(outcome, PlaceOutcome::Copied(renamed.clone()));
        assert_eq!(fs::read(placement.target())?, b"old trip");
        assert_eq!(fs::read(renamed)?, b"new trip");
        assert!(source.exists());
        Ok(())
    }

    #[test]
    fn refuse_policy_leaves_both_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let source = dir.path().join("rio.pdf");
        fs::write(&source, b"new trip")?;
        let placement = plan_placement(&dir.path().join("dest"), &brazil(), "rio.pdf");
        fs::create_dir_all(&placement.directory)?;
        fs::write(placement.target(), b"old trip")?;

        let outcome = place_file(&source, &placement, CollisionPolicy::Refuse, Transfer::Move)?;

        assert_eq!(outcome, PlaceOutcome::Refused(placement.target()));
        assert_eq!(fs::read(&source)?, b"new trip");
        assert_eq!(fs::read(placement.target())?, b"old trip");
        Ok(())
    }

    #[test]
    fn dry_run_touches_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let source = dir.path().join("rio.pdf");
        fs::write(&source, b"carnival")?;
        let placement = plan_placement(&dir.path().join("dest"), &brazil(), "rio.pdf");

        let outcome = place_file(&source, &placement, CollisionPolicy::Rename, Transfer::DryRun)?;

        assert_eq!(outcome, PlaceOutcome::Planned(placement.target()));
        assert!(source.exists());
        assert!(!placement.directory.exists());
        Ok(())
    }

    #[test]
    fn move_never_replaces_a_target_that_appeared_late() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let source = dir.path().join("rio.pdf");
        let target = dir.path().join("taken.pdf");
        fs::write(&source, b"new trip")?;
        fs::write(&target, b"someone else's trip")?;

        let error = move_file(&source, &target).err().ok_or("move should fail")?;

        assert_eq!(error.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&source)?, b"new trip");
        assert_eq!(fs::read(&target)?, b"someone else's trip");
        Ok(())
    }

    #[test]
    fn file_names_split_on_last_dot() {
        let split = |raw: &'static str| split_file_name(OsStr::new(raw));
        assert_eq!(split("trip.final.pdf"), (OsStr::new("trip.final"), Some(OsStr::new("pdf"))));
        assert_eq!(split(".hidden"), (OsStr::new(".hidden"), None));
        assert_eq!(split("noext"), (OsStr::new("noext"), None));
    }

    #[test]
    fn numbered_names_keep_the_extension() {
        let (stem, extension) = split_file_name(OsStr::new("trip.final.pdf"));
        assert_eq!(numbered_name(stem, 1, extension), OsString::from("trip.final (1).pdf"));
        assert_eq!(numbered_name(OsStr::new("noext"), 2, None), OsString::from("noext (2)"));
    }

    #[cfg(unix)]
    #[test]
    fn rename_counter_keeps_non_utf8_bytes() -> Result<(), Box<dyn std::error::Error>> {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir()?;
        let raw_name = OsStr::from_bytes(b"S\xe3o Paulo.pdf");
        let source = dir.path().join("new.pdf");
        fs::write(&source, b"new trip")?;
        let placement = plan_placement(&dir.path().join("dest"), &brazil(), raw_name);
        fs::create_dir_all(&placement.directory)?;
        fs::write(placement.target(), b"old trip")?;

        let outcome = place_file(&source, &placement, CollisionPolicy::Rename, Transfer::Move)?;

        let renamed = placement
            .directory
            .join(OsStr::from_bytes(b"S\xe3o Paulo (1).pdf"));
        assert_eq!(outcome, PlaceOutcome::Moved(renamed.clone()));
        assert_eq!(fs::read(renamed)?, b"new trip");
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"abc")?;
        assert_eq!(digest_file(&path)?, digest_file(&path)?);
        Ok(())
    }
}

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

/// `foo.json` is shipped as `foo.json.tar.gz` next to where it is expected.
pub fn archive_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tar.gz");
    PathBuf::from(name)
}

/// Extract the member named like `path` out of its co-located archive and
/// write it to `path`.
pub fn extract_from_archive(path: &Path) -> eyre::Result<()> {
    let archive = archive_path(path);
    let member_name = path
        .file_name()
        .ok_or(eyre::eyre!("{} has no file name", path.display()))?;

    log::info!("extracting {} from {}", path.display(), archive.display());

    let file = File::open(&archive)
        .map_err(|e| eyre::eyre!("could not open archive {}: {}", archive.display(), e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));

    for entry in tar.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        if entry_path.file_name() == Some(member_name) {
            let mut output = File::create(path)?;
            std::io::copy(&mut entry, &mut output)?;
            return Ok(());
        }
    }

    Err(eyre::eyre!(
        "{} does not contain {:?}",
        archive.display(),
        member_name
    ))
}

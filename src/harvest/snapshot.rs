//! Debug screenshots. Failures are logged and ignored.

use crate::driver::PageDriver;
use std::path::Path;
use tracing::debug;

/// Save a screenshot of the viewport as `dir/name`.
pub async fn capture<D: PageDriver + ?Sized>(driver: &D, dir: &Path, name: &str) {
    let data = match driver.screenshot().await {
        Ok(data) => data,
        Err(e) => {
            debug!("screenshot {} skipped: {}", name, e);
            return;
        }
    };
    let path = dir.join(name);
    let written = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, data));
    if let Err(e) = written {
        debug!("failed to save screenshot {}: {}", path.display(), e);
    }
}

/// Make an item identity safe to use in a file name.
pub fn file_stem(identity: &str) -> String {
    identity
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

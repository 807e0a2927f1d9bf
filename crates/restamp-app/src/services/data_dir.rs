// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::PathBuf;

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let base = base_dir(
        std::env::var("XDG_DATA_HOME").ok(),
        std::env::var("HOME").ok(),
    );
    let dir = base.join("restamp");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn base_dir(xdg_data_home: Option<String>, home: Option<String>) -> PathBuf {
    // An empty XDG_DATA_HOME counts as unset.
    if let Some(xdg) = xdg_data_home.filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = home.filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from("/tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_xdg_then_home() {
        assert_eq!(
            base_dir(Some("/xdg".into()), Some("/home/jane".into())),
            PathBuf::from("/xdg")
        );
        assert_eq!(
            base_dir(Some(String::new()), Some("/home/jane".into())),
            PathBuf::from("/home/jane/.local/share")
        );
        assert_eq!(base_dir(None, None), PathBuf::from("/tmp"));
    }
}

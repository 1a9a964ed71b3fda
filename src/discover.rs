use std::env;
use std::fs;
use std::path::PathBuf;

use log::debug;

use crate::backend::LibraryKind;

// Well-known install locations, checked before LD_LIBRARY_PATH entries.
const CUDART_DIRS: &[&str] = &[
    "/usr/local/cuda/lib64",
    "/usr/lib/x86_64-linux-gnu/nvidia/current",
    "/usr/lib/x86_64-linux-gnu",
    "/usr/lib/wsl/lib",
    "/opt/cuda/lib64",
    "/usr/local/cuda/targets/aarch64-linux/lib",
    "/usr/lib/aarch64-linux-gnu/nvidia/current",
    "/usr/lib/aarch64-linux-gnu",
    "/usr/local/cuda/lib",
    "/usr/lib64",
    "/usr/lib",
    "/usr/local/lib64",
    "/usr/local/lib",
];

const NVML_DIRS: &[&str] = &[
    "/usr/local/cuda/lib64",
    "/usr/lib/x86_64-linux-gnu/nvidia/current",
    "/usr/lib/x86_64-linux-gnu",
    "/usr/lib/wsl/lib",
    "/opt/cuda/lib64",
    "/usr/lib/aarch64-linux-gnu/nvidia/current",
    "/usr/lib/aarch64-linux-gnu",
    "/usr/lib64",
    "/usr/lib",
    "/usr/local/lib64",
    "/usr/local/lib",
];

pub fn base_name(kind: LibraryKind) -> &'static str {
    match kind {
        LibraryKind::Cudart => "libcudart.so",
        LibraryKind::Nvml => "libnvidia-ml.so",
    }
}

/// Candidate library paths for `kind`, in search order. Symlinks are
/// resolved so the same image is not tried twice under different names.
/// Pure path discovery; nothing is opened here.
pub fn library_candidates(kind: LibraryKind) -> Vec<PathBuf> {
    let dirs = match kind {
        LibraryKind::Cudart => CUDART_DIRS,
        LibraryKind::Nvml => NVML_DIRS,
    };
    let mut search: Vec<PathBuf> = dirs.iter().map(PathBuf::from).collect();
    if let Some(ld_path) = env::var_os("LD_LIBRARY_PATH") {
        search.extend(env::split_paths(&ld_path));
    }

    let base = base_name(kind);
    let mut found: Vec<PathBuf> = Vec::new();
    for dir in search {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(base) {
                continue;
            }
            let resolved = resolve_links(entry.path());
            if !found.contains(&resolved) {
                found.push(resolved);
            }
        }
    }

    debug!("discovered {} candidates: {:?}", base, found);
    found
}

// Follow symlink chains to the real file; the depth cap guards against
// link cycles.
fn resolve_links(start: PathBuf) -> PathBuf {
    let mut path = start;
    for _ in 0..8 {
        let target = match fs::read_link(&path) {
            Ok(target) => target,
            Err(_) => break,
        };
        path = if target.is_absolute() {
            target
        } else {
            match path.parent() {
                Some(parent) => parent.join(target),
                None => target,
            }
        };
    }
    path
}

use std::path::{Path, PathBuf};

/// Look a binary up on `PATH`.
pub fn have_bin(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Join a relative probe path onto a mirror base URL.
/// 例如: "https://a.org/gentoo" + "distfiles/x" -> "https://a.org/gentoo/distfiles/x"
pub fn probe_url(base: &str, probe_path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        probe_path.trim_start_matches('/')
    )
}

/// The line handed to the configuration writer.
/// Download mirrors go to `GENTOO_MIRRORS`, an rsync host to `SYNC`.
pub fn render_assignment(urls: &[String], rsync: bool) -> String {
    let var = if rsync { "SYNC" } else { "GENTOO_MIRRORS" };
    format!("{}=\"{}\"", var, urls.join(" "))
}

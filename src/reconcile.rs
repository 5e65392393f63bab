use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};
use crate::catalog::{RemoteVersion, VersionCatalog, MAX_AVAILABLE_VERSIONS};
use crate::error::{GvmError, Result};
use crate::registry::RemoteLister;

/// Merges a freshly listed set of remote versions into `catalog`.
///
/// Versions not yet known come first, in the order received, followed by the
/// previously available versions in their prior order until the window of
/// [`MAX_AVAILABLE_VERSIONS`] is full. Downloaded records are carried over
/// untouched. `last_remote_fetch` moves to `now_millis` (never backwards)
/// only when the merge succeeds.
pub fn reconcile(
    catalog: &VersionCatalog,
    fresh: Vec<RemoteVersion>,
    now_millis: i64,
) -> Result<VersionCatalog> {
    let mut listed = HashSet::new();
    let fresh: Vec<RemoteVersion> = fresh
        .into_iter()
        .filter(|remote| !remote.version.is_empty())
        .filter(|remote| listed.insert(remote.version.clone()))
        .take(MAX_AVAILABLE_VERSIONS)
        .collect();
    if fresh.is_empty() {
        return Err(GvmError::Lister("the remote source returned no versions".to_string()));
    }

    let known: HashSet<&str> = catalog
        .available_versions
        .iter()
        .map(|remote| remote.version.as_str())
        .collect();
    let (new, seen): (Vec<_>, Vec<_>) = fresh
        .into_iter()
        .partition(|remote| !known.contains(remote.version.as_str()));
    debug!(new = new.len(), seen = seen.len(), "partitioned remote versions");

    let mut merged = new;
    let mut present: HashSet<String> = merged.iter().map(|r| r.version.clone()).collect();
    for previous in &catalog.available_versions {
        if merged.len() >= MAX_AVAILABLE_VERSIONS {
            break;
        }
        if present.insert(previous.version.clone()) {
            merged.push(previous.clone());
        }
    }

    info!(
        added = merged.iter().filter(|r| !known.contains(r.version.as_str())).count(),
        total = merged.len(),
        "reconciled available versions"
    );

    Ok(VersionCatalog {
        version: catalog.version.clone(),
        download_path: catalog.download_path.clone(),
        last_remote_fetch: catalog.last_remote_fetch.max(now_millis),
        available_versions: merged,
        downloaded_versions: catalog.downloaded_versions.clone(),
    })
}

/// Pulls the newest versions from `lister` and reconciles them into `catalog`
/// in place. On failure `catalog` is left exactly as it was.
pub fn update_available_versions(catalog: &mut VersionCatalog, lister: &dyn RemoteLister) -> Result<()> {
    let fresh = lister.list(MAX_AVAILABLE_VERSIONS)?;
    *catalog = reconcile(catalog, fresh, now_millis())?;
    Ok(())
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: &str) -> RemoteVersion {
        RemoteVersion::new(id, format!("https://go.dev/dl/{id}.tar.gz"))
    }

    fn ids(catalog: &VersionCatalog) -> Vec<&str> {
        catalog.available_versions.iter().map(|r| r.version.as_str()).collect()
    }

    fn catalog_with(available: &[&str]) -> VersionCatalog {
        let mut catalog = VersionCatalog::new("1.2.0", "/tmp/gvm");
        catalog.available_versions = available.iter().map(|id| remote(id)).collect();
        catalog.last_remote_fetch = 100;
        catalog
    }

    #[test]
    fn test_new_entries_first_then_retained() {
        let mut catalog = catalog_with(&["A", "B", "C"]);
        catalog.mark_downloaded("B", "/tmp/gvm/B.tar.gz");
        let merged = reconcile(&catalog, vec![remote("D"), remote("E")], 200).unwrap();
        assert_eq!(ids(&merged), vec!["D", "E", "A", "B", "C"]);
        assert_eq!(merged.downloaded_versions, catalog.downloaded_versions);
        assert_eq!(merged.last_remote_fetch, 200);
    }

    #[test]
    fn test_empty_catalog_takes_fresh_list() {
        let catalog = catalog_with(&[]);
        let merged = reconcile(&catalog, vec![remote("X"), remote("Y")], 1).unwrap();
        assert_eq!(ids(&merged), vec!["X", "Y"]);
    }

    #[test]
    fn test_seen_entries_keep_prior_position() {
        let catalog = catalog_with(&["A", "B"]);
        let merged = reconcile(&catalog, vec![remote("C"), remote("A")], 1).unwrap();
        assert_eq!(ids(&merged), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_window_capped_at_ten() {
        let previous: Vec<String> = (0..10).map(|i| format!("old{i}")).collect();
        let previous: Vec<&str> = previous.iter().map(String::as_str).collect();
        let catalog = catalog_with(&previous);
        let fresh: Vec<_> = (0..4).map(|i| remote(&format!("new{i}"))).collect();
        let merged = reconcile(&catalog, fresh, 1).unwrap();
        assert_eq!(merged.available_versions.len(), MAX_AVAILABLE_VERSIONS);
        assert_eq!(&ids(&merged)[..5], &["new0", "new1", "new2", "new3", "old0"]);
        assert_eq!(ids(&merged)[9], "old5");
    }

    #[test]
    fn test_fresh_list_truncated_and_deduplicated() {
        let catalog = catalog_with(&[]);
        let mut fresh: Vec<_> = (0..12).map(|i| remote(&format!("v{i}"))).collect();
        fresh.insert(1, remote("v0"));
        let merged = reconcile(&catalog, fresh, 1).unwrap();
        assert_eq!(merged.available_versions.len(), 10);
        assert_eq!(ids(&merged)[1], "v1");
    }

    #[test]
    fn test_empty_fresh_list_is_lister_error() {
        let catalog = catalog_with(&["A"]);
        let err = reconcile(&catalog, vec![], 500).unwrap_err();
        assert!(matches!(err, GvmError::Lister(_)));
    }

    #[test]
    fn test_timestamp_never_moves_backwards() {
        let catalog = catalog_with(&["A"]);
        let merged = reconcile(&catalog, vec![remote("B")], 50).unwrap();
        assert_eq!(merged.last_remote_fetch, 100);
    }

    struct FailingLister;

    impl RemoteLister for FailingLister {
        fn list(&self, _limit: usize) -> Result<Vec<RemoteVersion>> {
            Err(GvmError::Lister("offline".to_string()))
        }
    }

    #[test]
    fn test_update_leaves_catalog_untouched_on_failure() {
        let mut catalog = catalog_with(&["A", "B"]);
        let before = catalog.clone();
        assert!(update_available_versions(&mut catalog, &FailingLister).is_err());
        assert_eq!(catalog, before);
    }
}

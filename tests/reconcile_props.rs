use std::collections::HashSet;
use gvm::{reconcile, RemoteVersion, VersionCatalog, MAX_AVAILABLE_VERSIONS};
use proptest::prelude::*;

fn ids() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("go1\\.[0-9]{1,2}(\\.[0-9])?", 0..16)
}

fn catalog_from(available: &[String], downloaded: &[String]) -> VersionCatalog {
    let mut catalog = VersionCatalog::new("1.2.0", "/tmp/gvm");
    let mut seen = HashSet::new();
    catalog.available_versions = available
        .iter()
        .filter(|id| seen.insert(id.to_string()))
        .take(MAX_AVAILABLE_VERSIONS)
        .map(|id| RemoteVersion::new(id.as_str(), format!("https://go.dev/dl/{id}.tar.gz")))
        .collect();
    for id in downloaded {
        catalog.mark_downloaded(id, format!("/tmp/gvm/{id}.tar.gz"));
    }
    catalog
}

fn fresh_from(ids: &[String]) -> Vec<RemoteVersion> {
    ids.iter()
        .map(|id| RemoteVersion::new(id.as_str(), format!("https://go.dev/dl/{id}.tar.gz")))
        .collect()
}

proptest! {
    #[test]
    fn reconcile_never_exceeds_window(prior in ids(), downloaded in ids(), fresh in ids()) {
        let catalog = catalog_from(&prior, &downloaded);
        if let Ok(merged) = reconcile(&catalog, fresh_from(&fresh), 1) {
            prop_assert!(merged.available_versions.len() <= MAX_AVAILABLE_VERSIONS);
        }
    }

    #[test]
    fn reconcile_never_duplicates(prior in ids(), fresh in ids()) {
        let catalog = catalog_from(&prior, &[]);
        if let Ok(merged) = reconcile(&catalog, fresh_from(&fresh), 1) {
            let unique: HashSet<_> = merged.available_versions.iter().map(|r| &r.version).collect();
            prop_assert_eq!(unique.len(), merged.available_versions.len());
        }
    }

    #[test]
    fn reconcile_never_loses_downloads(prior in ids(), downloaded in ids(), fresh in ids()) {
        let catalog = catalog_from(&prior, &downloaded);
        if let Ok(merged) = reconcile(&catalog, fresh_from(&fresh), 1) {
            prop_assert_eq!(&merged.downloaded_versions, &catalog.downloaded_versions);
        }
    }

    #[test]
    fn reconcile_fails_only_on_empty_listing(prior in ids(), fresh in ids()) {
        let catalog = catalog_from(&prior, &[]);
        let result = reconcile(&catalog, fresh_from(&fresh), 1);
        prop_assert_eq!(result.is_err(), fresh.is_empty());
    }

    #[test]
    fn reconcile_puts_new_versions_first(prior in ids(), fresh in ids()) {
        let catalog = catalog_from(&prior, &[]);
        if let Ok(merged) = reconcile(&catalog, fresh_from(&fresh), 1) {
            let known: HashSet<_> = catalog.available_versions.iter().map(|r| r.version.clone()).collect();
            let first_known = merged
                .available_versions
                .iter()
                .position(|r| known.contains(&r.version))
                .unwrap_or(merged.available_versions.len());
            prop_assert!(merged.available_versions[first_known..].iter().all(|r| known.contains(&r.version)));
        }
    }
}

mod common;

use common::{singbox_payload, RecordingProcess};
use tunnelconf::store::ConfStore;
use tunnelconf::vfs::LocalFs;
use tunnelconf::{Platform, StoreSettings};

fn local_store(
    home: &tempfile::TempDir,
    data: &tempfile::TempDir,
    os: &str,
) -> ConfStore<LocalFs, RecordingProcess> {
    ConfStore::with_platform(
        LocalFs::new(home.path(), data.path()),
        RecordingProcess::idle(),
        Platform::new(os),
        StoreSettings::default(),
    )
}

#[cfg(test)]
mod local_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_files_land_under_home_on_desktop() {
        let home = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let store = local_store(&home, &data, "macos");
        store.initialize().await.unwrap();
        store.add_tunnel("home", &singbox_payload(), false).await.unwrap();

        let body = home.path().join(".agent1215-client/.conf/home.json");
        assert!(body.is_file());
        assert!(home.path().join(".agent1215-client/index.json").is_file());
        assert_eq!(store.absolute_config_path("home"), Some(body));
        assert_eq!(std::fs::read_dir(data.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_index_survives_restart() {
        let home = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        {
            let store = local_store(&home, &data, "linux");
            store.initialize().await.unwrap();
            store.add_tunnel("home", &singbox_payload(), false).await.unwrap();
            store.add_tunnel("work", &singbox_payload(), false).await.unwrap();
            store.delete_tunnel("home").await.unwrap();
        }

        let store = local_store(&home, &data, "linux");
        store.initialize().await.unwrap();
        let names: Vec<_> = store.tunnels().into_iter().map(|entry| entry.name).collect();
        assert_eq!(names, vec!["work"]);
        assert!(store.load_tunnel("work").await.is_some());
        assert_eq!(store.load_tunnel("home").await, None);
    }

    #[tokio::test]
    async fn test_files_land_under_app_data_on_mobile() {
        let home = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let store = local_store(&home, &data, "ios");
        store.initialize().await.unwrap();
        store.add_tunnel("phone", &singbox_payload(), false).await.unwrap();

        assert!(data
            .path()
            .join(".agent1215-client/.conf/phone.json")
            .is_file());
        assert!(!home.path().join(".agent1215-client").exists());
    }
}

//! Store repository tests against a local catalog server

use snapkit_core::{CATALOG_FIELDS, PackageType, Paths, Release};
use snapkit_repo::{
    InstalledNames, RepoError, Repository, StoreConfig, StoreHeaders, StoreRepository,
    SystemRepository,
};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FUNKY_NAME: &str = "8nzc1x4iim2xj1g2ul64";
const FUNKY_ORIGIN: &str = "chipaca";

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(path).unwrap()
}

fn hal(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "application/hal+json")
}

fn config_for(server: &MockServer) -> StoreConfig {
    StoreConfig::with_base(&format!("{}/api/v1", server.uri()))
}

fn store_for(server: &MockServer) -> StoreRepository {
    let headers = StoreHeaders::new(&Release::default(), "amd64");
    StoreRepository::with_headers(config_for(server), headers).unwrap()
}

/// Installed set with fixed versions
#[derive(Default)]
struct FakeInstalled {
    versions: HashMap<String, String>,
}

impl FakeInstalled {
    fn with(mut self, qualified_name: &str, version: &str) -> Self {
        self.versions
            .insert(qualified_name.to_string(), version.to_string());
        self
    }
}

impl InstalledNames for FakeInstalled {
    fn installed_names(&self) -> snapkit_repo::Result<Vec<String>> {
        let mut names: Vec<String> = self.versions.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn active_version(&self, qualified_name: &str) -> snapkit_repo::Result<Option<String>> {
        Ok(self.versions.get(qualified_name).cloned())
    }
}

mod search {
    use super::*;

    #[tokio::test]
    async fn test_search_sends_fields_and_identification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .and(query_param("q", FUNKY_NAME))
            .and(query_param("fields", CATALOG_FIELDS.join(",")))
            .and(header("accept", "application/hal+json"))
            .and(header("X-Ubuntu-Release", "15.04-core"))
            .and(header("X-Ubuntu-Architecture", "amd64"))
            .respond_with(hal(fixture("search.json")))
            .expect(1)
            .mount(&server)
            .await;

        let results = store_for(&server).search(FUNKY_NAME).await.unwrap();
        assert_eq!(results.len(), 1);

        let shared = &results[FUNKY_NAME];
        assert!(shared.alias().is_none());

        let part = &shared.parts()[0];
        assert_eq!(part.name(), FUNKY_NAME);
        assert_eq!(part.origin(), FUNKY_ORIGIN);
        assert_eq!(part.version(), "42");
        assert_eq!(part.vendor(), Some("John Lenton"));
        assert_eq!(part.description(), Some("Returns for store credit only."));
        assert_eq!(part.download_size(), 65375);
        assert_eq!(part.package_type(), PackageType::App);
        assert_eq!(part.qualified_name(), "8nzc1x4iim2xj1g2ul64.chipaca");
        assert!(part.download_url().unwrap().contains("/anon/download/"));
        assert!(part.date().is_some());
    }

    #[tokio::test]
    async fn test_search_groups_origins_under_alias() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .and(query_param("q", "hello-world"))
            .respond_with(hal(fixture("search_alias.json")))
            .mount(&server)
            .await;

        let results = store_for(&server).search("hello-world").await.unwrap();
        assert_eq!(results.len(), 1);

        let shared = &results["hello-world"];
        let origins: Vec<_> = shared.parts().iter().map(|p| p.origin()).collect();
        assert_eq!(origins, vec!["canonical", "jdstrand"]);

        let alias = shared.alias().unwrap();
        assert_eq!(alias.origin(), "canonical");
        assert_eq!(alias.version(), "1.0.8");
        assert_eq!(alias.vendor(), Some("Canonical"));
    }

    #[tokio::test]
    async fn test_search_without_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .respond_with(hal("{}".to_string()))
            .mount(&server)
            .await;

        let results = store_for(&server).search("nothing").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_store_header_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .and(header("X-Ubuntu-Store", "my-store"))
            .respond_with(hal(fixture("search.json")))
            .expect(1)
            .mount(&server)
            .await;

        let store = StoreRepository::new(config_for(&server).with_store_id("my-store")).unwrap();
        store.search(FUNKY_NAME).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_header_from_oem_package() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = Paths::new(dir.path());
        let base = paths.oem_dir.join("oem-foo").join("1.0");
        std::fs::create_dir_all(base.join("meta")).unwrap();
        std::fs::write(
            base.join("meta/package.yaml"),
            "name: oem-foo\nversion: 1.0\nvendor: foo\ntype: oem\noem:\n  store:\n    id: oem-store\n",
        )
        .unwrap();
        std::os::unix::fs::symlink("1.0", paths.oem_dir.join("oem-foo").join("current")).unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .and(header("X-Ubuntu-Store", "oem-store"))
            .respond_with(hal(fixture("search.json")))
            .expect(1)
            .mount(&server)
            .await;

        let system = Arc::new(SystemRepository::new(paths));
        let store = StoreRepository::for_system(config_for(&server), system).unwrap();
        assert_eq!(store.client().headers().store_id.as_deref(), Some("oem-store"));
        store.search(FUNKY_NAME).await.unwrap();
    }
}

mod details {
    use super::*;

    #[tokio::test]
    async fn test_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/package/8nzc1x4iim2xj1g2ul64.chipaca"))
            .and(header("X-Ubuntu-Release", "15.04-core"))
            .respond_with(hal(fixture("details.json")))
            .expect(1)
            .mount(&server)
            .await;

        let parts = store_for(&server)
            .details(FUNKY_NAME, FUNKY_ORIGIN)
            .await
            .unwrap();
        assert_eq!(parts.len(), 1);

        let part = &parts[0];
        assert_eq!(part.name(), FUNKY_NAME);
        assert_eq!(part.origin(), FUNKY_ORIGIN);
        assert_eq!(part.version(), "42");
        assert_eq!(part.channel(), Some("edge"));
        assert_eq!(part.architectures(), ["all"]);
        assert!(part.alias().is_none());
        assert_eq!(part.sha512().map(str::len), Some(128));
    }

    #[tokio::test]
    async fn test_details_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/package/no-such.package"))
            .respond_with(ResponseTemplate::new(404).set_body_string(fixture("no_details.json")))
            .mount(&server)
            .await;

        let err = store_for(&server)
            .details("no-such", "package")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound { .. }));
        insta::assert_snapshot!(err.to_string(), @"snap not found: no-such.package");
    }

    #[tokio::test]
    async fn test_details_empty_answer_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/package/foo.bar"))
            .respond_with(hal("[]".to_string()))
            .mount(&server)
            .await;

        let err = store_for(&server).details("foo", "bar").await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound { ref name } if name == "foo.bar"));
    }

    #[tokio::test]
    async fn test_details_through_repository_trait() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/package/8nzc1x4iim2xj1g2ul64.chipaca"))
            .respond_with(hal(fixture("details.json")))
            .mount(&server)
            .await;

        let repo: Box<dyn Repository> = Box::new(store_for(&server));
        let parts = repo.details(FUNKY_NAME, FUNKY_ORIGIN).await.unwrap();
        assert!(!parts[0].is_installed());
        assert!(matches!(
            repo.installed().await,
            Err(RepoError::Unsupported { .. })
        ));
    }
}

mod updates {
    use super::*;

    #[tokio::test]
    async fn test_no_installed_packages_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/click-metadata"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("updates.json")))
            .expect(0)
            .mount(&server)
            .await;

        let store = store_for(&server).with_installed(Arc::new(FakeInstalled::default()));
        assert!(store.updates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_request_lists_installed_names() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/click-metadata"))
            .and(header("accept", "application/json"))
            .and(body_json(serde_json::json!({
                "name": ["8nzc1x4iim2xj1g2ul64.chipaca"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("updates.json")))
            .expect(1)
            .mount(&server)
            .await;

        let installed = FakeInstalled::default().with("8nzc1x4iim2xj1g2ul64.chipaca", "41");
        let store = store_for(&server).with_installed(Arc::new(installed));

        let updates = store.updates().await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name(), FUNKY_NAME);
        assert_eq!(updates[0].origin(), FUNKY_ORIGIN);
        assert_eq!(updates[0].version(), "42");
    }

    #[tokio::test]
    async fn test_current_version_is_not_an_update() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/click-metadata"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("updates.json")))
            .expect(1)
            .mount(&server)
            .await;

        let installed = FakeInstalled::default().with("8nzc1x4iim2xj1g2ul64.chipaca", "42");
        let store = store_for(&server).with_installed(Arc::new(installed));
        assert!(store.updates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/click-metadata"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let installed = FakeInstalled::default().with("foo.bar", "1");
        let store = store_for(&server).with_installed(Arc::new(installed));
        assert!(matches!(
            store.updates().await,
            Err(RepoError::HttpError { status: 500, .. })
        ));
    }
}
